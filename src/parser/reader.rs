use byteorder::{LittleEndian, ReadBytesExt};

use super::DecodeError;

/// Upper bound for names read from a module.
pub const MAX_NAME_LEN: usize = 10 * 1024 * 1024;

/// A cursor over an owned byte buffer.
///
/// Sections and function bodies are decoded through a `sub_reader`, a second
/// `Reader` holding exactly the declared number of bytes, so a decoder can
/// never run past the end of the region it was given.
pub struct Reader {
    bytes: Vec<u8>,
    pos: usize,
}

impl Reader {
    pub fn new(bytes: Vec<u8>) -> Reader {
        Reader { bytes, pos: 0 }
    }
}

impl Reader {
    // Basic operations --------------------------------------------------------
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub fn read_byte(&mut self) -> Result<u8, DecodeError> {
        match self.next() {
            Some(byte) => Ok(byte),
            None => Err(DecodeError::UnexpectedEof),
        }
    }

    pub fn peek_byte(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>, DecodeError> {
        if len > self.remaining() {
            return Err(DecodeError::UnexpectedEof);
        }
        let vec = self.bytes[self.pos..self.pos + len].to_vec();
        self.pos += len;
        Ok(vec)
    }

    /// Take the next `len` bytes as an independent reader.
    pub fn sub_reader(&mut self, len: usize) -> Result<Reader, DecodeError> {
        Ok(Reader::new(self.read_bytes(len)?))
    }

    /// Consume whatever is left.
    pub fn read_rest(&mut self) -> Vec<u8> {
        let rest = self.bytes[self.pos..].to_vec();
        self.pos = self.bytes.len();
        rest
    }

    // Read and interpret types ------------------------------------------------

    // le
    pub fn read_u32(&mut self) -> Result<u32, DecodeError> {
        let bytes = self.read_bytes(4)?;
        Ok(bytes.as_slice().read_u32::<LittleEndian>()?)
    }

    pub fn read_vu32(&mut self) -> Result<u32, DecodeError> {
        Ok(read_vu(&mut || self.read_byte(), 32)? as u32)
    }

    pub fn read_vu64(&mut self) -> Result<u64, DecodeError> {
        read_vu(&mut || self.read_byte(), 64)
    }

    pub fn read_vs32(&mut self) -> Result<i32, DecodeError> {
        Ok(read_vs(&mut || self.read_byte(), 32)? as i32)
    }

    pub fn read_vs33(&mut self) -> Result<i64, DecodeError> {
        read_vs(&mut || self.read_byte(), 33)
    }

    pub fn read_vs64(&mut self) -> Result<i64, DecodeError> {
        read_vs(&mut || self.read_byte(), 64)
    }

    pub fn read_f32(&mut self) -> Result<f32, DecodeError> {
        let bytes = self.read_bytes(4)?;
        Ok(bytes.as_slice().read_f32::<LittleEndian>()?)
    }

    pub fn read_f64(&mut self) -> Result<f64, DecodeError> {
        let bytes = self.read_bytes(8)?;
        Ok(bytes.as_slice().read_f64::<LittleEndian>()?)
    }

    pub fn read_name(&mut self) -> Result<String, DecodeError> {
        let len = self.read_vu32()? as usize;
        if len > MAX_NAME_LEN {
            return Err(DecodeError::NameTooLong(len));
        }
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes).map_err(|_| DecodeError::BadUtf8)
    }

    /// Read a `vec(byte)`, bounded only by the bytes left in the reader.
    pub fn read_byte_vec(&mut self) -> Result<Vec<u8>, DecodeError> {
        let len = self.read_vu32()? as usize;
        self.read_bytes(len)
    }

    /// Read a `vec(T)`: a u32 count followed by that many items.
    pub fn read_vec<T, F>(&mut self, mut item: F) -> Result<Vec<T>, DecodeError>
    where
        F: FnMut(&mut Reader) -> Result<T, DecodeError>,
    {
        let count = self.read_vu32()? as usize;
        // every item takes at least one byte
        if count > self.remaining() {
            return Err(DecodeError::UnexpectedEof);
        }
        let mut items = Vec::with_capacity(count);
        for _ in 0..count {
            items.push(item(self)?);
        }
        Ok(items)
    }
}

impl Iterator for Reader {
    type Item = u8;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos < self.bytes.len() {
            let byte = self.bytes[self.pos];
            self.pos += 1;
            Some(byte)
        } else {
            None
        }
    }
}

fn max_leb_bytes(bits: u32) -> usize {
    ((bits + 6) / 7) as usize
}

/// Value bits carried by the last byte of a maximum-length encoding.
fn last_byte_bits(bits: u32) -> u32 {
    bits - 7 * (max_leb_bytes(bits) as u32 - 1)
}

/// Unsigned LEB128 of at most `bits` bits.
pub fn read_vu<F>(next: &mut F, bits: u32) -> Result<u64, DecodeError>
where
    F: FnMut() -> Result<u8, DecodeError>,
{
    let max_bytes = max_leb_bytes(bits);
    let mut result: u64 = 0;
    let mut shift = 0u32;
    let mut count = 0;

    loop {
        let byte = next()?;
        count += 1;
        if count > max_bytes {
            return Err(DecodeError::BadLEB128);
        }
        if shift < 64 {
            result |= u64::from(byte & 0x7f) << shift;
        }
        shift += 7;
        if byte & 0x80 == 0 {
            // bits above the target width must be zero
            let unused = 0x7f & !((1u8 << last_byte_bits(bits)) - 1);
            if count == max_bytes && byte & unused != 0 {
                return Err(DecodeError::BadLEB128);
            }
            return Ok(result);
        }
    }
}

/// Signed LEB128 of at most `bits` bits. Sign extension ORs in the high bits
/// when the terminating byte carries the sign flag.
pub fn read_vs<F>(next: &mut F, bits: u32) -> Result<i64, DecodeError>
where
    F: FnMut() -> Result<u8, DecodeError>,
{
    let max_bytes = max_leb_bytes(bits);
    let mut result: i64 = 0;
    let mut shift = 0u32;
    let mut count = 0;

    loop {
        let byte = next()?;
        count += 1;
        if count > max_bytes {
            return Err(DecodeError::BadLEB128);
        }
        if shift < 64 {
            result |= i64::from(byte & 0x7f) << shift;
        }
        shift += 7;
        if byte & 0x80 == 0 {
            // bits above the target width must repeat the sign bit
            let sign_and_unused = 0x7f & !((1u8 << (last_byte_bits(bits) - 1)) - 1);
            let high = byte & sign_and_unused;
            if count == max_bytes && high != 0 && high != sign_and_unused {
                return Err(DecodeError::BadLEB128);
            }
            if shift < bits && byte & 0x40 != 0 {
                result |= -1i64 << shift;
            }
            return Ok(result);
        }
    }
}
