//! Function table
//!
//! A table is a vector of optional function indices. Slots start out null and
//! are filled by element segments during instantiation; `call_indirect`
//! resolves through them.

use super::RuntimeError;
use crate::parser::limits::MAX_TABLE_SIZE;
use crate::parser::module::Limits;

#[derive(Debug, Clone)]
pub struct Table {
    elements: Vec<Option<u32>>,
    limits: Limits,
}

impl Table {
    /// Create a table holding `limits.min` null entries.
    pub fn new(limits: Limits) -> Result<Self, RuntimeError> {
        if limits.min > MAX_TABLE_SIZE {
            return Err(RuntimeError::MemoryError(format!(
                "table size {} exceeds limit of {MAX_TABLE_SIZE}",
                limits.min
            )));
        }
        Ok(Table {
            elements: vec![None; limits.min as usize],
            limits,
        })
    }

    pub fn size(&self) -> u32 {
        self.elements.len() as u32
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Function index stored at `index`.
    ///
    /// # Errors
    /// `TableOutOfBounds` past the end, `UninitializedElement` for a null slot.
    pub fn get(&self, index: u32) -> Result<u32, RuntimeError> {
        match self.elements.get(index as usize) {
            Some(Some(func_idx)) => Ok(*func_idx),
            Some(None) => Err(RuntimeError::UninitializedElement(index)),
            None => Err(RuntimeError::TableOutOfBounds(index)),
        }
    }

    pub fn set(&mut self, index: u32, func_idx: Option<u32>) -> Result<(), RuntimeError> {
        let slot = self
            .elements
            .get_mut(index as usize)
            .ok_or(RuntimeError::TableOutOfBounds(index))?;
        *slot = func_idx;
        Ok(())
    }

    /// Whether `len` entries starting at `offset` fit inside the table.
    pub fn fits(&self, offset: u32, len: usize) -> bool {
        (offset as u64) + (len as u64) <= self.elements.len() as u64
    }
}
