//! Implementation limits applied while decoding.
//!
//! They stop malformed input from claiming unrealistic counts and exhausting
//! host memory or host stack before any real data has been read.

/// Maximum number of local variables in a function, parameters excluded
pub const MAX_FUNCTION_LOCALS: u64 = 50_000;

/// Maximum number of labels in a br_table instruction
pub const MAX_BR_TABLE_LABELS: u32 = 65_536;

/// Maximum nesting of block/loop/if while decoding a body
pub const MAX_BLOCK_DEPTH: usize = 1_024;

/// Maximum table size (number of elements)
pub const MAX_TABLE_SIZE: u32 = 10_000_000;
