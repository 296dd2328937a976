//! Branching operations
//!
//! Structured instructions (`block`, `loop`, `if`, calls) live in the
//! executor because they recurse into nested sequences. The operations here
//! only unwind the operand stack to a target label and report the branch.

use super::{RuntimeError, Stack};
use crate::runtime::control::{BlockEnd, LabelStack};

/// Unwind to label `label_idx`.
///
/// 1. Let L be the label `label_idx` levels out and n its arity.
/// 2. Pop the top n values.
/// 3. Drop everything above L's entry height.
/// 4. Push the n values back and report `Branch(label_idx)`.
pub fn perform_branch(stack: &mut Stack, labels: &LabelStack, label_idx: u32) -> Result<BlockEnd, RuntimeError> {
    let label = labels.get(label_idx).ok_or(RuntimeError::InvalidLabel(label_idx))?;
    let values = stack.pop_n(label.arity)?;
    stack.truncate(label.stack_height);
    stack.push_all(values);
    Ok(BlockEnd::Branch(label_idx))
}

pub fn br(stack: &mut Stack, labels: &LabelStack, label_idx: u32) -> Result<BlockEnd, RuntimeError> {
    perform_branch(stack, labels, label_idx)
}

/// br_if: branch when the popped i32 is non-zero.
pub fn br_if(stack: &mut Stack, labels: &LabelStack, label_idx: u32) -> Result<BlockEnd, RuntimeError> {
    if stack.pop_i32()? != 0 {
        perform_branch(stack, labels, label_idx)
    } else {
        Ok(BlockEnd::Normal)
    }
}

/// br_table: the popped i32, read unsigned, indexes `targets`; anything past
/// the end selects `default`.
pub fn br_table(stack: &mut Stack, labels: &LabelStack, targets: &[u32], default: u32) -> Result<BlockEnd, RuntimeError> {
    let i = stack.pop_i32()? as u32;
    let label_idx = targets.get(i as usize).copied().unwrap_or(default);
    perform_branch(stack, labels, label_idx)
}

pub fn return_op() -> Result<BlockEnd, RuntimeError> {
    Ok(BlockEnd::Return)
}

pub fn unreachable() -> Result<BlockEnd, RuntimeError> {
    Err(RuntimeError::Unreachable)
}
