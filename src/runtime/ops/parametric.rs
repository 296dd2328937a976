//! Parametric operations: `drop` and `select`.

use super::{RuntimeError, Stack};

pub fn drop(stack: &mut Stack) -> Result<(), RuntimeError> {
    stack.pop()?;
    Ok(())
}

/// select
/// 1. Pop the i32 condition c.
/// 2. Pop val2, then val1; both must share a type.
/// 3. Push val1 if c is non-zero, else val2.
pub fn select(stack: &mut Stack) -> Result<(), RuntimeError> {
    let c = stack.pop_i32()?;
    let val2 = stack.pop()?;
    let val1 = stack.pop()?;
    if val1.typ() != val2.typ() {
        return Err(RuntimeError::TypeMismatch {
            expected: val1.typ(),
            actual: val2.typ(),
        });
    }
    stack.push(if c != 0 { val1 } else { val2 });
    Ok(())
}
