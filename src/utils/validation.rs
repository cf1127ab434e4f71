use crate::error::Result;
use validator::Validate;

/// Runs the derived validator rules and hands the payload back on success.
pub fn validated<T: Validate>(val: T) -> Result<T> {
    val.validate()?;
    Ok(val)
}
