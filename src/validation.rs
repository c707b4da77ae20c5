use std::ops::RangeInclusive;

/// Validates that a value is a finite number (not NaN or infinite).
///
/// # Arguments
///
/// * `value` - The value to validate.
///
/// # Returns
///
/// * `Ok(())` if the value is finite.
/// * `Err(&'static str)` otherwise.
pub fn is_finite(value: f64) -> Result<(), &'static str> {
    if value.is_finite() {
        Ok(())
    } else {
        Err("Value must be a finite number")
    }
}

/// Validates that a value is finite and strictly greater than zero.
///
/// Used for densities and the specific heat capacity.
pub fn is_positive(value: f64) -> Result<(), &'static str> {
    is_finite(value)?;
    if value > 0.0 {
        Ok(())
    } else {
        Err("Value must be greater than 0")
    }
}

/// Validates that a value is finite and not negative.
pub fn is_non_negative(value: f64) -> Result<(), &'static str> {
    is_finite(value)?;
    if value >= 0.0 {
        Ok(())
    } else {
        Err("Value cannot be negative")
    }
}

/// Validates if a given string is a valid file path.
///
/// # Arguments
///
/// * `path` - The string to validate.
///
/// # Returns
///
/// * `Ok(())` if the file path is valid.
/// * `Err(&'static str)` if the file path is invalid.
pub fn is_valid_path(path: &str) -> Result<(), &'static str> {
    if path.is_empty() {
        return Err("File path cannot be empty");
    }
    if path.contains('\0') {
        return Err("File path cannot contain null bytes");
    }
    Ok(())
}

/// Validates if a given value is within a specified numeric range.
pub fn is_in_range<T: PartialOrd>(value: T, range: RangeInclusive<T>) -> Result<(), &'static str> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err("Value is outside the specified range")
    }
}

/// Validates if a given string is not empty.
pub fn is_not_empty(value: &str) -> Result<(), &'static str> {
    if !value.is_empty() {
        Ok(())
    } else {
        Err("Value cannot be empty")
    }
}
