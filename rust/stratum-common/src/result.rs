//! The crate-wide `Result` alias and inline verification helpers.

pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// Verifies a condition on a caller-supplied argument, failing with an
/// `InvalidArgument` error naming the argument and the violated condition.
#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_arg(result, stringify!($name), stringify!($expr))?;
    }};
}

/// Verifies a condition on decoded storage data, failing with an
/// `InvalidFormat` error naming the checked element and the violated
/// condition.
#[macro_export]
macro_rules! verify_data {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_data(result, stringify!($name), stringify!($expr))?;
    }};
}

#[inline]
pub fn verify_arg(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate { Ok(()) } else { invalid_arg(name, condition) }
}

#[inline]
pub fn verify_data(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate { Ok(()) } else { invalid_format(name, condition) }
}

#[cold]
fn invalid_arg(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::Error::invalid_arg(name, condition))
}

#[cold]
fn invalid_format(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::Error::invalid_format(name, condition))
}

#[cfg(test)]
mod tests {
    use crate::Result;

    fn check_data(value: usize) -> Result<()> {
        verify_data!(value, value < 10);
        Ok(())
    }

    fn check_arg(capacity: usize) -> Result<()> {
        verify_arg!(capacity, capacity > 0);
        Ok(())
    }

    #[test]
    fn test_verify_data_macro() {
        assert!(check_data(5).is_ok());
        let err = check_data(20).unwrap_err();
        assert!(err.is_format_error());
        assert!(err.to_string().contains("value < 10"));
    }

    #[test]
    fn test_verify_arg_macro() {
        assert!(check_arg(1).is_ok());
        let err = check_arg(0).unwrap_err();
        assert!(!err.is_format_error());
        assert!(err.to_string().contains("capacity > 0"));
    }
}
