use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TestCodeError {
    #[error("test code must be exactly {expected} digits, got {got}")]
    WrongLength { expected: usize, got: usize },

    #[error("test code must contain digits only")]
    NonDigit,
}

/// Number of digits in a test access code.
pub const TEST_CODE_LEN: usize = 6;

/// Six-digit code a student types to reach a test without knowing its id.
///
/// Validated on construction so malformed codes are rejected before any
/// network call is made.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TestCode(String);

impl TestCode {
    /// Creates a test code from raw input, trimming surrounding whitespace.
    ///
    /// # Errors
    ///
    /// Returns `TestCodeError::WrongLength` unless exactly six characters
    /// remain after trimming, and `TestCodeError::NonDigit` if any of them
    /// is not an ASCII digit.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, TestCodeError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.chars().count() != TEST_CODE_LEN {
            return Err(TestCodeError::WrongLength {
                expected: TEST_CODE_LEN,
                got: trimmed.chars().count(),
            });
        }
        if !trimmed.chars().all(|c| c.is_ascii_digit()) {
            return Err(TestCodeError::NonDigit);
        }
        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TestCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TestCode {
    type Err = TestCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TestCode {
    type Error = TestCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TestCode> for String {
    fn from(code: TestCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_six_digits() {
        let code = TestCode::new("483920").unwrap();
        assert_eq!(code.as_str(), "483920");
    }

    #[test]
    fn trims_whitespace() {
        let code = TestCode::new("  483920  ").unwrap();
        assert_eq!(code.to_string(), "483920");
    }

    #[test]
    fn rejects_wrong_length() {
        let err = TestCode::new("12345").unwrap_err();
        assert_eq!(
            err,
            TestCodeError::WrongLength {
                expected: 6,
                got: 5
            }
        );
        assert!(TestCode::new("1234567").is_err());
        assert!(TestCode::new("").is_err());
    }

    #[test]
    fn rejects_non_digits() {
        let err = TestCode::new("12a456").unwrap_err();
        assert_eq!(err, TestCodeError::NonDigit);
        assert!(TestCode::new("12 456").is_err());
    }

    #[test]
    fn parses_from_str() {
        let code: TestCode = "000042".parse().unwrap();
        assert_eq!(code.as_str(), "000042");
    }
}
