//! Phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input has the wrong number of digits.
    #[error("phone number must be exactly {expected} digits (got {actual})")]
    WrongLength {
        /// Required digit count.
        expected: usize,
        /// Digit count of the input.
        actual: usize,
    },
    /// The input contains something other than ASCII digits.
    #[error("phone number may only contain digits")]
    NonDigit,
}

/// A delivery contact phone number.
///
/// The profile-completion form accepts exactly ten digits with no spaces or
/// punctuation, and the backend stores the same canonical form.
///
/// ## Examples
///
/// ```
/// use skecho_core::PhoneNumber;
///
/// assert!(PhoneNumber::parse("0123456789").is_ok());
///
/// assert!(PhoneNumber::parse("").is_err());             // empty
/// assert!(PhoneNumber::parse("12345").is_err());        // too short
/// assert!(PhoneNumber::parse("012-345-6789").is_err()); // punctuation
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Number of digits in a valid phone number.
    pub const DIGITS: usize = 10;

    /// Parse a `PhoneNumber` from a string.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, contains non-digit characters,
    /// or does not have exactly ten digits.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }

        if !s.chars().all(|c| c.is_ascii_digit()) {
            return Err(PhoneError::NonDigit);
        }

        if s.len() != Self::DIGITS {
            return Err(PhoneError::WrongLength {
                expected: Self::DIGITS,
                actual: s.len(),
            });
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the phone number as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
