//! Msisdn - Normalized Nigerian mobile number
//!
//! User-entered numbers arrive as `0803...`, `2348...` or `+2347...`.
//! All of them normalize to the canonical 11-digit local form
//! (`0` + network prefix + subscriber digits) before any gateway call.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing a mobile number
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MsisdnError {
    #[error("Phone number is empty")]
    Empty,

    #[error("Invalid Nigerian mobile number: {0}")]
    InvalidFormat(String),
}

/// A Nigerian mobile number in canonical 11-digit local form.
///
/// # Invariant
/// The inner string is exactly 11 ASCII digits, starting `0`, followed by
/// `7`, `8` or `9`, then `0` or `1`, then 8 subscriber digits.
///
/// # Example
/// ```
/// use kobopay_core::Msisdn;
///
/// let a: Msisdn = "08012345678".parse().unwrap();
/// let b: Msisdn = "+234 801 234 5678".parse().unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a.as_str(), "08012345678");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Msisdn(String);

impl Msisdn {
    /// The canonical 11-digit local form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The leading four digits (`080x`, `070x`, `090x`, `091x`),
    /// used for operator prefix detection.
    pub fn prefix(&self) -> &str {
        &self.0[..4]
    }

    /// International form without the plus sign, e.g. `2348012345678`
    pub fn international(&self) -> String {
        format!("234{}", &self.0[1..])
    }
}

impl FromStr for Msisdn {
    type Err = MsisdnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits: String = s.chars().filter(|c| !c.is_whitespace() && *c != '-').collect();
        if digits.is_empty() {
            return Err(MsisdnError::Empty);
        }

        // Strip the country code down to the 10 significant digits.
        let rest = if let Some(r) = digits.strip_prefix("+234") {
            r
        } else if let Some(r) = digits.strip_prefix("234") {
            r
        } else if let Some(r) = digits.strip_prefix('0') {
            r
        } else {
            return Err(MsisdnError::InvalidFormat(s.trim().to_string()));
        };

        let valid = rest.len() == 10
            && rest.bytes().all(|b| b.is_ascii_digit())
            && matches!(rest.as_bytes()[0], b'7' | b'8' | b'9')
            && matches!(rest.as_bytes()[1], b'0' | b'1');
        if !valid {
            return Err(MsisdnError::InvalidFormat(s.trim().to_string()));
        }

        Ok(Msisdn(format!("0{rest}")))
    }
}

impl fmt::Display for Msisdn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Msisdn {
    type Error = MsisdnError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Msisdn> for String {
    fn from(m: Msisdn) -> Self {
        m.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_form() {
        let m: Msisdn = "08012345678".parse().unwrap();
        assert_eq!(m.as_str(), "08012345678");
    }

    #[test]
    fn test_international_forms_normalize() {
        let plain: Msisdn = "08012345678".parse().unwrap();
        assert_eq!("2348012345678".parse::<Msisdn>().unwrap(), plain);
        assert_eq!("+2348012345678".parse::<Msisdn>().unwrap(), plain);
        assert_eq!("+234 801 234 5678".parse::<Msisdn>().unwrap(), plain);
    }

    #[test]
    fn test_prefix_and_international() {
        let m: Msisdn = "07061234567".parse().unwrap();
        assert_eq!(m.prefix(), "0706");
        assert_eq!(m.international(), "2347061234567");
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!("0801234567".parse::<Msisdn>().is_err()); // 10 digits
        assert!("080123456789".parse::<Msisdn>().is_err()); // 12 digits
    }

    #[test]
    fn test_rejects_non_mobile_prefix() {
        // Second digit must be 7/8/9, third 0/1
        assert!("06012345678".parse::<Msisdn>().is_err());
        assert!("08212345678".parse::<Msisdn>().is_err());
        assert!("".parse::<Msisdn>().is_err());
        assert!("hello".parse::<Msisdn>().is_err());
    }

    #[test]
    fn test_serde_roundtrip() {
        let m: Msisdn = "09091234567".parse().unwrap();
        let json = serde_json::to_string(&m).unwrap();
        assert_eq!(json, "\"09091234567\"");
        let back: Msisdn = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
