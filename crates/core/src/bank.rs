//! Bank destination identifiers
//!
//! NUBAN account numbers are exactly 10 digits. Bank codes are the CBN
//! short codes (3 digits) or the longer microfinance codes (5-6 digits);
//! we validate shape only - existence is the account resolver's job.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur when parsing bank identifiers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BankError {
    #[error("Account number must be exactly 10 digits: {0}")]
    InvalidAccountNumber(String),

    #[error("Invalid bank code: {0}")]
    InvalidBankCode(String),
}

/// A 10-digit NUBAN account number
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountNumber(String);

impl AccountNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AccountNumber {
    type Err = BankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.len() == 10 && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Ok(AccountNumber(trimmed.to_string()))
        } else {
            Err(BankError::InvalidAccountNumber(trimmed.to_string()))
        }
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for AccountNumber {
    type Error = BankError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<AccountNumber> for String {
    fn from(a: AccountNumber) -> Self {
        a.0
    }
}

/// A CBN bank code (3-6 digits)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BankCode(String);

impl BankCode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for BankCode {
    type Err = BankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if (3..=6).contains(&trimmed.len()) && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Ok(BankCode(trimmed.to_string()))
        } else {
            Err(BankError::InvalidBankCode(trimmed.to_string()))
        }
    }
}

impl fmt::Display for BankCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for BankCode {
    type Error = BankError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BankCode> for String {
    fn from(b: BankCode) -> Self {
        b.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_number_ten_digits() {
        let n: AccountNumber = "0123456789".parse().unwrap();
        assert_eq!(n.as_str(), "0123456789");
    }

    #[test]
    fn test_account_number_rejects_bad_shapes() {
        assert!("012345678".parse::<AccountNumber>().is_err()); // 9 digits
        assert!("01234567890".parse::<AccountNumber>().is_err()); // 11 digits
        assert!("01234a6789".parse::<AccountNumber>().is_err());
    }

    #[test]
    fn test_bank_code_shapes() {
        assert!("058".parse::<BankCode>().is_ok()); // GTBank
        assert!("50211".parse::<BankCode>().is_ok()); // Kuda
        assert!("05".parse::<BankCode>().is_err());
        assert!("0581234".parse::<BankCode>().is_err());
        assert!("ab3".parse::<BankCode>().is_err());
    }

    #[test]
    fn test_trims_whitespace() {
        assert!(" 0123456789 ".parse::<AccountNumber>().is_ok());
    }
}
