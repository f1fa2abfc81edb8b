//! Transaction reference generation
//!
//! References look like `KP-TRF-9F3A2C1B`: a fixed product prefix, the kind
//! code, and the leading segment of a v4 UUID. Generated exactly once per
//! settlement, at confirmation time.

use crate::transaction::TxnKind;

/// Generate a fresh globally-unique transaction reference.
pub fn new_reference(kind: TxnKind) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("KP-{}-{}", kind.code(), id[..8].to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_shape() {
        let r = new_reference(TxnKind::BankTransfer);
        assert!(r.starts_with("KP-TRF-"));
        assert_eq!(r.len(), "KP-TRF-".len() + 8);
    }

    #[test]
    fn test_references_are_unique() {
        let a = new_reference(TxnKind::Airtime);
        let b = new_reference(TxnKind::Airtime);
        assert_ne!(a, b);
    }
}
