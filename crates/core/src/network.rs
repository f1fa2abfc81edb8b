//! Network - Nigerian mobile operators
//!
//! Airtime does not ask the user for an operator; it is inferred from the
//! msisdn prefix. Data flows select the operator explicitly because plan
//! catalogs are operator-specific.

use crate::msisdn::Msisdn;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Nigerian mobile network operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[strum(serialize = "mtn", to_string = "MTN")]
    Mtn,
    #[strum(serialize = "glo", to_string = "Glo")]
    Glo,
    #[strum(serialize = "airtel", to_string = "Airtel")]
    Airtel,
    #[strum(serialize = "9mobile", to_string = "9mobile")]
    #[serde(rename = "9mobile")]
    NineMobile,
}

impl Network {
    /// All operators, in menu order
    pub fn all() -> [Network; 4] {
        [Network::Mtn, Network::Glo, Network::Airtel, Network::NineMobile]
    }

    /// The operator code sent to the disbursement gateway
    pub fn gateway_code(&self) -> &'static str {
        match self {
            Network::Mtn => "mtn",
            Network::Glo => "glo",
            Network::Airtel => "airtel",
            Network::NineMobile => "9mobile",
        }
    }

    /// Infer the operator from a number's leading four digits.
    ///
    /// Ported numbers defeat prefix detection; `None` means the caller must
    /// ask the user instead.
    pub fn from_msisdn(msisdn: &Msisdn) -> Option<Network> {
        match msisdn.prefix() {
            "0803" | "0806" | "0810" | "0813" | "0814" | "0816" | "0703" | "0704" | "0706"
            | "0903" | "0906" | "0913" | "0916" => Some(Network::Mtn),
            "0805" | "0807" | "0811" | "0815" | "0705" | "0905" | "0915" => Some(Network::Glo),
            "0801" | "0802" | "0808" | "0812" | "0701" | "0708" | "0901" | "0902" | "0904"
            | "0907" | "0912" => Some(Network::Airtel),
            "0809" | "0817" | "0818" | "0908" | "0909" => Some(Network::NineMobile),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_detection() {
        let mtn: Msisdn = "08031234567".parse().unwrap();
        let glo: Msisdn = "08051234567".parse().unwrap();
        let airtel: Msisdn = "09021234567".parse().unwrap();
        let ninemobile: Msisdn = "09091234567".parse().unwrap();

        assert_eq!(Network::from_msisdn(&mtn), Some(Network::Mtn));
        assert_eq!(Network::from_msisdn(&glo), Some(Network::Glo));
        assert_eq!(Network::from_msisdn(&airtel), Some(Network::Airtel));
        assert_eq!(Network::from_msisdn(&ninemobile), Some(Network::NineMobile));
    }

    #[test]
    fn test_unknown_prefix() {
        // 0911 is unassigned in the table
        let m: Msisdn = "09111234567".parse().unwrap();
        assert_eq!(Network::from_msisdn(&m), None);
    }

    #[test]
    fn test_parse_and_display() {
        assert_eq!("mtn".parse::<Network>().unwrap(), Network::Mtn);
        assert_eq!("9mobile".parse::<Network>().unwrap(), Network::NineMobile);
        assert_eq!(Network::Airtel.to_string(), "Airtel");
        assert!("vodafone".parse::<Network>().is_err());
    }

    #[test]
    fn test_gateway_codes() {
        assert_eq!(Network::Mtn.gateway_code(), "mtn");
        assert_eq!(Network::NineMobile.gateway_code(), "9mobile");
    }
}
