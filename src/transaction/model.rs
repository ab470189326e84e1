use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One transaction of a mined block, as retained for statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TxSample {
    Seen {
        /// Seconds between first sighting and block capture.
        wait_duration: i64,
        /// Calldata size in bytes.
        data_length: usize,
        gas_limit: Decimal,
        gas_price_gwei: Decimal,
        /// Transferred value in ether.
        value: Decimal,
    },
    /// Mined without a prior sighting; never enters price statistics.
    Unseen,
}

impl TxSample {
    pub fn is_unseen(&self) -> bool {
        matches!(self, TxSample::Unseen)
    }
}

#[cfg(test)]
mod tests {
    use super::TxSample;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn decimals_serialize_as_strings() {
        let tx = TxSample::Seen {
            wait_duration: 12,
            data_length: 68,
            gas_limit: Decimal::from(21_000u64),
            gas_price_gwei: Decimal::from_str("31.5").unwrap(),
            value: Decimal::from_str("0.25").unwrap(),
        };
        let json = serde_json::to_value(&tx).unwrap();
        assert_eq!(json["kind"], "seen");
        assert_eq!(json["gas_price_gwei"], "31.5");
        assert_eq!(json["gas_limit"], "21000");
        assert_eq!(json["value"], "0.25");
        assert_eq!(json["wait_duration"], 12);
    }

    #[test]
    fn unseen_is_tagged() {
        let json = serde_json::to_string(&TxSample::Unseen).unwrap();
        assert_eq!(json, r#"{"kind":"unseen"}"#);
        let back: TxSample = serde_json::from_str(&json).unwrap();
        assert!(back.is_unseen());
    }
}
