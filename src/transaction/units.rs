use rust_decimal::Decimal;

/// Decimals between wei and gwei.
pub const GWEI_DECIMALS: u32 = 9;

/// Decimals between wei and ether.
pub const ETHER_DECIMALS: u32 = 18;

/// Scales an integer wei amount down by `decimals` places, exactly.
/// Returns `None` when the amount does not fit a 96-bit decimal mantissa.
pub fn from_wei(wei: u128, decimals: u32) -> Option<Decimal> {
    let wei = i128::try_from(wei).ok()?;
    Decimal::try_from_i128_with_scale(wei, decimals)
        .ok()
        .map(|d| d.normalize())
}

pub fn wei_to_gwei(wei: u128) -> Option<Decimal> {
    from_wei(wei, GWEI_DECIMALS)
}

pub fn wei_to_ether(wei: u128) -> Option<Decimal> {
    from_wei(wei, ETHER_DECIMALS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn gwei_conversion_is_exact() {
        assert_eq!(
            wei_to_gwei(31_500_000_001).unwrap(),
            Decimal::from_str("31.500000001").unwrap()
        );
        assert_eq!(wei_to_gwei(20_000_000_000).unwrap().to_string(), "20");
    }

    #[test]
    fn ether_conversion_is_exact() {
        assert_eq!(
            wei_to_ether(1_230_000_000_000_000_000).unwrap().to_string(),
            "1.23"
        );
        assert_eq!(wei_to_ether(0).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn oversized_amounts_are_rejected() {
        assert!(wei_to_ether(u128::MAX).is_none());
    }
}
