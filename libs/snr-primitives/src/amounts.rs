use anyhow::{anyhow, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// 1 BTC = 10^8 satoshi. All sat<->BTC conversions are exact at this scale.
pub const BTC_FRACTION_DIGITS: u32 = 8;

const SATS_PER_BTC: u64 = 100_000_000;
const MSATS_PER_SAT: u64 = 1_000;

#[derive(Debug, Clone, PartialEq, PartialOrd, Eq, Ord, Copy, Hash)]
pub struct SatAmount(u64);

#[derive(Debug, Clone, PartialEq, PartialOrd, Eq, Ord, Copy, Hash)]
pub struct MsatAmount(u64);

impl std::fmt::Display for SatAmount {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        write!(fmt, "{} sat", self.0)
    }
}

impl std::fmt::Display for MsatAmount {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> Result<(), std::fmt::Error> {
        write!(fmt, "{} msat", self.0)
    }
}

impl SatAmount {
    pub const fn new(value: u64) -> Self {
        SatAmount(value)
    }

    pub fn sat_value(&self) -> u64 {
        self.0
    }

    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        let sat_value = self.0.checked_add(other.0)?;
        Some(SatAmount::new(sat_value))
    }

    /// Exact conversion to a BTC decimal with 8 fractional digits.
    pub fn to_btc(&self) -> Decimal {
        Decimal::from_i128_with_scale(self.0 as i128, BTC_FRACTION_DIGITS)
    }

    /// Exact conversion from a BTC decimal.
    ///
    /// A value with sub-satoshi precision is rejected rather than rounded:
    /// discarding a remainder here would silently misstate an amount.
    pub fn from_btc(btc: Decimal) -> Result<Self> {
        if btc.is_sign_negative() {
            return Err(anyhow!("Amount must not be negative: {}", btc));
        }

        let scaled = btc
            .checked_mul(Decimal::from(SATS_PER_BTC))
            .ok_or_else(|| anyhow!("Amount out of range: {}", btc))?;

        if !scaled.fract().is_zero() {
            return Err(anyhow!(
                "Amount has sub-satoshi precision and cannot be represented: {}",
                btc
            ));
        }

        let sats = scaled
            .to_u64()
            .ok_or_else(|| anyhow!("Amount out of range: {}", btc))?;

        Ok(SatAmount(sats))
    }
}

impl MsatAmount {
    pub const fn new(value: u64) -> Self {
        MsatAmount(value)
    }

    pub fn msat_value(&self) -> u64 {
        self.0
    }

    pub fn checked_add(&self, other: &Self) -> Option<Self> {
        let msat_value = self.0.checked_add(other.0)?;
        Some(MsatAmount::new(msat_value))
    }

    /// Drops the sub-satoshi remainder.
    pub fn truncate_to_sat(&self) -> SatAmount {
        SatAmount(self.0 / MSATS_PER_SAT)
    }
}

impl Serialize for SatAmount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

impl Serialize for MsatAmount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(self.0)
    }
}

// The host has spelled amounts both as bare integers and as
// "<n>msat"-suffixed strings across releases; accept either.
fn parse_amount_str<E: DeError>(s: &str, suffix: &str) -> Result<u64, E> {
    let digits = s.strip_suffix(suffix).unwrap_or(s);
    digits
        .parse()
        .map_err(|_| E::custom(format!("Failed to parse amount '{}'", s)))
}

impl<'de> Deserialize<'de> for SatAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SatVisitor;

        impl serde::de::Visitor<'_> for SatVisitor {
            type Value = SatAmount;

            fn expecting(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(fmt, "a satoshi amount as integer or string")
            }

            fn visit_u64<E: DeError>(self, v: u64) -> Result<Self::Value, E> {
                Ok(SatAmount(v))
            }

            fn visit_i64<E: DeError>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(SatAmount)
                    .map_err(|_| E::custom("Satoshi amount must not be negative"))
            }

            fn visit_str<E: DeError>(self, v: &str) -> Result<Self::Value, E> {
                parse_amount_str(v, "sat").map(SatAmount)
            }
        }

        deserializer.deserialize_any(SatVisitor)
    }
}

impl<'de> Deserialize<'de> for MsatAmount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MsatVisitor;

        impl serde::de::Visitor<'_> for MsatVisitor {
            type Value = MsatAmount;

            fn expecting(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(fmt, "a millisatoshi amount as integer or string")
            }

            fn visit_u64<E: DeError>(self, v: u64) -> Result<Self::Value, E> {
                Ok(MsatAmount(v))
            }

            fn visit_i64<E: DeError>(self, v: i64) -> Result<Self::Value, E> {
                u64::try_from(v)
                    .map(MsatAmount)
                    .map_err(|_| E::custom("Millisatoshi amount must not be negative"))
            }

            fn visit_str<E: DeError>(self, v: &str) -> Result<Self::Value, E> {
                parse_amount_str(v, "msat").map(MsatAmount)
            }
        }

        deserializer.deserialize_any(MsatVisitor)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn sats_to_btc_is_exact() {
        assert_eq!(SatAmount::new(1).to_btc(), Decimal::from_str("0.00000001").unwrap());
        assert_eq!(
            SatAmount::new(1_622_000_001).to_btc(),
            Decimal::from_str("16.22000001").unwrap()
        );
        assert_eq!(SatAmount::new(0).to_btc(), Decimal::from_str("0.00000000").unwrap());
    }

    #[test]
    fn btc_to_sats_round_trip() {
        for sats in [0u64, 1, 999, 100_000_000, 1_622_000_001, 2_100_000_000_000_000] {
            let amount = SatAmount::new(sats);
            assert_eq!(SatAmount::from_btc(amount.to_btc()).unwrap(), amount);
        }
    }

    #[test]
    fn btc_with_sub_satoshi_precision_is_rejected() {
        let too_precise = Decimal::from_str("0.000000000001").unwrap();
        SatAmount::from_btc(too_precise).expect_err("Sub-satoshi remainder must not be truncated");
    }

    #[test]
    fn negative_btc_is_rejected() {
        let negative = Decimal::from_str("-0.1").unwrap();
        assert!(SatAmount::from_btc(negative).is_err());
    }

    #[test]
    fn msat_truncation_drops_remainder() {
        assert_eq!(MsatAmount::new(1000).truncate_to_sat(), SatAmount::new(1));
        assert_eq!(MsatAmount::new(1999).truncate_to_sat(), SatAmount::new(1));
        assert_eq!(MsatAmount::new(999).truncate_to_sat(), SatAmount::new(0));
        assert_eq!(
            MsatAmount::new(1_622_000_000_000).truncate_to_sat(),
            SatAmount::new(1_622_000_000)
        );
    }

    #[test]
    fn deserialize_integer_and_suffixed_string() {
        let from_int: MsatAmount = serde_json::from_str("1622000000000").unwrap();
        assert_eq!(from_int, MsatAmount::new(1_622_000_000_000));

        let from_str: MsatAmount = serde_json::from_str("\"1622000000000msat\"").unwrap();
        assert_eq!(from_str, from_int);

        let plain_str: SatAmount = serde_json::from_str("\"1000\"").unwrap();
        assert_eq!(plain_str, SatAmount::new(1000));
    }

    #[test]
    fn serialize_as_plain_integer() {
        assert_eq!(serde_json::json!(SatAmount::new(42)), serde_json::json!(42));
        assert_eq!(serde_json::json!(MsatAmount::new(42)), serde_json::json!(42));
    }
}
