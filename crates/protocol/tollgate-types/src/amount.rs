//! Token amounts in the asset's smallest unit.

use serde::{Deserialize, Serialize};

use crate::error::{CodecError, CodecResult};

/// An integer amount in the asset's smallest unit, carried as a decimal string.
///
/// The string is kept verbatim so that requirements round-trip byte-for-byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TokenAmount(String);

impl TokenAmount {
    /// Parse a smallest-unit amount. Only ASCII digits are accepted.
    pub fn parse(value: &str) -> CodecResult<Self> {
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CodecError::invalid(
                "maxAmountRequired",
                format!("'{value}' is not a non-negative integer"),
            ));
        }
        Ok(Self(value.to_string()))
    }

    /// Build from an integer number of smallest units.
    pub fn from_units(units: u128) -> Self {
        Self(units.to_string())
    }

    /// Convert a human price (`"0.10"`) into smallest units for an asset with
    /// `decimals` decimals.
    pub fn from_decimal(price: &str, decimals: u8) -> CodecResult<Self> {
        let price = price.trim();
        let (whole, fraction) = price.split_once('.').unwrap_or((price, ""));

        let digits_ok = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && fraction.is_empty()) || !digits_ok(whole) || !digits_ok(fraction)
        {
            return Err(CodecError::invalid("price", format!("'{price}' is not a decimal")));
        }
        if fraction.len() > decimals as usize {
            return Err(CodecError::invalid(
                "price",
                format!("'{price}' has more than {decimals} fractional digits"),
            ));
        }

        let padded = format!("{whole}{fraction:0<width$}", width = decimals as usize);
        let significant = padded.trim_start_matches('0');
        let units: u128 = if significant.is_empty() {
            0
        } else {
            significant
                .parse()
                .map_err(|_| CodecError::invalid("price", format!("'{price}' is out of range")))?
        };

        Ok(Self::from_units(units))
    }

    /// The numeric value.
    pub fn as_u128(&self) -> Option<u128> {
        self.0.parse().ok()
    }

    /// The decimal string exactly as carried on the wire.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TokenAmount {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TokenAmount> for String {
    fn from(value: TokenAmount) -> Self {
        value.0
    }
}

impl std::fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
