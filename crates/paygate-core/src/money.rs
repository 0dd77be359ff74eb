//! # Currency Types
//!
//! Every amount in paygate is an integer in the smallest currency unit
//! (cents for USD). Conversions to major units only happen inside provider
//! implementations whose wire format wants them.

use crate::error::PaymentError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Supported currencies (ISO 4217)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    USD,
    EUR,
    GBP,
    JPY,
    CAD,
    AUD,
    CHF,
    MXN,
}

impl Currency {
    /// Returns the lowercase ISO 4217 currency code
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::USD => "usd",
            Currency::EUR => "eur",
            Currency::GBP => "gbp",
            Currency::JPY => "jpy",
            Currency::CAD => "cad",
            Currency::AUD => "aud",
            Currency::CHF => "chf",
            Currency::MXN => "mxn",
        }
    }

    /// Uppercase code, used by providers that want "USD" on the wire
    pub fn code(&self) -> String {
        self.as_str().to_uppercase()
    }

    /// Returns the number of decimal places for this currency
    /// (JPY has 0 decimals, most others have 2)
    pub fn decimal_places(&self) -> u8 {
        match self {
            Currency::JPY => 0,
            _ => 2,
        }
    }

    /// Format a smallest-unit amount as a major-unit decimal string,
    /// e.g. 1050 USD cents -> "10.50", 1000 JPY -> "1000".
    /// Integer math only; no floating point near money.
    pub fn format_major_units(&self, amount: i64) -> String {
        match self.decimal_places() {
            0 => amount.to_string(),
            places => {
                let divisor = 10_i64.pow(places as u32);
                let sign = if amount < 0 { "-" } else { "" };
                let abs = amount.unsigned_abs() as i64;
                format!(
                    "{}{}.{:0width$}",
                    sign,
                    abs / divisor,
                    abs % divisor,
                    width = places as usize
                )
            }
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::USD
    }
}

impl FromStr for Currency {
    type Err = PaymentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "usd" => Ok(Currency::USD),
            "eur" => Ok(Currency::EUR),
            "gbp" => Ok(Currency::GBP),
            "jpy" => Ok(Currency::JPY),
            "cad" => Ok(Currency::CAD),
            "aud" => Ok(Currency::AUD),
            "chf" => Ok(Currency::CHF),
            "mxn" => Ok(Currency::MXN),
            other => Err(PaymentError::UnsupportedCurrency {
                currency: other.to_string(),
            }),
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}
