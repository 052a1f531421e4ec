use std::fmt;

use serde::{Deserialize, Serialize};

/// A three-letter ISO-4217-shaped currency code, stored inline so `Money`
/// stays `Copy` and fits in a register pair. No validation against the real
/// ISO-4217 list is performed — connections declare whatever codes their
/// PSP and entity configuration use.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    pub fn new(code: &str) -> Result<Self, CurrencyCodeError> {
        let bytes = code.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(u8::is_ascii_alphabetic) {
            return Err(CurrencyCodeError(code.to_string()));
        }
        let mut upper = [0u8; 3];
        for (dst, src) in upper.iter_mut().zip(bytes) {
            *dst = src.to_ascii_uppercase();
        }
        Ok(Self(upper))
    }

    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.0).expect("ascii by construction")
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid currency code: {0}")]
pub struct CurrencyCodeError(String);

impl TryFrom<String> for CurrencyCode {
    type Error = CurrencyCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.as_str().to_string()
    }
}

impl fmt::Debug for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Monetary amount as an integer count of the smallest currency unit (e.g.
/// cents). No floating point value is ever constructed from or converted to
/// this type; all arithmetic here is exact integer arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub value: i64,
    pub currency: CurrencyCode,
}

impl Money {
    pub fn new(value: i64, currency: CurrencyCode) -> Self {
        Self { value, currency }
    }

    pub fn is_non_negative(&self) -> bool {
        self.value >= 0
    }

    /// Absolute difference against another amount in the same currency.
    /// Returns `None` on a currency mismatch rather than silently comparing
    /// across currencies.
    pub fn abs_diff(&self, other: &Money) -> Option<i64> {
        (self.currency == other.currency).then(|| (self.value - other.value).abs())
    }

    /// `|self - other| / self` expressed as a percentage, used by the Level
    /// 2/3 tolerance checks. `self` is the transaction amount and must be
    /// nonzero for the ratio to be meaningful.
    pub fn abs_diff_pct(&self, other: &Money) -> Option<f64> {
        if self.value == 0 {
            return None;
        }
        self.abs_diff(other)
            .map(|diff| (diff as f64 / self.value as f64) * 100.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.value, self.currency)
    }
}
