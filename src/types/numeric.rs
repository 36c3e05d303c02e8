//! Exact decimal values
//!
//! NUMERIC values travel as their decimal text. The text is validated on
//! construction and kept as-is, so no precision is lost until a caller asks
//! for a binary projection.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Decoded NUMERIC as a validated decimal string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Numeric {
    /// Canonical text (optional leading '-', digits, optional fraction)
    value: String,
}

impl Numeric {
    /// Parse and validate decimal text
    pub fn parse(text: &str) -> Result<Self> {
        let text = text.trim();
        let unsigned = text
            .strip_prefix('-')
            .or_else(|| text.strip_prefix('+'))
            .unwrap_or(text);
        let (int_part, frac_part) = match unsigned.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (unsigned, None),
        };
        let digits_ok = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        let valid = digits_ok(int_part)
            && frac_part.map_or(true, digits_ok)
            && (!int_part.is_empty() || frac_part.map_or(false, |f| !f.is_empty()));
        if !valid {
            return Err(Error::ValueConversion(format!("not a decimal number: {:?}", text)));
        }

        let negative = text.starts_with('-');
        let int_part = int_part.trim_start_matches('0');
        let int_part = if int_part.is_empty() { "0" } else { int_part };
        let mut value = String::with_capacity(text.len() + 1);
        let is_zero = int_part == "0" && frac_part.map_or(true, |f| f.bytes().all(|b| b == b'0'));
        if negative && !is_zero {
            value.push('-');
        }
        value.push_str(int_part);
        if let Some(frac) = frac_part.filter(|f| !f.is_empty()) {
            value.push('.');
            value.push_str(frac);
        }
        Ok(Self { value })
    }

    /// Build from an integer
    pub fn from_i64(v: i64) -> Self {
        Self {
            value: v.to_string(),
        }
    }

    /// Build from a finite float
    pub fn from_f64(v: f64) -> Result<Self> {
        if !v.is_finite() {
            return Err(Error::ValueConversion(format!("{} is not a finite number", v)));
        }
        Self::parse(&format!("{}", v))
    }

    /// Get the string value
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Whether there are no fractional digits
    pub fn is_integer(&self) -> bool {
        !self.value.contains('.')
    }

    /// Number of digits after the decimal point
    pub fn scale(&self) -> usize {
        self.value.split_once('.').map_or(0, |(_, f)| f.len())
    }

    /// Convert to i64, truncating any fraction
    pub fn to_i64(&self) -> Result<i64> {
        let int_part = self.value.split_once('.').map_or(self.value.as_str(), |(i, _)| i);
        int_part
            .parse()
            .map_err(|e| Error::ValueConversion(format!("{} does not fit i64: {}", self.value, e)))
    }

    /// Convert to f64
    pub fn to_f64(&self) -> Result<f64> {
        self.value
            .parse()
            .map_err(|e| Error::ValueConversion(format!("cannot parse {} as f64: {}", self.value, e)))
    }
}

impl FromStr for Numeric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}
