//! Money amounts in minor currency units.
//!
//! Every amount that crosses the Stripe boundary is an integer number of
//! cents, so [`Money`] stores cents and only formats to major units for
//! display in emails and dashboards.

use core::fmt;

use serde::{Deserialize, Serialize};

/// ISO 4217 currency codes accepted for platform charges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CurrencyCode {
    #[default]
    Usd,
    Eur,
    Gbp,
    Cad,
    Aud,
}

impl CurrencyCode {
    /// Display symbol for the currency.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Usd | Self::Cad | Self::Aud => "$",
            Self::Eur => "€",
            Self::Gbp => "£",
        }
    }

    /// Lowercase code as Stripe expects it in the `currency` parameter.
    #[must_use]
    pub const fn as_stripe_str(self) -> &'static str {
        match self {
            Self::Usd => "usd",
            Self::Eur => "eur",
            Self::Gbp => "gbp",
            Self::Cad => "cad",
            Self::Aud => "aud",
        }
    }
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_stripe_str().to_ascii_uppercase())
    }
}

impl std::str::FromStr for CurrencyCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "usd" => Ok(Self::Usd),
            "eur" => Ok(Self::Eur),
            "gbp" => Ok(Self::Gbp),
            "cad" => Ok(Self::Cad),
            "aud" => Ok(Self::Aud),
            _ => Err(format!("unsupported currency: {s}")),
        }
    }
}

/// An amount of money in minor units (cents).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Money {
    cents: i64,
    currency: CurrencyCode,
}

impl Money {
    /// Create an amount from minor units.
    #[must_use]
    pub const fn from_cents(cents: i64, currency: CurrencyCode) -> Self {
        Self { cents, currency }
    }

    /// Create a USD amount from cents.
    #[must_use]
    pub const fn usd(cents: i64) -> Self {
        Self::from_cents(cents, CurrencyCode::Usd)
    }

    #[must_use]
    pub const fn cents(&self) -> i64 {
        self.cents
    }

    #[must_use]
    pub const fn currency(&self) -> CurrencyCode {
        self.currency
    }

    /// Format for display, e.g. `$1,000.00` or `-$500.00`.
    #[must_use]
    pub fn display(&self) -> String {
        let sign = if self.cents < 0 { "-" } else { "" };
        let abs = self.cents.unsigned_abs();
        let whole = group_thousands(abs / 100);
        format!("{sign}{}{whole}.{:02}", self.currency.symbol(), abs % 100)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_groups_thousands() {
        assert_eq!(Money::usd(100_000).display(), "$1,000.00");
        assert_eq!(Money::usd(123_456_789).display(), "$1,234,567.89");
    }

    #[test]
    fn test_display_zero_and_negative() {
        assert_eq!(Money::usd(0).display(), "$0.00");
        assert_eq!(Money::usd(-50_000).display(), "-$500.00");
        assert_eq!(Money::usd(5).display(), "$0.05");
    }

    #[test]
    fn test_display_other_currency() {
        let money = Money::from_cents(1999, CurrencyCode::Gbp);
        assert_eq!(money.to_string(), "£19.99");
    }

    #[test]
    fn test_currency_parse() {
        assert_eq!("USD".parse::<CurrencyCode>().unwrap(), CurrencyCode::Usd);
        assert_eq!(CurrencyCode::Eur.as_stripe_str(), "eur");
        assert!("btc".parse::<CurrencyCode>().is_err());
    }
}
