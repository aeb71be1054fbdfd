//! Currencies, currency pairs and helpers for working with money stored as cents.

use std::{fmt::Display, str::FromStr, sync::OnceLock};

use numfmt::{Formatter, Precision};
use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

use crate::Error;

/// A currency that transactions can be recorded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", try_from = "String")]
pub enum Currency {
    /// Colombian peso.
    Cop,
    /// United States dollar.
    Usd,
    /// Euro.
    Eur,
}

impl Currency {
    /// Every supported currency, in display order.
    pub const ALL: [Currency; 3] = [Currency::Cop, Currency::Usd, Currency::Eur];

    /// The ISO 4217 code, e.g. "USD".
    pub fn code(self) -> &'static str {
        match self {
            Currency::Cop => "COP",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }

    /// The human readable name of the currency.
    pub fn name(self) -> &'static str {
        match self {
            Currency::Cop => "Colombian Peso",
            Currency::Usd => "US Dollar",
            Currency::Eur => "Euro",
        }
    }

    /// The symbol shown next to amounts.
    pub fn symbol(self) -> &'static str {
        match self {
            Currency::Cop | Currency::Usd => "$",
            Currency::Eur => "€",
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// The error returned when a string is not the code of a supported currency.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("unsupported currency \"{0}\"")]
pub struct ParseCurrencyError(pub String);

impl FromStr for Currency {
    type Err = ParseCurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "COP" => Ok(Currency::Cop),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            _ => Err(ParseCurrencyError(s.to_owned())),
        }
    }
}

impl TryFrom<String> for Currency {
    type Error = ParseCurrencyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl ToSql for Currency {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.code()))
    }
}

impl FromSql for Currency {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// An ordered pair of currencies, e.g. USD to COP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurrencyPair {
    /// The currency being converted from.
    pub from: Currency,
    /// The currency being converted to.
    pub to: Currency,
}

impl CurrencyPair {
    /// Create a new currency pair.
    pub fn new(from: Currency, to: Currency) -> Self {
        Self { from, to }
    }

    /// Whether both sides of the pair are the same currency.
    pub fn is_identity(&self) -> bool {
        self.from == self.to
    }

    /// Whether either side of the pair is `currency`.
    pub fn involves(&self, currency: Currency) -> bool {
        self.from == currency || self.to == currency
    }

    /// Every ordered pair of distinct currencies in `currencies`.
    pub fn all_pairs(currencies: &[Currency]) -> Vec<CurrencyPair> {
        currencies
            .iter()
            .flat_map(|&from| {
                currencies
                    .iter()
                    .filter(move |&&to| to != from)
                    .map(move |&to| CurrencyPair::new(from, to))
            })
            .collect()
    }
}

impl Display for CurrencyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.from, self.to)
    }
}

impl FromStr for CurrencyPair {
    type Err = ParseCurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .trim()
            .split_once(['_', '/'])
            .ok_or_else(|| ParseCurrencyError(s.to_owned()))?;

        Ok(CurrencyPair::new(from.parse()?, to.parse()?))
    }
}

/// The largest amount, in any currency, that a transaction or budget may have.
///
/// Keeps the sum of millions of maximal amounts within `i64` cents.
pub const MAX_AMOUNT: f64 = 1_000_000_000_000.0;

/// Convert a decimal amount, e.g. 12.34, to whole cents, e.g. 1234.
pub fn amount_to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Add two amounts in cents, failing instead of overflowing.
pub fn add_cents(total: i64, cents: i64) -> Result<i64, Error> {
    total.checked_add(cents).ok_or(Error::AmountOverflow)
}

/// Sum amounts in cents, failing instead of overflowing.
pub fn sum_cents(values: impl IntoIterator<Item = i64>) -> Result<i64, Error> {
    values.into_iter().try_fold(0, add_cents)
}

/// Convert whole cents back to a decimal amount.
pub fn cents_to_amount(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Apply an exchange `rate` to an amount in cents, rounding to the nearest cent.
pub fn convert_cents(cents: i64, rate: f64) -> i64 {
    (cents as f64 * rate).round() as i64
}

/// Format `amount` the way it is displayed for `currency`.
///
/// USD is shown as "$1,234.50", COP as "$1,235 COP" without decimals and any
/// other currency as "1,234.50 EUR".
pub fn format_money(amount: f64, currency: Currency) -> String {
    let sign = if amount < 0.0 && amount.abs() >= 0.005 {
        "-"
    } else {
        ""
    };

    match currency {
        Currency::Usd => format!("{sign}${}", format_number(amount.abs(), 2)),
        Currency::Cop => {
            let rounded = amount.abs().round();
            let sign = if amount < 0.0 && rounded > 0.0 { "-" } else { "" };
            format!("{sign}${} COP", format_number(rounded, 0))
        }
        other => format!("{sign}{} {other}", format_number(amount.abs(), 2)),
    }
}

/// Format amounts stored in cents, see [format_money].
pub fn format_cents(cents: i64, currency: Currency) -> String {
    format_money(cents_to_amount(cents), currency)
}

/// Format a percentage, e.g. `format_percentage(12.345, 1)` gives "12.3%".
pub fn format_percentage(value: f64, decimals: usize) -> String {
    format!("{value:.decimals$}%")
}

/// Format a non-negative number with thousands separators and exactly
/// `decimals` digits after the decimal point.
fn format_number(value: f64, decimals: usize) -> String {
    static TWO_DECIMALS: OnceLock<Formatter> = OnceLock::new();
    static NO_DECIMALS: OnceLock<Formatter> = OnceLock::new();

    let formatter = if decimals == 0 {
        NO_DECIMALS.get_or_init(|| {
            Formatter::new()
                .separator(',')
                .unwrap()
                .precision(Precision::Decimals(0))
        })
    } else {
        TWO_DECIMALS.get_or_init(|| {
            Formatter::new()
                .separator(',')
                .unwrap()
                .precision(Precision::Decimals(2))
        })
    };

    let value = if decimals == 0 {
        value.round()
    } else {
        (value * 100.0).round() / 100.0
    };

    // numfmt drops trailing zeros and renders zero as "0", so pad the fraction ourselves.
    let formatted = formatter.fmt_string(value);
    let (whole, fraction) = formatted
        .split_once('.')
        .unwrap_or((formatted.as_str(), ""));

    if decimals == 0 {
        whole.to_owned()
    } else {
        format!("{whole}.{fraction:0<decimals$}")
    }
}

#[cfg(test)]
mod tests {
    use crate::Error;

    use super::{
        Currency, CurrencyPair, ParseCurrencyError, add_cents, amount_to_cents, convert_cents,
        format_money, format_percentage, sum_cents,
    };

    #[test]
    fn sum_cents_fails_on_overflow() {
        assert_eq!(sum_cents([100, 250, -50]), Ok(300));
        assert_eq!(sum_cents([i64::MAX, 1]), Err(Error::AmountOverflow));
        assert_eq!(add_cents(i64::MIN, -1), Err(Error::AmountOverflow));
    }

    #[test]
    fn parses_currency_codes_case_insensitively() {
        assert_eq!("usd".parse(), Ok(Currency::Usd));
        assert_eq!(" COP ".parse(), Ok(Currency::Cop));
        assert_eq!("Eur".parse(), Ok(Currency::Eur));
        assert_eq!(
            "GBP".parse::<Currency>(),
            Err(ParseCurrencyError("GBP".to_owned()))
        );
    }

    #[test]
    fn deserializes_lowercase_codes() {
        let currency: Currency = serde_json::from_str("\"cop\"").unwrap();
        assert_eq!(currency, Currency::Cop);
        assert_eq!(serde_json::to_string(&Currency::Eur).unwrap(), "\"EUR\"");
    }

    #[test]
    fn lists_all_ordered_pairs() {
        let pairs = CurrencyPair::all_pairs(&Currency::ALL);

        assert_eq!(pairs.len(), 6);
        assert!(pairs.contains(&CurrencyPair::new(Currency::Usd, Currency::Cop)));
        assert!(pairs.contains(&CurrencyPair::new(Currency::Cop, Currency::Usd)));
        assert!(pairs.iter().all(|pair| !pair.is_identity()));
    }

    #[test]
    fn pair_round_trips_through_string() {
        let pair = CurrencyPair::new(Currency::Usd, Currency::Cop);

        assert_eq!(pair.to_string(), "USD_COP");
        assert_eq!("usd_cop".parse(), Ok(pair));
        assert!("USDCOP".parse::<CurrencyPair>().is_err());
    }

    #[test]
    fn rounds_amounts_to_nearest_cent() {
        assert_eq!(amount_to_cents(12.345), 1235);
        assert_eq!(amount_to_cents(0.1 + 0.2), 30);
        assert_eq!(amount_to_cents(-45.99), -4599);
    }

    #[test]
    fn converts_cents_with_rate() {
        assert_eq!(convert_cents(10_000, 4100.0), 41_000_000);
        assert_eq!(convert_cents(-4_100_000, 0.000244), -1000);
    }

    #[test]
    fn formats_usd_with_two_decimals() {
        assert_eq!(format_money(1234.5, Currency::Usd), "$1,234.50");
        assert_eq!(format_money(0.0, Currency::Usd), "$0.00");
        assert_eq!(format_money(-12.0, Currency::Usd), "-$12.00");
    }

    #[test]
    fn formats_cop_without_decimals() {
        assert_eq!(format_money(1234.56, Currency::Cop), "$1,235 COP");
        assert_eq!(format_money(4_100_000.0, Currency::Cop), "$4,100,000 COP");
    }

    #[test]
    fn formats_eur_with_code_suffix() {
        assert_eq!(format_money(1234.5, Currency::Eur), "1,234.50 EUR");
    }

    #[test]
    fn formats_percentages() {
        assert_eq!(format_percentage(12.345, 1), "12.3%");
        assert_eq!(format_percentage(80.0, 0), "80%");
    }
}
