//! Pulling a rate out of scraped page text.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{Html, Selector};

/// CSS selectors for the element holding the converted amount on the XE
/// converter page, most specific first.
pub const XE_RATE_SELECTORS: [&str; 5] = [
    "span.converterresult-ToAmount",
    ".converterresult-ToAmount",
    "[data-testid='converter-result-to-amount']",
    ".result__BigRate",
    ".converterresult-toAmount",
];

static NUMBER_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("number pattern is valid"));

/// Rates must be strictly between these bounds, anything else is treated as
/// a scraping mistake.
const MIN_RATE: f64 = 0.0001;
const MAX_RATE: f64 = 1_000_000.0;

/// Find the first plausible rate in `text`, e.g. "4,123.45 Pesos colombianos".
///
/// Spaces and thousands separators are ignored. A single comma followed by
/// anything other than three digits is read as a decimal comma, so
/// "0,92" is 0.92 but "4,123" is 4123.
pub fn extract_rate_from_text(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    let cleaned = normalize_separators(&cleaned);

    let number = NUMBER_PATTERN.find(&cleaned)?;
    let rate: f64 = number.as_str().parse().ok()?;

    (rate > MIN_RATE && rate < MAX_RATE).then_some(rate)
}

fn normalize_separators(text: &str) -> String {
    if text.contains('.') {
        return text.replace(',', "");
    }

    let mut parts = text.split(',');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(fraction), None) => {
            let fraction_digits = fraction.chars().take_while(char::is_ascii_digit).count();
            if fraction_digits == 3 {
                text.replace(',', "")
            } else {
                text.replacen(',', ".", 1)
            }
        }
        _ => text.replace(',', ""),
    }
}

/// Look for the converted amount in an XE converter page.
pub fn extract_rate_from_html(html: &str) -> Option<f64> {
    let document = Html::parse_document(html);

    XE_RATE_SELECTORS.iter().find_map(|selector| {
        let selector = Selector::parse(selector).ok()?;
        let element = document.select(&selector).next()?;
        let text = element.text().collect::<String>();

        extract_rate_from_text(&text)
    })
}

#[cfg(test)]
mod tests {
    use crate::exchange::extract::{extract_rate_from_html, extract_rate_from_text};

    #[test]
    fn reads_thousands_separators() {
        assert_eq!(extract_rate_from_text("4,123.45 COP"), Some(4123.45));
        assert_eq!(extract_rate_from_text("4,123 COP"), Some(4123.0));
        assert_eq!(extract_rate_from_text("1,234,567.5"), Some(1234567.5));
    }

    #[test]
    fn reads_decimal_comma() {
        assert_eq!(extract_rate_from_text("0,92 Euros"), Some(0.92));
    }

    #[test]
    fn ignores_spaces() {
        assert_eq!(extract_rate_from_text("4 123.45\u{a0}COP"), Some(4123.45));
    }

    #[test]
    fn rejects_implausible_rates() {
        assert_eq!(extract_rate_from_text("0.00000001"), None);
        assert_eq!(extract_rate_from_text("no numbers here"), None);
    }

    #[test]
    fn bounds_are_exclusive() {
        assert_eq!(extract_rate_from_text("0.0001"), None);
        assert_eq!(extract_rate_from_text("1,000,000"), None);
        assert_eq!(extract_rate_from_text("0.00011"), Some(0.00011));
        assert_eq!(extract_rate_from_text("999,999.99"), Some(999_999.99));
    }

    #[test]
    fn finds_rate_in_page() {
        let html = r#"<html><body>
            <p class="other">1 USD =</p>
            <p class="result__BigRate">4,100.25<span>Pesos colombianos</span></p>
        </body></html>"#;

        assert_eq!(extract_rate_from_html(html), Some(4100.25));
    }

    #[test]
    fn falls_back_to_later_selectors() {
        let html = r#"<div data-testid="converter-result-to-amount">0.9213 EUR</div>"#;

        assert_eq!(extract_rate_from_html(html), Some(0.9213));
    }

    #[test]
    fn page_without_rate() {
        assert_eq!(extract_rate_from_html("<p>Nothing to see</p>"), None);
    }
}
