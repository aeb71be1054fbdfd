//! Card components for the dashboard summary row.
//!
//! Each card shows one figure, optionally compared with the previous month:
//! - Balance in the base currency
//! - This month's income and expenses with the change from last month
//! - The current exchange rate between two currencies

use maud::{Markup, html};

use crate::{
    currency::{Currency, format_money},
    exchange::ResolvedRate,
};

/// A figure for this month alongside the same figure for last month.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct MonthComparison {
    pub label: &'static str,
    pub current: f64,
    pub change: f64,
    /// Whether a rise is good news, e.g. true for income and false for expenses.
    pub rise_is_good: bool,
}

/// Formats a percentage change with its sign, avoiding "-0.0%".
fn format_change(change: f64) -> String {
    if change.abs() < 0.05 {
        "0.0%".to_owned()
    } else if change > 0.0 {
        format!("+{change:.1}%")
    } else {
        format!("{change:.1}%")
    }
}

fn change_style(comparison: &MonthComparison) -> &'static str {
    if comparison.change.abs() < 0.05 {
        "text-gray-600 dark:text-gray-400"
    } else if (comparison.change > 0.0) == comparison.rise_is_good {
        "text-green-600 dark:text-green-400"
    } else {
        "text-red-600 dark:text-red-400"
    }
}

const CARD_STYLE: &str = "bg-white dark:bg-gray-800 border border-gray-200 \
    dark:border-gray-700 rounded-lg p-4 shadow-md flex flex-col justify-between";

pub(super) fn balance_card(balance: f64, currency: Currency) -> Markup {
    let style = if balance < 0.0 {
        "text-red-600 dark:text-red-400"
    } else {
        "text-gray-900 dark:text-white"
    };

    html! {
        div class=(CARD_STYLE) aria-label=(format!("Balance: {}", format_money(balance, currency)))
        {
            h4 class="text-sm text-gray-600 dark:text-gray-400" { "Balance" }
            div class={ "text-3xl font-bold " (style) } { (format_money(balance, currency)) }
            div class="text-xs text-gray-500 dark:text-gray-400" { "All time, in " (currency.code()) }
        }
    }
}

pub(super) fn comparison_card(comparison: &MonthComparison, currency: Currency) -> Markup {
    html! {
        div class=(CARD_STYLE)
        {
            h4 class="text-sm text-gray-600 dark:text-gray-400" { (comparison.label) }
            div class="text-3xl font-bold" { (format_money(comparison.current, currency)) }
            div class={ "text-sm font-medium " (change_style(comparison)) }
            {
                (format_change(comparison.change)) " vs last month"
            }
        }
    }
}

/// The current rate, or a notice when no rate could be found.
pub(super) fn exchange_rate_card(rate: Option<&ResolvedRate>) -> Markup {
    html! {
        div class=(CARD_STYLE)
        {
            @match rate {
                Some(rate) => {
                    h4 class="text-sm text-gray-600 dark:text-gray-400"
                    {
                        (rate.pair.from.code()) " → " (rate.pair.to.code())
                    }
                    div class="text-3xl font-bold" { (format_money(rate.rate, rate.pair.to)) }
                    div class="text-xs text-gray-500 dark:text-gray-400"
                    {
                        "Source: " (rate.source_label())
                    }
                }
                None => {
                    h4 class="text-sm text-gray-600 dark:text-gray-400" { "Exchange rate" }
                    div class="text-sm text-gray-500 dark:text-gray-400" { "Unavailable" }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        currency::Currency,
        dashboard::cards::{MonthComparison, balance_card, change_style, comparison_card, format_change},
    };

    fn comparison(change: f64, rise_is_good: bool) -> MonthComparison {
        MonthComparison {
            label: "Expenses",
            current: 120.0,
            change,
            rise_is_good,
        }
    }

    #[test]
    fn formats_change_with_sign() {
        assert_eq!(format_change(12.34), "+12.3%");
        assert_eq!(format_change(-5.0), "-5.0%");
        assert_eq!(format_change(-0.01), "0.0%");
    }

    #[test]
    fn rising_expenses_are_red() {
        assert!(change_style(&comparison(20.0, false)).contains("red"));
        assert!(change_style(&comparison(-20.0, false)).contains("green"));
        assert!(change_style(&comparison(20.0, true)).contains("green"));
        assert!(change_style(&comparison(0.0, true)).contains("gray"));
    }

    #[test]
    fn comparison_card_shows_amount_and_change() {
        let html = comparison_card(&comparison(20.0, false), Currency::Usd).into_string();

        assert!(html.contains("$120.00"));
        assert!(html.contains("+20.0% vs last month"));
    }

    #[test]
    fn negative_balance_is_red() {
        let html = balance_card(-10.0, Currency::Usd).into_string();

        assert!(html.contains("text-red-600"));
    }
}
