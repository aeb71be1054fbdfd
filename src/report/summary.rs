//! Balance, monthly, category and period summaries of the recorded transactions.
//!
//! Amounts in other currencies are converted with a [RateTable] that is
//! resolved before any of these functions run, so that none of them need to
//! wait on the exchange rate sources while holding the database lock.

use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use rusqlite::Connection;
use serde::Serialize;
use time::{Date, Duration, Month, OffsetDateTime};

use crate::{
    Error,
    category::{CategoryInfo, TransactionType, category_info},
    currency::{Currency, add_cents, cents_to_amount, sum_cents},
    exchange::RateTable,
    transaction::{Transaction, TransactionFilter, get_transactions},
};

/// How many days the category analysis covers when no start date is given.
pub const DEFAULT_ANALYSIS_DAYS: i64 = 30;

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// The change from `old` to `new` as a percentage rounded to one decimal place.
///
/// Going from zero to anything other than zero counts as a 100% change.
pub fn percentage_change(old: f64, new: f64) -> f64 {
    if old == 0.0 {
        return if new == 0.0 { 0.0 } else { 100.0 };
    }

    round_to((new - old) / old * 100.0, 1)
}

fn first_day_of_month(year: i32, month: u8) -> Result<Date, Error> {
    let month = Month::try_from(month)
        .map_err(|_| Error::InvalidRequest(format!("{month} is not a month")))?;

    Date::from_calendar_date(year, month, 1)
        .map_err(|error| Error::InvalidRequest(format!("invalid month {year}-{month}: {error}")))
}

fn last_day_of_month(first_day: Date) -> Date {
    let next_month = match first_day.month() {
        Month::December => first_day
            .replace_year(first_day.year() + 1)
            .and_then(|date| date.replace_month(Month::January)),
        month => first_day.replace_month(month.next()),
    };

    next_month
        .map(|date| date - Duration::days(1))
        .unwrap_or(first_day)
}

fn transactions_between(
    start_date: Date,
    end_date: Date,
    transaction_type: Option<TransactionType>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    get_transactions(
        &TransactionFilter {
            start_date: Some(start_date),
            end_date: Some(end_date),
            transaction_type,
            ..Default::default()
        },
        connection,
    )
}

/// The magnitude of the transaction amount in the table's target currency.
fn converted_cents(transaction: &Transaction, rates: &RateTable) -> i64 {
    rates.convert_cents(transaction.amount_cents.saturating_abs(), transaction.currency)
}

// ============================================================================
// BALANCE
// ============================================================================

/// The income, expenses and balance up to a date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BalanceSummary {
    pub currency: Currency,
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
    pub as_of_date: Date,
}

/// Sum the income and expenses on or before `as_of`.
///
/// For the base currency the stored base amounts are summed, which covers
/// every transaction that could be converted when it was recorded. For any
/// other currency only the transactions recorded in that currency count.
pub fn balance_summary(
    currency: Currency,
    base_currency: Currency,
    as_of: Date,
    connection: &Connection,
) -> Result<BalanceSummary, Error> {
    let (income_cents, expense_cents): (i64, i64) = if currency == base_currency {
        connection.query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN transaction_type = 'income' THEN amount_base_cents END), 0),
                COALESCE(SUM(CASE WHEN transaction_type = 'expense' THEN amount_base_cents END), 0)
             FROM \"transaction\"
             WHERE is_active = 1 AND date <= ?1 AND amount_base_cents IS NOT NULL",
            (as_of,),
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?
    } else {
        connection.query_row(
            "SELECT
                COALESCE(SUM(CASE WHEN transaction_type = 'income' THEN amount_cents END), 0),
                COALESCE(SUM(CASE WHEN transaction_type = 'expense' THEN amount_cents END), 0)
             FROM \"transaction\"
             WHERE is_active = 1 AND date <= ?1 AND currency = ?2",
            (as_of, currency),
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?
    };

    let expense_cents = expense_cents.saturating_abs();
    let balance_cents = income_cents
        .checked_sub(expense_cents)
        .ok_or(Error::AmountOverflow)?;

    Ok(BalanceSummary {
        currency,
        total_income: cents_to_amount(income_cents),
        total_expense: cents_to_amount(expense_cents),
        balance: cents_to_amount(balance_cents),
        as_of_date: as_of,
    })
}

// ============================================================================
// MONTHLY
// ============================================================================

/// The totals for one calendar month, broken down by category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u8,
    pub currency: Currency,
    pub total_income: f64,
    pub total_expense: f64,
    pub balance: f64,
    pub income_by_category: BTreeMap<String, f64>,
    pub expense_by_category: BTreeMap<String, f64>,
    pub transaction_count: usize,
}

/// Summarise the transactions in `month` of `year`, converted into the
/// target currency of `rates`.
///
/// # Errors
/// Returns [Error::InvalidRequest] if `month` is not between 1 and 12.
pub fn monthly_summary(
    year: i32,
    month: u8,
    rates: &RateTable,
    connection: &Connection,
) -> Result<MonthlySummary, Error> {
    let start_date = first_day_of_month(year, month)?;
    let end_date = last_day_of_month(start_date);
    let transactions = transactions_between(start_date, end_date, None, connection)?;

    let mut income_by_category: BTreeMap<String, i64> = BTreeMap::new();
    let mut expense_by_category: BTreeMap<String, i64> = BTreeMap::new();

    for transaction in &transactions {
        let totals = match transaction.transaction_type {
            TransactionType::Income => &mut income_by_category,
            TransactionType::Expense => &mut expense_by_category,
        };

        let total = totals.entry(transaction.category.clone()).or_default();
        *total = add_cents(*total, converted_cents(transaction, rates))?;
    }

    let income_cents = sum_cents(income_by_category.values().copied())?;
    let expense_cents = sum_cents(expense_by_category.values().copied())?;
    let to_amounts = |totals: BTreeMap<String, i64>| {
        totals
            .into_iter()
            .map(|(category, cents)| (category, cents_to_amount(cents)))
            .collect()
    };

    Ok(MonthlySummary {
        year,
        month,
        currency: rates.target(),
        total_income: cents_to_amount(income_cents),
        total_expense: cents_to_amount(expense_cents),
        balance: cents_to_amount(
            income_cents
                .checked_sub(expense_cents)
                .ok_or(Error::AmountOverflow)?,
        ),
        income_by_category: to_amounts(income_by_category),
        expense_by_category: to_amounts(expense_by_category),
        transaction_count: transactions.len(),
    })
}

// ============================================================================
// CATEGORIES
// ============================================================================

/// The start and end dates of a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportPeriod {
    pub start_date: Date,
    pub end_date: Date,
}

/// The spending in one expense category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySpending {
    pub category: String,
    pub amount: f64,
    /// The share of the total spending, rounded to two decimal places.
    pub percentage: f64,
    pub count: usize,
    pub average: f64,
    pub category_info: CategoryInfo,
}

/// Expenses grouped by category, largest first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryAnalysis {
    pub period: ReportPeriod,
    pub currency: Currency,
    pub total_spending: f64,
    pub categories: Vec<CategorySpending>,
    pub top_category: Option<CategorySpending>,
}

/// Group the expenses between `start_date` and `end_date` by category,
/// converted into the target currency of `rates`.
pub fn category_analysis(
    start_date: Date,
    end_date: Date,
    rates: &RateTable,
    connection: &Connection,
) -> Result<CategoryAnalysis, Error> {
    let expenses = transactions_between(
        start_date,
        end_date,
        Some(TransactionType::Expense),
        connection,
    )?;

    let mut totals: BTreeMap<&str, (i64, usize)> = BTreeMap::new();
    for expense in &expenses {
        let entry = totals.entry(expense.category.as_str()).or_default();
        entry.0 = add_cents(entry.0, converted_cents(expense, rates))?;
        entry.1 += 1;
    }

    let total_cents = sum_cents(totals.values().map(|(cents, _)| *cents))?;

    let mut categories: Vec<CategorySpending> = totals
        .into_iter()
        .map(|(category, (cents, count))| {
            let percentage = if total_cents > 0 {
                round_to(cents as f64 / total_cents as f64 * 100.0, 2)
            } else {
                0.0
            };

            CategorySpending {
                category: category.to_owned(),
                amount: cents_to_amount(cents),
                percentage,
                count,
                average: cents_to_amount(cents) / count as f64,
                category_info: category_info(TransactionType::Expense, category),
            }
        })
        .collect();

    categories.sort_by(|a, b| b.amount.total_cmp(&a.amount));

    Ok(CategoryAnalysis {
        period: ReportPeriod {
            start_date,
            end_date,
        },
        currency: rates.target(),
        total_spending: cents_to_amount(total_cents),
        top_category: categories.first().cloned(),
        categories,
    })
}

// ============================================================================
// TRENDS
// ============================================================================

/// A monthly summary labelled for charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlyTrend {
    #[serde(flatten)]
    pub summary: MonthlySummary,
    /// e.g. "2025-01"
    pub month_year: String,
    /// e.g. "January 2025"
    pub month_name: String,
}

/// The summaries for the `months` calendar months up to and including the
/// month of `today`, oldest first.
pub fn trends(
    months: u32,
    today: Date,
    rates: &RateTable,
    connection: &Connection,
) -> Result<Vec<MonthlyTrend>, Error> {
    let mut year = today.year();
    let mut month = today.month();
    let mut trends = Vec::with_capacity(months as usize);

    for _ in 0..months {
        let summary = monthly_summary(year, month as u8, rates, connection)?;

        trends.push(MonthlyTrend {
            month_year: format!("{year}-{:02}", month as u8),
            month_name: format!("{month} {year}"),
            summary,
        });

        if month == Month::January {
            year -= 1;
        }
        month = month.previous();
    }

    trends.reverse();

    Ok(trends)
}

// ============================================================================
// FINANCIAL SUMMARY
// ============================================================================

/// The length of time covered by a financial summary, always ending today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryPeriod {
    Month,
    Quarter,
    Year,
}

impl SummaryPeriod {
    /// The first day of the period that contains `today`.
    pub fn start_date(self, today: Date) -> Date {
        let month = match self {
            SummaryPeriod::Month => today.month(),
            SummaryPeriod::Quarter => {
                let quarter_start = (today.month() as u8 - 1) / 3 * 3 + 1;
                Month::try_from(quarter_start).unwrap_or(Month::January)
            }
            SummaryPeriod::Year => Month::January,
        };

        Date::from_calendar_date(today.year(), month, 1).unwrap_or(today)
    }
}

impl FromStr for SummaryPeriod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "month" => Ok(SummaryPeriod::Month),
            "quarter" => Ok(SummaryPeriod::Quarter),
            "year" => Ok(SummaryPeriod::Year),
            other => Err(Error::InvalidPeriod(other.to_owned())),
        }
    }
}

impl Display for SummaryPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            SummaryPeriod::Month => "month",
            SummaryPeriod::Quarter => "quarter",
            SummaryPeriod::Year => "year",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SummaryPeriodDates {
    #[serde(rename = "type")]
    pub period: SummaryPeriod,
    pub start_date: Date,
    pub end_date: Date,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryStatistics {
    pub transaction_count: usize,
    pub daily_average_expense: f64,
    pub largest_expense: f64,
    pub largest_income: f64,
}

/// The balance, spending by category and statistics for the current month,
/// quarter or year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialSummary {
    pub period: SummaryPeriodDates,
    pub currency: Currency,
    pub balance: BalanceSummary,
    pub categories: CategoryAnalysis,
    pub statistics: SummaryStatistics,
}

/// Summarise the period ending `today` in the target currency of `rates`.
pub fn financial_summary(
    period: SummaryPeriod,
    today: Date,
    base_currency: Currency,
    rates: &RateTable,
    connection: &Connection,
) -> Result<FinancialSummary, Error> {
    let start_date = period.start_date(today);
    let currency = rates.target();

    let balance = balance_summary(currency, base_currency, today, connection)?;
    let categories = category_analysis(start_date, today, rates, connection)?;
    let transactions = transactions_between(start_date, today, None, connection)?;

    let largest = |transaction_type: TransactionType| {
        transactions
            .iter()
            .filter(|transaction| transaction.transaction_type == transaction_type)
            .map(|transaction| converted_cents(transaction, rates))
            .max()
            .unwrap_or(0)
    };

    let expense_cents = sum_cents(
        transactions
            .iter()
            .filter(|transaction| transaction.transaction_type == TransactionType::Expense)
            .map(|transaction| converted_cents(transaction, rates)),
    )?;
    let days_in_period = (today - start_date).whole_days() + 1;

    Ok(FinancialSummary {
        period: SummaryPeriodDates {
            period,
            start_date,
            end_date: today,
        },
        currency,
        balance,
        categories,
        statistics: SummaryStatistics {
            transaction_count: transactions.len(),
            daily_average_expense: cents_to_amount(expense_cents) / days_in_period as f64,
            largest_expense: cents_to_amount(largest(TransactionType::Expense)),
            largest_income: cents_to_amount(largest(TransactionType::Income)),
        },
    })
}

// ============================================================================
// QUICK STATS
// ============================================================================

/// Today's totals for the dashboard widgets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuickStats {
    pub currency: Currency,
    /// The balance of every transaction up to today in the base currency.
    pub balance: f64,
    pub today_income: f64,
    pub today_expense: f64,
    pub transaction_count_today: usize,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated: OffsetDateTime,
}

/// Today's income and expenses in the base currency, along with the balance.
///
/// Transactions that could not be converted count with their own amount.
pub fn quick_stats(
    today: Date,
    base_currency: Currency,
    connection: &Connection,
) -> Result<QuickStats, Error> {
    let balance = balance_summary(base_currency, base_currency, today, connection)?;
    let transactions = transactions_between(today, today, None, connection)?;

    let mut income_cents = 0;
    let mut expense_cents = 0;
    for transaction in &transactions {
        let cents = transaction
            .amount_base_cents
            .unwrap_or(transaction.amount_cents)
            .saturating_abs();

        match transaction.transaction_type {
            TransactionType::Income => income_cents = add_cents(income_cents, cents)?,
            TransactionType::Expense => expense_cents = add_cents(expense_cents, cents)?,
        }
    }

    Ok(QuickStats {
        currency: base_currency,
        balance: balance.balance,
        today_income: cents_to_amount(income_cents),
        today_expense: cents_to_amount(expense_cents),
        transaction_count_today: transactions.len(),
        last_updated: OffsetDateTime::now_utc(),
    })
}
