//! The reports page: totals per currency, spending per category, monthly
//! trends and the largest expenses for a date range.

use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::{Date, Duration};

use crate::{
    Error,
    category::TransactionType,
    currency::{Currency, cents_to_amount, format_money, format_percentage},
    dashboard::{PageChart, category_chart, charts_head_elements, charts_view, income_expense_chart},
    endpoints,
    exchange::RateTable,
    html::{
        BUTTON_SECONDARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
    },
    navigation::NavBar,
    report::{
        api::ReportState,
        summary::{CategoryAnalysis, DEFAULT_ANALYSIS_DAYS, category_analysis, trends},
    },
    transaction::{Transaction, TransactionFilter, get_transactions, parse_date, transactions_table},
};

/// The number of months shown in the trend chart.
const TREND_MONTHS: u32 = 6;
/// The number of expenses in the largest expenses table.
const TOP_EXPENSE_COUNT: usize = 10;

/// The date range for the reports page.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    start_date: Option<String>,
    end_date: Option<String>,
}

/// The income and expenses recorded in one currency, unconverted.
#[derive(Debug, Clone, PartialEq)]
struct CurrencyTotals {
    currency: Currency,
    income_cents: i64,
    expense_cents: i64,
    count: u32,
}

fn totals_by_currency(
    start_date: Date,
    end_date: Date,
    connection: &Connection,
) -> Result<Vec<CurrencyTotals>, Error> {
    connection
        .prepare(
            "SELECT currency,
                COALESCE(SUM(CASE WHEN transaction_type = 'income' THEN amount_cents END), 0),
                COALESCE(SUM(CASE WHEN transaction_type = 'expense' THEN -amount_cents END), 0),
                COUNT(*)
             FROM \"transaction\"
             WHERE is_active = 1 AND date BETWEEN ?1 AND ?2
             GROUP BY currency
             ORDER BY currency",
        )?
        .query_map((start_date, end_date), |row| {
            Ok(CurrencyTotals {
                currency: row.get(0)?,
                income_cents: row.get(1)?,
                expense_cents: row.get(2)?,
                count: row.get(3)?,
            })
        })?
        .map(|row| row.map_err(Error::from))
        .collect()
}

/// The `limit` largest expenses in the period, compared in the target
/// currency of `rates`.
fn largest_expenses(
    start_date: Date,
    end_date: Date,
    rates: &RateTable,
    limit: usize,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let mut expenses = get_transactions(
        &TransactionFilter {
            start_date: Some(start_date),
            end_date: Some(end_date),
            transaction_type: Some(TransactionType::Expense),
            ..Default::default()
        },
        connection,
    )?;

    expenses.sort_by_key(|expense| {
        std::cmp::Reverse(rates.convert_cents(expense.amount_cents.saturating_abs(), expense.currency))
    });
    expenses.truncate(limit);

    Ok(expenses)
}

fn date_range_form(start_date: Date, end_date: Date) -> Markup {
    html! {
        form
            method="get"
            action=(endpoints::REPORTS_VIEW)
            class="grid grid-cols-3 gap-2 w-full mb-6 items-end"
        {
            div
            {
                label for="start_date" class=(FORM_LABEL_STYLE) { "From" }
                input
                    type="date"
                    name="start_date"
                    id="start_date"
                    value=(start_date)
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="end_date" class=(FORM_LABEL_STYLE) { "To" }
                input
                    type="date"
                    name="end_date"
                    id="end_date"
                    value=(end_date)
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" class=(BUTTON_SECONDARY_STYLE) { "Update" }
        }
    }
}

fn currency_totals_table(totals: &[CurrencyTotals]) -> Markup {
    html! {
        div class="overflow-x-auto rounded shadow mb-6"
        {
            table class="w-full text-sm text-left"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Currency" }
                        th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Income" }
                        th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Expenses" }
                        th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Net" }
                        th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Transactions" }
                    }
                }

                tbody
                {
                    @for row in totals {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td class=(TABLE_CELL_STYLE) { (row.currency.code()) " " (row.currency.name()) }
                            td class={ (TABLE_CELL_STYLE) " text-right" }
                            {
                                (format_money(cents_to_amount(row.income_cents), row.currency))
                            }
                            td class={ (TABLE_CELL_STYLE) " text-right" }
                            {
                                (format_money(cents_to_amount(row.expense_cents), row.currency))
                            }
                            td class={ (TABLE_CELL_STYLE) " text-right" }
                            {
                                (format_money(cents_to_amount(row.income_cents - row.expense_cents), row.currency))
                            }
                            td class={ (TABLE_CELL_STYLE) " text-right" } { (row.count) }
                        }
                    }
                }
            }
        }
    }
}

fn category_breakdown(analysis: &CategoryAnalysis) -> Markup {
    html! {
        ul class="mb-6 divide-y divide-gray-200 dark:divide-gray-700"
        {
            @for spending in &analysis.categories {
                li class="flex justify-between py-2"
                {
                    span { (spending.category_info.icon) " " (spending.category_info.name) }
                    span class="text-gray-500 dark:text-gray-400"
                    {
                        (spending.count) " × avg " (format_money(spending.average, analysis.currency))
                    }
                    span
                    {
                        (format_money(spending.amount, analysis.currency))
                        " (" (format_percentage(spending.percentage, 1)) ")"
                    }
                }
            }
        }
    }
}

struct ReportContent<'a> {
    start_date: Date,
    end_date: Date,
    currency_totals: &'a [CurrencyTotals],
    analysis: &'a CategoryAnalysis,
    top_expenses: &'a [Transaction],
    charts: &'a [PageChart],
}

fn reports_view(report: ReportContent<'_>) -> Markup {
    let nav_bar = NavBar::new(endpoints::REPORTS_VIEW).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-5xl"
            {
                h2 class="text-xl font-bold mb-4" { "Reports" }

                (date_range_form(report.start_date, report.end_date))

                h3 class="text-lg font-semibold mb-2" { "Totals by currency" }

                @if report.currency_totals.is_empty() {
                    p class="text-gray-500 dark:text-gray-400 mb-6" { "No transactions in this period." }
                } @else {
                    (currency_totals_table(report.currency_totals))
                }

                (charts_view(report.charts))

                h3 class="text-lg font-semibold mb-2"
                {
                    "Spending by category ("
                    (format_money(report.analysis.total_spending, report.analysis.currency))
                    ")"
                }

                (category_breakdown(report.analysis))

                h3 class="text-lg font-semibold mb-2" { "Largest expenses" }

                @if report.top_expenses.is_empty() {
                    p class="text-gray-500 dark:text-gray-400" { "No expenses in this period." }
                } @else {
                    (transactions_table(report.top_expenses))
                }
            }
        }
    };

    base("Reports", &charts_head_elements(report.charts), &content)
}

/// Renders the reports for the requested date range, which defaults to the
/// last 30 days. Amounts are converted into the base currency.
pub async fn get_reports_page(
    State(state): State<ReportState>,
    Query(query): Query<ReportQuery>,
) -> Result<Response, Error> {
    let today = state.today()?;
    let end_date = parse_date(non_empty(&query.end_date), "end_date")?.unwrap_or(today);
    let start_date = parse_date(non_empty(&query.start_date), "start_date")?
        .unwrap_or(end_date - Duration::days(DEFAULT_ANALYSIS_DAYS));

    if start_date > end_date {
        return Err(Error::InvalidRequest(
            "the start date must not be after the end date".to_owned(),
        ));
    }

    let currency = state.ledger_config.base_currency;
    let rates = state.rates(currency).await;

    let (currency_totals, analysis, monthly_trends, top_expenses) = {
        let connection = state.connection()?;

        (
            totals_by_currency(start_date, end_date, &connection)?,
            category_analysis(start_date, end_date, &rates, &connection)?,
            trends(TREND_MONTHS, today, &rates, &connection)?,
            largest_expenses(start_date, end_date, &rates, TOP_EXPENSE_COUNT, &connection)?,
        )
    };

    let charts = [
        PageChart {
            id: "income-expense-chart",
            options: income_expense_chart(&monthly_trends, currency).to_string(),
        },
        PageChart {
            id: "category-chart",
            options: category_chart(&analysis).to_string(),
        },
    ];

    Ok(reports_view(ReportContent {
        start_date,
        end_date,
        currency_totals: &currency_totals,
        analysis: &analysis,
        top_expenses: &top_expenses,
        charts: &charts,
    })
    .into_response())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}
