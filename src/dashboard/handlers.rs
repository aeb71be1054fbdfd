//! Dashboard HTTP handlers and view rendering.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use time::{Duration, Month};

use crate::{
    Error,
    currency::{Currency, format_money},
    dashboard::{
        cards::{MonthComparison, balance_card, comparison_card, exchange_rate_card},
        charts::{PageChart, category_chart, charts_head_elements, charts_view, income_expense_chart},
    },
    endpoints,
    exchange::ResolvedRate,
    html::{base, link},
    navigation::NavBar,
    report::{
        DEFAULT_ANALYSIS_DAYS, MonthlySummary, ReportState, balance_summary, category_analysis,
        monthly_summary, percentage_change, trends,
    },
    transaction::{Transaction, TransactionFilter, count_transactions, get_transactions, transactions_table},
};

/// Number of months shown in the income vs. expenses chart.
const TREND_MONTHS: u32 = 6;
/// Number of transactions in the recent transactions table.
const RECENT_TRANSACTION_COUNT: u64 = 10;

/// Holds all the data needed to render the dashboard.
struct DashboardData {
    currency: Currency,
    balance: f64,
    this_month: MonthlySummary,
    last_month: MonthlySummary,
    rate: Option<ResolvedRate>,
    charts: [PageChart; 2],
    recent: Vec<Transaction>,
}

/// Display a page with an overview of the user's finances.
pub async fn get_dashboard_page(State(state): State<ReportState>) -> Result<Response, Error> {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW);
    let today = state.today()?;
    let currency = state.ledger_config.base_currency;

    let transaction_count = count_transactions(&TransactionFilter::default(), &*state.connection()?)?;
    if transaction_count == 0 {
        return Ok(dashboard_no_data_view(nav_bar).into_response());
    }

    let rates = state.rates(currency).await;
    let rate = match state.exchange_rates.get_rate(Currency::Usd, Currency::Cop).await {
        Ok(rate) => Some(rate),
        Err(error) => {
            tracing::warn!("could not get the USD to COP rate for the dashboard: {error}");
            None
        }
    };

    let (previous_year, previous_month) = match today.month() {
        Month::January => (today.year() - 1, Month::December),
        month => (today.year(), month.previous()),
    };

    let data = {
        let connection = state.connection()?;
        let balance = balance_summary(currency, currency, today, &connection)?;
        let monthly_trends = trends(TREND_MONTHS, today, &rates, &connection)?;
        let analysis = category_analysis(
            today - Duration::days(DEFAULT_ANALYSIS_DAYS),
            today,
            &rates,
            &connection,
        )?;

        DashboardData {
            currency,
            balance: balance.balance,
            this_month: monthly_summary(today.year(), today.month() as u8, &rates, &connection)?,
            last_month: monthly_summary(previous_year, previous_month as u8, &rates, &connection)?,
            rate,
            charts: [
                PageChart {
                    id: "income-expense-chart",
                    options: income_expense_chart(&monthly_trends, currency).to_string(),
                },
                PageChart {
                    id: "category-chart",
                    options: category_chart(&analysis).to_string(),
                },
            ],
            recent: get_transactions(
                &TransactionFilter {
                    limit: Some(RECENT_TRANSACTION_COUNT),
                    ..Default::default()
                },
                &connection,
            )?,
        }
    };

    Ok(dashboard_view(nav_bar, &data).into_response())
}

/// Renders the dashboard page when no transaction data exists.
fn dashboard_no_data_view(nav_bar: NavBar) -> Markup {
    let nav_bar = nav_bar.into_html();
    let new_income_link = link(endpoints::NEW_INCOME_VIEW, "income");
    let new_expense_link = link(endpoints::NEW_EXPENSE_VIEW, "expense");

    let content = html!(
        (nav_bar)

        div class="flex flex-col items-center px-6 py-8 mx-auto text-gray-900 dark:text-white"
        {
            h2 class="text-xl font-bold"
            {
                "Nothing here yet..."
            }

            p
            {
                "Charts will show up here once you add some transactions.
                Start by recording some " (new_income_link) " or an " (new_expense_link) "."
            }
        }
    );

    base("Dashboard", &[], &content)
}

fn dashboard_view(nav_bar: NavBar, data: &DashboardData) -> Markup {
    let nav_bar = nav_bar.into_html();
    let income = MonthComparison {
        label: "Income this month",
        current: data.this_month.total_income,
        change: percentage_change(data.last_month.total_income, data.this_month.total_income),
        rise_is_good: true,
    };
    let expenses = MonthComparison {
        label: "Expenses this month",
        current: data.this_month.total_expense,
        change: percentage_change(data.last_month.total_expense, data.this_month.total_expense),
        rise_is_good: false,
    };

    let content = html!(
        (nav_bar)

        div
            id="dashboard-content"
            class="flex flex-col items-center px-2 lg:px-6 lg:py-8 mx-auto
                max-w-screen-xl text-gray-900 dark:text-white"
        {
            section
                id="summary-cards"
                class="w-full grid grid-cols-1 sm:grid-cols-2 lg:grid-cols-4 gap-4 my-4"
            {
                (balance_card(data.balance, data.currency))
                (comparison_card(&income, data.currency))
                (comparison_card(&expenses, data.currency))
                (exchange_rate_card(data.rate.as_ref()))
            }

            p class="w-full text-sm text-gray-600 dark:text-gray-400 mb-4"
            {
                "Net this month: " (format_money(data.this_month.balance, data.currency))
                " from " (data.this_month.transaction_count) " transactions."
            }

            (charts_view(&data.charts))

            section class="w-full mb-8"
            {
                div class="flex justify-between items-baseline mb-2"
                {
                    h3 class="text-xl font-semibold" { "Recent transactions" }
                    (link(endpoints::TRANSACTIONS_VIEW, "View all"))
                }

                (transactions_table(&data.recent))
            }
        }
    );

    base("Dashboard", &charts_head_elements(&data.charts), &content)
}
