//! The income and expenses pages: recent transactions of one type along with
//! their totals per category over the last 30 days.

use std::collections::BTreeMap;

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use time::{Date, Duration};

use crate::{
    Error,
    category::{TransactionType, category_info},
    currency::{Currency, format_cents, format_percentage},
    endpoints,
    exchange::RateTable,
    html::{PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base, link, stat_card},
    navigation::NavBar,
    report::{DEFAULT_ANALYSIS_DAYS, ReportState},
    transaction::{
        core::{Transaction, TransactionFilter, get_transactions},
        transactions_page::transactions_table,
    },
};

/// How many of the most recent transactions are listed.
const RECENT_TRANSACTION_COUNT: u64 = 20;

/// The total for one category over the analysis period.
#[derive(Debug, Clone, PartialEq)]
struct CategoryTotal {
    category: String,
    cents: i64,
    count: usize,
    percentage: f64,
}

/// Sum the magnitudes of `transactions` per category in the target currency
/// of `rates`, largest first.
fn category_totals(transactions: &[Transaction], rates: &RateTable) -> Vec<CategoryTotal> {
    let mut totals: BTreeMap<&str, (i64, usize)> = BTreeMap::new();

    for transaction in transactions {
        let entry = totals.entry(transaction.category.as_str()).or_default();
        let cents = rates.convert_cents(
            transaction.amount_cents.saturating_abs(),
            transaction.currency,
        );
        entry.0 = entry.0.saturating_add(cents);
        entry.1 += 1;
    }

    let grand_total = totals
        .values()
        .fold(0_i64, |total, (cents, _)| total.saturating_add(*cents));

    let mut totals: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, (cents, count))| CategoryTotal {
            category: category.to_owned(),
            cents,
            count,
            percentage: if grand_total > 0 {
                cents as f64 / grand_total as f64 * 100.0
            } else {
                0.0
            },
        })
        .collect();

    totals.sort_by(|a, b| b.cents.cmp(&a.cents));

    totals
}

fn category_table(
    transaction_type: TransactionType,
    totals: &[CategoryTotal],
    currency: Currency,
) -> Markup {
    html! {
        div class="overflow-x-auto rounded shadow mb-6"
        {
            table class="w-full text-sm text-left"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Transactions" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Share" }
                        th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Total" }
                    }
                }

                tbody
                {
                    @for total in totals {
                        @let info = category_info(transaction_type, &total.category);
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td class=(TABLE_CELL_STYLE) { (info.icon) " " (info.name) }
                            td class=(TABLE_CELL_STYLE) { (total.count) }
                            td class=(TABLE_CELL_STYLE)
                            {
                                div class="flex items-center gap-2"
                                {
                                    div class="w-24 h-2 bg-gray-200 rounded dark:bg-gray-700"
                                    {
                                        div
                                            class="h-2 rounded"
                                            style={ "width: " (format!("{:.0}", total.percentage)) "%; background-color: " (info.color) }
                                        {}
                                    }
                                    (format_percentage(total.percentage, 1))
                                }
                            }
                            td class={ (TABLE_CELL_STYLE) " text-right" }
                            {
                                (format_cents(total.cents, currency))
                            }
                        }
                    }
                }
            }
        }
    }
}

fn overview_view(
    transaction_type: TransactionType,
    recent: &[Transaction],
    totals: &[CategoryTotal],
    currency: Currency,
    period_start: Date,
) -> Markup {
    let (title, page_endpoint, new_endpoint, new_label) = match transaction_type {
        TransactionType::Income => (
            "Income",
            endpoints::INCOME_VIEW,
            endpoints::NEW_INCOME_VIEW,
            "Add income",
        ),
        TransactionType::Expense => (
            "Expenses",
            endpoints::EXPENSES_VIEW,
            endpoints::NEW_EXPENSE_VIEW,
            "Add expense",
        ),
    };
    let nav_bar = NavBar::new(page_endpoint).into_html();
    let period_total = totals
        .iter()
        .fold(0_i64, |sum, total| sum.saturating_add(total.cents));
    let period_count: usize = totals.iter().map(|total| total.count).sum();
    let all_url = format!(
        "{}?type={}",
        endpoints::TRANSACTIONS_VIEW,
        transaction_type.as_str()
    );

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-5xl"
            {
                div class="flex justify-between items-center mb-4"
                {
                    h2 class="text-xl font-bold" { (title) }
                    (link(new_endpoint, new_label))
                }

                div class="grid grid-cols-2 gap-4 mb-6"
                {
                    (stat_card(
                        &format!("Total since {period_start}"),
                        &html! { (format_cents(period_total, currency)) },
                    ))
                    (stat_card("Transactions", &html! { (period_count) }))
                }

                h3 class="text-lg font-semibold mb-2" { "By category" }

                @if totals.is_empty() {
                    p class="text-gray-500 dark:text-gray-400 mb-6"
                    {
                        "Nothing recorded in the last " (DEFAULT_ANALYSIS_DAYS) " days."
                    }
                } @else {
                    (category_table(transaction_type, totals, currency))
                }

                div class="flex justify-between items-baseline mb-2"
                {
                    h3 class="text-lg font-semibold" { "Recent" }
                    (link(&all_url, "View all"))
                }

                @if recent.is_empty() {
                    p class="text-gray-500 dark:text-gray-400" { "No transactions yet." }
                } @else {
                    (transactions_table(recent))
                }
            }
        }
    };

    base(title, &[], &content)
}

async fn overview_page(
    transaction_type: TransactionType,
    state: ReportState,
) -> Result<Response, Error> {
    let today = state.today()?;
    let period_start = today - Duration::days(DEFAULT_ANALYSIS_DAYS);
    let currency = state.ledger_config.base_currency;
    let rates = state.rates(currency).await;

    let (recent, period_transactions) = {
        let connection = state.connection()?;
        let recent = get_transactions(
            &TransactionFilter {
                transaction_type: Some(transaction_type),
                limit: Some(RECENT_TRANSACTION_COUNT),
                ..Default::default()
            },
            &connection,
        )?;
        let period_transactions = get_transactions(
            &TransactionFilter {
                transaction_type: Some(transaction_type),
                start_date: Some(period_start),
                end_date: Some(today),
                ..Default::default()
            },
            &connection,
        )?;

        (recent, period_transactions)
    };

    let totals = category_totals(&period_transactions, &rates);

    Ok(overview_view(transaction_type, &recent, &totals, currency, period_start).into_response())
}

/// Renders the recent income and the income per type over the last 30 days.
pub async fn get_income_page(State(state): State<ReportState>) -> Result<Response, Error> {
    overview_page(TransactionType::Income, state).await
}

/// Renders the recent expenses and the spending per category over the last 30 days.
pub async fn get_expenses_page(State(state): State<ReportState>) -> Result<Response, Error> {
    overview_page(TransactionType::Expense, state).await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::State;
    use scraper::Selector;
    use time::{Duration, OffsetDateTime};

    use crate::{
        TransactionType,
        currency::Currency,
        exchange::RateTable,
        report::ReportState,
        test_utils::{assert_status_ok, assert_valid_html, parse_html_document},
        transaction::{
            TransactionDraft, TransactionFilter, TransactionService, get_test_service,
            overview_page::{category_totals, get_expenses_page, get_income_page},
        },
    };

    async fn seeded_state() -> (ReportState, TransactionService) {
        let service = get_test_service();
        let today = OffsetDateTime::now_utc().date();

        for (transaction_type, amount, description, category, currency, days_ago) in [
            (TransactionType::Income, 500.0, "Salary", "salary", Currency::Usd, 1),
            (TransactionType::Income, 400_000.0, "Side job", "freelance", Currency::Cop, 3),
            (TransactionType::Expense, 30.0, "Lunch", "food", Currency::Usd, 0),
            (TransactionType::Expense, 40_000.0, "Dinner", "food", Currency::Cop, 2),
            (TransactionType::Expense, 50.0, "Old rent", "housing", Currency::Usd, 60),
        ] {
            service
                .create(
                    TransactionDraft::new(transaction_type, amount, description, category)
                        .currency(currency)
                        .date(today - Duration::days(days_ago)),
                )
                .await
                .unwrap();
        }

        let state = ReportState {
            db_connection: Arc::clone(&service.db_connection),
            exchange_rates: Arc::clone(&service.exchange_rates),
            ledger_config: service.ledger_config.clone(),
            local_timezone: service.local_timezone.clone(),
        };

        (state, service)
    }

    #[tokio::test]
    async fn expenses_page_shows_only_expenses() {
        let (state, _) = seeded_state().await;

        let response = get_expenses_page(State(state)).await.unwrap();

        assert_status_ok(&response);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let text = document.root_element().text().collect::<String>();
        assert!(text.contains("Lunch"));
        assert!(text.contains("Old rent"));
        assert!(!text.contains("Salary"));
    }

    #[tokio::test]
    async fn expenses_page_groups_recent_spending() {
        let (state, _) = seeded_state().await;

        let response = get_expenses_page(State(state)).await.unwrap();

        let document = parse_html_document(response).await;
        let rows = document
            .select(&Selector::parse("tbody").unwrap())
            .next()
            .unwrap()
            .select(&Selector::parse("tr").unwrap())
            .count();
        // Food only, the rent is older than 30 days.
        assert_eq!(rows, 1);
        let text = document.root_element().text().collect::<String>();
        assert!(text.contains("$40.00"), "{text}");
    }

    #[tokio::test]
    async fn income_page_lists_income() {
        let (state, _) = seeded_state().await;

        let response = get_income_page(State(state)).await.unwrap();

        assert_status_ok(&response);
        let text = parse_html_document(response)
            .await
            .root_element()
            .text()
            .collect::<String>();
        assert!(text.contains("Salary"));
        assert!(text.contains("Side job"));
        assert!(!text.contains("Lunch"));
        assert!(text.contains("$600.00"), "{text}");
    }

    #[tokio::test]
    async fn category_totals_are_sorted_largest_first() {
        let (_, service) = seeded_state().await;
        let transactions = service
            .list(&TransactionFilter {
                transaction_type: Some(TransactionType::Expense),
                ..Default::default()
            })
            .unwrap();
        let rates = RateTable::new(Currency::Usd).with_rate(Currency::Cop, 0.00025);

        let totals = category_totals(&transactions, &rates);

        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].category, "housing");
        assert_eq!(totals[0].cents, 5000);
        assert_eq!(totals[1].category, "food");
        assert_eq!(totals[1].cents, 4000);
        assert_eq!(totals[1].count, 2);
    }
}
