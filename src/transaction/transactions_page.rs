//! Defines the route handler for the page that lists transactions with
//! filters and pagination.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    category::{EXPENSE_CATEGORIES, INCOME_TYPES, TransactionType},
    config::LedgerConfig,
    currency::Currency,
    endpoints::{self, format_endpoint},
    html::{
        BUTTON_SECONDARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, PAGE_CONTAINER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, amount_span, base, link, stat_card,
        transaction_type_badge,
    },
    navigation::NavBar,
    pagination::{Pagination, PaginationConfig, create_pagination_indicators, pagination_nav},
    transaction::{
        core::{Transaction, count_transactions, get_transactions},
        query::TransactionListQuery,
    },
};

/// The state needed for the transactions page.
#[derive(Debug, Clone)]
pub struct TransactionsPageState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub pagination_config: PaginationConfig,
    pub ledger_config: LedgerConfig,
}

impl FromRef<AppState> for TransactionsPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
            ledger_config: state.ledger_config.clone(),
        }
    }
}

/// The income and expense totals of the transactions shown on a page, in
/// the base currency.
///
/// Transactions without a base amount are left out.
#[derive(Debug, Default, PartialEq, Eq)]
struct PageTotals {
    income_cents: i64,
    expense_cents: i64,
}

impl PageTotals {
    fn from_transactions(transactions: &[Transaction]) -> Self {
        transactions
            .iter()
            .fold(Self::default(), |mut totals, transaction| {
                if let Some(base_cents) = transaction.amount_base_cents {
                    match transaction.transaction_type {
                        TransactionType::Income => {
                            totals.income_cents = totals.income_cents.saturating_add(base_cents)
                        }
                        TransactionType::Expense => {
                            totals.expense_cents =
                                totals.expense_cents.saturating_add(base_cents.saturating_abs())
                        }
                    }
                }

                totals
            })
    }
}

fn filter_form(query: &TransactionListQuery) -> Markup {
    let selected_type = query.transaction_type.as_deref().unwrap_or_default();
    let selected_category = query.category.as_deref().unwrap_or_default();

    html! {
        form
            method="get"
            action=(endpoints::TRANSACTIONS_VIEW)
            class="grid grid-cols-2 md:grid-cols-6 gap-2 w-full mb-4 items-end"
        {
            div
            {
                label for="type" class=(FORM_LABEL_STYLE) { "Type" }
                select name="type" id="type" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" { "All" }
                    @for transaction_type in [TransactionType::Income, TransactionType::Expense] {
                        option
                            value=(transaction_type.as_str())
                            selected[selected_type == transaction_type.as_str()]
                        {
                            (transaction_type)
                        }
                    }
                }
            }

            div
            {
                label for="category" class=(FORM_LABEL_STYLE) { "Category" }
                select name="category" id="category" class=(FORM_TEXT_INPUT_STYLE)
                {
                    option value="" { "All" }
                    @for category in EXPENSE_CATEGORIES.iter().chain(INCOME_TYPES) {
                        option
                            value=(category.key)
                            selected[selected_category == category.key]
                        {
                            (category.icon) " " (category.name)
                        }
                    }
                }
            }

            div
            {
                label for="start_date" class=(FORM_LABEL_STYLE) { "From" }
                input
                    type="date"
                    name="start_date"
                    id="start_date"
                    value=[query.start_date.as_deref()]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="end_date" class=(FORM_LABEL_STYLE) { "To" }
                input
                    type="date"
                    name="end_date"
                    id="end_date"
                    value=[query.end_date.as_deref()]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="search" class=(FORM_LABEL_STYLE) { "Search" }
                input
                    type="search"
                    name="search"
                    id="search"
                    placeholder="Description or notes"
                    value=[query.search.as_deref()]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" class=(BUTTON_SECONDARY_STYLE) { "Filter" }
        }
    }
}

fn transaction_row(transaction: &Transaction) -> Markup {
    let category = transaction.category_info();
    let detail_url = format_endpoint(endpoints::TRANSACTION_VIEW, transaction.id);

    html! {
        tr class=(TABLE_ROW_STYLE)
        {
            td class=(TABLE_CELL_STYLE) { (transaction.date) }
            td class=(TABLE_CELL_STYLE) { (link(&detail_url, &transaction.description)) }
            td class=(TABLE_CELL_STYLE) { (category.icon) " " (category.name) }
            td class=(TABLE_CELL_STYLE) { (transaction_type_badge(transaction.transaction_type)) }
            td class={ (TABLE_CELL_STYLE) " text-right" }
            {
                (amount_span(transaction.amount_cents, transaction.currency))
            }
        }
    }
}

/// A table of transactions linking to their detail pages.
pub(crate) fn transactions_table(transactions: &[Transaction]) -> Markup {
    html! {
        div class="overflow-x-auto rounded shadow"
        {
            table class="w-full text-sm text-left"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                        th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Amount" }
                    }
                }

                tbody
                {
                    @for transaction in transactions {
                        (transaction_row(transaction))
                    }
                }
            }
        }
    }
}

fn transactions_view(
    transactions: &[Transaction],
    query: &TransactionListQuery,
    pagination: &Pagination,
    max_pages: u64,
    base_currency: Currency,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html();
    let totals = PageTotals::from_transactions(transactions);
    let indicators = create_pagination_indicators(pagination.page, pagination.pages, max_pages);
    let page_url = |page| format!("{}?{}", endpoints::TRANSACTIONS_VIEW, query.to_query_string(page));

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-5xl"
            {
                div class="flex justify-between items-center mb-4"
                {
                    h2 class="text-xl font-bold" { "Transactions" }

                    div class="flex gap-4 text-sm"
                    {
                        (link(endpoints::NEW_INCOME_VIEW, "Add income"))
                        (link(endpoints::NEW_EXPENSE_VIEW, "Add expense"))
                    }
                }

                (filter_form(query))

                div class="grid grid-cols-2 md:grid-cols-3 gap-4 mb-4"
                {
                    (stat_card("Income on this page", &amount_span(totals.income_cents, base_currency)))
                    (stat_card("Expenses on this page", &amount_span(-totals.expense_cents, base_currency)))
                    (stat_card("Matching transactions", &html! { (pagination.total) }))
                }

                @if transactions.is_empty() {
                    p class="text-center text-gray-500 dark:text-gray-400 my-8"
                    {
                        "No transactions found."
                    }
                } @else {
                    (transactions_table(transactions))

                    (pagination_nav(&indicators, page_url))
                }
            }
        }
    };

    base("Transactions", &[], &content)
}

/// Renders a page of transactions matching the filters in the query string.
pub async fn get_transactions_page(
    State(state): State<TransactionsPageState>,
    Query(query): Query<TransactionListQuery>,
) -> Result<Response, Error> {
    let (page, per_page) = state
        .pagination_config
        .resolve(query.page, query.per_page);
    let mut filter = query.to_filter()?;

    let (transactions, pagination) = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let total = count_transactions(&filter, &connection)?;
        let pagination = Pagination::new(page, per_page, u64::from(total));
        filter.limit = Some(per_page);
        filter.offset = pagination.offset();

        (get_transactions(&filter, &connection)?, pagination)
    };

    Ok(transactions_view(
        &transactions,
        &query,
        &pagination,
        state.pagination_config.max_pages,
        state.ledger_config.base_currency,
    )
    .into_response())
}
