//! Defines the route handler for the page showing a single transaction.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};

use crate::{
    Error,
    currency::{Currency, format_cents},
    database_id::TransactionId,
    endpoints::{self, format_endpoint},
    exchange::{ExchangeRate, get_exchange_rate},
    html::{
        BUTTON_DELETE_STYLE, PAGE_CONTAINER_STYLE, TAG_BADGE_STYLE, amount_span, base, link,
        transaction_type_badge,
    },
    navigation::NavBar,
    transaction::{core::Transaction, service::TransactionService},
};

fn detail_row(label: &str, value: &Markup) -> Markup {
    html! {
        div class="py-3 sm:grid sm:grid-cols-3 sm:gap-4"
        {
            dt class="text-sm font-medium text-gray-500 dark:text-gray-400" { (label) }
            dd class="mt-1 text-sm sm:col-span-2 sm:mt-0" { (value) }
        }
    }
}

fn transaction_detail_view(
    transaction: &Transaction,
    base_currency: Currency,
    exchange_rate: Option<&ExchangeRate>,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::TRANSACTIONS_VIEW).into_html();
    let category = transaction.category_info();
    let edit_url = format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, transaction.id);
    let delete_url = format_endpoint(endpoints::DELETE_TRANSACTION, transaction.id);
    let title = format!("Transaction #{}", transaction.id);

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-2xl"
            {
                div class="flex justify-between items-center mb-4"
                {
                    h2 class="text-xl font-bold" { (transaction.description) }
                    (transaction_type_badge(transaction.transaction_type))
                }

                dl class="divide-y divide-gray-200 dark:divide-gray-700"
                {
                    (detail_row("Amount", &amount_span(transaction.amount_cents, transaction.currency)))

                    @if transaction.currency != base_currency {
                        (detail_row(
                            &format!("Amount in {base_currency}"),
                            &html! {
                                @match transaction.amount_base_cents {
                                    Some(cents) => (amount_span(cents, base_currency)),
                                    None => { span class="text-gray-500" { "Not converted" } }
                                }
                            }
                        ))
                    }

                    @if let Some(rate) = exchange_rate {
                        (detail_row(
                            "Exchange rate",
                            &html! {
                                "1 " (rate.from_currency) " = " (rate.rate) " " (rate.to_currency)
                                br;
                                span class="text-xs text-gray-500" {
                                    "From " (rate.source) " on " (rate.date)
                                }
                            }
                        ))
                    }

                    (detail_row("Date", &html! { (transaction.date) }))
                    (detail_row("Category", &html! { (category.icon) " " (category.name) }))

                    @if let Some(subcategory) = &transaction.subcategory {
                        (detail_row("Subcategory", &html! { (subcategory) }))
                    }

                    @if let Some(reference) = &transaction.reference {
                        (detail_row("Reference", &html! { (reference) }))
                    }

                    @if !transaction.tags.is_empty() {
                        (detail_row("Tags", &html! {
                            div class="flex flex-wrap gap-1"
                            {
                                @for tag in &transaction.tags {
                                    span class=(TAG_BADGE_STYLE) { (tag) }
                                }
                            }
                        }))
                    }

                    @if let Some(notes) = &transaction.notes {
                        (detail_row("Notes", &html! { (notes) }))
                    }

                    (detail_row("Recorded", &html! { (transaction.created_at.date()) }))
                }

                @if transaction.is_active {
                    div class="flex gap-4 mt-6"
                    {
                        (link(&edit_url, "Edit"))

                        button
                            hx-delete=(delete_url)
                            hx-confirm={
                                "Are you sure you want to delete '" (transaction.description)
                                "' (" (format_cents(transaction.amount_cents.abs(), transaction.currency)) ")?"
                            }
                            hx-target-error="#alert-container"
                            class=(BUTTON_DELETE_STYLE)
                        {
                            "Delete"
                        }
                    }
                } @else {
                    p class="mt-6 text-sm text-gray-500" { "This transaction has been deleted." }
                }
            }
        }
    };

    base(&title, &[], &content)
}

/// Renders the page for a single transaction, including how it was
/// converted to the base currency.
pub async fn get_transaction_page(
    State(state): State<TransactionService>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Response, Error> {
    let transaction = state.get(transaction_id)?;

    let exchange_rate = match transaction.exchange_rate_id {
        Some(rate_id) => {
            let connection = state
                .db_connection
                .lock()
                .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
                .map_err(|_| Error::DatabaseLockError)?;

            match get_exchange_rate(rate_id, &connection) {
                Ok(rate) => Some(rate),
                Err(Error::NotFound) => None,
                Err(error) => return Err(error),
            }
        }
        None => None,
    };

    Ok(transaction_detail_view(
        &transaction,
        state.ledger_config.base_currency,
        exchange_rate.as_ref(),
    )
    .into_response())
}
