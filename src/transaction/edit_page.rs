//! Defines the route handler for the page for editing a transaction.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use time::Date;

use crate::{
    Error,
    database_id::TransactionId,
    endpoints::{self, format_endpoint},
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, base, link, loading_spinner},
    navigation::NavBar,
    transaction::{
        core::Transaction,
        form::{TransactionFormDefaults, transaction_form_fields},
        service::TransactionService,
    },
};

fn edit_transaction_view(transaction: &Transaction, max_date: Date) -> Markup {
    let nav_bar = NavBar::new(endpoints::EDIT_TRANSACTION_VIEW).into_html();
    let put_endpoint = format_endpoint(endpoints::PUT_TRANSACTION, transaction.id);
    let detail_endpoint = format_endpoint(endpoints::TRANSACTION_VIEW, transaction.id);
    let fields = transaction_form_fields(&TransactionFormDefaults {
        transaction_type: transaction.transaction_type,
        amount: Some(transaction.amount()),
        currency: transaction.currency,
        date: transaction.date,
        max_date,
        description: Some(&transaction.description),
        category: Some(&transaction.category),
        subcategory: transaction.subcategory.as_deref(),
        notes: transaction.notes.as_deref(),
        show_reference_and_tags: false,
        autofocus_amount: false,
    });

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            form
                hx-put=(put_endpoint)
                hx-target-error="#alert-container"
                class="w-full space-y-4 md:space-y-6"
            {
                h2 class="text-xl font-bold" { "Edit Transaction" }

                (fields)

                button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
                {
                    span
                        id="indicator"
                        class="inline htmx-indicator"
                    {
                        (loading_spinner())
                    }
                    " Update Transaction"
                }

                p class="text-sm text-center" { (link(&detail_endpoint, "Cancel")) }
            }
        }
    };

    base("Edit Transaction", &[], &content)
}

/// Renders the page for editing a transaction.
///
/// Deleted transactions cannot be edited and give a 404 page.
pub async fn get_edit_transaction_page(
    State(state): State<TransactionService>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Response, Error> {
    let transaction = state.get(transaction_id)?;

    if !transaction.is_active {
        return Err(Error::NotFound);
    }

    let max_date = state.today()?;

    Ok(edit_transaction_view(&transaction, max_date).into_response())
}
