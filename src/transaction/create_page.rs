//! Defines the route handlers for the pages for recording income and expenses.

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use time::Date;

use crate::{
    AppState, Error,
    category::TransactionType,
    config::LedgerConfig,
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, FORM_CONTAINER_STYLE, base, loading_spinner},
    navigation::NavBar,
    timezone::local_today,
    transaction::form::{TransactionFormDefaults, transaction_form_fields},
};

/// The state needed for the new income and expense pages.
#[derive(Debug, Clone)]
pub struct NewTransactionPageState {
    /// The local timezone as a canonical timezone name, e.g. "America/Bogota".
    pub local_timezone: String,
    /// Sets the currency that is preselected.
    pub ledger_config: LedgerConfig,
}

impl FromRef<AppState> for NewTransactionPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            local_timezone: state.local_timezone.clone(),
            ledger_config: state.ledger_config.clone(),
        }
    }
}

fn new_transaction_view(
    transaction_type: TransactionType,
    today: Date,
    ledger_config: &LedgerConfig,
) -> Markup {
    let (title, page_endpoint, post_endpoint) = match transaction_type {
        TransactionType::Income => ("New Income", endpoints::NEW_INCOME_VIEW, endpoints::POST_INCOME),
        TransactionType::Expense => (
            "New Expense",
            endpoints::NEW_EXPENSE_VIEW,
            endpoints::POST_EXPENSE,
        ),
    };
    let nav_bar = NavBar::new(page_endpoint).into_html();
    let fields = transaction_form_fields(&TransactionFormDefaults {
        transaction_type,
        amount: None,
        currency: ledger_config.default_currency(transaction_type),
        date: today,
        max_date: today,
        description: None,
        category: None,
        subcategory: None,
        notes: None,
        show_reference_and_tags: true,
        autofocus_amount: true,
    });

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            form
                hx-post=(post_endpoint)
                hx-target-error="#alert-container"
                class="w-full space-y-4 md:space-y-6"
            {
                h2 class="text-xl font-bold" { (title) }

                (fields)

                button type="submit" id="submit-button" tabindex="0" class=(BUTTON_PRIMARY_STYLE)
                {
                    span
                        id="indicator"
                        class="inline htmx-indicator"
                    {
                        (loading_spinner())
                    }
                    " Save"
                }
            }
        }
    };

    base(title, &[], &content)
}

async fn new_transaction_page(
    transaction_type: TransactionType,
    state: NewTransactionPageState,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;

    Ok(new_transaction_view(transaction_type, today, &state.ledger_config).into_response())
}

/// Renders the page for recording income.
pub async fn get_new_income_page(
    State(state): State<NewTransactionPageState>,
) -> Result<Response, Error> {
    new_transaction_page(TransactionType::Income, state).await
}

/// Renders the page for recording an expense.
pub async fn get_new_expense_page(
    State(state): State<NewTransactionPageState>,
) -> Result<Response, Error> {
    new_transaction_page(TransactionType::Expense, state).await
}
