//! Income and expense transactions.
//!
//! This module contains everything related to transactions:
//! - The `Transaction` model and the database functions for storing and querying it
//! - `TransactionService`, which validates input and converts amounts to the base currency
//! - View handlers for the transaction pages and the JSON API

mod api;
mod core;
mod create_endpoint;
mod create_page;
mod delete_endpoint;
mod edit_endpoint;
mod edit_page;
mod form;
mod overview_page;
mod query;
mod service;
mod transactions_page;
mod view;

pub use api::{
    create_transaction_api, delete_transaction_api, get_transaction_api, list_transactions_api,
    quick_add_expense_api, quick_add_income_api, update_transaction_api,
};
pub use core::{
    Transaction, TransactionFilter, count_transactions, create_transaction_table,
    get_transactions,
};
#[cfg(test)]
pub(crate) use core::{NewTransaction, insert_transaction};
pub use create_endpoint::{create_expense_endpoint, create_income_endpoint};
pub use create_page::{get_new_expense_page, get_new_income_page};
pub use delete_endpoint::delete_transaction_endpoint;
pub use edit_endpoint::edit_transaction_endpoint;
pub use edit_page::get_edit_transaction_page;
pub use overview_page::{get_expenses_page, get_income_page};
pub use query::parse_date;
pub use service::{TransactionDraft, TransactionService};
pub use transactions_page::get_transactions_page;
pub(crate) use transactions_page::transactions_table;
pub use view::get_transaction_page;

#[cfg(test)]
pub(crate) use service::tests::get_test_service;
