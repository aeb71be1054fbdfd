//! Budgets limit how much can be spent in an expense category over a period.

mod api;
mod check;
mod core;

pub use api::{create_budget_api, list_budgets_api};
pub use check::{BudgetWarning, check_budget_limits};
pub use core::create_budget_table;
#[cfg(test)]
pub(crate) use core::{NewBudget, create_budget};
