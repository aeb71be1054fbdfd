//! Dashboard module
//!
//! Provides the landing page with the balance, this month's totals compared
//! with last month, the current exchange rate, charts and recent transactions.

mod cards;
mod charts;
mod handlers;

pub(crate) use charts::{
    PageChart, category_chart, charts_head_elements, charts_view, income_expense_chart,
};
pub use handlers::get_dashboard_page;
