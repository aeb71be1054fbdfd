//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/transactions/{transaction_id}', use [format_endpoint].

/// The root route which redirects to the dashboard.
pub const ROOT: &str = "/";
/// The landing page with balances, trends and recent transactions.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The page summarising recent income.
pub const INCOME_VIEW: &str = "/income";
/// The page summarising recent expenses.
pub const EXPENSES_VIEW: &str = "/expenses";
/// The page with totals per currency, category analysis and trends.
pub const REPORTS_VIEW: &str = "/reports";
/// The page listing accounts, recent exchange rates and database statistics.
pub const SETTINGS_VIEW: &str = "/settings";
/// The page for displaying and filtering transactions.
pub const TRANSACTIONS_VIEW: &str = "/transactions";
/// The page for recording income.
pub const NEW_INCOME_VIEW: &str = "/transactions/income/new";
/// The page for recording an expense.
pub const NEW_EXPENSE_VIEW: &str = "/transactions/expense/new";
/// The page showing a single transaction.
pub const TRANSACTION_VIEW: &str = "/transactions/{transaction_id}";
/// The page for editing a transaction.
pub const EDIT_TRANSACTION_VIEW: &str = "/transactions/{transaction_id}/edit";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The form endpoint for recording income.
pub const POST_INCOME: &str = "/transactions/income";
/// The form endpoint for recording an expense.
pub const POST_EXPENSE: &str = "/transactions/expense";
/// The form endpoint for updating a transaction.
pub const PUT_TRANSACTION: &str = "/transactions/{transaction_id}";
/// The endpoint for deleting a transaction from the web pages.
pub const DELETE_TRANSACTION: &str = "/transactions/{transaction_id}";

/// The current USD/COP rates as JSON, used by page widgets.
pub const EXCHANGE_RATES_WIDGET: &str = "/exchange-rates";
/// Convert an amount between currencies, used by page widgets.
pub const CONVERT_WIDGET: &str = "/convert";
/// Today's totals as JSON, used by page widgets.
pub const QUICK_STATS_WIDGET: &str = "/quick-stats";

/// The route to list and create transactions.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The route to access a single transaction.
pub const TRANSACTION_API: &str = "/api/transactions/{transaction_id}";
/// Record income in the default income currency.
pub const QUICK_ADD_INCOME_API: &str = "/api/transactions/quick-add-income";
/// Record an expense in the default expense currency.
pub const QUICK_ADD_EXPENSE_API: &str = "/api/transactions/quick-add-expense";
/// The balance summary.
pub const BALANCE_STATS_API: &str = "/api/stats/balance";
/// The summary for a single month.
pub const MONTHLY_STATS_API: &str = "/api/stats/monthly";
/// Expenses broken down by category.
pub const CATEGORY_STATS_API: &str = "/api/stats/categories";
/// Monthly summaries for the last few months.
pub const TRENDS_STATS_API: &str = "/api/stats/trends";
/// The current exchange rate between two currencies.
pub const CURRENT_RATE_API: &str = "/api/exchange-rates/current";
/// Convert an amount between currencies.
pub const CONVERT_API: &str = "/api/exchange-rates/convert";
/// The stored history of an exchange rate.
pub const RATE_HISTORY_API: &str = "/api/exchange-rates/history";
/// Refresh every exchange rate from the online sources.
pub const UPDATE_RATES_API: &str = "/api/exchange-rates/update";
/// Export transactions as JSON or CSV.
pub const EXPORT_API: &str = "/api/reports/export";
/// The financial summary for the current month, quarter or year.
pub const SUMMARY_API: &str = "/api/reports/summary";
/// The expense categories and income types.
pub const CATEGORIES_API: &str = "/api/config/categories";
/// The categories for one transaction type.
pub const CATEGORIES_BY_TYPE_API: &str = "/api/config/categories/{transaction_type}";
/// The supported currencies.
pub const CURRENCIES_API: &str = "/api/config/currencies";
/// The route to list and create budgets.
pub const BUDGETS_API: &str = "/api/budgets";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/transactions/{transaction_id}', '{transaction_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map(|end| param_start + end + 1)
        .unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

// These tests are here so that we know when we call `Uri::from_shared` it will not panic.
#[cfg(test)]
mod endpoints_tests {
    use axum::http::Uri;

    use crate::endpoints;

    use super::format_endpoint;

    fn assert_endpoint_is_valid_uri(uri: &str) {
        assert!(uri.parse::<Uri>().is_ok(), "{uri} is not a valid URI");
    }

    #[test]
    fn endpoints_are_valid_uris() {
        for endpoint in [
            endpoints::ROOT,
            endpoints::DASHBOARD_VIEW,
            endpoints::INCOME_VIEW,
            endpoints::EXPENSES_VIEW,
            endpoints::REPORTS_VIEW,
            endpoints::SETTINGS_VIEW,
            endpoints::TRANSACTIONS_VIEW,
            endpoints::NEW_INCOME_VIEW,
            endpoints::NEW_EXPENSE_VIEW,
            endpoints::TRANSACTION_VIEW,
            endpoints::EDIT_TRANSACTION_VIEW,
            endpoints::INTERNAL_ERROR_VIEW,
            endpoints::STATIC,
            endpoints::POST_INCOME,
            endpoints::POST_EXPENSE,
            endpoints::PUT_TRANSACTION,
            endpoints::DELETE_TRANSACTION,
            endpoints::EXCHANGE_RATES_WIDGET,
            endpoints::CONVERT_WIDGET,
            endpoints::QUICK_STATS_WIDGET,
            endpoints::TRANSACTIONS_API,
            endpoints::TRANSACTION_API,
            endpoints::QUICK_ADD_INCOME_API,
            endpoints::QUICK_ADD_EXPENSE_API,
            endpoints::BALANCE_STATS_API,
            endpoints::MONTHLY_STATS_API,
            endpoints::CATEGORY_STATS_API,
            endpoints::TRENDS_STATS_API,
            endpoints::CURRENT_RATE_API,
            endpoints::CONVERT_API,
            endpoints::RATE_HISTORY_API,
            endpoints::UPDATE_RATES_API,
            endpoints::EXPORT_API,
            endpoints::SUMMARY_API,
            endpoints::CATEGORIES_API,
            endpoints::CATEGORIES_BY_TYPE_API,
            endpoints::CURRENCIES_API,
            endpoints::BUDGETS_API,
        ] {
            assert_endpoint_is_valid_uri(endpoint);
        }
    }

    #[test]
    fn produces_valid_uri() {
        let formatted_path = format_endpoint("/hello/{world_id}", 1);

        assert_eq!(formatted_path, "/hello/1");
        assert!(formatted_path.parse::<Uri>().is_ok());

        let formatted_path = format_endpoint(endpoints::EDIT_TRANSACTION_VIEW, 42);

        assert_eq!(formatted_path, "/transactions/42/edit");
        assert!(formatted_path.parse::<Uri>().is_ok());
    }

    #[test]
    fn returns_original_path_with_no_parameter() {
        let formatted_path = format_endpoint("/hello/world", 1);

        assert_eq!(formatted_path, "/hello/world");
    }
}
