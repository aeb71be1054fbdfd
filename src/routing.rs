//! Application router configuration for the HTML pages, widgets and JSON API.

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    budget::{create_budget_api, list_budgets_api},
    catalog::{categories_api, categories_by_type_api, currencies_api},
    dashboard::get_dashboard_page,
    endpoints,
    exchange::{
        convert_api, convert_widget, current_rate_api, exchange_rates_widget, rate_history_api,
        update_rates_api,
    },
    export::export_api,
    internal_server_error::get_internal_server_error_page,
    not_found::get_404_not_found,
    report::{
        balance_stats_api, category_stats_api, get_reports_page, monthly_stats_api,
        quick_stats_widget, summary_api, trends_stats_api,
    },
    settings_page::get_settings_page,
    transaction::{
        create_expense_endpoint, create_income_endpoint, create_transaction_api,
        delete_transaction_api, delete_transaction_endpoint, edit_transaction_endpoint,
        get_edit_transaction_page, get_expenses_page, get_income_page, get_new_expense_page,
        get_new_income_page, get_transaction_api, get_transaction_page, get_transactions_page,
        list_transactions_api, quick_add_expense_api, quick_add_income_api, update_transaction_api,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let pages = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::DASHBOARD_VIEW, get(get_dashboard_page))
        .route(endpoints::INCOME_VIEW, get(get_income_page))
        .route(endpoints::EXPENSES_VIEW, get(get_expenses_page))
        .route(endpoints::REPORTS_VIEW, get(get_reports_page))
        .route(endpoints::SETTINGS_VIEW, get(get_settings_page))
        .route(endpoints::TRANSACTIONS_VIEW, get(get_transactions_page))
        .route(endpoints::NEW_INCOME_VIEW, get(get_new_income_page))
        .route(endpoints::NEW_EXPENSE_VIEW, get(get_new_expense_page))
        .route(
            endpoints::TRANSACTION_VIEW,
            get(get_transaction_page)
                .put(edit_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::EDIT_TRANSACTION_VIEW,
            get(get_edit_transaction_page),
        )
        .route(endpoints::POST_INCOME, post(create_income_endpoint))
        .route(endpoints::POST_EXPENSE, post(create_expense_endpoint))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let widgets = Router::new()
        .route(endpoints::EXCHANGE_RATES_WIDGET, get(exchange_rates_widget))
        .route(endpoints::CONVERT_WIDGET, get(convert_widget))
        .route(endpoints::QUICK_STATS_WIDGET, get(quick_stats_widget));

    let api = Router::new()
        .route(
            endpoints::TRANSACTIONS_API,
            get(list_transactions_api).post(create_transaction_api),
        )
        .route(endpoints::QUICK_ADD_INCOME_API, post(quick_add_income_api))
        .route(endpoints::QUICK_ADD_EXPENSE_API, post(quick_add_expense_api))
        .route(
            endpoints::TRANSACTION_API,
            get(get_transaction_api)
                .put(update_transaction_api)
                .delete(delete_transaction_api),
        )
        .route(endpoints::BALANCE_STATS_API, get(balance_stats_api))
        .route(endpoints::MONTHLY_STATS_API, get(monthly_stats_api))
        .route(endpoints::CATEGORY_STATS_API, get(category_stats_api))
        .route(endpoints::TRENDS_STATS_API, get(trends_stats_api))
        .route(endpoints::CURRENT_RATE_API, get(current_rate_api))
        .route(endpoints::CONVERT_API, post(convert_api))
        .route(endpoints::RATE_HISTORY_API, get(rate_history_api))
        .route(endpoints::UPDATE_RATES_API, post(update_rates_api))
        .route(endpoints::EXPORT_API, get(export_api))
        .route(endpoints::SUMMARY_API, get(summary_api))
        .route(endpoints::CATEGORIES_API, get(categories_api))
        .route(endpoints::CATEGORIES_BY_TYPE_API, get(categories_by_type_api))
        .route(endpoints::CURRENCIES_API, get(currencies_api))
        .route(
            endpoints::BUDGETS_API,
            get(list_budgets_api).post(create_budget_api),
        );

    pages
        .merge(widgets)
        .merge(api)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the dashboard page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::DASHBOARD_VIEW)
}
