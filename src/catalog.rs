//! JSON endpoints describing the categories and currencies that transactions can use.

use axum::{
    Json,
    extract::{FromRef, Path, State},
};
use serde::Serialize;

use crate::{
    AppState, Error,
    api_error::{ApiData, ApiError},
    category::{CategoryInfo, EXPENSE_CATEGORIES, INCOME_TYPES, TransactionType},
    config::LedgerConfig,
    currency::Currency,
};

/// The state needed by the catalog endpoints.
#[derive(Debug, Clone)]
pub struct CatalogState {
    pub ledger_config: LedgerConfig,
}

impl FromRef<AppState> for CatalogState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            ledger_config: state.ledger_config.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Categories {
    expense_categories: &'static [CategoryInfo],
    income_types: &'static [CategoryInfo],
}

/// `GET /api/config/categories`
pub async fn categories_api() -> Json<ApiData<Categories>> {
    ApiData::json(Categories {
        expense_categories: EXPENSE_CATEGORIES,
        income_types: INCOME_TYPES,
    })
}

#[derive(Debug, Serialize)]
pub struct TypeCategories {
    #[serde(rename = "type")]
    transaction_type: TransactionType,
    categories: &'static [CategoryInfo],
}

/// `GET /api/config/categories/{transaction_type}`, where the type is
/// "income" or "expense".
pub async fn categories_by_type_api(
    Path(transaction_type): Path<String>,
) -> Result<Json<ApiData<TypeCategories>>, ApiError> {
    let transaction_type: TransactionType = transaction_type.parse().map_err(Error::from)?;

    Ok(ApiData::json(TypeCategories {
        transaction_type,
        categories: transaction_type.categories(),
    }))
}

#[derive(Debug, Serialize)]
pub struct CurrencyInfo {
    code: &'static str,
    name: &'static str,
    symbol: &'static str,
}

#[derive(Debug, Serialize)]
pub struct Currencies {
    currencies: Vec<CurrencyInfo>,
    default_income_currency: Currency,
    default_expense_currency: Currency,
    base_currency: Currency,
}

/// `GET /api/config/currencies`
pub async fn currencies_api(State(state): State<CatalogState>) -> Json<ApiData<Currencies>> {
    let currencies = Currency::ALL
        .iter()
        .map(|currency| CurrencyInfo {
            code: currency.code(),
            name: currency.name(),
            symbol: currency.symbol(),
        })
        .collect();

    ApiData::json(Currencies {
        currencies,
        default_income_currency: state.ledger_config.default_income_currency,
        default_expense_currency: state.ledger_config.default_expense_currency,
        base_currency: state.ledger_config.base_currency,
    })
}
