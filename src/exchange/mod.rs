//! Exchange rates between the supported currencies.

mod api;
mod extract;
mod rate;
mod rate_table;
mod retry;
mod service;
mod sources;

pub use api::{
    convert_api, convert_widget, current_rate_api, exchange_rates_widget, rate_history_api,
    update_rates_api,
};
pub use rate::{
    ExchangeRate, count_exchange_rates, create_exchange_rate_table, get_exchange_rate,
};
pub use rate_table::RateTable;
pub use service::{ExchangeRateService, RateLookup, RateOrigin, ResolvedRate};
