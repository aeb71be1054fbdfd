//! The settings page: accounts, exchange rate sources, recently stored rates
//! and database statistics.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    account::{Account, account_balance, get_all_accounts},
    config::LedgerConfig,
    currency::{format_cents, format_money},
    endpoints,
    exchange::{ExchangeRate, ExchangeRateService, count_exchange_rates},
    html::{
        BUTTON_SECONDARY_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE,
        TABLE_ROW_STYLE, base, loading_spinner,
    },
    navigation::NavBar,
    transaction::{TransactionFilter, count_transactions},
};

/// How many of the latest stored rates are listed.
const RECENT_RATE_COUNT: u32 = 10;

/// The state needed for the settings page.
#[derive(Debug, Clone)]
pub struct SettingsState {
    pub db_connection: Arc<Mutex<Connection>>,
    pub exchange_rates: Arc<ExchangeRateService>,
    pub ledger_config: LedgerConfig,
}

impl FromRef<AppState> for SettingsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            exchange_rates: state.exchange_rates.clone(),
            ledger_config: state.ledger_config.clone(),
        }
    }
}

/// Row counts for the main tables.
#[derive(Debug, Default, PartialEq, Eq)]
struct DatabaseStats {
    active_transactions: u32,
    all_transactions: u32,
    exchange_rates: u32,
    accounts: usize,
}

fn accounts_table(accounts: &[(Account, i64)]) -> Markup {
    html! {
        div class="overflow-x-auto rounded shadow mb-6"
        {
            table class="w-full text-sm text-left"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Name" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Currency" }
                        th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Balance" }
                    }
                }

                tbody
                {
                    @for (account, balance) in accounts {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td class=(TABLE_CELL_STYLE)
                            {
                                (account.name)
                                @if !account.is_active {
                                    " (inactive)"
                                }
                            }
                            td class=(TABLE_CELL_STYLE) { (account.account_type) }
                            td class=(TABLE_CELL_STYLE) { (account.currency.code()) }
                            td class={ (TABLE_CELL_STYLE) " text-right" }
                            {
                                (format_cents(*balance, account.currency))
                            }
                        }
                    }
                }
            }
        }
    }
}

fn rates_table(rates: &[ExchangeRate]) -> Markup {
    html! {
        div class="overflow-x-auto rounded shadow mb-6"
        {
            table class="w-full text-sm text-left"
            {
                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Pair" }
                        th scope="col" class={ (TABLE_CELL_STYLE) " text-right" } { "Rate" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Source" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Fetched" }
                    }
                }

                tbody
                {
                    @for rate in rates {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td class=(TABLE_CELL_STYLE) { (rate.pair()) }
                            td class={ (TABLE_CELL_STYLE) " text-right" }
                            {
                                (format_money(rate.rate, rate.to_currency))
                            }
                            td class=(TABLE_CELL_STYLE) { (rate.source) }
                            td class=(TABLE_CELL_STYLE)
                            {
                                (rate.created_at.date()) " "
                                (format!("{:02}:{:02}", rate.created_at.hour(), rate.created_at.minute()))
                            }
                        }
                    }
                }
            }
        }
    }
}

fn settings_view(
    accounts: &[(Account, i64)],
    rates: &[ExchangeRate],
    sources: &[&str],
    stats: &DatabaseStats,
    ledger_config: &LedgerConfig,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::SETTINGS_VIEW).into_html();

    let content = html! {
        (nav_bar)

        div class=(PAGE_CONTAINER_STYLE)
        {
            div class="w-full max-w-5xl"
            {
                h2 class="text-xl font-bold mb-4" { "Settings" }

                dl class="grid grid-cols-2 md:grid-cols-4 gap-4 mb-6"
                {
                    div
                    {
                        dt class="text-sm text-gray-500 dark:text-gray-400" { "Base currency" }
                        dd class="font-semibold" { (ledger_config.base_currency.code()) }
                    }
                    div
                    {
                        dt class="text-sm text-gray-500 dark:text-gray-400" { "Default income currency" }
                        dd class="font-semibold" { (ledger_config.default_income_currency.code()) }
                    }
                    div
                    {
                        dt class="text-sm text-gray-500 dark:text-gray-400" { "Default expense currency" }
                        dd class="font-semibold" { (ledger_config.default_expense_currency.code()) }
                    }
                    div
                    {
                        dt class="text-sm text-gray-500 dark:text-gray-400" { "Rate sources" }
                        dd class="font-semibold" { (sources.join(" → ")) }
                    }
                }

                h3 class="text-lg font-semibold mb-2" { "Accounts" }
                (accounts_table(accounts))

                div class="flex justify-between items-baseline mb-2"
                {
                    h3 class="text-lg font-semibold" { "Latest exchange rates" }

                    div class="w-48"
                    {
                        button
                            hx-post=(endpoints::UPDATE_RATES_API)
                            hx-swap="none"
                            hx-indicator="#indicator"
                            hx-on--after-request="window.location.reload()"
                            class=(BUTTON_SECONDARY_STYLE)
                        {
                            span id="indicator" class="inline htmx-indicator"
                            {
                                (loading_spinner())
                            }
                            " Update rates"
                        }
                    }
                }

                @if rates.is_empty() {
                    p class="text-gray-500 dark:text-gray-400 mb-6" { "No exchange rates stored yet." }
                } @else {
                    (rates_table(rates))
                }

                h3 class="text-lg font-semibold mb-2" { "Database" }
                ul class="text-sm space-y-1"
                {
                    li { "Active transactions: " (stats.active_transactions) }
                    li { "Deleted transactions: " (stats.all_transactions - stats.active_transactions) }
                    li { "Stored exchange rates: " (stats.exchange_rates) }
                    li { "Accounts: " (stats.accounts) }
                }
            }
        }
    };

    base("Settings", &[], &content)
}

/// Renders the settings page.
pub async fn get_settings_page(State(state): State<SettingsState>) -> Result<Response, Error> {
    // The service takes the database lock itself.
    let rates = state.exchange_rates.recent_rates(RECENT_RATE_COUNT)?;
    let sources = state.exchange_rates.source_names();

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let accounts = get_all_accounts(&connection)?
        .into_iter()
        .map(|account| {
            let balance = account_balance(account.id, None, &connection)?;
            Ok((account, balance))
        })
        .collect::<Result<Vec<_>, Error>>()?;

    let stats = DatabaseStats {
        active_transactions: count_transactions(&TransactionFilter::default(), &connection)?,
        all_transactions: count_transactions(
            &TransactionFilter {
                include_inactive: true,
                ..Default::default()
            },
            &connection,
        )?,
        exchange_rates: count_exchange_rates(&connection)?,
        accounts: accounts.len(),
    };

    Ok(settings_view(&accounts, &rates, &sources, &stats, &state.ledger_config).into_response())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::extract::State;
    use scraper::Selector;

    use crate::{
        TransactionType,
        currency::Currency,
        settings_page::{SettingsState, get_settings_page},
        test_utils::{assert_status_ok, assert_valid_html, parse_html_document},
        transaction::{TransactionDraft, get_test_service},
    };

    #[tokio::test]
    async fn lists_accounts_rates_and_stats() {
        let service = get_test_service();
        let created = service
            .create(
                TransactionDraft::new(TransactionType::Expense, 40_000.0, "Taxi", "transport")
                    .currency(Currency::Cop),
            )
            .await
            .unwrap();
        service
            .create(TransactionDraft::new(TransactionType::Expense, 5.0, "Gum", "food"))
            .await
            .unwrap();
        service.delete(created.transaction.id, false).unwrap();
        let state = SettingsState {
            db_connection: Arc::clone(&service.db_connection),
            exchange_rates: Arc::clone(&service.exchange_rates),
            ledger_config: service.ledger_config.clone(),
        };

        let response = get_settings_page(State(state)).await.unwrap();

        assert_status_ok(&response);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let text = document.root_element().text().collect::<String>();
        assert!(text.contains("Cash COP"), "{text}");
        assert!(text.contains("COP_USD"), "{text}");
        assert!(text.contains("Active transactions: 1"), "{text}");
        assert!(text.contains("Deleted transactions: 1"), "{text}");
        assert!(text.contains("Rate sources") && text.contains("fixed"), "{text}");
        let update_button = Selector::parse("button[hx-post='/api/exchange-rates/update']").unwrap();
        assert!(document.select(&update_button).next().is_some());
    }
}
