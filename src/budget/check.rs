//! Warnings for expenses that push a budget over, or close to, its limit.

use std::{
    fmt,
    sync::{Arc, Mutex},
};

use rusqlite::Connection;
use serde::Serialize;
use time::Date;

use crate::{
    Error,
    budget::core::{budget_spent_cents, get_budgets_covering, percentage_of},
    currency::{Currency, add_cents, convert_cents, format_cents},
    exchange::{ExchangeRateService, RateTable},
};

/// Budgets that are this percent used are near their limit.
const NEAR_LIMIT_PERCENTAGE: i64 = 80;

/// A warning about a budget that a new expense would affect.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BudgetWarning {
    /// The expense would take the budget over its limit.
    WillExceed {
        budget: String,
        new_total_cents: i64,
        amount_cents: i64,
        currency: Currency,
    },
    /// The expense would use more than 80% of the budget.
    NearLimit { budget: String, percentage_used: f64 },
}

impl fmt::Display for BudgetWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetWarning::WillExceed {
                budget,
                new_total_cents,
                amount_cents,
                currency,
            } => write!(
                f,
                "This expense will exceed the budget \"{budget}\" ({} of {})",
                format_cents(*new_total_cents, *currency),
                format_cents(*amount_cents, *currency)
            ),
            BudgetWarning::NearLimit {
                budget,
                percentage_used,
            } => write!(
                f,
                "You have used {percentage_used:.1}% of the budget \"{budget}\""
            ),
        }
    }
}

/// Check whether spending `amount_cents` of `currency` in `category` on `date`
/// would exceed, or come close to, an active budget.
///
/// Budgets whose currency the expense cannot be converted into are skipped.
/// Only the first warning is returned.
///
/// # Errors
/// Returns an error if the budgets cannot be read from the database.
pub async fn check_budget_limits(
    category: &str,
    amount_cents: i64,
    currency: Currency,
    date: Date,
    db_connection: &Arc<Mutex<Connection>>,
    exchange_rates: &ExchangeRateService,
) -> Result<Option<BudgetWarning>, Error> {
    let budgets = {
        let connection = lock(db_connection)?;
        get_budgets_covering(category, date, &connection)?
    };

    for budget in budgets {
        let rates = RateTable::resolve(exchange_rates, budget.currency).await;

        let Some(rate) = rates.rate(currency) else {
            tracing::debug!(
                "Skipping budget \"{}\", no {currency} to {} rate",
                budget.name,
                budget.currency
            );
            continue;
        };

        let new_amount = convert_cents(amount_cents.saturating_abs(), rate);
        let spent = {
            let connection = lock(db_connection)?;
            budget_spent_cents(&budget, &rates, &connection)?
        };
        let new_total = add_cents(spent, new_amount)?;

        if new_total > budget.amount_cents {
            return Ok(Some(BudgetWarning::WillExceed {
                budget: budget.name,
                new_total_cents: new_total,
                amount_cents: budget.amount_cents,
                currency: budget.currency,
            }));
        }

        if i128::from(new_total) * 100
            > i128::from(budget.amount_cents) * i128::from(NEAR_LIMIT_PERCENTAGE)
        {
            return Ok(Some(BudgetWarning::NearLimit {
                percentage_used: percentage_of(new_total, budget.amount_cents),
                budget: budget.name,
            }));
        }
    }

    Ok(None)
}

fn lock(
    db_connection: &Arc<Mutex<Connection>>,
) -> Result<std::sync::MutexGuard<'_, Connection>, Error> {
    db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)
}
