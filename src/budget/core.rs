//! Spending limits for an expense category over a period.

use rusqlite::{Connection, Row};
use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    category::TransactionType,
    currency::{Currency, MAX_AMOUNT, amount_to_cents, sum_cents},
    database_id::BudgetId,
    exchange::RateTable,
};

/// A limit on how much may be spent in a category between two dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Budget {
    pub id: BudgetId,
    pub name: String,
    /// The expense category the budget applies to.
    pub category: String,
    pub amount_cents: i64,
    pub currency: Currency,
    pub start_date: Date,
    pub end_date: Date,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The data for creating a budget.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBudget {
    pub name: String,
    pub category: String,
    pub amount_cents: i64,
    pub currency: Currency,
    pub start_date: Date,
    pub end_date: Date,
}

/// How much of a budget has been used.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetUsage {
    pub spent_cents: i64,
    pub remaining_cents: i64,
    pub percentage_used: f64,
}

impl BudgetUsage {
    pub fn new(budget: &Budget, spent_cents: i64) -> Self {
        Self {
            spent_cents,
            remaining_cents: budget.amount_cents - spent_cents,
            percentage_used: percentage_of(spent_cents, budget.amount_cents),
        }
    }
}

/// `part` as a percentage of `whole`, or zero if `whole` is not positive.
pub fn percentage_of(part: i64, whole: i64) -> f64 {
    if whole > 0 {
        part as f64 / whole as f64 * 100.0
    } else {
        0.0
    }
}

const BUDGET_COLUMNS: &str =
    "id, name, category, amount_cents, currency, start_date, end_date, is_active, created_at";

pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS budget (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            category TEXT NOT NULL,
            amount_cents INTEGER NOT NULL CHECK (amount_cents > 0),
            currency TEXT NOT NULL,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            CHECK (end_date > start_date)
        )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_budget_category_period
            ON budget(category, start_date, end_date)",
        (),
    )?;

    Ok(())
}

fn map_budget_row(row: &Row) -> Result<Budget, rusqlite::Error> {
    Ok(Budget {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        amount_cents: row.get(3)?,
        currency: row.get(4)?,
        start_date: row.get(5)?,
        end_date: row.get(6)?,
        is_active: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Create a budget after checking its fields.
///
/// # Errors
/// Returns [Error::InvalidBudget] if the name is empty, the amount is not
/// positive or the period ends before it starts, [Error::AmountTooLarge] if
/// the amount is above [MAX_AMOUNT], and
/// [Error::InvalidCategory] if the category is not an expense category.
pub fn create_budget(budget: NewBudget, connection: &Connection) -> Result<Budget, Error> {
    let name = budget.name.trim();

    if name.is_empty() {
        return Err(Error::InvalidBudget("the name cannot be empty".to_owned()));
    }

    if budget.amount_cents <= 0 {
        return Err(Error::InvalidBudget(
            "the amount must be greater than zero".to_owned(),
        ));
    }

    if budget.amount_cents > amount_to_cents(MAX_AMOUNT) {
        return Err(Error::AmountTooLarge);
    }

    if budget.end_date <= budget.start_date {
        return Err(Error::InvalidBudget(
            "the end date must be after the start date".to_owned(),
        ));
    }

    if !TransactionType::Expense.is_valid_category(&budget.category) {
        return Err(Error::InvalidCategory {
            transaction_type: TransactionType::Expense,
            category: budget.category,
        });
    }

    let created = connection
        .prepare(&format!(
            "INSERT INTO budget (name, category, amount_cents, currency, start_date, end_date, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING {BUDGET_COLUMNS}"
        ))?
        .query_row(
            (
                name,
                &budget.category,
                budget.amount_cents,
                budget.currency,
                budget.start_date,
                budget.end_date,
                OffsetDateTime::now_utc(),
            ),
            map_budget_row,
        )?;

    tracing::info!("Created budget \"{}\" for {}", created.name, created.category);

    Ok(created)
}

/// Get the active budgets, most recent period first.
pub fn get_active_budgets(connection: &Connection) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budget
             WHERE is_active = 1
             ORDER BY start_date DESC, id DESC"
        ))?
        .query_map([], map_budget_row)?
        .map(|maybe_budget| maybe_budget.map_err(Error::from))
        .collect()
}

/// Get the active budgets for `category` whose period includes `date`.
pub fn get_budgets_covering(
    category: &str,
    date: Date,
    connection: &Connection,
) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(&format!(
            "SELECT {BUDGET_COLUMNS} FROM budget
             WHERE is_active = 1 AND category = ?1 AND start_date <= ?2 AND end_date >= ?2
             ORDER BY id ASC"
        ))?
        .query_map((category, date), map_budget_row)?
        .map(|maybe_budget| maybe_budget.map_err(Error::from))
        .collect()
}

/// The amount spent against `budget`, in cents of the budget currency.
///
/// `rates` must convert into the budget currency.
pub fn budget_spent_cents(
    budget: &Budget,
    rates: &RateTable,
    connection: &Connection,
) -> Result<i64, Error> {
    debug_assert_eq!(rates.target(), budget.currency);

    let mut statement = connection.prepare(
        "SELECT currency, COALESCE(SUM(amount_cents), 0) FROM \"transaction\"
         WHERE is_active = 1 AND transaction_type = 'expense' AND category = ?1
            AND date >= ?2 AND date <= ?3
         GROUP BY currency",
    )?;

    let totals = statement
        .query_map(
            (&budget.category, budget.start_date, budget.end_date),
            |row| Ok((row.get::<_, Currency>(0)?, row.get::<_, i64>(1)?)),
        )?
        .collect::<Result<Vec<_>, _>>()?;

    sum_cents(
        totals
            .into_iter()
            .map(|(currency, cents)| rates.convert_cents(cents.saturating_abs(), currency)),
    )
}
