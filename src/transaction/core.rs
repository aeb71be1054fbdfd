//! Defines the core data model and database queries for transactions.

use rusqlite::{Connection, Row, ToSql, params_from_iter};
use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    category::{CategoryInfo, TransactionType, category_info},
    currency::{Currency, cents_to_amount, format_cents},
    database_id::{AccountId, ExchangeRateId, TransactionId},
};

/// The maximum number of characters in a transaction description.
pub const MAX_DESCRIPTION_LENGTH: usize = 255;

// ============================================================================
// MODELS
// ============================================================================

/// An expense or income, i.e. an event where money was either spent or earned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    /// When the transaction happened.
    pub date: Date,
    pub description: String,
    /// An expense category or income type key, e.g. "food" or "salary".
    pub category: String,
    pub subcategory: Option<String>,
    /// The signed amount in cents of `currency`: positive for income and
    /// negative for expenses.
    pub amount_cents: i64,
    pub currency: Currency,
    /// The signed amount in cents of the base currency, if it could be converted.
    pub amount_base_cents: Option<i64>,
    /// The stored exchange rate used for the conversion to the base currency.
    pub exchange_rate_id: Option<ExchangeRateId>,
    pub transaction_type: TransactionType,
    pub account_id: AccountId,
    /// An external reference, e.g. an invoice number.
    pub reference: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    /// Inactive transactions have been soft deleted.
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Transaction {
    /// The signed amount in units of the transaction currency.
    pub fn amount(&self) -> f64 {
        cents_to_amount(self.amount_cents)
    }

    /// The signed amount in units of the base currency.
    pub fn amount_base(&self) -> Option<f64> {
        self.amount_base_cents.map(cents_to_amount)
    }

    /// The amount without its sign, formatted in the transaction currency.
    pub fn formatted_amount(&self) -> String {
        format_cents(self.amount_cents.abs(), self.currency)
    }

    pub fn category_info(&self) -> CategoryInfo {
        category_info(self.transaction_type, &self.category)
    }
}

/// A validated transaction that is ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub date: Date,
    pub description: String,
    pub category: String,
    pub subcategory: Option<String>,
    /// Must be positive for income and negative for expenses.
    pub amount_cents: i64,
    pub currency: Currency,
    pub amount_base_cents: Option<i64>,
    pub exchange_rate_id: Option<ExchangeRateId>,
    pub transaction_type: TransactionType,
    pub account_id: AccountId,
    pub reference: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
}

/// Filters for listing transactions. The default matches every active transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionFilter {
    /// Only include transactions on or after this date.
    pub start_date: Option<Date>,
    /// Only include transactions on or before this date.
    pub end_date: Option<Date>,
    /// Only include transactions in this category.
    pub category: Option<String>,
    /// Only include income or only include expenses.
    pub transaction_type: Option<TransactionType>,
    /// Only include transactions recorded against this account.
    pub account_id: Option<AccountId>,
    /// Case-insensitive text to look for in the description and notes.
    pub search: Option<String>,
    /// Also include transactions that have been soft deleted.
    pub include_inactive: bool,
    /// The maximum number of transactions to return.
    pub limit: Option<u64>,
    /// The number of matching transactions to skip.
    pub offset: u64,
}

impl TransactionFilter {
    /// Build the WHERE clause and its parameters.
    fn where_clause(&self) -> (String, Vec<Box<dyn ToSql>>) {
        let mut conditions: Vec<&str> = Vec::new();
        let mut params: Vec<Box<dyn ToSql>> = Vec::new();

        if !self.include_inactive {
            conditions.push("is_active = 1");
        }

        if let Some(start_date) = self.start_date {
            conditions.push("date >= ?");
            params.push(Box::new(start_date));
        }

        if let Some(end_date) = self.end_date {
            conditions.push("date <= ?");
            params.push(Box::new(end_date));
        }

        if let Some(category) = &self.category {
            conditions.push("category = ?");
            params.push(Box::new(category.clone()));
        }

        if let Some(transaction_type) = self.transaction_type {
            conditions.push("transaction_type = ?");
            params.push(Box::new(transaction_type));
        }

        if let Some(account_id) = self.account_id {
            conditions.push("account_id = ?");
            params.push(Box::new(account_id));
        }

        if let Some(search) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            let pattern = format!("%{}%", search.to_lowercase());
            conditions.push("(LOWER(description) LIKE ? OR LOWER(COALESCE(notes, '')) LIKE ?)");
            params.push(Box::new(pattern.clone()));
            params.push(Box::new(pattern));
        }

        if conditions.is_empty() {
            (String::new(), params)
        } else {
            (format!("WHERE {}", conditions.join(" AND ")), params)
        }
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

const TRANSACTION_COLUMNS: &str = "id, date, description, category, subcategory, amount_cents, \
    currency, amount_base_cents, exchange_rate_id, transaction_type, account_id, reference, tags, \
    notes, is_active, created_at, updated_at";

/// Create the transaction table in the database.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                date TEXT NOT NULL,
                description TEXT NOT NULL,
                category TEXT NOT NULL,
                subcategory TEXT,
                amount_cents INTEGER NOT NULL CHECK (amount_cents != 0),
                currency TEXT NOT NULL,
                amount_base_cents INTEGER,
                exchange_rate_id INTEGER,
                transaction_type TEXT NOT NULL CHECK (transaction_type IN ('income', 'expense')),
                account_id INTEGER NOT NULL,
                reference TEXT,
                tags TEXT NOT NULL DEFAULT '[]',
                notes TEXT,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                CHECK (
                    (transaction_type = 'income' AND amount_cents > 0)
                    OR (transaction_type = 'expense' AND amount_cents < 0)
                ),
                FOREIGN KEY(exchange_rate_id) REFERENCES exchange_rate(id) ON DELETE SET NULL,
                FOREIGN KEY(account_id) REFERENCES account(id)
                )",
        (),
    )?;

    for statement in [
        "CREATE INDEX IF NOT EXISTS idx_transaction_date ON \"transaction\"(date)",
        "CREATE INDEX IF NOT EXISTS idx_transaction_type_date ON \"transaction\"(transaction_type, date)",
        "CREATE INDEX IF NOT EXISTS idx_transaction_category ON \"transaction\"(category)",
        "CREATE INDEX IF NOT EXISTS idx_transaction_account_date ON \"transaction\"(account_id, date)",
    ] {
        connection.execute(statement, ())?;
    }

    Ok(())
}

fn tags_to_json(tags: &[String]) -> String {
    serde_json::to_string(tags).unwrap_or_else(|_| "[]".to_owned())
}

/// Map a database row to a Transaction.
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    // Tags that are not a JSON list of strings are dropped rather than failing the row.
    let tags: String = row.get(12)?;
    let tags = serde_json::from_str(&tags).unwrap_or_default();

    Ok(Transaction {
        id: row.get(0)?,
        date: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        subcategory: row.get(4)?,
        amount_cents: row.get(5)?,
        currency: row.get(6)?,
        amount_base_cents: row.get(7)?,
        exchange_rate_id: row.get(8)?,
        transaction_type: row.get(9)?,
        account_id: row.get(10)?,
        reference: row.get(11)?,
        tags,
        notes: row.get(13)?,
        is_active: row.get(14)?,
        created_at: row.get(15)?,
        updated_at: row.get(16)?,
    })
}

fn map_constraint_error(error: rusqlite::Error, account_id: AccountId) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
            },
            _,
        ) => Error::InvalidAccount(account_id),
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_CHECK,
            },
            _,
        ) => Error::NonPositiveAmount,
        error => error.into(),
    }
}

/// Store a new transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::InvalidAccount] if the account ID does not refer to an account,
/// - [Error::NonPositiveAmount] if the amount is zero or its sign does not
///   match the transaction type,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn insert_transaction(
    transaction: NewTransaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let now = OffsetDateTime::now_utc();
    let account_id = transaction.account_id;

    connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" (date, description, category, subcategory, amount_cents,
                currency, amount_base_cents, exchange_rate_id, transaction_type, account_id,
                reference, tags, notes, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?14)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                transaction.date,
                transaction.description,
                transaction.category,
                transaction.subcategory,
                transaction.amount_cents,
                transaction.currency,
                transaction.amount_base_cents,
                transaction.exchange_rate_id,
                transaction.transaction_type,
                transaction.account_id,
                transaction.reference,
                tags_to_json(&transaction.tags),
                transaction.notes,
                now,
            ],
            map_transaction_row,
        )
        .map_err(|error| map_constraint_error(error, account_id))
}

/// Retrieve a transaction from the database by its `id`.
///
/// Soft deleted transactions are returned too.
///
/// # Errors
/// This function will return a:
/// - [Error::NotFound] if `id` does not refer to a valid transaction,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    let transaction = connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = :id"
        ))?
        .query_one(&[(":id", &id)], map_transaction_row)?;

    Ok(transaction)
}

/// Overwrite the editable fields of the transaction with `transaction.id`.
///
/// # Errors
/// Returns [Error::UpdateMissingTransaction] if the transaction does not exist.
pub fn save_transaction(
    transaction: &Transaction,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "UPDATE \"transaction\"
             SET date = ?1, description = ?2, category = ?3, subcategory = ?4,
                amount_cents = ?5, currency = ?6, amount_base_cents = ?7, exchange_rate_id = ?8,
                notes = ?9, updated_at = ?10
             WHERE id = ?11
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                transaction.date,
                transaction.description,
                transaction.category,
                transaction.subcategory,
                transaction.amount_cents,
                transaction.currency,
                transaction.amount_base_cents,
                transaction.exchange_rate_id,
                transaction.notes,
                OffsetDateTime::now_utc(),
                transaction.id,
            ],
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingTransaction,
            error => map_constraint_error(error, transaction.account_id),
        })
}

/// Delete a transaction. A soft delete only marks the transaction as inactive.
///
/// # Errors
/// Returns [Error::NotFound] if the transaction does not exist.
pub fn delete_transaction(
    id: TransactionId,
    permanent: bool,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = if permanent {
        connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", (id,))?
    } else {
        connection.execute(
            "UPDATE \"transaction\" SET is_active = 0, updated_at = ?2 WHERE id = ?1",
            (id, OffsetDateTime::now_utc()),
        )?
    };

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Get the transactions matching `filter`, newest first.
pub fn get_transactions(
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let (where_clause, mut params) = filter.where_clause();

    let limit = match filter.limit {
        Some(limit) => {
            params.push(Box::new(i64::try_from(limit).unwrap_or(i64::MAX)));
            params.push(Box::new(i64::try_from(filter.offset).unwrap_or(i64::MAX)));
            "LIMIT ? OFFSET ?"
        }
        None if filter.offset > 0 => {
            params.push(Box::new(i64::try_from(filter.offset).unwrap_or(i64::MAX)));
            "LIMIT -1 OFFSET ?"
        }
        None => "",
    };

    let query = format!(
        "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" {where_clause}
         ORDER BY date DESC, id DESC {limit}"
    );

    connection
        .prepare(&query)?
        .query_map(
            params_from_iter(params.iter().map(|param| param.as_ref())),
            map_transaction_row,
        )?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Count the transactions matching `filter`, ignoring its limit and offset.
pub fn count_transactions(
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<u32, Error> {
    let (where_clause, params) = filter.where_clause();

    connection
        .query_row(
            &format!("SELECT COUNT(id) FROM \"transaction\" {where_clause}"),
            params_from_iter(params.iter().map(|param| param.as_ref())),
            |row| row.get(0),
        )
        .map_err(Error::from)
}

// ============================================================================
// TESTS
// ============================================================================
