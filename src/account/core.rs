use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, OptionalExtension, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::Serialize;
use time::{Date, OffsetDateTime};

use crate::{Error, TransactionType, currency::Currency, database_id::AccountId};

/// The kind of an account in double-entry terms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Money you hold, e.g. cash or a bank account.
    Asset,
    /// Money you owe, e.g. a credit card.
    Liability,
    /// Where earnings come from.
    Income,
    /// Where spending goes.
    Expense,
}

impl AccountType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::Asset => "asset",
            AccountType::Liability => "liability",
            AccountType::Income => "income",
            AccountType::Expense => "expense",
        }
    }
}

impl Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asset" => Ok(AccountType::Asset),
            "liability" => Ok(AccountType::Liability),
            "income" => Ok(AccountType::Income),
            "expense" => Ok(AccountType::Expense),
            other => Err(Error::InvalidRequest(format!(
                "invalid account type \"{other}\""
            ))),
        }
    }
}

impl ToSql for AccountType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for AccountType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// Where a transaction's money is held or comes from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    /// The id for the account.
    pub id: AccountId,
    /// The unique name of the account.
    pub name: String,
    /// The kind of account.
    pub account_type: AccountType,
    /// The currency the account is kept in.
    pub currency: Currency,
    /// Optional notes about the account.
    pub description: Option<String>,
    /// Inactive accounts are hidden but keep their transactions.
    pub is_active: bool,
    /// When the account was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the account was last changed.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// The data needed to create an [Account].
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub name: String,
    pub account_type: AccountType,
    pub currency: Currency,
    pub description: Option<String>,
}

/// The accounts every new database starts with.
const DEFAULT_ACCOUNTS: [(&str, AccountType, Currency, &str); 4] = [
    (
        "Cash COP",
        AccountType::Asset,
        Currency::Cop,
        "Cash in Colombian pesos",
    ),
    (
        "Cash USD",
        AccountType::Asset,
        Currency::Usd,
        "Cash in US dollars",
    ),
    (
        "Income COP",
        AccountType::Income,
        Currency::Cop,
        "Income in Colombian pesos",
    ),
    (
        "Expenses USD",
        AccountType::Expense,
        Currency::Usd,
        "Expenses in US dollars",
    ),
];

const ACCOUNT_COLUMNS: &str =
    "id, name, account_type, currency, description, is_active, created_at, updated_at";

pub fn create_account_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS account (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            account_type TEXT NOT NULL
                CHECK (account_type IN ('asset', 'liability', 'income', 'expense')),
            currency TEXT NOT NULL,
            description TEXT,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )",
        (),
    )?;

    Ok(())
}

fn map_row_to_account(row: &Row) -> Result<Account, rusqlite::Error> {
    Ok(Account {
        id: row.get(0)?,
        name: row.get(1)?,
        account_type: row.get(2)?,
        currency: row.get(3)?,
        description: row.get(4)?,
        is_active: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Create a new account.
///
/// # Errors
/// Returns [Error::DuplicateAccountName] if an account with the same name
/// already exists, or [Error::SqlError] for any other SQL error.
pub fn create_account(account: NewAccount, connection: &Connection) -> Result<Account, Error> {
    let now = OffsetDateTime::now_utc();

    connection
        .prepare(&format!(
            "INSERT INTO account (name, account_type, currency, description, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             RETURNING {ACCOUNT_COLUMNS}"
        ))?
        .query_row(
            (
                &account.name,
                account.account_type,
                account.currency,
                &account.description,
                now,
            ),
            map_row_to_account,
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateAccountName(account.name.clone()),
            error => error.into(),
        })
}

/// Retrieve an account by its `id`.
///
/// # Errors
/// Returns [Error::NotFound] if `id` does not refer to an account.
pub fn get_account(id: AccountId, connection: &Connection) -> Result<Account, Error> {
    connection
        .prepare(&format!("SELECT {ACCOUNT_COLUMNS} FROM account WHERE id = :id"))?
        .query_one(&[(":id", &id)], map_row_to_account)
        .map_err(Error::from)
}

/// Retrieve all accounts ordered by name, active accounts first.
pub fn get_all_accounts(connection: &Connection) -> Result<Vec<Account>, Error> {
    connection
        .prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account ORDER BY is_active DESC, name ASC"
        ))?
        .query_map([], map_row_to_account)?
        .map(|maybe_account| maybe_account.map_err(Error::from))
        .collect()
}

fn get_account_by_name(name: &str, connection: &Connection) -> Result<Option<Account>, Error> {
    connection
        .prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account WHERE name = :name"
        ))?
        .query_row(&[(":name", &name)], map_row_to_account)
        .optional()
        .map_err(Error::from)
}

/// Create the default accounts that do not exist yet.
///
/// Returns the number of accounts that were created.
pub fn seed_default_accounts(connection: &Connection) -> Result<usize, Error> {
    let mut created = 0;

    for (name, account_type, currency, description) in DEFAULT_ACCOUNTS {
        if get_account_by_name(name, connection)?.is_some() {
            continue;
        }

        create_account(
            NewAccount {
                name: name.to_owned(),
                account_type,
                currency,
                description: Some(description.to_owned()),
            },
            connection,
        )?;
        created += 1;
    }

    if created > 0 {
        tracing::info!("Created {created} default accounts");
    }

    Ok(created)
}

/// Get the account that new transactions of `transaction_type` in `currency`
/// are recorded against, creating it if needed.
pub fn default_account_for(
    transaction_type: TransactionType,
    currency: Currency,
    connection: &Connection,
) -> Result<Account, Error> {
    let account_type = match transaction_type {
        TransactionType::Income => AccountType::Income,
        TransactionType::Expense => AccountType::Expense,
    };

    let existing = connection
        .prepare(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM account
             WHERE account_type = ?1 AND currency = ?2 AND is_active = 1
             ORDER BY id ASC LIMIT 1"
        ))?
        .query_row((account_type, currency), map_row_to_account)
        .optional()?;

    if let Some(account) = existing {
        return Ok(account);
    }

    let name = match transaction_type {
        TransactionType::Income => format!("Income {currency}"),
        TransactionType::Expense => format!("Expenses {currency}"),
    };

    if let Some(account) = get_account_by_name(&name, connection)? {
        return Ok(account);
    }

    tracing::info!("Creating default {account_type} account {name}");

    create_account(
        NewAccount {
            name,
            account_type,
            currency,
            description: Some(format!("Default {transaction_type} account in {currency}")),
        },
        connection,
    )
}

/// The sum of the signed amounts (in cents) of the account's active transactions.
///
/// If `as_of` is given, only transactions on or before that date are counted.
pub fn account_balance(
    id: AccountId,
    as_of: Option<Date>,
    connection: &Connection,
) -> Result<i64, Error> {
    let balance = match as_of {
        Some(date) => connection.query_row(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM \"transaction\"
             WHERE account_id = ?1 AND is_active = 1 AND date <= ?2",
            (id, date),
            |row| row.get(0),
        )?,
        None => connection.query_row(
            "SELECT COALESCE(SUM(amount_cents), 0) FROM \"transaction\"
             WHERE account_id = ?1 AND is_active = 1",
            (id,),
            |row| row.get(0),
        )?,
    };

    Ok(balance)
}
