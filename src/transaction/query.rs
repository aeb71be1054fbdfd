//! The query parameters for listing transactions, shared by the transactions
//! page and the JSON API.

use serde::Deserialize;
use time::{Date, macros::format_description};

use crate::{Error, category::TransactionType, transaction::core::TransactionFilter};

/// The filters and page for a list of transactions.
///
/// Every field is optional and empty strings count as missing, since the
/// filter form on the transactions page submits every input.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransactionListQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub category: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub search: Option<String>,
}

impl TransactionListQuery {
    /// Build the filter for active transactions matching the query, without
    /// a limit or offset.
    ///
    /// # Errors
    /// Returns [Error::InvalidTransactionType] or [Error::InvalidRequest] if
    /// the type or a date cannot be parsed.
    pub fn to_filter(&self) -> Result<TransactionFilter, Error> {
        let transaction_type = non_empty(&self.transaction_type)
            .map(str::parse::<TransactionType>)
            .transpose()?;

        Ok(TransactionFilter {
            start_date: parse_date(non_empty(&self.start_date), "start_date")?,
            end_date: parse_date(non_empty(&self.end_date), "end_date")?,
            category: non_empty(&self.category).map(str::to_owned),
            transaction_type,
            search: non_empty(&self.search).map(str::to_owned),
            ..Default::default()
        })
    }

    /// The query string for these filters on another page, e.g. "type=income&page=2".
    pub fn to_query_string(&self, page: u64) -> String {
        let mut pairs: Vec<(&str, String)> = Vec::new();

        for (key, value) in [
            ("type", &self.transaction_type),
            ("category", &self.category),
            ("start_date", &self.start_date),
            ("end_date", &self.end_date),
            ("search", &self.search),
        ] {
            if let Some(value) = non_empty(value) {
                pairs.push((key, value.to_owned()));
            }
        }

        if let Some(per_page) = self.per_page {
            pairs.push(("per_page", per_page.to_string()));
        }

        pairs.push(("page", page.to_string()));

        serde_urlencoded::to_string(pairs).unwrap_or_default()
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Parse a date in the format "YYYY-MM-DD".
pub fn parse_date(value: Option<&str>, field: &str) -> Result<Option<Date>, Error> {
    let Some(value) = value else {
        return Ok(None);
    };

    Date::parse(value, format_description!("[year]-[month]-[day]"))
        .map(Some)
        .map_err(|_| {
            Error::InvalidRequest(format!("{field} must be a date like 2025-01-31, got \"{value}\""))
        })
}
