//! Exporting transactions as JSON or CSV.

use std::io;

use axum::{
    Json,
    extract::{Query, State, rejection::QueryRejection},
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, format_description::well_known::Rfc3339};

use crate::{
    Error,
    api_error::{ApiData, ApiError},
    category::TransactionType,
    currency::{Currency, cents_to_amount},
    transaction::{Transaction, TransactionFilter, TransactionService, parse_date},
};

/// One row of a CSV export. Amounts are magnitudes, the type gives the sign.
#[derive(Debug, Serialize)]
struct CsvRecord<'a> {
    date: Date,
    #[serde(rename = "type")]
    transaction_type: TransactionType,
    category: &'a str,
    subcategory: Option<&'a str>,
    description: &'a str,
    amount: f64,
    currency: Currency,
    amount_base: Option<f64>,
    notes: Option<&'a str>,
    created_at: String,
}

impl<'a> CsvRecord<'a> {
    fn new(transaction: &'a Transaction) -> Result<Self, Error> {
        Ok(Self {
            date: transaction.date,
            transaction_type: transaction.transaction_type,
            category: &transaction.category,
            subcategory: transaction.subcategory.as_deref(),
            description: &transaction.description,
            amount: cents_to_amount(transaction.amount_cents.abs()),
            currency: transaction.currency,
            amount_base: transaction
                .amount_base_cents
                .map(|cents| cents_to_amount(cents.abs())),
            notes: transaction.notes.as_deref(),
            created_at: transaction
                .created_at
                .format(&Rfc3339)
                .map_err(|error| Error::SerializationError(error.to_string()))?,
        })
    }
}

/// Write `transactions` to `writer` as CSV with the header
/// `date,type,category,subcategory,description,amount,currency,amount_base,notes,created_at`.
///
/// # Errors
/// Returns [Error::SerializationError] if a row cannot be written.
pub fn write_transactions_csv<W: io::Write>(
    transactions: &[Transaction],
    writer: W,
) -> Result<(), Error> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(writer);

    for transaction in transactions {
        writer
            .serialize(CsvRecord::new(transaction)?)
            .map_err(|error| Error::SerializationError(error.to_string()))?;
    }

    writer
        .flush()
        .map_err(|error| Error::SerializationError(error.to_string()))
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    start_date: Option<String>,
    end_date: Option<String>,
    #[serde(rename = "type")]
    transaction_type: Option<String>,
    format: Option<String>,
}

/// The filters applied to an export, echoed back in the JSON format.
#[derive(Debug, Serialize)]
pub struct ExportFilters {
    start_date: Option<Date>,
    end_date: Option<Date>,
    #[serde(rename = "type")]
    transaction_type: Option<TransactionType>,
}

#[derive(Debug, Serialize)]
pub struct JsonExport {
    #[serde(with = "time::serde::rfc3339")]
    export_date: OffsetDateTime,
    filters: ExportFilters,
    total_transactions: usize,
    transactions: Vec<Transaction>,
}

/// `GET /api/reports/export?start_date&end_date&type&format=json|csv`
///
/// The CSV format is sent as an attachment named after today's date.
pub async fn export_api(
    State(state): State<TransactionService>,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query?;
    let filters = ExportFilters {
        start_date: parse_date(non_empty(&query.start_date), "start_date")?,
        end_date: parse_date(non_empty(&query.end_date), "end_date")?,
        transaction_type: non_empty(&query.transaction_type)
            .map(str::parse::<TransactionType>)
            .transpose()
            .map_err(Error::from)?,
    };

    let transactions = state.list(&TransactionFilter {
        start_date: filters.start_date,
        end_date: filters.end_date,
        transaction_type: filters.transaction_type,
        ..Default::default()
    })?;

    match non_empty(&query.format).unwrap_or("json") {
        "csv" => {
            let mut body = Vec::new();
            write_transactions_csv(&transactions, &mut body)?;
            let filename = format!("transactions_{}.csv", state.today()?);
            tracing::info!("Exporting {} transactions to {filename}", transactions.len());

            Ok((
                [
                    (CONTENT_TYPE, "text/csv; charset=utf-8".to_owned()),
                    (
                        CONTENT_DISPOSITION,
                        format!("attachment; filename={filename}"),
                    ),
                ],
                body,
            )
                .into_response())
        }
        "json" => {
            let export: Json<ApiData<JsonExport>> = ApiData::json(JsonExport {
                export_date: OffsetDateTime::now_utc(),
                filters,
                total_transactions: transactions.len(),
                transactions,
            });

            Ok(export.into_response())
        }
        other => Err(ApiError::validation(format!(
            "unsupported export format \"{other}\", expected \"json\" or \"csv\""
        ))),
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|value| !value.is_empty())
}
