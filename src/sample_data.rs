//! Example income and expenses for trying out the app.

use axum::extract::FromRef;
use time::Duration;

use crate::{
    AppState, Error,
    category::TransactionType,
    currency::Currency,
    transaction::{TransactionDraft, TransactionService},
};

struct SampleTransaction {
    transaction_type: TransactionType,
    amount: f64,
    currency: Currency,
    description: &'static str,
    category: &'static str,
    days_ago: i64,
}

const fn sample(
    transaction_type: TransactionType,
    amount: f64,
    currency: Currency,
    description: &'static str,
    category: &'static str,
    days_ago: i64,
) -> SampleTransaction {
    SampleTransaction {
        transaction_type,
        amount,
        currency,
        description,
        category,
        days_ago,
    }
}

const SAMPLE_TRANSACTIONS: [SampleTransaction; 10] = [
    sample(TransactionType::Income, 2_500_000.0, Currency::Cop, "Monthly salary", "salary", 28),
    sample(TransactionType::Income, 800_000.0, Currency::Cop, "Web development freelance", "freelance", 15),
    sample(TransactionType::Income, 300_000.0, Currency::Cop, "Product sales", "sales", 4),
    sample(TransactionType::Expense, 25.5, Currency::Usd, "Restaurant lunch", "food", 2),
    sample(TransactionType::Expense, 45.0, Currency::Usd, "Weekly groceries", "food", 9),
    sample(TransactionType::Expense, 12.0, Currency::Usd, "Public transport", "transport", 1),
    sample(TransactionType::Expense, 80.0, Currency::Usd, "Internet service", "utilities", 21),
    sample(TransactionType::Expense, 15.0, Currency::Usd, "Streaming subscription", "entertainment", 12),
    sample(TransactionType::Expense, 35.0, Currency::Usd, "Medicine", "health", 6),
    sample(TransactionType::Expense, 60.0, Currency::Usd, "New clothes", "clothing", 17),
];

/// Record a month of example salary, freelance and sales income in COP and
/// everyday expenses in USD, dated over the last 30 days.
///
/// Returns the number of transactions created.
///
/// # Errors
/// Returns an error if a transaction could not be stored.
pub async fn create_sample_data(state: &AppState) -> Result<usize, Error> {
    let service = TransactionService::from_ref(state);
    let today = service.today()?;

    for sample in &SAMPLE_TRANSACTIONS {
        let draft = TransactionDraft::new(
            sample.transaction_type,
            sample.amount,
            sample.description,
            sample.category,
        )
        .currency(sample.currency)
        .date(today - Duration::days(sample.days_ago));

        let created = service.create(draft).await?;
        tracing::debug!(
            "created sample {} #{}",
            sample.transaction_type,
            created.transaction.id
        );
    }

    tracing::info!("created {} sample transactions", SAMPLE_TRANSACTIONS.len());

    Ok(SAMPLE_TRANSACTIONS.len())
}

#[cfg(test)]
mod tests {
    use axum::extract::FromRef;
    use rusqlite::Connection;

    use crate::{
        AppState, PaginationConfig, TransactionFilter,
        config::{ExchangeRateConfig, LedgerConfig},
        currency::{Currency, CurrencyPair},
        sample_data::create_sample_data,
        transaction::TransactionService,
    };

    fn get_test_state() -> AppState {
        AppState::new(
            Connection::open_in_memory().unwrap(),
            "Etc/UTC",
            PaginationConfig::default(),
            LedgerConfig::default(),
            &ExchangeRateConfig::fixed(vec![(
                CurrencyPair::new(Currency::Usd, Currency::Cop),
                4000.0,
            )]),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn creates_income_and_expenses() {
        let state = get_test_state();

        let count = create_sample_data(&state).await.unwrap();

        let service = TransactionService::from_ref(&state);
        let transactions = service.list(&TransactionFilter::default()).unwrap();
        assert_eq!(count, 10);
        assert_eq!(transactions.len(), 10);
        let income: Vec<_> = transactions
            .iter()
            .filter(|transaction| transaction.amount_cents > 0)
            .collect();
        assert_eq!(income.len(), 3);
        assert!(income.iter().all(|t| t.currency == Currency::Cop));
    }

    #[tokio::test]
    async fn converts_income_to_base_currency() {
        let state = get_test_state();

        create_sample_data(&state).await.unwrap();

        let service = TransactionService::from_ref(&state);
        let salary = service
            .list(&TransactionFilter::default())
            .unwrap()
            .into_iter()
            .find(|transaction| transaction.category == "salary")
            .unwrap();
        // 2,500,000 COP at 4,000 COP per USD.
        assert_eq!(salary.amount_base_cents, Some(62_500));
    }
}
