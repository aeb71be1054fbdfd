//! Recording, changing and removing transactions, including the conversion
//! to the base currency and the budget checks.

use std::sync::{Arc, Mutex, MutexGuard};

use axum::extract::FromRef;
use rusqlite::Connection;
use time::Date;

use crate::{
    AppState, Error,
    account::{default_account_for, get_account},
    budget::{BudgetWarning, check_budget_limits},
    category::TransactionType,
    config::LedgerConfig,
    currency::{Currency, MAX_AMOUNT, amount_to_cents, convert_cents},
    database_id::{AccountId, ExchangeRateId, TransactionId},
    exchange::ExchangeRateService,
    timezone::local_today,
    transaction::core::{
        MAX_DESCRIPTION_LENGTH, NewTransaction, Transaction, TransactionFilter,
        count_transactions, delete_transaction, get_transaction, get_transactions,
        insert_transaction, save_transaction,
    },
};

/// The details of a new income or expense, as entered by the user.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub transaction_type: TransactionType,
    /// The amount without a sign, e.g. 12.5 for an expense of 12.50.
    pub amount: f64,
    /// Defaults to the default currency for the transaction type.
    pub currency: Option<Currency>,
    pub description: String,
    pub category: String,
    pub subcategory: Option<String>,
    /// Defaults to today.
    pub date: Option<Date>,
    /// Defaults to the default account for the transaction type and currency.
    pub account_id: Option<AccountId>,
    pub reference: Option<String>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
}

impl TransactionDraft {
    pub fn new(
        transaction_type: TransactionType,
        amount: f64,
        description: &str,
        category: &str,
    ) -> Self {
        Self {
            transaction_type,
            amount,
            currency: None,
            description: description.to_owned(),
            category: category.to_owned(),
            subcategory: None,
            date: None,
            account_id: None,
            reference: None,
            tags: Vec::new(),
            notes: None,
        }
    }

    pub fn currency(mut self, currency: Currency) -> Self {
        self.currency = Some(currency);
        self
    }

    pub fn date(mut self, date: Date) -> Self {
        self.date = Some(date);
        self
    }
}

/// Changes to an existing transaction. `None` leaves a field as it is.
///
/// Setting the subcategory or notes to an empty string clears them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionChanges {
    pub description: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub notes: Option<String>,
    pub date: Option<Date>,
    /// The new amount without a sign. The sign follows the transaction type.
    pub amount: Option<f64>,
    pub currency: Option<Currency>,
}

/// A stored transaction and the budget warning it triggered, if any.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedTransaction {
    pub transaction: Transaction,
    pub budget_warning: Option<BudgetWarning>,
}

/// The state needed to manage transactions.
#[derive(Debug, Clone)]
pub struct TransactionService {
    pub db_connection: Arc<Mutex<Connection>>,
    pub exchange_rates: Arc<ExchangeRateService>,
    pub ledger_config: LedgerConfig,
    /// The local timezone as a canonical timezone name, e.g. "America/Bogota".
    pub local_timezone: String,
}

impl FromRef<AppState> for TransactionService {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            exchange_rates: state.exchange_rates.clone(),
            ledger_config: state.ledger_config.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

impl TransactionService {
    /// Today's date in the local timezone.
    pub fn today(&self) -> Result<Date, Error> {
        local_today(&self.local_timezone)
    }

    fn connection(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)
    }

    /// Record an income or expense.
    ///
    /// Amounts in a currency other than the base currency are converted with
    /// the current exchange rate. If no rate is available the transaction is
    /// stored without a base amount. Expenses are checked against the budgets
    /// for their category.
    ///
    /// # Errors
    /// Returns a validation error if the amount is not positive, the
    /// description is empty or too long, the category does not belong to the
    /// transaction type, the date is in the future or the account does not
    /// exist.
    pub async fn create(&self, draft: TransactionDraft) -> Result<CreatedTransaction, Error> {
        let today = self.today()?;
        let transaction_type = draft.transaction_type;
        let currency = draft
            .currency
            .unwrap_or_else(|| self.ledger_config.default_currency(transaction_type));

        let amount_cents = validate_amount(draft.amount)?;
        let description = validate_description(&draft.description)?;
        validate_category(transaction_type, &draft.category)?;

        let date = draft.date.unwrap_or(today);
        if date > today {
            return Err(Error::FutureDate(date));
        }

        let account_id = {
            let connection = self.connection()?;
            match draft.account_id {
                Some(id) => get_account(id, &connection)
                    .map_err(|error| match error {
                        Error::NotFound => Error::InvalidAccount(id),
                        error => error,
                    })?
                    .id,
                None => default_account_for(transaction_type, currency, &connection)?.id,
            }
        };

        let signed_cents = transaction_type.signed_cents(amount_cents);
        let (amount_base_cents, exchange_rate_id) =
            self.convert_to_base(signed_cents, currency).await;

        let budget_warning = match transaction_type {
            TransactionType::Expense => self
                .check_budgets(&draft.category, amount_cents, currency, date)
                .await,
            TransactionType::Income => None,
        };

        let transaction = insert_transaction(
            NewTransaction {
                date,
                description,
                category: draft.category,
                subcategory: non_empty(draft.subcategory),
                amount_cents: signed_cents,
                currency,
                amount_base_cents,
                exchange_rate_id,
                transaction_type,
                account_id,
                reference: non_empty(draft.reference),
                tags: draft
                    .tags
                    .into_iter()
                    .map(|tag| tag.trim().to_owned())
                    .filter(|tag| !tag.is_empty())
                    .collect(),
                notes: non_empty(draft.notes),
            },
            &*self.connection()?,
        )?;

        tracing::info!(
            "Created {transaction_type} #{}: {} - {}",
            transaction.id,
            transaction.formatted_amount(),
            transaction.description
        );

        Ok(CreatedTransaction {
            transaction,
            budget_warning,
        })
    }

    async fn check_budgets(
        &self,
        category: &str,
        amount_cents: i64,
        currency: Currency,
        date: Date,
    ) -> Option<BudgetWarning> {
        match check_budget_limits(
            category,
            amount_cents,
            currency,
            date,
            &self.db_connection,
            &self.exchange_rates,
        )
        .await
        {
            Ok(Some(warning)) => {
                tracing::warn!("{warning}");
                Some(warning)
            }
            Ok(None) => None,
            Err(error) => {
                tracing::error!("Could not check the budgets for {category}: {error}");
                None
            }
        }
    }

    /// Convert signed cents of `currency` into the base currency.
    async fn convert_to_base(
        &self,
        signed_cents: i64,
        currency: Currency,
    ) -> (Option<i64>, Option<ExchangeRateId>) {
        let base_currency = self.ledger_config.base_currency;

        if currency == base_currency {
            return (Some(signed_cents), None);
        }

        match self.exchange_rates.get_rate(currency, base_currency).await {
            Ok(rate) => (Some(convert_cents(signed_cents, rate.rate)), rate.record_id),
            Err(error) => {
                tracing::warn!(
                    "Could not convert {currency} to {base_currency}, \
                    storing the transaction without a base amount: {error}"
                );
                (None, None)
            }
        }
    }

    /// Apply `changes` to the transaction with `id`.
    ///
    /// The base amount is recalculated when the amount or currency changes.
    ///
    /// # Errors
    /// Returns [Error::UpdateMissingTransaction] if the transaction does not
    /// exist, or the same validation errors as [TransactionService::create].
    pub async fn update(
        &self,
        id: TransactionId,
        changes: TransactionChanges,
    ) -> Result<Transaction, Error> {
        let today = self.today()?;
        let mut transaction = {
            let connection = self.connection()?;
            get_transaction(id, &connection).map_err(|error| match error {
                Error::NotFound => Error::UpdateMissingTransaction,
                error => error,
            })?
        };

        let amount_or_currency_changed = changes.amount.is_some() || changes.currency.is_some();

        if let Some(description) = changes.description {
            transaction.description = validate_description(&description)?;
        }

        if let Some(category) = changes.category {
            validate_category(transaction.transaction_type, &category)?;
            transaction.category = category;
        }

        if let Some(subcategory) = changes.subcategory {
            transaction.subcategory = non_empty(Some(subcategory));
        }

        if let Some(notes) = changes.notes {
            transaction.notes = non_empty(Some(notes));
        }

        if let Some(date) = changes.date {
            if date > today {
                return Err(Error::FutureDate(date));
            }
            transaction.date = date;
        }

        if let Some(amount) = changes.amount {
            let amount_cents = validate_amount(amount)?;
            transaction.amount_cents = transaction.transaction_type.signed_cents(amount_cents);
        }

        if let Some(currency) = changes.currency {
            transaction.currency = currency;
        }

        if amount_or_currency_changed {
            let (amount_base_cents, exchange_rate_id) = self
                .convert_to_base(transaction.amount_cents, transaction.currency)
                .await;
            transaction.amount_base_cents = amount_base_cents;
            transaction.exchange_rate_id = exchange_rate_id;
        }

        let updated = save_transaction(&transaction, &*self.connection()?)?;
        tracing::info!("Updated transaction #{id}");

        Ok(updated)
    }

    /// Delete the transaction with `id`, marking it inactive unless `permanent`.
    pub fn delete(&self, id: TransactionId, permanent: bool) -> Result<(), Error> {
        delete_transaction(id, permanent, &*self.connection()?)?;

        if permanent {
            tracing::info!("Permanently deleted transaction #{id}");
        } else {
            tracing::info!("Marked transaction #{id} as inactive");
        }

        Ok(())
    }

    pub fn get(&self, id: TransactionId) -> Result<Transaction, Error> {
        get_transaction(id, &*self.connection()?)
    }

    pub fn list(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, Error> {
        get_transactions(filter, &*self.connection()?)
    }

    pub fn count(&self, filter: &TransactionFilter) -> Result<u32, Error> {
        count_transactions(filter, &*self.connection()?)
    }
}

/// Check that `amount` is a positive number no larger than [MAX_AMOUNT] and
/// convert it to cents.
fn validate_amount(amount: f64) -> Result<i64, Error> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::NonPositiveAmount);
    }

    if amount > MAX_AMOUNT {
        return Err(Error::AmountTooLarge);
    }

    match amount_to_cents(amount) {
        cents if cents > 0 => Ok(cents),
        _ => Err(Error::NonPositiveAmount),
    }
}

fn validate_description(description: &str) -> Result<String, Error> {
    let description = description.trim();

    if description.is_empty() {
        return Err(Error::EmptyDescription);
    }

    if description.chars().count() > MAX_DESCRIPTION_LENGTH {
        return Err(Error::DescriptionTooLong(MAX_DESCRIPTION_LENGTH));
    }

    Ok(description.to_owned())
}

fn validate_category(transaction_type: TransactionType, category: &str) -> Result<(), Error> {
    if transaction_type.is_valid_category(category) {
        Ok(())
    } else {
        Err(Error::InvalidCategory {
            transaction_type,
            category: category.to_owned(),
        })
    }
}

fn non_empty(text: Option<String>) -> Option<String> {
    text.map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::{Arc, Mutex};

    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime, macros::date};

    use crate::{
        Error, TransactionType,
        account::seed_default_accounts,
        budget::{BudgetWarning, NewBudget, create_budget},
        config::{ExchangeRateConfig, LedgerConfig},
        currency::{Currency, CurrencyPair, MAX_AMOUNT},
        db::initialize,
        exchange::{ExchangeRateService, RateTable},
        report::monthly_summary,
        transaction::{
            TransactionFilter,
            service::{TransactionChanges, TransactionDraft, TransactionService},
        },
    };

    /// A service backed by an in-memory database with fixed rates of
    /// 4,000 COP and 0.8 EUR per USD.
    pub(crate) fn get_test_service() -> TransactionService {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        seed_default_accounts(&connection).unwrap();
        let db_connection = Arc::new(Mutex::new(connection));
        let config = ExchangeRateConfig::fixed(vec![
            (CurrencyPair::new(Currency::Usd, Currency::Cop), 4000.0),
            (CurrencyPair::new(Currency::Usd, Currency::Eur), 0.8),
        ]);

        TransactionService {
            exchange_rates: Arc::new(
                ExchangeRateService::from_config(db_connection.clone(), &config).unwrap(),
            ),
            db_connection,
            ledger_config: LedgerConfig::default(),
            local_timezone: "Etc/UTC".to_owned(),
        }
    }

    #[tokio::test]
    async fn creates_income_in_base_currency() {
        let service = get_test_service();
        let draft = TransactionDraft::new(TransactionType::Income, 1500.0, "Salary", "salary")
            .currency(Currency::Usd)
            .date(date!(2025 - 01 - 31));

        let created = service.create(draft).await.unwrap();

        let transaction = created.transaction;
        assert_eq!(transaction.amount_cents, 150_000);
        assert_eq!(transaction.amount_base_cents, Some(150_000));
        assert_eq!(transaction.exchange_rate_id, None);
        assert_eq!(created.budget_warning, None);
    }

    #[tokio::test]
    async fn converts_other_currencies_to_base() {
        let service = get_test_service();
        let draft = TransactionDraft::new(TransactionType::Expense, 200_000.0, "Rent", "housing")
            .currency(Currency::Cop);

        let transaction = service.create(draft).await.unwrap().transaction;

        assert_eq!(transaction.amount_cents, -20_000_000);
        assert_eq!(transaction.amount_base_cents, Some(-5_000));
        assert!(transaction.exchange_rate_id.is_some());
        assert_eq!(transaction.date, OffsetDateTime::now_utc().date());
    }

    #[tokio::test]
    async fn uses_default_currency_and_account() {
        let service = get_test_service();
        let draft = TransactionDraft::new(TransactionType::Income, 100.0, "Gift", "gifts");

        let transaction = service.create(draft).await.unwrap().transaction;

        assert_eq!(transaction.currency, Currency::Cop);
        let account = crate::account::get_account(
            transaction.account_id,
            &service.db_connection.lock().unwrap(),
        )
        .unwrap();
        assert_eq!(account.name, "Income COP");
    }

    #[tokio::test]
    async fn rejects_invalid_drafts() {
        let service = get_test_service();
        let tomorrow = OffsetDateTime::now_utc().date() + Duration::days(1);

        let cases = [
            (
                TransactionDraft::new(TransactionType::Expense, 0.0, "Nothing", "food"),
                Error::NonPositiveAmount,
            ),
            (
                TransactionDraft::new(TransactionType::Expense, -5.0, "Refund", "food"),
                Error::NonPositiveAmount,
            ),
            (
                TransactionDraft::new(TransactionType::Expense, 1e17, "Yacht", "food"),
                Error::AmountTooLarge,
            ),
            (
                TransactionDraft::new(TransactionType::Expense, 5.0, "   ", "food"),
                Error::EmptyDescription,
            ),
            (
                TransactionDraft::new(TransactionType::Expense, 5.0, "Bonus", "salary"),
                Error::InvalidCategory {
                    transaction_type: TransactionType::Expense,
                    category: "salary".to_owned(),
                },
            ),
            (
                TransactionDraft::new(TransactionType::Income, 5.0, "Lunch", "food"),
                Error::InvalidCategory {
                    transaction_type: TransactionType::Income,
                    category: "food".to_owned(),
                },
            ),
            (
                TransactionDraft::new(TransactionType::Expense, 5.0, "Later", "food")
                    .date(tomorrow),
                Error::FutureDate(tomorrow),
            ),
            (
                TransactionDraft {
                    account_id: Some(999),
                    ..TransactionDraft::new(TransactionType::Expense, 5.0, "Lunch", "food")
                },
                Error::InvalidAccount(999),
            ),
            (
                TransactionDraft::new(TransactionType::Expense, 5.0, &"a".repeat(256), "food"),
                Error::DescriptionTooLong(255),
            ),
        ];

        for (draft, want) in cases {
            assert_eq!(service.create(draft).await, Err(want));
        }
        assert_eq!(service.count(&TransactionFilter::default()), Ok(0));
    }

    #[tokio::test]
    async fn largest_amounts_can_be_summarised() {
        let service = get_test_service();
        let today = service.today().unwrap();
        for _ in 0..2 {
            let draft =
                TransactionDraft::new(TransactionType::Income, MAX_AMOUNT, "Lottery", "gifts")
                    .currency(Currency::Usd);
            service.create(draft).await.unwrap();
        }

        let summary = monthly_summary(
            today.year(),
            today.month() as u8,
            &RateTable::new(Currency::Usd),
            &service.db_connection.lock().unwrap(),
        )
        .unwrap();

        assert_eq!(summary.total_income, 2.0 * MAX_AMOUNT);
    }

    #[tokio::test]
    async fn returns_budget_warning() {
        let service = get_test_service();
        create_budget(
            NewBudget {
                name: "Food".to_owned(),
                category: "food".to_owned(),
                amount_cents: 10_000,
                currency: Currency::Usd,
                start_date: date!(2025 - 01 - 01),
                end_date: date!(2025 - 01 - 31),
            },
            &service.db_connection.lock().unwrap(),
        )
        .unwrap();
        let draft = TransactionDraft::new(TransactionType::Expense, 120.0, "Feast", "food")
            .currency(Currency::Usd)
            .date(date!(2025 - 01 - 15));

        let created = service.create(draft).await.unwrap();

        assert!(matches!(
            created.budget_warning,
            Some(BudgetWarning::WillExceed { .. })
        ));
        assert_eq!(service.count(&TransactionFilter::default()), Ok(1));
    }

    #[tokio::test]
    async fn update_keeps_sign_and_recalculates_base() {
        let service = get_test_service();
        let draft = TransactionDraft::new(TransactionType::Expense, 10.0, "Taxi", "transport")
            .currency(Currency::Usd);
        let transaction = service.create(draft).await.unwrap().transaction;

        let updated = service
            .update(
                transaction.id,
                TransactionChanges {
                    amount: Some(80_000.0),
                    currency: Some(Currency::Cop),
                    description: Some("Airport taxi".to_owned()),
                    notes: Some("".to_owned()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.amount_cents, -8_000_000);
        assert_eq!(updated.currency, Currency::Cop);
        assert_eq!(updated.amount_base_cents, Some(-2_000));
        assert_eq!(updated.description, "Airport taxi");
        assert_eq!(updated.notes, None);
    }

    #[tokio::test]
    async fn update_validates_changes() {
        let service = get_test_service();
        let draft = TransactionDraft::new(TransactionType::Income, 10.0, "Sale", "sales");
        let transaction = service.create(draft).await.unwrap().transaction;

        let result = service
            .update(
                transaction.id,
                TransactionChanges {
                    category: Some("food".to_owned()),
                    ..Default::default()
                },
            )
            .await;

        assert!(matches!(result, Err(Error::InvalidCategory { .. })));
        assert_eq!(
            service.update(999, TransactionChanges::default()).await,
            Err(Error::UpdateMissingTransaction)
        );
    }

    #[tokio::test]
    async fn delete_soft_then_hard() {
        let service = get_test_service();
        let draft = TransactionDraft::new(TransactionType::Expense, 10.0, "Taxi", "transport");
        let transaction = service.create(draft).await.unwrap().transaction;

        service.delete(transaction.id, false).unwrap();
        assert!(!service.get(transaction.id).unwrap().is_active);

        service.delete(transaction.id, true).unwrap();
        assert_eq!(service.get(transaction.id), Err(Error::NotFound));
        assert_eq!(service.delete(transaction.id, false), Err(Error::NotFound));
    }
}
