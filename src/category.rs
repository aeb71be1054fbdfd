//! The fixed sets of expense categories and income types, and the transaction type that selects between them.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};

/// Display information for a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CategoryInfo {
    /// The key stored in the database, e.g. "food".
    pub key: &'static str,
    /// The display name.
    pub name: &'static str,
    /// An emoji shown next to the name.
    pub icon: &'static str,
    /// A hex colour used in charts.
    pub color: &'static str,
}

const fn category(
    key: &'static str,
    name: &'static str,
    icon: &'static str,
    color: &'static str,
) -> CategoryInfo {
    CategoryInfo {
        key,
        name,
        icon,
        color,
    }
}

/// The categories an expense can be filed under.
pub const EXPENSE_CATEGORIES: &[CategoryInfo] = &[
    category("food", "Food", "🍽️", "#FF6B6B"),
    category("transport", "Transport", "🚗", "#4ECDC4"),
    category("housing", "Housing", "🏠", "#45B7D1"),
    category("utilities", "Utilities", "⚡", "#96CEB4"),
    category("health", "Health", "🏥", "#FFEAA7"),
    category("entertainment", "Entertainment", "🎮", "#DDA0DD"),
    category("clothing", "Clothing", "👕", "#98D8C8"),
    category("education", "Education", "📚", "#F7DC6F"),
    category("technology", "Technology", "💻", "#BB8FCE"),
    category("other", "Other", "📦", "#85C1E9"),
];

/// The types of income.
pub const INCOME_TYPES: &[CategoryInfo] = &[
    category("salary", "Salary", "💼", "#2ECC71"),
    category("freelance", "Freelance", "💻", "#3498DB"),
    category("business", "Business", "🏢", "#E67E22"),
    category("investment", "Investments", "📈", "#9B59B6"),
    category("sales", "Sales", "🛒", "#1ABC9C"),
    category("gifts", "Gifts", "🎁", "#E74C3C"),
    category("other", "Other income", "💰", "#F39C12"),
];

const UNKNOWN_CATEGORY_ICON: &str = "📦";
const UNKNOWN_CATEGORY_COLOR: &str = "#85C1E9";

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Money earned. Stored with a positive amount.
    Income,
    /// Money spent. Stored with a negative amount.
    Expense,
}

impl TransactionType {
    /// The string stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }

    /// The valid categories for this transaction type.
    pub fn categories(self) -> &'static [CategoryInfo] {
        match self {
            TransactionType::Income => INCOME_TYPES,
            TransactionType::Expense => EXPENSE_CATEGORIES,
        }
    }

    /// Whether `key` names one of this type's categories.
    pub fn is_valid_category(self, key: &str) -> bool {
        self.categories().iter().any(|category| category.key == key)
    }

    /// Apply the sign convention for this type to a positive amount in cents.
    pub fn signed_cents(self, magnitude: i64) -> i64 {
        match self {
            TransactionType::Income => magnitude.abs(),
            TransactionType::Expense => -magnitude.abs(),
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The error returned for strings other than "income" or "expense".
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid transaction type \"{0}\", expected \"income\" or \"expense\"")]
pub struct ParseTransactionTypeError(pub String);

impl FromStr for TransactionType {
    type Err = ParseTransactionTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            _ => Err(ParseTransactionTypeError(s.to_owned())),
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// Look up the display information for `key`.
///
/// Unknown keys, e.g. categories that were removed after a transaction was
/// recorded, get a generic entry named after the key.
pub fn category_info(transaction_type: TransactionType, key: &str) -> CategoryInfo {
    transaction_type
        .categories()
        .iter()
        .find(|category| category.key == key)
        .copied()
        .unwrap_or(CategoryInfo {
            key: "unknown",
            name: "Unknown",
            icon: UNKNOWN_CATEGORY_ICON,
            color: UNKNOWN_CATEGORY_COLOR,
        })
}

#[cfg(test)]
mod tests {
    use super::{EXPENSE_CATEGORIES, INCOME_TYPES, TransactionType, category_info};

    #[test]
    fn categories_depend_on_type() {
        assert!(TransactionType::Expense.is_valid_category("food"));
        assert!(!TransactionType::Income.is_valid_category("food"));
        assert!(TransactionType::Income.is_valid_category("salary"));
        assert!(TransactionType::Income.is_valid_category("other"));
        assert!(TransactionType::Expense.is_valid_category("other"));
    }

    #[test]
    fn category_keys_are_unique() {
        for categories in [EXPENSE_CATEGORIES, INCOME_TYPES] {
            for (i, category) in categories.iter().enumerate() {
                assert!(
                    categories[i + 1..].iter().all(|other| other.key != category.key),
                    "duplicate category key {}",
                    category.key
                );
            }
        }
    }

    #[test]
    fn applies_sign_by_type() {
        assert_eq!(TransactionType::Income.signed_cents(1500), 1500);
        assert_eq!(TransactionType::Expense.signed_cents(1500), -1500);
        assert_eq!(TransactionType::Expense.signed_cents(-1500), -1500);
    }

    #[test]
    fn unknown_category_falls_back_to_generic_info() {
        let info = category_info(TransactionType::Expense, "yachts");

        assert_eq!(info.name, "Unknown");
        assert_eq!(category_info(TransactionType::Expense, "food").name, "Food");
    }

    #[test]
    fn parses_transaction_type() {
        assert_eq!("Income".parse(), Ok(TransactionType::Income));
        assert_eq!("expense".parse(), Ok(TransactionType::Expense));
        assert!("transfer".parse::<TransactionType>().is_err());
    }
}
