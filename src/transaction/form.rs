//! The form fields shared by the pages for recording and editing transactions.

use maud::{Markup, html};
use serde::Deserialize;
use time::Date;

use crate::{
    category::TransactionType,
    currency::Currency,
    html::{FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE},
};

/// The values to prefill the transaction form with.
pub struct TransactionFormDefaults<'a> {
    pub transaction_type: TransactionType,
    pub amount: Option<f64>,
    pub currency: Currency,
    pub date: Date,
    pub max_date: Date,
    pub description: Option<&'a str>,
    pub category: Option<&'a str>,
    pub subcategory: Option<&'a str>,
    pub notes: Option<&'a str>,
    /// Show the reference and tags inputs, which can only be set when a
    /// transaction is recorded.
    pub show_reference_and_tags: bool,
    pub autofocus_amount: bool,
}

/// The form data for recording or editing a transaction.
#[derive(Debug, Deserialize)]
pub struct TransactionForm {
    /// The amount without a sign.
    pub amount: f64,
    pub currency: Currency,
    pub date: Date,
    pub description: String,
    pub category: String,
    #[serde(default)]
    pub subcategory: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    /// Comma separated tags.
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl TransactionForm {
    /// Split the comma separated tags, dropping empty entries.
    pub fn tag_list(&self) -> Vec<String> {
        self.tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|tag| !tag.is_empty())
            .map(str::to_owned)
            .collect()
    }
}

pub fn transaction_form_fields(defaults: &TransactionFormDefaults<'_>) -> Markup {
    let amount_str = defaults.amount.map(|amount| format!("{:.2}", amount.abs()));
    let categories = defaults.transaction_type.categories();
    let category_label = match defaults.transaction_type {
        TransactionType::Income => "Income type",
        TransactionType::Expense => "Category",
    };

    html! {
        div class="grid grid-cols-3 gap-2"
        {
            div class="col-span-2"
            {
                label
                    for="amount"
                    class=(FORM_LABEL_STYLE)
                {
                    "Amount"
                }

                input
                    name="amount"
                    id="amount"
                    type="number"
                    step="0.01"
                    placeholder="0.00"
                    min="0.01"
                    required
                    value=[amount_str.as_deref()]
                    autofocus[defaults.autofocus_amount]
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label
                    for="currency"
                    class=(FORM_LABEL_STYLE)
                {
                    "Currency"
                }

                select
                    name="currency"
                    id="currency"
                    required
                    class=(FORM_TEXT_INPUT_STYLE)
                {
                    @for currency in Currency::ALL {
                        option
                            value=(currency.code())
                            selected[currency == defaults.currency]
                        {
                            (currency.code())
                        }
                    }
                }
            }
        }

        div
        {
            label
                for="date"
                class=(FORM_LABEL_STYLE)
            {
                "Date"
            }

            input
                name="date"
                id="date"
                type="date"
                max=(defaults.max_date)
                value=(defaults.date)
                required
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label
                for="description"
                class=(FORM_LABEL_STYLE)
            {
                "Description"
            }

            input
                name="description"
                id="description"
                type="text"
                placeholder="Description"
                maxlength="255"
                required
                value=[defaults.description]
                class=(FORM_TEXT_INPUT_STYLE);
        }

        div
        {
            label
                for="category"
                class=(FORM_LABEL_STYLE)
            {
                (category_label)
            }

            select
                name="category"
                id="category"
                required
                class=(FORM_TEXT_INPUT_STYLE)
            {
                @for category in categories {
                    option
                        value=(category.key)
                        selected[Some(category.key) == defaults.category]
                    {
                        (category.icon) " " (category.name)
                    }
                }
            }
        }

        div
        {
            label
                for="subcategory"
                class=(FORM_LABEL_STYLE)
            {
                "Subcategory"
            }

            input
                name="subcategory"
                id="subcategory"
                type="text"
                placeholder="Optional"
                value=[defaults.subcategory]
                class=(FORM_TEXT_INPUT_STYLE);
        }

        @if defaults.show_reference_and_tags {
            div
            {
                label
                    for="reference"
                    class=(FORM_LABEL_STYLE)
                {
                    "Reference"
                }

                input
                    name="reference"
                    id="reference"
                    type="text"
                    placeholder="e.g. an invoice number"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label
                    for="tags"
                    class=(FORM_LABEL_STYLE)
                {
                    "Tags"
                }

                input
                    name="tags"
                    id="tags"
                    type="text"
                    placeholder="Comma separated, e.g. work, travel"
                    class=(FORM_TEXT_INPUT_STYLE);
            }
        }

        div
        {
            label
                for="notes"
                class=(FORM_LABEL_STYLE)
            {
                "Notes"
            }

            textarea
                name="notes"
                id="notes"
                rows="3"
                class=(FORM_TEXT_INPUT_STYLE)
            {
                (defaults.notes.unwrap_or_default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use scraper::{Html, Selector};
    use time::OffsetDateTime;

    use super::{TransactionForm, TransactionFormDefaults, transaction_form_fields};
    use crate::{category::TransactionType, currency::Currency};

    fn render_fields(transaction_type: TransactionType, category: Option<&str>) -> Html {
        let max_date = OffsetDateTime::now_utc().date();
        let fields = transaction_form_fields(&TransactionFormDefaults {
            transaction_type,
            amount: None,
            currency: Currency::Eur,
            date: max_date,
            max_date,
            description: None,
            category,
            subcategory: None,
            notes: None,
            show_reference_and_tags: true,
            autofocus_amount: false,
        });
        let markup = maud::html! { form { (fields) } };
        Html::parse_document(&markup.into_string())
    }

    fn option_values(document: &Html, select_name: &str) -> Vec<String> {
        let selector = Selector::parse(&format!("select[name={select_name}] option")).unwrap();

        document
            .select(&selector)
            .filter_map(|option| option.value().attr("value"))
            .map(str::to_owned)
            .collect()
    }

    fn selected_value(document: &Html, select_name: &str) -> Option<String> {
        let selector =
            Selector::parse(&format!("select[name={select_name}] option[selected]")).unwrap();

        document
            .select(&selector)
            .next()
            .and_then(|option| option.value().attr("value"))
            .map(str::to_owned)
    }

    #[test]
    fn lists_categories_for_type() {
        let expense = render_fields(TransactionType::Expense, None);
        let income = render_fields(TransactionType::Income, None);

        let expense_categories = option_values(&expense, "category");
        let income_categories = option_values(&income, "category");

        assert!(expense_categories.contains(&"food".to_owned()));
        assert!(!expense_categories.contains(&"salary".to_owned()));
        assert!(income_categories.contains(&"salary".to_owned()));
        assert!(!income_categories.contains(&"food".to_owned()));
    }

    #[test]
    fn preselects_currency_and_category() {
        let document = render_fields(TransactionType::Expense, Some("transport"));

        assert_eq!(selected_value(&document, "currency"), Some("EUR".to_owned()));
        assert_eq!(
            selected_value(&document, "category"),
            Some("transport".to_owned())
        );
    }

    #[test]
    fn splits_tags() {
        let form: TransactionForm = serde_urlencoded::from_str(
            "amount=12.5&currency=USD&date=2025-01-02&description=Taxi&category=transport\
            &tags=work,%20travel,,",
        )
        .unwrap();

        assert_eq!(form.tag_list(), vec!["work".to_owned(), "travel".to_owned()]);
        assert_eq!(form.subcategory, None);
    }
}
