//! Alert messages that are swapped into the page's alert container by HTMX.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use maud::{Markup, html};

/// A message shown to the user after they submit a form.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// The action succeeded, but the user should know about something.
    Warning { message: String, details: String },
    /// The action failed.
    Error { message: String, details: String },
}

impl Alert {
    pub fn into_html(self) -> Markup {
        let (message, details, container_style, icon) = match self {
            Alert::Warning { message, details } => (
                message,
                details,
                "text-yellow-800 border-yellow-300 bg-yellow-50 dark:bg-gray-800 \
                dark:text-yellow-300 dark:border-yellow-800",
                "!",
            ),
            Alert::Error { message, details } => (
                message,
                details,
                "text-red-800 border-red-300 bg-red-50 dark:bg-gray-800 \
                dark:text-red-400 dark:border-red-800",
                "✕",
            ),
        };

        html! {
            div
                role="alert"
                class={ "flex items-start gap-3 p-4 mb-4 border rounded-lg shadow " (container_style) }
            {
                span class="font-bold" { (icon) }

                div class="flex-1"
                {
                    p class="font-medium" { (message) }

                    @if !details.is_empty() {
                        p class="text-sm mt-1" { (details) }
                    }
                }

                button
                    type="button"
                    class="ms-auto font-bold"
                    aria-label="Close"
                    onclick="this.closest('[role=alert]').remove()"
                {
                    "×"
                }
            }
        }
    }

    pub fn into_response_with_status(self, status_code: StatusCode) -> Response {
        (status_code, Html(self.into_html().into_string())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use scraper::Selector;

    use crate::{
        alert::Alert,
        test_utils::{assert_valid_html, parse_html_fragment},
    };

    #[tokio::test]
    async fn renders_message_and_details() {
        let alert = Alert::Warning {
            message: "Budget almost used".to_owned(),
            details: "You have used 85% of Groceries".to_owned(),
        };

        let response = alert.into_response_with_status(StatusCode::CREATED);

        assert_eq!(response.status(), StatusCode::CREATED);
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        let text = html
            .select(&Selector::parse("[role=alert]").unwrap())
            .next()
            .expect("No alert found")
            .text()
            .collect::<String>();
        assert!(text.contains("Budget almost used"));
        assert!(text.contains("You have used 85% of Groceries"));
    }
}
