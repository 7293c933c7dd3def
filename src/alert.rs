//! Alert fragments for reporting the outcome of HTMX requests.
//!
//! Alerts are swapped into the `#alert-container` element of the base page.

use axum::response::{Html, IntoResponse, Response};
use maud::{Markup, html};

/// A dismissible success or error message.
#[derive(Debug, Clone, PartialEq)]
pub enum Alert {
    /// A success message with some extra details.
    Success {
        /// The headline.
        message: String,
        /// The body text.
        details: String,
    },
    /// An error message with some extra details.
    Error {
        /// The headline.
        message: String,
        /// The body text, e.g. how to fix the error.
        details: String,
    },
}

const SUCCESS_STYLE: &str = "p-4 mb-4 text-sm text-green-800 rounded-lg bg-green-50 \
    dark:bg-gray-800 dark:text-green-400 border border-green-300 dark:border-green-800";
const ERROR_STYLE: &str = "p-4 mb-4 text-sm text-red-800 rounded-lg bg-red-50 \
    dark:bg-gray-800 dark:text-red-400 border border-red-300 dark:border-red-800";

impl Alert {
    /// Render the alert as an HTML fragment.
    pub fn into_html(self) -> Markup {
        let (style, role, message, details) = match self {
            Alert::Success { message, details } => (SUCCESS_STYLE, "status", message, details),
            Alert::Error { message, details } => (ERROR_STYLE, "alert", message, details),
        };

        html!(
            div
                class=(style)
                role=(role)
            {
                div class="flex items-start justify-between gap-4"
                {
                    div
                    {
                        p class="font-medium" { (message) }

                        @if !details.is_empty() {
                            p class="mt-1" { (details) }
                        }
                    }

                    button
                        type="button"
                        aria-label="Dismiss"
                        class="font-bold"
                        onclick="this.closest('[role]').remove()"
                    {
                        "×"
                    }
                }
            }
        )
    }
}

impl IntoResponse for Alert {
    fn into_response(self) -> Response {
        Html(self.into_html().into_string()).into_response()
    }
}

#[cfg(test)]
mod alert_tests {
    use axum::response::IntoResponse;
    use scraper::Html;

    use crate::{
        alert::Alert,
        test_utils::{assert_content_type, assert_valid_html, parse_html_fragment, select_texts},
    };

    #[tokio::test]
    async fn renders_error_with_details() {
        let alert = Alert::Error {
            message: "Could not reach your bank".to_owned(),
            details: "Try again later.".to_owned(),
        };

        let response = alert.into_response();

        assert_content_type(&response, "text/html; charset=utf-8");
        let html = parse_html_fragment(response).await;
        assert_valid_html(&html);
        assert_eq!(
            select_texts(&html, "div[role=alert] p"),
            vec!["Could not reach your bank", "Try again later."]
        );
    }

    #[test]
    fn omits_empty_details() {
        let alert = Alert::Success {
            message: "Bank linked".to_owned(),
            details: String::new(),
        };

        let html = Html::parse_fragment(&alert.into_html().into_string());

        assert_eq!(select_texts(&html, "div[role=status] p"), vec!["Bank linked"]);
    }
}
