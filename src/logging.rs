//! Middleware for logging requests and responses.

use axum::{
    body::Body,
    extract::Request,
    http::{StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Request and response bodies longer than this many characters are truncated
/// in the `info` logs.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// Form fields whose values must never be written to the logs.
const SECRET_FORM_FIELDS: [&str; 3] = ["public_token", "publicToken", "access_token"];

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] characters, it is
/// truncated and the full body is logged at the `debug` level.
/// The values of form fields holding Plaid tokens are redacted.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body_text = match body_to_text(body).await {
        Ok(text) => text,
        Err(error) => {
            tracing::error!("Could not read request body: {error}");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let is_form = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|content_type| content_type.to_str().ok())
        .is_some_and(|content_type| content_type.starts_with("application/x-www-form-urlencoded"));

    if is_form {
        log_request(&parts, &redact_secrets(&body_text));
    } else {
        log_request(&parts, &body_text);
    }

    let request = Request::from_parts(parts, body_text.into());
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body_text = match body_to_text(body).await {
        Ok(text) => text,
        Err(error) => {
            tracing::error!("Could not read response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    log_response(&parts, &body_text);

    Response::from_parts(parts, body_text.into())
}

async fn body_to_text(body: Body) -> Result<String, axum::Error> {
    let bytes = axum::body::to_bytes(body, usize::MAX).await?;

    Ok(String::from_utf8_lossy(&bytes).to_string())
}

/// Replace the values of [SECRET_FORM_FIELDS] in URL encoded form text.
///
/// Field names are matched after percent-decoding, the same way the form
/// extractor reads them.
fn redact_secrets(form_text: &str) -> String {
    form_text
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((name, _)) if is_secret_field(name) => format!("{name}=********"),
            _ => pair.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn is_secret_field(encoded_name: &str) -> bool {
    let decoded: Vec<(String, String)> =
        serde_urlencoded::from_str(&format!("{encoded_name}=")).unwrap_or_default();

    decoded
        .first()
        .is_some_and(|(name, _)| SECRET_FORM_FIELDS.contains(&name.as_str()))
}

/// The first [LOG_BODY_LENGTH_LIMIT] characters of `body`, or `None` if the
/// body is short enough to log in full.
fn truncate(body: &str) -> Option<&str> {
    body.char_indices()
        .nth(LOG_BODY_LENGTH_LIMIT)
        .map(|(end, _)| &body[..end])
}

fn log_request(parts: &axum::http::request::Parts, body: &str) {
    match truncate(body) {
        Some(truncated) => {
            tracing::info!("Received request: {parts:#?}\nbody: {truncated}...");
            tracing::debug!("Full request body: {body:?}");
        }
        None => tracing::info!("Received request: {parts:#?}\nbody: {body:?}"),
    }
}

fn log_response(parts: &axum::http::response::Parts, body: &str) {
    match truncate(body) {
        Some(truncated) => {
            tracing::info!("Sending response: {parts:#?}\nbody: {truncated}...");
            tracing::debug!("Full response body: {body:?}");
        }
        None => tracing::info!("Sending response: {parts:#?}\nbody: {body:?}"),
    }
}

#[cfg(test)]
mod redact_secrets_tests {
    use super::redact_secrets;

    #[test]
    fn redacts_public_token() {
        assert_eq!(
            redact_secrets("public_token=public-sandbox-123&institution=ins_1"),
            "public_token=********&institution=ins_1"
        );
    }

    #[test]
    fn redacts_every_secret_field() {
        assert_eq!(
            redact_secrets("publicToken=abc&access_token=access-1"),
            "publicToken=********&access_token=********"
        );
    }

    #[test]
    fn redacts_percent_encoded_field_names() {
        assert_eq!(
            redact_secrets("public%5Ftoken=public-sandbox-secret&access%5ftoken=access-1"),
            "public%5Ftoken=********&access%5ftoken=********"
        );
    }

    #[test]
    fn keeps_fields_with_similar_names() {
        assert_eq!(
            redact_secrets("not_public_token=abc&name=public_token"),
            "not_public_token=abc&name=public_token"
        );
    }
}
