//! # Same-origin proxy URLs
//!
//! The quote API cannot be called from the page directly, so every request goes through
//! the host's relay endpoint (`/cors`). The relay is told which headers to attach
//! (`sendheaders`) and which response headers to pass back (`expectedheaders`), and
//! fetches `url` last.
//!
//! ```text
//! http://localhost:8080/cors?sendheaders=Authorization:Token%20abc&expectedheaders=date,vary&url=https://...
//! ```

use std::borrow::Cow;

use concat_string::concat_string;

use crate::error::WidgetError;

/// Default path of the relay endpoint on the host.
pub const DEFAULT_PATH: &str = "/cors";

/// A header the relay should send upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    pub name: String,
    pub value: String,
}

impl RequestHeader {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        RequestHeader {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Builds the relay URL for `url`.
///
/// `proxy_base` is the relay endpoint itself, e.g. `http://localhost:8080/cors`.
/// The query parameters always come in the order `sendheaders`, `expectedheaders`,
/// `url`, each one present only when it has content, except `url` which is mandatory.
/// The target URL is appended as-is.
///
/// # Errors
///
/// [`WidgetError::InvalidUrl`] when `url` is empty.
pub fn build_cors_url(
    proxy_base: &str,
    url: &str,
    request_headers: &[RequestHeader],
    expected_response_headers: &[&str],
) -> Result<String, WidgetError> {
    if url.is_empty() {
        return Err(WidgetError::InvalidUrl(url.to_string()));
    }

    let params: Vec<String> = [
        request_header_string(request_headers).map(|h| concat_string!("sendheaders=", h)),
        expected_response_headers_string(expected_response_headers)
            .map(|h| concat_string!("expectedheaders=", h)),
        Some(concat_string!("url=", url)),
    ]
    .into_iter()
    .flatten()
    .collect();

    Ok(concat_string!(proxy_base, "?", params.join("&")))
}

/// `name:value` pairs joined by commas, values percent-encoded. `None` when empty.
pub fn request_header_string(request_headers: &[RequestHeader]) -> Option<String> {
    if request_headers.is_empty() {
        return None;
    }

    Some(
        request_headers
            .iter()
            .map(|h| concat_string!(h.name, ":", urlencoding::encode(&h.value)))
            .collect::<Vec<_>>()
            .join(","),
    )
}

/// Header names joined by commas. `None` when empty.
pub fn expected_response_headers_string(expected_response_headers: &[&str]) -> Option<String> {
    if expected_response_headers.is_empty() {
        return None;
    }

    Some(expected_response_headers.join(","))
}

/// `cors_url` with every `sendheaders` value replaced by `***`, for logging.
///
/// Header names stay readable; the API token never reaches the log files.
pub fn redact_request_headers(cors_url: &str) -> Cow<'_, str> {
    const PARAM: &str = "?sendheaders=";

    let start = match cors_url.find(PARAM) {
        Some(i) => i + PARAM.len(),
        None => return Cow::Borrowed(cors_url),
    };
    let end = cors_url[start..]
        .find('&')
        .map_or(cors_url.len(), |i| start + i);

    let masked = cors_url[start..end]
        .split(',')
        .map(|header| match header.split_once(':') {
            Some((name, _)) => concat_string!(name, ":***"),
            None => header.to_string(),
        })
        .collect::<Vec<_>>()
        .join(",");

    Cow::Owned(concat_string!(&cors_url[..start], masked, &cors_url[end..]))
}
