use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use crate::{error::WidgetError, util};

/// Tiingo IEX 即時報價
pub mod tiingo;

/// Where the widget gets its raw quote payloads from.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Issues one GET to `url` and returns the body of a 200 response.
    ///
    /// Any other terminal status is [`WidgetError::Status`]; a request that never
    /// finishes is [`WidgetError::Timeout`].
    async fn fetch(&self, url: &str) -> Result<String, WidgetError>;
}

/// [`QuoteSource`] backed by the shared reqwest client.
pub struct HttpQuoteSource {
    timeout: Duration,
}

impl HttpQuoteSource {
    pub fn new(timeout: Duration) -> Self {
        HttpQuoteSource { timeout }
    }
}

#[async_trait]
impl QuoteSource for HttpQuoteSource {
    async fn fetch(&self, url: &str) -> Result<String, WidgetError> {
        let (status, body) = util::http::get_text(url, self.timeout).await?;
        if status != StatusCode::OK {
            return Err(WidgetError::Status(status.as_u16()));
        }

        Ok(body)
    }
}
