//! Widget error types.

use std::time::Duration;

use thiserror::Error;

/// Everything that can go wrong between building the proxy URL and mapping a quote.
///
/// Only [`WidgetError::InvalidUrl`] and [`WidgetError::Config`] are fatal; the rest are
/// logged by the widget and leave the last good quote on screen.
#[derive(Error, Debug)]
pub enum WidgetError {
    #[error("Invalid URL: {0:?}")]
    InvalidUrl(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("XHR status: {0}")]
    Status(u16),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Data error: {0}")]
    Data(String),
}

impl WidgetError {
    /// Whether the widget may keep polling after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, WidgetError::InvalidUrl(_) | WidgetError::Config(_))
    }
}

impl From<serde_json::Error> for WidgetError {
    fn from(why: serde_json::Error) -> Self {
        WidgetError::Data(why.to_string())
    }
}

impl From<reqwest::Error> for WidgetError {
    fn from(why: reqwest::Error) -> Self {
        WidgetError::Transport(why.to_string())
    }
}
