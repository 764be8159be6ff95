//! Single-instrument stock quote widget.
//!
//! Polls a quote through the host's CORS relay, keeps the latest good quote and renders
//! it as a small display tree.

pub mod config;
pub mod cors;
pub mod crawler;
pub mod error;
pub mod i18n;
pub mod logging;
pub mod scheduler;
pub mod util;
pub mod widget;

pub use error::WidgetError;
pub use widget::{QuoteWidget, Refresh};
