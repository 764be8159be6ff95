//! # Tiingo 行情採集模組
//!
//! 透過 Tiingo IEX REST API 取得單一股票的最新成交價與前日收盤價。
//!
//! ## 站點資訊
//!
//! - 來源域名：`api.tiingo.com`
//! - 存取方式：HTTP GET 搭配 `Authorization: Token <token>`，經由主機的 CORS 代理轉送
//! - 主要端點：`/iex/?tickers={symbol}`

/// Tiingo 報價回應與請求參數。
pub mod quote;

/// Tiingo 行情 API 主機域名。
pub const HOST: &str = "api.tiingo.com";
