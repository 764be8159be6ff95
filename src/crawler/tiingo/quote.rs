use serde::Deserialize;

use crate::{cors::RequestHeader, crawler::tiingo::HOST, error::WidgetError};

/// 代理回傳時需保留的回應標頭（僅作為代理的白名單提示）。
pub const EXPECTED_RESPONSE_HEADERS: [&str; 6] = [
    "server",
    "date",
    "content-type",
    "content-length",
    "vary",
    "x-frame-options",
];

/// Tiingo IEX 報價。
///
/// 對應 `GET /iex/?tickers={symbol}` 回傳陣列中的單一元素，
/// 僅保留顯示所需欄位。
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Quote {
    /// 最後成交價。
    pub last: f64,
    /// 前一交易日收盤價。
    #[serde(rename = "prevClose")]
    pub prev_close: f64,
    /// 供應商回傳的股票代碼。
    pub ticker: String,
}

/// 指定股票代碼的報價 URL。
pub fn quote_url(stock_symbol: &str) -> String {
    format!(
        "https://{host}/iex/?tickers={symbol}",
        host = HOST,
        symbol = stock_symbol
    )
}

/// 經由代理送往 Tiingo 的請求標頭。
pub fn request_headers(api_token: &str) -> Vec<RequestHeader> {
    vec![
        RequestHeader::new("Content-Type", "application/json"),
        RequestHeader::new("Authorization", format!("Token {}", api_token)),
    ]
}

/// 解析回應內容並取出第一筆報價。
///
/// JSON 格式錯誤、空陣列或缺少必要欄位時回傳 [`WidgetError::Data`]。
pub fn first_quote(body: &str) -> Result<Quote, WidgetError> {
    let quotes: Vec<Quote> = serde_json::from_str(body)?;
    quotes
        .into_iter()
        .next()
        .ok_or_else(|| WidgetError::Data("quote array is empty".to_string()))
}
