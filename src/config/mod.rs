use std::{
    env,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::Result;
use config::{Config as config_config, File as config_file};
use serde::{Deserialize, Serialize};

use crate::{cors, error::WidgetError, logging};

pub const CONFIG_PATH: &str = "app.json";

#[derive(Serialize, Deserialize, Default, Debug, Clone, PartialEq)]
pub struct App {
    #[serde(default)]
    pub widget: WidgetConfig,
    #[serde(default)]
    pub proxy: Proxy,
    #[serde(default)]
    pub system: System,
}

const STOCK_SYMBOL: &str = "STOCK_SYMBOL";
const TIINGO_API_TOKEN: &str = "TIINGO_API_TOKEN";
const UPDATE_INTERVAL: &str = "UPDATE_INTERVAL";

/// What the host hands the widget. Immutable once the widget is built.
///
/// Field names are snake_case in `app.json`; the camelCase aliases accept the module
/// configuration object a host passes through (`stockSymbol`, `updateInterval`, ...).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct WidgetConfig {
    #[serde(alias = "stockSymbol")]
    pub stock_symbol: String,
    #[serde(alias = "apiToken")]
    pub api_token: String,
    /// Poll interval in milliseconds.
    #[serde(alias = "updateInterval")]
    pub update_interval: u64,
    #[serde(alias = "showChange")]
    pub show_change: bool,
    #[serde(alias = "changeType")]
    pub change_type: ChangeType,
    pub colorized: bool,
    pub minimal: bool,
    pub label: LabelMode,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        WidgetConfig {
            stock_symbol: "GOOG".to_string(),
            api_token: String::new(),
            update_interval: 3_600_000,
            show_change: true,
            change_type: ChangeType::Absolute,
            colorized: false,
            minimal: false,
            label: LabelMode::Symbol,
        }
    }
}

impl WidgetConfig {
    /// Parses the host's module configuration (camelCase JSON); missing keys take defaults.
    pub fn from_host_json(text: &str) -> Result<Self, WidgetError> {
        let config: WidgetConfig =
            serde_json::from_str(text).map_err(|why| WidgetError::Config(why.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval)
    }

    pub fn validate(&self) -> Result<(), WidgetError> {
        if self.stock_symbol.trim().is_empty() {
            return Err(WidgetError::Config("stock_symbol is empty".to_string()));
        }

        if self.update_interval == 0 {
            return Err(WidgetError::Config(
                "update_interval must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// How the change line is computed and shown.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(from = "String", into = "String")]
pub enum ChangeType {
    /// `prevClose - last`, shown bare. Configured as `""` (or anything but `"percent"`).
    #[default]
    Absolute,
    /// `(prevClose - last) / prevClose * 100`, shown with a `%` suffix.
    Percent,
}

impl From<String> for ChangeType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "percent" => ChangeType::Percent,
            _ => ChangeType::Absolute,
        }
    }
}

impl From<ChangeType> for String {
    fn from(value: ChangeType) -> Self {
        match value {
            ChangeType::Percent => "percent".to_string(),
            ChangeType::Absolute => String::new(),
        }
    }
}

/// Text shown in front of the price.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(from = "String", into = "String")]
pub enum LabelMode {
    /// The ticker the provider returned.
    #[default]
    Symbol,
    /// No label.
    None,
    /// Any other configured value, shown verbatim.
    Text(String),
}

impl From<String> for LabelMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "symbol" => LabelMode::Symbol,
            "none" => LabelMode::None,
            _ => LabelMode::Text(value),
        }
    }
}

impl From<LabelMode> for String {
    fn from(value: LabelMode) -> Self {
        match value {
            LabelMode::Symbol => "symbol".to_string(),
            LabelMode::None => "none".to_string(),
            LabelMode::Text(text) => text,
        }
    }
}

const PROXY_BASE: &str = "PROXY_BASE";
const REQUEST_TIMEOUT: &str = "REQUEST_TIMEOUT";

/// The host's same-origin relay.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Proxy {
    /// Scheme and authority of the host, e.g. `http://localhost:8080`.
    pub base: String,
    pub path: String,
    /// Upper bound for one proxied request, in seconds.
    pub timeout_secs: u64,
}

impl Default for Proxy {
    fn default() -> Self {
        Proxy {
            base: "http://localhost:8080".to_string(),
            path: cors::DEFAULT_PATH.to_string(),
            timeout_secs: 15,
        }
    }
}

impl Proxy {
    /// Full relay endpoint, e.g. `http://localhost:8080/cors`.
    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base.trim_end_matches('/'), self.path)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

const LOCALE: &str = "LOCALE";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct System {
    pub locale: String,
}

impl Default for System {
    fn default() -> Self {
        System {
            locale: "en".to_string(),
        }
    }
}

impl App {
    /// Reads `app.json` from the working directory, then applies environment overrides.
    pub fn get() -> Result<Self> {
        Self::load(&config_path())
    }

    /// Reads the settings file at `path` if it exists, otherwise starts from defaults.
    /// Environment variables win over file values either way.
    pub fn load(path: &Path) -> Result<Self> {
        let app = if path.exists() {
            config_config::builder()
                .add_source(config_file::from(path))
                .build()?
                .try_deserialize::<App>()?
        } else {
            logging::info_file_async(format!(
                "{} not found, using defaults and environment",
                path.display()
            ));
            App::default()
        };

        let app = app.override_with_env();
        app.validate()?;

        Ok(app)
    }

    pub fn validate(&self) -> Result<(), WidgetError> {
        self.widget.validate()?;

        if self.proxy.base.trim().is_empty() {
            return Err(WidgetError::Config("proxy.base is empty".to_string()));
        }

        if self.proxy.timeout_secs == 0 {
            return Err(WidgetError::Config(
                "proxy.timeout_secs must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }

    /// 將來至於 env 的設定值覆蓋掉 json 上的設定值
    fn override_with_env(self) -> Self {
        self.override_with(|key| env::var(key).ok())
    }

    fn override_with(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(symbol) = var(STOCK_SYMBOL) {
            self.widget.stock_symbol = symbol;
        }

        if let Some(token) = var(TIINGO_API_TOKEN) {
            self.widget.api_token = token;
        }

        if let Some(interval) = var(UPDATE_INTERVAL) {
            match u64::from_str(&interval) {
                Ok(ms) => self.widget.update_interval = ms,
                Err(why) => logging::error_file_async(format!(
                    "Ignoring {}={} because {:?}",
                    UPDATE_INTERVAL, interval, why
                )),
            }
        }

        if let Some(base) = var(PROXY_BASE) {
            self.proxy.base = base;
        }

        if let Some(timeout) = var(REQUEST_TIMEOUT) {
            match u64::from_str(&timeout) {
                Ok(secs) => self.proxy.timeout_secs = secs,
                Err(why) => logging::error_file_async(format!(
                    "Ignoring {}={} because {:?}",
                    REQUEST_TIMEOUT, timeout, why
                )),
            }
        }

        if let Some(locale) = var(LOCALE) {
            self.system.locale = locale;
        }

        self
    }
}

/// 回傳設定檔的路徑
fn config_path() -> PathBuf {
    PathBuf::from(CONFIG_PATH)
}
