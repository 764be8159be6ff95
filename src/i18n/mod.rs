use std::collections::HashMap;

use crate::logging;

/// Message key of the placeholder shown before the first quote arrives.
pub const LOADING: &str = "LOADING";

const FALLBACK_LOCALE: &str = "en";

/// Bundled translation files, keyed by locale.
const BUNDLED: [(&str, &str); 2] = [
    ("en", include_str!("../../translations/en.json")),
    ("hu", include_str!("../../translations/hu.json")),
];

/// Resolves message keys for one locale, falling back to English and then to the key.
#[derive(Debug, Clone)]
pub struct Translator {
    locale: String,
    tables: HashMap<String, HashMap<String, String>>,
}

impl Translator {
    /// Translator over the bundled `en` and `hu` tables.
    pub fn new(locale: &str) -> Self {
        let mut tables = HashMap::with_capacity(BUNDLED.len());
        for (lang, text) in BUNDLED {
            match serde_json::from_str::<HashMap<String, String>>(text) {
                Ok(table) => {
                    tables.insert(lang.to_string(), table);
                }
                Err(why) => logging::error_file_async(format!(
                    "Failed to parse translations/{}.json because {:?}",
                    lang, why
                )),
            }
        }

        Translator {
            locale: locale.to_string(),
            tables,
        }
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Adds or replaces the table for `locale`.
    pub fn with_table(mut self, locale: &str, table: HashMap<String, String>) -> Self {
        self.tables.insert(locale.to_string(), table);
        self
    }

    /// Looks up `key` and substitutes each `{name}` placeholder from `params`.
    pub fn translate(&self, key: &str, params: &[(&str, &str)]) -> String {
        let template = [self.locale.as_str(), FALLBACK_LOCALE]
            .iter()
            .find_map(|lang| self.tables.get(*lang).and_then(|t| t.get(key)))
            .map(String::as_str)
            .unwrap_or(key);

        params
            .iter()
            .fold(template.to_string(), |text, (name, value)| {
                text.replace(&format!("{{{}}}", name), value)
            })
    }
}

impl Default for Translator {
    fn default() -> Self {
        Translator::new(FALLBACK_LOCALE)
    }
}
