use rust_decimal::{Decimal, RoundingStrategy};

use crate::{
    config::{ChangeType, LabelMode, WidgetConfig},
    crawler::tiingo::quote::{self, Quote},
    error::WidgetError,
};

/// What the renderer needs from one quote. Replaced wholesale on every successful poll.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewModel {
    /// Last traded price as the provider sent it.
    pub price: f64,
    /// `prevClose - last` (or that as a percentage of `prevClose`), two decimal places.
    /// Positive means the price fell.
    pub change: Decimal,
    pub label: String,
}

impl ViewModel {
    /// The change with exactly two decimals, e.g. `5.00`.
    pub fn change_text(&self) -> String {
        format!("{:.2}", self.change)
    }

    pub fn price_text(&self) -> String {
        self.price.to_string()
    }
}

/// Parses a raw quote response and maps its first element.
pub fn map_response(body: &str, config: &WidgetConfig) -> Result<ViewModel, WidgetError> {
    map_quote(&quote::first_quote(body)?, config)
}

/// Derives the view model from one quote.
///
/// # Errors
///
/// [`WidgetError::Data`] when a price is not finite, or when `prevClose` is zero in
/// percent mode.
pub fn map_quote(quote: &Quote, config: &WidgetConfig) -> Result<ViewModel, WidgetError> {
    let last = to_decimal("last", quote.last)?;
    let prev_close = to_decimal("prevClose", quote.prev_close)?;
    let diff = prev_close - last;

    let change = match config.change_type {
        ChangeType::Percent => diff
            .checked_div(prev_close)
            .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
            .ok_or_else(|| {
                WidgetError::Data(format!(
                    "cannot compute percent change of {} against prevClose {}",
                    quote.last, quote.prev_close
                ))
            })?,
        ChangeType::Absolute => diff,
    };

    let label = match &config.label {
        LabelMode::Symbol => quote.ticker.clone(),
        LabelMode::None => String::new(),
        LabelMode::Text(text) => text.clone(),
    };

    Ok(ViewModel {
        price: quote.last,
        change: two_places(change),
        label,
    })
}

fn to_decimal(field: &str, value: f64) -> Result<Decimal, WidgetError> {
    Decimal::try_from(value)
        .map_err(|why| WidgetError::Data(format!("{} = {} is not usable: {}", field, value, why)))
}

fn two_places(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        // drops a negative sign left over from rounding
        rounded = Decimal::ZERO;
    }
    rounded.rescale(2);
    rounded
}
