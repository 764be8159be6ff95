use rust_decimal::Decimal;

use crate::{
    config::{ChangeType, WidgetConfig},
    i18n::{self, Translator},
    widget::{dom::Node, view_model::ViewModel},
};

/// Change line colour when the price fell.
pub const POSITIVE_CHANGE_COLOR: &str = "color: #a3ea80";
/// Change line colour when the price rose.
pub const NEGATIVE_CHANGE_COLOR: &str = "color: #FF8E99";

/// Builds the widget's display tree. Pure: the same inputs always give the same tree.
///
/// Without a view model only the localized loading placeholder is shown.
pub fn render(
    view_model: Option<&ViewModel>,
    config: &WidgetConfig,
    translator: &Translator,
) -> Node {
    let wrapper = Node::div();

    let vm = match view_model {
        Some(vm) => vm,
        None => {
            let loading =
                translator.translate(i18n::LOADING, &[("symbol", config.stock_symbol.as_str())]);
            return wrapper.child(Node::span().class("dimmed small").text(loading));
        }
    };

    let mut price_el = Node::div();
    if config.minimal {
        price_el = price_el.class("small");
    }

    let mut value_el = Node::span().text(format!(" {}", vm.price_text()));
    if config.colorized {
        value_el = value_el.class("bright");
    }

    let price_el = price_el
        .child(Node::span().text(vm.label.as_str()))
        .child(value_el);
    let wrapper = wrapper.child(price_el);

    if !config.show_change {
        return wrapper;
    }

    let text = match config.change_type {
        ChangeType::Percent => format!("({}%)", vm.change_text()),
        ChangeType::Absolute => format!("({})", vm.change_text()),
    };

    let mut change_el = Node::div()
        .class(if config.minimal { "dimmed xsmall" } else { "dimmed small" })
        .text(text);

    if config.colorized {
        if vm.change > Decimal::ZERO {
            change_el = change_el.style(POSITIVE_CHANGE_COLOR);
        } else if vm.change < Decimal::ZERO {
            change_el = change_el.style(NEGATIVE_CHANGE_COLOR);
        }
    }

    wrapper.child(change_el)
}
