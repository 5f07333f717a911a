//! UI Builder module for creating keyboards and formatting messages

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};
use tracing::warn;

use crate::dialogue::{ActionKind, Outcome, Rendered};

/// Message text of an outcome, with its notice on top
pub fn compose_text(outcome: &Outcome, language_code: Option<&str>) -> String {
    match outcome.notice_text(language_code) {
        Some(notice) => format!("{}\n\n{}", notice, outcome.rendered.text),
        None => outcome.rendered.text.clone(),
    }
}

/// Create the inline keyboard of a rendered screen
///
/// Link buttons whose URL cannot be parsed are dropped.
pub fn build_keyboard(rendered: &Rendered) -> InlineKeyboardMarkup {
    let rows: Vec<Vec<InlineKeyboardButton>> = rendered
        .keyboard
        .iter()
        .map(|row| {
            row.iter()
                .filter_map(|action| match &action.kind {
                    ActionKind::Callback(token) => Some(InlineKeyboardButton::callback(
                        action.label.clone(),
                        token.encode(),
                    )),
                    ActionKind::Link(url) => match reqwest::Url::parse(url) {
                        Ok(url) => Some(InlineKeyboardButton::url(action.label.clone(), url)),
                        Err(e) => {
                            warn!(url = %url, error = %e, "Skipping link button with invalid URL");
                            None
                        }
                    },
                })
                .collect::<Vec<_>>()
        })
        .filter(|row| !row.is_empty())
        .collect();

    InlineKeyboardMarkup::new(rows)
}
