//! Input classifier: maps raw transport events to the input classes the
//! dialogue engine understands.

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::Rating;

use super::action::ActionToken;

lazy_static! {
    static ref RATING_LITERAL: Regex =
        Regex::new(r"^[0-9]{1,3}$").expect("Rating literal pattern should be valid");
}

/// Raw event delivered by the transport
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RawEvent {
    /// Text message
    Text(String),
    /// Inline button press carrying callback data
    Callback(String),
}

/// Classified user input
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Input {
    /// `/start`: entry into the dialogue
    Start,
    FreeText(String),
    MenuAction(ActionToken),
    /// Valid rating; `text` holds the original message when it was typed
    RatingValue { value: Rating, text: Option<String> },
    NavBack,
    NavCancel,
    NavMainMenu,
    /// Callback data that is not a known token, or an out-of-range rating button
    Unrecognized(String),
}

impl Input {
    /// Text the user typed, if the input came from a text message
    pub fn typed_text(&self) -> Option<&str> {
        match self {
            Input::FreeText(text) => Some(text),
            Input::RatingValue {
                text: Some(text), ..
            } => Some(text),
            _ => None,
        }
    }
}

/// Classify a raw event
pub fn classify(event: RawEvent) -> Input {
    match event {
        RawEvent::Text(text) => classify_text(text),
        RawEvent::Callback(data) => classify_callback(data),
    }
}

fn classify_text(text: String) -> Input {
    let trimmed = text.trim();

    if let Some(command) = trimmed.strip_prefix('/') {
        // Commands may be addressed as /cmd@bot_name
        let name = command
            .split_whitespace()
            .next()
            .unwrap_or("")
            .split('@')
            .next()
            .unwrap_or("");
        match name {
            "start" => return Input::Start,
            "main_menu" => return Input::NavMainMenu,
            "cancel" => return Input::NavCancel,
            "help" => return Input::MenuAction(ActionToken::Help),
            "my_films" => return Input::MenuAction(ActionToken::MyFilms),
            _ => {}
        }
    }

    match parse_rating(trimmed) {
        Some(value) => Input::RatingValue {
            value,
            text: Some(text),
        },
        None => Input::FreeText(text),
    }
}

fn classify_callback(data: String) -> Input {
    match ActionToken::decode(&data) {
        Some(ActionToken::Back) => Input::NavBack,
        Some(ActionToken::Cancel) => Input::NavCancel,
        Some(ActionToken::MainMenu) => Input::NavMainMenu,
        Some(ActionToken::Rating(value)) => match Rating::new(value) {
            Some(value) => Input::RatingValue { value, text: None },
            None => Input::Unrecognized(data),
        },
        Some(token) => Input::MenuAction(token),
        None => Input::Unrecognized(data),
    }
}

/// Parse a base-10 integer literal in `[0, 10]`
pub fn parse_rating(text: &str) -> Option<Rating> {
    let trimmed = text.trim();
    if !RATING_LITERAL.is_match(trimmed) {
        return None;
    }
    trimmed.parse::<u8>().ok().and_then(Rating::new)
}
