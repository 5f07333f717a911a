//! Typed action tokens carried by inline keyboard buttons.

use serde::{Deserialize, Serialize};

/// Telegram rejects callback data longer than this
pub const MAX_CALLBACK_DATA_LEN: usize = 64;

/// Opaque token set by the renderer on a button and decoded by the input
/// classifier; encoded as compact JSON, e.g. `{"t":"suggestion","v":2}`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "t", content = "v", rename_all = "snake_case")]
pub enum ActionToken {
    Back,
    Cancel,
    MainMenu,
    RateFilm,
    ReviewFilm,
    MyFilms,
    Help,
    /// Position of a suggestion in the current query's list
    Suggestion(usize),
    Rating(u8),
    FinishRating,
    EditReview,
    SubmitReview,
    /// Film record id
    Film(i64),
    RateSelectedFilm,
    ReviewSelectedFilm,
}

impl ActionToken {
    /// Encode as callback data
    pub fn encode(&self) -> String {
        // Serializing a fieldless or integer-carrying enum cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Decode callback data; unknown or malformed data yields `None`
    pub fn decode(data: &str) -> Option<Self> {
        serde_json::from_str(data).ok()
    }
}

/// What pressing a button does
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ActionKind {
    Callback(ActionToken),
    Link(String),
}

/// A labelled button offered by a screen
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Action {
    pub label: String,
    pub kind: ActionKind,
}

impl Action {
    pub fn callback(label: impl Into<String>, token: ActionToken) -> Self {
        Self {
            label: label.into(),
            kind: ActionKind::Callback(token),
        }
    }

    pub fn link(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            kind: ActionKind::Link(url.into()),
        }
    }

    pub fn token(&self) -> Option<ActionToken> {
        match self.kind {
            ActionKind::Callback(token) => Some(token),
            ActionKind::Link(_) => None,
        }
    }
}
