//! # Film Data Model
//!
//! Records persisted by the storage layer and the small value types that flow
//! between the dialogue engine and its collaborators.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Highest accepted rating value
pub const MAX_RATING: u8 = 10;

/// A film rating on the closed 0..=10 scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Rating(u8);

impl Rating {
    pub const MIN: Rating = Rating(0);

    /// Create a rating, rejecting values above [`MAX_RATING`]
    pub fn new(value: u8) -> Option<Self> {
        (value <= MAX_RATING).then_some(Self(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// All ratings from highest to lowest, the order used by the rating keyboard
    pub fn descending() -> impl Iterator<Item = Rating> {
        (0..=MAX_RATING).rev().map(Rating)
    }
}

impl TryFrom<i64> for Rating {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Rating::new)
            .ok_or_else(|| format!("rating {value} is outside 0..={MAX_RATING}"))
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A candidate film returned by the search provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub title: String,
    /// Reference link to the film page (possibly shortened)
    pub link: String,
}

impl Suggestion {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
        }
    }
}

/// Registered bot user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub telegram_id: i64,
    pub display_name: String,
    pub created_at: DateTime<Utc>,
}

/// Film record, unique by `wiki_link`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Film {
    pub id: i64,
    pub title: String,
    pub wiki_link: String,
    pub created_at: DateTime<Utc>,
}

/// Review record; reviews are append-only
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
    pub id: i64,
    pub user_id: i64,
    pub film_id: i64,
    pub review: String,
    pub created_at: DateTime<Utc>,
}
