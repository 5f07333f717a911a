//! Screen identifiers and the per-screen payloads stored in a session.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::models::{Rating, Suggestion};

/// Top-level workflow a title search belongs to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Workflow {
    Rate,
    Review,
}

/// A node in the dialogue graph
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Screen {
    Start,
    MainMenu,
    Help,
    SendTitle(Workflow),
    SelectSuggestion(Workflow),
    SendRating,
    RatingSubmitted,
    SendReview,
    ConfirmReview,
    MyFilms,
    FilmInfo,
}

impl Screen {
    /// The screen history can never be unwound past
    pub const ROOT: Screen = Screen::Start;

    /// Whether the screen belongs to a rating or review workflow and is
    /// dropped when that workflow completes
    pub fn is_workflow_screen(self) -> bool {
        matches!(
            self,
            Screen::SendTitle(_)
                | Screen::SelectSuggestion(_)
                | Screen::SendRating
                | Screen::RatingSubmitted
                | Screen::SendReview
                | Screen::ConfirmReview
        )
    }
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Screen::Start => "StartMenu",
            Screen::MainMenu => "MainMenu",
            Screen::Help => "Help",
            Screen::SendTitle(Workflow::Rate) => "RateFilm.SendTitle",
            Screen::SendTitle(Workflow::Review) => "ReviewFilm.SendTitle",
            Screen::SelectSuggestion(Workflow::Rate) => "RateFilm.SelectSuggestion",
            Screen::SelectSuggestion(Workflow::Review) => "ReviewFilm.SelectSuggestion",
            Screen::SendRating => "RateFilm.SendRating",
            Screen::RatingSubmitted => "RateFilm.Submitted",
            Screen::SendReview => "ReviewFilm.SendReview",
            Screen::ConfirmReview => "ReviewFilm.Confirm",
            Screen::MyFilms => "MyFilms.List",
            Screen::FilmInfo => "MyFilms.FilmInfo",
        };
        f.write_str(name)
    }
}

/// Film chosen from the suggestions, carried into the rating or review screens
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilmRef {
    pub title: String,
    pub link: String,
}

impl From<&Suggestion> for FilmRef {
    fn from(suggestion: &Suggestion) -> Self {
        Self {
            title: suggestion.title.clone(),
            link: suggestion.link.clone(),
        }
    }
}

/// Entry of the "my films" list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilmEntry {
    pub id: i64,
    pub title: String,
}

/// Everything the film info screen shows
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilmDetails {
    pub id: i64,
    pub title: String,
    pub link: String,
    pub rating: Option<Rating>,
}

impl FilmDetails {
    pub fn film_ref(&self) -> FilmRef {
        FilmRef {
            title: self.title.clone(),
            link: self.link.clone(),
        }
    }
}

/// Memo of search results keyed by normalized query
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestionCache {
    queries: HashMap<String, Vec<Suggestion>>,
    current: Option<String>,
}

impl SuggestionCache {
    /// Normalize a raw query: trimmed, whitespace collapsed, lowercased
    pub fn normalize(query: &str) -> String {
        query
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.queries.contains_key(key)
    }

    /// Store suggestions for a normalized query; an existing entry is kept
    pub fn insert(&mut self, key: String, suggestions: Vec<Suggestion>) {
        self.queries.entry(key).or_insert(suggestions);
    }

    /// Mark a cached query as the current one
    pub fn select(&mut self, key: &str) -> bool {
        if self.queries.contains_key(key) {
            self.current = Some(key.to_string());
            true
        } else {
            false
        }
    }

    pub fn current_query(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Suggestions of the current query
    pub fn current(&self) -> &[Suggestion] {
        self.current
            .as_ref()
            .and_then(|key| self.queries.get(key))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Resolve a suggestion of the current query by its position
    pub fn resolve(&self, index: usize) -> Option<&Suggestion> {
        self.current().get(index)
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Merge another cache into this one; queries are merged by key and the
    /// other cache's current query wins
    pub fn merge(&mut self, other: SuggestionCache) {
        for (key, suggestions) in other.queries {
            self.queries.insert(key, suggestions);
        }
        if other.current.is_some() {
            self.current = other.current;
        }
    }
}

/// Payload attached to a screen; one variant per screen, each carrying all
/// the data its renderer needs
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenData {
    Start,
    MainMenu,
    Help,
    SendTitle {
        workflow: Workflow,
    },
    SelectSuggestion {
        workflow: Workflow,
        cache: SuggestionCache,
    },
    SendRating {
        film: FilmRef,
    },
    RatingSubmitted {
        film: FilmRef,
        rating: Rating,
    },
    SendReview {
        film: FilmRef,
    },
    ConfirmReview {
        film: FilmRef,
        text: String,
    },
    MyFilms {
        films: Vec<FilmEntry>,
    },
    FilmInfo {
        film: FilmDetails,
    },
}

impl ScreenData {
    /// Screen this payload belongs to
    pub fn screen(&self) -> Screen {
        match self {
            ScreenData::Start => Screen::Start,
            ScreenData::MainMenu => Screen::MainMenu,
            ScreenData::Help => Screen::Help,
            ScreenData::SendTitle { workflow } => Screen::SendTitle(*workflow),
            ScreenData::SelectSuggestion { workflow, .. } => Screen::SelectSuggestion(*workflow),
            ScreenData::SendRating { .. } => Screen::SendRating,
            ScreenData::RatingSubmitted { .. } => Screen::RatingSubmitted,
            ScreenData::SendReview { .. } => Screen::SendReview,
            ScreenData::ConfirmReview { .. } => Screen::ConfirmReview,
            ScreenData::MyFilms { .. } => Screen::MyFilms,
            ScreenData::FilmInfo { .. } => Screen::FilmInfo,
        }
    }

    /// Payload used for a screen that has nothing stored yet
    pub fn empty(screen: Screen) -> ScreenData {
        match screen {
            Screen::Start => ScreenData::Start,
            Screen::MainMenu => ScreenData::MainMenu,
            Screen::Help => ScreenData::Help,
            Screen::SendTitle(workflow) => ScreenData::SendTitle { workflow },
            Screen::SelectSuggestion(workflow) => ScreenData::SelectSuggestion {
                workflow,
                cache: SuggestionCache::default(),
            },
            Screen::SendRating => ScreenData::SendRating {
                film: FilmRef::default(),
            },
            Screen::RatingSubmitted => ScreenData::RatingSubmitted {
                film: FilmRef::default(),
                rating: Rating::MIN,
            },
            Screen::SendReview => ScreenData::SendReview {
                film: FilmRef::default(),
            },
            Screen::ConfirmReview => ScreenData::ConfirmReview {
                film: FilmRef::default(),
                text: String::new(),
            },
            Screen::MyFilms => ScreenData::MyFilms { films: Vec::new() },
            Screen::FilmInfo => ScreenData::FilmInfo {
                film: FilmDetails::default(),
            },
        }
    }
}
