//! # Dialogue State Machine
//!
//! Applies one classified input to a session: cross-cutting controls first
//! (Back, Cancel, Main menu), then the transitions accepted by the current
//! screen. Every outcome carries the render of the screen the user ends up
//! on; rejected inputs re-render the current screen with a notice.

use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use crate::errors::DialogueError;
use crate::localization::t_lang;
use crate::models::Rating;
use crate::services::FilmSearch;
use crate::storage::Storage;

use super::action::ActionToken;
use super::input::Input;
use super::render::{render_current, Rendered};
use super::screen::{FilmDetails, FilmEntry, FilmRef, Screen, ScreenData, SuggestionCache, Workflow};
use super::session::Session;

/// Who sent an event, as reported by the transport
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserIdentity {
    pub external_id: i64,
    pub display_name: String,
    pub language_code: Option<String>,
}

impl UserIdentity {
    pub fn new(external_id: i64, display_name: impl Into<String>) -> Self {
        Self {
            external_id,
            display_name: display_name.into(),
            language_code: None,
        }
    }

    pub fn with_language(mut self, language_code: impl Into<String>) -> Self {
        self.language_code = Some(language_code.into());
        self
    }
}

/// Short message shown above a screen's text
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Notice {
    NothingFound,
    InvalidRating,
    NotUnderstood,
    EmptyText,
    NoFilms,
    RatingSaved,
    ReviewSaved,
    StorageFailure,
    FilmMissing,
    UnsupportedMessage,
}

impl Notice {
    /// Lexicon key of the notice
    pub fn key(self) -> &'static str {
        match self {
            Notice::NothingFound => "notice-nothing-found",
            Notice::InvalidRating => "notice-invalid-rating",
            Notice::NotUnderstood => "notice-not-understood",
            Notice::EmptyText => "notice-empty-text",
            Notice::NoFilms => "notice-no-films",
            Notice::RatingSaved => "notice-rating-saved",
            Notice::ReviewSaved => "notice-review-saved",
            Notice::StorageFailure => "notice-storage-failure",
            Notice::FilmMissing => "notice-film-missing",
            Notice::UnsupportedMessage => "notice-unsupported-message",
        }
    }

    pub fn text(self, language_code: Option<&str>) -> String {
        t_lang(self.key(), language_code)
    }
}

/// Result of handling one input
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Outcome {
    /// Screen the user is on after the input
    pub screen: Screen,
    pub rendered: Rendered,
    pub notice: Option<Notice>,
    /// Whether the input moved the session; `false` means a same-screen re-prompt
    pub transitioned: bool,
}

impl Outcome {
    /// Notice text in the session's language, if any
    pub fn notice_text(&self, language_code: Option<&str>) -> Option<String> {
        self.notice.map(|notice| notice.text(language_code))
    }
}

enum Step {
    Moved(Option<Notice>),
    Stay(Option<Notice>),
}

/// The transition table plus the collaborators its side effects need
pub struct DialogueEngine {
    storage: Arc<dyn Storage>,
    search: Arc<dyn FilmSearch>,
}

impl DialogueEngine {
    pub fn new(storage: Arc<dyn Storage>, search: Arc<dyn FilmSearch>) -> Self {
        Self { storage, search }
    }

    /// Handle one input for a user's session
    #[instrument(skip_all, fields(user_id = user.external_id, screen = %session.current_screen()))]
    pub async fn handle(&self, session: &mut Session, user: &UserIdentity, input: Input) -> Outcome {
        session.set_language_code(user.language_code.clone());
        let typed = input.typed_text().is_some();

        let step = match self.step(session, user, input).await {
            Ok(step) => step,
            Err(err) => Step::Stay(self.rejection_notice(&err, session.current_screen(), typed)),
        };

        let (transitioned, notice) = match step {
            Step::Moved(notice) => (true, notice),
            Step::Stay(notice) => (false, notice),
        };
        if transitioned {
            debug!(target_screen = %session.current_screen(), "Transition applied");
        }

        Outcome {
            screen: session.current_screen(),
            rendered: render_current(session),
            notice,
            transitioned,
        }
    }

    /// Re-render the current screen with a notice and no transition
    pub fn reprompt(&self, session: &Session, notice: Option<Notice>) -> Outcome {
        Outcome {
            screen: session.current_screen(),
            rendered: render_current(session),
            notice,
            transitioned: false,
        }
    }

    fn rejection_notice(&self, err: &DialogueError, screen: Screen, typed: bool) -> Option<Notice> {
        match err {
            DialogueError::AtRoot => None,
            DialogueError::InvalidInput(input) => {
                debug!(input = %input, "Input not accepted at this screen");
                match screen {
                    Screen::SendRating | Screen::RatingSubmitted if typed => Some(Notice::InvalidRating),
                    _ => Some(Notice::NotUnderstood),
                }
            }
            DialogueError::NotFound(what) => {
                debug!(what = %what, "Lookup yielded nothing");
                match screen {
                    Screen::MyFilms => Some(Notice::FilmMissing),
                    _ => Some(Notice::NothingFound),
                }
            }
            DialogueError::ExternalService(msg) => {
                warn!(error = %msg, "External service failed");
                Some(Notice::NothingFound)
            }
            DialogueError::Storage(msg) => {
                error!(error = %msg, "Storage operation failed");
                Some(Notice::StorageFailure)
            }
        }
    }

    async fn step(
        &self,
        session: &mut Session,
        user: &UserIdentity,
        input: Input,
    ) -> Result<Step, DialogueError> {
        match input {
            Input::Start => Ok(self.enter_start(session, user).await),
            Input::NavBack => {
                session.go_back()?;
                Ok(Step::Moved(None))
            }
            Input::NavCancel => {
                session.clear();
                Ok(Step::Moved(None))
            }
            Input::NavMainMenu => Ok(open_main_menu(session)),
            Input::MenuAction(ActionToken::Help) => Ok(open_help(session)),
            input => self.screen_step(session, user, input).await,
        }
    }

    async fn enter_start(&self, session: &mut Session, user: &UserIdentity) -> Step {
        match self
            .storage
            .register_user(user.external_id, &user.display_name)
            .await
        {
            Ok(id) => debug!(storage_id = id, "User registered"),
            Err(e) => error!(error = %e, "Failed to register user"),
        }
        session.clear();
        Step::Moved(None)
    }

    /// Transitions owned by the current screen
    async fn screen_step(
        &self,
        session: &mut Session,
        user: &UserIdentity,
        input: Input,
    ) -> Result<Step, DialogueError> {
        let screen = session.current_screen();

        match (screen, input) {
            (Screen::MainMenu, Input::MenuAction(ActionToken::RateFilm)) => {
                session.enter(ScreenData::SendTitle {
                    workflow: Workflow::Rate,
                });
                Ok(Step::Moved(None))
            }
            (Screen::MainMenu, Input::MenuAction(ActionToken::ReviewFilm)) => {
                session.enter(ScreenData::SendTitle {
                    workflow: Workflow::Review,
                });
                Ok(Step::Moved(None))
            }
            (Screen::MainMenu, Input::MenuAction(ActionToken::MyFilms)) => self.open_my_films(session).await,

            (Screen::SendTitle(workflow), input) => match input.typed_text() {
                Some(text) if text.trim().is_empty() => Ok(Step::Stay(Some(Notice::EmptyText))),
                Some(text) => {
                    let text = text.to_string();
                    self.search_title(session, workflow, &text).await
                }
                None => Err(DialogueError::InvalidInput(format!("{input:?}"))),
            },

            (Screen::SelectSuggestion(workflow), Input::MenuAction(ActionToken::Suggestion(index))) => {
                select_suggestion(session, workflow, index)
            }

            (Screen::SendRating, Input::RatingValue { value, .. }) => {
                let film = match session.get_screen_data(Screen::SendRating) {
                    ScreenData::SendRating { film } => film,
                    _ => FilmRef::default(),
                };
                self.submit_rating(session, user, film, value).await
            }
            (Screen::RatingSubmitted, Input::RatingValue { value, .. }) => {
                let film = match session.get_screen_data(Screen::RatingSubmitted) {
                    ScreenData::RatingSubmitted { film, .. } => film,
                    _ => FilmRef::default(),
                };
                self.submit_rating(session, user, film, value).await
            }
            (Screen::RatingSubmitted, Input::MenuAction(ActionToken::FinishRating)) => {
                session.complete_workflow();
                Ok(Step::Moved(Some(Notice::RatingSaved)))
            }

            (Screen::SendReview, input) => match input.typed_text() {
                Some(text) if text.trim().is_empty() => Ok(Step::Stay(Some(Notice::EmptyText))),
                Some(text) => {
                    let film = match session.get_screen_data(Screen::SendReview) {
                        ScreenData::SendReview { film } => film,
                        _ => FilmRef::default(),
                    };
                    session.enter(ScreenData::ConfirmReview {
                        film,
                        text: text.to_string(),
                    });
                    Ok(Step::Moved(None))
                }
                None => Err(DialogueError::InvalidInput(format!("{input:?}"))),
            },
            (Screen::ConfirmReview, Input::MenuAction(ActionToken::EditReview)) => {
                let film = match session.get_screen_data(Screen::ConfirmReview) {
                    ScreenData::ConfirmReview { film, .. } => film,
                    _ => return Err(DialogueError::InvalidInput("no review to edit".to_string())),
                };
                session.go_back()?;
                session.set_screen_data(ScreenData::SendReview { film });
                Ok(Step::Moved(None))
            }
            (Screen::ConfirmReview, Input::MenuAction(ActionToken::SubmitReview)) => {
                self.submit_review(session, user).await
            }

            (Screen::MyFilms, Input::MenuAction(ActionToken::Film(film_id))) => {
                self.open_film_info(session, user, film_id).await
            }

            (Screen::FilmInfo, Input::MenuAction(ActionToken::RateSelectedFilm)) => {
                let film = selected_film(session).film_ref();
                session.enter(ScreenData::SendRating { film });
                Ok(Step::Moved(None))
            }
            (Screen::FilmInfo, Input::MenuAction(ActionToken::ReviewSelectedFilm)) => {
                let film = selected_film(session).film_ref();
                session.enter(ScreenData::SendReview { film });
                Ok(Step::Moved(None))
            }

            (_, input) => Err(DialogueError::InvalidInput(format!("{input:?}"))),
        }
    }

    /// Title search with the suggestion cache in front of the provider
    async fn search_title(
        &self,
        session: &mut Session,
        workflow: Workflow,
        query: &str,
    ) -> Result<Step, DialogueError> {
        let key = SuggestionCache::normalize(query);
        let target = Screen::SelectSuggestion(workflow);

        let mut cache = match session.get_screen_data(target) {
            ScreenData::SelectSuggestion { cache, .. } => cache,
            _ => SuggestionCache::default(),
        };

        if cache.contains(&key) {
            debug!(query = %key, "Suggestion cache hit");
            cache.select(&key);
        } else {
            let suggestions = self
                .search
                .search(query)
                .await
                .map_err(|e| DialogueError::ExternalService(format!("{e:#}")))?;
            if suggestions.is_empty() {
                return Err(DialogueError::NotFound(key));
            }

            info!(query = %key, count = suggestions.len(), "Search returned suggestions");
            cache = SuggestionCache::default();
            cache.insert(key.clone(), suggestions);
            cache.select(&key);
        }

        session.enter(ScreenData::SelectSuggestion { workflow, cache });
        Ok(Step::Moved(None))
    }

    async fn submit_rating(
        &self,
        session: &mut Session,
        user: &UserIdentity,
        film: FilmRef,
        rating: Rating,
    ) -> Result<Step, DialogueError> {
        let user_id = self
            .storage
            .register_user(user.external_id, &user.display_name)
            .await?;
        let film_id = self.storage.get_or_create_film(&film.title, &film.link).await?;
        self.storage.upsert_rating(user_id, film_id, rating).await?;

        info!(film_id, rating = rating.value(), "Rating saved");
        session.update_payloads(Screen::FilmInfo, |data| {
            if let ScreenData::FilmInfo { film: details } = data {
                if details.id == film_id {
                    details.rating = Some(rating);
                }
            }
        });
        session.replace(ScreenData::RatingSubmitted { film, rating });
        Ok(Step::Moved(None))
    }

    async fn submit_review(&self, session: &mut Session, user: &UserIdentity) -> Result<Step, DialogueError> {
        let (film, text) = match session.get_screen_data(Screen::ConfirmReview) {
            ScreenData::ConfirmReview { film, text } => (film, text),
            _ => return Err(DialogueError::InvalidInput("no review to submit".to_string())),
        };

        let user_id = self
            .storage
            .register_user(user.external_id, &user.display_name)
            .await?;
        let film_id = self.storage.get_or_create_film(&film.title, &film.link).await?;
        let review_id = self.storage.insert_review(user_id, film_id, &text).await?;

        info!(film_id, review_id, "Review saved");
        session.complete_workflow();
        Ok(Step::Moved(Some(Notice::ReviewSaved)))
    }

    async fn open_my_films(&self, session: &mut Session) -> Result<Step, DialogueError> {
        let films: Vec<FilmEntry> = self
            .storage
            .get_all_films()
            .await?
            .into_iter()
            .map(|(id, title)| FilmEntry { id, title })
            .collect();

        if films.is_empty() {
            return Ok(Step::Stay(Some(Notice::NoFilms)));
        }

        session.enter(ScreenData::MyFilms { films });
        Ok(Step::Moved(None))
    }

    async fn open_film_info(
        &self,
        session: &mut Session,
        user: &UserIdentity,
        film_id: i64,
    ) -> Result<Step, DialogueError> {
        let listed = match session.screen_data(Screen::MyFilms) {
            Some(ScreenData::MyFilms { films }) => films.iter().any(|f| f.id == film_id),
            _ => false,
        };
        if !listed {
            return Err(DialogueError::InvalidInput(format!("film {film_id}")));
        }

        let film = self
            .storage
            .get_film(film_id)
            .await?
            .ok_or_else(|| DialogueError::NotFound(format!("film {film_id}")))?;

        let rating = match self.storage.get_user_id(user.external_id).await? {
            Some(user_id) => self.storage.get_rating(user_id, film_id).await?,
            None => None,
        };

        session.enter(ScreenData::FilmInfo {
            film: FilmDetails {
                id: film.id,
                title: film.title,
                link: film.wiki_link,
                rating,
            },
        });
        Ok(Step::Moved(None))
    }
}

fn open_main_menu(session: &mut Session) -> Step {
    if session.current_screen() == Screen::MainMenu {
        return Step::Stay(None);
    }
    session.enter(ScreenData::MainMenu);
    Step::Moved(None)
}

fn open_help(session: &mut Session) -> Step {
    if session.current_screen() == Screen::Help {
        return Step::Stay(None);
    }
    session.enter(ScreenData::Help);
    Step::Moved(None)
}

fn select_suggestion(session: &mut Session, workflow: Workflow, index: usize) -> Result<Step, DialogueError> {
    let film = match session.screen_data(Screen::SelectSuggestion(workflow)) {
        Some(ScreenData::SelectSuggestion { cache, .. }) => cache.resolve(index).map(FilmRef::from),
        _ => None,
    }
    .ok_or_else(|| DialogueError::InvalidInput(format!("suggestion {index}")))?;

    match workflow {
        Workflow::Rate => session.enter(ScreenData::SendRating { film }),
        Workflow::Review => session.enter(ScreenData::SendReview { film }),
    };
    Ok(Step::Moved(None))
}

fn selected_film(session: &Session) -> FilmDetails {
    match session.get_screen_data(Screen::FilmInfo) {
        ScreenData::FilmInfo { film } => film,
        _ => FilmDetails::default(),
    }
}
