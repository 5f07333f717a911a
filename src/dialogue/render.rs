//! Screen registry and renderer.
//!
//! Every screen has exactly one render function, selected by an exhaustive
//! match. Render functions are pure: they read only the screen payload and
//! the in-memory lexicon.

use crate::localization::{t_args_lang, t_lang};
use crate::models::Rating;

use super::action::{Action, ActionToken};
use super::screen::{FilmDetails, FilmEntry, FilmRef, Screen, ScreenData, SuggestionCache, Workflow};
use super::session::Session;

/// Outbound content of a screen
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rendered {
    pub text: String,
    /// Button rows
    pub keyboard: Vec<Vec<Action>>,
}

impl Rendered {
    /// All callback tokens offered by this render
    pub fn tokens(&self) -> Vec<ActionToken> {
        self.keyboard
            .iter()
            .flatten()
            .filter_map(Action::token)
            .collect()
    }

    pub fn offers(&self, token: ActionToken) -> bool {
        self.tokens().contains(&token)
    }
}

type RenderFn = fn(&ScreenData, Option<&str>) -> Rendered;

/// Render function registered for a screen
pub fn renderer(screen: Screen) -> RenderFn {
    match screen {
        Screen::Start => render_start,
        Screen::MainMenu => render_main_menu,
        Screen::Help => render_help,
        Screen::SendTitle(_) => render_send_title,
        Screen::SelectSuggestion(_) => render_select_suggestion,
        Screen::SendRating => render_send_rating,
        Screen::RatingSubmitted => render_rating_submitted,
        Screen::SendReview => render_send_review,
        Screen::ConfirmReview => render_confirm_review,
        Screen::MyFilms => render_my_films,
        Screen::FilmInfo => render_film_info,
    }
}

/// Render a payload with the renderer of its screen
pub fn render(data: &ScreenData, language_code: Option<&str>) -> Rendered {
    renderer(data.screen())(data, language_code)
}

/// Render a screen of a session from its stored payload
pub fn render_screen(session: &Session, screen: Screen) -> Rendered {
    let data = session
        .screen_data(screen)
        .cloned()
        .unwrap_or_else(|| ScreenData::empty(screen));
    render(&data, session.language_code())
}

/// Render the session's current screen
pub fn render_current(session: &Session) -> Rendered {
    render_screen(session, session.current_screen())
}

/// Back, Cancel and Main menu buttons
pub fn navigation_row(lang: Option<&str>) -> Vec<Action> {
    vec![
        Action::callback(t_lang("nav-back", lang), ActionToken::Back),
        Action::callback(t_lang("nav-cancel", lang), ActionToken::Cancel),
        Action::callback(t_lang("nav-main-menu", lang), ActionToken::MainMenu),
    ]
}

fn render_start(_data: &ScreenData, lang: Option<&str>) -> Rendered {
    Rendered {
        text: t_lang("start-text", lang),
        keyboard: vec![vec![Action::callback(
            t_lang("start-button", lang),
            ActionToken::MainMenu,
        )]],
    }
}

fn render_main_menu(_data: &ScreenData, lang: Option<&str>) -> Rendered {
    Rendered {
        text: t_lang("main-menu-text", lang),
        keyboard: vec![
            vec![
                Action::callback(t_lang("main-menu-rate", lang), ActionToken::RateFilm),
                Action::callback(t_lang("main-menu-review", lang), ActionToken::ReviewFilm),
            ],
            vec![
                Action::callback(t_lang("main-menu-my-films", lang), ActionToken::MyFilms),
                Action::callback(t_lang("main-menu-help", lang), ActionToken::Help),
            ],
            vec![Action::callback(t_lang("nav-cancel", lang), ActionToken::Cancel)],
        ],
    }
}

fn render_help(_data: &ScreenData, lang: Option<&str>) -> Rendered {
    Rendered {
        text: t_lang("help-text", lang),
        keyboard: vec![navigation_row(lang)],
    }
}

fn render_send_title(data: &ScreenData, lang: Option<&str>) -> Rendered {
    let key = match data {
        ScreenData::SendTitle {
            workflow: Workflow::Review,
        } => "send-title-review",
        _ => "send-title-rate",
    };
    Rendered {
        text: t_lang(key, lang),
        keyboard: vec![navigation_row(lang)],
    }
}

fn render_select_suggestion(data: &ScreenData, lang: Option<&str>) -> Rendered {
    let empty = SuggestionCache::default();
    let cache = match data {
        ScreenData::SelectSuggestion { cache, .. } => cache,
        _ => &empty,
    };

    let mut keyboard = Vec::new();
    for (index, suggestion) in cache.current().iter().enumerate() {
        keyboard.push(vec![Action::callback(
            suggestion.title.clone(),
            ActionToken::Suggestion(index),
        )]);
        keyboard.push(vec![Action::link(
            t_lang("suggestion-link", lang),
            suggestion.link.clone(),
        )]);
    }
    keyboard.push(navigation_row(lang));

    Rendered {
        text: t_lang("select-suggestion-text", lang),
        keyboard,
    }
}

fn rating_keyboard(lang: Option<&str>) -> Vec<Vec<Action>> {
    let buttons: Vec<Action> = Rating::descending()
        .map(|rating| Action::callback(rating.to_string(), ActionToken::Rating(rating.value())))
        .collect();
    let mut rows: Vec<Vec<Action>> = buttons.chunks(6).map(<[Action]>::to_vec).collect();
    rows.push(navigation_row(lang));
    rows
}

fn film_of(data: &ScreenData) -> FilmRef {
    match data {
        ScreenData::SendRating { film }
        | ScreenData::RatingSubmitted { film, .. }
        | ScreenData::SendReview { film }
        | ScreenData::ConfirmReview { film, .. } => film.clone(),
        _ => FilmRef::default(),
    }
}

fn render_send_rating(data: &ScreenData, lang: Option<&str>) -> Rendered {
    let film = film_of(data);
    Rendered {
        text: t_args_lang("send-rating-text", &[("title", &film.title)], lang),
        keyboard: rating_keyboard(lang),
    }
}

fn render_rating_submitted(data: &ScreenData, lang: Option<&str>) -> Rendered {
    let film = film_of(data);
    let rating = match data {
        ScreenData::RatingSubmitted { rating, .. } => *rating,
        _ => Rating::MIN,
    };

    let mut keyboard = rating_keyboard(lang);
    let navigation = keyboard.pop().unwrap_or_default();
    keyboard.push(vec![Action::callback(
        t_lang("rating-done", lang),
        ActionToken::FinishRating,
    )]);
    keyboard.push(navigation);

    Rendered {
        text: t_args_lang(
            "rating-saved-text",
            &[("title", &film.title), ("rating", &rating.to_string())],
            lang,
        ),
        keyboard,
    }
}

fn render_send_review(data: &ScreenData, lang: Option<&str>) -> Rendered {
    let film = film_of(data);
    Rendered {
        text: t_args_lang("send-review-text", &[("title", &film.title)], lang),
        keyboard: vec![navigation_row(lang)],
    }
}

fn render_confirm_review(data: &ScreenData, lang: Option<&str>) -> Rendered {
    let film = film_of(data);
    let text = match data {
        ScreenData::ConfirmReview { text, .. } => text.as_str(),
        _ => "",
    };

    Rendered {
        text: t_args_lang(
            "confirm-review-text",
            &[("title", &film.title), ("review", text)],
            lang,
        ),
        keyboard: vec![
            vec![
                Action::callback(t_lang("review-edit", lang), ActionToken::EditReview),
                Action::callback(t_lang("review-submit", lang), ActionToken::SubmitReview),
            ],
            navigation_row(lang),
        ],
    }
}

fn render_my_films(data: &ScreenData, lang: Option<&str>) -> Rendered {
    let films: &[FilmEntry] = match data {
        ScreenData::MyFilms { films } => films,
        _ => &[],
    };

    let mut keyboard: Vec<Vec<Action>> = films
        .iter()
        .map(|film| vec![Action::callback(film.title.clone(), ActionToken::Film(film.id))])
        .collect();
    keyboard.push(navigation_row(lang));

    Rendered {
        text: t_lang("my-films-text", lang),
        keyboard,
    }
}

fn render_film_info(data: &ScreenData, lang: Option<&str>) -> Rendered {
    let empty = FilmDetails::default();
    let film = match data {
        ScreenData::FilmInfo { film } => film,
        _ => &empty,
    };

    let rating_line = match film.rating {
        Some(rating) => t_args_lang("film-info-rating", &[("rating", &rating.to_string())], lang),
        None => t_lang("film-info-no-rating", lang),
    };

    let mut keyboard = vec![vec![
        Action::callback(t_lang("film-info-rate", lang), ActionToken::RateSelectedFilm),
        Action::callback(t_lang("film-info-review", lang), ActionToken::ReviewSelectedFilm),
    ]];
    if !film.link.is_empty() {
        keyboard.push(vec![Action::link(t_lang("film-info-link", lang), film.link.clone())]);
    }
    keyboard.push(navigation_row(lang));

    Rendered {
        text: format!(
            "{}\n\n{}",
            t_args_lang("film-info-text", &[("title", &film.title)], lang),
            rating_line
        ),
        keyboard,
    }
}
