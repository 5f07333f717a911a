//! # Dialogue Engine Tests
//!
//! End-to-end conversations against the in-memory storage and a scripted
//! film search that counts how often it is called.

use anyhow::Result;
use async_trait::async_trait;
use kinobot::dialogue::{
    classify, ActionToken, DialogueEngine, Input, Notice, Outcome, RawEvent, Rendered, Screen, Session,
    UserIdentity, Workflow,
};
use kinobot::config::{RecoveryConfig, SearchConfig};
use kinobot::errors::DialogueError;
use kinobot::models::{Rating, Suggestion};
use kinobot::services::{FilmSearch, NoopShortener, WikipediaFilmSearch};
use kinobot::storage::{MemoryStorage, Storage};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Film search answering from a fixed table and counting calls
#[derive(Default)]
struct ScriptedSearch {
    results: HashMap<String, Vec<Suggestion>>,
    calls: AtomicUsize,
}

impl ScriptedSearch {
    fn with(mut self, query: &str, suggestions: Vec<Suggestion>) -> Self {
        self.results.insert(query.to_lowercase(), suggestions);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FilmSearch for ScriptedSearch {
    async fn search(&self, query: &str) -> Result<Vec<Suggestion>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .results
            .get(&query.trim().to_lowercase())
            .cloned()
            .unwrap_or_default())
    }
}

struct Harness {
    engine: DialogueEngine,
    storage: Arc<MemoryStorage>,
    search: Arc<ScriptedSearch>,
    session: Session,
    user: UserIdentity,
}

impl Harness {
    fn new() -> Self {
        let search = ScriptedSearch::default()
            .with("Inception", vec![Suggestion::new("Inception", "http://tinyurl/x")])
            .with(
                "Heat",
                vec![
                    Suggestion::new("Heat (1995 film)", "http://tinyurl/heat"),
                    Suggestion::new("Heat (1986 film)", "http://tinyurl/heat86"),
                ],
            );
        let storage = Arc::new(MemoryStorage::new());
        let search = Arc::new(search);
        let engine = DialogueEngine::new(storage.clone(), search.clone());

        Self {
            engine,
            storage,
            search,
            session: Session::new(),
            user: UserIdentity::new(1001, "Ann"),
        }
    }

    async fn send(&mut self, event: RawEvent) -> Outcome {
        self.engine
            .handle(&mut self.session, &self.user, classify(event))
            .await
    }

    async fn text(&mut self, text: &str) -> Outcome {
        self.send(RawEvent::Text(text.to_string())).await
    }

    async fn press(&mut self, token: ActionToken) -> Outcome {
        self.send(RawEvent::Callback(token.encode())).await
    }

    async fn rating_of(&self, link: &str) -> Result<Option<Rating>> {
        let user_id = self.storage.register_user(self.user.external_id, "Ann").await?;
        let film_id = self.storage.get_or_create_film("", link).await?;
        self.storage.get_rating(user_id, film_id).await
    }

    /// /start → Main menu → Rate film → "Inception" → pick the suggestion
    async fn open_rating_screen(&mut self) -> Vec<Rendered> {
        let mut renders = Vec::new();
        renders.push(self.text("/start").await.rendered);
        renders.push(self.press(ActionToken::MainMenu).await.rendered);
        renders.push(self.press(ActionToken::RateFilm).await.rendered);
        renders.push(self.text("Inception").await.rendered);
        renders.push(self.press(ActionToken::Suggestion(0)).await.rendered);
        renders
    }
}

#[tokio::test]
async fn test_rate_film_scenario() -> Result<()> {
    let mut harness = Harness::new();

    let outcome = harness.text("/start").await;
    assert_eq!(outcome.screen, Screen::Start);
    assert_eq!(outcome.rendered.tokens(), vec![ActionToken::MainMenu]);

    let outcome = harness.press(ActionToken::MainMenu).await;
    assert_eq!(outcome.screen, Screen::MainMenu);

    let outcome = harness.press(ActionToken::RateFilm).await;
    assert_eq!(outcome.screen, Screen::SendTitle(Workflow::Rate));

    let outcome = harness.text("Inception").await;
    assert_eq!(outcome.screen, Screen::SelectSuggestion(Workflow::Rate));
    assert!(outcome.rendered.keyboard.iter().flatten().any(|a| a.label == "Inception"));
    assert!(outcome.rendered.offers(ActionToken::Suggestion(0)));

    let outcome = harness.press(ActionToken::Suggestion(0)).await;
    assert_eq!(outcome.screen, Screen::SendRating);
    assert!(outcome.rendered.text.contains("Inception"));

    let outcome = harness.text("8").await;
    assert_eq!(outcome.screen, Screen::RatingSubmitted);
    assert!(outcome.transitioned);
    assert!(outcome.rendered.text.contains("8/10"));

    assert_eq!(harness.rating_of("http://tinyurl/x").await?, Rating::new(8));
    assert_eq!(harness.storage.film_count().await, 1);
    assert_eq!(harness.storage.user_count().await, 1);
    Ok(())
}

#[tokio::test]
async fn test_back_from_confirmation_reuses_cached_suggestions() -> Result<()> {
    let mut harness = Harness::new();
    let renders = harness.open_rating_screen().await;
    let suggestions_render = renders[3].clone();
    harness.text("8").await;
    assert_eq!(harness.search.calls(), 1);

    let outcome = harness.press(ActionToken::Back).await;

    assert_eq!(outcome.screen, Screen::SelectSuggestion(Workflow::Rate));
    assert_eq!(outcome.rendered, suggestions_render);
    assert_eq!(harness.search.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_repeated_query_hits_cache() -> Result<()> {
    let mut harness = Harness::new();
    harness.open_rating_screen().await;

    harness.press(ActionToken::Back).await;
    harness.press(ActionToken::Back).await;
    let outcome = harness.text("  inception ").await;

    assert_eq!(outcome.screen, Screen::SelectSuggestion(Workflow::Rate));
    assert_eq!(harness.search.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn test_back_is_inverse_of_forward_navigation() -> Result<()> {
    let mut harness = Harness::new();
    let renders = harness.open_rating_screen().await;
    let screens = harness.session.history().screens().to_vec();
    assert_eq!(
        screens,
        vec![
            Screen::Start,
            Screen::MainMenu,
            Screen::SendTitle(Workflow::Rate),
            Screen::SelectSuggestion(Workflow::Rate),
            Screen::SendRating,
        ]
    );

    for step in (0..screens.len() - 1).rev() {
        let outcome = harness.press(ActionToken::Back).await;
        assert_eq!(outcome.screen, screens[step]);
        assert_eq!(outcome.rendered, renders[step], "render after going back to {}", screens[step]);
    }

    let outcome = harness.press(ActionToken::Back).await;
    assert_eq!(outcome.screen, Screen::Start);
    assert!(!outcome.transitioned);
    Ok(())
}

#[tokio::test]
async fn test_cancel_from_depth_then_back_is_noop() -> Result<()> {
    let mut harness = Harness::new();
    harness.open_rating_screen().await;

    let outcome = harness.press(ActionToken::Cancel).await;
    assert_eq!(outcome.screen, Screen::Start);
    assert!(harness.session.history().is_at_root());

    let outcome = harness.press(ActionToken::Back).await;
    assert_eq!(outcome.screen, Screen::Start);
    assert!(!outcome.transitioned);
    assert_eq!(outcome.notice, None);
    assert_eq!(harness.session.go_back(), Err(DialogueError::AtRoot));
    Ok(())
}

#[tokio::test]
async fn test_invalid_ratings_do_not_transition_or_write() -> Result<()> {
    let mut harness = Harness::new();
    harness.open_rating_screen().await;

    for raw in ["11", "-1", "abc", ""] {
        let outcome = harness.text(raw).await;
        assert_eq!(outcome.screen, Screen::SendRating, "input {raw:?}");
        assert!(!outcome.transitioned);
        assert_eq!(outcome.notice, Some(Notice::InvalidRating));
    }

    assert_eq!(harness.storage.rating_count().await, 0);
    assert_eq!(harness.storage.film_count().await, 0);
    Ok(())
}

#[tokio::test]
async fn test_rerating_updates_single_record() -> Result<()> {
    let mut harness = Harness::new();
    harness.open_rating_screen().await;

    harness.text("7").await;
    let outcome = harness.press(ActionToken::Rating(9)).await;
    assert_eq!(outcome.screen, Screen::RatingSubmitted);
    assert!(outcome.rendered.text.contains("9/10"));

    assert_eq!(harness.storage.rating_count().await, 1);
    assert_eq!(harness.rating_of("http://tinyurl/x").await?, Rating::new(9));

    // The confirmation replaced the rating screen in history
    assert_eq!(harness.session.history().peek(), Screen::RatingSubmitted);
    assert!(!harness.session.history().screens().contains(&Screen::SendRating));
    Ok(())
}

#[tokio::test]
async fn test_finish_rating_returns_to_main_menu() -> Result<()> {
    let mut harness = Harness::new();
    harness.open_rating_screen().await;
    harness.text("10").await;

    let outcome = harness.press(ActionToken::FinishRating).await;

    assert_eq!(outcome.screen, Screen::MainMenu);
    assert_eq!(outcome.notice, Some(Notice::RatingSaved));
    assert_eq!(harness.session.history().screens(), &[Screen::Start, Screen::MainMenu]);
    assert!(harness.session.screen_data(Screen::RatingSubmitted).is_none());
    Ok(())
}

#[tokio::test]
async fn test_review_flow_with_edit_and_submit() -> Result<()> {
    let mut harness = Harness::new();
    harness.text("/start").await;
    harness.press(ActionToken::MainMenu).await;
    harness.press(ActionToken::ReviewFilm).await;

    let outcome = harness.text("Heat").await;
    assert_eq!(outcome.screen, Screen::SelectSuggestion(Workflow::Review));
    assert!(outcome.rendered.offers(ActionToken::Suggestion(1)));

    let outcome = harness.press(ActionToken::Suggestion(1)).await;
    assert_eq!(outcome.screen, Screen::SendReview);
    assert!(outcome.rendered.text.contains("Heat (1986 film)"));

    let outcome = harness.text("   ").await;
    assert_eq!(outcome.notice, Some(Notice::EmptyText));
    assert_eq!(outcome.screen, Screen::SendReview);

    let outcome = harness.text("Too long").await;
    assert_eq!(outcome.screen, Screen::ConfirmReview);
    assert!(outcome.rendered.text.contains("Too long"));

    let outcome = harness.press(ActionToken::EditReview).await;
    assert_eq!(outcome.screen, Screen::SendReview);

    harness.text("A slow burn, worth it").await;
    let outcome = harness.press(ActionToken::SubmitReview).await;
    assert_eq!(outcome.screen, Screen::MainMenu);
    assert_eq!(outcome.notice, Some(Notice::ReviewSaved));

    let user_id = harness.storage.register_user(1001, "Ann").await?;
    let film_id = harness
        .storage
        .get_or_create_film("Heat (1986 film)", "http://tinyurl/heat86")
        .await?;
    let reviews = harness.storage.reviews_for(user_id, film_id).await;
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].review, "A slow burn, worth it");
    Ok(())
}

#[tokio::test]
async fn test_reviews_are_appended_not_replaced() -> Result<()> {
    let mut harness = Harness::new();
    harness.text("/start").await;
    harness.press(ActionToken::MainMenu).await;

    for review in ["First take", "Second take"] {
        harness.press(ActionToken::ReviewFilm).await;
        harness.text("Inception").await;
        harness.press(ActionToken::Suggestion(0)).await;
        harness.text(review).await;
        harness.press(ActionToken::SubmitReview).await;
    }

    let user_id = harness.storage.register_user(1001, "Ann").await?;
    let film_id = harness.storage.get_or_create_film("Inception", "http://tinyurl/x").await?;
    assert_eq!(harness.storage.reviews_for(user_id, film_id).await.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_nothing_found_stays_on_title_screen() -> Result<()> {
    let mut harness = Harness::new();
    harness.text("/start").await;
    harness.press(ActionToken::MainMenu).await;
    harness.press(ActionToken::RateFilm).await;

    let outcome = harness.text("Unknown picture").await;

    assert_eq!(outcome.screen, Screen::SendTitle(Workflow::Rate));
    assert_eq!(outcome.notice, Some(Notice::NothingFound));
    assert!(!outcome.transitioned);
    Ok(())
}

#[tokio::test]
async fn test_unrecognized_input_reprompts_same_screen() -> Result<()> {
    let mut harness = Harness::new();
    harness.text("/start").await;
    let menu = harness.press(ActionToken::MainMenu).await;

    let outcome = harness.text("hello there").await;
    assert_eq!(outcome.screen, Screen::MainMenu);
    assert_eq!(outcome.notice, Some(Notice::NotUnderstood));
    assert_eq!(outcome.rendered, menu.rendered);

    let outcome = harness
        .send(RawEvent::Callback("film_title-Inception".to_string()))
        .await;
    assert_eq!(outcome.screen, Screen::MainMenu);
    assert_eq!(outcome.notice, Some(Notice::NotUnderstood));

    // Stale button from an earlier screen
    let outcome = harness.press(ActionToken::SubmitReview).await;
    assert!(!outcome.transitioned);
    Ok(())
}

#[tokio::test]
async fn test_main_menu_control_from_workflow() -> Result<()> {
    let mut harness = Harness::new();
    harness.open_rating_screen().await;

    let outcome = harness.press(ActionToken::MainMenu).await;
    assert_eq!(outcome.screen, Screen::MainMenu);

    // Main menu keeps workflow data, so Back returns to the rating screen
    let outcome = harness.press(ActionToken::Back).await;
    assert_eq!(outcome.screen, Screen::SendRating);
    assert!(outcome.rendered.text.contains("Inception"));
    Ok(())
}

#[tokio::test]
async fn test_my_films_browsing_and_rating_from_info() -> Result<()> {
    let mut harness = Harness::new();
    harness.open_rating_screen().await;
    harness.text("6").await;
    harness.press(ActionToken::FinishRating).await;

    let outcome = harness.press(ActionToken::MyFilms).await;
    assert_eq!(outcome.screen, Screen::MyFilms);
    assert!(outcome.rendered.offers(ActionToken::Film(1)));

    let outcome = harness.press(ActionToken::Film(1)).await;
    assert_eq!(outcome.screen, Screen::FilmInfo);
    assert!(outcome.rendered.text.contains("Inception"));
    assert!(outcome.rendered.text.contains("6/10"));

    let outcome = harness.press(ActionToken::RateSelectedFilm).await;
    assert_eq!(outcome.screen, Screen::SendRating);

    harness.text("9").await;
    assert_eq!(harness.rating_of("http://tinyurl/x").await?, Rating::new(9));
    assert_eq!(harness.storage.film_count().await, 1);

    // Film info shows the rating just given, not the one it was opened with
    let outcome = harness.press(ActionToken::Back).await;
    assert_eq!(outcome.screen, Screen::FilmInfo);
    assert!(outcome.rendered.text.contains("9/10"));
    assert!(!outcome.rendered.text.contains("6/10"));
    Ok(())
}

#[tokio::test]
async fn test_edit_after_detour_keeps_reviewed_film() -> Result<()> {
    let mut harness = Harness::new();
    harness.text("/start").await;
    harness.press(ActionToken::MainMenu).await;
    harness.press(ActionToken::ReviewFilm).await;
    harness.text("Heat").await;
    harness.press(ActionToken::Suggestion(0)).await;
    let outcome = harness.text("Great heist film").await;
    assert_eq!(outcome.screen, Screen::ConfirmReview);

    // Start a second review for another film, then walk back to the first
    harness.press(ActionToken::MainMenu).await;
    harness.press(ActionToken::ReviewFilm).await;
    harness.text("Inception").await;
    let outcome = harness.press(ActionToken::Suggestion(0)).await;
    assert!(outcome.rendered.text.contains("Inception"));

    let mut outcome = outcome;
    for _ in 0..4 {
        outcome = harness.press(ActionToken::Back).await;
    }
    assert_eq!(outcome.screen, Screen::ConfirmReview);
    assert!(outcome.rendered.text.contains("Great heist film"));

    let outcome = harness.press(ActionToken::EditReview).await;
    assert_eq!(outcome.screen, Screen::SendReview);
    assert!(outcome.rendered.text.contains("Heat (1995 film)"));
    assert!(!outcome.rendered.text.contains("Inception"));

    harness.text("Edited heat review").await;
    let outcome = harness.press(ActionToken::SubmitReview).await;
    assert_eq!(outcome.notice, Some(Notice::ReviewSaved));

    let user_id = harness.storage.register_user(1001, "Ann").await?;
    let heat = harness
        .storage
        .get_or_create_film("Heat (1995 film)", "http://tinyurl/heat")
        .await?;
    let inception = harness.storage.get_or_create_film("Inception", "http://tinyurl/x").await?;
    let reviews = harness.storage.reviews_for(user_id, heat).await;
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].review, "Edited heat review");
    assert!(harness.storage.reviews_for(user_id, inception).await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_unsupported_message_reprompts_current_screen() -> Result<()> {
    let mut harness = Harness::new();
    let screens = harness.open_rating_screen().await;
    let history_len = harness.session.history().len();

    let outcome = harness
        .engine
        .reprompt(&harness.session, Some(Notice::UnsupportedMessage));

    assert_eq!(outcome.screen, Screen::SendRating);
    assert!(!outcome.transitioned);
    assert_eq!(outcome.notice, Some(Notice::UnsupportedMessage));
    assert_eq!(Some(&outcome.rendered), screens.last());
    assert_eq!(harness.session.history().len(), history_len);
    assert!(outcome.notice_text(None).is_some());
    Ok(())
}

#[tokio::test]
async fn test_unreachable_search_provider_reports_nothing_found() -> Result<()> {
    let config = SearchConfig {
        api_url: Some("http://127.0.0.1:9/w/api.php".to_string()),
        timeout_secs: 1,
        shorten_links: false,
        recovery: RecoveryConfig {
            circuit_breaker_threshold: 1,
            circuit_breaker_reset_secs: 3600,
        },
        ..SearchConfig::default()
    };
    let search = Arc::new(WikipediaFilmSearch::new(config, Arc::new(NoopShortener))?);
    let storage = Arc::new(MemoryStorage::new());
    let engine = DialogueEngine::new(storage, search.clone());
    let user = UserIdentity::new(1001, "Ann");
    let mut session = Session::new();

    engine.handle(&mut session, &user, Input::Start).await;
    engine
        .handle(&mut session, &user, Input::MenuAction(ActionToken::MainMenu))
        .await;
    engine
        .handle(&mut session, &user, Input::MenuAction(ActionToken::RateFilm))
        .await;

    for _ in 0..2 {
        let outcome = engine
            .handle(&mut session, &user, classify(RawEvent::Text("Heat".to_string())))
            .await;
        assert_eq!(outcome.screen, Screen::SendTitle(Workflow::Rate));
        assert_eq!(outcome.notice, Some(Notice::NothingFound));
        assert!(!outcome.transitioned);
    }
    assert!(search.is_circuit_open());
    Ok(())
}

#[tokio::test]
async fn test_unknown_film_id_is_rejected() -> Result<()> {
    let mut harness = Harness::new();
    harness.open_rating_screen().await;
    harness.text("6").await;
    harness.press(ActionToken::FinishRating).await;
    harness.press(ActionToken::MyFilms).await;

    let outcome = harness.press(ActionToken::Film(42)).await;

    assert_eq!(outcome.screen, Screen::MyFilms);
    assert!(!outcome.transitioned);
    Ok(())
}

#[tokio::test]
async fn test_start_registers_user_once() -> Result<()> {
    let mut harness = Harness::new();
    harness.text("/start").await;
    harness.text("/start").await;
    harness.engine.handle(&mut harness.session, &harness.user, Input::Start).await;

    assert_eq!(harness.storage.user_count().await, 1);
    Ok(())
}
