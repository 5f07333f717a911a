//! # Session Store
//!
//! Per-user conversation state: the current screen, the payload stored for
//! each screen and the navigation history. Sessions live only as long as the
//! process and are handed out by the [`SessionRegistry`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::errors::DialogueError;

use super::history::NavigationHistory;
use super::screen::{Screen, ScreenData};

/// Conversation state of one user
///
/// Next to the history the session keeps the payload each history entry was
/// entered with, so Back restores the screen exactly even when the same
/// screen was entered again later with other data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Session {
    current: Screen,
    data: HashMap<Screen, ScreenData>,
    history: NavigationHistory,
    /// Payload per history entry, same length as `history`
    frames: Vec<ScreenData>,
    language_code: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            current: Screen::ROOT,
            data: HashMap::new(),
            history: NavigationHistory::new(),
            frames: vec![ScreenData::empty(Screen::ROOT)],
            language_code: None,
        }
    }

    pub fn current_screen(&self) -> Screen {
        self.current
    }

    /// Only transitions move the current screen; history top and current
    /// screen stay equal
    fn set_current_screen(&mut self, screen: Screen) {
        self.current = screen;
    }

    pub fn history(&self) -> &NavigationHistory {
        &self.history
    }

    pub fn language_code(&self) -> Option<&str> {
        self.language_code.as_deref()
    }

    pub fn set_language_code(&mut self, language_code: Option<String>) {
        if language_code.is_some() {
            self.language_code = language_code;
        }
    }

    /// Stored payload of a screen, or its empty payload when nothing is stored
    pub fn get_screen_data(&self, screen: Screen) -> ScreenData {
        self.data
            .get(&screen)
            .cloned()
            .unwrap_or_else(|| ScreenData::empty(screen))
    }

    /// Borrow the stored payload of a screen
    pub fn screen_data(&self, screen: Screen) -> Option<&ScreenData> {
        self.data.get(&screen)
    }

    /// Store a payload under its screen.
    ///
    /// Suggestion caches are merged by query so earlier searches survive;
    /// every other payload replaces the stored one.
    pub fn set_screen_data(&mut self, data: ScreenData) {
        let screen = data.screen();
        match (self.data.get_mut(&screen), data) {
            (
                Some(ScreenData::SelectSuggestion { cache: stored, .. }),
                ScreenData::SelectSuggestion { cache, .. },
            ) => stored.merge(cache),
            (_, data) => {
                self.data.insert(screen, data);
            }
        }
    }

    /// Apply `update` to the stored payload of `screen` and to every
    /// history entry of that screen
    pub fn update_payloads<F>(&mut self, screen: Screen, mut update: F)
    where
        F: FnMut(&mut ScreenData),
    {
        if let Some(data) = self.data.get_mut(&screen) {
            update(data);
        }
        for frame in self.frames.iter_mut().filter(|frame| frame.screen() == screen) {
            update(frame);
        }
    }

    /// Forward transition: store the payload, push the screen, make it current
    pub fn enter(&mut self, data: ScreenData) -> Screen {
        let screen = data.screen();
        self.set_screen_data(data);
        self.history.push(screen);
        self.frames.push(self.get_screen_data(screen));
        self.set_current_screen(screen);
        screen
    }

    /// Transition that takes the place of the current screen in history
    pub fn replace(&mut self, data: ScreenData) -> Screen {
        let screen = data.screen();
        self.set_screen_data(data);
        let frame = self.get_screen_data(screen);
        if self.history.is_at_root() {
            self.frames.push(frame);
        } else if let Some(top) = self.frames.last_mut() {
            *top = frame;
        }
        self.history.replace_top(screen);
        self.set_current_screen(screen);
        screen
    }

    /// Pop the history, restore the payload the new top was entered with
    /// and make it current
    pub fn go_back(&mut self) -> Result<Screen, DialogueError> {
        self.history.pop()?;
        self.frames.pop();
        if let Some(frame) = self.frames.last().cloned() {
            self.restore_frame(frame);
        }
        let top = self.history.peek();
        self.set_current_screen(top);
        Ok(top)
    }

    /// Put a history entry's payload back in place. Suggestion caches keep
    /// every query searched since; only the selected query is restored.
    fn restore_frame(&mut self, frame: ScreenData) {
        match frame {
            ScreenData::SelectSuggestion { .. } => self.set_screen_data(frame),
            other => {
                self.data.insert(other.screen(), other);
            }
        }
    }

    /// Drop all workflow payloads and return to the main menu with a fresh
    /// `Start → MainMenu` history
    pub fn complete_workflow(&mut self) -> Screen {
        self.data.retain(|screen, _| !screen.is_workflow_screen());
        self.data.insert(Screen::MainMenu, ScreenData::MainMenu);
        self.history.reset_to(&[Screen::MainMenu]);
        self.frames = vec![ScreenData::empty(Screen::ROOT), ScreenData::MainMenu];
        self.set_current_screen(Screen::MainMenu);
        Screen::MainMenu
    }

    /// Reset to the initial empty session; the user's language is kept
    pub fn clear(&mut self) {
        let language_code = self.language_code.take();
        *self = Self::new();
        self.language_code = language_code;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

struct RegistryEntry {
    session: Arc<tokio::sync::Mutex<Session>>,
    last_access: Instant,
}

/// Registry of live sessions keyed by the external user identity.
///
/// Each session sits behind its own async mutex: events of one user are
/// processed one at a time while different users never contend. Sessions
/// untouched for a while are dropped by [`SessionRegistry::evict_idle`].
pub struct SessionRegistry {
    sessions: Mutex<HashMap<i64, RegistryEntry>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Get the session of a user, creating it on first contact
    pub fn session(&self, user_id: i64) -> Arc<tokio::sync::Mutex<Session>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let entry = sessions.entry(user_id).or_insert_with(|| RegistryEntry {
            session: Arc::new(tokio::sync::Mutex::new(Session::new())),
            last_access: Instant::now(),
        });
        entry.last_access = Instant::now();
        Arc::clone(&entry.session)
    }

    /// Drop sessions not handed out for longer than `idle`.
    ///
    /// A session still held by a handler is kept. Returns the number of
    /// sessions dropped.
    pub fn evict_idle(&self, idle: Duration) -> usize {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        sessions.retain(|_, entry| {
            entry.last_access.elapsed() < idle || Arc::strong_count(&entry.session) > 1
        });
        before - sessions.len()
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
