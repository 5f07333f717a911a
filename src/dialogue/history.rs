//! Backtrack stack of visited screens.

use crate::errors::DialogueError;

use super::screen::Screen;

/// Ordered stack of screens, most recent on top.
///
/// The bottom entry is always [`Screen::ROOT`] and is never popped, so the
/// stack is never empty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NavigationHistory {
    stack: Vec<Screen>,
}

impl NavigationHistory {
    pub fn new() -> Self {
        Self {
            stack: vec![Screen::ROOT],
        }
    }

    /// Enter a screen
    pub fn push(&mut self, screen: Screen) {
        self.stack.push(screen);
    }

    /// Remove and return the top screen.
    ///
    /// Fails with [`DialogueError::AtRoot`] when only the root is left.
    pub fn pop(&mut self) -> Result<Screen, DialogueError> {
        if self.is_at_root() {
            return Err(DialogueError::AtRoot);
        }
        self.stack.pop().ok_or(DialogueError::AtRoot)
    }

    /// Current top without mutation
    pub fn peek(&self) -> Screen {
        self.stack.last().copied().unwrap_or(Screen::ROOT)
    }

    /// Swap the top screen for another one; the root itself is never replaced
    pub fn replace_top(&mut self, screen: Screen) {
        if self.is_at_root() {
            self.push(screen);
        } else if let Some(top) = self.stack.last_mut() {
            *top = screen;
        }
    }

    /// Reset to the root followed by the given screens
    pub fn reset_to(&mut self, screens: &[Screen]) {
        self.stack.truncate(1);
        self.stack.extend(screens.iter().copied().filter(|s| *s != Screen::ROOT));
    }

    pub fn is_at_root(&self) -> bool {
        self.stack.len() <= 1
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Screens from root to top
    pub fn screens(&self) -> &[Screen] {
        &self.stack
    }
}

impl Default for NavigationHistory {
    fn default() -> Self {
        Self::new()
    }
}
