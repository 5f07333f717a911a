//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: Handles incoming text and unsupported messages
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `ui_builder`: Turns rendered screens into message text and keyboards

pub mod callback_handler;
pub mod message_handler;
pub mod ui_builder;

use teloxide::types::{BotCommand, User};

use crate::dialogue::{DialogueEngine, SessionRegistry, UserIdentity};
use crate::localization::t_lang;

// Re-export main handler functions for use in main.rs
pub use callback_handler::{callback_handler, needs_resend};
pub use message_handler::message_handler;

pub use ui_builder::{build_keyboard, compose_text};

/// Shared state handed to every handler through the dispatcher
pub struct BotContext {
    pub engine: DialogueEngine,
    pub sessions: SessionRegistry,
}

impl BotContext {
    pub fn new(engine: DialogueEngine) -> Self {
        Self {
            engine,
            sessions: SessionRegistry::new(),
        }
    }
}

/// Identity of a Telegram user as seen by the dialogue engine
pub fn user_identity(user: &User) -> UserIdentity {
    UserIdentity {
        external_id: user.id.0 as i64,
        display_name: user.full_name(),
        language_code: user.language_code.clone(),
    }
}

/// Commands shown in Telegram's command menu
pub fn bot_commands(language_code: Option<&str>) -> Vec<BotCommand> {
    [
        ("start", "command-start"),
        ("main_menu", "command-main-menu"),
        ("my_films", "command-my-films"),
        ("help", "command-help"),
        ("cancel", "command-cancel"),
    ]
    .into_iter()
    .map(|(command, key)| BotCommand::new(command, t_lang(key, language_code)))
    .collect()
}
