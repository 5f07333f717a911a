//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use teloxide::{ApiError, RequestError};
use tracing::{debug, warn};

use crate::dialogue::{classify, RawEvent};

use super::ui_builder::{build_keyboard, compose_text};
use super::{user_identity, BotContext};

/// Handle callback queries from inline keyboards.
///
/// A transition edits the message the button belongs to; a rejected press
/// leaves it untouched and shows the notice as a callback answer.
pub async fn callback_handler(bot: Bot, q: CallbackQuery, ctx: Arc<BotContext>) -> Result<()> {
    debug!(user_id = %q.from.id, "Received callback query from user");
    let identity = user_identity(&q.from);
    let data = q.data.clone().unwrap_or_default();

    let session = ctx.sessions.session(identity.external_id);
    let mut session = session.lock().await;

    let outcome = ctx
        .engine
        .handle(&mut session, &identity, classify(RawEvent::Callback(data)))
        .await;
    let language_code = session.language_code();

    // Answer the callback query to remove the loading state
    let mut answer = bot.answer_callback_query(q.id.clone());
    if let Some(notice) = outcome.notice_text(language_code) {
        answer = answer.text(notice);
    }
    answer.await?;

    if !outcome.transitioned {
        return Ok(());
    }

    let text = compose_text(&outcome, language_code);
    let keyboard = build_keyboard(&outcome.rendered);
    match &q.message {
        Some(message) => {
            match bot
                .edit_message_text(message.chat().id, message.id(), text.clone())
                .reply_markup(keyboard.clone())
                .await
            {
                Ok(_) => {}
                Err(e) if !needs_resend(&e) => {
                    debug!(user_id = %q.from.id, "Message already shows this screen");
                }
                Err(e) => {
                    warn!(user_id = %q.from.id, error = %e, "Failed to edit message, sending a new one");
                    bot.send_message(message.chat().id, text)
                        .reply_markup(keyboard)
                        .await?;
                }
            }
        }
        None => {
            bot.send_message(ChatId(identity.external_id), text)
                .reply_markup(keyboard)
                .await?;
        }
    }

    Ok(())
}

/// Whether a failed edit has to be followed by a fresh message.
///
/// Telegram rejects edits that leave the message unchanged; the user already
/// sees the screen then.
pub fn needs_resend(error: &RequestError) -> bool {
    !matches!(error, RequestError::Api(ApiError::MessageNotModified))
}
