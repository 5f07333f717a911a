//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing::debug;

use crate::dialogue::{classify, Notice, RawEvent};

use super::ui_builder::{build_keyboard, compose_text};
use super::{user_identity, BotContext};

/// Handle a message: text goes through the dialogue engine, anything else
/// re-renders the current screen with a notice
pub async fn message_handler(bot: Bot, msg: Message, ctx: Arc<BotContext>) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        debug!(chat_id = %msg.chat.id, "Ignoring message without sender");
        return Ok(());
    };
    let identity = user_identity(user);

    let session = ctx.sessions.session(identity.external_id);
    // Held until the reply is sent so one user's events are answered in order
    let mut session = session.lock().await;

    let outcome = match msg.text() {
        Some(text) => {
            debug!(user_id = %identity.external_id, "Received text message");
            let input = classify(RawEvent::Text(text.to_string()));
            ctx.engine.handle(&mut session, &identity, input).await
        }
        None => {
            debug!(user_id = %identity.external_id, "Received unsupported message");
            session.set_language_code(identity.language_code.clone());
            ctx.engine.reprompt(&session, Some(Notice::UnsupportedMessage))
        }
    };

    let text = compose_text(&outcome, session.language_code());
    bot.send_message(msg.chat.id, text)
        .reply_markup(build_keyboard(&outcome.rendered))
        .await?;

    Ok(())
}
