use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use tracing::{info, warn};

use kinobot::bot::{self, BotContext};
use kinobot::config::BotConfig;
use kinobot::db::PgStorage;
use kinobot::dialogue::DialogueEngine;
use kinobot::localization;
use kinobot::services::{LinkShortener, NoopShortener, TinyUrlShortener, WikipediaFilmSearch};
use kinobot::storage::{MemoryStorage, Storage};

/// Initialize tracing; `RUST_LOG` filters, `LOG_FORMAT=json` switches to JSON lines
fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);
    if std::env::var("LOG_FORMAT").is_ok_and(|format| format == "json") {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Periodically forget sessions of users that went quiet
fn spawn_session_sweeper(context: Arc<BotContext>, idle: Duration) {
    let period = (idle / 4).max(Duration::from_secs(60));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let evicted = context.sessions.evict_idle(idle);
            if evicted > 0 {
                info!(evicted, live = context.sessions.len(), "Dropped idle sessions");
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();
    init_logging();

    info!("Starting film rating bot");

    let config = BotConfig::from_env()?;
    localization::init_localization(&config.locales_dir)
        .with_context(|| format!("Failed to load locales from {}", config.locales_dir.display()))?;

    let storage: Arc<dyn Storage> = match &config.database_url {
        Some(url) => {
            info!("Connecting to PostgreSQL");
            Arc::new(PgStorage::connect(url).await?)
        }
        None => {
            warn!("DATABASE_URL not set, ratings and reviews are kept in memory only");
            Arc::new(MemoryStorage::new())
        }
    };

    let shortener: Arc<dyn LinkShortener> = if config.search.shorten_links {
        Arc::new(TinyUrlShortener::new(
            config.search.shortener_endpoint.clone(),
            config.search.timeout_secs,
        )?)
    } else {
        Arc::new(NoopShortener)
    };
    let search = Arc::new(WikipediaFilmSearch::new(config.search.clone(), shortener)?);

    let context = Arc::new(BotContext::new(DialogueEngine::new(storage, search)));
    spawn_session_sweeper(Arc::clone(&context), Duration::from_secs(config.session_idle_secs));

    let bot = Bot::new(&config.bot_token);
    if let Err(e) = bot.set_my_commands(bot::bot_commands(None)).await {
        warn!(error = %e, "Failed to register bot commands");
    }

    info!("Bot initialized, starting dispatcher");

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint(bot::message_handler))
        .branch(Update::filter_callback_query().endpoint(bot::callback_handler));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![context])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
