//! PostgreSQL implementation of the storage service.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, info};
use sqlx::postgres::PgPool;
use std::collections::BTreeMap;

use crate::models::{Film, Rating};
use crate::storage::Storage;

/// Initialize the database schema
pub async fn init_database_schema(pool: &PgPool) -> Result<()> {
    info!("Initializing database schema...");

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id BIGSERIAL PRIMARY KEY,
            telegram_id BIGINT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create users table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS films (
            id BIGSERIAL PRIMARY KEY,
            title TEXT NOT NULL,
            wiki_link TEXT NOT NULL UNIQUE,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create films table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS ratings (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            film_id BIGINT NOT NULL REFERENCES films(id) ON DELETE CASCADE,
            rating SMALLINT NOT NULL CHECK (rating BETWEEN 0 AND 10),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (user_id, film_id)
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create ratings table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS reviews (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            film_id BIGINT NOT NULL REFERENCES films(id) ON DELETE CASCADE,
            review TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to create reviews table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_reviews_user_film ON reviews(user_id, film_id)")
        .execute(pool)
        .await
        .context("Failed to create reviews index")?;

    info!("Database schema initialized successfully");
    Ok(())
}

/// Storage backed by a PostgreSQL pool.
///
/// Film creation and rating upserts are single `INSERT ... ON CONFLICT`
/// statements, so concurrent submissions cannot create duplicates.
#[derive(Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and make sure the schema exists
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        init_database_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Number of reviews a user wrote for a film
    pub async fn count_reviews(&self, user_id: i64, film_id: i64) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM reviews WHERE user_id = $1 AND film_id = $2")
            .bind(user_id)
            .bind(film_id)
            .fetch_one(&self.pool)
            .await
            .context("Failed to count reviews")
    }
}

#[async_trait]
impl Storage for PgStorage {
    async fn get_user_id(&self, telegram_id: i64) -> Result<Option<i64>> {
        sqlx::query_scalar("SELECT id FROM users WHERE telegram_id = $1")
            .bind(telegram_id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to read user")
    }

    async fn create_user(&self, telegram_id: i64, display_name: &str) -> Result<i64> {
        info!("Creating user for telegram_id: {telegram_id}");

        let id: i64 = sqlx::query_scalar(
            "INSERT INTO users (telegram_id, display_name) VALUES ($1, $2)
             ON CONFLICT (telegram_id) DO UPDATE SET telegram_id = EXCLUDED.telegram_id
             RETURNING id",
        )
        .bind(telegram_id)
        .bind(display_name)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert user")?;

        Ok(id)
    }

    async fn get_or_create_film(&self, title: &str, link: &str) -> Result<i64> {
        // The no-op update makes RETURNING yield the existing row on conflict
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO films (title, wiki_link) VALUES ($1, $2)
             ON CONFLICT (wiki_link) DO UPDATE SET wiki_link = EXCLUDED.wiki_link
             RETURNING id",
        )
        .bind(title)
        .bind(link)
        .fetch_one(&self.pool)
        .await
        .context("Failed to get or create film")?;

        debug!("Film {title:?} resolved to ID: {id}");
        Ok(id)
    }

    async fn get_all_films(&self) -> Result<BTreeMap<i64, String>> {
        let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, title FROM films ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("Failed to list films")?;

        Ok(rows.into_iter().collect())
    }

    async fn get_film(&self, film_id: i64) -> Result<Option<Film>> {
        let row: Option<(i64, String, String, DateTime<Utc>)> = sqlx::query_as(
            "SELECT id, title, wiki_link, created_at FROM films WHERE id = $1",
        )
        .bind(film_id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to read film")?;

        Ok(row.map(|(id, title, wiki_link, created_at)| Film {
            id,
            title,
            wiki_link,
            created_at,
        }))
    }

    async fn upsert_rating(&self, user_id: i64, film_id: i64, rating: Rating) -> Result<()> {
        info!("Saving rating {rating} of film {film_id} for user {user_id}");

        sqlx::query(
            "INSERT INTO ratings (user_id, film_id, rating) VALUES ($1, $2, $3)
             ON CONFLICT (user_id, film_id)
             DO UPDATE SET rating = EXCLUDED.rating, updated_at = NOW()",
        )
        .bind(user_id)
        .bind(film_id)
        .bind(i16::from(rating.value()))
        .execute(&self.pool)
        .await
        .context("Failed to upsert rating")?;

        Ok(())
    }

    async fn insert_review(&self, user_id: i64, film_id: i64, review: &str) -> Result<i64> {
        info!("Saving review of film {film_id} for user {user_id}");

        sqlx::query_scalar(
            "INSERT INTO reviews (user_id, film_id, review) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(user_id)
        .bind(film_id)
        .bind(review)
        .fetch_one(&self.pool)
        .await
        .context("Failed to insert review")
    }

    async fn get_rating(&self, user_id: i64, film_id: i64) -> Result<Option<Rating>> {
        let value: Option<i16> =
            sqlx::query_scalar("SELECT rating FROM ratings WHERE user_id = $1 AND film_id = $2")
                .bind(user_id)
                .bind(film_id)
                .fetch_optional(&self.pool)
                .await
                .context("Failed to read rating")?;

        value
            .map(|v| Rating::try_from(i64::from(v)).map_err(anyhow::Error::msg))
            .transpose()
    }
}
