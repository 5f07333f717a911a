//! # Storage Service
//!
//! Interface through which the dialogue engine reads and writes users, films,
//! ratings and reviews, plus an in-memory implementation used when no
//! database is configured and in tests.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;

use crate::models::{Film, Rating, Review, User};

/// Record store keyed by surrogate ids.
///
/// `get_or_create_film` and `upsert_rating` are check-then-act operations and
/// every implementation must execute each of them atomically.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn get_user_id(&self, telegram_id: i64) -> Result<Option<i64>>;

    /// Create a user; returns the existing id when the telegram id is known
    async fn create_user(&self, telegram_id: i64, display_name: &str) -> Result<i64>;

    /// Resolve a film by `link`, creating it when unknown
    async fn get_or_create_film(&self, title: &str, link: &str) -> Result<i64>;

    /// All films as id → title, ordered by id
    async fn get_all_films(&self) -> Result<BTreeMap<i64, String>>;

    async fn get_film(&self, film_id: i64) -> Result<Option<Film>>;

    /// Insert the user's rating of a film or update it in place
    async fn upsert_rating(&self, user_id: i64, film_id: i64, rating: Rating) -> Result<()>;

    /// Append a review; returns the review id
    async fn insert_review(&self, user_id: i64, film_id: i64, review: &str) -> Result<i64>;

    async fn get_rating(&self, user_id: i64, film_id: i64) -> Result<Option<Rating>>;

    /// Register a user exactly once
    async fn register_user(&self, telegram_id: i64, display_name: &str) -> Result<i64> {
        match self.get_user_id(telegram_id).await? {
            Some(id) => Ok(id),
            None => self.create_user(telegram_id, display_name).await,
        }
    }
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    films: Vec<Film>,
    ratings: HashMap<(i64, i64), Rating>,
    reviews: Vec<Review>,
}

/// Process-local storage; a single lock makes every operation atomic
#[derive(Default)]
pub struct MemoryStorage {
    tables: Mutex<Tables>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored films
    pub async fn film_count(&self) -> usize {
        self.tables.lock().await.films.len()
    }

    /// Number of stored ratings
    pub async fn rating_count(&self) -> usize {
        self.tables.lock().await.ratings.len()
    }

    pub async fn user_count(&self) -> usize {
        self.tables.lock().await.users.len()
    }

    /// Reviews written by a user for a film, oldest first
    pub async fn reviews_for(&self, user_id: i64, film_id: i64) -> Vec<Review> {
        self.tables
            .lock()
            .await
            .reviews
            .iter()
            .filter(|r| r.user_id == user_id && r.film_id == film_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn get_user_id(&self, telegram_id: i64) -> Result<Option<i64>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.telegram_id == telegram_id)
            .map(|u| u.id))
    }

    async fn create_user(&self, telegram_id: i64, display_name: &str) -> Result<i64> {
        let mut tables = self.tables.lock().await;
        if let Some(user) = tables.users.iter().find(|u| u.telegram_id == telegram_id) {
            return Ok(user.id);
        }

        let id = tables.users.len() as i64 + 1;
        tables.users.push(User {
            id,
            telegram_id,
            display_name: display_name.to_string(),
            created_at: Utc::now(),
        });
        info!("User created with ID: {id}");
        Ok(id)
    }

    async fn get_or_create_film(&self, title: &str, link: &str) -> Result<i64> {
        let mut tables = self.tables.lock().await;
        if let Some(film) = tables.films.iter().find(|f| f.wiki_link == link) {
            debug!("Film already stored with ID: {}", film.id);
            return Ok(film.id);
        }

        let id = tables.films.len() as i64 + 1;
        tables.films.push(Film {
            id,
            title: title.to_string(),
            wiki_link: link.to_string(),
            created_at: Utc::now(),
        });
        info!("Film created with ID: {id}");
        Ok(id)
    }

    async fn get_all_films(&self) -> Result<BTreeMap<i64, String>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .films
            .iter()
            .map(|f| (f.id, f.title.clone()))
            .collect())
    }

    async fn get_film(&self, film_id: i64) -> Result<Option<Film>> {
        let tables = self.tables.lock().await;
        Ok(tables.films.iter().find(|f| f.id == film_id).cloned())
    }

    async fn upsert_rating(&self, user_id: i64, film_id: i64, rating: Rating) -> Result<()> {
        let mut tables = self.tables.lock().await;
        tables.ratings.insert((user_id, film_id), rating);
        Ok(())
    }

    async fn insert_review(&self, user_id: i64, film_id: i64, review: &str) -> Result<i64> {
        let mut tables = self.tables.lock().await;
        let id = tables.reviews.len() as i64 + 1;
        tables.reviews.push(Review {
            id,
            user_id,
            film_id,
            review: review.to_string(),
            created_at: Utc::now(),
        });
        Ok(id)
    }

    async fn get_rating(&self, user_id: i64, film_id: i64) -> Result<Option<Rating>> {
        let tables = self.tables.lock().await;
        Ok(tables.ratings.get(&(user_id, film_id)).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_register_user_is_idempotent() -> Result<()> {
        let storage = MemoryStorage::new();
        let first = storage.register_user(100, "Ann").await?;
        let second = storage.register_user(100, "Ann B.").await?;

        assert_eq!(first, second);
        assert_eq!(storage.user_count().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_film_deduplicated_by_link() -> Result<()> {
        let storage = MemoryStorage::new();
        let first = storage.get_or_create_film("Inception", "http://tinyurl/x").await?;
        let second = storage.get_or_create_film("Inception", "http://tinyurl/x").await?;
        let other = storage.get_or_create_film("Inception", "http://tinyurl/y").await?;

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(storage.film_count().await, 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_rating_upsert_keeps_single_record() -> Result<()> {
        let storage = MemoryStorage::new();
        let user = storage.register_user(1, "Ann").await?;
        let film = storage.get_or_create_film("Heat", "http://heat").await?;

        storage.upsert_rating(user, film, Rating::new(7).unwrap()).await?;
        storage.upsert_rating(user, film, Rating::new(9).unwrap()).await?;

        assert_eq!(storage.rating_count().await, 1);
        assert_eq!(storage.get_rating(user, film).await?, Rating::new(9));
        Ok(())
    }

    #[tokio::test]
    async fn test_reviews_are_appended() -> Result<()> {
        let storage = MemoryStorage::new();
        let user = storage.register_user(1, "Ann").await?;
        let film = storage.get_or_create_film("Heat", "http://heat").await?;

        storage.insert_review(user, film, "Great").await?;
        storage.insert_review(user, film, "Still great").await?;

        let reviews = storage.reviews_for(user, film).await;
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[1].review, "Still great");
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_get_or_create_film() -> Result<()> {
        let storage = Arc::new(MemoryStorage::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let storage = Arc::clone(&storage);
            handles.push(tokio::spawn(async move {
                storage.get_or_create_film("Up", "http://up").await
            }));
        }

        let mut ids = Vec::new();
        for handle in handles {
            ids.push(handle.await??);
        }
        ids.dedup();

        assert_eq!(ids.len(), 1);
        assert_eq!(storage.film_count().await, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_get_all_films_ordered_by_id() -> Result<()> {
        let storage = MemoryStorage::new();
        storage.get_or_create_film("B", "http://b").await?;
        storage.get_or_create_film("A", "http://a").await?;

        let films = storage.get_all_films().await?;
        assert_eq!(films.into_iter().collect::<Vec<_>>(), vec![(1, "B".to_string()), (2, "A".to_string())]);
        assert!(storage.get_film(99).await?.is_none());
        Ok(())
    }
}
