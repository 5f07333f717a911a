//! # Film Search Service
//!
//! Looks film titles up in Wikipedia and turns the matching pages into
//! suggestions with shortened links.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::config::SearchConfig;
use crate::models::Suggestion;

use super::circuit_breaker::CircuitBreaker;
use super::link_shortener::LinkShortener;

/// Similarity above which a candidate title counts as a match
pub const SIMILARITY_THRESHOLD: f64 = 0.9;

/// Disambiguation suffixes Wikipedia uses for film pages
const FILM_MARKERS: [&str; 2] = ["(film", "(фильм"];

/// Source of film suggestions for a free-text title query
#[async_trait]
pub trait FilmSearch: Send + Sync {
    /// Suggestions for `query`, possibly none; titles are unique
    async fn search(&self, query: &str) -> Result<Vec<Suggestion>>;
}

/// Search through the Wikipedia opensearch API
pub struct WikipediaFilmSearch {
    client: reqwest::Client,
    config: SearchConfig,
    shortener: Arc<dyn LinkShortener>,
    circuit_breaker: CircuitBreaker,
}

/// opensearch answers `[query, [titles], [descriptions], [urls]]`
type OpenSearchResponse = (String, Vec<String>, Vec<String>, Vec<String>);

impl WikipediaFilmSearch {
    pub fn new(config: SearchConfig, shortener: Arc<dyn LinkShortener>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("kinobot/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        let circuit_breaker = CircuitBreaker::new(config.recovery.clone());

        Ok(Self {
            client,
            config,
            shortener,
            circuit_breaker,
        })
    }

    /// Whether the provider is currently skipped after repeated failures
    pub fn is_circuit_open(&self) -> bool {
        self.circuit_breaker.is_open()
    }

    async fn fetch_candidates(&self, query: &str) -> Result<Vec<(String, String)>> {
        let limit = self.config.max_results.to_string();
        let (_, titles, _, urls): OpenSearchResponse = self
            .client
            .get(self.config.endpoint())
            .query(&[
                ("action", "opensearch"),
                ("search", query),
                ("limit", limit.as_str()),
                ("namespace", "0"),
                ("format", "json"),
            ])
            .send()
            .await
            .context("Search request failed")?
            .error_for_status()
            .context("Search provider returned an error status")?
            .json()
            .await
            .context("Failed to decode search response")?;

        Ok(titles.into_iter().zip(urls).collect())
    }
}

#[async_trait]
impl FilmSearch for WikipediaFilmSearch {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<Suggestion>> {
        if self.circuit_breaker.is_open() {
            warn!("Search provider circuit is open, skipping request");
            bail!("Search provider temporarily unavailable");
        }

        let candidates = match self.fetch_candidates(query).await {
            Ok(candidates) => {
                self.circuit_breaker.record_success();
                candidates
            }
            Err(e) => {
                self.circuit_breaker.record_failure();
                return Err(e);
            }
        };
        debug!("Provider returned {} candidates", candidates.len());

        let suggestions = self.to_suggestions(query, candidates).await;
        info!("Found {} suggestions", suggestions.len());
        Ok(suggestions)
    }
}

impl WikipediaFilmSearch {
    /// Keep matching candidates with unique titles and shorten their links
    async fn to_suggestions(&self, query: &str, candidates: Vec<(String, String)>) -> Vec<Suggestion> {
        let mut suggestions: Vec<Suggestion> = Vec::new();
        for (title, url) in candidates {
            if !is_match(query, &title) || suggestions.iter().any(|s| s.title == title) {
                continue;
            }
            let link = self.shortener.shorten(&url).await;
            suggestions.push(Suggestion::new(title, link));
        }
        suggestions
    }
}

/// Whether a candidate page title matches the user's query.
///
/// A title matches when it equals the query ignoring case, when the two are
/// nearly identical, or when it contains the query and carries a film
/// disambiguation suffix such as "Heat (1995 film)".
pub fn is_match(query: &str, title: &str) -> bool {
    let query = query.trim().to_lowercase();
    let title_lower = title.to_lowercase();
    if query.is_empty() {
        return false;
    }

    query == title_lower
        || similarity(&query, &title_lower) > SIMILARITY_THRESHOLD
        || (title_lower.contains(&query)
            && FILM_MARKERS.iter().any(|marker| title_lower.contains(marker)))
}

/// Ratcliff/Obershelp similarity in `[0, 1]`: twice the number of matching
/// characters divided by the total length
pub fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }
    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (start_a, start_b, len) = longest_common_block(a, b);
    if len == 0 {
        return 0;
    }
    len + matching_chars(&a[..start_a], &b[..start_b])
        + matching_chars(&a[start_a + len..], &b[start_b + len..])
}

/// Longest common contiguous block as (start in a, start in b, length)
fn longest_common_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    // lengths[j + 1] holds the length of the common suffix ending at a[i], b[j]
    let mut lengths = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        let mut next = vec![0usize; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            if ca == cb {
                next[j + 1] = lengths[j] + 1;
                if next[j + 1] > best.2 {
                    best = (i + 1 - next[j + 1], j + 1 - next[j + 1], next[j + 1]);
                }
            }
        }
        lengths = next;
    }
    best
}
