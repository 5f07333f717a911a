//! External collaborators of the dialogue engine: film search, link
//! shortening and the circuit breaker guarding them.

pub mod circuit_breaker;
pub mod film_search;
pub mod link_shortener;

pub use circuit_breaker::CircuitBreaker;
pub use film_search::{FilmSearch, WikipediaFilmSearch};
pub use link_shortener::{LinkShortener, NoopShortener, TinyUrlShortener};
