//! In-process adapters, used when no hosted store is configured and in tests.

mod auth;
mod store;

pub use auth::InMemoryAuth;
pub use store::InMemoryCharacterStore;
