//! Port traits for infrastructure boundaries.
//!
//! These are the ONLY abstractions in the engine. Everything else is concrete types.
//! Ports exist for:
//! - The record store (hosted REST table or in-memory)
//! - The auth service (hosted or in-memory)
//! - Clock/Random (for testing)

mod error;
mod external;
mod repos;
mod testing;
pub mod types;

pub use error::{AuthError, RepoError};
pub use external::AuthPort;
pub use repos::CharacterStore;
pub use testing::{ClockPort, RandomPort};
pub use types::{AuthSession, CharacterUpdate, NewCharacterRecord, StoredCharacterRow};

#[cfg(test)]
pub use external::MockAuthPort;
#[cfg(test)]
pub use repos::MockCharacterStore;
#[cfg(test)]
pub use testing::{MockClockPort, MockRandomPort};
