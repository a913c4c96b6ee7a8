//! Use cases - User story orchestration.
//!
//! Each module contains use cases for one area of the app. Use cases
//! orchestrate the domain and the ports to fulfill user stories.

pub mod auth;
pub mod character_sheet;
pub mod dice;

pub use auth::{AuthMode, AuthUseCases, LoginForm, LoginOutcome};
pub use character_sheet::{PendingSave, SheetController, SheetSyncError};
pub use dice::DiceRoller;
