//! Character sheet sync errors.

use crate::infrastructure::ports::RepoError;
use charsheet_domain::{CharacterId, DomainError};

/// Errors from sheet synchronization steps.
///
/// The public controller operations log these and carry on; they never
/// reach the view.
#[derive(Debug, thiserror::Error)]
pub enum SheetSyncError {
    #[error("No signed-in user")]
    NoSession,

    #[error("Character not found: {0}")]
    CharacterNotFound(CharacterId),

    #[error("Selection changed while loading {0}")]
    SelectionChanged(CharacterId),

    #[error("Session changed during the operation")]
    SessionChanged,

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Repository error: {0}")]
    Repo(#[from] RepoError),

    #[error("Document error: {0}")]
    Document(#[from] serde_json::Error),
}
