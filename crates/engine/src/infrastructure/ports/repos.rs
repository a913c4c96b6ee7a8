//! Record store port.

use async_trait::async_trait;

use charsheet_domain::{CharacterId, UserId};

use super::error::RepoError;
use super::types::{CharacterUpdate, NewCharacterRecord, StoredCharacterRow};

/// Character rows keyed by store-assigned id and owned by one user.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CharacterStore: Send + Sync {
    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<StoredCharacterRow>, RepoError>;
    async fn get(&self, id: CharacterId) -> Result<Option<StoredCharacterRow>, RepoError>;
    /// Returns the id the store assigned.
    async fn insert(&self, record: NewCharacterRecord) -> Result<CharacterId, RepoError>;
    async fn update(&self, id: CharacterId, update: CharacterUpdate) -> Result<(), RepoError>;
    async fn delete(&self, id: CharacterId) -> Result<(), RepoError>;
}
