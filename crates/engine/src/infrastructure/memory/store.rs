//! In-memory character store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;

use charsheet_domain::{CharacterId, UserId};

use crate::infrastructure::ports::{
    CharacterStore, CharacterUpdate, NewCharacterRecord, RepoError, StoredCharacterRow,
};

#[derive(Debug, Clone)]
struct Row {
    id: CharacterId,
    owner: UserId,
    name: String,
    data: Value,
    updated_at: Option<DateTime<Utc>>,
}

impl Row {
    fn to_stored(&self) -> StoredCharacterRow {
        StoredCharacterRow {
            id: self.id,
            name: self.name.clone(),
            data: self.data.clone(),
        }
    }
}

/// Rows kept in insertion order; ids are generated on insert.
#[derive(Default)]
pub struct InMemoryCharacterStore {
    rows: RwLock<Vec<Row>>,
}

impl InMemoryCharacterStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row with a known id (tests and fixtures).
    pub async fn seed(&self, id: CharacterId, owner: UserId, name: &str, data: Value) {
        self.rows.write().await.push(Row {
            id,
            owner,
            name: name.to_string(),
            data,
            updated_at: None,
        });
    }

    pub async fn updated_at(&self, id: CharacterId) -> Option<DateTime<Utc>> {
        self.rows
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .and_then(|r| r.updated_at)
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

#[async_trait]
impl CharacterStore for InMemoryCharacterStore {
    async fn list_by_owner(&self, owner: UserId) -> Result<Vec<StoredCharacterRow>, RepoError> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .filter(|r| r.owner == owner)
            .map(Row::to_stored)
            .collect())
    }

    async fn get(&self, id: CharacterId) -> Result<Option<StoredCharacterRow>, RepoError> {
        Ok(self
            .rows
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .map(Row::to_stored))
    }

    async fn insert(&self, record: NewCharacterRecord) -> Result<CharacterId, RepoError> {
        let id = CharacterId::new();
        self.rows.write().await.push(Row {
            id,
            owner: record.owner,
            name: record.name,
            data: record.data,
            updated_at: None,
        });
        Ok(id)
    }

    async fn update(&self, id: CharacterId, update: CharacterUpdate) -> Result<(), RepoError> {
        let mut rows = self.rows.write().await;
        let row = rows
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| RepoError::not_found("Character", id))?;
        row.name = update.name;
        row.data = update.data;
        row.updated_at = Some(update.updated_at);
        Ok(())
    }

    async fn delete(&self, id: CharacterId) -> Result<(), RepoError> {
        self.rows.write().await.retain(|r| r.id != id);
        Ok(())
    }
}
