//! Records exchanged with the record store and auth service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use charsheet_domain::{CharacterId, UserId};

/// One stored character row as listed or fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredCharacterRow {
    pub id: CharacterId,
    pub name: String,
    /// The sheet document. May be partial, stale or `null`.
    #[serde(default)]
    pub data: Value,
}

/// Payload for inserting a new character.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCharacterRecord {
    #[serde(rename = "user_id")]
    pub owner: UserId,
    pub name: String,
    pub data: Value,
}

/// Payload for updating a stored character.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CharacterUpdate {
    pub name: String,
    pub data: Value,
    pub updated_at: DateTime<Utc>,
}

/// An authenticated session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub user_id: UserId,
    pub email: Option<String>,
    /// Bearer token for store calls made on the user's behalf.
    pub access_token: String,
}
