use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifiers assigned by the record store or the auth service.
macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }

            /// Parse from the canonical hyphenated form.
            pub fn parse(s: &str) -> Result<Self, crate::DomainError> {
                Uuid::parse_str(s.trim()).map(Self).map_err(|e| {
                    crate::DomainError::invalid_id(format!(
                        "{} '{}': {}",
                        stringify!($name),
                        s,
                        e
                    ))
                })
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }
    };
}

/// Client-generated identifiers for list entries inside a sheet.
///
/// These are opaque strings rather than UUIDs: stored documents carry
/// entries such as `"1"` from the starter template alongside generated ids.
macro_rules! define_entry_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Generate a fresh, unique id.
            pub fn new() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value)
            }
        }
    };
}

// Store and auth IDs
define_id!(CharacterId);
define_id!(UserId);

// Sheet entry IDs
define_entry_id!(InventoryItemId);
define_entry_id!(FeatureId);
define_entry_id!(WeaponId);
define_entry_id!(SpellId);
