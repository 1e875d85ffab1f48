use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

pub type Id = Uuid;

/// Stored account. Carries the password hash, so it is only ever serialized
/// into the repository snapshot, never into an HTTP response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub id: Id,
    pub email: String, // normalized (case-folded)
    pub full_name: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Account to insert. The id is chosen by the caller so a token can be
/// minted for it before anything is written.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub id: Id,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
}

/// Client-facing projection of an [`Account`].
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PublicAccount {
    pub id: Id,
    pub email: String,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for PublicAccount {
    fn from(a: &Account) -> Self {
        Self {
            id: a.id,
            email: a.email.clone(),
            full_name: a.full_name.clone(),
            created_at: a.created_at,
        }
    }
}
