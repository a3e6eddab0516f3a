//! User entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A bot user, identified by the chat platform's numeric identity
///
/// Created lazily on first interaction. Deleting a user cascades to all of
/// their categories and tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Internal row id
    pub id: i64,
    /// External chat-platform identity
    pub chat_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Best display name available for greetings
    pub fn display_name(&self) -> &str {
        self.first_name
            .as_deref()
            .or(self.username.as_deref())
            .unwrap_or("there")
    }
}
