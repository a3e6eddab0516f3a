//! Dispatch error taxonomy
//!
//! Errors are handled locally: every variant maps to a visible, non-fatal
//! notice and nothing ever escapes the dispatch loop. Unauthorized access is
//! indistinguishable from not-found in the notice (never leak the existence
//! of other users' data) but stays distinct internally for logging.

use thiserror::Error;

use crate::conversation::ConvError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum BotError {
    /// The sender has no user record yet
    #[error("no user record for chat {0}")]
    UnknownUser(i64),

    /// Entity absent (or treated as such)
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },

    /// Entity exists but belongs to another user
    #[error("{kind} {id} belongs to another user")]
    Unauthorized { kind: &'static str, id: i64 },

    /// Malformed date, empty required field, unparseable argument
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Store read/write failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl BotError {
    /// The notice shown to the user. Unauthorized deliberately renders the
    /// same as not-found.
    pub fn user_notice(&self) -> String {
        match self {
            Self::UnknownUser(_) => "❌ I don't know you yet. Send /start first!".to_string(),
            Self::NotFound { .. } | Self::Unauthorized { .. } => "❌ That item doesn't exist.".to_string(),
            Self::InvalidInput(msg) => format!("❌ {}", msg),
            Self::Store(_) => "⚠️ Something went wrong. Please try again.".to_string(),
        }
    }
}

impl From<ConvError> for BotError {
    fn from(err: ConvError) -> Self {
        match err {
            ConvError::NotActive => Self::InvalidInput("No task in progress. Send /new to start one.".to_string()),
            ConvError::WrongState { .. } => {
                Self::InvalidInput("That doesn't match the current step. Use the buttons above.".to_string())
            }
            ConvError::EmptyTitle => Self::InvalidInput("Title cannot be empty. Please enter a title:".to_string()),
        }
    }
}
