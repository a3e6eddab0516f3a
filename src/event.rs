//! Inbound events and outbound replies
//!
//! The chat transport is an external collaborator; these types are the
//! boundary it delivers events through and receives renders from.

use crate::render::Keyboard;

/// Who sent an inbound event, as reported by the chat platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sender {
    pub chat_id: i64,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl Sender {
    pub fn new(chat_id: i64) -> Self {
        Self {
            chat_id,
            username: None,
            first_name: None,
            last_name: None,
        }
    }
}

/// Slash commands understood by the bot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Todo,
    Today,
    New,
    Cancel,
    Skip,
}

impl Command {
    /// Parse a `/command` line; unknown commands yield None
    pub fn parse(text: &str) -> Option<Self> {
        // Tolerate the platform's `/command@botname` addressing form
        let word = text.trim().split_whitespace().next()?;
        let name = word.strip_prefix('/')?.split('@').next()?;
        match name {
            "start" => Some(Self::Start),
            "help" => Some(Self::Help),
            "todo" => Some(Self::Todo),
            "today" => Some(Self::Today),
            "new" => Some(Self::New),
            "cancel" => Some(Self::Cancel),
            "skip" => Some(Self::Skip),
            _ => None,
        }
    }
}

/// Payload of a single inbound event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A recognized slash command
    Command(Command),
    /// Free text, interpreted by the current conversation state
    Text(String),
    /// A button press carrying a flat action identifier
    Callback(String),
}

/// One inbound interaction event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Incoming {
    pub sender: Sender,
    pub payload: Payload,
}

impl Incoming {
    pub fn command(sender: Sender, command: Command) -> Self {
        Self {
            sender,
            payload: Payload::Command(command),
        }
    }

    pub fn text(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            payload: Payload::Text(text.into()),
        }
    }

    pub fn callback(sender: Sender, data: impl Into<String>) -> Self {
        Self {
            sender,
            payload: Payload::Callback(data.into()),
        }
    }
}

/// A formatted text block paired with an optional set of selectable options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<Keyboard>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    pub fn with_keyboard(text: impl Into<String>, keyboard: Keyboard) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }
}
