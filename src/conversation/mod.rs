//! Add-task conversation state machine
//!
//! Collects the five fields of a new task across separate inbound events
//! from one user. Scratch state lives in a keyed in-memory map (chat id →
//! draft), so two users' conversations can never interleave fields. Nothing
//! here is durable: an in-progress conversation is deliberately lost on
//! restart.
//!
//! The registry holds only the semantic transitions; rendering prompts and
//! validating category ownership against the store are the dispatcher's job.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, warn};

use crate::domain::{NewTask, Priority};

/// Where a user currently is within the add-task flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvState {
    AwaitingTitle,
    AwaitingDescription,
    AwaitingCategory,
    AwaitingPriority,
    AwaitingDueDate,
}

/// Errors from feeding input into a conversation
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvError {
    #[error("no conversation in progress")]
    NotActive,

    #[error("input does not match the current step")]
    WrongState { expected: ConvState, actual: ConvState },

    #[error("title must not be empty")]
    EmptyTitle,
}

/// Per-user scratch record accumulated across the flow
#[derive(Debug, Clone, Default)]
struct Draft {
    title: String,
    description: String,
    category_id: Option<i64>,
    priority: Priority,
}

#[derive(Debug)]
struct Conversation {
    state: ConvState,
    draft: Draft,
}

/// Keyed store of in-progress conversations
///
/// Entries are created by [`start`](Self::start), advanced by the submit
/// methods, and removed on finalization or cancel. Entries for different
/// keys are fully independent.
#[derive(Debug, Default)]
pub struct ConversationRegistry {
    active: Mutex<HashMap<i64, Conversation>>,
}

impl ConversationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<i64, Conversation>> {
        match self.active.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Begin a new flow for this user, silently discarding any draft
    /// already in progress (explicit policy: a fresh start wins).
    pub fn start(&self, chat_id: i64) {
        let previous = self.guard().insert(
            chat_id,
            Conversation {
                state: ConvState::AwaitingTitle,
                draft: Draft::default(),
            },
        );
        if previous.is_some() {
            warn!(chat_id, "Discarded in-progress draft on new start");
        }
        debug!(chat_id, "Conversation started");
    }

    /// Current state of this user's conversation, if any
    pub fn state(&self, chat_id: i64) -> Option<ConvState> {
        self.guard().get(&chat_id).map(|c| c.state)
    }

    /// Abort the flow, clearing the scratch record. Returns whether a
    /// conversation was actually in progress.
    pub fn cancel(&self, chat_id: i64) -> bool {
        let removed = self.guard().remove(&chat_id).is_some();
        if removed {
            debug!(chat_id, "Conversation cancelled");
        }
        removed
    }

    /// AwaitingTitle: accept any non-empty text verbatim
    pub fn submit_title(&self, chat_id: i64, title: &str) -> Result<(), ConvError> {
        let title = title.trim();
        let mut active = self.guard();
        let conv = expect_state(&mut active, chat_id, ConvState::AwaitingTitle)?;
        if title.is_empty() {
            return Err(ConvError::EmptyTitle);
        }
        conv.draft.title = title.to_string();
        conv.state = ConvState::AwaitingDescription;
        Ok(())
    }

    /// AwaitingDescription: accept text verbatim
    pub fn submit_description(&self, chat_id: i64, description: &str) -> Result<(), ConvError> {
        let mut active = self.guard();
        let conv = expect_state(&mut active, chat_id, ConvState::AwaitingDescription)?;
        conv.draft.description = description.to_string();
        conv.state = ConvState::AwaitingCategory;
        Ok(())
    }

    /// AwaitingDescription: explicit skip leaves the description empty
    pub fn skip_description(&self, chat_id: i64) -> Result<(), ConvError> {
        let mut active = self.guard();
        let conv = expect_state(&mut active, chat_id, ConvState::AwaitingDescription)?;
        conv.draft.description.clear();
        conv.state = ConvState::AwaitingCategory;
        Ok(())
    }

    /// AwaitingCategory: record a category the dispatcher has already
    /// verified belongs to the acting user
    pub fn select_category(&self, chat_id: i64, category_id: i64) -> Result<(), ConvError> {
        let mut active = self.guard();
        let conv = expect_state(&mut active, chat_id, ConvState::AwaitingCategory)?;
        conv.draft.category_id = Some(category_id);
        conv.state = ConvState::AwaitingPriority;
        Ok(())
    }

    /// AwaitingPriority
    pub fn select_priority(&self, chat_id: i64, priority: Priority) -> Result<(), ConvError> {
        let mut active = self.guard();
        let conv = expect_state(&mut active, chat_id, ConvState::AwaitingPriority)?;
        conv.draft.priority = priority;
        conv.state = ConvState::AwaitingDueDate;
        Ok(())
    }

    /// AwaitingDueDate: the final field. Consumes and clears the scratch
    /// record, returning the finalized draft for the caller to persist.
    /// Terminal regardless of what the caller then does with it.
    pub fn submit_due_date(&self, chat_id: i64, due_date: NaiveDate) -> Result<NewTask, ConvError> {
        let mut active = self.guard();
        expect_state(&mut active, chat_id, ConvState::AwaitingDueDate)?;
        let conv = active.remove(&chat_id).ok_or(ConvError::NotActive)?;
        debug!(chat_id, "Conversation finalized");
        Ok(NewTask {
            title: conv.draft.title,
            description: conv.draft.description,
            category_id: conv.draft.category_id,
            priority: conv.draft.priority,
            due_date: Some(due_date),
        })
    }
}

fn expect_state<'a>(
    active: &'a mut HashMap<i64, Conversation>,
    chat_id: i64,
    expected: ConvState,
) -> Result<&'a mut Conversation, ConvError> {
    let conv = active.get_mut(&chat_id).ok_or(ConvError::NotActive)?;
    if conv.state != expected {
        return Err(ConvError::WrongState {
            expected,
            actual: conv.state,
        });
    }
    Ok(conv)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_linear_flow_accumulates_all_fields() {
        let reg = ConversationRegistry::new();
        reg.start(7);

        reg.submit_title(7, "Buy milk").unwrap();
        assert_eq!(reg.state(7), Some(ConvState::AwaitingDescription));

        reg.submit_description(7, "two liters").unwrap();
        reg.select_category(7, 2).unwrap();
        reg.select_priority(7, Priority::High).unwrap();

        let new_task = reg.submit_due_date(7, date("2026-08-29")).unwrap();
        assert_eq!(new_task.title, "Buy milk");
        assert_eq!(new_task.description, "two liters");
        assert_eq!(new_task.category_id, Some(2));
        assert_eq!(new_task.priority, Priority::High);
        assert_eq!(new_task.due_date, Some(date("2026-08-29")));

        // Finalization clears the scratch record
        assert_eq!(reg.state(7), None);
    }

    #[test]
    fn test_skip_leaves_description_empty() {
        let reg = ConversationRegistry::new();
        reg.start(7);
        reg.submit_title(7, "t").unwrap();
        reg.skip_description(7).unwrap();
        reg.select_category(7, 1).unwrap();
        reg.select_priority(7, Priority::Medium).unwrap();
        let new_task = reg.submit_due_date(7, date("2026-08-29")).unwrap();
        assert_eq!(new_task.description, "");
    }

    #[test]
    fn test_empty_title_rejected_state_unchanged() {
        let reg = ConversationRegistry::new();
        reg.start(7);
        assert_eq!(reg.submit_title(7, "   "), Err(ConvError::EmptyTitle));
        assert_eq!(reg.state(7), Some(ConvState::AwaitingTitle));
    }

    #[test]
    fn test_cancel_clears_scratch_from_any_state() {
        let reg = ConversationRegistry::new();
        reg.start(7);
        reg.submit_title(7, "t").unwrap();
        reg.submit_description(7, "d").unwrap();

        assert!(reg.cancel(7));
        assert_eq!(reg.state(7), None);
        // Cancel with nothing in progress reports false
        assert!(!reg.cancel(7));
    }

    #[test]
    fn test_out_of_order_input_rejected_without_losing_fields() {
        let reg = ConversationRegistry::new();
        reg.start(7);
        reg.submit_title(7, "kept").unwrap();

        let err = reg.select_priority(7, Priority::Low).unwrap_err();
        assert!(matches!(err, ConvError::WrongState { .. }));

        // Still awaiting the description and the title survived
        reg.submit_description(7, "d").unwrap();
        reg.select_category(7, 1).unwrap();
        reg.select_priority(7, Priority::Low).unwrap();
        let new_task = reg.submit_due_date(7, date("2026-08-29")).unwrap();
        assert_eq!(new_task.title, "kept");
    }

    #[test]
    fn test_restart_discards_previous_draft() {
        let reg = ConversationRegistry::new();
        reg.start(7);
        reg.submit_title(7, "old").unwrap();

        reg.start(7);
        assert_eq!(reg.state(7), Some(ConvState::AwaitingTitle));
        reg.submit_title(7, "new").unwrap();
        reg.skip_description(7).unwrap();
        reg.select_category(7, 1).unwrap();
        reg.select_priority(7, Priority::Medium).unwrap();
        assert_eq!(reg.submit_due_date(7, date("2026-08-29")).unwrap().title, "new");
    }

    #[test]
    fn test_users_do_not_interleave() {
        let reg = ConversationRegistry::new();
        reg.start(1);
        reg.start(2);

        reg.submit_title(1, "alice task").unwrap();
        reg.submit_title(2, "bob task").unwrap();
        reg.skip_description(1).unwrap();
        reg.submit_description(2, "bob description").unwrap();
        reg.select_category(1, 10).unwrap();
        reg.select_category(2, 20).unwrap();
        reg.select_priority(1, Priority::High).unwrap();
        reg.select_priority(2, Priority::Low).unwrap();

        let a = reg.submit_due_date(1, date("2026-08-29")).unwrap();
        let b = reg.submit_due_date(2, date("2026-09-01")).unwrap();

        assert_eq!(a.title, "alice task");
        assert_eq!(a.category_id, Some(10));
        assert_eq!(b.title, "bob task");
        assert_eq!(b.description, "bob description");
        assert_eq!(b.category_id, Some(20));
    }

    #[test]
    fn test_input_without_conversation_is_not_active() {
        let reg = ConversationRegistry::new();
        assert_eq!(reg.submit_title(7, "t"), Err(ConvError::NotActive));
        assert_eq!(reg.state(7), None);
    }
}
