//! Task entity and the finalized draft used to create one

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::Priority;

/// A to-do item owned by exactly one user
///
/// `user_id` never changes after creation. `updated_at` refreshes on every
/// mutation. Whether a task is overdue is derived at render time, see
/// [`is_overdue`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub user_id: i64,
    pub category_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub priority: Priority,
    /// Calendar date; time-of-day is not semantically used
    pub due_date: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Derived display property: due date present and strictly before today.
    /// Completion does not clear it; a finished task can still show as late.
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        is_overdue(self.due_date, today)
    }
}

/// True iff `due_date` is present and strictly earlier than `today`
pub fn is_overdue(due_date: Option<NaiveDate>, today: NaiveDate) -> bool {
    due_date.is_some_and(|d| d < today)
}

/// Fields collected by the add-task conversation, ready to persist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub category_id: Option<i64>,
    pub priority: Priority,
    pub due_date: Option<NaiveDate>,
}
