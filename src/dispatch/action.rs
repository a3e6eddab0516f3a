//! Callback action encoding
//!
//! Button presses arrive as a flat string: an action tag plus positional
//! `_`-delimited arguments. The string is decoded exactly once, here, into a
//! closed [`Action`] enum; the dispatcher then matches exhaustively instead
//! of chaining prefix checks. Encoding goes through `Display` so keyboards
//! and the decoder can never drift apart.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::Priority;

/// The date format used inside callback payloads and free-form input
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors from decoding a callback identifier
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionParseError {
    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("malformed arguments for {0}")]
    BadArguments(&'static str),
}

/// A decoded button press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MainMenu,
    ViewTasks,
    AddTask,
    ManageCategories,
    Settings,
    TaskDetail(i64),
    ToggleComplete(i64),
    DeleteTask(i64),
    ConfirmDelete(i64),
    Page(usize),
    EditPriority(i64),
    EditCategory(i64),
    EditDueDate(i64),
    SetPriority { task_id: i64, priority: Priority },
    SetCategory { task_id: i64, category_id: i64 },
    SetDueDate { task_id: i64, date: NaiveDate },
    /// Conversation: category picked while adding a task
    PickCategory(i64),
    /// Conversation: priority picked while adding a task
    PickPriority(Priority),
    /// Conversation: quick-pick due date while adding a task
    PickDueDate(NaiveDate),
    /// Conversation: user wants to type a date instead of quick-picking
    CustomDate,
}

impl std::str::FromStr for Action {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "main_menu" => return Ok(Self::MainMenu),
            "view_tasks" => return Ok(Self::ViewTasks),
            "add_task" => return Ok(Self::AddTask),
            "manage_categories" => return Ok(Self::ManageCategories),
            "settings" => return Ok(Self::Settings),
            "custom_date" => return Ok(Self::CustomDate),
            _ => {}
        }

        // Longer tags are checked before shorter ones sharing a prefix, so
        // `priority_` can never shadow `set_priority_` and so on.
        if let Some(rest) = s.strip_prefix("set_priority_") {
            let (task_id, code) = split_two("set_priority", rest)?;
            let priority =
                Priority::from_code(code).ok_or(ActionParseError::BadArguments("set_priority"))?;
            return Ok(Self::SetPriority { task_id, priority });
        }
        if let Some(rest) = s.strip_prefix("set_category_") {
            let (task_id, category_id) = split_two("set_category", rest)?;
            return Ok(Self::SetCategory { task_id, category_id });
        }
        if let Some(rest) = s.strip_prefix("set_duedate_") {
            let (id_part, date_part) = rest
                .split_once('_')
                .ok_or(ActionParseError::BadArguments("set_duedate"))?;
            let task_id = parse_id("set_duedate", id_part)?;
            let date = parse_date("set_duedate", date_part)?;
            return Ok(Self::SetDueDate { task_id, date });
        }
        if let Some(rest) = s.strip_prefix("edit_priority_") {
            return Ok(Self::EditPriority(parse_id("edit_priority", rest)?));
        }
        if let Some(rest) = s.strip_prefix("edit_category_") {
            return Ok(Self::EditCategory(parse_id("edit_category", rest)?));
        }
        if let Some(rest) = s.strip_prefix("edit_duedate_") {
            return Ok(Self::EditDueDate(parse_id("edit_duedate", rest)?));
        }
        if let Some(rest) = s.strip_prefix("confirm_delete_") {
            return Ok(Self::ConfirmDelete(parse_id("confirm_delete", rest)?));
        }
        if let Some(rest) = s.strip_prefix("delete_task_") {
            return Ok(Self::DeleteTask(parse_id("delete_task", rest)?));
        }
        if let Some(rest) = s.strip_prefix("task_detail_") {
            return Ok(Self::TaskDetail(parse_id("task_detail", rest)?));
        }
        if let Some(rest) = s.strip_prefix("select_category_") {
            return Ok(Self::PickCategory(parse_id("select_category", rest)?));
        }
        if let Some(rest) = s.strip_prefix("complete_") {
            return Ok(Self::ToggleComplete(parse_id("complete", rest)?));
        }
        if let Some(rest) = s.strip_prefix("priority_") {
            let code = parse_id("priority", rest)?;
            let priority = Priority::from_code(code).ok_or(ActionParseError::BadArguments("priority"))?;
            return Ok(Self::PickPriority(priority));
        }
        if let Some(rest) = s.strip_prefix("duedate_") {
            return Ok(Self::PickDueDate(parse_date("duedate", rest)?));
        }
        if let Some(rest) = s.strip_prefix("page_") {
            let page = rest
                .parse::<usize>()
                .map_err(|_| ActionParseError::BadArguments("page"))?;
            return Ok(Self::Page(page));
        }

        Err(ActionParseError::UnknownAction(s.to_string()))
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MainMenu => write!(f, "main_menu"),
            Self::ViewTasks => write!(f, "view_tasks"),
            Self::AddTask => write!(f, "add_task"),
            Self::ManageCategories => write!(f, "manage_categories"),
            Self::Settings => write!(f, "settings"),
            Self::CustomDate => write!(f, "custom_date"),
            Self::TaskDetail(id) => write!(f, "task_detail_{}", id),
            Self::ToggleComplete(id) => write!(f, "complete_{}", id),
            Self::DeleteTask(id) => write!(f, "delete_task_{}", id),
            Self::ConfirmDelete(id) => write!(f, "confirm_delete_{}", id),
            Self::Page(page) => write!(f, "page_{}", page),
            Self::EditPriority(id) => write!(f, "edit_priority_{}", id),
            Self::EditCategory(id) => write!(f, "edit_category_{}", id),
            Self::EditDueDate(id) => write!(f, "edit_duedate_{}", id),
            Self::SetPriority { task_id, priority } => {
                write!(f, "set_priority_{}_{}", task_id, priority.code())
            }
            Self::SetCategory { task_id, category_id } => {
                write!(f, "set_category_{}_{}", task_id, category_id)
            }
            Self::SetDueDate { task_id, date } => {
                write!(f, "set_duedate_{}_{}", task_id, date.format(DATE_FORMAT))
            }
            Self::PickCategory(id) => write!(f, "select_category_{}", id),
            Self::PickPriority(priority) => write!(f, "priority_{}", priority.code()),
            Self::PickDueDate(date) => write!(f, "duedate_{}", date.format(DATE_FORMAT)),
        }
    }
}

fn parse_id(tag: &'static str, s: &str) -> Result<i64, ActionParseError> {
    s.parse::<i64>().map_err(|_| ActionParseError::BadArguments(tag))
}

fn parse_date(tag: &'static str, s: &str) -> Result<NaiveDate, ActionParseError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|_| ActionParseError::BadArguments(tag))
}

fn split_two(tag: &'static str, rest: &str) -> Result<(i64, i64), ActionParseError> {
    let (a, b) = rest.split_once('_').ok_or(ActionParseError::BadArguments(tag))?;
    Ok((parse_id(tag, a)?, parse_id(tag, b)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Action {
        s.parse().unwrap()
    }

    #[test]
    fn test_exact_tags() {
        assert_eq!(parse("main_menu"), Action::MainMenu);
        assert_eq!(parse("view_tasks"), Action::ViewTasks);
        assert_eq!(parse("add_task"), Action::AddTask);
        assert_eq!(parse("custom_date"), Action::CustomDate);
    }

    #[test]
    fn test_single_id_tags() {
        assert_eq!(parse("task_detail_42"), Action::TaskDetail(42));
        assert_eq!(parse("complete_7"), Action::ToggleComplete(7));
        assert_eq!(parse("delete_task_3"), Action::DeleteTask(3));
        assert_eq!(parse("confirm_delete_3"), Action::ConfirmDelete(3));
        assert_eq!(parse("page_2"), Action::Page(2));
    }

    #[test]
    fn test_set_prefixes_not_shadowed_by_pick_prefixes() {
        // `priority_` and `set_priority_` share a suffix; ordering matters
        assert_eq!(
            parse("set_priority_5_1"),
            Action::SetPriority {
                task_id: 5,
                priority: Priority::High
            }
        );
        assert_eq!(parse("priority_1"), Action::PickPriority(Priority::High));

        let date: NaiveDate = "2026-12-31".parse().unwrap();
        assert_eq!(parse("set_duedate_5_2026-12-31"), Action::SetDueDate { task_id: 5, date });
        assert_eq!(parse("duedate_2026-12-31"), Action::PickDueDate(date));
    }

    #[test]
    fn test_set_category_vs_select_category() {
        assert_eq!(
            parse("set_category_5_2"),
            Action::SetCategory {
                task_id: 5,
                category_id: 2
            }
        );
        assert_eq!(parse("select_category_2"), Action::PickCategory(2));
    }

    #[test]
    fn test_rejects_malformed_arguments() {
        assert!("task_detail_abc".parse::<Action>().is_err());
        assert!("set_priority_5".parse::<Action>().is_err());
        assert!("set_priority_5_9".parse::<Action>().is_err());
        assert!("priority_0".parse::<Action>().is_err());
        assert!("duedate_31-12-2026".parse::<Action>().is_err());
        assert!("page_-1".parse::<Action>().is_err());
    }

    #[test]
    fn test_rejects_unknown_tags() {
        assert!("set_reminder_5".parse::<Action>().is_err());
        assert!("".parse::<Action>().is_err());
    }

    #[test]
    fn test_encode_decode_round_trip() {
        let date: NaiveDate = "2026-08-29".parse().unwrap();
        let actions = [
            Action::MainMenu,
            Action::TaskDetail(9),
            Action::ConfirmDelete(9),
            Action::Page(3),
            Action::EditDueDate(4),
            Action::SetPriority {
                task_id: 9,
                priority: Priority::Low,
            },
            Action::SetDueDate { task_id: 9, date },
            Action::PickCategory(2),
            Action::PickDueDate(date),
        ];
        for action in actions {
            assert_eq!(action.to_string().parse::<Action>().unwrap(), action);
        }
    }
}
