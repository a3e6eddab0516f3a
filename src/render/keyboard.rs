//! Keyboard builder
//!
//! Turns entities plus pagination state into selectable-option layouts.
//! Button data strings are produced from [`Action`] values so the encoding
//! always matches what the dispatcher decodes.

use chrono::{Days, NaiveDate};

use crate::dispatch::Action;
use crate::domain::{Category, Priority, Task};

/// One selectable option
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    /// Flat action identifier delivered back on press
    pub data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            data: action.to_string(),
        }
    }
}

/// Rows of selectable options attached to a reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keyboard {
    pub rows: Vec<Vec<Button>>,
}

impl Keyboard {
    pub fn new() -> Self {
        Self::default()
    }

    fn row(mut self, row: Vec<Button>) -> Self {
        self.rows.push(row);
        self
    }

    /// Flattened view of every button, for tests and text transports
    pub fn buttons(&self) -> impl Iterator<Item = &Button> {
        self.rows.iter().flatten()
    }
}

/// Top-level menu
pub fn main_menu() -> Keyboard {
    Keyboard::new()
        .row(vec![Button::new("📝 My tasks", Action::ViewTasks)])
        .row(vec![Button::new("➕ Add task", Action::AddTask)])
        .row(vec![Button::new("📂 Categories", Action::ManageCategories)])
        .row(vec![Button::new("⚙️ Settings", Action::Settings)])
}

/// Paged task list: exactly the tasks in `[page*size, page*size+size)`,
/// a previous control iff `page > 0`, a next control iff more tasks remain,
/// and a fixed back control.
pub fn task_list(tasks: &[Task], page: usize, page_size: usize) -> Keyboard {
    let start = page * page_size;
    let end = (start + page_size).min(tasks.len());
    let mut keyboard = Keyboard::new();

    for task in tasks.get(start..end).unwrap_or(&[]) {
        let status = if task.completed { "✅" } else { "⬜" };
        let title: String = task.title.chars().take(30).collect();
        let label = format!("{} {} {}", status, task.priority.glyph(), title);
        keyboard.rows.push(vec![Button::new(label, Action::TaskDetail(task.id))]);
    }

    let mut nav = Vec::new();
    if page > 0 {
        nav.push(Button::new("⬅️ Previous", Action::Page(page - 1)));
    }
    if end < tasks.len() {
        nav.push(Button::new("Next ➡️", Action::Page(page + 1)));
    }
    if !nav.is_empty() {
        keyboard.rows.push(nav);
    }

    keyboard.row(vec![Button::new("🔙 Back", Action::MainMenu)])
}

/// Controls shown under a single task's detail view
pub fn task_detail(task_id: i64) -> Keyboard {
    Keyboard::new()
        .row(vec![
            Button::new("✅ Toggle done", Action::ToggleComplete(task_id)),
            Button::new("🏷️ Priority", Action::EditPriority(task_id)),
        ])
        .row(vec![
            Button::new("📂 Category", Action::EditCategory(task_id)),
            Button::new("📅 Due date", Action::EditDueDate(task_id)),
        ])
        .row(vec![
            Button::new("🗑️ Delete", Action::DeleteTask(task_id)),
            Button::new("🔙 Back", Action::ViewTasks),
        ])
}

/// Priority picker. With `task_id` it edits an existing task and carries a
/// back control; without, it feeds the add-task conversation.
pub fn priority_picker(task_id: Option<i64>) -> Keyboard {
    let row = Priority::ALL
        .into_iter()
        .map(|p| {
            let action = match task_id {
                Some(id) => Action::SetPriority {
                    task_id: id,
                    priority: p,
                },
                None => Action::PickPriority(p),
            };
            Button::new(p.label(), action)
        })
        .collect();

    let keyboard = Keyboard::new().row(row);
    match task_id {
        Some(id) => keyboard.row(vec![Button::new("🔙 Back", Action::TaskDetail(id))]),
        None => keyboard,
    }
}

/// Category picker over the user's current category set
pub fn category_picker(categories: &[Category], task_id: Option<i64>) -> Keyboard {
    let mut keyboard = Keyboard::new();
    for category in categories {
        let action = match task_id {
            Some(id) => Action::SetCategory {
                task_id: id,
                category_id: category.id,
            },
            None => Action::PickCategory(category.id),
        };
        keyboard.rows.push(vec![Button::new(format!("■ {}", category.name), action)]);
    }
    match task_id {
        Some(id) => keyboard.row(vec![Button::new("🔙 Back", Action::TaskDetail(id))]),
        None => keyboard,
    }
}

/// Due-date picker: quick-pick offers for today, tomorrow and next week,
/// plus a free-form entry option in the add-task flow.
pub fn due_date_picker(task_id: Option<i64>, today: NaiveDate) -> Keyboard {
    let offers = [
        ("Today", today),
        ("Tomorrow", today + Days::new(1)),
        ("Next week", today + Days::new(7)),
    ];

    let mut keyboard = Keyboard::new();
    for (label, date) in offers {
        let action = match task_id {
            Some(id) => Action::SetDueDate { task_id: id, date },
            None => Action::PickDueDate(date),
        };
        keyboard.rows.push(vec![Button::new(label, action)]);
    }

    match task_id {
        Some(id) => keyboard.row(vec![Button::new("🔙 Back", Action::TaskDetail(id))]),
        None => keyboard.row(vec![Button::new("📅 Another date", Action::CustomDate)]),
    }
}

/// Two-step delete confirmation
pub fn confirm_delete(task_id: i64) -> Keyboard {
    Keyboard::new().row(vec![
        Button::new("✅ Yes, delete", Action::ConfirmDelete(task_id)),
        Button::new("❌ No", Action::TaskDetail(task_id)),
    ])
}

/// Static settings menu
pub fn settings_menu() -> Keyboard {
    Keyboard::new().row(vec![Button::new("🔙 Back", Action::MainMenu)])
}
