//! Callback dispatcher
//!
//! Routes each inbound event (command, free text or button press) to exactly
//! one handler. Button payloads are decoded once into [`Action`] at the
//! boundary, the acting user is resolved before any handler runs, and every
//! mutating handler re-derives authorization from that user rather than
//! trusting identifiers embedded in the payload.

mod action;
mod error;

pub use action::{Action, ActionParseError, DATE_FORMAT};
pub use error::BotError;

use chrono::{Local, NaiveDate};
use tracing::{debug, error, warn};

use crate::conversation::{ConvState, ConversationRegistry};
use crate::domain::{Category, Task, User};
use crate::event::{Command, Incoming, Payload, Reply};
use crate::render::{format, keyboard};
use crate::store::Store;

/// Routes inbound events against the store and the conversation registry
pub struct Dispatcher {
    store: Store,
    conversations: ConversationRegistry,
    page_size: usize,
}

impl Dispatcher {
    pub fn new(store: Store, page_size: usize) -> Self {
        Self {
            store,
            conversations: ConversationRegistry::new(),
            page_size,
        }
    }

    /// Process one event. Never panics and never propagates an error: any
    /// failure becomes a visible notice so the loop keeps running. `None`
    /// means the event was deliberately ignored (idle free text).
    pub fn handle(&self, incoming: &Incoming) -> Option<Reply> {
        let chat_id = incoming.sender.chat_id;
        let result = match &incoming.payload {
            Payload::Command(command) => self.handle_command(incoming, *command),
            Payload::Text(text) => self.handle_text(incoming, text),
            Payload::Callback(data) => self.handle_callback(incoming, data),
        };

        match result {
            Ok(reply) => reply,
            Err(err) => {
                match &err {
                    BotError::Unauthorized { kind, id } => {
                        warn!(chat_id, kind, id, "Rejected cross-user access");
                    }
                    BotError::Store(store_err) => {
                        error!(chat_id, error = %store_err, "Store failure during dispatch");
                    }
                    other => debug!(chat_id, error = %other, "Dispatch rejected event"),
                }
                Some(Reply::text(err.user_notice()))
            }
        }
    }

    // === Commands ===

    fn handle_command(&self, incoming: &Incoming, command: Command) -> Result<Option<Reply>, BotError> {
        let chat_id = incoming.sender.chat_id;
        match command {
            Command::Start => {
                let user = self.store.get_or_create_user(&incoming.sender)?;
                Ok(Some(Reply::with_keyboard(
                    format::welcome_text(user.display_name()),
                    keyboard::main_menu(),
                )))
            }
            Command::Help => Ok(Some(Reply::with_keyboard(format::help_text(), keyboard::main_menu()))),
            Command::Todo => Ok(Some(main_menu_reply())),
            Command::Today => {
                let user = self.require_user(chat_id)?;
                let today = today();
                let tasks = self.store.tasks_due_on(user.id, today)?;
                let text = if tasks.is_empty() {
                    "🎉 Nothing due today!".to_string()
                } else {
                    format!(
                        "📅 *Due today ({})*\n\n{}",
                        today.format("%d/%m/%Y"),
                        format::format_task_list(&tasks, today)
                    )
                };
                Ok(Some(Reply::with_keyboard(text, keyboard::main_menu())))
            }
            Command::New => {
                // Any interaction may create the user lazily
                self.store.get_or_create_user(&incoming.sender)?;
                self.conversations.start(chat_id);
                Ok(Some(title_prompt()))
            }
            Command::Cancel => {
                if self.conversations.cancel(chat_id) {
                    Ok(Some(Reply::with_keyboard(
                        "❌ Task creation cancelled.",
                        keyboard::main_menu(),
                    )))
                } else {
                    Ok(Some(Reply::text("Nothing to cancel.")))
                }
            }
            Command::Skip => {
                if self.conversations.state(chat_id) == Some(ConvState::AwaitingDescription) {
                    self.conversations.skip_description(chat_id)?;
                    let user = self.require_user(chat_id)?;
                    Ok(Some(self.category_prompt(&user)?))
                } else {
                    Ok(Some(Reply::text("Nothing to skip.")))
                }
            }
        }
    }

    // === Free text ===

    fn handle_text(&self, incoming: &Incoming, text: &str) -> Result<Option<Reply>, BotError> {
        let chat_id = incoming.sender.chat_id;
        match self.conversations.state(chat_id) {
            // No conversation: free text is ignored
            None => Ok(None),
            Some(ConvState::AwaitingTitle) => {
                self.conversations.submit_title(chat_id, text)?;
                Ok(Some(description_prompt()))
            }
            Some(ConvState::AwaitingDescription) => {
                self.conversations.submit_description(chat_id, text)?;
                let user = self.require_user(chat_id)?;
                Ok(Some(self.category_prompt(&user)?))
            }
            Some(ConvState::AwaitingCategory) | Some(ConvState::AwaitingPriority) => {
                Ok(Some(Reply::text("Please use the buttons above.")))
            }
            Some(ConvState::AwaitingDueDate) => {
                // Parse failure re-prompts without touching collected fields
                let date = NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).map_err(|_| {
                    BotError::InvalidInput("Invalid date. Please use the YYYY-MM-DD format:".to_string())
                })?;
                let user = self.require_user(chat_id)?;
                Ok(Some(self.finalize(&user, chat_id, date)?))
            }
        }
    }

    // === Button presses ===

    fn handle_callback(&self, incoming: &Incoming, data: &str) -> Result<Option<Reply>, BotError> {
        let chat_id = incoming.sender.chat_id;
        let action: Action = data
            .parse()
            .map_err(|err: ActionParseError| BotError::InvalidInput(err.to_string()))?;

        // Resolve the acting user before any handler; no user, no mutation.
        let user = self.require_user(chat_id)?;
        debug!(chat_id, user_id = user.id, ?action, "Dispatching action");

        let reply = match action {
            Action::MainMenu => main_menu_reply(),
            Action::Settings => Reply::with_keyboard("⚙️ *Settings*", keyboard::settings_menu()),
            Action::ViewTasks => self.task_list_reply(&user, 0)?,
            Action::Page(page) => self.task_list_reply(&user, page)?,
            Action::ManageCategories => self.category_overview_reply(&user)?,

            Action::AddTask => {
                self.conversations.start(chat_id);
                title_prompt()
            }
            Action::PickCategory(category_id) => {
                // Must belong to the acting user, not merely exist
                self.fetch_owned_category(&user, category_id)?;
                self.conversations.select_category(chat_id, category_id)?;
                priority_prompt()
            }
            Action::PickPriority(priority) => {
                self.conversations.select_priority(chat_id, priority)?;
                due_date_prompt()
            }
            Action::PickDueDate(date) => self.finalize(&user, chat_id, date)?,
            Action::CustomDate => {
                if self.conversations.state(chat_id) != Some(ConvState::AwaitingDueDate) {
                    return Err(BotError::InvalidInput(
                        "No task in progress. Send /new to start one.".to_string(),
                    ));
                }
                Reply::text("📅 Please enter a date (YYYY-MM-DD):\n\nFor example: 2026-12-31")
            }

            Action::TaskDetail(task_id) => {
                let task = self.fetch_owned_task(&user, task_id)?;
                self.task_detail_reply(&user, &task)?
            }
            Action::ToggleComplete(task_id) => {
                self.fetch_owned_task(&user, task_id)?;
                let task = self
                    .store
                    .toggle_complete(user.id, task_id)?
                    .ok_or(BotError::NotFound { kind: "task", id: task_id })?;
                self.task_detail_reply(&user, &task)?
            }
            Action::EditPriority(task_id) => {
                self.fetch_owned_task(&user, task_id)?;
                Reply::with_keyboard("🏷️ *Pick a priority:*", keyboard::priority_picker(Some(task_id)))
            }
            Action::EditCategory(task_id) => {
                self.fetch_owned_task(&user, task_id)?;
                let categories = self.store.categories(user.id)?;
                Reply::with_keyboard(
                    "📂 *Pick a category:*",
                    keyboard::category_picker(&categories, Some(task_id)),
                )
            }
            Action::EditDueDate(task_id) => {
                self.fetch_owned_task(&user, task_id)?;
                Reply::with_keyboard("📅 *Pick a due date:*", keyboard::due_date_picker(Some(task_id), today()))
            }
            Action::SetPriority { task_id, priority } => {
                self.fetch_owned_task(&user, task_id)?;
                let task = self
                    .store
                    .set_priority(user.id, task_id, priority)?
                    .ok_or(BotError::NotFound { kind: "task", id: task_id })?;
                self.task_detail_reply(&user, &task)?
            }
            Action::SetCategory { task_id, category_id } => {
                self.fetch_owned_task(&user, task_id)?;
                self.fetch_owned_category(&user, category_id)?;
                let task = self
                    .store
                    .set_category(user.id, task_id, category_id)?
                    .ok_or(BotError::NotFound { kind: "task", id: task_id })?;
                self.task_detail_reply(&user, &task)?
            }
            Action::SetDueDate { task_id, date } => {
                self.fetch_owned_task(&user, task_id)?;
                let task = self
                    .store
                    .set_due_date(user.id, task_id, date)?
                    .ok_or(BotError::NotFound { kind: "task", id: task_id })?;
                self.task_detail_reply(&user, &task)?
            }
            Action::DeleteTask(task_id) => {
                self.fetch_owned_task(&user, task_id)?;
                Reply::with_keyboard(
                    "🗑️ *Confirm deletion*\n\nAre you sure you want to delete this task?",
                    keyboard::confirm_delete(task_id),
                )
            }
            Action::ConfirmDelete(task_id) => {
                if self.store.delete_task(user.id, task_id)? {
                    Reply::with_keyboard("🗑️ Task deleted.", keyboard::main_menu())
                } else if self.store.task_exists(task_id)? {
                    return Err(BotError::Unauthorized { kind: "task", id: task_id });
                } else {
                    // Deleting an already-deleted task is a reported no-op
                    Reply::with_keyboard("🗑️ Task was already gone.", keyboard::main_menu())
                }
            }
        };

        Ok(Some(reply))
    }

    // === Shared pieces ===

    fn require_user(&self, chat_id: i64) -> Result<User, BotError> {
        self.store
            .user_by_chat(chat_id)?
            .ok_or(BotError::UnknownUser(chat_id))
    }

    /// Fetch a task scoped to the acting user; a foreign task reports
    /// Unauthorized internally, NotFound to the user.
    fn fetch_owned_task(&self, user: &User, task_id: i64) -> Result<Task, BotError> {
        match self.store.task(user.id, task_id)? {
            Some(task) => Ok(task),
            None if self.store.task_exists(task_id)? => Err(BotError::Unauthorized { kind: "task", id: task_id }),
            None => Err(BotError::NotFound { kind: "task", id: task_id }),
        }
    }

    fn fetch_owned_category(&self, user: &User, category_id: i64) -> Result<Category, BotError> {
        match self.store.category(user.id, category_id)? {
            Some(category) => Ok(category),
            None if self.store.category_exists(category_id)? => Err(BotError::Unauthorized {
                kind: "category",
                id: category_id,
            }),
            None => Err(BotError::NotFound {
                kind: "category",
                id: category_id,
            }),
        }
    }

    /// Atomically persist the accumulated draft. The flow is terminal either
    /// way: a persistence failure is reported, not retried.
    fn finalize(&self, user: &User, chat_id: i64, date: NaiveDate) -> Result<Reply, BotError> {
        let new_task = self.conversations.submit_due_date(chat_id, date)?;
        match self.store.create_task(user.id, &new_task) {
            Ok(task) => {
                debug!(chat_id, task_id = task.id, "Task created from conversation");
                Ok(Reply::with_keyboard(
                    "✅ *Task added successfully!*",
                    keyboard::main_menu(),
                ))
            }
            Err(err) => {
                error!(chat_id, error = %err, "Failed to persist finalized task");
                Ok(Reply::with_keyboard(
                    "⚠️ I couldn't save your task. Please try again with /new.",
                    keyboard::main_menu(),
                ))
            }
        }
    }

    fn task_list_reply(&self, user: &User, page: usize) -> Result<Reply, BotError> {
        let tasks = self.store.tasks(user.id)?;
        let today = today();
        if tasks.is_empty() {
            return Ok(Reply::with_keyboard(
                "📭 You have no tasks yet!\n\nPress '➕ Add task' to get started.",
                keyboard::main_menu(),
            ));
        }

        let total_pages = tasks.len().div_ceil(self.page_size);
        let page = page.min(total_pages.saturating_sub(1));
        let text = format!(
            "📋 *Your tasks* (page {}/{})\n\n{}",
            page + 1,
            total_pages,
            format::format_task_list(&tasks, today)
        );
        Ok(Reply::with_keyboard(text, keyboard::task_list(&tasks, page, self.page_size)))
    }

    fn task_detail_reply(&self, user: &User, task: &Task) -> Result<Reply, BotError> {
        let category_name = match task.category_id {
            Some(category_id) => self.store.category(user.id, category_id)?.map(|c| c.name),
            None => None,
        };
        let text = format::format_task(task, category_name.as_deref(), today());
        Ok(Reply::with_keyboard(text, keyboard::task_detail(task.id)))
    }

    fn category_overview_reply(&self, user: &User) -> Result<Reply, BotError> {
        let counts = self.store.category_task_counts(user.id)?;
        let text = if counts.is_empty() {
            "📂 You have no categories yet!".to_string()
        } else {
            let mut lines = vec!["📂 *Your categories*".to_string(), String::new()];
            for (category, count) in counts {
                lines.push(format!("• {}: {} tasks", category.name, count));
            }
            lines.join("\n")
        };
        Ok(Reply::with_keyboard(text, keyboard::main_menu()))
    }

    fn category_prompt(&self, user: &User) -> Result<Reply, BotError> {
        // The category set is read at transition time; if it changes before
        // the selection arrives, last write wins.
        let categories = self.store.categories(user.id)?;
        Ok(Reply::with_keyboard(
            "📂 *Pick a category:*",
            keyboard::category_picker(&categories, None),
        ))
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn main_menu_reply() -> Reply {
    Reply::with_keyboard("📋 *Main menu*", keyboard::main_menu())
}

fn title_prompt() -> Reply {
    Reply::text("📝 *New task*\n\nPlease enter a *title*:")
}

fn description_prompt() -> Reply {
    Reply::text("✅ Title saved!\n\nNow enter a *description* (or /skip):")
}

fn priority_prompt() -> Reply {
    Reply::with_keyboard("🏷️ *Pick a priority:*", keyboard::priority_picker(None))
}

fn due_date_prompt() -> Reply {
    Reply::with_keyboard("📅 *Pick a due date:*", keyboard::due_date_picker(None, today()))
}
