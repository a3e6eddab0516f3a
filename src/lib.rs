//! todobot - conversational task manager
//!
//! A chat bot that manages per-user to-do lists: a multi-step add-task
//! conversation, button-driven task management, SQLite persistence and
//! scheduled database backups.
//!
//! Module map:
//! - [`domain`]: core entity types (users, tasks, categories, priorities)
//! - [`store`]: SQLite persistence, ownership-scoped queries, snapshots
//! - [`event`]: transport-boundary event and reply types
//! - [`conversation`]: the add-task state machine, keyed per user
//! - [`dispatch`]: routes events to store operations and renders replies
//! - [`render`]: text formatting and keyboard layouts
//! - [`backup`]: timestamped snapshots with retention, on a daily schedule
//! - [`config`] / [`cli`]: YAML configuration and the command line
//! - [`transport`]: the pluggable chat boundary and the console transport

pub mod backup;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod dispatch;
pub mod domain;
pub mod event;
pub mod render;
pub mod store;
pub mod transport;

pub use backup::BackupManager;
pub use config::Config;
pub use dispatch::Dispatcher;
pub use event::{Incoming, Reply};
pub use store::Store;
