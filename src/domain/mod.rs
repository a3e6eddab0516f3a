//! Domain types for todobot
//!
//! Core entities: User, Category, Task. All are plain data owned by the
//! persistence store; derived display properties (overdue) are computed at
//! render time, never stored.

mod category;
mod priority;
mod task;
mod user;

pub use category::{Category, DEFAULT_CATEGORIES};
pub use priority::Priority;
pub use task::{NewTask, Task, is_overdue};
pub use user::User;
