//! Pure rendering: text blocks and selectable-option layouts
//!
//! Nothing in here touches the store or any clock; callers pass entities and
//! today's date in.

pub mod format;
pub mod keyboard;

pub use keyboard::{Button, Keyboard};
