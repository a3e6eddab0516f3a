//! Category entity

use serde::{Deserialize, Serialize};

/// Categories seeded for every new user: (name, display color)
pub const DEFAULT_CATEGORIES: [(&str, &str); 4] = [
    ("Work", "#e74c3c"),
    ("Personal", "#3498db"),
    ("Shopping", "#2ecc71"),
    ("Study", "#f39c12"),
];

/// A task category owned by exactly one user
///
/// Deleting a category does not delete its tasks; their category reference
/// is cleared instead. This is distinct from the user cascade.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    /// Display tag, e.g. "#3498db"
    pub color: String,
}
