//! SQLite persistence store
//!
//! Owns the durable entities (User, Category, Task) in a single-file
//! relational database. Every task/category query is scoped by the owning
//! user, so a foreign identifier simply comes back empty. Backups go through
//! [`Store::snapshot_to`], which uses the SQLite online backup API rather
//! than a raw file copy so snapshots never observe a torn write.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use rusqlite::{Connection, OpenFlags, Row, params};
use thiserror::Error;
use tracing::{debug, info};

use crate::domain::{Category, DEFAULT_CATEGORIES, NewTask, Priority, Task, User};
use crate::event::Sender;

/// Errors from store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id          INTEGER PRIMARY KEY,
    chat_id     INTEGER NOT NULL UNIQUE,
    username    TEXT,
    first_name  TEXT,
    last_name   TEXT,
    created_at  TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS categories (
    id          INTEGER PRIMARY KEY,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name        TEXT NOT NULL,
    color       TEXT NOT NULL DEFAULT '#3498db'
);

CREATE TABLE IF NOT EXISTS tasks (
    id          INTEGER PRIMARY KEY,
    user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    category_id INTEGER REFERENCES categories(id) ON DELETE SET NULL,
    title       TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    completed   INTEGER NOT NULL DEFAULT 0,
    priority    INTEGER NOT NULL DEFAULT 2,
    due_date    TEXT,
    created_at  TEXT NOT NULL,
    updated_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id);
CREATE INDEX IF NOT EXISTS idx_categories_user ON categories(user_id);
";

const TASK_COLUMNS: &str =
    "id, user_id, category_id, title, description, completed, priority, due_date, created_at, updated_at";

/// The persistence store
pub struct Store {
    conn: Connection,
    path: PathBuf,
}

impl Store {
    /// Open or create the database at the given path
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.execute_batch(SCHEMA)?;

        debug!(path = %path.display(), "Opened store");
        Ok(Self { conn, path })
    }

    /// Path of the underlying database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    // === Users ===

    /// Look up a user by their chat-platform identity
    pub fn user_by_chat(&self, chat_id: i64) -> Result<Option<User>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, chat_id, username, first_name, last_name, created_at FROM users WHERE chat_id = ?1",
        )?;
        let user = stmt
            .query_row(params![chat_id], |row| {
                Ok(User {
                    id: row.get(0)?,
                    chat_id: row.get(1)?,
                    username: row.get(2)?,
                    first_name: row.get(3)?,
                    last_name: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })
            .map(Some)
            .or_else(not_found_as_none)?;
        Ok(user)
    }

    /// Get the user for this sender, creating them (with the default
    /// category set) on first contact
    pub fn get_or_create_user(&self, sender: &Sender) -> Result<User> {
        if let Some(user) = self.user_by_chat(sender.chat_id)? {
            return Ok(user);
        }

        self.conn.execute(
            "INSERT INTO users (chat_id, username, first_name, last_name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                sender.chat_id,
                sender.username,
                sender.first_name,
                sender.last_name,
                Utc::now()
            ],
        )?;
        let user_id = self.conn.last_insert_rowid();

        for (name, color) in DEFAULT_CATEGORIES {
            self.conn.execute(
                "INSERT INTO categories (user_id, name, color) VALUES (?1, ?2, ?3)",
                params![user_id, name, color],
            )?;
        }

        info!(user_id, chat_id = sender.chat_id, "Created user with default categories");
        self.user_by_chat(sender.chat_id)?
            .ok_or_else(|| StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    // === Categories ===

    /// All categories owned by the user
    pub fn categories(&self, user_id: i64) -> Result<Vec<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, user_id, name, color FROM categories WHERE user_id = ?1 ORDER BY id")?;
        let rows = stmt.query_map(params![user_id], category_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// A category by id, scoped to the owning user
    pub fn category(&self, user_id: i64, category_id: i64) -> Result<Option<Category>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, user_id, name, color FROM categories WHERE id = ?1 AND user_id = ?2")?;
        let cat = stmt
            .query_row(params![category_id, user_id], category_from_row)
            .map(Some)
            .or_else(not_found_as_none)?;
        Ok(cat)
    }

    /// Whether a category exists for any user (internal, used to tell
    /// unauthorized apart from missing when logging)
    pub fn category_exists(&self, category_id: i64) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM categories WHERE id = ?1", params![category_id], |r| {
                r.get(0)
            })?;
        Ok(count > 0)
    }

    /// Categories of the user paired with how many tasks reference each
    pub fn category_task_counts(&self, user_id: i64) -> Result<Vec<(Category, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT c.id, c.user_id, c.name, c.color, COUNT(t.id)
             FROM categories c LEFT JOIN tasks t ON t.category_id = c.id
             WHERE c.user_id = ?1 GROUP BY c.id ORDER BY c.id",
        )?;
        let rows = stmt.query_map(params![user_id], |row| Ok((category_from_row(row)?, row.get(4)?)))?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Delete a category owned by the user; referencing tasks keep existing
    /// with their category cleared. Returns false if nothing was deleted.
    pub fn delete_category(&self, user_id: i64, category_id: i64) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM categories WHERE id = ?1 AND user_id = ?2",
            params![category_id, user_id],
        )?;
        Ok(changed > 0)
    }

    // === Tasks ===

    /// Persist a finalized draft as a new task
    pub fn create_task(&self, user_id: i64, new: &NewTask) -> Result<Task> {
        let now = Utc::now();
        self.conn.execute(
            "INSERT INTO tasks (user_id, category_id, title, description, completed, priority, due_date, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, ?6, ?7, ?7)",
            params![
                user_id,
                new.category_id,
                new.title,
                new.description,
                new.priority.code(),
                new.due_date,
                now
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        info!(task_id = id, user_id, "Created task");
        self.task(user_id, id)?
            .ok_or_else(|| StoreError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
    }

    /// A task by id, scoped to the owning user
    pub fn task(&self, user_id: i64, task_id: i64) -> Result<Option<Task>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1 AND user_id = ?2"))?;
        let task = stmt
            .query_row(params![task_id, user_id], task_from_row)
            .map(Some)
            .or_else(not_found_as_none)?;
        Ok(task)
    }

    /// Whether a task exists for any user (internal, used to tell
    /// unauthorized apart from missing when logging)
    pub fn task_exists(&self, task_id: i64) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM tasks WHERE id = ?1", params![task_id], |r| r.get(0))?;
        Ok(count > 0)
    }

    /// All tasks of the user: open before done, then by priority and due date
    pub fn tasks(&self, user_id: i64) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ?1
             ORDER BY completed, priority, due_date IS NULL, due_date, id"
        ))?;
        let rows = stmt.query_map(params![user_id], task_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Incomplete tasks due exactly on the given date, most urgent first
    pub fn tasks_due_on(&self, user_id: i64, date: NaiveDate) -> Result<Vec<Task>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks
             WHERE user_id = ?1 AND due_date = ?2 AND completed = 0
             ORDER BY priority, id"
        ))?;
        let rows = stmt.query_map(params![user_id, date], task_from_row)?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    /// Flip the completion flag. Intentionally not idempotent.
    pub fn toggle_complete(&self, user_id: i64, task_id: i64) -> Result<Option<Task>> {
        let changed = self.conn.execute(
            "UPDATE tasks SET completed = 1 - completed, updated_at = ?3 WHERE id = ?1 AND user_id = ?2",
            params![task_id, user_id, Utc::now()],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.task(user_id, task_id)
    }

    /// Set the priority. Idempotent for equal arguments.
    pub fn set_priority(&self, user_id: i64, task_id: i64, priority: Priority) -> Result<Option<Task>> {
        let changed = self.conn.execute(
            "UPDATE tasks SET priority = ?3, updated_at = ?4 WHERE id = ?1 AND user_id = ?2",
            params![task_id, user_id, priority.code(), Utc::now()],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.task(user_id, task_id)
    }

    /// Point the task at a category. The caller must have verified that the
    /// category belongs to the same user.
    pub fn set_category(&self, user_id: i64, task_id: i64, category_id: i64) -> Result<Option<Task>> {
        let changed = self.conn.execute(
            "UPDATE tasks SET category_id = ?3, updated_at = ?4 WHERE id = ?1 AND user_id = ?2",
            params![task_id, user_id, category_id, Utc::now()],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.task(user_id, task_id)
    }

    /// Set the due date. Idempotent for equal arguments.
    pub fn set_due_date(&self, user_id: i64, task_id: i64, due_date: NaiveDate) -> Result<Option<Task>> {
        let changed = self.conn.execute(
            "UPDATE tasks SET due_date = ?3, updated_at = ?4 WHERE id = ?1 AND user_id = ?2",
            params![task_id, user_id, due_date, Utc::now()],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.task(user_id, task_id)
    }

    /// Delete a task owned by the user. Returns false when nothing matched,
    /// which callers treat as a no-op rather than an error.
    pub fn delete_task(&self, user_id: i64, task_id: i64) -> Result<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM tasks WHERE id = ?1 AND user_id = ?2", params![task_id, user_id])?;
        if changed > 0 {
            info!(task_id, user_id, "Deleted task");
        }
        Ok(changed > 0)
    }

    // === Snapshots ===

    /// Export a consistent snapshot of the database to `dest`
    ///
    /// Uses the SQLite online backup API, so the snapshot is atomic with
    /// respect to concurrent writers on other connections.
    pub fn snapshot_to(&self, dest: &Path) -> Result<()> {
        let mut dst = Connection::open(dest)?;
        let backup = rusqlite::backup::Backup::new(&self.conn, &mut dst)?;
        backup.run_to_completion(64, Duration::from_millis(25), None)?;
        debug!(dest = %dest.display(), "Snapshot written");
        Ok(())
    }

    /// Open an independent read-only handle on the same database file.
    /// Used by the backup loop so it never shares the dispatcher's handle.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn, path })
    }
}

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        color: row.get(3)?,
    })
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    // Out-of-range priority codes coerce to the default rather than failing
    // the whole row.
    let priority = Priority::from_code(row.get(6)?).unwrap_or_default();
    Ok(Task {
        id: row.get(0)?,
        user_id: row.get(1)?,
        category_id: row.get(2)?,
        title: row.get(3)?,
        description: row.get(4)?,
        completed: row.get(5)?,
        priority,
        due_date: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn not_found_as_none<T>(err: rusqlite::Error) -> rusqlite::Result<Option<T>> {
    match err {
        rusqlite::Error::QueryReturnedNoRows => Ok(None),
        other => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sender(chat_id: i64) -> Sender {
        Sender {
            chat_id,
            username: Some("tester".into()),
            first_name: Some("Test".into()),
            last_name: None,
        }
    }

    fn new_task(title: &str) -> NewTask {
        NewTask {
            title: title.into(),
            description: String::new(),
            category_id: None,
            priority: Priority::Medium,
            due_date: None,
        }
    }

    fn open_store(temp: &TempDir) -> Store {
        Store::open(temp.path().join("todo.db")).unwrap()
    }

    #[test]
    fn test_get_or_create_user_seeds_default_categories() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);

        let user = store.get_or_create_user(&sender(100)).unwrap();
        let categories = store.categories(user.id).unwrap();
        assert_eq!(categories.len(), 4);
        assert_eq!(categories[0].name, "Work");

        // Second call finds the same user and does not reseed
        let again = store.get_or_create_user(&sender(100)).unwrap();
        assert_eq!(again.id, user.id);
        assert_eq!(store.categories(user.id).unwrap().len(), 4);
    }

    #[test]
    fn test_task_crud_scoped_by_user() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let alice = store.get_or_create_user(&sender(1)).unwrap();
        let bob = store.get_or_create_user(&sender(2)).unwrap();

        let task = store.create_task(alice.id, &new_task("Buy milk")).unwrap();
        assert_eq!(task.title, "Buy milk");
        assert!(!task.completed);

        // Bob cannot see or mutate Alice's task
        assert!(store.task(bob.id, task.id).unwrap().is_none());
        assert!(store.toggle_complete(bob.id, task.id).unwrap().is_none());
        assert!(!store.delete_task(bob.id, task.id).unwrap());

        // But it still exists for Alice, untouched
        let kept = store.task(alice.id, task.id).unwrap().unwrap();
        assert!(!kept.completed);
        assert!(store.task_exists(task.id).unwrap());
    }

    #[test]
    fn test_toggle_complete_flips_each_time() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let user = store.get_or_create_user(&sender(1)).unwrap();
        let task = store.create_task(user.id, &new_task("t")).unwrap();

        let t = store.toggle_complete(user.id, task.id).unwrap().unwrap();
        assert!(t.completed);
        let t = store.toggle_complete(user.id, task.id).unwrap().unwrap();
        assert!(!t.completed);
    }

    #[test]
    fn test_mutations_refresh_updated_at() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let user = store.get_or_create_user(&sender(1)).unwrap();
        let task = store.create_task(user.id, &new_task("t")).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(10));
        let updated = store.set_priority(user.id, task.id, Priority::High).unwrap().unwrap();
        assert!(updated.updated_at > task.updated_at);
        assert_eq!(updated.priority, Priority::High);
    }

    #[test]
    fn test_delete_category_clears_task_reference() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let user = store.get_or_create_user(&sender(1)).unwrap();
        let category = store.categories(user.id).unwrap().remove(0);

        let mut draft = new_task("categorized");
        draft.category_id = Some(category.id);
        let task = store.create_task(user.id, &draft).unwrap();
        assert_eq!(task.category_id, Some(category.id));

        assert!(store.delete_category(user.id, category.id).unwrap());

        // The task survives with its category cleared
        let kept = store.task(user.id, task.id).unwrap().unwrap();
        assert_eq!(kept.category_id, None);
    }

    #[test]
    fn test_deleting_user_rows_cascades() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let user = store.get_or_create_user(&sender(1)).unwrap();
        let task = store.create_task(user.id, &new_task("t")).unwrap();

        store
            .conn
            .execute("DELETE FROM users WHERE id = ?1", params![user.id])
            .unwrap();

        assert!(!store.task_exists(task.id).unwrap());
        assert!(store.categories(user.id).unwrap().is_empty());
    }

    #[test]
    fn test_tasks_due_on_filters_completed() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let user = store.get_or_create_user(&sender(1)).unwrap();
        let today: NaiveDate = "2026-08-29".parse().unwrap();

        let mut due = new_task("due today");
        due.due_date = Some(today);
        let a = store.create_task(user.id, &due).unwrap();

        let mut done = new_task("done today");
        done.due_date = Some(today);
        let b = store.create_task(user.id, &done).unwrap();
        store.toggle_complete(user.id, b.id).unwrap();

        let mut later = new_task("later");
        later.due_date = Some("2026-09-01".parse().unwrap());
        store.create_task(user.id, &later).unwrap();

        let due_today = store.tasks_due_on(user.id, today).unwrap();
        assert_eq!(due_today.len(), 1);
        assert_eq!(due_today[0].id, a.id);
    }

    #[test]
    fn test_priority_out_of_range_coerces_to_default() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let user = store.get_or_create_user(&sender(1)).unwrap();
        let task = store.create_task(user.id, &new_task("t")).unwrap();

        store
            .conn
            .execute("UPDATE tasks SET priority = 9 WHERE id = ?1", params![task.id])
            .unwrap();

        let read = store.task(user.id, task.id).unwrap().unwrap();
        assert_eq!(read.priority, Priority::Medium);
    }

    #[test]
    fn test_snapshot_is_a_readable_database() {
        let temp = TempDir::new().unwrap();
        let store = open_store(&temp);
        let user = store.get_or_create_user(&sender(1)).unwrap();
        store.create_task(user.id, &new_task("snapshot me")).unwrap();

        let dest = temp.path().join("snapshot.db");
        store.snapshot_to(&dest).unwrap();

        let copy = Store::open(&dest).unwrap();
        let restored = copy.user_by_chat(1).unwrap().unwrap();
        assert_eq!(copy.tasks(restored.id).unwrap().len(), 1);
    }
}
