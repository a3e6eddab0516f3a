//! Text formatting for tasks and menus

use chrono::NaiveDate;

use crate::domain::Task;

/// Display format for dates; distinct from the wire format in callbacks
const DISPLAY_DATE: &str = "%d/%m/%Y";

/// Render an optional date for display
pub fn format_date(date: Option<NaiveDate>) -> String {
    match date {
        Some(d) => d.format(DISPLAY_DATE).to_string(),
        None => "None".to_string(),
    }
}

/// Full detail block for one task
pub fn format_task(task: &Task, category_name: Option<&str>, today: NaiveDate) -> String {
    let status = if task.completed {
        "✅ Done"
    } else {
        "⏳ In progress"
    };
    let description = if task.description.is_empty() {
        "No description"
    } else {
        &task.description
    };
    let category = category_name.unwrap_or("No category");
    let overdue = if task.is_overdue(today) { " ⚠️ OVERDUE" } else { "" };

    format!(
        "📝 *{title}*\n\n\
         📋 Description: {description}\n\
         📂 Category: {category}\n\
         🏷️ Priority: {priority}\n\
         📅 Due: {due}{overdue}\n\
         📊 Status: {status}\n\
         🕐 Created: {created}\n\
         🆔 ID: `{id}`",
        title = task.title,
        priority = task.priority.label(),
        due = format_date(task.due_date),
        created = task.created_at.format("%d/%m/%Y %H:%M"),
        id = task.id,
    )
}

/// One line per task, in the order given by the caller
pub fn format_task_list(tasks: &[Task], today: NaiveDate) -> String {
    if tasks.is_empty() {
        return "📭 Nothing here yet!".to_string();
    }

    let mut lines = Vec::with_capacity(tasks.len());
    for (i, task) in tasks.iter().enumerate() {
        let status = if task.completed { "✅" } else { "⬜" };
        let overdue = if task.is_overdue(today) { " ⚠️" } else { "" };
        lines.push(format!(
            "{}. {} {} *{}*{}",
            i + 1,
            status,
            task.priority.glyph(),
            task.title,
            overdue
        ));
    }
    lines.join("\n")
}

/// `/start` greeting
pub fn welcome_text(name: &str) -> String {
    format!(
        "👋 Hello *{name}*!\n\n\
         I'm *todobot*, your task assistant.\n\n\
         📌 What I can do:\n\
         • 📝 Create and manage tasks\n\
         • 📂 Sort them into categories\n\
         • 🏷️ Track priorities\n\
         • 📅 Keep an eye on due dates\n\n\
         📖 Commands:\n\
         /todo - main menu\n\
         /new - add a task\n\
         /today - due today\n\
         /help - help\n\n\
         Use the buttons below to get started!"
    )
}

/// `/help` usage text
pub fn help_text() -> &'static str {
    "🆘 *How to use todobot*\n\n\
     📌 Adding a task:\n\
     1. Press \"➕ Add task\" or send /new\n\
     2. Enter a title\n\
     3. Enter a description (or /skip)\n\
     4. Pick a category\n\
     5. Pick a priority\n\
     6. Pick a due date\n\n\
     📌 Managing tasks:\n\
     • Press a task to see its details\n\
     • Toggle done, change priority, category or due date\n\
     • Delete asks for confirmation first\n\n\
     Send /cancel at any point to abandon a task you are adding."
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Priority;
    use chrono::Utc;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn task(title: &str, due: Option<&str>, completed: bool) -> Task {
        Task {
            id: 1,
            user_id: 1,
            category_id: None,
            title: title.into(),
            description: String::new(),
            completed,
            priority: Priority::High,
            due_date: due.map(d),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_format_task_placeholders() {
        let text = format_task(&task("Buy milk", None, false), None, d("2026-08-29"));
        assert!(text.contains("Buy milk"));
        assert!(text.contains("No description"));
        assert!(text.contains("No category"));
        assert!(text.contains("Due: None"));
        assert!(!text.contains("OVERDUE"));
    }

    #[test]
    fn test_format_task_overdue_marker() {
        let text = format_task(&task("Late", Some("2026-08-01"), false), Some("Work"), d("2026-08-29"));
        assert!(text.contains("01/08/2026 ⚠️ OVERDUE"));
        assert!(text.contains("Category: Work"));
    }

    #[test]
    fn test_format_task_overdue_independent_of_completion() {
        let text = format_task(&task("Late", Some("2026-08-01"), true), None, d("2026-08-29"));
        assert!(text.contains("OVERDUE"));
        assert!(text.contains("✅ Done"));
    }

    #[test]
    fn test_format_task_list_empty() {
        assert_eq!(format_task_list(&[], d("2026-08-29")), "📭 Nothing here yet!");
    }

    #[test]
    fn test_format_task_list_lines() {
        let tasks = [task("One", Some("2026-08-01"), false), task("Two", None, true)];
        let text = format_task_list(&tasks, d("2026-08-29"));
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("1. ⬜ 🔴 *One* ⚠️"));
        assert!(lines[1].starts_with("2. ✅ 🔴 *Two*"));
    }
}
