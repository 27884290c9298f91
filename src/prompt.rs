use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::kickoff_io;
use crate::model::Task;

/// Implementation-agent briefing for one task. Pure function of the task
/// fields; downstream tooling reads these files by task id, so the format
/// is stable.
pub fn render(task: &Task) -> String {
    format!(
        "You are an implementation agent for Task #{id}\n\
         Title: {title}\n\
         Status: {status}  Priority: {priority}\n\
         Dependencies: {dependencies}\n\
         Description:\n\
         {description}\n\
         \n\
         Implementation Details:\n\
         {details}\n\
         \n\
         Test Strategy:\n\
         {test_strategy}\n\
         \n\
         Deliverables:\n\
         - [ ] Code commits / PRs\n\
         - [ ] README/Notes\n\
         - [ ] Tests per strategy\n\
         \n\
         Instructions:\n\
         1. Work contract-first. Do not change external contracts unless stated.\n\
         2. If blocked by deps, stub/mocks allowed; note the assumptions.\n\
         3. Output incremental patches or code blocks.\n\
         4. Ask for missing info explicitly.\n\
         5. Keep messages short; show only the diff/command snippets.\n",
        id = task.id,
        title = task.title,
        status = task.status,
        priority = task.priority,
        dependencies = task.dependencies.join(", "),
        description = or_none(&task.description),
        details = or_none(&task.details),
        test_strategy = or_none(&task.test_strategy),
    )
}

fn or_none(text: &str) -> &str {
    if text.trim().is_empty() {
        "(none)"
    } else {
        text
    }
}

pub fn prompt_path(dir: &Path, id: &str) -> PathBuf {
    dir.join(format!("{id}.txt"))
}

pub fn write_prompt(dir: &Path, task: &Task) -> Result<PathBuf> {
    let path = prompt_path(dir, &task.id);
    kickoff_io::write_string(&path, render(task))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    fn task() -> Task {
        serde_json::from_value(serde_json::json!({
            "id": 4,
            "status": "pending",
            "dependencies": [1, 2],
            "title": "Add retry logic",
            "description": "Retry transient failures.",
            "priority": "high",
        }))
        .unwrap()
    }

    #[test]
    fn render_includes_identity_and_fields() {
        let text = render(&task());

        assert!(text.starts_with("You are an implementation agent for Task #4\n"));
        assert!(text.contains("Title: Add retry logic"));
        assert!(text.contains("Status: pending  Priority: high"));
        assert!(text.contains("Dependencies: 1, 2"));
        assert!(text.contains("Retry transient failures."));
    }

    #[test]
    fn render_marks_missing_sections() {
        let text = render(&task());

        assert!(text.contains("Implementation Details:\n(none)"));
        assert!(text.contains("Test Strategy:\n(none)"));
    }

    #[test]
    fn render_is_deterministic() {
        assert_eq!(render(&task()), render(&task()));
    }

    #[test]
    fn write_prompt_names_the_file_after_the_task() {
        let dir = tempdir().unwrap();

        let path = write_prompt(dir.path(), &task()).unwrap();

        assert_eq!(path, dir.path().join("4.txt"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, render(&task()));
    }
}
