use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::model::Task;

pub const DEFAULT_TAG: &str = "master";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("tasks file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read tasks file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid JSON in tasks file {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("malformed task list under tag '{tag}': {source}")]
    Tasks {
        tag: String,
        source: serde_json::Error,
    },
}

pub fn load_document(path: &Path) -> Result<Value, StoreError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(StoreError::NotFound(path.to_path_buf()))
        }
        Err(err) => {
            return Err(StoreError::Io {
                path: path.to_path_buf(),
                source: err,
            })
        }
    };
    serde_json::from_str(&text).map_err(|err| StoreError::Json {
        path: path.to_path_buf(),
        source: err,
    })
}

/// A tag entry lives either under a top-level `tags` object or directly
/// under its name at the document root.
fn tag_entry<'a>(document: &'a Value, tag: &str) -> Option<&'a Value> {
    if let Some(tags) = document.get("tags") {
        return tags.get(tag);
    }
    document.get(tag)
}

pub fn tag_tasks(document: &Value, tag: &str) -> Result<Vec<Task>, StoreError> {
    let Some(tasks) = tag_entry(document, tag).and_then(|entry| entry.get("tasks")) else {
        return Ok(Vec::new());
    };
    serde_json::from_value(tasks.clone()).map_err(|err| StoreError::Tasks {
        tag: tag.to_string(),
        source: err,
    })
}

/// Each top-level task immediately followed by its subtasks, in insertion
/// order. Flattening goes one level deep; anything nested further stays
/// inside its parent.
pub fn flatten(tasks: Vec<Task>) -> Vec<Task> {
    let mut flat = Vec::new();
    for mut task in tasks {
        let subtasks = std::mem::take(&mut task.subtasks);
        flat.push(task);
        flat.extend(subtasks);
    }
    flat
}

/// Read the store fresh and return the flattened collection for one tag.
/// External tooling may rewrite the file between commands, so there is no
/// caching anywhere above this call.
pub fn load_flattened(path: &Path, tag: &str) -> Result<Vec<Task>, StoreError> {
    let document = load_document(path)?;
    Ok(flatten(tag_tasks(&document, tag)?))
}

#[derive(Debug, Deserialize)]
struct StateFile {
    #[serde(rename = "currentTag")]
    current_tag: Option<String>,
}

/// Active tag: session state file first, then the first tag present in the
/// tasks document, then the fixed default. Never errors; a broken state file
/// just falls through to the next source.
pub fn detect_tag(tasks_file: &Path, state_file: &Path) -> String {
    tag_from_state(state_file)
        .or_else(|| tag_from_document(tasks_file))
        .unwrap_or_else(|| DEFAULT_TAG.to_string())
}

fn tag_from_state(path: &Path) -> Option<String> {
    let text = std::fs::read_to_string(path).ok()?;
    let state: StateFile = serde_json::from_str(&text).ok()?;
    state.current_tag.filter(|tag| !tag.trim().is_empty())
}

fn tag_from_document(path: &Path) -> Option<String> {
    let document = load_document(path).ok()?;
    if let Some(tags) = document.get("tags").and_then(Value::as_object) {
        return tags.keys().next().cloned();
    }
    let object = document.as_object()?;
    object
        .iter()
        .find(|(key, value)| key.as_str() != "metadata" && value.get("tasks").is_some())
        .map(|(key, _)| key.clone())
}
