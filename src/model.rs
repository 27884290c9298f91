use serde::{Deserialize, Deserializer};
use serde_json::Value;

pub const STATUS_PENDING: &str = "pending";
pub const STATUS_IN_PROGRESS: &str = "in-progress";
pub const STATUS_DONE: &str = "done";

/// One task from the Task Master store. Ids and dependency ids appear in the
/// JSON as either strings or numbers; both are normalized to strings so
/// subtask ids like "3.2" and plain numeric ids compare uniformly.
#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    #[serde(deserialize_with = "de_task_id")]
    pub id: String,
    #[serde(default, deserialize_with = "de_lenient_string")]
    pub status: String,
    #[serde(default, deserialize_with = "de_id_list")]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub subtasks: Vec<Task>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub details: String,
    #[serde(default, rename = "testStrategy")]
    pub test_strategy: String,
    #[serde(default = "default_priority", deserialize_with = "de_lenient_string")]
    pub priority: String,
}

impl Task {
    pub fn is_pending(&self) -> bool {
        self.status == STATUS_PENDING
    }
}

pub fn find_task<'a>(tasks: &'a [Task], id: &str) -> Option<&'a Task> {
    tasks.iter().find(|task| task.id == id)
}

fn default_priority() -> String {
    "medium".to_string()
}

fn id_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn de_task_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(id_string(&value))
}

fn de_id_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Array(items) => Ok(items.iter().map(id_string).collect()),
        Value::Null => Ok(Vec::new()),
        other => Ok(vec![id_string(&other)]),
    }
}

fn de_lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(text) => text,
        Value::Null => String::new(),
        other => other.to_string(),
    })
}
