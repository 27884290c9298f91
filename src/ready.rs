use std::collections::HashMap;

use crate::model::{Task, STATUS_DONE, STATUS_IN_PROGRESS};

/// A pending task held back by unsatisfied dependencies, in the order the
/// dependency list names them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockedTask {
    pub id: String,
    pub unsatisfied: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub ready: Vec<String>,
    pub blocked: Vec<BlockedTask>,
}

/// Id-to-status view of one flattened snapshot. Duplicate ids keep the
/// last status seen; the store does not guarantee uniqueness.
pub fn status_map(tasks: &[Task]) -> HashMap<String, String> {
    tasks
        .iter()
        .map(|task| (task.id.clone(), task.status.clone()))
        .collect()
}

/// A dependency is satisfied once its task is done or already underway, so
/// dependent work can start as soon as the upstream task is committed to.
/// An id that resolves to no known task is never satisfied.
pub fn dep_satisfied(status: Option<&str>) -> bool {
    matches!(status, Some(STATUS_DONE) | Some(STATUS_IN_PROGRESS))
}

/// Partition the pending tasks of one snapshot into ready and blocked.
/// Ready ids come back sorted by the numeric value of the id ("3" < "3.2" <
/// "10"); blocked tasks keep the snapshot's encounter order. Tasks in any
/// other status are already handled and appear in neither list.
pub fn resolve(tasks: &[Task]) -> Resolution {
    let statuses = status_map(tasks);

    let mut ready = Vec::new();
    let mut blocked = Vec::new();
    for task in tasks {
        if !task.is_pending() {
            continue;
        }

        let unsatisfied: Vec<String> = task
            .dependencies
            .iter()
            .filter(|dep| !dep_satisfied(statuses.get(dep.as_str()).map(String::as_str)))
            .cloned()
            .collect();

        if unsatisfied.is_empty() {
            ready.push(task.id.clone());
        } else {
            blocked.push(BlockedTask {
                id: task.id.clone(),
                unsatisfied,
            });
        }
    }

    sort_by_numeric_id(&mut ready);
    Resolution { ready, blocked }
}

/// Stable sort by decimal interpretation of the id. Ids that do not parse
/// sort after every numeric id, keeping their encounter order.
pub fn sort_by_numeric_id(ids: &mut [String]) {
    ids.sort_by(|a, b| numeric_key(a).total_cmp(&numeric_key(b)));
}

fn numeric_key(id: &str) -> f64 {
    id.trim().parse().unwrap_or(f64::INFINITY)
}
