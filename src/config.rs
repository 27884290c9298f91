use std::path::PathBuf;

use crate::store;
use crate::tm;

/// Process-wide configuration, read from the environment exactly once at
/// startup. Everything downstream takes this value; nothing else consults
/// env vars, which keeps the resolver and orchestrator testable without
/// process-environment mocking.
#[derive(Debug, Clone)]
pub struct Config {
    /// Active tag context for this invocation.
    pub tag: String,
    /// Resolved task-master binary, if one is installed.
    pub tm_bin: Option<String>,
    pub tm_file: PathBuf,
    pub state_file: PathBuf,
    pub prompt_dir: PathBuf,
    pub worktree_base: PathBuf,
    pub branch_prefix: String,
    pub agent_bin: String,
    /// Directory the command was started from; prompt paths handed to
    /// agents running inside worktrees are anchored here.
    pub project_root: PathBuf,
}

impl Config {
    pub fn load(tag_override: Option<String>) -> Config {
        let tm_file = PathBuf::from(env_or("TM_FILE", ".taskmaster/tasks/tasks.json"));
        let state_file = PathBuf::from(".taskmaster/state.json");

        let tag = tag_override
            .filter(|tag| !tag.trim().is_empty())
            .or_else(|| env_opt("TAG"))
            .unwrap_or_else(|| store::detect_tag(&tm_file, &state_file));

        Config {
            tag,
            tm_bin: resolve_tm_bin(),
            tm_file,
            state_file,
            prompt_dir: PathBuf::from(env_or("PROMPT_DIR", "./prompts")),
            worktree_base: PathBuf::from(env_or("WORKTREE_BASE", "../ws")),
            branch_prefix: env_or("BRANCH_PREFIX", "ws/"),
            agent_bin: env_or("AGENT_BIN", "claude"),
            project_root: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

fn env_or(name: &str, default: &str) -> String {
    env_opt(name).unwrap_or_else(|| default.to_string())
}

/// TM_BIN override, else the first of `tm` / `task-master` on PATH. None
/// means status mutations and pass-throughs will fail with a clear message
/// while read-only commands keep working.
fn resolve_tm_bin() -> Option<String> {
    if let Some(bin) = env_opt("TM_BIN") {
        return Some(bin);
    }
    ["tm", "task-master"]
        .into_iter()
        .find(|name| tm::command_exists(name))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_tag_override_wins() {
        let config = Config::load(Some("feature-x".to_string()));
        assert_eq!(config.tag, "feature-x");
    }

    #[test]
    fn blank_override_is_ignored() {
        let config = Config::load(Some("  ".to_string()));
        assert_ne!(config.tag, "  ");
    }
}
