use std::path::Path;
use std::process::Command;

use anyhow::{anyhow, Context, Result};

pub fn is_work_tree() -> bool {
    Command::new("git")
        .args(["rev-parse", "--is-inside-work-tree"])
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

pub fn has_commits() -> bool {
    Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

pub fn branch_exists(branch: &str) -> bool {
    Command::new("git")
        .args(["show-ref", "--verify", "--quiet"])
        .arg(format!("refs/heads/{branch}"))
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// `git worktree add -b <branch> <path> HEAD`. The caller checks for an
/// existing branch first, so a failure here is a real error on that task.
pub fn worktree_add(branch: &str, path: &Path) -> Result<()> {
    let output = Command::new("git")
        .args(["worktree", "add", "-b", branch])
        .arg(path)
        .arg("HEAD")
        .output()
        .context("failed to run git worktree add")?;

    if !output.status.success() {
        return Err(anyhow!(
            "git worktree add failed for branch {branch}: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(())
}

/// Whole-run preconditions for any command that creates worktrees.
pub fn ensure_worktree_preconditions() -> Result<()> {
    if !is_work_tree() {
        return Err(anyhow!("not inside a git repository"));
    }
    if !has_commits() {
        return Err(anyhow!(
            "need at least one commit before creating worktrees"
        ));
    }
    Ok(())
}
