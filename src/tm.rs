use std::process::Command;

use anyhow::{anyhow, Context, Result};

use crate::config::Config;

pub fn command_exists(name: &str) -> bool {
    Command::new("which")
        .arg(name)
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

fn require_binary(config: &Config) -> Result<&str> {
    config.tm_bin.as_deref().ok_or_else(|| {
        anyhow!("task-master CLI not found. Install: npm i -g task-master-ai@latest")
    })
}

/// Delegate one status change to the task-master CLI. Fire-and-forget from
/// the resolver's perspective: the caller reports failure and moves on.
pub fn set_status(config: &Config, id: &str, status: &str) -> Result<()> {
    let bin = require_binary(config)?;
    let exit = Command::new(bin)
        .args(["set-status", "--tag", &config.tag])
        .args(["--id", id, "--status", status])
        .status()
        .with_context(|| format!("failed to run {bin} set-status"))?;

    if !exit.success() {
        return Err(anyhow!("{bin} set-status exited with {exit}"));
    }
    Ok(())
}

/// Run a task-master subcommand in the current tag context, inheriting the
/// terminal (used for `show` and `next`).
pub fn passthrough(config: &Config, args: &[&str]) -> Result<()> {
    let bin = require_binary(config)?;
    let exit = Command::new(bin)
        .args(args)
        .args(["--tag", &config.tag])
        .status()
        .with_context(|| format!("failed to run {bin} {}", args.join(" ")))?;

    if !exit.success() {
        return Err(anyhow!("{bin} {} exited with {exit}", args.join(" ")));
    }
    Ok(())
}
