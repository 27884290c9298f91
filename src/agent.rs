use std::fs::File;
use std::path::Path;
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};

use crate::tm::command_exists;

/// Pause between consecutive launches so the spawned sessions do not trip
/// over each other's startup.
pub const LAUNCH_DELAY: Duration = Duration::from_secs(2);

pub fn available(bin: &str) -> bool {
    command_exists(bin)
}

/// Send one prompt to the agent CLI and return its reply.
pub fn print_prompt(bin: &str, prompt: &str) -> Result<String> {
    let output = Command::new(bin)
        .args(["--dangerously-skip-permissions", "--print"])
        .arg(prompt)
        .output()
        .with_context(|| format!("failed to run {bin}"))?;

    if !output.status.success() {
        return Err(anyhow!(
            "{bin} failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Start the agent inside a worktree, feeding it the prompt file on stdin
/// and logging its output to agent.log there. The child is left running;
/// the orchestrator does not wait for it.
pub fn launch_in_dir(bin: &str, dir: &Path, prompt_file: &Path) -> Result<()> {
    let prompt = File::open(prompt_file)
        .with_context(|| format!("failed to open prompt file: {}", prompt_file.display()))?;
    let log_path = dir.join("agent.log");
    let log = File::create(&log_path)
        .with_context(|| format!("failed to create {}", log_path.display()))?;
    let log_err = log
        .try_clone()
        .with_context(|| format!("failed to reopen {}", log_path.display()))?;

    Command::new(bin)
        .args(["--dangerously-skip-permissions", "--print"])
        .current_dir(dir)
        .stdin(Stdio::from(prompt))
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err))
        .spawn()
        .with_context(|| format!("failed to launch {bin} in {}", dir.display()))?;
    Ok(())
}

/// Shell helper dropped into a worktree so the agent can be re-run by hand.
pub fn launch_script(bin: &str, id: &str, prompt_file: &Path) -> String {
    format!(
        "#!/bin/sh\n\
         # Agent launch helper for task {id}\n\
         \n\
         PROMPT_FILE=\"{prompt}\"\n\
         \n\
         if [ ! -f \"$PROMPT_FILE\" ]; then\n\
         \x20   echo \"prompt file not found: $PROMPT_FILE\"\n\
         \x20   exit 1\n\
         fi\n\
         \n\
         exec {bin} --dangerously-skip-permissions --print < \"$PROMPT_FILE\"\n",
        prompt = prompt_file.display()
    )
}
