use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{anyhow, Result};
use dialoguer::Confirm;

use crate::agent;
use crate::config::Config;
use crate::git;
use crate::kickoff_io;
use crate::model::{find_task, Task, STATUS_IN_PROGRESS};
use crate::naming;
use crate::prompt;
use crate::ready::{self, Resolution};
use crate::store;
use crate::tm;

/// Interactive y/N gate. A refusal aborts the run before any external state
/// is touched.
pub trait Confirmer {
    fn confirm(&mut self, question: &str) -> bool;
}

/// Terminal-backed gate; EOF or interrupt counts as a refusal.
pub struct TerminalConfirmer;

impl Confirmer for TerminalConfirmer {
    fn confirm(&mut self, question: &str) -> bool {
        Confirm::new()
            .with_prompt(question)
            .default(false)
            .interact()
            .unwrap_or(false)
    }
}

/// Branch/worktree operations delegated to version control.
pub trait WorkspaceProvider {
    fn branch_exists(&self, branch: &str) -> bool;
    fn create(&self, branch: &str, path: &Path) -> Result<()>;
}

pub struct GitWorkspaces;

impl WorkspaceProvider for GitWorkspaces {
    fn branch_exists(&self, branch: &str) -> bool {
        git::branch_exists(branch)
    }

    fn create(&self, branch: &str, path: &Path) -> Result<()> {
        git::worktree_add(branch, path)
    }
}

/// Status mutations delegated to the external task-management CLI.
pub trait StatusSink {
    fn set_status(&self, id: &str, status: &str) -> Result<()>;
}

pub struct TmStatusSink<'a> {
    pub config: &'a Config,
}

impl StatusSink for TmStatusSink<'_> {
    fn set_status(&self, id: &str, status: &str) -> Result<()> {
        tm::set_status(self.config, id, status)
    }
}

/// Best-effort coding-agent launch in a prepared worktree.
pub trait AgentRunner {
    fn launch(&self, dir: &Path, prompt_file: &Path) -> Result<()>;
}

pub struct CliAgentRunner {
    pub bin: String,
}

impl AgentRunner for CliAgentRunner {
    fn launch(&self, dir: &Path, prompt_file: &Path) -> Result<()> {
        agent::launch_in_dir(&self.bin, dir, prompt_file)?;
        thread::sleep(agent::LAUNCH_DELAY);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Command entry points. Each one re-reads the store; the external tooling may
// have rewritten it since the previous command.
// ---------------------------------------------------------------------------

pub fn run_ready(config: &Config) -> Result<()> {
    let (_, resolution) = load_ready(config)?;
    for id in &resolution.ready {
        println!("{id}");
    }
    Ok(())
}

pub fn run_blocked(config: &Config) -> Result<()> {
    let (_, resolution) = load_ready(config)?;
    for blocked in &resolution.blocked {
        println!("{}\tblocked by: {}", blocked.id, blocked.unsatisfied.join(","));
    }
    Ok(())
}

pub fn run_prompt(config: &Config, id: &str) -> Result<()> {
    let tasks = store::load_flattened(&config.tm_file, &config.tag)?;
    let task = find_task(&tasks, id).ok_or_else(|| anyhow!("task not found: {id}"))?;
    print!("{}", prompt::render(task));
    Ok(())
}

pub fn run_prompt_all(config: &Config, out_dir: Option<PathBuf>) -> Result<()> {
    let (tasks, resolution) = load_ready(config)?;
    if resolution.ready.is_empty() {
        println!("No ready tasks.");
        return Ok(());
    }
    let out_dir = out_dir.unwrap_or_else(|| config.prompt_dir.clone());
    write_prompts(&tasks, &resolution.ready, &out_dir)
}

pub fn run_start(config: &Config) -> Result<()> {
    start_ready(config, &mut TerminalConfirmer, &TmStatusSink { config })
}

pub fn run_worktrees(config: &Config, with_agent: bool) -> Result<()> {
    git::ensure_worktree_preconditions()?;
    let runner = agent_runner(config, with_agent);
    worktree_ready(
        config,
        &mut TerminalConfirmer,
        &GitWorkspaces,
        runner.as_ref().map(|runner| runner as &dyn AgentRunner),
    )
}

pub fn run_kickoff(config: &Config, with_agent: bool) -> Result<()> {
    git::ensure_worktree_preconditions()?;
    let runner = agent_runner(config, with_agent);
    kickoff_ready(
        config,
        &mut TerminalConfirmer,
        &GitWorkspaces,
        &TmStatusSink { config },
        runner.as_ref().map(|runner| runner as &dyn AgentRunner),
    )
}

pub fn run_agent_prompt(config: &Config, id: &str) -> Result<()> {
    let tasks = store::load_flattened(&config.tm_file, &config.tag)?;
    let task = find_task(&tasks, id).ok_or_else(|| anyhow!("task not found: {id}"))?;

    println!("Calling agent for task {id}...");
    match agent::print_prompt(&config.agent_bin, &prompt::render(task)) {
        Ok(reply) => println!("{reply}"),
        Err(err) => eprintln!("WARNING: agent invocation failed for task {id}: {err:#}"),
    }
    Ok(())
}

pub fn run_scripts(config: &Config) -> Result<()> {
    let (tasks, resolution) = load_ready(config)?;
    if resolution.ready.is_empty() {
        println!("No ready tasks.");
        return Ok(());
    }

    println!(
        "Generating agent launch scripts for tasks: {}",
        resolution.ready.join(" ")
    );
    let prompt_dir = config.project_root.join(&config.prompt_dir);
    for id in &resolution.ready {
        let slug = naming::slugify(title_of(&tasks, id));
        let worktree = naming::worktree_dir(&config.worktree_base, id, &slug);
        if !worktree.is_dir() {
            eprintln!(
                "WARNING: no worktree for task {id} at {}. Skipping.",
                worktree.display()
            );
            continue;
        }

        let prompt_file = prompt::prompt_path(&prompt_dir, id);
        let script = agent::launch_script(&config.agent_bin, id, &prompt_file);
        let script_path = worktree.join("run_agent.sh");
        match kickoff_io::write_executable(&script_path, &script) {
            Ok(()) => println!("Created {}", script_path.display()),
            Err(err) => eprintln!("WARNING: failed to write script for task {id}: {err:#}"),
        }
    }
    Ok(())
}

pub fn run_debug(config: &Config) -> Result<()> {
    let tasks = store::load_flattened(&config.tm_file, &config.tag)?;
    let statuses = ready::status_map(&tasks);

    for task in &tasks {
        if !task.is_pending() {
            continue;
        }
        let satisfied = task
            .dependencies
            .iter()
            .all(|dep| ready::dep_satisfied(statuses.get(dep.as_str()).map(String::as_str)));
        let verdict = if satisfied { "READY" } else { "BLOCKED" };
        println!(
            "id={} status={} deps={} -> {verdict}",
            task.id,
            task.status,
            task.dependencies.join(",")
        );
    }
    Ok(())
}

pub fn run_verify(config: &Config, ids: Vec<String>) -> Result<()> {
    let tasks = store::load_flattened(&config.tm_file, &config.tag)?;
    let ids = if ids.is_empty() {
        ready::resolve(&tasks).ready
    } else {
        ids
    };

    println!(
        "== Checking worktrees/branches/status for: {} ==",
        ids.join(" ")
    );
    for line in verify_report(config, &tasks, &ids, &GitWorkspaces) {
        println!("{line}");
    }
    Ok(())
}

pub fn run_set(config: &Config, status: &str, ids: &[String]) -> Result<()> {
    set_statuses(ids, status, &TmStatusSink { config });
    Ok(())
}

pub fn run_show(config: &Config, id: &str) -> Result<()> {
    tm::passthrough(config, &["show", id])
}

pub fn run_next(config: &Config) -> Result<()> {
    tm::passthrough(config, &["next"])
}

// ---------------------------------------------------------------------------
// Orchestration, parameterized over the capability traits.
// ---------------------------------------------------------------------------

fn start_ready(
    config: &Config,
    confirmer: &mut dyn Confirmer,
    sink: &dyn StatusSink,
) -> Result<()> {
    let (_, resolution) = load_ready(config)?;
    if resolution.ready.is_empty() {
        println!("No ready tasks.");
        return Ok(());
    }

    println!(
        "The following tasks are ready to start: {}",
        resolution.ready.join(" ")
    );
    let question = format!("Proceed with starting {} tasks?", resolution.ready.len());
    if !confirmer.confirm(&question) {
        println!("Task start cancelled.");
        return Ok(());
    }

    println!("Starting: {}", resolution.ready.join(" "));
    set_statuses(&resolution.ready, STATUS_IN_PROGRESS, sink);
    Ok(())
}

fn worktree_ready(
    config: &Config,
    confirmer: &mut dyn Confirmer,
    workspaces: &dyn WorkspaceProvider,
    runner: Option<&dyn AgentRunner>,
) -> Result<()> {
    let (tasks, resolution) = load_ready(config)?;
    if resolution.ready.is_empty() {
        println!("No ready tasks.");
        return Ok(());
    }

    println!(
        "The following tasks are ready for worktree creation: {}",
        resolution.ready.join(" ")
    );
    let question = format!(
        "Proceed with creating worktrees for {} tasks?",
        resolution.ready.len()
    );
    if !confirmer.confirm(&question) {
        println!("Worktree creation cancelled.");
        return Ok(());
    }

    if runner.is_some() {
        write_prompts(&tasks, &resolution.ready, &config.prompt_dir)?;
    }
    let created = create_workspaces(config, &tasks, &resolution.ready, workspaces)?;
    if let Some(runner) = runner {
        launch_agents(config, &created, runner);
    }
    Ok(())
}

fn kickoff_ready(
    config: &Config,
    confirmer: &mut dyn Confirmer,
    workspaces: &dyn WorkspaceProvider,
    sink: &dyn StatusSink,
    runner: Option<&dyn AgentRunner>,
) -> Result<()> {
    let (tasks, resolution) = load_ready(config)?;
    if resolution.ready.is_empty() {
        println!("No ready tasks.");
        return Ok(());
    }

    println!(
        "The following tasks are ready for kickoff: {}",
        resolution.ready.join(" ")
    );
    let question = format!("Proceed with kickoff for {} tasks?", resolution.ready.len());
    if !confirmer.confirm(&question) {
        println!("Kickoff cancelled.");
        return Ok(());
    }

    println!("Ready IDs: {}", resolution.ready.join(" "));
    write_prompts(&tasks, &resolution.ready, &config.prompt_dir)?;
    let created = create_workspaces(config, &tasks, &resolution.ready, workspaces)?;
    set_statuses(&resolution.ready, STATUS_IN_PROGRESS, sink);
    if let Some(runner) = runner {
        launch_agents(config, &created, runner);
    }
    println!("Kickoff complete.");
    Ok(())
}

struct CreatedWorkspace {
    id: String,
    path: PathBuf,
}

/// One worktree per ready id, in resolver order. An existing branch is kept
/// and reported; a creation failure skips that task and moves on.
fn create_workspaces(
    config: &Config,
    tasks: &[Task],
    ready: &[String],
    workspaces: &dyn WorkspaceProvider,
) -> Result<Vec<CreatedWorkspace>> {
    kickoff_io::ensure_dir(&config.worktree_base)?;

    let mut created = Vec::new();
    for id in ready {
        let slug = naming::slugify(title_of(tasks, id));
        let branch = naming::branch_name(&config.branch_prefix, id, &slug);
        let path = naming::worktree_dir(&config.worktree_base, id, &slug);

        if workspaces.branch_exists(&branch) {
            println!("Branch {branch} already exists. Skipping.");
            created.push(CreatedWorkspace {
                id: id.clone(),
                path,
            });
            continue;
        }

        match workspaces.create(&branch, &path) {
            Ok(()) => {
                println!("Created worktree {} (branch {branch})", path.display());
                created.push(CreatedWorkspace {
                    id: id.clone(),
                    path,
                });
            }
            Err(err) => {
                eprintln!("WARNING: failed to create worktree for task {id}: {err:#}. Continuing...")
            }
        }
    }
    Ok(created)
}

fn write_prompts(tasks: &[Task], ready: &[String], out_dir: &Path) -> Result<()> {
    kickoff_io::ensure_dir(out_dir)?;
    for id in ready {
        let Some(task) = find_task(tasks, id) else {
            continue;
        };
        let path = prompt::write_prompt(out_dir, task)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn set_statuses(ids: &[String], status: &str, sink: &dyn StatusSink) {
    for id in ids {
        if let Err(err) = sink.set_status(id, status) {
            eprintln!("WARNING: failed to set status for task {id}: {err:#}. Continuing...");
        }
    }
}

fn launch_agents(config: &Config, created: &[CreatedWorkspace], runner: &dyn AgentRunner) {
    let prompt_dir = config.project_root.join(&config.prompt_dir);
    for workspace in created {
        println!("Launching agent for task {}...", workspace.id);
        let prompt_file = prompt::prompt_path(&prompt_dir, &workspace.id);
        if let Err(err) = runner.launch(&workspace.path, &prompt_file) {
            eprintln!(
                "WARNING: failed to launch agent for task {}: {err:#}. Continuing...",
                workspace.id
            );
        }
    }
}

fn verify_report(
    config: &Config,
    tasks: &[Task],
    ids: &[String],
    workspaces: &dyn WorkspaceProvider,
) -> Vec<String> {
    ids.iter()
        .map(|id| {
            let slug = naming::slugify(title_of(tasks, id));
            let branch = naming::branch_name(&config.branch_prefix, id, &slug);
            let path = naming::worktree_dir(&config.worktree_base, id, &slug);

            let dir_mark = if path.is_dir() {
                "[dir OK]"
            } else {
                "[dir MISSING]"
            };
            let branch_mark = if workspaces.branch_exists(&branch) {
                "[branch OK]"
            } else {
                "[branch MISSING]"
            };
            let status = find_task(tasks, id)
                .map(|task| task.status.as_str())
                .unwrap_or_default();
            let status_mark = if status == STATUS_IN_PROGRESS {
                "[status OK]".to_string()
            } else {
                format!("[status {status}]")
            };

            format!("Task {id}: {dir_mark} {branch_mark} {status_mark}")
        })
        .collect()
}

fn load_ready(config: &Config) -> Result<(Vec<Task>, Resolution)> {
    let tasks = store::load_flattened(&config.tm_file, &config.tag)?;
    let resolution = ready::resolve(&tasks);
    Ok((tasks, resolution))
}

fn title_of<'a>(tasks: &'a [Task], id: &str) -> &'a str {
    find_task(tasks, id)
        .map(|task| task.title.as_str())
        .unwrap_or_default()
}

fn agent_runner(config: &Config, with_agent: bool) -> Option<CliAgentRunner> {
    if !with_agent {
        return None;
    }
    if !agent::available(&config.agent_bin) {
        eprintln!(
            "WARNING: agent CLI '{}' not found. Continuing without agent launches.",
            config.agent_bin
        );
        return None;
    }
    Some(CliAgentRunner {
        bin: config.agent_bin.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::RefCell;

    use tempfile::{tempdir, TempDir};

    struct ScriptedConfirmer {
        answer: bool,
        asked: Vec<String>,
    }

    impl Confirmer for ScriptedConfirmer {
        fn confirm(&mut self, question: &str) -> bool {
            self.asked.push(question.to_string());
            self.answer
        }
    }

    #[derive(Default)]
    struct FakeWorkspaces {
        existing: Vec<String>,
        failing: Vec<String>,
        created: RefCell<Vec<String>>,
    }

    impl WorkspaceProvider for FakeWorkspaces {
        fn branch_exists(&self, branch: &str) -> bool {
            self.existing.iter().any(|known| known == branch)
        }

        fn create(&self, branch: &str, _path: &Path) -> Result<()> {
            if self.failing.iter().any(|bad| bad == branch) {
                return Err(anyhow!("disk full"));
            }
            self.created.borrow_mut().push(branch.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeSink {
        failing: Vec<String>,
        calls: RefCell<Vec<(String, String)>>,
    }

    impl StatusSink for FakeSink {
        fn set_status(&self, id: &str, status: &str) -> Result<()> {
            if self.failing.iter().any(|bad| bad == id) {
                return Err(anyhow!("tm unreachable"));
            }
            self.calls.borrow_mut().push((id.to_string(), status.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeRunner {
        launched: RefCell<Vec<PathBuf>>,
    }

    impl AgentRunner for FakeRunner {
        fn launch(&self, dir: &Path, _prompt_file: &Path) -> Result<()> {
            self.launched.borrow_mut().push(dir.to_path_buf());
            Ok(())
        }
    }

    fn fixture(tasks_json: &str) -> (TempDir, Config) {
        let dir = tempdir().unwrap();
        let tm_file = dir.path().join("tasks.json");
        std::fs::write(&tm_file, tasks_json).unwrap();

        let config = Config {
            tag: "master".to_string(),
            tm_bin: None,
            tm_file,
            state_file: dir.path().join("state.json"),
            prompt_dir: dir.path().join("prompts"),
            worktree_base: dir.path().join("ws"),
            branch_prefix: "ws/".to_string(),
            agent_bin: "claude".to_string(),
            project_root: dir.path().to_path_buf(),
        };
        (dir, config)
    }

    const THREE_READY: &str = r#"{"master": {"tasks": [
        {"id": 1, "status": "pending", "title": "First Task"},
        {"id": 2, "status": "pending", "title": "Second Task"},
        {"id": 3, "status": "pending", "title": "Third Task"}
    ]}}"#;

    #[test]
    fn refusal_leaves_external_state_untouched() {
        let (_dir, config) = fixture(THREE_READY);
        let mut confirmer = ScriptedConfirmer {
            answer: false,
            asked: Vec::new(),
        };
        let workspaces = FakeWorkspaces::default();
        let sink = FakeSink::default();

        kickoff_ready(&config, &mut confirmer, &workspaces, &sink, None).unwrap();

        assert_eq!(confirmer.asked.len(), 1);
        assert!(workspaces.created.borrow().is_empty());
        assert!(sink.calls.borrow().is_empty());
        assert!(!config.prompt_dir.exists());
    }

    #[test]
    fn kickoff_writes_prompts_creates_worktrees_and_flips_statuses() {
        let (_dir, config) = fixture(THREE_READY);
        let mut confirmer = ScriptedConfirmer {
            answer: true,
            asked: Vec::new(),
        };
        let workspaces = FakeWorkspaces::default();
        let sink = FakeSink::default();

        kickoff_ready(&config, &mut confirmer, &workspaces, &sink, None).unwrap();

        for id in ["1", "2", "3"] {
            assert!(config.prompt_dir.join(format!("{id}.txt")).exists());
        }
        assert_eq!(
            *workspaces.created.borrow(),
            vec!["ws/1-first-task", "ws/2-second-task", "ws/3-third-task"]
        );
        let calls = sink.calls.borrow();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|(_, status)| status == "in-progress"));
    }

    #[test]
    fn failed_worktree_creation_skips_that_task_but_continues() {
        let (_dir, config) = fixture(THREE_READY);
        let mut confirmer = ScriptedConfirmer {
            answer: true,
            asked: Vec::new(),
        };
        let workspaces = FakeWorkspaces {
            failing: vec!["ws/2-second-task".to_string()],
            ..FakeWorkspaces::default()
        };
        let runner = FakeRunner::default();

        worktree_ready(&config, &mut confirmer, &workspaces, Some(&runner)).unwrap();

        assert_eq!(
            *workspaces.created.borrow(),
            vec!["ws/1-first-task", "ws/3-third-task"]
        );
        let launched = launched_dirs(&runner);
        assert_eq!(launched, vec!["1-first-task", "3-third-task"]);
    }

    #[test]
    fn existing_branch_is_kept_for_the_launch_list() {
        let (_dir, config) = fixture(THREE_READY);
        let mut confirmer = ScriptedConfirmer {
            answer: true,
            asked: Vec::new(),
        };
        let workspaces = FakeWorkspaces {
            existing: vec!["ws/1-first-task".to_string()],
            ..FakeWorkspaces::default()
        };
        let runner = FakeRunner::default();

        worktree_ready(&config, &mut confirmer, &workspaces, Some(&runner)).unwrap();

        // No second create for the existing branch, but its worktree still
        // gets an agent.
        assert_eq!(
            *workspaces.created.borrow(),
            vec!["ws/2-second-task", "ws/3-third-task"]
        );
        let launched = launched_dirs(&runner);
        assert_eq!(launched, vec!["1-first-task", "2-second-task", "3-third-task"]);
    }

    #[test]
    fn status_failure_on_one_task_does_not_stop_the_batch() {
        let (_dir, config) = fixture(THREE_READY);
        let mut confirmer = ScriptedConfirmer {
            answer: true,
            asked: Vec::new(),
        };
        let sink = FakeSink {
            failing: vec!["2".to_string()],
            ..FakeSink::default()
        };

        start_ready(&config, &mut confirmer, &sink).unwrap();

        let ids: Vec<String> = sink.calls.borrow().iter().map(|(id, _)| id.clone()).collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[test]
    fn only_ready_tasks_are_processed() {
        let (_dir, config) = fixture(
            r#"{"master": {"tasks": [
                {"id": 1, "status": "done", "title": "Done already"},
                {"id": 2, "status": "pending", "title": "Gated", "dependencies": [4]},
                {"id": 3, "status": "pending", "title": "Free"}
            ]}}"#,
        );
        let mut confirmer = ScriptedConfirmer {
            answer: true,
            asked: Vec::new(),
        };
        let workspaces = FakeWorkspaces::default();
        let sink = FakeSink::default();

        kickoff_ready(&config, &mut confirmer, &workspaces, &sink, None).unwrap();

        assert_eq!(*workspaces.created.borrow(), vec!["ws/3-free"]);
        assert_eq!(sink.calls.borrow().len(), 1);
        assert!(!config.prompt_dir.join("2.txt").exists());
    }

    #[test]
    fn verify_report_marks_missing_pieces() {
        let (_dir, config) = fixture(THREE_READY);
        let tasks = store::load_flattened(&config.tm_file, &config.tag).unwrap();

        // Worktree for task 1 exists on disk, branch only for task 2.
        std::fs::create_dir_all(config.worktree_base.join("1-first-task")).unwrap();
        let workspaces = FakeWorkspaces {
            existing: vec!["ws/2-second-task".to_string()],
            ..FakeWorkspaces::default()
        };

        let ids = vec!["1".to_string(), "2".to_string()];
        let report = verify_report(&config, &tasks, &ids, &workspaces);

        assert_eq!(
            report,
            vec![
                "Task 1: [dir OK] [branch MISSING] [status pending]",
                "Task 2: [dir MISSING] [branch OK] [status pending]",
            ]
        );
    }

    fn launched_dirs(runner: &FakeRunner) -> Vec<String> {
        runner
            .launched
            .borrow()
            .iter()
            .map(|path| {
                path.file_name()
                    .and_then(|name| name.to_str())
                    .unwrap_or_default()
                    .to_string()
            })
            .collect()
    }
}
