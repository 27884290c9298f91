use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

mod agent;
mod config;
mod git;
mod kickoff_io;
mod model;
mod naming;
mod prompt;
mod ready;
mod store;
mod tm;
mod workflow;

use config::Config;

#[derive(Debug, Parser)]
#[command(name = "kickoff")]
#[command(about = "Kickoff helper for Task Master dependency graphs")]
#[command(
    long_about = "Kickoff helper for Task Master dependency graphs.\n\n\
        Reads the Task Master store, works out which pending tasks have all\n\
        their dependencies satisfied, and drives the kickoff workflow around\n\
        that set: prompt files, one git worktree per task, status changes\n\
        through the task-master CLI, and optional coding-agent launches."
)]
struct Cli {
    /// Tag context to operate on (default: detected from Task Master state)
    #[arg(long, global = true)]
    tag: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print ids of tasks that are ready to work on
    Ready,

    /// Print tasks blocked by unsatisfied dependencies
    Blocked,

    /// Print the generated prompt for one task
    Prompt {
        /// Task id
        id: String,
    },

    /// Write prompt files for every ready task
    PromptAll {
        /// Output directory (default: configured prompt dir)
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },

    /// Set every ready task to in-progress
    Start,

    /// Create a git worktree per ready task
    Worktree {
        /// Also write prompts and launch the coding agent in each worktree
        #[arg(long)]
        agent: bool,
    },

    /// Full kickoff: prompts + worktrees + status changes
    Kickoff {
        /// Also launch the coding agent in each worktree
        #[arg(long)]
        agent: bool,
    },

    /// Send one task's prompt to the coding agent and print the reply
    Agent {
        /// Task id
        id: String,
    },

    /// Write an executable run_agent.sh into each ready worktree
    Scripts,

    /// Show the readiness decision for each pending task
    DebugReady,

    /// Check worktrees, branches, and statuses after a kickoff
    Verify {
        /// Task ids to check (default: the current ready set)
        ids: Vec<String>,
    },

    /// Set task statuses via the task-master CLI
    Set {
        /// New status
        status: String,
        /// Task ids
        #[arg(required = true)]
        ids: Vec<String>,
    },

    /// Show task details via the task-master CLI
    Show {
        /// Task id
        id: String,
    },

    /// Ask the task-master CLI for the next task
    Next,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.tag);

    match cli.command {
        Commands::Ready => workflow::run_ready(&config),
        Commands::Blocked => workflow::run_blocked(&config),
        Commands::Prompt { id } => workflow::run_prompt(&config, &id),
        Commands::PromptAll { out_dir } => workflow::run_prompt_all(&config, out_dir),
        Commands::Start => workflow::run_start(&config),
        Commands::Worktree { agent } => workflow::run_worktrees(&config, agent),
        Commands::Kickoff { agent } => workflow::run_kickoff(&config, agent),
        Commands::Agent { id } => workflow::run_agent_prompt(&config, &id),
        Commands::Scripts => workflow::run_scripts(&config),
        Commands::DebugReady => workflow::run_debug(&config),
        Commands::Verify { ids } => workflow::run_verify(&config, ids),
        Commands::Set { status, ids } => workflow::run_set(&config, &status, &ids),
        Commands::Show { id } => workflow::run_show(&config, &id),
        Commands::Next => workflow::run_next(&config),
    }
}
