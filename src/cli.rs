use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "ttrack", about = "Personal task tracker with work timers")]
pub struct Cli {
    /// Path to the SQLite database [default: ~/.ttrack/ttrack.db]
    #[arg(long, env = "TTRACK_DB", global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Add a task
    Add {
        /// Task name
        name: String,
        /// Due date (free text, e.g. 2024-05-10)
        #[arg(short, long)]
        due: Option<String>,
        /// Category (Work or Personal); subtasks use their parent's
        #[arg(short, long)]
        category: Option<String>,
        /// Parent task id
        #[arg(short, long)]
        parent: Option<i64>,
    },

    /// Rename a task and set its due date
    Edit {
        id: i64,
        /// New name
        name: String,
        /// Due date; omit to clear
        #[arg(short, long)]
        due: Option<String>,
    },

    /// Replace a task's notes
    Notes {
        id: i64,
        /// Note text (omit to read from stdin)
        text: Option<String>,
    },

    /// Delete a task with its subtasks and sessions
    Rm { id: i64 },

    /// Show task details and its session log
    Show {
        id: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List active (unarchived) tasks
    List {
        /// Hide completed children of this task (repeatable)
        #[arg(long = "fold", value_name = "ID")]
        fold: Vec<i64>,
        /// Leave out the personal group
        #[arg(long)]
        hide_personal: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List archived tasks
    History {
        /// Only tasks closed on or after this date (YYYY-MM-DD)
        #[arg(long)]
        since: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a task and everything beneath it
    Subtree { id: i64 },

    /// Start a work session
    Start {
        id: i64,
        /// Countdown goal in minutes
        #[arg(short, long)]
        goal: Option<i64>,
    },

    /// Stop the running session
    Stop { id: i64 },

    /// Mark a task and its subtasks completed
    Done { id: i64 },

    /// Archive a task and its subtasks
    Archive { id: i64 },

    /// Archive every completed task
    FinishDay,

    /// Reset a finished task to NEW
    Reopen { id: i64 },

    /// Write a Markdown work report
    Report {
        /// Report on the previous Monday-to-Sunday week
        #[arg(long, conflicts_with_all = ["from", "to"])]
        last_week: bool,
        /// First day of a custom range (YYYY-MM-DD)
        #[arg(long, requires = "to")]
        from: Option<String>,
        /// Last day of a custom range (YYYY-MM-DD)
        #[arg(long, requires = "from")]
        to: Option<String>,
        /// Leave out the assistant instructions
        #[arg(long)]
        no_prompt: bool,
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show or add to the distance counter
    Distance {
        #[command(subcommand)]
        action: Option<DistanceAction>,
    },
}

#[derive(Subcommand)]
pub enum DistanceAction {
    /// Add kilometres to the counter
    Add { km: i64 },
}
