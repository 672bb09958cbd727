use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::models::{TaskCategory, TaskStatus, Weekday};

#[derive(Debug, Parser)]
#[command(name = "study-hub", version)]
#[command(about = "Weekly study schedule with XP, levels and a Pomodoro focus timer")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// List tasks in start-time order
    Tasks {
        /// Only this weekday (e.g. "monday")
        #[arg(long)]
        day: Option<Weekday>,
    },
    /// List today's tasks
    Today,
    /// Add a task; the category is guessed from the title unless given
    Add {
        title: String,
        #[arg(long)]
        day: Weekday,
        /// Start time, HH:MM
        #[arg(long)]
        start: String,
        /// End time, HH:MM
        #[arg(long)]
        end: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        category: Option<TaskCategory>,
    },
    /// Change fields of an existing task
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        day: Option<Weekday>,
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        #[arg(long)]
        category: Option<TaskCategory>,
    },
    /// Set a task's status (pending, completed, missed)
    Status { id: String, status: TaskStatus },
    /// Advance a task to its next status
    Cycle { id: String },
    /// Delete a task
    Delete { id: String },
    /// Import a weekly timetable CSV
    Import { path: PathBuf },
    /// Show XP, level and counters
    Progress,
    /// Show the XP ledger
    XpLog,
    /// Show today's overview
    Dashboard,
    /// Run Pomodoro phases in the foreground; Ctrl-C stops
    Focus {
        #[arg(long, default_value_t = 1)]
        phases: u32,
    },
    /// Show or change Pomodoro settings (minutes)
    Pomodoro {
        #[arg(long)]
        focus: Option<u32>,
        #[arg(long = "break")]
        short_break: Option<u32>,
        #[arg(long)]
        long_break: Option<u32>,
        /// Focus sessions before a long break
        #[arg(long)]
        sessions: Option<u32>,
    },
    /// Today's completed/missed counts and XP; posts to the summary hook
    Summary,
    /// List task backups
    Backups,
    /// Restore tasks from a backup file name
    Restore { name: String },
    /// Print config path and create default file if missing
    ConfigPath,
}
