use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Local, Utc};
use serde::{Deserialize, Serialize};

pub const MAX_LEVEL: u32 = 20;
pub const XP_PER_LEVEL: u32 = 500;

const LEVEL_NAMES: [&str; MAX_LEVEL as usize] = [
    "Script Kiddie",
    "Bug Squasher",
    "Code Cadet",
    "Syntax Warrior",
    "Loop Master",
    "Data Wrangler",
    "Stack Navigator",
    "API Artisan",
    "Debug Phantom",
    "Algo Knight",
    "Binary Sage",
    "Cache Commander",
    "Thread Weaver",
    "Kernel Hacker",
    "Quantum Coder",
    "Neural Architect",
    "Cyber Sentinel",
    "Void Walker",
    "Matrix Bender",
    "Singularity",
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
    Missed,
}

impl TaskStatus {
    /// Next status in the click cycle: pending -> completed -> missed -> pending.
    pub fn cycle(self) -> Self {
        match self {
            TaskStatus::Pending => TaskStatus::Completed,
            TaskStatus::Completed => TaskStatus::Missed,
            TaskStatus::Missed => TaskStatus::Pending,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::Missed => "missed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "completed" => Ok(TaskStatus::Completed),
            "missed" => Ok(TaskStatus::Missed),
            other => Err(format!("unknown task status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum TaskCategory {
    ProjectsResearch,
    CodingPractice,
    BookWriting,
    EnglishPractice,
    Networking,
    Planning,
    Break,
}

impl TaskCategory {
    pub const ALL: [TaskCategory; 7] = [
        TaskCategory::ProjectsResearch,
        TaskCategory::CodingPractice,
        TaskCategory::BookWriting,
        TaskCategory::EnglishPractice,
        TaskCategory::Networking,
        TaskCategory::Planning,
        TaskCategory::Break,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TaskCategory::ProjectsResearch => "projects-research",
            TaskCategory::CodingPractice => "coding-practice",
            TaskCategory::BookWriting => "book-writing",
            TaskCategory::EnglishPractice => "english-practice",
            TaskCategory::Networking => "networking",
            TaskCategory::Planning => "planning",
            TaskCategory::Break => "break",
        }
    }
}

impl fmt::Display for TaskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim().to_lowercase();
        TaskCategory::ALL
            .into_iter()
            .find(|category| category.as_str() == wanted)
            .ok_or_else(|| format!("unknown task category: {wanted}"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// Column order of the weekly grid, Monday first.
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "Monday",
            Weekday::Tuesday => "Tuesday",
            Weekday::Wednesday => "Wednesday",
            Weekday::Thursday => "Thursday",
            Weekday::Friday => "Friday",
            Weekday::Saturday => "Saturday",
            Weekday::Sunday => "Sunday",
        }
    }

    pub fn today() -> Self {
        Self::from(Local::now().weekday())
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(value: chrono::Weekday) -> Self {
        match value {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Weekday {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let wanted = value.trim();
        Weekday::ALL
            .into_iter()
            .find(|day| day.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown weekday: {wanted}"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub time_slot: String,
    pub start_time: String,
    pub end_time: String,
    pub day: Weekday,
    pub category: TaskCategory,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

/// A task that has not been persisted yet. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct NewTask {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub time_slot: String,
    pub start_time: String,
    pub end_time: String,
    pub day: Weekday,
    pub category: TaskCategory,
    pub status: TaskStatus,
}

impl NewTask {
    pub fn into_task(self, id: String, created_at: DateTime<Utc>) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            time_slot: self.time_slot,
            start_time: self.start_time,
            end_time: self.end_time,
            day: self.day,
            category: self.category,
            status: self.status,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProgress {
    pub xp: u32,
    pub level: u32,
    pub streak: u32,
    pub longest_streak: u32,
    pub tasks_completed_today: u32,
    pub tasks_missed_today: u32,
    pub total_tasks_today: u32,
    pub weekly_completed: u32,
    pub weekly_missed: u32,
    pub recovery_rate: u32,
}

impl Default for UserProgress {
    fn default() -> Self {
        Self {
            xp: 0,
            level: 1,
            streak: 0,
            longest_streak: 0,
            tasks_completed_today: 0,
            tasks_missed_today: 0,
            // The shipped weekly grid has sixteen slots per day.
            total_tasks_today: 16,
            weekly_completed: 0,
            weekly_missed: 0,
            recovery_rate: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct XpTransaction {
    pub id: String,
    pub amount: u32,
    pub reason: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SettingsError {
    #[error("{0} must be at least one minute")]
    ZeroDuration(&'static str),
    #[error("sessions before a long break must be at least 1")]
    ZeroSessions,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroSettings {
    pub focus_duration: u32,
    pub break_duration: u32,
    pub long_break_duration: u32,
    pub sessions_before_long_break: u32,
}

impl Default for PomodoroSettings {
    fn default() -> Self {
        Self {
            focus_duration: 25,
            break_duration: 5,
            long_break_duration: 15,
            sessions_before_long_break: 4,
        }
    }
}

impl PomodoroSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.focus_duration == 0 {
            return Err(SettingsError::ZeroDuration("focus duration"));
        }
        if self.break_duration == 0 {
            return Err(SettingsError::ZeroDuration("break duration"));
        }
        if self.long_break_duration == 0 {
            return Err(SettingsError::ZeroDuration("long break duration"));
        }
        if self.sessions_before_long_break == 0 {
            return Err(SettingsError::ZeroSessions);
        }
        Ok(())
    }
}

pub fn level_from_xp(xp: u32) -> u32 {
    (xp / XP_PER_LEVEL + 1).min(MAX_LEVEL)
}

/// Total XP at which `level` is left behind.
pub fn xp_for_level(level: u32) -> u32 {
    level.saturating_mul(XP_PER_LEVEL)
}

pub fn level_name(level: u32) -> &'static str {
    let index = level.clamp(1, MAX_LEVEL) - 1;
    LEVEL_NAMES
        .get(index as usize)
        .copied()
        .unwrap_or("Singularity")
}

/// How far `xp` is into the current level band, as a percentage capped at 100.
pub fn level_progress_percent(xp: u32, level: u32) -> f64 {
    let floor = xp_for_level(level.saturating_sub(1));
    let into_band = xp.saturating_sub(floor);
    let percent = f64::from(into_band) / f64::from(XP_PER_LEVEL) * 100.0;
    percent.min(100.0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct TasksFile {
    pub schema_version: u32,
    pub tasks: Vec<Task>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProgressFile {
    pub schema_version: u32,
    pub progress: UserProgress,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct XpLogFile {
    pub schema_version: u32,
    pub entries: Vec<XpTransaction>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PomodoroFile {
    pub schema_version: u32,
    pub settings: PomodoroSettings,
}
