use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::Serialize;

use crate::models::{
    level_name, level_progress_percent, Task, TaskCategory, TaskStatus, UserProgress, Weekday,
};

pub const UPCOMING_LIMIT: usize = 4;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct DashboardSnapshot {
    pub today: Weekday,
    pub current_time: String,
    pub greeting: &'static str,
    pub today_tasks: Vec<Task>,
    pub active_task: Option<Task>,
    pub upcoming_tasks: Vec<Task>,
    pub missed_tasks: Vec<Task>,
    pub completion_percent: f64,
    pub progress: UserProgress,
    pub level_name: &'static str,
    pub level_progress_percent: f64,
}

impl DashboardSnapshot {
    /// Derives the dashboard view from `tasks` (expected in start-time order) at `now`.
    pub fn build(tasks: &[Task], progress: &UserProgress, now: NaiveDateTime) -> Self {
        let today = Weekday::from(now.weekday());
        let current_time = clock_string(now);
        let today_tasks = day_tasks(tasks, today);

        Self {
            today,
            greeting: greeting(now.hour()),
            active_task: active_task(&today_tasks, &current_time).cloned(),
            upcoming_tasks: upcoming_tasks(&today_tasks, &current_time),
            missed_tasks: missed_tasks(&today_tasks),
            completion_percent: completion_percent(progress),
            level_name: level_name(progress.level),
            level_progress_percent: level_progress_percent(progress.xp, progress.level),
            progress: progress.clone(),
            today_tasks,
            current_time,
        }
    }
}

/// Zero-padded 24-hour `HH:MM`, the same shape as stored start/end times.
pub fn clock_string(now: NaiveDateTime) -> String {
    now.format("%H:%M").to_string()
}

pub fn greeting(hour: u32) -> &'static str {
    match hour {
        0..=11 => "Morning",
        12..=16 => "Afternoon",
        _ => "Evening",
    }
}

pub fn day_tasks(tasks: &[Task], day: Weekday) -> Vec<Task> {
    tasks.iter().filter(|task| task.day == day).cloned().collect()
}

/// First non-break task whose slot contains `now`. Overlapping slots are the
/// caller's data problem; list order decides.
pub fn active_task<'a>(today_tasks: &'a [Task], now: &str) -> Option<&'a Task> {
    today_tasks.iter().find(|task| {
        task.category != TaskCategory::Break
            && task.start_time.as_str() <= now
            && now < task.end_time.as_str()
    })
}

pub fn upcoming_tasks(today_tasks: &[Task], now: &str) -> Vec<Task> {
    today_tasks
        .iter()
        .filter(|task| {
            task.category != TaskCategory::Break
                && task.start_time.as_str() > now
                && task.status == TaskStatus::Pending
        })
        .take(UPCOMING_LIMIT)
        .cloned()
        .collect()
}

pub fn missed_tasks(today_tasks: &[Task]) -> Vec<Task> {
    today_tasks
        .iter()
        .filter(|task| task.status == TaskStatus::Missed)
        .cloned()
        .collect()
}

pub fn completion_percent(progress: &UserProgress) -> f64 {
    if progress.total_tasks_today == 0 {
        return 0.0;
    }
    f64::from(progress.tasks_completed_today) / f64::from(progress.total_tasks_today) * 100.0
}
