use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::backend::Backend;
use crate::dashboard::{day_tasks, DashboardSnapshot};
use crate::models::{
    NewTask, PomodoroFile, PomodoroSettings, Task, TaskCategory, TaskStatus, UserProgress,
    Weekday, XpTransaction,
};
use crate::notify::Notifier;
use crate::progress::{xp_earned_on, ProgressStore, TASK_COMPLETED_XP};
use crate::schedule::ScheduleStore;
use crate::state::AppState;
use crate::storage::{Storage, SCHEMA_VERSION};

pub const TASK_COMPLETED_REASON: &str = "Task completed";

#[derive(Debug, Serialize)]
pub struct CommandResult<T> {
    pub ok: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BackupEntry {
    pub name: String,
    pub modified_at: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub day: Weekday,
    pub completed: u32,
    pub missed: u32,
    pub xp_earned: u32,
}

/// Fields to change on an existing task; `None` keeps the current value.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub day: Option<Weekday>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub category: Option<TaskCategory>,
}

impl TaskPatch {
    pub fn apply(self, task: &mut Task) {
        if let Some(title) = self.title {
            task.title = title;
        }
        if let Some(description) = self.description {
            task.description = description;
        }
        if let Some(day) = self.day {
            task.day = day;
        }
        if let Some(category) = self.category {
            task.category = category;
        }
        if self.start_time.is_some() || self.end_time.is_some() {
            if let Some(start) = self.start_time {
                task.start_time = start;
            }
            if let Some(end) = self.end_time {
                task.end_time = end;
            }
            task.time_slot = format!("{} - {}", task.start_time, task.end_time);
        }
    }
}

/// What a command needs from its surroundings besides the stores.
pub trait CommandCtx: Sync {
    /// Local wall-clock time.
    fn now(&self) -> NaiveDateTime;
    /// Local files: Pomodoro settings and task backups.
    fn storage(&self) -> &Storage;
    fn notifier(&self) -> &Notifier;
}

/// Context used by the binary: real clock, files under the data dir.
pub struct AppCtx {
    storage: Storage,
    notifier: Notifier,
}

impl AppCtx {
    pub fn new(storage: Storage, notifier: Notifier) -> Self {
        Self { storage, notifier }
    }
}

impl CommandCtx for AppCtx {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn storage(&self) -> &Storage {
        &self.storage
    }

    fn notifier(&self) -> &Notifier {
        &self.notifier
    }
}

/// The two stores plus the in-memory cache they feed.
#[derive(Clone)]
pub struct Hub {
    pub schedule: ScheduleStore,
    pub progress: ProgressStore,
    pub state: AppState,
    local_storage: bool,
}

impl Hub {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        Self {
            local_storage: backend.is_local(),
            schedule: ScheduleStore::new(Arc::clone(&backend)),
            progress: ProgressStore::new(backend),
            state: AppState::default(),
        }
    }
}

pub fn ok<T>(data: T) -> CommandResult<T> {
    CommandResult {
        ok: true,
        data: Some(data),
        error: None,
    }
}

pub fn err<T>(message: &str) -> CommandResult<T> {
    log::warn!("command failed: {message}");
    CommandResult {
        ok: false,
        data: None,
        error: Some(message.to_string()),
    }
}

fn today(ctx: &impl CommandCtx) -> Weekday {
    use chrono::Datelike;
    Weekday::from(ctx.now().weekday())
}

pub async fn load_state_impl(hub: &Hub) -> CommandResult<(Vec<Task>, UserProgress)> {
    let tasks = match hub.schedule.list().await {
        Ok(tasks) => tasks,
        Err(error) => return err(&format!("storage error: {error}")),
    };
    let progress = match hub.progress.fetch().await {
        Ok(progress) => progress,
        Err(error) => return err(&format!("storage error: {error}")),
    };
    hub.state.replace_tasks(tasks.clone());
    hub.state.set_progress(progress.clone());
    ok((tasks, progress))
}

pub async fn list_tasks_impl(hub: &Hub) -> CommandResult<Vec<Task>> {
    match hub.schedule.list().await {
        Ok(tasks) => {
            hub.state.replace_tasks(tasks.clone());
            ok(tasks)
        }
        Err(error) => err(&format!("storage error: {error}")),
    }
}

pub async fn day_tasks_impl(hub: &Hub, day: Weekday) -> CommandResult<Vec<Task>> {
    let result = list_tasks_impl(hub).await;
    match result.data {
        Some(tasks) => ok(day_tasks(&tasks, day)),
        None => CommandResult { data: None, ..result },
    }
}

pub async fn add_task_impl(hub: &Hub, task: NewTask) -> CommandResult<Task> {
    match hub.schedule.create(task).await {
        Ok(created) => {
            hub.state.add_task(created.clone());
            ok(created)
        }
        Err(error) => err(&format!("storage error: {error}")),
    }
}

pub async fn edit_task_impl(hub: &Hub, task_id: String, patch: TaskPatch) -> CommandResult<Task> {
    let tasks = match hub.schedule.list().await {
        Ok(tasks) => tasks,
        Err(error) => return err(&format!("storage error: {error}")),
    };
    let Some(mut task) = tasks.into_iter().find(|t| t.id == task_id) else {
        return err("task not found");
    };
    patch.apply(&mut task);
    if let Err(error) = hub.schedule.update(&task).await {
        return err(&format!("storage error: {error}"));
    }
    hub.state.update_task(task.clone());
    ok(task)
}

pub async fn remove_task_impl(hub: &Hub, task_id: String) -> CommandResult<bool> {
    if let Err(error) = hub.schedule.delete(&task_id).await {
        return err(&format!("storage error: {error}"));
    }
    hub.state.remove_task(&task_id);
    ok(true)
}

/// Status update, XP for completions, missed-task hook (in the background), then
/// counter recompute.
///
/// The status write and the counter write are separate round trips. Two sessions
/// changing statuses at once can overwrite each other's counters (last write wins).
pub async fn change_status_impl(
    ctx: &impl CommandCtx,
    hub: &Hub,
    task_id: String,
    status: TaskStatus,
) -> CommandResult<UserProgress> {
    if let Err(error) = hub.schedule.update_status(&task_id, status).await {
        return err(&format!("storage error: {error}"));
    }
    hub.state.set_status(&task_id, status);

    if status == TaskStatus::Completed {
        if let Err(error) = hub
            .progress
            .add_xp(TASK_COMPLETED_XP, TASK_COMPLETED_REASON, Some(&task_id))
            .await
        {
            return err(&format!("storage error: {error}"));
        }
    }

    let tasks = match hub.schedule.list().await {
        Ok(tasks) => tasks,
        Err(error) => return err(&format!("storage error: {error}")),
    };

    if status == TaskStatus::Missed {
        if let Some(task) = tasks.iter().find(|t| t.id == task_id) {
            ctx.notifier()
                .spawn_missed_task(task.id.clone(), task.title.clone());
        }
    }

    let progress = match hub.progress.recompute_counters(&tasks, today(ctx)).await {
        Ok(progress) => progress,
        Err(error) => return err(&format!("storage error: {error}")),
    };
    hub.state.replace_tasks(tasks);
    hub.state.set_progress(progress.clone());
    ok(progress)
}

/// Advances a task along pending -> completed -> missed -> pending.
pub async fn cycle_status_impl(
    ctx: &impl CommandCtx,
    hub: &Hub,
    task_id: String,
) -> CommandResult<UserProgress> {
    let mut tasks = hub.state.tasks();
    if !tasks.iter().any(|t| t.id == task_id) {
        tasks = match hub.schedule.list().await {
            Ok(tasks) => tasks,
            Err(error) => return err(&format!("storage error: {error}")),
        };
    }
    let Some(current) = tasks.iter().find(|t| t.id == task_id).map(|t| t.status) else {
        return err("task not found");
    };
    change_status_impl(ctx, hub, task_id, current.cycle()).await
}

/// All-or-nothing: a malformed file or a failed insert leaves the store untouched.
pub async fn import_csv_impl(hub: &Hub, csv_text: &str) -> CommandResult<Vec<Task>> {
    let created = match hub.schedule.import_csv(csv_text).await {
        Ok(created) => created,
        Err(error) => return err(&format!("import error: {error}")),
    };
    match hub.schedule.list().await {
        Ok(tasks) => hub.state.replace_tasks(tasks),
        Err(error) => log::warn!("task cache not refreshed after import: {error}"),
    }
    ok(created)
}

pub async fn load_progress_impl(hub: &Hub) -> CommandResult<UserProgress> {
    match hub.progress.fetch().await {
        Ok(progress) => {
            hub.state.set_progress(progress.clone());
            ok(progress)
        }
        Err(error) => err(&format!("storage error: {error}")),
    }
}

pub async fn xp_log_impl(hub: &Hub) -> CommandResult<Vec<XpTransaction>> {
    match hub.progress.xp_log().await {
        Ok(log) => ok(log),
        Err(error) => err(&format!("storage error: {error}")),
    }
}

pub async fn dashboard_impl(ctx: &impl CommandCtx, hub: &Hub) -> CommandResult<DashboardSnapshot> {
    let loaded = load_state_impl(hub).await;
    let Some((tasks, progress)) = loaded.data else {
        return CommandResult {
            ok: false,
            data: None,
            error: loaded.error,
        };
    };
    ok(DashboardSnapshot::build(&tasks, &progress, ctx.now()))
}

/// Stored Pomodoro settings; missing or unreadable files fall back to defaults.
pub fn load_pomodoro_settings_impl(ctx: &impl CommandCtx) -> CommandResult<PomodoroSettings> {
    let settings = match ctx.storage().load_pomodoro() {
        Ok(Some(file)) => file.settings,
        Ok(None) => PomodoroSettings::default(),
        Err(error) => {
            log::warn!("pomodoro settings unreadable, using defaults: {error}");
            PomodoroSettings::default()
        }
    };
    ok(settings)
}

pub fn save_pomodoro_settings_impl(
    ctx: &impl CommandCtx,
    settings: PomodoroSettings,
) -> CommandResult<PomodoroSettings> {
    if let Err(error) = settings.validate() {
        return err(&format!("invalid settings: {error}"));
    }
    let file = PomodoroFile {
        schema_version: SCHEMA_VERSION,
        settings: settings.clone(),
    };
    if let Err(error) = ctx.storage().save_pomodoro(&file) {
        return err(&format!("storage error: {error}"));
    }
    ok(settings)
}

/// Today's completed/missed counts and XP, also sent to the summary hook in the background.
pub async fn daily_summary_impl(ctx: &impl CommandCtx, hub: &Hub) -> CommandResult<DailySummary> {
    let tasks = match hub.schedule.list().await {
        Ok(tasks) => tasks,
        Err(error) => return err(&format!("storage error: {error}")),
    };
    let log = match hub.progress.xp_log().await {
        Ok(log) => log,
        Err(error) => return err(&format!("storage error: {error}")),
    };

    let now = ctx.now();
    let day = today(ctx);
    let todays = day_tasks(&tasks, day);
    let count = |status| {
        u32::try_from(todays.iter().filter(|t| t.status == status).count()).unwrap_or(u32::MAX)
    };
    let summary = DailySummary {
        day,
        completed: count(TaskStatus::Completed),
        missed: count(TaskStatus::Missed),
        xp_earned: xp_earned_on(&log, now.date()),
    };
    ctx.notifier()
        .spawn_daily_summary(summary.completed, summary.missed, summary.xp_earned);
    ok(summary)
}

pub fn list_backups_impl(ctx: &impl CommandCtx) -> CommandResult<Vec<BackupEntry>> {
    match ctx.storage().list_backups() {
        Ok(entries) => ok(entries
            .into_iter()
            .map(|(name, modified_at)| BackupEntry { name, modified_at })
            .collect()),
        Err(error) => err(&format!("storage error: {error}")),
    }
}

/// Restores a local task-file backup and reloads the cache from the store.
/// Refused when tasks live in a remote backend.
pub async fn restore_backup_impl(
    ctx: &impl CommandCtx,
    hub: &Hub,
    filename: String,
) -> CommandResult<Vec<Task>> {
    if !hub.local_storage {
        return err("restore is only supported with local storage");
    }
    if let Err(error) = ctx.storage().restore_backup(&filename) {
        return err(&format!("storage error: {error}"));
    }
    list_tasks_impl(hub).await
}
