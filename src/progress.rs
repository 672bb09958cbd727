//! XP, levels and the daily/weekly counters kept in the single progress record.

use std::sync::Arc;

use chrono::{Local, NaiveDate, Utc};

use crate::backend::{Backend, BackendError};
use crate::models::{level_from_xp, Task, TaskStatus, UserProgress, Weekday, XpTransaction};

pub const TASK_COMPLETED_XP: u32 = 50;
pub const POMODORO_XP: u32 = 25;

pub struct ProgressStore<B: ?Sized = dyn Backend> {
    backend: Arc<B>,
}

impl<B: ?Sized> Clone for ProgressStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: Backend + ?Sized> ProgressStore<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// The stored record, or defaults if nothing has been saved yet.
    pub async fn fetch(&self) -> Result<UserProgress, BackendError> {
        Ok(self.backend.get_progress().await?.unwrap_or_default())
    }

    /// Persists the whole record. Last write wins.
    pub async fn save(&self, progress: &UserProgress) -> Result<(), BackendError> {
        self.backend.put_progress(progress).await
    }

    /// Adds XP, recomputes the level, saves the record and then appends a log entry.
    ///
    /// The record and the log are two separate writes. If the process dies between
    /// them the XP is counted but has no log entry; nothing repairs that afterwards.
    pub async fn add_xp(
        &self,
        amount: u32,
        reason: &str,
        task_id: Option<&str>,
    ) -> Result<UserProgress, BackendError> {
        let mut progress = self.fetch().await?;
        progress.xp = progress.xp.saturating_add(amount);
        progress.level = level_from_xp(progress.xp);
        self.save(&progress).await?;

        let entry = XpTransaction {
            id: uuid::Uuid::new_v4().to_string(),
            amount,
            reason: reason.to_string(),
            timestamp: Utc::now(),
            task_id: task_id.map(str::to_string),
        };
        self.backend.append_xp(&entry).await?;
        log::info!(
            "xp awarded amount={amount} reason={reason:?} total={} level={}",
            progress.xp,
            progress.level
        );
        Ok(progress)
    }

    pub async fn xp_log(&self) -> Result<Vec<XpTransaction>, BackendError> {
        self.backend.get_xp_log().await
    }

    /// Re-derives the task counters from `tasks` and saves the record.
    pub async fn recompute_counters(
        &self,
        tasks: &[Task],
        today: Weekday,
    ) -> Result<UserProgress, BackendError> {
        let mut progress = self.fetch().await?;
        apply_task_counters(&mut progress, tasks, today);
        self.save(&progress).await?;
        Ok(progress)
    }
}

/// Overwrites the daily and weekly counters. XP, level and streaks are untouched.
pub fn apply_task_counters(progress: &mut UserProgress, tasks: &[Task], today: Weekday) {
    let today_tasks: Vec<&Task> = tasks.iter().filter(|task| task.day == today).collect();
    progress.tasks_completed_today = count_status(today_tasks.iter().copied(), TaskStatus::Completed);
    progress.tasks_missed_today = count_status(today_tasks.iter().copied(), TaskStatus::Missed);
    progress.total_tasks_today = saturating_u32(today_tasks.len());

    progress.weekly_completed = count_status(tasks.iter(), TaskStatus::Completed);
    progress.weekly_missed = count_status(tasks.iter(), TaskStatus::Missed);
    progress.recovery_rate = recovery_rate(progress.weekly_completed, progress.weekly_missed);
}

fn count_status<'a>(tasks: impl Iterator<Item = &'a Task>, status: TaskStatus) -> u32 {
    saturating_u32(tasks.filter(|task| task.status == status).count())
}

fn saturating_u32(value: usize) -> u32 {
    u32::try_from(value).unwrap_or(u32::MAX)
}

/// Share of resolved tasks that were completed, rounded to a whole percent.
pub fn recovery_rate(completed: u32, missed: u32) -> u32 {
    let resolved = u64::from(completed) + u64::from(missed);
    if resolved == 0 {
        return 0;
    }
    let rate = (u64::from(completed) * 100 + resolved / 2) / resolved;
    u32::try_from(rate).unwrap_or(100)
}

/// XP logged on `date` in local time.
pub fn xp_earned_on(log: &[XpTransaction], date: NaiveDate) -> u32 {
    log.iter()
        .filter(|entry| entry.timestamp.with_timezone(&Local).date_naive() == date)
        .fold(0u32, |total, entry| total.saturating_add(entry.amount))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use crate::models::{TaskCategory, MAX_LEVEL, XP_PER_LEVEL};
    use crate::storage::Storage;

    fn store() -> (ProgressStore<LocalBackend>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(Storage::new(dir.path().to_path_buf()));
        (ProgressStore::new(Arc::new(backend)), dir)
    }

    fn task(day: Weekday, status: TaskStatus) -> Task {
        Task {
            id: uuid::Uuid::new_v4().to_string(),
            title: "t".to_string(),
            description: String::new(),
            time_slot: "08:00 - 09:00".to_string(),
            start_time: "08:00".to_string(),
            end_time: "09:00".to_string(),
            day,
            category: TaskCategory::ProjectsResearch,
            status,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn fetch_returns_defaults_before_first_save() {
        let (store, _dir) = store();
        assert_eq!(store.fetch().await.unwrap(), UserProgress::default());
    }

    #[tokio::test]
    async fn level_tracks_total_xp_after_every_award() {
        let (store, _dir) = store();
        let mut total = 0u32;
        for amount in [0, 25, 50, 425, 499, 1, 3_000, 6_000, 10_000] {
            total += amount;
            let progress = store.add_xp(amount, "test", None).await.unwrap();
            assert_eq!(progress.xp, total);
            assert_eq!(
                progress.level,
                (total / XP_PER_LEVEL + 1).min(MAX_LEVEL),
                "level mismatch at xp={total}"
            );
        }
        assert_eq!(store.fetch().await.unwrap().level, MAX_LEVEL);
    }

    #[tokio::test]
    async fn add_xp_appends_one_log_entry_per_call() {
        let (store, _dir) = store();
        store
            .add_xp(TASK_COMPLETED_XP, "Task completed", Some("t1"))
            .await
            .unwrap();
        store
            .add_xp(POMODORO_XP, "Pomodoro session completed", None)
            .await
            .unwrap();

        let log = store.xp_log().await.unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].amount, 50);
        assert_eq!(log[0].task_id.as_deref(), Some("t1"));
        assert_eq!(log[1].reason, "Pomodoro session completed");
        assert_ne!(log[0].id, log[1].id);
    }

    #[tokio::test]
    async fn recompute_overwrites_counters_but_keeps_xp() {
        let (store, _dir) = store();
        store.add_xp(600, "seed", None).await.unwrap();

        let tasks = vec![
            task(Weekday::Monday, TaskStatus::Completed),
            task(Weekday::Monday, TaskStatus::Missed),
            task(Weekday::Monday, TaskStatus::Pending),
            task(Weekday::Tuesday, TaskStatus::Completed),
            task(Weekday::Tuesday, TaskStatus::Completed),
        ];
        let progress = store
            .recompute_counters(&tasks, Weekday::Monday)
            .await
            .unwrap();

        assert_eq!(progress.xp, 600);
        assert_eq!(progress.level, 2);
        assert_eq!(progress.tasks_completed_today, 1);
        assert_eq!(progress.tasks_missed_today, 1);
        assert_eq!(progress.total_tasks_today, 3);
        assert_eq!(progress.weekly_completed, 3);
        assert_eq!(progress.weekly_missed, 1);
        assert_eq!(progress.recovery_rate, 75);
        assert_eq!(store.fetch().await.unwrap(), progress);
    }

    #[test]
    fn recovery_rate_handles_empty_and_rounds() {
        assert_eq!(recovery_rate(0, 0), 0);
        assert_eq!(recovery_rate(1, 2), 33);
        assert_eq!(recovery_rate(2, 1), 67);
        assert_eq!(recovery_rate(5, 0), 100);
    }

    #[test]
    fn xp_earned_on_sums_matching_local_day() {
        let now = Utc::now();
        let today = now.with_timezone(&Local).date_naive();
        let entry = |amount: u32, timestamp| XpTransaction {
            id: amount.to_string(),
            amount,
            reason: "r".to_string(),
            timestamp,
            task_id: None,
        };
        let log = vec![
            entry(50, now),
            entry(25, now),
            entry(10, now - chrono::Duration::days(3)),
        ];
        assert_eq!(xp_earned_on(&log, today), 75);
    }
}
