use std::sync::{Arc, Mutex, MutexGuard};

use crate::models::{Task, TaskStatus, UserProgress};

/// In-memory copy of the last loaded tasks and progress.
///
/// Only refreshed after a store call succeeds; there is no consistency with
/// other processes editing the same store.
#[derive(Clone, Default)]
pub struct AppState {
    inner: Arc<Mutex<AppData>>,
}

#[derive(Debug, Default)]
struct AppData {
    tasks: Vec<Task>,
    progress: Option<UserProgress>,
}

impl AppState {
    pub fn new(tasks: Vec<Task>, progress: UserProgress) -> Self {
        Self {
            inner: Arc::new(Mutex::new(AppData {
                tasks,
                progress: Some(progress),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AppData> {
        // Poisoning is ignored; the next load replaces the cache wholesale.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.lock().tasks.clone()
    }

    pub fn progress(&self) -> Option<UserProgress> {
        self.lock().progress.clone()
    }

    pub fn replace_tasks(&self, tasks: Vec<Task>) {
        self.lock().tasks = tasks;
    }

    pub fn set_progress(&self, progress: UserProgress) {
        self.lock().progress = Some(progress);
    }

    pub fn add_task(&self, task: Task) {
        let mut guard = self.lock();
        guard.tasks.push(task);
        guard
            .tasks
            .sort_by(|a, b| a.start_time.cmp(&b.start_time));
    }

    pub fn update_task(&self, task: Task) {
        let mut guard = self.lock();
        if let Some(existing) = guard.tasks.iter_mut().find(|t| t.id == task.id) {
            *existing = task;
        }
    }

    pub fn set_status(&self, task_id: &str, status: TaskStatus) {
        let mut guard = self.lock();
        if let Some(existing) = guard.tasks.iter_mut().find(|t| t.id == task_id) {
            existing.status = status;
        }
    }

    pub fn remove_task(&self, task_id: &str) {
        self.lock().tasks.retain(|task| task.id != task_id);
    }
}
