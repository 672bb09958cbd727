use std::sync::Arc;

use crate::backend::{Backend, BackendError};
use crate::import::{parse_schedule_csv, ImportError};
use crate::models::{NewTask, Task, TaskStatus};

#[derive(Debug, thiserror::Error)]
pub enum ScheduleImportError {
    #[error(transparent)]
    Invalid(#[from] ImportError),
    #[error(transparent)]
    Store(#[from] BackendError),
}

/// Task CRUD on top of a [`Backend`]. Failures are returned to the caller; there
/// is no fallback to cached data.
pub struct ScheduleStore<B: ?Sized = dyn Backend> {
    backend: Arc<B>,
}

impl<B: ?Sized> Clone for ScheduleStore<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
        }
    }
}

impl<B: Backend + ?Sized> ScheduleStore<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    /// All tasks ordered by `start_time` ascending.
    pub async fn list(&self) -> Result<Vec<Task>, BackendError> {
        self.backend.list_tasks().await
    }

    pub async fn create(&self, task: NewTask) -> Result<Task, BackendError> {
        self.backend.insert_task(task).await
    }

    pub async fn update(&self, task: &Task) -> Result<(), BackendError> {
        self.backend.update_task(task).await
    }

    pub async fn update_status(&self, id: &str, status: TaskStatus) -> Result<(), BackendError> {
        self.backend.update_task_status(id, status).await
    }

    pub async fn delete(&self, id: &str) -> Result<(), BackendError> {
        self.backend.delete_task(id).await
    }

    pub async fn bulk_insert(&self, tasks: Vec<NewTask>) -> Result<Vec<Task>, BackendError> {
        self.backend.insert_tasks(tasks).await
    }

    /// Parses the whole CSV first and only then inserts, so a malformed file
    /// never reaches the store.
    pub async fn import_csv(&self, csv_text: &str) -> Result<Vec<Task>, ScheduleImportError> {
        let parsed = parse_schedule_csv(csv_text)?;
        let count = parsed.len();
        let created = self.bulk_insert(parsed).await?;
        log::info!("csv import finished tasks={count}");
        Ok(created)
    }
}
