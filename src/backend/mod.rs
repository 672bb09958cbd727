//! The record store the app talks to: a `tasks` collection, a singleton
//! progress record and an append-only XP log.
//!
//! [`LocalBackend`] keeps everything in JSON files; [`RemoteBackend`] talks to a
//! JSON API. Both are used through the [`Backend`] trait.

mod local;
mod remote;

use async_trait::async_trait;

use crate::models::{NewTask, Task, TaskStatus, UserProgress, XpTransaction};
use crate::storage::StorageError;

pub use local::LocalBackend;
pub use remote::RemoteBackend;

#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("backend responded with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("not found: {0}")]
    NotFound(String),
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// All tasks, ordered by `start_time` ascending.
    async fn list_tasks(&self) -> Result<Vec<Task>, BackendError>;

    async fn insert_task(&self, task: NewTask) -> Result<Task, BackendError>;

    /// Inserts every task in one write; on error nothing is inserted.
    async fn insert_tasks(&self, tasks: Vec<NewTask>) -> Result<Vec<Task>, BackendError>;

    /// Full replace of the stored task with the same id.
    async fn update_task(&self, task: &Task) -> Result<(), BackendError>;

    async fn update_task_status(&self, id: &str, status: TaskStatus) -> Result<(), BackendError>;

    async fn delete_task(&self, id: &str) -> Result<(), BackendError>;

    /// `None` until a progress record has been written.
    async fn get_progress(&self) -> Result<Option<UserProgress>, BackendError>;

    async fn put_progress(&self, progress: &UserProgress) -> Result<(), BackendError>;

    /// XP log in append order.
    async fn get_xp_log(&self) -> Result<Vec<XpTransaction>, BackendError>;

    async fn append_xp(&self, entry: &XpTransaction) -> Result<(), BackendError>;

    /// Whether tasks live in the local data directory (and so can be restored from
    /// its backups).
    fn is_local(&self) -> bool {
        false
    }
}

pub(crate) fn sort_by_start_time(tasks: &mut [Task]) {
    tasks.sort_by(|a, b| a.start_time.cmp(&b.start_time));
}
