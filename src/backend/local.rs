use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use super::{sort_by_start_time, Backend, BackendError};
use crate::models::{
    NewTask, ProgressFile, Task, TaskStatus, TasksFile, UserProgress, XpLogFile, XpTransaction,
};
use crate::storage::{Storage, SCHEMA_VERSION};

/// File-backed store. Every read-modify-write holds `lock`, so writes from the
/// same process never interleave.
pub struct LocalBackend {
    storage: Storage,
    lock: Mutex<()>,
}

impl LocalBackend {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            lock: Mutex::new(()),
        }
    }

    fn read_tasks(&self) -> Result<Vec<Task>, BackendError> {
        Ok(self
            .storage
            .load_tasks()?
            .map(|file| file.tasks)
            .unwrap_or_default())
    }

    fn write_tasks(&self, tasks: Vec<Task>, with_backup: bool) -> Result<(), BackendError> {
        let file = TasksFile {
            schema_version: SCHEMA_VERSION,
            tasks,
        };
        self.storage.save_tasks(&file, with_backup)?;
        Ok(())
    }
}

fn assign_identity(task: NewTask) -> Task {
    task.into_task(uuid::Uuid::new_v4().to_string(), Utc::now())
}

#[async_trait]
impl Backend for LocalBackend {
    async fn list_tasks(&self) -> Result<Vec<Task>, BackendError> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.read_tasks()?;
        sort_by_start_time(&mut tasks);
        Ok(tasks)
    }

    async fn insert_task(&self, task: NewTask) -> Result<Task, BackendError> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.read_tasks()?;
        let created = assign_identity(task);
        tasks.push(created.clone());
        self.write_tasks(tasks, false)?;
        log::debug!("task inserted id={}", created.id);
        Ok(created)
    }

    async fn insert_tasks(&self, new_tasks: Vec<NewTask>) -> Result<Vec<Task>, BackendError> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.read_tasks()?;
        let created: Vec<Task> = new_tasks.into_iter().map(assign_identity).collect();
        tasks.extend(created.iter().cloned());
        self.write_tasks(tasks, true)?;
        log::info!("bulk insert stored tasks={}", created.len());
        Ok(created)
    }

    async fn update_task(&self, task: &Task) -> Result<(), BackendError> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.read_tasks()?;
        let existing = tasks
            .iter_mut()
            .find(|t| t.id == task.id)
            .ok_or_else(|| BackendError::NotFound(format!("task {}", task.id)))?;
        *existing = task.clone();
        self.write_tasks(tasks, false)
    }

    async fn update_task_status(&self, id: &str, status: TaskStatus) -> Result<(), BackendError> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.read_tasks()?;
        let existing = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| BackendError::NotFound(format!("task {id}")))?;
        existing.status = status;
        self.write_tasks(tasks, false)
    }

    async fn delete_task(&self, id: &str) -> Result<(), BackendError> {
        let _guard = self.lock.lock().await;
        let mut tasks = self.read_tasks()?;
        let before = tasks.len();
        tasks.retain(|task| task.id != id);
        if tasks.len() == before {
            return Err(BackendError::NotFound(format!("task {id}")));
        }
        self.write_tasks(tasks, false)
    }

    async fn get_progress(&self) -> Result<Option<UserProgress>, BackendError> {
        let _guard = self.lock.lock().await;
        Ok(self.storage.load_progress()?.map(|file| file.progress))
    }

    async fn put_progress(&self, progress: &UserProgress) -> Result<(), BackendError> {
        let _guard = self.lock.lock().await;
        self.storage.save_progress(&ProgressFile {
            schema_version: SCHEMA_VERSION,
            progress: progress.clone(),
        })?;
        Ok(())
    }

    async fn get_xp_log(&self) -> Result<Vec<XpTransaction>, BackendError> {
        let _guard = self.lock.lock().await;
        Ok(self
            .storage
            .load_xp_log()?
            .map(|file| file.entries)
            .unwrap_or_default())
    }

    async fn append_xp(&self, entry: &XpTransaction) -> Result<(), BackendError> {
        let _guard = self.lock.lock().await;
        let mut entries = self
            .storage
            .load_xp_log()?
            .map(|file| file.entries)
            .unwrap_or_default();
        entries.push(entry.clone());
        self.storage.save_xp_log(&XpLogFile {
            schema_version: SCHEMA_VERSION,
            entries,
        })?;
        Ok(())
    }
    fn is_local(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TaskCategory, Weekday};

    fn new_task(title: &str, start: &str, end: &str) -> NewTask {
        NewTask {
            title: title.to_string(),
            description: String::new(),
            time_slot: format!("{start} - {end}"),
            start_time: start.to_string(),
            end_time: end.to_string(),
            day: Weekday::Monday,
            category: TaskCategory::ProjectsResearch,
            status: TaskStatus::Pending,
        }
    }

    fn backend() -> (LocalBackend, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let backend = LocalBackend::new(Storage::new(dir.path().to_path_buf()));
        (backend, dir)
    }

    #[tokio::test]
    async fn list_is_ordered_by_start_time() {
        let (backend, _dir) = backend();
        backend.insert_task(new_task("late", "14:00", "15:00")).await.unwrap();
        backend.insert_task(new_task("early", "08:30", "09:30")).await.unwrap();
        backend.insert_task(new_task("mid", "10:00", "11:00")).await.unwrap();

        let titles: Vec<String> = backend
            .list_tasks()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, vec!["early", "mid", "late"]);
    }

    #[tokio::test]
    async fn insert_assigns_unique_ids() {
        let (backend, _dir) = backend();
        let created = backend
            .insert_tasks(vec![
                new_task("a", "08:00", "09:00"),
                new_task("b", "09:00", "10:00"),
            ])
            .await
            .unwrap();
        assert_eq!(created.len(), 2);
        assert_ne!(created[0].id, created[1].id);
        assert!(!created[0].id.is_empty());
    }

    #[tokio::test]
    async fn status_update_and_delete_report_missing_ids() {
        let (backend, _dir) = backend();
        let task = backend.insert_task(new_task("a", "08:00", "09:00")).await.unwrap();

        backend
            .update_task_status(&task.id, TaskStatus::Completed)
            .await
            .unwrap();
        let stored = backend.list_tasks().await.unwrap();
        assert_eq!(stored[0].status, TaskStatus::Completed);

        assert!(matches!(
            backend.update_task_status("missing", TaskStatus::Missed).await,
            Err(BackendError::NotFound(_))
        ));
        assert!(matches!(
            backend.delete_task("missing").await,
            Err(BackendError::NotFound(_))
        ));

        backend.delete_task(&task.id).await.unwrap();
        assert!(backend.list_tasks().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_replaces_every_field() {
        let (backend, _dir) = backend();
        let mut task = backend.insert_task(new_task("a", "08:00", "09:00")).await.unwrap();
        task.title = "renamed".to_string();
        task.day = Weekday::Friday;
        task.category = TaskCategory::Planning;
        backend.update_task(&task).await.unwrap();

        let stored = backend.list_tasks().await.unwrap();
        assert_eq!(stored, vec![task]);
    }

    #[tokio::test]
    async fn progress_and_xp_log_persist() {
        let (backend, _dir) = backend();
        assert!(backend.get_progress().await.unwrap().is_none());
        assert!(backend.get_xp_log().await.unwrap().is_empty());

        let mut progress = UserProgress::default();
        progress.xp = 75;
        backend.put_progress(&progress).await.unwrap();
        assert_eq!(backend.get_progress().await.unwrap(), Some(progress));

        for amount in [10, 20] {
            backend
                .append_xp(&XpTransaction {
                    id: format!("x{amount}"),
                    amount,
                    reason: "test".to_string(),
                    timestamp: Utc::now(),
                    task_id: None,
                })
                .await
                .unwrap();
        }
        let log = backend.get_xp_log().await.unwrap();
        assert_eq!(
            log.iter().map(|e| e.amount).collect::<Vec<_>>(),
            vec![10, 20]
        );
    }
}
