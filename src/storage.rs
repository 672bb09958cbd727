use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::models::{PomodoroFile, ProgressFile, TasksFile, XpLogFile};

pub const SCHEMA_VERSION: u32 = 1;

const TASKS_FILE: &str = "tasks.json";
const PROGRESS_FILE: &str = "progress.json";
const XP_LOG_FILE: &str = "xp_log.json";
const POMODORO_FILE: &str = "pomodoro.json";
const BACKUP_DIR: &str = "backups";
const BACKUP_LIMIT: usize = 5;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid backup name: {0}")]
    InvalidBackupName(String),
}

/// JSON files under one data directory. Missing files read as `None`.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

impl Storage {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_dirs(&self) -> Result<(), StorageError> {
        fs::create_dir_all(self.root.join(BACKUP_DIR))?;
        Ok(())
    }

    pub fn load_tasks(&self) -> Result<Option<TasksFile>, StorageError> {
        self.load_json(self.root.join(TASKS_FILE))
    }

    pub fn load_progress(&self) -> Result<Option<ProgressFile>, StorageError> {
        self.load_json(self.root.join(PROGRESS_FILE))
    }

    pub fn load_xp_log(&self) -> Result<Option<XpLogFile>, StorageError> {
        self.load_json(self.root.join(XP_LOG_FILE))
    }

    pub fn load_pomodoro(&self) -> Result<Option<PomodoroFile>, StorageError> {
        self.load_json(self.root.join(POMODORO_FILE))
    }

    pub fn save_tasks(&self, data: &TasksFile, with_backup: bool) -> Result<(), StorageError> {
        if with_backup {
            return self.write_with_backup(TASKS_FILE, data);
        }
        self.write_atomic(self.root.join(TASKS_FILE), data)
    }

    pub fn save_progress(&self, data: &ProgressFile) -> Result<(), StorageError> {
        self.write_atomic(self.root.join(PROGRESS_FILE), data)
    }

    pub fn save_xp_log(&self, data: &XpLogFile) -> Result<(), StorageError> {
        self.write_atomic(self.root.join(XP_LOG_FILE), data)
    }

    pub fn save_pomodoro(&self, data: &PomodoroFile) -> Result<(), StorageError> {
        self.write_atomic(self.root.join(POMODORO_FILE), data)
    }

    fn load_json<T: DeserializeOwned>(&self, path: PathBuf) -> Result<Option<T>, StorageError> {
        let mut file = match File::open(&path) {
            Ok(file) => file,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(None),
            Err(error) => return Err(error.into()),
        };
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        Ok(Some(serde_json::from_str(&buf)?))
    }

    fn write_with_backup<T: Serialize>(
        &self,
        filename: &str,
        data: &T,
    ) -> Result<(), StorageError> {
        let path = self.root.join(filename);
        if path.exists() {
            self.create_backup(&path)?;
        }
        self.write_atomic(path, data)
    }

    fn write_atomic<T: Serialize>(&self, path: PathBuf, data: &T) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;
        let temp_path = path.with_extension("tmp");
        let json = serde_json::to_vec_pretty(data)?;
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&json)?;
            file.sync_all()?;
        }
        fs::rename(temp_path, path)?;
        Ok(())
    }

    pub fn create_backup(&self, path: &Path) -> Result<(), StorageError> {
        self.ensure_dirs()?;
        let backup_name = backup_file_name(chrono::Local::now().naive_local());
        let backup_path = self.root.join(BACKUP_DIR).join(&backup_name);
        fs::copy(path, backup_path)?;
        log::info!("task backup written name={backup_name}");
        self.trim_backups()?;
        Ok(())
    }

    /// Backup file names with their modification time (unix seconds), oldest first.
    pub fn list_backups(&self) -> Result<Vec<(String, i64)>, StorageError> {
        let dir = self.root.join(BACKUP_DIR);
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut results: Vec<(String, i64)> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let name = entry.file_name().to_str()?.to_string();
                let modified = entry
                    .metadata()
                    .and_then(|m| m.modified())
                    .ok()
                    .and_then(|time| time.duration_since(std::time::UNIX_EPOCH).ok())
                    .and_then(|dur| i64::try_from(dur.as_secs()).ok())
                    .unwrap_or(0);
                Some((name, modified))
            })
            .collect();
        // Names embed the creation timestamp, so they order chronologically.
        results.sort();
        Ok(results)
    }

    pub fn restore_backup(&self, filename: &str) -> Result<TasksFile, StorageError> {
        if filename.contains(['/', '\\']) || filename.contains("..") {
            return Err(StorageError::InvalidBackupName(filename.to_string()));
        }
        let path = self.root.join(BACKUP_DIR).join(filename);
        let data: TasksFile = self.load_json(path)?.ok_or_else(|| {
            StorageError::Io(std::io::Error::new(
                ErrorKind::NotFound,
                format!("backup not found: {filename}"),
            ))
        })?;
        self.write_atomic(self.root.join(TASKS_FILE), &data)?;
        Ok(data)
    }

    fn trim_backups(&self) -> Result<(), StorageError> {
        let mut entries: Vec<_> = fs::read_dir(self.root.join(BACKUP_DIR))?
            .filter_map(|entry| entry.ok())
            .collect();
        entries.sort_by_key(|entry| entry.file_name());
        let to_remove = entries.len().saturating_sub(BACKUP_LIMIT);
        for entry in entries.into_iter().take(to_remove) {
            let _ = fs::remove_file(entry.path());
        }
        Ok(())
    }
}

/// `tasks-YYYYMMDD-HHMMSS.mmm.json`; names sort in creation order.
fn backup_file_name(at: chrono::NaiveDateTime) -> String {
    format!("tasks-{}.json", at.format("%Y%m%d-%H%M%S%.3f"))
}
