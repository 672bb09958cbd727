//! Weekly study schedule tracker: timetable import, task statuses, XP and
//! levels, a Pomodoro timer and a daily dashboard.
//!
//! Data lives either in local JSON files ([`backend::LocalBackend`]) or behind a
//! REST service ([`backend::RemoteBackend`]). The [`commands`] layer is what a
//! front end calls.

pub mod backend;
pub mod classifier;
#[cfg(feature = "app")]
pub mod cli;
pub mod commands;
pub mod config;
pub mod dashboard;
pub mod import;
pub mod logging;
pub mod models;
pub mod notify;
pub mod pomodoro;
pub mod progress;
pub mod schedule;
pub mod state;
pub mod storage;

pub use backend::{Backend, BackendError};
pub use commands::{CommandResult, Hub};
pub use models::{Task, TaskCategory, TaskStatus, UserProgress, Weekday};
