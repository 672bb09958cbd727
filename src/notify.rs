use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tokio::task::JoinSet;

const NOTIFY_TIMEOUT: Duration = Duration::from_secs(5);

/// Best-effort notification hooks. Without a base URL every call is a no-op,
/// and failures are only logged.
///
/// The `spawn_*` methods run the request in the background; [`Notifier::flush`]
/// waits for whatever is still in flight.
#[derive(Clone, Default)]
pub struct Notifier {
    client: Option<Client>,
    base_url: Option<String>,
    pending: Arc<Mutex<JoinSet<()>>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MissedTaskPayload<'a> {
    task_id: &'a str,
    task_title: &'a str,
    timestamp: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DailySummaryPayload {
    completed: u32,
    missed: u32,
    xp_earned: u32,
    date: String,
}

impl Notifier {
    /// A client that cannot be built leaves the notifier disabled.
    pub fn new(base_url: Option<String>) -> Self {
        let base_url = base_url
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());
        let Some(base_url) = base_url else {
            return Self::disabled();
        };
        match Client::builder().timeout(NOTIFY_TIMEOUT).build() {
            Ok(client) => Self {
                client: Some(client),
                base_url: Some(base_url),
                pending: Arc::default(),
            },
            Err(error) => {
                log::warn!("notification client unavailable, hooks disabled: {error}");
                Self::disabled()
            }
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some() && self.base_url.is_some()
    }

    pub async fn notify_missed_task(&self, task_id: &str, task_title: &str) {
        let payload = MissedTaskPayload {
            task_id,
            task_title,
            timestamp: Utc::now().to_rfc3339(),
        };
        self.post("/api/notifications/missed", &payload).await;
    }

    pub async fn notify_daily_summary(&self, completed: u32, missed: u32, xp_earned: u32) {
        let payload = DailySummaryPayload {
            completed,
            missed,
            xp_earned,
            date: Utc::now().to_rfc3339(),
        };
        self.post("/api/notifications/summary", &payload).await;
    }

    /// Sends the missed-task hook without waiting for it. Needs a tokio runtime.
    pub fn spawn_missed_task(&self, task_id: String, task_title: String) {
        let notifier = self.clone();
        self.track(async move { notifier.notify_missed_task(&task_id, &task_title).await });
    }

    /// Sends the daily-summary hook without waiting for it. Needs a tokio runtime.
    pub fn spawn_daily_summary(&self, completed: u32, missed: u32, xp_earned: u32) {
        let notifier = self.clone();
        self.track(async move {
            notifier
                .notify_daily_summary(completed, missed, xp_earned)
                .await
        });
    }

    /// Waits for background hooks. Each request is bounded by the client timeout.
    pub async fn flush(&self) {
        let mut pending = std::mem::take(&mut *self.lock_pending());
        while pending.join_next().await.is_some() {}
    }

    fn track(&self, hook: impl Future<Output = ()> + Send + 'static) {
        if !self.is_enabled() {
            return;
        }
        let mut pending = self.lock_pending();
        while pending.try_join_next().is_some() {}
        pending.spawn(hook);
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, JoinSet<()>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn post<T: Serialize + ?Sized>(&self, path: &str, payload: &T) {
        let (Some(client), Some(base)) = (&self.client, &self.base_url) else {
            return;
        };
        let url = format!("{base}{path}");
        match client.post(&url).json(payload).send().await {
            Ok(response) if response.status().is_success() => {
                log::debug!("notification delivered path={path}");
            }
            Ok(response) => {
                log::warn!(
                    "notification rejected path={path} status={}",
                    response.status()
                );
            }
            Err(error) => {
                log::warn!("notification failed path={path} error={error}");
            }
        }
    }
}
