use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Serialize;

use super::{sort_by_start_time, Backend, BackendError};
use crate::models::{NewTask, Task, TaskStatus, UserProgress, XpTransaction};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// JSON API backend. Requests are sent once; failures are returned as-is.
pub struct RemoteBackend {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
struct StatusPatch {
    status: TaskStatus,
}

impl RemoteBackend {
    pub fn new(base_url: impl Into<String>) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn task_url(&self, id: &str) -> String {
        self.url(&format!("/api/tasks/{id}"))
    }
}

async fn check(response: Response, subject: &str) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::NOT_FOUND {
        return Err(BackendError::NotFound(subject.to_string()));
    }
    let body = response.text().await.unwrap_or_default();
    log::warn!("backend request failed subject={subject} status={status}");
    Err(BackendError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl Backend for RemoteBackend {
    async fn list_tasks(&self) -> Result<Vec<Task>, BackendError> {
        let response = self
            .client
            .get(self.url("/api/tasks"))
            .query(&[("order", "start_time.asc")])
            .send()
            .await?;
        let mut tasks: Vec<Task> = check(response, "tasks").await?.json().await?;
        sort_by_start_time(&mut tasks);
        Ok(tasks)
    }

    async fn insert_task(&self, task: NewTask) -> Result<Task, BackendError> {
        let response = self
            .client
            .post(self.url("/api/tasks"))
            .json(&task)
            .send()
            .await?;
        Ok(check(response, "tasks").await?.json().await?)
    }

    async fn insert_tasks(&self, tasks: Vec<NewTask>) -> Result<Vec<Task>, BackendError> {
        let response = self
            .client
            .post(self.url("/api/tasks/bulk"))
            .json(&tasks)
            .send()
            .await?;
        Ok(check(response, "tasks").await?.json().await?)
    }

    async fn update_task(&self, task: &Task) -> Result<(), BackendError> {
        let response = self
            .client
            .put(self.task_url(&task.id))
            .json(task)
            .send()
            .await?;
        check(response, &format!("task {}", task.id)).await?;
        Ok(())
    }

    async fn update_task_status(&self, id: &str, status: TaskStatus) -> Result<(), BackendError> {
        let response = self
            .client
            .patch(self.task_url(id))
            .json(&StatusPatch { status })
            .send()
            .await?;
        check(response, &format!("task {id}")).await?;
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> Result<(), BackendError> {
        let response = self.client.delete(self.task_url(id)).send().await?;
        check(response, &format!("task {id}")).await?;
        Ok(())
    }

    async fn get_progress(&self) -> Result<Option<UserProgress>, BackendError> {
        let response = self.client.get(self.url("/api/progress")).send().await?;
        match check(response, "progress").await {
            Ok(response) => Ok(response.json().await?),
            Err(BackendError::NotFound(_)) => Ok(None),
            Err(error) => Err(error),
        }
    }

    async fn put_progress(&self, progress: &UserProgress) -> Result<(), BackendError> {
        let response = self
            .client
            .put(self.url("/api/progress"))
            .json(progress)
            .send()
            .await?;
        check(response, "progress").await?;
        Ok(())
    }

    async fn get_xp_log(&self) -> Result<Vec<XpTransaction>, BackendError> {
        let response = self.client.get(self.url("/api/xp-log")).send().await?;
        Ok(check(response, "xp log").await?.json().await?)
    }

    async fn append_xp(&self, entry: &XpTransaction) -> Result<(), BackendError> {
        let response = self
            .client
            .post(self.url("/api/xp-log"))
            .json(entry)
            .send()
            .await?;
        check(response, "xp log").await?;
        Ok(())
    }
}
