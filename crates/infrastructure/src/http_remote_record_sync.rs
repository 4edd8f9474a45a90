use std::time::Duration;

use async_trait::async_trait;
use roadwatch_application::{RemoteChange, RemoteChangeKind, RemoteRecordSync};
use roadwatch_core::{AppError, AppResult};
use roadwatch_domain::RecordId;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Deserialize)]
struct BackendErrorBody {
    error: String,
}

#[derive(Debug, Deserialize)]
struct CreatedRecordBody {
    id: u64,
}

/// Returns the id a backend reports for a created record, if the body has one.
fn backend_assigned_id(body: &str) -> Option<u64> {
    serde_json::from_str::<CreatedRecordBody>(body)
        .ok()
        .map(|created| created.id)
}

/// Mirrors record changes to a REST backend.
///
/// `POST {base}/{resource}`, `PATCH {base}/{resource}/{id}` and
/// `DELETE {base}/{resource}/{id}`. 5xx, 429 and transport failures are retried
/// with linear backoff; any other non-2xx status fails immediately.
pub struct HttpRemoteRecordSync {
    http_client: reqwest::Client,
    base_url: Url,
    max_attempts: u8,
    retry_backoff_ms: u64,
}

impl HttpRemoteRecordSync {
    /// Creates a new HTTP sync adapter.
    pub fn new(
        http_client: reqwest::Client,
        base_url: Url,
        max_attempts: u8,
        retry_backoff_ms: u64,
    ) -> AppResult<Self> {
        if base_url.cannot_be_a_base() {
            return Err(AppError::Validation(format!(
                "remote sync URL '{base_url}' cannot carry a resource path"
            )));
        }

        Ok(Self {
            http_client,
            base_url,
            max_attempts: max_attempts.max(1),
            retry_backoff_ms: retry_backoff_ms.max(50),
        })
    }

    fn endpoint(&self, resource: &str, id: Option<RecordId>) -> AppResult<Url> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| {
                AppError::Validation("remote sync URL cannot carry a resource path".to_owned())
            })?;
            segments.pop_if_empty().push(resource);
            if let Some(id) = id {
                segments.push(id.to_string().as_str());
            }
        }

        Ok(url)
    }

    async fn push_with_retry<F>(
        &self,
        operation: &str,
        mut build: F,
    ) -> AppResult<reqwest::Response>
    where
        F: FnMut(&reqwest::Client) -> reqwest::RequestBuilder,
    {
        let mut attempt = 0_u8;
        let mut last_error: Option<String> = None;

        while attempt < self.max_attempts {
            attempt = attempt.saturating_add(1);
            let response = build(&self.http_client).send().await;

            match response {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response)
                    if response.status().is_server_error()
                        || response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS =>
                {
                    let status = response.status();
                    last_error = Some(format!(
                        "{operation} got transient status {status}: {}",
                        error_message(response).await
                    ));
                }
                Ok(response) => {
                    let status = response.status();
                    return Err(AppError::RemoteSync(format!(
                        "{operation} rejected with status {status}: {}",
                        error_message(response).await
                    )));
                }
                Err(error) => {
                    last_error = Some(format!("{operation} transport error: {error}"));
                }
            }

            if attempt < self.max_attempts {
                warn!(
                    operation,
                    attempt,
                    max_attempts = self.max_attempts,
                    error = last_error.as_deref().unwrap_or_default(),
                    "retrying remote record sync"
                );
                let delay = self.retry_backoff_ms.saturating_mul(u64::from(attempt));
                tokio::time::sleep(Duration::from_millis(delay)).await;
            }
        }

        Err(AppError::RemoteSync(last_error.unwrap_or_else(|| {
            format!("{operation} exhausted retries")
        })))
    }
}

async fn error_message(response: reqwest::Response) -> String {
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "<response body unavailable>".to_owned());

    serde_json::from_str::<BackendErrorBody>(body.as_str())
        .map(|parsed| parsed.error)
        .unwrap_or(body)
}

#[async_trait]
impl RemoteRecordSync for HttpRemoteRecordSync {
    async fn push(&self, change: &RemoteChange) -> AppResult<()> {
        let resource = change.resource.as_str();
        match &change.kind {
            RemoteChangeKind::Create { record } => {
                let url = self.endpoint(resource, None)?;
                let operation = format!("create {resource}/{}", record.id());
                let response = self
                    .push_with_retry(operation.as_str(), |client| {
                        client.post(url.clone()).json(record.data())
                    })
                    .await?;

                let body = response.text().await.unwrap_or_default();
                match backend_assigned_id(body.as_str()) {
                    Some(remote_id) if remote_id != record.id().get() => warn!(
                        resource,
                        local_id = record.id().get(),
                        remote_id,
                        "backend assigned a different id to created record"
                    ),
                    Some(_) => {}
                    None => debug!(
                        resource,
                        local_id = record.id().get(),
                        "backend create response carried no record id"
                    ),
                }
                Ok(())
            }
            RemoteChangeKind::Update { id, patch } => {
                let url = self.endpoint(resource, Some(*id))?;
                let operation = format!("update {resource}/{id}");
                self.push_with_retry(operation.as_str(), |client| {
                    client.patch(url.clone()).json(patch)
                })
                .await
                .map(|_| ())
            }
            RemoteChangeKind::Delete { id } => {
                let url = self.endpoint(resource, Some(*id))?;
                let operation = format!("delete {resource}/{id}");
                self.push_with_retry(operation.as_str(), |client| client.delete(url.clone()))
                    .await
                    .map(|_| ())
            }
        }
    }
}
