//! Cloud Storage blob store over the JSON API.

use super::auth::AccessTokenSource;
use super::storage::{BlobStore, DeleteOutcome, StorageError};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::sync::Arc;

/// Cloud Storage API base URL.
const GCS_API_BASE: &str = "https://storage.googleapis.com";

pub struct GcsBlobStore {
    client: Client,
    base_url: String,
    bucket: String,
    tokens: Arc<AccessTokenSource>,
}

impl GcsBlobStore {
    pub fn new(
        client: Client,
        bucket: impl Into<String>,
        tokens: Arc<AccessTokenSource>,
    ) -> Result<Self, StorageError> {
        let bucket = bucket.into();
        if bucket.trim().is_empty() {
            return Err(StorageError::NotConfigured(
                "bucket name is empty".to_string(),
            ));
        }

        Ok(Self {
            client,
            base_url: GCS_API_BASE.to_string(),
            bucket,
            tokens,
        })
    }

    /// Point the client at another endpoint (emulators, tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    fn object_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            urlencoding::encode(name)
        )
    }

    fn upload_url(&self, name: &str) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.base_url,
            urlencoding::encode(&self.bucket),
            urlencoding::encode(name)
        )
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StorageError> {
        let headers = self
            .tokens
            .headers()
            .await
            .map_err(|e| StorageError::Auth(e.to_string()))?;

        request
            .headers(headers)
            .send()
            .await
            .map_err(|e| StorageError::Network(e.to_string()))
    }
}

/// Turn a non-success response into a storage error.
async fn api_error(response: Response) -> StorageError {
    let status = response.status();
    let message = response.text().await.unwrap_or_default();

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            StorageError::Auth(format!("{}: {}", status, message))
        }
        _ => StorageError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

#[async_trait]
impl BlobStore for GcsBlobStore {
    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        let response = self
            .send(self.client.get(self.object_url(name)).query(&[("fields", "name")]))
            .await?;

        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(api_error(response).await),
        }
    }

    async fn read_text(&self, name: &str) -> Result<String, StorageError> {
        let response = self
            .send(self.client.get(self.object_url(name)).query(&[("alt", "media")]))
            .await?;

        match response.status() {
            status if status.is_success() => response
                .text()
                .await
                .map_err(|e| StorageError::Network(e.to_string())),
            StatusCode::NOT_FOUND => Err(StorageError::NotFound(name.to_string())),
            _ => Err(api_error(response).await),
        }
    }

    async fn delete(&self, name: &str) -> Result<DeleteOutcome, StorageError> {
        let response = self.send(self.client.delete(self.object_url(name))).await?;

        match response.status() {
            status if status.is_success() => Ok(DeleteOutcome::Deleted),
            StatusCode::NOT_FOUND => Ok(DeleteOutcome::AlreadyAbsent),
            _ => Err(api_error(response).await),
        }
    }

    async fn write_text(&self, name: &str, content: &str) -> Result<(), StorageError> {
        let request = self
            .client
            .post(self.upload_url(name))
            .header(reqwest::header::CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(content.to_string());
        let response = self.send(request).await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(api_error(response).await)
        }
    }
}
