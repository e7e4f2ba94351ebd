#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use diff_service::config::DiffConfig;
use diff_service::services::providers::mock::MockTextProvider;
use diff_service::services::{BlobStore, DeleteOutcome, StorageError, TextProvider};
use diff_service::startup::{build_router, AppState, Application, Clients};
use http_body_util::BodyExt;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tower::util::ServiceExt;

/// In-memory blob store that records every call it receives.
#[derive(Default)]
pub struct RecordingBlobStore {
    objects: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<String>>,
    deletes: Mutex<HashMap<String, usize>>,
    failing_deletes: Mutex<HashSet<String>>,
}

impl RecordingBlobStore {
    pub fn with_objects(objects: &[(&str, &str)]) -> Arc<Self> {
        let store = Self::default();
        {
            let mut map = store.objects.lock().unwrap();
            for (name, content) in objects {
                map.insert(name.to_string(), content.to_string());
            }
        }
        Arc::new(store)
    }

    pub fn fail_delete_of(&self, name: &str) {
        self.failing_deletes.lock().unwrap().insert(name.to_string());
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn delete_count(&self, name: &str) -> usize {
        self.deletes.lock().unwrap().get(name).copied().unwrap_or(0)
    }

    pub fn call_count(&self, call: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    pub fn total_deletes(&self) -> usize {
        self.deletes.lock().unwrap().values().sum()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.objects.lock().unwrap().contains_key(name)
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl BlobStore for RecordingBlobStore {
    async fn exists(&self, name: &str) -> Result<bool, StorageError> {
        self.record(format!("exists:{}", name));
        Ok(self.contains(name))
    }

    async fn read_text(&self, name: &str) -> Result<String, StorageError> {
        self.record(format!("read:{}", name));
        self.objects
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(name.to_string()))
    }

    async fn delete(&self, name: &str) -> Result<DeleteOutcome, StorageError> {
        self.record(format!("delete:{}", name));
        *self
            .deletes
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_insert(0) += 1;

        if self.failing_deletes.lock().unwrap().contains(name) {
            return Err(StorageError::Api {
                status: 503,
                message: "backend unavailable".to_string(),
            });
        }

        match self.objects.lock().unwrap().remove(name) {
            Some(_) => Ok(DeleteOutcome::Deleted),
            None => Ok(DeleteOutcome::AlreadyAbsent),
        }
    }

    async fn write_text(&self, name: &str, content: &str) -> Result<(), StorageError> {
        self.record(format!("write:{}", name));
        self.objects
            .lock()
            .unwrap()
            .insert(name.to_string(), content.to_string());
        Ok(())
    }
}

pub fn test_config() -> DiffConfig {
    let mut config = DiffConfig::default();
    config.common.host = "127.0.0.1".to_string();
    config.common.port = 0;
    config
}

pub fn router_with(
    config: DiffConfig,
    store: Option<Arc<RecordingBlobStore>>,
    model: Option<Arc<MockTextProvider>>,
) -> Router {
    let storage = store.map(|s| s as Arc<dyn BlobStore>);
    let model = model.map(|m| m as Arc<dyn TextProvider>);
    build_router(AppState::new(config, Clients::new(storage, model)))
}

pub fn router_with_store(
    config: DiffConfig,
    store: Arc<dyn BlobStore>,
    model: Arc<MockTextProvider>,
) -> Router {
    build_router(AppState::new(
        config,
        Clients::new(Some(store), Some(model as Arc<dyn TextProvider>)),
    ))
}

pub fn router(store: Arc<RecordingBlobStore>, model: Arc<MockTextProvider>) -> Router {
    router_with(test_config(), Some(store), Some(model))
}

pub async fn post_diff(app: Router, body: &str) -> (StatusCode, serde_json::Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/diff")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    read_json(response).await
}

pub async fn get(app: Router, uri: &str) -> axum::response::Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

pub async fn read_json(response: axum::response::Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// A running server bound to a random local port.
pub struct TestApp {
    pub address: String,
    pub port: u16,
}

impl TestApp {
    pub async fn spawn(state: AppState) -> Self {
        let app = Application::build_with_state(state)
            .await
            .expect("Failed to build test application");

        let port = app.port();
        let address = format!("http://127.0.0.1:{}", port);

        tokio::spawn(async move {
            app.run_until_stopped().await.ok();
        });

        // Wait for the server to accept connections
        let client = reqwest::Client::new();
        let health_url = format!("{}/health", address);
        for _ in 0..50 {
            if client.get(&health_url).send().await.is_ok() {
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        }

        TestApp { address, port }
    }
}
