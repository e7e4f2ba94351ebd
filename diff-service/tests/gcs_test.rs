use diff_service::services::{
    AccessTokenSource, BlobStore, DeleteOutcome, GcsBlobStore, StorageError,
};
use secrecy::Secret;
use std::sync::Arc;
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const OBJECT_PATH: &str = "/storage/v1/b/test-bucket/o/a.json";

async fn store(server: &MockServer) -> GcsBlobStore {
    let tokens = Arc::new(AccessTokenSource::Static(Secret::new("test-token".to_string())));
    GcsBlobStore::new(reqwest::Client::new(), "test-bucket", tokens)
        .unwrap()
        .with_base_url(server.uri())
}

#[tokio::test]
async fn read_text_downloads_media_with_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OBJECT_PATH))
        .and(query_param("alt", "media"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"a": 1}"#))
        .expect(1)
        .mount(&server)
        .await;

    let content = store(&server).await.read_text("a.json").await.unwrap();
    assert_eq!(content, r#"{"a": 1}"#);
}

#[tokio::test]
async fn missing_object_is_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let store = store(&server).await;
    assert!(!store.exists("a.json").await.unwrap());
    let err = store.read_text("a.json").await.unwrap_err();
    assert_eq!(err.to_string(), "File not found in bucket: a.json");
}

#[tokio::test]
async fn exists_requests_metadata_only() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OBJECT_PATH))
        .and(query_param("fields", "name"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"name": "a.json"}"#))
        .expect(1)
        .mount(&server)
        .await;

    assert!(store(&server).await.exists("a.json").await.unwrap());
}

#[tokio::test]
async fn delete_of_absent_object_is_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = store(&server).await.delete("a.json").await.unwrap();
    assert_eq!(outcome, DeleteOutcome::AlreadyAbsent);
}

#[tokio::test]
async fn delete_returns_deleted_on_no_content() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let outcome = store(&server).await.delete("a.json").await.unwrap();
    assert_eq!(outcome, DeleteOutcome::Deleted);
}

#[tokio::test]
async fn forbidden_is_an_auth_error() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(403).set_body_string("denied"))
        .mount(&server)
        .await;

    let err = store(&server).await.delete("a.json").await.unwrap_err();
    assert!(matches!(err, StorageError::Auth(_)));
}

#[tokio::test]
async fn write_text_uses_media_upload() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/storage/v1/b/test-bucket/o"))
        .and(query_param("uploadType", "media"))
        .and(query_param("name", "test_file.txt"))
        .and(body_string("hello"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"name": "test_file.txt"}"#))
        .expect(1)
        .mount(&server)
        .await;

    store(&server)
        .await
        .write_text("test_file.txt", "hello")
        .await
        .unwrap();
}

#[tokio::test]
async fn server_errors_carry_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(OBJECT_PATH))
        .respond_with(ResponseTemplate::new(500).set_body_string("backend error"))
        .mount(&server)
        .await;

    let err = store(&server).await.read_text("a.json").await.unwrap_err();
    assert!(matches!(err, StorageError::Api { status: 500, .. }));
}
