use crate::dtos::{DiffRequest, DiffResponse};
use crate::services::prompt::{self, DEFAULT_PROMPT_TEMPLATE};
use crate::services::{BlobStore, CleanupGuard, StorageError, TextProvider};
use crate::startup::AppState;
use axum::{body::Bytes, extract::State, Json};
use metrics::counter;
use serde_json::Value;
use service_core::error::AppError;

/// `POST /diff`: compare two stored JSON objects and delete them afterwards.
pub async fn diff_files(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DiffResponse>, AppError> {
    let result = run_diff(&state, &body).await;

    let outcome = match &result {
        Ok(_) => "success",
        Err(e) => e.kind(),
    };
    counter!("diff_requests_total", "outcome" => outcome).increment(1);

    result.map(|diff| Json(DiffResponse { diff }))
}

async fn run_diff(state: &AppState, body: &[u8]) -> Result<Value, AppError> {
    let (file1, file2) = DiffRequest::from_body(body)?.file_names()?;

    let prompt_object = state.config.prompt.object.as_deref();
    if let Some(reserved) = prompt_object.filter(|p| *p == file1 || *p == file2) {
        return Err(AppError::Validation(format!(
            "'{}' is reserved for the prompt template",
            reserved
        )));
    }

    let model = state.clients.model()?;
    let storage = state.clients.storage()?;

    // Names the store can never address are rejected before anything is armed.
    for name in [&file1, &file2] {
        storage.check_name(name)?;
    }

    let mut guard = CleanupGuard::new(storage.clone(), [file1.clone(), file2.clone()]);

    let result = compare_files(
        storage.as_ref(),
        model.as_ref(),
        prompt_object,
        &file1,
        &file2,
    )
    .await;

    // Nothing is deleted when a referenced object was missing.
    if let Err(AppError::NotFound(message)) = &result {
        tracing::info!(%file1, %file2, reason = %message, "Skipping cleanup");
        guard.disarm();
    }

    let report = guard.release().await;
    tracing::debug!(
        deleted = report.deleted,
        already_absent = report.already_absent,
        failed = report.failed,
        "Cleanup finished"
    );

    result
}

async fn compare_files(
    storage: &dyn BlobStore,
    model: &dyn TextProvider,
    prompt_object: Option<&str>,
    file1: &str,
    file2: &str,
) -> Result<Value, AppError> {
    for name in [file1, file2] {
        if !storage.exists(name).await? {
            return Err(StorageError::NotFound(name.to_string()).into());
        }
    }

    let content1 = download(storage, file1).await?;
    let content2 = download(storage, file2).await?;

    let template = load_template(storage, prompt_object).await?;
    let prompt_text = prompt::render_prompt(&template, &content1, &content2);

    let response = model.generate(&prompt_text).await?;
    tracing::info!(
        model = model.model_name(),
        prompt_len = prompt_text.len(),
        input_tokens = response.input_tokens,
        output_tokens = response.output_tokens,
        finish_reason = ?response.finish_reason,
        "Model call completed"
    );

    let raw = response.into_text()?;
    tracing::debug!(output = %prompt::strip_code_fence(&raw), "Cleaned model output");

    prompt::parse_diff(&raw).map_err(|e| {
        AppError::Dependency(anyhow::anyhow!("Model output is not valid JSON: {}", e))
    })
}

async fn download(storage: &dyn BlobStore, name: &str) -> Result<String, AppError> {
    tracing::info!(object = %name, "Downloading file");
    let content = storage.read_text(name).await?;
    tracing::info!(object = %name, bytes = content.len(), "Downloaded file");
    Ok(content)
}

async fn load_template(
    storage: &dyn BlobStore,
    prompt_object: Option<&str>,
) -> Result<String, AppError> {
    let Some(name) = prompt_object else {
        return Ok(DEFAULT_PROMPT_TEMPLATE.to_string());
    };

    let template = storage.read_text(name).await.map_err(|e| {
        AppError::Configuration(anyhow::anyhow!("Prompt template '{}' unavailable: {}", name, e))
    })?;

    if !prompt::has_placeholders(&template) {
        return Err(AppError::Configuration(anyhow::anyhow!(
            "Prompt template '{}' must contain {} and {}",
            name,
            prompt::CONTENT1_PLACEHOLDER,
            prompt::CONTENT2_PLACEHOLDER
        )));
    }

    Ok(template)
}
