use serde::{Deserialize, Serialize};
use serde_json::Value;
use service_core::error::AppError;

pub const MISSING_FILES_MESSAGE: &str = "Missing 'file1' or 'file2' in request";
pub const INVALID_BODY_MESSAGE: &str =
    "Request body must be a JSON object with string fields 'file1' and 'file2'";

/// Names of two objects that already exist in the bucket.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiffRequest {
    #[serde(default)]
    pub file1: Option<String>,
    #[serde(default)]
    pub file2: Option<String>,
}

impl DiffRequest {
    pub fn from_body(body: &[u8]) -> Result<Self, AppError> {
        serde_json::from_slice(body)
            .map_err(|_| AppError::Validation(INVALID_BODY_MESSAGE.to_string()))
    }

    /// Both names, or a validation error when either is missing or blank.
    pub fn file_names(&self) -> Result<(String, String), AppError> {
        let present = |name: &Option<String>| {
            name.as_deref()
                .filter(|n| !n.is_empty())
                .map(str::to_string)
        };

        match (present(&self.file1), present(&self.file2)) {
            (Some(file1), Some(file2)) => Ok((file1, file2)),
            _ => Err(AppError::Validation(MISSING_FILES_MESSAGE.to_string())),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiffResponse {
    pub diff: Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_both_names() {
        let request = DiffRequest::from_body(br#"{"file1": "a.json", "file2": "b.json"}"#).unwrap();
        assert_eq!(
            request.file_names().unwrap(),
            ("a.json".to_string(), "b.json".to_string())
        );
    }

    #[test]
    fn missing_or_empty_names_are_rejected() {
        for body in [
            r#"{"file1": "a.json"}"#,
            r#"{"file2": "b.json"}"#,
            r#"{"file1": "", "file2": "b.json"}"#,
            r#"{"file1": null, "file2": "b.json"}"#,
            r#"{}"#,
        ] {
            let request = DiffRequest::from_body(body.as_bytes()).unwrap();
            let err = request.file_names().unwrap_err();
            assert!(
                matches!(err, AppError::Validation(ref m) if m == MISSING_FILES_MESSAGE),
                "{body}"
            );
        }
    }

    #[test]
    fn non_object_bodies_are_rejected() {
        for body in ["", "not json", "[1, 2]", r#"{"file1": 7, "file2": "b"}"#] {
            let err = DiffRequest::from_body(body.as_bytes()).unwrap_err();
            assert!(matches!(err, AppError::Validation(_)), "{body}");
        }
    }
}
