//! Authorization headers for Google APIs.
//!
//! Credentials come from Application Default Credentials: a key file named by
//! `GOOGLE_APPLICATION_CREDENTIALS`, the gcloud user login, or the metadata
//! server on Cloud Run. A token passed explicitly replaces the lookup.

use google_cloud_auth::credentials::{self, CacheableResource, Credentials};
use http::Extensions;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use secrecy::{ExposeSecret, Secret};
use thiserror::Error;

pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to load Google credentials: {0}")]
    Credentials(String),

    #[error("Invalid access token: {0}")]
    InvalidToken(String),
}

pub enum AccessTokenSource {
    Static(Secret<String>),
    Google(Credentials),
}

impl AccessTokenSource {
    pub fn application_default() -> Result<Self, TokenError> {
        let credentials = credentials::Builder::default()
            .with_scopes([CLOUD_PLATFORM_SCOPE])
            .build()
            .map_err(|e| TokenError::Credentials(e.to_string()))?;
        Ok(AccessTokenSource::Google(credentials))
    }

    pub fn describe(&self) -> &'static str {
        match self {
            AccessTokenSource::Static(_) => "static access token",
            AccessTokenSource::Google(_) => "application default credentials",
        }
    }

    /// Headers to attach to every Google API request.
    pub async fn headers(&self) -> Result<HeaderMap, TokenError> {
        match self {
            AccessTokenSource::Static(token) => {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                    .map_err(|e| TokenError::InvalidToken(e.to_string()))?;
                value.set_sensitive(true);

                let mut headers = HeaderMap::new();
                headers.insert(AUTHORIZATION, value);
                Ok(headers)
            }
            AccessTokenSource::Google(credentials) => {
                let resource = credentials
                    .headers(Extensions::new())
                    .await
                    .map_err(|e| TokenError::Credentials(e.to_string()))?;

                match resource {
                    CacheableResource::New { data, .. } => Ok(data),
                    // Only returned when the caller sent an entity tag.
                    CacheableResource::NotModified => Err(TokenError::Credentials(
                        "credentials returned no headers".to_string(),
                    )),
                }
            }
        }
    }
}
