//! Google Play Store integration
//!
//! Publishes APKs and their expansion files via the Google Play Developer API.
//! Every release happens inside an edit: nothing is visible on the Play
//! Console until the edit is committed, and a failed release deletes its edit.
//!
//! ## Authentication
//!
//! Uses a Google Cloud service account with Google Play Developer API access.
//!
//! ## Usage
//!
//! ```ignore
//! use liftoff_stores::google_play::GooglePlayStore;
//!
//! let store = GooglePlayStore::new(config)?;
//! store.upload_release(&upload).await?;
//! ```

mod aapt;
mod edit;
mod manifest;

pub use aapt::{parse_badging, Aapt2Inspector};
pub use manifest::{parse_binary_manifest, ManifestError, ManifestInspector};

#[cfg(test)]
pub(crate) use manifest::tests::write_apk;

use std::path::Path;
use std::sync::Arc;

use chrono::{Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::{Result, StoreError};
use crate::traits::ReleaseUploader;
use crate::types::*;

use edit::EditApi;

const API_BASE_URL: &str = "https://androidpublisher.googleapis.com/androidpublisher/v3";
const UPLOAD_BASE_URL: &str = "https://androidpublisher.googleapis.com/upload/androidpublisher/v3";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Google service account credentials
#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
}

/// OAuth token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// Token cache for thread-safe access
#[derive(Debug, Default)]
struct TokenCache {
    access_token: Option<String>,
    expires_at: Option<chrono::DateTime<Utc>>,
}

/// Google Play Developer API client
pub struct GooglePlayStore {
    /// HTTP client
    client: Client,

    /// Token cache with interior mutability
    token_cache: Arc<RwLock<TokenCache>>,

    /// Service account credentials
    service_account: ServiceAccountKey,
}

impl GooglePlayStore {
    /// Create a new Google Play Store client
    pub fn new(config: GooglePlayConfig) -> Result<Self> {
        let key_content = std::fs::read_to_string(&config.service_account_key).map_err(|e| {
            StoreError::ConfigurationError(format!(
                "Failed to read service account key '{}': {}",
                config.service_account_key.display(),
                e
            ))
        })?;

        let service_account: ServiceAccountKey = serde_json::from_str(&key_content)
            .map_err(|e| StoreError::InvalidCredentials(format!("Invalid service account key: {}", e)))?;

        Ok(Self {
            client: Client::new(),
            token_cache: Arc::new(RwLock::new(TokenCache::default())),
            service_account,
        })
    }

    /// Get or refresh OAuth2 access token
    async fn get_access_token(&self) -> Result<String> {
        {
            let cache = self.token_cache.read().await;
            if let (Some(token), Some(expires)) = (&cache.access_token, cache.expires_at) {
                if Utc::now() < expires - Duration::minutes(5) {
                    return Ok(token.clone());
                }
            }
        }

        let now = Utc::now();
        let exp = now + Duration::hours(1);

        #[derive(Serialize)]
        struct Claims {
            iss: String,
            scope: String,
            aud: String,
            iat: i64,
            exp: i64,
        }

        let claims = Claims {
            iss: self.service_account.client_email.clone(),
            scope: "https://www.googleapis.com/auth/androidpublisher".to_string(),
            aud: TOKEN_URL.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        let encoding_key = jsonwebtoken::EncodingKey::from_rsa_pem(self.service_account.private_key.as_bytes())
            .map_err(|e| StoreError::InvalidCredentials(format!("Invalid private key: {}", e)))?;

        let jwt = jsonwebtoken::encode(
            &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256),
            &claims,
            &encoding_key,
        )?;

        let response = self
            .client
            .post(TOKEN_URL)
            .form(&[
                ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer"),
                ("assertion", &jwt),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(StoreError::AuthenticationFailed(error_text));
        }

        let token_response: TokenResponse = response.json().await?;

        {
            let mut cache = self.token_cache.write().await;
            cache.access_token = Some(token_response.access_token.clone());
            cache.expires_at = Some(Utc::now() + Duration::seconds(token_response.expires_in));
        }

        Ok(token_response.access_token)
    }

    /// Make an authenticated API request, returning `None` on 404
    async fn api_request<T: serde::de::DeserializeOwned>(
        &self,
        method: reqwest::Method,
        endpoint: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Option<T>> {
        let token = self.get_access_token().await?;
        let url = format!("{}{}", API_BASE_URL, endpoint);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .bearer_auth(token)
            .header("Content-Type", "application/json");

        if let Some(body) = body {
            request = request.json(&body);
        }

        debug!("Making {} request to {}", method, url);

        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(StoreError::ApiError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let text = response.text().await?;
        if text.trim().is_empty() {
            return Ok(Some(serde_json::from_str("null")?));
        }
        Ok(Some(serde_json::from_str(&text)?))
    }

    /// Request that must find its resource
    async fn api_call<T: serde::de::DeserializeOwned>(
        &self,
        method: reqwest::Method,
        endpoint: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        self.api_request(method, endpoint, body).await?.ok_or_else(|| StoreError::ApiError {
            status: StatusCode::NOT_FOUND.as_u16(),
            message: format!("{} not found", endpoint),
        })
    }

    /// Upload a file as the request body
    async fn upload_media<T: serde::de::DeserializeOwned>(&self, url: &str, path: &Path) -> Result<T> {
        let token = self.get_access_token().await?;
        let file_content = tokio::fs::read(path).await?;

        let response = self
            .client
            .post(url)
            .query(&[("uploadType", "media")])
            .bearer_auth(token)
            .header("Content-Type", "application/octet-stream")
            .body(file_content)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(StoreError::UploadFailed(format!("{}: {}", path.display(), error_text)));
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl EditApi for GooglePlayStore {
    async fn create_edit(&self, package: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct EditResponse {
            id: String,
        }

        let endpoint = format!("/applications/{}/edits", package);
        let response: EditResponse = self
            .api_call(reqwest::Method::POST, &endpoint, Some(serde_json::json!({})))
            .await?;

        Ok(response.id)
    }

    async fn commit_edit(&self, package: &str, edit_id: &str) -> Result<()> {
        let endpoint = format!("/applications/{}/edits/{}:commit", package, edit_id);
        let _: serde_json::Value = self.api_call(reqwest::Method::POST, &endpoint, None).await?;
        Ok(())
    }

    async fn delete_edit(&self, package: &str, edit_id: &str) -> Result<()> {
        let endpoint = format!("/applications/{}/edits/{}", package, edit_id);
        let _: Option<serde_json::Value> = self.api_request(reqwest::Method::DELETE, &endpoint, None).await?;
        Ok(())
    }

    async fn existing_version_codes(&self, package: &str, edit_id: &str) -> Result<Vec<u32>> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ApkEntry {
            version_code: u32,
        }

        #[derive(Deserialize, Default)]
        struct ApksListResponse {
            #[serde(default)]
            apks: Vec<ApkEntry>,
        }

        let endpoint = format!("/applications/{}/edits/{}/apks", package, edit_id);
        let response: Option<ApksListResponse> = self.api_request(reqwest::Method::GET, &endpoint, None).await?;

        let mut codes: Vec<u32> = response
            .unwrap_or_default()
            .apks
            .into_iter()
            .map(|a| a.version_code)
            .collect();
        codes.sort_unstable_by(|a, b| b.cmp(a));
        Ok(codes)
    }

    async fn has_expansion_file(&self, package: &str, edit_id: &str, version_code: u32, slot: ExpansionSlot) -> Result<bool> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct ExpansionFile {
            file_size: Option<String>,
        }

        let endpoint = expansion_file_endpoint(package, edit_id, version_code, slot);
        let file: Option<ExpansionFile> = self.api_request(reqwest::Method::GET, &endpoint, None).await?;

        Ok(file
            .and_then(|f| f.file_size)
            .and_then(|s| s.parse::<u64>().ok())
            .is_some_and(|size| size > 0))
    }

    async fn upload_apk(&self, package: &str, edit_id: &str, path: &Path) -> Result<u32> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct UploadResponse {
            version_code: u32,
        }

        let url = format!("{}/applications/{}/edits/{}/apks", UPLOAD_BASE_URL, package, edit_id);
        let response: UploadResponse = self.upload_media(&url, path).await?;
        Ok(response.version_code)
    }

    async fn upload_expansion_file(
        &self,
        package: &str,
        edit_id: &str,
        version_code: u32,
        slot: ExpansionSlot,
        path: &Path,
    ) -> Result<()> {
        let url = format!(
            "{}{}",
            UPLOAD_BASE_URL,
            expansion_file_endpoint(package, edit_id, version_code, slot)
        );
        let _: serde_json::Value = self.upload_media(&url, path).await?;
        Ok(())
    }

    async fn reference_expansion_file(
        &self,
        package: &str,
        edit_id: &str,
        version_code: u32,
        slot: ExpansionSlot,
        previous: u32,
    ) -> Result<()> {
        let endpoint = expansion_file_endpoint(package, edit_id, version_code, slot);
        let _: serde_json::Value = self
            .api_call(
                reqwest::Method::PUT,
                &endpoint,
                Some(serde_json::json!({ "referencesVersion": previous })),
            )
            .await?;
        Ok(())
    }

    async fn assign_to_track(&self, package: &str, edit_id: &str, upload: &ReleaseUpload, version_codes: &[u32]) -> Result<()> {
        let endpoint = format!(
            "/applications/{}/edits/{}/tracks/{}",
            package,
            edit_id,
            upload.track.api_value()
        );

        let body = track_update_body(upload, version_codes);
        let _: serde_json::Value = self.api_call(reqwest::Method::PUT, &endpoint, Some(body)).await?;
        Ok(())
    }
}

fn expansion_file_endpoint(package: &str, edit_id: &str, version_code: u32, slot: ExpansionSlot) -> String {
    format!(
        "/applications/{}/edits/{}/apks/{}/expansionFiles/{}",
        package,
        edit_id,
        version_code,
        slot.api_value()
    )
}

/// Track resource for `edits.tracks.update`
fn track_update_body(upload: &ReleaseUpload, version_codes: &[u32]) -> serde_json::Value {
    let fraction = upload.user_fraction();

    let mut release = serde_json::json!({
        "versionCodes": version_codes.iter().map(|v| v.to_string()).collect::<Vec<_>>(),
        "status": if fraction.is_some() { "inProgress" } else { "completed" },
    });

    if let Some(fraction) = fraction {
        release["userFraction"] = serde_json::json!(fraction);
    }

    if !upload.release_notes.is_empty() {
        release["releaseNotes"] = serde_json::json!(upload
            .release_notes
            .iter()
            .map(|n| serde_json::json!({ "language": n.language, "text": n.text }))
            .collect::<Vec<_>>());
    }

    serde_json::json!({
        "track": upload.track.api_value(),
        "releases": [release]
    })
}


#[async_trait::async_trait]
impl ReleaseUploader for GooglePlayStore {
    fn name(&self) -> &str {
        "Google Play"
    }

    async fn upload_release(&self, upload: &ReleaseUpload) -> Result<UploadResult> {
        let version_codes = edit::publish_release(self, upload).await?;

        Ok(UploadResult {
            application_id: upload.application_id.clone(),
            version_codes,
            console_url: Some(format!(
                "https://play.google.com/console/developers/app/{}/tracks",
                upload.application_id
            )),
            dry_run: false,
            uploaded_at: Utc::now(),
        })
    }
}
