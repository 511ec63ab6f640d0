//! Cloud-drive client: token lifecycle and the wire-level upload
//! endpoint.

use std::path::Path;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde_json::json;
use tokio::sync::RwLock;

use crate::drive::token::TokenState;
use crate::drive::transaction::{self, UploadEndpoint, UploadOutcome};
use crate::drive::types::{
    CheckNameMode, CompleteRequest, CreateWithFoldersRequest, CreateWithFoldersResponse, FileMeta,
    NodeKind, PartNumber, TokenRefreshResponse,
};
use crate::drive::upload::{file_sha1, proof_code, split_parts};
use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use crate::transport::Transport;

/// Default drive API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.aliyundrive.com";

/// Drive client. Owns its transport (session, cookies, auth header) and
/// the token state gating every authenticated call.
pub struct DriveClient {
    transport: Transport,
    retry: RetryPolicy,
    api_base: String,
    token: RwLock<Option<TokenState>>,
}

impl DriveClient {
    pub fn new(transport: Transport, retry: RetryPolicy) -> Self {
        Self::with_api_base(transport, retry, DEFAULT_API_BASE)
    }

    pub fn with_api_base(transport: Transport, retry: RetryPolicy, api_base: &str) -> Self {
        Self {
            transport,
            retry,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: RwLock::new(None),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Login from a refresh token.
    pub async fn login(&self, refresh_token: &str) -> bool {
        if refresh_token.is_empty() {
            tracing::error!("drive login: no refresh token supplied");
            return false;
        }
        self.refresh_with(refresh_token).await
    }

    /// Username/password login is not implemented; callers must supply a
    /// refresh token.
    pub fn login_with_password(&self, _username: &str, _password: &str) -> Result<()> {
        Err(Error::NotSupported(
            "drive password login; use a refresh token".into(),
        ))
    }

    /// Current refresh token, for callers that persist it across runs.
    pub async fn refresh_token(&self) -> Option<String> {
        self.token.read().await.as_ref().map(|t| t.refresh_token.clone())
    }

    pub async fn drive_id(&self) -> Option<String> {
        self.token.read().await.as_ref().map(|t| t.drive_id.clone())
    }

    pub async fn user_id(&self) -> Option<String> {
        self.token.read().await.as_ref().map(|t| t.user_id.clone())
    }

    /// Refresh the token pair when inside the refresh margin.
    ///
    /// Returns false when no token is installed or the refresh call
    /// fails; callers must abort the in-flight operation rather than
    /// proceed with a stale token.
    pub async fn ensure_fresh(&self) -> bool {
        let stale_refresh_token = {
            let guard = self.token.read().await;
            match guard.as_ref() {
                None => {
                    tracing::error!("drive: not logged in");
                    return false;
                }
                Some(t) if !t.needs_refresh(Utc::now()) => return true,
                Some(t) => t.refresh_token.clone(),
            }
        };
        self.refresh_with(&stale_refresh_token).await
    }

    async fn refresh_with(&self, refresh_token: &str) -> bool {
        let url = self.url("/token/refresh");
        let refreshed: Option<TokenRefreshResponse> = self
            .retry
            .run("drive token refresh", || async {
                let res = self
                    .transport
                    .post_json(&url, &json!({ "refresh_token": refresh_token }))
                    .await;
                if !res.ok() {
                    return None;
                }
                res.json()
            })
            .await;

        match refreshed {
            Some(t) => {
                self.install_token(t).await;
                true
            }
            None => {
                tracing::error!("drive: token refresh failed");
                false
            }
        }
    }

    /// Replace all token fields and the Authorization header together.
    async fn install_token(&self, res: TokenRefreshResponse) {
        let state = TokenState {
            token_type: res.token_type,
            access_token: res.access_token,
            refresh_token: res.refresh_token,
            expire_time: res.expire_time,
            user_id: res.user_id,
            drive_id: res.default_drive_id,
        };

        match HeaderValue::from_str(&state.auth_header()) {
            Ok(mut value) => {
                value.set_sensitive(true);
                self.transport.set_header(AUTHORIZATION, value).await;
            }
            Err(_) => tracing::error!("drive: token not usable as a header value"),
        }

        *self.token.write().await = Some(state);
    }

    /// Create a folder path (multi-segment allowed), idempotently.
    ///
    /// Under the refuse policy an already-existing folder is treated as
    /// created, not as an error.
    pub async fn create_folder(&self, path: &str) -> bool {
        if !self.ensure_fresh().await {
            return false;
        }
        let Some(drive_id) = self.drive_id().await else {
            return false;
        };

        let req = CreateWithFoldersRequest {
            drive_id,
            name: path.to_string(),
            parent_file_id: "root".into(),
            kind: NodeKind::Folder,
            check_name_mode: CheckNameMode::Refuse,
            size: None,
            part_info_list: None,
            content_hash_name: None,
            content_hash: None,
            proof_version: None,
            proof_code: None,
        };

        if UploadEndpoint::create(self, &req).await.is_none() {
            tracing::error!("drive: create folder {} failed", path);
            return false;
        }
        true
    }

    /// Upload a local file to `dest` (drive-relative path; missing
    /// intermediate folders are created server-side).
    ///
    /// The transaction either short-circuits via rapid upload, streams
    /// every part to its presigned URL and completes, or fails whole;
    /// no partial state is kept for retry.
    pub async fn upload_file(
        &self,
        dest: &str,
        local: &Path,
        check_name_mode: CheckNameMode,
        try_rapid_upload: bool,
    ) -> Option<UploadOutcome> {
        if !self.ensure_fresh().await {
            return None;
        }
        let drive_id = self.drive_id().await?;

        let size = match local.metadata() {
            Ok(m) => m.len(),
            Err(e) => {
                tracing::error!("drive: cannot stat {}: {}", local.display(), e);
                return None;
            }
        };
        let parts = split_parts(size);

        let (content_hash, code) = if try_rapid_upload {
            let access_token = self.token.read().await.as_ref()?.access_token.clone();
            let hash = file_sha1(local);
            let code = proof_code(&access_token, local);
            match (hash, code) {
                (Ok(h), Ok(c)) => (Some(h), Some(c)),
                (Err(e), _) | (_, Err(e)) => {
                    tracing::error!("drive: hashing {} failed: {}", local.display(), e);
                    return None;
                }
            }
        } else {
            (None, None)
        };

        let req = CreateWithFoldersRequest {
            drive_id,
            name: dest.to_string(),
            parent_file_id: "root".into(),
            kind: NodeKind::File,
            check_name_mode,
            size: Some(size),
            part_info_list: Some(
                parts
                    .iter()
                    .map(|p| PartNumber {
                        part_number: p.number,
                    })
                    .collect(),
            ),
            content_hash_name: content_hash.as_ref().map(|_| "sha1".into()),
            content_hash,
            proof_version: code.as_ref().map(|_| "v1".into()),
            proof_code: code,
        };

        transaction::run(self, req, local, size, &parts).await
    }
}

#[async_trait]
impl UploadEndpoint for DriveClient {
    async fn create(&self, req: &CreateWithFoldersRequest) -> Option<CreateWithFoldersResponse> {
        let res = self
            .transport
            .post_json(&self.url("/adrive/v2/file/createWithFolders"), req)
            .await;
        if res.status() != Some(StatusCode::CREATED) {
            return None;
        }
        res.json()
    }

    async fn put_part(&self, url: &str, body: Vec<u8>) -> bool {
        self.transport.put_bytes(url, body).await.ok()
    }

    async fn complete(&self, req: &CompleteRequest) -> Option<FileMeta> {
        // Presigned part PUTs need no auth, but completion does.
        if !self.ensure_fresh().await {
            return None;
        }
        let res = self
            .transport
            .post_json(&self.url("/v2/file/complete"), req)
            .await;
        if !res.ok() {
            tracing::error!("drive: completion call failed for {}", req.file_id);
            return None;
        }
        res.json()
    }
}
