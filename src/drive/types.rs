//! Drive API wire types.
//!
//! The drive backend speaks snake_case JSON; optional fields are typed
//! as `Option`/defaults so schema drift shows up at compile time rather
//! than as string-key lookups.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Name-collision policy for node creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckNameMode {
    /// Treat "already exists" as a refusal, not an error.
    Refuse,
    AutoRename,
    Overwrite,
}

/// Node type in the drive tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

/// Part descriptor sent in the create request (number only; the server
/// answers with the presigned URL).
#[derive(Debug, Clone, Serialize)]
pub struct PartNumber {
    pub part_number: u32,
}

/// Part descriptor returned by the create endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PartInfo {
    pub part_number: u32,
    #[serde(default)]
    pub upload_url: String,
}

/// Body of the create-with-folders call. Missing intermediate folders in
/// `name` are created server-side.
#[derive(Debug, Clone, Serialize)]
pub struct CreateWithFoldersRequest {
    pub drive_id: String,
    pub name: String,
    pub parent_file_id: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub check_name_mode: CheckNameMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_info_list: Option<Vec<PartNumber>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_code: Option<String>,
}

/// Create-with-folders response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateWithFoldersResponse {
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub upload_id: Option<String>,
    #[serde(default)]
    pub rapid_upload: bool,
    #[serde(default)]
    pub exist: bool,
    #[serde(default)]
    pub part_info_list: Vec<PartInfo>,
}

/// Body of the completion call that finalizes file visibility.
#[derive(Debug, Clone, Serialize)]
pub struct CompleteRequest {
    pub drive_id: String,
    pub file_id: String,
    pub upload_id: String,
}

/// Finalized file metadata from the completion endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct FileMeta {
    #[serde(default)]
    pub file_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
}

/// Token refresh response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenRefreshResponse {
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expire_time: DateTime<Utc>,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub default_drive_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_name_mode_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&CheckNameMode::AutoRename).unwrap(),
            "\"auto_rename\""
        );
        assert_eq!(
            serde_json::to_string(&CheckNameMode::Refuse).unwrap(),
            "\"refuse\""
        );
    }

    #[test]
    fn create_request_omits_folder_only_fields() {
        let req = CreateWithFoldersRequest {
            drive_id: "d".into(),
            name: "a/b".into(),
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
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["type"], "folder");
        assert!(json.get("size").is_none());
        assert!(json.get("proof_code").is_none());
    }

    #[test]
    fn create_response_defaults_are_empty() {
        let res: CreateWithFoldersResponse = serde_json::from_str("{}").unwrap();
        assert!(res.upload_id.is_none());
        assert!(!res.rapid_upload);
        assert!(res.part_info_list.is_empty());
    }

    #[test]
    fn refresh_response_parses_rfc3339_expiry() {
        let res: TokenRefreshResponse = serde_json::from_str(
            r#"{
                "token_type": "Bearer",
                "access_token": "a",
                "refresh_token": "r",
                "expire_time": "2024-05-01T00:00:00Z",
                "user_id": "u",
                "default_drive_id": "d"
            }"#,
        )
        .unwrap();
        assert_eq!(res.token_type, "Bearer");
        assert_eq!(res.default_drive_id, "d");
    }
}
