//! Webhook bodies, one type per route.

use serde::Deserialize;

use crate::expo::{BuildVersionMetadata, ErrorInfo, Links, Platform, Status, null_as_default};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildPayload {
    pub id: String,
    pub app_id: String,
    #[serde(default, rename = "buildDetailsPageUrl", deserialize_with = "null_as_default")]
    pub details_url: String,
    pub platform: Platform,
    pub status: Status,
    pub metadata: BuildMetadata,
    #[serde(default)]
    pub error: Option<ErrorInfo>,
    pub created_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildMetadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub app_name: String,
    #[serde(flatten)]
    pub version: BuildVersionMetadata,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionPayload {
    pub id: String,
    #[serde(
        default,
        rename = "submissionDetailsPageUrl",
        deserialize_with = "null_as_default"
    )]
    pub details_url: String,
    pub platform: Platform,
    pub status: Status,
    #[serde(default, rename = "submissionInfo")]
    pub info: Option<SubmissionInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SubmissionInfo {
    #[serde(default)]
    pub error: Option<ErrorInfo>,
}

impl SubmissionPayload {
    pub fn error(&self) -> Option<&ErrorInfo> {
        self.info.as_ref().and_then(|info| info.error.as_ref())
    }
}

/// One element of the update webhook's array body. `branch` is the branch name.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePayload {
    pub id: String,
    pub app_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub group: String,
    pub created_at: String,
    pub branch: String,
    pub platform: Platform,
    #[serde(default, deserialize_with = "null_as_default")]
    pub git_commit_hash: String,
}

impl UpdatePayload {
    pub fn details_url(&self, links: &Links) -> String {
        links.update(&self.id)
    }
}
