use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Target platform of a build, submission or update.
///
/// Webhooks send lowercase names while the GraphQL API answers in uppercase,
/// so parsing is case-insensitive and unknown values are kept lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    Android,
    Ios,
    Other(String),
}

impl Platform {
    pub fn as_str(&self) -> &str {
        match self {
            Platform::Android => "android",
            Platform::Ios => "ios",
            Platform::Other(other) => other,
        }
    }

    /// Name used by the `BuildFilter` GraphQL input.
    pub fn graphql_name(&self) -> String {
        self.as_str().to_ascii_uppercase()
    }
}

impl From<&str> for Platform {
    fn from(value: &str) -> Self {
        let value = value.to_ascii_lowercase();
        match value.as_str() {
            "android" => Platform::Android,
            "ios" => Platform::Ios,
            _ => Platform::Other(value),
        }
    }
}

impl From<String> for Platform {
    fn from(value: String) -> Self {
        Platform::from(value.as_str())
    }
}

impl From<Platform> for String {
    fn from(value: Platform) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Status {
    Finished,
    Cancelled,
    Errored,
    Other(String),
}

impl Status {
    pub fn as_str(&self) -> &str {
        match self {
            Status::Finished => "finished",
            Status::Cancelled => "cancelled",
            Status::Errored => "errored",
            Status::Other(other) => other,
        }
    }
}

impl From<&str> for Status {
    fn from(value: &str) -> Self {
        let value = value.to_ascii_lowercase();
        match value.as_str() {
            "finished" => Status::Finished,
            // the API spells it "canceled"
            "cancelled" | "canceled" => Status::Cancelled,
            "errored" => Status::Errored,
            _ => Status::Other(value),
        }
    }
}

impl From<String> for Status {
    fn from(value: String) -> Self {
        Status::from(value.as_str())
    }
}

impl From<Status> for String {
    fn from(value: Status) -> Self {
        value.as_str().to_string()
    }
}

/// Failure detail attached to builds and submissions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub error_code: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

impl ErrorInfo {
    pub fn failed(&self) -> bool {
        !self.error_code.is_empty() || !self.message.is_empty()
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_code, self.message)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildVersionMetadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub channel: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub app_version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub app_build_version: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub git_commit_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Build {
    pub id: String,
    pub status: Status,
    pub platform: Platform,
    #[serde(default)]
    pub error: Option<ErrorInfo>,
    pub created_at: String,
    #[serde(flatten)]
    pub metadata: BuildVersionMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchFragment {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Update {
    pub id: String,
    pub group: String,
    pub platform: Platform,
    #[serde(default, deserialize_with = "null_as_default")]
    pub git_commit_hash: String,
    pub branch: BranchFragment,
    pub created_at: String,
}

/// Updates published together, newest group first as returned upstream.
pub type UpdateGroups = Vec<Vec<Update>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBranch {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub update_groups: UpdateGroups,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChannel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub update_branches: Vec<UpdateBranch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct App {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: String,
    pub app: App,
    pub submitted_build: Build,
}

/// The API leaves unset strings as `null`; treat them as empty.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
