use reqwest::StatusCode;

use crate::expo::Platform;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("graphql errors: {0}")]
    GraphQl(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("failed to parse createdAt {value:?} for {id}: {source}")]
    Timestamp {
        id: String,
        value: String,
        source: chrono::ParseError,
    },

    #[error("no update branch on channel {channel} serves {platform}")]
    NoUpdateBranch { channel: String, platform: Platform },

    #[error("slack rejected message: {0}")]
    Slack(String),
}

pub type Result<T> = std::result::Result<T, Error>;
