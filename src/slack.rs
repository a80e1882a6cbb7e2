//! Slack chat delivery.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

pub const POST_MESSAGE_URL: &str = "https://slack.com/api/chat.postMessage";

/// A Block Kit block. Only markdown sections are needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Section { text: Text },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Text {
    Mrkdwn { text: String },
}

impl Block {
    pub fn markdown(text: impl Into<String>) -> Self {
        Block::Section {
            text: Text::Mrkdwn { text: text.into() },
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Block::Section {
                text: Text::Mrkdwn { text },
            } => text,
        }
    }
}

/// Destination for finished notifications.
#[async_trait]
pub trait ChatSink: Send + Sync {
    async fn post(&self, blocks: Vec<Block>) -> Result<()>;
}

#[derive(Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    blocks: &'a [Block],
    unfurl_links: bool,
    unfurl_media: bool,
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

/// Posts to one channel with a bot token.
#[derive(Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    token: String,
    channel: String,
    url: String,
}

impl SlackClient {
    pub fn new(
        http: reqwest::Client,
        token: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            http,
            token: token.into(),
            channel: channel.into(),
            url: POST_MESSAGE_URL.to_string(),
        }
    }
}

#[async_trait]
impl ChatSink for SlackClient {
    async fn post(&self, blocks: Vec<Block>) -> Result<()> {
        info!(channel = %self.channel, blocks = blocks.len(), "posting message to slack");
        let response = self
            .http
            .post(&self.url)
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
            .json(&PostMessage {
                channel: &self.channel,
                blocks: &blocks,
                unfurl_links: false,
                unfurl_media: false,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Status { status, body });
        }
        let reply: PostMessageResponse = serde_json::from_slice(&response.bytes().await?)?;
        if !reply.ok {
            return Err(Error::Slack(reply.error.unwrap_or_else(|| "unknown error".into())));
        }
        Ok(())
    }
}
