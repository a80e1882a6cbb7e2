//! Enrichment pipeline run after a webhook has been acknowledged.
//!
//! Nothing here returns an error: lookup failures degrade the message and
//! formatting or delivery failures drop it, both with a log line.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use crate::error::Result;
use crate::expo::{ExpoApi, Links};
use crate::notify;
use crate::payload::{BuildPayload, SubmissionPayload, UpdatePayload};
use crate::resolve;
use crate::slack::{Block, ChatSink};

#[derive(Clone)]
pub struct Relay {
    api: Arc<dyn ExpoApi>,
    chat: Arc<dyn ChatSink>,
    links: Links,
    previews: PreviewFilter,
}

/// Update branches whose name starts with `prefix` are previews and stay
/// quiet unless `allow` is set.
#[derive(Debug, Clone)]
pub struct PreviewFilter {
    pub allow: bool,
    pub prefix: String,
}

impl PreviewFilter {
    pub fn skips(&self, branch: &str) -> bool {
        !self.allow && !self.prefix.is_empty() && branch.starts_with(&self.prefix)
    }
}

impl Relay {
    pub fn new(
        api: Arc<dyn ExpoApi>,
        chat: Arc<dyn ChatSink>,
        links: Links,
        previews: PreviewFilter,
    ) -> Self {
        Self {
            api,
            chat,
            links,
            previews,
        }
    }

    pub async fn relay_build(&self, build: BuildPayload) {
        let previous_build = best_effort(
            "previous build",
            resolve::previous_build(self.api.as_ref(), &build).await,
        );
        let previous_update = best_effort(
            "previous update",
            resolve::previous_update_for_build(self.api.as_ref(), &build).await,
        );

        match notify::build_blocks(
            &self.links,
            &build,
            previous_build.as_ref(),
            previous_update.as_ref(),
            Utc::now(),
        ) {
            Ok(blocks) => self.deliver(blocks).await,
            Err(e) => error!(build = %build.id, "failed to format build message: {}", e),
        }
    }

    pub async fn relay_submission(&self, payload: SubmissionPayload) {
        let submission = match self.api.fetch_submission(&payload.id).await {
            Ok(submission) => Some(submission),
            Err(e) => {
                warn!(submission = %payload.id, "failed to fetch submission: {}", e);
                None
            }
        };
        let blocks = notify::submission_blocks(&self.links, &payload, submission.as_ref());
        self.deliver(blocks).await;
    }

    pub async fn relay_updates(&self, updates: Vec<UpdatePayload>) {
        for update in updates {
            if self.previews.skips(&update.branch) {
                info!(
                    update = %update.id,
                    branch = %update.branch,
                    "skipping preview branch update"
                );
                continue;
            }
            let previous = best_effort(
                "previous update",
                resolve::previous_update_for_update(self.api.as_ref(), &update).await,
            );
            match notify::update_blocks(&self.links, &update, previous.as_ref(), Utc::now()) {
                Ok(blocks) => self.deliver(blocks).await,
                Err(e) => error!(update = %update.id, "failed to format update message: {}", e),
            }
        }
    }

    async fn deliver(&self, blocks: Vec<Block>) {
        if let Err(e) = self.chat.post(blocks).await {
            error!("failed to post message: {}", e);
        }
    }
}

fn best_effort<T>(what: &str, lookup: Result<Option<T>>) -> Option<T> {
    lookup.unwrap_or_else(|e| {
        warn!("failed to fetch {}: {}", what, e);
        None
    })
}
