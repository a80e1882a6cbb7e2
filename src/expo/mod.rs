//! Expo domain model and GraphQL API access.

mod client;
pub mod format;
mod types;

use async_trait::async_trait;

use crate::error::Result;

pub use client::{Client, DEFAULT_API_URL};
pub use format::Links;
pub use types::{
    App, BranchFragment, Build, BuildVersionMetadata, ErrorInfo, Platform, Status, Submission,
    Update, UpdateBranch, UpdateChannel, UpdateGroups,
};
pub(crate) use types::null_as_default;

/// Read operations the relay needs from Expo.
///
/// Lists come back in upstream order, which is assumed newest-first.
#[async_trait]
pub trait ExpoApi: Send + Sync {
    async fn fetch_builds(
        &self,
        app_id: &str,
        channel: &str,
        platform: &Platform,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Build>>;

    async fn fetch_submission(&self, id: &str) -> Result<Submission>;

    async fn fetch_update_channel(&self, app_id: &str, channel: &str) -> Result<UpdateChannel>;

    async fn fetch_updates(
        &self,
        app_id: &str,
        branch: &str,
        limit: u32,
        offset: u32,
    ) -> Result<UpdateGroups>;
}
