use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{Build, ExpoApi, Platform, Submission, UpdateChannel, UpdateGroups};
use crate::error::{Error, Result};

pub const DEFAULT_API_URL: &str = "https://api.expo.dev/graphql";

const ACCEPTED_TYPES: [&str; 3] = [
    "application/graphql-response+json",
    "application/graphql+json",
    "application/json",
];

const BUILDS_OPERATION: &str = "ViewBuildsOnApp";
const BUILDS_QUERY: &str = r#"query ViewBuildsOnApp(
  $appId: String!
  $offset: Int!
  $limit: Int!
  $filter: BuildFilter
) {
  app {
    byId(appId: $appId) {
      id
      builds(offset: $offset, limit: $limit, filter: $filter) {
        id
        status
        platform
        error { errorCode message }
        createdAt
        channel
        appVersion
        appBuildVersion
        gitCommitHash
      }
    }
  }
}"#;

const SUBMISSION_OPERATION: &str = "SubmissionByIdQuery";
const SUBMISSION_QUERY: &str = r#"query SubmissionByIdQuery($id: ID!) {
  submissions {
    byId(submissionId: $id) {
      id
      app { id name }
      submittedBuild {
        id
        status
        platform
        error { errorCode message }
        createdAt
        channel
        appVersion
        appBuildVersion
        gitCommitHash
      }
    }
  }
}"#;

const UPDATE_CHANNEL_OPERATION: &str = "ViewUpdateChannelOnApp";
const UPDATE_CHANNEL_QUERY: &str = r#"query ViewUpdateChannelOnApp(
  $appId: String!
  $channelName: String!
) {
  app {
    byId(appId: $appId) {
      id
      updateChannelByName(name: $channelName) {
        id
        name
        updateBranches(offset: 0, limit: 5) {
          id
          name
          updateGroups(offset: 0, limit: 1) {
            id
            group
            createdAt
            platform
            gitCommitHash
            branch { id name }
          }
        }
      }
    }
  }
}"#;

const UPDATES_OPERATION: &str = "ViewUpdateGroupsOnBranch";
const UPDATES_QUERY: &str = r#"query ViewUpdateGroupsOnBranch(
  $appId: String!
  $branchName: String!
  $limit: Int!
  $offset: Int!
) {
  app {
    byId(appId: $appId) {
      id
      updateBranchByName(name: $branchName) {
        id
        updateGroups(limit: $limit, offset: $offset) {
          id
          group
          createdAt
          platform
          gitCommitHash
          branch { id name }
        }
      }
    }
  }
}"#;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlQuery<V> {
    operation_name: &'static str,
    query: &'static str,
    variables: V,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse<D> {
    data: Option<D>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct AppData<T> {
    app: ById<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ById<T> {
    by_id: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BuildsVariables<'a> {
    app_id: &'a str,
    filter: BuildFilter<'a>,
    limit: u32,
    offset: u32,
}

#[derive(Serialize)]
struct BuildFilter<'a> {
    channel: &'a str,
    platform: String,
}

#[derive(Debug, Deserialize)]
struct BuildsOnApp {
    builds: Vec<Build>,
}

#[derive(Serialize)]
struct SubmissionVariables<'a> {
    id: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmissionsData {
    submissions: ById<Option<Submission>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateChannelVariables<'a> {
    app_id: &'a str,
    channel_name: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelOnApp {
    update_channel_by_name: Option<UpdateChannel>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdatesVariables<'a> {
    app_id: &'a str,
    branch_name: &'a str,
    limit: u32,
    offset: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BranchOnApp {
    update_branch_by_name: Option<BranchGroups>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BranchGroups {
    #[serde(default)]
    update_groups: UpdateGroups,
}

/// Expo GraphQL client authenticated with a bearer token.
#[derive(Clone)]
pub struct Client {
    http: reqwest::Client,
    url: String,
    token: String,
}

impl Client {
    pub fn new(http: reqwest::Client, url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http,
            url: url.into(),
            token: token.into(),
        }
    }

    async fn execute<V, D>(
        &self,
        operation: &'static str,
        query: &'static str,
        variables: V,
    ) -> Result<D>
    where
        V: Serialize,
        D: DeserializeOwned,
    {
        let mut request = self.http.post(&self.url);
        for accepted in ACCEPTED_TYPES {
            request = request.header(ACCEPT, accepted);
        }
        let response = request
            .header(AUTHORIZATION, format!("bearer {}", self.token))
            .json(&GraphQlQuery {
                operation_name: operation,
                query,
                variables,
            })
            .send()
            .await?;

        let status = response.status();
        let body = match response.bytes().await {
            Ok(body) => body,
            Err(e) => {
                warn!(operation, "failed to read response body: {}", e);
                Default::default()
            }
        };
        if !status.is_success() {
            return Err(Error::Status {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        debug!(operation, body = %String::from_utf8_lossy(&body), "response body");

        decode(operation, &body)
    }
}

fn decode<D: DeserializeOwned>(operation: &str, body: &[u8]) -> Result<D> {
    let parsed: GraphQlResponse<D> = serde_json::from_slice(body)?;
    let messages = parsed
        .errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ");
    match parsed.data {
        Some(data) => {
            if !messages.is_empty() {
                warn!(operation, "partial graphql errors: {}", messages);
            }
            Ok(data)
        }
        None => Err(Error::GraphQl(messages)),
    }
}

#[async_trait]
impl ExpoApi for Client {
    async fn fetch_builds(
        &self,
        app_id: &str,
        channel: &str,
        platform: &Platform,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Build>> {
        info!(app_id, channel, %platform, limit, offset, "fetching builds");
        let data: AppData<BuildsOnApp> = self
            .execute(
                BUILDS_OPERATION,
                BUILDS_QUERY,
                BuildsVariables {
                    app_id,
                    filter: BuildFilter {
                        channel,
                        platform: platform.graphql_name(),
                    },
                    limit,
                    offset,
                },
            )
            .await?;
        let builds = data.app.by_id.builds;
        info!(app_id, channel, %platform, count = builds.len(), "fetched builds");
        Ok(builds)
    }

    async fn fetch_submission(&self, id: &str) -> Result<Submission> {
        info!(id, "fetching submission");
        let data: SubmissionsData = self
            .execute(
                SUBMISSION_OPERATION,
                SUBMISSION_QUERY,
                SubmissionVariables { id },
            )
            .await?;
        let submission = data
            .submissions
            .by_id
            .ok_or_else(|| Error::NotFound(format!("submission {id}")))?;
        info!(id, build = %submission.submitted_build.id, "fetched submission");
        Ok(submission)
    }

    async fn fetch_update_channel(&self, app_id: &str, channel: &str) -> Result<UpdateChannel> {
        info!(app_id, channel, "fetching update channel");
        let data: AppData<ChannelOnApp> = self
            .execute(
                UPDATE_CHANNEL_OPERATION,
                UPDATE_CHANNEL_QUERY,
                UpdateChannelVariables {
                    app_id,
                    channel_name: channel,
                },
            )
            .await?;
        let resolved = data
            .app
            .by_id
            .update_channel_by_name
            .ok_or_else(|| Error::NotFound(format!("update channel {channel}")))?;
        info!(app_id, channel, id = %resolved.id, "resolved update channel");
        Ok(resolved)
    }

    async fn fetch_updates(
        &self,
        app_id: &str,
        branch: &str,
        limit: u32,
        offset: u32,
    ) -> Result<UpdateGroups> {
        info!(app_id, branch, limit, offset, "fetching updates");
        let data: AppData<BranchOnApp> = self
            .execute(
                UPDATES_OPERATION,
                UPDATES_QUERY,
                UpdatesVariables {
                    app_id,
                    branch_name: branch,
                    limit,
                    offset,
                },
            )
            .await?;
        let groups = data
            .app
            .by_id
            .update_branch_by_name
            .ok_or_else(|| Error::NotFound(format!("update branch {branch}")))?
            .update_groups;
        info!(app_id, branch, count = groups.len(), "fetched update groups");
        Ok(groups)
    }
}
