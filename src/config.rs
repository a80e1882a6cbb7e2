//! Process configuration, parsed once from flags or the environment.

use std::time::Duration;

use clap::Parser;
use clap::builder::FalseyValueParser;

use crate::expo::{DEFAULT_API_URL, Links};
use crate::relay::PreviewFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Shared secret Expo signs webhook bodies with
    #[arg(long, env = "EXPO_HMAC_SECRET")]
    pub hmac_secret: String,

    /// Expo API token
    #[arg(long, env = "EXPO_TOKEN")]
    pub expo_token: String,

    /// Slack bot token
    #[arg(long, env = "SLACK_TOKEN")]
    pub slack_token: String,

    /// Slack channel to post to
    #[arg(long, env = "SLACK_CHANNEL")]
    pub slack_channel: String,

    #[arg(short, long, env = "PORT", default_value = "8080")]
    pub port: u16,

    /// Log request and response bodies
    #[arg(long, env = "DEBUG", value_parser = FalseyValueParser::new())]
    pub debug: bool,

    /// Relay updates published to preview branches
    #[arg(long, env = "ALLOW_PREVIEW", value_parser = FalseyValueParser::new())]
    pub allow_preview: bool,

    #[arg(long, env = "PREVIEW_BRANCH_PREFIX", default_value = "xxx")]
    pub preview_prefix: String,

    #[arg(long, env = "EXPO_API_URL", default_value = DEFAULT_API_URL)]
    pub expo_api_url: String,

    /// GitHub repository (owner/repo) commits link to
    #[arg(long, env = "GITHUB_REPO", default_value = "NWACus/avy")]
    pub github_repo: String,

    #[arg(long, env = "EXPO_ACCOUNT", default_value = "nwac")]
    pub expo_account: String,

    #[arg(long, env = "EXPO_PROJECT", default_value = "avalanche-forecast")]
    pub expo_project: String,

    /// Seconds to let in-flight requests finish on shutdown
    #[arg(long, env = "SHUTDOWN_GRACE_SECS", default_value = "10")]
    pub shutdown_grace_secs: u64,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct Config {
    pub hmac_secret: String,
    pub expo_token: String,
    pub slack_token: String,
    pub slack_channel: String,
    pub port: u16,
    pub debug: bool,
    pub previews: PreviewFilter,
    pub expo_api_url: String,
    pub links: Links,
    pub shutdown_grace: Duration,
}

impl TryFrom<Args> for Config {
    type Error = ConfigError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        for (name, value) in [
            ("hmac-secret", &args.hmac_secret),
            ("expo-token", &args.expo_token),
            ("slack-token", &args.slack_token),
            ("slack-channel", &args.slack_channel),
        ] {
            if value.is_empty() {
                return Err(ConfigError::Missing(name));
            }
        }

        Ok(Self {
            hmac_secret: args.hmac_secret,
            expo_token: args.expo_token,
            slack_token: args.slack_token,
            slack_channel: args.slack_channel,
            port: args.port,
            debug: args.debug,
            previews: PreviewFilter {
                allow: args.allow_preview,
                prefix: args.preview_prefix,
            },
            expo_api_url: args.expo_api_url,
            links: Links {
                github_repo: args.github_repo,
                expo_account: args.expo_account,
                expo_project: args.expo_project,
            },
            shutdown_grace: Duration::from_secs(args.shutdown_grace_secs),
        })
    }
}
