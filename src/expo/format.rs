use chrono::TimeDelta;

use super::{BuildVersionMetadata, Platform, Status};

const SHORT_HASH_LEN: usize = 7;

/// Where chat links point: the GitHub repository the app is built from and
/// the Expo project that builds it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Links {
    pub github_repo: String,
    pub expo_account: String,
    pub expo_project: String,
}

impl Links {
    pub fn commit(&self, hash: &str) -> String {
        format!("https://github.com/{}/commit/{}", self.github_repo, hash)
    }

    pub fn compare(&self, base: &str, head: &str) -> String {
        format!(
            "https://github.com/{}/compare/{}...{}",
            self.github_repo, base, head
        )
    }

    pub fn build(&self, id: &str) -> String {
        format!("{}/builds/{}", self.project(), id)
    }

    pub fn update(&self, id: &str) -> String {
        format!("{}/updates/{}", self.project(), id)
    }

    pub fn channel(&self, name: &str) -> String {
        format!("{}/channels/{}", self.project(), name)
    }

    fn project(&self) -> String {
        format!(
            "https://expo.dev/accounts/{}/projects/{}",
            self.expo_account, self.expo_project
        )
    }
}

pub fn platform_emoji(platform: &Platform) -> &'static str {
    match platform {
        Platform::Android => ":android:",
        Platform::Ios => ":apple_logo:",
        Platform::Other(_) => ":grey_question:",
    }
}

pub fn platform_display(platform: &Platform) -> &'static str {
    match platform {
        Platform::Android => "Android",
        Platform::Ios => "iOS",
        Platform::Other(_) => "Unknown platform",
    }
}

pub fn status_emoji(status: &Status) -> &'static str {
    match status {
        Status::Finished => ":large_green_circle:",
        Status::Cancelled => ":large_yellow_circle:",
        Status::Errored => ":red_circle:",
        Status::Other(_) => ":black_circle:",
    }
}

pub fn status_display(status: &Status) -> &'static str {
    match status {
        Status::Finished => "succeeded",
        Status::Cancelled => "cancelled",
        Status::Errored => "errored",
        Status::Other(_) => "in an unknown state",
    }
}

pub fn format_title(emoji: &str, name: &str, platform: &Platform, status: &Status) -> String {
    format!(
        "{} {} {} | {} {} {}.",
        emoji,
        platform_emoji(platform),
        status_emoji(status),
        platform_display(platform),
        name,
        status_display(status)
    )
}

/// First seven characters of a commit hash, or all of it when shorter.
pub fn short_hash(hash: &str) -> &str {
    match hash.char_indices().nth(SHORT_HASH_LEN) {
        Some((end, _)) => &hash[..end],
        None => hash,
    }
}

pub fn format_build_version(links: &Links, build: &BuildVersionMetadata) -> String {
    format!(
        "{} ({}) [<{}|{}>] @<{}|{}>",
        build.app_version,
        build.app_build_version,
        links.commit(&build.git_commit_hash),
        short_hash(&build.git_commit_hash),
        links.channel(&build.channel),
        build.channel
    )
}

/// Coarsest whole unit that fits, truncating. Months are 30 days and years
/// 365 days. Negative spans (clock skew) read as zero seconds.
pub fn format_duration(elapsed: TimeDelta) -> String {
    const MINUTE: i64 = 60;
    const HOUR: i64 = 60 * MINUTE;
    const DAY: i64 = 24 * HOUR;

    let secs = elapsed.num_seconds().max(0);
    match secs {
        s if s < MINUTE => format!("{s} seconds"),
        s if s < HOUR => format!("{} minutes", s / MINUTE),
        s if s < DAY => format!("{} hours", s / HOUR),
        s if s < 30 * DAY => format!("{} days", s / DAY),
        s if s < 365 * DAY => format!("{} months", s / (30 * DAY)),
        s => format!("{} years", s / (365 * DAY)),
    }
}
