//! Finding the event that came before a newly reported one.
//!
//! Every search trusts upstream ordering: builds and update groups arrive
//! newest first, and so do the members of each group. Nothing here re-sorts
//! by time, so the first candidate in traversal order wins.

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::expo::{Build, ExpoApi, Platform, Update, UpdateChannel};
use crate::payload::{BuildPayload, UpdatePayload};

pub const BUILD_PAGE_SIZE: u32 = 10;
pub const UPDATE_PAGE_SIZE: u32 = 10;

pub fn parse_timestamp(id: &str, value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|source| Error::Timestamp {
            id: id.to_string(),
            value: value.to_string(),
            source,
        })
}

/// First update for `platform` created at or before `reference`.
///
/// A candidate with an unparseable timestamp fails the whole scan instead of
/// being skipped.
pub fn previous_update_in<'a>(
    platform: &Platform,
    reference: DateTime<Utc>,
    groups: &'a [Vec<Update>],
) -> Result<Option<&'a Update>> {
    for update in groups.iter().flatten() {
        if &update.platform != platform {
            continue;
        }
        if parse_timestamp(&update.id, &update.created_at)? > reference {
            continue;
        }
        return Ok(Some(update));
    }
    Ok(None)
}

/// Name of the branch a channel serves to `platform`: the branch of the
/// first sampled update on that platform.
pub fn update_branch_for<'a>(platform: &Platform, channel: &'a UpdateChannel) -> Option<&'a str> {
    channel
        .update_branches
        .iter()
        .flat_map(|branch| branch.update_groups.iter().flatten())
        .find(|update| &update.platform == platform)
        .map(|update| update.branch.name.as_str())
}

/// The build listed right after `id`. Missing when `id` is absent from the
/// page or is its last entry.
pub fn previous_build_in<'a>(id: &str, builds: &'a [Build]) -> Option<&'a Build> {
    builds
        .iter()
        .position(|build| build.id == id)
        .and_then(|at| builds.get(at + 1))
}

pub async fn previous_build(api: &dyn ExpoApi, build: &BuildPayload) -> Result<Option<Build>> {
    let builds = api
        .fetch_builds(
            &build.app_id,
            &build.metadata.version.channel,
            &build.platform,
            BUILD_PAGE_SIZE,
            0,
        )
        .await?;
    let previous = previous_build_in(&build.id, &builds).cloned();
    match &previous {
        Some(found) => info!(build = %build.id, previous = %found.id, "found previous build"),
        None => debug!(build = %build.id, fetched = builds.len(), "no previous build in page"),
    }
    Ok(previous)
}

pub async fn previous_update_for_build(
    api: &dyn ExpoApi,
    build: &BuildPayload,
) -> Result<Option<Update>> {
    let created_at = parse_timestamp(&build.id, &build.created_at)?;
    let channel_name = &build.metadata.version.channel;

    let channel = api.fetch_update_channel(&build.app_id, channel_name).await?;
    let Some(branch) = update_branch_for(&build.platform, &channel) else {
        return Err(Error::NoUpdateBranch {
            channel: channel_name.clone(),
            platform: build.platform.clone(),
        });
    };
    debug!(channel = %channel_name, branch, platform = %build.platform, "resolved update branch");

    let groups = api
        .fetch_updates(&build.app_id, branch, UPDATE_PAGE_SIZE, 0)
        .await?;
    Ok(previous_update_in(&build.platform, created_at, &groups)?.cloned())
}

pub async fn previous_update_for_update(
    api: &dyn ExpoApi,
    update: &UpdatePayload,
) -> Result<Option<Update>> {
    let created_at = parse_timestamp(&update.id, &update.created_at)?;
    let groups = api
        .fetch_updates(&update.app_id, &update.branch, UPDATE_PAGE_SIZE, 0)
        .await?;
    Ok(previous_update_in(&update.platform, created_at, &groups)?.cloned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expo::{BranchFragment, BuildVersionMetadata, Status, UpdateBranch};

    fn update(id: &str, platform: Platform, created_at: &str) -> Update {
        Update {
            id: id.into(),
            group: format!("group-{id}"),
            platform,
            git_commit_hash: "0123456789abcdef".into(),
            branch: BranchFragment {
                id: "branch-id".into(),
                name: "production".into(),
            },
            created_at: created_at.into(),
        }
    }

    fn build(id: &str) -> Build {
        Build {
            id: id.into(),
            status: Status::Finished,
            platform: Platform::Ios,
            error: None,
            created_at: "2024-01-01T00:00:00Z".into(),
            metadata: BuildVersionMetadata::default(),
        }
    }

    fn at(value: &str) -> DateTime<Utc> {
        parse_timestamp("reference", value).unwrap()
    }

    #[test]
    fn empty_groups_have_no_previous() {
        let found = previous_update_in(&Platform::Ios, at("2024-01-02T00:00:00Z"), &[]).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn other_platforms_are_ignored() {
        let groups = vec![vec![update("a", Platform::Android, "2024-01-01T00:00:00Z")]];
        let found =
            previous_update_in(&Platform::Ios, at("2024-01-02T00:00:00Z"), &groups).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn later_updates_are_skipped() {
        let groups = vec![
            vec![update("newer", Platform::Ios, "2024-01-03T00:00:00Z")],
            vec![update("older", Platform::Ios, "2024-01-01T00:00:00Z")],
        ];
        let found =
            previous_update_in(&Platform::Ios, at("2024-01-02T00:00:00Z"), &groups).unwrap();
        assert_eq!(found.map(|u| u.id.as_str()), Some("older"));
    }

    #[test]
    fn equal_timestamp_counts_as_previous() {
        let groups = vec![vec![update("same", Platform::Ios, "2024-01-02T00:00:00Z")]];
        let found =
            previous_update_in(&Platform::Ios, at("2024-01-02T00:00:00Z"), &groups).unwrap();
        assert_eq!(found.map(|u| u.id.as_str()), Some("same"));
    }

    #[test]
    fn traversal_order_beats_chronology() {
        let groups = vec![
            vec![
                update("android", Platform::Android, "garbage"),
                update("first", Platform::Ios, "2023-06-01T00:00:00Z"),
            ],
            vec![update("closer", Platform::Ios, "2024-01-01T00:00:00Z")],
        ];
        let found =
            previous_update_in(&Platform::Ios, at("2024-01-02T00:00:00Z"), &groups).unwrap();
        assert_eq!(found.map(|u| u.id.as_str()), Some("first"));
    }

    #[test]
    fn malformed_timestamp_fails_the_scan() {
        let groups = vec![
            vec![update("bad", Platform::Ios, "yesterday")],
            vec![update("good", Platform::Ios, "2024-01-01T00:00:00Z")],
        ];
        let err =
            previous_update_in(&Platform::Ios, at("2024-01-02T00:00:00Z"), &groups).unwrap_err();
        assert!(matches!(err, Error::Timestamp { ref id, .. } if id == "bad"));
    }

    #[test]
    fn offsets_are_honoured_when_comparing() {
        let groups = vec![vec![update("tz", Platform::Ios, "2024-01-02T01:00:00+02:00")]];
        let found =
            previous_update_in(&Platform::Ios, at("2024-01-01T23:30:00Z"), &groups).unwrap();
        assert_eq!(found.map(|u| u.id.as_str()), Some("tz"));
    }

    #[test]
    fn branch_comes_from_first_matching_sample() {
        let mut android = update("a", Platform::Android, "2024-01-01T00:00:00Z");
        android.branch.name = "android-branch".into();
        let mut ios = update("i", Platform::Ios, "2024-01-01T00:00:00Z");
        ios.branch.name = "ios-branch".into();
        let mut late_ios = ios.clone();
        late_ios.branch.name = "other-ios-branch".into();

        let channel = UpdateChannel {
            id: "c".into(),
            name: "production".into(),
            update_branches: vec![
                UpdateBranch {
                    id: "b1".into(),
                    name: "android-branch".into(),
                    update_groups: vec![vec![android]],
                },
                UpdateBranch {
                    id: "b2".into(),
                    name: "ios-branch".into(),
                    update_groups: vec![vec![ios]],
                },
                UpdateBranch {
                    id: "b3".into(),
                    name: "other-ios-branch".into(),
                    update_groups: vec![vec![late_ios]],
                },
            ],
        };
        assert_eq!(update_branch_for(&Platform::Ios, &channel), Some("ios-branch"));
        assert_eq!(
            update_branch_for(&Platform::Android, &channel),
            Some("android-branch")
        );
        assert_eq!(update_branch_for(&Platform::from("web"), &channel), None);
    }

    #[test]
    fn previous_build_is_the_next_entry() {
        let page = vec![build("B3"), build("B2"), build("B1")];
        assert_eq!(previous_build_in("B2", &page).map(|b| b.id.as_str()), Some("B1"));
        assert_eq!(previous_build_in("B3", &page).map(|b| b.id.as_str()), Some("B2"));
        assert!(previous_build_in("B1", &page).is_none());
        assert!(previous_build_in("B9", &page).is_none());
        assert!(previous_build_in("B1", &[]).is_none());
    }
}
