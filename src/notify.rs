//! Chat message layout for each kind of event.
//!
//! Pure functions: they take the event, whatever lookups succeeded and the
//! current time, and fail only on malformed timestamps in the lookups.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::expo::format::{
    format_build_version, format_duration, format_title, platform_display, platform_emoji,
    short_hash, status_display, status_emoji,
};
use crate::expo::{Build, ErrorInfo, Links, Status, Submission, Update};
use crate::payload::{BuildPayload, SubmissionPayload, UpdatePayload};
use crate::resolve::parse_timestamp;
use crate::slack::Block;

const BUILD_EMOJI: &str = ":hammer_and_wrench:";
const SUBMISSION_EMOJI: &str = ":arrow_up:";
const UPDATE_EMOJI: &str = ":arrows_counterclockwise:";

pub fn build_blocks(
    links: &Links,
    build: &BuildPayload,
    previous_build: Option<&Build>,
    previous_update: Option<&Update>,
    now: DateTime<Utc>,
) -> Result<Vec<Block>> {
    let head = &build.metadata.version.git_commit_hash;
    let mut blocks = vec![Block::markdown(format!(
        "{}{}{}| {} build of {} {} {}.",
        BUILD_EMOJI,
        platform_emoji(&build.platform),
        status_emoji(&build.status),
        platform_display(&build.platform),
        build.metadata.app_name,
        format_build_version(links, &build.metadata.version),
        status_display(&build.status)
    ))];

    if let Some(previous) = previous_build {
        let created_at = parse_timestamp(&previous.id, &previous.created_at)?;
        blocks.push(Block::markdown(format!(
            "The <{}|previous build>, {}, was published {} ago. See the changelog on <{}|GitHub>",
            links.build(&previous.id),
            format_build_version(links, &previous.metadata),
            format_duration(now - created_at),
            links.compare(&previous.metadata.git_commit_hash, head)
        )));
    }
    if let Some(previous) = previous_update {
        blocks.push(previous_update_block(links, previous, head, now)?);
    }

    blocks.push(Block::markdown(trailer(
        build.error.as_ref(),
        &format!("See build details <{}|here>.", build.details_url),
    )));
    Ok(blocks)
}

/// Without the submission lookup the header falls back to a generic title.
pub fn submission_blocks(
    links: &Links,
    payload: &SubmissionPayload,
    submission: Option<&Submission>,
) -> Vec<Block> {
    let header = match submission {
        Some(submission) => format!(
            "{}{}{}| {} submission of {} {} {}.",
            SUBMISSION_EMOJI,
            platform_emoji(&payload.platform),
            status_emoji(&payload.status),
            platform_display(&payload.platform),
            submission.app.name,
            format_build_version(links, &submission.submitted_build.metadata),
            status_display(&payload.status)
        ),
        None => format_title(
            SUBMISSION_EMOJI,
            "submission",
            &payload.platform,
            &payload.status,
        ),
    };
    vec![
        Block::markdown(header),
        Block::markdown(trailer(
            payload.error(),
            &format!("See details <{}|here>.", payload.details_url),
        )),
    ]
}

/// Updates only notify once published, so they always read as finished.
pub fn update_blocks(
    links: &Links,
    update: &UpdatePayload,
    previous: Option<&Update>,
    now: DateTime<Utc>,
) -> Result<Vec<Block>> {
    let mut blocks = vec![Block::markdown(format!(
        "{}{}{}| {} OTA update {}.",
        UPDATE_EMOJI,
        platform_emoji(&update.platform),
        status_emoji(&Status::Finished),
        platform_display(&update.platform),
        status_display(&Status::Finished)
    ))];
    if let Some(previous) = previous {
        blocks.push(previous_update_block(
            links,
            previous,
            &update.git_commit_hash,
            now,
        )?);
    }
    blocks.push(Block::markdown(format!(
        "See update details <{}|here>.",
        update.details_url(links)
    )));
    Ok(blocks)
}

fn previous_update_block(
    links: &Links,
    previous: &Update,
    head: &str,
    now: DateTime<Utc>,
) -> Result<Block> {
    let created_at = parse_timestamp(&previous.id, &previous.created_at)?;
    Ok(Block::markdown(format!(
        "The <{}|previous update>, for commit <{}|{}>, was published {} ago. \
         See the changelog on <{}|GitHub>",
        links.update(&previous.id),
        links.commit(&previous.git_commit_hash),
        short_hash(&previous.git_commit_hash),
        format_duration(now - created_at),
        links.compare(&previous.git_commit_hash, head)
    )))
}

fn trailer(error: Option<&ErrorInfo>, details: &str) -> String {
    match error {
        Some(error) if error.failed() => format!("Error {error}\n{details}"),
        _ => details.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::expo::{App, BranchFragment, BuildVersionMetadata, Platform};
    use crate::payload::BuildMetadata;

    fn links() -> Links {
        Links {
            github_repo: "NWACus/avy".into(),
            expo_account: "nwac".into(),
            expo_project: "avalanche-forecast".into(),
        }
    }

    fn now() -> DateTime<Utc> {
        parse_timestamp("now", "2024-03-10T12:00:00Z").unwrap()
    }

    fn version(hash: &str) -> BuildVersionMetadata {
        BuildVersionMetadata {
            channel: "production".into(),
            app_version: "2.0.0".into(),
            app_build_version: "7".into(),
            git_commit_hash: hash.into(),
        }
    }

    fn build_payload() -> BuildPayload {
        BuildPayload {
            id: "new-build".into(),
            app_id: "app".into(),
            details_url: "https://expo.dev/builds/new-build".into(),
            platform: Platform::Android,
            status: Status::Finished,
            metadata: BuildMetadata {
                app_name: "Avy".into(),
                version: version("ffffffffffff"),
            },
            error: None,
            created_at: "2024-03-10T11:00:00Z".into(),
        }
    }

    fn previous_build() -> Build {
        Build {
            id: "old-build".into(),
            status: Status::Finished,
            platform: Platform::Android,
            error: None,
            created_at: "2024-03-07T12:00:00Z".into(),
            metadata: version("aaaaaaaaaaaa"),
        }
    }

    fn previous_update(created_at: &str) -> Update {
        Update {
            id: "old-update".into(),
            group: "g".into(),
            platform: Platform::Android,
            git_commit_hash: "bbbbbbbbbbbb".into(),
            branch: BranchFragment {
                id: "b".into(),
                name: "production".into(),
            },
            created_at: created_at.into(),
        }
    }

    #[test]
    fn build_without_history_has_header_and_trailer() {
        let blocks = build_blocks(&links(), &build_payload(), None, None, now()).unwrap();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0].text().starts_with(
            ":hammer_and_wrench::android::large_green_circle:| Android build of Avy 2.0.0 (7)"
        ));
        assert!(blocks[0].text().ends_with(" succeeded."));
        assert_eq!(
            blocks[1].text(),
            "See build details <https://expo.dev/builds/new-build|here>."
        );
    }

    #[test]
    fn build_with_history_shows_both_deltas() {
        let update = previous_update("2024-03-10T10:00:00Z");
        let blocks = build_blocks(
            &links(),
            &build_payload(),
            Some(&previous_build()),
            Some(&update),
            now(),
        )
        .unwrap();
        assert_eq!(blocks.len(), 4);
        let build_delta = blocks[1].text();
        assert!(build_delta.contains("/builds/old-build|previous build>"));
        assert!(build_delta.contains("was published 3 days ago"));
        assert!(build_delta.contains("/compare/aaaaaaaaaaaa...ffffffffffff|GitHub>"));
        let update_delta = blocks[2].text();
        assert!(update_delta.contains("/updates/old-update|previous update>"));
        assert!(update_delta.contains("|bbbbbbb>"));
        assert!(update_delta.contains("was published 2 hours ago"));
    }

    #[test]
    fn failed_build_reports_error_in_trailer() {
        let mut payload = build_payload();
        payload.status = Status::Errored;
        payload.error = Some(ErrorInfo {
            error_code: "EAS_BUILD_FAILED".into(),
            message: "gradle exploded".into(),
        });
        let blocks = build_blocks(&links(), &payload, None, None, now()).unwrap();
        assert!(blocks[0].text().contains(":red_circle:"));
        assert!(blocks[1]
            .text()
            .starts_with("Error EAS_BUILD_FAILED: gradle exploded\nSee build details"));
    }

    #[test]
    fn malformed_previous_timestamp_aborts_message() {
        let update = previous_update("last tuesday");
        let err = build_blocks(&links(), &build_payload(), None, Some(&update), now()).unwrap_err();
        assert!(matches!(err, Error::Timestamp { .. }));
    }

    #[test]
    fn submission_falls_back_to_generic_title() {
        let payload = SubmissionPayload {
            id: "s".into(),
            details_url: "https://expo.dev/submissions/s".into(),
            platform: Platform::Ios,
            status: Status::Finished,
            info: None,
        };
        let blocks = submission_blocks(&links(), &payload, None);
        assert_eq!(
            blocks[0].text(),
            ":arrow_up: :apple_logo: :large_green_circle: | iOS submission succeeded."
        );
        assert_eq!(
            blocks[1].text(),
            "See details <https://expo.dev/submissions/s|here>."
        );

        let submission = Submission {
            id: "s".into(),
            app: App {
                id: "app".into(),
                name: "Avy".into(),
            },
            submitted_build: previous_build(),
        };
        let blocks = submission_blocks(&links(), &payload, Some(&submission));
        let expected =
            ":arrow_up::apple_logo::large_green_circle:| iOS submission of Avy 2.0.0 (7)";
        assert!(blocks[0].text().starts_with(expected));
    }

    #[test]
    fn update_links_previous_update_by_its_own_id() {
        let update = UpdatePayload {
            id: "new-update".into(),
            app_id: "app".into(),
            group: "g".into(),
            created_at: "2024-03-10T11:59:30Z".into(),
            branch: "production".into(),
            platform: Platform::Android,
            git_commit_hash: "cccccccccccc".into(),
        };
        let previous = previous_update("2024-03-10T11:59:15Z");
        let blocks = update_blocks(&links(), &update, Some(&previous), now()).unwrap();
        assert_eq!(blocks.len(), 3);
        assert!(blocks[0].text().contains("Android OTA update succeeded."));
        assert!(blocks[1].text().contains("/updates/old-update|previous update>"));
        assert!(blocks[1].text().contains("45 seconds ago"));
        assert!(blocks[1].text().contains("bbbbbbbbbbbb...cccccccccccc"));
        assert!(blocks[2].text().contains("/updates/new-update|here>"));
    }
}
