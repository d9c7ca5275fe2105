use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use gallery_core::{ForgeHosts, WorkItem};
use gallery_engine::{
    DetailSource, Gate, ListingError, MetadataFetchStage, Submission, SubmissionComment,
    SubmissionDetail,
};
use pretty_assertions::assert_eq;

/// Answers detail lookups from memory, failing for the listed users.
struct FakeDetails {
    missing: HashSet<u64>,
}

#[async_trait::async_trait]
impl DetailSource for FakeDetails {
    async fn fetch_detail(&self, submission: &Submission) -> Result<SubmissionDetail, ListingError> {
        tokio::time::sleep(Duration::from_millis(10 + submission.id % 3 * 5)).await;
        if self.missing.contains(&submission.user_id) {
            return Err(ListingError::HttpStatus {
                status: 404,
                url: format!("/users/{}", submission.user_id),
            });
        }
        Ok(SubmissionDetail {
            user_id: submission.user_id,
        })
    }
}

fn submission(id: u64, url: Option<&str>, comment: Option<&str>) -> Submission {
    Submission {
        id,
        user_id: id * 10,
        url: url.map(ToOwned::to_owned),
        workflow_state: "submitted".to_string(),
        submission_comments: comment
            .map(|c| {
                vec![SubmissionComment {
                    comment: c.to_string(),
                }]
            })
            .unwrap_or_default(),
    }
}

fn stage(missing: &[u64]) -> MetadataFetchStage {
    MetadataFetchStage::new(
        Gate::new("metadata", NonZeroUsize::new(4).unwrap()),
        Arc::new(FakeDetails {
            missing: missing.iter().copied().collect(),
        }),
        ForgeHosts::github(),
    )
}

fn by_id(mut items: Vec<WorkItem>) -> Vec<WorkItem> {
    items.sort_by(|a, b| a.id.cmp(&b.id));
    items
}

#[tokio::test]
async fn resolves_target_and_label_from_submitted_url() {
    let submissions = vec![
        submission(1, Some("https://github.com/alice/project"), None),
        submission(2, Some("https://bob.github.io/site/"), None),
    ];

    let items = by_id(stage(&[]).resolve(submissions).await);

    assert_eq!(
        items,
        vec![
            WorkItem {
                id: "1".to_string(),
                source_url: "https://github.com/alice/project".to_string(),
                target_url: "https://alice.github.io/project".to_string(),
                display_label: "alice".to_string(),
            },
            WorkItem {
                id: "2".to_string(),
                source_url: "https://bob.github.io/site/".to_string(),
                target_url: "https://bob.github.io/site/".to_string(),
                display_label: "bob".to_string(),
            },
        ]
    );
}

#[tokio::test]
async fn failed_lookup_drops_only_that_submission() {
    let submissions = vec![
        submission(1, Some("https://github.com/a/x"), None),
        submission(2, Some("https://github.com/b/y"), None),
        submission(3, Some("https://github.com/c/z"), None),
    ];

    let items = by_id(stage(&[20]).resolve(submissions).await);

    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3"]);
}

#[tokio::test]
async fn comment_urls_are_used_only_when_enabled() {
    let submissions = vec![submission(4, None, Some("https://dee.github.io/demo"))];

    let without = stage(&[]).resolve(submissions.clone()).await;
    assert!(without.is_empty());

    let with = stage(&[]).allow_comment_urls(true).resolve(submissions).await;
    assert_eq!(with.len(), 1);
    assert_eq!(with[0].display_label, "dee");
}

#[tokio::test]
async fn duplicate_submissions_yield_one_item() {
    let submissions = vec![
        submission(5, Some("https://github.com/e/one"), None),
        submission(5, Some("https://github.com/e/one"), None),
    ];

    let items = stage(&[]).resolve(submissions).await;
    assert_eq!(items.len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn lookups_never_exceed_the_metadata_limit() {
    let stage = MetadataFetchStage::new(
        Gate::new("metadata", NonZeroUsize::new(3).unwrap()),
        Arc::new(FakeDetails {
            missing: HashSet::new(),
        }),
        ForgeHosts::github(),
    );
    let submissions: Vec<Submission> = (1..=15)
        .map(|id| submission(id, Some(&format!("https://github.com/u{id}/demo")), None))
        .collect();

    let items = stage.resolve(submissions).await;

    assert_eq!(items.len(), 15);
    assert!(stage.gate().peak() <= 3, "peak was {}", stage.gate().peak());
    assert!(stage.gate().peak() >= 2);
    assert_eq!(stage.gate().in_flight(), 0);
}
