use std::collections::HashSet;
use std::sync::Arc;

use gallery_core::{ForgeHosts, WorkItem};
use gallery_logging::{gallery_info, gallery_warn};

use crate::fanout::{Completion, CompletionHandler, FanOutCollector};
use crate::gate::Gate;
use crate::listing::{DetailSource, ListingError, Submission};

/// Turns submissions into work items, one detail lookup per submission.
///
/// Submissions whose lookup fails are left out of the result.
pub struct MetadataFetchStage {
    collector: FanOutCollector,
    details: Arc<dyn DetailSource>,
    forge: ForgeHosts,
    allow_comment_urls: bool,
}

impl MetadataFetchStage {
    pub fn new(gate: Gate, details: Arc<dyn DetailSource>, forge: ForgeHosts) -> Self {
        Self {
            collector: FanOutCollector::new(gate),
            details,
            forge,
            allow_comment_urls: false,
        }
    }

    pub fn allow_comment_urls(mut self, allow: bool) -> Self {
        self.allow_comment_urls = allow;
        self
    }

    pub fn gate(&self) -> &Gate {
        self.collector.gate()
    }

    /// Resolves every submission; the output is in completion order.
    pub async fn resolve(&self, submissions: Vec<Submission>) -> Vec<WorkItem> {
        let submission_ids: Vec<u64> = submissions.iter().map(|s| s.id).collect();
        let tasks: Vec<_> = submissions
            .into_iter()
            .map(|submission| {
                let details = self.details.clone();
                let forge = self.forge.clone();
                let allow_comment_urls = self.allow_comment_urls;
                move || async move {
                    resolve_one(details.as_ref(), &forge, allow_comment_urls, submission).await
                }
            })
            .collect();

        let mut resolved = ResolvedItems::new(submission_ids);
        self.collector.run(tasks, &mut resolved).await;
        resolved.items
    }
}

async fn resolve_one(
    details: &dyn DetailSource,
    forge: &ForgeHosts,
    allow_comment_urls: bool,
    submission: Submission,
) -> Result<WorkItem, ListingError> {
    details.fetch_detail(&submission).await?;
    let source_url = submission
        .submitted_url(allow_comment_urls)
        .ok_or(ListingError::MissingUrl(submission.id))?
        .to_string();
    Ok(WorkItem {
        id: submission.id.to_string(),
        target_url: forge.derive_target_url(&source_url),
        display_label: forge.display_label(&source_url),
        source_url,
    })
}

struct ResolvedItems {
    submission_ids: Vec<u64>,
    seen: HashSet<String>,
    items: Vec<WorkItem>,
}

impl ResolvedItems {
    fn new(submission_ids: Vec<u64>) -> Self {
        Self {
            items: Vec::with_capacity(submission_ids.len()),
            seen: HashSet::new(),
            submission_ids,
        }
    }
}

impl CompletionHandler<WorkItem> for ResolvedItems {
    fn on_each(&mut self, completion: &Completion<WorkItem>) {
        match &completion.result {
            Ok(item) => {
                if self.seen.insert(item.id.clone()) {
                    self.items.push(item.clone());
                } else {
                    gallery_warn!("Duplicate submission {} ignored", item.id);
                }
            }
            Err(failure) => {
                let id = self
                    .submission_ids
                    .get(completion.index)
                    .map(ToString::to_string)
                    .unwrap_or_else(|| format!("#{}", completion.index));
                gallery_warn!("Skipping submission {}: metadata lookup {}", id, failure);
            }
        }
    }

    fn on_done(&mut self, completions: &[Completion<WorkItem>]) {
        gallery_info!(
            "Resolved {} of {} submissions",
            self.items.len(),
            completions.len()
        );
    }
}
