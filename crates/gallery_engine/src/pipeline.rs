use std::path::PathBuf;
use std::sync::Arc;

use gallery_core::{RunState, WorkItem};
use gallery_logging::{gallery_info, gallery_warn};
use thiserror::Error;

use crate::artifacts::ArtifactStore;
use crate::capture::{CaptureStage, RunRecorder};
use crate::config::PipelineConfig;
use crate::gate::Gate;
use crate::listing::{eligible_submissions, DetailSource, ListingError, Submission, SubmissionSource};
use crate::metadata::MetadataFetchStage;
use crate::persist::ensure_output_dir;
use crate::publish::SnapshotPublisher;
use crate::renderer::Renderer;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("could not list submissions: {0}")]
    Listing(#[from] ListingError),
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub items: Vec<WorkItem>,
    pub state: RunState,
    pub document: PathBuf,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.items.len()
    }

    pub fn failed(&self) -> usize {
        self.state.failed_count()
    }

    pub fn succeeded(&self) -> usize {
        self.state.completed_count() - self.state.failed_count()
    }
}

/// list -> resolve metadata -> capture, republishing the gallery as results land.
pub struct GalleryPipeline {
    config: PipelineConfig,
    submissions: Arc<dyn SubmissionSource>,
    details: Arc<dyn DetailSource>,
    renderer: Arc<dyn Renderer>,
    publisher: SnapshotPublisher,
}

impl GalleryPipeline {
    pub fn new(
        config: PipelineConfig,
        submissions: Arc<dyn SubmissionSource>,
        details: Arc<dyn DetailSource>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        let publisher = SnapshotPublisher::new(
            config.output.dir.clone(),
            config.output.document_filename.clone(),
            config.forge.clone(),
        );
        Self {
            config,
            submissions,
            details,
            renderer,
            publisher,
        }
    }

    pub fn with_publisher(mut self, publisher: SnapshotPublisher) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn publisher(&self) -> &SnapshotPublisher {
        &self.publisher
    }

    /// Only a listing failure is returned as an error; item-level failures end
    /// up in the summary.
    pub async fn run(&self) -> Result<RunSummary, PipelineError> {
        if let Err(err) = ensure_output_dir(&self.config.output.dir) {
            gallery_warn!(
                "Output directory {} not usable yet: {}",
                self.config.output.dir.display(),
                err
            );
        }

        let listed = self.submissions.list_submissions().await?;
        let eligible = eligible_submissions(listed, self.config.allow_comment_urls);
        gallery_info!("Processing {} eligible submissions", eligible.len());

        let items = self.resolve(eligible).await;
        Ok(self.capture(items).await)
    }

    /// Resolves submissions into work items, sorted for a stable gallery.
    pub async fn resolve(&self, submissions: Vec<Submission>) -> Vec<WorkItem> {
        let stage = MetadataFetchStage::new(
            Gate::new("metadata", self.config.fetch_concurrency),
            self.details.clone(),
            self.config.forge.clone(),
        )
        .allow_comment_urls(self.config.allow_comment_urls);
        let mut items = stage.resolve(submissions).await;
        sort_items(&mut items);
        items
    }

    /// Captures every item. The gallery is published once up front, after
    /// every completion, and once more at the end.
    pub async fn capture(&self, items: Vec<WorkItem>) -> RunSummary {
        let mut state = RunState::new(&items);
        if self.publisher.publish_logged(&state, &items) {
            gallery_info!(
                "Gallery at {} will update as captures complete",
                self.publisher.document_path().display()
            );
        }

        let stage = CaptureStage::new(
            Gate::new("capture", self.config.capture_concurrency),
            self.renderer.clone(),
            ArtifactStore::new(&self.config.output.dir, &self.config.output.screenshots_subdir),
            self.config.capture.clone(),
        );
        gallery_info!(
            "Capturing {} pages with {} concurrent jobs",
            items.len(),
            stage.gate().limit()
        );
        {
            let mut recorder = RunRecorder::new(&mut state, &items, &self.publisher);
            stage.run(&items, &mut recorder).await;
        }

        let summary = RunSummary {
            document: self.publisher.document_path(),
            items,
            state,
        };
        gallery_info!(
            "Gallery complete: {} captured, {} failed, {} total",
            summary.succeeded(),
            summary.failed(),
            summary.total()
        );
        summary
    }
}

/// Orders items by label (case-insensitive), then id.
pub fn sort_items(items: &mut [WorkItem]) {
    items.sort_by(|a, b| {
        a.display_label
            .to_lowercase()
            .cmp(&b.display_label.to_lowercase())
            .then_with(|| a.id.cmp(&b.id))
    });
}
