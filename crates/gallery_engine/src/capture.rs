use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use gallery_core::{CaptureResult, RunState, WorkItem};
use gallery_logging::{gallery_debug, gallery_error, gallery_info, gallery_warn};

use crate::artifacts::ArtifactStore;
use crate::fanout::{Completion, CompletionHandler, FanOutCollector};
use crate::gate::Gate;
use crate::publish::SnapshotPublisher;
use crate::renderer::{RenderContext, Renderer, Viewport};
use crate::types::{CaptureError, FailureKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSettings {
    /// Upper bound for each browser step: opening a context, loading, capturing.
    pub navigation_timeout: Duration,
    pub settle_delay: Duration,
    /// Pause after a capture before its gate slot is freed.
    pub courtesy_delay: Duration,
    pub viewport: Viewport,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            navigation_timeout: Duration::from_secs(30),
            settle_delay: Duration::from_secs(3),
            courtesy_delay: Duration::from_secs(1),
            viewport: Viewport::default(),
        }
    }
}

/// Captures one image per work item under a shared gate.
pub struct CaptureStage {
    collector: FanOutCollector,
    renderer: Arc<dyn Renderer>,
    artifacts: ArtifactStore,
    settings: CaptureSettings,
}

impl CaptureStage {
    pub fn new(
        gate: Gate,
        renderer: Arc<dyn Renderer>,
        artifacts: ArtifactStore,
        settings: CaptureSettings,
    ) -> Self {
        Self {
            collector: FanOutCollector::new(gate),
            renderer,
            artifacts,
            settings,
        }
    }

    pub fn gate(&self) -> &Gate {
        self.collector.gate()
    }

    /// Completion indices refer to positions in `items`.
    pub async fn run<H>(&self, items: &[WorkItem], handler: &mut H) -> Vec<Completion<CaptureResult>>
    where
        H: CompletionHandler<CaptureResult> + ?Sized,
    {
        let tasks: Vec<_> = items
            .iter()
            .cloned()
            .map(|item| {
                let renderer = self.renderer.clone();
                let artifacts = self.artifacts.clone();
                let settings = self.settings.clone();
                move || async move {
                    let result =
                        capture_item(renderer.as_ref(), &artifacts, &settings, &item).await;
                    Ok::<_, Infallible>(result)
                }
            })
            .collect();
        self.collector.run(tasks, handler).await
    }
}

/// Captures `item`, falling back to a placeholder image on any failure.
/// Always yields a result, and waits out the courtesy delay before returning.
pub async fn capture_item(
    renderer: &dyn Renderer,
    artifacts: &ArtifactStore,
    settings: &CaptureSettings,
    item: &WorkItem,
) -> CaptureResult {
    let (outcome, mut diagnostics) =
        match bounded(settings.navigation_timeout, "opening context", renderer.open_context()).await
        {
            Ok(mut context) => {
                let outcome = attempt(context.as_mut(), settings, &item.target_url).await;
                let diagnostics = context.take_diagnostics();
                context.close().await;
                (outcome, diagnostics)
            }
            Err(err) => (Err(err), Vec::new()),
        };

    let stored = outcome.and_then(|png| {
        artifacts
            .write_image(&item.id, &png)
            .map_err(|e| CaptureError::new(FailureKind::Artifact, e.to_string()))
    });

    let result = match stored {
        Ok(path) => {
            gallery_debug!("Captured {} ({})", item.id, item.target_url);
            CaptureResult::success(item.id.clone(), path, diagnostics)
        }
        Err(err) => {
            gallery_warn!("Error capturing {}: {}", item.target_url, err);
            diagnostics.push(format!("Screenshot error: {err}"));
            let placeholder = match artifacts.write_placeholder(&item.id) {
                Ok(path) => Some(path),
                Err(write_err) => {
                    gallery_error!("Could not write placeholder for {}: {}", item.id, write_err);
                    diagnostics.push(format!("Placeholder error: {write_err}"));
                    None
                }
            };
            CaptureResult::failure(item.id.clone(), placeholder, diagnostics)
        }
    };

    tokio::time::sleep(settings.courtesy_delay).await;
    result
}

async fn attempt(
    context: &mut dyn RenderContext,
    settings: &CaptureSettings,
    url: &str,
) -> Result<Vec<u8>, CaptureError> {
    bounded(settings.navigation_timeout, "navigating", context.navigate(url)).await?;
    context.settle(settings.settle_delay).await;
    bounded(settings.navigation_timeout, "capturing", context.screenshot()).await
}

async fn bounded<T>(
    limit: Duration,
    step: &str,
    work: impl Future<Output = Result<T, CaptureError>>,
) -> Result<T, CaptureError> {
    match tokio::time::timeout(limit, work).await {
        Ok(result) => result,
        Err(_) => Err(CaptureError::new(
            FailureKind::Timeout,
            format!("{step} exceeded {} ms", limit.as_millis()),
        )),
    }
}

/// Records capture results into a [`RunState`] and republishes the gallery
/// after every completion.
pub struct RunRecorder<'a> {
    state: &'a mut RunState,
    items: &'a [WorkItem],
    publisher: &'a SnapshotPublisher,
}

impl<'a> RunRecorder<'a> {
    pub fn new(
        state: &'a mut RunState,
        items: &'a [WorkItem],
        publisher: &'a SnapshotPublisher,
    ) -> Self {
        Self {
            state,
            items,
            publisher,
        }
    }
}

impl CompletionHandler<CaptureResult> for RunRecorder<'_> {
    fn on_each(&mut self, completion: &Completion<CaptureResult>) {
        let result = match &completion.result {
            Ok(result) => result.clone(),
            Err(failure) => {
                let Some(item) = self.items.get(completion.index) else {
                    gallery_error!("Completion for unknown index {}", completion.index);
                    return;
                };
                gallery_warn!("Capture task for {} {}", item.id, failure);
                CaptureResult::failure(
                    item.id.clone(),
                    None,
                    vec![format!("Capture task {failure}")],
                )
            }
        };

        if let Err(err) = self.state.record(result) {
            gallery_warn!("Dropping capture result: {}", err);
            return;
        }
        gallery_info!(
            "Captured {}/{} ({} failed)",
            self.state.completed_count(),
            self.state.total(),
            self.state.failed_count()
        );
        self.publisher.publish_logged(self.state, self.items);
    }

    fn on_done(&mut self, _completions: &[Completion<CaptureResult>]) {
        if self.publisher.publish_logged(self.state, self.items) {
            gallery_info!(
                "Final gallery published to {}",
                self.publisher.document_path().display()
            );
        }
    }
}
