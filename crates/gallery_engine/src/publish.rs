use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use gallery_core::{render_gallery, ForgeHosts, GalleryView, RunState, WorkItem};
use gallery_logging::gallery_error;

use crate::persist::{AtomicFileWriter, PersistError};

/// Produces the "Last updated" text embedded in each snapshot.
pub type Clock = Arc<dyn Fn() -> String + Send + Sync>;

pub fn local_clock() -> Clock {
    Arc::new(|| Local::now().format("%B %d, %Y at %I:%M %p").to_string())
}

/// Renders the gallery from the current run state and atomically replaces the
/// document on disk.
#[derive(Clone)]
pub struct SnapshotPublisher {
    writer: AtomicFileWriter,
    filename: String,
    forge: ForgeHosts,
    clock: Clock,
}

impl SnapshotPublisher {
    pub fn new(output_dir: PathBuf, filename: impl Into<String>, forge: ForgeHosts) -> Self {
        Self {
            writer: AtomicFileWriter::new(output_dir),
            filename: filename.into(),
            forge,
            clock: local_clock(),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn document_path(&self) -> PathBuf {
        self.writer.dir().join(&self.filename)
    }

    pub fn render(&self, state: &RunState, items: &[WorkItem]) -> String {
        let view = GalleryView::build(state, items, &self.forge);
        render_gallery(&view, &(self.clock)())
    }

    pub fn publish(&self, state: &RunState, items: &[WorkItem]) -> Result<PathBuf, PersistError> {
        let html = self.render(state, items);
        self.writer.write(&self.filename, &html)
    }

    /// Like [`publish`](Self::publish), but failures are only logged.
    pub fn publish_logged(&self, state: &RunState, items: &[WorkItem]) -> bool {
        match self.publish(state, items) {
            Ok(_) => true,
            Err(err) => {
                gallery_error!(
                    "Failed to publish gallery to {}: {}",
                    self.document_path().display(),
                    err
                );
                false
            }
        }
    }
}

impl fmt::Debug for SnapshotPublisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotPublisher")
            .field("document", &self.document_path())
            .field("forge", &self.forge)
            .finish_non_exhaustive()
    }
}
