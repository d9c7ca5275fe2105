//! Gallery engine: concurrent capture pipeline and its IO.
mod artifacts;
mod capture;
mod cdp;
mod config;
mod fanout;
mod filename;
mod gate;
mod listing;
mod metadata;
mod persist;
mod pipeline;
mod placeholder;
mod publish;
mod renderer;
mod task;
mod types;

pub use artifacts::ArtifactStore;
pub use capture::{capture_item, CaptureSettings, CaptureStage, RunRecorder};
pub use cdp::{CdpBrowser, CdpPage};
pub use config::{
    ConfigError, OutputLayout, PipelineConfig, ENV_ALLOW_COMMENT_URLS, ENV_CAPTURE_CONCURRENCY,
    ENV_COURTESY_MS, ENV_FETCH_CONCURRENCY, ENV_NAV_TIMEOUT_MS, ENV_OUTPUT_DIR, ENV_SETTLE_MS,
};
pub use fanout::{Completion, CompletionHandler, FanOutCollector};
pub use filename::artifact_filename;
pub use gate::{Gate, GateClosed, GatePermit};
pub use listing::{
    eligible_submissions, parse_link_header, CanvasClient, DetailSource, ListingError,
    ListingSettings, Submission, SubmissionComment, SubmissionDetail, SubmissionSource,
};
pub use metadata::MetadataFetchStage;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use pipeline::{sort_items, GalleryPipeline, PipelineError, RunSummary};
pub use placeholder::{
    placeholder_image, placeholder_png, PLACEHOLDER_HEIGHT, PLACEHOLDER_TEXT, PLACEHOLDER_WIDTH,
};
pub use publish::{local_clock, Clock, SnapshotPublisher};
pub use renderer::{RenderContext, Renderer, Viewport};
pub use task::{run_isolated, TaskFailure, TaskFailureKind, TaskResult};
pub use types::{CaptureError, FailureKind};
