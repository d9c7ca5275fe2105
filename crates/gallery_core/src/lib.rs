//! Gallery core: pure domain types, URL rules, run state and document rendering.
mod item;
mod render;
mod state;
mod urls;
mod view_model;

pub use item::{CaptureResult, ItemId, WorkItem};
pub use render::{escape_html, render_gallery, FAILED_MARKER, PENDING_MARKER};
pub use state::{RecordError, RunState};
pub use urls::{code_url, derive_target_url, display_label, ForgeHosts, UNKNOWN_LABEL};
pub use view_model::{CardStatus, CardView, GalleryView};
