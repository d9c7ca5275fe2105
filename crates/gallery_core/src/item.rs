pub type ItemId = String;

/// One page to capture, resolved from one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub id: ItemId,
    /// URL exactly as it was submitted.
    pub source_url: String,
    /// URL the capture navigates to.
    pub target_url: String,
    pub display_label: String,
}

/// Outcome of capturing a single [`WorkItem`].
///
/// `artifact_path` is relative to the gallery document so it can be used as
/// an `<img src>` directly. A failed capture usually still carries the path of
/// its placeholder image; `None` means not even the placeholder was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureResult {
    pub item_id: ItemId,
    pub artifact_path: Option<String>,
    pub diagnostics: Vec<String>,
    pub succeeded: bool,
}

impl CaptureResult {
    pub fn success(
        item_id: impl Into<ItemId>,
        artifact_path: impl Into<String>,
        diagnostics: Vec<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            artifact_path: Some(artifact_path.into()),
            diagnostics,
            succeeded: true,
        }
    }

    pub fn failure(
        item_id: impl Into<ItemId>,
        artifact_path: Option<String>,
        diagnostics: Vec<String>,
    ) -> Self {
        Self {
            item_id: item_id.into(),
            artifact_path,
            diagnostics,
            succeeded: false,
        }
    }
}
