use crate::{ForgeHosts, ItemId, RunState, WorkItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardStatus {
    /// No result yet.
    Pending,
    Captured { artifact_path: String },
    /// Capture failed; the path points at the placeholder image if one was written.
    Failed { artifact_path: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub item_id: ItemId,
    pub label: String,
    pub demo_url: String,
    pub code_url: String,
    pub status: CardStatus,
    pub diagnostics: Vec<String>,
}

/// Everything the gallery document shows, in item-list order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GalleryView {
    pub cards: Vec<CardView>,
    pub completed: usize,
    pub failed: usize,
    pub total: usize,
}

impl GalleryView {
    pub fn build(state: &RunState, items: &[WorkItem], forge: &ForgeHosts) -> Self {
        let mut completed = 0;
        let mut failed = 0;
        let cards = items
            .iter()
            .map(|item| {
                let (status, diagnostics) = match state.get(&item.id) {
                    Some(result) => {
                        completed += 1;
                        let status = match (&result.artifact_path, result.succeeded) {
                            (Some(path), true) => CardStatus::Captured {
                                artifact_path: path.clone(),
                            },
                            (path, _) => {
                                failed += 1;
                                CardStatus::Failed {
                                    artifact_path: path.clone(),
                                }
                            }
                        };
                        (status, result.diagnostics.clone())
                    }
                    None => (CardStatus::Pending, Vec::new()),
                };
                CardView {
                    item_id: item.id.clone(),
                    label: item.display_label.clone(),
                    demo_url: item.target_url.clone(),
                    code_url: forge.code_url(&item.source_url),
                    status,
                    diagnostics,
                }
            })
            .collect();

        Self {
            cards,
            completed,
            failed,
            total: items.len(),
        }
    }
}
