use std::collections::{BTreeMap, BTreeSet};

use thiserror::Error;

use crate::{CaptureResult, ItemId, WorkItem};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("no work item with id {0}")]
    UnknownItem(ItemId),
    #[error("item {0} already has a result")]
    Duplicate(ItemId),
}

/// Fan-in accumulator for capture results.
///
/// Entries are only ever added. Every key belongs to the item set the state
/// was created with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunState {
    known: BTreeSet<ItemId>,
    completed: BTreeMap<ItemId, CaptureResult>,
}

impl RunState {
    pub fn new(items: &[WorkItem]) -> Self {
        Self {
            known: items.iter().map(|item| item.id.clone()).collect(),
            completed: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, result: CaptureResult) -> Result<(), RecordError> {
        if !self.known.contains(&result.item_id) {
            return Err(RecordError::UnknownItem(result.item_id));
        }
        if self.completed.contains_key(&result.item_id) {
            return Err(RecordError::Duplicate(result.item_id));
        }
        self.completed.insert(result.item_id.clone(), result);
        Ok(())
    }

    pub fn get(&self, item_id: &str) -> Option<&CaptureResult> {
        self.completed.get(item_id)
    }

    pub fn completed(&self) -> &BTreeMap<ItemId, CaptureResult> {
        &self.completed
    }

    pub fn completed_count(&self) -> usize {
        self.completed.len()
    }

    pub fn failed_count(&self) -> usize {
        self.completed.values().filter(|r| !r.succeeded).count()
    }

    pub fn total(&self) -> usize {
        self.known.len()
    }

    pub fn is_complete(&self) -> bool {
        self.completed.len() == self.known.len()
    }
}
