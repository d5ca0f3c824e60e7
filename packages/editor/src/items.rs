//! Embedded chart rows and the single-chart draft.

use crate::session::{Epoch, Ticket};
use dashsync_common::{EntityRef, Item};
use dashsync_patch::Operation;

/// One position of the embedded collection
#[derive(Debug, Clone, PartialEq)]
pub enum ItemSlot {
    Loaded(Item),

    /// The fetch for this chart failed; the row is flagged, not dropped
    Failed { reference: EntityRef, reason: String },
}

impl ItemSlot {
    pub fn id(&self) -> &str {
        match self {
            ItemSlot::Loaded(item) => &item.id,
            ItemSlot::Failed { reference, .. } => &reference.id,
        }
    }

    pub fn item(&self) -> Option<&Item> {
        match self {
            ItemSlot::Loaded(item) => Some(item),
            ItemSlot::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ItemSlot::Failed { .. })
    }
}

/// Edit scoped to exactly one chart, addressed by collection index
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDraft {
    pub item_id: String,
    pub index: usize,
    pub draft: Item,
}

/// A chart patch waiting on the store
#[derive(Debug, Clone, PartialEq)]
pub struct ItemSubmission {
    pub ticket: Ticket,
    pub epoch: Epoch,
    pub aggregate_id: String,
    pub item_id: String,
    pub index: usize,
    pub ops: Vec<Operation>,
}
