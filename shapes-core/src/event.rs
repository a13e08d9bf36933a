//! Drag gestures coming from the host and notifications raised by the model.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;
use crate::item::ItemId;
use crate::model::{SourceId, TargetId};

/// Phase of a drag gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DragPhase {
    /// Pointer pressed on an item, drag started.
    Begin,
    /// Item is being dragged.
    Move,
    /// Pointer released.
    End,
}

/// A drag gesture on a single item.
///
/// A single active pointer drives begin/move/end, so the host delivers these
/// strictly in order for one item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DragEvent {
    /// Phase of this drag event.
    pub phase: DragPhase,
    /// The dragged item.
    pub item: ItemId,
    /// Pointer position in stage coordinates.
    pub position: Point,
}

impl DragEvent {
    /// Create a new drag event.
    #[must_use]
    pub fn new(phase: DragPhase, item: ItemId, position: Point) -> Self {
        Self {
            phase,
            item,
            position,
        }
    }

    /// Drag started on `item`.
    #[must_use]
    pub fn begin(item: ItemId, position: Point) -> Self {
        Self::new(DragPhase::Begin, item, position)
    }

    /// Drag released on `item`.
    #[must_use]
    pub fn end(item: ItemId, position: Point) -> Self {
        Self::new(DragPhase::End, item, position)
    }
}

/// Kind of model notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelEventKind {
    /// A source was assigned to a target.
    Drop,
    /// A source was removed from a target.
    Undrop,
    /// All assignments were reset.
    Clear,
    /// Assignments were bulk-restored.
    Set,
}

/// A notification raised by [`crate::AssignmentModel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEvent {
    /// What happened.
    pub kind: ModelEventKind,
    /// The affected source (`None` for `clear`/`set`).
    pub source: Option<SourceId>,
    /// The affected target (`None` for `clear`/`set`).
    pub target: Option<TargetId>,
}

impl ModelEvent {
    /// A `drop` or `undrop` notification.
    #[must_use]
    pub fn assignment(kind: ModelEventKind, source: SourceId, target: TargetId) -> Self {
        Self {
            kind,
            source: Some(source),
            target: Some(target),
        }
    }

    /// A parameterless notification (`clear`, `set`).
    #[must_use]
    pub fn bare(kind: ModelEventKind) -> Self {
        Self {
            kind,
            source: None,
            target: None,
        }
    }
}
