//! Drag and drop exercises.
//!
//! An exercise binds host items to an [`AssignmentModel`](crate::AssignmentModel):
//! sources are dragged onto targets, drops are resolved by overlap, and
//! [`check`](ComplexExercise::check) grades the current assignment.
//!
//! ```text
//!   DragEvent::End ──► find_drop_target ──► model.drop ──► layouts realign
//!                          (overlap ≥ factor · area)
//! ```
//!
//! Two variants exist. [`ComplexExercise`] arranges everything through
//! layouts and supports many sources per target. [`SimpleExercise`] places
//! items on a fixed grid and accepts one source per target.

pub mod complex;
pub mod simple;

use serde::{Deserialize, Serialize};

use crate::item::ItemRef;
use crate::model::TargetId;

pub use complex::ComplexExercise;
pub use simple::SimpleExercise;

/// Storage key of the solved flag.
pub const SOLVED_KEY: &str = "s";

/// A host item correlated with a model id.
#[derive(Debug, Clone)]
pub struct TaggedItem {
    /// Source or target id in the model.
    pub tag: usize,
    /// The host item.
    pub item: ItemRef,
}

impl TaggedItem {
    /// Pair `item` with `tag`.
    #[must_use]
    pub fn new(tag: usize, item: ItemRef) -> Self {
        Self { tag, item }
    }
}

/// Outcome of grading an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    /// `valid && completed`.
    pub success: bool,
    /// No target holds a wrong assignment.
    pub valid: bool,
    /// Every target is filled (the exact meaning differs per variant).
    pub completed: bool,
    /// Correctly filled targets.
    pub count: usize,
    /// Number of targets.
    pub max_count: usize,
}

/// What happened to a released source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropOutcome {
    /// Assigned to a target.
    Dropped {
        /// The receiving target.
        target: TargetId,
    },
    /// Sent back home.
    Returned,
    /// Nothing changed: no qualifying region, a full target, or a locked exercise.
    Ignored,
}

/// Where a source currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceState {
    /// At home.
    Unassigned,
    /// Assigned to a target.
    Assigned(TargetId),
    /// The exercise was solved; nothing moves anymore.
    Locked,
}

/// Lifecycle of an exercise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExerciseState {
    /// Accepting drags.
    #[default]
    Active,
    /// Solved; sources are no longer movable.
    Locked,
}

/// First candidate overlapping `item` by at least `factor` of its own area.
///
/// Candidates are tried in order and the first qualifying one wins; there
/// is no search for the largest overlap. Returns `None` if `item` has no
/// bounds yet.
#[must_use]
pub fn find_drop_target<'a, I>(item: &ItemRef, candidates: I, factor: f32) -> Option<usize>
where
    I: IntoIterator<Item = &'a ItemRef>,
{
    let rect = item.stage_bounds()?;
    let needed = rect.area() * factor;
    candidates.into_iter().position(|candidate| {
        candidate
            .stage_bounds()
            .and_then(|bounds| bounds.intersection(&rect))
            .is_some_and(|overlap| overlap.area() >= needed)
    })
}
