//! Layouts - arrange member items relative to a target region.
//!
//! ```text
//! ┌──────────── target region ────────────┐
//! │ ┌────┐ ┌────┐ ┌────┐   FlowLayout /   │
//! │ │ 0  │ │ 1  │ │ 2  │   GridLayout     │
//! │ └────┘ └────┘ └────┘   (columns)      │
//! │ ┌────┐ ┌────┐                         │
//! │ │ 3  │ │ 4  │          StackLayout    │
//! │ └────┘ └────┘          (end to end)   │
//! └───────────────────────────────────────┘
//! ```
//!
//! Every layout owns an ordered member set. `align()` computes each
//! member's position and drives it there through
//! [`crate::item::DisplayItem::move_animated`], resolving once all members arrived.

pub mod flow;
pub mod grid;
pub mod null;
pub mod stack;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::geometry::{Point, Rect};
use crate::item::{ItemId, ItemRef};
use crate::{ShapesError, ShapesResult};

pub use flow::FlowLayout;
pub use grid::GridLayout;
pub use null::NullLayout;
pub use stack::{HorizontalAnchor, StackAlignment, StackDirection, StackLayout, VerticalAnchor};

/// Default animation duration in milliseconds.
pub const DEFAULT_ANIMATION_SPEED_MS: u64 = 100;

/// Available layout strategies, named as in exercise configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LayoutKind {
    /// Fixed columns, members resized to the cell width.
    #[default]
    FlowLayout,
    /// Like flow, but remembers cells so members can leave and return cheaply.
    GridLayout,
    /// Members laid end to end along one axis.
    StackLayout,
    /// No imposed position; members snap back to where their last drag began.
    NullLayout,
}

impl LayoutKind {
    /// Configuration name of the layout.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FlowLayout => "FlowLayout",
            Self::GridLayout => "GridLayout",
            Self::StackLayout => "StackLayout",
            Self::NullLayout => "NullLayout",
        }
    }
}

impl fmt::Display for LayoutKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LayoutKind {
    type Err = ShapesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::FlowLayout,
            Self::GridLayout,
            Self::StackLayout,
            Self::NullLayout,
        ]
        .into_iter()
        .find(|kind| kind.name() == s)
        .ok_or_else(|| ShapesError::UnknownLayout(s.to_string()))
    }
}

/// Options shared by all layouts; each variant reads the fields it needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutOptions {
    /// Column count (flow and grid).
    pub columns: usize,
    /// Padding between members and around the region.
    pub padding: f32,
    /// Realign when a member is released after a drag.
    pub attract: bool,
    /// Stack alignment keywords, e.g. `"h bottom left"`.
    pub alignment: String,
    /// Duration of each move animation in milliseconds.
    pub animation_speed_ms: u64,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            columns: 1,
            padding: 0.0,
            attract: true,
            alignment: String::new(),
            animation_speed_ms: DEFAULT_ANIMATION_SPEED_MS,
        }
    }
}

impl LayoutOptions {
    /// Animation duration.
    #[must_use]
    pub fn animation_speed(&self) -> Duration {
        Duration::from_millis(self.animation_speed_ms)
    }

    /// Copy with a different animation speed.
    #[must_use]
    pub fn with_animation_speed(mut self, ms: u64) -> Self {
        self.animation_speed_ms = ms;
        self
    }

    pub(crate) fn validated_columns(&self) -> ShapesResult<usize> {
        if self.columns == 0 {
            return Err(ShapesError::InvalidLayout(
                "columns must be at least 1".to_string(),
            ));
        }
        Ok(self.columns)
    }
}

/// A strategy arranging member items relative to a target region.
///
/// Membership changes are synchronous bookkeeping; only the animated moves
/// suspend. Alignment has no cancellation: a newer `align()` issues fresh
/// moves that supersede any still running.
#[async_trait(?Send)]
pub trait Layout: fmt::Debug {
    /// Which strategy this is.
    fn kind(&self) -> LayoutKind;

    /// The region members are laid out in.
    fn target(&self) -> &ItemRef;

    /// Current members, in arrangement order.
    fn members(&self) -> Vec<ItemRef>;

    /// Whether `item` is currently a member.
    fn contains(&self, item: ItemId) -> bool;

    /// Add a member, optionally realigning. No-op for existing members.
    ///
    /// # Errors
    ///
    /// Fails when realigning fails, see [`Layout::align`].
    async fn add(&mut self, item: ItemRef, align: bool) -> ShapesResult<()>;

    /// Remove a member, optionally realigning. No-op for non-members.
    ///
    /// # Errors
    ///
    /// Fails when realigning fails, see [`Layout::align`].
    async fn remove(&mut self, item: &ItemRef, align: bool) -> ShapesResult<()>;

    /// Move every member to its computed position.
    ///
    /// # Errors
    ///
    /// Returns [`ShapesError::BoundsUnavailable`] if the target region has no bounds.
    async fn align(&mut self) -> ShapesResult<()>;

    /// A drag started on `item`.
    fn begin_move(&mut self, _item: ItemId) {}

    /// A drag on `item` was released.
    ///
    /// # Errors
    ///
    /// Fails when snapping the member back fails.
    async fn end_move(&mut self, _item: ItemId) -> ShapesResult<()> {
        Ok(())
    }
}

/// Build a layout of the given kind around `target`.
///
/// # Errors
///
/// Returns [`ShapesError::InvalidLayout`] when the options cannot drive the
/// requested layout (e.g. zero columns).
pub fn create_layout(
    kind: LayoutKind,
    target: ItemRef,
    options: &LayoutOptions,
) -> ShapesResult<Box<dyn Layout>> {
    Ok(match kind {
        LayoutKind::FlowLayout => Box::new(FlowLayout::new(target, options)?),
        LayoutKind::GridLayout => Box::new(GridLayout::new(target, options)?),
        LayoutKind::StackLayout => Box::new(StackLayout::new(target, options)),
        LayoutKind::NullLayout => Box::new(NullLayout::new(target, options)),
    })
}

/// Ordered member set with O(1) containment.
#[derive(Debug, Default)]
pub(crate) struct Members {
    items: Vec<ItemRef>,
    ids: HashSet<ItemId>,
}

impl Members {
    /// Append `item`; returns `false` if it was already a member.
    pub(crate) fn insert(&mut self, item: ItemRef) -> bool {
        if !self.ids.insert(item.id()) {
            return false;
        }
        self.items.push(item);
        true
    }

    /// Remove `item`; returns `false` if it was not a member.
    pub(crate) fn remove(&mut self, item: ItemId) -> bool {
        if !self.ids.remove(&item) {
            return false;
        }
        self.items.retain(|member| member.id() != item);
        true
    }

    pub(crate) fn contains(&self, item: ItemId) -> bool {
        self.ids.contains(&item)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &ItemRef> {
        self.items.iter()
    }

    pub(crate) fn to_vec(&self) -> Vec<ItemRef> {
        self.items.clone()
    }
}

/// State shared by the layouts that keep a plain member list.
#[derive(Debug)]
pub(crate) struct LayoutBase {
    pub(crate) target: ItemRef,
    pub(crate) animation_speed: Duration,
    pub(crate) members: Members,
}

impl LayoutBase {
    pub(crate) fn new(target: ItemRef, options: &LayoutOptions) -> Self {
        Self {
            target,
            animation_speed: options.animation_speed(),
            members: Members::default(),
        }
    }

    /// Resolves once the target and every member are created.
    pub(crate) async fn created(&self) {
        await_created(&self.target, self.members.iter()).await;
    }

    pub(crate) fn target_bounds(&self) -> ShapesResult<Rect> {
        region_bounds(&self.target)
    }
}

/// Resolves once `target` and all `members` are created.
pub(crate) async fn await_created<'a>(
    target: &ItemRef,
    members: impl Iterator<Item = &'a ItemRef>,
) {
    target.created().await;
    join_all(members.map(|member| member.created())).await;
}

pub(crate) fn region_bounds(target: &ItemRef) -> ShapesResult<Rect> {
    target
        .bounds()
        .ok_or_else(|| ShapesError::BoundsUnavailable(target.id().to_string()))
}

/// Column and row of the `index`-th member.
pub(crate) fn cell_of(index: usize, columns: usize) -> (usize, usize) {
    (index % columns, index / columns)
}

/// Width of one column: the region minus outer and inner padding, split evenly.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn cell_width(region_width: f32, columns: usize, padding: f32) -> f32 {
    let columns = columns as f32;
    (region_width - padding - columns * padding) / columns
}

/// Position of the member in the given cell.
///
/// Rows advance by the member's own height, so mixed heights are not packed.
#[allow(clippy::cast_precision_loss)]
pub(crate) fn cell_position(
    region: Rect,
    (col, row): (usize, usize),
    cell_width: f32,
    padding: f32,
    member_height: f32,
) -> Point {
    Point::new(
        region.x + padding + (cell_width + padding) * col as f32,
        region.y + padding + (member_height + padding) * row as f32,
    )
}

/// Alignment pass of the proportional layouts.
///
/// Members are resized to the cell width while aligning, which changes their
/// height; row offsets are only right once a pass runs on resized members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AlignPass {
    /// Rows computed from the heights before resizing.
    Provisional,
    /// Rows computed from the resized heights.
    Final,
}
