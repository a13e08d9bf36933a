//! Visual items - the host-provided objects exercises arrange and drag.
//!
//! The core never renders anything. The surrounding GUI implements
//! [`DisplayItem`] for its visual objects and [`ItemFactory`] to create them.

use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geometry::{Point, Rect};
use crate::ShapesResult;

/// Unique identifier for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemId(Uuid);

impl ItemId {
    /// Create a new unique item ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    #[must_use]
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Shared handle to a display item.
pub type ItemRef = Rc<dyn DisplayItem>;

/// A positioned, sized visual object owned by the host.
///
/// Items are shared between layouts and exercises, so every method takes
/// `&self`; hosts use interior mutability for position and size.
#[async_trait(?Send)]
pub trait DisplayItem: fmt::Debug {
    /// Stable identity of the item.
    fn id(&self) -> ItemId;

    /// Local bounds: current position and size.
    ///
    /// `None` until the item has loaded.
    fn bounds(&self) -> Option<Rect>;

    /// Bounds in stage coordinates, used for overlap tests.
    fn stage_bounds(&self) -> Option<Rect> {
        self.bounds()
    }

    /// Current position.
    fn location(&self) -> Point;

    /// Resize the item. A zero dimension is derived proportionally from the other.
    fn resize_to(&self, width: f32, height: f32);

    /// Animate the item to `(x, y)`, resolving when the transition finishes.
    async fn move_animated(&self, x: f32, y: f32, duration: Duration);

    /// Resolves once the item is fully initialized (assets loaded).
    ///
    /// An item whose assets never load never resolves.
    async fn created(&self);

    /// Enable or disable dragging.
    fn set_movable(&self, movable: bool);
}

/// What kind of visual object to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// A draggable image token.
    Draggable,
    /// A static background image, used as a layout region.
    BackgroundImage,
    /// A plain colored container, used as a layout region.
    BackgroundContainer,
}

/// Creation options for an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemOptions {
    /// Image path, if the item shows an image.
    pub src: Option<String>,
    /// Initial X position.
    pub x: f32,
    /// Initial Y position.
    pub y: f32,
    /// Initial width (0 = natural size).
    pub width: f32,
    /// Initial height (0 = proportional).
    pub height: f32,
    /// Optional label drawn on top of the item.
    pub label: Option<String>,
    /// Label color.
    pub label_color: Option<String>,
    /// Fill color for containers.
    pub color: Option<String>,
    /// Whether the user may drag the item.
    pub movable: bool,
}

impl Default for ItemOptions {
    fn default() -> Self {
        Self {
            src: None,
            x: 0.0,
            y: 0.0,
            width: 0.0,
            height: 0.0,
            label: None,
            label_color: None,
            color: None,
            movable: true,
        }
    }
}

impl ItemOptions {
    /// Region rectangle, when both width and height are given.
    #[must_use]
    pub fn region(&self) -> Option<Rect> {
        (self.width > 0.0 && self.height > 0.0)
            .then(|| Rect::new(self.x, self.y, self.width, self.height))
    }

    /// Item kind for a layout region: an image when `src` is set, a container otherwise.
    #[must_use]
    pub fn region_kind(&self) -> ItemKind {
        if self.src.is_some() {
            ItemKind::BackgroundImage
        } else {
            ItemKind::BackgroundContainer
        }
    }
}

/// Factory for host items.
pub trait ItemFactory {
    /// Create a new item.
    ///
    /// # Errors
    ///
    /// Returns [`ShapesError::ItemCreation`](crate::ShapesError::ItemCreation)
    /// if the host cannot create the item, e.g. an image kind without `src`.
    fn create_item(&self, kind: ItemKind, options: &ItemOptions) -> ShapesResult<ItemRef>;
}
