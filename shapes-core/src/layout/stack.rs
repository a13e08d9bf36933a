//! Stack layout - members laid end to end along one axis.

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};

use super::{Layout, LayoutBase, LayoutKind, LayoutOptions};
use crate::geometry::{Point, Rect};
use crate::item::{ItemId, ItemRef};
use crate::{ShapesError, ShapesResult};

/// Vertical anchor of a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAnchor {
    /// Flush with the top edge (plus padding).
    #[default]
    Top,
    /// Flush with the bottom edge.
    Bottom,
    /// Centered vertically.
    VCenter,
}

/// Horizontal anchor of a stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HorizontalAnchor {
    /// Flush with the left edge (plus padding).
    #[default]
    Left,
    /// Flush with the right edge.
    Right,
    /// Centered horizontally.
    HCenter,
}

/// Axis members are laid along.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StackDirection {
    /// Left to right.
    #[default]
    Horizontal,
    /// Top to bottom.
    Vertical,
}

/// Parsed stack alignment, e.g. `"v bottom hcenter"`.
///
/// Keywords are whitespace separated and order independent. Unknown
/// keywords are ignored. Horizontal wins over vertical. On the cross axis
/// and on a vertical stacking axis, centering wins over an edge and
/// top/left win over bottom/right. A horizontal stack prefers `left` over
/// `hcenter` over `right`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StackAlignment {
    /// Vertical anchor.
    pub vertical: VerticalAnchor,
    /// Horizontal anchor.
    pub horizontal: HorizontalAnchor,
    /// Stacking axis.
    pub direction: StackDirection,
}

impl StackAlignment {
    /// Parse alignment keywords, ignoring unknown ones.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        let has = |keyword: &str| spec.split_whitespace().any(|token| token == keyword);

        let direction = if has("horizontal") || has("h") {
            StackDirection::Horizontal
        } else if has("vertical") || has("v") {
            StackDirection::Vertical
        } else {
            StackDirection::Horizontal
        };
        let vertical = if has("vcenter") {
            VerticalAnchor::VCenter
        } else if has("top") {
            VerticalAnchor::Top
        } else if has("bottom") {
            VerticalAnchor::Bottom
        } else {
            VerticalAnchor::Top
        };
        let horizontal = match direction {
            StackDirection::Horizontal if has("left") => HorizontalAnchor::Left,
            _ if has("hcenter") => HorizontalAnchor::HCenter,
            _ if has("left") => HorizontalAnchor::Left,
            _ if has("right") => HorizontalAnchor::Right,
            _ => HorizontalAnchor::Left,
        };

        Self {
            vertical,
            horizontal,
            direction,
        }
    }

    /// Position of every member given its size, stacked inside `region`.
    #[must_use]
    pub fn positions(&self, region: Rect, sizes: &[(f32, f32)], padding: f32) -> Vec<Point> {
        match self.direction {
            StackDirection::Horizontal => {
                let total: f32 = sizes.iter().map(|(w, _)| w + padding).sum();
                let mut x = match self.horizontal {
                    HorizontalAnchor::Left => region.x + padding,
                    HorizontalAnchor::HCenter => region.x + (region.width - total) / 2.0,
                    HorizontalAnchor::Right => region.x + (region.width - total),
                };
                sizes
                    .iter()
                    .map(|&(w, h)| {
                        let y = match self.vertical {
                            VerticalAnchor::VCenter => region.y + (region.height - h) / 2.0,
                            VerticalAnchor::Top => region.y + padding,
                            VerticalAnchor::Bottom => region.y + region.height - h - padding,
                        };
                        let point = Point::new(x, y);
                        x += w + padding;
                        point
                    })
                    .collect()
            }
            StackDirection::Vertical => {
                let total: f32 = sizes.iter().map(|(_, h)| h + padding).sum();
                let mut y = match self.vertical {
                    VerticalAnchor::Top => region.y + padding,
                    VerticalAnchor::VCenter => region.y + (region.height - total) / 2.0,
                    VerticalAnchor::Bottom => region.y + (region.height - total),
                };
                sizes
                    .iter()
                    .map(|&(w, h)| {
                        let x = match self.horizontal {
                            HorizontalAnchor::HCenter => region.x + (region.width - w) / 2.0,
                            HorizontalAnchor::Left => region.x + padding,
                            HorizontalAnchor::Right => region.x + region.width - w - padding,
                        };
                        let point = Point::new(x, y);
                        y += h + padding;
                        point
                    })
                    .collect()
            }
        }
    }
}

impl FromStr for StackAlignment {
    type Err = ShapesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

impl fmt::Display for StackAlignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let direction = match self.direction {
            StackDirection::Horizontal => "horizontal",
            StackDirection::Vertical => "vertical",
        };
        let vertical = match self.vertical {
            VerticalAnchor::Top => "top",
            VerticalAnchor::Bottom => "bottom",
            VerticalAnchor::VCenter => "vcenter",
        };
        let horizontal = match self.horizontal {
            HorizontalAnchor::Left => "left",
            HorizontalAnchor::Right => "right",
            HorizontalAnchor::HCenter => "hcenter",
        };
        write!(f, "{direction} {vertical} {horizontal}")
    }
}

/// Lays members end to end, anchored inside the target region.
///
/// Members keep their own size.
#[derive(Debug)]
pub struct StackLayout {
    base: LayoutBase,
    alignment: StackAlignment,
    padding: f32,
    attract: bool,
}

impl StackLayout {
    /// Create a stack layout for `target`.
    #[must_use]
    pub fn new(target: ItemRef, options: &LayoutOptions) -> Self {
        Self {
            alignment: StackAlignment::parse(&options.alignment),
            padding: options.padding,
            attract: options.attract,
            base: LayoutBase::new(target, options),
        }
    }

    /// Parsed alignment.
    #[must_use]
    pub fn alignment(&self) -> StackAlignment {
        self.alignment
    }
}

#[async_trait(?Send)]
impl Layout for StackLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::StackLayout
    }

    fn target(&self) -> &ItemRef {
        &self.base.target
    }

    fn members(&self) -> Vec<ItemRef> {
        self.base.members.to_vec()
    }

    fn contains(&self, item: ItemId) -> bool {
        self.base.members.contains(item)
    }

    async fn add(&mut self, item: ItemRef, align: bool) -> ShapesResult<()> {
        if self.base.members.insert(item) && align {
            self.align().await?;
        }
        Ok(())
    }

    async fn remove(&mut self, item: &ItemRef, align: bool) -> ShapesResult<()> {
        if self.base.members.remove(item.id()) && align {
            self.align().await?;
        }
        Ok(())
    }

    async fn align(&mut self) -> ShapesResult<()> {
        self.base.created().await;
        let region = self.base.target_bounds()?;

        let members: Vec<(&ItemRef, Rect)> = self
            .base
            .members
            .iter()
            .filter_map(|member| match member.bounds() {
                Some(bounds) => Some((member, bounds)),
                None => {
                    tracing::warn!(item = %member.id(), "stack member has no bounds, skipped");
                    None
                }
            })
            .collect();
        let sizes: Vec<(f32, f32)> = members.iter().map(|(_, b)| (b.width, b.height)).collect();
        let positions = self.alignment.positions(region, &sizes, self.padding);

        let speed = self.base.animation_speed;
        join_all(
            members
                .iter()
                .zip(positions)
                .map(|((member, _), p)| member.move_animated(p.x, p.y, speed)),
        )
        .await;
        Ok(())
    }

    async fn end_move(&mut self, item: ItemId) -> ShapesResult<()> {
        if self.attract && self.contains(item) {
            self.align().await?;
        }
        Ok(())
    }
}
