//! Null layout - members stay wherever their last drag started.

use std::collections::HashMap;

use async_trait::async_trait;
use futures::future::join_all;

use super::{Layout, LayoutBase, LayoutKind, LayoutOptions};
use crate::geometry::Point;
use crate::item::{ItemId, ItemRef};
use crate::ShapesResult;

/// Imposes no arrangement; aligning snaps members back to where their last
/// drag began. Members that were never dragged stay put.
#[derive(Debug)]
pub struct NullLayout {
    base: LayoutBase,
    attract: bool,
    /// Drag start positions. Entries outlive membership.
    origins: HashMap<ItemId, Point>,
}

impl NullLayout {
    /// Create a null layout for `target`.
    #[must_use]
    pub fn new(target: ItemRef, options: &LayoutOptions) -> Self {
        Self {
            attract: options.attract,
            base: LayoutBase::new(target, options),
            origins: HashMap::new(),
        }
    }

    /// Where the last drag of `item` started, if it was dragged as a member.
    #[must_use]
    pub fn origin_of(&self, item: ItemId) -> Option<Point> {
        self.origins.get(&item).copied()
    }
}

#[async_trait(?Send)]
impl Layout for NullLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::NullLayout
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
        let speed = self.base.animation_speed;
        let origins = &self.origins;
        join_all(self.base.members.iter().filter_map(|member| {
            origins
                .get(&member.id())
                .map(|p| member.move_animated(p.x, p.y, speed))
        }))
        .await;
        Ok(())
    }

    fn begin_move(&mut self, item: ItemId) {
        let Some(member) = self.base.members.iter().find(|m| m.id() == item) else {
            return;
        };
        self.origins.insert(item, member.location());
    }

    async fn end_move(&mut self, item: ItemId) -> ShapesResult<()> {
        if self.attract && self.contains(item) {
            self.align().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Rect;
    use crate::headless::HeadlessItem;
    use crate::item::DisplayItem;

    fn layout(attract: bool) -> NullLayout {
        NullLayout::new(
            HeadlessItem::new(Rect::new(0.0, 0.0, 400.0, 400.0)),
            &LayoutOptions {
                attract,
                ..LayoutOptions::default()
            },
        )
    }

    #[tokio::test]
    async fn test_align_without_drag_moves_nothing() {
        let mut layout = layout(true);
        let item = HeadlessItem::new(Rect::new(30.0, 40.0, 10.0, 10.0));
        layout.add(item.clone(), true).await.expect("add");
        assert!(item.moves().is_empty());
        assert_eq!(item.location(), Point::new(30.0, 40.0));
    }

    #[tokio::test]
    async fn test_release_snaps_back_to_drag_start() {
        let mut layout = layout(true);
        let item = HeadlessItem::new(Rect::new(30.0, 40.0, 10.0, 10.0));
        layout.add(item.clone(), false).await.expect("add");

        layout.begin_move(item.id());
        item.set_position(300.0, 300.0);
        layout.end_move(item.id()).await.expect("end move");

        assert_eq!(item.location(), Point::new(30.0, 40.0));
        assert_eq!(layout.origin_of(item.id()), Some(Point::new(30.0, 40.0)));
    }

    #[tokio::test]
    async fn test_non_members_are_not_tracked() {
        let mut layout = layout(false);
        let stranger = HeadlessItem::new(Rect::new(1.0, 2.0, 10.0, 10.0));
        layout.begin_move(stranger.id());
        assert!(layout.origin_of(stranger.id()).is_none());

        let member = HeadlessItem::new(Rect::new(1.0, 2.0, 10.0, 10.0));
        layout.add(member.clone(), false).await.expect("add");
        layout.begin_move(member.id());
        member.set_position(9.0, 9.0);
        layout.end_move(member.id()).await.expect("end move");
        // no attraction
        assert_eq!(member.location(), Point::new(9.0, 9.0));
    }
}
