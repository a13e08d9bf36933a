//! Grid layout - flow arrangement with remembered cells.
//!
//! Until the first `align()` the grid behaves like a flow layout. From then
//! on every member keeps its slot in an arena: removing a member only marks
//! its slot vacant, and adding it back restores the cached cell directly.
//! Members can cycle in and out (as sources do during drag and drop)
//! without the rest of the grid reflowing.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;

use super::{
    await_created, cell_of, cell_position, cell_width, region_bounds, AlignPass, Layout,
    LayoutKind, LayoutOptions,
};
use crate::geometry::Rect;
use crate::item::{ItemId, ItemRef};
use crate::ShapesResult;

#[derive(Debug)]
struct GridSlot {
    item: ItemRef,
    /// Last computed cell, `None` until the slot has been aligned.
    cell: Option<Rect>,
    live: bool,
}

/// Flow layout whose cells survive members leaving and returning.
#[derive(Debug)]
pub struct GridLayout {
    target: ItemRef,
    animation_speed: Duration,
    columns: usize,
    padding: f32,
    attract: bool,
    aligned: bool,
    slots: Vec<GridSlot>,
    index: HashMap<ItemId, usize>,
}

impl GridLayout {
    /// Create a grid layout for `target`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ShapesError::InvalidLayout`] if `options.columns` is zero.
    pub fn new(target: ItemRef, options: &LayoutOptions) -> ShapesResult<Self> {
        Ok(Self {
            target,
            animation_speed: options.animation_speed(),
            columns: options.validated_columns()?,
            padding: options.padding,
            attract: options.attract,
            aligned: false,
            slots: Vec::new(),
            index: HashMap::new(),
        })
    }

    /// Whether the grid has been aligned and now caches cells.
    #[must_use]
    pub fn is_aligned(&self) -> bool {
        self.aligned
    }

    /// Cached cell of `item`, if it was ever aligned.
    #[must_use]
    pub fn cached_cell(&self, item: ItemId) -> Option<Rect> {
        self.index.get(&item).and_then(|&slot| self.slots[slot].cell)
    }

    fn push_slot(&mut self, item: ItemRef) {
        self.index.insert(item.id(), self.slots.len());
        self.slots.push(GridSlot {
            item,
            cell: None,
            live: true,
        });
    }

    fn live_items(&self) -> impl Iterator<Item = &ItemRef> {
        self.slots.iter().filter(|s| s.live).map(|s| &s.item)
    }

    async fn created(&self) {
        await_created(&self.target, self.live_items()).await;
    }

    /// One alignment pass over live slots. Vacant slots keep their place.
    async fn pass(&mut self, pass: AlignPass) -> ShapesResult<()> {
        let region = region_bounds(&self.target)?;
        let width = cell_width(region.width, self.columns, self.padding);
        tracing::trace!(?pass, cell_width = width, "grid layout pass");

        for (index, slot) in self.slots.iter_mut().enumerate() {
            if !slot.live {
                continue;
            }
            let Some(bounds) = slot.item.bounds() else {
                tracing::warn!(item = %slot.item.id(), "grid member has no bounds, skipped");
                continue;
            };
            let position = cell_position(
                region,
                cell_of(index, self.columns),
                width,
                self.padding,
                bounds.height,
            );
            slot.item.resize_to(width, 0.0);
            let resized = slot.item.bounds().unwrap_or(bounds);
            slot.cell = Some(Rect::new(
                position.x,
                position.y,
                resized.width,
                resized.height,
            ));
        }

        let speed = self.animation_speed;
        join_all(
            self.slots
                .iter()
                .filter(|s| s.live)
                .filter_map(|s| s.cell.map(|cell| (s, cell)))
                .map(|(s, cell)| s.item.move_animated(cell.x, cell.y, speed)),
        )
        .await;
        Ok(())
    }

    /// Move a returning member straight to its cached cell.
    async fn restore(&mut self, slot: usize) -> ShapesResult<()> {
        let slot = &mut self.slots[slot];
        slot.live = true;
        if let Some(cell) = slot.cell {
            slot.item.resize_to(cell.width, cell.height);
            slot.item
                .move_animated(cell.x, cell.y, self.animation_speed)
                .await;
        }
        Ok(())
    }
}

#[async_trait(?Send)]
impl Layout for GridLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::GridLayout
    }

    fn target(&self) -> &ItemRef {
        &self.target
    }

    fn members(&self) -> Vec<ItemRef> {
        self.live_items().cloned().collect()
    }

    fn contains(&self, item: ItemId) -> bool {
        self.index
            .get(&item)
            .is_some_and(|&slot| self.slots[slot].live)
    }

    async fn add(&mut self, item: ItemRef, align: bool) -> ShapesResult<()> {
        if let Some(&slot) = self.index.get(&item.id()) {
            if self.slots[slot].live {
                return Ok(());
            }
            return self.restore(slot).await;
        }

        self.push_slot(item);
        if self.aligned {
            // a newcomer has no cached cell yet
            self.created().await;
            self.pass(AlignPass::Final).await?;
        } else if align {
            self.align().await?;
        }
        Ok(())
    }

    async fn remove(&mut self, item: &ItemRef, align: bool) -> ShapesResult<()> {
        let Some(&slot) = self.index.get(&item.id()) else {
            return Ok(());
        };

        if self.aligned {
            self.slots[slot].live = false;
            return Ok(());
        }

        self.slots.remove(slot);
        self.index = self
            .slots
            .iter()
            .enumerate()
            .map(|(i, s)| (s.item.id(), i))
            .collect();
        if align {
            self.align().await?;
        }
        Ok(())
    }

    async fn align(&mut self) -> ShapesResult<()> {
        self.created().await;
        if self.aligned {
            return self.pass(AlignPass::Final).await;
        }
        self.aligned = true;
        self.pass(AlignPass::Provisional).await?;
        self.pass(AlignPass::Final).await
    }

    async fn end_move(&mut self, item: ItemId) -> ShapesResult<()> {
        if !self.attract || !self.contains(item) {
            return Ok(());
        }
        self.created().await;
        self.pass(AlignPass::Final).await
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::headless::HeadlessItem;
    use crate::item::DisplayItem;

    fn grid(columns: usize) -> GridLayout {
        GridLayout::new(
            HeadlessItem::new(Rect::new(0.0, 0.0, 340.0, 200.0)),
            &LayoutOptions {
                columns,
                padding: 10.0,
                ..LayoutOptions::default()
            },
        )
        .expect("valid layout")
    }

    fn member() -> Rc<HeadlessItem> {
        HeadlessItem::new(Rect::new(0.0, 0.0, 50.0, 50.0))
    }

    #[tokio::test]
    async fn test_churn_restores_cached_cell() {
        let mut layout = grid(3);
        let items: Vec<_> = (0..3).map(|_| member()).collect();
        for item in &items {
            layout.add(item.clone(), false).await.expect("add");
        }
        layout.align().await.expect("align");
        assert!(layout.is_aligned());

        let before: Vec<Rect> = items.iter().map(|i| i.bounds().expect("bounds")).collect();
        let moves_before: Vec<usize> = items.iter().map(|i| i.moves().len()).collect();

        let middle: ItemRef = items[1].clone();
        layout.remove(&middle, false).await.expect("remove");
        assert!(!layout.contains(middle.id()));
        assert_eq!(layout.members().len(), 2);

        // dragged away in the meantime
        items[1].set_position(900.0, 900.0);

        layout.add(middle.clone(), false).await.expect("add back");
        assert!(layout.contains(middle.id()));
        assert_eq!(items[1].bounds(), Some(before[1]));

        // neighbours were not moved again
        assert_eq!(items[0].moves().len(), moves_before[0]);
        assert_eq!(items[2].moves().len(), moves_before[2]);
        assert_eq!(items[0].bounds(), Some(before[0]));
        assert_eq!(items[2].bounds(), Some(before[2]));
    }

    #[tokio::test]
    async fn test_vacant_slot_keeps_its_place() {
        let mut layout = grid(3);
        let items: Vec<_> = (0..3).map(|_| member()).collect();
        for item in &items {
            layout.add(item.clone(), false).await.expect("add");
        }
        layout.align().await.expect("align");
        let third = items[2].bounds().expect("bounds");

        let first: ItemRef = items[0].clone();
        layout.remove(&first, false).await.expect("remove");
        layout.align().await.expect("realign");

        assert_eq!(items[2].bounds(), Some(third));
        assert_eq!(layout.cached_cell(first.id()).map(|c| c.x), Some(10.0));
    }

    #[tokio::test]
    async fn test_before_alignment_removal_is_physical() {
        let mut layout = grid(2);
        let a = member();
        let b = member();
        layout.add(a.clone(), false).await.expect("add");
        layout.add(b.clone(), false).await.expect("add");

        let a_ref: ItemRef = a.clone();
        layout.remove(&a_ref, false).await.expect("remove");
        layout.align().await.expect("align");

        // b moved up into the first cell
        assert_eq!(b.bounds().map(|r| r.x), Some(10.0));
        assert!(layout.cached_cell(a.id()).is_none());
    }

    #[tokio::test]
    async fn test_newcomer_after_alignment_gets_a_cell() {
        let mut layout = grid(2);
        let a = member();
        layout.add(a.clone(), true).await.expect("add");
        let b = member();
        layout.add(b.clone(), false).await.expect("add");
        assert!(layout.cached_cell(b.id()).is_some());
        assert!(b.bounds().expect("bounds").x > a.bounds().expect("bounds").x);
    }
}
