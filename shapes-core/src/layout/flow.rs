//! Flow layout - fixed columns, members resized to the column width.

use async_trait::async_trait;
use futures::future::join_all;

use super::{
    cell_of, cell_position, cell_width, AlignPass, Layout, LayoutBase, LayoutKind, LayoutOptions,
};
use crate::item::{ItemId, ItemRef};
use crate::ShapesResult;

/// Arranges members row by row in a fixed number of columns.
///
/// Members must support proportional resizing: each one is resized to the
/// cell width with a derived height.
#[derive(Debug)]
pub struct FlowLayout {
    base: LayoutBase,
    columns: usize,
    padding: f32,
    attract: bool,
}

impl FlowLayout {
    /// Create a flow layout for `target`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ShapesError::InvalidLayout`] if `options.columns` is zero.
    pub fn new(target: ItemRef, options: &LayoutOptions) -> ShapesResult<Self> {
        Ok(Self {
            columns: options.validated_columns()?,
            padding: options.padding,
            attract: options.attract,
            base: LayoutBase::new(target, options),
        })
    }

    /// Column count.
    #[must_use]
    pub fn columns(&self) -> usize {
        self.columns
    }

    async fn pass(&self, pass: AlignPass) -> ShapesResult<()> {
        let region = self.base.target_bounds()?;
        let width = cell_width(region.width, self.columns, self.padding);
        tracing::trace!(?pass, cell_width = width, "flow layout pass");

        let mut moves = Vec::new();
        for (index, member) in self.base.members.iter().enumerate() {
            let Some(bounds) = member.bounds() else {
                tracing::warn!(item = %member.id(), "flow member has no bounds, skipped");
                continue;
            };
            let position = cell_position(
                region,
                cell_of(index, self.columns),
                width,
                self.padding,
                bounds.height,
            );
            member.resize_to(width, 0.0);
            moves.push(member.move_animated(position.x, position.y, self.base.animation_speed));
        }
        join_all(moves).await;
        Ok(())
    }
}

#[async_trait(?Send)]
impl Layout for FlowLayout {
    fn kind(&self) -> LayoutKind {
        LayoutKind::FlowLayout
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
        self.pass(AlignPass::Provisional).await?;
        self.pass(AlignPass::Final).await
    }

    async fn end_move(&mut self, item: ItemId) -> ShapesResult<()> {
        if !self.attract || !self.contains(item) {
            return Ok(());
        }
        self.base.created().await;
        self.pass(AlignPass::Final).await
    }
}
