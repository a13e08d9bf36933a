//! Simple exercise - fixed grid, one source per target.
//!
//! Targets fill the top of the stage row by row; sources fill the space
//! below them. Source `i` belongs on target `i`, extra sources are
//! distractors. A released source lands on a free target it overlaps,
//! anchored per [`DropPosition`], or snaps back to its home slot.

use std::time::Duration;

use futures::future::{join_all, try_join_all};
use rand::Rng;

use super::{
    find_drop_target, CheckResult, DropOutcome, ExerciseState, SourceState, TaggedItem, SOLVED_KEY,
};
use crate::config::{DropPosition, SimpleExerciseOptions};
use crate::event::{DragEvent, DragPhase};
use crate::geometry::{Point, Rect};
use crate::item::{ItemFactory, ItemId, ItemKind, ItemOptions, ItemRef};
use crate::model::{AssignmentModel, Condition, ModelDescriptor, SourceId, TargetId};
use crate::storage::Storage;
use crate::utils::{is_permutation, random_permutation};
use crate::{ShapesError, ShapesResult};

/// Storage key of the source shuffle.
pub const SHUFFLE_KEY: &str = "S";
/// Storage key of the per-source target indexes.
pub const INDEXES_KEY: &str = "I";

#[derive(Debug)]
struct SourceSlot {
    tagged: TaggedItem,
    home: Point,
}

/// Drag and drop exercise on a fixed grid.
#[derive(Debug)]
pub struct SimpleExercise {
    model: AssignmentModel,
    options: SimpleExerciseOptions,
    storage: Storage,
    /// The k-th displayed source is source `shuffled[k]`.
    shuffled: Vec<usize>,
    targets: Vec<TaggedItem>,
    /// Sources in display order.
    sources: Vec<SourceSlot>,
    state: ExerciseState,
}

/// Top-left of grid cell `index`.
#[allow(clippy::cast_precision_loss)]
fn grid_position(
    index: usize,
    columns: usize,
    cell_width: f32,
    item_height: f32,
    padding: f32,
    top: f32,
) -> Point {
    let columns = columns.max(1);
    let (col, row) = ((index % columns) as f32, (index / columns) as f32);
    Point::new(
        padding + (cell_width + 2.0 * padding) * col,
        top + padding + (item_height + 2.0 * padding) * row,
    )
}

/// Where a source of size `source` lands inside `target`.
fn drop_anchor(target: Rect, source: Rect, position: DropPosition, padding: f32) -> Point {
    match position {
        DropPosition::TopLeft => Point::new(target.x + padding, target.y + padding),
        DropPosition::BottomLeft => Point::new(
            target.x + padding,
            target.bottom() - source.height - padding,
        ),
        DropPosition::BottomCenter => Point::new(
            target.x + target.width / 2.0 - source.width / 2.0,
            target.bottom() - source.height - padding,
        ),
    }
}

fn bounds_of(item: &ItemRef) -> ShapesResult<Rect> {
    item.bounds()
        .ok_or_else(|| ShapesError::BoundsUnavailable(item.id().to_string()))
}

impl SimpleExercise {
    /// Build the exercise, placing targets and sources on their grids and
    /// restoring persisted placements.
    ///
    /// # Errors
    ///
    /// Fails if an item cannot be created or has no bounds once created.
    pub async fn create<F>(
        factory: &F,
        storage: Storage,
        options: SimpleExerciseOptions,
    ) -> ShapesResult<Self>
    where
        F: ItemFactory + ?Sized,
    {
        Self::create_with_rng(factory, storage, options, &mut rand::rng()).await
    }

    /// Like [`SimpleExercise::create`], shuffling with `rng`.
    ///
    /// # Errors
    ///
    /// See [`SimpleExercise::create`].
    pub async fn create_with_rng<F, R>(
        factory: &F,
        storage: Storage,
        options: SimpleExerciseOptions,
        rng: &mut R,
    ) -> ShapesResult<Self>
    where
        F: ItemFactory + ?Sized,
        R: Rng + ?Sized,
    {
        let source_images = options.sources.paths();
        let target_images = options.targets.paths();
        let (n, m) = (source_images.len(), target_images.len());

        let shuffled = match storage.load::<Vec<usize>>(SHUFFLE_KEY) {
            Some(stored) if is_permutation(&stored, n) => stored,
            stored => {
                if stored.is_some() {
                    tracing::warn!("discarding stale source shuffle");
                }
                let fresh = random_permutation(n, rng);
                storage.store(SHUFFLE_KEY, &fresh)?;
                fresh
            }
        };
        let persisted: Vec<Option<TargetId>> = storage
            .load::<Vec<Option<TargetId>>>(INDEXES_KEY)
            .filter(|indexes| indexes.len() == n)
            .unwrap_or_default();

        let model = AssignmentModel::new(
            ModelDescriptor::new(n, m, (0..n.min(m)).map(|i| (i, vec![i])))
                .with_global_condition(Condition::Any),
        )?;

        let mut exercise = Self {
            model,
            options,
            storage,
            shuffled,
            targets: Vec::with_capacity(m),
            sources: Vec::with_capacity(n),
            state: ExerciseState::Active,
        };

        exercise.create_targets(factory, target_images).await?;
        let top = exercise
            .targets
            .iter()
            .filter_map(|t| t.item.bounds())
            .map(|b| b.bottom())
            .fold(0.0_f32, f32::max);
        exercise
            .create_sources(factory, &source_images, top + exercise.options.zone_padding)
            .await?;
        exercise.restore(&persisted).await?;

        if exercise.is_solved() {
            exercise.lock();
        }
        tracing::info!(targets = m, sources = n, "simple exercise created");
        Ok(exercise)
    }

    async fn create_targets<F>(&mut self, factory: &F, images: Vec<String>) -> ShapesResult<()>
    where
        F: ItemFactory + ?Sized,
    {
        let width = self.options.approx_width();
        for (index, src) in images.into_iter().enumerate() {
            let item = factory.create_item(
                ItemKind::BackgroundImage,
                &ItemOptions {
                    src: Some(src),
                    width,
                    movable: false,
                    ..ItemOptions::default()
                },
            )?;
            self.targets.push(TaggedItem::new(index, item));
        }

        let options = &self.options;
        try_join_all(self.targets.iter().map(|target| async move {
            target.item.created().await;
            let bounds = bounds_of(&target.item)?;
            let p = grid_position(
                target.tag,
                options.cols,
                width,
                bounds.height,
                options.padding,
                0.0,
            );
            target
                .item
                .move_animated(p.x, p.y, options.animation_duration())
                .await;
            Ok::<_, ShapesError>(())
        }))
        .await?;
        Ok(())
    }

    async fn create_sources<F>(
        &mut self,
        factory: &F,
        images: &[String],
        top: f32,
    ) -> ShapesResult<()>
    where
        F: ItemFactory + ?Sized,
    {
        let width = self.options.approx_source_width();
        let columns = self.options.source_columns();
        for (index, &source) in self.shuffled.iter().enumerate() {
            let Some(src) = images.get(source) else {
                continue;
            };
            let item = factory.create_item(
                ItemKind::Draggable,
                &ItemOptions {
                    src: Some(src.clone()),
                    width,
                    label: self.options.debug.then(|| (source + 1).to_string()),
                    label_color: self.options.debug.then(|| "white".to_string()),
                    ..ItemOptions::default()
                },
            )?;
            item.created().await;
            let bounds = bounds_of(&item)?;
            let home = grid_position(
                index,
                columns,
                width,
                bounds.height,
                self.options.padding,
                top,
            );
            self.sources.push(SourceSlot {
                tagged: TaggedItem::new(source, item),
                home,
            });
        }
        Ok(())
    }

    /// Put sources on their persisted targets, everything else home.
    async fn restore(&mut self, persisted: &[Option<TargetId>]) -> ShapesResult<()> {
        let speed = self.speed();
        let mut moves = Vec::with_capacity(self.sources.len());
        for (index, slot) in self.sources.iter().enumerate() {
            let target = persisted
                .get(index)
                .copied()
                .flatten()
                .filter(|&t| t < self.targets.len() && self.model.sources_of(t).is_empty());
            let position = match target {
                Some(t) => {
                    self.model.drop(slot.tagged.tag, t);
                    self.anchor_on(&slot.tagged.item, t)?
                }
                None => slot.home,
            };
            moves.push((slot.tagged.item.clone(), position));
        }
        join_all(
            moves
                .iter()
                .map(|(item, p)| item.move_animated(p.x, p.y, speed)),
        )
        .await;
        Ok(())
    }

    fn speed(&self) -> Duration {
        self.options.animation_duration()
    }

    fn anchor_on(&self, item: &ItemRef, target: usize) -> ShapesResult<Point> {
        let target_bounds = bounds_of(&self.targets[target].item)?;
        let source_bounds = bounds_of(item)?;
        Ok(drop_anchor(
            target_bounds,
            source_bounds,
            self.options.drop_pos,
            self.options.drop_padding,
        ))
    }

    /// The assignment model.
    #[must_use]
    pub fn model(&self) -> &AssignmentModel {
        &self.model
    }

    /// Targets, tagged with their index.
    #[must_use]
    pub fn targets(&self) -> &[TaggedItem] {
        &self.targets
    }

    /// Sources in display order, tagged with their source id.
    pub fn sources(&self) -> impl Iterator<Item = &TaggedItem> {
        self.sources.iter().map(|slot| &slot.tagged)
    }

    /// Display order of the sources.
    #[must_use]
    pub fn shuffled(&self) -> &[usize] {
        &self.shuffled
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> ExerciseState {
        self.state
    }

    /// Host item of source `source`.
    #[must_use]
    pub fn source_item(&self, source: SourceId) -> Option<&ItemRef> {
        self.slot_of(source).map(|slot| &slot.tagged.item)
    }

    /// Home slot of source `source`.
    #[must_use]
    pub fn home_of(&self, source: SourceId) -> Option<Point> {
        self.slot_of(source).map(|slot| slot.home)
    }

    fn slot_of(&self, source: SourceId) -> Option<&SourceSlot> {
        self.sources.iter().find(|slot| slot.tagged.tag == source)
    }

    /// Where source `source` currently is.
    #[must_use]
    pub fn source_state(&self, source: SourceId) -> SourceState {
        if self.state == ExerciseState::Locked {
            return SourceState::Locked;
        }
        self.model
            .target_of(source)
            .map_or(SourceState::Unassigned, SourceState::Assigned)
    }

    /// Route a drag gesture; only releases do anything.
    ///
    /// # Errors
    ///
    /// See [`SimpleExercise::drop_item`].
    pub async fn handle_drag(&mut self, event: DragEvent) -> ShapesResult<DropOutcome> {
        match event.phase {
            DragPhase::End => self.drop_item(event.item).await,
            DragPhase::Begin | DragPhase::Move => Ok(DropOutcome::Ignored),
        }
    }

    /// Resolve a released source: onto the first free target it overlaps
    /// enough, otherwise back home.
    ///
    /// # Errors
    ///
    /// Returns [`ShapesError::BoundsUnavailable`] if the source or target has
    /// no bounds.
    pub async fn drop_item(&mut self, item: ItemId) -> ShapesResult<DropOutcome> {
        if self.state == ExerciseState::Locked {
            return Ok(DropOutcome::Ignored);
        }
        let Some(index) = self.sources.iter().position(|s| s.tagged.item.id() == item) else {
            return Ok(DropOutcome::Ignored);
        };
        let dragged = self.sources[index].tagged.item.clone();
        let tag = self.sources[index].tagged.tag;
        let target = find_drop_target(
            &dragged,
            self.targets.iter().map(|t| &t.item),
            self.options.overlapping_factor,
        );

        self.model.undrop_source(tag);

        match target.filter(|&t| self.model.sources_of(t).is_empty()) {
            Some(t) => {
                self.model.drop(tag, t);
                let p = self.anchor_on(&dragged, t)?;
                dragged.move_animated(p.x, p.y, self.speed()).await;
                tracing::debug!(source = tag, target = t, "dropped");
                Ok(DropOutcome::Dropped { target: t })
            }
            None => {
                let home = self.sources[index].home;
                dragged.move_animated(home.x, home.y, self.speed()).await;
                Ok(DropOutcome::Returned)
            }
        }
    }

    /// Grade the current placement.
    ///
    /// Wrongly placed sources are sent home. `completed` means every target
    /// received a source, right or wrong.
    ///
    /// # Errors
    ///
    /// Currently infallible; returns a `Result` like
    /// [`ComplexExercise::check`](super::ComplexExercise::check).
    pub async fn check(&mut self) -> ShapesResult<CheckResult> {
        let mut completed = true;
        let mut valid = true;
        let mut count = 0;
        let mut wrong = Vec::new();

        for target in &self.targets {
            match self.model.sources_of(target.tag).first() {
                None => completed = false,
                Some(_) if self.model.check_target(target.tag) => count += 1,
                Some(&source) => {
                    valid = false;
                    wrong.push(source);
                }
            }
        }

        let speed = self.speed();
        let mut moves = Vec::with_capacity(wrong.len());
        for source in wrong {
            self.model.undrop_source(source);
            if let Some(slot) = self.slot_of(source) {
                moves.push((slot.tagged.item.clone(), slot.home));
            }
        }
        join_all(
            moves
                .iter()
                .map(|(item, p)| item.move_animated(p.x, p.y, speed)),
        )
        .await;

        let result = CheckResult {
            success: valid && completed,
            valid,
            completed,
            count,
            max_count: self.targets.len(),
        };
        tracing::debug!(?result, "checked");
        Ok(result)
    }

    fn lock(&mut self) {
        for slot in &self.sources {
            slot.tagged.item.set_movable(false);
        }
        self.state = ExerciseState::Locked;
    }

    /// Freeze the exercise and persist the solved flag.
    ///
    /// # Errors
    ///
    /// Fails if the flag cannot be serialized.
    pub fn solve(&mut self) -> ShapesResult<()> {
        self.lock();
        self.storage.store(SOLVED_KEY, &true)?;
        tracing::info!("simple exercise solved");
        Ok(())
    }

    /// Whether the exercise was solved.
    #[must_use]
    pub fn is_solved(&self) -> bool {
        self.storage.load_or(SOLVED_KEY, false)
    }

    /// Persist the shuffle and the target of every displayed source.
    ///
    /// # Errors
    ///
    /// Fails if the state cannot be serialized.
    pub fn persist(&self) -> ShapesResult<()> {
        let indexes: Vec<Option<TargetId>> = self
            .sources
            .iter()
            .map(|slot| self.model.target_of(slot.tagged.tag))
            .collect();
        self.storage.store(SHUFFLE_KEY, &self.shuffled)?;
        self.storage.store(INDEXES_KEY, &indexes)?;
        Ok(())
    }
}
