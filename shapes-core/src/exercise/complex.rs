//! Complex exercise - layouts everywhere, many sources per target.

use futures::future::{try_join_all, LocalBoxFuture};
use rand::Rng;

use super::{
    find_drop_target, CheckResult, DropOutcome, ExerciseState, SourceState, TaggedItem, SOLVED_KEY,
};
use crate::config::{ComplexExerciseOptions, Permute};
use crate::event::{DragEvent, DragPhase, ModelEvent, ModelEventKind};
use crate::geometry::Point;
use crate::item::{ItemFactory, ItemId, ItemKind, ItemOptions, ItemRef};
use crate::layout::{create_layout, Layout};
use crate::model::{AssignmentModel, AssignmentResult, ModelDescriptor, SourceId, SubscriptionId};
use crate::storage::Storage;
use crate::utils::{identity_permutation, is_permutation, permuted, random_permutation};
use crate::{ShapesError, ShapesResult};

/// Storage key of the model result.
pub const RESULT_KEY: &str = "R";
/// Storage key of the source permutation.
pub const PERMUTATION_KEY: &str = "P";

/// Height kept free below a randomly placed item inside its region.
const PLACEMENT_MARGIN: f32 = 20.0;

/// Drag and drop exercise driven entirely by layouts.
///
/// Targets sit in the target layout, each owning an inner layout for the
/// sources dropped onto it. Sources start in the source layout, their home.
/// A source is always a member of exactly one of these layouts.
#[derive(Debug)]
pub struct ComplexExercise {
    model: AssignmentModel,
    options: ComplexExerciseOptions,
    storage: Storage,
    permutation: Vec<usize>,
    target_region: ItemRef,
    source_region: ItemRef,
    target_layout: Box<dyn Layout>,
    source_layout: Box<dyn Layout>,
    targets: Vec<TaggedItem>,
    /// Inner layout per target, same order as `targets`.
    inner_layouts: Vec<Box<dyn Layout>>,
    /// Sources in display order.
    sources: Vec<TaggedItem>,
    state: ExerciseState,
}

impl ComplexExercise {
    /// Build the exercise: create every item, align the layouts and restore
    /// any persisted assignment.
    ///
    /// Resolves once all items are created and positioned. An item whose
    /// assets never load keeps this pending.
    ///
    /// # Errors
    ///
    /// Fails on a malformed model descriptor, image lists that do not match
    /// the model, invalid layout options or an item the host cannot create.
    pub async fn create<F>(
        factory: &F,
        storage: Storage,
        descriptor: ModelDescriptor,
        options: ComplexExerciseOptions,
    ) -> ShapesResult<Self>
    where
        F: ItemFactory + ?Sized,
    {
        Self::create_with_rng(factory, storage, descriptor, options, &mut rand::rng()).await
    }

    /// Like [`ComplexExercise::create`], drawing the permutation and initial
    /// placement from `rng`.
    ///
    /// # Errors
    ///
    /// See [`ComplexExercise::create`].
    pub async fn create_with_rng<F, R>(
        factory: &F,
        storage: Storage,
        descriptor: ModelDescriptor,
        options: ComplexExerciseOptions,
        rng: &mut R,
    ) -> ShapesResult<Self>
    where
        F: ItemFactory + ?Sized,
        R: Rng + ?Sized,
    {
        let mut model = AssignmentModel::new(descriptor)?;
        let target_images = options.target_images.paths();
        let source_images = options.source_images.paths();
        if source_images.len() != model.source_count() {
            return Err(ShapesError::InvalidOptions(format!(
                "{} source images for {} sources",
                source_images.len(),
                model.source_count()
            )));
        }
        if target_images.len() > model.target_count() {
            return Err(ShapesError::InvalidOptions(format!(
                "{} target images for {} targets",
                target_images.len(),
                model.target_count()
            )));
        }

        if let Some(result) = storage.load::<AssignmentResult>(RESULT_KEY) {
            if let Err(e) = model.set(result) {
                tracing::warn!("discarding persisted result: {e}");
            }
        }
        let permutation =
            Self::load_permutation(&storage, options.permute, model.source_count(), rng);

        let [target_options, source_options, inner_options] = options.effective_layout_options();

        // targets
        let region_options = &options.target_layout_shape_options;
        let target_region = factory.create_item(region_options.region_kind(), region_options)?;
        let mut target_layout =
            create_layout(options.target_layout, target_region.clone(), &target_options)?;

        let mut targets = Vec::with_capacity(target_images.len());
        let mut inner_layouts = Vec::with_capacity(target_images.len());
        for (index, src) in target_images.into_iter().enumerate() {
            let position =
                initial_position(&options, region_options, options.target_image_width, rng);
            let item = factory.create_item(
                ItemKind::Draggable,
                &ItemOptions {
                    src: Some(src),
                    x: position.x,
                    y: position.y,
                    width: options.target_image_width,
                    height: options.target_image_height,
                    label: options.debug.then(|| model.expects_to_string(index)),
                    label_color: Some(options.target_label_color.clone()),
                    color: None,
                    movable: false,
                },
            )?;
            item.set_movable(false);
            target_layout.add(item.clone(), false).await?;
            inner_layouts.push(create_layout(
                options.target_inner_layout,
                item.clone(),
                &inner_options,
            )?);
            targets.push(TaggedItem::new(index, item));
        }
        target_layout.align().await?;

        // sources
        let region_options = &options.source_layout_shape_options;
        let source_region = factory.create_item(region_options.region_kind(), region_options)?;
        let mut source_layout =
            create_layout(options.source_layout, source_region.clone(), &source_options)?;

        let mut sources = Vec::with_capacity(source_images.len());
        for (_, original, src) in permuted(&source_images, &permutation) {
            let position =
                initial_position(&options, region_options, options.source_image_width, rng);
            let item = factory.create_item(
                ItemKind::Draggable,
                &ItemOptions {
                    src: Some(src.clone()),
                    x: position.x,
                    y: position.y,
                    width: options.source_image_width,
                    height: options.source_image_height,
                    label: options.debug.then(|| original.to_string()),
                    label_color: Some(options.source_label_color.clone()),
                    color: None,
                    movable: true,
                },
            )?;
            source_layout.add(item.clone(), false).await?;
            sources.push(TaggedItem::new(original, item));
        }
        source_layout.align().await?;

        let mut exercise = Self {
            model,
            options,
            storage,
            permutation,
            target_region,
            source_region,
            target_layout,
            source_layout,
            targets,
            inner_layouts,
            sources,
            state: ExerciseState::Active,
        };
        exercise.restore().await?;
        if exercise.is_solved() {
            exercise.lock();
        }

        tracing::info!(
            targets = exercise.targets.len(),
            sources = exercise.sources.len(),
            solved = exercise.is_solved(),
            "complex exercise created"
        );
        Ok(exercise)
    }

    fn load_permutation<R: Rng + ?Sized>(
        storage: &Storage,
        permute: Permute,
        len: usize,
        rng: &mut R,
    ) -> Vec<usize> {
        if let Some(stored) = storage.load::<Vec<usize>>(PERMUTATION_KEY) {
            if is_permutation(&stored, len) {
                return stored;
            }
            tracing::warn!(
                stored = stored.len(),
                expected = len,
                "discarding stale source permutation"
            );
        }
        match permute {
            Permute::Identity => identity_permutation(len),
            Permute::Random => random_permutation(len, rng),
        }
    }

    /// The assignment model.
    #[must_use]
    pub fn model(&self) -> &AssignmentModel {
        &self.model
    }

    /// Options the exercise was built with.
    #[must_use]
    pub fn options(&self) -> &ComplexExerciseOptions {
        &self.options
    }

    /// Targets, tagged with their target id.
    #[must_use]
    pub fn targets(&self) -> &[TaggedItem] {
        &self.targets
    }

    /// Sources in display order, tagged with their source id.
    #[must_use]
    pub fn sources(&self) -> &[TaggedItem] {
        &self.sources
    }

    /// Display order: the k-th displayed source is source `permutation[k]`.
    #[must_use]
    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    /// Region holding the targets.
    #[must_use]
    pub fn target_region(&self) -> &ItemRef {
        &self.target_region
    }

    /// Region holding the sources at home.
    #[must_use]
    pub fn source_region(&self) -> &ItemRef {
        &self.source_region
    }

    /// Layout arranging the targets.
    #[must_use]
    pub fn target_layout(&self) -> &dyn Layout {
        self.target_layout.as_ref()
    }

    /// Layout arranging the sources at home.
    #[must_use]
    pub fn source_layout(&self) -> &dyn Layout {
        self.source_layout.as_ref()
    }

    /// Inner layout of the target at `index`.
    #[must_use]
    pub fn inner_layout(&self, index: usize) -> Option<&dyn Layout> {
        self.inner_layouts.get(index).map(AsRef::as_ref)
    }

    /// Lifecycle state.
    #[must_use]
    pub fn state(&self) -> ExerciseState {
        self.state
    }

    /// Host item of source `source`.
    #[must_use]
    pub fn source_item(&self, source: SourceId) -> Option<&ItemRef> {
        self.sources
            .iter()
            .find(|s| s.tag == source)
            .map(|s| &s.item)
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

    /// Observe model changes.
    pub fn subscribe<H>(&mut self, kind: ModelEventKind, handler: H) -> SubscriptionId
    where
        H: FnMut(&ModelEvent) + 'static,
    {
        self.model.subscribe(kind, handler)
    }

    /// Stop observing model changes.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.model.unsubscribe(id)
    }

    fn display_index(&self, item: ItemId) -> Option<usize> {
        self.sources.iter().position(|s| s.item.id() == item)
    }

    /// Route a drag gesture.
    ///
    /// Begin snapshots positions in the layouts holding the item. End runs
    /// drop resolution, then lets the owning layout attract the item back.
    /// Gestures on unknown items or on a locked exercise are ignored.
    ///
    /// # Errors
    ///
    /// Propagates layout failures, e.g. a region without bounds.
    pub async fn handle_drag(&mut self, event: DragEvent) -> ShapesResult<DropOutcome> {
        if self.state == ExerciseState::Locked || self.display_index(event.item).is_none() {
            return Ok(DropOutcome::Ignored);
        }
        match event.phase {
            DragPhase::Begin => {
                for layout in self.layouts_mut() {
                    if layout.contains(event.item) {
                        layout.begin_move(event.item);
                    }
                }
                Ok(DropOutcome::Ignored)
            }
            DragPhase::Move => Ok(DropOutcome::Ignored),
            DragPhase::End => {
                let outcome = self.try_drop(event.item, None).await?;
                for layout in self.layouts_mut() {
                    layout.end_move(event.item).await?;
                }
                Ok(outcome)
            }
        }
    }

    fn layouts_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Layout>> {
        std::iter::once(&mut self.source_layout).chain(self.inner_layouts.iter_mut())
    }

    /// Drop a source onto a target.
    ///
    /// With `target` set, the source goes onto the target at that index.
    /// Otherwise a source released over its home region goes home, and any
    /// other source goes onto the first target it overlaps enough.
    ///
    /// # Errors
    ///
    /// Propagates layout failures.
    pub async fn try_drop(
        &mut self,
        item: ItemId,
        target: Option<usize>,
    ) -> ShapesResult<DropOutcome> {
        if self.state == ExerciseState::Locked {
            return Ok(DropOutcome::Ignored);
        }
        let Some(index) = self.display_index(item) else {
            return Ok(DropOutcome::Ignored);
        };
        let factor = self.options.overlapping_factor;
        let dragged = self.sources[index].item.clone();

        if target.is_none()
            && !self.source_layout.contains(item)
            && find_drop_target(&dragged, [&self.source_region], factor).is_some()
        {
            self.undrop_sources(&[index]).await?;
            return Ok(DropOutcome::Returned);
        }

        let Some(target_index) = target.or_else(|| {
            find_drop_target(&dragged, self.targets.iter().map(|t| &t.item), factor)
        }) else {
            return Ok(DropOutcome::Ignored);
        };
        let Some(target_tag) = self.targets.get(target_index).map(|t| t.tag) else {
            return Err(ShapesError::ItemNotFound(format!("target {target_index}")));
        };

        let source_tag = self.sources[index].tag;
        if !self.options.multi_drop && !self.model.can_drop(source_tag, target_tag) {
            tracing::debug!(source = source_tag, target = target_tag, "drop rejected");
            return Ok(DropOutcome::Ignored);
        }

        self.model.drop(source_tag, target_tag);
        tracing::debug!(source = source_tag, target = target_tag, "dropped");
        self.relocate(&[index], Some(target_index)).await?;
        Ok(DropOutcome::Dropped { target: target_tag })
    }

    async fn undrop_sources(&mut self, indexes: &[usize]) -> ShapesResult<()> {
        for &index in indexes {
            let tag = self.sources[index].tag;
            self.model.undrop_source(tag);
            tracing::debug!(source = tag, "returned home");
        }
        self.relocate(indexes, None).await
    }

    /// Move sources into the inner layout of `destination`, or home when
    /// `None`. Every layout that changed is realigned, concurrently.
    async fn relocate(&mut self, indexes: &[usize], destination: Option<usize>) -> ShapesResult<()> {
        let items: Vec<ItemRef> = indexes
            .iter()
            .map(|&index| self.sources[index].item.clone())
            .collect();
        let Self {
            source_layout,
            inner_layouts,
            ..
        } = self;

        let mut changed: Vec<&mut Box<dyn Layout>> = Vec::new();

        let mut home_changed = false;
        for item in &items {
            match destination {
                Some(_) if source_layout.contains(item.id()) => {
                    source_layout.remove(item, false).await?;
                    home_changed = true;
                }
                Some(_) => {}
                None => {
                    source_layout.add(item.clone(), false).await?;
                    home_changed = true;
                }
            }
        }
        if home_changed {
            changed.push(source_layout);
        }

        for (index, layout) in inner_layouts.iter_mut().enumerate() {
            let mut touched = false;
            for item in &items {
                if layout.contains(item.id()) {
                    layout.remove(item, false).await?;
                    touched = true;
                }
                if destination == Some(index) {
                    layout.add(item.clone(), false).await?;
                    touched = true;
                }
            }
            if touched {
                changed.push(layout);
            }
        }

        let alignments: Vec<LocalBoxFuture<'_, ShapesResult<()>>> =
            changed.into_iter().map(|layout| layout.align()).collect();
        try_join_all(alignments).await?;
        Ok(())
    }

    /// Re-apply the model's assignments visually.
    ///
    /// # Errors
    ///
    /// Propagates layout failures.
    pub async fn restore(&mut self) -> ShapesResult<()> {
        for index in 0..self.sources.len() {
            let tag = self.sources[index].tag;
            let Some(target) = self.model.target_of(tag) else {
                continue;
            };
            let Some(target_index) = self.targets.iter().position(|t| t.tag == target) else {
                continue;
            };
            let item = self.sources[index].item.id();
            self.model.undrop_source(tag);
            self.try_drop(item, Some(target_index)).await?;
        }
        Ok(())
    }

    /// Grade the current assignment.
    ///
    /// Sources that are wrong on a target failing its check are sent home,
    /// one at a time, so later sources are judged without the ones already
    /// removed. This resolves after they arrived. `completed` equals `valid`
    /// here.
    ///
    /// # Errors
    ///
    /// Propagates layout failures.
    pub async fn check(&mut self) -> ShapesResult<CheckResult> {
        let mut valid = true;
        let mut count = 0;
        let mut returns = Vec::new();

        for target in &self.targets {
            if self.model.check_target(target.tag) {
                count += 1;
                continue;
            }
            valid = false;
            // an "any" target re-evaluates after every removal
            let assigned = self.model.sources_of(target.tag).to_vec();
            for source in assigned {
                if self.model.check_source(source) {
                    continue;
                }
                self.model.undrop(source, target.tag);
                match self.sources.iter().position(|s| s.tag == source) {
                    Some(index) => {
                        tracing::debug!(source, "returned home");
                        returns.push(index);
                    }
                    None => {
                        tracing::warn!(source, target = target.tag, "invalid source id in result");
                    }
                }
            }
        }

        if !returns.is_empty() {
            self.relocate(&returns, None).await?;
        }

        let max_count = self.targets.len();
        let completed = valid && count == max_count;
        let result = CheckResult {
            success: valid && completed,
            valid,
            completed,
            count,
            max_count,
        };
        tracing::debug!(?result, "checked");
        Ok(result)
    }

    fn lock(&mut self) {
        for source in &self.sources {
            source.item.set_movable(false);
        }
        self.state = ExerciseState::Locked;
    }

    /// Freeze the exercise: sources stop being movable and the solved flag
    /// is persisted.
    ///
    /// # Errors
    ///
    /// Fails if the flag cannot be serialized.
    pub fn solve(&mut self) -> ShapesResult<()> {
        self.lock();
        self.storage.store(SOLVED_KEY, &true)?;
        tracing::info!("complex exercise solved");
        Ok(())
    }

    /// Whether the exercise was solved, in this or an earlier session.
    #[must_use]
    pub fn is_solved(&self) -> bool {
        self.storage.load_or(SOLVED_KEY, false)
    }

    /// Persist the model result and the source permutation.
    ///
    /// # Errors
    ///
    /// Fails if the state cannot be serialized.
    pub fn persist(&self) -> ShapesResult<()> {
        self.storage.store(RESULT_KEY, self.model.result())?;
        self.storage.store(PERMUTATION_KEY, &self.permutation)?;
        Ok(())
    }
}

/// Random start inside the region if it has a size, anywhere on stage otherwise.
fn initial_position<R: Rng + ?Sized>(
    options: &ComplexExerciseOptions,
    region: &ItemOptions,
    width: f32,
    rng: &mut R,
) -> Point {
    let (a, b): (f32, f32) = (rng.random(), rng.random());
    match region.region() {
        Some(rect) => Point::new(
            rect.x + a * (rect.width - width).max(0.0),
            rect.y + b * (rect.height - PLACEMENT_MARGIN).max(0.0),
        ),
        None => Point::new(a * options.stage_width, b * options.stage_height),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::config::ImageList;
    use crate::headless::HeadlessFactory;
    use crate::layout::{LayoutKind, LayoutOptions};
    use crate::model::Condition;
    use crate::storage::MemoryStore;

    fn region(x: f32, y: f32, width: f32, height: f32) -> ItemOptions {
        ItemOptions {
            x,
            y,
            width,
            height,
            movable: false,
            ..ItemOptions::default()
        }
    }

    fn options(sources: usize, targets: usize) -> ComplexExerciseOptions {
        let images = |prefix: &str, n: usize| -> ImageList {
            (0..n).map(|i| format!("{prefix}{i}.png")).collect::<Vec<_>>().into()
        };
        ComplexExerciseOptions {
            permute: Permute::Identity,
            target_layout: LayoutKind::FlowLayout,
            target_layout_options: LayoutOptions {
                columns: targets.max(1),
                padding: 10.0,
                ..LayoutOptions::default()
            },
            source_layout: LayoutKind::GridLayout,
            source_layout_options: LayoutOptions {
                columns: sources.max(1),
                padding: 10.0,
                ..LayoutOptions::default()
            },
            target_layout_shape_options: region(0.0, 0.0, 600.0, 300.0),
            source_layout_shape_options: region(0.0, 400.0, 600.0, 200.0),
            target_images: images("t", targets),
            source_images: images("s", sources),
            ..ComplexExerciseOptions::default()
        }
    }

    async fn build(storage: Storage) -> (HeadlessFactory, ComplexExercise) {
        let factory = HeadlessFactory::new();
        let exercise = ComplexExercise::create_with_rng(
            &factory,
            storage,
            ModelDescriptor::identity(2),
            options(2, 2),
            &mut StdRng::seed_from_u64(1),
        )
        .await
        .expect("exercise");
        (factory, exercise)
    }

    #[tokio::test]
    async fn test_creation_tags_and_layout_membership() {
        let (_, exercise) = build(Storage::in_memory("ex")).await;
        assert_eq!(exercise.targets().len(), 2);
        assert_eq!(exercise.permutation(), &[0, 1]);
        for source in exercise.sources() {
            assert!(exercise.source_layout().contains(source.item.id()));
            assert_eq!(exercise.source_state(source.tag), SourceState::Unassigned);
        }
    }

    #[tokio::test]
    async fn test_explicit_drop_and_check() {
        let (_, mut exercise) = build(Storage::in_memory("ex")).await;
        let s0 = exercise.source_item(0).expect("source").id();
        let s1 = exercise.source_item(1).expect("source").id();

        let outcome = exercise.try_drop(s0, Some(1)).await.expect("drop");
        assert_eq!(outcome, DropOutcome::Dropped { target: 1 });
        assert!(!exercise.source_layout().contains(s0));
        assert!(exercise.inner_layout(1).expect("inner").contains(s0));

        // target 1 is full
        let outcome = exercise.try_drop(s1, Some(1)).await.expect("drop");
        assert_eq!(outcome, DropOutcome::Ignored);

        let result = exercise.check().await.expect("check");
        assert!(!result.valid && !result.completed && !result.success);
        assert_eq!(result.count, 0);
        assert_eq!(result.max_count, 2);
        // the wrong source was sent home
        assert!(exercise.source_layout().contains(s0));
        assert_eq!(exercise.source_state(0), SourceState::Unassigned);

        exercise.try_drop(s0, Some(0)).await.expect("drop");
        exercise.try_drop(s1, Some(1)).await.expect("drop");
        let result = exercise.check().await.expect("check");
        assert!(result.success);
        assert_eq!(result.count, 2);
    }

    #[tokio::test]
    async fn test_multi_drop_ignores_capacity() {
        let factory = HeadlessFactory::new();
        let mut exercise = ComplexExercise::create_with_rng(
            &factory,
            Storage::in_memory("ex"),
            ModelDescriptor::identity(2),
            ComplexExerciseOptions {
                multi_drop: true,
                ..options(2, 2)
            },
            &mut StdRng::seed_from_u64(1),
        )
        .await
        .expect("exercise");

        let s0 = exercise.source_item(0).expect("source").id();
        let s1 = exercise.source_item(1).expect("source").id();
        exercise.try_drop(s0, Some(0)).await.expect("drop");
        let outcome = exercise.try_drop(s1, Some(0)).await.expect("drop");
        assert_eq!(outcome, DropOutcome::Dropped { target: 0 });
        assert_eq!(exercise.model().sources_of(0), &[0, 1]);
    }

    #[tokio::test]
    async fn test_check_keeps_correct_source_on_any_target() {
        let factory = HeadlessFactory::new();
        let mut exercise = ComplexExercise::create_with_rng(
            &factory,
            Storage::in_memory("ex"),
            ModelDescriptor::new(2, 1, [(0, vec![1])]).with_global_condition(Condition::Any),
            ComplexExerciseOptions {
                multi_drop: true,
                ..options(2, 1)
            },
            &mut StdRng::seed_from_u64(1),
        )
        .await
        .expect("exercise");

        let s0 = exercise.source_item(0).expect("source").id();
        let s1 = exercise.source_item(1).expect("source").id();
        exercise.try_drop(s0, Some(0)).await.expect("drop");
        exercise.try_drop(s1, Some(0)).await.expect("drop");
        assert_eq!(exercise.model().sources_of(0), &[0, 1]);

        let result = exercise.check().await.expect("check");
        assert!(!result.valid);
        assert_eq!(result.count, 0);
        // once 0 is gone, 1 alone satisfies the target
        assert_eq!(exercise.model().sources_of(0), &[1]);
        assert_eq!(exercise.source_state(0), SourceState::Unassigned);
        assert_eq!(exercise.source_state(1), SourceState::Assigned(0));
        assert!(exercise.source_layout().contains(s0));
        assert!(exercise.inner_layout(0).expect("inner").contains(s1));

        let result = exercise.check().await.expect("check");
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_solve_locks_and_persists() {
        let backend = Arc::new(MemoryStore::new());
        let (factory, mut exercise) = build(Storage::new(backend.clone(), "ex")).await;
        exercise.solve().expect("solve");

        assert!(exercise.is_solved());
        assert_eq!(exercise.state(), ExerciseState::Locked);
        assert_eq!(exercise.source_state(0), SourceState::Locked);
        assert!(factory.draggables().iter().all(|item| !item.is_movable()));

        let s0 = exercise.source_item(0).expect("source").id();
        let outcome = exercise.try_drop(s0, Some(0)).await.expect("drop");
        assert_eq!(outcome, DropOutcome::Ignored);

        // a new session starts locked
        let (_, reopened) = build(Storage::new(backend, "ex")).await;
        assert_eq!(reopened.state(), ExerciseState::Locked);
    }

    #[tokio::test]
    async fn test_stale_permutation_is_regenerated() {
        let storage = Storage::in_memory("ex");
        storage.store(PERMUTATION_KEY, &vec![0, 1, 2, 3]).expect("store");
        let (_, exercise) = build(storage).await;
        assert_eq!(exercise.permutation(), &[0, 1]);
    }

    #[tokio::test]
    async fn test_mismatched_images_are_rejected() {
        let factory = HeadlessFactory::new();
        let err = ComplexExercise::create(
            &factory,
            Storage::in_memory("ex"),
            ModelDescriptor::identity(3),
            options(2, 3),
        )
        .await
        .expect_err("three sources, two images");
        assert!(matches!(err, ShapesError::InvalidOptions(_)));
    }

    #[test]
    fn test_initial_position_inside_region() {
        let options = ComplexExerciseOptions::default();
        let mut rng = StdRng::seed_from_u64(3);
        let area = region(100.0, 200.0, 300.0, 120.0);
        for _ in 0..20 {
            let p = initial_position(&options, &area, 100.0, &mut rng);
            assert!(p.x >= 100.0 && p.x <= 300.0);
            assert!(p.y >= 200.0 && p.y <= 300.0);
        }
        let p = initial_position(&options, &ItemOptions::default(), 100.0, &mut rng);
        assert!(p.x <= 800.0 && p.y <= 600.0);
    }
}
