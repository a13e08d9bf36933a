//! Headless items - an in-memory [`DisplayItem`] host.
//!
//! Positions change instantly and every move is recorded, which makes the
//! headless host the backend of choice for tests, replays and the grader.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use async_trait::async_trait;

use crate::geometry::{Point, Rect};
use crate::item::{DisplayItem, ItemFactory, ItemId, ItemKind, ItemOptions, ItemRef};
use crate::{ShapesError, ShapesResult};

/// Natural size of a headless image without explicit dimensions.
pub const DEFAULT_NATURAL_SIZE: f32 = 100.0;

/// An item living only in memory.
#[derive(Debug)]
pub struct HeadlessItem {
    id: ItemId,
    rect: Cell<Rect>,
    loaded: Cell<bool>,
    movable: Cell<bool>,
    options: ItemOptions,
    moves: RefCell<Vec<Point>>,
    waiters: RefCell<Vec<Waker>>,
}

impl HeadlessItem {
    /// A loaded item occupying `rect`.
    #[must_use]
    pub fn new(rect: Rect) -> Rc<Self> {
        Rc::new(Self::build(rect, true, ItemOptions::default()))
    }

    /// An item whose assets have not loaded yet.
    ///
    /// It reports no bounds and `created()` stays pending until
    /// [`HeadlessItem::finish_loading`] is called.
    #[must_use]
    pub fn pending(rect: Rect) -> Rc<Self> {
        Rc::new(Self::build(rect, false, ItemOptions::default()))
    }

    fn build(rect: Rect, loaded: bool, options: ItemOptions) -> Self {
        Self {
            id: ItemId::new(),
            rect: Cell::new(rect),
            loaded: Cell::new(loaded),
            movable: Cell::new(options.movable),
            options,
            moves: RefCell::new(Vec::new()),
            waiters: RefCell::new(Vec::new()),
        }
    }

    /// Mark the item loaded and wake everyone awaiting `created()`.
    pub fn finish_loading(&self) {
        self.loaded.set(true);
        for waker in self.waiters.borrow_mut().drain(..) {
            waker.wake();
        }
    }

    /// Teleport the item, as a user drag would.
    pub fn set_position(&self, x: f32, y: f32) {
        let rect = self.rect.get();
        self.rect.set(Rect::new(x, y, rect.width, rect.height));
    }

    /// Every animated move target, oldest first.
    #[must_use]
    pub fn moves(&self) -> Vec<Point> {
        self.moves.borrow().clone()
    }

    /// Whether dragging is enabled.
    #[must_use]
    pub fn is_movable(&self) -> bool {
        self.movable.get()
    }

    /// Options the item was created with.
    #[must_use]
    pub fn options(&self) -> &ItemOptions {
        &self.options
    }
}

#[async_trait(?Send)]
impl DisplayItem for HeadlessItem {
    fn id(&self) -> ItemId {
        self.id
    }

    fn bounds(&self) -> Option<Rect> {
        self.loaded.get().then(|| self.rect.get())
    }

    fn location(&self) -> Point {
        self.rect.get().origin()
    }

    fn resize_to(&self, width: f32, height: f32) {
        let rect = self.rect.get();
        let (width, height) = match (width > 0.0, height > 0.0) {
            (true, true) => (width, height),
            (true, false) if rect.width > 0.0 => (width, rect.height * width / rect.width),
            (false, true) if rect.height > 0.0 => (rect.width * height / rect.height, height),
            _ => return,
        };
        self.rect.set(Rect::new(rect.x, rect.y, width, height));
    }

    async fn move_animated(&self, x: f32, y: f32, _duration: Duration) {
        self.set_position(x, y);
        self.moves.borrow_mut().push(Point::new(x, y));
    }

    async fn created(&self) {
        Created { item: self }.await;
    }

    fn set_movable(&self, movable: bool) {
        self.movable.set(movable);
    }
}

struct Created<'a> {
    item: &'a HeadlessItem,
}

impl Future for Created<'_> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.item.loaded.get() {
            return Poll::Ready(());
        }
        self.item.waiters.borrow_mut().push(cx.waker().clone());
        Poll::Pending
    }
}

/// Factory producing [`HeadlessItem`]s and remembering them in creation order.
#[derive(Debug, Default)]
pub struct HeadlessFactory {
    natural_size: Option<(f32, f32)>,
    created: RefCell<Vec<(ItemKind, Rc<HeadlessItem>)>>,
}

impl HeadlessFactory {
    /// Create a factory whose images have a square natural size of 100.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different natural image size.
    #[must_use]
    pub fn with_natural_size(mut self, width: f32, height: f32) -> Self {
        self.natural_size = Some((width, height));
        self
    }

    /// All items created so far.
    #[must_use]
    pub fn items(&self) -> Vec<Rc<HeadlessItem>> {
        self.created.borrow().iter().map(|(_, item)| Rc::clone(item)).collect()
    }

    /// Draggable items, in creation order.
    #[must_use]
    pub fn draggables(&self) -> Vec<Rc<HeadlessItem>> {
        self.created
            .borrow()
            .iter()
            .filter(|(kind, _)| *kind == ItemKind::Draggable)
            .map(|(_, item)| Rc::clone(item))
            .collect()
    }

    /// First item created with image `src`.
    #[must_use]
    pub fn find_by_src(&self, src: &str) -> Option<Rc<HeadlessItem>> {
        self.created
            .borrow()
            .iter()
            .map(|(_, item)| item)
            .find(|item| item.options.src.as_deref() == Some(src))
            .cloned()
    }

    fn initial_rect(&self, kind: ItemKind, options: &ItemOptions) -> Rect {
        if kind == ItemKind::BackgroundContainer {
            return Rect::new(options.x, options.y, options.width, options.height);
        }
        let (natural_w, natural_h) = self
            .natural_size
            .unwrap_or((DEFAULT_NATURAL_SIZE, DEFAULT_NATURAL_SIZE));
        let (width, height) = match (options.width > 0.0, options.height > 0.0) {
            (true, true) => (options.width, options.height),
            (true, false) => (options.width, natural_h * options.width / natural_w),
            (false, true) => (natural_w * options.height / natural_h, options.height),
            (false, false) => (natural_w, natural_h),
        };
        Rect::new(options.x, options.y, width, height)
    }
}

impl ItemFactory for HeadlessFactory {
    fn create_item(&self, kind: ItemKind, options: &ItemOptions) -> ShapesResult<ItemRef> {
        if kind != ItemKind::BackgroundContainer && options.src.is_none() {
            return Err(ShapesError::ItemCreation(format!(
                "{kind:?} item needs an image src"
            )));
        }
        let item = Rc::new(HeadlessItem::build(
            self.initial_rect(kind, options),
            true,
            options.clone(),
        ));
        tracing::trace!(id = %item.id, ?kind, src = ?options.src, "created headless item");
        self.created.borrow_mut().push((kind, Rc::clone(&item)));
        Ok(item)
    }
}

#[cfg(test)]
mod tests {
    use futures::FutureExt;

    use super::*;

    #[test]
    fn test_proportional_resize() {
        let item = HeadlessItem::new(Rect::new(0.0, 0.0, 44.0, 22.0));
        item.resize_to(88.0, 0.0);
        assert_eq!(item.bounds(), Some(Rect::new(0.0, 0.0, 88.0, 44.0)));
        item.resize_to(0.0, 11.0);
        assert_eq!(item.bounds(), Some(Rect::new(0.0, 0.0, 22.0, 11.0)));
    }

    #[tokio::test]
    async fn test_moves_are_recorded() {
        let item = HeadlessItem::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        item.move_animated(5.0, 6.0, Duration::ZERO).await;
        assert_eq!(item.location(), Point::new(5.0, 6.0));
        assert_eq!(item.moves(), vec![Point::new(5.0, 6.0)]);
    }

    #[test]
    fn test_pending_item_resolves_after_loading() {
        let item = HeadlessItem::pending(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert!(item.bounds().is_none());

        let mut created = item.created();
        assert!((&mut created).now_or_never().is_none());
        item.finish_loading();
        assert!(created.now_or_never().is_some());
        assert!(item.bounds().is_some());
    }

    #[test]
    fn test_factory_sizes() {
        let factory = HeadlessFactory::new().with_natural_size(200.0, 100.0);
        let image = factory
            .create_item(
                ItemKind::Draggable,
                &ItemOptions {
                    src: Some("a.png".to_string()),
                    width: 50.0,
                    ..ItemOptions::default()
                },
            )
            .expect("created");
        assert_eq!(image.bounds(), Some(Rect::new(0.0, 0.0, 50.0, 25.0)));

        let region = factory
            .create_item(
                ItemKind::BackgroundContainer,
                &ItemOptions {
                    x: 10.0,
                    y: 20.0,
                    width: 300.0,
                    height: 80.0,
                    ..ItemOptions::default()
                },
            )
            .expect("created");
        assert_eq!(region.bounds(), Some(Rect::new(10.0, 20.0, 300.0, 80.0)));
        assert_eq!(factory.items().len(), 2);
        assert!(factory.find_by_src("a.png").is_some());
    }

    #[test]
    fn test_image_without_src_is_rejected() {
        let factory = HeadlessFactory::new();
        let created = factory.create_item(ItemKind::Draggable, &ItemOptions::default());
        assert!(matches!(created, Err(ShapesError::ItemCreation(_))));
        assert!(factory.items().is_empty());
    }
}
