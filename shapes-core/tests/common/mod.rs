//! Shared fixtures for exercise integration tests.
//!
//! Geometry of the complex fixture: three 180x180 targets flowed at
//! x = 20, 220, 420 (y = 20), sources gridded as 80x80 cells starting at
//! (20, 420) with a 100px stride. The home region spans (0, 400)-(620, 600).

#![allow(dead_code)]

use rand::rngs::StdRng;
use rand::SeedableRng;
use shapes_core::headless::{HeadlessFactory, HeadlessItem};
use shapes_core::{
    ComplexExercise, ComplexExerciseOptions, DisplayItem, DragEvent, ImageList, ItemOptions,
    LayoutKind, LayoutOptions, ModelDescriptor, Permute, Point, SimpleExercise,
    SimpleExerciseOptions, Storage,
};
use std::rc::Rc;

/// A point inside the home region, clear of every target.
pub const HOME_SPOT: Point = Point::new(300.0, 450.0);

/// A point outside every region.
pub const NOWHERE: Point = Point::new(900.0, 900.0);

/// `{prefix}{i}.png` for `i` in `0..n`.
pub fn images(prefix: &str, n: usize) -> ImageList {
    (0..n)
        .map(|i| format!("{prefix}{i}.png"))
        .collect::<Vec<_>>()
        .into()
}

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

/// Complex options for `n` sources on `n` targets.
pub fn complex_options(n: usize) -> ComplexExerciseOptions {
    ComplexExerciseOptions {
        permute: Permute::Identity,
        target_layout: LayoutKind::FlowLayout,
        target_layout_options: LayoutOptions {
            columns: 3,
            padding: 20.0,
            ..LayoutOptions::default()
        },
        source_layout: LayoutKind::GridLayout,
        source_layout_options: LayoutOptions {
            columns: 6,
            padding: 20.0,
            ..LayoutOptions::default()
        },
        target_layout_shape_options: region(0.0, 0.0, 620.0, 300.0),
        source_layout_shape_options: region(0.0, 400.0, 620.0, 200.0),
        target_images: images("t", n),
        source_images: images("s", n),
        ..ComplexExerciseOptions::default()
    }
}

/// Identity-model complex exercise with three sources and targets.
pub async fn complex(storage: Storage, seed: u64) -> (HeadlessFactory, ComplexExercise) {
    complex_with(storage, complex_options(3), seed).await
}

/// Identity-model complex exercise with custom options.
pub async fn complex_with(
    storage: Storage,
    options: ComplexExerciseOptions,
    seed: u64,
) -> (HeadlessFactory, ComplexExercise) {
    let factory = HeadlessFactory::new();
    let exercise = ComplexExercise::create_with_rng(
        &factory,
        storage,
        ModelDescriptor::identity(3),
        options,
        &mut StdRng::seed_from_u64(seed),
    )
    .await
    .expect("complex exercise");
    (factory, exercise)
}

/// Simple options: three 196.67 wide targets in one row, 60x60 sources below.
pub fn simple_options() -> SimpleExerciseOptions {
    SimpleExerciseOptions {
        cols: 3,
        stage_width: 620.0,
        source_width: Some(60.0),
        targets: images("t", 3),
        sources: images("s", 3),
        ..SimpleExerciseOptions::default()
    }
}

/// Simple exercise over `storage`.
pub async fn simple(storage: Storage, seed: u64) -> (HeadlessFactory, SimpleExercise) {
    let factory = HeadlessFactory::new();
    let exercise = SimpleExercise::create_with_rng(
        &factory,
        storage,
        simple_options(),
        &mut StdRng::seed_from_u64(seed),
    )
    .await
    .expect("simple exercise");
    (factory, exercise)
}

/// Host item created for `src`.
pub fn item(factory: &HeadlessFactory, src: &str) -> Rc<HeadlessItem> {
    factory.find_by_src(src).expect("item exists")
}

/// Drag `item` to `to` and return the release event.
pub fn release_at(item: &HeadlessItem, to: Point) -> DragEvent {
    item.set_position(to.x, to.y);
    DragEvent::end(item.id(), to)
}

/// Release point a little inside `target`.
pub fn inside(target: &HeadlessItem) -> Point {
    let origin = target.location();
    Point::new(origin.x + 10.0, origin.y + 10.0)
}
