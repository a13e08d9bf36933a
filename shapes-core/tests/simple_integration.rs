//! Simple Exercise Integration Tests
//!
//! Grid-placed exercise with one occupant per target:
//! - Drops onto free targets, snap-back everywhere else
//! - "Every target received something" completion
//! - Restoring persisted placements

mod common;

use std::sync::Arc;

use common::{inside, item, release_at, simple, NOWHERE};
use shapes_core::exercise::simple::{INDEXES_KEY, SHUFFLE_KEY};
use shapes_core::headless::HeadlessFactory;
use shapes_core::{
    DisplayItem, DragEvent, DropOutcome, ExerciseState, MemoryStore, SimpleExercise, SourceState,
    Storage,
};

async fn place(
    factory: &HeadlessFactory,
    exercise: &mut SimpleExercise,
    source: usize,
    target: usize,
) -> DropOutcome {
    let s = item(factory, &format!("s{source}.png"));
    let t = item(factory, &format!("t{target}.png"));
    exercise
        .handle_drag(release_at(&s, inside(&t)))
        .await
        .expect("end")
}

#[tokio::test]
async fn test_sources_start_at_home_below_targets() {
    let (factory, exercise) = simple(Storage::in_memory("ex"), 3).await;
    let target_bottom = (0..3)
        .map(|i| item(&factory, &format!("t{i}.png")).bounds().expect("bounds").bottom())
        .fold(0.0_f32, f32::max);

    for source in 0..3 {
        let home = exercise.home_of(source).expect("home");
        assert_eq!(item(&factory, &format!("s{source}.png")).location(), home);
        assert!(home.y > target_bottom);
        assert_eq!(exercise.source_state(source), SourceState::Unassigned);
    }
}

#[tokio::test]
async fn test_drop_onto_free_target_anchors_top_left() {
    let (factory, mut exercise) = simple(Storage::in_memory("ex"), 3).await;
    let s0 = item(&factory, "s0.png");

    let begin = exercise
        .handle_drag(DragEvent::begin(s0.id(), s0.location()))
        .await
        .expect("begin");
    assert_eq!(begin, DropOutcome::Ignored);

    let outcome = place(&factory, &mut exercise, 0, 2).await;
    assert_eq!(outcome, DropOutcome::Dropped { target: 2 });
    assert_eq!(exercise.source_state(0), SourceState::Assigned(2));
    assert_eq!(s0.location(), item(&factory, "t2.png").location());
}

#[tokio::test]
async fn test_occupied_target_and_empty_space_send_source_home() {
    let (factory, mut exercise) = simple(Storage::in_memory("ex"), 3).await;
    place(&factory, &mut exercise, 0, 0).await;

    let outcome = place(&factory, &mut exercise, 1, 0).await;
    assert_eq!(outcome, DropOutcome::Returned);
    assert_eq!(exercise.model().sources_of(0), &[0]);
    assert_eq!(
        item(&factory, "s1.png").location(),
        exercise.home_of(1).expect("home")
    );

    // dragging an assigned source off its target frees the target
    let s0 = item(&factory, "s0.png");
    let outcome = exercise
        .handle_drag(release_at(&s0, NOWHERE))
        .await
        .expect("end");
    assert_eq!(outcome, DropOutcome::Returned);
    assert_eq!(exercise.source_state(0), SourceState::Unassigned);
    assert!(exercise.model().sources_of(0).is_empty());
    assert_eq!(s0.location(), exercise.home_of(0).expect("home"));
}

#[tokio::test]
async fn test_check_counts_filled_targets() {
    let (factory, mut exercise) = simple(Storage::in_memory("ex"), 3).await;

    place(&factory, &mut exercise, 0, 1).await;
    let result = exercise.check().await.expect("check");
    assert!(!result.valid);
    assert!(!result.completed);
    assert_eq!(result.count, 0);
    assert_eq!(result.max_count, 3);
    // the wrong source went home
    assert_eq!(exercise.source_state(0), SourceState::Unassigned);
    assert_eq!(
        item(&factory, "s0.png").location(),
        exercise.home_of(0).expect("home")
    );

    for (source, target) in [(0, 1), (1, 0), (2, 2)] {
        place(&factory, &mut exercise, source, target).await;
    }
    let result = exercise.check().await.expect("check");
    assert!(result.completed, "every target received a source");
    assert!(!result.valid);
    assert!(!result.success);
    assert_eq!(result.count, 1);

    for source in [0, 1] {
        place(&factory, &mut exercise, source, source).await;
    }
    let result = exercise.check().await.expect("check");
    assert!(result.success);
    assert_eq!(result.count, 3);
}

#[tokio::test]
async fn test_placements_survive_sessions() {
    let backend = Arc::new(MemoryStore::new());

    let shuffled = {
        let (factory, mut exercise) = simple(Storage::new(backend.clone(), "lesson"), 3).await;
        place(&factory, &mut exercise, 1, 1).await;
        exercise.persist().expect("persist");
        exercise.shuffled().to_vec()
    };

    let storage = Storage::new(backend.clone(), "lesson");
    assert_eq!(storage.load::<Vec<usize>>(SHUFFLE_KEY), Some(shuffled.clone()));
    let indexes: Vec<Option<usize>> = storage.load(INDEXES_KEY).expect("indexes");
    assert_eq!(indexes.iter().filter(|i| i.is_some()).count(), 1);

    let (factory, exercise) = simple(storage, 42).await;
    assert_eq!(exercise.shuffled(), shuffled.as_slice());
    assert_eq!(exercise.source_state(1), SourceState::Assigned(1));
    assert_eq!(
        item(&factory, "s1.png").location(),
        item(&factory, "t1.png").location()
    );
    assert_eq!(exercise.source_state(0), SourceState::Unassigned);
    assert_eq!(
        item(&factory, "s0.png").location(),
        exercise.home_of(0).expect("home")
    );
}

#[tokio::test]
async fn test_solved_exercise_ignores_drops() {
    let backend = Arc::new(MemoryStore::new());
    {
        let (_, mut exercise) = simple(Storage::new(backend.clone(), "lesson"), 3).await;
        exercise.solve().expect("solve");
        assert!(exercise.is_solved());
    }

    let (factory, mut exercise) = simple(Storage::new(backend, "lesson"), 3).await;
    assert_eq!(exercise.state(), ExerciseState::Locked);
    assert_eq!(exercise.source_state(2), SourceState::Locked);
    assert_eq!(place(&factory, &mut exercise, 2, 2).await, DropOutcome::Ignored);
    assert!(exercise.model().sources_of(2).is_empty());
}
