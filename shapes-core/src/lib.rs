//! # Shapes Core
//!
//! Drag and drop exercise engine: an assignment model, a family of layouts
//! and the exercises binding them to host items.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 shapes-core                 │
//! ├─────────────────────────────────────────────┤
//! │  Exercises       │  Layouts                 │
//! │  - Complex       │  - Flow / Grid           │
//! │  - Simple        │  - Stack / Null          │
//! │  - Drop routing  │  - Animated alignment    │
//! ├─────────────────────────────────────────────┤
//! │  AssignmentModel │  Storage                 │
//! │  - drop/undrop   │  - Namespaced keys       │
//! │  - all/any check │  - Memory / JSON file    │
//! ├─────────────────────────────────────────────┤
//! │   DisplayItem / ItemFactory (host items)    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The engine never renders. Hosts implement [`DisplayItem`] and
//! [`ItemFactory`]; [`headless`] provides an in-memory implementation.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod event;
pub mod exercise;
pub mod geometry;
pub mod headless;
pub mod item;
pub mod layout;
pub mod model;
pub mod storage;
pub mod utils;

pub use config::{
    ComplexExerciseOptions, DropPosition, ImageEntry, ImageList, Permute, SimpleExerciseOptions,
};
pub use error::{ShapesError, ShapesResult};
pub use event::{DragEvent, DragPhase, ModelEvent, ModelEventKind};
pub use exercise::{
    find_drop_target, CheckResult, ComplexExercise, DropOutcome, ExerciseState, SimpleExercise,
    SourceState, TaggedItem,
};
pub use geometry::{Point, Rect};
pub use item::{DisplayItem, ItemFactory, ItemId, ItemKind, ItemOptions, ItemRef};
pub use layout::{
    create_layout, FlowLayout, GridLayout, Layout, LayoutKind, LayoutOptions, NullLayout,
    StackLayout,
};
pub use model::{
    AssignmentModel, AssignmentResult, Condition, Conditions, Expectation, ModelDescriptor,
    OneOrMany, SourceId, SubscriptionId, TargetId,
};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, Storage};

/// Shapes core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
