//! Error types for exercise operations.

use thiserror::Error;

/// Result type for exercise operations.
pub type ShapesResult<T> = Result<T, ShapesError>;

/// Errors that can occur while building or driving an exercise.
#[derive(Debug, Error)]
pub enum ShapesError {
    /// The model descriptor is malformed.
    #[error("Invalid model descriptor: {0}")]
    InvalidModel(String),

    /// A bulk result does not match the shape of the model.
    #[error("Invalid result: {0}")]
    InvalidResult(String),

    /// Layout options cannot be used to build a layout.
    #[error("Invalid layout options: {0}")]
    InvalidLayout(String),

    /// No layout is registered under the given name.
    #[error("Unknown layout: {0}")]
    UnknownLayout(String),

    /// Exercise options are inconsistent with the model.
    #[error("Invalid exercise options: {0}")]
    InvalidOptions(String),

    /// An item has no bounds yet (not loaded or not laid out).
    #[error("Bounds unavailable for item {0}")]
    BoundsUnavailable(String),

    /// The referenced item is not part of the exercise.
    #[error("Item not found: {0}")]
    ItemNotFound(String),

    /// The item factory could not create an item.
    #[error("Failed to create item: {0}")]
    ItemCreation(String),

    /// Serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Storage I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
