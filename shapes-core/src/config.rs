//! Exercise configuration.
//!
//! All option structs deserialize from the JSON embedded in exercise pages.
//! Every field has a default, so `{}` is a valid (if empty) configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::item::ItemOptions;
use crate::layout::{LayoutKind, LayoutOptions, DEFAULT_ANIMATION_SPEED_MS};
use crate::utils::explode;

/// Default fraction of a dragged item's area that must overlap a region.
pub const DEFAULT_OVERLAPPING_FACTOR: f32 = 0.5;

/// Default stage size.
pub const DEFAULT_STAGE_WIDTH: f32 = 800.0;
/// Default stage height.
pub const DEFAULT_STAGE_HEIGHT: f32 = 600.0;

/// One entry of an explicit image list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageEntry {
    /// A single image path.
    Path(String),
    /// A nested list, flattened into the outer one.
    Nested(Vec<String>),
}

/// A list of image paths.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImageList {
    /// `{ "pattern": "img/a%d.png", "start": 1, "end": 8 }`.
    Pattern {
        /// Path with a `%d` placeholder.
        pattern: String,
        /// First number, inclusive.
        start: i64,
        /// Last number, inclusive.
        end: i64,
    },
    /// Explicit paths, nested lists flattened one level.
    List(Vec<ImageEntry>),
}

impl Default for ImageList {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl ImageList {
    /// Expanded image paths.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        match self {
            Self::Pattern {
                pattern,
                start,
                end,
            } => explode(pattern, *start, *end),
            Self::List(entries) => entries
                .iter()
                .flat_map(|entry| match entry {
                    ImageEntry::Path(path) => vec![path.clone()],
                    ImageEntry::Nested(paths) => paths.clone(),
                })
                .collect(),
        }
    }

    /// Number of images.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Pattern { start, end, .. } => end
                .checked_sub(*start)
                .and_then(|span| span.checked_add(1))
                .and_then(|count| usize::try_from(count).ok())
                .unwrap_or(0),
            Self::List(_) => self.paths().len(),
        }
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<String>> for ImageList {
    fn from(paths: Vec<String>) -> Self {
        Self::List(paths.into_iter().map(ImageEntry::Path).collect())
    }
}

/// Initial source order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permute {
    /// Shuffled once, then persisted.
    #[default]
    Random,
    /// Configuration order.
    Identity,
}

/// Options of [`crate::ComplexExercise`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComplexExerciseOptions {
    /// Label targets with their expectation and sources with their id.
    pub debug: bool,
    /// Accept drops onto targets that are already full.
    pub multi_drop: bool,
    /// Fraction of the dragged item that must overlap a target.
    pub overlapping_factor: f32,
    /// Animation duration in milliseconds, applied to every layout.
    pub animation_speed: u64,

    /// Layout arranging the targets.
    pub target_layout: LayoutKind,
    /// Options of the target layout.
    pub target_layout_options: LayoutOptions,
    /// Layout arranging the sources at home.
    pub source_layout: LayoutKind,
    /// Options of the source layout.
    pub source_layout_options: LayoutOptions,
    /// Layout of the sources dropped onto one target.
    pub target_inner_layout: LayoutKind,
    /// Options of the inner layouts.
    pub target_inner_layout_options: LayoutOptions,

    /// Region item holding the targets.
    pub target_layout_shape_options: ItemOptions,
    /// Region item holding the sources (their home).
    pub source_layout_shape_options: ItemOptions,

    /// Target image width (0 = natural).
    pub target_image_width: f32,
    /// Target image height (0 = proportional).
    pub target_image_height: f32,
    /// Source image width (0 = natural).
    pub source_image_width: f32,
    /// Source image height (0 = proportional).
    pub source_image_height: f32,

    /// Target images, in target id order.
    pub target_images: ImageList,
    /// Source images, in source id order.
    pub source_images: ImageList,
    /// Initial source display order.
    pub permute: Permute,

    /// Debug label color of targets.
    pub target_label_color: String,
    /// Debug label color of sources.
    pub source_label_color: String,

    /// Stage width, used for initial placement outside any region.
    pub stage_width: f32,
    /// Stage height.
    pub stage_height: f32,
}

impl Default for ComplexExerciseOptions {
    fn default() -> Self {
        Self {
            debug: false,
            multi_drop: false,
            overlapping_factor: DEFAULT_OVERLAPPING_FACTOR,
            animation_speed: DEFAULT_ANIMATION_SPEED_MS,
            target_layout: LayoutKind::FlowLayout,
            target_layout_options: LayoutOptions::default(),
            source_layout: LayoutKind::FlowLayout,
            source_layout_options: LayoutOptions::default(),
            target_inner_layout: LayoutKind::StackLayout,
            target_inner_layout_options: LayoutOptions::default(),
            target_layout_shape_options: ItemOptions::default(),
            source_layout_shape_options: ItemOptions::default(),
            target_image_width: 100.0,
            target_image_height: 0.0,
            source_image_width: 100.0,
            source_image_height: 0.0,
            target_images: ImageList::default(),
            source_images: ImageList::default(),
            permute: Permute::Random,
            target_label_color: "white".to_string(),
            source_label_color: "white".to_string(),
            stage_width: DEFAULT_STAGE_WIDTH,
            stage_height: DEFAULT_STAGE_HEIGHT,
        }
    }
}

impl ComplexExerciseOptions {
    /// Layout options with the common animation speed applied.
    #[must_use]
    pub fn effective_layout_options(&self) -> [LayoutOptions; 3] {
        [
            &self.target_layout_options,
            &self.source_layout_options,
            &self.target_inner_layout_options,
        ]
        .map(|options| options.clone().with_animation_speed(self.animation_speed))
    }
}

/// Where a source lands inside the target it was dropped on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropPosition {
    /// Top-left corner.
    #[default]
    TopLeft,
    /// Bottom-left corner.
    BottomLeft,
    /// Centered on the bottom edge.
    BottomCenter,
}

/// Options of [`crate::SimpleExercise`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SimpleExerciseOptions {
    /// Columns of the target grid.
    pub cols: usize,
    /// Columns of the source grid; defaults to `cols`.
    pub source_cols: Option<usize>,
    /// Padding on every side of a cell.
    pub padding: f32,
    /// Extra space between the targets and the sources.
    pub zone_padding: f32,
    /// Anchor of a dropped source inside its target.
    pub drop_pos: DropPosition,
    /// Inset from the anchor edge.
    pub drop_padding: f32,
    /// Source width; derived from the stage and `source_cols` when unset.
    pub source_width: Option<f32>,
    /// Source images. Source `i` belongs on target `i`.
    pub sources: ImageList,
    /// Target images.
    pub targets: ImageList,
    /// Label sources with their 1-based id.
    pub debug: bool,
    /// Animation duration in milliseconds.
    pub animation_speed: u64,
    /// Fraction of the dragged item that must overlap a target.
    pub overlapping_factor: f32,
    /// Stage width the grids are fitted into.
    pub stage_width: f32,
    /// Stage height.
    pub stage_height: f32,
}

impl Default for SimpleExerciseOptions {
    fn default() -> Self {
        Self {
            cols: 5,
            source_cols: None,
            padding: 5.0,
            zone_padding: 5.0,
            drop_pos: DropPosition::TopLeft,
            drop_padding: 0.0,
            source_width: None,
            sources: ImageList::default(),
            targets: ImageList::default(),
            debug: false,
            animation_speed: DEFAULT_ANIMATION_SPEED_MS,
            overlapping_factor: DEFAULT_OVERLAPPING_FACTOR,
            stage_width: DEFAULT_STAGE_WIDTH,
            stage_height: DEFAULT_STAGE_HEIGHT,
        }
    }
}

impl SimpleExerciseOptions {
    /// Duration of every move animation.
    #[must_use]
    pub fn animation_duration(&self) -> Duration {
        Duration::from_millis(self.animation_speed)
    }

    /// Source grid columns.
    #[must_use]
    pub fn source_columns(&self) -> usize {
        self.source_cols.filter(|&c| c > 0).unwrap_or(self.cols)
    }

    /// Approximate width of a target cell.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn approx_width(&self) -> f32 {
        let cols = self.cols.max(1) as f32;
        (self.stage_width - cols * 2.0 * self.padding) / cols
    }

    /// Approximate width of a source cell.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn approx_source_width(&self) -> f32 {
        if let Some(width) = self.source_width.filter(|&w| w > 0.0) {
            return width;
        }
        let cols = self.source_columns().max(1) as f32;
        (self.stage_width - cols * 2.0 * self.padding) / cols
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_list_pattern() {
        let list: ImageList =
            serde_json::from_str(r#"{"pattern": "img/s%d.png", "start": 1, "end": 3}"#)
                .expect("valid list");
        assert_eq!(list.len(), 3);
        assert_eq!(list.paths()[2], "img/s3.png");
    }

    #[test]
    fn test_image_list_pattern_len_never_overflows() {
        let pattern = |start, end| ImageList::Pattern {
            pattern: "s%d.png".to_string(),
            start,
            end,
        };
        assert_eq!(pattern(3, 1).len(), 0);
        assert_eq!(pattern(4, 4).len(), 1);
        assert!(pattern(i64::MIN, i64::MAX).is_empty());
        assert!(pattern(0, i64::MAX).is_empty());
        assert_eq!(pattern(-2, 2).len(), 5);
    }

    #[test]
    fn test_image_list_flattens_one_level() {
        let list: ImageList = serde_json::from_str(r#"["a.png", ["b.png", "c.png"], "d.png"]"#)
            .expect("valid list");
        assert_eq!(list.paths(), vec!["a.png", "b.png", "c.png", "d.png"]);
        assert_eq!(list.len(), 4);
        assert!(ImageList::default().is_empty());
    }

    #[test]
    fn test_complex_defaults() {
        let options: ComplexExerciseOptions = serde_json::from_str(
            r#"{"targetLayout": "GridLayout", "targetLayoutOptions": {"columns": 3}, "animationSpeed": 250}"#,
        )
        .expect("valid options");
        assert_eq!(options.target_layout, LayoutKind::GridLayout);
        assert_eq!(options.source_layout, LayoutKind::FlowLayout);
        assert_eq!(options.target_inner_layout, LayoutKind::StackLayout);
        assert!((options.overlapping_factor - 0.5).abs() < f32::EPSILON);
        assert_eq!(options.permute, Permute::Random);

        let [target, source, inner] = options.effective_layout_options();
        assert_eq!(target.columns, 3);
        assert_eq!(target.animation_speed_ms, 250);
        assert_eq!(source.animation_speed_ms, 250);
        assert_eq!(inner.animation_speed_ms, 250);
    }

    #[test]
    fn test_simple_defaults_and_widths() {
        let options: SimpleExerciseOptions =
            serde_json::from_str(r#"{"cols": 4, "dropPos": "bottomcenter"}"#).expect("valid");
        assert_eq!(options.source_columns(), 4);
        assert_eq!(options.drop_pos, DropPosition::BottomCenter);
        // (800 - 4 * 2 * 5) / 4
        assert!((options.approx_width() - 190.0).abs() < f32::EPSILON);

        let fixed = SimpleExerciseOptions {
            source_width: Some(60.0),
            ..options
        };
        assert!((fixed.approx_source_width() - 60.0).abs() < f32::EPSILON);
    }
}
