//! # Shapes Grader
//!
//! Headless grading of persisted drag and drop exercise results.
//!
//! ## Usage
//!
//! ```bash
//! shapes-grader --model model.json --result result.json
//! ```
//!
//! ## Reading a saved session:
//!
//! ```bash
//! shapes-grader --model model.json --store store.json --namespace lesson-3
//! ```
//!
//! ## Architecture
//!
//! - `CliArgs` - Command-line arguments parsed with clap
//! - `GraderConfig` - Model path plus where the result bag comes from
//! - `grade` - Builds the [`AssignmentModel`] and produces a [`Report`]

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Serialize;
use serde_json::Value;
use shapes_core::exercise::complex::RESULT_KEY;
use shapes_core::exercise::simple::{INDEXES_KEY, SHUFFLE_KEY};
use shapes_core::{
    AssignmentModel, AssignmentResult, CheckResult, Condition, JsonFileStore, ModelDescriptor,
    SourceId, Storage, TargetId,
};

/// Command-line arguments for shapes-grader.
#[derive(Debug, Clone, Parser)]
#[command(name = "shapes-grader")]
#[command(about = "Grade a persisted drag and drop exercise result")]
#[command(version)]
pub struct CliArgs {
    /// Model descriptor (JSON)
    #[arg(long, env = "SHAPES_MODEL")]
    pub model: PathBuf,

    /// Result bag (JSON map of target to sources, a per-source target list,
    /// or a saved `{"S": [..], "I": [..]}` pair)
    #[arg(long, conflicts_with = "store")]
    pub result: Option<PathBuf>,

    /// JSON key-value store written by an exercise session
    #[arg(long, env = "SHAPES_STORE")]
    pub store: Option<PathBuf>,

    /// Exercise namespace inside the store
    #[arg(long, default_value = "exercise")]
    pub namespace: String,
}

/// Where the graded result comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultSource {
    /// A standalone JSON file.
    File(PathBuf),
    /// A namespace of a session store.
    Store {
        /// Store file.
        path: PathBuf,
        /// Exercise namespace.
        namespace: String,
    },
}

/// Grader configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraderConfig {
    /// Model descriptor path.
    pub model: PathBuf,
    /// Result location.
    pub source: ResultSource,
}

impl TryFrom<CliArgs> for GraderConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> anyhow::Result<Self> {
        let source = match (args.result, args.store) {
            (Some(path), None) => ResultSource::File(path),
            (None, Some(path)) => ResultSource::Store {
                path,
                namespace: args.namespace,
            },
            (None, None) => bail!("either --result or --store is required"),
            (Some(_), Some(_)) => bail!("--result and --store are mutually exclusive"),
        };
        Ok(Self {
            model: args.model,
            source,
        })
    }
}

/// Grading detail of one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetReport {
    /// Target id.
    pub target: TargetId,
    /// Sources found on the target.
    pub sources: Vec<SourceId>,
    /// Expectation, e.g. `"0 OR 1"`.
    pub expects: String,
    /// Rule applied to the target.
    pub condition: Condition,
    /// Whether the target is correctly filled.
    pub correct: bool,
}

/// Full grading report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    /// Summary, flattened into the report object.
    #[serde(flatten)]
    pub summary: CheckResult,
    /// Per-target detail in id order.
    pub targets: Vec<TargetReport>,
}

/// Read and validate a model descriptor.
///
/// # Errors
///
/// Fails if the file cannot be read or does not describe a valid model.
pub fn load_model(path: &Path) -> anyhow::Result<AssignmentModel> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read model {}", path.display()))?;
    let descriptor: ModelDescriptor = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse model {}", path.display()))?;
    AssignmentModel::new(descriptor).context("invalid model descriptor")
}

/// Map a saved per-slot target list back to source ids.
///
/// Slot `k` holds the target of source `shuffled[k]`, `null` meaning
/// unassigned, as saved by the simple exercise.
///
/// # Errors
///
/// Fails if the lists differ in length or `shuffled` is not a permutation.
pub fn parse_indexes(
    indexes: &[Option<TargetId>],
    shuffled: &[SourceId],
) -> anyhow::Result<AssignmentResult> {
    if indexes.len() != shuffled.len() {
        bail!(
            "shuffle has {} entries but the target list has {}",
            shuffled.len(),
            indexes.len()
        );
    }
    let mut seen = vec![false; shuffled.len()];
    for &source in shuffled {
        match seen.get_mut(source) {
            Some(slot) if !*slot => *slot = true,
            _ => bail!("shuffle is not a permutation of 0..{}", shuffled.len()),
        }
    }

    let mut result = AssignmentResult::new();
    for (&source, target) in shuffled.iter().zip(indexes) {
        if let Some(target) = *target {
            result.entry(target).or_default().push(source);
        }
    }
    for sources in result.values_mut() {
        sources.sort_unstable();
    }
    Ok(result)
}

/// Interpret a result bag.
///
/// Objects are read as target to source lists, unless they carry the
/// simple exercise's `S` and `I` keys, in which case the slots are mapped
/// through the shuffle. A bare array is a per-source target list in source
/// id order, `null` meaning unassigned.
///
/// # Errors
///
/// Fails if the value has none of these shapes.
pub fn parse_result(value: Value) -> anyhow::Result<AssignmentResult> {
    if value.is_array() {
        let indexes: Vec<Option<TargetId>> =
            serde_json::from_value(value).context("malformed per-source target list")?;
        let identity: Vec<SourceId> = (0..indexes.len()).collect();
        return parse_indexes(&indexes, &identity);
    }
    if let Some(indexes) = value.get(INDEXES_KEY) {
        let indexes: Vec<Option<TargetId>> = serde_json::from_value(indexes.clone())
            .context("malformed per-slot target list")?;
        let Some(shuffled) = value.get(SHUFFLE_KEY) else {
            bail!("per-slot target list without a shuffle");
        };
        let shuffled: Vec<SourceId> =
            serde_json::from_value(shuffled.clone()).context("malformed shuffle")?;
        return parse_indexes(&indexes, &shuffled);
    }
    serde_json::from_value(value).context("malformed result map")
}

/// Load the result bag from `source`.
///
/// A store namespace is read as a complex result map first, then as a
/// simple exercise's target list and shuffle.
///
/// # Errors
///
/// Fails if the file or store cannot be read, or the namespace holds no
/// consistent result.
pub fn load_result(source: &ResultSource) -> anyhow::Result<AssignmentResult> {
    match source {
        ResultSource::File(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read result {}", path.display()))?;
            let value: Value = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse result {}", path.display()))?;
            parse_result(value)
        }
        ResultSource::Store { path, namespace } => {
            let store = JsonFileStore::open(path)
                .with_context(|| format!("failed to open store {}", path.display()))?;
            load_from_storage(&Storage::new(Arc::new(store), namespace), namespace)
        }
    }
}

fn load_from_storage(storage: &Storage, namespace: &str) -> anyhow::Result<AssignmentResult> {
    if let Some(value) = storage.load::<Value>(RESULT_KEY) {
        return parse_result(value);
    }
    let Some(indexes) = storage.load::<Vec<Option<TargetId>>>(INDEXES_KEY) else {
        bail!("no result saved under namespace {namespace:?}");
    };
    let Some(shuffled) = storage.load::<Vec<SourceId>>(SHUFFLE_KEY) else {
        bail!("target list under namespace {namespace:?} has no saved shuffle");
    };
    parse_indexes(&indexes, &shuffled)
        .with_context(|| format!("inconsistent simple result under namespace {namespace:?}"))
}

/// Apply `result` to `model` and grade it.
///
/// A target is correct when its condition holds. The result is valid when
/// no target holds a source it does not expect, and complete when every
/// target is correct.
///
/// # Errors
///
/// Fails if `result` does not fit the model.
pub fn grade(model: &mut AssignmentModel, result: AssignmentResult) -> anyhow::Result<Report> {
    model
        .set(result)
        .context("result does not match the model")?;

    let targets: Vec<TargetReport> = (0..model.target_count())
        .map(|target| TargetReport {
            target,
            sources: model.sources_of(target).to_vec(),
            expects: model.expects_to_string(target),
            condition: model.condition(target),
            correct: model.check_target(target),
        })
        .collect();

    let valid = targets
        .iter()
        .flat_map(|t| t.sources.iter())
        .all(|&source| model.check_source(source));
    let count = targets.iter().filter(|t| t.correct).count();
    let max_count = targets.len();
    let completed = count == max_count;

    let report = Report {
        summary: CheckResult {
            success: valid && completed,
            valid,
            completed,
            count,
            max_count,
        },
        targets,
    };
    tracing::debug!(summary = ?report.summary, "graded");
    Ok(report)
}
