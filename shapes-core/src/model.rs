//! Assignment model - which sources sit on which targets, and whether that is correct.
//!
//! The model is a pure state machine with no rendering dependency. It is
//! built from a [`ModelDescriptor`] (usually deserialized from exercise
//! configuration) and mutated only through [`AssignmentModel::drop`],
//! [`AssignmentModel::undrop`], [`AssignmentModel::undrop_source`],
//! [`AssignmentModel::set`] and [`AssignmentModel::clear`].
//!
//! ## Example
//!
//! ```
//! use shapes_core::{AssignmentModel, ModelDescriptor};
//!
//! let descriptor: ModelDescriptor = serde_json::from_str(
//!     r#"{ "sources": 2, "targets": 2, "expect": { "0": 0, "1": 1 } }"#,
//! ).unwrap();
//! let mut model = AssignmentModel::new(descriptor).unwrap();
//!
//! assert!(model.drop(0, 0));
//! assert!(!model.check());
//! assert!(model.drop(1, 1));
//! assert!(model.check());
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::{ModelEvent, ModelEventKind};
use crate::{ShapesError, ShapesResult};

/// Identifier of a source (draggable token).
pub type SourceId = usize;

/// Identifier of a target slot.
pub type TargetId = usize;

/// Assigned sources per target, as persisted and restored.
pub type AssignmentResult = BTreeMap<TargetId, Vec<SourceId>>;

/// Keyword expanding to `expect[i] = [i]` for every target.
pub const IDENTITY: &str = "identity";

/// Rule deciding when a target is correctly filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    /// Every expected source present and nothing else.
    #[default]
    All,
    /// Exactly one source, which must be one of the expected ones.
    Any,
}

impl Condition {
    /// Joining word for human-readable expectations.
    #[must_use]
    pub const fn operator(self) -> &'static str {
        match self {
            Self::All => " AND ",
            Self::Any => " OR ",
        }
    }
}

/// A single source id or a list of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    /// A single source.
    One(SourceId),
    /// A list of sources.
    Many(Vec<SourceId>),
}

impl OneOrMany {
    /// Normalize to a list.
    #[must_use]
    pub fn into_vec(self) -> Vec<SourceId> {
        match self {
            Self::One(source) => vec![source],
            Self::Many(sources) => sources,
        }
    }
}

/// Expected sources per target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expectation {
    /// A shorthand keyword; only `"identity"` is recognized.
    Keyword(String),
    /// Explicit expectations per target.
    Map(BTreeMap<TargetId, OneOrMany>),
}

impl Default for Expectation {
    fn default() -> Self {
        Self::Map(BTreeMap::new())
    }
}

/// Conditions: one global default or per-target overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Conditions {
    /// Applied to every target.
    Global(Condition),
    /// Per-target conditions; unlisted targets use [`Condition::All`].
    PerTarget(BTreeMap<TargetId, Condition>),
}

impl Default for Conditions {
    fn default() -> Self {
        Self::Global(Condition::All)
    }
}

/// Declarative description of an assignment model.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Number of sources.
    pub sources: usize,
    /// Number of targets. Inferred from `expect` when omitted, except for
    /// the identity shorthand which requires it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub targets: Option<usize>,
    /// Expected sources per target.
    #[serde(default)]
    pub expect: Expectation,
    /// Conditions per target.
    #[serde(default)]
    pub conditions: Conditions,
}

impl ModelDescriptor {
    /// Descriptor expecting source `i` on target `i`.
    #[must_use]
    pub fn identity(count: usize) -> Self {
        Self {
            sources: count,
            targets: Some(count),
            expect: Expectation::Keyword(IDENTITY.to_string()),
            conditions: Conditions::default(),
        }
    }

    /// Descriptor with explicit expectations.
    #[must_use]
    pub fn new<I, S>(sources: usize, targets: usize, expect: I) -> Self
    where
        I: IntoIterator<Item = (TargetId, S)>,
        S: Into<Vec<SourceId>>,
    {
        let expect = expect
            .into_iter()
            .map(|(target, list)| (target, OneOrMany::Many(list.into())))
            .collect();
        Self {
            sources,
            targets: Some(targets),
            expect: Expectation::Map(expect),
            conditions: Conditions::default(),
        }
    }

    /// Override the condition of a single target.
    #[must_use]
    pub fn with_condition(mut self, target: TargetId, condition: Condition) -> Self {
        let mut map = match self.conditions {
            Conditions::PerTarget(map) => map,
            Conditions::Global(Condition::All) => BTreeMap::new(),
            Conditions::Global(global) => (0..self.targets.unwrap_or(0))
                .map(|t| (t, global))
                .collect(),
        };
        map.insert(target, condition);
        self.conditions = Conditions::PerTarget(map);
        self
    }

    /// Apply one condition to every target.
    #[must_use]
    pub fn with_global_condition(mut self, condition: Condition) -> Self {
        self.conditions = Conditions::Global(condition);
        self
    }
}

/// Token returned by [`AssignmentModel::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    kind: ModelEventKind,
    handler: Box<dyn FnMut(&ModelEvent)>,
}

/// Tracks which sources are assigned to which targets.
///
/// Invariants: a source appears in at most one target's result list, the
/// result holds a (possibly empty) bucket for every target, and
/// `target_of(s) == Some(t)` iff `sources_of(t)` contains `s`.
pub struct AssignmentModel {
    sources: usize,
    targets: usize,
    expect: Vec<Vec<SourceId>>,
    conditions: Vec<Condition>,
    /// Assigned sources per target; doubles as the sources-by-target index.
    result: AssignmentResult,
    target_by_source: HashMap<SourceId, TargetId>,
    subscribers: Vec<Subscriber>,
    next_subscription: u64,
}

impl fmt::Debug for AssignmentModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssignmentModel")
            .field("sources", &self.sources)
            .field("targets", &self.targets)
            .field("expect", &self.expect)
            .field("conditions", &self.conditions)
            .field("result", &self.result)
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}

impl AssignmentModel {
    /// Build a model from its descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`ShapesError::InvalidModel`] when the descriptor is malformed:
    /// an unknown expectation keyword, the identity shorthand without a
    /// target count, or ids outside the source/target space.
    pub fn new(descriptor: ModelDescriptor) -> ShapesResult<Self> {
        let ModelDescriptor {
            sources,
            targets,
            expect,
            conditions,
        } = descriptor;

        let (targets, expect) = match expect {
            Expectation::Keyword(keyword) if keyword == IDENTITY => {
                let targets = targets.ok_or_else(|| {
                    ShapesError::InvalidModel(
                        "identity expectation requires a target count".to_string(),
                    )
                })?;
                (targets, (0..targets).map(|t| vec![t]).collect::<Vec<_>>())
            }
            Expectation::Keyword(keyword) => {
                return Err(ShapesError::InvalidModel(format!(
                    "unknown expectation keyword {keyword:?}"
                )));
            }
            Expectation::Map(map) => {
                let targets = targets
                    .unwrap_or_else(|| map.keys().next_back().map_or(0, |last| last + 1));
                let mut expect = vec![Vec::new(); targets];
                for (target, list) in map {
                    let slot = expect.get_mut(target).ok_or_else(|| {
                        ShapesError::InvalidModel(format!(
                            "expectation for target {target} but only {targets} targets"
                        ))
                    })?;
                    let mut list = list.into_vec();
                    list.sort_unstable();
                    list.dedup();
                    *slot = list;
                }
                (targets, expect)
            }
        };

        if let Some(source) = expect.iter().flatten().find(|&&s| s >= sources) {
            return Err(ShapesError::InvalidModel(format!(
                "expected source {source} but only {sources} sources"
            )));
        }

        let conditions = match conditions {
            Conditions::Global(condition) => vec![condition; targets],
            Conditions::PerTarget(map) => {
                let mut list = vec![Condition::All; targets];
                for (target, condition) in map {
                    let slot = list.get_mut(target).ok_or_else(|| {
                        ShapesError::InvalidModel(format!(
                            "condition for target {target} but only {targets} targets"
                        ))
                    })?;
                    *slot = condition;
                }
                list
            }
        };

        let mut model = Self {
            sources,
            targets,
            expect,
            conditions,
            result: BTreeMap::new(),
            target_by_source: HashMap::new(),
            subscribers: Vec::new(),
            next_subscription: 0,
        };
        model.init();
        Ok(model)
    }

    fn init(&mut self) {
        self.result = (0..self.targets).map(|t| (t, Vec::new())).collect();
        self.target_by_source.clear();
    }

    /// Number of sources.
    #[must_use]
    pub fn source_count(&self) -> usize {
        self.sources
    }

    /// Number of targets.
    #[must_use]
    pub fn target_count(&self) -> usize {
        self.targets
    }

    /// Current assignments per target.
    #[must_use]
    pub fn result(&self) -> &AssignmentResult {
        &self.result
    }

    /// Condition governing `target`.
    #[must_use]
    pub fn condition(&self, target: TargetId) -> Condition {
        self.conditions.get(target).copied().unwrap_or_default()
    }

    /// Register a handler for one kind of notification.
    pub fn subscribe<F>(&mut self, kind: ModelEventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&ModelEvent) + 'static,
    {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push(Subscriber {
            id,
            kind,
            handler: Box::new(handler),
        });
        id
    }

    /// Remove a handler. Returns whether it was registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|s| s.id != id);
        self.subscribers.len() != before
    }

    fn emit(&mut self, event: ModelEvent) {
        for subscriber in self.subscribers.iter_mut().filter(|s| s.kind == event.kind) {
            (subscriber.handler)(&event);
        }
    }

    /// Assign `source` to `target`, moving it off any other target first.
    ///
    /// Returns `false` if the source already sits on `target` or either id
    /// is out of range.
    pub fn drop(&mut self, source: SourceId, target: TargetId) -> bool {
        if source >= self.sources || target >= self.targets {
            tracing::warn!(source, target, "drop outside of the model's id space");
            return false;
        }

        let old_target = self.target_of(source);
        if old_target == Some(target) {
            return false;
        }
        if let Some(old_target) = old_target {
            self.undrop(source, old_target);
        }

        let list = self.result.entry(target).or_default();
        list.push(source);
        list.sort_unstable();
        self.target_by_source.insert(source, target);

        tracing::debug!(source, target, "source dropped");
        self.emit(ModelEvent::assignment(ModelEventKind::Drop, source, target));
        true
    }

    /// Remove `source` from `target`. Returns whether a removal occurred.
    pub fn undrop(&mut self, source: SourceId, target: TargetId) -> bool {
        let Some(list) = self.result.get_mut(&target) else {
            return false;
        };
        let Some(position) = list.iter().position(|&s| s == source) else {
            return false;
        };
        list.remove(position);
        self.target_by_source.remove(&source);

        tracing::debug!(source, target, "source undropped");
        self.emit(ModelEvent::assignment(ModelEventKind::Undrop, source, target));
        true
    }

    /// Remove `source` from whichever target holds it.
    pub fn undrop_source(&mut self, source: SourceId) -> bool {
        let holders: Vec<TargetId> = self
            .result
            .iter()
            .filter(|(_, list)| list.contains(&source))
            .map(|(&target, _)| target)
            .collect();

        let mut removed = false;
        for target in holders {
            removed |= self.undrop(source, target);
        }
        removed
    }

    /// Whether `source` may be dropped on `target`.
    #[must_use]
    pub fn can_drop(&self, source: SourceId, target: TargetId) -> bool {
        let current = self.sources_of(target);
        !current.contains(&source) && current.len() < self.max_sources_of(target)
    }

    /// Maximum number of sources `target` accepts.
    ///
    /// An `any` target accepts one source; with no expected sources it accepts none.
    #[must_use]
    pub fn max_sources_of(&self, target: TargetId) -> usize {
        let expected = self.expects(target).len();
        match self.condition(target) {
            Condition::All => expected,
            Condition::Any => expected.min(1),
        }
    }

    /// Whether every target is correctly filled.
    #[must_use]
    pub fn check(&self) -> bool {
        (0..self.targets).all(|target| self.check_target(target))
    }

    /// Whether `target` holds exactly what its condition requires.
    #[must_use]
    pub fn check_target(&self, target: TargetId) -> bool {
        let current = self.sources_of(target);
        let expected = self.expects(target);
        let common = current.iter().filter(|s| expected.contains(s)).count();

        match self.condition(target) {
            Condition::All => common == expected.len() && expected.len() == current.len(),
            Condition::Any => common == 1 && current.len() == 1,
        }
    }

    /// Whether `source` sits on a target that accepts it.
    #[must_use]
    pub fn check_source(&self, source: SourceId) -> bool {
        let Some(target) = self.target_of(source) else {
            return false;
        };
        match self.condition(target) {
            Condition::All => self.expects(target).contains(&source),
            Condition::Any => self.check_target(target),
        }
    }

    /// Reset all assignments.
    pub fn clear(&mut self) {
        self.init();
        self.emit(ModelEvent::bare(ModelEventKind::Clear));
    }

    /// Replace all assignments, e.g. with a persisted result.
    ///
    /// Targets missing from `result` get an empty bucket.
    ///
    /// # Errors
    ///
    /// Returns [`ShapesError::InvalidResult`] if `result` references ids
    /// outside the model or assigns a source to more than one target. The
    /// model is left unchanged in that case.
    pub fn set(&mut self, result: AssignmentResult) -> ShapesResult<()> {
        let mut rebuilt: AssignmentResult = (0..self.targets).map(|t| (t, Vec::new())).collect();
        let mut target_by_source = HashMap::new();

        for (target, mut list) in result {
            if target >= self.targets {
                return Err(ShapesError::InvalidResult(format!(
                    "target {target} out of range"
                )));
            }
            for &source in &list {
                if source >= self.sources {
                    return Err(ShapesError::InvalidResult(format!(
                        "source {source} out of range"
                    )));
                }
                if let Some(previous) = target_by_source.insert(source, target) {
                    return Err(ShapesError::InvalidResult(format!(
                        "source {source} assigned to targets {previous} and {target}"
                    )));
                }
            }
            list.sort_unstable();
            rebuilt.insert(target, list);
        }

        self.result = rebuilt;
        self.target_by_source = target_by_source;
        self.emit(ModelEvent::bare(ModelEventKind::Set));
        Ok(())
    }

    /// Target currently holding `source`.
    #[must_use]
    pub fn target_of(&self, source: SourceId) -> Option<TargetId> {
        self.target_by_source.get(&source).copied()
    }

    /// Sources currently on `target` (sorted).
    #[must_use]
    pub fn sources_of(&self, target: TargetId) -> &[SourceId] {
        self.result.get(&target).map_or(&[], Vec::as_slice)
    }

    /// Sources expected on `target` (sorted).
    #[must_use]
    pub fn expects(&self, target: TargetId) -> &[SourceId] {
        self.expect.get(target).map_or(&[], Vec::as_slice)
    }

    /// Human-readable expectation, e.g. `"3 OR 4"`.
    #[must_use]
    pub fn expects_to_string(&self, target: TargetId) -> String {
        self.expects(target)
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(self.condition(target).operator())
    }
}
