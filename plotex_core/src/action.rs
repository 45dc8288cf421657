//! Actions: partial functions `State -> Option<State>`,
//! each tagged with an advisory [`EquivHint`]. Built-in forms are
//! dispatched through `enum_dispatch` rather than `dyn Trait` so the
//! search's inner loop never pays a vtable indirection for the common
//! cases; [`Action::Custom`] is the escape hatch for anything the
//! built-ins can't express.

use crate::{
    QualityKey,
    schema::{Schema, Sense, ValueType},
    state::State,
    value::QualityValue,
};
use enum_dispatch::enum_dispatch;
use std::fmt;
use std::sync::Arc;

/// How an action's result relates to its input, per the partial order.
/// Purely advisory: the search always re-derives the relation it
/// actually depends on (see [`crate::graph`]), so a wrong hint costs
/// redundant work, never a wrong answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquivHint {
    Same,
    Improve,
    Loss,
    Unknown,
}

impl EquivHint {
    /// The hint of two actions applied one after the other: worst case
    /// wins, with `Loss` dominating `Unknown` dominating `Improve`
    /// dominating `Same`.
    #[must_use]
    pub fn then(self, next: EquivHint) -> EquivHint {
        use EquivHint::{Improve, Loss, Same, Unknown};
        match (self, next) {
            (Loss, _) | (_, Loss) => Loss,
            (Unknown, _) | (_, Unknown) => Unknown,
            (Improve, _) | (_, Improve) => Improve,
            (Same, Same) => Same,
        }
    }

    fn for_sense(sense: Sense, gaining: bool) -> EquivHint {
        match (sense, gaining) {
            (Sense::Positive, true) | (Sense::Negative, false) => EquivHint::Improve,
            (Sense::Positive, false) | (Sense::Negative, true) => EquivHint::Loss,
        }
    }
}

#[enum_dispatch]
pub trait ActionLike {
    /// Apply this action to `state`. `None` means the action's
    /// precondition wasn't met — a run-time constraint failure, never an
    /// error.
    fn apply(&self, state: &State, schema: &Schema) -> Option<State>;

    fn hint(&self) -> EquivHint;

    /// The schema fragment this action implies (the quality keys it
    /// touches and their types), merged in by
    /// [`crate::scenario::ScenarioBuilder`].
    fn schema_fragment(&self) -> Schema;
}

/// Unconditionally overwrite a quality. The new value's direction
/// relative to the old one isn't known without inspecting the state, so
/// this carries [`EquivHint::Unknown`].
#[derive(Debug, Clone)]
pub struct Set {
    pub key: QualityKey,
    pub value: QualityValue,
}

impl Set {
    #[must_use]
    pub fn new(key: QualityKey, value: QualityValue) -> Self {
        Set { key, value }
    }
}

impl ActionLike for Set {
    fn apply(&self, state: &State, schema: &Schema) -> Option<State> {
        state.add_quality(&self.key, self.value.clone(), schema).ok()
    }

    fn hint(&self) -> EquivHint {
        // A bool-valued Set's direction is knowable without looking at the
        // state it'll be applied to: moving a positive-sense key to true
        // (or a negative-sense one to false) is an improvement, the
        // opposite a loss. Any other value type carries no such guarantee.
        match self.value {
            QualityValue::Bool(gaining) => EquivHint::for_sense(Sense::of(&self.key), gaining),
            _ => EquivHint::Unknown,
        }
    }

    fn schema_fragment(&self) -> Schema {
        fragment_of(&self.key, self.value.ty())
    }
}

/// Replace the entire state with a fresh one holding only the given
/// mapping — everything the incoming state carried, aside from these
/// keys, is dropped. Unlike [`Set`], the result's relation to the input
/// isn't knowable in general (it can gain some qualities and lose others
/// in the same call), so this carries [`EquivHint::Unknown`].
#[derive(Debug, Clone)]
pub struct Reset {
    pub mapping: Vec<(QualityKey, QualityValue)>,
}

impl Reset {
    #[must_use]
    pub fn new(mapping: Vec<(QualityKey, QualityValue)>) -> Self {
        Reset { mapping }
    }
}

impl ActionLike for Reset {
    fn apply(&self, _state: &State, _schema: &Schema) -> Option<State> {
        Some(State::new(self.mapping.clone()))
    }

    fn hint(&self) -> EquivHint {
        EquivHint::Unknown
    }

    fn schema_fragment(&self) -> Schema {
        let mut schema = Schema::new();
        for (key, value) in &self.mapping {
            schema.merge(&fragment_of(key, value.ty())).unwrap();
        }
        schema
    }
}

/// Filter: require at least (positive sense) or at most (negative sense)
/// `value` of a quality. Never changes the state — `Some(state.clone())`
/// on success, `None` on failure — so the hint is always [`EquivHint::Same`].
#[derive(Debug, Clone)]
pub struct Has {
    pub key: QualityKey,
    pub value: QualityValue,
}

impl Has {
    #[must_use]
    pub fn new(key: QualityKey, value: QualityValue) -> Self {
        Has { key, value }
    }
}

impl ActionLike for Has {
    fn apply(&self, state: &State, schema: &Schema) -> Option<State> {
        state
            .satisfies(&self.key, &self.value, schema)
            .then(|| state.clone())
    }

    fn hint(&self) -> EquivHint {
        EquivHint::Same
    }

    fn schema_fragment(&self) -> Schema {
        fragment_of(&self.key, self.value.ty())
    }
}

/// Filter: at least one of several `(key, value)` constraints holds.
#[derive(Debug, Clone)]
pub struct HasAny {
    pub constraints: Vec<(QualityKey, QualityValue)>,
}

impl HasAny {
    #[must_use]
    pub fn new(constraints: Vec<(QualityKey, QualityValue)>) -> Self {
        HasAny { constraints }
    }
}

impl ActionLike for HasAny {
    fn apply(&self, state: &State, schema: &Schema) -> Option<State> {
        self.constraints
            .iter()
            .any(|(key, value)| state.satisfies(key, value, schema))
            .then(|| state.clone())
    }

    fn hint(&self) -> EquivHint {
        EquivHint::Same
    }

    fn schema_fragment(&self) -> Schema {
        let mut schema = Schema::new();
        for (key, value) in &self.constraints {
            schema.merge(&fragment_of(key, value.ty())).unwrap();
        }
        schema
    }
}

/// Filter: a string-valued quality is present and not one of a forbidden
/// set of values.
#[derive(Debug, Clone)]
pub struct HasDifferent {
    pub key: QualityKey,
    pub forbidden: std::collections::BTreeSet<internment::ArcIntern<str>>,
}

impl HasDifferent {
    #[must_use]
    pub fn new(key: QualityKey, forbidden: impl IntoIterator<Item = internment::ArcIntern<str>>) -> Self {
        HasDifferent { key, forbidden: forbidden.into_iter().collect() }
    }
}

impl ActionLike for HasDifferent {
    fn apply(&self, state: &State, _schema: &Schema) -> Option<State> {
        let QualityValue::Str(value) = state.get(&self.key)? else {
            return None;
        };
        (!self.forbidden.contains(value)).then(|| state.clone())
    }

    fn hint(&self) -> EquivHint {
        EquivHint::Same
    }

    fn schema_fragment(&self) -> Schema {
        fragment_of(&self.key, ValueType::Str)
    }
}

/// Filter: a set-valued quality has at least `count` members.
#[derive(Debug, Clone)]
pub struct Count {
    pub key: QualityKey,
    pub count: i64,
}

impl Count {
    #[must_use]
    pub fn new(key: QualityKey, count: i64) -> Self {
        Count { key, count }
    }
}

impl ActionLike for Count {
    fn apply(&self, state: &State, _schema: &Schema) -> Option<State> {
        let have = match state.get(&self.key) {
            Some(QualityValue::Set(set)) => set.len() as i64,
            _ => 0,
        };
        (have >= self.count).then(|| state.clone())
    }

    fn hint(&self) -> EquivHint {
        EquivHint::Same
    }

    fn schema_fragment(&self) -> Schema {
        fragment_of(&self.key, ValueType::Set)
    }
}

/// Drop a quality to its falsy default — the acting counterpart of
/// [`Reset`] (same effect, framed as "lose this" rather than "clear
/// this").
#[derive(Debug, Clone)]
pub struct Lose {
    pub key: QualityKey,
    pub ty: ValueType,
}

impl Lose {
    #[must_use]
    pub fn new(key: QualityKey, ty: ValueType) -> Self {
        Lose { key, ty }
    }
}

impl ActionLike for Lose {
    fn apply(&self, state: &State, _schema: &Schema) -> Option<State> {
        if state.get(&self.key).is_none() {
            return None;
        }
        let mut qualities = state.qualities().clone();
        qualities.remove(&self.key);
        Some(State::new(qualities))
    }

    fn hint(&self) -> EquivHint {
        EquivHint::for_sense(Sense::of(&self.key), false)
    }

    fn schema_fragment(&self) -> Schema {
        fragment_of(&self.key, self.ty)
    }
}

/// Add `amount` (must be positive) to an int quality.
#[derive(Debug, Clone)]
pub struct Increment {
    pub key: QualityKey,
    pub amount: i64,
}

impl Increment {
    #[must_use]
    pub fn new(key: QualityKey, amount: i64) -> Self {
        Increment { key, amount }
    }
}

impl ActionLike for Increment {
    fn apply(&self, state: &State, schema: &Schema) -> Option<State> {
        let have = match state.get(&self.key) {
            Some(QualityValue::Int(n)) => *n,
            _ => 0,
        };
        state
            .add_quality(&self.key, QualityValue::Int(have + self.amount), schema)
            .ok()
    }

    fn hint(&self) -> EquivHint {
        EquivHint::for_sense(Sense::of(&self.key), true)
    }

    fn schema_fragment(&self) -> Schema {
        fragment_of(&self.key, ValueType::Int)
    }
}

/// Subtract `amount` from an int quality, failing if the result would be
/// negative.
#[derive(Debug, Clone)]
pub struct Decrement {
    pub key: QualityKey,
    pub amount: i64,
}

impl Decrement {
    #[must_use]
    pub fn new(key: QualityKey, amount: i64) -> Self {
        Decrement { key, amount }
    }
}

impl ActionLike for Decrement {
    fn apply(&self, state: &State, schema: &Schema) -> Option<State> {
        let have = match state.get(&self.key) {
            Some(QualityValue::Int(n)) => *n,
            _ => 0,
        };
        let result = have - self.amount;
        if result < 0 {
            return None;
        }
        state.add_quality(&self.key, QualityValue::Int(result), schema).ok()
    }

    fn hint(&self) -> EquivHint {
        EquivHint::for_sense(Sense::of(&self.key), false)
    }

    fn schema_fragment(&self) -> Schema {
        fragment_of(&self.key, ValueType::Int)
    }
}

/// Add a member to a set-valued quality.
#[derive(Debug, Clone)]
pub struct Include {
    pub key: QualityKey,
    pub member: String,
}

impl Include {
    #[must_use]
    pub fn new(key: QualityKey, member: impl Into<String>) -> Self {
        Include { key, member: member.into() }
    }
}

impl ActionLike for Include {
    fn apply(&self, state: &State, schema: &Schema) -> Option<State> {
        state
            .add_quality(&self.key, crate::value::singleton_set(&self.member), schema)
            .ok()
    }

    fn hint(&self) -> EquivHint {
        EquivHint::for_sense(Sense::of(&self.key), true)
    }

    fn schema_fragment(&self) -> Schema {
        fragment_of(&self.key, ValueType::Set)
    }
}

/// Remove a member from a set-valued quality, failing if it wasn't
/// present.
#[derive(Debug, Clone)]
pub struct Exclude {
    pub key: QualityKey,
    pub member: String,
}

impl Exclude {
    #[must_use]
    pub fn new(key: QualityKey, member: impl Into<String>) -> Self {
        Exclude { key, member: member.into() }
    }
}

impl ActionLike for Exclude {
    fn apply(&self, state: &State, _schema: &Schema) -> Option<State> {
        let QualityValue::Set(set) = state.get(&self.key)? else {
            return None;
        };
        let member = internment::ArcIntern::from(self.member.as_str());
        if !set.contains(&member) {
            return None;
        }
        let mut set = set.clone();
        set.remove(&member);
        let mut qualities = state.qualities().clone();
        if set.is_empty() {
            qualities.remove(&self.key);
        } else {
            qualities.insert(self.key.clone(), QualityValue::Set(set));
        }
        Some(State::new(qualities))
    }

    fn hint(&self) -> EquivHint {
        EquivHint::for_sense(Sense::of(&self.key), false)
    }

    fn schema_fragment(&self) -> Schema {
        fragment_of(&self.key, ValueType::Set)
    }
}

/// Gate `inner` behind a one-time marker: `inner` only applies while
/// `marker` is unset, and applying it sets `marker` afterward. The
/// reconstruction of "this action can only ever be taken once along a
/// path" without giving actions access to search history.
#[derive(Clone)]
pub struct Once {
    pub marker: QualityKey,
    pub inner: Arc<Action>,
}

impl Once {
    #[must_use]
    pub fn new(marker: QualityKey, inner: Action) -> Self {
        Once { marker, inner: Arc::new(inner) }
    }
}

impl fmt::Debug for Once {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Once").field("marker", &self.marker).finish_non_exhaustive()
    }
}

impl ActionLike for Once {
    fn apply(&self, state: &State, schema: &Schema) -> Option<State> {
        if state.get(&self.marker).is_some() {
            return None;
        }
        let next = self.inner.apply(state, schema)?;
        next.add_quality(&self.marker, QualityValue::Bool(true), schema).ok()
    }

    fn hint(&self) -> EquivHint {
        self.inner.hint()
    }

    fn schema_fragment(&self) -> Schema {
        let mut schema = fragment_of(&self.marker, ValueType::Bool);
        schema.merge(&self.inner.schema_fragment()).unwrap();
        schema
    }
}

/// Apply a sequence of actions, short-circuiting to `None` if any step
/// fails. The hint is the worst-case combination of the steps' own hints.
#[derive(Debug, Clone)]
pub struct Chain {
    pub steps: Vec<Action>,
}

impl Chain {
    #[must_use]
    pub fn new(steps: Vec<Action>) -> Self {
        Chain { steps }
    }
}

impl ActionLike for Chain {
    fn apply(&self, state: &State, schema: &Schema) -> Option<State> {
        let mut current = state.clone();
        for step in &self.steps {
            current = step.apply(&current, schema)?;
        }
        Some(current)
    }

    fn hint(&self) -> EquivHint {
        self.steps
            .iter()
            .map(ActionLike::hint)
            .fold(EquivHint::Same, EquivHint::then)
    }

    fn schema_fragment(&self) -> Schema {
        let mut schema = Schema::new();
        for step in &self.steps {
            schema.merge(&step.schema_fragment()).unwrap();
        }
        schema
    }
}

/// Try each alternative in order, taking the first that applies. Models
/// "one of these ways, whichever is available" as a single partial
/// function rather than branching the search, keeping every built-in
/// action a pure `State -> Option<State>`.
#[derive(Debug, Clone)]
pub struct Choice {
    pub alternatives: Vec<Action>,
}

impl Choice {
    #[must_use]
    pub fn new(alternatives: Vec<Action>) -> Self {
        Choice { alternatives }
    }
}

impl ActionLike for Choice {
    fn apply(&self, state: &State, schema: &Schema) -> Option<State> {
        self.alternatives.iter().find_map(|a| a.apply(state, schema))
    }

    fn hint(&self) -> EquivHint {
        self.alternatives
            .iter()
            .map(ActionLike::hint)
            .fold(EquivHint::Same, EquivHint::then)
    }

    fn schema_fragment(&self) -> Schema {
        let mut schema = Schema::new();
        for alt in &self.alternatives {
            schema.merge(&alt.schema_fragment()).unwrap();
        }
        schema
    }
}

type CustomFn = dyn Fn(&State, &Schema) -> Option<State> + Send + Sync;

/// Anything the built-in forms can't express, with an explicit hint
/// supplied by the scenario author.
#[derive(Clone)]
pub struct Custom {
    pub name: String,
    pub hint: EquivHint,
    pub f: Arc<CustomFn>,
    pub touches: Vec<(QualityKey, ValueType)>,
}

impl Custom {
    pub fn new(
        name: impl Into<String>,
        hint: EquivHint,
        touches: Vec<(QualityKey, ValueType)>,
        f: impl Fn(&State, &Schema) -> Option<State> + Send + Sync + 'static,
    ) -> Self {
        Custom { name: name.into(), hint, f: Arc::new(f), touches }
    }
}

impl fmt::Debug for Custom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Custom").field("name", &self.name).field("hint", &self.hint).finish()
    }
}

impl ActionLike for Custom {
    fn apply(&self, state: &State, schema: &Schema) -> Option<State> {
        (self.f)(state, schema)
    }

    fn hint(&self) -> EquivHint {
        self.hint
    }

    fn schema_fragment(&self) -> Schema {
        let mut schema = Schema::new();
        for (key, ty) in &self.touches {
            schema.declare(key.clone(), *ty).unwrap();
        }
        schema
    }
}

#[enum_dispatch(ActionLike)]
#[derive(Debug, Clone)]
pub enum Action {
    Set(Set),
    Reset(Reset),
    Has(Has),
    HasAny(HasAny),
    HasDifferent(HasDifferent),
    Count(Count),
    Lose(Lose),
    Increment(Increment),
    Decrement(Decrement),
    Include(Include),
    Exclude(Exclude),
    Once(Once),
    Chain(Chain),
    Choice(Choice),
    Custom(Custom),
}

fn fragment_of(key: &QualityKey, ty: ValueType) -> Schema {
    let mut schema = Schema::new();
    schema.declare(key.clone(), ty).unwrap();
    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::intern_key;

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema.declare(intern_key("sword"), ValueType::Bool).unwrap();
        schema.declare(intern_key("gold"), ValueType::Int).unwrap();
        schema.declare(intern_key("_hurt"), ValueType::Int).unwrap();
        schema.declare(intern_key("tools"), ValueType::Set).unwrap();
        schema.declare(intern_key("name"), ValueType::Str).unwrap();
        schema
    }

    #[test]
    fn set_true_improves_positive_sense() {
        let action = Set::new(intern_key("sword"), QualityValue::Bool(true));
        assert_eq!(action.hint(), EquivHint::Improve);
    }

    #[test]
    fn set_non_bool_is_unknown() {
        let action = Set::new(intern_key("gold"), QualityValue::Int(5));
        assert_eq!(action.hint(), EquivHint::Unknown);
    }

    #[test]
    fn increment_improves_positive_sense() {
        let action = Increment::new(intern_key("gold"), 5);
        assert_eq!(action.hint(), EquivHint::Improve);
    }

    #[test]
    fn increment_loses_for_negative_sense() {
        let action = Increment::new(intern_key("_hurt"), 5);
        assert_eq!(action.hint(), EquivHint::Loss);
    }

    #[test]
    fn decrement_fails_below_zero() {
        let schema = schema();
        let state = State::new([(intern_key("gold"), QualityValue::Int(2))]);
        let action = Decrement::new(intern_key("gold"), 5);
        assert!(action.apply(&state, &schema).is_none());
    }

    #[test]
    fn has_does_not_modify_state() {
        let schema = schema();
        let state = State::new([(intern_key("gold"), QualityValue::Int(10))]);
        let action = Has::new(intern_key("gold"), QualityValue::Int(5));
        let result = action.apply(&state, &schema).unwrap();
        assert_eq!(result, state);
    }

    #[test]
    fn once_applies_exactly_once() {
        let schema = schema();
        let inner = Action::from(Increment::new(intern_key("gold"), 1));
        let action = Once::new(intern_key("_used_bonus"), inner);
        let state = State::empty();
        let after_first = action.apply(&state, &schema).unwrap();
        assert_eq!(after_first.get(&intern_key("gold")), Some(&QualityValue::Int(1)));
        assert!(action.apply(&after_first, &schema).is_none());
    }

    #[test]
    fn chain_short_circuits() {
        let schema = schema();
        let action = Chain::new(vec![
            Action::from(Decrement::new(intern_key("gold"), 100)),
            Action::from(Increment::new(intern_key("gold"), 1)),
        ]);
        let state = State::empty();
        assert!(action.apply(&state, &schema).is_none());
    }

    #[test]
    fn choice_takes_first_applicable() {
        let schema = schema();
        let action = Choice::new(vec![
            Action::from(Decrement::new(intern_key("gold"), 100)),
            Action::from(Increment::new(intern_key("gold"), 1)),
        ]);
        let state = State::empty();
        let result = action.apply(&state, &schema).unwrap();
        assert_eq!(result.get(&intern_key("gold")), Some(&QualityValue::Int(1)));
    }

    #[test]
    fn exclude_fails_on_missing_member() {
        let schema = schema();
        let state = State::new([(intern_key("tools"), crate::value::singleton_set("rope"))]);
        let action = Exclude::new(intern_key("tools"), "lamp");
        assert!(action.apply(&state, &schema).is_none());
    }

    #[test]
    fn reset_drops_every_other_quality() {
        let schema = schema();
        let state = State::new([
            (intern_key("sword"), QualityValue::Bool(true)),
            (intern_key("gold"), QualityValue::Int(10)),
        ]);
        let action = Reset::new(vec![(intern_key("gold"), QualityValue::Int(1))]);
        let result = action.apply(&state, &schema).unwrap();
        assert_eq!(result.get(&intern_key("sword")), None);
        assert_eq!(result.get(&intern_key("gold")), Some(&QualityValue::Int(1)));
    }

    #[test]
    fn reset_hint_is_unknown() {
        let action = Reset::new(vec![(intern_key("gold"), QualityValue::Int(1))]);
        assert_eq!(action.hint(), EquivHint::Unknown);
    }

    #[test]
    fn count_compares_set_cardinality() {
        let schema = schema();
        let mut set = std::collections::BTreeSet::new();
        set.insert(internment::ArcIntern::from("rope"));
        set.insert(internment::ArcIntern::from("lamp"));
        let state = State::new([(intern_key("tools"), QualityValue::Set(set))]);
        assert!(Count::new(intern_key("tools"), 2).apply(&state, &schema).is_some());
        assert!(Count::new(intern_key("tools"), 3).apply(&state, &schema).is_none());
    }

    #[test]
    fn count_treats_missing_key_as_empty() {
        let schema = schema();
        let state = State::empty();
        assert!(Count::new(intern_key("tools"), 1).apply(&state, &schema).is_none());
        assert!(Count::new(intern_key("tools"), 0).apply(&state, &schema).is_some());
    }

    #[test]
    fn has_different_rejects_forbidden_values() {
        let schema = schema();
        let state = State::new([(intern_key("name"), QualityValue::Str(internment::ArcIntern::from("orc")))]);
        let action = HasDifferent::new(intern_key("name"), [internment::ArcIntern::from("orc")]);
        assert!(action.apply(&state, &schema).is_none());
    }

    #[test]
    fn has_different_passes_when_key_absent_from_forbidden_set() {
        let schema = schema();
        let state = State::new([(intern_key("name"), QualityValue::Str(internment::ArcIntern::from("cyclops")))]);
        let action = HasDifferent::new(intern_key("name"), [internment::ArcIntern::from("orc")]);
        assert!(action.apply(&state, &schema).is_some());
    }

    #[test]
    fn has_different_fails_when_key_missing() {
        let schema = schema();
        let state = State::empty();
        let action = HasDifferent::new(intern_key("name"), [internment::ArcIntern::from("orc")]);
        assert!(action.apply(&state, &schema).is_none());
    }
}
