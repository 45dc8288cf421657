//! The error taxonomy: schema errors and name errors are surfaced
//! immediately to the caller; run-time constraint failures are `None`,
//! never an `Err`; a reached generation limit is a logged warning, not a
//! failure (see [`crate::graph`]); test failure is carried in
//! [`crate::test_runner::TestReport`].

use crate::{QualityKey, schema::ValueType};
use thiserror::Error;

/// Top-level error type returned by fallible `plotex_core` operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlotexError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("no such {kind}: \"{name}\"")]
    UnknownName { kind: NameKind, name: String },
}

/// What kind of name a lookup failed to resolve, for the CLI's
/// `-s`/`--block`/`-t`/`-f`/`-H` style options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    State,
    Action,
    Quality,
    Test,
}

impl std::fmt::Display for NameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NameKind::State => "state",
            NameKind::Action => "action",
            NameKind::Quality => "quality",
            NameKind::Test => "test",
        };
        f.write_str(s)
    }
}

/// Schema-assembly failures: inconsistent type declarations for a key,
/// or an attempt to touch a key outside the declared schema.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    #[error("inconsistent types for quality \"{key}\": {first:?} vs {second:?}")]
    InconsistentType {
        key: QualityKey,
        first: ValueType,
        second: ValueType,
    },

    #[error("quality \"{0}\" is not declared in this scenario's schema")]
    UndeclaredQuality(QualityKey),

    #[error("quality \"{key}\" expects a {expected:?} value, got {got:?}")]
    ValueTypeMismatch {
        key: QualityKey,
        expected: ValueType,
        got: ValueType,
    },
}
