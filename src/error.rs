//! Error types for catalog ingestion and tick evaluation.
//!
//! Three families, matching how far each one is allowed to travel:
//!   ConfigurationError: load time, the whole catalog is rejected
//!   EvaluationFault:    per tick, per instance, logged and swallowed
//!   OrderingViolation:  a host bug, returned straight to the caller

use thiserror::Error;

/// A malformed rule in the catalog. `rule_id` is the rule's `id`, or
/// `#<index>` when the rule has no usable id.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("rule '{rule_id}': {reason}")]
pub struct ConfigurationError {
    pub rule_id: String,
    pub reason:  String,
}

impl ConfigurationError {
    pub fn new(rule_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { rule_id: rule_id.into(), reason: reason.into() }
    }
}

/// Everything that can go wrong while turning a catalog file into a `Catalog`.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read catalog file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse catalog TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid catalog: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("Built-in catalog is broken: {0}")]
    Builtin(String),
}

/// Why a position predicate could not be evaluated on this tick.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PositionError {
    #[error("no position reported for the subject")]
    Missing,

    #[error("non-finite coordinates ({x}, {y})")]
    NonFinite { x: f32, y: f32 },
}

/// A gating predicate failed for one instance on one tick.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("rule '{rule_id}' could not be evaluated: {source}")]
pub struct EvaluationFault {
    pub rule_id: String,
    #[source]
    pub source:  PositionError,
}

/// A tick arrived with a clock value older than one already processed.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("tick at {now}s arrived after a tick at {last}s")]
pub struct OrderingViolation {
    pub now:  i32,
    pub last: i32,
}
