//! Error taxonomy for the intervention engine
//!
//! Structural and invalid-input errors fail fast and reach the caller.
//! Approximate parameter mappings are not errors: they are absorbed by the
//! manipulators and reported through `tracing`.

use miette::Diagnostic;
use thiserror::Error;

use crate::config::ConfigError;
use crate::graph::GraphError;

/// Result alias used across the engine
pub type Result<T> = std::result::Result<T, InterventionError>;

/// Errors raised by graph surgery, model manipulation and enumeration
#[derive(Debug, Clone, Error, Diagnostic)]
pub enum InterventionError {
    /// A locked or randomized variable still has parents in the manipulated graph.
    #[error(
        "structural violation: manipulated variable '{variable}' has {parents} parent(s) in the manipulated graph"
    )]
    #[diagnostic(
        code(intervention::structural_violation),
        help("derive the manipulated graph from the same experimental setup before manipulating the model")
    )]
    StructuralViolation { variable: String, parents: usize },

    #[error("invalid manipulation for '{variable}': {reason}")]
    #[diagnostic(code(intervention::invalid_manipulation))]
    InvalidManipulation { variable: String, reason: String },

    #[error("unknown variable '{0}'")]
    #[diagnostic(code(intervention::unknown_variable))]
    UnknownVariable(String),

    #[error("model does not match the manipulated graph: {0}")]
    #[diagnostic(code(intervention::model_mismatch))]
    ModelMismatch(String),

    #[error("invalid distribution for '{variable}': {reason}")]
    #[diagnostic(code(intervention::invalid_distribution))]
    InvalidDistribution { variable: String, reason: String },

    #[error("variable '{variable}' is not supported by the {family} model family")]
    #[diagnostic(code(intervention::unsupported_variable))]
    UnsupportedVariable {
        variable: String,
        family: &'static str,
    },

    #[error("invalid variable selection: {0}")]
    #[diagnostic(code(intervention::invalid_selection))]
    InvalidSelection(String),

    #[error("{what} {index} is out of range (limit {limit})")]
    #[diagnostic(code(intervention::index_out_of_range))]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        limit: usize,
    },

    #[error(transparent)]
    #[diagnostic(code(intervention::graph))]
    Graph(#[from] GraphError),

    #[error(transparent)]
    #[diagnostic(code(intervention::config))]
    Config(#[from] ConfigError),

    #[error("scenario error: {0}")]
    #[diagnostic(code(intervention::scenario))]
    Scenario(String),
}

impl InterventionError {
    pub(crate) fn invalid_manipulation(variable: &str, reason: impl Into<String>) -> Self {
        InterventionError::InvalidManipulation {
            variable: variable.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_distribution(variable: &str, reason: impl Into<String>) -> Self {
        InterventionError::InvalidDistribution {
            variable: variable.to_string(),
            reason: reason.into(),
        }
    }

    /// Whether the error signals inconsistent pipeline use rather than bad input
    pub fn is_structural(&self) -> bool {
        matches!(self, InterventionError::StructuralViolation { .. })
    }
}
