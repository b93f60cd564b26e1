//! Intervention: graph surgery and model manipulation
//!
//! ```text
//! setup ──► ManipulatedGraph::derive ──► manipulated graph
//!                                            │
//!                   ┌────────────────────────┴─────────────┐
//!                   ▼                                      ▼
//!         manipulate_discrete                     manipulate_linear
//! ```
//!
//! Graph surgery is done once and is shared by both model families. Every
//! stage is a pure function of its inputs; the ground truth is never
//! modified.

pub mod discrete;
pub mod graph;
pub mod linear;

pub use discrete::manipulate_discrete;
pub use graph::{ClassifiedEdge, EdgeClassification, ManipulatedGraph};
pub use linear::{LinearManipulation, UnresolvedMapping, manipulate_linear};

use crate::error::Result;
use crate::graph::CausalGraph;
use crate::setup::ExperimentalSetup;

/// Derive the manipulated graph for `setup`
pub fn manipulate_graph(truth: &CausalGraph, setup: &ExperimentalSetup) -> Result<ManipulatedGraph> {
    ManipulatedGraph::derive(truth, setup)
}
