//! Intervention engine for causal models
//!
//! Given a ground-truth causal graph, a probabilistic model over it and an
//! experimental setup naming which variables are randomized or locked, the
//! engine derives the manipulated graph and the manipulated model, and
//! enumerates the joint distribution of the studied variables.
//!
//! # Architecture
//!
//! ```text
//! Scenario → CausalGraph + ProbabilisticModel + ExperimentalSetup
//!          → ManipulatedGraph → manipulated model → JointDistributionTable
//! ```
//!
//! # Example
//!
//! ```
//! use intervention_engine::{
//!     CausalGraph, DiscreteModel, Experiment, ExperimentalSetup, Manipulation, Variable,
//! };
//!
//! let mut graph = CausalGraph::new();
//! graph.add_variable(Variable::discrete("X", ["x0", "x1"])).unwrap();
//! graph.add_variable(Variable::discrete("Y", ["y0", "y1"])).unwrap();
//! graph.add_edge("X", "Y").unwrap();
//!
//! let model = DiscreteModel::uniform(graph).unwrap();
//! let setup = ExperimentalSetup::new()
//!     .manipulate("Y", Manipulation::locked("y1"))
//!     .study(["Y"]);
//!
//! let outcome = Experiment::new(model).run(&setup).unwrap();
//! let joint = outcome.joint.unwrap();
//! assert_eq!(joint.probability_of(1).unwrap(), 1.0);
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod joint;
pub mod manipulate;
pub mod model;
pub mod pipeline;
pub mod radix;
pub mod scenario;
pub mod setup;

pub use config::{ConfigError, EngineConfig};
pub use error::{InterventionError, Result};
pub use graph::{CausalGraph, Domain, Edge, GraphError, Variable, VariableKind};
pub use joint::JointDistributionTable;
pub use manipulate::{
    ClassifiedEdge, EdgeClassification, LinearManipulation, ManipulatedGraph, UnresolvedMapping,
    manipulate_discrete, manipulate_graph, manipulate_linear,
};
pub use model::{
    ConditionalTable, CovarianceMatrix, DiscreteModel, LinearModel, ProbabilisticModel,
    Proposition,
};
pub use pipeline::{Experiment, ExperimentOutcome};
pub use scenario::Scenario;
pub use setup::{ExperimentalSetup, Manipulation, RandomizationParams};
