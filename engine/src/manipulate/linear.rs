//! Linear model manipulation
//!
//! Fresh parameters are created for every edge and variable of the
//! manipulated graph, then carried over from the ground truth:
//! - coefficients of edges kept in both structures are copied verbatim
//! - error variances and means are copied per variable
//! - `Randomized` variables take the setup's mean and std-dev squared
//!
//! `Locked` variables get no mean or variance treatment in this family: the
//! graph loses their incoming edges, but the error term is inherited as for a
//! passive variable. A point mass at the locked value is not modelled here.

use tracing::{debug, warn};

use super::graph::ManipulatedGraph;
use crate::error::{InterventionError, Result};
use crate::graph::Edge;
use crate::model::linear::LinearModel;
use crate::setup::{ExperimentalSetup, Manipulation};

/// Parameter that had no exact counterpart in the ground truth
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UnresolvedMapping {
    /// Edge present in the manipulated graph but not in the ground truth
    Coefficient(Edge),
}

/// Manipulated linear model plus the approximations made building it
#[derive(Clone, Debug)]
pub struct LinearManipulation {
    pub model: LinearModel,
    pub approximations: Vec<UnresolvedMapping>,
}

impl LinearManipulation {
    pub fn is_exact(&self) -> bool {
        self.approximations.is_empty()
    }
}

pub fn manipulate_linear(
    truth: &LinearModel,
    manipulated: &ManipulatedGraph,
    setup: &ExperimentalSetup,
) -> Result<LinearManipulation> {
    let graph = manipulated.graph();
    if !truth.graph().same_variables(graph) {
        return Err(InterventionError::ModelMismatch(
            "manipulated graph has a different variable set".to_string(),
        ));
    }

    let mut model = LinearModel::new(graph.clone())?;
    let mut approximations = Vec::new();

    for (edge, (from, to)) in graph.edges().into_iter().zip(graph.edge_positions()) {
        match truth.coefficient_at(from, to) {
            Some(value) => model.set_coefficient_at(from, to, value),
            None => {
                warn!(edge = %edge, "no ground-truth coefficient, keeping default");
                approximations.push(UnresolvedMapping::Coefficient(edge));
            }
        }
    }

    for (position, variable) in graph.variables().enumerate() {
        let (mean, variance) = match setup.effective_manipulation(variable) {
            Manipulation::Randomized => {
                let params = setup.randomization_of(&variable.name);
                (params.mean, params.variance())
            }
            Manipulation::Locked(value) => {
                debug!(
                    variable = %variable.name,
                    value = %value,
                    "locked continuous variable keeps inherited mean and variance"
                );
                (truth.mean_at(position), truth.error_variance_at(position))
            }
            Manipulation::None => (truth.mean_at(position), truth.error_variance_at(position)),
        };
        model.set_parameters_at(position, mean, variance);
    }

    Ok(LinearManipulation {
        model,
        approximations,
    })
}
