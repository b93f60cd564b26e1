//! Probabilistic models over a causal graph
//!
//! Two families share one manipulation contract:
//! - [`DiscreteModel`]: conditional probability tables
//! - [`LinearModel`]: linear structural equations

pub mod discrete;
pub mod linear;

pub use discrete::{ConditionalTable, DiscreteModel, Proposition};
pub use linear::{CovarianceMatrix, LinearModel};

use crate::error::Result;
use crate::graph::CausalGraph;
use crate::manipulate::{ManipulatedGraph, UnresolvedMapping, manipulate_discrete, manipulate_linear};
use crate::setup::ExperimentalSetup;

/// A ground-truth or manipulated model of either family
#[derive(Clone, Debug, PartialEq)]
pub enum ProbabilisticModel {
    Discrete(DiscreteModel),
    Linear(LinearModel),
}

impl ProbabilisticModel {
    pub fn graph(&self) -> &CausalGraph {
        match self {
            ProbabilisticModel::Discrete(m) => m.graph(),
            ProbabilisticModel::Linear(m) => m.graph(),
        }
    }

    pub fn family(&self) -> &'static str {
        match self {
            ProbabilisticModel::Discrete(_) => "discrete",
            ProbabilisticModel::Linear(_) => "linear",
        }
    }

    pub fn as_discrete(&self) -> Option<&DiscreteModel> {
        match self {
            ProbabilisticModel::Discrete(m) => Some(m),
            ProbabilisticModel::Linear(_) => None,
        }
    }

    pub fn as_linear(&self) -> Option<&LinearModel> {
        match self {
            ProbabilisticModel::Linear(m) => Some(m),
            ProbabilisticModel::Discrete(_) => None,
        }
    }

    /// Manipulated model of the same family over `manipulated`'s structure
    ///
    /// Also returns the parameters that were only mapped approximately; always
    /// empty for the discrete family.
    pub fn manipulate(
        &self,
        manipulated: &ManipulatedGraph,
        setup: &ExperimentalSetup,
    ) -> Result<(ProbabilisticModel, Vec<UnresolvedMapping>)> {
        match self {
            ProbabilisticModel::Discrete(m) => {
                let model = manipulate_discrete(m, manipulated, setup)?;
                Ok((ProbabilisticModel::Discrete(model), Vec::new()))
            }
            ProbabilisticModel::Linear(m) => {
                let result = manipulate_linear(m, manipulated, setup)?;
                Ok((ProbabilisticModel::Linear(result.model), result.approximations))
            }
        }
    }
}

impl From<DiscreteModel> for ProbabilisticModel {
    fn from(model: DiscreteModel) -> Self {
        ProbabilisticModel::Discrete(model)
    }
}

impl From<LinearModel> for ProbabilisticModel {
    fn from(model: LinearModel) -> Self {
        ProbabilisticModel::Linear(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Variable;
    use crate::setup::Manipulation;

    #[test]
    fn test_dispatch_keeps_family() {
        let mut g = CausalGraph::new();
        g.add_variable(Variable::continuous("A")).unwrap();
        g.add_variable(Variable::continuous("B")).unwrap();
        g.add_edge("A", "B").unwrap();
        let model: ProbabilisticModel = LinearModel::new(g).unwrap().into();
        let setup = ExperimentalSetup::new().manipulate("B", Manipulation::Randomized);
        let m = ManipulatedGraph::derive(model.graph(), &setup).unwrap();

        let (manipulated, approximations) = model.manipulate(&m, &setup).unwrap();
        assert_eq!(manipulated.family(), "linear");
        assert!(manipulated.as_discrete().is_none());
        assert_eq!(manipulated.graph().edge_count(), 0);
        assert!(approximations.is_empty());
    }

    #[test]
    fn test_dispatch_reports_approximations() {
        let mut truth_graph = CausalGraph::new();
        truth_graph.add_variable(Variable::continuous("A")).unwrap();
        truth_graph.add_variable(Variable::continuous("B")).unwrap();
        let model: ProbabilisticModel = LinearModel::new(truth_graph.clone()).unwrap().into();

        let mut wider = truth_graph;
        wider.add_edge("A", "B").unwrap();
        let setup = ExperimentalSetup::new();
        let m = ManipulatedGraph::derive(&wider, &setup).unwrap();

        let (_, approximations) = model.manipulate(&m, &setup).unwrap();
        assert_eq!(
            approximations,
            vec![UnresolvedMapping::Coefficient(crate::graph::Edge::new("A", "B"))]
        );
    }
}
