//! Graph surgery for an experimental setup
//!
//! For every variable `v` with effective manipulation `m`:
//!
//! ```text
//! m = Randomized   every edge into v is Broken (removed)
//! m = Locked(c)    every edge into v is Broken (removed),
//!                  every edge out of v is Frozen (kept)
//! m = None         v's own edges are untouched
//! ```
//!
//! An edge between two manipulated variables can qualify as both Broken
//! (its target is manipulated) and Frozen (its source is locked). Broken
//! always wins: the edge is no longer in the structure, so it cannot carry a
//! frozen value. Each edge is classified once from both endpoints, so the
//! result does not depend on the order variables are visited in.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::Result;
use crate::graph::{CausalGraph, Edge};
use crate::setup::{ExperimentalSetup, Manipulation};

/// How an intervention affected an edge of the ground-truth graph
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeClassification {
    Normal,
    /// Kept, but the source's value is fixed externally
    Frozen,
    /// Removed from the manipulated structure
    Broken,
}

impl EdgeClassification {
    /// Classification of `source -> target` given both endpoints' manipulations
    pub fn of(source: &Manipulation, target: &Manipulation) -> Self {
        if target.breaks_incoming() {
            EdgeClassification::Broken
        } else if source.freezes_outgoing() {
            EdgeClassification::Frozen
        } else {
            EdgeClassification::Normal
        }
    }
}

impl fmt::Display for EdgeClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EdgeClassification::Normal => write!(f, "normal"),
            EdgeClassification::Frozen => write!(f, "frozen"),
            EdgeClassification::Broken => write!(f, "broken"),
        }
    }
}

/// Ground-truth edge with its classification
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedEdge {
    pub edge: Edge,
    pub classification: EdgeClassification,
}

/// Graph after intervention
///
/// Same variables as the ground truth; broken edges are gone from the
/// structure but stay in the classification record.
#[derive(Clone, Debug)]
pub struct ManipulatedGraph {
    graph: CausalGraph,
    edges: Vec<ClassifiedEdge>,
    /// Effective manipulation per variable position
    manipulations: Vec<Manipulation>,
}

impl ManipulatedGraph {
    /// Apply `setup` to `truth`; the ground truth is left untouched
    pub fn derive(truth: &CausalGraph, setup: &ExperimentalSetup) -> Result<Self> {
        setup.validate(truth)?;

        let manipulations: Vec<Manipulation> = truth
            .variables()
            .map(|v| setup.effective_manipulation(v).clone())
            .collect();

        let mut graph = truth.clone();
        let mut edges = Vec::with_capacity(truth.edge_count());
        for (edge, (from, to)) in truth.edges().into_iter().zip(truth.edge_positions()) {
            let classification = EdgeClassification::of(&manipulations[from], &manipulations[to]);
            if classification == EdgeClassification::Broken {
                graph.remove_edge_at(from, to);
            }
            edges.push(ClassifiedEdge {
                edge,
                classification,
            });
        }

        let manipulated = ManipulatedGraph {
            graph,
            edges,
            manipulations,
        };
        debug!(
            variables = manipulated.graph.len(),
            broken = manipulated.broken_edges().count(),
            frozen = manipulated.frozen_edges().count(),
            "derived manipulated graph"
        );
        Ok(manipulated)
    }

    /// Manipulated structure (broken edges removed)
    pub fn graph(&self) -> &CausalGraph {
        &self.graph
    }

    pub fn into_graph(self) -> CausalGraph {
        self.graph
    }

    /// Every ground-truth edge with its classification, in ground-truth order
    pub fn classified_edges(&self) -> &[ClassifiedEdge] {
        &self.edges
    }

    pub fn classification(&self, from: &str, to: &str) -> Option<EdgeClassification> {
        self.edges
            .iter()
            .find(|c| c.edge.from == from && c.edge.to == to)
            .map(|c| c.classification)
    }

    pub fn broken_edges(&self) -> impl Iterator<Item = &Edge> {
        self.with_classification(EdgeClassification::Broken)
    }

    pub fn frozen_edges(&self) -> impl Iterator<Item = &Edge> {
        self.with_classification(EdgeClassification::Frozen)
    }

    fn with_classification(&self, wanted: EdgeClassification) -> impl Iterator<Item = &Edge> {
        self.edges
            .iter()
            .filter(move |c| c.classification == wanted)
            .map(|c| &c.edge)
    }

    /// Effective manipulation of a variable (`None` for latent variables)
    pub fn manipulation_of(&self, variable: &str) -> Option<&Manipulation> {
        self.graph
            .position(variable)
            .map(|position| &self.manipulations[position])
    }

    pub fn manipulation_at(&self, position: usize) -> Option<&Manipulation> {
        self.manipulations.get(position)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Variable;

    fn chain() -> CausalGraph {
        let mut g = CausalGraph::new();
        g.add_variable(Variable::discrete("X", ["x0", "x1"])).unwrap();
        g.add_variable(Variable::discrete("Y", ["v0", "v1"])).unwrap();
        g.add_variable(Variable::discrete("Z", ["z0", "z1"])).unwrap();
        g.add_edge("X", "Y").unwrap();
        g.add_edge("Y", "Z").unwrap();
        g
    }

    #[test]
    fn test_no_manipulation_keeps_everything() {
        let g = chain();
        let m = ManipulatedGraph::derive(&g, &ExperimentalSetup::new()).unwrap();
        assert_eq!(m.graph().edges(), g.edges());
        assert!(
            m.classified_edges()
                .iter()
                .all(|c| c.classification == EdgeClassification::Normal)
        );
    }

    #[test]
    fn test_lock_breaks_incoming_and_freezes_outgoing() {
        let g = chain();
        let setup = ExperimentalSetup::new().manipulate("Y", Manipulation::locked("v1"));
        let m = ManipulatedGraph::derive(&g, &setup).unwrap();

        assert_eq!(m.classification("X", "Y"), Some(EdgeClassification::Broken));
        assert_eq!(m.classification("Y", "Z"), Some(EdgeClassification::Frozen));
        assert!(!m.graph().contains_edge("X", "Y"));
        assert!(m.graph().contains_edge("Y", "Z"));
        // ground truth untouched
        assert!(g.contains_edge("X", "Y"));
        assert_eq!(m.graph().len(), g.len());
    }

    #[test]
    fn test_randomize_breaks_incoming_only() {
        let g = chain();
        let setup = ExperimentalSetup::new().manipulate("Y", Manipulation::Randomized);
        let m = ManipulatedGraph::derive(&g, &setup).unwrap();
        assert_eq!(m.classification("X", "Y"), Some(EdgeClassification::Broken));
        assert_eq!(m.classification("Y", "Z"), Some(EdgeClassification::Normal));
        assert_eq!(m.broken_edges().count(), 1);
        assert_eq!(m.frozen_edges().count(), 0);
    }

    #[test]
    fn test_broken_wins_between_locked_neighbours() {
        let g = chain();
        let setup = ExperimentalSetup::new()
            .manipulate("X", Manipulation::locked("x0"))
            .manipulate("Y", Manipulation::locked("v1"));
        let m = ManipulatedGraph::derive(&g, &setup).unwrap();
        assert_eq!(m.classification("X", "Y"), Some(EdgeClassification::Broken));
        assert!(!m.graph().contains_edge("X", "Y"));
        assert_eq!(m.classification("Y", "Z"), Some(EdgeClassification::Frozen));
    }

    #[test]
    fn test_latent_variables_are_passive() {
        let mut g = CausalGraph::new();
        g.add_variable(Variable::discrete("U", ["u0", "u1"]).latent())
            .unwrap();
        g.add_variable(Variable::discrete("X", ["x0", "x1"])).unwrap();
        g.add_variable(Variable::discrete("L", ["l0", "l1"]).latent())
            .unwrap();
        g.add_edge("U", "X").unwrap();
        g.add_edge("X", "L").unwrap();
        let setup = ExperimentalSetup::new().manipulate("L", Manipulation::Randomized);
        let m = ManipulatedGraph::derive(&g, &setup).unwrap();
        assert_eq!(m.classification("X", "L"), Some(EdgeClassification::Normal));
        assert_eq!(m.manipulation_of("L"), Some(&Manipulation::None));
    }

    #[test]
    fn test_rejects_invalid_setup() {
        let g = chain();
        let setup = ExperimentalSetup::new().manipulate("Y", Manipulation::locked("v9"));
        assert!(ManipulatedGraph::derive(&g, &setup).is_err());
    }

    #[test]
    fn test_classification_rule() {
        use EdgeClassification::*;
        let none = Manipulation::None;
        let random = Manipulation::Randomized;
        let locked = Manipulation::locked("a");
        assert_eq!(EdgeClassification::of(&none, &none), Normal);
        assert_eq!(EdgeClassification::of(&random, &none), Normal);
        assert_eq!(EdgeClassification::of(&locked, &none), Frozen);
        assert_eq!(EdgeClassification::of(&none, &random), Broken);
        assert_eq!(EdgeClassification::of(&locked, &random), Broken);
        assert_eq!(EdgeClassification::of(&locked, &locked), Broken);
    }
}
