//! Causal Graph: DAG over typed variables
//!
//! The graph collaborator the engine performs surgery on:
//! - Variables are observed or latent, with a discrete or continuous domain
//! - Edges are direct causal edges; the graph stays acyclic
//! - Variables are never removed, so a variable's position is stable and is
//!   used by the models to index their parameter tables
//!
//! Parent and child lists, edge lists and topological orders are all reported
//! in variable insertion order so that every derived table is deterministic.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::fmt;

use petgraph::Direction;
use petgraph::algo::has_path_connecting;
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::{EdgeRef, IntoEdgeReferences};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Observed or latent
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    #[default]
    Observed,
    Latent,
}

/// Value domain for a variable
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Ordered category labels
    Discrete(Vec<String>),
    /// Real-valued
    Continuous,
}

impl Domain {
    pub fn categories(&self) -> Option<&[String]> {
        match self {
            Domain::Discrete(labels) => Some(labels),
            Domain::Continuous => None,
        }
    }

    /// Number of categories, `None` for continuous domains
    pub fn size(&self) -> Option<usize> {
        self.categories().map(<[String]>::len)
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.categories()?.iter().position(|c| c == label)
    }

    pub fn is_discrete(&self) -> bool {
        matches!(self, Domain::Discrete(_))
    }
}

/// Node in the causal graph
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Variable {
    /// Unique within a graph
    pub name: String,
    pub kind: VariableKind,
    pub domain: Domain,
}

impl Variable {
    pub fn new(name: impl Into<String>, kind: VariableKind, domain: Domain) -> Self {
        Variable {
            name: name.into(),
            kind,
            domain,
        }
    }

    /// Observed discrete variable with the given category labels
    pub fn discrete<S: Into<String>>(
        name: impl Into<String>,
        categories: impl IntoIterator<Item = S>,
    ) -> Self {
        Variable::new(
            name,
            VariableKind::Observed,
            Domain::Discrete(categories.into_iter().map(Into::into).collect()),
        )
    }

    /// Observed continuous variable
    pub fn continuous(name: impl Into<String>) -> Self {
        Variable::new(name, VariableKind::Observed, Domain::Continuous)
    }

    /// Turn this variable into a latent one, keeping its domain
    pub fn latent(mut self) -> Self {
        self.kind = VariableKind::Latent;
        self
    }

    pub fn is_latent(&self) -> bool {
        self.kind == VariableKind::Latent
    }
}

/// Directed edge, reported by name
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
}

impl Edge {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Edge {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} --> {}", self.from, self.to)
    }
}

/// Causal directed acyclic graph
#[derive(Clone, Debug, Default)]
pub struct CausalGraph {
    inner: StableDiGraph<Variable, ()>,
    /// Name to node lookup
    index: FxHashMap<String, NodeIndex>,
}

impl CausalGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable; names must be unique
    pub fn add_variable(&mut self, variable: Variable) -> Result<(), GraphError> {
        if self.index.contains_key(&variable.name) {
            return Err(GraphError::DuplicateVariable(variable.name));
        }
        let name = variable.name.clone();
        let node = self.inner.add_node(variable);
        debug_assert_eq!(node.index(), self.index.len());
        self.index.insert(name, node);
        Ok(())
    }

    pub fn contains_variable(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.index.get(name).map(|&node| &self.inner[node])
    }

    /// Variable at a position (insertion order)
    pub fn variable_at(&self, position: usize) -> Option<&Variable> {
        self.inner.node_weight(NodeIndex::new(position))
    }

    /// Position of a variable in insertion order
    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).map(|node| node.index())
    }

    /// All variables in insertion order
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        (0..self.len()).filter_map(move |i| self.variable_at(i))
    }

    pub fn variable_names(&self) -> Vec<&str> {
        self.variables().map(|v| v.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn edge_count(&self) -> usize {
        self.inner.edge_count()
    }

    /// Add a direct edge, rejecting self loops, duplicates and cycles
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<(), GraphError> {
        let source = self.node(from)?;
        let target = self.node(to)?;

        if source == target {
            return Err(GraphError::SelfLoop(from.to_string()));
        }
        if self.inner.contains_edge(source, target) {
            return Err(GraphError::DuplicateEdge {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        // from -> to closes a cycle iff `to` already reaches `from`
        if has_path_connecting(&self.inner, target, source, None) {
            return Err(GraphError::CycleDetected {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        self.inner.add_edge(source, target, ());
        Ok(())
    }

    /// Remove an edge; returns whether it was present
    pub fn remove_edge(&mut self, from: &str, to: &str) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&source), Some(&target)) => self.remove_edge_between(source, target),
            _ => false,
        }
    }

    pub(crate) fn remove_edge_at(&mut self, from: usize, to: usize) -> bool {
        self.remove_edge_between(NodeIndex::new(from), NodeIndex::new(to))
    }

    fn remove_edge_between(&mut self, source: NodeIndex, target: NodeIndex) -> bool {
        match self.inner.find_edge(source, target) {
            Some(edge) => self.inner.remove_edge(edge).is_some(),
            None => false,
        }
    }

    pub fn contains_edge(&self, from: &str, to: &str) -> bool {
        match (self.index.get(from), self.index.get(to)) {
            (Some(&source), Some(&target)) => self.inner.contains_edge(source, target),
            _ => false,
        }
    }

    /// Edges as (source position, target position), ordered by source then target
    pub fn edge_positions(&self) -> Vec<(usize, usize)> {
        let mut pairs: Vec<(usize, usize)> = self
            .inner
            .edge_references()
            .map(|e| (e.source().index(), e.target().index()))
            .collect();
        pairs.sort_unstable();
        pairs
    }

    /// Edges by name, ordered like [`CausalGraph::edge_positions`]
    pub fn edges(&self) -> Vec<Edge> {
        self.edge_positions()
            .into_iter()
            .map(|(from, to)| Edge::new(self.name_at(from), self.name_at(to)))
            .collect()
    }

    /// Parent positions of the variable at `position`, ascending
    pub fn parent_positions(&self, position: usize) -> Vec<usize> {
        self.neighbor_positions(position, Direction::Incoming)
    }

    /// Child positions of the variable at `position`, ascending
    pub fn child_positions(&self, position: usize) -> Vec<usize> {
        self.neighbor_positions(position, Direction::Outgoing)
    }

    pub fn parents(&self, name: &str) -> Result<Vec<&str>, GraphError> {
        let position = self.node(name)?.index();
        Ok(self
            .parent_positions(position)
            .into_iter()
            .map(|p| self.name_at(p))
            .collect())
    }

    pub fn children(&self, name: &str) -> Result<Vec<&str>, GraphError> {
        let position = self.node(name)?.index();
        Ok(self
            .child_positions(position)
            .into_iter()
            .map(|c| self.name_at(c))
            .collect())
    }

    pub fn in_degree(&self, name: &str) -> Result<usize, GraphError> {
        let node = self.node(name)?;
        Ok(self.inner.edges_directed(node, Direction::Incoming).count())
    }

    pub fn out_degree(&self, name: &str) -> Result<usize, GraphError> {
        let node = self.node(name)?;
        Ok(self.inner.edges_directed(node, Direction::Outgoing).count())
    }

    /// Topological order of positions; ties go to the earlier-inserted variable
    pub fn topological_positions(&self) -> Vec<usize> {
        let n = self.len();
        let mut remaining: Vec<usize> = (0..n).map(|i| self.parent_positions(i).len()).collect();
        let mut ready: BinaryHeap<Reverse<usize>> = remaining
            .iter()
            .enumerate()
            .filter(|&(_, &d)| d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();
        let mut order = Vec::with_capacity(n);

        while let Some(Reverse(position)) = ready.pop() {
            order.push(position);
            for child in self.child_positions(position) {
                remaining[child] -= 1;
                if remaining[child] == 0 {
                    ready.push(Reverse(child));
                }
            }
        }

        order
    }

    pub fn topological_order(&self) -> Vec<&str> {
        self.topological_positions()
            .into_iter()
            .map(|p| self.name_at(p))
            .collect()
    }

    /// Whether both graphs declare the same variables in the same order
    pub fn same_variables(&self, other: &CausalGraph) -> bool {
        self.len() == other.len() && self.variables().zip(other.variables()).all(|(a, b)| a == b)
    }

    fn node(&self, name: &str) -> Result<NodeIndex, GraphError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| GraphError::UnknownVariable(name.to_string()))
    }

    fn name_at(&self, position: usize) -> &str {
        &self.inner[NodeIndex::new(position)].name
    }

    fn neighbor_positions(&self, position: usize, direction: Direction) -> Vec<usize> {
        let mut positions: Vec<usize> = self
            .inner
            .neighbors_directed(NodeIndex::new(position), direction)
            .map(|n| n.index())
            .collect();
        positions.sort_unstable();
        positions
    }
}

impl PartialEq for CausalGraph {
    fn eq(&self, other: &Self) -> bool {
        self.same_variables(other) && self.edge_positions() == other.edge_positions()
    }
}

/// Errors from graph construction and edits
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("variable '{0}' not found in graph")]
    UnknownVariable(String),

    #[error("variable '{0}' already exists")]
    DuplicateVariable(String),

    #[error("edge {from} --> {to} already exists")]
    DuplicateEdge { from: String, to: String },

    #[error("self loop on '{0}'")]
    SelfLoop(String),

    #[error("adding edge {from} --> {to} would create a cycle")]
    CycleDetected { from: String, to: String },
}
