//! Discrete probabilistic model: one conditional probability table per variable
//!
//! Table rows are parent-value combinations, indexed with the same mixed-radix
//! rule as the joint table (parents in graph order, last parent fastest).
//! Columns are the variable's own categories.

use tracing::trace;

use crate::error::{InterventionError, Result};
use crate::graph::CausalGraph;
use crate::radix::MixedRadix;

/// P(variable | parents) as a dense row-major table
#[derive(Clone, Debug, PartialEq)]
pub struct ConditionalTable {
    /// Parent positions in the graph, ascending
    parents: Vec<usize>,
    rows: MixedRadix,
    categories: usize,
    probabilities: Vec<f64>,
}

impl ConditionalTable {
    fn uniform(parents: Vec<usize>, parent_radices: Vec<usize>, categories: usize) -> Option<Self> {
        let rows = MixedRadix::new(parent_radices)?;
        let cells = rows.len().checked_mul(categories)?;
        Some(ConditionalTable {
            parents,
            rows,
            categories,
            probabilities: vec![1.0 / categories as f64; cells],
        })
    }

    pub fn parents(&self) -> &[usize] {
        &self.parents
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn category_count(&self) -> usize {
        self.categories
    }

    pub fn probability(&self, row: usize, category: usize) -> f64 {
        self.probabilities[row * self.categories + category]
    }

    /// Distribution over own categories for one parent combination
    pub fn row(&self, row: usize) -> &[f64] {
        let start = row * self.categories;
        &self.probabilities[start..start + self.categories]
    }

    fn row_mut(&mut self, row: usize) -> &mut [f64] {
        let start = row * self.categories;
        &mut self.probabilities[start..start + self.categories]
    }

    /// Row selected by a full assignment of category indices (by graph position)
    fn row_for(&self, assignment: &[usize]) -> usize {
        self.parents
            .iter()
            .enumerate()
            .map(|(i, &parent)| assignment[parent] * self.rows.stride(i))
            .sum()
    }
}

/// Conjunctive constraint: each variable restricted to a set of categories
///
/// Unconstrained variables are marginalized when the proposition is queried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proposition {
    allowed: Vec<Vec<bool>>,
}

impl Proposition {
    /// Proposition that every assignment satisfies
    pub fn tautology(model: &DiscreteModel) -> Self {
        Proposition {
            allowed: model
                .tables
                .iter()
                .map(|t| vec![true; t.categories])
                .collect(),
        }
    }

    /// Restrict the variable at `position` to exactly one category
    pub fn restrict(&mut self, position: usize, category: usize) -> Result<()> {
        let limit = self.allowed.len();
        let allowed = self
            .allowed
            .get_mut(position)
            .ok_or(InterventionError::IndexOutOfRange {
                what: "variable position",
                index: position,
                limit,
            })?;
        if category >= allowed.len() {
            return Err(InterventionError::IndexOutOfRange {
                what: "category",
                index: category,
                limit: allowed.len(),
            });
        }
        for (c, slot) in allowed.iter_mut().enumerate() {
            *slot = *slot && c == category;
        }
        Ok(())
    }

    /// Positions or categories outside the proposition are never allowed
    pub fn allows(&self, position: usize, category: usize) -> bool {
        self.allowed
            .get(position)
            .and_then(|allowed| allowed.get(category))
            .copied()
            .unwrap_or(false)
    }

    pub fn is_constrained(&self, position: usize) -> bool {
        self.allowed
            .get(position)
            .is_some_and(|allowed| allowed.iter().any(|&a| !a))
    }

    /// Both propositions at once; they must cover the same variables and domains
    pub fn and(&self, other: &Proposition) -> Result<Proposition> {
        if !self.same_shape(other) {
            return Err(InterventionError::ModelMismatch(
                "propositions cover different variables".to_string(),
            ));
        }
        Ok(Proposition {
            allowed: self
                .allowed
                .iter()
                .zip(&other.allowed)
                .map(|(a, b)| a.iter().zip(b).map(|(&x, &y)| x && y).collect())
                .collect(),
        })
    }

    fn same_shape(&self, other: &Proposition) -> bool {
        self.allowed.len() == other.allowed.len()
            && self
                .allowed
                .iter()
                .zip(&other.allowed)
                .all(|(a, b)| a.len() == b.len())
    }
}

/// Bayes-net style model over a graph of discrete variables
#[derive(Clone, Debug, PartialEq)]
pub struct DiscreteModel {
    graph: CausalGraph,
    tables: Vec<ConditionalTable>,
}

impl DiscreteModel {
    /// Model with a uniform distribution in every row
    pub fn uniform(graph: CausalGraph) -> Result<Self> {
        let mut sizes = Vec::with_capacity(graph.len());
        for variable in graph.variables() {
            match variable.domain.size() {
                Some(0) => {
                    return Err(InterventionError::invalid_distribution(
                        &variable.name,
                        "domain has no categories",
                    ));
                }
                Some(k) => sizes.push(k),
                None => {
                    return Err(InterventionError::UnsupportedVariable {
                        variable: variable.name.clone(),
                        family: "discrete",
                    });
                }
            }
        }

        let mut tables = Vec::with_capacity(graph.len());
        for (position, &categories) in sizes.iter().enumerate() {
            let parents = graph.parent_positions(position);
            let radices = parents.iter().map(|&p| sizes[p]).collect();
            let table = ConditionalTable::uniform(parents, radices, categories).ok_or_else(|| {
                let name = graph.variable_at(position).map_or("", |v| v.name.as_str());
                InterventionError::invalid_distribution(name, "too many parent combinations")
            })?;
            tables.push(table);
        }

        Ok(DiscreteModel { graph, tables })
    }

    pub fn graph(&self) -> &CausalGraph {
        &self.graph
    }

    pub fn position(&self, variable: &str) -> Result<usize> {
        self.graph
            .position(variable)
            .ok_or_else(|| InterventionError::UnknownVariable(variable.to_string()))
    }

    pub fn table(&self, variable: &str) -> Result<&ConditionalTable> {
        Ok(&self.tables[self.position(variable)?])
    }

    pub fn table_at(&self, position: usize) -> Option<&ConditionalTable> {
        self.tables.get(position)
    }

    pub fn parents(&self, variable: &str) -> Result<Vec<&str>> {
        Ok(self.graph.parents(variable)?)
    }

    pub fn category_count(&self, variable: &str) -> Result<usize> {
        Ok(self.table(variable)?.categories)
    }

    pub fn row_count(&self, variable: &str) -> Result<usize> {
        Ok(self.table(variable)?.row_count())
    }

    pub fn probability(&self, variable: &str, row: usize, category: usize) -> Result<f64> {
        let table = self.table(variable)?;
        check_cell(table, row, category)?;
        Ok(table.probability(row, category))
    }

    pub fn set_probability(
        &mut self,
        variable: &str,
        row: usize,
        category: usize,
        probability: f64,
    ) -> Result<()> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(InterventionError::invalid_distribution(
                variable,
                format!("probability {} is outside [0, 1]", probability),
            ));
        }
        let position = self.position(variable)?;
        let table = &mut self.tables[position];
        check_cell(table, row, category)?;
        table.probabilities[row * table.categories + category] = probability;
        Ok(())
    }

    /// Replace a whole row; it must have one entry per category
    pub fn set_distribution(&mut self, variable: &str, row: usize, distribution: &[f64]) -> Result<()> {
        let position = self.position(variable)?;
        let table = &mut self.tables[position];
        check_cell(table, row, 0)?;
        if distribution.len() != table.categories {
            return Err(InterventionError::invalid_distribution(
                variable,
                format!(
                    "expected {} probabilities, got {}",
                    table.categories,
                    distribution.len()
                ),
            ));
        }
        if let Some(p) = distribution.iter().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(InterventionError::invalid_distribution(
                variable,
                format!("probability {} is outside [0, 1]", p),
            ));
        }
        table.row_mut(row).copy_from_slice(distribution);
        Ok(())
    }

    pub(crate) fn set_row_at(&mut self, position: usize, row: usize, distribution: &[f64]) {
        self.tables[position].row_mut(row).copy_from_slice(distribution);
    }

    /// Row index of a parent-value combination (category indices, parents in graph order)
    pub fn row_index(&self, variable: &str, parent_values: &[usize]) -> Result<usize> {
        let table = self.table(variable)?;
        table
            .rows
            .encode(parent_values)
            .ok_or_else(|| InterventionError::InvalidSelection(format!(
                "{:?} is not a parent combination of '{}'",
                parent_values, variable
            )))
    }

    /// Parent-value combination of a row
    pub fn parent_combination(&self, variable: &str, row: usize) -> Result<Vec<usize>> {
        let table = self.table(variable)?;
        table.rows.decode(row).ok_or(InterventionError::IndexOutOfRange {
            what: "row",
            index: row,
            limit: table.row_count(),
        })
    }

    /// Check that every row sums to one within `tolerance`
    pub fn validate(&self, tolerance: f64) -> Result<()> {
        for (variable, table) in self.graph.variables().zip(&self.tables) {
            for row in 0..table.row_count() {
                let sum: f64 = table.row(row).iter().sum();
                if (sum - 1.0).abs() > tolerance {
                    return Err(InterventionError::invalid_distribution(
                        &variable.name,
                        format!("row {} sums to {}", row, sum),
                    ));
                }
            }
        }
        Ok(())
    }

    /// Proposition fixing each named variable to a category label
    pub fn proposition(&self, assignments: &[(&str, &str)]) -> Result<Proposition> {
        let mut proposition = Proposition::tautology(self);
        for &(variable, label) in assignments {
            let position = self.position(variable)?;
            let category = self.graph.variable_at(position).and_then(|v| v.domain.index_of(label));
            let category = category.ok_or_else(|| {
                InterventionError::InvalidSelection(format!(
                    "'{}' is not a category of '{}'",
                    label, variable
                ))
            })?;
            proposition.restrict(position, category)?;
        }
        Ok(proposition)
    }

    /// Total probability mass of the assignments satisfying `proposition`
    ///
    /// Exact: sums the product of conditionals over every assignment of the
    /// constrained variables and their ancestors. Other variables are barren
    /// for this query and sum out to one.
    ///
    /// A proposition built for another model is a `ModelMismatch`.
    pub fn probability_of(&self, proposition: &Proposition) -> Result<f64> {
        self.check_proposition(proposition)?;
        let relevant = self.relevant_positions(proposition);
        let order: Vec<usize> = self
            .graph
            .topological_positions()
            .into_iter()
            .filter(|&p| relevant[p])
            .collect();
        trace!(variables = order.len(), "summing proposition mass");

        let mut assignment = vec![0; self.tables.len()];
        Ok(self.mass_from(&order, proposition, &mut assignment))
    }

    /// P(assertion | condition); `None` when the condition has no mass
    pub fn conditional_probability(
        &self,
        assertion: &Proposition,
        condition: &Proposition,
    ) -> Result<Option<f64>> {
        let both = assertion.and(condition)?;
        let denominator = self.probability_of(condition)?;
        if denominator == 0.0 {
            return Ok(None);
        }
        Ok(Some(self.probability_of(&both)? / denominator))
    }

    fn check_proposition(&self, proposition: &Proposition) -> Result<()> {
        let matches = proposition.allowed.len() == self.tables.len()
            && proposition
                .allowed
                .iter()
                .zip(&self.tables)
                .all(|(allowed, table)| allowed.len() == table.categories);
        if !matches {
            return Err(InterventionError::ModelMismatch(
                "proposition was built for a different model".to_string(),
            ));
        }
        Ok(())
    }

    fn mass_from(&self, order: &[usize], proposition: &Proposition, assignment: &mut [usize]) -> f64 {
        let Some((&position, rest)) = order.split_first() else {
            return 1.0;
        };
        let table = &self.tables[position];
        let row = table.row_for(assignment);

        let mut total = 0.0;
        for category in 0..table.categories {
            if !proposition.allows(position, category) {
                continue;
            }
            let p = table.probability(row, category);
            if p == 0.0 {
                continue;
            }
            assignment[position] = category;
            total += p * self.mass_from(rest, proposition, assignment);
        }
        total
    }

    /// Constrained variables plus all their ancestors
    fn relevant_positions(&self, proposition: &Proposition) -> Vec<bool> {
        let mut relevant = vec![false; self.tables.len()];
        let mut stack: Vec<usize> = (0..self.tables.len())
            .filter(|&p| proposition.is_constrained(p))
            .collect();
        while let Some(position) = stack.pop() {
            if relevant[position] {
                continue;
            }
            relevant[position] = true;
            stack.extend(self.tables[position].parents.iter().copied());
        }
        relevant
    }
}

fn check_cell(table: &ConditionalTable, row: usize, category: usize) -> Result<()> {
    if row >= table.row_count() {
        return Err(InterventionError::IndexOutOfRange {
            what: "row",
            index: row,
            limit: table.row_count(),
        });
    }
    if category >= table.categories {
        return Err(InterventionError::IndexOutOfRange {
            what: "category",
            index: category,
            limit: table.categories,
        });
    }
    Ok(())
}
