//! Linear structural equation model
//!
//! Each variable is a linear function of its parents plus an independent
//! error term:
//!
//! ```text
//! X_j = Σ_{p ∈ PA(j)} b_pj · X_p + e_j,    e_j ~ (μ_j, ω_j)
//! ```
//!
//! `b` is the per-edge coefficient, `ω` the per-variable error variance and
//! `μ` the per-variable mean of the error term (the intercept).

use std::fmt;

use rustc_hash::FxHashMap;

use crate::error::{InterventionError, Result};
use crate::graph::CausalGraph;

/// Linear SEM parameters over a graph of continuous variables
#[derive(Clone, Debug, PartialEq)]
pub struct LinearModel {
    graph: CausalGraph,
    /// Keyed by (source position, target position)
    coefficients: FxHashMap<(usize, usize), f64>,
    error_variances: Vec<f64>,
    means: Vec<f64>,
}

impl LinearModel {
    pub const DEFAULT_COEFFICIENT: f64 = 0.0;
    pub const DEFAULT_ERROR_VARIANCE: f64 = 1.0;
    pub const DEFAULT_MEAN: f64 = 0.0;

    /// Model with default parameters on every edge and variable
    pub fn new(graph: CausalGraph) -> Result<Self> {
        if let Some(v) = graph.variables().find(|v| v.domain.is_discrete()) {
            return Err(InterventionError::UnsupportedVariable {
                variable: v.name.clone(),
                family: "linear",
            });
        }
        let coefficients = graph
            .edge_positions()
            .into_iter()
            .map(|edge| (edge, Self::DEFAULT_COEFFICIENT))
            .collect();
        let n = graph.len();
        Ok(LinearModel {
            graph,
            coefficients,
            error_variances: vec![Self::DEFAULT_ERROR_VARIANCE; n],
            means: vec![Self::DEFAULT_MEAN; n],
        })
    }

    pub fn graph(&self) -> &CausalGraph {
        &self.graph
    }

    fn position(&self, variable: &str) -> Result<usize> {
        self.graph
            .position(variable)
            .ok_or_else(|| InterventionError::UnknownVariable(variable.to_string()))
    }

    fn edge_key(&self, from: &str, to: &str) -> Result<(usize, usize)> {
        let key = (self.position(from)?, self.position(to)?);
        if self.coefficients.contains_key(&key) {
            Ok(key)
        } else {
            Err(InterventionError::InvalidSelection(format!(
                "no edge {} --> {}",
                from, to
            )))
        }
    }

    pub fn coefficient(&self, from: &str, to: &str) -> Result<f64> {
        let key = self.edge_key(from, to)?;
        Ok(self.coefficients[&key])
    }

    pub fn set_coefficient(&mut self, from: &str, to: &str, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(InterventionError::invalid_distribution(
                to,
                format!("coefficient {} --> {} must be finite", from, to),
            ));
        }
        let key = self.edge_key(from, to)?;
        self.coefficients.insert(key, value);
        Ok(())
    }

    pub(crate) fn coefficient_at(&self, from: usize, to: usize) -> Option<f64> {
        self.coefficients.get(&(from, to)).copied()
    }

    pub(crate) fn set_coefficient_at(&mut self, from: usize, to: usize, value: f64) {
        self.coefficients.insert((from, to), value);
    }

    pub fn error_variance(&self, variable: &str) -> Result<f64> {
        Ok(self.error_variances[self.position(variable)?])
    }

    pub fn set_error_variance(&mut self, variable: &str, variance: f64) -> Result<()> {
        if !variance.is_finite() || variance < 0.0 {
            return Err(InterventionError::invalid_distribution(
                variable,
                format!("error variance {} must be finite and non-negative", variance),
            ));
        }
        let position = self.position(variable)?;
        self.error_variances[position] = variance;
        Ok(())
    }

    pub fn mean(&self, variable: &str) -> Result<f64> {
        Ok(self.means[self.position(variable)?])
    }

    pub fn set_mean(&mut self, variable: &str, mean: f64) -> Result<()> {
        if !mean.is_finite() {
            return Err(InterventionError::invalid_distribution(
                variable,
                format!("mean {} must be finite", mean),
            ));
        }
        let position = self.position(variable)?;
        self.means[position] = mean;
        Ok(())
    }

    pub(crate) fn error_variance_at(&self, position: usize) -> f64 {
        self.error_variances[position]
    }

    pub(crate) fn mean_at(&self, position: usize) -> f64 {
        self.means[position]
    }

    pub(crate) fn set_parameters_at(&mut self, position: usize, mean: f64, variance: f64) {
        self.means[position] = mean;
        self.error_variances[position] = variance;
    }

    /// Means of the variables implied by the structural equations
    pub fn implied_means(&self) -> Vec<f64> {
        let mut implied = vec![0.0; self.graph.len()];
        for j in self.graph.topological_positions() {
            implied[j] = self.means[j]
                + self
                    .graph
                    .parent_positions(j)
                    .into_iter()
                    .map(|p| self.coefficients[&(p, j)] * implied[p])
                    .sum::<f64>();
        }
        implied
    }

    /// Covariance matrix implied by the model, Σ = (I − B)⁻¹ Ω (I − B)⁻ᵀ
    ///
    /// Computed in topological order: a variable's error term is independent
    /// of every variable placed before it, so each new row only needs the
    /// covariances already filled in.
    pub fn implied_covariance(&self) -> CovarianceMatrix {
        let n = self.graph.len();
        let mut values = vec![vec![0.0; n]; n];
        let mut done: Vec<usize> = Vec::with_capacity(n);

        for j in self.graph.topological_positions() {
            let parents: Vec<(usize, f64)> = self
                .graph
                .parent_positions(j)
                .into_iter()
                .map(|p| (p, self.coefficients[&(p, j)]))
                .collect();

            for &i in &done {
                let cov: f64 = parents.iter().map(|&(p, b)| b * values[i][p]).sum();
                values[i][j] = cov;
                values[j][i] = cov;
            }

            let mut variance = self.error_variances[j];
            for &(p, bp) in &parents {
                for &(q, bq) in &parents {
                    variance += bp * bq * values[p][q];
                }
            }
            values[j][j] = variance;
            done.push(j);
        }

        CovarianceMatrix {
            variables: self.graph.variable_names().into_iter().map(String::from).collect(),
            values,
        }
    }
}

/// Symmetric matrix labelled by variable name, in graph order
#[derive(Clone, Debug, PartialEq)]
pub struct CovarianceMatrix {
    variables: Vec<String>,
    values: Vec<Vec<f64>>,
}

impl CovarianceMatrix {
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.variables.iter().position(|v| v == a)?;
        let j = self.variables.iter().position(|v| v == b)?;
        Some(self.values[i][j])
    }

    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }
}

impl fmt::Display for CovarianceMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let precision = f.precision().unwrap_or(4);
        let width = self
            .variables
            .iter()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max(precision + 4);

        write!(f, "{:width$}", "", width = width)?;
        for name in &self.variables {
            write!(f, " {:>width$}", name, width = width)?;
        }
        writeln!(f)?;
        for (name, row) in self.variables.iter().zip(&self.values) {
            write!(f, "{:width$}", name, width = width)?;
            for value in row {
                write!(f, " {:>width$.precision$}", value, width = width, precision = precision)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Variable;

    /// X -> Y -> Z with b_xy = 2, b_yz = 0.5
    fn chain() -> LinearModel {
        let mut g = CausalGraph::new();
        for name in ["X", "Y", "Z"] {
            g.add_variable(Variable::continuous(name)).unwrap();
        }
        g.add_edge("X", "Y").unwrap();
        g.add_edge("Y", "Z").unwrap();
        let mut model = LinearModel::new(g).unwrap();
        model.set_coefficient("X", "Y", 2.0).unwrap();
        model.set_coefficient("Y", "Z", 0.5).unwrap();
        model.set_error_variance("X", 1.0).unwrap();
        model.set_error_variance("Y", 1.0).unwrap();
        model.set_error_variance("Z", 2.0).unwrap();
        model.set_mean("X", 1.0).unwrap();
        model
    }

    #[test]
    fn test_defaults() {
        let mut g = CausalGraph::new();
        g.add_variable(Variable::continuous("A")).unwrap();
        g.add_variable(Variable::continuous("B")).unwrap();
        g.add_edge("A", "B").unwrap();
        let model = LinearModel::new(g).unwrap();
        assert_eq!(model.coefficient("A", "B").unwrap(), 0.0);
        assert_eq!(model.error_variance("B").unwrap(), 1.0);
        assert_eq!(model.mean("A").unwrap(), 0.0);
        assert!(model.coefficient("B", "A").is_err());
    }

    #[test]
    fn test_rejects_discrete_variables() {
        let mut g = CausalGraph::new();
        g.add_variable(Variable::discrete("D", ["d0", "d1"])).unwrap();
        assert!(LinearModel::new(g).is_err());
    }

    #[test]
    fn test_implied_covariance_chain() {
        let cov = chain().implied_covariance();
        // var(Y) = 4 * 1 + 1, var(Z) = 0.25 * 5 + 2
        assert!((cov.get("X", "X").unwrap() - 1.0).abs() < 1e-12);
        assert!((cov.get("Y", "Y").unwrap() - 5.0).abs() < 1e-12);
        assert!((cov.get("Z", "Z").unwrap() - 3.25).abs() < 1e-12);
        assert!((cov.get("X", "Y").unwrap() - 2.0).abs() < 1e-12);
        assert!((cov.get("X", "Z").unwrap() - 1.0).abs() < 1e-12);
        assert!((cov.get("Y", "Z").unwrap() - 2.5).abs() < 1e-12);
        assert_eq!(cov.get("Z", "Y"), cov.get("Y", "Z"));
    }

    #[test]
    fn test_implied_covariance_collider() {
        let mut g = CausalGraph::new();
        for name in ["A", "B", "C"] {
            g.add_variable(Variable::continuous(name)).unwrap();
        }
        g.add_edge("A", "C").unwrap();
        g.add_edge("B", "C").unwrap();
        let mut model = LinearModel::new(g).unwrap();
        model.set_coefficient("A", "C", 1.0).unwrap();
        model.set_coefficient("B", "C", 3.0).unwrap();
        let cov = model.implied_covariance();
        assert_eq!(cov.get("A", "B"), Some(0.0));
        assert!((cov.get("C", "C").unwrap() - 11.0).abs() < 1e-12);
        assert!((cov.get("B", "C").unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_implied_means() {
        let means = chain().implied_means();
        assert_eq!(means, vec![1.0, 2.0, 1.0]);
    }

    #[test]
    fn test_parameter_validation() {
        let mut model = chain();
        assert!(model.set_error_variance("X", -1.0).is_err());
        assert!(model.set_mean("X", f64::NAN).is_err());
        assert!(model.set_coefficient("X", "Y", f64::INFINITY).is_err());
        assert!(model.mean("Q").is_err());
    }

    #[test]
    fn test_display_matrix() {
        let rendered = format!("{:.2}", chain().implied_covariance());
        assert!(rendered.contains("5.00"));
        assert!(rendered.lines().count() == 4);
    }
}
