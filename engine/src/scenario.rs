//! Scenario files: a ground-truth graph, its model and an experimental setup
//!
//! ```toml
//! [[variables]]
//! name = "X"
//! categories = ["x0", "x1"]
//!
//! [[variables]]
//! name = "Y"
//! categories = ["v0", "v1"]
//!
//! [[edges]]
//! from = "X"
//! to = "Y"
//!
//! [model]
//! family = "discrete"
//! tables = [
//!     { variable = "X", rows = [[0.5, 0.5]] },
//!     { variable = "Y", rows = [[0.9, 0.1], [0.2, 0.8]] },
//! ]
//!
//! [setup]
//! studied = ["X", "Y"]
//! manipulations = { Y = { type = "locked", value = "v1" } }
//! ```
//!
//! Conditional rows are listed in parent-combination order: parents in
//! variable order, last parent varying fastest. A variable without a table
//! stays uniform. Variables without `categories` are continuous.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{InterventionError, Result};
use crate::graph::{CausalGraph, Domain, Variable, VariableKind};
use crate::model::{DiscreteModel, LinearModel, ProbabilisticModel};
use crate::setup::{ExperimentalSetup, Manipulation, RandomizationParams};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableSpec {
    pub name: String,
    #[serde(default)]
    pub kind: VariableKind,
    /// Absent for continuous variables
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub variable: String,
    pub rows: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoefficientSpec {
    pub from: String,
    pub to: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "family", rename_all = "lowercase")]
pub enum ModelSpec {
    Discrete {
        #[serde(default)]
        tables: Vec<TableSpec>,
    },
    Linear {
        #[serde(default)]
        coefficients: Vec<CoefficientSpec>,
        #[serde(default)]
        variances: BTreeMap<String, f64>,
        #[serde(default)]
        means: BTreeMap<String, f64>,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SetupSpec {
    #[serde(default)]
    pub manipulations: BTreeMap<String, Manipulation>,
    #[serde(default)]
    pub studied: Vec<String>,
    #[serde(default)]
    pub randomization: BTreeMap<String, RandomizationParams>,
}

/// Everything needed to run one experiment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub variables: Vec<VariableSpec>,
    #[serde(default)]
    pub edges: Vec<EdgeSpec>,
    pub model: ModelSpec,
    #[serde(default)]
    pub setup: SetupSpec,
}

impl Scenario {
    /// Load from a .toml or .json file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| InterventionError::Scenario(format!("{}: {}", path.display(), e)))?;

        if path.extension().map(|e| e == "json").unwrap_or(false) {
            Self::from_json(&content)
        } else {
            Self::from_toml(&content)
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| InterventionError::Scenario(e.to_string()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| InterventionError::Scenario(e.to_string()))
    }

    pub fn graph(&self) -> Result<CausalGraph> {
        let mut graph = CausalGraph::new();
        for spec in &self.variables {
            let domain = match &spec.categories {
                Some(categories) => Domain::Discrete(categories.clone()),
                None => Domain::Continuous,
            };
            graph.add_variable(Variable::new(spec.name.clone(), spec.kind, domain))?;
        }
        for edge in &self.edges {
            graph.add_edge(&edge.from, &edge.to)?;
        }
        Ok(graph)
    }

    pub fn model(&self, graph: CausalGraph) -> Result<ProbabilisticModel> {
        match &self.model {
            ModelSpec::Discrete { tables } => {
                let mut model = DiscreteModel::uniform(graph)?;
                for table in tables {
                    let expected = model.row_count(&table.variable)?;
                    if table.rows.len() != expected {
                        return Err(InterventionError::invalid_distribution(
                            &table.variable,
                            format!("expected {} rows, got {}", expected, table.rows.len()),
                        ));
                    }
                    for (row, distribution) in table.rows.iter().enumerate() {
                        model.set_distribution(&table.variable, row, distribution)?;
                    }
                }
                Ok(ProbabilisticModel::Discrete(model))
            }
            ModelSpec::Linear {
                coefficients,
                variances,
                means,
            } => {
                let mut model = LinearModel::new(graph)?;
                for c in coefficients {
                    model.set_coefficient(&c.from, &c.to, c.value)?;
                }
                for (variable, &variance) in variances {
                    model.set_error_variance(variable, variance)?;
                }
                for (variable, &mean) in means {
                    model.set_mean(variable, mean)?;
                }
                Ok(ProbabilisticModel::Linear(model))
            }
        }
    }

    pub fn setup(&self, defaults: RandomizationParams) -> ExperimentalSetup {
        let mut setup = ExperimentalSetup::new().with_default_randomization(defaults);
        for (variable, manipulation) in &self.setup.manipulations {
            setup.set_manipulation(variable.clone(), manipulation.clone());
        }
        for variable in &self.setup.studied {
            setup.set_studied(variable.clone(), true);
        }
        for (variable, params) in &self.setup.randomization {
            setup.set_randomization(variable.clone(), params.mean, params.std_dev);
        }
        setup
    }

    /// Ground-truth model (carrying its graph) and the setup
    ///
    /// Discrete tables are checked against the configured tolerance.
    pub fn build(&self, config: &EngineConfig) -> Result<(ProbabilisticModel, ExperimentalSetup)> {
        let model = self.model(self.graph()?)?;
        if let ProbabilisticModel::Discrete(discrete) = &model {
            discrete.validate(config.probability_tolerance)?;
        }
        Ok((model, self.setup(config.default_randomization())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCKED: &str = r#"
[[variables]]
name = "X"
categories = ["x0", "x1"]

[[variables]]
name = "Y"
categories = ["v0", "v1"]

[[edges]]
from = "X"
to = "Y"

[model]
family = "discrete"
tables = [
    { variable = "X", rows = [[0.25, 0.75]] },
    { variable = "Y", rows = [[0.9, 0.1], [0.2, 0.8]] },
]

[setup]
studied = ["X", "Y"]
manipulations = { Y = { type = "locked", value = "v1" } }
"#;

    #[test]
    fn test_parse_discrete_scenario() {
        let scenario = Scenario::from_toml(LOCKED).unwrap();
        let (model, setup) = scenario.build(&EngineConfig::default()).unwrap();
        let discrete = model.as_discrete().unwrap();
        assert_eq!(discrete.probability("Y", 1, 1).unwrap(), 0.8);
        assert_eq!(setup.manipulation_of("Y"), &Manipulation::locked("v1"));
        assert!(setup.is_studied("X"));
    }

    #[test]
    fn test_parse_linear_scenario() {
        let json = r#"{
            "variables": [{"name": "A"}, {"name": "B", "kind": "latent"}],
            "edges": [{"from": "A", "to": "B"}],
            "model": {
                "family": "linear",
                "coefficients": [{"from": "A", "to": "B", "value": 0.7}],
                "variances": {"B": 0.5},
                "means": {"A": 2.0}
            },
            "setup": {
                "manipulations": {"A": {"type": "randomized"}},
                "randomization": {"A": {"mean": 1.0, "std_dev": 2.0}}
            }
        }"#;
        let scenario = Scenario::from_json(json).unwrap();
        let (model, setup) = scenario.build(&EngineConfig::default()).unwrap();
        let linear = model.as_linear().unwrap();
        assert_eq!(linear.coefficient("A", "B").unwrap(), 0.7);
        assert_eq!(linear.error_variance("B").unwrap(), 0.5);
        assert!(linear.graph().variable("B").unwrap().is_latent());
        assert_eq!(setup.randomization_of("A").variance(), 4.0);
    }

    #[test]
    fn test_wrong_row_count() {
        let broken = LOCKED.replace("[[0.9, 0.1], [0.2, 0.8]]", "[[0.9, 0.1]]");
        let scenario = Scenario::from_toml(&broken).unwrap();
        assert!(matches!(
            scenario.build(&EngineConfig::default()),
            Err(InterventionError::InvalidDistribution { .. })
        ));
    }

    #[test]
    fn test_cyclic_scenario_is_rejected() {
        let mut scenario = Scenario::from_toml(LOCKED).unwrap();
        scenario.edges.push(EdgeSpec {
            from: "Y".to_string(),
            to: "X".to_string(),
        });
        assert!(matches!(scenario.graph(), Err(InterventionError::Graph(_))));
    }

    #[test]
    fn test_unnormalized_table_is_rejected() {
        let skewed = LOCKED.replace("[[0.25, 0.75]]", "[[0.25, 0.5]]");
        let scenario = Scenario::from_toml(&skewed).unwrap();
        assert!(scenario.build(&EngineConfig::default()).is_err());
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            Scenario::from_toml("variables = 3"),
            Err(InterventionError::Scenario(_))
        ));
    }
}
