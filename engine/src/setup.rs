//! Experimental setup: which variables are manipulated, and how
//!
//! A setup is edited by outer tooling and consumed here read-only. Latent
//! variables are always treated as passively observed, whatever the setup
//! records for them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{InterventionError, Result};
use crate::graph::{CausalGraph, Domain, Variable};

/// Intervention applied to a single variable
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Manipulation {
    /// Passively observed
    #[default]
    None,
    /// Forced to vary independently of its causal parents
    Randomized,
    /// Forced to a single value of its domain
    Locked(String),
}

static PASSIVE: Manipulation = Manipulation::None;

impl Manipulation {
    pub fn locked(value: impl Into<String>) -> Self {
        Manipulation::Locked(value.into())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Manipulation::None)
    }

    pub fn locked_value(&self) -> Option<&str> {
        match self {
            Manipulation::Locked(value) => Some(value),
            _ => None,
        }
    }

    /// Randomizing or locking severs the variable from its causes
    pub fn breaks_incoming(&self) -> bool {
        !self.is_none()
    }

    /// Locking fixes the value seen by every child
    pub fn freezes_outgoing(&self) -> bool {
        matches!(self, Manipulation::Locked(_))
    }
}

impl fmt::Display for Manipulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Manipulation::None => write!(f, "none"),
            Manipulation::Randomized => write!(f, "randomized"),
            Manipulation::Locked(value) => write!(f, "locked({})", value),
        }
    }
}

/// Distribution parameters for a randomized continuous variable
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RandomizationParams {
    pub mean: f64,
    pub std_dev: f64,
}

impl RandomizationParams {
    pub fn new(mean: f64, std_dev: f64) -> Self {
        RandomizationParams { mean, std_dev }
    }

    pub fn variance(&self) -> f64 {
        self.std_dev * self.std_dev
    }
}

impl Default for RandomizationParams {
    fn default() -> Self {
        RandomizationParams::new(0.0, 1.0)
    }
}

/// Per-variable manipulation, studied flag and randomization parameters
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperimentalSetup {
    #[serde(default)]
    manipulations: BTreeMap<String, Manipulation>,
    #[serde(default)]
    studied: BTreeMap<String, bool>,
    #[serde(default)]
    randomization: BTreeMap<String, RandomizationParams>,
    /// Used for randomized variables without declared parameters
    #[serde(default)]
    default_randomization: RandomizationParams,
}

impl ExperimentalSetup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_randomization(mut self, params: RandomizationParams) -> Self {
        self.default_randomization = params;
        self
    }

    pub fn set_manipulation(&mut self, variable: impl Into<String>, manipulation: Manipulation) {
        self.manipulations.insert(variable.into(), manipulation);
    }

    /// Builder form of [`ExperimentalSetup::set_manipulation`]
    pub fn manipulate(mut self, variable: impl Into<String>, manipulation: Manipulation) -> Self {
        self.set_manipulation(variable, manipulation);
        self
    }

    /// Recorded manipulation, `None` when nothing was recorded
    pub fn manipulation_of(&self, variable: &str) -> &Manipulation {
        self.manipulations.get(variable).unwrap_or(&PASSIVE)
    }

    /// Manipulation as applied to `variable`: latent variables are never manipulated
    pub fn effective_manipulation(&self, variable: &Variable) -> &Manipulation {
        if variable.is_latent() {
            &PASSIVE
        } else {
            self.manipulation_of(&variable.name)
        }
    }

    pub fn set_studied(&mut self, variable: impl Into<String>, studied: bool) {
        self.studied.insert(variable.into(), studied);
    }

    /// Builder form marking each variable as studied
    pub fn study<S: Into<String>>(mut self, variables: impl IntoIterator<Item = S>) -> Self {
        for variable in variables {
            self.set_studied(variable, true);
        }
        self
    }

    pub fn is_studied(&self, variable: &str) -> bool {
        self.studied.get(variable).copied().unwrap_or(false)
    }

    /// Studied variables, in graph order
    pub fn studied_variables<'g>(&self, graph: &'g CausalGraph) -> Vec<&'g str> {
        graph
            .variables()
            .filter(|v| self.is_studied(&v.name))
            .map(|v| v.name.as_str())
            .collect()
    }

    pub fn set_randomization(&mut self, variable: impl Into<String>, mean: f64, std_dev: f64) {
        self.randomization
            .insert(variable.into(), RandomizationParams::new(mean, std_dev));
    }

    pub fn randomization_of(&self, variable: &str) -> RandomizationParams {
        self.randomization
            .get(variable)
            .copied()
            .unwrap_or(self.default_randomization)
    }

    /// Variables with a recorded manipulation other than `None`
    pub fn manipulated_variables(&self) -> impl Iterator<Item = (&str, &Manipulation)> {
        self.manipulations
            .iter()
            .filter(|(_, m)| !m.is_none())
            .map(|(name, m)| (name.as_str(), m))
    }

    /// Check the setup against a graph
    ///
    /// Every named variable must exist, a locked value must belong to the
    /// variable's domain (or parse as a finite number for a continuous
    /// variable), and randomization parameters must be finite with a
    /// non-negative standard deviation.
    pub fn validate(&self, graph: &CausalGraph) -> Result<()> {
        let named = self
            .manipulations
            .keys()
            .chain(self.studied.keys())
            .chain(self.randomization.keys());
        for name in named {
            if !graph.contains_variable(name) {
                return Err(InterventionError::invalid_manipulation(
                    name,
                    "variable is not in the graph",
                ));
            }
        }

        for variable in graph.variables() {
            if let Manipulation::Locked(value) = self.effective_manipulation(variable) {
                check_locked_value(variable, value)?;
            }
        }

        for (name, params) in &self.randomization {
            if !params.mean.is_finite() || !params.std_dev.is_finite() || params.std_dev < 0.0 {
                return Err(InterventionError::invalid_manipulation(
                    name,
                    format!(
                        "randomization needs a finite mean and non-negative std-dev, got mean {} std-dev {}",
                        params.mean, params.std_dev
                    ),
                ));
            }
        }

        Ok(())
    }
}

fn check_locked_value(variable: &Variable, value: &str) -> Result<()> {
    match &variable.domain {
        Domain::Discrete(_) => {
            if variable.domain.index_of(value).is_none() {
                return Err(InterventionError::invalid_manipulation(
                    &variable.name,
                    format!("locked value '{}' is not in the domain", value),
                ));
            }
        }
        Domain::Continuous => match value.parse::<f64>() {
            Ok(v) if v.is_finite() => {}
            _ => {
                return Err(InterventionError::invalid_manipulation(
                    &variable.name,
                    format!("locked value '{}' is not a finite number", value),
                ));
            }
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph() -> CausalGraph {
        let mut g = CausalGraph::new();
        g.add_variable(Variable::discrete("X", ["x0", "x1"])).unwrap();
        g.add_variable(Variable::discrete("Y", ["v0", "v1"])).unwrap();
        g.add_variable(Variable::discrete("U", ["u0", "u1"]).latent())
            .unwrap();
        g.add_variable(Variable::continuous("C")).unwrap();
        g
    }

    #[test]
    fn test_defaults() {
        let setup = ExperimentalSetup::new();
        assert_eq!(setup.manipulation_of("X"), &Manipulation::None);
        assert!(!setup.is_studied("X"));
        assert_eq!(setup.randomization_of("C"), RandomizationParams::new(0.0, 1.0));
    }

    #[test]
    fn test_latent_is_never_manipulated() {
        let g = graph();
        let setup = ExperimentalSetup::new().manipulate("U", Manipulation::Randomized);
        let latent = g.variable("U").unwrap();
        assert_eq!(setup.manipulation_of("U"), &Manipulation::Randomized);
        assert_eq!(setup.effective_manipulation(latent), &Manipulation::None);
    }

    #[test]
    fn test_validate_locked_value() {
        let g = graph();
        let ok = ExperimentalSetup::new().manipulate("Y", Manipulation::locked("v1"));
        assert!(ok.validate(&g).is_ok());

        let bad = ExperimentalSetup::new().manipulate("Y", Manipulation::locked("v7"));
        assert!(matches!(
            bad.validate(&g),
            Err(InterventionError::InvalidManipulation { .. })
        ));

        let continuous = ExperimentalSetup::new().manipulate("C", Manipulation::locked("2.5"));
        assert!(continuous.validate(&g).is_ok());
        let not_a_number = ExperimentalSetup::new().manipulate("C", Manipulation::locked("high"));
        assert!(not_a_number.validate(&g).is_err());
    }

    #[test]
    fn test_validate_unknown_variable() {
        let g = graph();
        let setup = ExperimentalSetup::new().manipulate("Q", Manipulation::Randomized);
        let err = setup.validate(&g).unwrap_err();
        assert!(err.to_string().contains("'Q'"));
    }

    #[test]
    fn test_validate_randomization() {
        let g = graph();
        let mut setup = ExperimentalSetup::new();
        setup.set_randomization("C", 1.0, -2.0);
        assert!(setup.validate(&g).is_err());
        setup.set_randomization("C", 1.0, 2.0);
        assert!(setup.validate(&g).is_ok());
        assert_eq!(setup.randomization_of("C").variance(), 4.0);
    }

    #[test]
    fn test_studied_variables_follow_graph_order() {
        let g = graph();
        let setup = ExperimentalSetup::new().study(["Y", "X"]);
        assert_eq!(setup.studied_variables(&g), vec!["X", "Y"]);
    }

    #[test]
    fn test_manipulation_serde() {
        let json = serde_json::to_string(&Manipulation::locked("v1")).unwrap();
        assert_eq!(json, r#"{"type":"locked","value":"v1"}"#);
        let parsed: Manipulation = serde_json::from_str(r#"{"type":"randomized"}"#).unwrap();
        assert_eq!(parsed, Manipulation::Randomized);
    }
}
