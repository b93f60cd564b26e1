//! End-to-end experiment: surgery, manipulation, enumeration
//!
//! ```text
//! ground truth + setup
//!        │
//!        ▼
//!  ManipulatedGraph ──► manipulated model ──► joint table (discrete only)
//! ```

use tracing::{debug, info_span};

use crate::config::EngineConfig;
use crate::error::Result;
use crate::joint::JointDistributionTable;
use crate::manipulate::{ManipulatedGraph, UnresolvedMapping};
use crate::model::ProbabilisticModel;
use crate::setup::ExperimentalSetup;

/// A ground-truth model ready to be manipulated under different setups
#[derive(Clone, Debug)]
pub struct Experiment {
    truth: ProbabilisticModel,
    config: EngineConfig,
}

/// Everything produced by one run
#[derive(Clone, Debug)]
pub struct ExperimentOutcome {
    pub manipulated_graph: ManipulatedGraph,
    pub manipulated_model: ProbabilisticModel,
    /// Joint distribution of the studied variables; `None` for linear models
    pub joint: Option<JointDistributionTable>,
    /// Parameters copied approximately from the ground truth
    pub approximations: Vec<UnresolvedMapping>,
}

impl Experiment {
    pub fn new(truth: impl Into<ProbabilisticModel>) -> Self {
        Experiment {
            truth: truth.into(),
            config: EngineConfig::default(),
        }
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn truth(&self) -> &ProbabilisticModel {
        &self.truth
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Run one experiment
    ///
    /// Randomized variables without declared parameters take the configured
    /// default randomization, whatever default the setup itself carries.
    pub fn run(&self, setup: &ExperimentalSetup) -> Result<ExperimentOutcome> {
        let span = info_span!("experiment", family = self.truth.family());
        let _enter = span.enter();

        let setup = setup
            .clone()
            .with_default_randomization(self.config.default_randomization());

        let manipulated_graph = ManipulatedGraph::derive(self.truth.graph(), &setup)?;
        let (manipulated_model, approximations) =
            self.truth.manipulate(&manipulated_graph, &setup)?;

        let joint = match &manipulated_model {
            ProbabilisticModel::Discrete(model) => {
                let studied = setup.studied_variables(model.graph());
                Some(JointDistributionTable::enumerate_with_label(
                    model,
                    &studied,
                    &self.config.probability_label,
                )?)
            }
            ProbabilisticModel::Linear(_) => None,
        };

        debug!(
            edges = manipulated_graph.graph().edge_count(),
            broken = manipulated_graph.broken_edges().count(),
            approximations = approximations.len(),
            "experiment complete"
        );

        Ok(ExperimentOutcome {
            manipulated_graph,
            manipulated_model,
            joint,
            approximations,
        })
    }
}
