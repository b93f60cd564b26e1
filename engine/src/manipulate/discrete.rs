//! Discrete model manipulation
//!
//! Builds fresh conditional tables keyed to the manipulated graph's parent
//! sets, then fills them:
//! - `Locked(c)`: point mass on `c`; the variable must have no parents left
//! - `Randomized`: uniform over the domain; no parents left either
//! - `None`: inherited from the ground truth
//!
//! Inheritance is exact when the parent set is unchanged. When it shrank, the
//! row of the old table with every dropped parent at its first category is
//! copied. That slice is only one of many candidates, so the result is
//! approximate unless the old conditional did not depend on the dropped
//! parents.

use tracing::{debug, warn};

use super::graph::ManipulatedGraph;
use crate::error::{InterventionError, Result};
use crate::model::discrete::DiscreteModel;
use crate::setup::{ExperimentalSetup, Manipulation};

/// Manipulated counterpart of `truth` over the structure of `manipulated`
pub fn manipulate_discrete(
    truth: &DiscreteModel,
    manipulated: &ManipulatedGraph,
    setup: &ExperimentalSetup,
) -> Result<DiscreteModel> {
    let graph = manipulated.graph();
    if !truth.graph().same_variables(graph) {
        return Err(InterventionError::ModelMismatch(
            "manipulated graph has a different variable set".to_string(),
        ));
    }

    let mut model = DiscreteModel::uniform(graph.clone())?;

    for (position, variable) in graph.variables().enumerate() {
        let categories = model.category_count(&variable.name)?;
        match setup.effective_manipulation(variable) {
            Manipulation::Locked(value) => {
                let locked = variable.domain.index_of(value).ok_or_else(|| {
                    InterventionError::invalid_manipulation(
                        &variable.name,
                        format!("locked value '{}' is not in the domain", value),
                    )
                })?;
                let parents = graph.parent_positions(position).len();
                if parents != 0 {
                    return Err(InterventionError::StructuralViolation {
                        variable: variable.name.clone(),
                        parents,
                    });
                }
                let mut point_mass = vec![0.0; categories];
                point_mass[locked] = 1.0;
                model.set_row_at(position, 0, &point_mass);
            }
            Manipulation::Randomized => {
                let parents = graph.parent_positions(position).len();
                if parents != 0 {
                    return Err(InterventionError::StructuralViolation {
                        variable: variable.name.clone(),
                        parents,
                    });
                }
                // rows were created uniform
                debug!(variable = %variable.name, categories, "randomized");
            }
            Manipulation::None => inherit(truth, &mut model, position, &variable.name)?,
        }
    }

    Ok(model)
}

fn inherit(truth: &DiscreteModel, model: &mut DiscreteModel, position: usize, name: &str) -> Result<()> {
    let (Some(old), Some(new)) = (truth.table_at(position), model.table_at(position)) else {
        return Err(InterventionError::UnknownVariable(name.to_string()));
    };

    if old.parents() == new.parents() {
        for row in 0..old.row_count() {
            let distribution = old.row(row).to_vec();
            model.set_row_at(position, row, &distribution);
        }
        return Ok(());
    }

    if let Some(added) = new.parents().iter().find(|p| !old.parents().contains(p)) {
        return Err(InterventionError::ModelMismatch(format!(
            "'{}' gained parent at position {} that the ground truth lacks",
            name, added
        )));
    }

    warn!(
        variable = name,
        before = old.parents().len(),
        after = new.parents().len(),
        "parent set shrank, inherited conditional is approximate"
    );

    let new_parents = new.parents().to_vec();
    let old_parents = old.parents().to_vec();
    for row in 0..new.row_count() {
        let kept = model.parent_combination(name, row)?;
        let old_combination: Vec<usize> = old_parents
            .iter()
            .map(|p| {
                new_parents
                    .iter()
                    .position(|q| q == p)
                    .map_or(0, |i| kept[i])
            })
            .collect();
        let old_row = truth.row_index(name, &old_combination)?;
        let distribution = old.row(old_row).to_vec();
        model.set_row_at(position, row, &distribution);
    }
    Ok(())
}
