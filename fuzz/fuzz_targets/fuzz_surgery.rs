//! Fuzz target for graph surgery and discrete manipulation
//!
//! Builds a small random DAG (edges only run from lower to higher index),
//! applies random manipulations and checks the structural postconditions.

#![no_main]

use arbitrary::Arbitrary;
use intervention_engine::{
    CausalGraph, DiscreteModel, EdgeClassification, ExperimentalSetup, JointDistributionTable,
    ManipulatedGraph, Manipulation, Variable, manipulate_discrete,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    variables: Vec<FuzzVariable>,
    edges: Vec<(u8, u8)>,
}

#[derive(Debug, Arbitrary)]
struct FuzzVariable {
    categories: u8,
    latent: bool,
    action: Action,
}

#[derive(Debug, Arbitrary)]
enum Action {
    Passive,
    Randomize,
    Lock(u8),
}

const MAX_VARIABLES: usize = 6;

fuzz_target!(|input: FuzzInput| {
    let variables: Vec<&FuzzVariable> = input.variables.iter().take(MAX_VARIABLES).collect();
    if variables.is_empty() {
        return;
    }

    let mut graph = CausalGraph::new();
    for (i, v) in variables.iter().enumerate() {
        let size = 1 + (v.categories % 3) as usize;
        let mut variable = Variable::discrete(format!("V{}", i), (0..size).map(|c| format!("c{}", c)));
        if v.latent {
            variable = variable.latent();
        }
        let _ = graph.add_variable(variable);
    }
    let n = variables.len();
    for &(a, b) in &input.edges {
        let (a, b) = (a as usize % n, b as usize % n);
        if a < b {
            let _ = graph.add_edge(&format!("V{}", a), &format!("V{}", b));
        }
    }

    let mut setup = ExperimentalSetup::new();
    for (i, v) in variables.iter().enumerate() {
        let manipulation = match v.action {
            Action::Passive => Manipulation::None,
            Action::Randomize => Manipulation::Randomized,
            Action::Lock(c) => Manipulation::locked(format!("c{}", c % 4)),
        };
        setup.set_manipulation(format!("V{}", i), manipulation);
    }

    let Ok(manipulated) = ManipulatedGraph::derive(&graph, &setup) else {
        return;
    };
    for classified in manipulated.classified_edges() {
        let present = manipulated
            .graph()
            .contains_edge(&classified.edge.from, &classified.edge.to);
        assert_eq!(present, classified.classification != EdgeClassification::Broken);
    }

    let Ok(truth) = DiscreteModel::uniform(graph) else {
        return;
    };
    let model = manipulate_discrete(&truth, &manipulated, &setup)
        .expect("derived graph must be accepted by the manipulator");
    let names = model.graph().variable_names();
    let table = JointDistributionTable::enumerate(&model, &names)
        .expect("every variable is discrete");
    assert!((table.total_mass() - 1.0).abs() < 1e-9);
});
