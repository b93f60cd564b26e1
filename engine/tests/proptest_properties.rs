//! Property-based tests for graph surgery and joint enumeration
//!
//! Chains and random DAGs with arbitrary tables and manipulations.

use intervention_engine::radix::MixedRadix;
use intervention_engine::{
    CausalGraph, DiscreteModel, EdgeClassification, ExperimentalSetup, JointDistributionTable,
    ManipulatedGraph, Manipulation, Variable, manipulate_discrete,
};
use proptest::prelude::*;

// ============================================================================
// Generators
// ============================================================================

/// Normalized distribution over `size` categories
fn arb_distribution(size: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1u32..100, size).prop_map(|weights| {
        let total: u32 = weights.iter().sum();
        weights
            .into_iter()
            .map(|w| w as f64 / total as f64)
            .collect()
    })
}

fn arb_manipulation() -> impl Strategy<Value = Option<bool>> {
    // None: passive, Some(false): randomized, Some(true): locked
    prop_oneof![Just(None), Just(Some(false)), Just(Some(true))]
}

/// Chain V0 -> V1 -> ... with random sizes and tables
fn arb_chain() -> impl Strategy<Value = DiscreteModel> {
    prop::collection::vec(2usize..4, 2..5).prop_flat_map(|sizes| {
        let tables: Vec<_> = sizes
            .iter()
            .enumerate()
            .map(|(i, &size)| {
                let rows = if i == 0 { 1 } else { sizes[i - 1] };
                prop::collection::vec(arb_distribution(size), rows)
            })
            .collect();
        (Just(sizes), tables).prop_map(|(sizes, tables)| {
            let mut g = CausalGraph::new();
            for (i, &size) in sizes.iter().enumerate() {
                let categories: Vec<String> = (0..size).map(|c| format!("c{}", c)).collect();
                g.add_variable(Variable::discrete(format!("V{}", i), categories))
                    .unwrap();
                if i > 0 {
                    g.add_edge(&format!("V{}", i - 1), &format!("V{}", i))
                        .unwrap();
                }
            }
            let mut model = DiscreteModel::uniform(g).unwrap();
            for (i, rows) in tables.iter().enumerate() {
                for (row, distribution) in rows.iter().enumerate() {
                    model
                        .set_distribution(&format!("V{}", i), row, distribution)
                        .unwrap();
                }
            }
            model
        })
    })
}

/// Random DAG over up to five variables; edges only run from lower to higher
/// index, so forks, colliders and multi-parent tables all occur
fn arb_dag() -> impl Strategy<Value = DiscreteModel> {
    (
        prop::collection::vec(2usize..4, 2..6),
        prop::collection::vec(any::<bool>(), 10),
    )
        .prop_flat_map(|(sizes, flags)| {
            let mut g = CausalGraph::new();
            for (i, &size) in sizes.iter().enumerate() {
                let categories: Vec<String> = (0..size).map(|c| format!("c{}", c)).collect();
                g.add_variable(Variable::discrete(format!("V{}", i), categories))
                    .unwrap();
            }
            let mut flag = flags.iter();
            for to in 0..sizes.len() {
                for from in 0..to {
                    if flag.next().copied().unwrap_or(false) {
                        g.add_edge(&format!("V{}", from), &format!("V{}", to))
                            .unwrap();
                    }
                }
            }

            let tables: Vec<_> = (0..sizes.len())
                .map(|i| {
                    let rows: usize = g.parent_positions(i).iter().map(|&p| sizes[p]).product();
                    prop::collection::vec(arb_distribution(sizes[i]), rows)
                })
                .collect();
            (Just(g), tables).prop_map(|(g, tables)| {
                let mut model = DiscreteModel::uniform(g).unwrap();
                for (i, rows) in tables.iter().enumerate() {
                    for (row, distribution) in rows.iter().enumerate() {
                        model
                            .set_distribution(&format!("V{}", i), row, distribution)
                            .unwrap();
                    }
                }
                model
            })
        })
}

fn setup_for(model: &DiscreteModel, choices: &[Option<bool>]) -> ExperimentalSetup {
    let mut setup = ExperimentalSetup::new();
    for (variable, choice) in model.graph().variables().zip(choices) {
        let manipulation = match choice {
            None => Manipulation::None,
            Some(false) => Manipulation::Randomized,
            Some(true) => {
                let last = variable.domain.categories().unwrap().last().unwrap();
                Manipulation::locked(last.clone())
            }
        };
        setup.set_manipulation(variable.name.clone(), manipulation);
    }
    setup
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn radix_decode_inverts_encode(radices in prop::collection::vec(1usize..5, 1..5)) {
        let radix = MixedRadix::new(radices).unwrap();
        for row in 0..radix.len() {
            let digits = radix.decode(row).unwrap();
            prop_assert_eq!(radix.encode(&digits), Some(row));
        }
        prop_assert!(radix.decode(radix.len()).is_none());
    }

    #[test]
    fn full_table_sums_to_one(model in arb_chain()) {
        let names = model.graph().variable_names();
        let table = JointDistributionTable::enumerate(&model, &names).unwrap();
        prop_assert!((table.total_mass() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn manipulated_model_is_normalized(
        model in arb_chain(),
        choices in prop::collection::vec(arb_manipulation(), 5),
    ) {
        let setup = setup_for(&model, &choices);
        let manipulated = ManipulatedGraph::derive(model.graph(), &setup).unwrap();
        let result = manipulate_discrete(&model, &manipulated, &setup).unwrap();

        prop_assert!(result.validate(1e-9).is_ok());
        let names = result.graph().variable_names();
        let table = JointDistributionTable::enumerate(&result, &names).unwrap();
        prop_assert!((table.total_mass() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn surgery_postconditions(
        model in arb_dag(),
        choices in prop::collection::vec(arb_manipulation(), 5),
    ) {
        let setup = setup_for(&model, &choices);
        let manipulated = ManipulatedGraph::derive(model.graph(), &setup).unwrap();
        let graph = manipulated.graph();

        for variable in graph.variables() {
            let manipulation = setup.manipulation_of(&variable.name);
            if manipulation.breaks_incoming() {
                prop_assert_eq!(graph.in_degree(&variable.name).unwrap(), 0);
            }
        }
        for classified in manipulated.classified_edges() {
            let present = graph.contains_edge(&classified.edge.from, &classified.edge.to);
            prop_assert_eq!(present, classified.classification != EdgeClassification::Broken);
        }
        prop_assert!(graph.edge_count() <= model.graph().edge_count());
    }

    #[test]
    fn passive_target_keeps_its_edges(
        model in arb_dag(),
        choices in prop::collection::vec(arb_manipulation(), 5),
    ) {
        let setup = setup_for(&model, &choices);
        let manipulated = ManipulatedGraph::derive(model.graph(), &setup).unwrap();

        for classified in manipulated.classified_edges() {
            let from = manipulated.manipulation_of(&classified.edge.from).unwrap();
            let to = manipulated.manipulation_of(&classified.edge.to).unwrap();
            if to.is_none() {
                prop_assert_ne!(classified.classification, EdgeClassification::Broken);
                prop_assert!(manipulated
                    .graph()
                    .contains_edge(&classified.edge.from, &classified.edge.to));
            }
            if from.is_none() && to.is_none() {
                prop_assert_eq!(classified.classification, EdgeClassification::Normal);
            }
        }
    }

    #[test]
    fn manipulated_dag_is_normalized(
        model in arb_dag(),
        choices in prop::collection::vec(arb_manipulation(), 5),
    ) {
        let setup = setup_for(&model, &choices);
        let manipulated = ManipulatedGraph::derive(model.graph(), &setup).unwrap();
        let result = manipulate_discrete(&model, &manipulated, &setup).unwrap();

        prop_assert!(result.validate(1e-9).is_ok());
        let names = result.graph().variable_names();
        let table = JointDistributionTable::enumerate(&result, &names).unwrap();
        prop_assert!((table.total_mass() - 1.0).abs() < 1e-9);

        // any non-empty subset is a full marginal too
        let last = [names[names.len() - 1]];
        let subset = JointDistributionTable::enumerate(&result, &last).unwrap();
        prop_assert!((subset.total_mass() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn locked_variable_is_a_point_mass(
        model in arb_chain(),
        target in 0usize..4,
    ) {
        let names = model.graph().variable_names();
        let target = target % names.len();
        let name = names[target].to_string();
        let last = model.category_count(&name).unwrap() - 1;
        let label = format!("c{}", last);
        let setup = ExperimentalSetup::new().manipulate(name.clone(), Manipulation::locked(label));

        let manipulated = ManipulatedGraph::derive(model.graph(), &setup).unwrap();
        let result = manipulate_discrete(&model, &manipulated, &setup).unwrap();
        let table = JointDistributionTable::enumerate(&result, &[name.as_str()]).unwrap();
        for row in 0..table.row_count() {
            let want = if row == last { 1.0 } else { 0.0 };
            prop_assert!((table.probability_of(row).unwrap() - want).abs() < 1e-12);
        }
    }
}
