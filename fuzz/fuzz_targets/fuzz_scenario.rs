//! Fuzz target for scenario loading
//!
//! Arbitrary text is parsed as TOML and JSON. Whatever parses is built and
//! run; every failure must surface as an error, never a panic.

#![no_main]

use intervention_engine::{EngineConfig, Experiment, Scenario};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(source) = std::str::from_utf8(data) else {
        return;
    };

    let config = EngineConfig::default();
    for scenario in [Scenario::from_toml(source), Scenario::from_json(source)]
        .into_iter()
        .flatten()
    {
        // keep enumeration small
        let wide = scenario
            .variables
            .iter()
            .any(|v| v.categories.as_ref().is_some_and(|c| c.len() > 8));
        if scenario.variables.len() > 8 || wide {
            continue;
        }
        if let Ok((truth, setup)) = scenario.build(&config) {
            let _ = Experiment::new(truth).run(&setup);
        }
    }
});
