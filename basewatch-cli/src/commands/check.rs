//! Check command - one poll pass, printed summary.

use std::path::Path;
use std::time::Instant;

use basewatch::registry::Registry;
use basewatch::run::RunState;

use super::load_config;
use crate::error::CliError;

/// Run the check command.
pub fn run(config_path: Option<&Path>) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let mut registry = Registry::open(&config);

    let now = Instant::now();
    let _ = registry.poll(now);
    let status = registry.status(now);

    println!("cumulative basecount: {}", status.counter.basecount);
    println!("{} run(s) tracked", status.runs.len());
    for run in &status.runs {
        let state = match run.state {
            RunState::Waiting => "waiting",
            RunState::Sequencing => "sequencing",
            RunState::Finished => "finished",
        };
        let stalled = if run.cancelled { "  [stalled]" } else { "" };
        println!(
            "  {}  cycle {}/{}  {}  basecount {}{}",
            run.run_id, run.current_cycle, run.total_cycles, state, run.basecount, stalled
        );
    }
    Ok(())
}
