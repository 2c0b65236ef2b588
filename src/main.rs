//! mapstep headless runner
//!
//! Usage: `mapstep <scenario.json> [settings.json] [ticks] [occupied|all]`
//!
//! Loads a scenario, attaches the built-in mechanics to every map and runs
//! the given number of ticks (default: one second of simulation). A step
//! policy name overrides the one from the settings file. Set
//! `RUST_LOG=info` or `debug` to see what happens.

use std::process::ExitCode;

use mapstep::mechanics::register_builtin;
use mapstep::sim::{Registry, Scenario, Simulation};
use mapstep::{Settings, SimResult, StepPolicy};

struct Args {
    scenario: String,
    settings: Option<String>,
    ticks: Option<u64>,
    policy: Option<StepPolicy>,
}

fn parse_args() -> Option<Args> {
    let mut args = std::env::args().skip(1);
    let scenario = args.next()?;
    let mut settings = None;
    let mut ticks = None;
    let mut policy = None;
    for arg in args {
        if let Ok(n) = arg.parse::<u64>() {
            ticks = Some(n);
        } else if let Some(p) = StepPolicy::from_str(&arg) {
            policy = Some(p);
        } else {
            settings = Some(arg);
        }
    }
    Some(Args {
        scenario,
        settings,
        ticks,
        policy,
    })
}

fn run(args: Args) -> SimResult<usize> {
    let mut settings = match &args.settings {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    if let Some(policy) = args.policy {
        settings.step_policy = policy;
    }
    let ticks = args.ticks.unwrap_or(u64::from(settings.ticks_per_second));

    let world = Scenario::load(&args.scenario)?.build(settings)?;
    let mut sim = Simulation::new(world);
    for map in sim.world.map_ids_by_name() {
        let mut registry = Registry::new();
        register_builtin(&mut registry);
        sim.attach(map, registry)?;
    }

    log::info!(
        "Running {} ticks at {} ticks/s, {:.2}s simulated ({} policy)",
        ticks,
        sim.world.settings.ticks_per_second,
        ticks as f32 * sim.world.settings.tick_seconds(),
        sim.world.settings.step_policy.as_str()
    );
    let mut failures = 0;
    for _ in 0..ticks {
        let report = sim.tick();
        failures += report.failures.len();
        for map in sim.take_changed_maps() {
            log::debug!("Tick {}: map {} changed", report.tick, sim.world.map(map).name);
        }
    }

    sim.log_stats();
    Ok(failures)
}

fn main() -> ExitCode {
    env_logger::init();

    let Some(args) = parse_args() else {
        eprintln!("usage: mapstep <scenario.json> [settings.json] [ticks] [occupied|all]");
        return ExitCode::from(2);
    };

    match run(args) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(failures) => {
            log::warn!("{} map step(s) failed", failures);
            ExitCode::FAILURE
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
