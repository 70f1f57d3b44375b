use std::time::Instant;

use log::info;
use rand::Rng;

use markovtools::cohort::Cohort;
use markovtools::config::read_run_config;
use markovtools::errors::*;
use markovtools::logging::{init_logging, parse_level};
use markovtools::output::open_results;

fn main() {
    if let Err(e) = run() {
        eprintln!("cohortsim: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Read config from file specified in first command-line argument or from stdin
    let args: Vec<String> = std::env::args().collect();
    let (config, base_dir) = read_run_config(args.get(1).map(|s| s.as_str()))?;
    init_logging(parse_level(config.log_level.as_deref())?)?;

    let rng_seed = match config.rng_seed {
        Some(rng_seed) => rng_seed,
        None => rand::thread_rng().gen(),
    };
    info!("rng_seed = {}", rng_seed);

    let inputs = config.load_catalog(base_dir.as_deref())?
        .resolve(&config.group, &config.intervention)?;
    let model = inputs.point_estimate()?;

    let start = Instant::now();
    let outcome = Cohort::new(0, config.population_size, model)
        .with_base_seed(rng_seed)
        .simulate(config.horizon)?;
    info!("elapsed time: {} s", start.elapsed().as_secs_f64());

    for stat in outcome.summary_stats() {
        info!("{}: {}", stat.name, stat.formatted_mean_and_interval(config.interval, config.alpha, 3));
    }
    info!(
        "restricted mean survival time: {:.3}; censored: {}",
        outcome.restricted_mean_survival_time(), outcome.n_censored()
    );

    let mut db = open_results(config.output_path(base_dir.as_deref()).as_deref())?;
    db.write_run_meta(&config, rng_seed)?;
    db.write_cohorts(std::iter::once(&outcome))?;
    db.write_summary_stats(outcome.summary_stats(), config.interval, config.alpha)?;

    if config.write_to_stdout() {
        println!("{}", serde_json::to_string_pretty(&db.to_json()?)?);
    }
    Ok(())
}
