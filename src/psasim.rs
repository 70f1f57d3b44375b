use std::time::Instant;

use log::info;
use rand::Rng;

use markovtools::config::read_run_config;
use markovtools::errors::*;
use markovtools::logging::{init_logging, parse_level};
use markovtools::multi::MultiCohort;
use markovtools::output::open_results;
use markovtools::psa::ParameterGenerator;
use markovtools::stats::IntervalKind;

fn main() {
    if let Err(e) = run() {
        eprintln!("psasim: {}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Read config from file specified in first command-line argument or from stdin
    let args: Vec<String> = std::env::args().collect();
    let (config, base_dir) = read_run_config(args.get(1).map(|s| s.as_str()))?;
    init_logging(parse_level(config.log_level.as_deref())?)?;

    let n_cohorts = config.n_cohorts.ok_or_else(
        || Error::InvalidConfig("n_cohorts is required for a multi-cohort run".into())
    )?;
    let rng_seed = match config.rng_seed {
        Some(rng_seed) => rng_seed,
        None => rand::thread_rng().gen(),
    };
    info!("rng_seed = {}", rng_seed);

    let inputs = config.load_catalog(base_dir.as_deref())?
        .resolve(&config.group, &config.intervention)?;
    let generator = ParameterGenerator::new(&inputs)?;

    let start = Instant::now();
    let ids = (0..n_cohorts as u64).collect();
    let outcome = MultiCohort::new(ids, config.population_size, generator)
        .with_base_seed(rng_seed)
        .simulate(config.horizon)?;
    info!("elapsed time: {} s", start.elapsed().as_secs_f64());

    // Spread across parameter draws, so always a prediction interval.
    for stat in outcome.summary_stats() {
        info!(
            "{}: {}", stat.name,
            stat.formatted_mean_and_interval(IntervalKind::Prediction, config.alpha, 3)
        );
    }

    let mut db = open_results(config.output_path(base_dir.as_deref()).as_deref())?;
    db.write_run_meta(&config, rng_seed)?;
    db.write_cohorts(&outcome.cohorts)?;
    db.write_summary_stats(outcome.summary_stats(), IntervalKind::Prediction, config.alpha)?;

    if config.write_to_stdout() {
        println!("{}", serde_json::to_string_pretty(&db.to_json()?)?);
    }
    Ok(())
}
