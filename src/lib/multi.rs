use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::cohort::{Cohort, CohortOutcome};
use crate::errors::*;
use crate::path::AliveCurve;
use crate::psa::ParameterSource;
use crate::random::{stream_rng, RngStream};
use crate::stats::SummaryStat;

/// Many cohorts, each simulated under its own parameter draw.
pub struct MultiCohort<S: ParameterSource> {
    ids: Vec<u64>,
    population_size: usize,
    source: S,
    base_seed: u64,
}

impl<S: ParameterSource> MultiCohort<S> {
    pub fn new(ids: Vec<u64>, population_size: usize, source: S) -> Self {
        Self { ids, population_size, source, base_seed: 0 }
    }

    pub fn with_base_seed(mut self, base_seed: u64) -> Self {
        self.base_seed = base_seed;
        self
    }

    /// Draws parameters and simulates every cohort. The first failing draw
    /// aborts the whole run.
    pub fn simulate(&self, horizon: f64) -> Result<MultiCohortOutcome> {
        info!(
            "simulating {} cohorts of {} entities to t = {}",
            self.ids.len(), self.population_size, horizon
        );

        let cohorts = self.ids
            .par_iter()
            .map(|&id| {
                let mut rng = stream_rng(self.base_seed, RngStream::Parameters, id);
                let draw = self.source.draw(id, &mut rng)?;
                let cohort = Cohort::new(draw.cohort_id, self.population_size, draw.into_model())
                    .with_base_seed(self.base_seed);
                cohort.simulate(horizon)
            })
            .collect::<Result<Vec<_>>>()?;

        let outcome = MultiCohortOutcome::from_cohorts(cohorts);
        info!(
            "done: mean survival {:.3}, mean cost {:.2}, mean utility {:.3}",
            outcome.mean_survival_time.mean(), outcome.mean_cost.mean(), outcome.mean_utility.mean()
        );
        Ok(outcome)
    }
}

/// Cohort outcomes and statistics over their per-cohort means.
#[derive(Debug, Clone, Serialize)]
pub struct MultiCohortOutcome {
    pub cohorts: Vec<CohortOutcome>,
    /// Cohorts with no absorbed entity contribute nothing here.
    pub mean_survival_time: SummaryStat,
    pub mean_cost: SummaryStat,
    pub mean_utility: SummaryStat,
    pub mean_n_diagnoses: SummaryStat,
    pub mean_time_to_diagnosis: SummaryStat,
    pub cause_specific_deaths: SummaryStat,
}

impl MultiCohortOutcome {
    pub fn from_cohorts(cohorts: Vec<CohortOutcome>) -> Self {
        let mut survival = Vec::with_capacity(cohorts.len());
        let mut costs = Vec::with_capacity(cohorts.len());
        let mut utilities = Vec::with_capacity(cohorts.len());
        let mut diagnoses = Vec::with_capacity(cohorts.len());
        let mut times_to_diagnosis = Vec::with_capacity(cohorts.len());
        let mut deaths = Vec::with_capacity(cohorts.len());

        for cohort in &cohorts {
            match cohort.mean_survival_time() {
                Some(t) => survival.push(t),
                None => warn!("cohort {} has no survival time; leaving it out", cohort.cohort_id),
            }
            if let Some(t) = cohort.mean_time_to_diagnosis() {
                times_to_diagnosis.push(t);
            }
            costs.push(cohort.cost.mean());
            utilities.push(cohort.utility.mean());
            diagnoses.push(cohort.n_diagnoses.mean());
            deaths.push(cohort.n_cause_specific_deaths() as f64);
        }

        Self {
            cohorts,
            mean_survival_time: SummaryStat::new("Mean survival time", survival),
            mean_cost: SummaryStat::new("Mean discounted cost", costs),
            mean_utility: SummaryStat::new("Mean discounted utility", utilities),
            mean_n_diagnoses: SummaryStat::new("Mean number of diagnoses", diagnoses),
            mean_time_to_diagnosis: SummaryStat::new("Mean time to diagnosis", times_to_diagnosis),
            cause_specific_deaths: SummaryStat::new("Cause-specific deaths", deaths),
        }
    }

    /// Alive curve of each cohort, in cohort order.
    pub fn survival_curves(&self) -> Vec<&AliveCurve> {
        self.cohorts.iter().map(|c| &c.alive_curve).collect()
    }

    /// `(mean cost, mean utility)` of each cohort, in cohort order.
    pub fn cost_utility_pairs(&self) -> Vec<(f64, f64)> {
        self.cohorts.iter().map(|c| (c.cost.mean(), c.utility.mean())).collect()
    }

    pub fn summary_stats(&self) -> Vec<&SummaryStat> {
        vec![
            &self.mean_survival_time,
            &self.mean_cost,
            &self.mean_utility,
            &self.mean_n_diagnoses,
            &self.mean_time_to_diagnosis,
            &self.cause_specific_deaths,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inputs::tests::small_inputs;
    use crate::psa::{FixedParameters, ParameterGenerator};
    use crate::test_models::two_state_model;

    #[test]
    fn test_cohort_means_shrink_with_population() {
        let n_cohorts = 500;
        let population_size = 50;
        let outcome = MultiCohort::new(
            (0..n_cohorts).collect(), population_size, FixedParameters(two_state_model(0.1, 0.0))
        ).with_base_seed(11).simulate(25.0).unwrap();

        assert_eq!(outcome.cohorts.len(), 500);
        let curves = outcome.survival_curves();
        assert_eq!(curves.len(), 500);
        assert!(curves.iter().all(|c| c.initial_size() == population_size));

        let individual: Vec<f64> = outcome.cohorts.iter()
            .flat_map(|c| c.entities.iter().filter_map(|e| e.survival_time))
            .collect();
        let individual = SummaryStat::new("individual", individual);

        // About 0.918 of each cohort is absorbed, so sd ratio ≈ 1 / √(50 · 0.918).
        let ratio = outcome.mean_survival_time.stdev() / individual.stdev();
        assert!(ratio > 0.11 && ratio < 0.19, "ratio = {}", ratio);
        assert!((outcome.mean_survival_time.mean() - individual.mean()).abs() < 0.2);
    }

    #[test]
    fn test_psa_run() {
        let generator = ParameterGenerator::new(&small_inputs()).unwrap();
        let run = MultiCohort::new(vec![0, 1, 2, 3, 4, 5, 6, 7], 100, generator).with_base_seed(3);
        let outcome = run.simulate(30.0).unwrap();

        let pairs = outcome.cost_utility_pairs();
        assert_eq!(pairs.len(), 8);
        for (i, (cost, utility)) in pairs.iter().enumerate() {
            assert_eq!(*cost, outcome.cohorts[i].cost.mean());
            assert!(*cost > 0.0);
            assert!(*utility > 0.0 && *utility < 30.0);
        }
        for (i, cohort) in outcome.cohorts.iter().enumerate() {
            assert_eq!(cohort.cohort_id, i as u64);
        }
        assert_eq!(outcome.cause_specific_deaths.count(), 8);

        let again = run.simulate(30.0).unwrap();
        assert_eq!(again.cost_utility_pairs(), pairs);
    }

    #[test]
    fn test_failed_draw_aborts_run() {
        struct Broken;
        impl ParameterSource for Broken {
            fn draw<R: rand::Rng + ?Sized>(&self, _: u64, _: &mut R) -> Result<crate::psa::ParameterDraw> {
                Err(Error::InvalidModel("broken".into()))
            }
        }
        let result = MultiCohort::new(vec![0, 1], 10, Broken).simulate(10.0);
        assert!(matches!(result, Err(Error::InvalidModel(_))));
    }

    #[test]
    fn test_results_do_not_depend_on_thread_count() {
        let generator = ParameterGenerator::new(&small_inputs()).unwrap();
        let run = MultiCohort::new((0..12).collect(), 250, generator).with_base_seed(5);
        let run_with = |threads: usize| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap()
                .install(|| run.simulate(30.0).unwrap())
        };

        let serial = run_with(1);
        let parallel = run_with(8);
        for (a, b) in serial.cohorts.iter().zip(&parallel.cohorts) {
            assert_eq!(a.cohort_id, b.cohort_id);
            assert_eq!(a.entities, b.entities);
            assert_eq!(a.cost.mean().to_bits(), b.cost.mean().to_bits());
        }
        assert_eq!(serial.mean_cost.mean().to_bits(), parallel.mean_cost.mean().to_bits());
        assert_eq!(serial.mean_utility.mean().to_bits(), parallel.mean_utility.mean().to_bits());
    }

    #[test]
    fn test_overflowing_cohort_aborts_run() {
        let source = FixedParameters(two_state_model(0.1, 0.0));
        let result = MultiCohort::new(vec![0, std::u64::MAX], 10, source).simulate(10.0);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }
}
