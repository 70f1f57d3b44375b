use log::{debug, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::errors::*;
use crate::model::RateModel;
use crate::path::AliveCurve;
use crate::random::{stream_rng, RngStream};
use crate::stats::SummaryStat;
use crate::walker::{EntityOutcome, EntityWalker};

/// A population of entities simulated under one fixed parameter set.
#[derive(Debug, Clone)]
pub struct Cohort {
    id: u64,
    population_size: usize,
    model: RateModel,
    base_seed: u64,
}

impl Cohort {
    pub fn new(id: u64, population_size: usize, model: RateModel) -> Self {
        Self { id, population_size, model, base_seed: 0 }
    }

    /// Seed mixed into every entity stream; cohorts with the same ids and
    /// seed reproduce each other exactly.
    pub fn with_base_seed(mut self, base_seed: u64) -> Self {
        self.base_seed = base_seed;
        self
    }

    /// Identity of entity `index`; unique across cohorts of equal size.
    /// `None` if it does not fit in a `u64`.
    pub fn entity_id(&self, index: usize) -> Option<u64> {
        self.id.checked_mul(self.population_size as u64)?.checked_add(index as u64)
    }

    pub fn simulate(&self, horizon: f64) -> Result<CohortOutcome> {
        debug!(
            "simulating cohort {} ({} entities, horizon {})",
            self.id, self.population_size, horizon
        );

        if self.population_size > 0 && self.entity_id(self.population_size - 1).is_none() {
            return Err(Error::InvalidConfig(format!(
                "entity ids of cohort {} with {} entities overflow", self.id, self.population_size
            )));
        }
        // Checked above: no id up to the last one overflows.
        let first_id = self.id * self.population_size as u64;

        let model = &self.model;
        let entities: Vec<EntityOutcome> = (0..self.population_size)
            .into_par_iter()
            .map(|index| {
                let id = first_id + index as u64;
                let mut rng = stream_rng(self.base_seed, RngStream::Entity, id);
                EntityWalker::new(id, model).walk(horizon, &mut rng)
            })
            .collect();

        let outcome = CohortOutcome::from_entities(self.id, self.population_size, horizon, entities)?;
        if outcome.survival_time.count() == 0 && self.population_size > 0 {
            warn!("no entity in cohort {} was absorbed before t = {}", self.id, horizon);
        }
        Ok(outcome)
    }
}

/// Per-entity outcomes of one cohort and their summaries.
#[derive(Debug, Clone, Serialize)]
pub struct CohortOutcome {
    pub cohort_id: u64,
    pub population_size: usize,
    pub horizon: f64,
    pub entities: Vec<EntityOutcome>,
    /// Absorbed entities only.
    pub survival_time: SummaryStat,
    pub n_diagnoses: SummaryStat,
    /// Diagnosed entities only.
    pub time_to_diagnosis: SummaryStat,
    /// One 0/1 observation per entity.
    pub cause_specific_deaths: SummaryStat,
    pub cost: SummaryStat,
    pub utility: SummaryStat,
    pub alive_curve: AliveCurve,
}

impl CohortOutcome {
    /// Reduces entity outcomes, taken in entity order, to cohort summaries.
    pub fn from_entities(
        cohort_id: u64, population_size: usize, horizon: f64, entities: Vec<EntityOutcome>
    ) -> Result<Self> {
        let mut survival_times = Vec::new();
        let mut n_diagnoses = Vec::with_capacity(entities.len());
        let mut times_to_diagnosis = Vec::new();
        let mut deaths = Vec::with_capacity(entities.len());
        let mut costs = Vec::with_capacity(entities.len());
        let mut utilities = Vec::with_capacity(entities.len());

        for entity in &entities {
            if let Some(t) = entity.survival_time {
                survival_times.push(t);
            }
            if let Some(t) = entity.time_to_diagnosis {
                times_to_diagnosis.push(t);
            }
            n_diagnoses.push(entity.n_diagnoses as f64);
            deaths.push(if entity.cause_specific_death { 1.0 } else { 0.0 });
            costs.push(entity.discounted_cost);
            utilities.push(entity.discounted_utility);
        }

        let alive_curve = AliveCurve::new(population_size, &survival_times)?;

        Ok(Self {
            cohort_id,
            population_size,
            horizon,
            entities,
            survival_time: SummaryStat::new("Survival time", survival_times),
            n_diagnoses: SummaryStat::new("Number of diagnoses", n_diagnoses),
            time_to_diagnosis: SummaryStat::new("Time to diagnosis", times_to_diagnosis),
            cause_specific_deaths: SummaryStat::new("Cause-specific deaths", deaths),
            cost: SummaryStat::new("Discounted cost", costs),
            utility: SummaryStat::new("Discounted utility", utilities),
            alive_curve,
        })
    }

    /// Mean survival of absorbed entities, or `None` if none were absorbed.
    pub fn mean_survival_time(&self) -> Option<f64> {
        if self.survival_time.count() > 0 { Some(self.survival_time.mean()) } else { None }
    }

    pub fn mean_time_to_diagnosis(&self) -> Option<f64> {
        if self.time_to_diagnosis.count() > 0 { Some(self.time_to_diagnosis.mean()) } else { None }
    }

    pub fn n_absorbed(&self) -> usize {
        self.survival_time.count()
    }

    pub fn n_censored(&self) -> usize {
        self.population_size - self.n_absorbed()
    }

    pub fn n_cause_specific_deaths(&self) -> usize {
        self.entities.iter().filter(|e| e.cause_specific_death).count()
    }

    pub fn summary_stats(&self) -> Vec<&SummaryStat> {
        vec![
            &self.survival_time,
            &self.n_diagnoses,
            &self.time_to_diagnosis,
            &self.cause_specific_deaths,
            &self.cost,
            &self.utility,
        ]
    }

    /// Mean time alive within the horizon, counting censored entities up to it.
    pub fn restricted_mean_survival_time(&self) -> f64 {
        self.alive_curve.area(self.horizon) / self.population_size as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_models::{progression_model, two_state_model};

    #[test]
    fn test_two_state_end_to_end() {
        let lambda: f64 = 0.1;
        let horizon: f64 = 25.0;
        let n = 10_000;
        let outcome = Cohort::new(0, n, two_state_model(lambda, 0.0))
            .with_base_seed(2024)
            .simulate(horizon)
            .unwrap();

        let p_absorbed = 1.0 - (-lambda * horizon).exp();

        // Restricted mean: (1 - e^{-λT}) / λ ≈ 9.18.
        let restricted = p_absorbed / lambda;
        assert!((outcome.restricted_mean_survival_time() - restricted).abs() < 0.25);

        // Censored entities are excluded: E[T | T < horizon] ≈ 7.76.
        let conditional = 1.0 / lambda - horizon * (-lambda * horizon).exp() / p_absorbed;
        let mean = outcome.mean_survival_time().unwrap();
        assert!((mean - conditional).abs() < 0.25, "mean survival = {}", mean);

        let censored_fraction = outcome.n_censored() as f64 / n as f64;
        assert!((censored_fraction - (-lambda * horizon).exp()).abs() < 0.01);

        // Undiscounted utility is time alive, censored entities included.
        assert!((outcome.utility.mean() - restricted).abs() < 0.25);
        assert_eq!(outcome.utility.count(), n);
        assert_eq!(outcome.n_cause_specific_deaths(), 0);
    }

    #[test]
    fn test_censored_entities_excluded_from_survival_only() {
        let outcome = Cohort::new(0, 50, two_state_model(0.1, 0.0)).simulate(0.0).unwrap();
        assert_eq!(outcome.n_absorbed(), 0);
        assert_eq!(outcome.mean_survival_time(), None);
        assert_eq!(outcome.cost.count(), 50);
        assert_eq!(outcome.n_diagnoses.count(), 50);
        assert_eq!(outcome.alive_curve.points(), &[(0.0, 50)]);
    }

    #[test]
    fn test_censoring_policy_matches_entities() {
        let outcome = Cohort::new(1, 500, two_state_model(0.1, 0.03)).simulate(5.0).unwrap();
        let absorbed: Vec<f64> = outcome.entities.iter().filter_map(|e| e.survival_time).collect();
        let expected = absorbed.iter().sum::<f64>() / absorbed.len() as f64;
        assert!((outcome.mean_survival_time().unwrap() - expected).abs() < 1e-12);

        let all_costs = outcome.entities.iter().map(|e| e.discounted_cost).sum::<f64>() / 500.0;
        assert!((outcome.cost.mean() - all_costs).abs() < 1e-9);
        assert!(outcome.n_censored() > 0);
    }

    #[test]
    fn test_alive_curve_is_monotone() {
        let outcome = Cohort::new(3, 1000, progression_model(0.03)).simulate(30.0).unwrap();
        let points = outcome.alive_curve.points();
        assert_eq!(points[0], (0.0, 1000));
        for pair in points.windows(2) {
            assert!(pair[1].0 >= pair[0].0);
            assert!(pair[1].1 <= pair[0].1);
        }
        assert_eq!(outcome.alive_curve.final_count(), outcome.n_censored());
    }

    #[test]
    fn test_cohort_is_reproducible() {
        let a = Cohort::new(4, 200, progression_model(0.03)).with_base_seed(9).simulate(20.0).unwrap();
        let b = Cohort::new(4, 200, progression_model(0.03)).with_base_seed(9).simulate(20.0).unwrap();
        assert_eq!(a.entities, b.entities);
        assert_eq!(a.cost.mean().to_bits(), b.cost.mean().to_bits());

        let c = Cohort::new(5, 200, progression_model(0.03)).with_base_seed(9).simulate(20.0).unwrap();
        assert_ne!(a.entities, c.entities);
    }

    #[test]
    fn test_diagnosis_and_death_counts() {
        let outcome = Cohort::new(0, 2000, progression_model(0.0)).simulate(1000.0).unwrap();
        // P(Well -> Local) = 0.2 / 0.25; P(Local -> CancerDeath) = 0.3 / 0.35.
        let p_diagnosed = 0.8;
        let p_cancer_death = p_diagnosed * 0.3 / 0.35;
        assert!((outcome.n_diagnoses.mean() - p_diagnosed).abs() < 0.04);
        let death_fraction = outcome.n_cause_specific_deaths() as f64 / 2000.0;
        assert!((death_fraction - p_cancer_death).abs() < 0.04);
        assert_eq!(
            outcome.cause_specific_deaths.total() as usize,
            outcome.n_cause_specific_deaths()
        );
        // Time to diagnosis is Exp(0.25) conditioned on diagnosis: mean 4.
        assert!((outcome.time_to_diagnosis.mean() - 4.0).abs() < 0.4);
    }

    #[test]
    fn test_results_do_not_depend_on_thread_count() {
        let cohort = Cohort::new(6, 3000, progression_model(0.03)).with_base_seed(77);
        let run_with = |threads: usize| {
            rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .unwrap()
                .install(|| cohort.simulate(40.0).unwrap())
        };

        let serial = run_with(1);
        let parallel = run_with(8);
        assert_eq!(serial.entities, parallel.entities);
        assert_eq!(serial.cost.mean().to_bits(), parallel.cost.mean().to_bits());
        assert_eq!(serial.utility.mean().to_bits(), parallel.utility.mean().to_bits());
        assert_eq!(serial.alive_curve, parallel.alive_curve);
    }

    #[test]
    fn test_entity_id_overflow_is_an_error() {
        let cohort = Cohort::new(std::u64::MAX / 2, 4, two_state_model(0.1, 0.0));
        assert_eq!(cohort.entity_id(3), None);
        assert!(matches!(cohort.simulate(1.0), Err(Error::InvalidConfig(_))));

        let cohort = Cohort::new(3, 4, two_state_model(0.1, 0.0));
        assert_eq!(cohort.entity_id(2), Some(14));
        let empty = Cohort::new(std::u64::MAX, 0, two_state_model(0.1, 0.0));
        assert_eq!(empty.simulate(1.0).unwrap().n_absorbed(), 0);
    }

    #[test]
    fn test_more_absorptions_than_entities_is_rejected() {
        let entities = Cohort::new(0, 3, two_state_model(0.1, 0.0)).simulate(1000.0).unwrap().entities;
        assert!(entities.iter().all(|e| e.survival_time.is_some()));
        assert!(matches!(
            CohortOutcome::from_entities(0, 2, 1000.0, entities),
            Err(Error::InconsistentOutcome(_))
        ));
    }
}
