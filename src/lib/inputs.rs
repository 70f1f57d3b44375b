use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;

use crate::errors::*;
use crate::model::{Economics, RateModel, RateRow, StateLayout};
use crate::state::HealthState;

/// Transition weights out of one state, keyed by destination. The weight on
/// the state itself is the weight of staying put over one time step.
pub type WeightRow = BTreeMap<HealthState, f64>;

/// Point-estimate tables for one (group, intervention), resolved from the
/// input catalog. Nothing here refers to the group or intervention any more.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInputs {
    pub transitions: BTreeMap<HealthState, WeightRow>,
    pub state_costs: BTreeMap<HealthState, f64>,
    pub state_utilities: BTreeMap<HealthState, f64>,
    pub treatment_cost: f64,
    pub discount_rate: f64,
    /// Length of the period the transition tables describe, in years.
    pub time_step: f64,
    /// Probability of death from other causes over one time step.
    pub background_mortality_probability: f64,
    pub layout: StateLayout,
    /// Standard deviation of a sampled cost is its mean divided by this.
    pub cost_cv_divisor: f64,
    /// Standard deviation of a sampled utility is its mean divided by this.
    pub utility_cv_divisor: f64,
}

impl ModelInputs {
    /// The rate model at the point estimates, without any sampling.
    pub fn point_estimate(&self) -> Result<RateModel> {
        let mut probabilities = BTreeMap::new();
        for (state, weights) in &self.transitions {
            probabilities.insert(*state, weights_to_probabilities(*state, weights)?);
        }
        self.build_model(
            &probabilities,
            self.state_costs.clone(),
            self.state_utilities.clone(),
        )
    }

    /// Assembles a validated rate model from per-step probability rows and
    /// state values, adding background mortality to every row.
    pub fn build_model(
        &self,
        probabilities: &BTreeMap<HealthState, WeightRow>,
        state_costs: BTreeMap<HealthState, f64>,
        state_utilities: BTreeMap<HealthState, f64>,
    ) -> Result<RateModel> {
        let mortality = background_mortality_rate(self.background_mortality_probability, self.time_step)?;

        let mut rates = BTreeMap::new();
        for (state, row) in probabilities {
            let mut rate_row = embed_probability_row(*state, row, self.time_step)?;
            if mortality > 0.0 {
                *rate_row.entry(HealthState::NaturalDeath).or_insert(0.0) += mortality;
            }
            rates.insert(*state, rate_row);
        }

        let economics = Economics {
            state_costs,
            state_utilities,
            treatment_cost: self.treatment_cost,
            discount_rate: self.discount_rate,
        };
        RateModel::new(rates, economics, self.layout)
    }
}

/// Normalizes a row of non-negative weights into probabilities.
pub fn weights_to_probabilities(state: HealthState, weights: &WeightRow) -> Result<WeightRow> {
    if state.is_absorbing() {
        return Err(Error::InvalidTransitionRow {
            state,
            reason: "absorbing states cannot have a transition row".into(),
        });
    }
    for (destination, w) in weights {
        if !w.is_finite() || *w < 0.0 {
            return Err(Error::InvalidTransitionRow {
                state,
                reason: format!("weight to {} is {}", destination, w),
            });
        }
    }
    let s: f64 = weights.values().sum();
    if s <= 0.0 {
        return Err(Error::InvalidTransitionRow { state, reason: "weights sum to zero".into() });
    }
    Ok(weights.iter().map(|(destination, w)| (*destination, w / s)).collect())
}

/// Converts one row of per-step transition probabilities into instantaneous
/// rates: `λ_ij = -ln(p_ii) · p_ij / ((1 - p_ii) · Δt)`.
///
/// This is the embedding under which the state is left at total rate
/// `-ln(p_ii) / Δt` and destinations keep their relative probabilities. A
/// state that is never left (`p_ii = 1`) gets no rates; a state that is
/// always left (`p_ii = 0`) has no finite embedding.
pub fn embed_probability_row(state: HealthState, probabilities: &WeightRow, time_step: f64) -> Result<RateRow> {
    if !(time_step > 0.0) || !time_step.is_finite() {
        return Err(Error::InvalidModel(format!("time step must be positive, got {}", time_step)));
    }

    let p_stay = probabilities.get(&state).copied().unwrap_or(0.0);
    if p_stay <= 0.0 {
        return Err(Error::InvalidTransitionRow {
            state,
            reason: "probability of staying is zero, so no finite rate matches it".into(),
        });
    }

    let mut row = RateRow::new();
    if p_stay >= 1.0 {
        return Ok(row);
    }

    let scale = -p_stay.ln() / ((1.0 - p_stay) * time_step);
    for (destination, p) in probabilities {
        if *destination != state && *p > 0.0 {
            row.insert(*destination, scale * p);
        }
    }
    Ok(row)
}

/// Constant hazard giving death probability `probability` over `time_step`.
pub fn background_mortality_rate(probability: f64, time_step: f64) -> Result<f64> {
    if !(0.0..1.0).contains(&probability) {
        return Err(Error::InvalidModel(format!(
            "background mortality probability must be in [0, 1), got {}", probability
        )));
    }
    Ok(-(1.0 - probability).ln() / time_step)
}
