use rand::distributions::Distribution;
use rand::Rng;
use rand_distr::Dirichlet;
use std::collections::BTreeMap;

use crate::errors::*;
use crate::fit::ClampedParameter;
use crate::inputs::{ModelInputs, WeightRow};
use crate::model::RateModel;
use crate::state::HealthState;

/// One parameter set, drawn for one cohort.
#[derive(Debug, Clone)]
pub struct ParameterDraw {
    pub cohort_id: u64,
    pub model: RateModel,
}

impl ParameterDraw {
    pub fn into_model(self) -> RateModel {
        self.model
    }
}

/// Anything that can hand a cohort its parameters.
pub trait ParameterSource: Sync {
    fn draw<R: Rng + ?Sized>(&self, cohort_id: u64, rng: &mut R) -> Result<ParameterDraw>;
}

/// The same model for every cohort; only entity randomness varies.
#[derive(Debug, Clone)]
pub struct FixedParameters(pub RateModel);

impl ParameterSource for FixedParameters {
    fn draw<R: Rng + ?Sized>(&self, cohort_id: u64, _rng: &mut R) -> Result<ParameterDraw> {
        Ok(ParameterDraw { cohort_id, model: self.0.clone() })
    }
}

/// Dirichlet over the non-zero entries of one weight row.
#[derive(Debug, Clone)]
struct RowSampler {
    state: HealthState,
    support: Vec<HealthState>,
    /// `None` when the row has a single destination.
    dirichlet: Option<Dirichlet<f64>>,
}

impl RowSampler {
    fn new(state: HealthState, weights: &WeightRow) -> Result<Self> {
        // Validates the row the same way the point estimate does.
        crate::inputs::weights_to_probabilities(state, weights)?;

        let (support, alpha): (Vec<_>, Vec<_>) = weights.iter()
            .filter(|(_, w)| **w > 0.0)
            .map(|(destination, w)| (*destination, *w))
            .unzip();

        let dirichlet = if alpha.len() > 1 {
            Some(Dirichlet::new(alpha).map_err(
                |e| Error::Distribution(format!("Dirichlet for state {}: {:?}", state, e))
            )?)
        } else {
            None
        };

        Ok(Self { state, support, dirichlet })
    }

    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> WeightRow {
        match &self.dirichlet {
            Some(dirichlet) => {
                let p: Vec<f64> = dirichlet.sample(rng);
                self.support.iter().cloned().zip(p).collect()
            },
            None => self.support.iter().map(|destination| (*destination, 1.0)).collect(),
        }
    }
}

/// Draws parameter sets for probabilistic sensitivity analysis.
///
/// Transition rows are Dirichlet around the point-estimate weights, costs are
/// Gamma and utilities Beta, each fitted by method of moments and clamped to
/// half and one-and-a-half times the point estimate.
#[derive(Debug, Clone)]
pub struct ParameterGenerator {
    inputs: ModelInputs,
    rows: Vec<RowSampler>,
    costs: BTreeMap<HealthState, ClampedParameter>,
    utilities: BTreeMap<HealthState, ClampedParameter>,
}

impl ParameterGenerator {
    pub fn new(inputs: &ModelInputs) -> Result<Self> {
        let rows = inputs.transitions.iter()
            .map(|(state, weights)| RowSampler::new(*state, weights))
            .collect::<Result<Vec<_>>>()?;

        let mut costs = BTreeMap::new();
        for (state, mean) in &inputs.state_costs {
            costs.insert(*state, ClampedParameter::cost(*mean, inputs.cost_cv_divisor)?);
        }
        let mut utilities = BTreeMap::new();
        for (state, mean) in &inputs.state_utilities {
            utilities.insert(*state, ClampedParameter::utility(*mean, inputs.utility_cv_divisor)?);
        }

        // Fail now rather than on the first draw.
        inputs.point_estimate()?;

        Ok(Self { inputs: inputs.clone(), rows, costs, utilities })
    }

    pub fn sample<R: Rng + ?Sized>(&self, cohort_id: u64, rng: &mut R) -> Result<ParameterDraw> {
        let mut probabilities = BTreeMap::new();
        for row in &self.rows {
            probabilities.insert(row.state, row.sample(rng));
        }

        let mut state_costs = BTreeMap::new();
        for (state, cost) in &self.costs {
            state_costs.insert(*state, cost.sample(rng));
        }
        let mut state_utilities = BTreeMap::new();
        for (state, utility) in &self.utilities {
            state_utilities.insert(*state, utility.sample(rng));
        }

        let model = self.inputs.build_model(&probabilities, state_costs, state_utilities)?;
        Ok(ParameterDraw { cohort_id, model })
    }
}

impl ParameterSource for ParameterGenerator {
    fn draw<R: Rng + ?Sized>(&self, cohort_id: u64, rng: &mut R) -> Result<ParameterDraw> {
        self.sample(cohort_id, rng)
    }
}
