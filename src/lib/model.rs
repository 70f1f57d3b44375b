use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;

use crate::errors::*;
use crate::state::HealthState;

/// Outgoing instantaneous rates of one state, keyed by destination.
pub type RateRow = BTreeMap<HealthState, f64>;

/// Annual cost and utility flows attached to the states of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Economics {
    pub state_costs: BTreeMap<HealthState, f64>,
    pub state_utilities: BTreeMap<HealthState, f64>,
    pub treatment_cost: f64,
    pub discount_rate: f64,
}

impl Economics {
    /// Economics with no costs, no utilities and no discounting.
    pub fn empty() -> Self {
        Self {
            state_costs: BTreeMap::new(),
            state_utilities: BTreeMap::new(),
            treatment_cost: 0.0,
            discount_rate: 0.0,
        }
    }

    /// Annual cost of occupying `state`, including the treatment cost.
    pub fn cost_flow(&self, state: HealthState) -> f64 {
        self.state_costs.get(&state).copied().unwrap_or(0.0) + self.treatment_cost
    }

    pub fn utility_flow(&self, state: HealthState) -> f64 {
        self.state_utilities.get(&state).copied().unwrap_or(0.0)
    }
}

/// Where walks start and which state counts as a diagnosis.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateLayout {
    pub initial_state: HealthState,
    pub diagnosis_state: Option<HealthState>,
}

impl Default for StateLayout {
    fn default() -> Self {
        Self {
            initial_state: HealthState::Well,
            diagnosis_state: Some(HealthState::Local),
        }
    }
}

/// A validated continuous-time Markov model.
///
/// Only transient states have rows, and every row has a positive total rate,
/// so a walk can only stop in one of the absorbing states or at the horizon.
/// Zero rates are dropped at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct RateModel {
    rates: BTreeMap<HealthState, RateRow>,
    economics: Economics,
    layout: StateLayout,
}

impl RateModel {
    pub fn new(
        rates: BTreeMap<HealthState, RateRow>,
        economics: Economics,
        layout: StateLayout,
    ) -> Result<Self> {
        let mut validated = BTreeMap::new();

        for (state, row) in rates {
            let mut kept = RateRow::new();
            for (destination, rate) in row {
                if !rate.is_finite() || rate < 0.0 {
                    return Err(Error::MalformedRateRow {
                        state,
                        reason: format!("rate to {} is {}", destination, rate),
                    });
                }
                if rate == 0.0 {
                    continue;
                }
                if destination == state {
                    return Err(Error::MalformedRateRow {
                        state,
                        reason: "transition targets the current state".into(),
                    });
                }
                kept.insert(destination, rate);
            }

            if state.is_absorbing() {
                if !kept.is_empty() {
                    return Err(Error::MalformedRateRow {
                        state,
                        reason: "absorbing state has outgoing transitions".into(),
                    });
                }
                continue;
            }

            let total: f64 = kept.values().sum();
            if total <= 0.0 {
                return Err(Error::MalformedRateRow {
                    state,
                    reason: "outgoing rates sum to zero".into(),
                });
            }
            validated.insert(state, kept);
        }

        // Every reachable transient state needs its own row.
        for row in validated.values() {
            for destination in row.keys() {
                if destination.is_transient() && !validated.contains_key(destination) {
                    return Err(Error::InvalidModel(format!(
                        "state {} is reachable but has no outgoing rates", destination
                    )));
                }
            }
        }

        if !validated.contains_key(&layout.initial_state) {
            return Err(Error::InvalidModel(format!(
                "initial state {} has no outgoing rates", layout.initial_state
            )));
        }

        if !economics.discount_rate.is_finite() || economics.discount_rate < 0.0 {
            return Err(Error::InvalidModel(format!(
                "discount rate must be finite and non-negative, got {}", economics.discount_rate
            )));
        }
        let flows = economics.state_costs.values()
            .chain(economics.state_utilities.values())
            .chain(std::iter::once(&economics.treatment_cost));
        for value in flows {
            if !value.is_finite() {
                return Err(Error::InvalidModel(format!("non-finite cost or utility {}", value)));
            }
        }

        Ok(Self { rates: validated, economics, layout })
    }

    /// Outgoing rates of `state`, or `None` if it has no outgoing transitions.
    pub fn rate_row(&self, state: HealthState) -> Option<&RateRow> {
        self.rates.get(&state)
    }

    pub fn total_rate(&self, state: HealthState) -> f64 {
        self.rate_row(state).map(|row| row.values().sum()).unwrap_or(0.0)
    }

    pub fn economics(&self) -> &Economics {
        &self.economics
    }

    pub fn initial_state(&self) -> HealthState {
        self.layout.initial_state
    }

    pub fn diagnosis_state(&self) -> Option<HealthState> {
        self.layout.diagnosis_state
    }

    pub fn discount_rate(&self) -> f64 {
        self.economics.discount_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::HealthState::*;
    use crate::test_models::two_state_model;

    fn rows(entries: &[(HealthState, &[(HealthState, f64)])]) -> BTreeMap<HealthState, RateRow> {
        entries.iter().map(|(state, row)| {
            (*state, row.iter().cloned().collect())
        }).collect()
    }

    #[test]
    fn test_rows_are_well_formed() {
        let model = two_state_model(0.1, 0.0);
        for state in HealthState::ALL.iter() {
            match model.rate_row(*state) {
                Some(row) => {
                    assert!(state.is_transient());
                    assert!(row.values().all(|r| *r >= 0.0));
                    assert!(model.total_rate(*state) > 0.0);
                },
                None => {
                    assert_eq!(model.total_rate(*state), 0.0);
                }
            }
        }
    }

    #[test]
    fn test_zero_row_is_rejected() {
        let result = RateModel::new(
            rows(&[(Well, &[(Dcis, 0.0), (NaturalDeath, 0.0)])]),
            Economics::empty(),
            StateLayout::default(),
        );
        match result {
            Err(Error::MalformedRateRow { state, .. }) => assert_eq!(state, Well),
            other => panic!("expected malformed row, got {:?}", other),
        }
    }

    #[test]
    fn test_self_transition_is_rejected() {
        let result = RateModel::new(
            rows(&[(Well, &[(Well, 0.5), (NaturalDeath, 0.1)])]),
            Economics::empty(),
            StateLayout::default(),
        );
        assert!(matches!(result, Err(Error::MalformedRateRow { .. })));
    }

    #[test]
    fn test_negative_rate_is_rejected() {
        let result = RateModel::new(
            rows(&[(Well, &[(NaturalDeath, -0.1)])]),
            Economics::empty(),
            StateLayout::default(),
        );
        assert!(matches!(result, Err(Error::MalformedRateRow { .. })));
    }

    #[test]
    fn test_absorbing_row_with_rates_is_rejected() {
        let result = RateModel::new(
            rows(&[
                (Well, &[(NaturalDeath, 0.1)]),
                (NaturalDeath, &[(Well, 1.0)]),
            ]),
            Economics::empty(),
            StateLayout::default(),
        );
        match result {
            Err(Error::MalformedRateRow { state, .. }) => assert_eq!(state, NaturalDeath),
            other => panic!("expected malformed row, got {:?}", other),
        }
    }

    #[test]
    fn test_absorbing_row_of_zeros_is_dropped() {
        let model = RateModel::new(
            rows(&[
                (Well, &[(NaturalDeath, 0.1)]),
                (CancerDeath, &[(Well, 0.0)]),
            ]),
            Economics::empty(),
            StateLayout::default(),
        ).unwrap();
        assert!(model.rate_row(CancerDeath).is_none());
    }

    #[test]
    fn test_reachable_state_without_row_is_rejected() {
        let result = RateModel::new(
            rows(&[(Well, &[(Dcis, 0.1), (NaturalDeath, 0.1)])]),
            Economics::empty(),
            StateLayout::default(),
        );
        assert!(matches!(result, Err(Error::InvalidModel(_))));
    }

    #[test]
    fn test_initial_state_needs_row() {
        let result = RateModel::new(
            rows(&[(Dcis, &[(NaturalDeath, 0.1)])]),
            Economics::empty(),
            StateLayout::default(),
        );
        assert!(matches!(result, Err(Error::InvalidModel(_))));
    }

    #[test]
    fn test_negative_discount_rate_is_rejected() {
        let mut economics = Economics::empty();
        economics.discount_rate = -0.03;
        let result = RateModel::new(
            rows(&[(Well, &[(NaturalDeath, 0.1)])]),
            economics,
            StateLayout::default(),
        );
        assert!(matches!(result, Err(Error::InvalidModel(_))));
    }

    #[test]
    fn test_zero_rates_are_dropped() {
        let model = RateModel::new(
            rows(&[(Well, &[(Dcis, 0.0), (NaturalDeath, 0.1)])]),
            Economics::empty(),
            StateLayout::default(),
        ).unwrap();
        let row = model.rate_row(Well).unwrap();
        assert_eq!(row.len(), 1);
        assert_eq!(row[&NaturalDeath], 0.1);
    }

    #[test]
    fn test_cost_flow_includes_treatment() {
        let mut economics = Economics::empty();
        economics.state_costs.insert(Local, 100.0);
        economics.treatment_cost = 25.0;
        assert_eq!(economics.cost_flow(Local), 125.0);
        assert_eq!(economics.cost_flow(Well), 25.0);
        assert_eq!(economics.utility_flow(Well), 0.0);
    }
}
