//! Small models shared by the unit tests.

use std::collections::BTreeMap;

use crate::model::{Economics, RateModel, RateRow, StateLayout};
use crate::state::HealthState::{self, *};

fn row(entries: &[(HealthState, f64)]) -> RateRow {
    entries.iter().cloned().collect()
}

/// Well -> NaturalDeath at rate `lambda`; costs 100/year and utility 1/year while well.
pub fn two_state_model(lambda: f64, discount_rate: f64) -> RateModel {
    let mut rates = BTreeMap::new();
    rates.insert(Well, row(&[(NaturalDeath, lambda)]));

    let mut economics = Economics::empty();
    economics.state_costs.insert(Well, 100.0);
    economics.state_utilities.insert(Well, 1.0);
    economics.discount_rate = discount_rate;

    RateModel::new(
        rates,
        economics,
        StateLayout { initial_state: Well, diagnosis_state: None },
    ).unwrap()
}

/// Well -> Local -> CancerDeath with background death from both transient states.
pub fn progression_model(discount_rate: f64) -> RateModel {
    let mut rates = BTreeMap::new();
    rates.insert(Well, row(&[(Local, 0.2), (NaturalDeath, 0.05)]));
    rates.insert(Local, row(&[(CancerDeath, 0.3), (NaturalDeath, 0.05)]));

    let mut economics = Economics::empty();
    economics.state_costs.insert(Local, 1000.0);
    economics.state_utilities.insert(Well, 1.0);
    economics.state_utilities.insert(Local, 0.8);
    economics.treatment_cost = 10.0;
    economics.discount_rate = discount_rate;

    RateModel::new(rates, economics, StateLayout::default()).unwrap()
}
