use rand::distributions::Distribution;
use rand::Rng;
use rand_distr::Exp1;

use crate::model::RateRow;
use crate::state::HealthState;

/// Draws the holding time and destination of one exact continuous-time step.
///
/// Returns `None` when the row's total rate is zero, i.e. the state is
/// absorbing. The holding time is exponential with the total rate; the
/// destination is chosen with probability proportional to its rate, using a
/// second uniform variate.
pub fn next_event<R: Rng + ?Sized>(row: &RateRow, rng: &mut R) -> Option<(f64, HealthState)> {
    let total: f64 = row.values().sum();
    if total <= 0.0 {
        return None;
    }

    let e: f64 = Exp1.sample(rng);
    let dt = e / total;

    let u: f64 = rng.gen();
    select_destination(row, u * total).map(|next_state| (dt, next_state))
}

/// Finds the destination whose interval of `[0, total)` contains `x`.
///
/// Intervals are laid out in state order. Rounding can push `x` past the last
/// cumulative sum; that lands on the last destination with a positive rate.
pub fn select_destination(row: &RateRow, x: f64) -> Option<HealthState> {
    let mut cumulative = 0.0;
    let mut last_positive = None;
    for (state, rate) in row {
        if *rate <= 0.0 {
            continue;
        }
        cumulative += rate;
        last_positive = Some(*state);
        if x < cumulative {
            return Some(*state);
        }
    }
    last_positive
}
