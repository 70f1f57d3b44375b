use crate::model::Economics;
use crate::state::HealthState;

/// Present value at time 0 of a constant flow `payment` per unit time over
/// `[t_start, t_end)`, continuously discounted at `discount_rate`.
pub fn pv_continuous_payment(payment: f64, discount_rate: f64, t_start: f64, t_end: f64) -> f64 {
    if discount_rate == 0.0 {
        payment * (t_end - t_start)
    }
    else {
        payment * ((-discount_rate * t_start).exp() - (-discount_rate * t_end).exp()) / discount_rate
    }
}

/// Running discounted cost and utility of one entity.
#[derive(Debug, Clone)]
pub struct AccrualTracker {
    t_last: f64,
    total_cost: f64,
    total_utility: f64,
}

impl AccrualTracker {
    pub fn new() -> Self {
        Self { t_last: 0.0, total_cost: 0.0, total_utility: 0.0 }
    }

    /// Accrues the flows of `state_held` over `[t_last, t_now)` and returns the
    /// discounted cost and utility added by this interval.
    pub fn record(&mut self, t_now: f64, state_held: HealthState, economics: &Economics) -> (f64, f64) {
        let cost = pv_continuous_payment(
            economics.cost_flow(state_held), economics.discount_rate, self.t_last, t_now
        );
        let utility = pv_continuous_payment(
            economics.utility_flow(state_held), economics.discount_rate, self.t_last, t_now
        );

        self.total_cost += cost;
        self.total_utility += utility;
        self.t_last = t_now;

        (cost, utility)
    }

    pub fn t_last(&self) -> f64 {
        self.t_last
    }

    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    pub fn total_utility(&self) -> f64 {
        self.total_utility
    }
}

impl Default for AccrualTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::HealthState::*;

    fn economics(discount_rate: f64) -> Economics {
        let mut economics = Economics::empty();
        economics.state_costs.insert(Local, 1000.0);
        economics.state_utilities.insert(Well, 1.0);
        economics.state_utilities.insert(Local, 0.8);
        economics.treatment_cost = 50.0;
        economics.discount_rate = discount_rate;
        economics
    }

    #[test]
    fn test_zero_discount_is_linear() {
        assert_eq!(pv_continuous_payment(120.0, 0.0, 2.0, 5.5), 120.0 * 3.5);

        let economics = economics(0.0);
        let mut tracker = AccrualTracker::new();
        tracker.record(2.0, Well, &economics);
        tracker.record(5.0, Local, &economics);
        assert!((tracker.total_cost() - (50.0 * 2.0 + 1050.0 * 3.0)).abs() < 1e-9);
        assert!((tracker.total_utility() - (2.0 + 0.8 * 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_discounted_matches_closed_form() {
        let r = 0.03;
        let pv = pv_continuous_payment(1.0, r, 0.0, 10.0);
        assert!((pv - (1.0 - (-0.3f64).exp()) / r).abs() < 1e-12);

        // Splitting an interval does not change its value.
        let split = pv_continuous_payment(1.0, r, 0.0, 4.0) + pv_continuous_payment(1.0, r, 4.0, 10.0);
        assert!((pv - split).abs() < 1e-12);
    }

    #[test]
    fn test_discounting_reduces_value() {
        let undiscounted = pv_continuous_payment(1.0, 0.0, 1.0, 3.0);
        let discounted = pv_continuous_payment(1.0, 0.05, 1.0, 3.0);
        assert!(discounted < undiscounted);
        assert!(discounted > 0.0);
    }

    #[test]
    fn test_accrues_state_held_before_event() {
        let economics = economics(0.0);
        let mut tracker = AccrualTracker::new();

        // Entering Local at t = 4 charges four years of Well.
        let (cost, utility) = tracker.record(4.0, Well, &economics);
        assert_eq!(cost, 200.0);
        assert_eq!(utility, 4.0);
        assert_eq!(tracker.t_last(), 4.0);

        // Death at t = 6 charges two years of Local.
        let (cost, utility) = tracker.record(6.0, Local, &economics);
        assert_eq!(cost, 2100.0);
        assert!((utility - 1.6).abs() < 1e-12);
    }
}
