use log::trace;
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::accrual::AccrualTracker;
use crate::model::{Economics, RateModel};
use crate::sampler::next_event;
use crate::state::HealthState;

/// Entry of an entity into a state at a given time.
///
/// The final entry of a censored walk repeats the current state at the horizon.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEntry {
    pub time: f64,
    pub state: HealthState,
}

/// What one simulated entity contributes to its cohort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityOutcome {
    pub id: u64,
    /// Time of absorption; `None` if the walk was censored at the horizon.
    pub survival_time: Option<f64>,
    pub n_diagnoses: u32,
    pub time_to_diagnosis: Option<f64>,
    pub cause_specific_death: bool,
    pub discounted_cost: f64,
    pub discounted_utility: f64,
}

/// Tracks outcomes as state entries arrive.
struct StateMonitor<'a> {
    economics: &'a Economics,
    diagnosis_state: Option<HealthState>,
    current_state: HealthState,
    survival_time: Option<f64>,
    n_diagnoses: u32,
    time_to_diagnosis: Option<f64>,
    cause_specific_death: bool,
    accrual: AccrualTracker,
}

impl<'a> StateMonitor<'a> {
    fn new(model: &'a RateModel) -> Self {
        Self {
            economics: model.economics(),
            diagnosis_state: model.diagnosis_state(),
            current_state: model.initial_state(),
            survival_time: None,
            n_diagnoses: 0,
            time_to_diagnosis: None,
            cause_specific_death: false,
            accrual: AccrualTracker::new(),
        }
    }

    fn update(&mut self, time: f64, new_state: HealthState) {
        if new_state.is_absorbing() {
            self.survival_time = Some(time);
        }

        if let Some(diagnosis_state) = self.diagnosis_state {
            if self.current_state != diagnosis_state && new_state == diagnosis_state {
                self.n_diagnoses += 1;
                if self.time_to_diagnosis.is_none() {
                    self.time_to_diagnosis = Some(time);
                }
            }
        }

        if !self.current_state.is_cause_specific_death() && new_state.is_cause_specific_death() {
            self.cause_specific_death = true;
        }

        // Costs and utilities belong to the state held until now.
        self.accrual.record(time, self.current_state, self.economics);

        self.current_state = new_state;
    }

    fn into_outcome(self, id: u64) -> EntityOutcome {
        EntityOutcome {
            id,
            survival_time: self.survival_time,
            n_diagnoses: self.n_diagnoses,
            time_to_diagnosis: self.time_to_diagnosis,
            cause_specific_death: self.cause_specific_death,
            discounted_cost: self.accrual.total_cost(),
            discounted_utility: self.accrual.total_utility(),
        }
    }
}

/// Drives one entity through a model until absorption or the horizon.
pub struct EntityWalker<'a> {
    id: u64,
    model: &'a RateModel,
}

impl<'a> EntityWalker<'a> {
    pub fn new(id: u64, model: &'a RateModel) -> Self {
        Self { id, model }
    }

    pub fn walk<R: Rng + ?Sized>(&self, horizon: f64, rng: &mut R) -> EntityOutcome {
        self.walk_with(horizon, rng, |_| {})
    }

    /// Walks and also returns every state entry in order.
    pub fn walk_recording<R: Rng + ?Sized>(
        &self, horizon: f64, rng: &mut R
    ) -> (EntityOutcome, Vec<StateEntry>) {
        let mut entries = Vec::new();
        let outcome = self.walk_with(horizon, rng, |entry| entries.push(entry));
        (outcome, entries)
    }

    /// Walks, passing each state entry to `on_entry` as it happens.
    pub fn walk_with<R, F>(&self, horizon: f64, rng: &mut R, mut on_entry: F) -> EntityOutcome
        where R: Rng + ?Sized, F: FnMut(StateEntry)
    {
        let mut monitor = StateMonitor::new(self.model);
        let mut t = 0.0;

        loop {
            let state = monitor.current_state;
            let event = match self.model.rate_row(state) {
                Some(row) => next_event(row, rng),
                None => None,
            };

            match event {
                None => {
                    // Absorbed; the survival time was recorded on entry.
                    break;
                },
                Some((dt, next_state)) => {
                    if t + dt > horizon {
                        // Censored: the entity stays where it is until the horizon.
                        t = horizon;
                        monitor.update(t, state);
                        on_entry(StateEntry { time: t, state });
                        break;
                    }
                    t += dt;
                    monitor.update(t, next_state);
                    on_entry(StateEntry { time: t, state: next_state });
                }
            }
        }

        trace!(
            "entity {} finished at t = {} in state {}",
            self.id, t, monitor.current_state
        );
        monitor.into_outcome(self.id)
    }
}
