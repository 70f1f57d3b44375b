pub mod errors;
pub mod util;
pub mod logging;

pub mod state;
pub mod model;
pub mod random;
pub mod sampler;
pub mod accrual;
pub mod walker;
pub mod stats;
pub mod path;
pub mod cohort;

pub mod inputs;
pub mod fit;
pub mod psa;
pub mod multi;
pub mod catalog;
pub mod config;
pub mod output;

#[cfg(test)]
mod test_models;

pub use errors::{Error, Result};
pub use state::HealthState;
pub use model::{RateModel, RateRow, Economics, StateLayout};
pub use cohort::{Cohort, CohortOutcome};
pub use multi::{MultiCohort, MultiCohortOutcome};
pub use psa::{ParameterDraw, ParameterSource, FixedParameters, ParameterGenerator};
pub use stats::{IntervalKind, SummaryStat};
