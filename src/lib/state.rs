use serde::{Serialize, Deserialize};
use std::fmt;

/// Health states of the disease model, in their fixed iteration order.
///
/// The two death states are absorbing; every other state is transient.
/// The derived ordering is the order in which destinations are visited when a
/// transition is drawn, so it must not depend on anything but the declaration
/// order below.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Well,
    Dcis,
    Local,
    Regional,
    Distant,
    CancerDeath,
    NaturalDeath,
}

impl HealthState {
    pub const ALL: [HealthState; 7] = [
        HealthState::Well,
        HealthState::Dcis,
        HealthState::Local,
        HealthState::Regional,
        HealthState::Distant,
        HealthState::CancerDeath,
        HealthState::NaturalDeath,
    ];

    pub fn is_absorbing(&self) -> bool {
        match self {
            HealthState::CancerDeath | HealthState::NaturalDeath => true,
            _ => false,
        }
    }

    pub fn is_transient(&self) -> bool {
        !self.is_absorbing()
    }

    /// Death from the modelled disease, as opposed to all-cause death.
    pub fn is_cause_specific_death(&self) -> bool {
        *self == HealthState::CancerDeath
    }

    pub fn name(&self) -> &'static str {
        match self {
            HealthState::Well => "well",
            HealthState::Dcis => "dcis",
            HealthState::Local => "local",
            HealthState::Regional => "regional",
            HealthState::Distant => "distant",
            HealthState::CancerDeath => "cancer_death",
            HealthState::NaturalDeath => "natural_death",
        }
    }
}

impl fmt::Display for HealthState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}
