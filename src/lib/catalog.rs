use indexmap::IndexMap;
use serde::{Serialize, Deserialize};
use std::collections::BTreeMap;

use crate::errors::*;
use crate::inputs::{ModelInputs, WeightRow};
use crate::model::StateLayout;
use crate::state::HealthState;

/// Every input table of the model, for all groups and interventions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputCatalog {
    pub discount_rate: f64,
    #[serde(default = "default_time_step")]
    pub time_step: f64,
    /// Used for groups that do not give their own.
    #[serde(default)]
    pub background_mortality_probability: f64,
    #[serde(default = "default_initial_state")]
    pub initial_state: HealthState,
    #[serde(default)]
    pub diagnosis_state: Option<HealthState>,
    pub state_costs: BTreeMap<HealthState, f64>,
    #[serde(default = "default_cost_cv_divisor")]
    pub cost_cv_divisor: f64,
    #[serde(default = "default_utility_cv_divisor")]
    pub utility_cv_divisor: f64,
    pub interventions: IndexMap<String, Intervention>,
    pub groups: IndexMap<String, GroupTables>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intervention {
    pub annual_cost: f64,
}

/// Tables specific to one population group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupTables {
    #[serde(default)]
    pub background_mortality_probability: Option<f64>,
    pub state_utilities: BTreeMap<HealthState, f64>,
    /// Transition weights, keyed by intervention.
    pub transitions: IndexMap<String, BTreeMap<HealthState, WeightRow>>,
}

fn default_time_step() -> f64 { 1.0 }
fn default_initial_state() -> HealthState { HealthState::Well }
fn default_cost_cv_divisor() -> f64 { 4.0 }
fn default_utility_cv_divisor() -> f64 { 5.0 }

impl InputCatalog {
    pub fn from_json(json_data: &str) -> Result<Self> {
        Ok(serde_json::from_str(json_data)?)
    }

    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(|k| k.as_str())
    }

    pub fn intervention_names(&self) -> impl Iterator<Item = &str> {
        self.interventions.keys().map(|k| k.as_str())
    }

    /// Pulls the tables for one group under one intervention.
    pub fn resolve(&self, group: &str, intervention: &str) -> Result<ModelInputs> {
        let tables = self.groups.get(group).ok_or_else(
            || Error::UnknownGroup(group.into())
        )?;
        let unknown = || Error::UnknownIntervention {
            group: group.into(),
            intervention: intervention.into(),
        };
        let cost = self.interventions.get(intervention).ok_or_else(unknown)?;
        let transitions = tables.transitions.get(intervention).ok_or_else(unknown)?;

        Ok(ModelInputs {
            transitions: transitions.clone(),
            state_costs: self.state_costs.clone(),
            state_utilities: tables.state_utilities.clone(),
            treatment_cost: cost.annual_cost,
            discount_rate: self.discount_rate,
            time_step: self.time_step,
            background_mortality_probability: tables.background_mortality_probability
                .unwrap_or(self.background_mortality_probability),
            layout: StateLayout {
                initial_state: self.initial_state,
                diagnosis_state: self.diagnosis_state,
            },
            cost_cv_divisor: self.cost_cv_divisor,
            utility_cv_divisor: self.utility_cv_divisor,
        })
    }
}
