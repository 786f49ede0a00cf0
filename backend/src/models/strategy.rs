//! NPI strategy definition

use serde::{Deserialize, Serialize};

use crate::assay::TestType;
use crate::core::timeline::Timeline;
use crate::error::{ensure_probability, ModelError};

/// Starting situation of a strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mode {
    /// Start at the time of exposure
    ContactManagement,
    /// Start at symptom onset
    Isolation,
    /// Start from a mixed infection-age distribution, usually the output of
    /// the prevalence estimator
    IncomingTravelers { initial_state: Vec<f64> },
}

/// Quarantine / isolation / testing strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Strategy {
    /// Days between exposure (or onset) and the start of the strategy
    pub time_offset: usize,

    /// Days the strategy lasts after the offset
    pub duration: usize,

    /// Test days counted from exposure, strictly increasing, within
    /// `[0, time_offset + duration]`
    pub test_days: Vec<usize>,

    pub mode: Mode,

    /// Individuals developing symptoms are isolated
    pub symptomatic_screening: bool,

    pub test_type: TestType,

    /// Fraction of the population following the strategy
    pub adherence: f64,

    /// Probability that a contact was infected at day 0
    pub initial_infection_probability: f64,
}

impl Default for Strategy {
    fn default() -> Self {
        Self {
            time_offset: 0,
            duration: 10,
            test_days: Vec::new(),
            mode: Mode::ContactManagement,
            symptomatic_screening: true,
            test_type: TestType::Pcr,
            adherence: 1.0,
            initial_infection_probability: 1.0,
        }
    }
}

impl Strategy {
    /// Last simulated day, counted from exposure
    pub fn end_day(&self) -> usize {
        self.time_offset + self.duration
    }

    /// Validate and build the day timeline of this strategy
    pub fn timeline(&self) -> Result<Timeline, ModelError> {
        Timeline::new(self.time_offset, self.duration, self.test_days.clone())
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        ensure_probability("adherence", self.adherence)?;
        ensure_probability(
            "initial_infection_probability",
            self.initial_infection_probability,
        )?;
        self.timeline()?;
        Ok(())
    }
}
