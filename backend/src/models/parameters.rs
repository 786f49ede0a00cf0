//! Disease parameters and uncertainty scenarios
//!
//! Residence times are supplied, never fitted. Each phase duration comes
//! with a (lower, mean, upper) bound; three scenarios pair the bounds so
//! that the best case is the easiest to detect and the worst case the
//! hardest.

use serde::{Deserialize, Serialize};

use crate::assay::TestType;
use crate::error::{ensure_probability, ModelError};
use crate::models::compartments::Phase;

/// Mean residence times (days) of the four transient phases
///
/// Invariant: every value is finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[f64; 4]", into = "[f64; 4]")]
pub struct ResidenceTimes {
    tau: [f64; 4],
}

impl ResidenceTimes {
    /// `[predetection, presymptomatic, symptomatic, postinfectious]`
    pub fn new(tau: [f64; 4]) -> Result<Self, ModelError> {
        for (phase, value) in Phase::TRANSIENT.iter().zip(tau.iter()) {
            if !value.is_finite() || *value <= 0.0 {
                return Err(ModelError::invalid(format!(
                    "residence time of {:?} must be > 0, got {}",
                    phase, value
                )));
            }
        }
        Ok(Self { tau })
    }

    /// Residence time of a transient phase (`None` for the sink)
    pub fn get(&self, phase: Phase) -> Option<f64> {
        match phase {
            Phase::RiskSink => None,
            _ => Some(self.tau[phase.index()]),
        }
    }

    pub fn predetection(&self) -> f64 {
        self.tau[0]
    }

    pub fn presymptomatic(&self) -> f64 {
        self.tau[1]
    }

    pub fn symptomatic(&self) -> f64 {
        self.tau[2]
    }

    pub fn postinfectious(&self) -> f64 {
        self.tau[3]
    }

    pub fn total(&self) -> f64 {
        self.tau.iter().sum()
    }

    pub fn as_array(&self) -> [f64; 4] {
        self.tau
    }
}

impl TryFrom<[f64; 4]> for ResidenceTimes {
    type Error = ModelError;

    fn try_from(value: [f64; 4]) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ResidenceTimes> for [f64; 4] {
    fn from(times: ResidenceTimes) -> Self {
        times.tau
    }
}

/// Uncertainty scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    Mean,
    Best,
    Worst,
}

impl Scenario {
    /// Column order of every scenario-indexed matrix
    pub const ALL: [Scenario; 3] = [Scenario::Mean, Scenario::Best, Scenario::Worst];

    pub fn index(self) -> usize {
        match self {
            Scenario::Mean => 0,
            Scenario::Best => 1,
            Scenario::Worst => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Scenario::Mean => "mean",
            Scenario::Best => "best",
            Scenario::Worst => "worst",
        }
    }
}

/// Residence times for the mean, best and worst scenario
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScenarioTriple {
    pub mean: ResidenceTimes,
    pub best: ResidenceTimes,
    pub worst: ResidenceTimes,
}

impl ScenarioTriple {
    pub fn new(mean: ResidenceTimes, best: ResidenceTimes, worst: ResidenceTimes) -> Self {
        Self { mean, best, worst }
    }

    pub fn get(&self, scenario: Scenario) -> &ResidenceTimes {
        match scenario {
            Scenario::Mean => &self.mean,
            Scenario::Best => &self.best,
            Scenario::Worst => &self.worst,
        }
    }
}

/// Lower bound, mean and upper bound of a duration (days)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DurationBounds {
    pub lower: f64,
    pub mean: f64,
    pub upper: f64,
}

impl DurationBounds {
    pub fn new(lower: f64, mean: f64, upper: f64) -> Self {
        Self { lower, mean, upper }
    }

    fn validate(&self, name: &str) -> Result<(), ModelError> {
        let ordered = self.lower <= self.mean && self.mean <= self.upper;
        if !(self.lower > 0.0 && self.upper.is_finite() && ordered) {
            return Err(ModelError::invalid(format!(
                "{} bounds must satisfy 0 < lower <= mean <= upper, got ({}, {}, {})",
                name, self.lower, self.mean, self.upper
            )));
        }
        Ok(())
    }
}

/// Model parameters independent of the chosen strategy
///
/// Probabilities are fractions in [0, 1], durations are days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiseaseParameters {
    /// Time from exposure to symptom onset
    pub incubation: DurationBounds,

    /// Share of the incubation period spent before becoming detectable
    pub predetection_share: f64,

    /// Duration of the symptomatic infectious phase
    pub symptomatic: DurationBounds,

    /// Duration of the detectable but non-infectious phase
    pub postinfectious: f64,

    /// Probability of an asymptomatic course
    pub fraction_asymptomatic: f64,

    pub pcr_sensitivity: f64,
    pub pcr_specificity: f64,

    /// Antigen sensitivity relative to PCR
    pub relative_antigen_sensitivity: f64,
}

impl Default for DiseaseParameters {
    fn default() -> Self {
        Self {
            incubation: DurationBounds::new(5.60, 6.77, 7.99),
            predetection_share: 0.422,
            symptomatic: DurationBounds::new(2.79, 7.50, 11.47),
            postinfectious: 8.0,
            fraction_asymptomatic: 0.20,
            pcr_sensitivity: 0.80,
            pcr_specificity: 0.9999,
            relative_antigen_sensitivity: 0.85,
        }
    }
}

impl DiseaseParameters {
    pub fn validate(&self) -> Result<(), ModelError> {
        self.incubation.validate("incubation")?;
        self.symptomatic.validate("symptomatic")?;
        if !(self.postinfectious.is_finite() && self.postinfectious > 0.0) {
            return Err(ModelError::invalid(format!(
                "postinfectious duration must be > 0, got {}",
                self.postinfectious
            )));
        }
        // a share of exactly 0 or 1 would empty a phase
        if !(self.predetection_share > 0.0 && self.predetection_share < 1.0) {
            return Err(ModelError::invalid(format!(
                "predetection share must be within (0, 1), got {}",
                self.predetection_share
            )));
        }
        ensure_probability("fraction_asymptomatic", self.fraction_asymptomatic)?;
        ensure_probability("pcr_sensitivity", self.pcr_sensitivity)?;
        ensure_probability("pcr_specificity", self.pcr_specificity)?;
        ensure_probability(
            "relative_antigen_sensitivity",
            self.relative_antigen_sensitivity,
        )?;
        Ok(())
    }

    /// Pair lower/upper bounds per phase into the three scenarios
    ///
    /// The best case is short before detection and long while detectable;
    /// the worst case the opposite. Postinfectious duration is shared.
    pub fn scenario_triple(&self) -> Result<ScenarioTriple, ModelError> {
        self.validate()?;
        let share = self.predetection_share;
        let post = self.postinfectious;
        let inc = &self.incubation;
        let sym = &self.symptomatic;

        let mean = ResidenceTimes::new([share * inc.mean, (1.0 - share) * inc.mean, sym.mean, post])?;
        let best = ResidenceTimes::new([share * inc.lower, (1.0 - share) * inc.upper, sym.upper, post])?;
        let worst = ResidenceTimes::new([share * inc.upper, (1.0 - share) * inc.lower, sym.lower, post])?;

        Ok(ScenarioTriple { mean, best, worst })
    }

    /// Sensitivity of the given test type
    pub fn test_sensitivity(&self, test_type: TestType) -> f64 {
        match test_type {
            TestType::Pcr => self.pcr_sensitivity,
            TestType::Antigen => self.pcr_sensitivity * self.relative_antigen_sensitivity,
        }
    }

    /// Fraction of individuals entering the symptomatic phase who remain a
    /// risk; screening diverts everyone who develops symptoms
    pub fn risk_posing_fraction(&self, symptomatic_screening: bool) -> f64 {
        if symptomatic_screening {
            self.fraction_asymptomatic
        } else {
            1.0
        }
    }
}
