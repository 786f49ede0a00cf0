//! PyO3 wrapper for ScenarioOrchestrator
//!
//! # Example (from Python)
//!
//! ```python
//! import json
//! from npi_strategy_core_rs import StrategyCalculator, estimate_prevalence
//!
//! config = {"strategy": {"duration": 10, "test_days": [5, 9]}}
//! calc = StrategyCalculator.from_json(json.dumps(config))
//! result = calc.run()
//! print(result["release"]["relative_risk"])
//!
//! prevalence = estimate_prevalence([50, 40, 30, 20, 10], 0.5)
//! ```

use pyo3::prelude::*;
use pyo3::types::PyDict;

use super::types::{assessment_to_py, model_error_to_py, prevalence_to_py};
use crate::orchestrator::{CalculatorConfig, ScenarioOrchestrator};
use crate::prevalence::{PrevalenceEstimator, WeeklyIncidence, INCIDENCE_WEEKS};

/// Python wrapper for a validated strategy evaluation
#[pyclass(name = "StrategyCalculator")]
pub struct PyStrategyCalculator {
    inner: ScenarioOrchestrator,
}

#[pymethods]
impl PyStrategyCalculator {
    /// Create a calculator from a JSON configuration
    ///
    /// Raises ValueError for malformed or invalid configuration.
    #[staticmethod]
    fn from_json(config: &str) -> PyResult<Self> {
        let config = CalculatorConfig::from_json(config).map_err(model_error_to_py)?;
        let inner = ScenarioOrchestrator::new(&config).map_err(model_error_to_py)?;
        Ok(PyStrategyCalculator { inner })
    }

    /// Evaluate the strategy; the GIL is released during computation
    fn run<'py>(&self, py: Python<'py>) -> PyResult<Bound<'py, PyDict>> {
        let assessment = py
            .allow_threads(|| self.inner.run())
            .map_err(model_error_to_py)?;
        assessment_to_py(py, &assessment)
    }

    /// Calendar days of the rows returned by `run`
    fn evaluation_points(&self) -> Vec<i64> {
        self.inner.timeline().evaluation_points_with_tests()
    }
}

/// Estimate today's infection-age distribution from reported weekly cases
///
/// `config_json` optionally overrides layout and disease parameters.
#[pyfunction]
#[pyo3(signature = (cases_per_100k, case_detection_rate, config_json=None))]
pub fn estimate_prevalence<'py>(
    py: Python<'py>,
    cases_per_100k: [f64; INCIDENCE_WEEKS],
    case_detection_rate: f64,
    config_json: Option<&str>,
) -> PyResult<Bound<'py, PyDict>> {
    let config = match config_json {
        Some(json) => CalculatorConfig::from_json(json).map_err(model_error_to_py)?,
        None => CalculatorConfig::default(),
    };
    let incidence =
        WeeklyIncidence::from_reports(cases_per_100k, case_detection_rate).map_err(model_error_to_py)?;
    let triple = config.scenario_triple().map_err(model_error_to_py)?;
    let estimator = PrevalenceEstimator::new(&config.layout, triple);

    let estimate = py
        .allow_threads(|| estimator.estimate(&incidence))
        .map_err(model_error_to_py)?;
    prevalence_to_py(py, &estimate)
}
