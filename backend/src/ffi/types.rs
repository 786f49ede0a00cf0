//! Type conversion utilities for the FFI boundary
//!
//! Converts results into PyDicts of plain lists and maps [`ModelError`]
//! onto Python exceptions.

use nalgebra::DMatrix;
use pyo3::exceptions::{PyArithmeticError, PyValueError};
use pyo3::prelude::*;
use pyo3::types::PyDict;

use crate::error::ModelError;
use crate::orchestrator::StrategyAssessment;
use crate::prevalence::PrevalenceEstimate;

/// `InvalidParameter` becomes `ValueError`, `NumericOverflow` becomes
/// `ArithmeticError`
pub(crate) fn model_error_to_py(err: ModelError) -> PyErr {
    match err {
        ModelError::InvalidParameter(_) => PyValueError::new_err(err.to_string()),
        ModelError::NumericOverflow(_) => PyArithmeticError::new_err(err.to_string()),
    }
}

/// Row-major nested lists
pub(crate) fn matrix_rows(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    matrix
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

pub(crate) fn assessment_to_py<'py>(
    py: Python<'py>,
    assessment: &StrategyAssessment,
) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item(
        "risk_no_intervention",
        matrix_rows(assessment.risk_matrix_no_intervention()),
    )?;
    dict.set_item("risk_npi", matrix_rows(assessment.risk_matrix_npi()))?;
    dict.set_item("relative_risk", matrix_rows(&assessment.relative_risk()))?;
    dict.set_item("risk_reduction", matrix_rows(&assessment.risk_reduction()))?;
    dict.set_item(
        "fold_risk_reduction",
        matrix_rows(&assessment.fold_risk_reduction()),
    )?;
    dict.set_item(
        "assay_detectability",
        matrix_rows(assessment.temporal_assay_detectability()),
    )?;
    dict.set_item("test_efficacy", matrix_rows(assessment.test_efficacy()))?;
    dict.set_item(
        "evaluation_points_with_tests",
        assessment.evaluation_points_with_tests().to_vec(),
    )?;
    dict.set_item(
        "evaluation_points_without_tests",
        assessment.evaluation_points_without_tests().to_vec(),
    )?;

    let summary = assessment.release_summary();
    let release = PyDict::new_bound(py);
    release.set_item("relative_risk", summary.relative_risk.as_tuple())?;
    release.set_item("risk_reduction", summary.risk_reduction.as_tuple())?;
    release.set_item("fold_risk_reduction", summary.fold_risk_reduction.as_tuple())?;
    dict.set_item("release", release)?;

    Ok(dict)
}

pub(crate) fn prevalence_to_py<'py>(
    py: Python<'py>,
    estimate: &PrevalenceEstimate,
) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new_bound(py);
    dict.set_item("compartment_states", matrix_rows(estimate.compartment_states()))?;
    dict.set_item("phase_probabilities", matrix_rows(estimate.phase_probabilities()))?;
    dict.set_item("infectious_probability", estimate.infectious_range().as_tuple())?;
    Ok(dict)
}
