//! Tests for ProgressionEngine
//!
//! Exact matrix-exponential propagation of the compartmental chain.

use nalgebra::DVector;
use npi_strategy_core_rs::progression::build_generator;
use npi_strategy_core_rs::{
    CompartmentLayout, DiseaseParameters, ModelError, Phase, ProgressionEngine, ResidenceTimes,
};

fn exposed(layout: &CompartmentLayout) -> DVector<f64> {
    let mut x0 = DVector::zeros(layout.n_compartments());
    x0[0] = 1.0;
    x0
}

fn mean_times() -> ResidenceTimes {
    DiseaseParameters::default().scenario_triple().unwrap().mean
}

fn engine(risk_posing_fraction: f64) -> ProgressionEngine {
    let layout = CompartmentLayout::canonical();
    ProgressionEngine::new(&layout, mean_times(), risk_posing_fraction, exposed(&layout)).unwrap()
}

#[test]
fn test_evaluate_at_zero_returns_initial_state() {
    let engine = engine(1.0);
    assert_eq!(engine.evaluate(0.0).unwrap(), *engine.initial_state());
}

#[test]
fn test_mass_conserved_at_full_risk_posing_fraction() {
    let engine = engine(1.0);
    for t in [0.5, 1.0, 5.0, 20.0, 60.0, 100.0] {
        let state = engine.evaluate(t).unwrap();
        assert!((state.sum() - 1.0).abs() < 1e-9, "t={} mass={}", t, state.sum());
        assert!(state.iter().all(|v| *v >= -1e-12));
    }
}

#[test]
fn test_screening_only_removes_mass() {
    let engine = engine(0.2);
    let mut previous = 1.0;
    for day in 1..30 {
        let mass = engine.evaluate(day as f64).unwrap().sum();
        assert!(mass <= previous + 1e-12);
        previous = mass;
    }
    assert!(previous < 1.0);
}

#[test]
fn test_long_horizon_drains_into_sink() {
    let engine = engine(1.0);
    let layout = engine.layout().clone();
    let state = engine.evaluate(1000.0).unwrap();

    assert!((state[layout.sink()] - 1.0).abs() < 1e-6);
    for i in 0..layout.sink() {
        assert!(state[i].abs() < 1e-6, "compartment {} = {}", i, state[i]);
    }
}

#[test]
fn test_reference_times_drain_into_sink() {
    let layout = CompartmentLayout::canonical();
    let tau = ResidenceTimes::new([3.0, 3.0, 8.0, 5.0]).unwrap();
    let engine = ProgressionEngine::new(&layout, tau, 1.0, exposed(&layout)).unwrap();
    let state = engine.evaluate(1000.0).unwrap();

    assert!((state[layout.sink()] - 1.0).abs() < 1e-9);
    assert!(state.rows(0, layout.sink()).iter().all(|v| v.abs() < 1e-9));
}

#[test]
fn test_sink_is_monotone() {
    let engine = engine(1.0);
    let sink = engine.layout().sink();
    let mut previous = 0.0;
    for day in 0..=40 {
        let value = engine.evaluate(day as f64).unwrap()[sink];
        assert!(value >= previous - 1e-12);
        previous = value;
    }
}

#[test]
fn test_evaluation_is_deterministic() {
    let engine = engine(0.5);
    let a = engine.evaluate(7.25).unwrap();
    let b = engine.evaluate(7.25).unwrap();
    assert_eq!(a, b);
}

#[test]
fn test_evaluate_from_matches_reseeded_evaluation() {
    let mut engine = engine(1.0);
    let layout = CompartmentLayout::canonical();
    let mut state = DVector::zeros(layout.n_compartments());
    state[layout.first_compartment(Phase::Symptomatic)] = 0.4;

    let from = engine.evaluate_from(3.0, &state).unwrap();
    let reseeded = engine.evaluate_reseeded(3.0, state).unwrap();
    assert_eq!(from, reseeded);
}

#[test]
fn test_semigroup_property() {
    let engine = engine(1.0);
    let direct = engine.evaluate(9.0).unwrap();
    let halfway = engine.evaluate(4.0).unwrap();
    let stepped = engine.evaluate_from(5.0, &halfway).unwrap();
    for (a, b) in direct.iter().zip(stepped.iter()) {
        assert!((a - b).abs() < 1e-10);
    }
}

#[test]
fn test_invalid_inputs_rejected() {
    let layout = CompartmentLayout::canonical();
    assert!(matches!(
        ResidenceTimes::new([5.0, 0.0, 7.0, 8.0]),
        Err(ModelError::InvalidParameter(_))
    ));
    assert!(ProgressionEngine::new(&layout, mean_times(), 1.5, exposed(&layout)).is_err());
    assert!(ProgressionEngine::new(&layout, mean_times(), 1.0, DVector::zeros(5)).is_err());

    let engine = engine(1.0);
    assert!(engine.evaluate(-1.0).is_err());
    assert!(engine.evaluate(f64::NAN).is_err());
}

#[test]
fn test_generator_matches_engine() {
    let engine = engine(0.3);
    let layout = CompartmentLayout::canonical();
    assert_eq!(
        *engine.generator(),
        build_generator(&layout, &mean_times(), 0.3)
    );
}

#[test]
fn test_custom_layout() {
    let layout = CompartmentLayout::new([2, 1, 4, 1, 1]).unwrap();
    let tau = ResidenceTimes::new([2.0, 2.0, 6.0, 4.0]).unwrap();
    let engine = ProgressionEngine::new(&layout, tau, 1.0, exposed(&layout)).unwrap();
    let state = engine.evaluate(12.0).unwrap();
    assert_eq!(state.len(), 9);
    assert!((state.sum() - 1.0).abs() < 1e-9);
}
