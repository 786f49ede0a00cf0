// Scenario orchestration: blending, screening, modes and validation

use crate::assay::TestType;
use crate::error::ModelError;
use crate::models::compartments::{CompartmentLayout, Phase};
use crate::models::parameters::Scenario;
use crate::models::strategy::{Mode, Strategy};
use crate::orchestrator::engine::{CalculatorConfig, ScenarioOrchestrator};

fn config_with(strategy: Strategy) -> CalculatorConfig {
    CalculatorConfig {
        strategy,
        ..Default::default()
    }
}

fn unscreened(duration: usize, test_days: Vec<usize>) -> Strategy {
    Strategy {
        duration,
        test_days,
        symptomatic_screening: false,
        ..Default::default()
    }
}

#[test]
fn test_quarantine_without_tests_starts_at_full_risk() {
    let orchestrator = ScenarioOrchestrator::new(&config_with(unscreened(10, vec![]))).unwrap();
    let assessment = orchestrator.run().unwrap();
    let rr = assessment.relative_risk();

    assert_eq!(rr.nrows(), 11);
    for col in 0..3 {
        assert!((rr[(0, col)] - 1.0).abs() < 1e-9, "release at day 0 keeps all risk");
        for row in 1..rr.nrows() {
            assert!(rr[(row, col)] <= rr[(row - 1, col)] + 1e-12);
        }
    }
}

#[test]
fn test_zero_adherence_matches_baseline() {
    let strategy = Strategy {
        adherence: 0.0,
        test_days: vec![3, 7],
        ..Default::default()
    };
    let assessment = ScenarioOrchestrator::new(&config_with(strategy))
        .unwrap()
        .run()
        .unwrap();

    for rr in assessment.relative_risk().iter() {
        assert!((rr - 1.0).abs() < 1e-12);
    }
}

#[test]
fn test_adherence_blends_linearly() {
    let full = ScenarioOrchestrator::new(&config_with(Strategy::default()))
        .unwrap()
        .run()
        .unwrap();
    let half = ScenarioOrchestrator::new(&config_with(Strategy {
        adherence: 0.5,
        ..Default::default()
    }))
    .unwrap()
    .run()
    .unwrap();

    let expected = full.relative_risk().map(|r| 0.5 * r + 0.5);
    for (a, b) in half.relative_risk().iter().zip(expected.iter()) {
        assert!((a - b).abs() < 1e-9);
    }
}

#[test]
fn test_test_reduces_residual_risk() {
    let untested = ScenarioOrchestrator::new(&config_with(unscreened(7, vec![])))
        .unwrap()
        .run()
        .unwrap();
    let tested = ScenarioOrchestrator::new(&config_with(unscreened(7, vec![5])))
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(tested.evaluation_points_with_tests().len(), 9);
    let last_untested = untested.relative_risk().row(7).clone_owned();
    let last_tested = tested.relative_risk().row(8).clone_owned();
    for col in 0..3 {
        assert!(last_tested[col] < last_untested[col]);
    }
}

#[test]
fn test_screening_reduces_risk() {
    let screened = ScenarioOrchestrator::new(&config_with(Strategy::default()))
        .unwrap()
        .run()
        .unwrap();
    let rr = screened.relative_risk();
    for col in 0..3 {
        assert!(rr[(0, col)] < 1.0);
    }
}

#[test]
fn test_isolation_seeds_first_symptomatic_compartment() {
    let strategy = Strategy {
        mode: Mode::Isolation,
        symptomatic_screening: false,
        initial_infection_probability: 0.7,
        ..Default::default()
    };
    let orchestrator = ScenarioOrchestrator::new(&config_with(strategy)).unwrap();
    let layout = CompartmentLayout::canonical();
    let x0 = orchestrator.baseline_initial_state();

    assert_eq!(x0[layout.first_compartment(Phase::Symptomatic)], 0.7);
    assert!((x0.sum() - 0.7).abs() < 1e-12);
}

#[test]
fn test_screening_only_touches_npi_state() {
    let strategy = Strategy {
        mode: Mode::Isolation,
        ..Default::default()
    };
    let orchestrator = ScenarioOrchestrator::new(&config_with(strategy)).unwrap();
    let layout = CompartmentLayout::canonical();
    let onset = layout.first_compartment(Phase::Symptomatic);

    assert_eq!(orchestrator.baseline_initial_state()[onset], 1.0);
    assert!((orchestrator.npi_initial_state()[onset] - 0.2).abs() < 1e-12);
}

#[test]
fn test_incoming_travelers_validation() {
    let wrong_length = Strategy {
        mode: Mode::IncomingTravelers {
            initial_state: vec![0.1; 3],
        },
        ..Default::default()
    };
    assert!(matches!(
        ScenarioOrchestrator::new(&config_with(wrong_length)),
        Err(ModelError::InvalidParameter(_))
    ));

    let mut empty = vec![0.0; 21];
    empty[20] = 0.5;
    let sink_only = Strategy {
        mode: Mode::IncomingTravelers { initial_state: empty },
        ..Default::default()
    };
    assert!(ScenarioOrchestrator::new(&config_with(sink_only)).is_err());
}

#[test]
fn test_zero_infection_probability_rejected_at_run() {
    let strategy = Strategy {
        initial_infection_probability: 0.0,
        ..Default::default()
    };
    let orchestrator = ScenarioOrchestrator::new(&config_with(strategy)).unwrap();
    assert!(matches!(orchestrator.run(), Err(ModelError::InvalidParameter(_))));
}

#[test]
fn test_antigen_assay_metrics_shape() {
    let strategy = Strategy {
        test_type: TestType::Antigen,
        duration: 6,
        test_days: vec![2],
        ..Default::default()
    };
    let assessment = ScenarioOrchestrator::new(&config_with(strategy))
        .unwrap()
        .run()
        .unwrap();

    let detectability = assessment.temporal_assay_detectability();
    assert_eq!(detectability.shape(), (7, 3));
    assert!(detectability.iter().all(|d| (0.0..=1.0).contains(d)));
    assert!(assessment.test_efficacy().iter().all(|e| (0.0..=1.0).contains(e)));
}

#[test]
fn test_pcr_assay_metrics_follow_phase_grouping() {
    let assessment = ScenarioOrchestrator::new(&config_with(Strategy {
        duration: 10,
        test_days: vec![5],
        ..Default::default()
    }))
    .unwrap()
    .run()
    .unwrap();
    let layout = CompartmentLayout::canonical();
    let (sensitivity, specificity) = (0.8, 0.9999);

    for scenario in Scenario::ALL {
        let phases = layout.group_rows_by_phase(assessment.baseline_trajectory(scenario).states());
        let initial_population: f64 = (0..4).map(|p| phases[(0, p)]).sum();
        assert_eq!(phases.shape(), (11, 5));

        for day in 0..=10 {
            let infectious = phases[(day, 1)] + phases[(day, 2)];
            let positives = (1.0 - specificity) * phases[(day, 0)]
                + sensitivity * (infectious + phases[(day, 3)]);
            let col = scenario.index();

            let detectability = assessment.temporal_assay_detectability()[(day, col)];
            let efficacy = assessment.test_efficacy()[(day, col)];
            assert!((detectability - positives / initial_population).abs() < 1e-12);
            assert!((efficacy - sensitivity * infectious / positives).abs() < 1e-12);
        }
    }
}

#[test]
fn test_antigen_assay_metrics_skip_window_edges() {
    let assessment = ScenarioOrchestrator::new(&config_with(Strategy {
        test_type: TestType::Antigen,
        duration: 8,
        ..Default::default()
    }))
    .unwrap()
    .run()
    .unwrap();
    let (sensitivity, specificity) = (0.8 * 0.85, 0.9999);

    let states = assessment.baseline_trajectory(Scenario::Mean).states();
    let sum = |day: usize, range: std::ops::Range<usize>| -> f64 {
        range.map(|i| states[(day, i)]).sum()
    };
    for day in 0..=8 {
        // predetection plus the first 2 and last 5 infectious compartments
        let blind = sum(day, 0..7) + sum(day, 14..19);
        let window = sum(day, 7..14);
        let positives = (1.0 - specificity) * blind + sensitivity * window;

        let detectability = assessment.temporal_assay_detectability()[(day, 0)];
        let efficacy = assessment.test_efficacy()[(day, 0)];
        assert!((detectability - positives).abs() < 1e-12);
        assert!((efficacy - sensitivity * window / positives).abs() < 1e-12);
    }
}

#[test]
fn test_trajectories_are_kept_per_scenario() {
    let assessment = ScenarioOrchestrator::new(&config_with(unscreened(4, vec![2])))
        .unwrap()
        .run()
        .unwrap();

    for scenario in Scenario::ALL {
        assert_eq!(assessment.npi_trajectory(scenario).n_rows(), 6);
        assert_eq!(assessment.baseline_trajectory(scenario).n_rows(), 5);
    }
}

#[test]
fn test_config_from_json_partial() {
    let json = r#"{
        "strategy": {
            "time_offset": 2,
            "duration": 5,
            "test_days": [4],
            "mode": { "type": "isolation" },
            "test_type": "antigen"
        }
    }"#;
    let config = CalculatorConfig::from_json(json).unwrap();
    assert_eq!(config.strategy.mode, Mode::Isolation);
    assert_eq!(config.strategy.test_type, TestType::Antigen);
    assert_eq!(config.layout, CompartmentLayout::canonical());
    assert_eq!(config.strategy.adherence, 1.0);

    let assessment = ScenarioOrchestrator::new(&config).unwrap().run().unwrap();
    assert_eq!(assessment.evaluation_points_with_tests()[0], -2);
}

#[test]
fn test_config_from_json_malformed() {
    assert!(matches!(
        CalculatorConfig::from_json("{ \"strategy\": 3 }"),
        Err(ModelError::InvalidParameter(_))
    ));
}
