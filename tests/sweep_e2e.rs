use episim::{CellState, InitialInfected, SeedSweep, SimulationConfig, SweepConfig};

fn base() -> SimulationConfig {
    SimulationConfig {
        n_steps: 50,
        grid_size: 128,
        initial_infected: InitialInfected::Count(2),
        sample_interval: 10,
        ..SimulationConfig::default()
    }
}

#[test]
fn sweep_results_are_independent_of_worker_count() {
    let one = SeedSweep::consecutive(
        base(),
        10,
        6,
        SweepConfig {
            workers: 1,
            queue_capacity: 1,
        },
    )
    .run()
    .unwrap();
    let four = SeedSweep::consecutive(
        base(),
        10,
        6,
        SweepConfig {
            workers: 4,
            queue_capacity: 8,
        },
    )
    .run()
    .unwrap();

    let seeds: Vec<u64> = four.runs.iter().map(|r| r.metadata.config.random_seed).collect();
    assert_eq!(seeds, vec![10, 11, 12, 13, 14, 15]);
    for (a, b) in one.runs.iter().zip(&four.runs) {
        assert_eq!(a.fingerprint(), b.fingerprint());
    }
    assert_eq!(one.mean_final_recovered_cells, four.mean_final_recovered_cells);
    assert_eq!(one.mean_dimension_series, four.mean_dimension_series);
}

#[test]
fn sweep_aggregates_match_the_runs() {
    let report = SeedSweep::new(base(), vec![3, 4, 5, 6], SweepConfig::default())
        .run()
        .unwrap();
    let expected: f64 = report
        .runs
        .iter()
        .map(|r| r.final_grid().unwrap().count(CellState::Recovered) as f64)
        .sum::<f64>()
        / 4.0;
    assert!((report.mean_final_recovered_cells - expected).abs() < 1e-12);

    assert_eq!(report.mean_dimension_series.len(), 6);
    for (k, &(t, d)) in report.mean_dimension_series.iter().enumerate() {
        assert_eq!(t, report.runs[0].dimensions[k].t);
        assert!((0.0..=1.0).contains(&d));
    }
}

#[test]
fn failing_seed_fails_the_sweep() {
    // Valid configuration, but every run diverges at its second step.
    let config = SimulationConfig {
        integration: episim::IntegrationMethod::Euler,
        beta: 1.0e10,
        sir_initial_infected: Some(1.0e-12),
        ..base()
    };
    let err = SeedSweep::consecutive(config, 0, 3, SweepConfig::default())
        .run()
        .unwrap_err();
    assert!(err.is_numerical());
    assert_eq!(err.failed_step(), Some(1));
}
