use episim::export::{read_json, write_json};
use episim::{
    CellState, InitialInfected, IntegrationMethod, Placement, RunStatus, Simulation,
    SimulationConfig,
};

fn classic() -> SimulationConfig {
    SimulationConfig {
        beta: 0.3,
        gamma: 0.1,
        dt: 1.0,
        n_steps: 100,
        grid_size: 128,
        sir_initial_infected: Some(0.01),
        sample_interval: 10,
        ..SimulationConfig::default()
    }
}

#[test]
fn classic_sir_curve_has_single_interior_peak() {
    let result = episim::run(&classic()).unwrap();
    assert!(result.is_complete());
    assert_eq!(result.sir_series.len(), 101);

    let series = &result.sir_series;
    let peak_idx = series
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.i.total_cmp(&b.1.i))
        .map(|(idx, _)| idx)
        .unwrap();
    assert!(peak_idx > 0 && peak_idx < series.len() - 1, "peak at {peak_idx}");

    // Rises to the peak, falls after it.
    for w in series[..=peak_idx].windows(2) {
        assert!(w[1].i >= w[0].i);
    }
    for w in series[peak_idx..].windows(2) {
        assert!(w[1].i <= w[0].i);
    }

    let (_, peak_i) = result.peak_prevalence().unwrap();
    assert!(peak_i > 0.2 && peak_i < 0.4, "peak {peak_i}");

    for w in series.windows(2) {
        assert!(w[1].s <= w[0].s + 1e-12);
        assert!(w[1].r >= w[0].r - 1e-12);
    }
    for s in series {
        assert!((s.total() - 1.0).abs() < 1e-9);
        assert!(s.s >= 0.0 && s.i >= 0.0 && s.r >= 0.0);
    }
    let final_r = result.final_state().unwrap().r;
    assert!(final_r > 0.5 && final_r < 1.0, "final R {final_r}");
}

#[test]
fn euler_and_rk4_agree_on_coarse_shape() {
    let rk4 = episim::run(&classic()).unwrap();
    let euler = episim::run(&SimulationConfig {
        integration: IntegrationMethod::Euler,
        ..classic()
    })
    .unwrap();
    let (t_rk4, _) = rk4.peak_prevalence().unwrap();
    let (t_euler, _) = euler.peak_prevalence().unwrap();
    assert!((t_rk4 - t_euler).abs() <= 5.0, "rk4 {t_rk4} vs euler {t_euler}");
}

#[test]
fn without_recovery_the_infected_set_only_grows() {
    let config = SimulationConfig {
        n_steps: 300,
        grid_size: 64,
        initial_infected: InitialInfected::Count(1),
        k_local: 0.0,
        k_global: 1.0,
        p_recover: 0.0,
        sample_interval: 10,
        random_seed: 2024,
        ..SimulationConfig::default()
    };
    let result = episim::run(&config).unwrap();

    let counts = result.cell_counts(CellState::Infected);
    assert_eq!(counts.first().map(|&(_, n)| n), Some(1));
    for w in counts.windows(2) {
        assert!(w[1].1 >= w[0].1, "infected count fell: {:?} -> {:?}", w[0], w[1]);
    }
    assert!(result
        .cell_counts(CellState::Recovered)
        .iter()
        .all(|&(_, n)| n == 0));

    // The SIR prevalence has died out long before step 250.
    let at_250 = result.snapshots.iter().find(|s| s.step == 250).unwrap();
    let last = result.final_grid().unwrap();
    assert_eq!(
        at_250.grid.count(CellState::Infected),
        last.count(CellState::Infected)
    );
    assert!(last.count(CellState::Infected) > 32);
}

#[test]
fn zero_coupling_never_adds_infections() {
    let config = SimulationConfig {
        n_steps: 60,
        grid_size: 64,
        initial_infected: InitialInfected::Count(5),
        k_local: 0.0,
        k_global: 0.0,
        p_recover: 0.2,
        ..SimulationConfig::default()
    };
    let result = episim::run(&config).unwrap();
    let affected: Vec<usize> = result
        .snapshots
        .iter()
        .map(|s| s.grid.len() - s.grid.count(CellState::Susceptible))
        .collect();
    assert!(affected.iter().all(|&n| n == 5));
    let infected = result.cell_counts(CellState::Infected);
    for w in infected.windows(2) {
        assert!(w[1].1 <= w[0].1);
    }
}

#[test]
fn identical_configs_reproduce_identical_runs() {
    let config = SimulationConfig {
        n_steps: 80,
        grid_size: 256,
        initial_infected: InitialInfected::Fraction(0.02),
        sample_interval: 4,
        random_seed: 99,
        ..SimulationConfig::default()
    };
    let a = episim::run(&config).unwrap();
    let b = episim::run(&config).unwrap();
    assert_eq!(a.run_id, b.run_id);
    assert_eq!(a.fingerprint(), b.fingerprint());
    assert_eq!(a.sir_series, b.sir_series);
    assert_eq!(a.snapshots, b.snapshots);
    assert_eq!(a.dimensions, b.dimensions);

    let c = episim::run(&SimulationConfig {
        random_seed: 100,
        ..config
    })
    .unwrap();
    assert_ne!(a.run_id, c.run_id);
    assert_ne!(a.fingerprint(), c.fingerprint());
    // The SIR trajectory does not depend on the seed.
    assert_eq!(a.sir_series, c.sir_series);
}

#[test]
fn metadata_records_config_and_fingerprint() {
    let config = classic();
    let result = episim::run(&config).unwrap();
    assert_eq!(result.metadata.config, config);
    let digest = hex::decode(&result.metadata.config_fingerprint).unwrap();
    assert_eq!(digest.as_slice(), config.fingerprint().as_slice());
    assert!(result.metadata.finished_at >= result.metadata.started_at);
    assert_eq!(result.status, RunStatus::Complete);
}

#[test]
fn dimension_series_is_aligned_and_bounded() {
    let config = SimulationConfig {
        n_steps: 120,
        grid_size: 512,
        initial_infected: InitialInfected::Count(3),
        placement: Placement::Centered,
        sample_interval: 6,
        ..SimulationConfig::default()
    };
    let result = episim::run(&config).unwrap();
    assert_eq!(result.dimensions.len(), 120 / 6 + 1);
    for (snap, d) in result.snapshots.iter().zip(&result.dimensions) {
        assert_eq!(snap.t, d.t);
        assert!((0.0..=1.0).contains(&d.dimension));
        if snap.grid.count(CellState::Infected) == 0 {
            assert_eq!(d.dimension, 0.0);
        }
    }
}

#[test]
fn run_survives_json_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("classic.json");
    let result = Simulation::new(classic()).unwrap().run().unwrap();
    write_json(&result, &path).unwrap();
    let back = read_json(&path).unwrap();
    assert_eq!(back.fingerprint(), result.fingerprint());
    assert_eq!(back.metadata, result.metadata);
}

#[test]
fn config_file_drives_a_run() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("params.json");
    std::fs::write(
        &path,
        r#"{ "beta": 0.4, "n_steps": 20, "grid_size": 32, "initial_infected": 2, "placement": "centered" }"#,
    )
    .unwrap();
    let config = SimulationConfig::from_json_file(&path).unwrap();
    let result = episim::run(&config).unwrap();
    assert_eq!(result.sir_series.len(), 21);
    let first = &result.snapshots[0].grid;
    assert_eq!(first.get(15), Some(CellState::Infected));
    assert_eq!(first.get(16), Some(CellState::Infected));
    assert_eq!(first.count(CellState::Infected), 2);
}
