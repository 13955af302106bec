// Integration tests for the curve controller against real and in-memory stores

use heatcurve::controller::{K1_LIMITS, K2_LIMITS};
use heatcurve::persistence::StoredCoefficients;
use heatcurve::{
    CoefficientStore, Coefficients, ControllerConfig, CurveController, JsonFileStore, MemoryStore,
    PersistenceError,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::tempdir;

fn reference_config() -> ControllerConfig {
    ControllerConfig {
        target_temp: 22.0,
        learning_rate: 0.1,
        f_min: 1.4,
        f_max: 5.5,
        p_min: 1100.0,
        p_max: 4300.0,
        hysteresis: 0.2,
        window_size: 5,
    }
}

#[test]
fn test_reference_scenario_with_file_store() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("heating_params.json");
    let mut ctrl = CurveController::new(
        reference_config(),
        10.0,
        30.0,
        Box::new(JsonFileStore::new(&path)),
    )
    .unwrap();

    ctrl.update_curve(-5.0, 18.0);
    assert!((ctrl.k1() - 10.4).abs() < 1e-12);
    assert!((ctrl.k2() - 30.2).abs() < 1e-12);
    assert_eq!(ctrl.heating_frequency(-5.0, true), Some(1.4));
    assert!(path.exists());
}

#[test]
fn test_coefficients_stay_in_bounds() {
    let mut rng = StdRng::seed_from_u64(7);
    let config = ControllerConfig { learning_rate: 2.5, ..reference_config() };
    let mut ctrl = CurveController::new(config, 10.0, 30.0, Box::new(MemoryStore::new())).unwrap();
    for _ in 0..2000 {
        let indoor = rng.random_range(-150.0..150.0);
        ctrl.update_curve(rng.random_range(-40.0..40.0), indoor);
        assert!((K1_LIMITS.0..=K1_LIMITS.1).contains(&ctrl.k1()), "k1 = {}", ctrl.k1());
        assert!((K2_LIMITS.0..=K2_LIMITS.1).contains(&ctrl.k2()), "k2 = {}", ctrl.k2());
    }
}

#[test]
fn test_frequency_stays_in_pump_range() {
    let mut rng = StdRng::seed_from_u64(11);
    let config = reference_config();
    let mut ctrl = CurveController::new(
        config.clone(),
        10.0,
        30.0,
        Box::new(MemoryStore::new()),
    )
    .unwrap();
    let extremes = [f64::MAX, f64::MIN, f64::INFINITY, f64::NEG_INFINITY, -1.0e9, 1.0e9];
    for outdoor in extremes {
        let frequency = ctrl.heating_frequency(outdoor, true).unwrap();
        assert!(
            frequency >= config.f_min && frequency <= config.f_max,
            "{} -> {}",
            outdoor,
            frequency
        );
    }
    for _ in 0..1000 {
        ctrl.update_curve(0.0, rng.random_range(-30.0..60.0));
        let frequency = ctrl.heating_frequency(rng.random_range(-300.0..300.0), true).unwrap();
        assert!(frequency >= config.f_min && frequency <= config.f_max);
        assert!(ctrl.last_accepted_frequency() >= config.f_min);
        assert!(ctrl.last_accepted_frequency() <= config.f_max);
        assert!(ctrl.history_len() <= config.window_size);
    }
}

#[test]
fn test_hysteresis_holds_then_accumulates() {
    // power = 20 * (22 - outdoor), k2 = 0
    let store = MemoryStore::with(Coefficients { k1: 20.0, k2: 0.0 });
    let mut ctrl = CurveController::new(reference_config(), 10.0, 30.0, Box::new(store)).unwrap();

    // 1240 W -> 1.58 Hz, only 0.18 above the held 1.4
    assert_eq!(ctrl.raw_frequency(-40.0), 1.58);
    assert_eq!(ctrl.heating_frequency(-40.0, true), Some(1.4));
    assert_eq!(ctrl.heating_frequency(-40.0, true), Some(1.4));
    assert_eq!(ctrl.last_accepted_frequency(), 1.4);

    // 1340 W -> 1.71 Hz; mean of [1.58, 1.58, 1.71] crosses the threshold
    assert_eq!(ctrl.raw_frequency(-45.0), 1.71);
    assert_eq!(ctrl.heating_frequency(-45.0, true), Some(1.62));
    let accepted = ctrl.last_accepted_frequency();

    // mean moves to 1.645, a sub-threshold change
    assert_eq!(ctrl.heating_frequency(-45.0, true), Some(1.62));
    assert_eq!(ctrl.last_accepted_frequency(), accepted);
}

#[test]
fn test_output_rounds_stored_mean_not_scaled_mean() {
    // power = 20 * (22 - outdoor), k2 = 0
    let store = MemoryStore::with(Coefficients { k1: 20.0, k2: 0.0 });
    let config = ControllerConfig::with_target(22.0);
    let mut ctrl = CurveController::new(config, 10.0, 30.0, Box::new(store)).unwrap();

    assert_eq!(ctrl.heating_frequency(-200.0, true), Some(5.5));
    // 3980 W -> 5.09 Hz
    assert_eq!(ctrl.raw_frequency(-177.0), 5.09);
    // mean of [5.5, 5.09] is stored just below 5.295
    assert_eq!(ctrl.heating_frequency(-177.0, true), Some(5.29));
}

#[test]
fn test_window_evicts_oldest_sample() {
    let store = MemoryStore::with(Coefficients { k1: 20.0, k2: 50.0 });
    let config = ControllerConfig { window_size: 2, hysteresis: 0.0, ..reference_config() };
    let mut ctrl = CurveController::new(config, 10.0, 30.0, Box::new(store)).unwrap();
    // saturated at 5.5, then back to 1.4 once the high sample ages out
    assert_eq!(ctrl.heating_frequency(-200.0, true), Some(5.5));
    assert_eq!(ctrl.heating_frequency(22.0, true), Some(3.45));
    assert_eq!(ctrl.heating_frequency(22.0, true), Some(1.4));
    assert_eq!(ctrl.history_len(), 2);
}

#[test]
fn test_warmup_never_touches_filter_state() {
    let store = MemoryStore::with(Coefficients { k1: 20.0, k2: 50.0 });
    let mut ctrl = CurveController::new(reference_config(), 10.0, 30.0, Box::new(store)).unwrap();
    assert_eq!(ctrl.heating_frequency(-200.0, true), Some(5.5));
    for outdoor in [-200.0, 0.0, 50.0] {
        assert_eq!(ctrl.heating_frequency(outdoor, false), None);
    }
    assert_eq!(ctrl.history_len(), 1);
    assert_eq!(ctrl.last_accepted_frequency(), 5.5);
}

#[test]
fn test_persistence_round_trip_exact() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("params.json");
    let mut first = CurveController::new(
        reference_config(),
        10.0,
        30.0,
        Box::new(JsonFileStore::new(&path)),
    )
    .unwrap();
    for indoor in [18.0, 18.7, 21.3, 23.9, 19.1] {
        first.update_curve(-3.0, indoor);
    }
    let saved = first.coefficients();
    drop(first);

    let second = CurveController::new(
        reference_config(),
        1.0,
        2.0,
        Box::new(JsonFileStore::new(&path)),
    )
    .unwrap();
    assert_eq!(second.coefficients(), saved);
    assert_eq!(second.k1().to_bits(), saved.k1.to_bits());
    assert_eq!(second.k2().to_bits(), saved.k2.to_bits());
}

#[test]
fn test_memory_store_round_trip() {
    let store = MemoryStore::new();
    let mut first = CurveController::new(
        reference_config(),
        10.0,
        30.0,
        Box::new(store.clone()),
    )
    .unwrap();
    first.update_curve(0.0, 20.5);
    let second = CurveController::new(reference_config(), 0.0, 0.0, Box::new(store)).unwrap();
    assert_eq!(second.coefficients(), first.coefficients());
}

#[test]
fn test_absent_store_uses_defaults() {
    let dir = tempdir().unwrap();
    let ctrl = CurveController::new(
        reference_config(),
        12.5,
        35.0,
        Box::new(JsonFileStore::new(dir.path().join("missing.json"))),
    )
    .unwrap();
    assert_eq!(ctrl.coefficients(), Coefficients { k1: 12.5, k2: 35.0 });
    assert_eq!(ctrl.last_accepted_frequency(), 1.4);
    assert_eq!(ctrl.history_len(), 0);

    let ctrl = CurveController::new(
        reference_config(),
        3.0,
        4.0,
        Box::new(MemoryStore::new()),
    )
    .unwrap();
    assert_eq!(ctrl.coefficients(), Coefficients { k1: 3.0, k2: 4.0 });
}

#[test]
fn test_corrupt_file_falls_back_to_defaults() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("params.json");
    std::fs::write(&path, "k1=10").unwrap();
    let mut ctrl = CurveController::new(
        reference_config(),
        9.0,
        29.0,
        Box::new(JsonFileStore::new(&path)),
    )
    .unwrap();
    assert_eq!(ctrl.coefficients(), Coefficients { k1: 9.0, k2: 29.0 });
    // next save repairs the file
    assert!(ctrl.update_curve(0.0, 22.0).persisted());
    let repaired = JsonFileStore::new(&path).load().unwrap().unwrap();
    assert_eq!(repaired, StoredCoefficients { k1: Some(9.0), k2: Some(29.0) });
}

struct ReadOnlyStore;

impl CoefficientStore for ReadOnlyStore {
    fn load(&self) -> Result<Option<StoredCoefficients>, PersistenceError> {
        Ok(Some(StoredCoefficients { k1: Some(15.0), k2: None }))
    }

    fn save(&self, _coefficients: &Coefficients) -> Result<(), PersistenceError> {
        Err(PersistenceError::Write {
            path: "/readonly/params.json".into(),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        })
    }
}

#[test]
fn test_save_failure_keeps_controlling() {
    let mut ctrl = CurveController::new(
        reference_config(),
        10.0,
        30.0,
        Box::new(ReadOnlyStore),
    )
    .unwrap();
    // partial record: k1 from the store, k2 from the default
    assert_eq!(ctrl.coefficients(), Coefficients { k1: 15.0, k2: 30.0 });
    for _ in 0..3 {
        let update = ctrl.update_curve(-10.0, 17.0);
        assert!(!update.persisted());
        assert!(ctrl.heating_frequency(-10.0, true).is_some());
    }
    assert!((ctrl.k1() - 16.5).abs() < 1e-9);
    assert!((ctrl.k2() - 30.75).abs() < 1e-9);
}
