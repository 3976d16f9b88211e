use std::fs;

mod common;
use common::{temp_path, write_text};
use traj_cluster::cluster::CentroidCost;
use traj_cluster::config::{load_config, ClusterConfig, DEFAULT_SIEVE_SEED};
use traj_cluster::error::ClusterError;
use traj_cluster::metric::MetricKind;
use traj_cluster::sieve::SieveMode;

#[test]
fn json_config_fills_defaults() {
    let cfg: ClusterConfig =
        serde_json::from_value(serde_json::json!({"min_points": 4, "epsilon": 2.5}))
            .expect("config");
    assert_eq!(cfg.min_points, 4);
    assert_eq!(cfg.sieve, 1);
    assert!(!cfg.random_sieve);
    assert!(!cfg.sieve_to_centroid);
    assert_eq!(cfg.centroid_cost, CentroidCost::Sum);
    assert_eq!(cfg.metric, MetricKind::Rmsd);
    assert!(cfg.output.series.is_none());
    assert_eq!(cfg.sieve_mode(), SieveMode::Regular);
}

#[test]
fn normalized_sets_random_sieve_seed() {
    let mut cfg = ClusterConfig::new(3, 1.0);
    cfg.sieve = 5;
    cfg.random_sieve = true;
    let norm = cfg.normalized().expect("normalized config");
    assert_eq!(norm.sieve_seed, Some(DEFAULT_SIEVE_SEED));
    assert_eq!(
        norm.sieve_mode(),
        SieveMode::Random {
            seed: DEFAULT_SIEVE_SEED
        }
    );

    cfg.sieve_seed = Some(42);
    let norm = cfg.normalized().expect("normalized config");
    assert_eq!(norm.sieve_mode(), SieveMode::Random { seed: 42 });
}

#[test]
fn invalid_settings_are_config_errors() {
    let base = ClusterConfig::new(3, 1.0);
    let mut cases = Vec::new();

    let mut cfg = base.clone();
    cfg.min_points = 0;
    cases.push(cfg);
    let mut cfg = base.clone();
    cfg.epsilon = f64::NAN;
    cases.push(cfg);
    let mut cfg = base.clone();
    cfg.sieve = 0;
    cases.push(cfg);
    let mut cfg = base.clone();
    cfg.threads = Some(0);
    cases.push(cfg);
    let mut cfg = base.clone();
    cfg.memory_budget_bytes = Some(0);
    cases.push(cfg);
    let mut cfg = base.clone();
    cfg.output.kdist = Some("kdist.dat".into());
    cases.push(cfg);
    let mut cfg = base.clone();
    cfg.load_pairdist = Some("pairs.bin".into());
    cfg.save_pairdist = Some("pairs.bin".into());
    cases.push(cfg);

    for cfg in cases {
        let err = cfg.validate().unwrap_err();
        assert!(matches!(err, ClusterError::Config(_)), "{err}");
    }
}

#[test]
fn non_positive_epsilon_is_accepted() {
    let cfg = ClusterConfig::new(1, 0.0);
    cfg.validate().expect("zero epsilon");
    let cfg = ClusterConfig::new(1, -1.0);
    cfg.validate().expect("negative epsilon");
}

#[test]
fn yaml_config_loads() {
    let path = temp_path("cluster.yaml");
    write_text(
        &path,
        "min_points: 5\nepsilon: 1.25\nsieve: 4\nrandom_sieve: true\ncentroid_cost: max\nmetric: rmsd_nofit\noutput:\n  series: clusters.dat\n",
    );
    let cfg = load_config(&path).expect("yaml config");
    assert_eq!(cfg.min_points, 5);
    assert!((cfg.epsilon - 1.25).abs() < 1e-12);
    assert_eq!(cfg.sieve, 4);
    assert!(cfg.random_sieve);
    assert_eq!(cfg.centroid_cost, CentroidCost::Max);
    assert_eq!(cfg.metric, MetricKind::RmsdNofit);
    assert_eq!(cfg.output.series.as_deref(), Some("clusters.dat"));
    let _ = fs::remove_file(&path);
}

#[test]
fn malformed_json_is_a_parse_error() {
    let path = temp_path("broken.json");
    write_text(&path, "{\"min_points\": 3,");
    let err = load_config(&path).unwrap_err();
    assert!(matches!(err, ClusterError::Parse(_)));
    let _ = fs::remove_file(&path);
}

#[test]
fn missing_config_is_an_io_error() {
    let path = temp_path("missing.json");
    let err = load_config(&path).unwrap_err();
    assert!(matches!(err, ClusterError::Io(_)));
}
