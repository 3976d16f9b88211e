use std::fs;

mod common;
use common::{temp_path, two_groups, two_groups_config, UnreachableDistance};
use traj_cluster::engine::run_clustering;
use traj_cluster::error::ClusterError;
use traj_cluster::matrix::DistanceMatrix;
use traj_cluster::streaming::StreamEmitter;

#[test]
fn saved_distances_replace_recomputation() {
    let path = temp_path("pairs.bin");
    let mut cfg = two_groups_config();
    cfg.save_pairdist = Some(path.to_string_lossy().to_string());
    let computed = run_clustering(&cfg, &two_groups(), StreamEmitter::disabled()).expect("run");

    let saved = DistanceMatrix::load(&path, 10, None).expect("load");
    assert_eq!(saved.indices(), (0..10).collect::<Vec<_>>().as_slice());
    assert_eq!(saved.distance(0, 3).unwrap(), 0.5);
    assert_eq!(saved.distance(4, 9).unwrap(), 5.0);

    let mut cfg = two_groups_config();
    cfg.load_pairdist = Some(path.to_string_lossy().to_string());
    let loaded = run_clustering(&cfg, &UnreachableDistance(10), StreamEmitter::disabled())
        .expect("run from saved distances");
    assert_eq!(loaded.output, computed.output);
    let _ = fs::remove_file(&path);
}

#[test]
fn saved_distances_must_match_the_sieve() {
    let path = temp_path("pairs_sieve.bin");
    let mut cfg = two_groups_config();
    cfg.save_pairdist = Some(path.to_string_lossy().to_string());
    run_clustering(&cfg, &two_groups(), StreamEmitter::disabled()).expect("run");

    let mut cfg = two_groups_config();
    cfg.sieve = 2;
    cfg.load_pairdist = Some(path.to_string_lossy().to_string());
    let err = run_clustering(&cfg, &two_groups(), StreamEmitter::disabled()).unwrap_err();
    assert!(matches!(err, ClusterError::Config(_)));
    let _ = fs::remove_file(&path);
}

#[test]
fn truncated_file_is_rejected() {
    let path = temp_path("pairs_short.bin");
    let mut cfg = two_groups_config();
    cfg.save_pairdist = Some(path.to_string_lossy().to_string());
    run_clustering(&cfg, &two_groups(), StreamEmitter::disabled()).expect("run");
    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 4]).unwrap();
    assert!(DistanceMatrix::load(&path, 10, None).is_err());
    let _ = fs::remove_file(&path);
}

#[test]
fn loading_respects_memory_budget() {
    let path = temp_path("pairs_budget.bin");
    let mut cfg = two_groups_config();
    cfg.save_pairdist = Some(path.to_string_lossy().to_string());
    run_clustering(&cfg, &two_groups(), StreamEmitter::disabled()).expect("run");
    let err = DistanceMatrix::load(&path, 10, Some(16)).unwrap_err();
    assert!(matches!(err, ClusterError::Capacity(_)));
    let _ = fs::remove_file(&path);
}

#[test]
fn distances_from_a_longer_trajectory_are_rejected() {
    let path = temp_path("pairs_longer.bin");
    let mut cfg = two_groups_config();
    cfg.save_pairdist = Some(path.to_string_lossy().to_string());
    run_clustering(&cfg, &two_groups(), StreamEmitter::disabled()).expect("run");

    let mut cfg = two_groups_config();
    cfg.load_pairdist = Some(path.to_string_lossy().to_string());
    let err = run_clustering(&cfg, &UnreachableDistance(5), StreamEmitter::disabled())
        .unwrap_err();
    assert!(matches!(err, ClusterError::Parse(_)));
    let _ = fs::remove_file(&path);
}
