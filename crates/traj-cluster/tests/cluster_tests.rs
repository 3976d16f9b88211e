mod common;
use common::{two_bands, two_groups, two_groups_config, LineDistance, UnreachableDistance};
use traj_cluster::algorithm::ClusteringAlgorithm;
use traj_cluster::cluster::{FrameState, NOISE_ID};
use traj_cluster::dbscan::Dbscan;
use traj_cluster::engine::run_clustering;
use traj_cluster::error::ClusterError;
use traj_cluster::list::ClusterList;
use traj_cluster::matrix::DistanceMatrix;
use traj_cluster::sieve::{SieveMode, SieveSelection};
use traj_cluster::streaming::StreamEmitter;
use traj_cluster::CentroidCost;

#[test]
fn two_groups_give_two_clusters_and_noise() {
    let run = run_clustering(&two_groups_config(), &two_groups(), StreamEmitter::disabled())
        .expect("run");
    assert_eq!(run.output.n_clusters(), 2);
    assert_eq!(run.output.sizes, vec![4, 4]);
    assert_eq!(run.output.labels, vec![0, 0, 0, 0, -1, -1, 1, 1, 1, 1]);
    assert_eq!(run.list.noise_frames(), vec![4, 5]);
    assert_eq!(run.output.centroids, vec![Some(0), Some(6)]);
}

#[test]
fn tiny_epsilon_leaves_everything_noise() {
    let mut cfg = two_groups_config();
    cfg.epsilon = 0.01;
    let run = run_clustering(&cfg, &two_groups(), StreamEmitter::disabled()).expect("run");
    assert_eq!(run.output.n_clusters(), 0);
    assert!(run.output.labels.iter().all(|&id| id == NOISE_ID));
    assert_eq!(run.list.noise_frames().len(), 10);
}

#[test]
fn zero_min_points_is_rejected_before_computation() {
    let mut cfg = two_groups_config();
    cfg.min_points = 0;
    let err = run_clustering(&cfg, &UnreachableDistance(10), StreamEmitter::disabled())
        .unwrap_err();
    assert!(matches!(err, ClusterError::Config(_)));
    assert_eq!(err.code(), "config");
}

#[test]
fn sieved_run_covers_every_frame() {
    let mut cfg = two_groups_config();
    cfg.min_points = 1;
    cfg.epsilon = 1.5;
    cfg.sieve = 10;
    let run = run_clustering(&cfg, &two_bands(), StreamEmitter::disabled()).expect("run");
    assert_eq!(run.list.sieve().selected().len(), 10);
    assert_eq!(run.output.labels.len(), 100);
    assert_eq!(run.output.sizes, vec![50, 50]);
    for frame in 0..100 {
        let expected = if frame < 50 { 0 } else { 1 };
        assert_eq!(run.output.labels[frame], expected, "frame {frame}");
    }
    run.list.check_coverage().expect("coverage");
}

#[test]
fn selected_frames_keep_their_cluster_through_finalize() {
    let dist = two_bands();
    let sieve = SieveSelection::select(100, 10, SieveMode::Regular).unwrap();
    let matrix = DistanceMatrix::compute(&dist, sieve.selected().to_vec(), None).unwrap();
    let mut list = ClusterList::new(matrix, sieve, CentroidCost::Sum).unwrap();
    let dbscan = Dbscan::new(1, 1.5).unwrap();
    dbscan.cluster(&mut list).unwrap();

    let selected: Vec<usize> = list.sieve().selected().to_vec();
    let before: Vec<FrameState> = selected.iter().map(|&f| list.state(f).unwrap()).collect();

    dbscan.add_sieved_frames(&mut list, &dist).unwrap();
    list.finalize().unwrap();

    for (&frame, state) in selected.iter().zip(before.iter()) {
        assert_eq!(list.state(frame).unwrap(), *state);
        match state {
            FrameState::Assigned(handle) => {
                assert_eq!(
                    list.cluster_id_for(frame).unwrap(),
                    list.id_for_handle(*handle).unwrap()
                );
            }
            _ => panic!("selected frame {frame} was not clustered"),
        }
    }
    assert!(list.labels().unwrap().iter().all(|&id| id >= 0));
}

#[test]
fn sieve_to_centroid_drops_frames_far_from_centroids() {
    let mut cfg = two_groups_config();
    cfg.min_points = 1;
    cfg.epsilon = 1.5;
    cfg.sieve = 10;
    let nearest = run_clustering(&cfg, &two_bands(), StreamEmitter::disabled()).expect("run");
    cfg.sieve_to_centroid = true;
    let central = run_clustering(&cfg, &two_bands(), StreamEmitter::disabled()).expect("run");

    assert_eq!(nearest.output.labels[1], 0);
    assert_eq!(central.output.labels[1], NOISE_ID);
    assert_eq!(central.output.labels[45], NOISE_ID);
    assert_eq!(central.output.labels[15], central.output.labels[0]);
    assert_eq!(central.output.labels[75], central.output.labels[90]);
    assert_eq!(central.output.centroids.len(), 2);
    for frame in (10..50).step_by(10) {
        assert_eq!(central.output.labels[frame], central.output.labels[0]);
    }
    for frame in (60..100).step_by(10) {
        assert_eq!(central.output.labels[frame], central.output.labels[50]);
    }
    assert_ne!(central.output.labels[0], central.output.labels[50]);
}

#[test]
fn random_sieve_is_reproducible_and_covers_all_frames() {
    let mut cfg = two_groups_config();
    cfg.min_points = 1;
    cfg.epsilon = 1.5;
    cfg.sieve = 10;
    cfg.random_sieve = true;
    let first = run_clustering(&cfg, &two_bands(), StreamEmitter::disabled()).expect("run");
    let second = run_clustering(&cfg, &two_bands(), StreamEmitter::disabled()).expect("run");
    assert_eq!(first.output, second.output);
    let selected = first.list.sieve().selected();
    assert_eq!(selected.len(), 10);
    assert_eq!(selected[0], 0);
    assert!(selected.windows(2).all(|w| w[0] < w[1]));
    assert_eq!(first.output.labels.len(), 100);
    first.list.check_coverage().expect("coverage");
}

#[test]
fn finalize_twice_gives_same_labels() {
    let dist = two_groups();
    let sieve = SieveSelection::full(10);
    let matrix = DistanceMatrix::compute(&dist, sieve.selected().to_vec(), None).unwrap();
    let mut list = ClusterList::new(matrix, sieve, CentroidCost::Sum).unwrap();
    let dbscan = Dbscan::new(3, 1.0).unwrap();
    dbscan.cluster(&mut list).unwrap();
    dbscan.add_sieved_frames(&mut list, &dist).unwrap();
    list.finalize().unwrap();
    let first = list.labels().unwrap().to_vec();
    list.finalize().unwrap();
    assert_eq!(list.labels().unwrap(), first.as_slice());
}

#[test]
fn larger_cluster_gets_lower_id() {
    // three frames far right, five frames far left; the small group comes first
    let positions = vec![0.0, 0.1, 0.2, 10.0, 10.1, 10.2, 10.3, 10.4];
    let cfg = traj_cluster::ClusterConfig::new(1, 0.5);
    let run = run_clustering(&cfg, &LineDistance(positions), StreamEmitter::disabled())
        .expect("run");
    assert_eq!(run.output.sizes, vec![5, 3]);
    assert_eq!(run.output.labels, vec![1, 1, 1, 0, 0, 0, 0, 0]);
}

#[test]
fn cluster_ids_are_unavailable_before_finalize() {
    let dist = two_groups();
    let sieve = SieveSelection::full(10);
    let matrix = DistanceMatrix::compute(&dist, sieve.selected().to_vec(), None).unwrap();
    let mut list = ClusterList::new(matrix, sieve, CentroidCost::Sum).unwrap();
    Dbscan::new(3, 1.0).unwrap().cluster(&mut list).unwrap();
    assert!(matches!(list.cluster_id_for(0), Err(ClusterError::NotFinalized(_))));
}
