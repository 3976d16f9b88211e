#![forbid(unsafe_code)]

pub mod algorithm;
pub mod cluster;
pub mod config;
pub mod dbscan;
pub mod engine;
pub mod error;
pub mod list;
pub mod matrix;
pub mod metric;
pub mod output;
pub mod sieve;
pub mod streaming;

pub use algorithm::ClusteringAlgorithm;
pub use cluster::{CentroidCost, Cluster, ClusterHandle, FrameState, NOISE_ID};
pub use config::{load_config, ClusterConfig, OutputSpec};
pub use dbscan::{k_distances, Dbscan};
pub use engine::{run_algorithm, run_clustering, ClusterRun, ClusteringOutput};
pub use error::{ClusterError, ClusterResult};
pub use list::ClusterList;
pub use matrix::{DistanceMatrix, MatrixStats};
pub use metric::{FrameDistance, FrameMetric, MetricDistance, MetricKind};
pub use sieve::{SieveMode, SieveSelection};
pub use streaming::{ClusterPhase, StreamEmitter, StreamEvent};
