//! Run orchestration: sieve, pairwise distances, clustering, sieve restore,
//! finalize.

use std::path::Path;
use std::time::Instant;

use rayon::ThreadPoolBuilder;
use tracing::{debug, info};

use crate::algorithm::ClusteringAlgorithm;
use crate::config::ClusterConfig;
use crate::dbscan::k_distances;
use crate::error::{ClusterError, ClusterResult};
use crate::list::ClusterList;
use crate::matrix::DistanceMatrix;
use crate::metric::FrameDistance;
use crate::sieve::SieveSelection;
use crate::streaming::{duration_ms, ClusterPhase, StreamEmitter, StreamEvent};

/// Per-frame labels and per-cluster summary of a finalized run.
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringOutput {
    /// Cluster ID for every frame, `-1` for noise.
    pub labels: Vec<i32>,
    /// Centroid frame, indexed by cluster ID.
    pub centroids: Vec<Option<usize>>,
    /// Population, indexed by cluster ID.
    pub sizes: Vec<usize>,
    pub method: String,
    pub n_frames: usize,
}

impl ClusteringOutput {
    pub fn n_clusters(&self) -> usize {
        self.sizes.len()
    }

    pub fn noise_frames(&self) -> usize {
        self.labels.iter().filter(|&&id| id < 0).count()
    }

    fn from_list(list: &ClusterList, method: &str) -> ClusterResult<Self> {
        let clusters = list.ordered_clusters()?;
        Ok(Self {
            labels: list.labels()?.to_vec(),
            centroids: clusters.iter().map(|c| c.centroid()).collect(),
            sizes: clusters.iter().map(|c| c.population()).collect(),
            method: method.to_string(),
            n_frames: list.total_frames(),
        })
    }
}

/// A finished run: the finalized list, its flattened output, the optional
/// k-distance curve `(k, values)`, and the algorithm's parameter summary.
#[derive(Debug)]
pub struct ClusterRun {
    pub list: ClusterList,
    pub output: ClusteringOutput,
    pub kdist: Option<(usize, Vec<f64>)>,
    pub info: String,
}

/// Run DBSCAN as configured by `cfg` over the frames of `dist`.
pub fn run_clustering<D>(
    cfg: &ClusterConfig,
    dist: &D,
    emitter: StreamEmitter,
) -> ClusterResult<ClusterRun>
where
    D: FrameDistance,
{
    let result = cfg
        .normalized()
        .and_then(|cfg| {
            let algorithm = cfg.dbscan()?;
            run_algorithm(&cfg, &algorithm, dist, emitter)
        });
    if let Err(err) = &result {
        emitter.emit_error(err.code(), &err.to_string());
    }
    result
}

/// Run any clustering algorithm through the shared pipeline.
///
/// `cfg` is expected to be normalized already. When `cfg.threads` is set the
/// whole pipeline runs inside a dedicated rayon pool of that size.
pub fn run_algorithm<A, D>(
    cfg: &ClusterConfig,
    algorithm: &A,
    dist: &D,
    emitter: StreamEmitter,
) -> ClusterResult<ClusterRun>
where
    A: ClusteringAlgorithm + Sync + ?Sized,
    D: FrameDistance,
{
    match cfg.threads {
        Some(threads) => {
            let pool = ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| ClusterError::Config(format!("thread pool: {e}")))?;
            pool.install(|| pipeline(cfg, algorithm, dist, emitter))
        }
        None => pipeline(cfg, algorithm, dist, emitter),
    }
}

fn pipeline<A, D>(
    cfg: &ClusterConfig,
    algorithm: &A,
    dist: &D,
    emitter: StreamEmitter,
) -> ClusterResult<ClusterRun>
where
    A: ClusteringAlgorithm + ?Sized,
    D: FrameDistance,
{
    let started = Instant::now();
    let total = dist.n_frames();
    emitter.emit(&StreamEvent::ClusterStarted {
        method: algorithm.name().to_string(),
        total_frames: total,
        sieve: cfg.sieve,
        min_points: cfg.min_points,
        epsilon: cfg.epsilon,
    });
    info!(
        method = algorithm.name(),
        total_frames = total,
        sieve = cfg.sieve,
        "clustering started"
    );

    let sieve = phase(emitter, ClusterPhase::Sieve, Some(total), || {
        SieveSelection::select(total, cfg.sieve, cfg.sieve_mode())
    })?;
    info!("{sieve}");

    let n_selected = sieve.selected().len();
    let matrix = phase(
        emitter,
        ClusterPhase::DistanceMatrix,
        Some(n_selected.saturating_mul(n_selected.saturating_sub(1)) / 2),
        || build_matrix(cfg, dist, &sieve),
    )?;
    if let Some(path) = &cfg.save_pairdist {
        matrix.save(Path::new(path))?;
        info!(path = %path, "pairwise distances saved");
    }

    let kdist = match cfg.kdist {
        Some(k) => Some((k, k_distances(&matrix, k)?)),
        None => None,
    };

    let mut list = ClusterList::new(matrix, sieve, cfg.centroid_cost)?;
    phase(emitter, ClusterPhase::Clustering, Some(n_selected), || {
        algorithm.cluster(&mut list)
    })?;
    let remainder = total - n_selected;
    phase(emitter, ClusterPhase::SieveRestore, Some(remainder), || {
        algorithm.add_sieved_frames(&mut list, dist)
    })?;
    phase(emitter, ClusterPhase::Finalize, None, || list.finalize())?;

    let output = ClusteringOutput::from_list(&list, algorithm.name())?;
    let elapsed = started.elapsed();
    emitter.emit(&StreamEvent::ClusterComplete {
        total_frames: output.n_frames,
        n_clusters: output.n_clusters(),
        noise_frames: output.noise_frames(),
        largest_cluster: output.sizes.first().copied(),
        elapsed_ms: duration_ms(elapsed),
    });
    info!(
        n_clusters = output.n_clusters(),
        noise_frames = output.noise_frames(),
        elapsed_ms = duration_ms(elapsed),
        "clustering complete"
    );
    Ok(ClusterRun {
        list,
        output,
        kdist,
        info: algorithm.info(),
    })
}

fn build_matrix<D>(
    cfg: &ClusterConfig,
    dist: &D,
    sieve: &SieveSelection,
) -> ClusterResult<DistanceMatrix>
where
    D: FrameDistance,
{
    match &cfg.load_pairdist {
        Some(path) => {
            let matrix = DistanceMatrix::load(
                Path::new(path),
                sieve.total_frames(),
                cfg.memory_budget_bytes,
            )?;
            if matrix.indices() != sieve.selected() {
                return Err(ClusterError::Config(format!(
                    "pairwise distances in {path} cover {} frames, which do not match the {} sieved frames",
                    matrix.len(),
                    sieve.selected().len()
                )));
            }
            info!(path = %path, frames = matrix.len(), "pairwise distances loaded");
            Ok(matrix)
        }
        None => {
            DistanceMatrix::check_capacity(sieve.selected().len(), cfg.memory_budget_bytes)?;
            DistanceMatrix::compute(dist, sieve.selected().to_vec(), cfg.memory_budget_bytes)
        }
    }
}

fn phase<T>(
    emitter: StreamEmitter,
    phase: ClusterPhase,
    work_items: Option<usize>,
    job: impl FnOnce() -> ClusterResult<T>,
) -> ClusterResult<T> {
    emitter.emit_phase_started(phase, work_items);
    let started = Instant::now();
    let out = job()?;
    let elapsed = started.elapsed();
    emitter.emit_phase_complete(phase, elapsed);
    debug!(phase = phase.as_str(), elapsed_ms = duration_ms(elapsed), "phase complete");
    Ok(out)
}
