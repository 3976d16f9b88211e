//! Density-based clustering (DBSCAN) over the sieved frames.
//!
//! A frame is core when at least `min_points` other frames lie strictly
//! closer than `epsilon`. Clusters grow breadth-first from the first
//! unvisited core frame in index order; neighbours are visited in increasing
//! frame order and a border frame stays with the first cluster that reaches
//! it.

use std::collections::VecDeque;

use rayon::prelude::*;
use tracing::debug;

use crate::algorithm::ClusteringAlgorithm;
use crate::cluster::{ClusterHandle, FrameState};
use crate::error::{ClusterError, ClusterResult};
use crate::list::ClusterList;
use crate::matrix::DistanceMatrix;
use crate::metric::FrameDistance;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dbscan {
    min_points: usize,
    epsilon: f64,
    sieve_to_centroid: bool,
}

impl Dbscan {
    pub fn new(min_points: usize, epsilon: f64) -> ClusterResult<Self> {
        if min_points < 1 {
            return Err(ClusterError::Config("DBSCAN min_points must be >= 1".into()));
        }
        if epsilon.is_nan() {
            return Err(ClusterError::Config("DBSCAN epsilon must be a number".into()));
        }
        Ok(Self {
            min_points,
            epsilon,
            sieve_to_centroid: false,
        })
    }

    /// Place sieved frames by distance to cluster centroids instead of to the
    /// nearest selected frame.
    pub fn with_sieve_to_centroid(mut self, enabled: bool) -> Self {
        self.sieve_to_centroid = enabled;
        self
    }

    pub fn min_points(&self) -> usize {
        self.min_points
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn sieve_to_centroid(&self) -> bool {
        self.sieve_to_centroid
    }

    /// Compared at the matrix's `f32` precision so that distances read back
    /// from the matrix and distances computed on demand agree at the boundary.
    fn within_epsilon(&self, d: f64) -> bool {
        (d as f32) < self.epsilon as f32
    }

    /// Matrix positions strictly within epsilon of `pos`, excluding `pos`.
    fn region_query(&self, matrix: &DistanceMatrix, pos: usize, out: &mut Vec<usize>) {
        out.clear();
        for other in 0..matrix.len() {
            if other != pos && self.within_epsilon(matrix.distance_at(pos, other)) {
                out.push(other);
            }
        }
    }
}

impl ClusteringAlgorithm for Dbscan {
    fn name(&self) -> &'static str {
        "dbscan"
    }

    fn info(&self) -> String {
        let mut info = format!(
            "DBSCAN: min_points {}, epsilon {:.4}",
            self.min_points, self.epsilon
        );
        if self.sieve_to_centroid {
            info.push_str(", sieved frames assigned by closeness to centroid");
        }
        info
    }

    fn cluster(&self, list: &mut ClusterList) -> ClusterResult<()> {
        let n = list.matrix().len();
        let indices = list.matrix().indices().to_vec();
        let mut visited = vec![false; n];
        // queue membership, stamped with the cluster being expanded
        let mut queued = vec![0usize; n];
        let mut stamp = 0usize;
        let mut neigh = Vec::new();
        let mut reach = Vec::new();
        let mut queue = VecDeque::new();

        for seed in 0..n {
            if visited[seed] {
                continue;
            }
            visited[seed] = true;
            self.region_query(list.matrix(), seed, &mut neigh);
            if neigh.len() < self.min_points {
                list.mark_noise(indices[seed])?;
                continue;
            }

            let handle = list.add_cluster([indices[seed]])?;
            stamp += 1;
            queued[seed] = stamp;
            queue.clear();
            for &p in neigh.iter() {
                queued[p] = stamp;
                queue.push_back(p);
            }
            while let Some(p) = queue.pop_front() {
                if !visited[p] {
                    visited[p] = true;
                    self.region_query(list.matrix(), p, &mut reach);
                    if reach.len() >= self.min_points {
                        for &q in reach.iter() {
                            if queued[q] != stamp {
                                queued[q] = stamp;
                                queue.push_back(q);
                            }
                        }
                    }
                }
                let frame = indices[p];
                match list.state(frame)? {
                    FrameState::Unvisited | FrameState::Noise => list.add_member(handle, frame)?,
                    FrameState::Assigned(_) => {}
                }
            }
            debug!(
                handle = handle.index(),
                population = list.cluster(handle).map(|c| c.population()).unwrap_or(0),
                "dbscan cluster expanded"
            );
        }
        Ok(())
    }

    fn add_sieved_frames(
        &self,
        list: &mut ClusterList,
        dist: &dyn FrameDistance,
    ) -> ClusterResult<()> {
        if !self.sieve_to_centroid || !list.sieve().is_sieved() {
            return list.assign_remainder(dist);
        }
        list.compute_centroids()?;
        let centroids: Vec<(ClusterHandle, usize)> = list
            .clusters()
            .filter_map(|(handle, c)| c.centroid().map(|frame| (handle, frame)))
            .collect();
        let unselected: Vec<usize> = list.sieve().unselected().collect();
        let picks = unselected
            .par_iter()
            .map(|&frame| -> ClusterResult<(usize, Option<ClusterHandle>)> {
                let mut best = None;
                let mut best_dist = f64::INFINITY;
                for &(handle, centroid) in centroids.iter() {
                    let d = dist.distance(frame, centroid)?;
                    if d < best_dist {
                        best_dist = d;
                        best = Some(handle);
                    }
                }
                Ok((frame, best.filter(|_| self.within_epsilon(best_dist))))
            })
            .collect::<ClusterResult<Vec<_>>>()?;
        for (frame, pick) in picks {
            match pick {
                Some(handle) => list.add_member(handle, frame)?,
                None => list.mark_noise(frame)?,
            }
        }
        Ok(())
    }
}

/// Distance from each frame in the matrix to its `k`-th nearest neighbour,
/// sorted in decreasing order. The knee of this curve is the usual guide for
/// choosing epsilon with `min_points = k`.
pub fn k_distances(matrix: &DistanceMatrix, k: usize) -> ClusterResult<Vec<f64>> {
    if k < 1 {
        return Err(ClusterError::Config("kdist k must be >= 1".into()));
    }
    let n = matrix.len();
    if k >= n {
        return Err(ClusterError::Config(format!(
            "kdist k={k} needs more than {n} clustered frames"
        )));
    }
    let mut out: Vec<f64> = (0..n)
        .into_par_iter()
        .map(|pos| {
            let mut row: Vec<f64> = (0..n)
                .filter(|&other| other != pos)
                .map(|other| matrix.distance_at(pos, other))
                .collect();
            row.select_nth_unstable_by(k - 1, |a, b| a.total_cmp(b));
            row[k - 1]
        })
        .collect();
    out.sort_by(|a, b| b.total_cmp(a));
    Ok(out)
}
