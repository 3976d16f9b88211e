//! Shared clustering framework: cluster bookkeeping, centroids, sieve
//! reintegration, population ordering.

use tracing::debug;

use crate::cluster::{CentroidCost, Cluster, ClusterHandle, FrameState, NOISE_ID};
use crate::error::{ClusterError, ClusterResult};
use crate::matrix::DistanceMatrix;
use crate::metric::FrameDistance;
use crate::sieve::SieveSelection;

/// Clusters of one run together with the matrix and sieve they came from.
///
/// Algorithms populate the list through [`add_cluster`](Self::add_cluster),
/// [`add_member`](Self::add_member), [`merge`](Self::merge) and
/// [`mark_noise`](Self::mark_noise). [`finalize`](Self::finalize) folds sieved
/// frames back in and numbers clusters by descending population; cluster IDs
/// can only be read after that.
#[derive(Debug)]
pub struct ClusterList {
    matrix: DistanceMatrix,
    sieve: SieveSelection,
    centroid_cost: CentroidCost,
    clusters: Vec<Option<Cluster>>,
    states: Vec<FrameState>,
    order: Option<Vec<ClusterHandle>>,
    labels: Option<Vec<i32>>,
}

impl ClusterList {
    pub fn new(
        matrix: DistanceMatrix,
        sieve: SieveSelection,
        centroid_cost: CentroidCost,
    ) -> ClusterResult<Self> {
        if matrix.indices() != sieve.selected() {
            return Err(ClusterError::Config(format!(
                "distance matrix covers {} frames but the sieve selected {}",
                matrix.len(),
                sieve.selected().len()
            )));
        }
        let total = sieve.total_frames();
        Ok(Self {
            matrix,
            sieve,
            centroid_cost,
            clusters: Vec::new(),
            states: vec![FrameState::Unvisited; total],
            order: None,
            labels: None,
        })
    }

    pub fn total_frames(&self) -> usize {
        self.states.len()
    }

    pub fn matrix(&self) -> &DistanceMatrix {
        &self.matrix
    }

    pub fn sieve(&self) -> &SieveSelection {
        &self.sieve
    }

    pub fn centroid_cost(&self) -> CentroidCost {
        self.centroid_cost
    }

    /// Compute the sieve's nearest-selected-frame mapping.
    pub fn assign_remainder<D>(&mut self, dist: &D) -> ClusterResult<()>
    where
        D: FrameDistance + ?Sized,
    {
        self.sieve.assign_remainder(dist)
    }

    fn check_frame(&self, frame: usize) -> ClusterResult<()> {
        if frame >= self.states.len() {
            return Err(ClusterError::OutOfRange(format!(
                "frame {frame} outside trajectory of {} frames",
                self.states.len()
            )));
        }
        Ok(())
    }

    fn invalidate(&mut self) {
        self.order = None;
        self.labels = None;
    }

    pub fn state(&self, frame: usize) -> ClusterResult<FrameState> {
        self.check_frame(frame)?;
        Ok(self.states[frame])
    }

    pub fn cluster(&self, handle: ClusterHandle) -> Option<&Cluster> {
        self.clusters.get(handle.0).and_then(|c| c.as_ref())
    }

    /// Live clusters in handle order.
    pub fn clusters(&self) -> impl Iterator<Item = (ClusterHandle, &Cluster)> + '_ {
        self.clusters
            .iter()
            .enumerate()
            .filter_map(|(idx, c)| c.as_ref().map(|c| (ClusterHandle(idx), c)))
    }

    pub fn n_clusters(&self) -> usize {
        self.clusters.iter().filter(|c| c.is_some()).count()
    }

    fn live_mut(&mut self, handle: ClusterHandle) -> ClusterResult<&mut Cluster> {
        self.clusters
            .get_mut(handle.0)
            .and_then(|c| c.as_mut())
            .ok_or_else(|| ClusterError::OutOfRange(format!("no cluster with handle {}", handle.0)))
    }

    /// Create a cluster seeded with `members`.
    ///
    /// Fails without modifying the list if `members` is empty or any member
    /// already belongs to another cluster. Frames currently marked noise are
    /// claimed.
    pub fn add_cluster<I>(&mut self, members: I) -> ClusterResult<ClusterHandle>
    where
        I: IntoIterator<Item = usize>,
    {
        let members: Vec<usize> = members.into_iter().collect();
        if members.is_empty() {
            return Err(ClusterError::Config(
                "a cluster must be seeded with at least one frame".into(),
            ));
        }
        for &frame in members.iter() {
            self.check_frame(frame)?;
            if let FrameState::Assigned(owner) = self.states[frame] {
                return Err(ClusterError::Conflict(format!(
                    "frame {frame} already belongs to cluster handle {}",
                    owner.0
                )));
            }
        }
        let handle = ClusterHandle(self.clusters.len());
        let mut cluster = Cluster::new();
        for frame in members {
            cluster.insert(frame);
            self.states[frame] = FrameState::Assigned(handle);
        }
        self.clusters.push(Some(cluster));
        self.invalidate();
        Ok(handle)
    }

    /// Add one frame to an existing cluster. Re-adding to the same cluster is
    /// a no-op.
    pub fn add_member(&mut self, handle: ClusterHandle, frame: usize) -> ClusterResult<()> {
        self.check_frame(frame)?;
        match self.states[frame] {
            FrameState::Assigned(owner) if owner == handle => return Ok(()),
            FrameState::Assigned(owner) => {
                return Err(ClusterError::Conflict(format!(
                    "frame {frame} already belongs to cluster handle {}",
                    owner.0
                )))
            }
            FrameState::Unvisited | FrameState::Noise => {}
        }
        self.live_mut(handle)?.insert(frame);
        self.states[frame] = FrameState::Assigned(handle);
        self.invalidate();
        Ok(())
    }

    pub fn mark_noise(&mut self, frame: usize) -> ClusterResult<()> {
        self.check_frame(frame)?;
        if let FrameState::Assigned(owner) = self.states[frame] {
            return Err(ClusterError::Conflict(format!(
                "frame {frame} belongs to cluster handle {} and cannot become noise",
                owner.0
            )));
        }
        self.states[frame] = FrameState::Noise;
        self.invalidate();
        Ok(())
    }

    /// Union two clusters. The lower handle survives and is returned.
    pub fn merge(&mut self, a: ClusterHandle, b: ClusterHandle) -> ClusterResult<ClusterHandle> {
        self.live_mut(a)?;
        self.live_mut(b)?;
        if a == b {
            return Ok(a);
        }
        let (keep, gone) = if a < b { (a, b) } else { (b, a) };
        let absorbed = self.clusters[gone.0].take().ok_or_else(|| {
            ClusterError::OutOfRange(format!("no cluster with handle {}", gone.0))
        })?;
        for frame in absorbed.members() {
            self.states[frame] = FrameState::Assigned(keep);
        }
        self.live_mut(keep)?.absorb(absorbed);
        self.invalidate();
        Ok(keep)
    }

    /// Pick each cluster's representative frame.
    ///
    /// Only members present in the distance matrix are candidates and only
    /// their mutual distances enter the cost; ties go to the lowest frame.
    pub fn compute_centroids(&mut self) -> ClusterResult<()> {
        let cost = self.centroid_cost;
        for slot in self.clusters.iter_mut() {
            let Some(cluster) = slot.as_mut() else {
                continue;
            };
            let centroid = best_representative(&self.matrix, cluster, cost);
            cluster.set_centroid(centroid);
        }
        Ok(())
    }

    fn fold_remainder(&mut self) -> ClusterResult<()> {
        let mut folded = 0usize;
        for frame in 0..self.states.len() {
            if self.states[frame] != FrameState::Unvisited || self.sieve.is_selected(frame) {
                continue;
            }
            let nearest = self.sieve.nearest_selected(frame)?;
            match self.states[nearest] {
                FrameState::Assigned(handle) => {
                    self.live_mut(handle)?.insert(frame);
                    self.states[frame] = FrameState::Assigned(handle);
                }
                FrameState::Noise | FrameState::Unvisited => {
                    self.states[frame] = FrameState::Noise;
                }
            }
            folded += 1;
        }
        if folded > 0 {
            debug!(folded, "sieved frames folded into nearest selected frame");
        }
        Ok(())
    }

    /// Fold sieved frames back, order clusters by population and assign IDs.
    ///
    /// Unselected frames still unvisited inherit the state of their nearest
    /// selected frame; selected frames the algorithm never visited become
    /// noise. Calling this again without intervening mutation yields the same
    /// assignment.
    pub fn finalize(&mut self) -> ClusterResult<()> {
        self.fold_remainder()?;
        for state in self.states.iter_mut() {
            if *state == FrameState::Unvisited {
                *state = FrameState::Noise;
            }
        }

        let cost = self.centroid_cost;
        for cluster in self.clusters.iter_mut().flatten() {
            if cluster.centroid().is_none() {
                let centroid = best_representative(&self.matrix, cluster, cost);
                cluster.set_centroid(centroid);
            }
        }

        let mut order: Vec<ClusterHandle> = self.clusters().map(|(h, _)| h).collect();
        // stable: equal populations keep creation order
        order.sort_by(|a, b| {
            let pa = self.clusters[a.0].as_ref().map(|c| c.population()).unwrap_or(0);
            let pb = self.clusters[b.0].as_ref().map(|c| c.population()).unwrap_or(0);
            pb.cmp(&pa)
        });
        for (id, handle) in order.iter().enumerate() {
            if let Some(cluster) = self.clusters[handle.0].as_mut() {
                cluster.set_id(Some(id as i32));
            }
        }

        let mut labels = vec![NOISE_ID; self.states.len()];
        for (frame, state) in self.states.iter().enumerate() {
            if let FrameState::Assigned(handle) = state {
                labels[frame] = self.clusters[handle.0]
                    .as_ref()
                    .and_then(|c| c.id())
                    .ok_or_else(|| {
                        ClusterError::Conflict(format!(
                            "frame {frame} points at removed cluster handle {}",
                            handle.0
                        ))
                    })?;
            }
        }
        self.order = Some(order);
        self.labels = Some(labels);
        self.check_coverage()?;
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        self.labels.is_some()
    }

    /// Every frame must be in exactly one cluster or in the noise set.
    pub fn check_coverage(&self) -> ClusterResult<()> {
        let mut counts = vec![0u32; self.states.len()];
        for (handle, cluster) in self.clusters() {
            for frame in cluster.members() {
                if frame >= counts.len() {
                    return Err(ClusterError::OutOfRange(format!(
                        "cluster handle {} holds frame {frame} outside the trajectory",
                        handle.0
                    )));
                }
                if self.states[frame] != FrameState::Assigned(handle) {
                    return Err(ClusterError::Conflict(format!(
                        "frame {frame} is a member of cluster handle {} but its state disagrees",
                        handle.0
                    )));
                }
                counts[frame] += 1;
            }
        }
        for (frame, state) in self.states.iter().enumerate() {
            if *state == FrameState::Noise {
                counts[frame] += 1;
            }
        }
        if let Some(frame) = counts.iter().position(|&c| c != 1) {
            return Err(ClusterError::Conflict(format!(
                "frame {frame} is covered {} times",
                counts[frame]
            )));
        }
        Ok(())
    }

    pub fn labels(&self) -> ClusterResult<&[i32]> {
        self.labels
            .as_deref()
            .ok_or_else(|| ClusterError::NotFinalized("cluster labels requested".into()))
    }

    pub fn cluster_id_for(&self, frame: usize) -> ClusterResult<i32> {
        let labels = self
            .labels
            .as_ref()
            .ok_or_else(|| ClusterError::NotFinalized(format!("cluster ID of frame {frame}")))?;
        labels.get(frame).copied().ok_or_else(|| {
            ClusterError::OutOfRange(format!(
                "frame {frame} outside trajectory of {} frames",
                labels.len()
            ))
        })
    }

    pub fn id_for_handle(&self, handle: ClusterHandle) -> ClusterResult<i32> {
        if !self.is_finalized() {
            return Err(ClusterError::NotFinalized(format!(
                "cluster ID of handle {}",
                handle.0
            )));
        }
        self.cluster(handle)
            .and_then(|c| c.id())
            .ok_or_else(|| ClusterError::OutOfRange(format!("no cluster with handle {}", handle.0)))
    }

    /// Clusters in final ID order (ID 0 first).
    pub fn ordered_clusters(&self) -> ClusterResult<Vec<&Cluster>> {
        let order = self
            .order
            .as_ref()
            .ok_or_else(|| ClusterError::NotFinalized("ordered clusters requested".into()))?;
        Ok(order.iter().filter_map(|h| self.cluster(*h)).collect())
    }

    pub fn noise_frames(&self) -> Vec<usize> {
        self.states
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == FrameState::Noise)
            .map(|(frame, _)| frame)
            .collect()
    }
}

fn best_representative(
    matrix: &DistanceMatrix,
    cluster: &Cluster,
    cost: CentroidCost,
) -> Option<usize> {
    let resident: Vec<(usize, usize)> = cluster
        .members()
        .filter_map(|frame| matrix.position(frame).map(|pos| (frame, pos)))
        .collect();
    if resident.is_empty() {
        return cluster.members().next();
    }
    let mut best = resident[0].0;
    let mut best_cost = f64::INFINITY;
    for &(frame, pos) in resident.iter() {
        let mut total = 0.0f64;
        for &(_, other) in resident.iter() {
            total = cost.accumulate(total, matrix.distance_at(pos, other));
        }
        if total < best_cost {
            best_cost = total;
            best = frame;
        }
    }
    Some(best)
}
