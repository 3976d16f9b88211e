use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Cluster ID reported for frames that belong to no cluster.
pub const NOISE_ID: i32 = -1;

/// Stable handle to a cluster while a run is in progress.
///
/// Handles follow creation order; final IDs are only known after
/// [`ClusterList::finalize`](crate::list::ClusterList::finalize).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterHandle(pub(crate) usize);

impl ClusterHandle {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Per-frame clustering outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameState {
    Unvisited,
    Noise,
    Assigned(ClusterHandle),
}

/// Representative-frame cost over in-cluster distances.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CentroidCost {
    /// Minimize the sum of distances to the other members.
    #[default]
    Sum,
    /// Minimize the largest distance to any other member.
    Max,
}

impl CentroidCost {
    pub fn as_str(&self) -> &'static str {
        match self {
            CentroidCost::Sum => "sum",
            CentroidCost::Max => "max",
        }
    }

    pub(crate) fn accumulate(&self, acc: f64, d: f64) -> f64 {
        match self {
            CentroidCost::Sum => acc + d,
            CentroidCost::Max => acc.max(d),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Cluster {
    members: BTreeSet<usize>,
    centroid: Option<usize>,
    id: Option<i32>,
}

impl Cluster {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Member frames in increasing order.
    pub fn members(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().copied()
    }

    pub fn contains(&self, frame: usize) -> bool {
        self.members.contains(&frame)
    }

    pub fn population(&self) -> usize {
        self.members.len()
    }

    pub fn centroid(&self) -> Option<usize> {
        self.centroid
    }

    /// Final cluster ID; `None` until the list is finalized.
    pub fn id(&self) -> Option<i32> {
        self.id
    }

    pub(crate) fn insert(&mut self, frame: usize) -> bool {
        let added = self.members.insert(frame);
        if added {
            self.centroid = None;
        }
        added
    }

    pub(crate) fn absorb(&mut self, other: Cluster) {
        self.members.extend(other.members);
        self.centroid = None;
    }

    pub(crate) fn set_centroid(&mut self, frame: Option<usize>) {
        self.centroid = frame;
    }

    pub(crate) fn set_id(&mut self, id: Option<i32>) {
        self.id = id;
    }
}
