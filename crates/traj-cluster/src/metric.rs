use serde::{Deserialize, Serialize};
use traj_core::{kabsch_rmsd, rmsd_nofit, FrameSource};

use crate::error::{ClusterError, ClusterResult};

/// Distance between two frames' coordinates.
pub trait FrameMetric: Sync {
    fn distance(&self, a: &[[f32; 4]], b: &[[f32; 4]]) -> f64;
}

impl<F> FrameMetric for F
where
    F: Fn(&[[f32; 4]], &[[f32; 4]]) -> f64 + Sync,
{
    fn distance(&self, a: &[[f32; 4]], b: &[[f32; 4]]) -> f64 {
        self(a, b)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Best-fit RMSD after Kabsch superposition.
    #[default]
    Rmsd,
    /// RMSD of the coordinates as stored.
    RmsdNofit,
}

impl MetricKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricKind::Rmsd => "rmsd",
            MetricKind::RmsdNofit => "rmsd_nofit",
        }
    }
}

impl FrameMetric for MetricKind {
    fn distance(&self, a: &[[f32; 4]], b: &[[f32; 4]]) -> f64 {
        match self {
            MetricKind::Rmsd => kabsch_rmsd(a, b),
            MetricKind::RmsdNofit => rmsd_nofit(a, b),
        }
    }
}

/// Index-level distance capability the clustering core works against.
///
/// Implementations must be symmetric and return non-negative values.
pub trait FrameDistance: Sync {
    fn n_frames(&self) -> usize;
    fn distance(&self, a: usize, b: usize) -> ClusterResult<f64>;
}

/// Adapts a frame source and a coordinate metric into a [`FrameDistance`].
pub struct MetricDistance<'a, S, M> {
    source: &'a S,
    metric: M,
}

impl<'a, S, M> MetricDistance<'a, S, M>
where
    S: FrameSource + Sync,
    M: FrameMetric,
{
    pub fn new(source: &'a S, metric: M) -> ClusterResult<Self> {
        if source.n_frames() > 0 && source.n_atoms() == 0 {
            return Err(ClusterError::Frame(
                "frame source has frames but no atoms".into(),
            ));
        }
        Ok(Self { source, metric })
    }
}

impl<'a, S, M> FrameDistance for MetricDistance<'a, S, M>
where
    S: FrameSource + Sync,
    M: FrameMetric,
{
    fn n_frames(&self) -> usize {
        self.source.n_frames()
    }

    fn distance(&self, a: usize, b: usize) -> ClusterResult<f64> {
        if a == b {
            return Ok(0.0);
        }
        let fa = self.source.frame(a)?;
        let fb = self.source.frame(b)?;
        if fa.len() != fb.len() {
            return Err(ClusterError::Frame(format!(
                "frame {a} has {} atoms but frame {b} has {}",
                fa.len(),
                fb.len()
            )));
        }
        let d = self.metric.distance(fa, fb);
        if !d.is_finite() || d < 0.0 {
            return Err(ClusterError::Frame(format!(
                "metric returned {d} for frames {a} and {b}"
            )));
        }
        Ok(d)
    }
}
