//! Frame sieving: cluster a subsample, fold the rest back in afterwards.

use std::fmt;

use rayon::prelude::*;
use traj_core::{next_below, seeded_state};

use crate::error::{ClusterError, ClusterResult};
use crate::metric::FrameDistance;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SieveMode {
    /// Every `stride`-th frame starting at frame 0.
    Regular,
    /// `total / stride` frames drawn with a seeded generator; frame 0 is
    /// always kept.
    Random { seed: u64 },
}

#[derive(Debug, Clone)]
pub struct SieveSelection {
    total_frames: usize,
    stride: usize,
    mode: SieveMode,
    selected: Vec<usize>,
    is_selected: Vec<bool>,
    nearest: Option<Vec<usize>>,
}

impl SieveSelection {
    pub fn select(total_frames: usize, stride: usize, mode: SieveMode) -> ClusterResult<Self> {
        if stride == 0 {
            return Err(ClusterError::Config("sieve must be >= 1".into()));
        }
        let selected: Vec<usize> = if stride == 1 || total_frames == 0 {
            (0..total_frames).collect()
        } else {
            match mode {
                SieveMode::Regular => (0..total_frames).step_by(stride).collect(),
                SieveMode::Random { seed } => random_subset(total_frames, stride, seed),
            }
        };
        let mut is_selected = vec![false; total_frames];
        for &frame in selected.iter() {
            is_selected[frame] = true;
        }
        Ok(Self {
            total_frames,
            stride,
            mode,
            selected,
            is_selected,
            nearest: None,
        })
    }

    /// Selection that keeps every frame.
    pub fn full(total_frames: usize) -> Self {
        Self {
            total_frames,
            stride: 1,
            mode: SieveMode::Regular,
            selected: (0..total_frames).collect(),
            is_selected: vec![true; total_frames],
            nearest: None,
        }
    }

    pub fn total_frames(&self) -> usize {
        self.total_frames
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn mode(&self) -> SieveMode {
        self.mode
    }

    /// Selected frames, strictly increasing.
    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    pub fn is_sieved(&self) -> bool {
        self.selected.len() < self.total_frames
    }

    pub fn is_selected(&self, frame: usize) -> bool {
        self.is_selected.get(frame).copied().unwrap_or(false)
    }

    pub fn unselected(&self) -> impl Iterator<Item = usize> + '_ {
        self.is_selected
            .iter()
            .enumerate()
            .filter(|(_, sel)| !**sel)
            .map(|(frame, _)| frame)
    }

    pub fn has_remainder(&self) -> bool {
        self.nearest.is_some()
    }

    /// Record the nearest selected frame for every unselected frame.
    ///
    /// Ties go to the lowest selected frame index. Without sieving this does
    /// not touch `dist`.
    pub fn assign_remainder<D>(&mut self, dist: &D) -> ClusterResult<()>
    where
        D: FrameDistance + ?Sized,
    {
        if self.nearest.is_some() {
            return Ok(());
        }
        if !self.is_sieved() {
            self.nearest = Some((0..self.total_frames).collect());
            return Ok(());
        }
        if dist.n_frames() < self.total_frames {
            return Err(ClusterError::OutOfRange(format!(
                "sieve covers {} frames but distance source has {}",
                self.total_frames,
                dist.n_frames()
            )));
        }
        let selected = &self.selected;
        let is_selected = &self.is_selected;
        let nearest = (0..self.total_frames)
            .into_par_iter()
            .map(|frame| -> ClusterResult<usize> {
                if is_selected[frame] {
                    return Ok(frame);
                }
                let mut best = selected[0];
                let mut best_dist = f64::INFINITY;
                for &candidate in selected.iter() {
                    let d = dist.distance(frame, candidate)?;
                    if d < best_dist {
                        best_dist = d;
                        best = candidate;
                    }
                }
                Ok(best)
            })
            .collect::<ClusterResult<Vec<usize>>>()?;
        self.nearest = Some(nearest);
        Ok(())
    }

    pub fn nearest_selected(&self, frame: usize) -> ClusterResult<usize> {
        if frame >= self.total_frames {
            return Err(ClusterError::OutOfRange(format!(
                "frame {frame} outside sieve of {} frames",
                self.total_frames
            )));
        }
        if self.is_selected[frame] {
            return Ok(frame);
        }
        let nearest = self.nearest.as_ref().ok_or_else(|| {
            ClusterError::OutOfRange(format!(
                "frame {frame} was sieved out and no remainder mapping was computed"
            ))
        })?;
        Ok(nearest[frame])
    }
}

impl fmt::Display for SieveSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_sieved() {
            return write!(f, "no sieve, {} frames clustered", self.total_frames);
        }
        match self.mode {
            SieveMode::Regular => write!(
                f,
                "sieve {}: {} of {} frames clustered",
                self.stride,
                self.selected.len(),
                self.total_frames
            ),
            SieveMode::Random { seed } => write!(
                f,
                "random sieve {} (seed {seed}): {} of {} frames clustered",
                self.stride,
                self.selected.len(),
                self.total_frames
            ),
        }
    }
}

fn random_subset(total_frames: usize, stride: usize, seed: u64) -> Vec<usize> {
    let want = (total_frames / stride).max(1);
    let mut state = seeded_state(seed);
    let mut pool: Vec<usize> = (1..total_frames).collect();
    let take = want - 1;
    for j in 0..take {
        let pick = j + next_below(&mut state, pool.len() - j);
        pool.swap(j, pick);
    }
    pool.truncate(take);
    pool.push(0);
    pool.sort_unstable();
    pool
}
