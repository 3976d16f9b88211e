#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use traj_cluster::config::ClusterConfig;
use traj_cluster::error::ClusterResult;
use traj_cluster::metric::FrameDistance;

pub fn temp_path(label: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let label_path = Path::new(label);
    let stem = label_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(label);
    let ext = label_path.extension().and_then(|s| s.to_str());
    let filename = if let Some(ext) = ext {
        format!(
            "traj_cluster_test_{stem}_{}_{}.{}",
            std::process::id(),
            nanos,
            ext
        )
    } else {
        format!("traj_cluster_test_{label}_{}_{}", std::process::id(), nanos)
    };
    path.push(filename);
    path
}

pub fn write_text(path: &Path, contents: &str) {
    fs::write(path, contents).expect("write temp file");
}

/// Full square table of pairwise distances.
pub struct TableDistance {
    n: usize,
    table: Vec<f64>,
}

impl TableDistance {
    pub fn from_fn(n: usize, f: impl Fn(usize, usize) -> f64) -> Self {
        let mut table = vec![0.0; n * n];
        for a in 0..n {
            for b in 0..n {
                if a != b {
                    table[a * n + b] = f(a.min(b), a.max(b));
                }
            }
        }
        Self { n, table }
    }
}

impl FrameDistance for TableDistance {
    fn n_frames(&self) -> usize {
        self.n
    }

    fn distance(&self, a: usize, b: usize) -> ClusterResult<f64> {
        Ok(self.table[a * self.n + b])
    }
}

/// Frames placed on a line; distance is the gap between positions.
pub struct LineDistance(pub Vec<f64>);

impl FrameDistance for LineDistance {
    fn n_frames(&self) -> usize {
        self.0.len()
    }

    fn distance(&self, a: usize, b: usize) -> ClusterResult<f64> {
        Ok((self.0[a] - self.0[b]).abs())
    }
}

/// Fails the test if any distance is requested.
pub struct UnreachableDistance(pub usize);

impl FrameDistance for UnreachableDistance {
    fn n_frames(&self) -> usize {
        self.0
    }

    fn distance(&self, a: usize, b: usize) -> ClusterResult<f64> {
        panic!("distance({a}, {b}) requested");
    }
}

/// Ten frames: {0,1,2,3} and {6,7,8,9} at mutual distance 0.5, frames 4 and
/// 5 at least 5.0 from everything.
pub fn two_groups() -> TableDistance {
    let group = |f: usize| match f {
        0..=3 => Some(0),
        6..=9 => Some(1),
        _ => None,
    };
    TableDistance::from_fn(10, |a, b| match (group(a), group(b)) {
        (Some(ga), Some(gb)) if ga == gb => 0.5,
        _ => 5.0,
    })
}

pub fn two_groups_config() -> ClusterConfig {
    ClusterConfig::new(3, 1.0)
}

/// 100 frames in two bands of 50, 0.1 apart within a band.
pub fn two_bands() -> LineDistance {
    LineDistance(
        (0..100)
            .map(|f| if f < 50 { f as f64 * 0.1 } else { 100.0 + f as f64 * 0.1 })
            .collect(),
    )
}
