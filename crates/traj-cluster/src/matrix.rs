//! Pairwise frame distances over the frames a run actually clusters.
//!
//! Only the upper triangle is stored (`f32`, row-major, diagonal omitted).
//! Storage is sized and checked against the memory budget before any
//! distance is computed; rows of the triangle are disjoint and are filled in
//! parallel.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use rayon::prelude::*;

use crate::error::{ClusterError, ClusterResult};
use crate::metric::FrameDistance;

const PAIRDIST_MAGIC: &[u8; 4] = b"TCPD";
const PAIRDIST_VERSION: u32 = 1;
const NOT_PRESENT: u32 = u32::MAX;

#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    indices: Vec<usize>,
    positions: Vec<u32>,
    tri: Vec<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatrixStats {
    pub n_pairs: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

fn tri_pairs_len(n: usize) -> usize {
    n.saturating_mul(n.saturating_sub(1)) / 2
}

fn tri_index(a: usize, b: usize, n: usize) -> usize {
    let (a, b) = if a < b { (a, b) } else { (b, a) };
    let row_offset = a * (2 * n - a - 1) / 2;
    row_offset + (b - a - 1)
}

fn split_rows(tri: &mut [f32], n: usize) -> Vec<&mut [f32]> {
    let mut rows = Vec::with_capacity(n);
    let mut rest = tri;
    for a in 0..n {
        let (row, tail) = std::mem::take(&mut rest).split_at_mut(n - a - 1);
        rows.push(row);
        rest = tail;
    }
    rows
}

impl DistanceMatrix {
    /// Bytes of triangle storage needed for `n` frames.
    pub fn required_bytes(n: usize) -> usize {
        tri_pairs_len(n).saturating_mul(std::mem::size_of::<f32>())
    }

    pub fn check_capacity(n: usize, memory_budget_bytes: Option<usize>) -> ClusterResult<()> {
        let bytes = Self::required_bytes(n);
        if let Some(limit) = memory_budget_bytes {
            if bytes > limit {
                return Err(ClusterError::Capacity(format!(
                    "distance matrix for {n} frames requires {bytes} bytes but memory_budget_bytes={limit}"
                )));
            }
        }
        Ok(())
    }

    fn allocate(indices: Vec<usize>, memory_budget_bytes: Option<usize>) -> ClusterResult<Self> {
        for pair in indices.windows(2) {
            if pair[1] <= pair[0] {
                return Err(ClusterError::Config(
                    "distance matrix indices must be strictly increasing".into(),
                ));
            }
        }
        let n = indices.len();
        if n >= NOT_PRESENT as usize {
            return Err(ClusterError::Capacity(format!(
                "{n} frames exceed the distance matrix index range"
            )));
        }
        Self::check_capacity(n, memory_budget_bytes)?;
        let span = indices.last().map(|&last| last + 1).unwrap_or(0);
        let mut positions = vec![NOT_PRESENT; span];
        for (pos, &frame) in indices.iter().enumerate() {
            positions[frame] = pos as u32;
        }
        Ok(Self {
            indices,
            positions,
            tri: vec![0.0f32; tri_pairs_len(n)],
        })
    }

    /// Compute every pair among `indices` with `dist`.
    pub fn compute<D>(
        dist: &D,
        indices: Vec<usize>,
        memory_budget_bytes: Option<usize>,
    ) -> ClusterResult<Self>
    where
        D: FrameDistance + ?Sized,
    {
        let total = dist.n_frames();
        if let Some(&last) = indices.last() {
            if last >= total {
                return Err(ClusterError::OutOfRange(format!(
                    "frame {last} requested but source has {total} frames"
                )));
            }
        }
        let mut matrix = Self::allocate(indices, memory_budget_bytes)?;
        let n = matrix.indices.len();
        let indices = &matrix.indices;
        let rows = split_rows(&mut matrix.tri, n);
        rows.into_par_iter()
            .enumerate()
            .try_for_each(|(a, row)| -> ClusterResult<()> {
                let frame_a = indices[a];
                for (k, slot) in row.iter_mut().enumerate() {
                    *slot = dist.distance(frame_a, indices[a + 1 + k])? as f32;
                }
                Ok(())
            })?;
        Ok(matrix)
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Frame indices covered by the matrix, strictly increasing.
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn position(&self, frame: usize) -> Option<usize> {
        match self.positions.get(frame) {
            Some(&pos) if pos != NOT_PRESENT => Some(pos as usize),
            _ => None,
        }
    }

    pub fn contains(&self, frame: usize) -> bool {
        self.position(frame).is_some()
    }

    /// Distance between two frames, both of which must be in the matrix.
    pub fn distance(&self, i: usize, j: usize) -> ClusterResult<f64> {
        let a = self.position(i).ok_or_else(|| {
            ClusterError::OutOfRange(format!("frame {i} is not in the distance matrix"))
        })?;
        let b = self.position(j).ok_or_else(|| {
            ClusterError::OutOfRange(format!("frame {j} is not in the distance matrix"))
        })?;
        Ok(self.distance_at(a, b))
    }

    /// Distance by matrix position rather than frame index.
    pub(crate) fn distance_at(&self, a: usize, b: usize) -> f64 {
        if a == b {
            0.0
        } else {
            self.tri[tri_index(a, b, self.indices.len())] as f64
        }
    }

    pub fn stats(&self) -> Option<MatrixStats> {
        if self.tri.is_empty() {
            return None;
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0f64;
        for &d in self.tri.iter() {
            let d = d as f64;
            min = min.min(d);
            max = max.max(d);
            sum += d;
        }
        Some(MatrixStats {
            n_pairs: self.tri.len(),
            min,
            max,
            mean: sum / self.tri.len() as f64,
        })
    }

    pub fn write_to<W: Write>(&self, out: &mut W) -> ClusterResult<()> {
        out.write_all(PAIRDIST_MAGIC)?;
        out.write_all(&PAIRDIST_VERSION.to_le_bytes())?;
        out.write_all(&(self.indices.len() as u64).to_le_bytes())?;
        for &frame in self.indices.iter() {
            out.write_all(&(frame as u64).to_le_bytes())?;
        }
        for &d in self.tri.iter() {
            out.write_all(&d.to_le_bytes())?;
        }
        Ok(())
    }

    /// Read a matrix written by [`write_to`](Self::write_to).
    ///
    /// `total_frames` bounds the frame count and every stored frame index;
    /// the body must hold exactly the indices and triangle the header
    /// announces.
    pub fn read_from<R: Read>(
        input: &mut R,
        total_frames: usize,
        memory_budget_bytes: Option<usize>,
    ) -> ClusterResult<Self> {
        let mut magic = [0u8; 4];
        input.read_exact(&mut magic)?;
        if &magic != PAIRDIST_MAGIC {
            return Err(ClusterError::Parse("not a pairwise distance file".into()));
        }
        let mut buf4 = [0u8; 4];
        input.read_exact(&mut buf4)?;
        let version = u32::from_le_bytes(buf4);
        if version != PAIRDIST_VERSION {
            return Err(ClusterError::Parse(format!(
                "unsupported pairwise distance file version {version}"
            )));
        }
        let mut buf8 = [0u8; 8];
        input.read_exact(&mut buf8)?;
        let n = u64::from_le_bytes(buf8);
        if n > total_frames as u64 {
            return Err(ClusterError::Parse(format!(
                "pairwise distance file covers {n} frames but the trajectory has {total_frames}"
            )));
        }
        let n = n as usize;
        Self::check_capacity(n, memory_budget_bytes)?;

        let mut body = Vec::new();
        input.read_to_end(&mut body)?;
        let index_bytes = n.saturating_mul(8);
        let expected = tri_pairs_len(n)
            .checked_mul(4)
            .and_then(|tri_bytes| tri_bytes.checked_add(index_bytes));
        if expected != Some(body.len()) {
            return Err(ClusterError::Parse(format!(
                "pairwise distance file for {n} frames has {} bytes after the header",
                body.len()
            )));
        }
        let (index_part, tri_part) = body.split_at(index_bytes);

        let mut indices = Vec::with_capacity(n);
        for chunk in index_part.chunks_exact(8) {
            buf8.copy_from_slice(chunk);
            let frame = u64::from_le_bytes(buf8);
            if frame >= total_frames as u64 {
                return Err(ClusterError::Parse(format!(
                    "pairwise distance file holds frame {frame} outside trajectory of {total_frames} frames"
                )));
            }
            indices.push(frame as usize);
        }
        let mut matrix = Self::allocate(indices, memory_budget_bytes)
            .map_err(|e| ClusterError::Parse(format!("pairwise distance file: {e}")))?;
        for (slot, chunk) in matrix.tri.iter_mut().zip(tri_part.chunks_exact(4)) {
            buf4.copy_from_slice(chunk);
            let d = f32::from_le_bytes(buf4);
            if !d.is_finite() || d < 0.0 {
                return Err(ClusterError::Parse(format!(
                    "pairwise distance file holds invalid distance {d}"
                )));
            }
            *slot = d;
        }
        Ok(matrix)
    }

    pub fn save(&self, path: &Path) -> ClusterResult<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_to(&mut out)?;
        out.flush()?;
        Ok(())
    }

    pub fn load(
        path: &Path,
        total_frames: usize,
        memory_budget_bytes: Option<usize>,
    ) -> ClusterResult<Self> {
        let mut input = BufReader::new(File::open(path)?);
        Self::read_from(&mut input, total_frames, memory_budget_bytes)
    }
}
