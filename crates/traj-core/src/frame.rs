use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{TrajError, TrajResult};

/// Read-only random access to trajectory frames.
///
/// Coordinates are stored as `[x, y, z, w]` per atom; `w` is unused by the
/// distance kernels and is carried so frames can be handed over without
/// repacking.
pub trait FrameSource {
    fn n_atoms(&self) -> usize;
    fn n_frames(&self) -> usize;
    fn frame(&self, index: usize) -> TrajResult<&[[f32; 4]]>;
}

/// Frames held in one flat coordinate buffer, `n_atoms` entries per frame.
#[derive(Debug, Clone, Default)]
pub struct FrameStore {
    n_atoms: usize,
    n_frames: usize,
    coords: Vec<[f32; 4]>,
}

#[derive(Debug, Deserialize)]
struct FrameSetFile {
    frames: Vec<Vec<[f32; 3]>>,
}

impl FrameStore {
    pub fn new(n_atoms: usize) -> Self {
        Self {
            n_atoms,
            n_frames: 0,
            coords: Vec::new(),
        }
    }

    pub fn with_capacity(n_atoms: usize, max_frames: usize) -> Self {
        Self {
            n_atoms,
            n_frames: 0,
            coords: Vec::with_capacity(n_atoms * max_frames),
        }
    }

    pub fn from_frames(frames: Vec<Vec<[f32; 4]>>) -> TrajResult<Self> {
        let n_atoms = frames.first().map(|f| f.len()).unwrap_or(0);
        let mut store = Self::with_capacity(n_atoms, frames.len());
        for frame in frames.iter() {
            store.push_frame(frame)?;
        }
        Ok(store)
    }

    /// Append a zeroed frame and hand back its coordinate slot.
    pub fn start_frame(&mut self) -> &mut [[f32; 4]] {
        let start = self.n_frames * self.n_atoms;
        let end = start + self.n_atoms;
        self.n_frames += 1;
        if self.coords.len() < end {
            self.coords.resize(end, [0.0; 4]);
        }
        &mut self.coords[start..end]
    }

    pub fn push_frame(&mut self, coords: &[[f32; 4]]) -> TrajResult<()> {
        if coords.len() != self.n_atoms {
            return Err(TrajError::Mismatch(format!(
                "frame has {} atoms, expected {}",
                coords.len(),
                self.n_atoms
            )));
        }
        self.start_frame().copy_from_slice(coords);
        Ok(())
    }

    /// Parse a JSON frame set: `{"frames": [[[x, y, z], ...], ...]}`.
    pub fn from_json_str(content: &str) -> TrajResult<Self> {
        let parsed: FrameSetFile = serde_json::from_str(content)?;
        let n_atoms = parsed.frames.first().map(|f| f.len()).unwrap_or(0);
        if n_atoms == 0 && !parsed.frames.is_empty() {
            return Err(TrajError::Parse("frame set has frames with no atoms".into()));
        }
        let mut store = Self::with_capacity(n_atoms, parsed.frames.len());
        for (idx, frame) in parsed.frames.iter().enumerate() {
            if frame.len() != n_atoms {
                return Err(TrajError::Mismatch(format!(
                    "frame {idx} has {} atoms, expected {n_atoms}",
                    frame.len()
                )));
            }
            let dst = store.start_frame();
            for (slot, p) in dst.iter_mut().zip(frame.iter()) {
                *slot = [p[0], p[1], p[2], 1.0];
            }
        }
        Ok(store)
    }

    pub fn read_json(path: &Path) -> TrajResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }
}

impl FrameSource for FrameStore {
    fn n_atoms(&self) -> usize {
        self.n_atoms
    }

    fn n_frames(&self) -> usize {
        self.n_frames
    }

    fn frame(&self, index: usize) -> TrajResult<&[[f32; 4]]> {
        if index >= self.n_frames {
            return Err(TrajError::Mismatch(format!(
                "frame {index} out of bounds for {} frames",
                self.n_frames
            )));
        }
        let start = index * self.n_atoms;
        Ok(&self.coords[start..start + self.n_atoms])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_and_read_back() {
        let mut store = FrameStore::new(2);
        store
            .push_frame(&[[0.0, 0.0, 0.0, 1.0], [1.0, 0.0, 0.0, 1.0]])
            .unwrap();
        store
            .push_frame(&[[0.0, 1.0, 0.0, 1.0], [1.0, 1.0, 0.0, 1.0]])
            .unwrap();
        assert_eq!(store.n_frames(), 2);
        assert_eq!(store.frame(1).unwrap()[0], [0.0, 1.0, 0.0, 1.0]);
        assert!(store.frame(2).is_err());
    }

    #[test]
    fn push_rejects_wrong_atom_count() {
        let mut store = FrameStore::new(2);
        assert!(store.push_frame(&[[0.0; 4]]).is_err());
        assert_eq!(store.n_frames(), 0);
    }

    #[test]
    fn json_frame_set_parses() {
        let store = FrameStore::from_json_str(
            r#"{"frames": [[[0, 0, 0], [1, 2, 3]], [[4, 5, 6], [7, 8, 9]]]}"#,
        )
        .unwrap();
        assert_eq!(store.n_atoms(), 2);
        assert_eq!(store.n_frames(), 2);
        assert_eq!(store.frame(1).unwrap()[1], [7.0, 8.0, 9.0, 1.0]);
    }

    #[test]
    fn json_frame_set_rejects_ragged_frames() {
        let err = FrameStore::from_json_str(r#"{"frames": [[[0, 0, 0]], [[1, 1, 1], [2, 2, 2]]]}"#)
            .unwrap_err();
        assert!(matches!(err, TrajError::Mismatch(_)));
    }
}
