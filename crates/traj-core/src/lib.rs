#![forbid(unsafe_code)]

pub mod error;
pub mod frame;
pub mod rmsd;
pub mod rng_utils;

pub use error::{TrajError, TrajResult};
pub use frame::{FrameSource, FrameStore};
pub use rmsd::{kabsch_rmsd, rmsd_nofit};
pub use rng_utils::{next_below, next_u64, seeded_state};
