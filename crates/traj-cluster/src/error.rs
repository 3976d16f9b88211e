use thiserror::Error;
use traj_core::TrajError;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("invalid config: {0}")]
    Config(String),
    #[error("capacity exceeded: {0}")]
    Capacity(String),
    #[error("out of range: {0}")]
    OutOfRange(String),
    #[error("cluster list not finalized: {0}")]
    NotFinalized(String),
    #[error("membership conflict: {0}")]
    Conflict(String),
    #[error("frame source error: {0}")]
    Frame(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(String),
}

pub type ClusterResult<T> = Result<T, ClusterError>;

impl ClusterError {
    /// Short machine-readable code used in streamed error events.
    pub fn code(&self) -> &'static str {
        match self {
            ClusterError::Config(_) => "config",
            ClusterError::Capacity(_) => "capacity",
            ClusterError::OutOfRange(_) => "out_of_range",
            ClusterError::NotFinalized(_) => "not_finalized",
            ClusterError::Conflict(_) => "conflict",
            ClusterError::Frame(_) => "frame",
            ClusterError::Io(_) => "io",
            ClusterError::Parse(_) => "parse",
        }
    }
}

impl From<TrajError> for ClusterError {
    fn from(err: TrajError) -> Self {
        match err {
            TrajError::Io(e) => ClusterError::Io(e),
            TrajError::Parse(msg) => ClusterError::Parse(msg),
            TrajError::Mismatch(msg) => ClusterError::Frame(msg),
        }
    }
}
