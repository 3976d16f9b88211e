use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrajError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("mismatch: {0}")]
    Mismatch(String),
}

pub type TrajResult<T> = Result<T, TrajError>;

impl From<serde_json::Error> for TrajError {
    fn from(err: serde_json::Error) -> Self {
        TrajError::Parse(format!("json parse error: {err}"))
    }
}
