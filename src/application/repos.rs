//! Source traits describing where post collections come from.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::posts::PostCollection;

#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("upstream unreachable: {0}")]
    Unreachable(String),
    #[error("upstream responded with status {0}")]
    Status(u16),
    #[error("upstream document could not be decoded: {0}")]
    Decode(String),
}

impl FetchError {
    pub fn unreachable(err: impl std::fmt::Display) -> Self {
        Self::Unreachable(err.to_string())
    }

    pub fn decode(err: impl std::fmt::Display) -> Self {
        Self::Decode(err.to_string())
    }
}

/// Produces the latest full post collection. One call is one upstream read.
#[async_trait]
pub trait PostSource: Send + Sync {
    async fn fetch_collection(&self) -> Result<PostCollection, FetchError>;
}
