//! Frame sampling
//!
//! A sampler captures the current frame and asks the remote classifier to
//! describe it. Failures are transient from the controller's point of view:
//! the recording loop simply tries again on the next tick.

mod frame;
mod http;

use std::time::Duration;

use async_trait::async_trait;

use crate::state::DetailLevel;

pub use frame::{FileFrameSource, FrameSource};
pub use http::HttpSampler;

/// Why a sample produced no description
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    #[error("frame capture failed: {0}")]
    Frame(String),

    #[error("classifier request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("classifier returned HTTP {0}")]
    Status(u16),

    #[error("classifier did not answer within {0:?}")]
    Timeout(Duration),
}

/// Captures a frame and returns its description, if the classifier had one
#[async_trait]
pub trait FrameSampler: Send + Sync + 'static {
    async fn sample(&self, level: DetailLevel) -> Result<Option<String>, SampleError>;
}
