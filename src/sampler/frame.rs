//! Frame sources

use std::path::PathBuf;

use async_trait::async_trait;

use super::SampleError;

/// Provides the most recent camera frame as encoded image bytes
#[async_trait]
pub trait FrameSource: Send + Sync + 'static {
    async fn capture(&self) -> Result<Vec<u8>, SampleError>;
}

/// Reads the latest frame from a file kept current by the camera layer
#[derive(Debug, Clone)]
pub struct FileFrameSource {
    path: PathBuf,
}

impl FileFrameSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl FrameSource for FileFrameSource {
    async fn capture(&self) -> Result<Vec<u8>, SampleError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| SampleError::Frame(format!("{}: {e}", self.path.display())))?;

        if bytes.is_empty() {
            return Err(SampleError::Frame(format!("{}: empty frame", self.path.display())));
        }

        Ok(bytes)
    }
}
