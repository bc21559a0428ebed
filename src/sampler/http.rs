//! HTTP client for the image-analysis endpoint

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::state::DetailLevel;

use super::{FrameSampler, FrameSource, SampleError};

const ANALYSIS_PATH: &str = "/api/analysis/image";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AnalysisRequest {
    /// Base64 encoded image, no data-URL prefix
    image: String,
    detail_level: DetailLevel,
}

#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    description: Option<String>,
}

/// Posts frames to the classifier and returns its description
pub struct HttpSampler<F> {
    endpoint: String,
    client: reqwest::Client,
    frames: F,
}

impl<F: FrameSource> HttpSampler<F> {
    pub fn new(base_url: &str, frames: F) -> Self {
        Self {
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), ANALYSIS_PATH),
            client: reqwest::Client::new(),
            frames,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl<F: FrameSource> FrameSampler for HttpSampler<F> {
    async fn sample(&self, level: DetailLevel) -> Result<Option<String>, SampleError> {
        let frame = self.frames.capture().await?;
        debug!(bytes = frame.len(), %level, "sending frame to classifier");

        let request = AnalysisRequest {
            image: STANDARD.encode(&frame),
            detail_level: level,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SampleError::Status(status.as_u16()));
        }

        let body: AnalysisResponse = response.json().await?;
        Ok(body
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()))
    }
}
