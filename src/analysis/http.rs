//! HTTP client for the pose-analysis service

use futures::future::BoxFuture;
use serde::Serialize;
use std::time::Duration;

use super::{AnalysisGateway, AnalysisResult};
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, FormcoachError};

/// Request body sent to the analyze endpoint
#[derive(Debug, Serialize)]
struct AnalyzeRequest {
    image: String,
}

/// POSTs `{"image": "<base64>"}` and decodes the JSON reply
#[derive(Debug, Clone)]
pub struct HttpAnalysisGateway {
    client: reqwest::Client,
    url: String,
}

impl HttpAnalysisGateway {
    pub fn new(config: &AnalysisConfig) -> Result<Self, FormcoachError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(AnalysisError::from)?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

impl AnalysisGateway for HttpAnalysisGateway {
    fn analyze(&self, image_base64: String) -> BoxFuture<'static, Result<AnalysisResult, AnalysisError>> {
        let client = self.client.clone();
        let url = self.url.clone();

        Box::pin(async move {
            let response = client
                .post(&url)
                .json(&AnalyzeRequest {
                    image: image_base64,
                })
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(AnalysisError::Status(status.as_u16()));
            }

            let body = response.bytes().await?;
            serde_json::from_slice(&body).map_err(|e| AnalysisError::Decode(e.to_string()))
        })
    }
}
