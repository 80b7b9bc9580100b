use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ClassificationResult, ZeroShotClassifier};
use crate::error::{Error, Result};

#[derive(Serialize)]
struct ZeroShotRequest<'a> {
    inputs: &'a str,
    parameters: ZeroShotParameters<'a>,
}

#[derive(Serialize)]
struct ZeroShotParameters<'a> {
    candidate_labels: &'a [&'a str],
}

/// labels come back sorted by descending score
#[derive(Deserialize)]
struct ZeroShotResponse {
    labels: Vec<String>,
    scores: Vec<f32>,
}

/// Zero-shot classification served over HTTP, one endpoint per model.
#[derive(Clone, Debug)]
pub struct InferenceClassifier {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl InferenceClassifier {
    pub fn new(client: Client, endpoint: impl Into<String>, token: Option<String>) -> Self {
        InferenceClassifier {
            client,
            endpoint: endpoint.into(),
            token,
        }
    }
}

#[async_trait]
impl ZeroShotClassifier for InferenceClassifier {
    async fn classify(
        &self,
        text: &str,
        candidate_labels: &[&str],
    ) -> Result<ClassificationResult> {
        let mut request = self.client.post(&self.endpoint).json(&ZeroShotRequest {
            inputs: text,
            parameters: ZeroShotParameters { candidate_labels },
        });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status));
        }

        let ranking: ZeroShotResponse = response.json().await?;
        debug!(
            "{} ranked {:?} as {:?}",
            self.endpoint, ranking.labels, ranking.scores
        );

        ranking
            .labels
            .into_iter()
            .zip(ranking.scores)
            .next()
            .map(|(label, score)| ClassificationResult { label, score })
            .ok_or_else(|| Error::Classification("empty ranking".to_owned()))
    }
}
