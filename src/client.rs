use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::time::Duration;

/// Retrieval width sent with every question
pub const DEFAULT_TOP_K: u32 = 4;

/// Default address of the question-answering service
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";

/// Body of `POST /ask`
#[derive(Debug, Clone, Serialize)]
pub struct AskRequest<'a> {
    pub question: &'a str,
    pub k: u32,
}

/// Body returned by `POST /ask`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    pub confidence: f64,
    #[serde(default)]
    pub sources: Vec<String>,
}

/// Body returned by `POST /upload-doc`
#[derive(Debug, Clone, Deserialize)]
struct UploadResponse {
    file: Option<String>,
    error: Option<String>,
}

/// A document the service accepted for indexing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub file: String,
}

/// Usage figures returned by `GET /analytics`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Analytics {
    pub total_queries: u64,
    pub avg_confidence: f64,
    /// `(question, times asked)`, most asked first
    pub top_questions: Vec<(String, u64)>,
    /// `(document, times cited)`, most cited first
    pub top_sources: Vec<(String, u64)>,
}

/// Remote answer and indexing endpoints
#[async_trait]
pub trait AnswerService: Send + Sync {
    async fn ask(&self, question: &str, k: u32) -> Result<AskResponse>;
    async fn upload(&self, path: &Path) -> Result<UploadReceipt>;
}

/// HTTP client for the question-answering service
#[derive(Clone)]
pub struct RagClient {
    base_url: String,
    client: reqwest::Client,
}

impl RagClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Ok(Self { base_url, client })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// `GET /health`, returning the reported status
    pub async fn health(&self) -> Result<String> {
        #[derive(Deserialize)]
        struct Health {
            status: String,
        }

        let response = self.client.get(self.url("/health")).send().await?;
        let health: Health = Self::read_json("/health", response).await?;
        Ok(health.status)
    }

    /// `GET /analytics`
    pub async fn analytics(&self) -> Result<Analytics> {
        #[derive(Deserialize)]
        struct AnalyticsResponse {
            analytics: Analytics,
        }

        let response = self.client.get(self.url("/analytics")).send().await?;
        let body: AnalyticsResponse = Self::read_json("/analytics", response).await?;
        Ok(body.analytics)
    }

    async fn read_json<T: DeserializeOwned>(
        endpoint: &str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(endpoint, status = status.as_u16(), "Endpoint returned an error status");
            return Err(Error::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }
}

#[async_trait]
impl AnswerService for RagClient {
    async fn ask(&self, question: &str, k: u32) -> Result<AskResponse> {
        tracing::debug!(k, "Asking question");

        let response = self
            .client
            .post(self.url("/ask"))
            .json(&AskRequest { question, k })
            .send()
            .await?;

        let answer: AskResponse = Self::read_json("/ask", response).await?;
        tracing::debug!(
            confidence = answer.confidence,
            sources = ?answer.sources,
            "Answer received"
        );
        Ok(answer)
    }

    async fn upload(&self, path: &Path) -> Result<UploadReceipt> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());

        tracing::info!(file = %file_name, bytes = bytes.len(), "Uploading document");

        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.url("/upload-doc"))
            .multipart(form)
            .send()
            .await?;

        let body: UploadResponse = Self::read_json("/upload-doc", response).await?;
        if let Some(error) = body.error {
            return Err(Error::UploadRejected(error));
        }

        let file = body.file.ok_or_else(|| Error::InvalidResponse {
            endpoint: "/upload-doc".to_string(),
            reason: "missing field `file`".to_string(),
        })?;
        Ok(UploadReceipt { file })
    }
}
