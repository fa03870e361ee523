//! HTTP client for the notes backend and the AI extraction service.
//!
//! One `reqwest::Client` serves every endpoint:
//!
//! | Method | Path | Used by |
//! |---|---|---|
//! | GET | `/property-notes` | [`NotesRepository::list_notes`] |
//! | POST | `/bulk-property-notes` | [`NotesRepository::bulk_apply`] |
//! | DELETE | `/reset` | [`NotesRepository::reset`] |
//! | POST | `/ask` | [`ExtractionClient::extract`] |
//! | POST | `/suggestions` | [`SuggestionClient::suggest`] |

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::application::{ExtractionClient, NotesRepository, SuggestionClient};
use crate::domain::{AiModel, ApiConfig, AppError, ExtractedFields, PropertyNote, Result};

/// Shown when the suggestion service returns no content.
pub const NO_SUGGESTIONS: &str = "No suggestions returned.";

const EMPTY_INPUT: &str = "Input can't be empty";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AskRequest<'a> {
    text_field: &'a [String],
    custom_rules: &'a str,
    ai_model: AiModel,
}

#[derive(Deserialize)]
struct AskResponse {
    results: Option<Vec<ExtractedFields>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct BulkApplyRequest<'a> {
    selected_ids: &'a [i64],
    ai_model: AiModel,
    custom_rules: &'a str,
}

#[derive(Serialize)]
struct SuggestionRequest<'a> {
    input: &'a str,
}

#[derive(Deserialize)]
struct SuggestionResponse {
    #[serde(default)]
    content: Option<String>,
}

/// Client for the property notes API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Build a client from the API configuration.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be constructed.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(AppError::transport)?;
        Ok(Self::with_client(client, &config.base_url))
    }

    fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send a request and fail on non-success status.
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let resp = request.send().await.map_err(AppError::transport)?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AppError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(resp)
    }

    async fn send_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let resp = self.send(request).await?;
        resp.json().await.map_err(AppError::transport)
    }
}

#[async_trait]
impl ExtractionClient for ApiClient {
    async fn extract(
        &self,
        raw_texts: &[String],
        custom_rules: &str,
        ai_model: AiModel,
    ) -> Result<Vec<ExtractedFields>> {
        if raw_texts.is_empty() {
            return Ok(Vec::new());
        }

        let body = AskRequest {
            text_field: raw_texts,
            custom_rules,
            ai_model,
        };
        tracing::debug!(count = raw_texts.len(), model = %ai_model.model, "POST /ask");

        let resp: AskResponse = self
            .send_json(self.client.post(self.url("/ask")).json(&body))
            .await
            .map_err(AppError::extraction_failed)?;

        let results = resp.results.ok_or_else(|| {
            AppError::extraction_failed(AppError::MalformedResponse {
                message: "response has no `results`".into(),
            })
        })?;

        if results.len() != raw_texts.len() {
            return Err(AppError::extraction_failed(AppError::MalformedResponse {
                message: format!(
                    "sent {} texts but received {} results",
                    raw_texts.len(),
                    results.len()
                ),
            }));
        }

        tracing::info!(count = results.len(), "Extraction completed");
        Ok(results)
    }
}

#[async_trait]
impl NotesRepository for ApiClient {
    async fn list_notes(&self) -> Result<Vec<PropertyNote>> {
        tracing::debug!("GET /property-notes");
        self.send_json(self.client.get(self.url("/property-notes")))
            .await
            .map_err(AppError::repository_unavailable)
    }

    async fn bulk_apply(&self, ids: &[i64], ai_model: AiModel, custom_rules: &str) -> Result<()> {
        let body = BulkApplyRequest {
            selected_ids: ids,
            ai_model,
            custom_rules,
        };
        tracing::debug!(count = ids.len(), "POST /bulk-property-notes");

        // The ack body carries nothing the caller uses.
        self.send(
            self.client
                .post(self.url("/bulk-property-notes"))
                .json(&body),
        )
        .await
        .map_err(AppError::repository_unavailable)?;
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        tracing::debug!("DELETE /reset");
        self.send(self.client.delete(self.url("/reset")))
            .await
            .map_err(AppError::repository_unavailable)?;
        Ok(())
    }
}

#[async_trait]
impl SuggestionClient for ApiClient {
    async fn suggest(&self, input: &str) -> Result<String> {
        if input.trim().is_empty() {
            return Err(AppError::InvalidData {
                message: EMPTY_INPUT.into(),
            });
        }

        tracing::debug!(len = input.len(), "POST /suggestions");
        let resp: SuggestionResponse = self
            .send_json(
                self.client
                    .post(self.url("/suggestions"))
                    .json(&SuggestionRequest { input }),
            )
            .await?;

        Ok(resp
            .content
            .filter(|c| !c.is_empty())
            .unwrap_or_else(|| NO_SUGGESTIONS.to_string()))
    }
}
