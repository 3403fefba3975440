//! Blossom client implementing [`WorkflowClient`] over its REST API.
//!
//! Blossom is a Django-REST-style service: collection endpoints are
//! paginated under a `results` array, detail endpoints carry a trailing
//! slash, and updates are `PATCH`es with JSON bodies. Records reference each
//! other by URL; the numeric ids are parsed out of those URLs here, at the
//! wire boundary, so the rest of the crate only sees typed ids.

use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::config::require_env;
use crate::types::{CommentFullname, SubmissionId, TranscriptionId, VolunteerId};

use super::error::WorkflowError;
use super::{PendingSubmission, Transcription, WorkflowClient, trailing_id};

/// A client for one Blossom instance.
pub struct BlossomClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl BlossomClient {
    /// Creates a client for the service at `base_url` (no trailing slash).
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        BlossomClient {
            http: reqwest::Client::new(),
            base_url,
            api_key,
        }
    }

    /// Reads the service location and key from `BLOSSOM_*` environment
    /// variables.
    pub fn from_env() -> Result<Self, crate::config::MissingVar> {
        Ok(BlossomClient::new(
            require_env("BLOSSOM_API_URL")?,
            require_env("BLOSSOM_API_KEY")?,
        ))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, WorkflowError> {
        let response = self
            .http
            .get(format!("{}{path}", self.base_url))
            .query(query)
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(WorkflowError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        serde_json::from_str(&body).map_err(|e| WorkflowError::Payload(e.to_string()))
    }

    async fn patch_json(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<(), WorkflowError> {
        let response = self
            .http
            .patch(format!("{}{path}", self.base_url))
            .header(reqwest::header::AUTHORIZATION, self.auth_header())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(WorkflowError::Api {
                status: status.as_u16(),
                message,
            });
        }
        Ok(())
    }

    fn auth_header(&self) -> String {
        format!("Api-Key {}", self.api_key)
    }
}

impl WorkflowClient for BlossomClient {
    async fn me(&self, username: &str) -> Result<VolunteerId, WorkflowError> {
        let page: Page<VolunteerPayload> = self
            .get_json("/volunteer/", &[("username", username)])
            .await?;
        let volunteer = page.results.into_iter().next().ok_or_else(|| {
            WorkflowError::Payload(format!("no volunteer registered as {username:?}"))
        })?;
        debug!(username, id = volunteer.id, "resolved own volunteer id");
        Ok(VolunteerId(volunteer.id))
    }

    async fn pending_submissions(&self) -> Result<Vec<PendingSubmission>, WorkflowError> {
        let page: Page<SubmissionPayload> = self.get_json("/submission/ocr/", &[]).await?;
        Ok(page
            .results
            .into_iter()
            .map(|payload| PendingSubmission {
                id: SubmissionId(payload.id),
                post_url: payload.tor_url,
                transcription_set: payload.transcription_set,
            })
            .collect())
    }

    async fn get_transcription(&self, id: TranscriptionId) -> Result<Transcription, WorkflowError> {
        let payload: TranscriptionPayload = self
            .get_json(&format!("/transcription/{id}/"), &[])
            .await?;
        let author = trailing_id(&payload.author).ok_or_else(|| {
            WorkflowError::Payload(format!(
                "transcription {id} has a malformed author reference: {}",
                payload.author
            ))
        })?;
        Ok(Transcription {
            id: TranscriptionId(payload.id),
            text: payload.text,
            author: VolunteerId(author),
        })
    }

    async fn mark_cannot_ocr(&self, id: SubmissionId) -> Result<(), WorkflowError> {
        self.patch_json(&format!("/submission/{id}/"), json!({ "cannot_ocr": true }))
            .await
    }

    async fn set_original_comment(
        &self,
        id: TranscriptionId,
        comment: &CommentFullname,
    ) -> Result<(), WorkflowError> {
        self.patch_json(
            &format!("/transcription/{id}/"),
            json!({ "original_id": comment.as_str() }),
        )
        .await
    }
}

// ─── Wire Types ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default)]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct VolunteerPayload {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct SubmissionPayload {
    id: u64,
    tor_url: String,
    #[serde(default)]
    transcription_set: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionPayload {
    id: u64,
    text: String,
    /// URL reference to the authoring volunteer.
    author: String,
}
