//! Workflow-service surface: queue items, transcription records, the client
//! trait and the reqwest-backed implementation.
//!
//! The service tracks which submissions have a machine transcription ready
//! and records where the posted transcription ended up. Its REST identifiers
//! are URLs whose final path segment is the numeric id.

pub mod blossom;
pub mod error;

use std::future::Future;

use crate::types::{CommentFullname, SubmissionId, TranscriptionId, VolunteerId};

pub use blossom::BlossomClient;
pub use error::WorkflowError;

/// One pending work item from the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSubmission {
    pub id: SubmissionId,
    /// URL of the forum post the transcription belongs under.
    pub post_url: String,
    /// URLs of the transcriptions attached to this submission. Usually one,
    /// but a volunteer may have raced us.
    pub transcription_set: Vec<String>,
}

/// A fetched transcription record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transcription {
    pub id: TranscriptionId,
    pub text: String,
    pub author: VolunteerId,
}

/// Operations the bot needs from the workflow service.
pub trait WorkflowClient {
    /// Looks up the volunteer id registered for the given username.
    fn me(&self, username: &str) -> impl Future<Output = Result<VolunteerId, WorkflowError>> + Send;

    /// Fetches the queue of submissions awaiting a posted transcription.
    fn pending_submissions(
        &self,
    ) -> impl Future<Output = Result<Vec<PendingSubmission>, WorkflowError>> + Send;

    /// Fetches one transcription record.
    fn get_transcription(
        &self,
        id: TranscriptionId,
    ) -> impl Future<Output = Result<Transcription, WorkflowError>> + Send;

    /// Marks a submission as impossible to transcribe (target gone or
    /// nothing to post).
    fn mark_cannot_ocr(
        &self,
        id: SubmissionId,
    ) -> impl Future<Output = Result<(), WorkflowError>> + Send;

    /// Records the forum comment that starts the posted transcription.
    fn set_original_comment(
        &self,
        id: TranscriptionId,
        comment: &CommentFullname,
    ) -> impl Future<Output = Result<(), WorkflowError>> + Send;
}

/// Extracts the numeric id from the end of a service URL, tolerating a
/// trailing slash (`https://svc/transcription/123/` yields 123).
pub fn trailing_id(url: &str) -> Option<u64> {
    let end = url.find(['?', '#']).unwrap_or(url.len());
    url[..end]
        .split('/')
        .rev()
        .find(|segment| !segment.is_empty())?
        .parse()
        .ok()
}
