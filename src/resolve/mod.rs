//! Picking the bot's own transcription out of a submission's attachments.
//!
//! A queued submission usually carries exactly one transcription, but a
//! human volunteer may have transcribed the same post independently, in
//! which case ours has to be dug out of the pile by authorship.

use tracing::{debug, warn};

use crate::types::{TranscriptionId, VolunteerId};
use crate::workflow::{PendingSubmission, Transcription, WorkflowClient, WorkflowError, trailing_id};

/// Resolves the transcription authored by this bot, if any.
///
/// Fetches the submission's transcription references in order and returns
/// the first one whose author matches `me`. `None` means the workflow
/// service queued a submission without our transcription attached, which is
/// an upstream inconsistency; the caller logs and skips the submission.
pub async fn resolve_own<W: WorkflowClient>(
    workflow: &W,
    me: VolunteerId,
    submission: &PendingSubmission,
) -> Result<Option<Transcription>, WorkflowError> {
    for reference in &submission.transcription_set {
        let Some(id) = trailing_id(reference) else {
            warn!(
                submission = %submission.id,
                reference,
                "skipping transcription reference without a numeric id"
            );
            continue;
        };

        let transcription = workflow.get_transcription(TranscriptionId(id)).await?;
        if transcription.author == me {
            debug!(
                submission = %submission.id,
                transcription = %transcription.id,
                "found our own transcription"
            );
            return Ok(Some(transcription));
        }
    }

    Ok(None)
}
