//! Core domain types for the transcription bot.

pub mod ids;

// Re-export commonly used types at the module level
pub use ids::{CommentFullname, MessageId, SubmissionId, TranscriptionId, VolunteerId};
