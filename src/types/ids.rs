//! Newtype wrappers for domain identifiers.
//!
//! These types prevent accidental mixing of different ID types (e.g., using a
//! `TranscriptionId` where a `SubmissionId` is expected) and make the code more
//! self-documenting. Workflow-service identifiers are numeric; forum
//! identifiers are opaque fullname strings.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A workflow-service submission identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub u64);

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SubmissionId {
    fn from(n: u64) -> Self {
        SubmissionId(n)
    }
}

/// A workflow-service transcription identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranscriptionId(pub u64);

impl fmt::Display for TranscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TranscriptionId {
    fn from(n: u64) -> Self {
        TranscriptionId(n)
    }
}

/// A workflow-service volunteer (account) identifier.
///
/// The bot itself is registered as a volunteer; the resolver compares
/// transcription authorship against this id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VolunteerId(pub u64);

impl fmt::Display for VolunteerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for VolunteerId {
    fn from(n: u64) -> Self {
        VolunteerId(n)
    }
}

/// A forum comment identifier in fullname form (e.g. `t1_abc123`).
///
/// The forum treats these as opaque and stable; we never parse the contents.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentFullname(pub String);

impl CommentFullname {
    pub fn new(s: impl Into<String>) -> Self {
        CommentFullname(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommentFullname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for CommentFullname {
    fn from(s: String) -> Self {
        CommentFullname(s)
    }
}

impl From<&str> for CommentFullname {
    fn from(s: &str) -> Self {
        CommentFullname(s.to_string())
    }
}

/// A forum inbox-message identifier in fullname form (e.g. `t4_abc123`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(s: impl Into<String>) -> Self {
        MessageId(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        MessageId(s.to_string())
    }
}
