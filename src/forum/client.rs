//! The forum client interface.
//!
//! The poster, inbox responder and daemon are written against this trait so
//! tests can drive them with scripted clients. The reqwest-backed
//! implementation lives in [`super::reddit`].

use std::future::Future;

use crate::types::{CommentFullname, MessageId};

use super::error::ForumError;

/// Subject the forum gives messages generated by replies to our comments.
const COMMENT_REPLY_SUBJECT: &str = "post reply";

/// One unread inbox message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboxMessage {
    pub id: MessageId,
    pub subject: String,
    pub body: String,
    /// Absent for messages generated by the platform itself.
    pub author: Option<String>,
}

impl InboxMessage {
    /// Whether this message is a reply to one of our comments.
    pub fn is_comment_reply(&self) -> bool {
        self.subject == COMMENT_REPLY_SUBJECT
    }
}

/// Operations the bot needs from the forum.
///
/// All methods return stable, opaque identifiers; threading is expressed by
/// replying to a previously returned identifier.
pub trait ForumClient {
    /// Posts a top-level comment on the submission at `post_url`.
    ///
    /// Fails with the aged-out kind when the submission no longer accepts
    /// replies.
    fn reply_to_submission(
        &self,
        post_url: &str,
        body: &str,
    ) -> impl Future<Output = Result<CommentFullname, ForumError>> + Send;

    /// Posts a reply under an existing comment.
    fn reply_to_comment(
        &self,
        parent: &CommentFullname,
        body: &str,
    ) -> impl Future<Output = Result<CommentFullname, ForumError>> + Send;

    /// Fetches unread inbox messages, newest first (the forum's native
    /// order).
    fn unread_messages(&self) -> impl Future<Output = Result<Vec<InboxMessage>, ForumError>> + Send;

    /// Replies to an inbox message.
    fn reply_to_message(
        &self,
        message: &MessageId,
        body: &str,
    ) -> impl Future<Output = Result<(), ForumError>> + Send;

    /// Marks an inbox message read so it is not processed again.
    fn mark_read(&self, message: &MessageId) -> impl Future<Output = Result<(), ForumError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_reply_detection_uses_the_subject() {
        let message = InboxMessage {
            id: MessageId::new("t4_1"),
            subject: "post reply".to_string(),
            body: "thanks!".to_string(),
            author: Some("someone".to_string()),
        };
        assert!(message.is_comment_reply());

        let direct = InboxMessage {
            subject: "hello there".to_string(),
            ..message
        };
        assert!(!direct.is_comment_reply());
    }
}
