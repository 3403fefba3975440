//! Shared scripted clients for tests.
//!
//! `MockForum` and `MockWorkflow` record every call so tests can assert on
//! ordering, threading and upstream writes, and can be scripted to fail a
//! specific call to exercise the error paths.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::forum::{ForumClient, ForumError, InboxMessage};
use crate::types::{CommentFullname, MessageId, SubmissionId, TranscriptionId, VolunteerId};
use crate::workflow::{PendingSubmission, Transcription, WorkflowClient, WorkflowError};

/// One comment created through the mock forum.
#[derive(Debug, Clone)]
pub(crate) struct RecordedPost {
    /// The submission URL or parent comment fullname targeted.
    pub parent: String,
    pub body: String,
    /// The fullname the mock handed back.
    pub id: CommentFullname,
}

#[derive(Default)]
pub(crate) struct MockForum {
    posts: Mutex<Vec<RecordedPost>>,
    unread: Mutex<Vec<InboxMessage>>,
    message_replies: Mutex<Vec<(MessageId, String)>>,
    read: Mutex<Vec<MessageId>>,
    fail_submission_reply: Mutex<Option<ForumError>>,
    /// Fail the nth call to `reply_to_comment` (1-based).
    fail_comment_reply: Mutex<Option<(usize, ForumError)>>,
    comment_reply_calls: AtomicUsize,
    next_id: AtomicUsize,
}

impl MockForum {
    pub fn new() -> Self {
        MockForum::default()
    }

    pub fn posts(&self) -> Vec<RecordedPost> {
        self.posts.lock().unwrap().clone()
    }

    pub fn message_replies(&self) -> Vec<(MessageId, String)> {
        self.message_replies.lock().unwrap().clone()
    }

    pub fn read_messages(&self) -> Vec<MessageId> {
        self.read.lock().unwrap().clone()
    }

    pub fn set_unread(&self, messages: Vec<InboxMessage>) {
        *self.unread.lock().unwrap() = messages;
    }

    pub fn fail_next_submission_reply(&self, err: ForumError) {
        *self.fail_submission_reply.lock().unwrap() = Some(err);
    }

    pub fn fail_comment_reply_number(&self, call: usize, err: ForumError) {
        *self.fail_comment_reply.lock().unwrap() = Some((call, err));
    }

    fn record(&self, parent: String, body: &str) -> CommentFullname {
        let id = CommentFullname::new(format!(
            "t1_{:04}",
            self.next_id.fetch_add(1, Ordering::SeqCst)
        ));
        self.posts.lock().unwrap().push(RecordedPost {
            parent,
            body: body.to_string(),
            id: id.clone(),
        });
        id
    }
}

impl ForumClient for MockForum {
    async fn reply_to_submission(
        &self,
        post_url: &str,
        body: &str,
    ) -> Result<CommentFullname, ForumError> {
        if let Some(err) = self.fail_submission_reply.lock().unwrap().take() {
            return Err(err);
        }
        Ok(self.record(post_url.to_string(), body))
    }

    async fn reply_to_comment(
        &self,
        parent: &CommentFullname,
        body: &str,
    ) -> Result<CommentFullname, ForumError> {
        let call = self.comment_reply_calls.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut scripted = self.fail_comment_reply.lock().unwrap();
            if scripted.as_ref().is_some_and(|(at, _)| *at == call) {
                let (_, err) = scripted.take().unwrap();
                return Err(err);
            }
        }
        Ok(self.record(parent.as_str().to_string(), body))
    }

    async fn unread_messages(&self) -> Result<Vec<InboxMessage>, ForumError> {
        Ok(self.unread.lock().unwrap().clone())
    }

    async fn reply_to_message(&self, message: &MessageId, body: &str) -> Result<(), ForumError> {
        self.message_replies
            .lock()
            .unwrap()
            .push((message.clone(), body.to_string()));
        Ok(())
    }

    async fn mark_read(&self, message: &MessageId) -> Result<(), ForumError> {
        self.read.lock().unwrap().push(message.clone());
        Ok(())
    }
}

pub(crate) struct MockWorkflow {
    me: VolunteerId,
    pending: Vec<PendingSubmission>,
    transcriptions: HashMap<u64, Transcription>,
    cannot_ocr: Mutex<Vec<SubmissionId>>,
    original: Mutex<Vec<(TranscriptionId, CommentFullname)>>,
    fail_patch: Mutex<Option<WorkflowError>>,
}

impl MockWorkflow {
    pub fn new(me: VolunteerId) -> Self {
        MockWorkflow {
            me,
            pending: Vec::new(),
            transcriptions: HashMap::new(),
            cannot_ocr: Mutex::new(Vec::new()),
            original: Mutex::new(Vec::new()),
            fail_patch: Mutex::new(None),
        }
    }

    pub fn with_transcription(mut self, id: u64, text: &str, author: VolunteerId) -> Self {
        self.transcriptions.insert(
            id,
            Transcription {
                id: TranscriptionId(id),
                text: text.to_string(),
                author,
            },
        );
        self
    }

    /// Fails the next patch call (`mark_cannot_ocr` or
    /// `set_original_comment`) with a server error.
    pub fn fail_next_patch(self) -> Self {
        *self.fail_patch.lock().unwrap() = Some(WorkflowError::Api {
            status: 500,
            message: "scripted failure".to_string(),
        });
        self
    }

    pub fn cannot_ocr(&self) -> Vec<SubmissionId> {
        self.cannot_ocr.lock().unwrap().clone()
    }

    pub fn original_comments(&self) -> Vec<(TranscriptionId, CommentFullname)> {
        self.original.lock().unwrap().clone()
    }
}

impl WorkflowClient for MockWorkflow {
    async fn me(&self, _username: &str) -> Result<VolunteerId, WorkflowError> {
        Ok(self.me)
    }

    async fn pending_submissions(&self) -> Result<Vec<PendingSubmission>, WorkflowError> {
        Ok(self.pending.clone())
    }

    async fn get_transcription(&self, id: TranscriptionId) -> Result<Transcription, WorkflowError> {
        self.transcriptions
            .get(&id.0)
            .cloned()
            .ok_or_else(|| WorkflowError::Payload(format!("unknown transcription {id}")))
    }

    async fn mark_cannot_ocr(&self, id: SubmissionId) -> Result<(), WorkflowError> {
        if let Some(err) = self.fail_patch.lock().unwrap().take() {
            return Err(err);
        }
        self.cannot_ocr.lock().unwrap().push(id);
        Ok(())
    }

    async fn set_original_comment(
        &self,
        id: TranscriptionId,
        comment: &CommentFullname,
    ) -> Result<(), WorkflowError> {
        if let Some(err) = self.fail_patch.lock().unwrap().take() {
            return Err(err);
        }
        self.original.lock().unwrap().push((id, comment.clone()));
        Ok(())
    }
}
