//! The polling loop.
//!
//! One submission is fully resolved, composed and posted before the next is
//! considered; there is no concurrent posting. Transient trouble (rate
//! limits, connectivity) is handled here with sleeps, never inside the
//! composition or posting logic, and never by repairing partial state: an
//! interrupted submission stays pending at the workflow service and is
//! reconsidered on a later cycle. Anything unexpected propagates out and
//! terminates the process.
//!
//! Shutdown is cooperative via a [`CancellationToken`] checked between
//! cycles and between submissions. A reply chain is never interrupted once
//! started.

use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::chain::{ChainOutcome, post_chain};
use crate::compose::compose_comments;
use crate::config::BotContext;
use crate::forum::{ForumClient, ForumError, ForumErrorKind};
use crate::inbox::check_inbox;
use crate::resolve::resolve_own;
use crate::workflow::{PendingSubmission, WorkflowClient, WorkflowError};

/// Extra sleep on top of a parsed rate-limit wait.
const RATE_LIMIT_SLACK: Duration = Duration::from_secs(1);

/// Errors that can escape a polling cycle.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error(transparent)]
    Forum(#[from] ForumError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

/// How the loop recovers from a failed cycle.
#[derive(Debug, PartialEq, Eq)]
enum Recovery {
    /// Sleep, then resume polling; already-posted comments stay posted.
    Backoff(Duration),

    /// Unrecoverable; propagate and terminate.
    Fatal,
}

/// The long-running bot daemon.
pub struct Daemon<W, F> {
    workflow: W,
    forum: F,
    ctx: BotContext,
}

impl<W: WorkflowClient, F: ForumClient> Daemon<W, F> {
    pub fn new(workflow: W, forum: F, ctx: BotContext) -> Self {
        Daemon {
            workflow,
            forum,
            ctx,
        }
    }

    /// Runs the polling loop until the token is cancelled or a fatal error
    /// occurs.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), DaemonError> {
        info!(
            version = %self.ctx.config.version,
            community = %self.ctx.config.community,
            noop = self.ctx.config.noop_mode,
            "polling loop started"
        );

        loop {
            if !self.sleep_or_shutdown(self.ctx.config.poll_delay, &shutdown).await {
                break;
            }

            if self.ctx.config.noop_mode {
                info!("noop cycle");
                continue;
            }

            if let Err(err) = self.run_cycle(&shutdown).await {
                match self.recovery(&err) {
                    Recovery::Backoff(delay) => {
                        warn!(error = %err, delay_secs = delay.as_secs(), "cycle failed, backing off");
                        if !self.sleep_or_shutdown(delay, &shutdown).await {
                            break;
                        }
                    }
                    Recovery::Fatal => {
                        error!(error = %err, "unrecoverable error, stopping");
                        return Err(err);
                    }
                }
            }
        }

        info!("shutdown requested, polling loop stopped");
        Ok(())
    }

    /// One polling cycle: drain the inbox, then process every pending
    /// submission serially.
    async fn run_cycle(&self, shutdown: &CancellationToken) -> Result<(), DaemonError> {
        let replies = check_inbox(
            &self.forum,
            &self.ctx.footer.render(&self.ctx.config.inbox_reply),
            &self.ctx.config.fellow_bots,
        )
        .await?;
        if replies > 0 {
            debug!(replies, "answered inbox messages");
        }

        let pending = self.workflow.pending_submissions().await?;
        if pending.is_empty() {
            debug!("no pending submissions");
            return Ok(());
        }
        info!(count = pending.len(), "retrieved pending submissions");

        for submission in &pending {
            if shutdown.is_cancelled() {
                info!("shutdown requested, leaving remaining submissions for the next run");
                break;
            }
            self.process_submission(submission).await?;
        }

        Ok(())
    }

    /// Processes one submission start to finish: resolve, compose, post,
    /// report upstream.
    async fn process_submission(&self, submission: &PendingSubmission) -> Result<(), DaemonError> {
        let Some(transcription) = resolve_own(&self.workflow, self.ctx.me, submission).await?
        else {
            // The queue should never contain a submission we didn't
            // transcribe; leave it for the service operators to inspect.
            error!(
                submission = %submission.id,
                "queued submission has no transcription of ours, skipping"
            );
            return Ok(());
        };

        if transcription.text.trim().is_empty() {
            warn!(
                submission = %submission.id,
                transcription = %transcription.id,
                "transcription has no content, marking as cannot-OCR"
            );
            self.report_cannot_ocr(submission).await;
            return Ok(());
        }

        let comments = compose_comments(
            &transcription.text,
            &self.ctx.rules,
            &self.ctx.footer,
            self.ctx.config.comment_ceiling,
        );
        let intro = self.ctx.footer.render(&self.ctx.config.intro_message);

        match post_chain(&self.forum, &submission.post_url, &intro, &comments).await? {
            ChainOutcome::AgedOut => {
                info!(submission = %submission.id, "post has aged out, marking as cannot-OCR");
                self.report_cannot_ocr(submission).await;
            }
            ChainOutcome::Posted(chain) => {
                info!(
                    submission = %submission.id,
                    transcription = %transcription.id,
                    comments = chain.len(),
                    "posted transcription chain"
                );
                let Some(original) = chain.first_content() else {
                    error!(submission = %submission.id, "posted chain has no content comment");
                    return Ok(());
                };
                if let Err(err) = self
                    .workflow
                    .set_original_comment(transcription.id, original)
                    .await
                {
                    // The comments are up; failing to record them upstream
                    // must not fail the submission.
                    error!(
                        transcription = %transcription.id,
                        error = %err,
                        "failed to record the original comment id"
                    );
                }
            }
        }

        Ok(())
    }

    async fn report_cannot_ocr(&self, submission: &PendingSubmission) {
        if let Err(err) = self.workflow.mark_cannot_ocr(submission.id).await {
            error!(
                submission = %submission.id,
                error = %err,
                "failed to record cannot-OCR status"
            );
        }
    }

    /// Decides how to recover from a failed cycle.
    fn recovery(&self, err: &DaemonError) -> Recovery {
        match err {
            DaemonError::Forum(forum) => match forum.kind {
                ForumErrorKind::RateLimited { retry_after } => {
                    Recovery::Backoff(retry_after + RATE_LIMIT_SLACK)
                }
                // An aged-out error surfacing here means a target vanished
                // mid-chain; the submission stays pending and is retried.
                ForumErrorKind::Transient | ForumErrorKind::AgedOut => {
                    Recovery::Backoff(self.ctx.config.backoff_delay)
                }
                ForumErrorKind::Permanent => Recovery::Fatal,
            },
            DaemonError::Workflow(workflow) if workflow.is_transient() => {
                Recovery::Backoff(self.ctx.config.backoff_delay)
            }
            DaemonError::Workflow(_) => Recovery::Fatal,
        }
    }

    /// Sleeps unless cancelled first; returns false when shutting down.
    async fn sleep_or_shutdown(&self, delay: Duration, shutdown: &CancellationToken) -> bool {
        tokio::select! {
            _ = shutdown.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BotConfig, BotContext};
    use crate::test_utils::{MockForum, MockWorkflow};
    use crate::types::{CommentFullname, SubmissionId, TranscriptionId, VolunteerId};

    const ME: VolunteerId = VolunteerId(3);
    const OTHER: VolunteerId = VolunteerId(99);

    fn context() -> BotContext {
        let mut config = BotConfig::from_env(false, false);
        config.poll_delay = Duration::from_millis(1);
        BotContext::new(config, ME).unwrap()
    }

    fn daemon(workflow: MockWorkflow, forum: MockForum) -> Daemon<MockWorkflow, MockForum> {
        Daemon::new(workflow, forum, context())
    }

    fn pending(id: u64, refs: &[&str]) -> PendingSubmission {
        PendingSubmission {
            id: SubmissionId(id),
            post_url: "https://x/comments/abc/t/".to_string(),
            transcription_set: refs.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn happy_path_posts_and_reports_the_first_content_comment() {
        let workflow = MockWorkflow::new(ME)
            .with_transcription(1, "a volunteer got here first", OTHER)
            .with_transcription(2, "Transcribed text here.", ME);
        let forum = MockForum::new();
        let daemon = daemon(workflow, forum);

        let submission = pending(
            42,
            &["https://svc/transcription/1/", "https://svc/transcription/2/"],
        );
        daemon.process_submission(&submission).await.unwrap();

        // Intro plus one content comment.
        let posts = daemon.forum.posts();
        assert_eq!(posts.len(), 2);
        assert!(posts[1].body.contains("    Transcribed text here."));

        let recorded = daemon.workflow.original_comments();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].0, TranscriptionId(2));
        // chain[1] is the first content comment, not the intro.
        assert_eq!(recorded[0].1, CommentFullname::new(posts[1].id.as_str()));
        assert!(daemon.workflow.cannot_ocr().is_empty());
    }

    #[tokio::test]
    async fn aged_out_submission_is_marked_cannot_ocr() {
        let workflow = MockWorkflow::new(ME).with_transcription(2, "text", ME);
        let forum = MockForum::new();
        forum.fail_next_submission_reply(ForumError::aged_out("too old"));
        let daemon = daemon(workflow, forum);

        let submission = pending(42, &["https://svc/transcription/2/"]);
        daemon.process_submission(&submission).await.unwrap();

        assert!(daemon.forum.posts().is_empty());
        assert_eq!(daemon.workflow.cannot_ocr(), vec![SubmissionId(42)]);
        assert!(daemon.workflow.original_comments().is_empty());
    }

    #[tokio::test]
    async fn unresolved_submission_is_skipped_without_upstream_writes() {
        let workflow = MockWorkflow::new(ME).with_transcription(1, "not ours", OTHER);
        let daemon = daemon(workflow, MockForum::new());

        let submission = pending(42, &["https://svc/transcription/1/"]);
        daemon.process_submission(&submission).await.unwrap();

        assert!(daemon.forum.posts().is_empty());
        assert!(daemon.workflow.cannot_ocr().is_empty());
        assert!(daemon.workflow.original_comments().is_empty());
    }

    #[tokio::test]
    async fn whitespace_only_transcription_is_marked_cannot_ocr() {
        let workflow = MockWorkflow::new(ME).with_transcription(2, "  \n\t ", ME);
        let daemon = daemon(workflow, MockForum::new());

        let submission = pending(42, &["https://svc/transcription/2/"]);
        daemon.process_submission(&submission).await.unwrap();

        assert!(daemon.forum.posts().is_empty());
        assert_eq!(daemon.workflow.cannot_ocr(), vec![SubmissionId(42)]);
    }

    #[tokio::test]
    async fn mid_chain_failure_leaves_no_upstream_state() {
        let long_text = vec!["line of transcribed text"; 5000].join("\n");
        let workflow = MockWorkflow::new(ME).with_transcription(2, &long_text, ME);
        let forum = MockForum::new();
        forum.fail_comment_reply_number(2, ForumError::transient("connection reset"));
        let daemon = daemon(workflow, forum);

        let submission = pending(42, &["https://svc/transcription/2/"]);
        let err = daemon.process_submission(&submission).await.unwrap_err();

        assert!(matches!(err, DaemonError::Forum(_)));
        assert!(daemon.workflow.cannot_ocr().is_empty());
        assert!(daemon.workflow.original_comments().is_empty());
    }

    #[tokio::test]
    async fn failed_original_id_patch_is_logged_not_fatal() {
        let workflow = MockWorkflow::new(ME)
            .with_transcription(2, "text", ME)
            .fail_next_patch();
        let daemon = daemon(workflow, MockForum::new());

        let submission = pending(42, &["https://svc/transcription/2/"]);
        daemon.process_submission(&submission).await.unwrap();

        // The chain was still posted.
        assert_eq!(daemon.forum.posts().len(), 2);
    }

    #[test]
    fn recovery_classification() {
        let daemon = daemon(MockWorkflow::new(ME), MockForum::new());

        let rate_limited = DaemonError::Forum(ForumError::rate_limited(
            Duration::from_secs(120),
            "slow down",
        ));
        assert_eq!(
            daemon.recovery(&rate_limited),
            Recovery::Backoff(Duration::from_secs(121))
        );

        let transient = DaemonError::Forum(ForumError::transient("reset"));
        assert_eq!(
            daemon.recovery(&transient),
            Recovery::Backoff(daemon.ctx.config.backoff_delay)
        );

        let permanent = DaemonError::Forum(ForumError::permanent("forbidden"));
        assert_eq!(daemon.recovery(&permanent), Recovery::Fatal);

        let workflow_down = DaemonError::Workflow(WorkflowError::Api {
            status: 503,
            message: String::new(),
        });
        assert_eq!(
            daemon.recovery(&workflow_down),
            Recovery::Backoff(daemon.ctx.config.backoff_delay)
        );

        let workflow_broken = DaemonError::Workflow(WorkflowError::Payload("bad".to_string()));
        assert_eq!(daemon.recovery(&workflow_broken), Recovery::Fatal);
    }

    #[tokio::test]
    async fn cancelled_token_stops_the_loop() {
        let daemon = daemon(MockWorkflow::new(ME), MockForum::new());
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        daemon.run(shutdown).await.unwrap();
    }
}
