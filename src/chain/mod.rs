//! Posting a transcription as a linear chain of threaded replies.
//!
//! A long transcription becomes several comments. Posting them all as
//! top-level replies would let the forum's threading scatter them, so each
//! comment replies to the immediately preceding one: an intro comment under
//! the submission, then every content comment chained under its predecessor.
//!
//! The chain records every created identifier in order. Index 0 is the
//! intro; index 1 is the first content comment, which is what gets reported
//! upstream as the transcription's `original_id`.

use tracing::{debug, info};

use crate::compose::ComposedComment;
use crate::forum::{ForumClient, ForumError};
use crate::types::CommentFullname;

/// The ordered identifiers of one posted reply chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentChain {
    ids: Vec<CommentFullname>,
}

impl CommentChain {
    /// All created identifiers in creation order, intro first.
    pub fn ids(&self) -> &[CommentFullname] {
        &self.ids
    }

    /// The first content comment (chain index 1), reported upstream as the
    /// transcription's original comment.
    pub fn first_content(&self) -> Option<&CommentFullname> {
        self.ids.get(1)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// The result of attempting to post a chain.
#[derive(Debug)]
pub enum ChainOutcome {
    /// Every comment was created; the chain holds all identifiers.
    Posted(CommentChain),

    /// The submission no longer accepts replies; nothing was posted.
    AgedOut,
}

/// Posts the intro comment and then every composed comment as a reply to
/// its predecessor.
///
/// An aged-out failure on the intro abandons the chain cleanly (no content
/// was posted). Any later failure propagates with the chain partially
/// posted; the forum offers no way to retract the created comments
/// atomically, so they are left in place and the caller decides whether to
/// retry the submission in a later cycle.
pub async fn post_chain<F: ForumClient>(
    forum: &F,
    post_url: &str,
    intro_body: &str,
    comments: &[ComposedComment],
) -> Result<ChainOutcome, ForumError> {
    let intro = match forum.reply_to_submission(post_url, intro_body).await {
        Ok(id) => id,
        Err(err) if err.is_aged_out() => {
            info!(post_url, "submission no longer accepts replies");
            return Ok(ChainOutcome::AgedOut);
        }
        Err(err) => return Err(err),
    };
    debug!(post_url, intro = %intro, "posted intro comment");

    let mut ids = Vec::with_capacity(comments.len() + 1);
    let mut parent = intro;
    ids.push(parent.clone());

    for comment in comments {
        parent = forum.reply_to_comment(&parent, comment.as_str()).await?;
        ids.push(parent.clone());
    }

    debug!(post_url, comments = ids.len(), "posted full chain");
    Ok(ChainOutcome::Posted(CommentChain { ids }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{EscapeRules, FooterTemplate, compose_comments};
    use crate::test_utils::MockForum;

    fn composed(count: usize) -> Vec<ComposedComment> {
        // Sized so each line starts a new segment under a small ceiling.
        let footer = FooterTemplate::new("{body}", "0.0.0").unwrap();
        let text = vec!["x".repeat(30); count].join("\n");
        let comments = compose_comments(&text, &EscapeRules::default(), &footer, 40);
        assert_eq!(comments.len(), count);
        comments
    }

    #[tokio::test]
    async fn posts_intro_plus_every_comment_in_order() {
        let forum = MockForum::new();
        let comments = composed(3);

        let outcome = post_chain(&forum, "https://x/comments/abc/t/", "intro", &comments)
            .await
            .unwrap();

        let ChainOutcome::Posted(chain) = outcome else {
            panic!("expected a posted chain");
        };
        assert_eq!(chain.len(), 4);

        let posts = forum.posts();
        assert_eq!(posts.len(), 4);
        // The intro targets the submission itself.
        assert_eq!(posts[0].parent, "https://x/comments/abc/t/");
        assert_eq!(posts[0].body, "intro");
        // Every content comment targets the previously created comment.
        for i in 1..posts.len() {
            assert_eq!(posts[i].parent, posts[i - 1].id.as_str());
        }
        // The reported identifiers match creation order.
        for (id, post) in chain.ids().iter().zip(&posts) {
            assert_eq!(id, &post.id);
        }
    }

    #[tokio::test]
    async fn first_content_is_chain_index_one() {
        let forum = MockForum::new();
        let comments = composed(2);

        let ChainOutcome::Posted(chain) =
            post_chain(&forum, "https://x/comments/abc/t/", "intro", &comments)
                .await
                .unwrap()
        else {
            panic!("expected a posted chain");
        };

        assert_eq!(chain.first_content(), Some(&chain.ids()[1]));
        assert_ne!(chain.first_content(), Some(&chain.ids()[0]));
    }

    #[tokio::test]
    async fn aged_out_intro_posts_nothing() {
        let forum = MockForum::new();
        forum.fail_next_submission_reply(ForumError::aged_out("too old"));
        let comments = composed(3);

        let outcome = post_chain(&forum, "https://x/comments/abc/t/", "intro", &comments)
            .await
            .unwrap();

        assert!(matches!(outcome, ChainOutcome::AgedOut));
        assert!(forum.posts().is_empty());
    }

    #[tokio::test]
    async fn non_aged_out_intro_failure_propagates() {
        let forum = MockForum::new();
        forum.fail_next_submission_reply(ForumError::transient("connection reset"));
        let comments = composed(1);

        let err = post_chain(&forum, "https://x/comments/abc/t/", "intro", &comments)
            .await
            .unwrap_err();

        assert!(!err.is_aged_out());
    }

    #[tokio::test]
    async fn mid_chain_failure_propagates_and_keeps_earlier_posts() {
        let forum = MockForum::new();
        forum.fail_comment_reply_number(2, ForumError::transient("connection reset"));
        let comments = composed(3);

        post_chain(&forum, "https://x/comments/abc/t/", "intro", &comments)
            .await
            .unwrap_err();

        // The intro and the first content comment were created and stay.
        assert_eq!(forum.posts().len(), 2);
    }
}
