//! Responding to inbox messages.
//!
//! People reply to the bot's comments; the bot cannot hold a conversation,
//! so comment replies get a fixed acknowledgement. Messages from the
//! platform itself (no author) and from the operator's other bots are logged
//! and skipped. Every message is marked read exactly once so the next cycle
//! starts from a clean inbox.

use tracing::{debug, info};

use crate::forum::{ForumClient, ForumError};

/// Drains the unread inbox, replying to comment replies.
///
/// Messages are processed oldest-first so threads read in order. Returns
/// the number of replies sent.
pub async fn check_inbox<F: ForumClient>(
    forum: &F,
    reply_body: &str,
    fellow_bots: &[String],
) -> Result<usize, ForumError> {
    // The forum lists newest first; invert so we answer in arrival order.
    let mut messages = forum.unread_messages().await?;
    messages.reverse();

    let mut replies = 0;
    for message in messages {
        match &message.author {
            None => {
                // Platform notifications have no author and need no answer.
                info!(subject = %message.subject, "inbox message without an author, skipping");
            }
            Some(author) if is_fellow_bot(author, fellow_bots) => {
                info!(%author, "ignoring a message from one of our bots");
            }
            Some(author) => {
                if message.is_comment_reply() {
                    forum.reply_to_message(&message.id, reply_body).await?;
                    replies += 1;
                } else {
                    debug!(%author, subject = %message.subject, "leaving non-reply message unanswered");
                }
            }
        }

        forum.mark_read(&message.id).await?;
    }

    Ok(replies)
}

fn is_fellow_bot(author: &str, fellow_bots: &[String]) -> bool {
    fellow_bots.iter().any(|bot| bot.eq_ignore_ascii_case(author))
}
