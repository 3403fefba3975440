//! Turning raw transcription text into ready-to-post forum comments.
//!
//! The pipeline is: escape forum markup, lay the text out as a literal
//! block, split the block into segments that fit under the comment ceiling
//! once the footer is applied, and compose each segment with the footer.
//!
//! Everything here is pure; posting lives in [`crate::chain`].

pub mod chunk;
pub mod escape;
pub mod footer;

pub use chunk::{CommentSegment, split_into_segments};
pub use escape::{EscapeRules, code_block, escape_formatting};
pub use footer::{ComposedComment, FooterTemplate, TemplateError, compose};

/// Runs the full composition pipeline over one transcription.
///
/// Returns at least one comment; empty input composes to a single minimal
/// comment (callers that want to skip empty transcriptions check before
/// composing).
pub fn compose_comments(
    text: &str,
    rules: &EscapeRules,
    footer: &FooterTemplate,
    ceiling: usize,
) -> Vec<ComposedComment> {
    let block = code_block(&escape_formatting(text, rules));
    split_into_segments(&block, footer, ceiling)
        .iter()
        .map(|segment| compose(segment, footer))
        .collect()
}
