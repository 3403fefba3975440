//! Splitting a formatted block into size-bounded comment segments.
//!
//! The forum rejects comments over a hard character limit, and the footer
//! appended to every comment consumes part of that budget. The chunker
//! therefore measures the *composed* comment (segment plus footer), not the
//! raw segment, and keeps every composed comment strictly under the
//! configured ceiling.

use super::footer::FooterTemplate;

/// An ordered run of lines from the formatted block.
///
/// Concatenating the lines of all segments, in order, reconstructs the
/// formatted block exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentSegment {
    lines: Vec<String>,
}

impl CommentSegment {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// The segment content as a single newline-joined body.
    pub fn body(&self) -> String {
        self.lines.join("\n")
    }

    #[cfg(test)]
    pub(crate) fn from_lines(lines: Vec<String>) -> Self {
        CommentSegment { lines }
    }
}

/// Splits a formatted block into segments whose composed comments stay
/// strictly under `ceiling` characters.
///
/// Lines are accumulated greedily: a line joins the current segment only if
/// the fully composed comment would still measure under the ceiling.
/// Otherwise the segment is closed and the line starts the next one.
///
/// A single line whose composed comment alone exceeds the ceiling is still
/// emitted as its own segment; lines are never split and never dropped. The
/// forum may reject that one comment, which is preferable to corrupting the
/// transcription.
///
/// Empty input yields exactly one segment holding one empty line.
pub fn split_into_segments(
    block: &str,
    footer: &FooterTemplate,
    ceiling: usize,
) -> Vec<CommentSegment> {
    let mut segments = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in block.split('\n') {
        if !current.is_empty() && !fits(&current, line, footer, ceiling) {
            segments.push(CommentSegment {
                lines: std::mem::take(&mut current),
            });
        }
        current.push(line.to_string());
    }

    // The last segment is always emitted, even for empty input.
    segments.push(CommentSegment { lines: current });
    segments
}

/// Whether `candidate` still fits in the segment once the footer is applied.
fn fits(current: &[String], candidate: &str, footer: &FooterTemplate, ceiling: usize) -> bool {
    let body = format!("{}\n{}", current.join("\n"), candidate);
    footer.render(&body).chars().count() < ceiling
}
