//! Comment composition: wrapping a segment body in the bot footer.
//!
//! The footer identifies the bot and its running version. Its exact wording
//! is a product decision, so the template text comes from configuration; only
//! the placeholder contract is fixed here.

use thiserror::Error;

use super::chunk::CommentSegment;

/// Placeholder replaced with the comment body.
const BODY_PLACEHOLDER: &str = "{body}";

/// Placeholder replaced with the running bot version.
const VERSION_PLACEHOLDER: &str = "{version}";

/// Errors constructing a [`FooterTemplate`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    /// The template has no `{body}` placeholder, so no comment content could
    /// ever be rendered through it.
    #[error("footer template is missing the {{body}} placeholder")]
    MissingBodyPlaceholder,
}

/// A footer disclaimer template, interpolated once with the running version.
///
/// The template is split around its `{body}` placeholder at construction so
/// rendering is a plain concatenation. The chunker calls [`render`] for every
/// candidate line, so this is the hot path of comment composition.
///
/// [`render`]: FooterTemplate::render
#[derive(Debug, Clone)]
pub struct FooterTemplate {
    before: String,
    after: String,
}

impl FooterTemplate {
    /// Builds a template from the configured text and the running version.
    ///
    /// `{version}` may appear any number of times (including zero); `{body}`
    /// must appear exactly once or construction fails.
    pub fn new(template: &str, version: &str) -> Result<Self, TemplateError> {
        let interpolated = template.replace(VERSION_PLACEHOLDER, version);
        let (before, after) = interpolated
            .split_once(BODY_PLACEHOLDER)
            .ok_or(TemplateError::MissingBodyPlaceholder)?;
        Ok(FooterTemplate {
            before: before.to_string(),
            after: after.to_string(),
        })
    }

    /// Wraps a comment body in the footer.
    pub fn render(&self, body: &str) -> String {
        let mut comment =
            String::with_capacity(self.before.len() + body.len() + self.after.len());
        comment.push_str(&self.before);
        comment.push_str(body);
        comment.push_str(&self.after);
        comment
    }
}

/// A ready-to-post comment body: one segment plus the footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedComment {
    body: String,
}

impl ComposedComment {
    pub fn as_str(&self) -> &str {
        &self.body
    }

    /// The comment length in characters, the unit the forum's ceiling is
    /// expressed in.
    pub fn char_len(&self) -> usize {
        self.body.chars().count()
    }
}

/// Composes a single segment into its final comment body.
///
/// Pure; called once per segment in final-segment order before any posting
/// begins, so a posting failure never leaves the composed content ambiguous.
pub fn compose(segment: &CommentSegment, footer: &FooterTemplate) -> ComposedComment {
    ComposedComment {
        body: footer.render(&segment.body()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_version_and_body() {
        let footer = FooterTemplate::new("{body}\n\nbot v{version}", "0.3.0").unwrap();
        assert_eq!(footer.render("hello"), "hello\n\nbot v0.3.0");
    }

    #[test]
    fn template_without_body_placeholder_is_rejected() {
        let err = FooterTemplate::new("no placeholder here v{version}", "0.3.0").unwrap_err();
        assert_eq!(err, TemplateError::MissingBodyPlaceholder);
    }

    #[test]
    fn version_placeholder_is_optional() {
        let footer = FooterTemplate::new("{body} -- a bot", "0.3.0").unwrap();
        assert_eq!(footer.render("x"), "x -- a bot");
    }

    #[test]
    fn char_len_counts_characters_not_bytes() {
        let footer = FooterTemplate::new("{body}", "0.3.0").unwrap();
        let segment = CommentSegment::from_lines(vec!["déjà".to_string()]);
        assert_eq!(compose(&segment, &footer).char_len(), 4);
    }
}
