//! Forum API error types.
//!
//! Errors carry a kind so callers can pattern-match on the failure class:
//!
//! - **Aged out**: the target no longer accepts replies (archived, locked or
//!   deleted). Terminal for that submission; the poster reports it upstream.
//! - **Rate limited**: the forum asked us to slow down; carries the wait the
//!   API requested.
//! - **Transient**: connectivity problems and server errors; the polling
//!   loop backs off and retries the whole cycle.
//! - **Permanent**: everything else; propagates and terminates the process.

use std::fmt;
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

/// Fallback wait when the forum rate-limits us without a parseable duration.
const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

/// API error codes meaning the target can no longer be replied to.
const AGED_OUT_CODES: &[&str] = &["TOO_OLD", "THREAD_LOCKED", "DELETED_LINK", "DELETED_COMMENT"];

/// The kind of forum API error, categorized for the polling loop's
/// recovery decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForumErrorKind {
    /// The target submission or comment no longer accepts replies.
    AgedOut,

    /// The forum rate-limited the request; wait `retry_after` before the
    /// next attempt.
    RateLimited {
        retry_after: Duration,
    },

    /// Server error, timeout or connection failure; safe to retry later.
    Transient,

    /// Anything else; requires human attention.
    Permanent,
}

/// A forum API error with categorization for recovery decisions.
#[derive(Debug, Error)]
pub struct ForumError {
    /// The kind of error.
    pub kind: ForumErrorKind,

    /// The HTTP status code, if the request got that far.
    pub status_code: Option<u16>,

    /// A human-readable description.
    pub message: String,

    /// The underlying transport error, if any.
    #[source]
    pub source: Option<reqwest::Error>,
}

impl fmt::Display for ForumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "forum API error (HTTP {}): {}", code, self.message),
            None => write!(f, "forum API error: {}", self.message),
        }
    }
}

impl ForumError {
    pub fn aged_out(message: impl Into<String>) -> Self {
        ForumError {
            kind: ForumErrorKind::AgedOut,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn rate_limited(retry_after: Duration, message: impl Into<String>) -> Self {
        ForumError {
            kind: ForumErrorKind::RateLimited { retry_after },
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn transient(message: impl Into<String>) -> Self {
        ForumError {
            kind: ForumErrorKind::Transient,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        ForumError {
            kind: ForumErrorKind::Permanent,
            status_code: None,
            message: message.into(),
            source: None,
        }
    }

    /// Categorizes a transport-level error.
    ///
    /// Timeouts and connection failures are transient; anything else at this
    /// level (TLS setup, malformed URLs) is permanent.
    pub fn from_transport(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() || err.is_connect() || err.is_request() {
            ForumErrorKind::Transient
        } else {
            ForumErrorKind::Permanent
        };
        ForumError {
            kind,
            status_code: err.status().map(|s| s.as_u16()),
            message: err.to_string(),
            source: Some(err),
        }
    }

    /// Categorizes a non-success HTTP status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let kind = match status {
            429 => ForumErrorKind::RateLimited {
                retry_after: DEFAULT_RATE_LIMIT_WAIT,
            },
            500..=599 => ForumErrorKind::Transient,
            _ => ForumErrorKind::Permanent,
        };
        ForumError {
            kind,
            status_code: Some(status),
            message: message.into(),
            source: None,
        }
    }

    /// Categorizes a structured API error (code plus message) from an
    /// otherwise-successful response.
    pub fn from_api_code(code: &str, message: &str) -> Self {
        if AGED_OUT_CODES.contains(&code) {
            return ForumError {
                kind: ForumErrorKind::AgedOut,
                status_code: None,
                message: format!("{code}: {message}"),
                source: None,
            };
        }
        if code == "RATELIMIT" {
            let retry_after = parse_retry_after(message).unwrap_or(DEFAULT_RATE_LIMIT_WAIT);
            return ForumError {
                kind: ForumErrorKind::RateLimited { retry_after },
                status_code: None,
                message: format!("{code}: {message}"),
                source: None,
            };
        }
        ForumError {
            kind: ForumErrorKind::Permanent,
            status_code: None,
            message: format!("{code}: {message}"),
            source: None,
        }
    }

    pub fn is_aged_out(&self) -> bool {
        matches!(self.kind, ForumErrorKind::AgedOut)
    }
}

static RETRY_AFTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)again in (\d+) (second|minute|hour)").unwrap()
});

/// Parses the wait out of a rate-limit message such as
/// "you are doing that too much. try again in 3 minutes.".
pub fn parse_retry_after(message: &str) -> Option<Duration> {
    let caps = RETRY_AFTER.captures(message)?;
    let amount: u64 = caps[1].parse().ok()?;
    let unit_secs = match caps[2].to_ascii_lowercase().as_str() {
        "second" => 1,
        "minute" => 60,
        "hour" => 60 * 60,
        _ => return None,
    };
    Some(Duration::from_secs(amount * unit_secs))
}
