//! Forum (Reddit) API surface: the client trait, error categorization and
//! the reqwest-backed implementation.

pub mod client;
pub mod error;
pub mod reddit;

pub use client::{ForumClient, InboxMessage};
pub use error::{ForumError, ForumErrorKind, parse_retry_after};
pub use reddit::{RedditClient, RedditCredentials};
