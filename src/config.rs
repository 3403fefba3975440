//! Bot configuration and the startup context.
//!
//! All configuration is resolved once at startup: [`BotConfig::from_env`]
//! reads the environment, and [`BotContext::new`] derives everything the
//! components need (compiled escape rules, the interpolated footer, the
//! debug-vs-production community) as plain fields. Components receive the
//! context by reference; there is no ambient global state.

use std::time::Duration;

use thiserror::Error;

use crate::compose::{EscapeRules, FooterTemplate, TemplateError};
use crate::types::VolunteerId;

/// Character ceiling for a composed comment. The forum's documented hard
/// limit is 10000; operating well under it absorbs footer overhead and
/// renderer discrepancies.
pub const DEFAULT_COMMENT_CEILING: usize = 9_000;

/// Autolinked name prefixes on Reddit: user and subreddit mentions.
pub const DEFAULT_AUTOLINK_PREFIXES: &str = "ur";

const DEFAULT_BOT_USERNAME: &str = "transcribot";

/// Delay at the top of each polling cycle.
const DEFAULT_POLL_DELAY_SECS: u64 = 2;

/// Sleep after a transient connectivity failure before the next cycle.
const DEFAULT_BACKOFF_SECS: u64 = 60;

/// Community the bot works in; the debug variant keeps test chatter out of
/// the production queue.
const PROD_COMMUNITY: &str = "TranscribersOfReddit";
const DEBUG_COMMUNITY: &str = "TranscribersOfRedditTest";

/// Accounts whose inbox messages are never answered (our own fleet).
const DEFAULT_FELLOW_BOTS: &[&str] = &["transcribersofreddit", "transcribot", "tor_archivist"];

const DEFAULT_FOOTER_TEMPLATE: &str = "{body}\n\n---\n\n\
    *This is an automatic transcription (bot v{version}). \
    If something looks wrong, please message the moderators.*";

const DEFAULT_INTRO_MESSAGE: &str = "Hi, I'm a transcription bot! \
    The text of the linked post follows in the replies below.";

const DEFAULT_INBOX_REPLY: &str = "Thanks for the reply! I'm only a bot, so I can't \
    respond to messages. If you need help, please message the moderators.";

/// A required environment variable was not set.
#[derive(Debug, Error)]
#[error("missing required environment variable {0}")]
pub struct MissingVar(pub &'static str);

/// Reads a required environment variable.
pub fn require_env(name: &'static str) -> Result<String, MissingVar> {
    std::env::var(name).map_err(|_| MissingVar(name))
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn env_secs_or(name: &str, default: u64) -> Duration {
    let secs = std::env::var(name)
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(default);
    Duration::from_secs(secs)
}

/// Static bot configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub bot_username: String,
    /// The running bot version, interpolated into the footer.
    pub version: String,
    /// The community the bot operates in (debug or production variant).
    pub community: String,
    pub fellow_bots: Vec<String>,
    pub comment_ceiling: usize,
    pub autolink_prefixes: String,
    pub footer_template: String,
    pub intro_message: String,
    pub inbox_reply: String,
    pub poll_delay: Duration,
    pub backoff_delay: Duration,
    pub debug_mode: bool,
    pub noop_mode: bool,
}

impl BotConfig {
    /// Builds the configuration from `TRANSCRIBOT_*` environment variables,
    /// falling back to defaults.
    pub fn from_env(debug_mode: bool, noop_mode: bool) -> Self {
        let community = if debug_mode {
            DEBUG_COMMUNITY
        } else {
            PROD_COMMUNITY
        };

        BotConfig {
            bot_username: env_or("TRANSCRIBOT_USERNAME", DEFAULT_BOT_USERNAME),
            version: env!("CARGO_PKG_VERSION").to_string(),
            community: env_or("TRANSCRIBOT_COMMUNITY", community),
            fellow_bots: DEFAULT_FELLOW_BOTS.iter().map(|s| s.to_string()).collect(),
            comment_ceiling: DEFAULT_COMMENT_CEILING,
            autolink_prefixes: env_or("TRANSCRIBOT_AUTOLINK_PREFIXES", DEFAULT_AUTOLINK_PREFIXES),
            footer_template: env_or("TRANSCRIBOT_FOOTER", DEFAULT_FOOTER_TEMPLATE),
            intro_message: env_or("TRANSCRIBOT_INTRO", DEFAULT_INTRO_MESSAGE),
            inbox_reply: env_or("TRANSCRIBOT_INBOX_REPLY", DEFAULT_INBOX_REPLY),
            poll_delay: env_secs_or("TRANSCRIBOT_POLL_DELAY_SECS", DEFAULT_POLL_DELAY_SECS),
            backoff_delay: env_secs_or("TRANSCRIBOT_BACKOFF_SECS", DEFAULT_BACKOFF_SECS),
            debug_mode,
            noop_mode,
        }
    }

    /// The User-Agent string the forum requires from API clients.
    pub fn user_agent(&self) -> String {
        format!(
            "bot:{}:v{} (for r/{})",
            self.bot_username, self.version, self.community
        )
    }
}

/// Errors deriving the startup context from the configuration.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("invalid autolink prefix configuration: {0}")]
    AutolinkPrefixes(#[from] regex::Error),

    #[error("invalid footer template: {0}")]
    Footer(#[from] TemplateError),
}

/// Everything the components need, derived once from the configuration.
#[derive(Debug, Clone)]
pub struct BotContext {
    pub config: BotConfig,
    /// The bot's own volunteer id at the workflow service.
    pub me: VolunteerId,
    pub rules: EscapeRules,
    pub footer: FooterTemplate,
}

impl BotContext {
    pub fn new(config: BotConfig, me: VolunteerId) -> Result<Self, ContextError> {
        let rules = EscapeRules::new(&config.autolink_prefixes)?;
        let footer = FooterTemplate::new(&config.footer_template, &config.version)?;
        Ok(BotContext {
            config,
            me,
            rules,
            footer,
        })
    }
}
