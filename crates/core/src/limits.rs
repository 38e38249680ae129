//! Size limits and tolerances for event ingestion.
//!
//! # Usage Note
//!
//! Constants used at runtime: `MAX_EVENT_SIZE_BYTES`, `MAX_FUTURE_SKEW_SECS`,
//! `MAX_EVENT_AGE_HOURS`, and the top-N/recent-N query constants.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so field limits are duplicated there. Keep both in sync when modifying.

// === Payload Limits ===

/// Maximum ingestion body size in bytes (32KB).
///
/// One event per request; custom event properties are the only
/// open-ended part of the payload.
pub const MAX_EVENT_SIZE_BYTES: usize = 32 * 1024;

// === Timestamp Tolerances ===

/// Client timestamps further in the future than this are clamped to the
/// server receipt time (seconds).
pub const MAX_FUTURE_SKEW_SECS: i64 = 5;

/// Client timestamps older than this are clamped to the server receipt
/// time (hours).
pub const MAX_EVENT_AGE_HOURS: i64 = 24;

// === String Field Limits (chars) ===

/// Full page URL max length.
pub const MAX_URL_LEN: usize = 2048;

/// URL path max length.
pub const MAX_PATH_LEN: usize = 2000;

/// Page title max length.
pub const MAX_TITLE_LEN: usize = 500;

/// Referrer URL max length.
/// Matches HTTP Referer header limit.
pub const MAX_REFERRER_LEN: usize = 2048;

/// User agent string max length.
/// Browser UAs: 100-300 typical, 500+ with extensions.
pub const MAX_USER_AGENT_LEN: usize = 512;

/// Visitor/session identifier max length.
pub const MAX_IDENTITY_LEN: usize = 128;

/// Error message max length.
pub const MAX_ERROR_MESSAGE_LEN: usize = 1000;

/// Error stack trace max length.
pub const MAX_STACK_LEN: usize = 4000;

/// Timezone identifier max length.
/// IANA names like "America/Los_Angeles" are ~25 chars.
pub const MAX_TIMEZONE_LEN: usize = 64;

/// Language tag max length.
/// BCP 47 tags like "en-US" are ~5 chars.
pub const MAX_LANGUAGE_LEN: usize = 16;

// === Query Constants ===

/// Entries returned in top-N lists (pages, referrers, clicked elements).
pub const TOP_ITEMS: usize = 10;

/// Most recent error messages included in a snapshot.
pub const RECENT_ERRORS: usize = 5;

/// Most recent events included in a snapshot.
pub const RECENT_EVENTS: usize = 20;
