//! Model version identifiers.
//!
//! A version id is `v{yyyymmddHHMMSS}-{revision}` where the timestamp is UTC and
//! the revision is the first seven characters of the source revision. Ids are
//! unique without a central counter, sort lexically in registration order and
//! say which revision produced them.

use chrono::{DateTime, Utc};

const SHORT_REVISION_LEN: usize = 7;
const UNKNOWN_REVISION: &str = "unknown";

/// Build the version id for a model trained from `source_revision` at `at`.
pub fn generate(at: DateTime<Utc>, source_revision: &str) -> String {
    let short: String = source_revision
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .take(SHORT_REVISION_LEN)
        .collect();
    let short = if short.is_empty() {
        UNKNOWN_REVISION.to_string()
    } else {
        short
    };
    format!("v{}-{}", at.format("%Y%m%d%H%M%S"), short)
}
