//! Access-scope alias table
//!
//! Fixed bidirectional mapping between short scope mnemonics and the
//! long-form OAuth scope URIs Compute Engine stores. Unknown strings pass
//! through unchanged in both directions.

/// The short-form aliases the gcloud tooling accepts, paired with their URIs.
const SCOPE_ALIASES: &[(&str, &str)] = &[
    ("storage-ro", "https://www.googleapis.com/auth/devstorage.read_only"),
    ("storage-rw", "https://www.googleapis.com/auth/devstorage.read_write"),
    ("compute-ro", "https://www.googleapis.com/auth/compute.read_only"),
    ("compute-rw", "https://www.googleapis.com/auth/compute"),
    ("monitoring", "https://www.googleapis.com/auth/monitoring"),
    ("monitoring-write", "https://www.googleapis.com/auth/monitoring.write"),
    ("logging-write", "https://www.googleapis.com/auth/logging.write"),
];

/// Expand a scope alias to its long-form URI; passthrough if unknown.
pub fn to_long_form(scope: &str) -> &str {
    SCOPE_ALIASES
        .iter()
        .find(|(alias, _)| *alias == scope)
        .map(|(_, uri)| *uri)
        .unwrap_or(scope)
}

/// Shorten a long-form URI to its alias; passthrough if unmatched.
pub fn to_short_form(scope: &str) -> &str {
    SCOPE_ALIASES
        .iter()
        .find(|(_, uri)| *uri == scope)
        .map(|(alias, _)| *alias)
        .unwrap_or(scope)
}
