//! Player Join Links
//!
//! Resolves the absolute URL of the player-facing page. Turning that URL
//! into a scannable image is left to whatever serves the page.

/// Absolute URL of the player page served at `path` on `host`.
///
/// `host` may carry a port. Missing or doubled slashes in `path` are
/// normalized.
pub fn join_url(scheme: &str, host: &str, path: &str) -> String {
    let host = host.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}://{}/{}", scheme, host, path)
}

/// Join URL under an explicit public base such as `https://bingo.example.com`.
///
/// Falls back to `http` when `base` has no scheme.
pub fn join_url_from_base(base: &str, path: &str) -> String {
    match base.split_once("://") {
        Some((scheme, host)) => join_url(scheme, host, path),
        None => join_url("http", base, path),
    }
}
