use once_cell::sync::Lazy;
use regex::Regex;

static NON_ALNUM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("slug pattern should compile"));

const FALLBACK: &str = "chapter";

/// Convert a title into a filesystem-safe identifier.
///
/// The result is lowercase ASCII alphanumerics separated by single hyphens,
/// never empty. Distinct titles may share a slug, so callers that need unique
/// names must add their own prefix.
pub fn slug(title: &str) -> String {
    let lower = title.to_lowercase();
    let replaced = NON_ALNUM.replace_all(&lower, "-");
    let trimmed = replaced.trim_matches('-');
    if trimmed.is_empty() {
        FALLBACK.to_string()
    } else {
        trimmed.to_string()
    }
}
