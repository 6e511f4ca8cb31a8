//! User-supplied text sanitization.

use once_cell::sync::Lazy;
use regex::Regex;

#[allow(clippy::expect_used)]
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

#[allow(clippy::expect_used)]
static PROFANITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(spam|scam)\b").expect("valid regex"));

/// Strip HTML tags, mask the profanity list, and trim whitespace.
#[must_use]
pub fn sanitize_text(text: &str) -> String {
    let stripped = TAG_RE.replace_all(text, "");
    let masked = PROFANITY_RE.replace_all(&stripped, |caps: &regex::Captures<'_>| {
        "*".repeat(caps[0].len())
    });
    masked.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_html_tags() {
        assert_eq!(sanitize_text("<b>hello</b> world"), "hello world");
        assert_eq!(sanitize_text("<script>x</script>"), "x");
    }

    #[test]
    fn test_masks_profanity() {
        assert_eq!(sanitize_text("this is spam here"), "this is **** here");
        assert_eq!(sanitize_text("SCAM alert"), "**** alert");
        // Only whole words are masked
        assert_eq!(sanitize_text("spammy"), "spammy");
    }

    #[test]
    fn test_trims_whitespace() {
        assert_eq!(sanitize_text("  padded  "), "padded");
    }
}
