//! Language-agnostic built-in text transforms (§4.9): markdown strip, emoji
//! strip, email/phone/time verbalization, newline normalization, and
//! angle-bracket removal that preserves SSML-like tags.

use regex::Regex;
use std::sync::LazyLock;

use crate::transform::{stateless_transform, TextTransform};

static MARKDOWN_EMPHASIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\*\*\*|\*\*|\*|___|__|_|`)").unwrap());
static MARKDOWN_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]*)\]\([^)]*\)").unwrap());
static MARKDOWN_HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)^#{1,6}\s+").unwrap());
static EMOJI: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"[\u{1F300}-\u{1FAFF}\u{2600}-\u{27BF}\u{1F1E6}-\u{1F1FF}]",
    )
    .unwrap()
});
static EMAIL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\w.+-]+@[\w-]+\.[\w.-]+").unwrap());
static PHONE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\d{3}[-.\s]\d{3}[-.\s]\d{4}\b").unwrap());
static TIME_OF_DAY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b([01]?\d|2[0-3]):([0-5]\d)\b").unwrap());
static NEWLINES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n+").unwrap());
static SSML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"</?[a-zA-Z][\w:-]*(\s[^<>]*)?/?>").unwrap());
static BARE_ANGLE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[<>]").unwrap());

/// Removes markdown emphasis, inline links (keeping the link text), and
/// ATX headings.
pub fn strip_markdown(text: &str) -> String {
    let text = MARKDOWN_LINK.replace_all(text, "$1");
    let text = MARKDOWN_HEADING.replace_all(&text, "");
    MARKDOWN_EMPHASIS.replace_all(&text, "").into_owned()
}

/// Drops emoji/pictograph/flag codepoints.
pub fn strip_emoji(text: &str) -> String {
    EMOJI.replace_all(text, "").into_owned()
}

/// `user@example.com` -> `user at example dot com`.
pub fn verbalize_email(text: &str) -> String {
    EMAIL
        .replace_all(text, |caps: &regex::Captures| {
            caps[0].replace('@', " at ").replace('.', " dot ")
        })
        .into_owned()
}

/// `555-123-4567` -> digit-by-digit: `5 5 5 1 2 3 4 5 6 7`.
pub fn verbalize_phone(text: &str) -> String {
    PHONE
        .replace_all(text, |caps: &regex::Captures| {
            caps[0]
                .chars()
                .filter(|c| c.is_ascii_digit())
                .map(|c| c.to_string())
                .collect::<Vec<_>>()
                .join(" ")
        })
        .into_owned()
}

/// `14:05` -> `14 05` (spoken as two number groups; locale verbalizers turn
/// each group into words).
pub fn verbalize_time(text: &str) -> String {
    TIME_OF_DAY.replace_all(text, "$1 $2").into_owned()
}

/// Collapses any run of newlines into a single space, so TTS never reads a
/// literal blank line.
pub fn normalize_newlines(text: &str) -> String {
    NEWLINES.replace_all(text, " ").into_owned()
}

/// Removes bare `<`/`>` characters (accidental HTML, stray comparisons)
/// while leaving well-formed SSML-like tags (`<break time="200ms"/>`)
/// untouched.
pub fn strip_angle_brackets_preserving_ssml(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut last_end = 0;
    for m in SSML_TAG.find_iter(text) {
        result.push_str(&BARE_ANGLE.replace_all(&text[last_end..m.start()], ""));
        result.push_str(m.as_str());
        last_end = m.end();
    }
    result.push_str(&BARE_ANGLE.replace_all(&text[last_end..], ""));
    result
}

pub fn markdown_strip_transform() -> TextTransform {
    stateless_transform(strip_markdown)
}

pub fn emoji_strip_transform() -> TextTransform {
    stateless_transform(strip_emoji)
}

pub fn email_verbalizer_transform() -> TextTransform {
    stateless_transform(verbalize_email)
}

pub fn phone_verbalizer_transform() -> TextTransform {
    stateless_transform(verbalize_phone)
}

pub fn time_verbalizer_transform() -> TextTransform {
    stateless_transform(verbalize_time)
}

pub fn newline_normalizer_transform() -> TextTransform {
    stateless_transform(normalize_newlines)
}

pub fn ssml_preserving_angle_strip_transform() -> TextTransform {
    stateless_transform(strip_angle_brackets_preserving_ssml)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_emphasis_links_and_headings() {
        assert_eq!(strip_markdown("# Title\n**bold** and _em_ and [link](http://x)"), "Title\nbold and em and link");
    }

    #[test]
    fn strips_emoji() {
        assert_eq!(strip_emoji("great job 🎉 nice"), "great job  nice");
    }

    #[test]
    fn verbalizes_email() {
        assert_eq!(verbalize_email("reach me at a.b@example.com today"), "reach me at a dot b at example dot com today");
    }

    #[test]
    fn verbalizes_phone() {
        assert_eq!(verbalize_phone("call 555-123-4567 now"), "call 5 5 5 1 2 3 4 5 6 7 now");
    }

    #[test]
    fn verbalizes_time() {
        assert_eq!(verbalize_time("meet at 14:05 sharp"), "meet at 14 05 sharp");
    }

    #[test]
    fn normalizes_newlines() {
        assert_eq!(normalize_newlines("a\n\n\nb"), "a b");
    }

    #[test]
    fn preserves_ssml_tags_but_strips_bare_brackets() {
        let input = "say <break time=\"200ms\"/> then 3 < 4";
        assert_eq!(
            strip_angle_brackets_preserving_ssml(input),
            "say <break time=\"200ms\"/> then 3  4"
        );
    }
}
