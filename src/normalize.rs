// src/normalize.rs
//! Deterministic text cleanup applied before any model sees the text.
//!
//! Order: case-fold → URLs → @mentions → #hashtags → emoji runs → whitespace
//! → length cap. Running it twice with the same config is a no-op.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::TextProcessingConfig;

/// Replaces each run of emoji code points.
pub const EMOJI_PLACEHOLDER: &str = "[emoji]";

/// Appended after truncation. Deliberately outside every pattern below.
pub const ELLIPSIS: char = '\u{2026}';

// Printable ASCII only, so a trailing ellipsis can never extend a URL match.
static RE_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:https?://|www\.)[\x21-\x7E]+").expect("url regex"));
static RE_MENTION: Lazy<Regex> = Lazy::new(|| Regex::new(r"@\w+").expect("mention regex"));
static RE_HASHTAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"#\w+").expect("hashtag regex"));
static RE_EMOJI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        "[",
        "\u{1F600}-\u{1F64F}", // emoticons
        "\u{1F300}-\u{1F5FF}", // symbols & pictographs
        "\u{1F680}-\u{1F6FF}", // transport & map
        "\u{1F1E0}-\u{1F1FF}", // flags
        "\u{1F900}-\u{1F9FF}",
        "\u{1FA70}-\u{1FAFF}",
        "\u{2600}-\u{26FF}",
        "\u{2702}-\u{27B0}",
        "\u{2B50}-\u{2B55}",
        "\u{231A}\u{231B}\u{23CF}\u{23E9}-\u{23F3}",
        "\u{200D}\u{FE0F}\u{3030}",
        "]+"
    ))
    .expect("emoji regex")
});
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Normalize `text` according to `cfg`. Empty input yields an empty string.
pub fn normalize_text(text: &str, cfg: &TextProcessingConfig) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let mut out = text.to_lowercase();

    if cfg.remove_urls {
        out = RE_URL.replace_all(&out, " ").into_owned();
    }
    if cfg.remove_mentions {
        out = RE_MENTION.replace_all(&out, " ").into_owned();
    }
    if cfg.remove_hashtags {
        out = RE_HASHTAG.replace_all(&out, " ").into_owned();
    }
    if cfg.handle_emojis {
        let spaced = format!(" {EMOJI_PLACEHOLDER} ");
        out = RE_EMOJI.replace_all(&out, spaced.as_str()).into_owned();
    }

    out = RE_WS.replace_all(&out, " ").trim().to_string();

    // Length cap in chars, never in bytes.
    let max = cfg.max_text_length;
    if out.chars().count() > max {
        let mut cut: String = out.chars().take(max).collect();
        cut.truncate(cut.trim_end().len());
        cut.push(ELLIPSIS);
        out = cut;
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_on() -> TextProcessingConfig {
        TextProcessingConfig {
            max_text_length: 1000,
            remove_urls: true,
            remove_mentions: true,
            remove_hashtags: true,
            handle_emojis: true,
        }
    }

    #[test]
    fn empty_is_ok() {
        assert_eq!(normalize_text("", &all_on()), "");
        assert_eq!(normalize_text("   \n\t ", &all_on()), "");
    }

    #[test]
    fn strips_tokens_and_folds_case() {
        let s = "Loving the NEW release @dev_team! see https://example.com/x?y=1 #Launch";
        assert_eq!(normalize_text(s, &all_on()), "loving the new release ! see");
    }

    #[test]
    fn switches_are_respected() {
        let cfg = TextProcessingConfig {
            remove_urls: false,
            remove_mentions: false,
            remove_hashtags: false,
            handle_emojis: false,
            ..all_on()
        };
        let s = "Hi @Bob #Rust http://a.io 😀";
        assert_eq!(normalize_text(s, &cfg), "hi @bob #rust http://a.io 😀");
    }

    #[test]
    fn emoji_runs_become_one_placeholder() {
        let s = "great news 😀😀🚀 really";
        assert_eq!(normalize_text(s, &all_on()), "great news [emoji] really");
        assert_eq!(normalize_text("ok👍done", &all_on()), "ok [emoji] done");
    }

    #[test]
    fn truncates_on_char_boundary_with_ellipsis() {
        let cfg = TextProcessingConfig {
            max_text_length: 5,
            ..all_on()
        };
        assert_eq!(normalize_text("ééééééé", &cfg), "ééééé…");
        assert_eq!(normalize_text("abc defgh", &cfg), "abc d…");
        // trailing space at the cut is dropped
        assert_eq!(normalize_text("abcd efgh", &cfg), "abcd…");
        assert_eq!(normalize_text("short", &cfg), "short");
    }

    #[test]
    fn idempotent_on_own_output() {
        let cfg = TextProcessingConfig {
            max_text_length: 24,
            ..all_on()
        };
        for s in [
            "Check THIS out 🚀🚀 https://x.y/z @someone #tag and more words here",
            "see http:// now and then again and again",
            "  multiple   spaces\tand\nnewlines  ",
            "plain",
        ] {
            let once = normalize_text(s, &cfg);
            let twice = normalize_text(&once, &cfg);
            assert_eq!(once, twice, "not idempotent for {s:?}");
        }
    }
}
