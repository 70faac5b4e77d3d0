//! Wikilink and hashtag scanning
//!
//! Pure text functions over note bodies: extraction of `[[wikilink]]` titles
//! and `#hashtag` names, plus the context-window helpers used by the backlink
//! and unlinked-mention builders. Nothing here touches the store.

use regex::Regex;
use std::sync::LazyLock;

/// Characters of context captured on each side of a match when building
/// backlink / mention excerpts.
pub const CONTEXT_WINDOW: usize = 50;

/// Titles shorter than this are never searched for unlinked mentions
/// (short titles produce mostly false positives).
pub const MIN_MENTION_TITLE_LEN: usize = 3;

/// Wikilink pattern: two literal brackets around a non-greedy capture.
///
/// `.` does not match newlines, so a link cannot span lines, and the
/// non-greedy capture means a link cannot contain a literal `]]`.
static WIKILINK_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[\[(.+?)\]\]").unwrap());

/// Hashtag pattern: `#` immediately followed by ASCII word characters or
/// Hangul syllables. No length cap at scan time; the Tag entity enforces
/// its own when names are persisted.
static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([0-9A-Za-z_\x{AC00}-\x{D7A3}]+)").unwrap());

/// Normalize backslash-escaped bracket pairs to their literal form.
///
/// Runs before every scan. A consequence is that `\[\[text\]\]` is parsed
/// as a real wikilink; see the extraction tests, which assert this exact
/// behavior.
pub fn normalize_escapes(body: &str) -> String {
    body.replace(r"\[\[", "[[").replace(r"\]\]", "]]")
}

/// Extract wikilink titles from a note body, in document order.
///
/// Each title is trimmed; titles that are empty after trimming are dropped.
/// Duplicates are preserved (call sites dedup where they need sets).
///
/// # Arguments
///
/// * `body` - The note body to scan
///
/// # Returns
///
/// Titles in the order they appear in the body
///
/// # Examples
///
/// ```
/// use ravel_core::services::markup::extract_wikilinks;
///
/// assert_eq!(
///     extract_wikilinks("See [[Plan]] and [[ Budget ]]"),
///     vec!["Plan".to_string(), "Budget".to_string()]
/// );
/// assert!(extract_wikilinks("no links here").is_empty());
/// ```
pub fn extract_wikilinks(body: &str) -> Vec<String> {
    let normalized = normalize_escapes(body);
    WIKILINK_RE
        .captures_iter(&normalized)
        .filter_map(|caps| {
            let title = caps[1].trim();
            if title.is_empty() {
                None
            } else {
                Some(title.to_string())
            }
        })
        .collect()
}

/// Extract hashtag names from a note body, in document order.
///
/// A hashtag is `#` immediately followed by one or more ASCII letters,
/// digits, underscores, or Hangul syllables. The leading `#` is not part of
/// the returned name. Duplicates are preserved.
///
/// # Examples
///
/// ```
/// use ravel_core::services::markup::extract_hashtags;
///
/// assert_eq!(
///     extract_hashtags("#work on the #launch_plan"),
///     vec!["work".to_string(), "launch_plan".to_string()]
/// );
/// ```
pub fn extract_hashtags(body: &str) -> Vec<String> {
    HASHTAG_RE
        .captures_iter(body)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Find context excerpts for `[[title]]` occurrences in a body.
///
/// The search is case-insensitive but otherwise literal: the bracketed
/// title must appear exactly as stored. Extraction trims titles, so an
/// edge can exist without any literal occurrence; callers get an empty
/// list in that case, not an error.
pub fn wikilink_contexts(body: &str, title: &str) -> Vec<String> {
    let normalized = normalize_escapes(body);
    let pattern = format!(r"(?i)\[\[{}\]\]", regex::escape(title));
    let Ok(re) = Regex::new(&pattern) else {
        return Vec::new();
    };
    re.find_iter(&normalized)
        .map(|m| context_window(&normalized, m.start(), m.end()))
        .collect()
}

/// Find context excerpts for plain-text occurrences of a title that are
/// not already wrapped as a wikilink.
///
/// Matching is case-insensitive. An occurrence immediately preceded by
/// `[[` and followed by `]]` is a structural link, not a mention, and is
/// skipped.
pub fn mention_contexts(body: &str, title: &str) -> Vec<String> {
    let normalized = normalize_escapes(body);
    let pattern = format!("(?i){}", regex::escape(title));
    let Ok(re) = Regex::new(&pattern) else {
        return Vec::new();
    };
    re.find_iter(&normalized)
        .filter(|m| !is_bracket_wrapped(&normalized, m.start(), m.end()))
        .map(|m| context_window(&normalized, m.start(), m.end()))
        .collect()
}

/// True when the byte range `start..end` sits directly between `[[` and `]]`.
fn is_bracket_wrapped(body: &str, start: usize, end: usize) -> bool {
    body[..start].ends_with("[[") && body[end..].starts_with("]]")
}

/// Extract a window of up to [`CONTEXT_WINDOW`] characters on each side of
/// the byte range `start..end`, with `...` marking a side where body text
/// was cut off.
///
/// The window is widened one character at a time so it never splits a
/// multi-byte UTF-8 sequence.
fn context_window(body: &str, start: usize, end: usize) -> String {
    let mut window_start = start;
    let mut taken = 0;
    while window_start > 0 && taken < CONTEXT_WINDOW {
        window_start -= 1;
        while window_start > 0 && !body.is_char_boundary(window_start) {
            window_start -= 1;
        }
        taken += 1;
    }

    let mut window_end = end;
    taken = 0;
    while window_end < body.len() && taken < CONTEXT_WINDOW {
        window_end += 1;
        while window_end < body.len() && !body.is_char_boundary(window_end) {
            window_end += 1;
        }
        taken += 1;
    }

    let mut excerpt = String::new();
    if window_start > 0 {
        excerpt.push_str("...");
    }
    excerpt.push_str(&body[window_start..window_end]);
    if window_end < body.len() {
        excerpt.push_str("...");
    }
    excerpt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_single_wikilink() {
        assert_eq!(extract_wikilinks("See [[Plan]]"), vec!["Plan"]);
    }

    #[test]
    fn test_extract_multiple_in_document_order() {
        assert_eq!(
            extract_wikilinks("[[Alpha]] then [[Beta]] then [[Gamma]]"),
            vec!["Alpha", "Beta", "Gamma"]
        );
    }

    #[test]
    fn test_titles_are_trimmed() {
        assert_eq!(extract_wikilinks("[[  Project Plan  ]]"), vec!["Project Plan"]);
    }

    #[test]
    fn test_duplicates_preserved() {
        assert_eq!(
            extract_wikilinks("[[Plan]] and again [[Plan]]"),
            vec!["Plan", "Plan"]
        );
    }

    #[test]
    fn test_empty_body_yields_nothing() {
        assert!(extract_wikilinks("").is_empty());
        assert!(extract_wikilinks("plain text, no markup").is_empty());
    }

    #[test]
    fn test_whitespace_only_title_dropped() {
        assert!(extract_wikilinks("[[   ]]").is_empty());
    }

    #[test]
    fn test_unclosed_brackets_ignored() {
        assert!(extract_wikilinks("[[Dangling").is_empty());
        assert!(extract_wikilinks("Dangling]]").is_empty());
    }

    #[test]
    fn test_link_cannot_span_lines() {
        assert!(extract_wikilinks("[[Split\nTitle]]").is_empty());
    }

    #[test]
    fn test_non_greedy_capture() {
        assert_eq!(
            extract_wikilinks("[[First]] middle [[Second]]"),
            vec!["First", "Second"]
        );
    }

    #[test]
    fn test_escaped_brackets_become_a_link() {
        // Escape normalization runs before extraction, so escaped bracket
        // text is parsed as a real link. Intentional, if surprising.
        assert_eq!(extract_wikilinks(r"\[\[not a link\]\]"), vec!["not a link"]);
    }

    #[test]
    fn test_extract_hashtag_basic() {
        assert_eq!(extract_hashtags("working on #launch today"), vec!["launch"]);
    }

    #[test]
    fn test_hashtag_charset() {
        assert_eq!(extract_hashtags("#tag_2 #CamelCase"), vec!["tag_2", "CamelCase"]);
        assert_eq!(extract_hashtags("#한글태그 works"), vec!["한글태그"]);
    }

    #[test]
    fn test_hashtag_stops_at_punctuation() {
        assert_eq!(extract_hashtags("done with #launch."), vec!["launch"]);
        assert_eq!(extract_hashtags("#a-b"), vec!["a"]);
    }

    #[test]
    fn test_hashtag_slash_not_part_of_scan() {
        // Nested tag names exist (created via the tag API) but the scanner
        // stops at the separator.
        assert_eq!(extract_hashtags("#project/alpha"), vec!["project"]);
    }

    #[test]
    fn test_bare_hash_is_not_a_tag() {
        assert!(extract_hashtags("# heading, not a tag").is_empty());
        assert!(extract_hashtags("#").is_empty());
    }

    #[test]
    fn test_hashtag_duplicates_preserved() {
        assert_eq!(extract_hashtags("#work and #work"), vec!["work", "work"]);
    }

    #[test]
    fn test_wikilink_contexts_case_insensitive() {
        let contexts = wikilink_contexts("intro [[plan]] outro", "Plan");
        assert_eq!(contexts.len(), 1);
        assert!(contexts[0].contains("[[plan]]"));
    }

    #[test]
    fn test_wikilink_contexts_counts_every_occurrence() {
        let body = "[[Plan]] first, [[Plan]] second";
        assert_eq!(wikilink_contexts(body, "Plan").len(), 2);
    }

    #[test]
    fn test_wikilink_contexts_absent_title() {
        assert!(wikilink_contexts("no links at all", "Plan").is_empty());
    }

    #[test]
    fn test_context_window_no_ellipsis_for_short_body() {
        let contexts = wikilink_contexts("see [[Plan]] now", "Plan");
        assert_eq!(contexts, vec!["see [[Plan]] now"]);
    }

    #[test]
    fn test_context_window_ellipsis_on_cut_sides() {
        let body = format!("{}[[Plan]]{}", "a".repeat(60), "b".repeat(60));
        let contexts = wikilink_contexts(&body, "Plan");
        assert_eq!(contexts.len(), 1);
        let expected = format!("...{}[[Plan]]{}...", "a".repeat(50), "b".repeat(50));
        assert_eq!(contexts[0], expected);
    }

    #[test]
    fn test_context_window_ellipsis_only_where_cut() {
        let body = format!("[[Plan]]{}", "b".repeat(60));
        let contexts = wikilink_contexts(&body, "Plan");
        assert_eq!(contexts[0], format!("[[Plan]]{}...", "b".repeat(50)));

        let body = format!("{}[[Plan]]", "a".repeat(60));
        let contexts = wikilink_contexts(&body, "Plan");
        assert_eq!(contexts[0], format!("...{}[[Plan]]", "a".repeat(50)));
    }

    #[test]
    fn test_context_window_multibyte_safe() {
        let body = format!("{}[[계획]]{}", "한".repeat(60), "글".repeat(60));
        let contexts = wikilink_contexts(&body, "계획");
        assert_eq!(contexts.len(), 1);
        let expected = format!("...{}[[계획]]{}...", "한".repeat(50), "글".repeat(50));
        assert_eq!(contexts[0], expected);
    }

    #[test]
    fn test_mention_contexts_finds_plain_occurrence() {
        let contexts = mention_contexts("the Budget needs review", "Budget");
        assert_eq!(contexts.len(), 1);
        assert!(contexts[0].contains("Budget needs review"));
    }

    #[test]
    fn test_mention_contexts_case_insensitive() {
        assert_eq!(mention_contexts("the BUDGET sheet", "Budget").len(), 1);
    }

    #[test]
    fn test_mention_contexts_skips_wrapped_occurrences() {
        assert!(mention_contexts("see [[Budget]]", "Budget").is_empty());

        let contexts = mention_contexts("see [[Budget]] and the budget doc", "Budget");
        assert_eq!(contexts.len(), 1);
        assert!(contexts[0].contains("budget doc"));
    }

    #[test]
    fn test_mention_contexts_skips_escaped_wrapped_occurrences() {
        // Escaped brackets normalize to real brackets first, so this
        // occurrence counts as linked, not as a mention.
        assert!(mention_contexts(r"see \[\[Budget\]\]", "Budget").is_empty());
    }

    #[test]
    fn test_mention_contexts_literal_needle() {
        let contexts = mention_contexts("notes on C++ (draft)", "C++ (draft)");
        assert_eq!(contexts.len(), 1);
    }

    #[test]
    fn test_normalize_escapes() {
        assert_eq!(normalize_escapes(r"\[\[x\]\]"), "[[x]]");
        assert_eq!(normalize_escapes("[[x]]"), "[[x]]");
        assert_eq!(normalize_escapes("plain"), "plain");
    }
}
