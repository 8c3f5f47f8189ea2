//! Normalizer — strips structural noise from raw memory text.
//!
//! Removes decorative separator lines, boilerplate header lines, markup
//! artifacts (HTML tags, markdown emphasis/heading/link syntax) and excess
//! whitespace. Natural-language content and its order are preserved, and
//! paragraph boundaries (blank lines) survive as a single blank line.
//!
//! Every step only deletes or shrinks text, so the output is never longer
//! than the input.

use std::sync::LazyLock;

use regex::Regex;

static HTML_TAG: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z][A-Za-z0-9]*(?:\s[^<>]*)?/?>").ok());

static MARKDOWN_LINK: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"!?\[([^\[\]]*)\]\([^()\s]*\)").ok());

/// Paired emphasis, strongest markers first. Underscore forms must open and
/// close on word boundaries so identifiers like `snake__case` survive.
static EMPHASIS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\*\*([^*\n]+?)\*\*",
        r"\b__([^_\n]+?)__\b",
        r"~~([^~\n]+?)~~",
        r"\*([^*\s](?:[^*\n]*[^*\s])?)\*",
        r"\b_([^_\s](?:[^_\n]*[^_\s])?)_\b",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

static CODE_TICKS: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"`+").ok());

static HEADING_PREFIX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^(?:#{1,6}|>+)\s+").ok());

/// Characters that make up separators and banner decoration.
const DECORATION: &[char] = &[
    '-', '=', '*', '~', '_', '#', '+', '•', '·', '─', '━', '═', '—', '–', '|', '<', '>', '/', '\\',
];

/// Normalize `raw`, dropping any line equal (case-insensitively, once
/// decoration is stripped) to one of `boilerplate_headers`.
///
/// `boilerplate_headers` must already be lower-case, as vocabulary tables are.
#[must_use]
pub fn normalize(raw: &str, boilerplate_headers: &[String]) -> String {
    if raw.trim().is_empty() {
        return String::new();
    }

    let without_markup = strip_markup(raw);

    let mut lines: Vec<String> = Vec::new();
    let mut pending_blank = false;

    for line in without_markup.lines() {
        let line = clean_line(line, boilerplate_headers);
        match line {
            Line::Blank => pending_blank = true,
            Line::Dropped => {}
            Line::Text(text) => {
                if pending_blank && !lines.is_empty() {
                    lines.push(String::new());
                }
                pending_blank = false;
                lines.push(text);
            }
        }
    }

    let normalized = lines.join("\n");
    debug_assert!(normalized.chars().count() <= raw.chars().count());
    normalized
}

/// Split normalized text into paragraphs on blank lines.
#[must_use]
pub fn paragraphs(normalized: &str) -> Vec<&str> {
    normalized
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect()
}

enum Line {
    Blank,
    Dropped,
    Text(String),
}

fn strip_markup(raw: &str) -> String {
    let mut text = raw.replace("\r\n", "\n");
    if let Some(re) = HTML_TAG.as_ref() {
        text = re.replace_all(&text, "").into_owned();
    }
    if let Some(re) = MARKDOWN_LINK.as_ref() {
        text = re.replace_all(&text, "$1").into_owned();
    }
    for re in EMPHASIS.iter() {
        text = re.replace_all(&text, "$1").into_owned();
    }
    if let Some(re) = CODE_TICKS.as_ref() {
        text = re.replace_all(&text, "").into_owned();
    }
    text
}

fn clean_line(line: &str, boilerplate_headers: &[String]) -> Line {
    let collapsed = line.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return Line::Blank;
    }
    if is_separator(&collapsed) {
        return Line::Dropped;
    }

    let mut text = collapsed.as_str();
    if let Some(re) = HEADING_PREFIX.as_ref() {
        if let Some(m) = re.find(text) {
            text = &text[m.end()..];
        }
    }
    let text = strip_banner(text);
    if text.is_empty() {
        return Line::Dropped;
    }
    if is_boilerplate(text, boilerplate_headers) {
        return Line::Dropped;
    }
    Line::Text(text.to_string())
}

/// A line of nothing but decoration, such as `-----` or `* * *`.
fn is_separator(line: &str) -> bool {
    let visible: Vec<char> = line.chars().filter(|c| !c.is_whitespace()).collect();
    visible.len() >= 3 && visible.iter().all(|c| !c.is_alphanumeric())
}

/// `=== Title ===` → `Title`. Only runs of two or more decoration
/// characters are treated as banner edges.
fn strip_banner(line: &str) -> &str {
    let leading = line.chars().take_while(|c| DECORATION.contains(c)).count();
    let trailing = line.chars().rev().take_while(|c| DECORATION.contains(c)).count();
    let mut text = line;
    if leading >= 2 {
        text = text.trim_start_matches(DECORATION);
    }
    if trailing >= 2 {
        text = text.trim_end_matches(DECORATION);
    }
    text.trim()
}

fn is_boilerplate(line: &str, boilerplate_headers: &[String]) -> bool {
    if boilerplate_headers.is_empty() {
        return false;
    }
    let key = line
        .trim_matches(|c: char| matches!(c, '[' | ']' | '(' | ')' | ':' | ' '))
        .to_lowercase();
    boilerplate_headers.iter().any(|h| *h == key)
}
