//! Word-budget truncation that keeps detail-bearing lines.
//!
//! Output is a pure function of the input and the config; identical text
//! always truncates to identical text, which keeps classification cache keys
//! stable.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Separator placed between the head chunk and the collected detail lines.
pub const DETAIL_SEPARATOR: &str = "\n\n---\n\n";

/// Tunable thresholds for [`truncate_text`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TruncationConfig {
    /// Word budget (roughly one token per word).
    pub max_words: usize,
    /// Words kept verbatim from the start of the text.
    pub head_words: usize,
    /// Leading lines not scanned for details (already in the head).
    pub skip_lines: usize,
    /// A detail line must be longer than this many characters.
    pub min_detail_chars: usize,
    pub max_detail_lines: usize,
    /// Substrings that mark a line as carrying deal details.
    pub detail_markers: Vec<String>,
}

impl Default for TruncationConfig {
    fn default() -> Self {
        Self {
            max_words: 800,
            head_words: 500,
            skip_lines: 5,
            min_detail_chars: 20,
            max_detail_lines: 20,
            detail_markers: ["$", "billion", "million", "—", "•", "-"].iter().map(|m| (*m).to_string()).collect(),
        }
    }
}

/// Bound `text` to `config.max_words` words.
///
/// Within budget the input is returned unchanged. Otherwise the head chunk is
/// kept and followed by lines that look like deal details (currency, amounts,
/// dashes, bullets); the result is hard-capped at the word budget.
pub fn truncate_text<'a>(text: &'a str, config: &TruncationConfig) -> Cow<'a, str> {
    let word_count = text.split_whitespace().count();
    if word_count <= config.max_words {
        return Cow::Borrowed(text);
    }

    let head = text
        .split_whitespace()
        .take(config.head_words)
        .collect::<Vec<_>>()
        .join(" ");

    let details = text
        .split('\n')
        .skip(config.skip_lines)
        .map(str::trim)
        .filter(|line| is_detail_line(line, config))
        .take(config.max_detail_lines)
        .collect::<Vec<_>>()
        .join("\n");

    let combined = format!("{head}{DETAIL_SEPARATOR}{details}");
    let combined = if combined.split_whitespace().count() > config.max_words {
        combined.split_whitespace().take(config.max_words).collect::<Vec<_>>().join(" ")
    } else {
        combined
    };

    tracing::debug!("truncated from {} to {} words", word_count, combined.split_whitespace().count());
    Cow::Owned(combined)
}

fn is_detail_line(line: &str, config: &TruncationConfig) -> bool {
    line.chars().count() > config.min_detail_chars && config.detail_markers.iter().any(|m| line.contains(m.as_str()))
}
