//! Splitting an assistant reply into its answer and follow-up suggestions.
//!
//! The backend appends suggested next questions to the answer, separated by
//! an in-band marker token:
//!
//! ```text
//! Our office opens at 9am. followup_question
//! 1) Where are you located?
//! 2) Do you deliver?
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use std::ops::Range;

static MARKER_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)followups?_question").unwrap());

/// An assistant reply with its follow-ups separated out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssistantReply {
    pub message: String,
    pub followups: Vec<String>,
}

/// Byte range of the first marker in `text`.
pub fn find_marker(text: &str) -> Option<Range<usize>> {
    MARKER_REGEX.find(text).map(|m| m.range())
}

/// Strip list numbering and bullets: "1) ", "2. ", "- ", "(3) ".
fn strip_list_marker(line: &str) -> &str {
    line.trim_start_matches(|c: char| {
        c.is_ascii_digit() || matches!(c, '.' | '-' | '(' | ')') || c.is_whitespace()
    })
    .trim()
}

/// Split the full text of a reply at the first marker.
///
/// The answer keeps everything before the marker except trailing line
/// breaks. The text after it, up to any second marker, is one suggestion per
/// non-blank line.
pub fn split_followups(text: &str) -> AssistantReply {
    let (message, rest) = match find_marker(text) {
        Some(range) => {
            let rest = &text[range.end..];
            // Only the block up to a second marker holds suggestions
            let block = find_marker(rest).map_or(rest, |next| &rest[..next.start]);
            (&text[..range.start], Some(block))
        }
        None => (text, None),
    };

    let followups = rest
        .map(|rest| {
            rest.lines()
                .map(strip_list_marker)
                .filter(|line| !line.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    AssistantReply {
        message: message.trim_end_matches(['\r', '\n']).to_string(),
        followups,
    }
}
