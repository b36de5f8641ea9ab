//! Splitting of streamed reasoning-model output on `<think>` tags.
//!
//! Reasoning models wrap their chain of thought in `<think>...</think>` and
//! follow it with the answer. While a reply streams, the text seen so far may
//! end inside a block whose closing tag has not arrived yet.
//!
//! [`parse`] is pure: it keeps no state between calls and is meant to be run
//! again over the full accumulated text every time it grows. A block that is
//! closed in one pass stays closed, with the same content, in every later pass
//! over a longer text.
//!
//! ```
//! use thinkchat_core::think::{parse, Segment};
//!
//! let segments = parse("<think>reasoning here</think>final answer");
//! assert_eq!(
//!     segments,
//!     vec![
//!         Segment::Thinking { content: "reasoning here".into(), closed: true },
//!         Segment::Final { content: "final answer".into() },
//!     ]
//! );
//! ```

use serde::{Deserialize, Serialize};

pub const OPEN_TAG: &str = "<think>";
pub const CLOSE_TAG: &str = "</think>";

/// A run of parsed text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text between `<think>` and `</think>`. `closed` is false only for a
    /// block whose closing tag has not been seen, which is always the last
    /// segment of a pass.
    Thinking { content: String, closed: bool },
    /// Text outside any thinking block.
    Final { content: String },
}

impl Segment {
    pub fn content(&self) -> &str {
        match self {
            Segment::Thinking { content, .. } | Segment::Final { content } => content,
        }
    }

    pub fn is_thinking(&self) -> bool {
        matches!(self, Segment::Thinking { .. })
    }

    pub fn is_closed_thinking(&self) -> bool {
        matches!(self, Segment::Thinking { closed: true, .. })
    }
}

/// A thinking region, as rendered in a thinking panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThinkBlock {
    pub content: String,
    pub closed: bool,
}

/// Which text outside thinking blocks is shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerPolicy {
    /// Only text after the last thinking block is shown. Commentary before or
    /// between blocks is dropped.
    #[default]
    Trailing,
    /// All text outside thinking blocks is shown, in order.
    Interleaved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Outside,
    InThink,
}

/// Split `text` into thinking and final segments, left to right.
///
/// A `</think>` without a matching opener is kept as literal final text, and
/// a `<think>` inside a block is literal thinking content. Empty final text
/// produces no segment; empty thinking blocks are kept.
pub fn parse(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = text;
    let mut state = ScanState::Outside;

    loop {
        match state {
            ScanState::Outside => match rest.find(OPEN_TAG) {
                Some(pos) => {
                    push_final(&mut segments, &rest[..pos]);
                    rest = &rest[pos + OPEN_TAG.len()..];
                    state = ScanState::InThink;
                }
                None => {
                    push_final(&mut segments, rest);
                    break;
                }
            },
            ScanState::InThink => match rest.find(CLOSE_TAG) {
                Some(pos) => {
                    segments.push(Segment::Thinking {
                        content: rest[..pos].to_string(),
                        closed: true,
                    });
                    rest = &rest[pos + CLOSE_TAG.len()..];
                    state = ScanState::Outside;
                }
                None => {
                    segments.push(Segment::Thinking {
                        content: rest.to_string(),
                        closed: false,
                    });
                    break;
                }
            },
        }
    }

    segments
}

fn push_final(segments: &mut Vec<Segment>, text: &str) {
    if !text.is_empty() {
        segments.push(Segment::Final {
            content: text.to_string(),
        });
    }
}

/// The answer text: everything after the last thinking block, with the
/// whitespace separating it from that block removed.
///
/// Without any thinking block the whole text is the answer. While the last
/// block is still open the answer is empty.
pub fn final_answer(segments: &[Segment]) -> String {
    let start = segments
        .iter()
        .rposition(Segment::is_thinking)
        .map_or(0, |i| i + 1);

    let answer: String = segments[start..]
        .iter()
        .map(Segment::content)
        .collect();

    if start == 0 {
        answer
    } else {
        answer.trim_start().to_string()
    }
}

/// The segments a front end should render under `policy`.
///
/// With [`AnswerPolicy::Trailing`], final text that precedes a thinking
/// block is left out.
pub fn displayed(segments: &[Segment], policy: AnswerPolicy) -> Vec<&Segment> {
    match policy {
        AnswerPolicy::Interleaved => segments.iter().collect(),
        AnswerPolicy::Trailing => {
            let last_thinking = segments.iter().rposition(Segment::is_thinking);
            segments
                .iter()
                .enumerate()
                .filter(|(i, seg)| {
                    seg.is_thinking() || last_thinking.map_or(true, |last| *i > last)
                })
                .map(|(_, seg)| seg)
                .collect()
        }
    }
}

/// The thinking blocks of a pass, in order, for panel rendering.
pub fn blocks(segments: &[Segment]) -> Vec<ThinkBlock> {
    segments
        .iter()
        .filter_map(|seg| match seg {
            Segment::Thinking { content, closed } => Some(ThinkBlock {
                content: content.clone(),
                closed: *closed,
            }),
            Segment::Final { .. } => None,
        })
        .collect()
}

/// True while the text ends inside an unterminated thinking block.
pub fn is_thinking(segments: &[Segment]) -> bool {
    matches!(segments.last(), Some(Segment::Thinking { closed: false, .. }))
}

/// Content of the first closed thinking block in `text`, trimmed.
pub fn first_closed_block(text: &str) -> Option<String> {
    parse(text)
        .into_iter()
        .find(Segment::is_closed_thinking)
        .map(|seg| seg.content().trim().to_string())
}
