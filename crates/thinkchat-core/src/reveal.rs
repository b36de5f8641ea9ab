//! Typewriter reveal of the answer text.
//!
//! Purely presentational: it tracks how much of a target string is visible
//! and never touches the message it was fed from. The periodic timer that
//! drives [`Typewriter::tick`] belongs to the front end.

#[derive(Debug, Clone, Default)]
pub struct Typewriter {
    target: String,
    target_chars: usize,
    shown: usize,
}

impl Typewriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Point the reveal at `text`.
    ///
    /// Growth of the current target keeps the revealed prefix. Anything else
    /// (a shorter or revised text) restarts the reveal from nothing.
    pub fn set_target(&mut self, text: &str) {
        if text == self.target {
            return;
        }
        if !text.starts_with(self.target.as_str()) {
            self.shown = 0;
        }
        self.target = text.to_string();
        self.target_chars = self.target.chars().count();
    }

    /// Reveal one more character. Returns false once caught up.
    pub fn tick(&mut self) -> bool {
        if self.shown < self.target_chars {
            self.shown += 1;
            true
        } else {
            false
        }
    }

    pub fn visible(&self) -> &str {
        let end = self
            .target
            .char_indices()
            .nth(self.shown)
            .map(|(i, _)| i)
            .unwrap_or(self.target.len());
        &self.target[..end]
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn is_caught_up(&self) -> bool {
        self.shown >= self.target_chars
    }

    /// Show the whole target at once.
    pub fn finish(&mut self) {
        self.shown = self.target_chars;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
