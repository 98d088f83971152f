//! Reveal state machine — the character-by-character "typing" of a response.
//!
//! Progresses linearly: Idle → Revealing(1) → … → Revealing(N) → Done.
//! An empty response goes straight from Idle to Done. The machine itself never
//! sleeps; the caller waits for one typing delay whenever [`Reveal::needs_delay`]
//! is true before calling [`Reveal::advance`] again.

/// Where the reveal currently is. `Revealing(k)` means the first `k`
/// characters are visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealPhase {
    Idle,
    Revealing(usize),
    Done,
}

impl RevealPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done)
    }
}

impl std::fmt::Display for RevealPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Revealing(k) => write!(f, "revealing({k})"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Outcome of a single [`Reveal::advance`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealStep {
    /// One more character became visible.
    Revealed { position: usize, partial: String },
    /// The machine entered `Done`; carries the full response.
    Finished(String),
}

/// Incremental reveal of one response string.
#[derive(Debug, Clone)]
pub struct Reveal {
    text: String,
    chars: Vec<char>,
    partial: String,
    phase: RevealPhase,
}

impl Reveal {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let chars: Vec<char> = text.chars().collect();
        Self {
            partial: String::with_capacity(text.len()),
            text,
            chars,
            phase: RevealPhase::Idle,
        }
    }

    pub fn phase(&self) -> RevealPhase {
        self.phase
    }

    /// Number of characters N in the response.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Currently visible prefix.
    pub fn partial(&self) -> &str {
        &self.partial
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// True when the next [`advance`](Self::advance) reveals another character
    /// and so must be preceded by one typing delay.
    pub fn needs_delay(&self) -> bool {
        matches!(self.phase, RevealPhase::Revealing(k) if k < self.chars.len())
    }

    /// Perform one transition. Returns `None` once the machine is `Done`.
    pub fn advance(&mut self) -> Option<RevealStep> {
        let n = self.chars.len();
        match self.phase {
            RevealPhase::Done => None,
            RevealPhase::Idle if n == 0 => Some(self.finish()),
            RevealPhase::Idle => Some(self.reveal_to(1)),
            RevealPhase::Revealing(k) if k < n => Some(self.reveal_to(k + 1)),
            RevealPhase::Revealing(_) => Some(self.finish()),
        }
    }

    /// Jump straight to `Done`, skipping any remaining characters.
    pub fn finish(&mut self) -> RevealStep {
        self.phase = RevealPhase::Done;
        self.partial.clear();
        RevealStep::Finished(self.text.clone())
    }

    fn reveal_to(&mut self, position: usize) -> RevealStep {
        self.partial.push(self.chars[position - 1]);
        self.phase = RevealPhase::Revealing(position);
        RevealStep::Revealed {
            position,
            partial: self.partial.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Drive a reveal to completion, returning (reveal transitions, delays, finals).
    fn run(text: &str) -> (Vec<String>, usize, Vec<String>) {
        let mut reveal = Reveal::new(text);
        let mut partials = Vec::new();
        let mut delays = 0;
        let mut finals = Vec::new();
        loop {
            if reveal.needs_delay() {
                delays += 1;
            }
            match reveal.advance() {
                Some(RevealStep::Revealed { partial, .. }) => partials.push(partial),
                Some(RevealStep::Finished(text)) => finals.push(text),
                None => break,
            }
        }
        (partials, delays, finals)
    }

    #[test]
    fn reveals_exactly_n_characters_then_finishes_once() {
        for text in ["a", "hello", "This is a placeholder response from the AI."] {
            let n = text.chars().count();
            let (partials, delays, finals) = run(text);
            assert_eq!(partials.len(), n, "reveal count for {text:?}");
            assert_eq!(delays, n - 1, "delay count for {text:?}");
            assert_eq!(finals, vec![text.to_string()]);
        }
    }

    #[test]
    fn partial_is_exact_prefix() {
        let (partials, _, _) = run("abc");
        assert_eq!(partials, vec!["a", "ab", "abc"]);
    }

    #[test]
    fn empty_response_goes_straight_to_done() {
        let mut reveal = Reveal::new("");
        assert_eq!(reveal.phase(), RevealPhase::Idle);
        assert!(!reveal.needs_delay());
        assert_eq!(reveal.advance(), Some(RevealStep::Finished(String::new())));
        assert!(reveal.phase().is_terminal());
        assert_eq!(reveal.advance(), None);
    }

    #[test]
    fn multibyte_characters_are_revealed_whole() {
        let (partials, _, finals) = run("سلام");
        assert_eq!(partials.len(), 4);
        assert_eq!(partials[1], "سل");
        assert_eq!(finals, vec!["سلام".to_string()]);
    }

    #[test]
    fn last_character_finishes_without_delay() {
        let mut reveal = Reveal::new("ab");
        reveal.advance();
        assert!(reveal.needs_delay());
        reveal.advance();
        assert_eq!(reveal.phase(), RevealPhase::Revealing(2));
        assert!(!reveal.needs_delay());
        assert_eq!(reveal.advance(), Some(RevealStep::Finished("ab".into())));
        assert_eq!(reveal.partial(), "");
    }

    #[test]
    fn finish_skips_remaining_characters() {
        let mut reveal = Reveal::new("hello");
        reveal.advance();
        reveal.advance();
        assert_eq!(reveal.partial(), "he");
        assert_eq!(reveal.finish(), RevealStep::Finished("hello".into()));
        assert!(reveal.phase().is_terminal());
        assert_eq!(reveal.partial(), "");
    }

    #[test]
    fn phase_display() {
        assert_eq!(RevealPhase::Idle.to_string(), "idle");
        assert_eq!(RevealPhase::Revealing(3).to_string(), "revealing(3)");
        assert_eq!(RevealPhase::Done.to_string(), "done");
    }
}
