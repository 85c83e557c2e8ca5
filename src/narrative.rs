//! Narrative beat machine for story-mode sessions.
//!
//! Long-form narration arriving from the AI engine is cut down to a short
//! beat (at most three sentences) and presented together with a bounded
//! choice set, one beat at a time. A fresh narration replaces the presented
//! beat and discards its choices; selecting a choice clears the choices and
//! swaps the display text for a canned acknowledgment until the next beat
//! arrives. The machine is inert in free-roam sessions.

/// Maximum sentence units kept per beat. A fixed display policy: short beats
/// keep the story readable at a glance, and the remainder is discarded
/// rather than queued.
const MAX_BEAT_SENTENCES: usize = 3;

/// Choice labels offered with every beat, in display order.
///
/// A placeholder set: the labels do not depend on the narration content.
// TODO: derive the choice set from the narration text instead of this fixed list.
pub const DEFAULT_CHOICES: [&str; 3] = ["Investigate", "Ignore", "Approach"];

/// Display text swapped in after a selection, until the next beat arrives.
pub const CHOICE_ACK: &str = "You made your choice. The story continues...";

/// Cut narration down to its first sentences.
///
/// Sentence units end at `.`, `?` or `!` followed by whitespace; at most
/// [`MAX_BEAT_SENTENCES`] units are kept, joined with single spaces and
/// trimmed. Anything past the cut is discarded.
pub fn chunk_narration(text: &str) -> String {
    let mut units: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '?' | '!') && chars.peek().is_some_and(|next| next.is_whitespace()) {
            let unit = current.trim().to_owned();
            if !unit.is_empty() {
                units.push(unit);
            }
            current.clear();
            if units.len() == MAX_BEAT_SENTENCES {
                return units.join(" ");
            }
            while chars.peek().is_some_and(|next| next.is_whitespace()) {
                chars.next();
            }
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        units.push(tail.to_owned());
    }
    units.truncate(MAX_BEAT_SENTENCES);
    units.join(" ")
}

/// Phase of the beat machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NarrativePhase {
    /// No pending beat; the display may still show the last acknowledgment.
    #[default]
    Idle,
    /// A beat is on screen with its choices offered. Stays presented until
    /// selected or replaced; beats do not expire.
    BeatPresented,
}

/// The narrative display surface plus its offered choices.
///
/// The phase is implied by the choice set: a non-empty set means a beat is
/// presented, an empty set means idle.
#[derive(Debug, Clone, Default)]
pub struct NarrativeState {
    display_text: Option<String>,
    choices: Vec<String>,
}

impl NarrativeState {
    /// Present a new beat from raw narration. Any previously offered choices
    /// are discarded, not queued. Returns the chunked beat text.
    pub fn present(&mut self, narration: &str) -> String {
        let beat = chunk_narration(narration);
        self.display_text = Some(beat.clone());
        self.choices = DEFAULT_CHOICES.iter().map(|&c| c.to_owned()).collect();
        beat
    }

    /// Accept a selection. When `label` is among the offered choices the
    /// machine clears them, swaps the display for [`CHOICE_ACK`], and returns
    /// `true`. Otherwise (idle, or an unoffered label) the state is untouched
    /// and the result is `false`.
    pub fn select(&mut self, label: &str) -> bool {
        if !self.choices.iter().any(|c| c == label) {
            return false;
        }
        self.choices.clear();
        self.display_text = Some(CHOICE_ACK.to_owned());
        true
    }

    pub fn phase(&self) -> NarrativePhase {
        if self.choices.is_empty() {
            NarrativePhase::Idle
        } else {
            NarrativePhase::BeatPresented
        }
    }

    /// Text currently on the narrative surface: the presented beat, or the
    /// acknowledgment left behind by the last selection.
    pub fn display_text(&self) -> Option<&str> {
        self.display_text.as_deref()
    }

    /// Offered choice labels; empty while idle.
    pub fn choices(&self) -> &[String] {
        &self.choices
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;

    #[test]
    fn chunking_keeps_first_three_of_five_sentences() {
        let text = "A door creaks. Footsteps echo. Silence falls. Something moves. The lights flicker.";
        assert_eq!(
            chunk_narration(text),
            "A door creaks. Footsteps echo. Silence falls."
        );
    }

    #[test]
    fn chunking_passes_short_narration_through() {
        assert_eq!(chunk_narration("A single quiet beat."), "A single quiet beat.");
        assert_eq!(chunk_narration("One. Two."), "One. Two.");
    }

    #[test]
    fn chunking_honors_question_and_exclamation_boundaries() {
        let text = "Who goes there? Nobody answers! The hall is empty. Dust settles.";
        assert_eq!(
            chunk_narration(text),
            "Who goes there? Nobody answers! The hall is empty."
        );
    }

    #[test]
    fn chunking_collapses_extra_whitespace_between_sentences() {
        let text = "First.   Second.\n\nThird.    Fourth.";
        assert_eq!(chunk_narration(text), "First. Second. Third.");
    }

    #[test]
    fn chunking_ignores_punctuation_without_following_whitespace() {
        // Mid-token punctuation (versions, ellipses glued to text) does not
        // close a sentence unit.
        let text = "The clock reads 3.15 and ticks on. Nothing stirs. All is calm. Done.";
        assert_eq!(
            chunk_narration(text),
            "The clock reads 3.15 and ticks on. Nothing stirs. All is calm."
        );
    }

    #[test]
    fn chunking_trims_surrounding_whitespace() {
        assert_eq!(chunk_narration("  Padded beat.  "), "Padded beat.");
        assert_eq!(chunk_narration("   "), "");
    }

    #[test]
    fn present_offers_the_fixed_choices() {
        let mut state = NarrativeState::default();
        assert_eq!(state.phase(), NarrativePhase::Idle);

        let beat = state.present("A door creaks. Footsteps echo. Silence falls. More.");
        assert_eq!(beat, "A door creaks. Footsteps echo. Silence falls.");
        assert_eq!(state.phase(), NarrativePhase::BeatPresented);
        assert_eq!(state.choices(), DEFAULT_CHOICES);
        assert_eq!(state.display_text(), Some(beat.as_str()));
    }

    #[test]
    fn select_clears_choices_and_shows_acknowledgment() {
        let mut state = NarrativeState::default();
        state.present("Something moves.");

        assert!(state.select("Investigate"));
        assert_eq!(state.phase(), NarrativePhase::Idle);
        assert!(state.choices().is_empty());
        assert_eq!(state.display_text(), Some(CHOICE_ACK));
    }

    #[test]
    fn select_rejects_unoffered_labels() {
        let mut state = NarrativeState::default();
        assert!(!state.select("Investigate"), "nothing presented yet");

        state.present("Something moves.");
        assert!(!state.select("Flee"), "label is not offered");
        assert_eq!(state.phase(), NarrativePhase::BeatPresented);
    }

    #[test]
    fn new_beat_discards_previous_choices() {
        let mut state = NarrativeState::default();
        state.present("First beat.");
        let beat = state.present("Second beat.");

        assert_eq!(state.display_text(), Some(beat.as_str()));
        assert_eq!(state.choices().len(), DEFAULT_CHOICES.len());
        // The old beat's choices are gone; selecting still works against the
        // fresh set only.
        assert!(state.select("Approach"));
    }
}
