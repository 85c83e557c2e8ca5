//! Append-only event and chat logs.
//!
//! Every accepted protocol event becomes a [`LogEntry`] rendered as
//! `[HH:MM:SS] <glyph> <text>`. Chat targets a separate display surface and
//! keeps its own [`ChatEntry`] list. Both logs are append-only in arrival
//! order and live for the lifetime of the session — no deduplication, no
//! eviction.

use chrono::{DateTime, Local};

/// Classification of an event-log entry. Each kind renders with a fixed
/// glyph; entries the classifier could not recognize keep their raw payload
/// under [`LogKind::Generic`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    /// Session-level notices (welcome line, choice confirmations).
    System,
    /// A player moved between rooms.
    Movement,
    /// A player joined the session.
    Join,
    /// A player left the session.
    Leave,
    /// Ambient or story text from the AI engine.
    AiNarration,
    /// A locally used role ability.
    Ability,
    /// Unrecognized payload, preserved as a raw structural dump.
    Generic,
}

impl LogKind {
    /// Fixed display glyph. [`LogKind::Generic`] has none: raw dumps render
    /// bare so the payload stays machine-readable.
    pub fn glyph(self) -> &'static str {
        match self {
            Self::System => "📢",
            Self::Movement => "🚶",
            Self::Join => "✨",
            Self::Leave => "👋",
            Self::AiNarration => "⚡",
            Self::Ability => "🎯",
            Self::Generic => "",
        }
    }
}

/// One event-log record.
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub kind: LogKind,
    /// Local arrival time; the log orders by arrival, not server time.
    pub timestamp: DateTime<Local>,
    /// Human-readable body, composed per kind by the classifier.
    pub text: String,
}

impl LogEntry {
    /// Create an entry stamped with the current local time.
    pub fn new(kind: LogKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            timestamp: Local::now(),
            text: text.into(),
        }
    }

    /// Render the display line for this entry.
    pub fn render(&self) -> String {
        let ts = self.timestamp.format("%H:%M:%S");
        match self.kind {
            LogKind::Generic => format!("[{ts}] {}", self.text),
            LogKind::AiNarration => {
                format!("[{ts}] {} AI Event: {}", self.kind.glyph(), self.text)
            }
            kind => format!("[{ts}] {} {}", kind.glyph(), self.text),
        }
    }
}

/// One chat record. Whispers carry `is_whisper` and a synthesized prefix in
/// `text` (`*whispers*` inbound, `*whispers to <target>*` on the local echo);
/// beyond that they are ordinary chat.
#[derive(Debug, Clone)]
pub struct ChatEntry {
    pub speaker: String,
    pub text: String,
    pub timestamp: DateTime<Local>,
    pub is_whisper: bool,
}

impl ChatEntry {
    /// Create an entry stamped with the current local time.
    pub fn new(speaker: impl Into<String>, text: impl Into<String>, is_whisper: bool) -> Self {
        Self {
            speaker: speaker.into(),
            text: text.into(),
            timestamp: Local::now(),
            is_whisper,
        }
    }

    /// Render the display line for this entry.
    pub fn render(&self) -> String {
        let ts = self.timestamp.format("%H:%M:%S");
        format!("[{ts}] {}: {}", self.speaker, self.text)
    }
}

/// Append-only history of classified events.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Vec<LogEntry>,
}

impl EventLog {
    pub fn append(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Append-only chat history, separate surface from the event log.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    entries: Vec<ChatEntry>,
}

impl ChatLog {
    pub fn append(&mut self, entry: ChatEntry) {
        self.entries.push(entry);
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
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
    fn every_kind_except_generic_has_a_glyph() {
        let kinds = [
            LogKind::System,
            LogKind::Movement,
            LogKind::Join,
            LogKind::Leave,
            LogKind::AiNarration,
            LogKind::Ability,
        ];
        for kind in kinds {
            assert!(!kind.glyph().is_empty(), "{kind:?} should have a glyph");
        }
        assert!(LogKind::Generic.glyph().is_empty());
    }

    #[test]
    fn render_prefixes_timestamp_and_glyph() {
        let entry = LogEntry::new(LogKind::Join, "Bob joined the game");
        let line = entry.render();
        assert!(line.starts_with('['), "line should open with a timestamp: {line}");
        assert!(line.contains("✨ Bob joined the game"), "got: {line}");
    }

    #[test]
    fn ai_narration_renders_with_label() {
        let entry = LogEntry::new(LogKind::AiNarration, "Shadows flicker in Attic.");
        let line = entry.render();
        assert!(line.contains("⚡ AI Event: Shadows flicker in Attic."), "got: {line}");
    }

    #[test]
    fn generic_renders_without_glyph() {
        let entry = LogEntry::new(LogKind::Generic, r#"{"type":"mystery"}"#);
        let line = entry.render();
        assert!(line.ends_with(r#"] {"type":"mystery"}"#), "got: {line}");
    }

    #[test]
    fn chat_render_shows_speaker() {
        let entry = ChatEntry::new("Ann", "anyone in the Library?", false);
        let line = entry.render();
        assert!(line.contains("Ann: anyone in the Library?"), "got: {line}");
    }

    #[test]
    fn logs_preserve_arrival_order() {
        let mut log = EventLog::default();
        log.append(LogEntry::new(LogKind::System, "first"));
        log.append(LogEntry::new(LogKind::System, "second"));
        log.append(LogEntry::new(LogKind::Generic, "third"));
        let texts: Vec<&str> = log.entries().iter().map(|e| e.text.as_str()).collect();
        assert_eq!(texts, ["first", "second", "third"]);
        assert_eq!(log.len(), 3);
        assert!(!log.is_empty());
    }
}
