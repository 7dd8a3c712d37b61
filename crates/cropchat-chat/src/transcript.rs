//! Append-only transcript of one chat view.

use serde::Serialize;

use cropchat_core::events::Sender;

use crate::error::ChatError;

const GREETING_TEXT: &str = "Hello there!";

const GREETING_SUBTITLE: &str = "Ask me anything about your crops, soil, or farming practices. \
I'm here to help you make informed decisions for a successful harvest.";

const EXAMPLE_RECOMMENDATION: &str = "For sandy soil in the rainy season, you should consider \
crops like sweet potatoes, peanuts, cowpeas, and certain varieties of maize. They are \
well-adapted to good drainage and can thrive in such conditions. Would you like me to \
elaborate on any of these?";

/// One rendered message in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptEntry {
    pub sender: Sender,
    /// Rendered message body.
    pub text: String,
    /// Explanatory text under the opening greeting.
    pub subtitle: Option<String>,
    /// Seeded at mount rather than produced by a round-trip.
    pub is_initial: bool,
}

impl TranscriptEntry {
    /// An entry typed or spoken by the user.
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            text: text.into(),
            subtitle: None,
            is_initial: false,
        }
    }

    /// An entry produced by the advisory agent.
    pub fn agent(text: impl Into<String>) -> Self {
        Self {
            sender: Sender::Agent,
            text: text.into(),
            subtitle: None,
            is_initial: false,
        }
    }

    fn greeting() -> Self {
        Self {
            sender: Sender::Agent,
            text: GREETING_TEXT.to_string(),
            subtitle: Some(GREETING_SUBTITLE.to_string()),
            is_initial: true,
        }
    }
}

/// Ordered, append-only sequence of entries.
///
/// Entries are never mutated or removed once appended; indices are stable
/// for the lifetime of the transcript.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    entries: Vec<TranscriptEntry>,
}

impl Transcript {
    /// An empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// The opening transcript of every mounted view: the greeting followed by
    /// one example recommendation.
    pub fn seeded() -> Self {
        Self {
            entries: vec![
                TranscriptEntry::greeting(),
                TranscriptEntry::agent(EXAMPLE_RECOMMENDATION),
            ],
        }
    }

    /// Append an entry and return its index.
    ///
    /// Rejects entries with neither text nor a subtitle.
    pub fn append(&mut self, entry: TranscriptEntry) -> Result<usize, ChatError> {
        if entry.text.is_empty() && entry.subtitle.is_none() {
            return Err(ChatError::EmptyEntry);
        }
        self.entries.push(entry);
        Ok(self.entries.len() - 1)
    }

    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&TranscriptEntry> {
        self.entries.get(index)
    }

    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
