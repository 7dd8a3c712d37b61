//! Plain-text rendering of transcript entries and speech notices.

use cropchat_chat::{SpeechStatus, TranscriptEntry};
use cropchat_core::events::Sender;

pub const NOT_SUPPORTED_NOTICE: &str = "Speech input is not supported in this environment.";

pub const LOGOUT_NOTICE: &str = "Your session has expired. Please log in again.";

fn label(sender: Sender) -> &'static str {
    match sender {
        Sender::User => "You",
        Sender::Agent => "Advisor",
    }
}

/// Format one entry for the terminal.
pub fn format_entry(entry: &TranscriptEntry) -> String {
    let mut out = format!("{}: {}", label(entry.sender), entry.text);
    if let Some(ref subtitle) = entry.subtitle {
        out.push_str("\n    ");
        out.push_str(subtitle);
    }
    out
}

/// Entries past the last rendered index. Advances `rendered` to the end, so
/// a renderer that missed notifications catches up on its next call.
pub fn take_unrendered<'a>(entries: &'a [TranscriptEntry], rendered: &mut usize) -> &'a [TranscriptEntry] {
    let fresh = entries.get(*rendered..).unwrap_or(&[]);
    *rendered = (*rendered).max(entries.len());
    fresh
}

pub fn speech_notice(status: SpeechStatus) -> &'static str {
    match status {
        SpeechStatus::Listening => "Listening... run /mic again to stop.",
        SpeechStatus::Idle => "Stopped listening.",
        SpeechStatus::NotSupported => NOT_SUPPORTED_NOTICE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_user_entry() {
        let entry = TranscriptEntry::user("When should I irrigate wheat?");
        assert_eq!(format_entry(&entry), "You: When should I irrigate wheat?");
    }

    #[test]
    fn test_format_entry_with_subtitle() {
        let mut entry = TranscriptEntry::agent("Hello there!");
        entry.subtitle = Some("Ask me anything.".to_string());
        assert_eq!(format_entry(&entry), "Advisor: Hello there!\n    Ask me anything.");
    }

    #[test]
    fn test_take_unrendered_catches_up() {
        let entries = vec![
            TranscriptEntry::agent("Hello"),
            TranscriptEntry::user("one"),
            TranscriptEntry::agent("two"),
            TranscriptEntry::user("three"),
        ];
        let mut rendered = 0;

        assert_eq!(take_unrendered(&entries[..2], &mut rendered).len(), 2);
        assert_eq!(rendered, 2);

        // Several appends behind a single notification come out together.
        let fresh = take_unrendered(&entries, &mut rendered);
        assert_eq!(fresh.len(), 2);
        assert_eq!(fresh[0].text, "two");
        assert_eq!(fresh[1].text, "three");
        assert!(take_unrendered(&entries, &mut rendered).is_empty());
    }

    #[test]
    fn test_take_unrendered_past_end() {
        let entries = vec![TranscriptEntry::agent("Hello")];
        let mut rendered = 5;
        assert!(take_unrendered(&entries, &mut rendered).is_empty());
        assert_eq!(rendered, 5);
    }

    #[test]
    fn test_not_supported_notice() {
        assert_eq!(speech_notice(SpeechStatus::NotSupported), NOT_SUPPORTED_NOTICE);
    }
}
