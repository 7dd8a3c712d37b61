//! Parsing of REPL input lines.

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/quit` or `/exit`.
    Quit,
    /// `/mic`: toggle speech capture.
    Mic,
    /// `/logout`: drop the identity token and leave the chat.
    Logout,
    /// Anything else is sent to the advisor as typed.
    Say(String),
}

pub fn parse_command(line: &str) -> Command {
    match line.trim() {
        "/quit" | "/exit" => Command::Quit,
        "/mic" => Command::Mic,
        "/logout" => Command::Logout,
        _ => Command::Say(line.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slash_commands() {
        assert_eq!(parse_command("/quit"), Command::Quit);
        assert_eq!(parse_command("/exit"), Command::Quit);
        assert_eq!(parse_command("  /mic "), Command::Mic);
        assert_eq!(parse_command("/logout"), Command::Logout);
    }

    #[test]
    fn test_plain_text_is_said_verbatim() {
        assert_eq!(
            parse_command("  How much urea for maize? "),
            Command::Say("  How much urea for maize? ".to_string())
        );
    }

    #[test]
    fn test_unknown_slash_is_said() {
        assert_eq!(parse_command("/help"), Command::Say("/help".to_string()));
    }
}
