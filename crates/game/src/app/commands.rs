//! Slash commands typed into the chat input.

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChatCommand {
    Animate(String),
    Stop,
    ToggleSpeech,
    Listen,
    End,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ChatInput {
    Empty,
    Message(String),
    Command(ChatCommand),
    /// Notice to show instead of sending anything.
    Rejected(String),
}

pub(crate) const HELP_LINES: [&str; 6] = [
    "/anim <name>  play an animation, e.g. /anim wave one hand",
    "/stop         return to the idle pose",
    "/tts          toggle speech output",
    "/listen       speak a message (when supported)",
    "/end          terminate the session",
    "/help         show this list",
];

pub(crate) fn parse_chat_input(raw: &str) -> ChatInput {
    let text = raw.trim();
    if text.is_empty() {
        return ChatInput::Empty;
    }
    let Some(body) = text.strip_prefix('/') else {
        return ChatInput::Message(text.to_string());
    };

    let (name, argument) = match body.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (body, ""),
    };
    let command = match name.to_ascii_lowercase().as_str() {
        "anim" | "animate" => {
            if argument.is_empty() {
                return ChatInput::Rejected("Usage: /anim <name>".to_string());
            }
            ChatCommand::Animate(normalize_animation_name(argument))
        }
        "stop" | "idle" => ChatCommand::Stop,
        "tts" => ChatCommand::ToggleSpeech,
        "listen" => ChatCommand::Listen,
        "end" | "quit" => ChatCommand::End,
        "help" | "?" => ChatCommand::Help,
        _ => {
            return ChatInput::Rejected(format!(
                "Unknown command '/{name}'. Type /help for a list."
            ))
        }
    };
    ChatInput::Command(command)
}

/// `Wave One Hand` and `wave_one_hand` name the same clip.
fn normalize_animation_name(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase()
}
