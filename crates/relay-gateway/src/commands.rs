//! Slash commands and inline-query answers. Both are handled before a
//! message reaches the pipeline.

use serde_json::json;

/// Commands advertised through `setMyCommands`.
pub const ADVERTISED: &[(&str, &str)] = &[("hello", "Simple hello world command")];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Hello,
    Start,
}

impl Command {
    pub fn reply_text(self) -> &'static str {
        match self {
            Self::Hello => "Hello, World!",
            Self::Start => "Hello! Use /hello to get a greeting.",
        }
    }
}

/// Parse `/hello`, `/hello@some_bot` or `/start payload`. Anything else,
/// including unknown commands, is `None`.
pub fn parse_command(text: &str) -> Option<Command> {
    let first = text.split_whitespace().next()?;
    let name = first.strip_prefix('/')?;
    let name = name.split('@').next().unwrap_or(name);
    match name {
        "hello" => Some(Command::Hello),
        "start" => Some(Command::Start),
        _ => None,
    }
}

/// Results for `answerInlineQuery`. Only `hello` produces an article.
pub fn inline_results(query: &str) -> Vec<serde_json::Value> {
    if query != "hello" {
        return vec![];
    }
    vec![json!({
        "type": "article",
        "id": "hello-world",
        "title": "Hello World",
        "input_message_content": { "message_text": "Hello, World! 👋" },
    })]
}
