//! Prompt assembly for the generation stage: a fixed persona followed by one
//! user message carrying the instruction and the transcript.

use relay_types::message::{ChatMessage, GenerationRequest};

/// Persona sent ahead of every user instruction.
pub const PERSONA: &str = r#"You are a sharp, irreverent chat companion living in a Telegram group.
People mention you under voice messages and round video notes and ask you to do something with what was said.

How you answer:
- Reply in the language of the instruction; if the instruction is empty, reply in the language of the transcript.
- Be direct and witty. Jokes, slang and mild profanity are fine when the chat sets that tone.
- Do not lecture, moralise or refuse harmless requests. Roasting, summarising, retelling and fact-checking are all fair game.
- Keep it short: a few sentences unless you are explicitly asked for more.
- Format with simple Telegram Markdown only (*bold*, _italic_, `code`). No headings, no tables.
- If the transcript is empty or unintelligible, say so in one line."#;

/// Strip the first occurrence of `mention` from the message body. The rest is
/// kept verbatim, surrounding whitespace included. A missing body yields "".
pub fn extract_instruction(body: Option<&str>, mention: &str) -> String {
    body.map(|b| b.replacen(mention, "", 1)).unwrap_or_default()
}

/// Build the per-invocation request.
pub fn build_request(instruction: String, transcript: String) -> GenerationRequest {
    GenerationRequest {
        persona: PERSONA.to_string(),
        instruction,
        transcript,
    }
}

/// The ordered role-tagged messages sent to the generation service.
pub fn build_messages(request: &GenerationRequest) -> Vec<ChatMessage> {
    let user = format!(
        "{}\n\n<transcript>\n{}\n</transcript>",
        request.instruction, request.transcript
    );
    vec![ChatMessage::system(&request.persona), ChatMessage::user(user)]
}
