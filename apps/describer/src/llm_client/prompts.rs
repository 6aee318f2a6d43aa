// Shared prompt fragments and prompt-building utilities.
// Generation-specific defaults live in generation/prompts.rs.

/// Introduces the guideline block inside the system prompt.
pub const GUIDELINES_PREAMBLE: &str =
    "The product descriptions must follow the following guidelines:";

/// Tells the model that the few-shot turns are examples, not conversation.
pub const FEW_SHOT_NOTE: &str =
    "The message history gives you examples of what the expected output looks like";

/// Composes the final system prompt from an editable context and guideline list.
pub fn compose_system_prompt(system_context: &str, guidelines: &str) -> String {
    format!(
        "{}\n\n{}\n{}\n\n{}",
        system_context.trim(),
        GUIDELINES_PREAMBLE,
        guidelines.trim(),
        FEW_SHOT_NOTE
    )
}
