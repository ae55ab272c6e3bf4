//! Canned output used when the LLM is unavailable.

use std::time::Duration;

/// Number of leading characters of the prompt echoed in a simulated response.
pub const SIMULATION_PREVIEW_CHARS: usize = 50;

/// Artificial delay of the legacy simulation entry point.
pub const SIMULATION_DELAY: Duration = Duration::from_millis(300);

/// Build the simulated sample output for a prompt.
///
/// Echoes the first [`SIMULATION_PREVIEW_CHARS`] characters (not bytes) of
/// the input so multi-byte text is never split mid-character.
pub fn simulated_output(prompt_text: &str) -> String {
    let trimmed = prompt_text.trim();
    let preview: String = trimmed.chars().take(SIMULATION_PREVIEW_CHARS).collect();
    let ellipsis = if trimmed.chars().count() > SIMULATION_PREVIEW_CHARS {
        "..."
    } else {
        ""
    };

    format!(
        "This is a simulated response to your prompt: \"{preview}{ellipsis}\"\n\n\
         The AI output service was unavailable when this prompt was processed, so a \
         placeholder was generated instead. Refresh the prompt to request a real sample output."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echoes_short_prompt_verbatim() {
        let out = simulated_output("Summarize this article");
        assert!(out.contains("\"Summarize this article\""));
        assert!(out.contains("simulated"));
    }

    #[test]
    fn truncates_to_fifty_chars() {
        let prompt = "a".repeat(80);
        let out = simulated_output(&prompt);
        assert!(out.contains(&format!("\"{}...\"", "a".repeat(50))));
        assert!(!out.contains(&"a".repeat(51)));
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        let prompt = "é".repeat(60);
        let out = simulated_output(&prompt);
        assert!(out.contains(&"é".repeat(50)));
    }
}
