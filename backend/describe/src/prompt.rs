//! Prompt rendering for the description pipeline.
//!
//! Everything here is pure templating: the image arrives already framed and
//! is attached untouched.

use blindspot_core::{HistoryEntry, ImportanceRange, InlineImage};

/// Heading of the history block; absent when there is no history.
pub const HISTORY_HEADER: &str = "Here are previous descriptions you've provided for context:";

/// Text accompanying the image in the user turn.
pub const USER_PROMPT: &str =
    "Describe what is in front of me right now, following the instructions.";

/// A fully rendered prompt, ready for a vision model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptSpec {
    pub system_prompt: String,
    pub user_prompt: String,
    pub image: InlineImage,
}

/// Renders the fixed guide instructions around history and schema text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder {
    range: ImportanceRange,
}

impl PromptBuilder {
    pub fn new(range: ImportanceRange) -> Self {
        Self { range }
    }

    pub fn build(
        &self,
        history: &[HistoryEntry],
        format_instructions: &str,
        image: &InlineImage,
    ) -> PromptSpec {
        let mut system_prompt = self.instructions();
        system_prompt.push_str("\n\nThe format instructions are:\n");
        system_prompt.push_str(format_instructions);

        if let Some(block) = format_history(history) {
            system_prompt.push_str("\n\n");
            system_prompt.push_str(&block);
        }

        PromptSpec {
            system_prompt,
            user_prompt: USER_PROMPT.to_string(),
            image: image.clone(),
        }
    }

    fn instructions(&self) -> String {
        let ImportanceRange { min, max } = self.range;
        format!(
            "You are a calm, friendly guide walking beside a blind person. You receive a photo \
of what is in front of them and describe it so they can move safely. Do not curse.\n\
\n\
Return two fields: a description and an importance level.\n\
- description: a clear, concise description of the scene, two sentences at most. Focus on \
obstacles and people in their path. Always include directions (left, right, straight ahead) \
and your best estimate of the distance to any important item, in meters. Say whether there \
is space to keep moving forward, whether there is anyone or anything they could hit, and \
whether the path ahead is blocked. Never begin the description with the words \"the image\". \
Do not repeat phrases at the end of the description.\n\
- importance: an integer between {min} and {max}, where {min} is the least important and \
{max} the most important. Base it on how much attention the surroundings need: a clear path \
ahead is {min}; a busy crowd, like a packed city crossing, sits around the middle; an imminent \
hazard such as stairs, traffic or an obstacle within a step is near {max}.\n\
\n\
If previous descriptions are listed below, use them as background knowledge for continuity \
and to tune the importance level, but only refer back to them when it actually helps."
        )
    }
}

/// One line per entry, oldest first, numbered from 1.
pub fn format_history(history: &[HistoryEntry]) -> Option<String> {
    if history.is_empty() {
        return None;
    }

    let lines = history
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            format!(
                "Previous description {}: {} (Importance: {})",
                i + 1,
                entry.description,
                entry.importance
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    Some(format!("{HISTORY_HEADER}\n{lines}"))
}
