//! services/api/src/adapters/lesson_llm.rs
//!
//! This module contains the adapter for the lesson-generation LLM.
//! It implements the `LessonGenerationService` port from the `core` crate.

const SYSTEM_INSTRUCTIONS: &str = r#"You are an expert ESL (English as a Second Language) curriculum developer.
Create a comprehensive lesson plan based on the user's theme.
{level_instruction}

The lesson must follow this exact structure:

1. **Dialogue (Teacher's Script)**: A creative dialogue between two people about the theme.
   - CRITICAL: Use the characters **{char1}** and **{char2}**. Do NOT use other names.
   - Length: 200-250 words.

2. **Part A - Listening**: 10 MCQs based on the dialogue.
   - 'options' MUST NOT include labels. Distribute 'correctAnswer' evenly across A, B, C, and D.

3. **Vocabulary**: Exactly 15 words/phrases from the theme.

4. **Vocabulary Test**: Create a 1-page test (approx 12-15 items) based on the vocabulary words above.
   - Use a mix of: Multiple Choice (definition to word), Fill in the blank (sentence completion), True/False (usage), and Unscramble (spelling).
   - Ensure high variety in question types.

5. **Part B - Writing x Reading**: 3 short answer prompts.

6. **Part C - Speaking**: Discussion points.

7. **Part D - Spelling x Finding Mistakes**: A paragraph with 8-10 mistakes.

8. **Part E - Translation x Essay**:
   - Translation (Traditional Chinese to English).
   - Essay prompt (Title and points in Traditional Chinese).

9. **Part F - Reading Comprehension**: Passage and 5 MCQs.

Respond with ONLY a JSON object matching this schema, no prose around it:
{
  "topicTitle": string,
  "dialogueScript": [{"speaker": string, "text": string}],
  "partA": {"questions": [{"id": int, "text": string, "options": [string, string, string, string], "correctAnswer": string}]},
  "vocabulary": [{"word": string, "partOfSpeech": string, "definition": string, "chinese": string, "example": string}],
  "vocabTest": [{"id": int, "type": "multiple_choice" | "fill_in_the_blank" | "true_false" | "unscramble", "questionText": string, "options": [string] (multiple_choice only), "correctAnswer": string, "scrambledWord": string (unscramble only)}],
  "partB": {"prompts": [string]},
  "partC": {"theme": string, "points": [string]},
  "partD": {"textWithErrors": string, "corrections": [{"mistake": string, "correction": string}]},
  "partE": {"translationPassage": string, "essayPrompt": string, "essayPoints": [string]},
  "partF": {"passage": string, "questions": [{"id": int, "text": string, "options": [string, string, string, string], "correctAnswer": string}]}
}"#;

/// Speaker names drawn at random per generation to force variety in the
/// dialogue characters.
const NAME_POOL: &[&str] = &[
    "Alex", "Jordan", "Taylor", "Morgan", "Casey", "Riley", "Jamie", "Quinn", "Avery", "Peyton",
    "Sam", "Charlie", "Dakota", "Reese", "Skyler", "River", "Sage", "Rowan", "Phoenix", "Finley",
    "Elena", "Kenji", "Maya", "Liam", "Noah", "Olivia", "Emma", "Ava", "Sophia", "Jackson",
    "Lucas", "Oliver", "Ethan", "Aiden", "Hiro", "Yuki", "Zara", "Omar", "Priya", "Ravi",
    "Chen", "Wei", "Hana", "Lars", "Astrid", "Mateo", "Sofia", "Diego", "Valentina",
];

use async_openai::{
    config::OpenAIConfig, error::OpenAIError, types::responses::CreateResponseArgs, Client,
};
use async_trait::async_trait;
use lessongen_core::domain::{DifficultyLevel, LessonPayload};
use lessongen_core::ports::{LessonGenerationService, PortError, PortResult};
use rand::prelude::*;
use tracing::debug;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `LessonGenerationService` using an
/// OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiLessonAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    api_key_present: bool,
}

impl OpenAiLessonAdapter {
    /// Creates a new `OpenAiLessonAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String, api_key_present: bool) -> Self {
        Self {
            client,
            model,
            api_key_present,
        }
    }

    fn level_instruction(level: DifficultyLevel) -> &'static str {
        match level {
            DifficultyLevel::Beginner => {
                "Level: Beginner (A2/B1). Use simple vocabulary and sentence structures."
            }
            DifficultyLevel::Intermediate => {
                "Level: Intermediate (B2). Use standard academic vocabulary and moderate complexity."
            }
            DifficultyLevel::Advanced => {
                "Level: Advanced (C1/C2). Use sophisticated vocabulary, nuanced expressions, and complex grammar."
            }
        }
    }

    fn pick_speakers() -> (&'static str, &'static str) {
        let mut rng = rand::rng();
        let picks: Vec<&&str> = NAME_POOL.choose_multiple(&mut rng, 2).collect();
        match picks.as_slice() {
            [first, second] => (**first, **second),
            _ => ("Alex", "Jordan"),
        }
    }

    /// Strips a Markdown code fence if the model wrapped its JSON in one.
    fn extract_json(raw: &str) -> &str {
        let trimmed = raw.trim();
        let without_open = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .unwrap_or(trimmed);
        without_open.strip_suffix("```").unwrap_or(without_open).trim()
    }
}

//=========================================================================================
// `LessonGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl LessonGenerationService for OpenAiLessonAdapter {
    /// Generates a complete lesson payload for a topic at the given level.
    async fn generate_lesson(
        &self,
        topic: &str,
        level: DifficultyLevel,
    ) -> PortResult<LessonPayload> {
        if !self.api_key_present {
            return Err(PortError::NotConfigured(
                "OPENAI_API_KEY is not set; lesson generation is unavailable".to_string(),
            ));
        }

        let (char1, char2) = Self::pick_speakers();
        let instructions = SYSTEM_INSTRUCTIONS
            .replace("{level_instruction}", Self::level_instruction(level))
            .replace("{char1}", char1)
            .replace("{char2}", char2);

        debug!(topic, level = level.as_str(), "requesting lesson generation");

        let request = CreateResponseArgs::default()
            .model(&self.model)
            .instructions(instructions)
            .input(format!(
                "Create a full lesson plan for the theme: \"{}\"",
                topic
            ))
            .max_output_tokens(16_000u32)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .responses()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let raw = response.output_text().unwrap_or_default();
        if raw.trim().is_empty() {
            return Err(PortError::Unexpected(
                "No response generated from AI.".to_string(),
            ));
        }

        let payload: LessonPayload = serde_json::from_str(Self::extract_json(&raw))
            .map_err(|e| {
                PortError::Unexpected(format!("Failed to generate valid lesson format: {}", e))
            })?;

        // Structural violations inside an otherwise-successful response are
        // rejected here; no partial document ever reaches the session.
        payload.validate()?;
        Ok(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_strips_code_fences() {
        let fenced = "```json\n{\"a\": 1}\n```";
        assert_eq!(OpenAiLessonAdapter::extract_json(fenced), "{\"a\": 1}");

        let bare_fence = "```\n{\"a\": 1}\n```";
        assert_eq!(OpenAiLessonAdapter::extract_json(bare_fence), "{\"a\": 1}");

        let plain = "  {\"a\": 1}  ";
        assert_eq!(OpenAiLessonAdapter::extract_json(plain), "{\"a\": 1}");
    }

    #[test]
    fn speakers_are_distinct() {
        for _ in 0..20 {
            let (a, b) = OpenAiLessonAdapter::pick_speakers();
            assert_ne!(a, b);
            assert!(NAME_POOL.contains(&a));
            assert!(NAME_POOL.contains(&b));
        }
    }

    #[test]
    fn level_instruction_names_the_level() {
        assert!(
            OpenAiLessonAdapter::level_instruction(DifficultyLevel::Beginner)
                .contains("Beginner")
        );
        assert!(
            OpenAiLessonAdapter::level_instruction(DifficultyLevel::Advanced)
                .contains("Advanced")
        );
    }
}
