//! crates/lessongen_core/src/domain.rs
//!
//! The Lesson Document Model: the canonical in-memory representation of one
//! generated lesson. These structs are pure data plus receipt-time validation;
//! the pagination layer only ever reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Difficulty of the generated material.
///
/// Closed set: any other value coming back from the generator fails
/// deserialization, which is treated as a malformed document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DifficultyLevel {
    Beginner,
    Intermediate,
    Advanced,
}

impl DifficultyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyLevel::Beginner => "Beginner",
            DifficultyLevel::Intermediate => "Intermediate",
            DifficultyLevel::Advanced => "Advanced",
        }
    }
}

/// One turn of the teacher-script dialogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogueLine {
    pub speaker: String,
    pub text: String,
}

/// A multiple-choice question used in Part A (listening) and Part F (reading).
///
/// `correct_answer` is free text from the generator; it is not trusted to
/// carry an option letter. The answer-key deriver recovers the letter by
/// correlating it against `options`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: u32,
    pub text: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

/// One row of the vocabulary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabularyItem {
    pub word: String,
    pub part_of_speech: String,
    pub definition: String,
    pub chinese: String,
    pub example: String,
}

/// The four vocabulary-quiz item kinds. Closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VocabTestType {
    MultipleChoice,
    FillInTheBlank,
    TrueFalse,
    Unscramble,
}

/// One item of the vocabulary quiz. `options` is required for
/// `multiple_choice` items and `scrambled_word` for `unscramble` items;
/// `validate` enforces this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VocabTestQuestion {
    pub id: u32,
    #[serde(rename = "type")]
    pub question_type: VocabTestType,
    pub question_text: String,
    #[serde(default)]
    pub options: Option<Vec<String>>,
    pub correct_answer: String,
    #[serde(default)]
    pub scrambled_word: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartA {
    pub questions: Vec<Question>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartB {
    pub prompts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartC {
    pub theme: String,
    pub points: Vec<String>,
}

/// One entry of the Part D correction list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Correction {
    pub mistake: String,
    pub correction: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartD {
    pub text_with_errors: String,
    pub corrections: Vec<Correction>,
}

/// Part E content. The translation passage, essay prompt, and essay points
/// arrive in Traditional Chinese; the core treats them as opaque text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartE {
    pub translation_passage: String,
    pub essay_prompt: String,
    pub essay_points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartF {
    pub passage: String,
    pub questions: Vec<Question>,
}

/// A structural problem inside an otherwise well-formed generator response.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DocumentError {
    #[error("lesson is missing required content: {0}")]
    MissingContent(&'static str),
    #[error("question {id} must offer exactly {expected} options, got {actual}")]
    WrongOptionCount {
        id: u32,
        expected: usize,
        actual: usize,
    },
    #[error("vocab test question {id}: {reason}")]
    InvalidVocabTestQuestion { id: u32, reason: &'static str },
}

/// The number of options every multiple-choice question must carry (A-D).
pub const OPTIONS_PER_QUESTION: usize = 4;

/// The lesson content exactly as the generation collaborator returns it,
/// before any server-side metadata is attached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonPayload {
    pub topic_title: String,
    pub dialogue_script: Vec<DialogueLine>,
    pub part_a: PartA,
    pub vocabulary: Vec<VocabularyItem>,
    pub vocab_test: Vec<VocabTestQuestion>,
    pub part_b: PartB,
    pub part_c: PartC,
    pub part_d: PartD,
    pub part_e: PartE,
    pub part_f: PartF,
}

impl LessonPayload {
    /// Checks the structural invariants the generator is supposed to honor.
    ///
    /// Returns the first violation found. A payload that fails here is never
    /// partially accepted.
    pub fn validate(&self) -> Result<(), DocumentError> {
        use DocumentError::MissingContent;

        if self.topic_title.trim().is_empty() {
            return Err(MissingContent("topicTitle"));
        }
        if self.dialogue_script.is_empty() {
            return Err(MissingContent("dialogueScript"));
        }
        if self.part_a.questions.is_empty() {
            return Err(MissingContent("partA.questions"));
        }
        if self.vocabulary.is_empty() {
            return Err(MissingContent("vocabulary"));
        }
        if self.vocab_test.is_empty() {
            return Err(MissingContent("vocabTest"));
        }
        if self.part_b.prompts.is_empty() {
            return Err(MissingContent("partB.prompts"));
        }
        if self.part_c.theme.trim().is_empty() {
            return Err(MissingContent("partC.theme"));
        }
        if self.part_c.points.is_empty() {
            return Err(MissingContent("partC.points"));
        }
        if self.part_d.text_with_errors.trim().is_empty() {
            return Err(MissingContent("partD.textWithErrors"));
        }
        if self.part_d.corrections.is_empty() {
            return Err(MissingContent("partD.corrections"));
        }
        if self.part_e.translation_passage.trim().is_empty() {
            return Err(MissingContent("partE.translationPassage"));
        }
        if self.part_e.essay_prompt.trim().is_empty() {
            return Err(MissingContent("partE.essayPrompt"));
        }
        if self.part_f.passage.trim().is_empty() {
            return Err(MissingContent("partF.passage"));
        }
        if self.part_f.questions.is_empty() {
            return Err(MissingContent("partF.questions"));
        }

        for question in self.part_a.questions.iter().chain(&self.part_f.questions) {
            if question.options.len() != OPTIONS_PER_QUESTION {
                return Err(DocumentError::WrongOptionCount {
                    id: question.id,
                    expected: OPTIONS_PER_QUESTION,
                    actual: question.options.len(),
                });
            }
        }

        for item in &self.vocab_test {
            match item.question_type {
                VocabTestType::MultipleChoice => {
                    if item.options.as_ref().is_none_or(|opts| opts.is_empty()) {
                        return Err(DocumentError::InvalidVocabTestQuestion {
                            id: item.id,
                            reason: "multiple_choice items require options",
                        });
                    }
                }
                VocabTestType::Unscramble => {
                    if item
                        .scrambled_word
                        .as_ref()
                        .is_none_or(|w| w.trim().is_empty())
                    {
                        return Err(DocumentError::InvalidVocabTestQuestion {
                            id: item.id,
                            reason: "unscramble items require a scrambledWord",
                        });
                    }
                }
                VocabTestType::FillInTheBlank | VocabTestType::TrueFalse => {}
            }
        }

        Ok(())
    }
}

/// The root aggregate: a validated lesson plus the metadata the server
/// attaches at receipt time. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonDocument {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// The caller-supplied level. The generator is not trusted to echo the
    /// requested level back, so it is stamped here.
    pub level: DifficultyLevel,
    #[serde(flatten)]
    pub content: LessonPayload,
}

impl LessonDocument {
    /// Validates a generator payload and attaches the server-side metadata:
    /// the requested level, a fresh id, and the creation timestamp.
    pub fn from_payload(
        content: LessonPayload,
        level: DifficultyLevel,
    ) -> Result<Self, DocumentError> {
        content.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            level,
            content,
        })
    }
}

#[cfg(test)]
pub(crate) fn sample_payload() -> LessonPayload {
    let question = |id: u32, text: &str, options: [&str; 4], correct: &str| Question {
        id,
        text: text.to_string(),
        options: options.iter().map(|s| s.to_string()).collect(),
        correct_answer: correct.to_string(),
    };

    LessonPayload {
        topic_title: "Space Exploration".to_string(),
        dialogue_script: vec![
            DialogueLine {
                speaker: "Maya".to_string(),
                text: "Did you watch the rocket launch last night?".to_string(),
            },
            DialogueLine {
                speaker: "Kenji".to_string(),
                text: "I did! It was heading for the space station.".to_string(),
            },
        ],
        part_a: PartA {
            questions: vec![
                question(
                    1,
                    "Where was the rocket heading?",
                    ["The moon", "The space station", "Mars", "A satellite"],
                    "The space station",
                ),
                question(
                    2,
                    "Who watched the launch?",
                    ["Maya", "Kenji", "Both of them", "Neither of them"],
                    "Both of them",
                ),
                question(
                    3,
                    "When did the launch happen?",
                    ["Last night", "This morning", "Last week", "Yesterday noon"],
                    "Last night",
                ),
            ],
        },
        vocabulary: vec![VocabularyItem {
            word: "orbit".to_string(),
            part_of_speech: "noun".to_string(),
            definition: "the curved path of an object around a planet or star".to_string(),
            chinese: "軌道".to_string(),
            example: "The satellite stays in orbit around the Earth.".to_string(),
        }],
        vocab_test: vec![
            VocabTestQuestion {
                id: 1,
                question_type: VocabTestType::MultipleChoice,
                question_text: "Which word means the curved path around a planet?".to_string(),
                options: Some(vec![
                    "orbit".to_string(),
                    "gravity".to_string(),
                    "rocket".to_string(),
                    "crater".to_string(),
                ]),
                correct_answer: "orbit".to_string(),
                scrambled_word: None,
            },
            VocabTestQuestion {
                id: 2,
                question_type: VocabTestType::FillInTheBlank,
                question_text: "The probe entered ___ around Mars.".to_string(),
                options: None,
                correct_answer: "orbit".to_string(),
                scrambled_word: None,
            },
        ],
        part_b: PartB {
            prompts: vec![
                "Describe a planet you would like to visit.".to_string(),
                "Why do people explore space?".to_string(),
            ],
        },
        part_c: PartC {
            theme: "Living on another planet".to_string(),
            points: vec![
                "What would you miss most about Earth?".to_string(),
                "What problems would settlers face?".to_string(),
            ],
        },
        part_d: PartD {
            text_with_errors: "The astronauts goes to the moon last year.".to_string(),
            corrections: vec![Correction {
                mistake: "goes".to_string(),
                correction: "went".to_string(),
            }],
        },
        part_e: PartE {
            translation_passage: "太空探索改變了我們對宇宙的理解。".to_string(),
            essay_prompt: "我最想探索的星球".to_string(),
            essay_points: vec!["描述這個星球".to_string(), "解釋你的理由".to_string()],
        },
        part_f: PartF {
            passage: "The first satellites were small.\nToday they guide our daily lives."
                .to_string(),
            questions: vec![question(
                1,
                "What guides our daily lives today?",
                ["Rockets", "Satellites", "Telescopes", "Probes"],
                "Satellites",
            )],
        },
    }
}

#[cfg(test)]
pub(crate) fn sample_document() -> LessonDocument {
    LessonDocument::from_payload(sample_payload(), DifficultyLevel::Intermediate)
        .expect("sample payload should validate")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_payload_passes() {
        assert_eq!(sample_payload().validate(), Ok(()));
    }

    #[test]
    fn from_payload_attaches_metadata() {
        let doc = LessonDocument::from_payload(sample_payload(), DifficultyLevel::Advanced)
            .expect("should validate");
        assert_eq!(doc.level, DifficultyLevel::Advanced);
        assert_eq!(doc.content.topic_title, "Space Exploration");
    }

    #[test]
    fn empty_topic_is_rejected() {
        let mut payload = sample_payload();
        payload.topic_title = "   ".to_string();
        assert_eq!(
            payload.validate(),
            Err(DocumentError::MissingContent("topicTitle"))
        );
    }

    #[test]
    fn wrong_option_count_is_rejected() {
        let mut payload = sample_payload();
        payload.part_a.questions[0].options.pop();
        assert_eq!(
            payload.validate(),
            Err(DocumentError::WrongOptionCount {
                id: 1,
                expected: OPTIONS_PER_QUESTION,
                actual: 3,
            })
        );
    }

    #[test]
    fn multiple_choice_quiz_item_requires_options() {
        let mut payload = sample_payload();
        payload.vocab_test[0].options = None;
        assert!(matches!(
            payload.validate(),
            Err(DocumentError::InvalidVocabTestQuestion { id: 1, .. })
        ));
    }

    #[test]
    fn unscramble_quiz_item_requires_scrambled_word() {
        let mut payload = sample_payload();
        payload.vocab_test.push(VocabTestQuestion {
            id: 3,
            question_type: VocabTestType::Unscramble,
            question_text: "Unscramble this word".to_string(),
            options: None,
            correct_answer: "orbit".to_string(),
            scrambled_word: None,
        });
        assert!(matches!(
            payload.validate(),
            Err(DocumentError::InvalidVocabTestQuestion { id: 3, .. })
        ));
    }

    #[test]
    fn unknown_level_fails_deserialization() {
        let result: Result<DifficultyLevel, _> = serde_json::from_str("\"Expert\"");
        assert!(result.is_err());
    }

    #[test]
    fn payload_round_trips_through_generator_json() {
        let json = serde_json::to_string(&sample_payload()).expect("serialize");
        assert!(json.contains("\"topicTitle\""));
        assert!(json.contains("\"correctAnswer\""));
        let back: LessonPayload = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, sample_payload());
    }
}
