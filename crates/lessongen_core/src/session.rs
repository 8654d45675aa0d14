//! crates/lessongen_core/src/session.rs
//!
//! The lesson session state machine: explicit application state plus a
//! unidirectional update cycle. Commands return the side effect to run;
//! completion events carry the request token they belong to, and stale
//! results (superseded by a newer request) are discarded instead of
//! overwriting newer content.

use crate::domain::{DifficultyLevel, LessonDocument};

/// Monotonically increasing identifier for asynchronous generation requests.
pub type RequestToken = u64;

/// The phases a lesson session moves through.
#[derive(Debug, Clone)]
pub enum SessionPhase {
    /// No lesson displayed, nothing in flight.
    Idle,
    /// A fresh generation is in flight; nothing is displayed yet.
    Generating {
        topic: String,
        level: DifficultyLevel,
        token: RequestToken,
    },
    /// A lesson is displayed.
    Displaying { document: LessonDocument },
    /// A level change triggered a full regeneration. The current document
    /// stays displayed and is preserved if the regeneration fails.
    Regenerating {
        current: LessonDocument,
        level: DifficultyLevel,
        token: RequestToken,
    },
    /// A fresh generation failed; the message carries the retry affordance.
    Failed { message: String },
}

/// The side effect a command asks the caller to run: invoke the generation
/// collaborator and report back with the same token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateEffect {
    pub topic: String,
    pub level: DifficultyLevel,
    pub token: RequestToken,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("a topic is required to generate a lesson")]
    EmptyTopic,
    #[error("no lesson is currently displayed")]
    NothingDisplayed,
}

/// Owns the current phase and the token counter. All transitions are
/// synchronous; the async work happens outside and feeds results back in.
#[derive(Debug, Default)]
pub struct LessonSession {
    phase: SessionPhase,
    last_token: RequestToken,
}

impl Default for SessionPhase {
    fn default() -> Self {
        SessionPhase::Idle
    }
}

impl LessonSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// The document currently on screen, if any.
    pub fn current_document(&self) -> Option<&LessonDocument> {
        match &self.phase {
            SessionPhase::Displaying { document } => Some(document),
            SessionPhase::Regenerating { current, .. } => Some(current),
            _ => None,
        }
    }

    fn issue_token(&mut self) -> RequestToken {
        self.last_token += 1;
        self.last_token
    }

    /// Starts a fresh generation. The previous display state is discarded;
    /// any still-in-flight request is superseded by the new token.
    pub fn begin_generation(
        &mut self,
        topic: &str,
        level: DifficultyLevel,
    ) -> Result<GenerateEffect, SessionError> {
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(SessionError::EmptyTopic);
        }
        let token = self.issue_token();
        self.phase = SessionPhase::Generating {
            topic: topic.to_string(),
            level,
            token,
        };
        Ok(GenerateEffect {
            topic: topic.to_string(),
            level,
            token,
        })
    }

    /// A level change while a document is displayed triggers a full
    /// regeneration with the same topic. Difficulty affects generated
    /// content, not just layout, so this is a re-fetch.
    pub fn change_level(
        &mut self,
        level: DifficultyLevel,
    ) -> Result<GenerateEffect, SessionError> {
        match std::mem::take(&mut self.phase) {
            SessionPhase::Displaying { document } => {
                let token = self.issue_token();
                let topic = document.content.topic_title.clone();
                self.phase = SessionPhase::Regenerating {
                    current: document,
                    level,
                    token,
                };
                Ok(GenerateEffect { topic, level, token })
            }
            other => {
                self.phase = other;
                Err(SessionError::NothingDisplayed)
            }
        }
    }

    /// Applies a successful generation result. Returns `false` when the
    /// token has been superseded, in which case the result is discarded and
    /// the current phase is untouched.
    pub fn generation_succeeded(
        &mut self,
        token: RequestToken,
        document: LessonDocument,
    ) -> bool {
        match &self.phase {
            SessionPhase::Generating { token: t, .. }
            | SessionPhase::Regenerating { token: t, .. }
                if *t == token =>
            {
                self.phase = SessionPhase::Displaying { document };
                true
            }
            _ => false,
        }
    }

    /// Applies a failed generation result. A fresh generation moves to
    /// `Failed` with the message and installs no document; a failed
    /// regeneration preserves the previously displayed document. Stale
    /// failures are discarded.
    pub fn generation_failed(&mut self, token: RequestToken, message: String) -> bool {
        match std::mem::take(&mut self.phase) {
            SessionPhase::Generating { token: t, .. } if t == token => {
                self.phase = SessionPhase::Failed { message };
                true
            }
            SessionPhase::Regenerating {
                current, token: t, ..
            } if t == token => {
                self.phase = SessionPhase::Displaying { document: current };
                true
            }
            other => {
                self.phase = other;
                false
            }
        }
    }

    /// Installs a document loaded from history (an independent copy) and
    /// invalidates any in-flight request.
    pub fn load_document(&mut self, document: LessonDocument) {
        self.issue_token();
        self.phase = SessionPhase::Displaying { document };
    }

    /// Returns to the initial state and invalidates any in-flight request.
    pub fn reset(&mut self) {
        self.issue_token();
        self.phase = SessionPhase::Idle;
    }
}
