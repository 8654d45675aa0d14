//! crates/lessongen_core/src/ports.rs
//!
//! Service contracts (traits) for the external collaborators. These form
//! the boundary of the hexagonal architecture: the core stays independent
//! of the concrete AI clients and the persistence backend.

use async_trait::async_trait;

use crate::domain::{DialogueLine, DifficultyLevel, DocumentError, LessonPayload};
use crate::history::LessonHistory;

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// A required credential or setting for the collaborator is missing.
    /// Fatal for that action only.
    #[error("Collaborator is not configured: {0}")]
    NotConfigured(String),
    /// The collaborator responded, but the document violates the schema.
    /// Never partially accepted.
    #[error("Generated lesson is malformed: {0}")]
    MalformedDocument(#[from] DocumentError),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// The generation collaborator: turns a topic and level into a full,
/// schema-conforming lesson payload. Model selection, prompt construction,
/// and schema enforcement live behind this boundary.
#[async_trait]
pub trait LessonGenerationService: Send + Sync {
    async fn generate_lesson(
        &self,
        topic: &str,
        level: DifficultyLevel,
    ) -> PortResult<LessonPayload>;
}

/// The speech-synthesis collaborator: turns the speaker-tagged dialogue into
/// raw 24 kHz mono 16-bit little-endian PCM bytes. The core decodes or
/// container-wraps those bytes itself.
#[async_trait]
pub trait SpeechSynthesisService: Send + Sync {
    async fn synthesize_dialogue(&self, lines: &[DialogueLine]) -> PortResult<Vec<u8>>;
}

/// The persistence boundary for lesson history: the whole bounded list is
/// read and written as one unit (read-modify-write, no partial writers).
/// Implementations treat an undecodable stored blob as empty history.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn load(&self) -> PortResult<LessonHistory>;
    async fn save(&self, history: &LessonHistory) -> PortResult<()>;
}
