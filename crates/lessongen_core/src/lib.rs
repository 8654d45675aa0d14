pub mod answer_key;
pub mod audio;
pub mod domain;
pub mod history;
pub mod ports;
pub mod session;
pub mod worksheet;

pub use domain::{
    DialogueLine, DifficultyLevel, DocumentError, LessonDocument, LessonPayload, Question,
    VocabTestQuestion, VocabTestType, VocabularyItem,
};
pub use history::{LessonHistory, HISTORY_LIMIT, HISTORY_STORAGE_KEY};
pub use ports::{HistoryStore, LessonGenerationService, PortError, PortResult,
    SpeechSynthesisService};
pub use session::{GenerateEffect, LessonSession, RequestToken, SessionError, SessionPhase};
pub use worksheet::{ExportProfile, WorksheetDocument};
