pub mod history;
pub mod lesson_llm;
pub mod tts;
pub mod wav;

pub use history::DbHistoryStore;
pub use lesson_llm::OpenAiLessonAdapter;
pub use tts::OpenAiTtsAdapter;
