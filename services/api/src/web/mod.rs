pub mod rest;
pub mod state;

// Re-export the handlers so the binary that builds the router can reach
// them without spelling the full path.
pub use rest::{
    audio_handler, change_level_handler, generate_lesson_handler, list_history_handler,
    load_lesson_handler, reset_session_handler, session_snapshot_handler, transcript_handler,
    worksheet_handler,
};
