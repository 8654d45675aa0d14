//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use lessongen_core::ports::{HistoryStore, LessonGenerationService, SpeechSynthesisService};
use lessongen_core::session::LessonSession;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::sync::Mutex;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all
/// handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub history: Arc<dyn HistoryStore>,
    pub generator: Arc<dyn LessonGenerationService>,
    pub tts: Arc<dyn SpeechSynthesisService>,
    /// The single lesson session, driven through its reducer. All display
    /// state lives here; handlers never mutate documents in place.
    pub session: Mutex<LessonSession>,
    /// Disables re-entrant triggering of the audio export while a previous
    /// synthesis is still in flight.
    pub audio_export_busy: AtomicBool,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        history: Arc<dyn HistoryStore>,
        generator: Arc<dyn LessonGenerationService>,
        tts: Arc<dyn SpeechSynthesisService>,
    ) -> Self {
        Self {
            config,
            history,
            generator,
            tts,
            session: Mutex::new(LessonSession::new()),
            audio_export_busy: AtomicBool::new(false),
        }
    }
}
