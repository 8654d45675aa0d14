//! services/api/src/adapters/tts.rs
//!
//! This module contains the adapter for OpenAI's Text-to-Speech (TTS)
//! service. It implements the `SpeechSynthesisService` port from the `core`
//! crate, returning raw 24 kHz mono PCM for the dialogue audio pipeline.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::audio::{CreateSpeechRequest, SpeechModel, SpeechResponseFormat, Voice},
    Client,
};
use async_trait::async_trait;
use lessongen_core::audio::synthesis_script;
use lessongen_core::domain::DialogueLine;
use lessongen_core::ports::{PortError, PortResult, SpeechSynthesisService};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements the `SpeechSynthesisService` port using the
/// OpenAI TTS API.
#[derive(Clone)]
pub struct OpenAiTtsAdapter {
    client: Client<OpenAIConfig>,
    model: SpeechModel,
    voice: Voice,
    api_key_present: bool,
}

impl OpenAiTtsAdapter {
    /// Creates a new `OpenAiTtsAdapter`.
    pub fn new(
        client: Client<OpenAIConfig>,
        model: SpeechModel,
        voice: Voice,
        api_key_present: bool,
    ) -> Self {
        Self {
            client,
            model,
            voice,
            api_key_present,
        }
    }
}

//=========================================================================================
// `SpeechSynthesisService` Trait Implementation
//=========================================================================================

#[async_trait]
impl SpeechSynthesisService for OpenAiTtsAdapter {
    /// Synthesizes the whole dialogue script in one call and returns the raw
    /// PCM bytes (24 kHz, mono, 16-bit little-endian).
    async fn synthesize_dialogue(&self, lines: &[DialogueLine]) -> PortResult<Vec<u8>> {
        if !self.api_key_present {
            return Err(PortError::NotConfigured(
                "OPENAI_API_KEY is not set; audio synthesis is unavailable".to_string(),
            ));
        }
        if lines.is_empty() {
            return Err(PortError::Unexpected(
                "dialogue script is empty".to_string(),
            ));
        }

        let request = CreateSpeechRequest {
            model: self.model.clone(),
            input: synthesis_script(lines),
            voice: self.voice.clone(),
            response_format: Some(SpeechResponseFormat::Pcm),
            ..Default::default()
        };

        // Call the API and manually map the error, which respects the orphan rule.
        let response = self
            .client
            .audio()
            .speech()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let bytes = response.bytes.to_vec();
        if bytes.is_empty() {
            return Err(PortError::Unexpected(
                "speech synthesis returned an empty payload".to_string(),
            ));
        }
        Ok(bytes)
    }
}
