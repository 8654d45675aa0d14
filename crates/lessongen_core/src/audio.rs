//! crates/lessongen_core/src/audio.rs
//!
//! The dialogue audio pipeline: decoding the synthesis collaborator's raw
//! PCM stream into playable samples, and the small state machine that owns
//! at most one decoded buffer at a time.

use crate::domain::DialogueLine;

/// The synthesis collaborator's fixed output format: 24 kHz mono 16-bit
/// little-endian PCM.
pub const SAMPLE_RATE_HZ: u32 = 24_000;
pub const CHANNELS: u16 = 1;
pub const BITS_PER_SAMPLE: u16 = 16;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AudioError {
    #[error("synthesized audio payload was empty")]
    EmptyPayload,
    #[error("audio payload length {0} is not a whole number of 16-bit samples")]
    TruncatedSample(usize),
    #[error("audio pipeline is busy (phase: {0:?})")]
    Busy(PipelinePhase),
}

/// Decodes raw little-endian 16-bit mono PCM into normalized floating-point
/// samples in [-1, 1].
pub fn decode_pcm16(bytes: &[u8]) -> Result<Vec<f32>, AudioError> {
    if bytes.is_empty() {
        return Err(AudioError::EmptyPayload);
    }
    if bytes.len() % 2 != 0 {
        return Err(AudioError::TruncatedSample(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|chunk| i16::from_le_bytes([chunk[0], chunk[1]]) as f32 / 32768.0)
        .collect())
}

/// Joins the dialogue into the speaker-tagged script the synthesis
/// collaborator consumes.
pub fn synthesis_script(lines: &[DialogueLine]) -> String {
    lines
        .iter()
        .map(|line| format!("{}: {}", line.speaker, line.text))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelinePhase {
    #[default]
    Idle,
    Fetching,
    Playing,
}

/// An exclusively owned decoded audio buffer. Dropping the handle releases
/// the buffer; the pipeline never keeps more than one alive.
#[derive(Debug)]
pub struct AudioHandle {
    samples: Vec<f32>,
}

impl AudioHandle {
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn duration_secs(&self) -> f32 {
        self.samples.len() as f32 / SAMPLE_RATE_HZ as f32
    }
}

/// Playback/download state machine.
///
/// Playback: Idle -> Fetching -> Playing -> Idle (completion or manual
/// stop). Download: Idle -> Fetching -> Idle. Every failure path returns to
/// Idle. No result is cached across calls; each play or download re-fetches.
#[derive(Debug, Default)]
pub struct DialogueAudioPipeline {
    phase: PipelinePhase,
    active: Option<AudioHandle>,
}

impl DialogueAudioPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    /// Marks a synthesis request as in flight. Re-entrant triggering is
    /// refused while a fetch or playback is already active.
    pub fn begin_fetch(&mut self) -> Result<(), AudioError> {
        if self.phase != PipelinePhase::Idle {
            return Err(AudioError::Busy(self.phase));
        }
        self.phase = PipelinePhase::Fetching;
        Ok(())
    }

    /// Decodes the fetched payload and takes playback ownership. Any prior
    /// handle is released first, so only one source is ever connected.
    pub fn start_playback(&mut self, pcm_bytes: &[u8]) -> Result<&AudioHandle, AudioError> {
        let samples = match decode_pcm16(pcm_bytes) {
            Ok(samples) => samples,
            Err(e) => {
                self.phase = PipelinePhase::Idle;
                return Err(e);
            }
        };
        // Tear down the previous source before connecting the new one.
        self.active.take();
        self.phase = PipelinePhase::Playing;
        Ok(self.active.insert(AudioHandle { samples }))
    }

    /// Completes the download path: the fetch is done and the pipeline goes
    /// back to Idle without taking playback ownership.
    pub fn fetch_complete(&mut self) {
        self.phase = PipelinePhase::Idle;
    }

    /// A synthesis or decode failure: surface to the caller, reset to Idle.
    pub fn fetch_failed(&mut self) {
        self.phase = PipelinePhase::Idle;
    }

    /// Manual stop or natural end of playback. Releases the active handle.
    pub fn stop(&mut self) {
        self.active.take();
        self.phase = PipelinePhase::Idle;
    }

    pub fn active_handle(&self) -> Option<&AudioHandle> {
        self.active.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_normalizes_samples() {
        // i16::MIN, 0, i16::MAX as little-endian bytes.
        let bytes = [0x00, 0x80, 0x00, 0x00, 0xFF, 0x7F];
        let samples = decode_pcm16(&bytes).unwrap();
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0], -1.0);
        assert_eq!(samples[1], 0.0);
        assert!((samples[2] - 32767.0 / 32768.0).abs() < f32::EPSILON);
        assert!(samples.iter().all(|s| (-1.0..=1.0).contains(s)));
    }

    #[test]
    fn decode_rejects_empty_payload() {
        assert_eq!(decode_pcm16(&[]), Err(AudioError::EmptyPayload));
    }

    #[test]
    fn decode_rejects_odd_length() {
        assert_eq!(decode_pcm16(&[1, 2, 3]), Err(AudioError::TruncatedSample(3)));
    }

    #[test]
    fn playback_cycle_returns_to_idle() {
        let mut pipeline = DialogueAudioPipeline::new();
        assert_eq!(pipeline.phase(), PipelinePhase::Idle);

        pipeline.begin_fetch().unwrap();
        assert_eq!(pipeline.phase(), PipelinePhase::Fetching);

        pipeline.start_playback(&[0x00, 0x10, 0x00, 0x20]).unwrap();
        assert_eq!(pipeline.phase(), PipelinePhase::Playing);
        assert!(pipeline.active_handle().is_some());

        pipeline.stop();
        assert_eq!(pipeline.phase(), PipelinePhase::Idle);
        assert!(pipeline.active_handle().is_none());
    }

    #[test]
    fn fetch_is_not_reentrant() {
        let mut pipeline = DialogueAudioPipeline::new();
        pipeline.begin_fetch().unwrap();
        assert_eq!(
            pipeline.begin_fetch(),
            Err(AudioError::Busy(PipelinePhase::Fetching))
        );
    }

    #[test]
    fn decode_failure_resets_to_idle() {
        let mut pipeline = DialogueAudioPipeline::new();
        pipeline.begin_fetch().unwrap();
        assert_eq!(
            pipeline.start_playback(&[]).unwrap_err(),
            AudioError::EmptyPayload
        );
        assert_eq!(pipeline.phase(), PipelinePhase::Idle);
        assert!(pipeline.active_handle().is_none());
    }

    #[test]
    fn new_playback_releases_the_previous_handle() {
        let mut pipeline = DialogueAudioPipeline::new();
        pipeline.begin_fetch().unwrap();
        pipeline.start_playback(&[0x00, 0x10]).unwrap();
        let first_len = pipeline.active_handle().unwrap().samples().len();
        assert_eq!(first_len, 1);

        // Playback must be stopped before a new fetch is accepted.
        pipeline.stop();
        pipeline.begin_fetch().unwrap();
        pipeline
            .start_playback(&[0x00, 0x10, 0x00, 0x20, 0x00, 0x30])
            .unwrap();
        assert_eq!(pipeline.active_handle().unwrap().samples().len(), 3);
    }

    #[test]
    fn download_path_skips_playback() {
        let mut pipeline = DialogueAudioPipeline::new();
        pipeline.begin_fetch().unwrap();
        pipeline.fetch_complete();
        assert_eq!(pipeline.phase(), PipelinePhase::Idle);
        assert!(pipeline.active_handle().is_none());
    }

    #[test]
    fn duration_uses_the_fixed_sample_rate() {
        let bytes = vec![0u8; 48_000]; // 24000 samples = one second
        let mut pipeline = DialogueAudioPipeline::new();
        pipeline.begin_fetch().unwrap();
        let handle = pipeline.start_playback(&bytes).unwrap();
        assert!((handle.duration_secs() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn script_joins_speaker_tagged_lines() {
        let lines = vec![
            DialogueLine {
                speaker: "Maya".to_string(),
                text: "Hello!".to_string(),
            },
            DialogueLine {
                speaker: "Kenji".to_string(),
                text: "Hi there.".to_string(),
            },
        ];
        assert_eq!(synthesis_script(&lines), "Maya: Hello!\nKenji: Hi there.");
    }
}
