//! services/api/src/adapters/wav.rs
//!
//! Wraps the synthesis collaborator's raw PCM bytes in a canonical
//! RIFF/WAVE container for file export.

use hound::{WavSpec, WavWriter};
use lessongen_core::audio::{BITS_PER_SAMPLE, CHANNELS, SAMPLE_RATE_HZ};

/// Encodes raw little-endian 16-bit mono PCM into a WAVE file: 24 kHz, one
/// channel, with correctly computed chunk sizes (44-byte header + data).
pub fn pcm16_to_wav(pcm_data: &[u8]) -> Result<Vec<u8>, hound::Error> {
    let mut cursor = std::io::Cursor::new(Vec::new());

    let spec = WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE_HZ,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = WavWriter::new(&mut cursor, spec)?;

    // Convert byte array to i16 samples
    for chunk in pcm_data.chunks_exact(2) {
        let sample = i16::from_le_bytes([chunk[0], chunk[1]]);
        writer.write_sample(sample)?;
    }

    writer.finalize()?;
    Ok(cursor.into_inner())
}
