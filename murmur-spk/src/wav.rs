//! WAV encoding and decoding for synthesized audio

use crate::error::SpeechError;
use murmur_core::AudioBuffer;
use std::io::{Cursor, Read};
use std::path::Path;

/// Save a buffer as a mono 16-bit PCM WAV file
pub fn write_wav<P: AsRef<Path>>(path: P, audio: &AudioBuffer) -> Result<(), SpeechError> {
    if audio.sample_rate == 0 {
        return Err(SpeechError::Synthesizer(
            "Cannot write WAV with a sample rate of 0".to_string(),
        ));
    }

    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path.as_ref(), spec)?;
    for &sample in &audio.samples {
        writer.write_sample(sample)?;
    }
    writer.finalize()?;
    Ok(())
}

/// Load a WAV file as mono 16-bit PCM
pub fn read_wav<P: AsRef<Path>>(path: P) -> Result<AudioBuffer, SpeechError> {
    let reader = hound::WavReader::open(path.as_ref())?;
    decode_reader(reader)
}

/// Decode an in-memory WAV file as mono 16-bit PCM
pub fn decode_wav(bytes: &[u8]) -> Result<AudioBuffer, SpeechError> {
    let reader = hound::WavReader::new(Cursor::new(bytes))?;
    decode_reader(reader)
}

fn decode_reader<R: Read>(reader: hound::WavReader<R>) -> Result<AudioBuffer, SpeechError> {
    let spec = reader.spec();

    let samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .collect::<Result<_, _>>()?,
        (hound::SampleFormat::Int, bits) if bits <= 32 => {
            // Rescale to 16 bits
            let shift = bits as i32 - 16;
            reader
                .into_samples::<i32>()
                .map(|s| {
                    s.map(|v| {
                        if shift >= 0 {
                            (v >> shift) as i16
                        } else {
                            (v << -shift) as i16
                        }
                    })
                })
                .collect::<Result<_, _>>()?
        }
        (hound::SampleFormat::Float, _) => reader
            .into_samples::<f32>()
            .map(|s| s.map(|v| (v * 32767.0).clamp(-32768.0, 32767.0) as i16))
            .collect::<Result<_, _>>()?,
        (_, bits) => {
            return Err(SpeechError::Synthesizer(format!(
                "Unsupported WAV bit depth: {}",
                bits
            )))
        }
    };

    // Convert to mono if needed
    let samples = if spec.channels > 1 {
        samples
            .chunks(spec.channels as usize)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / frame.len() as i32) as i16
            })
            .collect()
    } else {
        samples
    };

    Ok(AudioBuffer::new(spec.sample_rate, samples))
}
