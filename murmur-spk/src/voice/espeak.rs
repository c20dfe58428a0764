//! espeak-ng voice
//!
//! Runs the local `espeak-ng` executable once per chunk. Text goes in on
//! stdin, audio comes back through a temporary WAV file.

use crate::error::SpeechError;
use crate::voice::Voice;
use crate::wav;
use murmur_core::{AudioBuffer, VoiceConfig};
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tracing::{debug, warn};

/// espeak-ng always renders at this rate
pub const ESPEAK_SAMPLE_RATE: u32 = 22_050;

const MAX_AUDIO_FILE_SIZE: u64 = 64 * 1024 * 1024;
const MAX_VOICES: usize = 1000;

/// Voice backed by the espeak-ng command line synthesizer
#[derive(Debug, Clone)]
pub struct EspeakVoice {
    program: PathBuf,
    config: VoiceConfig,
    name: String,
    available: bool,
}

impl EspeakVoice {
    /// Create a voice using `espeak-ng` from PATH
    pub fn new(config: VoiceConfig) -> Result<Self, SpeechError> {
        Self::with_program("espeak-ng", config)
    }

    /// Create a voice using a specific espeak-ng executable
    pub fn with_program(program: impl Into<PathBuf>, config: VoiceConfig) -> Result<Self, SpeechError> {
        config.validate()?;

        let program = program.into();
        let available = Command::new(&program)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false);

        if !available {
            warn!("espeak-ng not found at {:?}", program);
        }

        let name = config
            .name
            .clone()
            .unwrap_or_else(|| config.language.to_ascii_lowercase());

        Ok(Self {
            program,
            config,
            name,
            available,
        })
    }

    /// Voice settings in use
    pub fn config(&self) -> &VoiceConfig {
        &self.config
    }

    /// Value for `-v`: the voice name, with the configured style as its variant
    pub fn voice_arg(&self) -> String {
        match self.config.style.as_deref().map(str::trim) {
            Some(style) if !style.is_empty() => {
                // A style replaces any variant already in the name
                let base = self.name.split('+').next().unwrap_or(&self.name);
                format!("{}+{}", base, style)
            }
            _ => self.name.clone(),
        }
    }

    /// Command line arguments for one synthesis run, excluding the output file
    pub fn command_args(&self) -> Vec<String> {
        vec![
            "-v".to_string(),
            self.voice_arg(),
            "-s".to_string(),
            espeak_speed(self.config.rate).to_string(),
            "-a".to_string(),
            espeak_amplitude(self.config.volume).to_string(),
            "-p".to_string(),
            espeak_pitch(self.config.pitch).to_string(),
            "--stdin".to_string(),
        ]
    }

    /// Voices installed for this espeak-ng
    pub fn list_voices(&self) -> Result<Vec<String>, SpeechError> {
        let output = Command::new(&self.program)
            .arg("--voices")
            .output()
            .map_err(|e| SpeechError::Voice(format!("Failed to list voices: {}", e)))?;

        if !output.status.success() {
            return Ok(vec![]);
        }

        Ok(parse_voice_list(&String::from_utf8_lossy(&output.stdout)))
    }

    /// Variants usable as a style
    pub fn list_styles(&self) -> Result<Vec<String>, SpeechError> {
        let output = Command::new(&self.program)
            .arg("--voices=variant")
            .output()
            .map_err(|e| SpeechError::Voice(format!("Failed to list styles: {}", e)))?;

        if !output.status.success() {
            return Ok(vec![]);
        }

        Ok(parse_variant_list(&String::from_utf8_lossy(&output.stdout)))
    }
}

impl Voice for EspeakVoice {
    fn synthesize(&self, text: &str) -> Result<AudioBuffer, SpeechError> {
        if !self.available {
            return Err(SpeechError::Voice("espeak-ng not available".to_string()));
        }

        // Keep newlines so espeak still pauses at paragraph breaks
        let sanitized: String = text
            .chars()
            .filter(|c| !c.is_control() || *c == '\n')
            .collect();

        if sanitized.trim().is_empty() {
            return Err(SpeechError::Voice("Text is empty after sanitization".to_string()));
        }

        // Removed when dropped
        let out_file = tempfile::Builder::new()
            .prefix("murmur-")
            .suffix(".wav")
            .tempfile()?;

        let mut child = Command::new(&self.program)
            .args(self.command_args())
            .arg("-w")
            .arg(out_file.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SpeechError::Voice(format!("Failed to run espeak-ng: {}", e)))?;

        // stdin is closed at the end of this match so espeak-ng sees EOF
        let sent = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(sanitized.as_bytes()),
            None => Ok(()),
        };

        // Always reap the child, even when it stopped reading early
        let output = child.wait_with_output()?;
        if let Err(e) = sent {
            return Err(SpeechError::Voice(format!(
                "Failed to send text to espeak-ng: {}",
                e
            )));
        }
        if !output.status.success() {
            return Err(SpeechError::Voice(format!(
                "espeak-ng failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        let size = std::fs::metadata(out_file.path())?.len();
        if size > MAX_AUDIO_FILE_SIZE {
            return Err(SpeechError::Voice(format!(
                "Generated audio file too large ({} bytes, max {} bytes)",
                size, MAX_AUDIO_FILE_SIZE
            )));
        }

        let audio = wav::read_wav(out_file.path())?;
        debug!(
            voice = %self.name,
            samples = audio.len(),
            "espeak-ng synthesized {} chars",
            sanitized.len()
        );
        Ok(audio)
    }

    fn sample_rate(&self) -> u32 {
        ESPEAK_SAMPLE_RATE
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn backend(&self) -> &str {
        "espeak-ng"
    }

    fn is_available(&self) -> bool {
        self.available
    }
}

/// Speed in words per minute; espeak-ng accepts 80 to 450
pub fn espeak_speed(rate: u32) -> u32 {
    rate.clamp(80, 450)
}

/// Amplitude 0-200 from a 0.0-1.0 volume
pub fn espeak_amplitude(volume: f32) -> u32 {
    (volume.clamp(0.0, 1.0) * 200.0).round() as u32
}

/// Pitch 0-99 (50 is normal) from a -1.0 to 1.0 adjustment
pub fn espeak_pitch(pitch: f32) -> u32 {
    (50.0 + pitch.clamp(-1.0, 1.0) * 49.0).round() as u32
}

/// Parse `espeak-ng --voices` output into voice names
fn parse_voice_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .skip(1) // header
        .filter_map(|line| line.split_whitespace().nth(1))
        .filter(|voice| voice.len() <= 256 && !voice.chars().any(|c| c.is_control()))
        .map(str::to_string)
        .take(MAX_VOICES)
        .collect()
}

/// Parse `espeak-ng --voices=variant` output into variant ids (`!v/f3` -> `f3`)
fn parse_variant_list(listing: &str) -> Vec<String> {
    listing
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().nth(4))
        .filter_map(|file| file.strip_prefix("!v/"))
        .filter(|variant| variant.len() <= 256 && !variant.chars().any(|c| c.is_control()))
        .map(str::to_string)
        .take(MAX_VOICES)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_mapping() {
        assert_eq!(espeak_speed(150), 150);
        assert_eq!(espeak_speed(0), 80);
        assert_eq!(espeak_speed(500), 450);

        assert_eq!(espeak_amplitude(0.8), 160);
        assert_eq!(espeak_amplitude(2.0), 200);

        assert_eq!(espeak_pitch(0.0), 50);
        assert_eq!(espeak_pitch(-1.0), 1);
        assert_eq!(espeak_pitch(1.0), 99);
    }

    #[test]
    fn test_parse_voice_list() {
        let listing = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  af              --/M      Afrikaans          gmw/af
 5  en-us           --/M      English_(America)  gmw/en-US            (en 3)
";
        assert_eq!(parse_voice_list(listing), vec!["af", "en-us"]);
    }

    #[test]
    fn test_missing_program_is_unavailable() {
        let voice =
            EspeakVoice::with_program("/nonexistent/espeak-ng", VoiceConfig::default()).unwrap();
        assert!(!voice.is_available());
        assert_eq!(voice.name(), "en-us");
        assert!(matches!(voice.synthesize("Hello."), Err(SpeechError::Voice(_))));
    }

    #[test]
    fn test_command_args_use_voice_name() {
        let config = VoiceConfig {
            name: Some("en-gb+f3".to_string()),
            rate: 200,
            ..VoiceConfig::default()
        };
        let voice = EspeakVoice::with_program("/nonexistent/espeak-ng", config).unwrap();
        let args = voice.command_args();
        assert_eq!(&args[..4], &["-v", "en-gb+f3", "-s", "200"]);
        assert_eq!(args.last().map(String::as_str), Some("--stdin"));

        let styled = EspeakVoice::with_program(
            "/nonexistent/espeak-ng",
            VoiceConfig {
                name: Some("en-gb+f3".to_string()),
                style: Some("whisper".to_string()),
                ..VoiceConfig::default()
            },
        )
        .unwrap();
        assert_eq!(&styled.command_args()[..2], &["-v", "en-gb+whisper"]);
        assert_eq!(styled.name(), "en-gb+f3");

        let plain_style = EspeakVoice::with_program(
            "/nonexistent/espeak-ng",
            VoiceConfig {
                style: Some("m2".to_string()),
                ..VoiceConfig::default()
            },
        )
        .unwrap();
        assert_eq!(plain_style.voice_arg(), "en-us+m2");
    }

    #[test]
    fn test_parse_variant_list() {
        let listing = "\
Pty Language       Age/Gender VoiceName          File                 Other Languages
 5  variant         --/M      Alex               !v/Alex
 5  variant         --/F      female3            !v/f3
";
        assert_eq!(parse_variant_list(listing), vec!["Alex", "f3"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_program_that_ignores_stdin() {
        // `true` exits without reading, so the pipe breaks mid-write
        let voice = EspeakVoice::with_program("true", VoiceConfig::default()).unwrap();
        assert!(voice.is_available());

        let text = "Words. ".repeat(200_000);
        match voice.synthesize(&text) {
            Err(SpeechError::Voice(msg)) => assert!(msg.contains("send text"), "{}", msg),
            other => panic!("expected a voice error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = VoiceConfig {
            rate: 9000,
            ..VoiceConfig::default()
        };
        assert!(matches!(EspeakVoice::new(config), Err(SpeechError::Config(_))));
    }
}
