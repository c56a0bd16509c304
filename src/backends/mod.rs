pub mod espeak;
pub mod gtts;

use crate::config_loader::Settings;
use crate::error::{IssuecastError, Result};

/// One of the two alternating voices of the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VoiceProfile {
    /// Even section positions, and the single-voice fallback.
    Primary,
    /// Odd section positions.
    Secondary,
}

impl VoiceProfile {
    /// Profile for a position in the raw section split.
    pub fn for_position(position: usize) -> Self {
        if position % 2 == 0 {
            VoiceProfile::Primary
        } else {
            VoiceProfile::Secondary
        }
    }
}

/// Container produced by a backend. Segments of one run all share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    Mp3,
    Wav,
}

impl AudioFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
        }
    }
}

/// Trait that all speech synthesis backends must implement.
/// A call turns one piece of text into one complete audio segment.
pub trait SpeechBackend: Send + Sync {
    /// Returns the unique ID of the backend (e.g., "espeak-ng")
    fn id(&self) -> &'static str;

    /// Container format of the bytes returned by `synthesize`
    fn format(&self) -> AudioFormat;

    /// Returns the encoded audio for `text` spoken in `language` with `profile`
    fn synthesize(&self, text: &str, language: &str, profile: VoiceProfile) -> Result<Vec<u8>>;
}

/// Build the backend named by `settings.tts_backend`.
pub fn from_settings(settings: &Settings) -> Result<Box<dyn SpeechBackend>> {
    match settings.tts_backend.as_str() {
        "gtts" => Ok(Box::new(gtts::GttsBackend::new(&settings.gtts_host))),
        "espeak" => Ok(Box::new(espeak::EspeakBackend::new(&settings.espeak_binary))),
        other => Err(IssuecastError::Configuration(format!(
            "Unknown tts_backend: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_alternates_by_position() {
        assert_eq!(VoiceProfile::for_position(0), VoiceProfile::Primary);
        assert_eq!(VoiceProfile::for_position(1), VoiceProfile::Secondary);
        assert_eq!(VoiceProfile::for_position(4), VoiceProfile::Primary);
    }

    #[test]
    fn test_factory_selects_backend() {
        let settings = Settings {
            tts_backend: "espeak".to_string(),
            ..Settings::default()
        };
        let backend = from_settings(&settings).unwrap();
        assert_eq!(backend.id(), "espeak-ng");
        assert_eq!(backend.format(), AudioFormat::Wav);

        let backend = from_settings(&Settings::default()).unwrap();
        assert_eq!(backend.id(), "gtts");
        assert_eq!(backend.format().extension(), "mp3");
    }
}
