use super::{AudioFormat, SpeechBackend, VoiceProfile};
use crate::concat::seal_wav_sizes;
use crate::error::{IssuecastError, Result};

use std::process::{Command, Stdio};
use tracing::debug;

/// Offline synthesis through the `espeak-ng` binary (WAV on stdout).
pub struct EspeakBackend {
    binary: String,
}

impl EspeakBackend {
    pub fn new(binary: &str) -> Self {
        Self {
            binary: binary.to_string(),
        }
    }

    /// espeak voice for a language/profile pair. English alternates US and UK.
    pub fn voice_for(language: &str, profile: VoiceProfile) -> String {
        match (language, profile) {
            ("en", VoiceProfile::Primary) => "en-us".to_string(),
            ("en", VoiceProfile::Secondary) => "en-gb".to_string(),
            (other, _) => other.to_string(),
        }
    }
}

impl SpeechBackend for EspeakBackend {
    fn id(&self) -> &'static str {
        "espeak-ng"
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::Wav
    }

    fn synthesize(&self, text: &str, language: &str, profile: VoiceProfile) -> Result<Vec<u8>> {
        let voice = Self::voice_for(language, profile);
        debug!("espeak: {} chars with voice {}", text.len(), voice);

        // output() drains stdout and stderr together, so large WAVs cannot stall the child
        let output = Command::new(&self.binary)
            .arg("--stdout")
            .arg("-v")
            .arg(&voice)
            .arg("--")
            .arg(text)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| IssuecastError::Synthesis(format!("failed to run {}: {}", self.binary, e)))?;

        if !output.status.success() {
            let err_msg = String::from_utf8_lossy(&output.stderr);
            return Err(IssuecastError::Synthesis(format!("espeak error: {}", err_msg.trim())));
        }
        if output.stdout.is_empty() {
            return Err(IssuecastError::Synthesis("espeak produced no audio".to_string()));
        }

        // Piped output carries placeholder sizes; fix them so the segment is a valid file
        let mut audio = output.stdout;
        seal_wav_sizes(&mut audio);
        Ok(audio)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_voices_alternate_accent() {
        assert_eq!(EspeakBackend::voice_for("en", VoiceProfile::Primary), "en-us");
        assert_eq!(EspeakBackend::voice_for("en", VoiceProfile::Secondary), "en-gb");
        assert_eq!(EspeakBackend::voice_for("de", VoiceProfile::Secondary), "de");
    }

    #[test]
    fn test_missing_binary_is_synthesis_error() {
        let backend = EspeakBackend::new("/nonexistent/espeak-ng-binary");
        let err = backend
            .synthesize("hello", "en", VoiceProfile::Primary)
            .unwrap_err();
        assert!(matches!(err, IssuecastError::Synthesis(_)));
    }

    #[cfg(unix)]
    #[test]
    fn test_streamed_output_gets_real_sizes() {
        use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
        use std::io::Cursor;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let spec = WavSpec {
            channels: 1,
            sample_rate: 22050,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for s in [10i16, 20, 30] {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
        let mut streamed = cursor.into_inner();
        let data = streamed.windows(4).position(|w| w == b"data").unwrap();
        streamed[data + 4..data + 8].copy_from_slice(&0x7fff_f000u32.to_le_bytes());

        let wav = dir.path().join("streamed.wav");
        std::fs::write(&wav, &streamed).unwrap();
        let fake = dir.path().join("fake-espeak");
        std::fs::write(&fake, format!("#!/bin/sh\ncat '{}'\n", wav.display())).unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        let backend = EspeakBackend::new(&fake.to_string_lossy());
        let audio = backend.synthesize("hello", "en", VoiceProfile::Primary).unwrap();

        let samples: Vec<i16> = WavReader::new(Cursor::new(audio))
            .unwrap()
            .into_samples::<i16>()
            .map(|s| s.unwrap())
            .collect();
        assert_eq!(samples, vec![10, 20, 30]);
    }
}
