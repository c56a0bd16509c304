//! Report-to-speech synthesis.
//!
//! The report is split on `##`, every non-blank piece is spoken by one
//! backend call, and the pieces are joined back in split order. Voices
//! alternate on the raw split position: a blank piece is skipped but still
//! consumes its position, so it shifts the parity of everything after it.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::backends::{SpeechBackend, VoiceProfile};
use crate::concat;
use crate::error::{IssuecastError, Result};

/// Level-2 heading marker separating report sections.
pub const SECTION_DELIMITER: &str = "##";

const SCRATCH_PREFIX: &str = "temp_audio_sections-";

/// A non-blank piece of the report and the voice that reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section<'a> {
    /// Position in the raw split, blank pieces included.
    pub position: usize,
    pub text: &'a str,
    pub profile: VoiceProfile,
}

/// Split `text` on [`SECTION_DELIMITER`], dropping whitespace-only pieces.
pub fn split_sections(text: &str) -> Vec<Section<'_>> {
    text.split(SECTION_DELIMITER)
        .enumerate()
        .filter(|(_, piece)| !piece.trim().is_empty())
        .map(|(position, piece)| Section {
            position,
            text: piece,
            profile: VoiceProfile::for_position(position),
        })
        .collect()
}

pub struct AudioSynthesizer {
    backend: Box<dyn SpeechBackend>,
    output_dir: PathBuf,
    scratch_root: PathBuf,
}

impl AudioSynthesizer {
    pub fn new(
        backend: Box<dyn SpeechBackend>,
        output_dir: impl Into<PathBuf>,
        scratch_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            backend,
            output_dir: output_dir.into(),
            scratch_root: scratch_root.into(),
        }
    }

    /// Default audio path: the report's base name in the output directory.
    pub fn default_output_path(&self, report_path: &Path) -> PathBuf {
        let stem = report_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "podcast".to_string());
        self.output_dir
            .join(format!("{stem}.{}", self.backend.format().extension()))
    }

    /// Speak the report at `report_path` into one audio file and return its path.
    ///
    /// Any failing section aborts the whole call; no partial audio is written.
    pub fn synthesize(
        &self,
        report_path: &Path,
        output_path: Option<&Path>,
        language: &str,
    ) -> Result<PathBuf> {
        if !report_path.exists() {
            return Err(IssuecastError::NotFound(report_path.to_path_buf()));
        }

        let output = match output_path {
            Some(path) => path.to_path_buf(),
            None => self.default_output_path(report_path),
        };
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let text = fs::read_to_string(report_path)?;
        let sections = split_sections(&text);
        info!(
            "Synthesizing {} section(s) from {} with {}",
            sections.len(),
            report_path.display(),
            self.backend.id()
        );

        if sections.is_empty() {
            let audio = self.backend.synthesize(&text, language, VoiceProfile::Primary)?;
            fs::write(&output, audio)?;
            info!("Audio written to {}", output.display());
            return Ok(output);
        }

        fs::create_dir_all(&self.scratch_root)?;
        let scratch = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(&self.scratch_root)?;

        let extension = self.backend.format().extension();
        let mut segments = Vec::with_capacity(sections.len());
        for section in &sections {
            debug!(
                "Section {} ({} chars) with {:?} voice",
                section.position,
                section.text.len(),
                section.profile
            );
            let audio = self.backend.synthesize(section.text, language, section.profile)?;
            let segment = scratch
                .path()
                .join(format!("section_{}.{extension}", section.position));
            fs::write(&segment, audio)?;
            segments.push(segment);
        }

        concat::concat_files(self.backend.format(), &segments, &output)?;

        for segment in &segments {
            fs::remove_file(segment)?;
        }
        scratch.close()?;

        info!("Audio written to {}", output.display());
        Ok(output)
    }
}
