//! Joining synthesized segments into one continuous track.
//!
//! MP3 is a plain sequence of frames, so segments are spliced after their
//! ID3 tags are removed. WAV segments are decoded and re-written with `hound`.
//! The track is staged next to `output` and only moved into place once every
//! segment has been written.

use std::fs;
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::{Path, PathBuf};

use hound::{SampleFormat, WavReader, WavWriter};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::backends::AudioFormat;
use crate::error::{IssuecastError, Result};

const ID3V2_HEADER_LEN: usize = 10;
const ID3V1_TAG_LEN: usize = 128;
const RIFF_HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

/// Concatenate `segments` in the given order into `output`.
///
/// On error nothing is left at `output`.
pub fn concat_files(format: AudioFormat, segments: &[PathBuf], output: &Path) -> Result<()> {
    if segments.is_empty() {
        return Err(IssuecastError::Audio("no segments to concatenate".to_string()));
    }
    debug!("Concatenating {} {:?} segment(s) into {}", segments.len(), format, output.display());

    let dir = output
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut staged = tempfile::Builder::new()
        .prefix(".issuecast-")
        .suffix(&format!(".{}", format.extension()))
        .tempfile_in(dir)?;

    match format {
        AudioFormat::Mp3 => concat_mp3(segments, &mut staged)?,
        AudioFormat::Wav => concat_wav(segments, &mut staged)?,
    }

    staged.persist(output).map_err(|e| e.error)?;
    Ok(())
}

fn concat_mp3(segments: &[PathBuf], staged: &mut NamedTempFile) -> Result<()> {
    let mut writer = BufWriter::new(staged.as_file_mut());
    for segment in segments {
        let bytes = fs::read(segment)?;
        writer.write_all(mp3_frames(&bytes))?;
    }
    writer.flush()?;
    Ok(())
}

/// The frame data of an MP3 file, without a leading ID3v2 or trailing ID3v1 tag.
pub fn mp3_frames(bytes: &[u8]) -> &[u8] {
    let mut start = 0;
    if bytes.len() >= ID3V2_HEADER_LEN && bytes.starts_with(b"ID3") {
        // Tag size is four 7-bit "syncsafe" bytes
        let size = bytes[6..10]
            .iter()
            .fold(0usize, |acc, b| (acc << 7) | usize::from(b & 0x7f));
        let footer = if bytes[5] & 0x10 != 0 { ID3V2_HEADER_LEN } else { 0 };
        start = (ID3V2_HEADER_LEN + size + footer).min(bytes.len());
    }

    let mut end = bytes.len();
    if end - start >= ID3V1_TAG_LEN && bytes[end - ID3V1_TAG_LEN..].starts_with(b"TAG") {
        end -= ID3V1_TAG_LEN;
    }
    &bytes[start..end]
}

/// Rewrite the RIFF and `data` chunk sizes of a WAV from its real length.
///
/// A writer streaming to a pipe cannot seek back to fill in the sizes, so
/// espeak-ng `--stdout` leaves a placeholder (`0x7ffff000`) in both.
/// Buffers that are not RIFF/WAVE are left untouched.
pub fn seal_wav_sizes(wav: &mut [u8]) {
    if wav.len() < RIFF_HEADER_LEN || &wav[0..4] != b"RIFF" || &wav[8..12] != b"WAVE" {
        return;
    }
    let riff_len = wav.len() - CHUNK_HEADER_LEN;
    write_u32_le(&mut wav[4..8], riff_len);

    let mut pos = RIFF_HEADER_LEN;
    while pos + CHUNK_HEADER_LEN <= wav.len() {
        let body = pos + CHUNK_HEADER_LEN;
        if &wav[pos..pos + 4] == b"data" {
            let len = wav.len() - body;
            write_u32_le(&mut wav[pos + 4..body], len);
            return;
        }
        let declared = u32::from_le_bytes([wav[pos + 4], wav[pos + 5], wav[pos + 6], wav[pos + 7]]);
        // Chunks are padded to an even length
        let declared = usize::try_from(declared).unwrap_or(usize::MAX);
        pos = body.saturating_add(declared).saturating_add(declared % 2);
    }
}

fn write_u32_le(dst: &mut [u8], value: usize) {
    let value = u32::try_from(value).unwrap_or(u32::MAX);
    dst.copy_from_slice(&value.to_le_bytes());
}

fn open_segment(segment: &Path) -> Result<WavReader<Cursor<Vec<u8>>>> {
    let mut bytes = fs::read(segment)?;
    seal_wav_sizes(&mut bytes);
    Ok(WavReader::new(Cursor::new(bytes))?)
}

fn concat_wav(segments: &[PathBuf], staged: &mut NamedTempFile) -> Result<()> {
    let spec = open_segment(&segments[0])?.spec();

    let mut writer = WavWriter::new(BufWriter::new(staged.as_file_mut()), spec)?;
    for segment in segments {
        let reader = open_segment(segment)?;
        if reader.spec() != spec {
            return Err(IssuecastError::Audio(format!(
                "{} has format {:?}, expected {:?}",
                segment.display(),
                reader.spec(),
                spec
            )));
        }
        match (spec.sample_format, spec.bits_per_sample) {
            (SampleFormat::Float, _) => copy_samples::<f32, _>(reader, &mut writer)?,
            (SampleFormat::Int, bits) if bits <= 16 => copy_samples::<i16, _>(reader, &mut writer)?,
            (SampleFormat::Int, _) => copy_samples::<i32, _>(reader, &mut writer)?,
        }
    }
    writer.finalize()?;
    Ok(())
}

fn copy_samples<S, W>(reader: WavReader<Cursor<Vec<u8>>>, writer: &mut WavWriter<W>) -> Result<()>
where
    S: hound::Sample,
    W: Write + Seek,
{
    for sample in reader.into_samples::<S>() {
        writer.write_sample(sample?)?;
    }
    Ok(())
}
