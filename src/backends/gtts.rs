//! Google Translate text-to-speech, the same endpoint the `gTTS` tool uses.
//!
//! Text is cut into chunks of at most [`MAX_CHARS`] characters; each chunk is
//! one `batchexecute` RPC whose reply carries base64 MP3 data. The decoded
//! chunks are appended into one MP3 stream.

use base64::Engine;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{REFERER, USER_AGENT};
use serde_json::json;
use std::sync::OnceLock;
use tracing::debug;

use super::{AudioFormat, SpeechBackend, VoiceProfile};
use crate::error::{IssuecastError, Result};

pub const MAX_CHARS: usize = 100;

const RPC_ID: &str = "jQ1olc";
const RPC_PATH: &str = "/_/TranslateWebserverUi/data/batchexecute";
const AUDIO_PATTERN: &str = r#"jQ1olc","\[\\"(.*)\\"\]"#;
const BROWSER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; WOW64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/47.0.2526.106 Safari/537.36";

static AUDIO_RE: OnceLock<Regex> = OnceLock::new();

fn audio_pattern() -> &'static Regex {
    AUDIO_RE.get_or_init(|| Regex::new(AUDIO_PATTERN).expect("audio pattern is a valid regex"))
}

pub struct GttsBackend {
    /// Endpoint host; `{tld}` is replaced by the profile's accent domain.
    host: String,
    client: Client,
}

impl GttsBackend {
    pub fn new(host: &str) -> Self {
        Self {
            host: host.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Accent domain per profile: US English first, British English second.
    pub fn tld_for(profile: VoiceProfile) -> &'static str {
        match profile {
            VoiceProfile::Primary => "com",
            VoiceProfile::Secondary => "co.uk",
        }
    }

    fn endpoint(&self, profile: VoiceProfile) -> String {
        let host = self.host.replace("{tld}", Self::tld_for(profile));
        format!("{host}{RPC_PATH}")
    }

    fn request_chunk(&self, url: &str, chunk: &str, language: &str) -> Result<Vec<u8>> {
        let parameter = json!([chunk, language, null, "null"]).to_string();
        let rpc = json!([[[RPC_ID, parameter, null, "generic"]]]).to_string();

        let body = self
            .client
            .post(url)
            .header(USER_AGENT, BROWSER_AGENT)
            .header(REFERER, "http://translate.google.com/")
            .form(&[("f.req", rpc)])
            .send()
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
            .map_err(|e| IssuecastError::Synthesis(format!("gTTS request failed: {e}")))?;

        decode_audio(&body)
    }
}

impl SpeechBackend for GttsBackend {
    fn id(&self) -> &'static str {
        "gtts"
    }

    fn format(&self) -> AudioFormat {
        AudioFormat::Mp3
    }

    fn synthesize(&self, text: &str, language: &str, profile: VoiceProfile) -> Result<Vec<u8>> {
        let chunks = split_chunks(text, MAX_CHARS);
        if chunks.is_empty() {
            return Err(IssuecastError::Synthesis("No text to speak".to_string()));
        }

        let url = self.endpoint(profile);
        debug!("gTTS: {} chunk(s) via {}", chunks.len(), url);

        let mut audio = Vec::new();
        for chunk in &chunks {
            audio.extend(self.request_chunk(&url, chunk, language)?);
        }
        Ok(audio)
    }
}

/// Pull the base64 audio out of a `batchexecute` reply.
fn decode_audio(body: &str) -> Result<Vec<u8>> {
    let pattern = audio_pattern();
    let mut audio = Vec::new();
    for line in body.lines().filter(|l| l.contains(RPC_ID)) {
        if let Some(encoded) = pattern.captures(line).and_then(|c| c.get(1)) {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(encoded.as_str())
                .map_err(|e| IssuecastError::Synthesis(format!("invalid audio payload: {e}")))?;
            audio.extend(bytes);
        }
    }

    if audio.is_empty() {
        return Err(IssuecastError::Synthesis(
            "No audio stream in gTTS response".to_string(),
        ));
    }
    Ok(audio)
}

/// Split text into speakable chunks of at most `max_chars` characters.
///
/// Cuts at sentence punctuation and line breaks first, then between words.
/// Pieces with nothing alphanumeric in them are dropped.
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();

    for sentence in text.split_inclusive(|c: char| matches!(c, '.' | '!' | '?' | ';' | '\n')) {
        if !sentence.chars().any(char::is_alphanumeric) {
            continue;
        }

        let mut current = String::new();
        let mut current_len = 0;
        for word in sentence.split_whitespace() {
            for piece in hard_split(word, max_chars) {
                let piece_len = piece.chars().count();
                if current_len > 0 && current_len + 1 + piece_len > max_chars {
                    chunks.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                if current_len > 0 {
                    current.push(' ');
                    current_len += 1;
                }
                current.push_str(piece);
                current_len += piece_len;
            }
        }
        if !current.is_empty() {
            chunks.push(current);
        }
    }

    chunks
}

fn hard_split(word: &str, max_chars: usize) -> Vec<&str> {
    let mut pieces = Vec::new();
    let mut start = 0;
    for (count, (idx, _)) in word.char_indices().enumerate() {
        if count > 0 && count % max_chars == 0 {
            pieces.push(&word[start..idx]);
            start = idx;
        }
    }
    pieces.push(&word[start..]);
    pieces
}
