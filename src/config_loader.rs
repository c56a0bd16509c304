use config::{Config, ConfigBuilder, Environment, File};
use config::builder::DefaultState;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::gitlab::TrackerConfig;

pub const DEFAULT_GITLAB_URL: &str = "https://gitlab.com";
pub const DEFAULT_REPORT_DIR: &str = "outputs/podcast_markdowns";
pub const DEFAULT_AUDIO_DIR: &str = "outputs/podcast_audio";
pub const DEFAULT_GTTS_HOST: &str = "https://translate.google.{tld}";

const BACKENDS: [&str; 2] = ["gtts", "espeak"];

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    // Tracker (GITLAB_TOKEN, GITLAB_URL, GITLAB_PROJECT_ID)
    #[serde(default)]
    pub gitlab_token: Option<String>,
    pub gitlab_url: String,
    #[serde(default)]
    pub gitlab_project_id: Option<String>,
    // Output locations
    pub report_dir: String,
    pub audio_dir: String,
    pub scratch_dir: String,
    // Speech
    pub language: String,
    pub tts_backend: String, // "gtts" or "espeak"
    pub gtts_host: String,
    pub espeak_binary: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gitlab_token: None,
            gitlab_url: DEFAULT_GITLAB_URL.to_string(),
            gitlab_project_id: None,
            report_dir: DEFAULT_REPORT_DIR.to_string(),
            audio_dir: DEFAULT_AUDIO_DIR.to_string(),
            scratch_dir: ".".to_string(),
            language: "en".to_string(),
            tts_backend: "gtts".to_string(),
            gtts_host: DEFAULT_GTTS_HOST.to_string(),
            espeak_binary: "espeak-ng".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from the standard locations and the environment.
    ///
    /// A `.env` file in the working directory (or a parent) is exported
    /// into the environment first.
    pub fn new() -> Result<Self, config::ConfigError> {
        load_dotenv(None);
        Self::load(None)
    }

    /// Same as [`Settings::new`], with `extra` merged above the standard files.
    pub fn load(extra: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = Self::defaults()?
            // Local settings file (if exists)
            .add_source(File::with_name("issuecast").required(false));

        if let Some(home) = dirs::home_dir() {
            let user_file = home.join(".config/issuecast/issuecast");
            builder = builder.add_source(File::with_name(&user_file.to_string_lossy()).required(false));
        }

        if let Some(path) = extra {
            builder = builder.add_source(File::from(path).required(true));
        }

        let builder = builder
            // GITLAB_TOKEN -> gitlab_token, and so on
            .add_source(Environment::with_prefix("GITLAB").keep_prefix(true))
            // Everything else, e.g. ISSUECAST_TTS_BACKEND
            .add_source(Environment::with_prefix("ISSUECAST"));

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>, config::ConfigError> {
        let d = Settings::default();
        Config::builder()
            .set_default("gitlab_url", d.gitlab_url)?
            .set_default("report_dir", d.report_dir)?
            .set_default("audio_dir", d.audio_dir)?
            .set_default("scratch_dir", d.scratch_dir)?
            .set_default("language", d.language)?
            .set_default("tts_backend", d.tts_backend)?
            .set_default("gtts_host", d.gtts_host)?
            .set_default("espeak_binary", d.espeak_binary)
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if !BACKENDS.contains(&self.tts_backend.as_str()) {
            return Err(config::ConfigError::Message(format!(
                "Invalid tts_backend: {}. Must be one of {}",
                self.tts_backend,
                BACKENDS.join(", ")
            )));
        }
        if self.language.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "language must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Tracker connection details handed to the fetcher.
    pub fn tracker_config(&self) -> TrackerConfig {
        TrackerConfig {
            token: self.gitlab_token.clone().filter(|t| !t.trim().is_empty()),
            base_url: self.gitlab_url.trim_end_matches('/').to_string(),
            project: self.gitlab_project_id.clone().filter(|p| !p.trim().is_empty()),
        }
    }

    pub fn report_dir(&self) -> PathBuf {
        PathBuf::from(&self.report_dir)
    }

    pub fn audio_dir(&self) -> PathBuf {
        PathBuf::from(&self.audio_dir)
    }

    pub fn scratch_dir(&self) -> PathBuf {
        PathBuf::from(&self.scratch_dir)
    }
}

/// Export the variables of a `.env` file into the process environment.
///
/// `None` searches the working directory and its parents. Variables that are
/// already set keep their value. Returns the file that was read, if any.
pub fn load_dotenv(path: Option<&Path>) -> Option<PathBuf> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path).map(|()| path.to_path_buf()),
        None => dotenvy::dotenv(),
    };
    match loaded {
        Ok(file) => {
            debug!("Loaded environment from {}", file.display());
            Some(file)
        }
        Err(e) if e.not_found() => None,
        Err(e) => {
            warn!("Ignoring .env file: {}", e);
            None
        }
    }
}
