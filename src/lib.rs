//! issuecast: a spoken digest of recent GitLab issue activity.
//!
//! Three stages run one after another with file hand-off:
//! [`gitlab::IssueFetcher`] pulls recently commented issues,
//! [`report::ReportFormatter`] renders them to Markdown, and
//! [`audio::AudioSynthesizer`] reads the Markdown aloud with two alternating voices.

pub mod audio;
pub mod backends;
pub mod concat;
pub mod config_loader;
pub mod error;
pub mod gitlab;
pub mod models;
pub mod report;

pub use error::{IssuecastError, Result};
