//! GitLab issue fetcher.
//!
//! Pulls the most recently updated issues of one project and keeps those that
//! received comments inside the lookback window.

use chrono::{DateTime, Duration, Utc};
use reqwest::blocking::Client;
use reqwest::Url;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::error::{IssuecastError, Result};
use crate::models::{Comment, Issue, RawIssue};

/// Issues requested in the single list call. Later pages are never fetched.
pub const PAGE_SIZE: u32 = 100;

/// Connection details for the tracker, built from [`crate::config_loader::Settings`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerConfig {
    pub token: Option<String>,
    pub base_url: String,
    /// Numeric project id or `namespace/project` path.
    pub project: Option<String>,
}

#[derive(Deserialize)]
struct ProjectRef {
    id: u64,
}

pub struct IssueFetcher {
    config: TrackerConfig,
    client: Client,
}

impl IssueFetcher {
    pub fn new(config: TrackerConfig) -> Self {
        Self {
            config,
            client: Client::new(),
        }
    }

    /// Issues with at least one comment newer than `now - lookback_days`.
    pub fn fetch_recent_issues(&self, lookback_days: u32) -> Result<Vec<Issue>> {
        self.fetch_recent_issues_at(lookback_days, Utc::now())
    }

    pub fn fetch_recent_issues_at(
        &self,
        lookback_days: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<Issue>> {
        let (token, project) = self.credentials()?;
        let cutoff = now - Duration::days(i64::from(lookback_days));

        let project_id = if project.chars().all(|c| c.is_ascii_digit()) {
            project.to_string()
        } else {
            self.resolve_project_id(token, project)?.to_string()
        };

        let issues = self.list_issues(token, &project_id)?;
        info!(
            "Fetched {} issue(s) from project {}, keeping activity after {}",
            issues.len(),
            project_id,
            cutoff.format("%Y-%m-%d %H:%M:%S")
        );

        let mut recent = Vec::new();
        for raw in issues {
            let notes = match self.list_notes(token, &project_id, raw.iid) {
                Ok(notes) => notes,
                Err(e) => {
                    warn!("Skipping issue #{}: could not load comments: {}", raw.iid, e);
                    continue;
                }
            };

            let comments = recent_comments(notes, cutoff);
            if comments.is_empty() {
                debug!("Issue #{} has no recent comments", raw.iid);
                continue;
            }
            recent.push(Issue::from_wire(raw, comments));
        }

        info!("{} issue(s) with recent comments", recent.len());
        Ok(recent)
    }

    /// Look up the numeric id of a `namespace/project` path.
    pub fn resolve_project_id(&self, token: &str, project_path: &str) -> Result<u64> {
        let mut url = self.api_url(&["projects"])?;
        url.path_segments_mut()
            .map_err(|_| invalid_base(&self.config.base_url))?
            .push(project_path);

        let project: ProjectRef = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()?
            .error_for_status()?
            .json()?;
        debug!("Resolved project {} to id {}", project_path, project.id);
        Ok(project.id)
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (self.config.token.as_deref(), self.config.project.as_deref()) {
            (Some(token), Some(project)) => Ok((token, project)),
            _ => Err(IssuecastError::Configuration(
                "GITLAB_TOKEN and GITLAB_PROJECT_ID must be set".to_string(),
            )),
        }
    }

    fn list_issues(&self, token: &str, project_id: &str) -> Result<Vec<RawIssue>> {
        let url = self.api_url(&["projects", project_id, "issues"])?;
        let page_size = PAGE_SIZE.to_string();
        let issues = self
            .client
            .get(url)
            .bearer_auth(token)
            .query(&[
                ("scope", "all"),
                ("order_by", "updated_at"),
                ("sort", "desc"),
                ("per_page", page_size.as_str()),
            ])
            .send()?
            .error_for_status()?
            .json()?;
        Ok(issues)
    }

    fn list_notes(&self, token: &str, project_id: &str, iid: u64) -> Result<Vec<Comment>> {
        let iid = iid.to_string();
        let url = self.api_url(&["projects", project_id, "issues", &iid, "notes"])?;
        let notes = self
            .client
            .get(url)
            .bearer_auth(token)
            .send()?
            .error_for_status()?
            .json()?;
        Ok(notes)
    }

    fn api_url(&self, segments: &[&str]) -> Result<Url> {
        let base = self.config.base_url.trim_end_matches('/');
        let mut url = Url::parse(&format!("{base}/api/v4"))
            .map_err(|e| IssuecastError::Configuration(format!("Invalid GITLAB_URL {base}: {e}")))?;
        url.path_segments_mut()
            .map_err(|_| invalid_base(base))?
            .extend(segments);
        Ok(url)
    }
}

fn invalid_base(base: &str) -> IssuecastError {
    IssuecastError::Configuration(format!("GITLAB_URL cannot carry a path: {base}"))
}

/// Comments created strictly after `cutoff`. Unparsable timestamps never qualify.
pub fn recent_comments(comments: Vec<Comment>, cutoff: DateTime<Utc>) -> Vec<Comment> {
    comments
        .into_iter()
        .filter(|c| c.created_instant().is_some_and(|ts| ts > cutoff))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn config(token: Option<&str>, project: Option<&str>) -> TrackerConfig {
        TrackerConfig {
            token: token.map(String::from),
            base_url: "http://127.0.0.1:9".to_string(),
            project: project.map(String::from),
        }
    }

    #[test]
    fn test_cutoff_is_strict() {
        let cutoff = Utc.with_ymd_and_hms(2024, 5, 30, 10, 0, 0).unwrap();
        let comments = vec![
            Comment::new("2024-05-30T10:00:00Z", "on the boundary"),
            Comment::new("2024-05-30T10:00:01Z", "just after"),
            Comment::new("2024-05-29T23:00:00Z", "old"),
            Comment::new("garbage", "unparsable"),
        ];
        let kept = recent_comments(comments, cutoff);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].body, "just after");
    }

    #[test]
    fn test_missing_token_is_configuration_error() {
        let fetcher = IssueFetcher::new(config(None, Some("42")));
        let err = fetcher.fetch_recent_issues(1).unwrap_err();
        assert!(matches!(err, IssuecastError::Configuration(_)));
    }

    #[test]
    fn test_missing_project_is_configuration_error() {
        let fetcher = IssueFetcher::new(config(Some("tok"), None));
        let err = fetcher.fetch_recent_issues(1).unwrap_err();
        assert!(matches!(err, IssuecastError::Configuration(_)));
    }

    #[test]
    fn test_api_url_encodes_segments() {
        let fetcher = IssueFetcher::new(TrackerConfig {
            token: None,
            base_url: "https://git.example.com/".to_string(),
            project: None,
        });
        let url = fetcher.api_url(&["projects", "42", "issues", "7", "notes"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://git.example.com/api/v4/projects/42/issues/7/notes"
        );
    }
}
