//! Issue and comment shapes flowing between the pipeline stages.
//!
//! The tracker's JSON is decoded into the `Raw*` wire types and normalized
//! exactly once, in [`Issue::from_wire`], so downstream code only ever sees
//! one canonical shape.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Opened,
    Closed,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Comment {
    pub created_at: String,
    #[serde(default)]
    pub body: String,
}

impl Comment {
    pub fn new(created_at: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            created_at: created_at.into(),
            body: body.into(),
        }
    }

    /// Parse `created_at` as an instant.
    ///
    /// RFC 3339 first; otherwise the leading `YYYY-MM-DDTHH:MM:SS` is read as UTC.
    pub fn created_instant(&self) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(&self.created_at) {
            return Some(ts.with_timezone(&Utc));
        }
        let head = self.created_at.get(..19)?;
        NaiveDateTime::parse_from_str(head, "%Y-%m-%dT%H:%M:%S")
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Calendar-date prefix shown in the report bullets.
    pub fn date(&self) -> &str {
        date_prefix(&self.created_at)
    }
}

/// An issue with its qualifying comments, as handed to the report stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub id: u64,
    pub iid: u64,
    pub title: String,
    pub description: String,
    pub state: IssueState,
    pub due_date: Option<String>,
    pub closed_at: Option<String>,
    pub label_names: Vec<String>,
    pub recent_comments: Vec<Comment>,
}

impl Issue {
    pub fn from_wire(raw: RawIssue, recent_comments: Vec<Comment>) -> Self {
        Self {
            id: raw.id,
            iid: raw.iid,
            title: raw.title,
            description: raw.description.unwrap_or_default(),
            state: raw.state,
            due_date: raw.due_date.filter(|d| !d.is_empty()),
            closed_at: raw.closed_at.filter(|c| !c.is_empty()),
            label_names: normalize_labels(raw.labels),
            recent_comments,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state == IssueState::Opened
    }

    pub fn is_closed(&self) -> bool {
        self.state == IssueState::Closed
    }
}

/// Issue object as returned by `GET /projects/:id/issues`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawIssue {
    #[serde(default)]
    pub id: u64,
    pub iid: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub state: IssueState,
    #[serde(default)]
    pub labels: Vec<LabelRef>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub closed_at: Option<String>,
}

/// Labels arrive either as bare names or as label objects, depending on
/// whether `with_labels_details` was requested.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum LabelRef {
    Name(String),
    Detailed { name: String },
}

impl LabelRef {
    pub fn into_name(self) -> String {
        match self {
            LabelRef::Name(name) => name,
            LabelRef::Detailed { name } => name,
        }
    }
}

pub fn normalize_labels(labels: Vec<LabelRef>) -> Vec<String> {
    labels.into_iter().map(LabelRef::into_name).collect()
}

/// First ten characters (the date part) of a tracker timestamp.
pub fn date_prefix(timestamp: &str) -> &str {
    match timestamp.char_indices().nth(10) {
        Some((idx, _)) => &timestamp[..idx],
        None => timestamp,
    }
}
