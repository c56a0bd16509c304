//! Markdown report rendering.
//!
//! The report is the hand-off between fetching and synthesis: its `##`
//! headings are also the boundaries the synthesizer splits voices on.

use chrono::{Duration, Local, NaiveDate};
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;
use tracing::info;

use crate::error::Result;
use crate::models::{date_prefix, Comment, Issue};

/// A rendered report and the file it belongs in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub path: PathBuf,
    pub text: String,
}

pub struct ReportFormatter {
    output_dir: PathBuf,
}

impl ReportFormatter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Report file for `date`. Only the date goes into the name.
    pub fn report_path(&self, date: NaiveDate) -> PathBuf {
        self.output_dir
            .join(format!("podcast_material_{}.md", date.format("%Y%m%d")))
    }

    /// Render and write today's report. `None` when there is nothing to report.
    pub fn write(&self, issues: &[Issue], lookback_days: u32) -> Result<Option<PathBuf>> {
        self.write_for(issues, lookback_days, Local::now().date_naive())
    }

    pub fn write_for(
        &self,
        issues: &[Issue],
        lookback_days: u32,
        today: NaiveDate,
    ) -> Result<Option<PathBuf>> {
        let Some(report) = self.render(issues, lookback_days, today) else {
            info!("No issues to report");
            return Ok(None);
        };

        fs::create_dir_all(&self.output_dir)?;
        // Rust strings are UTF-8, so any script in issue text survives as-is.
        fs::write(&report.path, report.text.as_bytes())?;
        info!("Report written to {}", report.path.display());
        Ok(Some(report.path))
    }

    pub fn render(&self, issues: &[Issue], lookback_days: u32, today: NaiveDate) -> Option<Report> {
        if issues.is_empty() {
            return None;
        }
        Some(Report {
            path: self.report_path(today),
            text: render_markdown(issues, lookback_days, today),
        })
    }
}

/// The report body. Deterministic for a given input and date.
pub fn render_markdown(issues: &[Issue], lookback_days: u32, today: NaiveDate) -> String {
    let since = today - Duration::days(i64::from(lookback_days));
    let open: Vec<&Issue> = issues.iter().filter(|i| i.is_open()).collect();
    let closed: Vec<&Issue> = issues.iter().filter(|i| i.is_closed()).collect();

    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = writeln!(
        out,
        "# Business Development Update - Week of {}\n",
        today.format("%B %d, %Y")
    );
    out.push_str("## Overview\n");
    let _ = writeln!(
        out,
        "This update covers business development activities and discussions from {} to {}.\n",
        since.format("%B %d"),
        today.format("%B %d")
    );

    out.push_str("## Recent Updates and Discussions\n\n");

    if !open.is_empty() {
        out.push_str("### Active Projects\n");
        for issue in &open {
            write_heading(&mut out, issue);
            if !issue.label_names.is_empty() {
                let _ = writeln!(out, "**Labels:** {}", issue.label_names.join(", "));
            }
            if let Some(due) = &issue.due_date {
                let _ = writeln!(out, "**Due Date:** {due}");
            }
            out.push_str("\n**Recent Updates:**\n");
            write_comments(&mut out, &issue.recent_comments);
            out.push('\n');
        }
    }

    if !closed.is_empty() {
        out.push_str("### Recently Completed\n");
        for issue in &closed {
            write_heading(&mut out, issue);
            let completed = issue.closed_at.as_deref().map_or("unknown", date_prefix);
            let _ = writeln!(out, "**Completed:** {completed}\n");
            out.push_str("**Final Updates:**\n");
            write_comments(&mut out, &issue.recent_comments);
            out.push('\n');
        }
    }

    out.push_str("## Looking Forward\n");
    out.push_str("*Key initiatives and upcoming milestones:*\n\n");
    for issue in &open {
        match &issue.due_date {
            Some(due) => {
                let _ = writeln!(out, "- {} (Due: {due})", issue.title);
            }
            None => {
                let _ = writeln!(out, "- {} (Ongoing)", issue.title);
            }
        }
    }

    out
}

fn write_heading(out: &mut String, issue: &Issue) {
    let _ = writeln!(out, "#### {}", issue.title);
    if !issue.description.is_empty() {
        let _ = writeln!(out, "{}\n", issue.description);
    }
}

fn write_comments(out: &mut String, comments: &[Comment]) {
    for comment in newest_first(comments) {
        let _ = writeln!(out, "- [{}] {}", comment.date(), comment.body);
    }
}

/// Comments sorted by `created_at`, newest first. Ties keep input order.
pub fn newest_first(comments: &[Comment]) -> Vec<&Comment> {
    let mut sorted: Vec<&Comment> = comments.iter().collect();
    sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IssueState;

    fn issue(title: &str, state: IssueState) -> Issue {
        Issue {
            id: 0,
            iid: 0,
            title: title.to_string(),
            description: String::new(),
            state,
            due_date: None,
            closed_at: None,
            label_names: vec![],
            recent_comments: vec![Comment::new("2024-05-30T10:00:00Z", "update")],
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_empty_input_renders_nothing() {
        let formatter = ReportFormatter::new("unused");
        assert!(formatter.render(&[], 1, day(2024, 5, 31)).is_none());
    }

    #[test]
    fn test_path_depends_only_on_date() {
        let formatter = ReportFormatter::new("out");
        let a = formatter.render(&[issue("A", IssueState::Opened)], 1, day(2024, 5, 31)).unwrap();
        let b = formatter.render(&[issue("B", IssueState::Closed)], 7, day(2024, 5, 31)).unwrap();
        assert_eq!(a.path, PathBuf::from("out/podcast_material_20240531.md"));
        assert_eq!(a.path, b.path);
    }

    #[test]
    fn test_header_and_date_range() {
        let text = render_markdown(&[issue("A", IssueState::Opened)], 3, day(2024, 6, 2));
        assert!(text.starts_with("# Business Development Update - Week of June 02, 2024\n\n## Overview\n"));
        assert!(text.contains("discussions from May 30 to June 02.\n\n"));
    }

    #[test]
    fn test_closed_issue_without_timestamp() {
        let text = render_markdown(&[issue("Done", IssueState::Closed)], 1, day(2024, 6, 2));
        assert!(text.contains("**Completed:** unknown\n\n**Final Updates:**\n"));
    }

    #[test]
    fn test_other_state_is_in_no_partition() {
        let text = render_markdown(&[issue("Locked", IssueState::Other)], 1, day(2024, 6, 2));
        assert!(!text.contains("Locked"));
        assert!(!text.contains("### Active Projects"));
        assert!(!text.contains("### Recently Completed"));
    }

    #[test]
    fn test_newest_first_is_stable_on_ties() {
        let comments = vec![
            Comment::new("2024-05-29T08:00:00Z", "older"),
            Comment::new("2024-05-30T10:00:00Z", "first tie"),
            Comment::new("2024-05-30T10:00:00Z", "second tie"),
        ];
        let bodies: Vec<&str> = newest_first(&comments).iter().map(|c| c.body.as_str()).collect();
        assert_eq!(bodies, vec!["first tie", "second tie", "older"]);
    }
}
