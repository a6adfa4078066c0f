//! Work reports: date-range queries and the Markdown summary built from them.
//!
//! The Markdown is meant to be pasted into an AI assistant, optionally behind
//! a fixed preamble that explains how to read it.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::Connection;

use crate::error::{Error, Result};
use crate::model::ReportTask;
use crate::ops::read_task_row;
use crate::timefmt;

const REPORT_COLUMNS: &str = "t.id, t.parent_id, t.task_name, t.due_date, t.category, \
     t.created_at, t.completed_at, t.time_spent, t.current_session_start, \
     t.session_goal_seconds, t.status, t.notes, p.task_name";

fn read_report_row(row: &rusqlite::Row) -> rusqlite::Result<ReportTask> {
    Ok(ReportTask {
        task: read_task_row(row)?,
        parent_name: row.get(12)?,
    })
}

/// Work tasks created, completed, or worked on within `[start, end]`, each
/// listed once with its parent's name.
pub fn get_tasks_for_report(conn: &Connection, start: &str, end: &str) -> Result<Vec<ReportTask>> {
    let query = format!(
        "SELECT DISTINCT {REPORT_COLUMNS}
         FROM tasks t
         LEFT JOIN sessions s ON s.task_id = t.id
         LEFT JOIN tasks p ON p.id = t.parent_id
         WHERE ((t.completed_at BETWEEN ?1 AND ?2)
             OR (s.start_time BETWEEN ?1 AND ?2)
             OR (t.created_at BETWEEN ?1 AND ?2))
           AND t.category != 'Personal'
         ORDER BY t.id"
    );
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map([start, end], read_report_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}

/// Every archived task, newest `completed_at` first, optionally limited to
/// those completed at or after `min_date`.
pub fn get_all_archived_tasks(conn: &Connection, min_date: Option<&str>) -> Result<Vec<ReportTask>> {
    let mut query = format!(
        "SELECT {REPORT_COLUMNS}
         FROM tasks t
         LEFT JOIN tasks p ON p.id = t.parent_id
         WHERE t.status = 'ARCHIVED'"
    );
    if min_date.is_some() {
        query.push_str(" AND t.completed_at >= ?1");
    }
    query.push_str(" ORDER BY t.completed_at DESC, t.id");

    let mut stmt = conn.prepare(&query)?;
    let rows = match min_date {
        Some(d) => stmt.query_map([d], read_report_row)?,
        None => stmt.query_map([], read_report_row)?,
    };
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}

/// A titled, inclusive reporting window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRange {
    pub title: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

fn start_of_week(now: NaiveDateTime) -> NaiveDateTime {
    let days = i64::from(now.weekday().num_days_from_monday());
    (now.date() - Duration::days(days)).and_time(NaiveTime::MIN)
}

impl ReportRange {
    /// Monday 00:00:00 of this week up to `now`.
    pub fn current_week(now: NaiveDateTime) -> Self {
        Self {
            title: "Current Week".to_string(),
            start: start_of_week(now),
            end: now,
        }
    }

    /// The full previous Monday-to-Sunday week.
    pub fn last_week(now: NaiveDateTime) -> Self {
        let this_monday = start_of_week(now);
        Self {
            title: "Last Week".to_string(),
            start: this_monday - Duration::days(7),
            end: this_monday - Duration::seconds(1),
        }
    }

    /// Whole days from `start` through `end`, both `YYYY-MM-DD`.
    pub fn custom(start: &str, end: &str) -> Result<Self> {
        let start_date = timefmt::parse_date(start)?;
        let end_date = timefmt::parse_date(end)?;
        if end_date < start_date {
            return Err(Error::InvalidRange {
                start: start.trim().to_string(),
                end: end.trim().to_string(),
            });
        }
        Ok(Self {
            title: format!("Custom ({} to {})", start.trim(), end.trim()),
            start: start_date.and_time(NaiveTime::MIN),
            end: end_date.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::seconds(1),
        })
    }

    pub fn start_str(&self) -> String {
        timefmt::format(self.start)
    }

    pub fn end_str(&self) -> String {
        timefmt::format(self.end)
    }
}

pub const AI_PROMPT: &str = r#"I am pasting a weekly work report generated by my task manager. Please summarize my work based on the following rules:

1. STRUCTURE EXPLANATION:
   - Items marked with "🏆" are MAIN PROJECTS.
   - Items with bullet points "*" are SUBTASKS.
   - If a bullet point says (Part of "Project Name"), it belongs to that parent project.

2. HOW TO INTERPRET PROGRESS:
   - If a "🏆 Main Project" appears in the "✅ Completed" section, announce that the ENTIRE project is finished.
   - If a "🏆 Main Project" appears in "🚧 Pending", but one of its subtasks appears in "✅ Completed", report this as "Progress made on [Project Name]".
   - Do not list the same project twice; if a project is Pending but has completed subtasks, focus on the progress made.

3. DESIRED OUTPUT:
   - Write a professional summary of what was achieved.
   - Highlight full project completions first.
   - List specific progress on ongoing projects second.

Here is the report data:
-----------------------
"#;

fn task_line(row: &ReportTask) -> String {
    match &row.parent_name {
        None => format!("\n### 🏆 {}", row.task.name),
        Some(parent) => format!("* **{}** (Part of \"{}\")", row.task.name, parent),
    }
}

pub fn build_markdown(
    title: &str,
    generated_on: NaiveDate,
    rows: &[ReportTask],
    include_prompt: bool,
) -> String {
    let (completed, pending): (Vec<&ReportTask>, Vec<&ReportTask>) =
        rows.iter().partition(|r| r.task.status.is_finished());

    let mut lines = vec![format!(
        "# Work Report: {title}\n*Generated on {}*\n",
        generated_on.format(timefmt::DATE_FORMAT)
    )];

    lines.push("## ✅ Completed / Delivered".to_string());
    if completed.is_empty() {
        lines.push("* No completed items recorded for this period.".to_string());
    } else {
        lines.extend(completed.into_iter().map(task_line));
    }

    lines.push("\n## 🚧 In Progress / Pending".to_string());
    if pending.is_empty() {
        lines.push("* No pending items.".to_string());
    } else {
        lines.extend(pending.into_iter().map(task_line));
    }

    let body = lines.join("\n");
    if include_prompt {
        format!("{AI_PROMPT}{body}")
    } else {
        body
    }
}

/// Query `range` and render it as Markdown.
pub fn generate(
    conn: &Connection,
    range: &ReportRange,
    generated_on: NaiveDate,
    include_prompt: bool,
) -> Result<String> {
    let rows = get_tasks_for_report(conn, &range.start_str(), &range.end_str())?;
    Ok(build_markdown(&range.title, generated_on, &rows, include_prompt))
}
