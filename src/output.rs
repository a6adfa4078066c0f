use chrono::NaiveDateTime;
use log::warn;
use serde::Serialize;

use crate::model::{Session, Task};
use crate::timefmt;
use crate::timer::{self, TimerReading};
use crate::view::{ActiveView, Row};

/// `HH:MM:SS`; hours grow past two digits rather than wrapping.
pub fn format_seconds(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let (h, rest) = (seconds / 3600, seconds % 3600);
    format!("{:02}:{:02}:{:02}", h, rest / 60, rest % 60)
}

/// `Mon DD HH:MM` for a stored timestamp. Empty for `None`; unparseable
/// values are shown as stored.
pub fn format_short_date(ts: Option<&str>) -> String {
    match ts {
        None => String::new(),
        Some(s) => timefmt::parse(s)
            .map(|dt| dt.format("%b %d %H:%M").to_string())
            .unwrap_or_else(|_| s.to_string()),
    }
}

/// Timer column for a task. A stored session start that will not parse is
/// shown as `??` so one bad row does not hide the rest of a listing.
fn reading_label(task: &Task, now: NaiveDateTime) -> String {
    match timer::reading(task, now) {
        Ok(reading) => format_reading(reading),
        Err(e) => {
            warn!("task {}: {e}", task.id);
            "??".to_string()
        }
    }
}

pub fn format_reading(reading: TimerReading) -> String {
    match reading {
        TimerReading::Idle { total } => format_seconds(total),
        TimerReading::Running { total } => format!("{} >", format_seconds(total)),
        TimerReading::Countdown { remaining } => format!("⏳ {}", format_seconds(remaining)),
        TimerReading::GoalReached => "⭐ goal reached".to_string(),
    }
}

#[derive(Serialize)]
pub struct TaskDetail<'a> {
    #[serde(flatten)]
    pub task: &'a Task,
    pub timer: TimerReading,
    pub sessions: &'a [Session],
}

pub fn format_task_detail(task: &Task, sessions: &[Session], now: NaiveDateTime) -> String {
    let mut out = String::new();
    out.push_str(&format!("ID:          {}\n", task.id));
    out.push_str(&format!("Name:        {}\n", task.name));
    out.push_str(&format!("Status:      {}\n", task.status));
    out.push_str(&format!("Category:    {}\n", task.category));
    if let Some(parent) = task.parent_id {
        out.push_str(&format!("Parent:      {parent}\n"));
    }
    if let Some(ref due) = task.due_date {
        out.push_str(&format!("Due:         {due}\n"));
    }
    out.push_str(&format!(
        "Created:     {}\n",
        format_short_date(Some(&task.created_at))
    ));
    if task.completed_at.is_some() {
        out.push_str(&format!(
            "Completed:   {}\n",
            format_short_date(task.completed_at.as_deref())
        ));
    }
    out.push_str(&format!("Time:        {}\n", reading_label(task, now)));

    if !task.notes.is_empty() {
        out.push_str("\nNotes:\n");
        for line in task.notes.lines() {
            out.push_str(&format!("  {line}\n"));
        }
    }

    if !sessions.is_empty() {
        out.push_str("\nSessions:\n");
        for s in sessions {
            out.push_str(&format!(
                "  {} - {}  {}\n",
                format_short_date(Some(&s.start_time)),
                format_short_date(Some(&s.end_time)),
                format_seconds(s.duration_seconds)
            ));
        }
    }
    out
}

/// Whether each row is the last of its siblings, for pre-order rows.
fn last_sibling_flags(rows: &[Row]) -> Vec<bool> {
    let mut flags = vec![false; rows.len()];
    let mut seen: Vec<bool> = Vec::new();
    for (i, row) in rows.iter().enumerate().rev() {
        if seen.len() <= row.depth {
            seen.resize(row.depth + 1, false);
        }
        flags[i] = !seen[row.depth];
        seen[row.depth] = true;
        seen.truncate(row.depth + 1);
    }
    flags
}

fn row_line(row: &Row, history: bool, now: NaiveDateTime) -> String {
    let task = &row.task;
    let mut line = format!("{} {:>3}  {}", task.status.icon(), task.id, task.name);
    if let Some(ref due) = task.due_date {
        line.push_str(&format!("  (due {due})"));
    }
    line.push_str(&format!("  [{}]", reading_label(task, now)));
    if history {
        line.push_str(&format!(
            "  closed {}",
            format_short_date(task.completed_at.as_deref())
        ));
    }
    if row.folded {
        line.push_str("  (folded)");
    }
    line
}

/// Render pre-order rows as a tree with box-drawing connectors.
pub fn format_rows(rows: &[Row], history: bool, now: NaiveDateTime) -> String {
    let last = last_sibling_flags(rows);
    let mut out = String::new();
    // Last-sibling flag of each open ancestor, indexed by depth.
    let mut open: Vec<bool> = Vec::new();
    for (row, &is_last) in rows.iter().zip(&last) {
        open.truncate(row.depth);
        let mut prefix = String::new();
        for &ancestor_last in open.iter().skip(1) {
            prefix.push_str(if ancestor_last { "    " } else { "│   " });
        }
        if row.depth > 0 {
            prefix.push_str(if is_last { "└── " } else { "├── " });
        }
        out.push_str(&prefix);
        out.push_str(&row_line(row, history, now));
        out.push('\n');
        open.push(is_last);
    }
    out
}

pub fn format_active(view: &ActiveView, now: NaiveDateTime) -> String {
    let mut out = String::new();
    if !view.personal.is_empty() {
        out.push_str("PERSONAL\n");
        out.push_str(&format_rows(&view.personal, false, now));
    }
    if !view.work.is_empty() {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str("WORK\n");
        out.push_str(&format_rows(&view.work, false, now));
    }
    out
}
