use std::fmt;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    New,
    InProgress,
    Completed,
    Archived,
}

impl Status {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "NEW" => Ok(Self::New),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "ARCHIVED" => Ok(Self::Archived),
            _ => Err(Error::InvalidStatus(s.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::New => "NEW",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Archived => "ARCHIVED",
        }
    }

    /// Completed and archived tasks count as finished work.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Completed | Self::Archived)
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::New => ".",
            Self::InProgress => "*",
            Self::Completed => "x",
            Self::Archived => "#",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    #[default]
    #[serde(alias = "work")]
    Work,
    #[serde(alias = "personal")]
    Personal,
}

impl Category {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "Work" | "work" => Ok(Self::Work),
            "Personal" | "personal" => Ok(Self::Personal),
            _ => Err(Error::InvalidCategory(s.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Work => "Work",
            Self::Personal => "Personal",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Task {
    pub id: i64,
    pub parent_id: Option<i64>,
    pub name: String,
    pub due_date: Option<String>,
    pub category: Category,
    pub created_at: String,
    pub completed_at: Option<String>,
    pub time_spent: i64,
    pub current_session_start: Option<String>,
    pub session_goal_seconds: Option<i64>,
    pub status: Status,
    pub notes: String,
}

impl Task {
    pub fn is_running(&self) -> bool {
        self.current_session_start.is_some()
    }
}

/// Input for creating a task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub name: String,
    pub due_date: Option<String>,
    pub category: Category,
    pub parent_id: Option<i64>,
}

impl NewTask {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn under(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn due(mut self, due_date: impl Into<String>) -> Self {
        self.due_date = Some(due_date.into());
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = category;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: i64,
    pub task_id: i64,
    pub start_time: String,
    pub end_time: String,
    pub duration_seconds: i64,
}

/// A task row annotated with its parent's name, as returned by report queries.
#[derive(Debug, Clone, Serialize)]
pub struct ReportTask {
    #[serde(flatten)]
    pub task: Task,
    pub parent_name: Option<String>,
}

impl FromSql for Status {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Status::parse(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for Status {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Category {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Category::parse(value.as_str()?).map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for Category {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}
