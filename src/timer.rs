//! Work sessions and time accounting.
//!
//! A running timer lives on the task row as `current_session_start`. Stopping
//! it logs a `sessions` row, credits the elapsed seconds to the task and to
//! every ancestor, so an ancestor's `time_spent` is the total for its subtree.

use chrono::NaiveDateTime;
use log::debug;
use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;

use crate::db::with_savepoint;
use crate::error::Result;
use crate::model::Task;
use crate::ops::{ancestor_ids, get_task_by_id};
use crate::timefmt;

const START_SESSION: &str = "
UPDATE tasks
SET current_session_start = ?1, session_goal_seconds = ?2, status = 'IN_PROGRESS'
WHERE id = ?3
";

const CLOSE_SESSION: &str = "
UPDATE tasks
SET time_spent = time_spent + ?1, current_session_start = NULL, session_goal_seconds = NULL
WHERE id = ?2
";

const INSERT_SESSION: &str = "
INSERT INTO sessions (task_id, start_time, end_time, duration_seconds)
VALUES (?1, ?2, ?3, ?4)
";

const ADD_TIME: &str = "UPDATE tasks SET time_spent = time_spent + ?1 WHERE id = ?2";

/// Start a session on `id` and mark it in progress.
///
/// A session already running on the task is stopped and logged first, so
/// restarting never drops time. Non-positive goals mean "no goal".
pub fn start_timer(
    conn: &Connection,
    id: i64,
    goal_seconds: Option<i64>,
    now: NaiveDateTime,
) -> Result<()> {
    with_savepoint(conn, "start_timer", || {
        let Some(task) = get_task_by_id(conn, id)? else {
            return Ok(());
        };
        if task.is_running() {
            stop_timer(conn, id, now)?;
        }
        let goal = goal_seconds.filter(|g| *g > 0);
        conn.execute(
            START_SESSION,
            rusqlite::params![timefmt::format(now), goal, id],
        )?;
        debug!("started timer on task {id}");
        Ok(())
    })
}

/// Stop the running session on `id` and return its length in seconds.
///
/// Returns 0 without touching anything when no session is running.
pub fn stop_timer(conn: &Connection, id: i64, now: NaiveDateTime) -> Result<i64> {
    with_savepoint(conn, "stop_timer", || {
        let start: Option<String> = conn
            .query_row(
                "SELECT current_session_start FROM tasks WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        let Some(start) = start else {
            return Ok(0);
        };

        let elapsed = timefmt::seconds_between(timefmt::parse(&start)?, now);
        conn.execute(CLOSE_SESSION, rusqlite::params![elapsed, id])?;
        conn.execute(
            INSERT_SESSION,
            rusqlite::params![id, start, timefmt::format(now), elapsed],
        )?;
        propagate_time_upwards(conn, id, elapsed)?;
        debug!("stopped timer on task {id} after {elapsed}s");
        Ok(elapsed)
    })
}

/// Add `seconds` to every ancestor of `id`, nearest first.
fn propagate_time_upwards(conn: &Connection, id: i64, seconds: i64) -> Result<()> {
    let mut stmt = conn.prepare_cached(ADD_TIME)?;
    for ancestor in ancestor_ids(conn, id)? {
        stmt.execute(rusqlite::params![seconds, ancestor])?;
    }
    Ok(())
}

/// Seconds elapsed in the task's running session, 0 when idle.
pub fn session_elapsed(task: &Task, now: NaiveDateTime) -> Result<i64> {
    match &task.current_session_start {
        Some(start) => Ok(timefmt::seconds_between(timefmt::parse(start)?, now)),
        None => Ok(0),
    }
}

/// What a live timer display shows for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimerReading {
    /// No session; total logged time.
    Idle { total: i64 },
    /// Stopwatch session; logged time plus the running interval.
    Running { total: i64 },
    /// Session with a goal that has not been reached yet.
    Countdown { remaining: i64 },
    GoalReached,
}

pub fn reading(task: &Task, now: NaiveDateTime) -> Result<TimerReading> {
    if !task.is_running() {
        return Ok(TimerReading::Idle {
            total: task.time_spent,
        });
    }
    let elapsed = session_elapsed(task, now)?;
    Ok(match task.session_goal_seconds {
        Some(goal) if goal > 0 => {
            let remaining = goal - elapsed;
            if remaining <= 0 {
                TimerReading::GoalReached
            } else {
                TimerReading::Countdown { remaining }
            }
        }
        _ => TimerReading::Running {
            total: task.time_spent + elapsed,
        },
    })
}
