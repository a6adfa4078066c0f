//! Status transitions: NEW -> IN_PROGRESS -> COMPLETED -> ARCHIVED, and back
//! to NEW on reopen.
//!
//! Completing or archiving commits the whole subtree. Reopening resets the
//! subtree and only the contiguous run of finished ancestors directly above
//! the task.

use chrono::NaiveDateTime;
use log::debug;
use rusqlite::{Connection, OptionalExtension};

use crate::db::with_savepoint;
use crate::error::Result;
use crate::model::Status;
use crate::ops::{ancestor_ids, descendant_ids, get_task_by_id};
use crate::timefmt;
use crate::timer::stop_timer;

const SET_STATUS: &str = "UPDATE tasks SET status = ?1, completed_at = ?2 WHERE id = ?3";

const SET_STATUS_KEEP_COMPLETED_AT: &str = "UPDATE tasks SET status = ?1 WHERE id = ?2";

fn status_of(conn: &Connection, id: i64) -> Result<Option<Status>> {
    let status = conn
        .query_row("SELECT status FROM tasks WHERE id = ?1", [id], |row| {
            row.get(0)
        })
        .optional()?;
    Ok(status)
}

/// `id` followed by its descendants in pre-order, or empty if `id` is absent.
fn subtree(conn: &Connection, id: i64) -> Result<Vec<i64>> {
    if get_task_by_id(conn, id)?.is_none() {
        return Ok(Vec::new());
    }
    let mut ids = vec![id];
    ids.extend(descendant_ids(conn, id)?);
    Ok(ids)
}

fn stop_all(conn: &Connection, ids: &[i64], now: NaiveDateTime) -> Result<()> {
    for &id in ids {
        stop_timer(conn, id, now)?;
    }
    Ok(())
}

/// Complete `id` and every descendant with one shared `completed_at`.
/// Running sessions anywhere in the subtree are stopped and logged first.
pub fn mark_completed(conn: &Connection, id: i64, now: NaiveDateTime) -> Result<()> {
    with_savepoint(conn, "mark_completed", || {
        let ids = subtree(conn, id)?;
        if ids.is_empty() {
            return Ok(());
        }
        stop_all(conn, &ids, now)?;

        let completed_at = timefmt::format(now);
        let mut stmt = conn.prepare_cached(SET_STATUS)?;
        for &task_id in &ids {
            stmt.execute(rusqlite::params![Status::Completed, completed_at, task_id])?;
        }
        debug!("completed task {id} ({} in subtree)", ids.len());
        Ok(())
    })
}

/// Archive `id` and every descendant. The task keeps its `completed_at`;
/// descendants have theirs cleared.
pub fn archive_task(conn: &Connection, id: i64, now: NaiveDateTime) -> Result<()> {
    with_savepoint(conn, "archive_task", || {
        let ids = subtree(conn, id)?;
        let Some((&root, descendants)) = ids.split_first() else {
            return Ok(());
        };
        stop_all(conn, &ids, now)?;

        conn.execute(
            SET_STATUS_KEEP_COMPLETED_AT,
            rusqlite::params![Status::Archived, root],
        )?;
        let mut stmt = conn.prepare_cached(SET_STATUS)?;
        for &task_id in descendants {
            stmt.execute(rusqlite::params![
                Status::Archived,
                Option::<String>::None,
                task_id
            ])?;
        }
        debug!("archived task {id} ({} in subtree)", ids.len());
        Ok(())
    })
}

/// Archive every COMPLETED task regardless of where it sits in the tree.
/// Returns the number of tasks archived.
pub fn archive_all_completed(conn: &Connection) -> Result<usize> {
    with_savepoint(conn, "archive_all_completed", || {
        let archived = conn.execute(
            "UPDATE tasks SET status = 'ARCHIVED' WHERE status = 'COMPLETED'",
            [],
        )?;
        debug!("archived {archived} completed tasks");
        Ok(archived)
    })
}

/// Reset `id` to NEW, along with its whole subtree and the unbroken run of
/// COMPLETED/ARCHIVED ancestors directly above it. The upward walk stops at
/// the first ancestor that is still NEW or IN_PROGRESS. Time and sessions
/// are left alone.
pub fn reopen_task(conn: &Connection, id: i64) -> Result<()> {
    with_savepoint(conn, "reopen_task", || {
        let ids = subtree(conn, id)?;
        if ids.is_empty() {
            return Ok(());
        }
        let mut stmt = conn.prepare_cached(SET_STATUS)?;
        let mut reset = |task_id: i64| -> Result<()> {
            stmt.execute(rusqlite::params![
                Status::New,
                Option::<String>::None,
                task_id
            ])?;
            Ok(())
        };

        for ancestor in ancestor_ids(conn, id)? {
            match status_of(conn, ancestor)? {
                Some(status) if status.is_finished() => reset(ancestor)?,
                _ => break,
            }
        }
        for task_id in ids {
            reset(task_id)?;
        }
        debug!("reopened task {id}");
        Ok(())
    })
}
