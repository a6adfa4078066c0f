use std::collections::HashSet;

use chrono::NaiveDateTime;
use log::debug;
use rusqlite::{Connection, OptionalExtension};

use crate::db::with_savepoint;
use crate::error::{Error, Result};
use crate::model::{Category, NewTask, Session, Task};
use crate::timefmt;
use crate::validate::{normalize_due_date, validate_name};

pub(crate) const TASK_COLUMNS: &str = "id, parent_id, task_name, due_date, category, created_at, \
     completed_at, time_spent, current_session_start, session_goal_seconds, status, notes";

pub(crate) fn read_task_row(row: &rusqlite::Row) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get(0)?,
        parent_id: row.get(1)?,
        name: row.get(2)?,
        due_date: row.get(3)?,
        category: row.get(4)?,
        created_at: row.get(5)?,
        completed_at: row.get(6)?,
        time_spent: row.get(7)?,
        current_session_start: row.get(8)?,
        session_goal_seconds: row.get(9)?,
        status: row.get(10)?,
        notes: row.get(11)?,
    })
}

const INSERT_TASK: &str = "
INSERT INTO tasks (parent_id, task_name, due_date, category, created_at, status, time_spent, notes)
VALUES (?1, ?2, ?3, ?4, ?5, 'NEW', 0, '')
";

const SET_FIELDS: &str = "UPDATE tasks SET task_name = ?1, due_date = ?2 WHERE id = ?3";

const SET_NOTES: &str = "UPDATE tasks SET notes = ?1 WHERE id = ?2";

pub(crate) fn parent_of(conn: &Connection, id: i64) -> Result<Option<i64>> {
    let parent = conn
        .query_row("SELECT parent_id FROM tasks WHERE id = ?1", [id], |row| {
            row.get::<_, Option<i64>>(0)
        })
        .optional()?;
    Ok(parent.flatten())
}

/// Create a task and return its id.
///
/// Subtasks take their parent's category; the requested one only applies
/// to roots.
pub fn add_task(conn: &Connection, new: &NewTask, now: NaiveDateTime) -> Result<i64> {
    let name = validate_name(&new.name)?;
    let due_date = normalize_due_date(new.due_date.as_deref());

    with_savepoint(conn, "add_task", || {
        let category = match new.parent_id {
            Some(parent_id) => conn
                .query_row(
                    "SELECT category FROM tasks WHERE id = ?1",
                    [parent_id],
                    |row| row.get::<_, Category>(0),
                )
                .optional()?
                .ok_or(Error::ParentNotFound(parent_id))?,
            None => new.category,
        };
        conn.execute(
            INSERT_TASK,
            rusqlite::params![
                new.parent_id,
                name,
                due_date,
                category,
                timefmt::format(now)
            ],
        )?;
        let id = conn.last_insert_rowid();
        debug!("added task {id} '{name}'");
        Ok(id)
    })
}

/// Direct children of `parent_id`, or every root when `None`, in insertion order.
pub fn get_tasks(conn: &Connection, parent_id: Option<i64>) -> Result<Vec<Task>> {
    let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE parent_id IS ?1 ORDER BY id");
    let mut stmt = conn.prepare_cached(&query)?;
    let rows = stmt.query_map([parent_id], read_task_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}

pub fn get_all_tasks(conn: &Connection) -> Result<Vec<Task>> {
    let query = format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY id");
    let mut stmt = conn.prepare(&query)?;
    let rows = stmt.query_map([], read_task_row)?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}

pub fn get_task_by_id(conn: &Connection, id: i64) -> Result<Option<Task>> {
    let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1");
    let task = conn.query_row(&query, [id], read_task_row).optional()?;
    Ok(task)
}

/// The subtree rooted at `id` in depth-first pre-order: the root, then each
/// child's whole subtree, children in insertion order. Empty if `id` is absent.
pub fn get_task_hierarchy(conn: &Connection, id: i64) -> Result<Vec<Task>> {
    let Some(root) = get_task_by_id(conn, id)? else {
        return Ok(Vec::new());
    };
    let mut result = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![root];
    while let Some(task) = stack.pop() {
        if !seen.insert(task.id) {
            continue;
        }
        let children = get_tasks(conn, Some(task.id))?;
        stack.extend(children.into_iter().rev());
        result.push(task);
    }
    Ok(result)
}

/// Ids of every descendant of `id` in pre-order, excluding `id` itself.
pub(crate) fn descendant_ids(conn: &Connection, id: i64) -> Result<Vec<i64>> {
    let mut result = Vec::new();
    let mut seen = HashSet::from([id]);
    let mut stack = vec![id];
    let mut stmt = conn.prepare_cached("SELECT id FROM tasks WHERE parent_id = ?1 ORDER BY id")?;
    while let Some(current) = stack.pop() {
        let children: Vec<i64> = stmt
            .query_map([current], |row| row.get(0))?
            .collect::<rusqlite::Result<_>>()?;
        for child in children.into_iter().rev() {
            if seen.insert(child) {
                stack.push(child);
            }
        }
        if current != id {
            result.push(current);
        }
    }
    Ok(result)
}

/// Ids of the ancestors of `id`, nearest first.
pub fn ancestor_ids(conn: &Connection, id: i64) -> Result<Vec<i64>> {
    let mut result = Vec::new();
    let mut seen = HashSet::from([id]);
    let mut current = parent_of(conn, id)?;
    while let Some(parent) = current {
        if !seen.insert(parent) {
            break;
        }
        result.push(parent);
        current = parent_of(conn, parent)?;
    }
    Ok(result)
}

/// Number of ancestors of `id` (0 for a root), or `None` if the task does not exist.
pub fn task_depth(conn: &Connection, id: i64) -> Result<Option<usize>> {
    if get_task_by_id(conn, id)?.is_none() {
        return Ok(None);
    }
    Ok(Some(ancestor_ids(conn, id)?.len()))
}

pub fn update_task_fields(
    conn: &Connection,
    id: i64,
    name: &str,
    due_date: Option<&str>,
) -> Result<()> {
    let name = validate_name(name)?;
    let due_date = normalize_due_date(due_date);
    with_savepoint(conn, "update_task_fields", || {
        conn.execute(SET_FIELDS, rusqlite::params![name, due_date, id])?;
        Ok(())
    })
}

/// Replace the notes of a task verbatim.
pub fn update_task_notes(conn: &Connection, id: i64, notes: &str) -> Result<()> {
    with_savepoint(conn, "update_task_notes", || {
        conn.execute(SET_NOTES, rusqlite::params![notes, id])?;
        Ok(())
    })
}

/// Delete a task; descendants and all their sessions go with it.
///
/// Rows are removed deepest first so each DELETE cascades at most one level,
/// keeping arbitrarily deep trees under SQLite's trigger depth limit.
pub fn delete_task(conn: &Connection, id: i64) -> Result<()> {
    with_savepoint(conn, "delete_task", || {
        let mut ids = descendant_ids(conn, id)?;
        ids.reverse();
        ids.push(id);

        let mut stmt = conn.prepare_cached("DELETE FROM tasks WHERE id = ?1")?;
        let mut removed = 0;
        for task_id in ids {
            removed += stmt.execute([task_id])?;
        }
        if removed > 0 {
            debug!("deleted task {id} and {} descendants", removed - 1);
        }
        Ok(())
    })
}

pub fn list_sessions(conn: &Connection, task_id: i64) -> Result<Vec<Session>> {
    let mut stmt = conn.prepare(
        "SELECT id, task_id, start_time, end_time, duration_seconds \
         FROM sessions WHERE task_id = ?1 ORDER BY id",
    )?;
    let rows = stmt.query_map([task_id], |row| {
        Ok(Session {
            id: row.get(0)?,
            task_id: row.get(1)?,
            start_time: row.get(2)?,
            end_time: row.get(3)?,
            duration_seconds: row.get(4)?,
        })
    })?;
    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::model::Status;

    fn at(ts: &str) -> NaiveDateTime {
        timefmt::parse(ts).unwrap()
    }

    fn add(conn: &Connection, name: &str, parent: Option<i64>) -> i64 {
        let mut new = NewTask::new(name);
        new.parent_id = parent;
        add_task(conn, &new, at("2024-05-06 09:00:00")).unwrap()
    }

    #[test]
    fn add_and_get_task() {
        let conn = db::open_memory().unwrap();
        let id = add(&conn, "X", None);
        let task = get_task_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(task.name, "X");
        assert_eq!(task.status, Status::New);
        assert_eq!(task.time_spent, 0);
        assert_eq!(task.category, Category::Work);
        assert_eq!(task.created_at, "2024-05-06 09:00:00");
        assert!(task.parent_id.is_none());
        assert!(task.completed_at.is_none());
        assert!(task.current_session_start.is_none());
        assert_eq!(task.notes, "");
    }

    #[test]
    fn add_empty_name_fails() {
        let conn = db::open_memory().unwrap();
        let err = add_task(&conn, &NewTask::new("  "), at("2024-05-06 09:00:00")).unwrap_err();
        assert!(matches!(err, Error::EmptyName));
        assert!(get_all_tasks(&conn).unwrap().is_empty());
    }

    #[test]
    fn add_with_missing_parent_fails() {
        let conn = db::open_memory().unwrap();
        let err = add_task(&conn, &NewTask::new("orphan").under(99), at("2024-05-06 09:00:00"))
            .unwrap_err();
        assert!(matches!(err, Error::ParentNotFound(99)));
        assert!(get_all_tasks(&conn).unwrap().is_empty());
    }

    #[test]
    fn subtask_inherits_parent_category() {
        let conn = db::open_memory().unwrap();
        let parent = add_task(
            &conn,
            &NewTask::new("home").category(Category::Personal),
            at("2024-05-06 09:00:00"),
        )
        .unwrap();
        let child = add_task(
            &conn,
            &NewTask::new("laundry")
                .under(parent)
                .category(Category::Work),
            at("2024-05-06 09:00:00"),
        )
        .unwrap();
        let child = get_task_by_id(&conn, child).unwrap().unwrap();
        assert_eq!(child.category, Category::Personal);
        assert_eq!(child.parent_id, Some(parent));
    }

    #[test]
    fn blank_due_date_stored_as_null() {
        let conn = db::open_memory().unwrap();
        let id = add_task(&conn, &NewTask::new("t").due(""), at("2024-05-06 09:00:00")).unwrap();
        assert!(get_task_by_id(&conn, id).unwrap().unwrap().due_date.is_none());
    }

    #[test]
    fn get_tasks_returns_roots_or_children_in_order() {
        let conn = db::open_memory().unwrap();
        let a = add(&conn, "a", None);
        let b = add(&conn, "b", None);
        let a1 = add(&conn, "a1", Some(a));
        let a2 = add(&conn, "a2", Some(a));

        let roots: Vec<i64> = get_tasks(&conn, None).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(roots, vec![a, b]);
        let children: Vec<i64> = get_tasks(&conn, Some(a))
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(children, vec![a1, a2]);
        assert!(get_tasks(&conn, Some(b)).unwrap().is_empty());
    }

    #[test]
    fn missing_task_is_none() {
        let conn = db::open_memory().unwrap();
        assert!(get_task_by_id(&conn, 42).unwrap().is_none());
        assert!(get_task_hierarchy(&conn, 42).unwrap().is_empty());
        assert_eq!(task_depth(&conn, 42).unwrap(), None);
    }

    #[test]
    fn hierarchy_is_preorder() {
        let conn = db::open_memory().unwrap();
        let r = add(&conn, "r", None);
        let a = add(&conn, "a", Some(r));
        let b = add(&conn, "b", Some(r));
        let a1 = add(&conn, "a1", Some(a));
        let a1x = add(&conn, "a1x", Some(a1));
        let b1 = add(&conn, "b1", Some(b));
        let a2 = add(&conn, "a2", Some(a));
        let _other = add(&conn, "other", None);

        let ids: Vec<i64> = get_task_hierarchy(&conn, r)
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![r, a, a1, a1x, a2, b, b1]);
        assert_eq!(descendant_ids(&conn, r).unwrap(), vec![a, a1, a1x, a2, b, b1]);
    }

    #[test]
    fn deep_chain_does_not_recurse() {
        let conn = db::open_memory().unwrap();
        let root = add(&conn, "level-0", None);
        let mut parent = root;
        for i in 1..2000 {
            parent = add(&conn, &format!("level-{i}"), Some(parent));
        }
        assert_eq!(get_task_hierarchy(&conn, root).unwrap().len(), 2000);
        assert_eq!(task_depth(&conn, parent).unwrap(), Some(1999));
    }

    #[test]
    fn delete_deep_chain_removes_everything() {
        let conn = db::open_memory().unwrap();
        let root = add(&conn, "level-0", None);
        let mut parent = root;
        for i in 1..2000 {
            parent = add(&conn, &format!("level-{i}"), Some(parent));
        }
        conn.execute(
            "INSERT INTO sessions (task_id, start_time, end_time, duration_seconds)
             VALUES (?1, '2024-05-06 09:00:00', '2024-05-06 09:01:00', 60)",
            [parent],
        )
        .unwrap();

        delete_task(&conn, root).unwrap();

        let tasks: i64 = conn
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))
            .unwrap();
        let sessions: i64 = conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(tasks, 0);
        assert_eq!(sessions, 0);
    }

    #[test]
    fn ancestors_nearest_first() {
        let conn = db::open_memory().unwrap();
        let r = add(&conn, "r", None);
        let c = add(&conn, "c", Some(r));
        let g = add(&conn, "g", Some(c));
        assert_eq!(ancestor_ids(&conn, g).unwrap(), vec![c, r]);
        assert!(ancestor_ids(&conn, r).unwrap().is_empty());
        assert_eq!(task_depth(&conn, g).unwrap(), Some(2));
    }

    #[test]
    fn update_fields_leaves_status_and_time() {
        let conn = db::open_memory().unwrap();
        let id = add(&conn, "old", None);
        conn.execute(
            "UPDATE tasks SET time_spent = 30, status = 'IN_PROGRESS' WHERE id = ?1",
            [id],
        )
        .unwrap();
        update_task_fields(&conn, id, "new", Some("Friday")).unwrap();
        let task = get_task_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(task.name, "new");
        assert_eq!(task.due_date.as_deref(), Some("Friday"));
        assert_eq!(task.time_spent, 30);
        assert_eq!(task.status, Status::InProgress);

        assert!(matches!(
            update_task_fields(&conn, id, "", None),
            Err(Error::EmptyName)
        ));
    }

    #[test]
    fn update_notes_verbatim() {
        let conn = db::open_memory().unwrap();
        let id = add(&conn, "t", None);
        update_task_notes(&conn, id, "  line one\nline two  ").unwrap();
        let task = get_task_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(task.notes, "  line one\nline two  ");
    }

    #[test]
    fn edits_on_missing_task_are_noops() {
        let conn = db::open_memory().unwrap();
        update_task_fields(&conn, 7, "x", None).unwrap();
        update_task_notes(&conn, 7, "x").unwrap();
        delete_task(&conn, 7).unwrap();
        assert!(get_all_tasks(&conn).unwrap().is_empty());
    }

    #[test]
    fn delete_cascades_to_subtree_and_sessions() {
        let conn = db::open_memory().unwrap();
        let r = add(&conn, "r", None);
        let c = add(&conn, "c", Some(r));
        let g = add(&conn, "g", Some(c));
        let keep = add(&conn, "keep", None);
        for id in [r, c, g, keep] {
            conn.execute(
                "INSERT INTO sessions (task_id, start_time, end_time, duration_seconds) \
                 VALUES (?1, '2024-05-06 09:00:00', '2024-05-06 09:01:00', 60)",
                [id],
            )
            .unwrap();
        }

        delete_task(&conn, r).unwrap();

        let remaining: Vec<i64> = get_all_tasks(&conn).unwrap().iter().map(|t| t.id).collect();
        assert_eq!(remaining, vec![keep]);
        let sessions: i64 = conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(sessions, 1);
        assert_eq!(list_sessions(&conn, keep).unwrap().len(), 1);
    }
}
