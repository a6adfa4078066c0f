use std::path::Path;

use log::warn;
use rusqlite::Connection;

use crate::error::Result;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS tasks (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    parent_id             INTEGER REFERENCES tasks(id) ON DELETE CASCADE,
    task_name             TEXT NOT NULL CHECK(length(task_name) > 0),
    due_date              TEXT,
    category              TEXT NOT NULL DEFAULT 'Work' CHECK(category IN ('Work', 'Personal')),
    created_at            TEXT NOT NULL,
    completed_at          TEXT,
    time_spent            INTEGER NOT NULL DEFAULT 0,
    current_session_start TEXT,
    session_goal_seconds  INTEGER,
    status                TEXT NOT NULL DEFAULT 'NEW'
                          CHECK(status IN ('NEW', 'IN_PROGRESS', 'COMPLETED', 'ARCHIVED')),
    notes                 TEXT NOT NULL DEFAULT ''
);

CREATE INDEX IF NOT EXISTS idx_tasks_parent ON tasks(parent_id);

CREATE TABLE IF NOT EXISTS sessions (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    task_id          INTEGER NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
    start_time       TEXT NOT NULL,
    end_time         TEXT NOT NULL,
    duration_seconds INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_sessions_task ON sessions(task_id);

CREATE TABLE IF NOT EXISTS user_stats (
    key   TEXT PRIMARY KEY,
    value INTEGER NOT NULL DEFAULT 0
);

INSERT OR IGNORE INTO user_stats (key, value) VALUES ('total_distance', 0);
";

fn set_pragmas(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;",
    )?;
    Ok(())
}

pub fn open(path: &Path) -> Result<Connection> {
    let conn = Connection::open(path)?;
    set_pragmas(&conn)?;
    Ok(conn)
}

pub fn init(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    migrate(conn)?;
    Ok(())
}

/// Bring databases created by older builds up to the current column set.
fn migrate(conn: &Connection) -> Result<()> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('tasks')")?;
    let columns: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<_>>()?;
    if !columns.iter().any(|c| c == "notes") {
        conn.execute_batch("ALTER TABLE tasks ADD COLUMN notes TEXT NOT NULL DEFAULT ''")?;
    }
    Ok(())
}

pub fn open_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    set_pragmas(&conn)?;
    init(&conn)?;
    Ok(conn)
}

/// Run `f` inside a named SAVEPOINT.
///
/// Savepoints nest, so an operation built from other operations still
/// commits or rolls back as one unit. On error everything done since the
/// savepoint is undone and the error is handed back to the caller.
pub fn with_savepoint<T>(
    conn: &Connection,
    name: &str,
    f: impl FnOnce() -> Result<T>,
) -> Result<T> {
    conn.execute_batch(&format!("SAVEPOINT {name}"))?;

    match f() {
        Ok(v) => {
            conn.execute_batch(&format!("RELEASE {name}"))?;
            Ok(v)
        }
        Err(e) => {
            warn!("{name}: rolled back: {e}");
            let _ = conn.execute_batch(&format!("ROLLBACK TO {name}"));
            let _ = conn.execute_batch(&format!("RELEASE {name}"));
            Err(e)
        }
    }
}
