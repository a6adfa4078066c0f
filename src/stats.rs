use rusqlite::{Connection, OptionalExtension};

use crate::db::with_savepoint;
use crate::error::Result;

const TOTAL_DISTANCE: &str = "total_distance";

pub fn get_total_distance(conn: &Connection) -> Result<i64> {
    let value = conn
        .query_row(
            "SELECT value FROM user_stats WHERE key = ?1",
            [TOTAL_DISTANCE],
            |row| row.get(0),
        )
        .optional()?;
    Ok(value.unwrap_or(0))
}

/// Add `km` to the distance counter and return the new total.
pub fn add_distance(conn: &Connection, km: i64) -> Result<i64> {
    with_savepoint(conn, "add_distance", || {
        conn.execute(
            "INSERT INTO user_stats (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = value + excluded.value",
            rusqlite::params![TOTAL_DISTANCE, km],
        )?;
        get_total_distance(conn)
    })
}
