use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::config::Config;

const DB_FILE: &str = "ttrack.db";
const CONFIG_FILE: &str = "config.toml";

fn data_dir_from(ttrack_home: Option<String>, home: Option<String>) -> PathBuf {
    match ttrack_home {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let home = home.unwrap_or_else(|| ".".into());
            Path::new(&home).join(".ttrack")
        }
    }
}

/// `$TTRACK_HOME`, or `~/.ttrack`.
pub fn data_dir() -> PathBuf {
    data_dir_from(std::env::var("TTRACK_HOME").ok(), std::env::var("HOME").ok())
}

pub fn config_path() -> PathBuf {
    data_dir().join(CONFIG_FILE)
}

/// Pick the database path: an explicit path (the `--db` flag or
/// `$TTRACK_DB`), then the config file's `db`, then the data directory.
pub fn db_path(explicit: Option<&Path>, config: &Config) -> PathBuf {
    resolve_db_path(explicit, config, &data_dir())
}

fn resolve_db_path(explicit: Option<&Path>, config: &Config, data_dir: &Path) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .or_else(|| config.db.clone())
        .unwrap_or_else(|| data_dir.join(DB_FILE))
}

/// Create the directory that will hold `db_path`, if it has one.
pub fn ensure_parent_dir(db_path: &Path) -> Result<()> {
    match db_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display())),
        _ => Ok(()),
    }
}
