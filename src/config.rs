use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::model::Category;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Database path override.
    pub db: Option<PathBuf>,
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TasksConfig {
    pub default_category: Category,
    /// Subtasks may only be added beneath tasks shallower than this.
    pub max_depth: usize,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            default_category: Category::Work,
            max_depth: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ReportConfig {
    pub include_prompt: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            include_prompt: true,
        }
    }
}

impl Config {
    /// Load `config.toml` from the data directory.
    /// Returns default config if the file doesn't exist.
    pub fn load() -> Result<Self> {
        Self::load_from(&crate::paths::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let config: Config = match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents)
                .with_context(|| format!("failed to parse {}", path.display()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Config::default()),
            Err(e) => return Err(e).with_context(|| format!("failed to read {}", path.display())),
        };
        if config.tasks.max_depth == 0 {
            bail!(
                "failed to parse {}: tasks.max_depth must be at least 1",
                path.display()
            );
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    #[test]
    fn missing_file_returns_default() {
        let config = Config::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert!(config.db.is_none());
        assert_eq!(config.tasks.default_category, Category::Work);
        assert_eq!(config.tasks.max_depth, 5);
        assert!(config.report.include_prompt);
    }

    #[test]
    fn parse_full_config() {
        let f = write_config(
            r#"
db = "/tmp/tasks.db"

[tasks]
default_category = "Personal"
max_depth = 3

[report]
include_prompt = false
"#,
        );
        let config = Config::load_from(f.path()).unwrap();
        assert_eq!(config.db.as_deref(), Some(Path::new("/tmp/tasks.db")));
        assert_eq!(config.tasks.default_category, Category::Personal);
        assert_eq!(config.tasks.max_depth, 3);
        assert!(!config.report.include_prompt);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let f = write_config("[tasks]\nmax_depth = 2\n");
        let config = Config::load_from(f.path()).unwrap();
        assert_eq!(config.tasks.max_depth, 2);
        assert_eq!(config.tasks.default_category, Category::Work);
        assert!(config.report.include_prompt);
    }

    #[test]
    fn unknown_field_is_rejected() {
        let f = write_config("[tasks]\ncolour = \"red\"\n");
        let err = Config::load_from(f.path()).unwrap_err();
        assert!(format!("{err:#}").contains("failed to parse"));
    }

    #[test]
    fn lowercase_category_is_accepted() {
        let f = write_config("[tasks]\ndefault_category = \"personal\"\n");
        let config = Config::load_from(f.path()).unwrap();
        assert_eq!(config.tasks.default_category, Category::Personal);

        let f = write_config("[tasks]\ndefault_category = \"work\"\n");
        let config = Config::load_from(f.path()).unwrap();
        assert_eq!(config.tasks.default_category, Category::Work);
    }

    #[test]
    fn bad_category_is_rejected() {
        let f = write_config("[tasks]\ndefault_category = \"Hobby\"\n");
        assert!(Config::load_from(f.path()).is_err());
    }

    #[test]
    fn zero_depth_is_rejected() {
        let f = write_config("[tasks]\nmax_depth = 0\n");
        let err = Config::load_from(f.path()).unwrap_err();
        assert!(err.to_string().contains("max_depth"));
    }
}
