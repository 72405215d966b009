//! Runtime configuration.
//!
//! Precedence per field: command-line flag or environment variable, then
//! the TOML config file, then defaults under the platform data directory.

use anyhow::{bail, Context, Result};
use eisenhower_core::default_log_level;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const APP_DIR_NAME: &str = "Eisenhower3x3";
const CONFIG_FILE_NAME: &str = "config.toml";
const DB_FILE_NAME: &str = "tasks.sqlite3";
const LOG_DIR_NAME: &str = "logs";

/// Values supplied on the command line or through the environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub db_path: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
    pub log_level: Option<String>,
}

/// Optional keys of `config.toml`. Relative paths resolve against the
/// file's directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    db_path: Option<PathBuf>,
    log_dir: Option<PathBuf>,
    log_level: Option<String>,
}

/// Fully resolved settings. Paths are absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
}

impl AppConfig {
    pub fn resolve(overrides: &Overrides) -> Result<Self> {
        let data_dir = dirs::data_dir().map(|dir| dir.join(APP_DIR_NAME));
        let cwd = std::env::current_dir().context("cannot read current directory")?;

        let file = match (&overrides.config_path, &data_dir) {
            (Some(path), _) => {
                let path = absolutize(path, &cwd);
                Some((load_file(&path)?, parent_dir(&path)))
            }
            (None, Some(dir)) => {
                let path = dir.join(CONFIG_FILE_NAME);
                if path.is_file() {
                    Some((load_file(&path)?, dir.clone()))
                } else {
                    None
                }
            }
            (None, None) => None,
        };

        merge(overrides, file, data_dir.as_deref(), &cwd)
    }

    /// Creates the database parent directory.
    pub fn ensure_dirs(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("cannot create directory `{}`", parent.display()))?;
        }
        Ok(())
    }
}

fn load_file(path: &Path) -> Result<FileConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read config file `{}`", path.display()))?;
    toml::from_str(&text).with_context(|| format!("invalid config file `{}`", path.display()))
}

fn merge(
    overrides: &Overrides,
    file: Option<(FileConfig, PathBuf)>,
    data_dir: Option<&Path>,
    cwd: &Path,
) -> Result<AppConfig> {
    let (file, file_dir) = match file {
        Some((file, dir)) => (file, Some(dir)),
        None => (FileConfig::default(), None),
    };
    let from_file = |path: Option<PathBuf>| {
        path.map(|path| absolutize(&path, file_dir.as_deref().unwrap_or(cwd)))
    };

    let db_path = match overrides.db_path.as_ref() {
        Some(path) => absolutize(path, cwd),
        None => match from_file(file.db_path) {
            Some(path) => path,
            None => default_under(data_dir, DB_FILE_NAME, "--db")?,
        },
    };
    let log_dir = match overrides.log_dir.as_ref() {
        Some(path) => absolutize(path, cwd),
        None => match from_file(file.log_dir) {
            Some(path) => path,
            None => default_under(data_dir, LOG_DIR_NAME, "--log-dir")?,
        },
    };
    let log_level = overrides
        .log_level
        .clone()
        .or(file.log_level)
        .unwrap_or_else(|| default_log_level().to_string());

    Ok(AppConfig {
        db_path,
        log_dir,
        log_level,
    })
}

fn default_under(data_dir: Option<&Path>, name: &str, flag: &str) -> Result<PathBuf> {
    match data_dir {
        Some(dir) => Ok(dir.join(name)),
        None => bail!("cannot determine the user data directory; pass {flag}"),
    }
}

fn absolutize(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(db: Option<&str>, logs: Option<&str>, level: Option<&str>) -> FileConfig {
        FileConfig {
            db_path: db.map(PathBuf::from),
            log_dir: logs.map(PathBuf::from),
            log_level: level.map(str::to_string),
        }
    }

    #[test]
    fn defaults_live_under_data_dir() {
        let config = merge(
            &Overrides::default(),
            None,
            Some(Path::new("/data/Eisenhower3x3")),
            Path::new("/work"),
        )
        .unwrap();
        assert_eq!(config.db_path, Path::new("/data/Eisenhower3x3/tasks.sqlite3"));
        assert_eq!(config.log_dir, Path::new("/data/Eisenhower3x3/logs"));
        assert_eq!(config.log_level, default_log_level());
    }

    #[test]
    fn overrides_beat_file_and_file_beats_defaults() {
        let overrides = Overrides {
            db_path: Some(PathBuf::from("local.sqlite3")),
            ..Overrides::default()
        };
        let config = merge(
            &overrides,
            Some((
                file(Some("/srv/tasks.sqlite3"), Some("logs"), Some("warn")),
                PathBuf::from("/etc/eisenhower"),
            )),
            Some(Path::new("/data/Eisenhower3x3")),
            Path::new("/work"),
        )
        .unwrap();
        assert_eq!(config.db_path, Path::new("/work/local.sqlite3"));
        assert_eq!(config.log_dir, Path::new("/etc/eisenhower/logs"));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn missing_data_dir_requires_explicit_paths() {
        let err = merge(&Overrides::default(), None, None, Path::new("/work")).unwrap_err();
        assert!(err.to_string().contains("--db"));

        let overrides = Overrides {
            db_path: Some(PathBuf::from("/tmp/t.sqlite3")),
            log_dir: Some(PathBuf::from("/tmp/logs")),
            ..Overrides::default()
        };
        assert!(merge(&overrides, None, None, Path::new("/work")).is_ok());
    }

    #[test]
    fn config_file_parses_and_rejects_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        fs::write(&path, "db_path = \"tasks.db\"\nlog_level = \"error\"\n").unwrap();
        assert_eq!(
            load_file(&path).unwrap(),
            file(Some("tasks.db"), None, Some("error"))
        );

        fs::write(&path, "database = \"tasks.db\"\n").unwrap();
        assert!(load_file(&path).is_err());
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let overrides = Overrides {
            config_path: Some(dir.path().join("absent.toml")),
            ..Overrides::default()
        };
        let err = AppConfig::resolve(&overrides).unwrap_err();
        assert!(err.to_string().contains("cannot read config file"));
    }
}
