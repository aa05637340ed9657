use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::io::store_io::atomic_write;
use crate::model::config::Config;

pub const CONFIG_FILE: &str = "config.toml";

/// Commented starting config written by `ff init`
pub const CONFIG_TEMPLATE: &str = include_str!("../templates/config.toml");

/// Every key `ff config set` accepts, as `section.key`
pub const KNOWN_KEYS: &[&str] = &[
    "timer.pomodoro_minutes",
    "timer.short_break_minutes",
    "timer.long_break_minutes",
    "timer.pomodoros_until_long_break",
    "timer.auto_start_breaks",
    "timer.auto_start_pomodoros",
    "habits.regenerate_on_load",
    "log.level",
];

/// Error type for config reading and editing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("could not parse {path}: {source}")]
    Document {
        path: PathBuf,
        source: toml_edit::TomlError,
    },
    #[error("unknown config key: {0} (known keys: {known})", known = KNOWN_KEYS.join(", "))]
    UnknownKey(String),
    #[error("invalid value for {key}: {source}")]
    InvalidValue { key: String, source: toml::de::Error },
}

fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

fn read_text(path: &Path) -> Result<Option<String>, ConfigError> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Parse config.toml in `dir`. A missing file means all defaults.
pub fn load_config(dir: &Path) -> Result<Config, ConfigError> {
    let path = config_path(dir);
    let Some(text) = read_text(&path)? else {
        return Ok(Config::default());
    };
    toml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })
}

/// Read the config as an editable document, keeping comments and layout.
pub fn read_config_doc(dir: &Path) -> Result<toml_edit::DocumentMut, ConfigError> {
    let path = config_path(dir);
    let text = read_text(&path)?.unwrap_or_default();
    text.parse()
        .map_err(|source| ConfigError::Document { path, source })
}

/// Write the document back to disk, preserving formatting.
pub fn write_config_doc(dir: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    let path = config_path(dir);
    atomic_write(&path, doc.to_string().as_bytes())
        .map_err(|source| ConfigError::Write { path, source })
}

/// Write the commented template. Returns false when a config already
/// exists and `force` is off.
pub fn write_template(dir: &Path, force: bool) -> Result<bool, ConfigError> {
    let path = config_path(dir);
    if path.exists() && !force {
        return Ok(false);
    }
    atomic_write(&path, CONFIG_TEMPLATE.as_bytes())
        .map_err(|source| ConfigError::Write { path, source })?;
    Ok(true)
}

/// Interpret a command-line value: booleans and integers keep their type,
/// anything else is a string.
fn parse_value(raw: &str) -> toml_edit::Item {
    if let Ok(b) = raw.parse::<bool>() {
        return toml_edit::value(b);
    }
    if let Ok(n) = raw.parse::<i64>() {
        return toml_edit::value(n);
    }
    toml_edit::value(raw)
}

/// Set a dotted `section.key` in the document. The edit is validated by
/// parsing the result as a `Config`; on failure the document is unchanged.
pub fn set_key(doc: &mut toml_edit::DocumentMut, key: &str, raw: &str) -> Result<Config, ConfigError> {
    if !KNOWN_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey(key.to_string()));
    }
    let Some((section, field)) = key.split_once('.') else {
        return Err(ConfigError::UnknownKey(key.to_string()));
    };

    let mut edited = doc.clone();
    if !edited.contains_key(section) {
        edited[section] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    edited[section][field] = parse_value(raw);

    let config: Config = toml::from_str(&edited.to_string()).map_err(|source| ConfigError::InvalidValue {
        key: key.to_string(),
        source,
    })?;
    *doc = edited;
    debug!(key, value = raw, "config key set");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_is_default() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(load_config(tmp.path()).unwrap(), Config::default());
    }

    #[test]
    fn template_parses_to_defaults() {
        let config: Config = toml::from_str(CONFIG_TEMPLATE).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn template_not_overwritten_without_force() {
        let tmp = TempDir::new().unwrap();
        assert!(write_template(tmp.path(), false).unwrap());
        fs::write(tmp.path().join(CONFIG_FILE), "[log]\nlevel = \"debug\"\n").unwrap();
        assert!(!write_template(tmp.path(), false).unwrap());
        assert_eq!(load_config(tmp.path()).unwrap().log.level, "debug");
        assert!(write_template(tmp.path(), true).unwrap());
        assert_eq!(load_config(tmp.path()).unwrap().log.level, "warn");
    }

    #[test]
    fn set_key_preserves_comments() {
        let tmp = TempDir::new().unwrap();
        write_template(tmp.path(), false).unwrap();
        let mut doc = read_config_doc(tmp.path()).unwrap();
        let config = set_key(&mut doc, "timer.pomodoro_minutes", "50").unwrap();
        assert_eq!(config.timer.pomodoro_minutes, 50);
        write_config_doc(tmp.path(), &doc).unwrap();

        let text = fs::read_to_string(tmp.path().join(CONFIG_FILE)).unwrap();
        assert!(text.contains("# Length of one focus block, in minutes"));
        assert!(text.contains("pomodoro_minutes = 50"));
        assert_eq!(load_config(tmp.path()).unwrap().timer.pomodoro_minutes, 50);
    }

    #[test]
    fn set_key_creates_missing_section() {
        let mut doc = toml_edit::DocumentMut::new();
        let config = set_key(&mut doc, "timer.auto_start_pomodoros", "true").unwrap();
        assert!(config.timer.auto_start_pomodoros);
        assert!(doc.to_string().contains("[timer]"));
    }

    #[test]
    fn set_key_rejects_unknown_and_ill_typed() {
        let mut doc = toml_edit::DocumentMut::new();
        assert!(matches!(
            set_key(&mut doc, "timer.nap_minutes", "5"),
            Err(ConfigError::UnknownKey(_))
        ));
        assert!(matches!(
            set_key(&mut doc, "timer.pomodoro_minutes", "soon"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert_eq!(doc.to_string(), "");
    }

    #[test]
    fn malformed_config_is_an_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(CONFIG_FILE), "[timer\n").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
