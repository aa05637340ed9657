use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::io::config_io::{self, ConfigError};
use crate::model::workspace::Workspace;

/// Environment variable naming the data directory
pub const DATA_DIR_ENV: &str = "FOCUSFLOW_DIR";

/// Error type for loading and saving stores
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no data directory: set FOCUSFLOW_DIR, XDG_DATA_HOME or HOME, or pass --data-dir")]
    NoDataDir,
    #[error("could not read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not write {path}: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("could not serialize {slot}: {source}")]
    Serialize {
        slot: &'static str,
        source: serde_json::Error,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// One persisted aggregate per store, each in its own file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Tasks,
    Habits,
    Focus,
    BrainDump,
}

impl Slot {
    pub const ALL: [Slot; 4] = [Slot::Tasks, Slot::Habits, Slot::Focus, Slot::BrainDump];

    pub fn file_name(self) -> &'static str {
        match self {
            Slot::Tasks => "tasks.json",
            Slot::Habits => "habits.json",
            Slot::Focus => "focus.json",
            Slot::BrainDump => "brain-dump.json",
        }
    }
}

// ---------------------------------------------------------------------------
// Data directory
// ---------------------------------------------------------------------------

/// Pick the data directory: an explicit path, else `FOCUSFLOW_DIR`, else
/// `$XDG_DATA_HOME/focusflow`, else `$HOME/.local/share/focusflow`.
pub fn resolve_data_dir(explicit: Option<&Path>) -> Result<PathBuf, StoreError> {
    resolve_data_dir_with(explicit, |key| std::env::var_os(key))
}

/// `resolve_data_dir` with the environment supplied by the caller
pub fn resolve_data_dir_with(
    explicit: Option<&Path>,
    env: impl Fn(&str) -> Option<OsString>,
) -> Result<PathBuf, StoreError> {
    if let Some(dir) = explicit {
        return Ok(dir.to_path_buf());
    }
    let non_empty = |key: &str| env(key).filter(|v| !v.is_empty());
    if let Some(dir) = non_empty(DATA_DIR_ENV) {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = non_empty("XDG_DATA_HOME") {
        return Ok(PathBuf::from(xdg).join("focusflow"));
    }
    if let Some(home) = non_empty("HOME") {
        return Ok(PathBuf::from(home).join(".local/share/focusflow"));
    }
    Err(StoreError::NoDataDir)
}

pub fn ensure_data_dir(dir: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(dir).map_err(|source| StoreError::Write {
        path: dir.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path.parent().unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Read one slot. A missing file is the default aggregate; a malformed
/// one is an error.
pub fn load_slot<T: DeserializeOwned + Default>(dir: &Path, slot: Slot) -> Result<T, StoreError> {
    let path = dir.join(slot.file_name());
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!(slot = slot.file_name(), "slot missing, using defaults");
            return Ok(T::default());
        }
        Err(source) => return Err(StoreError::Read { path, source }),
    };
    serde_json::from_str(&text).map_err(|source| StoreError::Parse { path, source })
}

/// Replace one slot with the full serialised aggregate.
pub fn save_slot<T: Serialize>(dir: &Path, slot: Slot, value: &T) -> Result<(), StoreError> {
    let mut json = serde_json::to_string_pretty(value).map_err(|source| StoreError::Serialize {
        slot: slot.file_name(),
        source,
    })?;
    json.push('\n');
    let path = dir.join(slot.file_name());
    atomic_write(&path, json.as_bytes()).map_err(|source| StoreError::Write { path, source })?;
    debug!(slot = slot.file_name(), bytes = json.len(), "slot saved");
    Ok(())
}

// ---------------------------------------------------------------------------
// Workspace
// ---------------------------------------------------------------------------

/// Load config and every slot from `dir`. The directory need not exist.
pub fn load_workspace(dir: &Path) -> Result<Workspace, StoreError> {
    let mut ws = Workspace::empty(dir.to_path_buf());
    ws.config = config_io::load_config(dir)?;
    ws.tasks = load_slot(dir, Slot::Tasks)?;
    ws.habits = load_slot(dir, Slot::Habits)?;
    ws.focus = load_slot(dir, Slot::Focus)?;
    ws.brain_dump = load_slot(dir, Slot::BrainDump)?;
    debug!(
        dir = %dir.display(),
        tasks = ws.tasks.tasks.len(),
        habits = ws.habits.habits.len(),
        sessions = ws.focus.sessions.len(),
        items = ws.brain_dump.items.len(),
        "workspace loaded"
    );
    Ok(ws)
}

/// Write the given slots of `ws`, creating the data directory if needed.
pub fn save_slots(ws: &Workspace, slots: &[Slot]) -> Result<(), StoreError> {
    ensure_data_dir(&ws.data_dir)?;
    for slot in slots {
        match slot {
            Slot::Tasks => save_slot(&ws.data_dir, *slot, &ws.tasks)?,
            Slot::Habits => save_slot(&ws.data_dir, *slot, &ws.habits)?,
            Slot::Focus => save_slot(&ws.data_dir, *slot, &ws.focus)?,
            Slot::BrainDump => save_slot(&ws.data_dir, *slot, &ws.brain_dump)?,
        }
    }
    Ok(())
}

pub fn save_workspace(ws: &Workspace) -> Result<(), StoreError> {
    save_slots(ws, &Slot::ALL)
}
