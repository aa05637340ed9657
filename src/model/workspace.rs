use std::path::PathBuf;

use super::brain_dump::BrainDump;
use super::config::Config;
use super::focus::FocusLog;
use super::habit::HabitBook;
use super::task::TaskBook;

/// A fully loaded FocusFlow data directory.
///
/// Owns one aggregate per store. Nothing in the crate holds global state;
/// callers pass the pieces they need to the `ops` functions.
#[derive(Debug, Clone)]
pub struct Workspace {
    /// Directory holding the JSON slots and config.toml
    pub data_dir: PathBuf,
    /// Parsed config.toml (defaults when absent)
    pub config: Config,
    pub tasks: TaskBook,
    pub habits: HabitBook,
    pub focus: FocusLog,
    pub brain_dump: BrainDump,
}

impl Workspace {
    /// An empty workspace rooted at `data_dir`, with default vocabularies
    pub fn empty(data_dir: PathBuf) -> Self {
        Workspace {
            data_dir,
            config: Config::default(),
            tasks: TaskBook::default(),
            habits: HabitBook::default(),
            focus: FocusLog::default(),
            brain_dump: BrainDump::default(),
        }
    }
}
