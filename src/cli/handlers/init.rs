use std::path::Path;

use crate::cli::commands::InitArgs;
use crate::io::config_io;
use crate::io::store_io::{self, Slot, StoreError};
use crate::model::workspace::Workspace;

/// What `ff init` created
#[derive(Debug, Default, PartialEq)]
pub struct InitReport {
    pub wrote_config: bool,
    pub created_slots: Vec<&'static str>,
}

/// Create the data directory, the config template and any missing slot
/// files. Existing slots are never touched.
pub fn init_data_dir(dir: &Path, force: bool) -> Result<InitReport, StoreError> {
    store_io::ensure_data_dir(dir)?;
    let mut report = InitReport {
        wrote_config: config_io::write_template(dir, force)?,
        ..Default::default()
    };

    let missing: Vec<Slot> = Slot::ALL
        .into_iter()
        .filter(|s| !dir.join(s.file_name()).exists())
        .collect();
    let empty = Workspace::empty(dir.to_path_buf());
    store_io::save_slots(&empty, &missing)?;
    report.created_slots = missing.iter().map(|s| s.file_name()).collect();
    Ok(report)
}

pub fn cmd_init(args: InitArgs, data_dir: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let report = init_data_dir(data_dir, args.force)?;
    if !report.wrote_config && report.created_slots.is_empty() {
        println!("focusflow data already set up in {}", data_dir.display());
        return Ok(());
    }
    println!("Initialized focusflow data in {}", data_dir.display());
    if report.wrote_config {
        println!("  wrote {}", config_io::CONFIG_FILE);
    }
    for name in &report.created_slots {
        println!("  created {}", name);
    }
    Ok(())
}
