use clap::Parser;
use focusflow::cli::commands::Cli;
use focusflow::cli::handlers;
use focusflow::io::{config_io, store_io};
use focusflow::logging;

fn main() {
    let cli = Cli::parse();

    // A broken config should not stop `ff config set` from fixing it
    let level = store_io::resolve_data_dir(cli.data_dir.as_deref())
        .ok()
        .and_then(|dir| config_io::load_config(&dir).ok())
        .map(|config| config.log.level)
        .unwrap_or_else(|| logging::FALLBACK_LEVEL.to_string());
    logging::init(&level);

    if let Err(e) = handlers::dispatch(cli) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
