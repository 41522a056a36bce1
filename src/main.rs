//! Binary entry point: bring up logging and the SQLite store, resolve the
//! library directory, then run a subcommand or the TUI.
use clap::Parser;
use tracing::{error, info};

use songbook_manager::cli::{self, Cli, Command};
use songbook_manager::logging::init_logging;
use songbook_manager::{data_dir, ensure_schema, home_dir, run_app, App, AppConfig};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = data_dir()?;
    let _log_guard = init_logging(&data_dir)?;
    let mut conn = ensure_schema(&data_dir)?;

    let config = AppConfig::load(&conn, cli.library.as_deref(), &home_dir()?)?;
    config.store(&conn)?;
    let library_dir = config.library_dir;
    info!(library = %library_dir.display(), source = ?config.source, "starting");

    let result = match cli.command {
        Some(Command::Scan) => cli::run_scan(&mut conn, &library_dir),
        Some(Command::Chord { gtab, svg, border }) => cli::run_chord(&gtab, svg.as_deref(), border),
        Some(Command::New(args)) => cli::run_new(&library_dir, args),
        Some(Command::Import {
            source,
            overwrite,
            preserve,
        }) => cli::run_import(&library_dir, &source, overwrite, preserve),
        None => {
            let mut app = App::open(conn, &library_dir)?;
            run_app(&mut app)
        }
    };

    if let Err(err) = &result {
        error!(error = %format!("{err:#}"), "exited with error");
    }
    result
}
