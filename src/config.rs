//! Startup configuration: where the library lives.

use std::path::{Path, PathBuf};

use anyhow::Result;
use rusqlite::Connection;
use tracing::debug;

use crate::db::{get_setting, set_setting, LIBRARY_DIR_KEY};

/// Library folder used when neither the command line nor the settings name one.
pub const DEFAULT_LIBRARY_DIR_NAME: &str = "songbook";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibrarySource {
    CommandLine,
    Stored,
    Default,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub library_dir: PathBuf,
    pub source: LibrarySource,
}

impl AppConfig {
    /// Pick the library directory: command line first, then the stored
    /// setting, then `~/songbook`.
    pub fn resolve(cli_library: Option<&Path>, stored: Option<String>, home: &Path) -> Self {
        let (library_dir, source) = if let Some(dir) = cli_library {
            (dir.to_path_buf(), LibrarySource::CommandLine)
        } else if let Some(dir) = stored.filter(|value| !value.trim().is_empty()) {
            (PathBuf::from(dir), LibrarySource::Stored)
        } else {
            (home.join(DEFAULT_LIBRARY_DIR_NAME), LibrarySource::Default)
        };
        debug!(dir = %library_dir.display(), ?source, "library directory resolved");
        Self {
            library_dir,
            source,
        }
    }

    pub fn load(conn: &Connection, cli_library: Option<&Path>, home: &Path) -> Result<Self> {
        let stored = get_setting(conn, LIBRARY_DIR_KEY)?;
        Ok(Self::resolve(cli_library, stored, home))
    }

    /// Remember the library for the next start.
    pub fn store(&self, conn: &Connection) -> Result<()> {
        set_setting(conn, LIBRARY_DIR_KEY, &self.library_dir.display().to_string())
    }
}
