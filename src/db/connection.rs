use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use rusqlite::Connection;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".songbook-manager";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "songbook.sqlite";

/// Open the database inside `data_dir`, creating the directory and running
/// lazy migrations.
pub fn ensure_schema(data_dir: &Path) -> Result<Connection> {
    fs::create_dir_all(data_dir).context("failed to create data directory")?;
    let conn =
        Connection::open(data_dir.join(DB_FILE_NAME)).context("failed to open SQLite database")?;
    init_schema(&conn)?;
    Ok(conn)
}

/// Create the tables on an already open connection. Tests run this against
/// in-memory databases.
pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )
    .context("failed to create settings table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS library_songs (
            library TEXT NOT NULL,
            path TEXT NOT NULL,
            title TEXT NOT NULL,
            artist TEXT NOT NULL,
            album TEXT NOT NULL,
            language TEXT NOT NULL,
            is_lilypond INTEGER NOT NULL,
            cover_name TEXT NOT NULL,
            cover_path TEXT NOT NULL,
            PRIMARY KEY (library, path)
        )",
        [],
    )
    .context("failed to create library_songs table")?;

    Ok(())
}

/// Resolve the application data directory inside the user's home.
pub fn data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}

/// The user's home directory, used for default paths.
pub fn home_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_is_idempotent() {
        let dir = tempfile::tempdir().expect("tempdir");
        ensure_schema(dir.path()).expect("first open");
        let conn = ensure_schema(dir.path()).expect("second open");
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'",
                [],
                |row| row.get(0),
            )
            .expect("count tables");
        assert_eq!(tables, 2);
    }
}
