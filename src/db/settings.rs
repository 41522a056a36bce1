use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};

/// Key under which the last opened library directory is stored.
pub const LIBRARY_DIR_KEY: &str = "library_dir";
/// Last directory songs were imported from, offered again in the prompt.
pub const IMPORT_DIR_KEY: &str = "import_dir";

pub fn get_setting(conn: &Connection, key: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT value FROM settings WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .with_context(|| format!("failed to read setting {key}"))
}

/// Insert or replace a setting.
pub fn set_setting(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO settings (key, value) VALUES (?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        params![key, value],
    )
    .with_context(|| format!("failed to store setting {key}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    #[test]
    fn settings_round_trip_and_overwrite() {
        let conn = Connection::open_in_memory().expect("in-memory db");
        init_schema(&conn).expect("schema");

        assert_eq!(get_setting(&conn, LIBRARY_DIR_KEY).expect("read"), None);
        set_setting(&conn, LIBRARY_DIR_KEY, "/music/a").expect("write");
        set_setting(&conn, LIBRARY_DIR_KEY, "/music/b").expect("overwrite");
        assert_eq!(
            get_setting(&conn, LIBRARY_DIR_KEY).expect("read"),
            Some("/music/b".to_string())
        );
    }
}
