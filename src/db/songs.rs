use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rusqlite::{params, Connection};

use crate::models::Song;

fn library_key(library: &Path) -> String {
    library.display().to_string()
}

/// Load the stored snapshot of a library, ordered case-insensitively by
/// title and artist so the table opens in a stable order.
pub fn fetch_library_songs(conn: &Connection, library: &Path) -> Result<Vec<Song>> {
    let mut stmt = conn
        .prepare(
            "SELECT path, title, artist, album, language, is_lilypond, cover_name, cover_path
             FROM library_songs
             WHERE library = ?1
             ORDER BY title COLLATE NOCASE, artist COLLATE NOCASE",
        )
        .context("failed to prepare library query")?;

    let songs = stmt
        .query_map(params![library_key(library)], |row| {
            Ok(Song {
                path: PathBuf::from(row.get::<_, String>(0)?),
                title: row.get(1)?,
                artist: row.get(2)?,
                album: row.get(3)?,
                language: row.get(4)?,
                is_lilypond: row.get(5)?,
                cover_name: row.get(6)?,
                cover_path: PathBuf::from(row.get::<_, String>(7)?),
            })
        })
        .context("failed to iterate library songs")?
        .collect::<Result<Vec<_>, _>>()
        .context("failed to collect library songs")?;

    Ok(songs)
}

/// Replace the snapshot of `library` with `songs` in one transaction.
pub fn replace_library_songs(conn: &mut Connection, library: &Path, songs: &[Song]) -> Result<()> {
    let key = library_key(library);
    let tx = conn
        .transaction()
        .context("failed to start library transaction")?;

    tx.execute("DELETE FROM library_songs WHERE library = ?1", params![key])
        .context("failed to clear library snapshot")?;

    {
        let mut insert = tx
            .prepare(
                "INSERT OR REPLACE INTO library_songs
                 (library, path, title, artist, album, language, is_lilypond, cover_name, cover_path)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )
            .context("failed to prepare library insert")?;
        for song in songs {
            insert
                .execute(params![
                    key,
                    song.path.display().to_string(),
                    song.title,
                    song.artist,
                    song.album,
                    song.language,
                    song.is_lilypond,
                    song.cover_name,
                    song.cover_path.display().to_string(),
                ])
                .with_context(|| format!("failed to store {}", song.path.display()))?;
        }
    }

    tx.commit().context("failed to commit library snapshot")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn song(path: &str, title: &str) -> Song {
        Song {
            path: PathBuf::from(path),
            title: title.to_string(),
            artist: "Artist".to_string(),
            is_lilypond: path.ends_with("b.sg"),
            cover_path: PathBuf::from("/lib/songs"),
            ..Song::default()
        }
    }

    #[test]
    fn snapshot_round_trip_sorted_by_title() {
        let mut conn = Connection::open_in_memory().expect("in-memory db");
        init_schema(&conn).expect("schema");
        let library = Path::new("/lib");

        replace_library_songs(
            &mut conn,
            library,
            &[song("/lib/songs/b.sg", "beta"), song("/lib/songs/a.sg", "Alpha")],
        )
        .expect("store");

        let songs = fetch_library_songs(&conn, library).expect("load");
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].title, "Alpha");
        assert!(songs[1].is_lilypond);
        assert_eq!(songs[1].cover_path, PathBuf::from("/lib/songs"));
    }

    #[test]
    fn replacing_drops_stale_rows_only_for_that_library() {
        let mut conn = Connection::open_in_memory().expect("in-memory db");
        init_schema(&conn).expect("schema");

        replace_library_songs(&mut conn, Path::new("/one"), &[song("/one/a.sg", "A")])
            .expect("store one");
        replace_library_songs(&mut conn, Path::new("/two"), &[song("/two/a.sg", "A")])
            .expect("store two");
        replace_library_songs(&mut conn, Path::new("/one"), &[]).expect("clear one");

        assert!(fetch_library_songs(&conn, Path::new("/one"))
            .expect("load one")
            .is_empty());
        assert_eq!(
            fetch_library_songs(&conn, Path::new("/two"))
                .expect("load two")
                .len(),
            1
        );
    }
}
