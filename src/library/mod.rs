//! In-memory song library backed by a directory of `.sg` files.
//!
//! The library walks `<directory>/songs/` for song files, extracts their
//! metadata and exposes the result as a six-column table for the UI. There is
//! no incremental indexing: an update re-parses everything and the last
//! parse wins.

pub mod covers;
pub mod latex;
pub mod parser;

use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::models::Song;

pub use covers::{CoverCache, Thumbnail, ThumbnailSize};
pub use latex::{latex_to_utf8, utf8_to_latex};
pub use parser::{parse_song, parse_song_text};

/// Sub-directory of a library holding the song files.
pub const SONGS_DIR: &str = "songs";
/// Extension of song files.
pub const SONG_EXTENSION: &str = "sg";

pub const COLUMN_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Column {
    Title,
    Artist,
    Lilypond,
    Path,
    Album,
    Language,
}

impl Column {
    pub const ALL: [Column; COLUMN_COUNT] = [
        Column::Title,
        Column::Artist,
        Column::Lilypond,
        Column::Path,
        Column::Album,
        Column::Language,
    ];

    pub fn from_index(section: usize) -> Option<Self> {
        Self::ALL.get(section).copied()
    }

    pub fn header(self) -> &'static str {
        match self {
            Column::Title => "Title",
            Column::Artist => "Artist",
            Column::Lilypond => "Lilypond",
            Column::Path => "Path",
            Column::Album => "Album",
            Column::Language => "Language",
        }
    }
}

/// Display data of one table cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    pub text: String,
    /// Short marker drawn before the text (flag, score or cover badge).
    pub decoration: Option<String>,
    pub tooltip: Option<String>,
}

/// Outcome of a batch parse.
#[derive(Debug, Default, Clone)]
pub struct ScanReport {
    pub found: usize,
    pub parsed: usize,
    pub skipped: Vec<(PathBuf, String)>,
}

impl fmt::Display for ScanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.skipped.is_empty() {
            write!(f, "Song database updated: {} songs.", self.parsed)
        } else {
            write!(
                f,
                "Song database updated: {} songs, {} unreadable.",
                self.parsed,
                self.skipped.len()
            )
        }
    }
}

fn language_flag(language: &str) -> Option<&'static str> {
    match language {
        "french" => Some("FR"),
        "english" => Some("EN"),
        "spanish" => Some("ES"),
        _ => None,
    }
}

#[derive(Debug, Default)]
pub struct Library {
    directory: PathBuf,
    songs: Vec<Song>,
    covers: RefCell<CoverCache>,
    generation: u64,
}

impl Library {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            songs: Vec::new(),
            covers: RefCell::new(CoverCache::new()),
            generation: 0,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn songs_dir(&self) -> PathBuf {
        self.directory.join(SONGS_DIR)
    }

    /// Point the library at `directory`. A change triggers a full update and
    /// returns its report; the same directory is a no-op.
    pub fn set_directory(
        &mut self,
        directory: impl Into<PathBuf>,
        progress: impl FnMut(usize, usize),
    ) -> Result<Option<ScanReport>> {
        let directory = directory.into();
        if directory == self.directory {
            return Ok(None);
        }
        info!(directory = %directory.display(), "library directory changed");
        self.directory = directory;
        self.update(progress).map(Some)
    }

    /// Every song file below `songs/`, in file-name order.
    pub fn song_paths(&self) -> Vec<PathBuf> {
        let root = self.songs_dir();
        if !root.is_dir() {
            warn!(root = %root.display(), "songs directory missing");
            return Vec::new();
        }
        WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some(SONG_EXTENSION))
            .collect()
    }

    /// Re-scan the whole directory.
    pub fn update(&mut self, progress: impl FnMut(usize, usize)) -> Result<ScanReport> {
        self.songs.clear();
        self.covers.borrow_mut().clear();
        let paths = self.song_paths();
        let report = self.add_songs(&paths, progress);
        info!(
            parsed = report.parsed,
            skipped = report.skipped.len(),
            "song database updated"
        );
        Ok(report)
    }

    pub fn add_songs(&mut self, paths: &[PathBuf], mut progress: impl FnMut(usize, usize)) -> ScanReport {
        let mut report = ScanReport {
            found: paths.len(),
            ..ScanReport::default()
        };
        for (index, path) in paths.iter().enumerate() {
            progress(index + 1, paths.len());
            match parse_song(path) {
                Ok(song) => {
                    self.songs.push(song);
                    report.parsed += 1;
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable song");
                    report.skipped.push((path.clone(), err.to_string()));
                }
            }
        }
        self.generation += 1;
        report
    }

    pub fn add_song(&mut self, path: &Path) -> Result<()> {
        let song = parse_song(path)?;
        debug!(path = %path.display(), "song added");
        self.songs.push(song);
        self.generation += 1;
        Ok(())
    }

    /// Remove every row whose path is `path`. Returns whether any was removed.
    pub fn remove_song(&mut self, path: &Path) -> bool {
        let before = self.songs.len();
        self.songs.retain(|song| song.path != path);
        let removed = self.songs.len() != before;
        if removed {
            self.generation += 1;
        }
        removed
    }

    /// Re-parse a single song after it changed on disk.
    pub fn update_song(&mut self, path: &Path) -> Result<()> {
        self.remove_song(path);
        self.add_song(path)
    }

    pub fn contains_song(&self, path: &Path) -> bool {
        self.songs.iter().any(|song| song.path == path)
    }

    /// Replace the rows wholesale, e.g. from the stored snapshot.
    pub fn replace_songs(&mut self, songs: Vec<Song>) {
        self.songs = songs;
        self.covers.borrow_mut().clear();
        self.generation += 1;
    }

    /// Bumped on every modification so views know when to refresh.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn songs(&self) -> &[Song] {
        &self.songs
    }

    pub fn song(&self, row: usize) -> Option<&Song> {
        self.songs.get(row)
    }

    pub fn row_count(&self) -> usize {
        self.songs.len()
    }

    pub fn column_count(&self) -> usize {
        COLUMN_COUNT
    }

    pub fn header(&self, section: usize) -> Option<&'static str> {
        Column::from_index(section).map(Column::header)
    }

    pub fn cell(&self, row: usize, column: Column) -> Option<Cell> {
        let song = self.songs.get(row)?;
        let cell = match column {
            Column::Title => Cell {
                text: song.title.clone(),
                ..Cell::default()
            },
            Column::Artist => Cell {
                text: song.artist.clone(),
                ..Cell::default()
            },
            Column::Lilypond => {
                if song.is_lilypond {
                    Cell {
                        text: String::new(),
                        decoration: Some("♪".to_string()),
                        tooltip: Some("Lilypond music sheet".to_string()),
                    }
                } else {
                    Cell::default()
                }
            }
            Column::Path => Cell {
                text: song.path.display().to_string(),
                ..Cell::default()
            },
            Column::Album => {
                let thumbnail = self.cover_thumbnail(row, ThumbnailSize::Small)?;
                Cell {
                    text: song.album.clone(),
                    decoration: Some(thumbnail.badge().to_string()),
                    tooltip: thumbnail.file.map(|file| file.display().to_string()),
                }
            }
            Column::Language => match language_flag(&song.language) {
                Some(flag) => Cell {
                    text: String::new(),
                    decoration: Some(flag.to_string()),
                    tooltip: Some(song.language.clone()),
                },
                None => Cell {
                    text: song.language.clone(),
                    ..Cell::default()
                },
            },
        };
        Some(cell)
    }

    pub fn cover_file(&self, row: usize) -> Option<PathBuf> {
        self.songs.get(row).map(Song::cover_file)
    }

    pub fn cover_thumbnail(&self, row: usize, size: ThumbnailSize) -> Option<Thumbnail> {
        let song = self.songs.get(row)?;
        let mut covers = self.covers.borrow_mut();
        if !song.has_cover_name() {
            return Some(covers.placeholder(size));
        }
        Some(covers.thumbnail(&song.cover_file(), size))
    }

    /// Row indices whose title, artist or album contains `query`
    /// (case-insensitive). A blank query matches everything.
    pub fn filter(&self, query: &str) -> Vec<usize> {
        let needle = query.trim().to_lowercase();
        self.songs
            .iter()
            .enumerate()
            .filter(|(_, song)| {
                needle.is_empty()
                    || song.title.to_lowercase().contains(&needle)
                    || song.artist.to_lowercase().contains(&needle)
                    || song.album.to_lowercase().contains(&needle)
            })
            .map(|(index, _)| index)
            .collect()
    }
}
