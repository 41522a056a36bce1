//! Domain models shared by the library scanner, the SQLite snapshot and the
//! TUI. They stay plain data holders; parsing lives in `library` and
//! presentation in `ui`.

use std::fmt;
use std::path::{Path, PathBuf};

/// Metadata extracted from one song file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Song {
    /// Location of the `.sg` file. Acts as the row identity in the library.
    pub path: PathBuf,
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Raw `\selectlanguage` argument, e.g. `english`.
    pub language: String,
    /// Whether the song embeds a Lilypond score.
    pub is_lilypond: bool,
    /// Cover base name without extension, as written after `cov=`.
    pub cover_name: String,
    /// Directory holding the cover image (the song's own directory).
    pub cover_path: PathBuf,
}

impl Song {
    /// Compose a `Title - Artist` string that omits the hyphen when the artist
    /// is blank.
    pub fn display_title(&self) -> String {
        if self.artist.trim().is_empty() {
            self.title.clone()
        } else {
            format!("{} - {}", self.title, self.artist)
        }
    }

    /// Expected cover image location: `<cover_path>/<cover_name>.jpg`.
    pub fn cover_file(&self) -> PathBuf {
        self.cover_path.join(format!("{}.jpg", self.cover_name))
    }

    pub fn has_cover_name(&self) -> bool {
        !self.cover_name.trim().is_empty()
    }

    pub fn file_name(&self) -> &Path {
        self.path
            .file_name()
            .map(Path::new)
            .unwrap_or_else(|| self.path.as_path())
    }
}

impl fmt::Display for Song {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_title())
    }
}
