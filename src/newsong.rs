//! New song entries: the data collected by the "New song" form and the song
//! file it produces inside the library.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;

use crate::error::NewSongError;
use crate::library::{utf8_to_latex, SONGS_DIR, SONG_EXTENSION};

/// Upper bound shared by the column and capo spin boxes.
pub const MAX_SPIN_VALUE: u8 = 20;

/// Never valid in a text field of the template.
const RESERVED: &[char] = &['\\', '{', '}'];
/// The title is matched up to the first `[`.
const RESERVED_IN_TITLE: &[char] = &['\\', '{', '}', '['];

fn check_reserved(
    field: &'static str,
    value: &str,
    reserved: &[char],
) -> Result<(), NewSongError> {
    match value.chars().find(|ch| reserved.contains(ch)) {
        Some(ch) => Err(NewSongError::ReservedCharacter { field, ch }),
        None => Ok(()),
    }
}

/// Escaped option value, braced when it holds an option separator.
fn option_value(value: &str) -> String {
    let escaped = utf8_to_latex(value.trim());
    if escaped.contains([',', '[', ']', '|', '=']) {
        format!("{{{escaped}}}")
    } else {
        escaped
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewSong {
    pub title: String,
    pub artist: String,
    pub album: String,
    /// Image to copy next to the song as its cover.
    pub cover: Option<PathBuf>,
    /// `0` keeps the songbook default.
    pub columns: u8,
    /// `0` means no capo.
    pub capo: u8,
}

impl NewSong {
    pub fn validate(&self) -> Result<(), NewSongError> {
        if self.title.trim().is_empty() {
            return Err(NewSongError::MissingTitle);
        }
        if self.artist.trim().is_empty() {
            return Err(NewSongError::MissingArtist);
        }
        check_reserved("Title", &self.title, RESERVED_IN_TITLE)?;
        check_reserved("Artist", &self.artist, RESERVED)?;
        check_reserved("Album", &self.album, RESERVED)?;
        if self.columns > MAX_SPIN_VALUE {
            return Err(NewSongError::OutOfRange {
                field: "Number of columns",
                max: MAX_SPIN_VALUE,
            });
        }
        if self.capo > MAX_SPIN_VALUE {
            return Err(NewSongError::OutOfRange {
                field: "Capo",
                max: MAX_SPIN_VALUE,
            });
        }
        if let Some(cover) = &self.cover {
            if !cover.is_file() {
                return Err(NewSongError::CoverNotFound(cover.clone()));
            }
        }
        Ok(())
    }

    /// File stem shared by the song and its cover.
    pub fn file_stem(&self) -> String {
        slugify(&self.title)
    }

    /// `songs/<artist>/<title>.sg`, relative to the library directory.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(SONGS_DIR)
            .join(slugify(&self.artist))
            .join(format!("{}.{SONG_EXTENSION}", self.file_stem()))
    }

    /// Song file content for the `songs` package.
    pub fn render(&self) -> String {
        let mut options = vec![format!("by={}", option_value(&self.artist))];
        if self.cover.is_some() {
            options.push(format!("cov={}", self.file_stem()));
        }
        if !self.album.trim().is_empty() {
            options.push(format!("album={}", option_value(&self.album)));
        }

        let mut out = String::new();
        if self.columns > 0 {
            out.push_str(&format!("\\songcolumns{{{}}}\n", self.columns));
        }
        out.push_str(&format!(
            "\\beginsong{{{}}}\n",
            utf8_to_latex(self.title.trim())
        ));
        out.push_str(&format!("  [{}]\n\n", options.join(",")));
        if self.cover.is_some() {
            out.push_str("\\cover\n");
        }
        if self.capo > 0 {
            out.push_str(&format!("\\capo{{{}}}\n", self.capo));
        }
        out.push_str("\n\\begin{verse}\n\n\\end{verse}\n\n\\endsong\n");
        out
    }

    /// Write the song (and its cover) under `library_dir`. Returns the path of
    /// the new song file.
    pub fn create_in(&self, library_dir: &Path) -> Result<PathBuf> {
        self.validate()?;
        let path = library_dir.join(self.relative_path());
        if path.exists() {
            return Err(NewSongError::AlreadyExists(path).into());
        }
        let parent = path
            .parent()
            .context("song path has no parent directory")?;
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;

        if let Some(cover) = &self.cover {
            let target = parent.join(format!("{}.jpg", self.file_stem()));
            fs::copy(cover, &target).with_context(|| {
                format!("failed to copy cover {} to {}", cover.display(), target.display())
            })?;
        }

        fs::write(&path, self.render())
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!(path = %path.display(), "created song");
        Ok(path)
    }
}

/// Lowercase ASCII file name: accents folded, separators collapsed to `_`.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_separator = false;
    for ch in text.trim().chars() {
        let folded = fold_accent(ch);
        if folded.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(folded.to_ascii_lowercase());
        } else if ch.is_whitespace() || matches!(ch, '-' | '_' | '\'' | '.' | ',') {
            pending_separator = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("untitled");
    }
    slug
}

fn fold_accent(ch: char) -> char {
    match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => 'a',
        'ç' | 'Ç' => 'c',
        'è' | 'é' | 'ê' | 'ë' | 'È' | 'É' | 'Ê' | 'Ë' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'Ì' | 'Í' | 'Î' | 'Ï' => 'i',
        'ñ' | 'Ñ' => 'n',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'Ò' | 'Ó' | 'Ô' | 'Õ' | 'Ö' | 'Ø' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'Ù' | 'Ú' | 'Û' | 'Ü' => 'u',
        'ý' | 'ÿ' | 'Ý' => 'y',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::parse_song_text;

    fn sample() -> NewSong {
        NewSong {
            title: "Là-bas".into(),
            artist: "Jean-Jacques Goldman".into(),
            album: "Entre gris clair et gris foncé".into(),
            cover: None,
            columns: 2,
            capo: 3,
        }
    }

    #[test]
    fn slugify_folds_and_collapses() {
        assert_eq!(slugify("Là-bas"), "la_bas");
        assert_eq!(slugify("  Hey   Jude "), "hey_jude");
        assert_eq!(slugify("L'Été indien"), "l_ete_indien");
        assert_eq!(slugify("???"), "untitled");
    }

    #[test]
    fn requires_title_and_artist() {
        let mut song = sample();
        song.title = " ".into();
        assert!(matches!(song.validate(), Err(NewSongError::MissingTitle)));
        let mut song = sample();
        song.artist.clear();
        assert!(matches!(song.validate(), Err(NewSongError::MissingArtist)));
    }

    #[test]
    fn spin_values_are_bounded() {
        let mut song = sample();
        song.capo = 21;
        assert!(matches!(
            song.validate(),
            Err(NewSongError::OutOfRange { field: "Capo", .. })
        ));
    }

    #[test]
    fn rendered_template_parses_back() {
        let song = sample();
        let text = song.render();
        assert!(text.contains("\\songcolumns{2}"));
        assert!(text.contains("\\capo{3}"));
        let parsed = parse_song_text(Path::new("/tmp/la_bas.sg"), &text);
        assert_eq!(parsed.title, "Là-bas");
        assert_eq!(parsed.artist, "Jean-Jacques Goldman");
        assert_eq!(parsed.album, "Entre gris clair et gris foncé");
    }

    #[test]
    fn separators_and_specials_survive_the_template() {
        let song = NewSong {
            title: "Teach Your Children #1".into(),
            artist: "Crosby, Stills & Nash".into(),
            album: "Déjà Vu [50%]".into(),
            ..sample()
        };
        let text = song.render();
        assert!(text.contains("\\beginsong{Teach Your Children \\#1}"));
        assert!(text.contains("[by={Crosby, Stills \\& Nash},album={Déjà Vu [50\\%]}]"));

        let parsed = parse_song_text(Path::new("/tmp/teach.sg"), &text);
        assert_eq!(parsed.title, "Teach Your Children #1");
        assert_eq!(parsed.artist, "Crosby, Stills & Nash");
        assert_eq!(parsed.album, "Déjà Vu [50%]");
    }

    #[test]
    fn braces_are_rejected() {
        let mut song = sample();
        song.artist = "The {Band}".into();
        assert!(matches!(
            song.validate(),
            Err(NewSongError::ReservedCharacter { field: "Artist", ch: '{' })
        ));
        let mut song = sample();
        song.title = "Live [1969]".into();
        assert!(matches!(
            song.validate(),
            Err(NewSongError::ReservedCharacter { field: "Title", ch: '[' })
        ));
    }

    #[test]
    fn zero_values_are_omitted() {
        let mut song = sample();
        song.columns = 0;
        song.capo = 0;
        let text = song.render();
        assert!(!text.contains("songcolumns"));
        assert!(!text.contains("\\capo"));
    }

    #[test]
    fn relative_path_uses_artist_directory() {
        assert_eq!(
            sample().relative_path(),
            PathBuf::from("songs/jean_jacques_goldman/la_bas.sg")
        );
    }
}
