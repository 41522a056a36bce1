//! Metadata extraction from `.sg` song files.
//!
//! Song files are LaTeX-like sources for the `songs` package. We do not parse
//! them; a handful of regular expressions pick the interesting fields out of
//! the whole file, and the first match wins.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;

use super::latex::latex_to_utf8;
use crate::models::Song;

static RE_TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"beginsong\{([^\[}]+)").expect("title pattern should be valid regex")
});

/// Option values may be wrapped in braces to carry `,`, `[`, `]` or `|`.
static RE_ARTIST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"by=(?:\{([^{}]*)\}|([^\[,|\]]+))")
        .expect("artist pattern should be valid regex")
});

static RE_ALBUM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r",album=(?:\{([^{}]*)\}|([^\[\]]+))")
        .expect("album pattern should be valid regex")
});

static RE_LILYPOND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\lilypond").expect("lilypond pattern should be valid regex"));

static RE_LANGUAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"selectlanguage\{([^\[}]+)").expect("language pattern should be valid regex")
});

static RE_COVER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r",cov=([^\[,\]\n]+)").expect("cover pattern should be valid regex")
});

fn capture(re: &Regex, text: &str) -> String {
    re.captures(text)
        .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Extract song metadata from already loaded `content`.
pub fn parse_song_text(path: &Path, content: &str) -> Song {
    let cover_path = path
        .parent()
        .map(absolute)
        .unwrap_or_default();

    Song {
        path: path.to_path_buf(),
        title: latex_to_utf8(&capture(&RE_TITLE, content)),
        artist: latex_to_utf8(&capture(&RE_ARTIST, content)),
        album: latex_to_utf8(&capture(&RE_ALBUM, content)),
        language: capture(&RE_LANGUAGE, content),
        is_lilypond: RE_LILYPOND.is_match(content),
        cover_name: capture(&RE_COVER_NAME, content),
        cover_path,
    }
}

/// Read and parse the song at `path`.
pub fn parse_song(path: &Path) -> Result<Song> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to open {}", path.display()))?;
    Ok(parse_song_text(path, &content))
}

fn absolute(dir: &Path) -> PathBuf {
    if dir.as_os_str().is_empty() {
        return std::env::current_dir().unwrap_or_default();
    }
    fs::canonicalize(dir).unwrap_or_else(|_| dir.to_path_buf())
}
