//! Domain error types. Application plumbing uses `anyhow` with context, while
//! the pieces that callers may want to branch on get a typed enum here.

use std::path::PathBuf;

use thiserror::Error;

/// Reasons a chord fails validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChordError {
    /// Neither `\gtab` nor `\utab` appeared in the source text.
    #[error("unsupported chord type (expected \\gtab or \\utab)")]
    UnknownInstrument,
    #[error("chord name is empty")]
    EmptyName,
    /// The fret must be empty or a single digit.
    #[error("invalid fret '{0}'")]
    InvalidFret(String),
    #[error("expected {expected} strings, found {found}")]
    StringCount { expected: usize, found: usize },
    /// A string marker that is neither a digit nor `X`.
    #[error("invalid string marker '{0}'")]
    InvalidString(char),
}

/// Validation and creation failures for the new-song form.
#[derive(Debug, Error)]
pub enum NewSongError {
    #[error("Song title is required.")]
    MissingTitle,
    #[error("Artist is required.")]
    MissingArtist,
    #[error("{field} must be between 0 and {max}.")]
    OutOfRange { field: &'static str, max: u8 },
    /// Characters that cannot be written into the song template.
    #[error("{field} cannot contain '{ch}'.")]
    ReservedCharacter { field: &'static str, ch: char },
    #[error("Cover not found: {0}")]
    CoverNotFound(PathBuf),
    #[error("A song already exists at {0}")]
    AlreadyExists(PathBuf),
}
