//! Cover thumbnail cache.
//!
//! The terminal cannot show the images themselves, so a thumbnail here is the
//! resolved cover file plus what the UI displays about it. Lookups happen on
//! every redraw. Keys are `<basename>-small` / `<basename>-full`, with
//! `cover-missing-*` fallbacks.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const MISSING_SMALL: &str = "cover-missing-small";
pub const MISSING_FULL: &str = "cover-missing-full";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThumbnailSize {
    /// Table decoration next to the album name.
    Small,
    /// Detail panel.
    Full,
}

impl ThumbnailSize {
    fn suffix(self) -> &'static str {
        match self {
            ThumbnailSize::Small => "small",
            ThumbnailSize::Full => "full",
        }
    }

    fn missing_key(self) -> &'static str {
        match self {
            ThumbnailSize::Small => MISSING_SMALL,
            ThumbnailSize::Full => MISSING_FULL,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pub key: String,
    /// `None` for the missing-cover placeholder.
    pub file: Option<PathBuf>,
    pub bytes: u64,
}

impl Thumbnail {
    pub fn is_missing(&self) -> bool {
        self.file.is_none()
    }

    /// Short marker shown in table cells.
    pub fn badge(&self) -> &'static str {
        if self.is_missing() {
            "□"
        } else {
            "▣"
        }
    }
}

#[derive(Debug, Default)]
pub struct CoverCache {
    entries: HashMap<String, Thumbnail>,
}

impl CoverCache {
    pub fn new() -> Self {
        let mut cache = Self::default();
        for size in [ThumbnailSize::Small, ThumbnailSize::Full] {
            cache.entries.insert(
                size.missing_key().to_string(),
                Thumbnail {
                    key: size.missing_key().to_string(),
                    file: None,
                    bytes: 0,
                },
            );
        }
        cache
    }

    /// Resolve the thumbnail for `cover`, inserting it on first use.
    pub fn thumbnail(&mut self, cover: &Path, size: ThumbnailSize) -> Thumbnail {
        let missing = self.placeholder(size);
        let Some(base) = cover.file_stem().and_then(|s| s.to_str()) else {
            return missing;
        };
        let key = format!("{base}-{}", size.suffix());
        if let Some(found) = self.entries.get(&key) {
            return found.clone();
        }

        match fs::metadata(cover) {
            Ok(meta) if meta.is_file() => {
                let thumbnail = Thumbnail {
                    key: key.clone(),
                    file: Some(cover.to_path_buf()),
                    bytes: meta.len(),
                };
                self.entries.insert(key, thumbnail.clone());
                thumbnail
            }
            _ => missing,
        }
    }

    pub fn placeholder(&self, size: ThumbnailSize) -> Thumbnail {
        self.entries
            .get(size.missing_key())
            .cloned()
            .unwrap_or(Thumbnail {
                key: size.missing_key().to_string(),
                file: None,
                bytes: 0,
            })
    }

    /// Drop every cached cover, keeping the placeholders.
    pub fn clear(&mut self) {
        self.entries
            .retain(|key, _| key == MISSING_SMALL || key == MISSING_FULL);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
