//! Importing songs into an existing library.
//!
//! An import is a mapping from source files to target paths inside the
//! library. Targets that already exist are conflicts; the user either
//! overwrites them or preserves the library copy, and may inspect the
//! differences first. Copying is done by [`FileCopier`].

pub mod copier;
pub mod diff;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::library::{SONGS_DIR, SONG_EXTENSION};

pub use copier::{CopyEvent, CopyHandle, CopyReport, FileCopier};
pub use diff::{diff_files, diff_text, DiffLine, DiffTag};

/// Extensions picked up when importing a directory: songs and their covers.
const IMPORTED_EXTENSIONS: &[&str] = &[SONG_EXTENSION, "jpg"];

/// How conflicting targets are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMode {
    /// Replace the library copy with the imported file.
    Overwrite,
    /// Keep the library copy and skip the imported file.
    Preserve,
}

/// Source → target mappings split by whether the target already exists.
#[derive(Debug, Clone, Default)]
pub struct ImportPlan {
    conflicts: BTreeMap<PathBuf, PathBuf>,
    no_conflicts: BTreeMap<PathBuf, PathBuf>,
}

impl ImportPlan {
    /// Partition `files` (key: new song, value: library path).
    pub fn new(files: BTreeMap<PathBuf, PathBuf>) -> Self {
        let mut plan = Self::default();
        for (source, target) in files {
            if target.exists() {
                plan.conflicts.insert(source, target);
            } else {
                plan.no_conflicts.insert(source, target);
            }
        }
        info!(
            conflicts = plan.conflicts.len(),
            clean = plan.no_conflicts.len(),
            "import plan ready"
        );
        plan
    }

    /// Map every song and cover below `source_dir` to the same relative path
    /// under `<library_dir>/songs/`. A source that has its own `songs/`
    /// sub-directory is treated as a library and imported from there.
    pub fn from_directory(source_dir: &Path, library_dir: &Path) -> Result<Self> {
        let source_root = if source_dir.join(SONGS_DIR).is_dir() {
            source_dir.join(SONGS_DIR)
        } else {
            source_dir.to_path_buf()
        };
        if !source_root.is_dir() {
            anyhow::bail!("{} is not a directory", source_root.display());
        }
        let target_root = library_dir.join(SONGS_DIR);

        let mut files = BTreeMap::new();
        for entry in WalkDir::new(&source_root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| entry.ok())
        {
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            let wanted = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMPORTED_EXTENSIONS.contains(&ext))
                .unwrap_or(false);
            if !wanted {
                continue;
            }
            let relative = path
                .strip_prefix(&source_root)
                .context("walked outside the import source")?;
            files.insert(path.to_path_buf(), target_root.join(relative));
        }
        Ok(Self::new(files))
    }

    pub fn conflicts_found(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn conflicts(&self) -> &BTreeMap<PathBuf, PathBuf> {
        &self.conflicts
    }

    pub fn no_conflicts(&self) -> &BTreeMap<PathBuf, PathBuf> {
        &self.no_conflicts
    }

    pub fn is_empty(&self) -> bool {
        self.conflicts.is_empty() && self.no_conflicts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.conflicts.len() + self.no_conflicts.len()
    }

    /// Prepare the copy for `mode`. Nothing on disk changes until the copier
    /// runs; with `Overwrite` each conflicting target is replaced as its turn
    /// comes, so a cancelled copy keeps the library files it has not reached.
    pub fn resolve(&self, mode: ResolveMode) -> FileCopier {
        let mut files = self.no_conflicts.clone();
        if mode == ResolveMode::Overwrite {
            files.extend(
                self.conflicts
                    .iter()
                    .map(|(source, target)| (source.clone(), target.clone())),
            );
            return FileCopier::new(files).replacing(self.conflicts.values().cloned());
        }
        if self.conflicts_found() {
            warn!(kept = self.conflicts.len(), "preserving existing songs");
        }
        FileCopier::new(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path, content: &str) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, content).expect("write file");
    }

    #[test]
    fn partitions_on_existing_targets() {
        let dir = tempfile::tempdir().expect("tempdir");
        let existing = dir.path().join("lib/a.sg");
        touch(&existing, "old");

        let mut files = BTreeMap::new();
        files.insert(dir.path().join("new/a.sg"), existing.clone());
        files.insert(dir.path().join("new/b.sg"), dir.path().join("lib/b.sg"));
        let plan = ImportPlan::new(files);

        assert!(plan.conflicts_found());
        assert_eq!(plan.conflicts().len(), 1);
        assert_eq!(plan.no_conflicts().len(), 1);
        assert_eq!(plan.len(), 2);
    }

    #[test]
    fn from_directory_maps_relative_paths() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("incoming");
        touch(&source.join("brel/amsterdam.sg"), "\\beginsong{Amsterdam}");
        touch(&source.join("brel/amsterdam.jpg"), "jpeg");
        touch(&source.join("notes.txt"), "ignored");
        let library = dir.path().join("library");
        touch(&library.join("songs/brel/amsterdam.sg"), "\\beginsong{Amsterdam}");

        let plan = ImportPlan::from_directory(&source, &library).expect("plan");
        assert_eq!(plan.len(), 2);
        assert_eq!(
            plan.conflicts().get(&source.join("brel/amsterdam.sg")),
            Some(&library.join("songs/brel/amsterdam.sg"))
        );
        assert!(plan
            .no_conflicts()
            .contains_key(&source.join("brel/amsterdam.jpg")));
    }

    #[test]
    fn from_directory_rejects_missing_source() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(ImportPlan::from_directory(&dir.path().join("nope"), dir.path()).is_err());
    }

    #[test]
    fn preserve_copies_only_clean_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("incoming");
        let library = dir.path().join("library");
        touch(&source.join("a.sg"), "new a");
        touch(&source.join("b.sg"), "new b");
        touch(&library.join("songs/a.sg"), "old a");

        let plan = ImportPlan::from_directory(&source, &library).expect("plan");
        let report = plan
            .resolve(ResolveMode::Preserve)
            .copy(|_, _| {});
        assert_eq!(report.copied, 1);
        assert_eq!(
            fs::read_to_string(library.join("songs/a.sg")).expect("read"),
            "old a"
        );
        assert_eq!(
            fs::read_to_string(library.join("songs/b.sg")).expect("read"),
            "new b"
        );
    }

    #[test]
    fn overwrite_replaces_conflicts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("incoming");
        let library = dir.path().join("library");
        touch(&source.join("a.sg"), "new a");
        touch(&library.join("songs/a.sg"), "old a");

        let plan = ImportPlan::from_directory(&source, &library).expect("plan");
        let report = plan
            .resolve(ResolveMode::Overwrite)
            .copy(|_, _| {});
        assert_eq!(report.copied, 1);
        assert!(report.failures.is_empty());
        assert_eq!(
            fs::read_to_string(library.join("songs/a.sg")).expect("read"),
            "new a"
        );
    }

    #[test]
    fn overwrite_leaves_library_alone_until_copied() {
        let dir = tempfile::tempdir().expect("tempdir");
        let source = dir.path().join("incoming");
        let library = dir.path().join("library");
        touch(&source.join("a/same.sg"), "new");
        touch(&library.join("songs/a/same.sg"), "old");

        let plan = ImportPlan::from_directory(&source, &library).expect("plan");
        let copier = plan.resolve(ResolveMode::Overwrite);
        assert_eq!(
            fs::read_to_string(library.join("songs/a/same.sg")).expect("read"),
            "old"
        );

        copier.set_cancel_copy(true);
        let report = copier.copy(|_, _| {});
        assert!(report.cancelled);
        assert_eq!(report.copied, 0);
        assert_eq!(
            fs::read_to_string(library.join("songs/a/same.sg")).expect("read"),
            "old"
        );
    }
}
