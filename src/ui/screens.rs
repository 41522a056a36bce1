use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::chord::{find_chords, replace_chord, Chord, ChordMatch};
use crate::import::{CopyHandle, DiffLine, ImportPlan};
use crate::library::Library;

/// Move `selected` by `offset` inside `0..len`.
fn clamp_selection(selected: usize, offset: isize, len: usize) -> usize {
    if len == 0 {
        return 0;
    }
    let moved = selected as isize + offset;
    moved.clamp(0, len as isize - 1) as usize
}

/// Library table state: the rows left by the search filter and the
/// highlighted one.
#[derive(Default)]
pub(crate) struct LibraryScreen {
    pub(crate) rows: Vec<usize>,
    pub(crate) filter: Option<String>,
    pub(crate) selected: usize,
}

impl LibraryScreen {
    pub(crate) fn new(library: &Library) -> Self {
        let mut screen = Self::default();
        screen.refresh(library);
        screen
    }

    /// Recompute visible rows after the library or the filter changed.
    pub(crate) fn refresh(&mut self, library: &Library) {
        self.rows = library.filter(self.filter.as_deref().unwrap_or(""));
        self.ensure_in_bounds();
    }

    pub(crate) fn set_filter(&mut self, library: &Library, filter: Option<String>) {
        self.filter = filter;
        self.refresh(library);
    }

    /// Library row index of the highlighted song.
    pub(crate) fn current_row(&self) -> Option<usize> {
        self.rows.get(self.selected).copied()
    }

    /// Highlight the song stored at `path`, if it is visible.
    pub(crate) fn select_path(&mut self, library: &Library, path: &Path) {
        if let Some(position) = self
            .rows
            .iter()
            .position(|row| library.song(*row).is_some_and(|song| song.path == path))
        {
            self.selected = position;
        }
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = clamp_selection(self.selected, offset, self.rows.len());
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.rows.len().saturating_sub(1);
    }

    fn ensure_in_bounds(&mut self) {
        self.selected = clamp_selection(self.selected, 0, self.rows.len());
    }
}

/// Chords used in one song, with the song text they were read from.
pub(crate) struct ChordScreen {
    pub(crate) song_path: PathBuf,
    pub(crate) title: String,
    pub(crate) text: String,
    pub(crate) chords: Vec<ChordMatch>,
    pub(crate) selected: usize,
}

impl ChordScreen {
    pub(crate) fn load(song_path: &Path, title: impl Into<String>) -> Result<Self> {
        let text = fs::read_to_string(song_path)
            .with_context(|| format!("unable to open {}", song_path.display()))?;
        let chords = find_chords(&text);
        Ok(Self {
            song_path: song_path.to_path_buf(),
            title: title.into(),
            text,
            chords,
            selected: 0,
        })
    }

    pub(crate) fn current(&self) -> Option<&ChordMatch> {
        self.chords.get(self.selected)
    }

    /// Rewrite the chord at `index` in the song file and re-read the chords.
    pub(crate) fn apply_edit(&mut self, index: usize, chord: &Chord) -> Result<()> {
        let Some(found) = self.chords.get(index) else {
            return Ok(());
        };
        let updated = replace_chord(&self.text, found, chord);
        fs::write(&self.song_path, &updated)
            .with_context(|| format!("failed to write {}", self.song_path.display()))?;
        self.text = updated;
        self.chords = find_chords(&self.text);
        self.selected = clamp_selection(index, 0, self.chords.len());
        Ok(())
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = clamp_selection(self.selected, offset, self.chords.len());
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.chords.len().saturating_sub(1);
    }
}

/// Import screen listing the files that already exist in the library.
pub(crate) struct ConflictScreen {
    pub(crate) source_dir: PathBuf,
    pub(crate) plan: ImportPlan,
    /// `(imported file, library file)` pairs in display order.
    pub(crate) conflicts: Vec<(PathBuf, PathBuf)>,
    pub(crate) selected: usize,
}

impl ConflictScreen {
    pub(crate) fn new(source_dir: PathBuf, plan: ImportPlan) -> Self {
        let conflicts = plan
            .conflicts()
            .iter()
            .map(|(source, target)| (source.clone(), target.clone()))
            .collect();
        Self {
            source_dir,
            plan,
            conflicts,
            selected: 0,
        }
    }

    pub(crate) fn current(&self) -> Option<&(PathBuf, PathBuf)> {
        self.conflicts.get(self.selected)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        self.selected = clamp_selection(self.selected, offset, self.conflicts.len());
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.conflicts.len().saturating_sub(1);
    }
}

/// Scrollable line diff shown over the conflict screen.
pub(crate) struct DiffView {
    pub(crate) title: String,
    pub(crate) lines: Vec<DiffLine>,
    pub(crate) scroll: u16,
}

impl DiffView {
    pub(crate) fn new(title: impl Into<String>, lines: Vec<DiffLine>) -> Self {
        Self {
            title: title.into(),
            lines,
            scroll: 0,
        }
    }

    pub(crate) fn scroll_by(&mut self, delta: i32) {
        let max = self.lines.len().saturating_sub(1) as i32;
        self.scroll = (i32::from(self.scroll) + delta).clamp(0, max.max(0)) as u16;
    }
}

/// A copy running on a worker thread plus its last reported progress.
pub(crate) struct CopyProgress {
    pub(crate) handle: CopyHandle,
    pub(crate) done: usize,
    pub(crate) total: usize,
}

impl CopyProgress {
    pub(crate) fn new(handle: CopyHandle, total: usize) -> Self {
        Self {
            handle,
            done: 0,
            total,
        }
    }

    pub(crate) fn ratio(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            (self.done as f64 / self.total as f64).clamp(0.0, 1.0)
        }
    }
}
