use std::fs;
use std::mem;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use crossterm::event::KeyCode;
use open::that as open_path;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::prelude::*;
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, Borders, Cell as TableCell, Clear, Gauge, List, ListItem, ListState, Paragraph, Row,
    Table, TableState, Wrap,
};
use ratatui::Frame;
use rusqlite::Connection;
use tracing::{error, info, warn};

use crate::chord::diagram::text_lines;
use crate::chord::{Chord, DiagramCache};
use crate::db::{
    fetch_library_songs, get_setting, replace_library_songs, set_setting, IMPORT_DIR_KEY,
};
use crate::import::{diff_files, CopyEvent, CopyReport, FileCopier, ImportPlan, ResolveMode};
use crate::library::{Column, Library, ThumbnailSize};
use crate::newsong::slugify;

use super::forms::{ChordField, ChordForm, NewSongForm, PathPrompt};
use super::helpers::{centered_rect, diff_line, key_hints, rgb_color, surface_error};
use super::label::{elide, ElideMode, ElidedLabel};
use super::screens::{ChordScreen, ConflictScreen, CopyProgress, DiffView, LibraryScreen};

/// Footer space reserved for status messages and instructions.
const FOOTER_HEIGHT: u16 = 3;
/// Width of the song detail panel beside the library table.
const DETAIL_WIDTH: u16 = 40;
/// Rows skipped by PageUp/PageDown.
const PAGE: isize = 10;
/// Room left for the path inside the detail panel ("Path: " plus borders).
const DETAIL_PATH_WIDTH: usize = DETAIL_WIDTH as usize - 2 - 6;

/// High-level navigation states.
enum Screen {
    Library,
    Chords(ChordScreen),
    Import(ConflictScreen),
}

/// Fine-grained modes layered over the current screen.
enum Mode {
    Normal,
    Searching(SearchState),
    CreatingSong(NewSongForm),
    ImportPrompt(PathPrompt),
    EditingChord(ChordForm),
    ShowingDiff(DiffView),
    Copying,
}

/// State for an active inline search.
struct SearchState {
    query: String,
}

/// Holds the footer message text plus its severity.
struct StatusMessage {
    text: String,
    kind: StatusKind,
}

/// Severity levels shown in the footer.
enum StatusKind {
    Info,
    Error,
}

impl StatusKind {
    fn style(&self) -> Style {
        match self {
            StatusKind::Info => Style::default().fg(Color::Green),
            StatusKind::Error => Style::default().fg(Color::Red),
        }
    }
}

/// Central application state shared across the TUI.
pub struct App {
    conn: Connection,
    library: Library,
    library_screen: LibraryScreen,
    screen: Screen,
    mode: Mode,
    status: Option<StatusMessage>,
    diagrams: DiagramCache,
    copy: Option<CopyProgress>,
    detail_path: ElidedLabel,
}

impl App {
    pub fn new(conn: Connection, library: Library) -> Self {
        let library_screen = LibraryScreen::new(&library);
        let mut app = Self {
            conn,
            library,
            library_screen,
            screen: Screen::Library,
            mode: Mode::Normal,
            status: None,
            diagrams: DiagramCache::new(),
            copy: None,
            detail_path: ElidedLabel::new("")
                .mode(ElideMode::Middle)
                .width(DETAIL_PATH_WIDTH),
        };
        app.sync_detail();
        app
    }

    /// Start from the stored snapshot of `library_dir`, scanning the disk only
    /// when there is none yet.
    pub fn open(mut conn: Connection, library_dir: &Path) -> Result<Self> {
        let mut library = Library::new(library_dir);
        let stored = fetch_library_songs(&conn, library_dir)?;
        let message = if stored.is_empty() {
            let report = library.update(|_, _| {})?;
            replace_library_songs(&mut conn, library_dir, library.songs())?;
            report.to_string()
        } else {
            let count = stored.len();
            library.replace_songs(stored);
            format!("Loaded {count} songs. Press 'r' to rescan.")
        };
        info!(library = %library_dir.display(), "library opened");

        let mut app = Self::new(conn, library);
        app.set_status(message, StatusKind::Info);
        Ok(app)
    }

    pub fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        let mut exit = false;
        let mut mode = mem::replace(&mut self.mode, Mode::Normal);

        mode = match mode {
            Mode::Normal => self.handle_normal_key(code, &mut exit)?,
            Mode::Searching(state) => self.handle_search(code, state)?,
            Mode::CreatingSong(form) => self.handle_create_song(code, form)?,
            Mode::ImportPrompt(prompt) => self.handle_import_prompt(code, prompt)?,
            Mode::EditingChord(form) => self.handle_edit_chord(code, form)?,
            Mode::ShowingDiff(view) => self.handle_diff(code, view),
            Mode::Copying => self.handle_copying(code),
        };

        self.mode = mode;
        self.sync_detail();
        Ok(exit)
    }

    fn handle_normal_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match self.screen {
            Screen::Library => self.handle_library_key(code, exit),
            Screen::Chords(_) => self.handle_chords_key(code, exit),
            Screen::Import(_) => self.handle_conflicts_key(code, exit),
        }
    }

    fn handle_library_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                *exit = true;
            }
            KeyCode::Up => self.library_screen.move_selection(-1),
            KeyCode::Down => self.library_screen.move_selection(1),
            KeyCode::PageUp => self.library_screen.move_selection(-PAGE),
            KeyCode::PageDown => self.library_screen.move_selection(PAGE),
            KeyCode::Home => self.library_screen.select_first(),
            KeyCode::End => self.library_screen.select_last(),
            KeyCode::Char('f') | KeyCode::Char('/') => {
                let query = self.library_screen.filter.clone().unwrap_or_default();
                return Ok(Mode::Searching(SearchState { query }));
            }
            KeyCode::Char('n') => {
                self.clear_status();
                return Ok(Mode::CreatingSong(NewSongForm::default()));
            }
            KeyCode::Char('i') => {
                self.clear_status();
                let last = get_setting(&self.conn, IMPORT_DIR_KEY)?.unwrap_or_default();
                return Ok(Mode::ImportPrompt(PathPrompt::with_input(last)));
            }
            KeyCode::Char('r') => self.rescan()?,
            KeyCode::Char('c') => self.open_chords(),
            KeyCode::Enter => match self.current_song_path() {
                Some(path) => self.open_file(&path),
                None => self.set_status("No song selected.", StatusKind::Error),
            },
            KeyCode::Char('o') => {
                let cover = self
                    .library_screen
                    .current_row()
                    .and_then(|row| self.library.cover_thumbnail(row, ThumbnailSize::Full))
                    .and_then(|thumbnail| thumbnail.file);
                match cover {
                    Some(file) => self.open_file(&file),
                    None => self.set_status("This song has no cover.", StatusKind::Error),
                }
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_chords_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        let Screen::Chords(chords) = &mut self.screen else {
            return Ok(Mode::Normal);
        };

        match code {
            KeyCode::Char('q') => {
                *exit = true;
            }
            KeyCode::Esc => {
                self.screen = Screen::Library;
                self.clear_status();
            }
            KeyCode::Up => chords.move_selection(-1),
            KeyCode::Down => chords.move_selection(1),
            KeyCode::PageUp => chords.move_selection(-PAGE),
            KeyCode::PageDown => chords.move_selection(PAGE),
            KeyCode::Home => chords.select_first(),
            KeyCode::End => chords.select_last(),
            KeyCode::Enter | KeyCode::Char('e') => {
                if let Some(found) = chords.current() {
                    let form = ChordForm::from_chord(chords.selected, &found.chord);
                    return Ok(Mode::EditingChord(form));
                }
                self.set_status("This song has no chords.", StatusKind::Error);
            }
            KeyCode::Char('u') => {
                if let Some(found) = chords.current() {
                    let mut chord = found.chord.clone();
                    chord.switch_instrument();
                    let index = chords.selected;
                    self.save_chord(index, &chord)?;
                }
            }
            KeyCode::Char('*') => {
                if let Some(found) = chords.current() {
                    let mut chord = found.chord.clone();
                    chord.set_important(!chord.is_important());
                    let index = chords.selected;
                    self.save_chord(index, &chord)?;
                }
            }
            KeyCode::Char('s') => {
                if let Some(found) = chords.current() {
                    let chord = found.chord.clone();
                    let song_path = chords.song_path.clone();
                    self.export_diagram(&song_path, &chord);
                }
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_conflicts_key(&mut self, code: KeyCode, exit: &mut bool) -> Result<Mode> {
        let Screen::Import(conflicts) = &mut self.screen else {
            return Ok(Mode::Normal);
        };

        match code {
            KeyCode::Char('q') => {
                *exit = true;
            }
            KeyCode::Esc => {
                self.screen = Screen::Library;
                self.set_status("Import cancelled.", StatusKind::Info);
            }
            KeyCode::Up => conflicts.move_selection(-1),
            KeyCode::Down => conflicts.move_selection(1),
            KeyCode::PageUp => conflicts.move_selection(-PAGE),
            KeyCode::PageDown => conflicts.move_selection(PAGE),
            KeyCode::Home => conflicts.select_first(),
            KeyCode::End => conflicts.select_last(),
            KeyCode::Char('o') | KeyCode::Char('p') => {
                let mode = if code == KeyCode::Char('o') {
                    ResolveMode::Overwrite
                } else {
                    ResolveMode::Preserve
                };
                let copier = conflicts.plan.resolve(mode);
                info!(?mode, files = copier.len(), "import resolved");
                return Ok(self.start_copy(copier));
            }
            KeyCode::Char('d') => {
                if let Some((source, target)) = conflicts.current().cloned() {
                    match diff_files(&source, &target) {
                        Ok(lines) => {
                            let title = target
                                .file_name()
                                .map(|name| name.to_string_lossy().into_owned())
                                .unwrap_or_default();
                            return Ok(Mode::ShowingDiff(DiffView::new(title, lines)));
                        }
                        Err(err) => self.set_status(surface_error(&err), StatusKind::Error),
                    }
                }
            }
            KeyCode::Enter => {
                if let Some((_, target)) = conflicts.current().cloned() {
                    self.open_file(&target);
                }
            }
            KeyCode::Char('v') => {
                if let Some((source, _)) = conflicts.current().cloned() {
                    self.open_file(&source);
                }
            }
            _ => {}
        }
        Ok(Mode::Normal)
    }

    fn handle_search(&mut self, code: KeyCode, mut state: SearchState) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.library_screen.set_filter(&self.library, None);
                return Ok(Mode::Normal);
            }
            KeyCode::Enter => return Ok(Mode::Normal),
            KeyCode::Up => self.library_screen.move_selection(-1),
            KeyCode::Down => self.library_screen.move_selection(1),
            KeyCode::PageUp => self.library_screen.move_selection(-PAGE),
            KeyCode::PageDown => self.library_screen.move_selection(PAGE),
            KeyCode::Backspace => {
                state.query.pop();
            }
            KeyCode::Char(ch) if !ch.is_control() => state.query.push(ch),
            _ => {}
        }

        let filter = if state.query.trim().is_empty() {
            None
        } else {
            Some(state.query.clone())
        };
        if filter != self.library_screen.filter {
            self.library_screen.set_filter(&self.library, filter);
        }
        Ok(Mode::Searching(state))
    }

    fn handle_create_song(&mut self, code: KeyCode, mut form: NewSongForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => {
                self.set_status("Song creation cancelled.", StatusKind::Info);
                return Ok(Mode::Normal);
            }
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.previous_field(),
            KeyCode::Up => {
                if !form.step(1) {
                    form.previous_field();
                }
            }
            KeyCode::Down => {
                if !form.step(-1) {
                    form.next_field();
                }
            }
            KeyCode::Backspace => form.backspace(),
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            KeyCode::Enter => {
                let song = form.to_new_song();
                if let Err(err) = song.validate() {
                    form.error = Some(err.to_string());
                    return Ok(Mode::CreatingSong(form));
                }
                match song.create_in(self.library.directory()) {
                    Ok(path) => {
                        self.library.add_song(&path)?;
                        self.persist_library()?;
                        self.library_screen.refresh(&self.library);
                        self.library_screen.select_path(&self.library, &path);
                        self.set_status(format!("Created {}.", path.display()), StatusKind::Info);
                        return Ok(Mode::Normal);
                    }
                    Err(err) => {
                        warn!(error = %err, "song creation failed");
                        form.error = Some(surface_error(&err));
                    }
                }
            }
            _ => {}
        }
        Ok(Mode::CreatingSong(form))
    }

    fn handle_import_prompt(&mut self, code: KeyCode, mut prompt: PathPrompt) -> Result<Mode> {
        match code {
            KeyCode::Esc => return Ok(Mode::Normal),
            KeyCode::Backspace => prompt.backspace(),
            KeyCode::Char(ch) => {
                prompt.push_char(ch);
                prompt.error = None;
            }
            KeyCode::Enter => {
                let Some(source) = prompt.path() else {
                    prompt.error = Some("Enter the songbook to import from.".to_string());
                    return Ok(Mode::ImportPrompt(prompt));
                };
                if !source.is_dir() {
                    prompt.error = Some(format!("{} is not a directory.", source.display()));
                    return Ok(Mode::ImportPrompt(prompt));
                }
                set_setting(&self.conn, IMPORT_DIR_KEY, &source.display().to_string())?;
                return self.begin_import(source);
            }
            _ => {}
        }
        Ok(Mode::ImportPrompt(prompt))
    }

    fn handle_edit_chord(&mut self, code: KeyCode, mut form: ChordForm) -> Result<Mode> {
        match code {
            KeyCode::Esc => return Ok(Mode::Normal),
            KeyCode::Tab | KeyCode::Down => form.toggle_field(),
            KeyCode::BackTab | KeyCode::Up => {
                form.toggle_field();
                form.toggle_field();
            }
            KeyCode::Backspace => {
                form.backspace();
                form.error = None;
            }
            KeyCode::Char(ch) => {
                if form.push_char(ch) {
                    form.error = None;
                }
            }
            KeyCode::Enter => {
                let chord = form.to_chord();
                if let Err(err) = chord.validate() {
                    form.error = Some(err.to_string());
                    return Ok(Mode::EditingChord(form));
                }
                self.save_chord(form.index, &chord)?;
                return Ok(Mode::Normal);
            }
            _ => {}
        }
        Ok(Mode::EditingChord(form))
    }

    fn handle_diff(&mut self, code: KeyCode, mut view: DiffView) -> Mode {
        match code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => return Mode::Normal,
            KeyCode::Up => view.scroll_by(-1),
            KeyCode::Down => view.scroll_by(1),
            KeyCode::PageUp => view.scroll_by(-(PAGE as i32)),
            KeyCode::PageDown => view.scroll_by(PAGE as i32),
            KeyCode::Home => view.scroll = 0,
            _ => {}
        }
        Mode::ShowingDiff(view)
    }

    fn handle_copying(&mut self, code: KeyCode) -> Mode {
        if matches!(code, KeyCode::Esc | KeyCode::Char('c')) {
            if let Some(copy) = &self.copy {
                copy.handle.cancel();
                self.set_status("Cancelling copy...", StatusKind::Info);
            }
        }
        Mode::Copying
    }

    /// Ctrl+U in the chord editor: switch between guitar and ukulele.
    pub(crate) fn handle_ctrl_u(&mut self) {
        if let Mode::EditingChord(form) = &mut self.mode {
            form.switch_instrument();
            form.error = None;
        }
    }

    /// Ctrl+T in the chord editor: toggle the important flag.
    pub(crate) fn handle_ctrl_t(&mut self) {
        if let Mode::EditingChord(form) = &mut self.mode {
            form.toggle_important();
        }
    }

    /// Drain progress from a running copy. Called on every loop iteration.
    pub(crate) fn tick(&mut self) -> Result<()> {
        let Some(copy) = &mut self.copy else {
            return Ok(());
        };

        let mut finished = None;
        for event in copy.handle.poll() {
            match event {
                CopyEvent::Progress { done, total } => {
                    copy.done = done;
                    copy.total = total;
                }
                CopyEvent::Failed(message) => error!("{message}"),
                CopyEvent::Finished(report) => finished = Some(report),
            }
        }

        if let Some(report) = finished {
            if let Some(copy) = self.copy.take() {
                copy.handle.wait();
            }
            self.finish_import(report)?;
        }
        Ok(())
    }

    pub(crate) fn is_copying(&self) -> bool {
        self.copy.is_some()
    }

    /// Ask a running copy to stop, e.g. when the user quits.
    pub(crate) fn cancel_copy(&mut self) {
        if let Some(copy) = self.copy.take() {
            copy.handle.cancel();
            let report = copy.handle.wait();
            info!(summary = %report.summary(), "copy stopped on exit");
        }
    }

    fn begin_import(&mut self, source: PathBuf) -> Result<Mode> {
        let plan = ImportPlan::from_directory(&source, self.library.directory())?;
        if plan.is_empty() {
            self.set_status(
                format!("No songs found in {}.", source.display()),
                StatusKind::Error,
            );
            return Ok(Mode::Normal);
        }
        if plan.conflicts_found() {
            let count = plan.conflicts().len();
            self.screen = Screen::Import(ConflictScreen::new(source, plan));
            self.set_status(
                format!("{count} songs already exist in the library."),
                StatusKind::Info,
            );
            return Ok(Mode::Normal);
        }
        let copier = plan.resolve(ResolveMode::Preserve);
        Ok(self.start_copy(copier))
    }

    fn start_copy(&mut self, copier: FileCopier) -> Mode {
        let total = copier.len();
        self.copy = Some(CopyProgress::new(copier.spawn(), total));
        self.set_status(format!("Copying {total} files..."), StatusKind::Info);
        Mode::Copying
    }

    fn finish_import(&mut self, report: CopyReport) -> Result<()> {
        for failure in &report.failures {
            warn!("{failure}");
        }
        self.library.update(|_, _| {})?;
        self.persist_library()?;
        self.library_screen.refresh(&self.library);
        self.screen = Screen::Library;
        if matches!(self.mode, Mode::Copying) {
            self.mode = Mode::Normal;
        }
        let kind = if report.failures.is_empty() {
            StatusKind::Info
        } else {
            StatusKind::Error
        };
        self.set_status(report.summary(), kind);
        self.sync_detail();
        Ok(())
    }

    fn rescan(&mut self) -> Result<()> {
        let report = self.library.update(|_, _| {})?;
        self.persist_library()?;
        self.library_screen.refresh(&self.library);
        let kind = if report.skipped.is_empty() {
            StatusKind::Info
        } else {
            StatusKind::Error
        };
        self.set_status(report.to_string(), kind);
        Ok(())
    }

    fn open_chords(&mut self) {
        let Some(song) = self
            .library_screen
            .current_row()
            .and_then(|row| self.library.song(row))
        else {
            self.set_status("No song selected.", StatusKind::Error);
            return;
        };
        match ChordScreen::load(&song.path, song.display_title()) {
            Ok(chords) => {
                let count = chords.chords.len();
                self.screen = Screen::Chords(chords);
                self.set_status(format!("{count} chords."), StatusKind::Info);
            }
            Err(err) => self.set_status(surface_error(&err), StatusKind::Error),
        }
    }

    /// Write `chord` over the chord at `index` of the open song.
    fn save_chord(&mut self, index: usize, chord: &Chord) -> Result<()> {
        let Screen::Chords(chords) = &mut self.screen else {
            return Ok(());
        };
        if let Err(err) = chords.apply_edit(index, chord) {
            self.set_status(surface_error(&err), StatusKind::Error);
            return Ok(());
        }
        let path = chords.song_path.clone();
        if let Err(err) = self.library.update_song(&path) {
            warn!(path = %path.display(), error = %err, "song unreadable after chord edit");
        }
        self.persist_library()?;
        self.library_screen.refresh(&self.library);
        self.set_status(format!("Saved {chord}."), StatusKind::Info);
        Ok(())
    }

    fn export_diagram(&mut self, song_path: &Path, chord: &Chord) {
        let Some(diagram) = self.diagrams.get_or_render(chord, true) else {
            self.set_status("Cannot draw an invalid chord.", StatusKind::Error);
            return;
        };
        let mut stem = slugify(chord.name());
        if stem.is_empty() {
            stem = "chord".to_string();
        }
        let target = song_path.with_file_name(format!("{stem}.svg"));
        let result = fs::write(&target, diagram.to_svg())
            .with_context(|| format!("failed to write {}", target.display()));
        match result {
            Ok(()) => self.set_status(format!("Wrote {}.", target.display()), StatusKind::Info),
            Err(err) => self.set_status(surface_error(&err), StatusKind::Error),
        }
    }

    fn open_file(&mut self, path: &Path) {
        if let Err(err) = open_path(path) {
            self.set_status(format!("Failed to open file: {err}"), StatusKind::Error);
        } else {
            self.set_status(format!("Opened {}.", path.display()), StatusKind::Info);
        }
    }

    fn persist_library(&mut self) -> Result<()> {
        replace_library_songs(
            &mut self.conn,
            self.library.directory(),
            self.library.songs(),
        )
    }

    fn current_song_path(&self) -> Option<PathBuf> {
        self.library_screen
            .current_row()
            .and_then(|row| self.library.song(row))
            .map(|song| song.path.clone())
    }

    /// Keep the detail panel's path label on the highlighted song.
    fn sync_detail(&mut self) {
        let path = self
            .current_song_path()
            .map(|path| path.display().to_string())
            .unwrap_or_default();
        self.detail_path.set_text(path);
    }

    fn set_status<S: Into<String>>(&mut self, text: S, kind: StatusKind) {
        self.status = Some(StatusMessage {
            text: text.into(),
            kind,
        });
    }

    fn clear_status(&mut self) {
        self.status = None;
    }

    pub(crate) fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let footer_height = FOOTER_HEIGHT.min(area.height);

        let (content_area, footer_area) = if area.height > footer_height {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(footer_height)])
                .split(area);
            (chunks[0], chunks[1])
        } else {
            (area, area)
        };

        match &self.screen {
            Screen::Library => self.draw_library(frame, content_area),
            Screen::Chords(chords) => self.draw_chords(frame, content_area, chords),
            Screen::Import(conflicts) => self.draw_conflicts(frame, content_area, conflicts),
        }

        if area.height >= footer_height {
            self.draw_footer(frame, footer_area);
        }

        match &self.mode {
            Mode::Searching(state) => self.draw_search_bar(frame, area, state),
            Mode::CreatingSong(form) => self.draw_new_song_form(frame, area, form),
            Mode::ImportPrompt(prompt) => self.draw_import_prompt(frame, area, prompt),
            Mode::EditingChord(form) => self.draw_chord_form(frame, area, form),
            Mode::ShowingDiff(view) => self.draw_diff(frame, area, view),
            Mode::Copying => self.draw_copy_progress(frame, area),
            Mode::Normal => {}
        }
    }

    fn draw_library(&self, frame: &mut Frame, area: Rect) {
        let (table_area, detail_area) = if area.width > DETAIL_WIDTH * 2 {
            let chunks = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Min(0), Constraint::Length(DETAIL_WIDTH)])
                .split(area);
            (chunks[0], Some(chunks[1]))
        } else {
            (area, None)
        };

        let title = match &self.library_screen.filter {
            Some(query) => format!(
                "Library • {} of {} songs matching \"{query}\"",
                self.library_screen.rows.len(),
                self.library.row_count()
            ),
            None => format!("Library • {} songs", self.library.row_count()),
        };
        let block = Block::default().borders(Borders::ALL).title(title);

        if self.library_screen.rows.is_empty() {
            let text = if self.library.row_count() == 0 {
                format!(
                    "No songs found in {}. Press 'r' to rescan or 'n' to create one.",
                    self.library.songs_dir().display()
                )
            } else {
                "No songs match the current search.".to_string()
            };
            let message = Paragraph::new(text)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true })
                .block(block);
            frame.render_widget(message, table_area);
        } else {
            let header = Row::new(Column::ALL.iter().map(|column| {
                TableCell::from(column.header())
                    .style(Style::default().add_modifier(Modifier::BOLD))
            }));
            let rows = self.library_screen.rows.iter().map(|row| {
                Row::new(Column::ALL.iter().map(|column| {
                    let cell = self.library.cell(*row, *column).unwrap_or_default();
                    let text = match (cell.decoration, cell.text.is_empty()) {
                        (Some(decoration), true) => decoration,
                        (Some(decoration), false) => format!("{decoration} {}", cell.text),
                        (None, _) => cell.text,
                    };
                    TableCell::from(text)
                }))
            });
            let widths = [
                Constraint::Percentage(28),
                Constraint::Percentage(20),
                Constraint::Length(3),
                Constraint::Percentage(22),
                Constraint::Percentage(20),
                Constraint::Length(8),
            ];
            let table = Table::new(rows, widths)
                .header(header)
                .block(block)
                .row_highlight_style(
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                )
                .highlight_symbol("> ");
            let mut state = TableState::default().with_selected(Some(self.library_screen.selected));
            frame.render_stateful_widget(table, table_area, &mut state);
        }

        if let Some(detail_area) = detail_area {
            self.draw_song_detail(frame, detail_area);
        }
    }

    fn draw_song_detail(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Details");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let Some(row) = self.library_screen.current_row() else {
            return;
        };
        let Some(song) = self.library.song(row) else {
            return;
        };

        let label_style = Style::default().fg(Color::DarkGray);
        let field = |label: &str, value: String| {
            Line::from(vec![
                Span::styled(format!("{label}: "), label_style),
                Span::raw(value),
            ])
        };

        let cover = match self.library.cover_thumbnail(row, ThumbnailSize::Full) {
            Some(thumbnail) => match &thumbnail.file {
                Some(file) => format!(
                    "{} {}",
                    thumbnail.badge(),
                    file.file_name()
                        .map(|name| name.to_string_lossy().into_owned())
                        .unwrap_or_default()
                ),
                None => format!("{} missing", thumbnail.badge()),
            },
            None => String::new(),
        };

        let lines = vec![
            Line::from(Span::styled(
                song.display_title(),
                Style::default().add_modifier(Modifier::BOLD),
            )),
            Line::from(""),
            field("Artist", song.artist.clone()),
            field("Album", song.album.clone()),
            field("Language", song.language.clone()),
            field(
                "Lilypond",
                (if song.is_lilypond { "yes" } else { "no" }).to_string(),
            ),
            field("Cover", cover),
        ];
        let line_count = lines.len() as u16;
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);

        if inner.height > line_count {
            let path_row = Rect {
                x: inner.x,
                y: inner.y + line_count,
                width: inner.width,
                height: 1,
            };
            let prefix = "Path: ";
            frame.render_widget(Span::styled(prefix, label_style), path_row);
            let value_area = Rect {
                x: path_row.x + prefix.len() as u16,
                width: path_row.width.saturating_sub(prefix.len() as u16),
                ..path_row
            };
            frame.render_widget(&self.detail_path, value_area);
        }
    }

    fn draw_chords(&self, frame: &mut Frame, area: Rect, chords: &ChordScreen) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(32), Constraint::Min(0)])
            .split(area);

        let block = Block::default()
            .borders(Borders::ALL)
            .title(format!("Chords • {}", chords.title));

        if chords.chords.is_empty() {
            let message = Paragraph::new("No \\gtab or \\utab chords in this song.")
                .alignment(Alignment::Center)
                .block(block);
            frame.render_widget(message, area);
            return;
        }

        let items: Vec<ListItem> = chords
            .chords
            .iter()
            .map(|found| {
                let chord = &found.chord;
                let style = if chord.is_valid() {
                    Style::default().fg(rgb_color(chord.color()))
                } else {
                    Style::default().fg(Color::Red)
                };
                ListItem::new(Line::from(vec![
                    Span::styled(format!("{:<6}", chord.display_name()), style),
                    Span::raw(format!(" {}", chord.instrument())),
                ]))
            })
            .collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(Some(chords.selected));
        frame.render_stateful_widget(list, chunks[0], &mut state);

        if let Some(found) = chords.current() {
            self.draw_chord_preview(frame, chunks[1], &found.chord);
        }
    }

    fn draw_chord_preview(&self, frame: &mut Frame, area: Rect, chord: &Chord) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(chord.to_gtab());
        let content = match text_lines(chord) {
            Some(lines) => {
                let style = Style::default().fg(rgb_color(chord.color()));
                lines
                    .into_iter()
                    .map(|line| Line::from(Span::styled(line, style)))
                    .collect::<Vec<_>>()
            }
            None => {
                let reason = chord
                    .validate()
                    .err()
                    .map(|err| err.to_string())
                    .unwrap_or_default();
                vec![Line::from(Span::styled(
                    format!("Cannot draw this chord: {reason}"),
                    Style::default().fg(Color::Red),
                ))]
            }
        };
        frame.render_widget(Paragraph::new(content).block(block), area);
    }

    fn draw_conflicts(&self, frame: &mut Frame, area: Rect, conflicts: &ConflictScreen) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(1)])
            .split(area);

        let header = Paragraph::new(vec![
            Line::from(vec![
                Span::styled(
                    format!("{} conflicts", conflicts.conflicts.len()),
                    Style::default()
                        .fg(Color::Yellow)
                        .add_modifier(Modifier::BOLD),
                ),
                Span::raw(format!(
                    "  •  {} new files",
                    conflicts.plan.no_conflicts().len()
                )),
            ]),
            Line::from(format!("Importing from {}", conflicts.source_dir.display())),
        ])
        .block(Block::default().borders(Borders::ALL).title("Import"));
        frame.render_widget(header, chunks[0]);

        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[1]);

        let library_dir = self.library.directory();
        let name_width = body[0].width.saturating_sub(4) as usize;
        let items: Vec<ListItem> = conflicts
            .conflicts
            .iter()
            .map(|(_, target)| {
                let shown = target.strip_prefix(library_dir).unwrap_or(target);
                ListItem::new(elide(
                    &shown.display().to_string(),
                    ElideMode::Left,
                    name_width,
                ))
            })
            .collect();
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Already in library"))
            .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(Some(conflicts.selected));
        frame.render_stateful_widget(list, body[0], &mut state);

        let detail_block = Block::default().borders(Borders::ALL).title("Conflict");
        let detail = match conflicts.current() {
            Some((source, target)) => {
                let width = body[1].width.saturating_sub(2) as usize;
                let describe = |path: &Path| {
                    let size = fs::metadata(path)
                        .map(|meta| format!("{} bytes", meta.len()))
                        .unwrap_or_else(|_| "unreadable".to_string());
                    vec![
                        Line::from(elide(&path.display().to_string(), ElideMode::Middle, width)),
                        Line::from(Span::styled(size, Style::default().fg(Color::DarkGray))),
                    ]
                };
                let mut lines = vec![Line::from(Span::styled(
                    "Imported file",
                    Style::default().add_modifier(Modifier::BOLD),
                ))];
                lines.extend(describe(source.as_path()));
                lines.push(Line::from(""));
                lines.push(Line::from(Span::styled(
                    "Library file",
                    Style::default().add_modifier(Modifier::BOLD),
                )));
                lines.extend(describe(target.as_path()));
                lines
            }
            None => vec![Line::from("No conflicts.")],
        };
        frame.render_widget(Paragraph::new(detail).block(detail_block), body[1]);
    }

    fn draw_footer(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::TOP);
        frame.render_widget(block.clone(), area);
        let inner = block.inner(area);

        let status_line = if let Some(status) = &self.status {
            Line::from(vec![Span::styled(status.text.clone(), status.kind.style())])
        } else {
            Line::from("")
        };

        let instructions = self.footer_instructions();

        let paragraph = Paragraph::new(vec![status_line, instructions]).wrap(Wrap { trim: true });
        frame.render_widget(paragraph, inner);
    }

    fn footer_instructions(&self) -> Line<'static> {
        match (&self.screen, &self.mode) {
            (_, Mode::Searching(_)) => key_hints(&[
                ("↑↓", "Select"),
                ("Enter", "Keep Filter"),
                ("Esc", "Clear"),
            ]),
            (_, Mode::CreatingSong(_)) => key_hints(&[
                ("Tab", "Next Field"),
                ("↑↓", "Adjust"),
                ("Enter", "Create"),
                ("Esc", "Cancel"),
            ]),
            (_, Mode::ImportPrompt(_)) => key_hints(&[("Enter", "Import"), ("Esc", "Cancel")]),
            (_, Mode::EditingChord(_)) => key_hints(&[
                ("Tab", "Next Field"),
                ("Ctrl+U", "Instrument"),
                ("Ctrl+T", "Important"),
                ("Enter", "Save"),
                ("Esc", "Cancel"),
            ]),
            (_, Mode::ShowingDiff(_)) => key_hints(&[("↑↓", "Scroll"), ("Esc", "Close")]),
            (_, Mode::Copying) => key_hints(&[("Esc", "Cancel Copy")]),
            (Screen::Chords(_), _) => key_hints(&[
                ("↑↓", "Select"),
                ("Enter", "Edit"),
                ("u", "Guitar/Ukulele"),
                ("*", "Important"),
                ("s", "Save SVG"),
                ("Esc", "Back"),
                ("q", "Quit"),
            ]),
            (Screen::Import(_), _) => key_hints(&[
                ("↑↓", "Select"),
                ("o", "Overwrite All"),
                ("p", "Preserve All"),
                ("d", "Differences"),
                ("Enter", "Open Library File"),
                ("v", "Open Imported File"),
                ("Esc", "Cancel"),
            ]),
            (Screen::Library, _) => key_hints(&[
                ("↑↓", "Select"),
                ("Enter", "Open"),
                ("f", "Search"),
                ("n", "New Song"),
                ("c", "Chords"),
                ("i", "Import"),
                ("o", "Cover"),
                ("r", "Rescan"),
                ("q", "Quit"),
            ]),
        }
    }

    fn draw_search_bar(&self, frame: &mut Frame, area: Rect, state: &SearchState) {
        let height = 3u16.min(area.height);
        let popup_area = Rect {
            x: area.x,
            y: area.y,
            width: area.width,
            height,
        };
        frame.render_widget(Clear, popup_area);

        let block = Block::default().borders(Borders::ALL).title("Search");
        let paragraph = Paragraph::new(Span::raw(format!("Search: {}", state.query)))
            .block(block.clone())
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, popup_area);

        let inner = block.inner(popup_area);
        let cursor_x = inner.x + "Search: ".len() as u16 + state.query.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }

    fn draw_new_song_form(&self, frame: &mut Frame, area: Rect, form: &NewSongForm) {
        let popup_area = centered_rect(70, 60, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("New Song").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines: Vec<Line> = NewSongForm::fields()
            .into_iter()
            .map(|field| form.build_line(field))
            .collect();
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("→ {}", form.to_new_song().relative_path().display()),
            Style::default().fg(Color::DarkGray),
        )));

        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Enter to create • Tab to switch • ↑↓ to adjust numbers • Esc to cancel",
                Style::default().fg(Color::Gray),
            )));
        }

        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);

        if let Some(offset) = form.cursor_offset() {
            frame.set_cursor_position((
                inner.x + offset as u16,
                inner.y + form.active_row() as u16,
            ));
        }
    }

    fn draw_import_prompt(&self, frame: &mut Frame, area: Rect, prompt: &PathPrompt) {
        let popup_area = centered_rect(70, 30, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title("Import Songbook")
            .borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let mut lines = vec![
            Line::from(format!("Folder: {}", prompt.input)),
            Line::from(""),
        ];
        if let Some(error) = &prompt.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        } else {
            lines.push(Line::from(Span::styled(
                "Songs (*.sg) and covers (*.jpg) are copied into the library.",
                Style::default().fg(Color::Gray),
            )));
        }
        frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: true }), inner);

        let cursor_x = inner.x + "Folder: ".len() as u16 + prompt.input.chars().count() as u16;
        frame.set_cursor_position((cursor_x, inner.y));
    }

    fn draw_chord_form(&self, frame: &mut Frame, area: Rect, form: &ChordForm) {
        let popup_area = centered_rect(70, 70, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default().title("Edit Chord").borders(Borders::ALL);
        frame.render_widget(block.clone(), popup_area);
        let inner = block.inner(popup_area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(6), Constraint::Min(0)])
            .split(inner);

        let mut lines = vec![
            form.build_line(ChordField::Name),
            form.build_line(ChordField::Fret),
            form.build_line(ChordField::Strings),
            Line::from(format!(
                "Instrument: {}{}",
                form.instrument,
                if form.important { "  (important)" } else { "" }
            )),
        ];
        if let Some(error) = &form.error {
            lines.push(Line::from(Span::styled(
                error.clone(),
                Style::default().fg(Color::Red),
            )));
        }
        frame.render_widget(Paragraph::new(lines), chunks[0]);

        self.draw_chord_preview(frame, chunks[1], &form.to_chord());

        let (column, row) = form.cursor();
        frame.set_cursor_position((chunks[0].x + column as u16, chunks[0].y + row as u16));
    }

    fn draw_diff(&self, frame: &mut Frame, area: Rect, view: &DiffView) {
        let popup_area = centered_rect(90, 80, area);
        frame.render_widget(Clear, popup_area);

        let block = Block::default()
            .title(format!("Differences • {} (- library, + imported)", view.title))
            .borders(Borders::ALL);
        let lines: Vec<Line> = view.lines.iter().map(diff_line).collect();
        let paragraph = Paragraph::new(lines)
            .block(block)
            .scroll((view.scroll, 0));
        frame.render_widget(paragraph, popup_area);
    }

    fn draw_copy_progress(&self, frame: &mut Frame, area: Rect) {
        let Some(copy) = &self.copy else {
            return;
        };
        let popup_area = centered_rect(60, 20, area);
        frame.render_widget(Clear, popup_area);

        let title = if copy.handle.is_cancelled() {
            "Cancelling..."
        } else {
            "Copying songs"
        };
        let gauge = Gauge::default()
            .block(Block::default().title(title).borders(Borders::ALL))
            .gauge_style(Style::default().fg(Color::Cyan))
            .ratio(copy.ratio())
            .label(format!("{}/{}", copy.done, copy.total));
        frame.render_widget(gauge, popup_area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn write_song(library: &Path, relative: &str, title: &str) {
        let path = library.join("songs").join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        fs::write(
            &path,
            format!("\\beginsong{{{title}}}[by=Band]\n\\gtab{{A}}{{X02220}}\n\\endsong\n"),
        )
        .expect("write song");
    }

    fn app_for(library: &Path) -> App {
        let conn = Connection::open_in_memory().expect("in-memory db");
        init_schema(&conn).expect("schema");
        App::open(conn, library).expect("open app")
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            app.handle_key(KeyCode::Char(ch)).expect("key");
        }
    }

    #[test]
    fn opening_scans_and_stores_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_song(dir.path(), "band/one.sg", "One");
        let app = app_for(dir.path());
        assert_eq!(app.library.row_count(), 1);
        let stored = fetch_library_songs(&app.conn, dir.path()).expect("snapshot");
        assert_eq!(stored.len(), 1);
    }

    #[test]
    fn search_filters_and_escape_clears() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_song(dir.path(), "band/one.sg", "One");
        write_song(dir.path(), "band/two.sg", "Two");
        let mut app = app_for(dir.path());

        app.handle_key(KeyCode::Char('f')).expect("search");
        type_text(&mut app, "tw");
        assert_eq!(app.library_screen.rows.len(), 1);
        app.handle_key(KeyCode::Esc).expect("clear");
        assert_eq!(app.library_screen.rows.len(), 2);
        assert!(matches!(app.mode, Mode::Normal));
    }

    #[test]
    fn new_song_form_creates_and_selects_song() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = app_for(dir.path());

        app.handle_key(KeyCode::Char('n')).expect("open form");
        app.handle_key(KeyCode::Enter).expect("submit empty");
        match &app.mode {
            Mode::CreatingSong(form) => assert_eq!(form.error.as_deref(), Some("Song title is required.")),
            _ => panic!("form should stay open"),
        }

        type_text(&mut app, "Hey Jude");
        app.handle_key(KeyCode::Tab).expect("tab");
        type_text(&mut app, "The Beatles");
        app.handle_key(KeyCode::Enter).expect("create");

        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.library.row_count(), 1);
        assert!(app.current_song_path().is_some());
        assert!(!app.detail_path.text().is_empty());
    }

    #[test]
    fn chord_edit_is_written_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_song(dir.path(), "band/one.sg", "One");
        let mut app = app_for(dir.path());

        app.handle_key(KeyCode::Char('c')).expect("chords");
        app.handle_key(KeyCode::Enter).expect("edit");
        app.handle_key(KeyCode::Backspace).expect("erase name");
        type_text(&mut app, "Am");
        app.handle_key(KeyCode::Enter).expect("save");

        let text = fs::read_to_string(dir.path().join("songs/band/one.sg")).expect("read");
        assert!(text.contains("\\gtab{Am}{X02220}"));
    }

    #[test]
    fn import_without_conflicts_copies_in_background() {
        let library = tempfile::tempdir().expect("library");
        let source = tempfile::tempdir().expect("source");
        write_song(source.path(), "band/new.sg", "New");
        let mut app = app_for(library.path());

        app.handle_key(KeyCode::Char('i')).expect("prompt");
        type_text(&mut app, &source.path().display().to_string());
        app.handle_key(KeyCode::Enter).expect("import");
        assert!(app.is_copying());

        while app.is_copying() {
            app.tick().expect("tick");
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(matches!(app.mode, Mode::Normal));
        assert_eq!(app.library.row_count(), 1);
    }

    #[test]
    fn import_with_conflicts_opens_conflict_screen() {
        let library = tempfile::tempdir().expect("library");
        let source = tempfile::tempdir().expect("source");
        write_song(library.path(), "band/same.sg", "Old");
        write_song(source.path(), "band/same.sg", "New");
        let mut app = app_for(library.path());

        app.handle_key(KeyCode::Char('i')).expect("prompt");
        type_text(&mut app, &source.path().display().to_string());
        app.handle_key(KeyCode::Enter).expect("import");
        assert!(matches!(app.screen, Screen::Import(_)));

        app.handle_key(KeyCode::Char('d')).expect("diff");
        assert!(matches!(app.mode, Mode::ShowingDiff(_)));
        app.handle_key(KeyCode::Esc).expect("close diff");

        app.handle_key(KeyCode::Char('p')).expect("preserve");
        while app.is_copying() {
            app.tick().expect("tick");
            std::thread::sleep(std::time::Duration::from_millis(5));
        }
        assert!(matches!(app.screen, Screen::Library));
        let kept = fs::read_to_string(library.path().join("songs/band/same.sg")).expect("read");
        assert!(kept.contains("{Old}"));
    }
}
