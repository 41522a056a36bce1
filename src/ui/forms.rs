use std::path::PathBuf;

use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};

use crate::chord::{Chord, Instrument};
use crate::newsong::{NewSong, MAX_SPIN_VALUE};

/// Style shared by every form line.
fn field_style(is_active: bool, is_empty: bool) -> Style {
    if is_active {
        Style::default().fg(Color::Yellow)
    } else if is_empty {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    }
}

/// Fields of the new-song dialog, in focus order.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub(crate) enum NewSongField {
    #[default]
    Title,
    Artist,
    Album,
    Cover,
    Columns,
    Capo,
}

impl NewSongField {
    const ORDER: [NewSongField; 6] = [
        NewSongField::Title,
        NewSongField::Artist,
        NewSongField::Album,
        NewSongField::Cover,
        NewSongField::Columns,
        NewSongField::Capo,
    ];

    pub(crate) fn label(self) -> &'static str {
        match self {
            NewSongField::Title => "Title",
            NewSongField::Artist => "Artist",
            NewSongField::Album => "Album",
            NewSongField::Cover => "Cover",
            NewSongField::Columns => "Columns",
            NewSongField::Capo => "Capo",
        }
    }

    fn index(self) -> usize {
        Self::ORDER
            .iter()
            .position(|field| *field == self)
            .unwrap_or(0)
    }

    fn is_spin(self) -> bool {
        matches!(self, NewSongField::Columns | NewSongField::Capo)
    }
}

/// State of the "new song" dialog. Text fields take typed input; the column
/// and capo fields are spin boxes driven with the arrow keys.
#[derive(Default, Clone, Debug)]
pub(crate) struct NewSongForm {
    pub(crate) title: String,
    pub(crate) artist: String,
    pub(crate) album: String,
    pub(crate) cover: String,
    pub(crate) columns: u8,
    pub(crate) capo: u8,
    pub(crate) active: NewSongField,
    pub(crate) error: Option<String>,
}

impl NewSongForm {
    pub(crate) fn next_field(&mut self) {
        let index = (self.active.index() + 1) % NewSongField::ORDER.len();
        self.active = NewSongField::ORDER[index];
    }

    pub(crate) fn previous_field(&mut self) {
        let len = NewSongField::ORDER.len();
        let index = (self.active.index() + len - 1) % len;
        self.active = NewSongField::ORDER[index];
    }

    fn text_mut(&mut self) -> Option<&mut String> {
        match self.active {
            NewSongField::Title => Some(&mut self.title),
            NewSongField::Artist => Some(&mut self.artist),
            NewSongField::Album => Some(&mut self.album),
            NewSongField::Cover => Some(&mut self.cover),
            NewSongField::Columns | NewSongField::Capo => None,
        }
    }

    fn spin_mut(&mut self) -> Option<&mut u8> {
        match self.active {
            NewSongField::Columns => Some(&mut self.columns),
            NewSongField::Capo => Some(&mut self.capo),
            _ => None,
        }
    }

    /// Type into a text field, or set a spin box digit by digit.
    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        if ch.is_control() {
            return false;
        }
        if let Some(value) = self.spin_mut() {
            let Some(digit) = ch.to_digit(10) else {
                return false;
            };
            let candidate = u32::from(*value) * 10 + digit;
            *value = if candidate > u32::from(MAX_SPIN_VALUE) {
                digit as u8
            } else {
                candidate as u8
            };
            return true;
        }
        match self.text_mut() {
            Some(text) => {
                text.push(ch);
                true
            }
            None => false,
        }
    }

    pub(crate) fn backspace(&mut self) {
        if let Some(value) = self.spin_mut() {
            *value /= 10;
        } else if let Some(text) = self.text_mut() {
            text.pop();
        }
    }

    /// Arrow keys step spin boxes; returns false on text fields.
    pub(crate) fn step(&mut self, delta: i8) -> bool {
        match self.spin_mut() {
            Some(value) => {
                let next = i16::from(*value) + i16::from(delta);
                *value = next.clamp(0, i16::from(MAX_SPIN_VALUE)) as u8;
                true
            }
            None => false,
        }
    }

    pub(crate) fn to_new_song(&self) -> NewSong {
        let cover = self.cover.trim();
        NewSong {
            title: self.title.trim().to_string(),
            artist: self.artist.trim().to_string(),
            album: self.album.trim().to_string(),
            cover: (!cover.is_empty()).then(|| PathBuf::from(cover)),
            columns: self.columns,
            capo: self.capo,
        }
    }

    pub(crate) fn value(&self, field: NewSongField) -> String {
        match field {
            NewSongField::Title => self.title.clone(),
            NewSongField::Artist => self.artist.clone(),
            NewSongField::Album => self.album.clone(),
            NewSongField::Cover => self.cover.clone(),
            NewSongField::Columns => self.columns.to_string(),
            NewSongField::Capo => self.capo.to_string(),
        }
    }

    pub(crate) fn build_line(&self, field: NewSongField) -> Line<'static> {
        let value = self.value(field);
        let is_active = self.active == field;
        let display = match field {
            NewSongField::Title | NewSongField::Artist if value.is_empty() => {
                "<required>".to_string()
            }
            NewSongField::Album | NewSongField::Cover if value.is_empty() => {
                "<optional>".to_string()
            }
            NewSongField::Columns if self.columns == 0 => "default".to_string(),
            NewSongField::Capo if self.capo == 0 => "none".to_string(),
            _ if field.is_spin() => format!("◂ {value} ▸"),
            _ => value.clone(),
        };

        Line::from(vec![
            Span::raw(format!("{}: ", field.label())),
            Span::styled(display, field_style(is_active, value.is_empty())),
        ])
    }

    /// Cursor column within the active line, for text fields only.
    pub(crate) fn cursor_offset(&self) -> Option<usize> {
        if self.active.is_spin() {
            return None;
        }
        let value = self.value(self.active);
        Some(self.active.label().len() + 2 + value.chars().count())
    }

    pub(crate) fn active_row(&self) -> usize {
        self.active.index()
    }

    pub(crate) fn fields() -> [NewSongField; 6] {
        NewSongField::ORDER
    }
}

/// Fields of the chord editor.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default)]
pub(crate) enum ChordField {
    #[default]
    Name,
    Fret,
    Strings,
}

/// Edits one chord macro of the song shown on the chord screen.
#[derive(Clone, Debug)]
pub(crate) struct ChordForm {
    /// Position of the edited chord in the screen's chord list.
    pub(crate) index: usize,
    pub(crate) name: String,
    pub(crate) fret: String,
    pub(crate) strings: String,
    pub(crate) instrument: Instrument,
    pub(crate) important: bool,
    pub(crate) active: ChordField,
    pub(crate) error: Option<String>,
}

impl ChordForm {
    pub(crate) fn from_chord(index: usize, chord: &Chord) -> Self {
        Self {
            index,
            name: chord.name().to_string(),
            fret: chord.fret().to_string(),
            strings: chord.strings().to_string(),
            instrument: chord.instrument(),
            important: chord.is_important(),
            active: ChordField::Name,
            error: None,
        }
    }

    pub(crate) fn toggle_field(&mut self) {
        self.active = match self.active {
            ChordField::Name => ChordField::Fret,
            ChordField::Fret => ChordField::Strings,
            ChordField::Strings => ChordField::Name,
        };
    }

    pub(crate) fn push_char(&mut self, ch: char) -> bool {
        match self.active {
            ChordField::Name if !ch.is_control() && ch != '}' && ch != '{' => {
                self.name.push(ch);
                true
            }
            ChordField::Fret if ch.is_ascii_digit() && self.fret.is_empty() => {
                self.fret.push(ch);
                true
            }
            ChordField::Strings if ch.is_ascii_digit() || ch.eq_ignore_ascii_case(&'x') => {
                self.strings.push(ch.to_ascii_uppercase());
                true
            }
            _ => false,
        }
    }

    pub(crate) fn backspace(&mut self) {
        match self.active {
            ChordField::Name => self.name.pop(),
            ChordField::Fret => self.fret.pop(),
            ChordField::Strings => self.strings.pop(),
        };
    }

    pub(crate) fn switch_instrument(&mut self) {
        self.instrument = self.instrument.other();
    }

    pub(crate) fn toggle_important(&mut self) {
        self.important = !self.important;
    }

    /// The chord as currently typed, valid or not.
    pub(crate) fn to_chord(&self) -> Chord {
        let mut chord = Chord::default();
        chord.set_instrument(self.instrument);
        chord.set_name(self.name.trim());
        chord.set_fret(self.fret.trim());
        chord.set_strings(self.strings.trim());
        chord.set_important(self.important);
        chord
    }

    pub(crate) fn build_line(&self, field: ChordField) -> Line<'static> {
        let (label, value) = match field {
            ChordField::Name => ("Name", &self.name),
            ChordField::Fret => ("Fret", &self.fret),
            ChordField::Strings => ("Strings", &self.strings),
        };
        let display = if value.is_empty() && field == ChordField::Fret {
            "<none>".to_string()
        } else if value.is_empty() {
            "<required>".to_string()
        } else {
            value.clone()
        };
        Line::from(vec![
            Span::raw(format!("{label}: ")),
            Span::styled(display, field_style(self.active == field, value.is_empty())),
        ])
    }

    pub(crate) fn cursor(&self) -> (usize, usize) {
        match self.active {
            ChordField::Name => ("Name: ".len() + self.name.chars().count(), 0),
            ChordField::Fret => ("Fret: ".len() + self.fret.chars().count(), 1),
            ChordField::Strings => ("Strings: ".len() + self.strings.chars().count(), 2),
        }
    }
}

/// One-line path input, used to pick the songbook to import from.
#[derive(Default, Clone, Debug)]
pub(crate) struct PathPrompt {
    pub(crate) input: String,
    pub(crate) error: Option<String>,
}

impl PathPrompt {
    pub(crate) fn with_input(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            error: None,
        }
    }

    pub(crate) fn push_char(&mut self, ch: char) {
        if !ch.is_control() {
            self.input.push(ch);
        }
    }

    pub(crate) fn backspace(&mut self) {
        self.input.pop();
    }

    pub(crate) fn path(&self) -> Option<PathBuf> {
        let trimmed = self.input.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_order_wraps_both_ways() {
        let mut form = NewSongForm::default();
        form.previous_field();
        assert_eq!(form.active, NewSongField::Capo);
        form.next_field();
        assert_eq!(form.active, NewSongField::Title);
    }

    #[test]
    fn spin_boxes_clamp_and_take_digits() {
        let mut form = NewSongForm {
            active: NewSongField::Columns,
            ..NewSongForm::default()
        };
        assert!(form.step(-1));
        assert_eq!(form.columns, 0);
        for _ in 0..30 {
            form.step(1);
        }
        assert_eq!(form.columns, MAX_SPIN_VALUE);

        form.columns = 0;
        assert!(form.push_char('2'));
        assert_eq!(form.columns, 2);
        assert!(form.push_char('5'));
        assert_eq!(form.columns, 5);
        assert!(!form.push_char('a'));
        form.backspace();
        assert_eq!(form.columns, 0);
    }

    #[test]
    fn builds_trimmed_song() {
        let mut form = NewSongForm::default();
        for ch in " Hey Jude ".chars() {
            form.push_char(ch);
        }
        form.next_field();
        for ch in "The Beatles".chars() {
            form.push_char(ch);
        }
        form.active = NewSongField::Capo;
        form.step(1);

        let song = form.to_new_song();
        assert_eq!(song.title, "Hey Jude");
        assert_eq!(song.artist, "The Beatles");
        assert_eq!(song.cover, None);
        assert_eq!(song.capo, 1);
        assert!(song.validate().is_ok());
    }

    #[test]
    fn chord_form_filters_input() {
        let chord = Chord::from_gtab("\\gtab{A}{X0222}");
        let mut form = ChordForm::from_chord(0, &chord);
        form.active = ChordField::Strings;
        assert!(!form.push_char('q'));
        form.backspace();
        assert!(form.push_char('x'));
        assert_eq!(form.strings, "X022X");

        form.active = ChordField::Fret;
        assert!(form.push_char('3'));
        assert!(!form.push_char('4'));
        assert_eq!(form.to_chord().to_gtab(), "\\gtab{A}{3:X022X}");
    }

    #[test]
    fn chord_form_switches_instrument() {
        let mut form = ChordForm::from_chord(0, &Chord::from_gtab("\\gtab{C}{X32010}"));
        form.switch_instrument();
        assert_eq!(form.to_chord().instrument(), Instrument::Ukulele);
        assert!(!form.to_chord().is_valid());
    }

    #[test]
    fn blank_prompt_has_no_path() {
        let mut prompt = PathPrompt::with_input("  ");
        assert_eq!(prompt.path(), None);
        prompt.push_char('/');
        assert_eq!(prompt.path(), Some(PathBuf::from("/")));
    }
}
