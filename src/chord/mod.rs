//! Chord model for fretted instruments.
//!
//! A chord has a text representation borrowed from the LaTeX `songs`
//! package:
//!
//! ```text
//! \gtab{<name>}{<fret>:<strings>}
//! ```
//!
//! `\utab` marks a ukulele chord and a `*` right after the macro name marks
//! an *important* chord (an unusual fingering worth printing). Each character
//! of `strings` describes one string: `X` is muted, `0` is played open and a
//! digit is the row (relative to `fret`) to press.
//!
//! Parsing never fails: the editor needs to hold half-typed chords, so
//! validity is reported separately through [`Chord::validate`].

pub mod diagram;
pub mod extract;

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ChordError;

pub use diagram::{Diagram, DiagramCache};
pub use extract::{find_chords, replace_chord, ChordMatch};

static RE_CHORD_WITH_FRET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\[ug]tab\*?\{([^}]+)\}\{(\d):([^}]+)")
        .expect("chord-with-fret pattern should be valid regex")
});

static RE_CHORD_WITHOUT_FRET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\[ug]tab\*?\{([^}]+)\}\{([^}]+)")
        .expect("chord-without-fret pattern should be valid regex")
});

/// Supported instruments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Instrument {
    #[default]
    Guitar,
    Ukulele,
}

impl Instrument {
    pub fn string_count(self) -> usize {
        match self {
            Instrument::Guitar => 6,
            Instrument::Ukulele => 4,
        }
    }

    /// Macro name used in the song source.
    pub fn macro_name(self) -> &'static str {
        match self {
            Instrument::Guitar => "gtab",
            Instrument::Ukulele => "utab",
        }
    }

    pub fn other(self) -> Self {
        match self {
            Instrument::Guitar => Instrument::Ukulele,
            Instrument::Ukulele => Instrument::Guitar,
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instrument::Guitar => write!(f, "Guitar"),
            Instrument::Ukulele => write!(f, "Ukulele"),
        }
    }
}

/// How a single string is played.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringState {
    Muted,
    Open,
    Fretted(u8),
}

impl StringState {
    fn from_marker(marker: char) -> Self {
        match marker.to_digit(10) {
            Some(0) => StringState::Open,
            Some(value) => StringState::Fretted(value as u8),
            None => StringState::Muted,
        }
    }
}

/// RGB colour used to tint the chord label and border.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

const TANGO_SKY_BLUE_1: Rgb = Rgb(0x72, 0x9f, 0xcf);
const TANGO_SKY_BLUE_3: Rgb = Rgb(0x20, 0x4a, 0x87);
const TANGO_PLUM_1: Rgb = Rgb(0xad, 0x7f, 0xa8);
const TANGO_PLUM_3: Rgb = Rgb(0x5c, 0x35, 0x66);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chord {
    instrument: Instrument,
    name: String,
    fret: String,
    strings: String,
    important: bool,
    recognised: bool,
}

impl Default for Chord {
    fn default() -> Self {
        Self::from_gtab("\\gtab{}{0:}")
    }
}

impl Chord {
    /// Build a chord from its `\gtab{...}{...}` notation.
    pub fn from_gtab(text: &str) -> Self {
        let (instrument, recognised) = if text.contains("gtab") {
            (Instrument::Guitar, true)
        } else if text.contains("utab") {
            (Instrument::Ukulele, true)
        } else {
            (Instrument::Guitar, false)
        };

        let mut chord = Chord {
            instrument,
            name: String::new(),
            fret: String::new(),
            strings: String::new(),
            important: text.contains('*'),
            recognised,
        };

        if let Some(caps) = RE_CHORD_WITH_FRET.captures(text) {
            chord.name = caps[1].to_string();
            chord.fret = caps[2].to_string();
            chord.strings = caps[3].to_string();
        } else {
            let stripped = text.replace("~:", "");
            if let Some(caps) = RE_CHORD_WITHOUT_FRET.captures(&stripped) {
                chord.name = caps[1].to_string();
                chord.strings = caps[2].to_string();
            }
        }

        chord
    }

    /// Serialize back into the song notation.
    pub fn to_gtab(&self) -> String {
        let mut out = format!("\\{}", self.instrument.macro_name());
        if self.important {
            out.push('*');
        }
        out.push('{');
        out.push_str(&self.name);
        out.push_str("}{");
        out.push_str(&self.fret);
        if !self.fret.is_empty() {
            out.push(':');
        }
        out.push_str(&self.strings);
        out.push('}');
        out
    }

    pub fn validate(&self) -> Result<(), ChordError> {
        if !self.recognised {
            return Err(ChordError::UnknownInstrument);
        }
        if self.name.is_empty() {
            return Err(ChordError::EmptyName);
        }
        if !(self.fret.is_empty()
            || (self.fret.len() == 1 && self.fret.chars().all(|c| c.is_ascii_digit())))
        {
            return Err(ChordError::InvalidFret(self.fret.clone()));
        }
        if let Some(bad) = self
            .strings
            .chars()
            .find(|c| !(c.is_ascii_digit() || *c == 'X' || *c == 'x'))
        {
            return Err(ChordError::InvalidString(bad));
        }
        let expected = self.instrument.string_count();
        let found = self.strings.chars().count();
        if found != expected {
            return Err(ChordError::StringCount { expected, found });
        }
        Ok(())
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    pub fn instrument(&self) -> Instrument {
        self.instrument
    }

    pub fn set_instrument(&mut self, instrument: Instrument) {
        self.instrument = instrument;
        self.recognised = true;
    }

    /// Toggle between guitar and ukulele, keeping every other field.
    pub fn switch_instrument(&mut self) {
        self.set_instrument(self.instrument.other());
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Chord name as printed: `&` is the flat sign in the song notation.
    pub fn display_name(&self) -> String {
        self.name.replace('&', "\u{266D}")
    }

    pub fn fret(&self) -> &str {
        &self.fret
    }

    pub fn set_fret(&mut self, fret: impl Into<String>) {
        self.fret = fret.into();
    }

    pub fn strings(&self) -> &str {
        &self.strings
    }

    pub fn set_strings(&mut self, strings: impl Into<String>) {
        self.strings = strings.into();
    }

    pub fn is_important(&self) -> bool {
        self.important
    }

    pub fn set_important(&mut self, important: bool) {
        self.important = important;
    }

    pub fn string_states(&self) -> Vec<StringState> {
        self.strings.chars().map(StringState::from_marker).collect()
    }

    /// Highest row the diagram has to show (at least four).
    pub fn row_count(&self) -> u8 {
        self.string_states()
            .into_iter()
            .filter_map(|state| match state {
                StringState::Fretted(value) => Some(value),
                _ => None,
            })
            .fold(4, u8::max)
    }

    pub fn color(&self) -> Rgb {
        match (self.instrument, self.important) {
            (Instrument::Guitar, false) => TANGO_SKY_BLUE_1,
            (Instrument::Guitar, true) => TANGO_SKY_BLUE_3,
            (Instrument::Ukulele, false) => TANGO_PLUM_1,
            (Instrument::Ukulele, true) => TANGO_PLUM_3,
        }
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_gtab())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chord_with_fret() {
        let chord = Chord::from_gtab("\\gtab{E&m}{5:X02210}");
        assert_eq!(chord.instrument(), Instrument::Guitar);
        assert_eq!(chord.name(), "E&m");
        assert_eq!(chord.fret(), "5");
        assert_eq!(chord.strings(), "X02210");
        assert!(!chord.is_important());
        assert!(chord.is_valid());
    }

    #[test]
    fn parses_chord_without_fret() {
        let chord = Chord::from_gtab("\\gtab{C}{X32010}");
        assert_eq!(chord.name(), "C");
        assert_eq!(chord.fret(), "");
        assert_eq!(chord.strings(), "X32010");
        assert!(chord.is_valid());
    }

    #[test]
    fn tilde_colon_is_dropped() {
        let chord = Chord::from_gtab("\\gtab{D}{~:XX0232}");
        assert_eq!(chord.fret(), "");
        assert_eq!(chord.strings(), "XX0232");
    }

    #[test]
    fn important_ukulele_chord() {
        let chord = Chord::from_gtab("\\utab*{G7}{0212}");
        assert_eq!(chord.instrument(), Instrument::Ukulele);
        assert!(chord.is_important());
        assert!(chord.is_valid());
        assert_eq!(chord.color(), TANGO_PLUM_3);
    }

    #[test]
    fn serializes_back() {
        for source in ["\\gtab{E&m}{5:X02210}", "\\gtab{C}{X32010}", "\\utab*{G7}{0212}"] {
            assert_eq!(Chord::from_gtab(source).to_gtab(), source);
        }
    }

    #[test]
    fn default_chord_is_invalid() {
        let chord = Chord::default();
        assert_eq!(chord.validate(), Err(ChordError::EmptyName));
    }

    #[test]
    fn any_non_empty_name_is_accepted() {
        let mut chord = Chord::from_gtab("\\gtab{A}{X02220}");
        chord.set_name(" ");
        assert!(chord.is_valid());
        chord.set_name("");
        assert_eq!(chord.validate(), Err(ChordError::EmptyName));
    }

    #[test]
    fn string_count_must_match_instrument() {
        let chord = Chord::from_gtab("\\utab{C}{X32010}");
        assert_eq!(
            chord.validate(),
            Err(ChordError::StringCount {
                expected: 4,
                found: 6
            })
        );
    }

    #[test]
    fn unknown_macro_is_invalid() {
        let chord = Chord::from_gtab("\\tab{C}{X32010}");
        assert_eq!(chord.validate(), Err(ChordError::UnknownInstrument));
    }

    #[test]
    fn rejects_bad_string_marker() {
        let chord = Chord::from_gtab("\\gtab{C}{X3201?}");
        assert_eq!(chord.validate(), Err(ChordError::InvalidString('?')));
    }

    #[test]
    fn switching_instrument_keeps_fields() {
        let mut chord = Chord::from_gtab("\\gtab{Am}{X02210}");
        chord.switch_instrument();
        assert_eq!(chord.instrument(), Instrument::Ukulele);
        assert_eq!(chord.to_gtab(), "\\utab{Am}{X02210}");
        assert!(!chord.is_valid());
    }

    #[test]
    fn display_name_uses_flat_sign() {
        let chord = Chord::from_gtab("\\gtab{B&}{1:X02220}");
        assert_eq!(chord.display_name(), "B\u{266D}");
    }

    #[test]
    fn row_count_has_floor_of_four() {
        assert_eq!(Chord::from_gtab("\\gtab{C}{X32010}").row_count(), 4);
        assert_eq!(Chord::from_gtab("\\gtab{X}{X7X6XX}").row_count(), 7);
    }

    #[test]
    fn string_states_map_markers() {
        let chord = Chord::from_gtab("\\gtab{C}{X32010}");
        assert_eq!(
            chord.string_states(),
            vec![
                StringState::Muted,
                StringState::Fretted(3),
                StringState::Fretted(2),
                StringState::Open,
                StringState::Fretted(1),
                StringState::Open,
            ]
        );
    }
}
