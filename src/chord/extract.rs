//! Locate chord macros inside song sources and write edits back.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

use super::Chord;

static RE_CHORD_MACRO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\\[ug]tab\*?\{[^}]*\}\{[^}]*\}").expect("chord macro pattern should be valid regex")
});

/// A chord found in a song, with the byte range of its macro.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChordMatch {
    pub range: Range<usize>,
    pub chord: Chord,
}

pub fn find_chords(text: &str) -> Vec<ChordMatch> {
    RE_CHORD_MACRO
        .find_iter(text)
        .map(|found| ChordMatch {
            range: found.range(),
            chord: Chord::from_gtab(found.as_str()),
        })
        .collect()
}

/// Replace the macro at `found` with the notation of `chord`.
///
/// The range must come from [`find_chords`] on the same `text`.
pub fn replace_chord(text: &str, found: &ChordMatch, chord: &Chord) -> String {
    let mut updated = String::with_capacity(text.len() + 8);
    updated.push_str(&text[..found.range.start]);
    updated.push_str(&chord.to_gtab());
    updated.push_str(&text[found.range.end..]);
    updated
}

#[cfg(test)]
mod tests {
    use super::*;

    const SONG: &str = "\\beginsong{Test}[by=Someone]\n\
        \\gtab{C}{X32010}\n\
        \\utab*{G7}{0212}\n\
        \\begin{verse}\\[C]Hello\\end{verse}\n\
        \\endsong\n";

    #[test]
    fn finds_every_macro() {
        let chords = find_chords(SONG);
        assert_eq!(chords.len(), 2);
        assert_eq!(chords[0].chord.name(), "C");
        assert_eq!(chords[1].chord.name(), "G7");
        assert_eq!(&SONG[chords[0].range.clone()], "\\gtab{C}{X32010}");
    }

    #[test]
    fn replaces_in_place() {
        let chords = find_chords(SONG);
        let mut edited = chords[1].chord.clone();
        edited.set_strings("0232");
        let updated = replace_chord(SONG, &chords[1], &edited);
        assert!(updated.contains("\\utab*{G7}{0232}"));
        assert!(updated.contains("\\gtab{C}{X32010}"));
        assert_eq!(find_chords(&updated).len(), 2);
    }

    #[test]
    fn no_chords_in_plain_text() {
        assert!(find_chords("\\beginsong{Nothing}\n\\endsong").is_empty());
    }
}
