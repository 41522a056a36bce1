//! Conversion of the LaTeX escapes found in song metadata into plain UTF-8.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// `\'e`, `\'{e}` and `{\'e}` style accents.
static RE_ACCENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{?\\(['`^"~])\s*\{?([A-Za-z])\}?\}?"#)
        .expect("accent pattern should be valid regex")
});

/// Cedilla: `\c{c}` or `\c c`.
static RE_CEDILLA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{?\\c(?:\{([A-Za-z])\}|\s+([A-Za-z]))\}?")
        .expect("cedilla pattern should be valid regex")
});

/// Ligatures and special letters such as `\oe` or `{\ss}`.
static RE_LETTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{?\\(oe|OE|ae|AE|ss|aa|AA|o|O|l|L)(?:\{\}|\b\s?)\}?")
        .expect("letter pattern should be valid regex")
});

const ACCENTS: &[(char, char, char)] = &[
    ('\'', 'a', 'á'),
    ('\'', 'e', 'é'),
    ('\'', 'i', 'í'),
    ('\'', 'o', 'ó'),
    ('\'', 'u', 'ú'),
    ('\'', 'y', 'ý'),
    ('\'', 'A', 'Á'),
    ('\'', 'E', 'É'),
    ('\'', 'I', 'Í'),
    ('\'', 'O', 'Ó'),
    ('\'', 'U', 'Ú'),
    ('`', 'a', 'à'),
    ('`', 'e', 'è'),
    ('`', 'i', 'ì'),
    ('`', 'o', 'ò'),
    ('`', 'u', 'ù'),
    ('`', 'A', 'À'),
    ('`', 'E', 'È'),
    ('`', 'I', 'Ì'),
    ('`', 'O', 'Ò'),
    ('`', 'U', 'Ù'),
    ('^', 'a', 'â'),
    ('^', 'e', 'ê'),
    ('^', 'i', 'î'),
    ('^', 'o', 'ô'),
    ('^', 'u', 'û'),
    ('^', 'A', 'Â'),
    ('^', 'E', 'Ê'),
    ('^', 'I', 'Î'),
    ('^', 'O', 'Ô'),
    ('^', 'U', 'Û'),
    ('"', 'a', 'ä'),
    ('"', 'e', 'ë'),
    ('"', 'i', 'ï'),
    ('"', 'o', 'ö'),
    ('"', 'u', 'ü'),
    ('"', 'y', 'ÿ'),
    ('"', 'A', 'Ä'),
    ('"', 'E', 'Ë'),
    ('"', 'I', 'Ï'),
    ('"', 'O', 'Ö'),
    ('"', 'U', 'Ü'),
    ('~', 'n', 'ñ'),
    ('~', 'a', 'ã'),
    ('~', 'o', 'õ'),
    ('~', 'N', 'Ñ'),
    ('~', 'A', 'Ã'),
    ('~', 'O', 'Õ'),
];

fn accented(accent: char, letter: char) -> Option<char> {
    ACCENTS
        .iter()
        .find(|(a, l, _)| *a == accent && *l == letter)
        .map(|(_, _, out)| *out)
}

fn letter(name: &str) -> &'static str {
    match name {
        "oe" => "œ",
        "OE" => "Œ",
        "ae" => "æ",
        "AE" => "Æ",
        "ss" => "ß",
        "aa" => "å",
        "AA" => "Å",
        "o" => "ø",
        "O" => "Ø",
        "l" => "ł",
        "L" => "Ł",
        _ => "",
    }
}

pub fn latex_to_utf8(text: &str) -> String {
    if !text.contains('\\') {
        return text.trim().to_string();
    }

    let converted = RE_ACCENT.replace_all(text, |caps: &Captures| {
        let accent = caps[1].chars().next().unwrap_or('\'');
        let base = caps[2].chars().next().unwrap_or(' ');
        match accented(accent, base) {
            Some(out) => out.to_string(),
            None => base.to_string(),
        }
    });

    let converted = RE_CEDILLA.replace_all(&converted, |caps: &Captures| {
        let base = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str());
        match base {
            Some("c") => "ç".to_string(),
            Some("C") => "Ç".to_string(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    });

    let converted =
        RE_LETTER.replace_all(&converted, |caps: &Captures| letter(&caps[1]).to_string());

    converted
        .replace("\\&", "&")
        .replace("\\%", "%")
        .replace("\\$", "$")
        .replace("\\#", "#")
        .replace("\\_", "_")
        .replace("\\ldots", "…")
        .trim()
        .to_string()
}

/// Escape the characters `latex_to_utf8` turns back into plain text.
pub fn utf8_to_latex(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if matches!(ch, '&' | '%' | '$' | '#' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(latex_to_utf8("Hotel California "), "Hotel California");
    }

    #[test]
    fn accents_in_all_brace_styles() {
        assert_eq!(latex_to_utf8("Caf\\'e"), "Café");
        assert_eq!(latex_to_utf8("Caf\\'{e}"), "Café");
        assert_eq!(latex_to_utf8("Caf{\\'e}"), "Café");
        assert_eq!(latex_to_utf8("\\`A la claire fontaine"), "À la claire fontaine");
        assert_eq!(latex_to_utf8("Mot\\\"orhead"), "Motörhead");
        assert_eq!(latex_to_utf8("Espa\\~na"), "España");
        assert_eq!(latex_to_utf8("F\\^ete"), "Fête");
    }

    #[test]
    fn cedilla_and_ligatures() {
        assert_eq!(latex_to_utf8("Fran\\c{c}ois"), "François");
        assert_eq!(latex_to_utf8("Fran\\c cois"), "François");
        assert_eq!(latex_to_utf8("C\\oe ur"), "Cœur");
        assert_eq!(latex_to_utf8("Stra{\\ss}e"), "Straße");
    }

    #[test]
    fn escapes() {
        assert_eq!(latex_to_utf8("Simon \\& Garfunkel"), "Simon & Garfunkel");
        assert_eq!(latex_to_utf8("100\\%"), "100%");
    }

    #[test]
    fn escaping_is_undone_by_conversion() {
        let escaped = utf8_to_latex("Crosby, Stills & Nash #1_100%$");
        assert_eq!(escaped, "Crosby, Stills \\& Nash \\#1\\_100\\%\\$");
        assert_eq!(latex_to_utf8(&escaped), "Crosby, Stills & Nash #1_100%$");
    }
}
