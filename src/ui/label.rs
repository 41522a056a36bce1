//! Single-line label that shortens its text with an ellipsis.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::Style;
use ratatui::text::Span;
use ratatui::widgets::Widget;

pub const ELLIPSIS: char = '…';
pub const DEFAULT_LABEL_WIDTH: usize = 24;

/// Where the ellipsis goes when the text does not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElideMode {
    /// Keep the end: `…name.sg`.
    Left,
    Middle,
    /// Keep the start: `Long ti…`.
    #[default]
    Right,
    /// Never shorten; the widget clips.
    None,
}

/// Terminal columns taken by `text`.
fn columns(text: &str) -> usize {
    Span::raw(text).width()
}

fn char_columns(ch: char) -> usize {
    let mut buf = [0u8; 4];
    columns(ch.encode_utf8(&mut buf))
}

/// Longest run of `chars` that fits in `budget` columns.
fn take_columns(chars: impl Iterator<Item = char>, budget: usize) -> (Vec<char>, usize) {
    let mut taken = Vec::new();
    let mut used = 0;
    for ch in chars {
        let width = char_columns(ch);
        if used + width > budget {
            break;
        }
        used += width;
        taken.push(ch);
    }
    (taken, used)
}

/// Shorten `text` to at most `width` terminal columns. Wide characters count
/// twice and are never split.
pub fn elide(text: &str, mode: ElideMode, width: usize) -> String {
    if mode == ElideMode::None || columns(text) <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }

    let budget = width - 1;
    match mode {
        ElideMode::Right => {
            let (head, _) = take_columns(text.chars(), budget);
            head.into_iter().chain([ELLIPSIS]).collect()
        }
        ElideMode::Left => {
            let (mut tail, _) = take_columns(text.chars().rev(), budget);
            tail.reverse();
            [ELLIPSIS].into_iter().chain(tail).collect()
        }
        ElideMode::Middle => {
            let (head, used) = take_columns(text.chars(), budget.div_ceil(2));
            let (mut tail, _) = take_columns(text.chars().rev(), budget - used);
            tail.reverse();
            head.into_iter().chain([ELLIPSIS]).chain(tail).collect()
        }
        ElideMode::None => text.to_string(),
    }
}

/// Label widget with a fixed width. The elided text is computed when the
/// text, mode or width changes and reused on every draw.
#[derive(Debug, Clone)]
pub struct ElidedLabel {
    text: String,
    mode: ElideMode,
    width: usize,
    style: Style,
    elided: String,
}

impl Default for ElidedLabel {
    fn default() -> Self {
        Self::new("")
    }
}

impl ElidedLabel {
    pub fn new(text: impl Into<String>) -> Self {
        let mut label = Self {
            text: text.into(),
            mode: ElideMode::default(),
            width: DEFAULT_LABEL_WIDTH,
            style: Style::default(),
            elided: String::new(),
        };
        label.refresh();
        label
    }

    pub fn mode(mut self, mode: ElideMode) -> Self {
        self.set_mode(mode);
        self
    }

    pub fn width(mut self, width: usize) -> Self {
        self.set_width(width);
        self
    }

    pub fn style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        if text != self.text {
            self.text = text;
            self.refresh();
        }
    }

    pub fn elide_mode(&self) -> ElideMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: ElideMode) {
        if mode != self.mode {
            self.mode = mode;
            self.refresh();
        }
    }

    pub fn label_width(&self) -> usize {
        self.width
    }

    pub fn set_width(&mut self, width: usize) {
        if width != self.width {
            self.width = width;
            self.refresh();
        }
    }

    pub fn elided_text(&self) -> &str {
        &self.elided
    }

    /// The full text is shown as a tooltip only when something was cut.
    pub fn is_elided(&self) -> bool {
        self.elided != self.text
    }

    fn refresh(&mut self) {
        self.elided = elide(&self.text, self.mode, self.width);
    }
}

impl Widget for &ElidedLabel {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width == 0 || area.height == 0 {
            return;
        }
        let width = (self.width as u16).min(area.width);
        buf.set_span(area.x, area.y, &Span::styled(self.elided.as_str(), self.style), width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_untouched() {
        assert_eq!(elide("Hey Jude", ElideMode::Middle, 24), "Hey Jude");
    }

    #[test]
    fn modes_place_ellipsis() {
        assert_eq!(elide("abcdefghij", ElideMode::Right, 5), "abcd…");
        assert_eq!(elide("abcdefghij", ElideMode::Left, 5), "…ghij");
        assert_eq!(elide("abcdefghij", ElideMode::Middle, 5), "ab…ij");
        assert_eq!(elide("abcdefghij", ElideMode::Middle, 6), "abc…ij");
        assert_eq!(elide("abcdefghij", ElideMode::None, 5), "abcdefghij");
    }

    #[test]
    fn tiny_widths() {
        assert_eq!(elide("abc", ElideMode::Right, 0), "");
        assert_eq!(elide("abc", ElideMode::Left, 1), "…");
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert_eq!(elide("Chœur à l'église", ElideMode::Right, 6), "Chœur…");
    }

    #[test]
    fn wide_characters_count_two_columns() {
        let title = "日本語の歌のタイトル";
        let right = elide(title, ElideMode::Right, 6);
        assert_eq!(right, "日本…");
        assert!(columns(&right) <= 6);
        assert_eq!(elide(title, ElideMode::Left, 6), "…トル");
        assert_eq!(elide(title, ElideMode::Middle, 7), "日…トル");
        assert_eq!(elide("日本", ElideMode::Right, 4), "日本");
    }

    #[test]
    fn label_caches_and_refreshes() {
        let mut label = ElidedLabel::new("songs/beatles/hey-jude.sg").mode(ElideMode::Left);
        assert_eq!(label.label_width(), DEFAULT_LABEL_WIDTH);
        assert_eq!(label.elided_text(), "…ngs/beatles/hey-jude.sg");
        assert!(label.is_elided());

        label.set_width(10);
        assert_eq!(label.elided_text(), "…y-jude.sg");

        label.set_text("short");
        assert_eq!(label.elided_text(), "short");
        assert!(!label.is_elided());
    }

    #[test]
    fn renders_within_area() {
        let label = ElidedLabel::new("abcdefghij").width(6);
        let area = Rect::new(0, 0, 8, 1);
        let mut buf = Buffer::empty(area);
        (&label).render(area, &mut buf);
        let rendered: String = (0..8)
            .map(|x| buf[(x, 0)].symbol().to_string())
            .collect();
        assert_eq!(rendered, "abcde…  ");
    }

    #[test]
    fn wide_text_keeps_its_ellipsis_when_rendered() {
        let label = ElidedLabel::new("日本語の歌のタイトル").width(6);
        let area = Rect::new(0, 0, 6, 1);
        let mut buf = Buffer::empty(area);
        (&label).render(area, &mut buf);
        assert_eq!(buf[(0, 0)].symbol(), "日");
        assert_eq!(buf[(2, 0)].symbol(), "本");
        assert_eq!(buf[(4, 0)].symbol(), "…");
    }
}
