//! Fixed-layout chord diagrams.
//!
//! The layout is computed once into a list of primitive shapes so the same
//! geometry can be exported to SVG or inspected in tests. The terminal UI
//! uses [`text_lines`] instead, which draws the same grid with box
//! characters.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::Arc;

use super::{Chord, Instrument, Rgb, StringState};

pub const CANVAS_WIDTH: f32 = 100.0;
pub const CANVAS_HEIGHT: f32 = 120.0;

const CELL: f32 = 12.0;
const PADDING: f32 = 13.0;
const V_OFFSET: f32 = 45.0;
const MARKER: f32 = CELL - 4.0;

const WHITE: Rgb = Rgb(0xff, 0xff, 0xff);
const BLACK: Rgb = Rgb(0x00, 0x00, 0x00);

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        radius: f32,
        fill: Option<Rgb>,
        stroke: Option<Rgb>,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
    },
    Circle {
        cx: f32,
        cy: f32,
        r: f32,
        filled: bool,
    },
    /// Text centred on `(x, y)`.
    Text {
        x: f32,
        y: f32,
        content: String,
        size: f32,
        bold: bool,
        color: Rgb,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Diagram {
    pub width: f32,
    pub height: f32,
    pub shapes: Vec<Shape>,
}

impl Diagram {
    /// Lay out `chord`. Invalid chords have no diagram.
    pub fn render(chord: &Chord, draw_border: bool) -> Option<Self> {
        if !chord.is_valid() {
            return None;
        }

        let color = chord.color();
        let states = chord.string_states();
        let string_count = states.len();
        let grid_width = (string_count.saturating_sub(1)) as f32 * CELL;
        let rows = chord.row_count() as f32;
        let h_offset = match chord.instrument() {
            Instrument::Guitar => 0.0,
            Instrument::Ukulele => CELL,
        };
        let top = PADDING + V_OFFSET;
        let height = CANVAS_HEIGHT.max(top + rows * CELL + 10.0);

        let mut shapes = vec![Shape::Rect {
            x: 0.0,
            y: 0.0,
            width: CANVAS_WIDTH,
            height,
            radius: 0.0,
            fill: Some(WHITE),
            stroke: None,
        }];

        // name label
        shapes.push(Shape::Rect {
            x: 10.0,
            y: PADDING,
            width: 70.0,
            height: 10.0 + PADDING,
            radius: 4.0,
            fill: Some(color),
            stroke: None,
        });
        shapes.push(Shape::Text {
            x: 10.0 + 35.0,
            y: PADDING + (10.0 + PADDING) / 2.0,
            content: chord.display_name(),
            size: 10.0,
            bold: true,
            color: WHITE,
        });

        if draw_border {
            shapes.push(Shape::Rect {
                x: 3.0,
                y: PADDING - 5.0,
                width: 82.0,
                height: 110.0,
                radius: 4.0,
                fill: None,
                stroke: Some(color),
            });
        }

        shapes.push(Shape::Rect {
            x: 4.0,
            y: V_OFFSET,
            width: 80.0,
            height: CELL * rows + PADDING + 5.0,
            radius: 0.0,
            fill: Some(WHITE),
            stroke: None,
        });

        for row in 0..=(rows as usize) {
            let y = row as f32 * CELL + top;
            shapes.push(Shape::Line {
                x1: PADDING + h_offset,
                y1: y,
                x2: grid_width + PADDING + h_offset,
                y2: y,
            });
        }

        for string in 0..string_count {
            let x = string as f32 * CELL + PADDING + h_offset;
            shapes.push(Shape::Line {
                x1: x,
                y1: top,
                x2: x,
                y2: rows * CELL + top,
            });
        }

        for (string, state) in states.iter().enumerate() {
            let cx = string as f32 * CELL + CELL / 2.0 + 3.0 + h_offset + MARKER / 2.0;
            let marker_top = |value: f32| value * CELL + 3.0 + V_OFFSET + MARKER / 2.0;
            match state {
                StringState::Muted => shapes.push(Shape::Text {
                    x: cx,
                    y: marker_top(0.0),
                    content: "X".to_string(),
                    size: 9.0,
                    bold: false,
                    color: BLACK,
                }),
                StringState::Open => shapes.push(Shape::Circle {
                    cx,
                    cy: marker_top(0.0),
                    r: MARKER / 2.0,
                    filled: false,
                }),
                StringState::Fretted(value) => shapes.push(Shape::Circle {
                    cx,
                    cy: marker_top(*value as f32),
                    r: MARKER / 2.0,
                    filled: true,
                }),
            }
        }

        if !chord.fret().is_empty() {
            let fret_x = PADDING - (CELL - 2.0) + h_offset;
            let fret_y = PADDING + (CELL + V_OFFSET) / 2.0;
            shapes.push(Shape::Text {
                x: fret_x + MARKER / 2.0,
                y: fret_y + (CELL + V_OFFSET) / 2.0,
                content: chord.fret().to_string(),
                size: 9.0,
                bold: false,
                color: BLACK,
            });
        }

        Some(Diagram {
            width: CANVAS_WIDTH,
            height,
            shapes,
        })
    }

    pub fn to_svg(&self) -> String {
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
            w = self.width,
            h = self.height
        );
        for shape in &self.shapes {
            let _ = match shape {
                Shape::Rect {
                    x,
                    y,
                    width,
                    height,
                    radius,
                    fill,
                    stroke,
                } => writeln!(
                    svg,
                    r#"  <rect x="{x}" y="{y}" width="{width}" height="{height}" rx="{radius}" fill="{}" stroke="{}"/>"#,
                    fill.map(Rgb::hex).unwrap_or_else(|| "none".to_string()),
                    stroke.map(Rgb::hex).unwrap_or_else(|| "none".to_string()),
                ),
                Shape::Line { x1, y1, x2, y2 } => writeln!(
                    svg,
                    r##"  <line x1="{x1}" y1="{y1}" x2="{x2}" y2="{y2}" stroke="#000000"/>"##
                ),
                Shape::Circle { cx, cy, r, filled } => writeln!(
                    svg,
                    r##"  <circle cx="{cx}" cy="{cy}" r="{r}" fill="{}" stroke="#000000"/>"##,
                    if *filled { "#000000" } else { "none" }
                ),
                Shape::Text {
                    x,
                    y,
                    content,
                    size,
                    bold,
                    color,
                } => writeln!(
                    svg,
                    r#"  <text x="{x}" y="{y}" font-family="Helvetica, Arial, sans-serif" font-size="{size}" font-weight="{}" fill="{}" text-anchor="middle" dominant-baseline="central">{}</text>"#,
                    if *bold { "bold" } else { "normal" },
                    color.hex(),
                    escape_xml(content)
                ),
            };
        }
        svg.push_str("</svg>\n");
        svg
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Terminal rendition of the diagram: a name line, a marker line for
/// open/muted strings, then the fret grid drawn with box characters.
pub fn text_lines(chord: &Chord) -> Option<Vec<String>> {
    if !chord.is_valid() {
        return None;
    }

    let states = chord.string_states();
    let rows = chord.row_count();
    let grid_width = states.len() * 2 - 1;
    let prefix = "   ";

    let mut name = chord.display_name();
    if chord.is_important() {
        name.push('*');
    }
    let name_len = name.chars().count();
    let pad = grid_width.saturating_sub(name_len) / 2;
    let mut lines = vec![format!("{prefix}{}{name}", " ".repeat(pad))];

    let markers: Vec<String> = states
        .iter()
        .map(|state| match state {
            StringState::Muted => "x".to_string(),
            StringState::Open => "o".to_string(),
            StringState::Fretted(_) => " ".to_string(),
        })
        .collect();
    lines.push(format!("{prefix}{}", markers.join(" ")));
    lines.push(format!("{prefix}{}", grid_border(states.len(), '┌', '┬', '┐')));

    for row in 1..=rows {
        let cells: Vec<&str> = states
            .iter()
            .map(|state| match state {
                StringState::Fretted(value) if *value == row => "●",
                _ => "│",
            })
            .collect();
        let label = if row == 1 && !chord.fret().is_empty() {
            format!("{:>2} ", chord.fret())
        } else {
            prefix.to_string()
        };
        lines.push(format!("{label}{}", cells.join(" ")));
        let border = if row == rows {
            grid_border(states.len(), '└', '┴', '┘')
        } else {
            grid_border(states.len(), '├', '┼', '┤')
        };
        lines.push(format!("{prefix}{border}"));
    }

    Some(lines)
}

fn grid_border(strings: usize, first: char, middle: char, last: char) -> String {
    let mut line = String::new();
    for index in 0..strings {
        if index > 0 {
            line.push('─');
        }
        line.push(if index == 0 {
            first
        } else if index + 1 == strings {
            last
        } else {
            middle
        });
    }
    line
}

/// Memoises rendered diagrams by chord notation and border flag.
#[derive(Default)]
pub struct DiagramCache {
    entries: HashMap<(String, bool), Arc<Diagram>>,
}

impl DiagramCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_render(&mut self, chord: &Chord, draw_border: bool) -> Option<Arc<Diagram>> {
        let key = (chord.to_gtab(), draw_border);
        if let Some(diagram) = self.entries.get(&key) {
            return Some(Arc::clone(diagram));
        }
        let diagram = Arc::new(Diagram::render(chord, draw_border)?);
        self.entries.insert(key, Arc::clone(&diagram));
        Some(diagram)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circles(diagram: &Diagram) -> Vec<(f32, f32, bool)> {
        diagram
            .shapes
            .iter()
            .filter_map(|shape| match shape {
                Shape::Circle { cx, cy, filled, .. } => Some((*cx, *cy, *filled)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn invalid_chord_has_no_diagram() {
        assert!(Diagram::render(&Chord::default(), false).is_none());
        assert!(text_lines(&Chord::default()).is_none());
    }

    #[test]
    fn c_major_markers() {
        let chord = Chord::from_gtab("\\gtab{C}{X32010}");
        let diagram = Diagram::render(&chord, false).expect("valid chord");
        let marks = circles(&diagram);
        // A muted string is a text marker, so five circles remain.
        assert_eq!(marks.len(), 5);
        assert_eq!(marks[0], (25.0, 88.0, true));
        assert_eq!(marks[2], (49.0, 52.0, false));
        assert_eq!(diagram.height, CANVAS_HEIGHT);
    }

    #[test]
    fn grid_has_one_line_per_row_and_string() {
        let chord = Chord::from_gtab("\\gtab{C}{X32010}");
        let diagram = Diagram::render(&chord, false).expect("valid chord");
        let lines = diagram
            .shapes
            .iter()
            .filter(|shape| matches!(shape, Shape::Line { .. }))
            .count();
        assert_eq!(lines, 5 + 6);
    }

    #[test]
    fn ukulele_grid_is_shifted() {
        let chord = Chord::from_gtab("\\utab{C}{0003}");
        let diagram = Diagram::render(&chord, false).expect("valid chord");
        let first_vertical = diagram.shapes.iter().find_map(|shape| match shape {
            Shape::Line { x1, x2, .. } if x1 == x2 => Some(*x1),
            _ => None,
        });
        assert_eq!(first_vertical, Some(PADDING + CELL));
    }

    #[test]
    fn border_is_optional() {
        let chord = Chord::from_gtab("\\gtab{C}{X32010}");
        let plain = Diagram::render(&chord, false).expect("valid chord");
        let framed = Diagram::render(&chord, true).expect("valid chord");
        assert_eq!(framed.shapes.len(), plain.shapes.len() + 1);
    }

    #[test]
    fn tall_chords_grow_the_canvas() {
        let chord = Chord::from_gtab("\\gtab{X}{X9XXXX}");
        let diagram = Diagram::render(&chord, false).expect("valid chord");
        assert!(diagram.height > CANVAS_HEIGHT);
    }

    #[test]
    fn svg_escapes_names() {
        let mut chord = Chord::from_gtab("\\gtab{C}{X32010}");
        chord.set_name("C<7>");
        let svg = Diagram::render(&chord, false).expect("valid").to_svg();
        assert!(svg.starts_with("<svg"));
        assert!(svg.contains("C&lt;7&gt;"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn text_grid_for_c_major() {
        let chord = Chord::from_gtab("\\gtab{C}{X32010}");
        let lines = text_lines(&chord).expect("valid chord");
        assert_eq!(lines[0].trim(), "C");
        assert_eq!(lines[1], "   x     o   o");
        assert_eq!(lines[2], "   ┌─┬─┬─┬─┬─┐");
        assert_eq!(lines[3], "   │ │ │ │ ● │");
        assert_eq!(lines.last().map(String::as_str), Some("   └─┴─┴─┴─┴─┘"));
        assert_eq!(lines.len(), 3 + 4 * 2);
    }

    #[test]
    fn text_grid_shows_fret() {
        let chord = Chord::from_gtab("\\gtab{E&m}{5:X02210}");
        let lines = text_lines(&chord).expect("valid chord");
        assert!(lines[3].starts_with(" 5 "));
    }

    #[test]
    fn cache_reuses_diagrams() {
        let mut cache = DiagramCache::new();
        let chord = Chord::from_gtab("\\gtab{C}{X32010}");
        let first = cache.get_or_render(&chord, false).expect("valid");
        let second = cache.get_or_render(&chord, false).expect("valid");
        assert!(Arc::ptr_eq(&first, &second));
        cache.get_or_render(&chord, true);
        assert_eq!(cache.len(), 2);
        assert!(cache.get_or_render(&Chord::default(), false).is_none());
    }
}
