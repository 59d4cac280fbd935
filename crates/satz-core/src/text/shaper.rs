use std::sync::Arc;

use unicode_linebreak::BreakOpportunity;

use crate::text::{
    shape_flags, Direction, FaceMetrics, Font, FontManager, Language, LineLayout, Shape,
    ShapedGlyph, ShapingEngine, TextItemizer, TextRun,
};

/// Line break class of the character starting at some byte, following UAX#14.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
enum BreakClass {
    /// A break after this character is required.
    Mandatory,
    /// A break after this character is allowed.
    Allowed,
    /// No break after this character.
    #[default]
    Prohibited,
}

/// Shapes lines of text into [`LineLayout`]s.
///
/// A line is split at mandatory breaks, each piece itemized into uniform
/// runs, and each run shaped with the first face of the font that can
/// display it, falling back to later faces for missing glyphs.
pub struct TextShaper {
    itemizer: TextItemizer,
    engine: Box<dyn ShapingEngine>,

    // Scratch buffers, reused across lines
    breaks: Vec<BreakClass>,
    runs: Vec<TextRun>,
    glyphs: Vec<ShapedGlyph>,
    slots: Vec<Shape>,
    slot_state: Vec<u8>,
    clusters: Vec<Vec<Shape>>,
}

impl TextShaper {
    pub fn new(engine: Box<dyn ShapingEngine>) -> TextShaper {
        TextShaper {
            itemizer: TextItemizer::new(),
            engine,
            breaks: Vec::new(),
            runs: Vec::new(),
            glyphs: Vec::new(),
            slots: Vec::new(),
            slot_state: Vec::new(),
            clusters: Vec::new(),
        }
    }

    pub fn itemizer(&self) -> &TextItemizer {
        &self.itemizer
    }

    pub fn itemizer_mut(&mut self) -> &mut TextItemizer {
        &mut self.itemizer
    }

    /// Shapes `text` with `font`, loading faces from `fonts` on demand.
    ///
    /// `direction` forces the paragraph direction; when `None` it is
    /// determined from the text.
    pub fn shape(
        &mut self,
        font: &Arc<Font>,
        fonts: &mut FontManager,
        text: &str,
        lang_hint: Option<&Language>,
        direction: Option<Direction>,
    ) -> LineLayout {
        if text.is_empty() {
            return LineLayout::new(
                font.clone(),
                Vec::new(),
                FaceMetrics::default(),
                direction.unwrap_or_default(),
            );
        }

        self.compute_breaks(text);

        let mut shapes: Vec<Shape> = Vec::with_capacity(text.len());
        let mut metrics = FaceMetrics::default();
        let mut first_run_direction = None;
        let mut missing_glyphs = false;

        let mut runs = std::mem::take(&mut self.runs);

        // Split into sub-lines at mandatory breaks; the break character
        // belongs to the sub-line it ends.
        let mut start = 0;
        for (pos, c) in text.char_indices() {
            if self.breaks[pos] != BreakClass::Mandatory {
                continue;
            }
            let end = pos + c.len_utf8();

            runs.clear();
            self.itemizer
                .itemize(&text[start..end], lang_hint, direction, &mut runs);
            for run in &mut runs {
                run.start += start;
                run.end += start;
            }

            if first_run_direction.is_none() {
                first_run_direction = runs.first().map(|run| run.direction);
            }

            let sub_line_start = shapes.len();
            let last_sub_line = end == text.len();

            for run in &runs {
                if self.shape_run(font, fonts, text, run, &mut shapes, &mut metrics) {
                    missing_glyphs = true;
                }
            }

            // The break character itself rarely maps to a glyph, so mark the
            // break on the last shape of the sub-line instead.
            if !last_sub_line && shapes.len() > sub_line_start {
                shapes.last_mut().unwrap().flags |= shape_flags::MUST_BREAK;
            }

            start = end;
        }

        self.runs = runs;

        let mut layout = LineLayout::new(
            font.clone(),
            shapes,
            metrics,
            direction
                .or(first_run_direction)
                .unwrap_or_default(),
        );
        if missing_glyphs {
            layout.set_missing_glyphs();
        }
        layout
    }

    /// Shapes one run, filling per-byte slots so that later fallback faces
    /// only contribute glyphs earlier faces were missing. Returns whether
    /// glyphs remained missing in every face.
    fn shape_run(
        &mut self,
        font: &Arc<Font>,
        fonts: &mut FontManager,
        text: &str,
        run: &TextRun,
        shapes: &mut Vec<Shape>,
        metrics: &mut FaceMetrics,
    ) -> bool {
        let length = run.len();
        if length == 0 {
            return false;
        }

        self.slots.clear();
        self.slots.resize(length, Shape::default());
        self.slot_state.clear();
        self.slot_state.resize(length, 0);
        if self.clusters.len() < length {
            self.clusters.resize_with(length, Vec::new);
        }

        let mut run_missing = true;

        for &face_id in font.face_ids(run.language.as_ref()) {
            let face = match fonts.load_face(face_id) {
                Ok(face) => face,
                Err(_) => continue,
            };

            self.glyphs.clear();
            self.engine.shape_run(
                face,
                &text[run.start..run.end],
                run.script,
                run.direction,
                run.language.as_ref(),
                &mut self.glyphs,
            );

            let mut face_missing = false;
            let mut added_glyphs = false;

            for glyph in &self.glyphs {
                let cluster = run.start + glyph.cluster;

                // Slot index in visual left-to-right order
                let slot = match run.direction {
                    Direction::RightToLeft => run.end - cluster - 1,
                    Direction::LeftToRight => cluster - run.start,
                };

                if glyph.glyph_id == 0 {
                    // Only unfilled slots count as missing, so that faces
                    // complementing each other terminate the fallback walk.
                    if self.slot_state[slot] == 0
                        && self.breaks[cluster] != BreakClass::Mandatory
                    {
                        face_missing = true;
                    }
                    continue;
                }

                if self.slot_state[slot] != 0 {
                    if self.slots[slot].face != face.id() {
                        // Slot already filled by an earlier face
                        continue;
                    }

                    // Additional glyph in a cluster
                    self.slot_state[slot] = 2;
                    self.clusters[slot].push(Shape::new(
                        face.id(),
                        glyph.glyph_id,
                        glyph.offset,
                        glyph.advance,
                        0,
                    ));
                } else {
                    added_glyphs = true;
                    self.slot_state[slot] = 1;

                    let mut flags = shape_flags::CLUSTER_START;
                    flags |= match self.breaks[cluster] {
                        BreakClass::Mandatory => shape_flags::MUST_BREAK,
                        BreakClass::Allowed => shape_flags::CAN_BREAK,
                        BreakClass::Prohibited => shape_flags::NO_BREAK,
                    };
                    if face.is_space(glyph.glyph_id) {
                        flags |= shape_flags::IS_SPACE;
                    }

                    self.slots[slot] =
                        Shape::new(face.id(), glyph.glyph_id, glyph.offset, glyph.advance, flags);
                }
            }

            if added_glyphs {
                if let Some(face_metrics) = face.metrics() {
                    metrics.expand(face_metrics);
                }
            }

            if !face_missing {
                run_missing = false;
                break;
            }
        }

        for slot in 0..length {
            if self.slot_state[slot] != 0 && self.slots[slot].glyph_id != 0 {
                shapes.push(self.slots[slot]);

                if self.slot_state[slot] == 2 {
                    shapes.append(&mut self.clusters[slot]);
                }
            }
        }

        run_missing
    }

    /// Per-byte break classes: the class at a character's first byte says
    /// whether a break may follow that character.
    fn compute_breaks(&mut self, text: &str) {
        self.breaks.clear();
        self.breaks.resize(text.len(), BreakClass::Prohibited);

        for (pos, opportunity) in unicode_linebreak::linebreaks(text) {
            // The opportunity is located before `pos`; attribute it to the
            // preceding character.
            let Some(c) = text[..pos].chars().next_back() else {
                continue;
            };

            self.breaks[pos - c.len_utf8()] = match opportunity {
                BreakOpportunity::Mandatory => BreakClass::Mandatory,
                BreakOpportunity::Allowed => BreakClass::Allowed,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullEngine;

    impl ShapingEngine for NullEngine {
        fn shape_run(
            &mut self,
            _face: &crate::text::FontFace,
            _text: &str,
            _script: unicode_script::Script,
            _direction: Direction,
            _language: Option<&Language>,
            _out: &mut Vec<ShapedGlyph>,
        ) {
        }
    }

    fn breaks_for(text: &str) -> Vec<BreakClass> {
        let mut shaper = TextShaper::new(Box::new(NullEngine));
        shaper.compute_breaks(text);
        shaper.breaks.clone()
    }

    #[test]
    fn break_classes_are_per_byte() {
        let breaks = breaks_for("ab cd");

        assert_eq!(breaks[0], BreakClass::Prohibited);
        // Break allowed after the space
        assert_eq!(breaks[2], BreakClass::Allowed);
        assert_eq!(breaks[3], BreakClass::Prohibited);
        // End of text is always a mandatory break
        assert_eq!(breaks[4], BreakClass::Mandatory);
    }

    #[test]
    fn newline_is_mandatory() {
        let breaks = breaks_for("a\nb");

        assert_eq!(breaks[1], BreakClass::Mandatory);
        assert_eq!(breaks[2], BreakClass::Mandatory);
    }

    #[test]
    fn multibyte_characters_carry_class_on_first_byte() {
        // Arabic letters are two bytes each
        let breaks = breaks_for("\u{0627} \u{0628}");

        assert_eq!(breaks[0], BreakClass::Prohibited);
        assert_eq!(breaks[2], BreakClass::Allowed);
        assert_eq!(breaks[3], BreakClass::Mandatory);
        assert_eq!(breaks[4], BreakClass::Prohibited);
    }
}
