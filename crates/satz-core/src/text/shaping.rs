use glam::Vec2;
use unicode_script::Script;

use crate::text::{Direction, FontFace, Language};

/// A single glyph produced by shaping, positioned in pixels at the face's
/// size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ShapedGlyph {
    /// Glyph index in the face, 0 for codepoints the face cannot display.
    pub glyph_id: u16,
    /// Byte offset of the cluster this glyph belongs to, relative to the
    /// shaped slice.
    pub cluster: usize,
    pub advance: f32,
    pub offset: Vec2,
}

/// Turns a run of text into positioned glyphs of a single face.
///
/// Glyphs may be reported in any order; callers place them by cluster.
pub trait ShapingEngine {
    fn shape_run(
        &mut self,
        face: &FontFace,
        text: &str,
        script: Script,
        direction: Direction,
        language: Option<&Language>,
        out: &mut Vec<ShapedGlyph>,
    );
}
