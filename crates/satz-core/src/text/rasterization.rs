use glam::{UVec2, Vec2};

use crate::text::FontFace;

/// A rasterized glyph image: tightly packed 8-bit coverage, `size.x` bytes
/// per row.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RasterizedGlyph {
    pub size: UVec2,
    /// Offset from the pen position to the top-left corner of the image,
    /// y pointing down.
    pub offset: Vec2,
    pub data: Vec<u8>,
}

/// Renders single glyphs of a face into coverage bitmaps.
pub trait Rasterizer {
    /// Returns `None` when the face has no image for `glyph_id`.
    fn rasterize(&mut self, face: &FontFace, glyph_id: u16) -> Option<RasterizedGlyph>;
}
