use std::sync::Arc;

use glam::Vec2;

use crate::text::{Alignment, Direction, FaceId, FaceMetrics, Font};

/// Flags carried by each [`Shape`].
pub mod shape_flags {
    /// Marks the first glyph of a cluster. When a codepoint produces
    /// multiple glyphs only the first one has this set.
    pub const CLUSTER_START: u8 = 1;
    /// A line break is required after this cluster.
    pub const MUST_BREAK: u8 = 2;
    /// A line break is allowed after this cluster.
    pub const CAN_BREAK: u8 = 4;
    /// A line break after this cluster is prohibited.
    pub const NO_BREAK: u8 = 8;
    /// The glyph is a space separator and produces no visible output.
    pub const IS_SPACE: u8 = 16;
}

/// A positioned glyph within a [`LineLayout`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Shape {
    /// The face within the layout's font this glyph comes from.
    pub face: FaceId,
    pub flags: u8,
    /// Horizontal advance in pixels, unscaled.
    pub advance: f32,
    pub glyph_id: u16,
    /// Offset from the pen position, unscaled.
    pub position: Vec2,
}

impl Shape {
    pub fn new(face: FaceId, glyph_id: u16, position: Vec2, advance: f32, flags: u8) -> Shape {
        Shape {
            face,
            flags,
            advance,
            glyph_id,
            position,
        }
    }

    pub fn is_cluster_start(&self) -> bool {
        self.flags & shape_flags::CLUSTER_START != 0
    }

    pub fn must_break(&self) -> bool {
        self.flags & shape_flags::MUST_BREAK != 0
    }

    pub fn can_break(&self) -> bool {
        self.flags & shape_flags::CAN_BREAK != 0
    }

    pub fn no_break(&self) -> bool {
        self.flags & shape_flags::NO_BREAK != 0
    }

    pub fn is_space(&self) -> bool {
        self.flags & shape_flags::IS_SPACE != 0
    }
}

/// The result of shaping one logical line of text: glyphs in visual order
/// together with the combined metrics of the faces that produced them.
#[derive(Clone)]
pub struct LineLayout {
    font: Arc<Font>,
    shapes: Vec<Shape>,
    direction: Direction,
    metrics: FaceMetrics,
    advance: f32,
    middle_line_factor: f32,
    scale: f32,
    missing_glyphs: bool,

    /// Per-glyph offsets filled in by word wrapping; empty until then.
    pub offsets: Vec<Vec2>,
}

impl LineLayout {
    pub fn new(
        font: Arc<Font>,
        shapes: Vec<Shape>,
        metrics: FaceMetrics,
        direction: Direction,
    ) -> LineLayout {
        let advance = shapes
            .iter()
            .filter(|shape| shape.flags != 0)
            .map(|shape| shape.advance)
            .sum();

        LineLayout {
            font,
            shapes,
            direction,
            metrics,
            advance,
            middle_line_factor: 0.0,
            scale: 1.0,
            missing_glyphs: false,
            offsets: Vec::new(),
        }
    }

    pub fn font(&self) -> &Arc<Font> {
        &self.font
    }

    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn shapes_mut(&mut self) -> &mut Vec<Shape> {
        &mut self.shapes
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn metrics(&self) -> &FaceMetrics {
        &self.metrics
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale;
    }

    pub fn height(&self) -> f32 {
        self.metrics.height * self.scale
    }

    pub fn ascent(&self) -> f32 {
        self.metrics.ascent * self.scale
    }

    pub fn descent(&self) -> f32 {
        self.metrics.descent * self.scale
    }

    pub fn line_thickness(&self) -> f32 {
        self.metrics.line_thickness * self.scale
    }

    /// Total advance of the line in pixels, scaled.
    pub fn advance(&self) -> f32 {
        self.advance * self.scale
    }

    /// Scaled advance of a single shape.
    pub fn advance_of(&self, shape: &Shape) -> f32 {
        shape.advance * self.scale
    }

    /// Whether some codepoints could not be resolved to glyphs in any face.
    pub fn missing_glyphs(&self) -> bool {
        self.missing_glyphs
    }

    pub fn set_missing_glyphs(&mut self) {
        self.missing_glyphs = true;
    }

    /// With a non-zero factor, `Alignment::Middle` vertically centers at
    /// `factor * (ascent - descent)` instead of the baseline.
    pub fn set_middle_line_factor(&mut self, factor: f32) {
        self.middle_line_factor = factor;
    }

    pub fn offset(&self, align_x: Alignment, align_y: Alignment) -> Vec2 {
        Vec2::new(self.offset_x(align_x), self.offset_y(align_y))
    }

    pub fn offset_x(&self, align: Alignment) -> f32 {
        match align {
            Alignment::Middle => -0.5 * self.advance(),
            Alignment::Right => -self.advance(),
            _ => 0.0,
        }
    }

    pub fn offset_y(&self, align: Alignment) -> f32 {
        match align {
            Alignment::Middle => {
                self.middle_line_factor * (self.metrics.ascent - self.metrics.descent) * self.scale
            }
            Alignment::Top => self.ascent(),
            Alignment::Bottom => -self.descent(),
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::{shape_flags as flags, Properties};

    fn test_layout(shapes: Vec<Shape>) -> LineLayout {
        let metrics = FaceMetrics {
            height: 12.0,
            ascent: 8.0,
            descent: 4.0,
            ..Default::default()
        };
        let font = Arc::new(Font::new(Properties::default()));
        LineLayout::new(font, shapes, metrics, Direction::LeftToRight)
    }

    #[test]
    fn advance_skips_cluster_continuations() {
        let layout = test_layout(vec![
            Shape::new(FaceId(0), 1, Vec2::ZERO, 6.0, flags::CLUSTER_START),
            Shape::new(FaceId(0), 2, Vec2::ZERO, 3.0, 0),
            Shape::new(FaceId(0), 3, Vec2::ZERO, 6.0, flags::CLUSTER_START),
        ]);

        assert_eq!(layout.advance(), 12.0);
    }

    #[test]
    fn alignment_offsets() {
        let mut layout = test_layout(vec![Shape::new(
            FaceId(0),
            1,
            Vec2::ZERO,
            10.0,
            flags::CLUSTER_START,
        )]);

        assert_eq!(layout.offset_x(Alignment::Left), 0.0);
        assert_eq!(layout.offset_x(Alignment::Middle), -5.0);
        assert_eq!(layout.offset_x(Alignment::Right), -10.0);

        assert_eq!(layout.offset_y(Alignment::Baseline), 0.0);
        assert_eq!(layout.offset_y(Alignment::Top), 8.0);
        assert_eq!(layout.offset_y(Alignment::Bottom), -4.0);

        assert_eq!(layout.offset_y(Alignment::Middle), 0.0);
        layout.set_middle_line_factor(-0.5);
        assert_eq!(layout.offset_y(Alignment::Middle), -2.0);

        layout.set_scale(2.0);
        assert_eq!(layout.offset_x(Alignment::Right), -20.0);
        assert_eq!(layout.height(), 24.0);
    }
}
