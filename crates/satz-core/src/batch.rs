use glam::Vec2;

use crate::math::{Quad, QuadMatrix, Rect};
use crate::text::{FontManager, LineLayout, Shape};
use crate::{AtlasGlyph, GlyphAtlas, GlyphKey, TextureCallback};

/// Receives the final glyph geometry. Implemented by whatever builds
/// vertex data out of it.
pub trait MeshCallback {
    fn draw_glyph_rect(&mut self, rect: &Rect, glyph: &AtlasGlyph);
    fn draw_glyph_quad(&mut self, quad: &Quad, glyph: &AtlasGlyph);
}

/// Accumulated pixel bounds of drawn glyphs.
#[derive(Clone, Copy, Debug)]
pub struct LineMetrics {
    pub min: Vec2,
    pub max: Vec2,
}

impl Default for LineMetrics {
    fn default() -> LineMetrics {
        LineMetrics {
            min: Vec2::MAX,
            max: Vec2::MIN,
        }
    }
}

impl LineMetrics {
    pub fn add_extents(&mut self, rect: &Rect) {
        self.min = self.min.min(rect.min);
        self.max = self.max.max(rect.max);
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }
}

/// Whether `rect` lies entirely beyond one side of `clip`.
fn rect_outside(clip: &Rect, rect: &Rect) -> bool {
    rect.min.x > clip.max.x
        || rect.max.x < clip.min.x
        || rect.min.y > clip.max.y
        || rect.max.y < clip.min.y
}

/// Whether all corners of `quad` lie beyond one side of `clip`.
fn quad_outside(clip: &Rect, quad: &Quad) -> bool {
    let corners = [quad.p1, quad.p2, quad.p3, quad.p4];

    corners.iter().all(|p| p.x > clip.max.x)
        || corners.iter().all(|p| p.x < clip.min.x)
        || corners.iter().all(|p| p.y > clip.max.y)
        || corners.iter().all(|p| p.y < clip.min.y)
}

/// Draws [`LineLayout`]s, pulling glyphs from the atlas and emitting
/// geometry through a [`MeshCallback`].
pub struct TextBatch<'a> {
    atlas: &'a mut GlyphAtlas,
    fonts: &'a mut FontManager,
    textures: &'a mut dyn TextureCallback,
    mesh: &'a mut dyn MeshCallback,
    clip: Option<Rect>,
    matrix: QuadMatrix,
}

impl<'a> TextBatch<'a> {
    pub fn new(
        atlas: &'a mut GlyphAtlas,
        fonts: &'a mut FontManager,
        textures: &'a mut dyn TextureCallback,
        mesh: &'a mut dyn MeshCallback,
    ) -> TextBatch<'a> {
        TextBatch {
            atlas,
            fonts,
            textures,
            mesh,
            clip: None,
            matrix: QuadMatrix::new(),
        }
    }

    /// Glyphs entirely outside the clip rect are not emitted.
    pub fn set_clip(&mut self, clip: Option<Rect>) {
        self.clip = clip;
    }

    pub fn matrix_mut(&mut self) -> &mut QuadMatrix {
        &mut self.matrix
    }

    fn rect_clipped(&self, rect: &Rect) -> bool {
        self.clip.as_ref().map_or(false, |clip| rect_outside(clip, rect))
    }

    fn quad_clipped(&self, quad: &Quad) -> bool {
        self.clip.as_ref().map_or(false, |clip| quad_outside(clip, quad))
    }

    fn setup_rect(layout: &LineLayout, shape: &Shape, position: Vec2, glyph: &AtlasGlyph) -> Rect {
        let scale = layout.scale();
        let min = position + (shape.position + glyph.glyph.offset) * scale;
        Rect::new(min, min + glyph.glyph.size * scale)
    }

    /// Draws a single shape at `position`. Returns `false` if the glyph
    /// could not be rasterized.
    pub fn draw_shape(
        &mut self,
        layout: &LineLayout,
        shape: &Shape,
        position: Vec2,
        mut metrics: Option<&mut LineMetrics>,
    ) -> bool {
        let key = GlyphKey {
            face: shape.face,
            glyph_id: shape.glyph_id,
        };

        let Some(glyph) = self.atlas.get_glyph(self.fonts, key, self.textures) else {
            return false;
        };

        let rect = Self::setup_rect(layout, shape, position, &glyph);

        if self.rect_clipped(&rect) {
            return true;
        }

        if let Some(metrics) = metrics.as_deref_mut() {
            metrics.add_extents(&rect);
        }

        self.mesh.draw_glyph_rect(&rect, &glyph);
        true
    }

    /// Draws a single shape transformed by the batch matrix. `position` is
    /// in pre-transform coordinates.
    pub fn draw_transformed_shape(
        &mut self,
        layout: &LineLayout,
        shape: &Shape,
        position: Vec2,
    ) -> bool {
        let key = GlyphKey {
            face: shape.face,
            glyph_id: shape.glyph_id,
        };

        let Some(glyph) = self.atlas.get_glyph(self.fonts, key, self.textures) else {
            return false;
        };

        let rect = Self::setup_rect(layout, shape, position, &glyph);
        let quad = self.matrix.transform_rect(&rect);

        if self.quad_clipped(&quad) {
            return true;
        }

        self.mesh.draw_glyph_quad(&quad, &glyph);
        true
    }

    /// Draws the whole line at `position`, starting a new row at each
    /// mandatory break. Returns the pen position after the last row.
    pub fn draw(
        &mut self,
        layout: &LineLayout,
        position: Vec2,
        mut metrics: Option<&mut LineMetrics>,
    ) -> Vec2 {
        let mut position = position;
        let start_x = position.x;

        for shape in layout.shapes() {
            if !shape.is_space() {
                self.draw_shape(layout, shape, position, metrics.as_deref_mut());
            }

            position.x += layout.advance_of(shape);

            if shape.must_break() {
                position.x = start_x;
                position.y += layout.height();
            }
        }

        position.y += layout.height();
        position
    }

    /// Draws shapes `start..end` in a single row. Returns the pen position
    /// after the range.
    pub fn draw_shape_range(
        &mut self,
        layout: &LineLayout,
        start: usize,
        end: usize,
        position: Vec2,
        mut metrics: Option<&mut LineMetrics>,
    ) -> Vec2 {
        let mut position = position;

        for shape in &layout.shapes()[start..end] {
            if !shape.is_space() {
                self.draw_shape(layout, shape, position, metrics.as_deref_mut());
            }
            position.x += layout.advance_of(shape);
        }

        position
    }

    /// Greedy line wrapping: rows are filled up to `width` and broken at
    /// the last break opportunity. Returns the overall size of the text.
    pub fn draw_clipped(
        &mut self,
        layout: &LineLayout,
        position: Vec2,
        width: f32,
        mut metrics: Option<&mut LineMetrics>,
    ) -> Vec2 {
        let mut position = position;
        let start_x = position.x;

        let mut line_width = 0.0;
        let mut start_shape = 0usize;
        let mut last_shape = 0usize;
        let mut last_width = 0.0;
        let mut advance = 0.0f32;

        for (i, shape) in layout.shapes().iter().enumerate() {
            line_width += layout.advance_of(shape);

            if !shape.is_cluster_start() {
                continue;
            }

            if shape.can_break() || shape.must_break() {
                last_shape = i + 1;
                last_width = line_width;
            }

            if last_shape != 0 && (line_width > width || shape.must_break()) {
                let end_shape = &layout.shapes()[last_shape - 1];
                if end_shape.is_space() {
                    line_width -= layout.advance_of(end_shape);
                    last_width -= layout.advance_of(end_shape);
                }

                let end = self.draw_shape_range(
                    layout,
                    start_shape,
                    last_shape,
                    position,
                    metrics.as_deref_mut(),
                );
                advance = advance.max(end.x);

                line_width -= last_width;
                start_shape = last_shape;
                last_shape = 0;

                position.x = start_x;
                position.y += layout.height();
            }
        }

        if start_shape < layout.shapes().len() {
            let end = self.draw_shape_range(
                layout,
                start_shape,
                layout.shapes().len(),
                position,
                metrics.as_deref_mut(),
            );
            advance = advance.max(end.x);
        }

        position.y += layout.height();
        Vec2::new(advance, position.y)
    }

    /// Draws a line previously wrapped by [`WordWrap`], using the offsets
    /// stored in the layout.
    ///
    /// [`WordWrap`]: crate::text::WordWrap
    pub fn draw_wrapped(
        &mut self,
        layout: &LineLayout,
        position: Vec2,
        mut metrics: Option<&mut LineMetrics>,
    ) {
        let mut offsets = layout.offsets.iter();

        for shape in layout.shapes() {
            if shape.is_space() {
                continue;
            }

            let Some(&offset) = offsets.next() else {
                break;
            };

            self.draw_shape(layout, shape, position + offset, metrics.as_deref_mut());
        }
    }

    /// Draws the line along a sampled path. Each glyph is positioned at the
    /// path point below its center and rotated to the path's direction.
    /// Returns the path offset after the last glyph.
    pub fn draw_along(
        &mut self,
        layout: &LineLayout,
        sampler: &crate::path::LineSampler,
        offset_x: f32,
        offset_y: f32,
    ) -> f32 {
        let mut offset_x = offset_x;
        let scale = layout.scale();

        for shape in layout.shapes() {
            let half = 0.5 * shape.advance * scale;
            offset_x += half;

            if !shape.is_space() {
                if let Some((position, angle)) = sampler.get(offset_x) {
                    self.matrix.set_translation(position);
                    self.matrix.rotate_z(angle);
                    self.draw_transformed_shape(layout, shape, Vec2::new(-half, offset_y));
                }
            }

            offset_x += half;
        }

        offset_x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip() -> Rect {
        Rect::new(Vec2::new(0.0, 0.0), Vec2::new(100.0, 50.0))
    }

    #[test]
    fn rects_outside_any_side_are_culled() {
        let clip = clip();

        let beyond = [
            Rect::from_pos_size(Vec2::new(110.0, 10.0), Vec2::splat(5.0)),
            Rect::from_pos_size(Vec2::new(-20.0, 10.0), Vec2::splat(5.0)),
            Rect::from_pos_size(Vec2::new(10.0, 60.0), Vec2::splat(5.0)),
            Rect::from_pos_size(Vec2::new(10.0, -20.0), Vec2::splat(5.0)),
        ];
        for rect in beyond {
            assert!(rect_outside(&clip, &rect), "{rect:?}");
        }

        // Partial overlap on an edge is kept
        let partial = Rect::from_pos_size(Vec2::new(95.0, 45.0), Vec2::splat(10.0));
        assert!(!rect_outside(&clip, &partial));
    }

    #[test]
    fn quads_are_culled_only_when_every_corner_is_beyond_one_side() {
        let clip = clip();
        let matrix = QuadMatrix::new();

        let outside =
            matrix.transform_rect(&Rect::from_pos_size(Vec2::new(120.0, 10.0), Vec2::splat(5.0)));
        assert!(quad_outside(&clip, &outside));

        // Corners beyond different sides still intersect the clip rect
        let spanning =
            matrix.transform_rect(&Rect::from_pos_size(Vec2::new(-10.0, -10.0), Vec2::splat(200.0)));
        assert!(!quad_outside(&clip, &spanning));
    }

    #[test]
    fn line_metrics_accumulate_extents() {
        let mut metrics = LineMetrics::default();
        metrics.add_extents(&Rect::new(Vec2::new(1.0, 2.0), Vec2::new(3.0, 4.0)));
        metrics.add_extents(&Rect::new(Vec2::new(-1.0, 3.0), Vec2::new(2.0, 8.0)));

        assert_eq!(metrics.min, Vec2::new(-1.0, 2.0));
        assert_eq!(metrics.max, Vec2::new(3.0, 8.0));
        assert_eq!(metrics.size(), Vec2::new(4.0, 6.0));
    }
}
