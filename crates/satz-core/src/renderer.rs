use glam::Vec2;

use crate::math::{Quad, Rect};
use crate::{AtlasGlyph, MeshCallback, TextureCallback};

/// A single-channel coverage texture kept in CPU memory, with a dirty
/// region for incremental uploads.
pub struct TexturePage {
    width: u32,
    height: u32,
    data: Vec<u8>,
    dirty: Option<(u32, u32, u32, u32)>,
}

impl TexturePage {
    fn new(width: u32, height: u32) -> TexturePage {
        TexturePage {
            width,
            height,
            data: vec![0; (width * height) as usize],
            dirty: None,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The region touched since the last [`take_dirty`](Self::take_dirty),
    /// as `(min_x, min_y, max_x, max_y)` with exclusive maxima.
    pub fn dirty(&self) -> Option<(u32, u32, u32, u32)> {
        self.dirty
    }

    pub fn take_dirty(&mut self) -> Option<(u32, u32, u32, u32)> {
        self.dirty.take()
    }

    fn mark_dirty(&mut self, x: u32, y: u32, width: u32, height: u32) {
        let region = (x, y, x + width, y + height);
        self.dirty = Some(match self.dirty {
            None => region,
            Some((min_x, min_y, max_x, max_y)) => (
                min_x.min(region.0),
                min_y.min(region.1),
                max_x.max(region.2),
                max_y.max(region.3),
            ),
        });
    }

    /// Grows the page in place, keeping existing pixels at their positions.
    fn resize(&mut self, width: u32, height: u32) {
        if width <= self.width && height <= self.height {
            return;
        }

        let width = width.max(self.width);
        let height = height.max(self.height);

        let mut data = vec![0; (width * height) as usize];
        for row in 0..self.height {
            let src = (row * self.width) as usize;
            let dst = (row * width) as usize;
            data[dst..dst + self.width as usize]
                .copy_from_slice(&self.data[src..src + self.width as usize]);
        }

        self.width = width;
        self.height = height;
        self.data = data;
        self.mark_dirty(0, 0, width, height);
    }

    fn blit(&mut self, x: u32, y: u32, width: u32, height: u32, data: &[u8], padding: u32) {
        let padded_width = width + 2 * padding;
        let padded_height = height + 2 * padding;

        // Pages are reused after a clear, so the border is wiped too.
        for row in 0..padded_height {
            let start = ((y + row) * self.width + x) as usize;
            self.data[start..start + padded_width as usize].fill(0);
        }

        for row in 0..height {
            let src = (row * width) as usize;
            let dst = ((y + padding + row) * self.width + x + padding) as usize;
            self.data[dst..dst + width as usize]
                .copy_from_slice(&data[src..src + width as usize]);
        }

        self.mark_dirty(x, y, padded_width, padded_height);
    }
}

/// [`TextureCallback`] writing glyphs into CPU-side [`TexturePage`]s.
#[derive(Default)]
pub struct TexturePages {
    pages: Vec<TexturePage>,
}

impl TexturePages {
    pub fn new() -> TexturePages {
        TexturePages::default()
    }

    pub fn pages(&self) -> &[TexturePage] {
        &self.pages
    }

    pub fn pages_mut(&mut self) -> &mut [TexturePage] {
        &mut self.pages
    }
}

impl TextureCallback for TexturePages {
    fn add_texture(&mut self, id: usize, width: u32, height: u32) {
        if id == self.pages.len() {
            self.pages.push(TexturePage::new(width, height));
        } else if let Some(page) = self.pages.get_mut(id) {
            page.resize(width, height);
        } else {
            log::error!("Unexpected texture id {} for {} pages", id, self.pages.len());
        }
    }

    fn add_glyph(
        &mut self,
        id: usize,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        data: &[u8],
        padding: u32,
    ) {
        let Some(page) = self.pages.get_mut(id) else {
            log::error!("Glyph upload to unknown texture {}", id);
            return;
        };

        page.blit(x, y, width, height, data, padding);
    }
}

/// A textured glyph corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub position: Vec2,
    /// Texture coordinates in pixels.
    pub uv: Vec2,
}

/// Vertices sharing one atlas texture, four per glyph.
#[derive(Default)]
pub struct QuadBatch {
    pub vertices: Vec<Vertex>,
}

impl QuadBatch {
    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }
}

/// [`MeshCallback`] collecting glyph quads per atlas texture.
#[derive(Default)]
pub struct QuadBatcher {
    batches: Vec<QuadBatch>,
}

impl QuadBatcher {
    pub fn new() -> QuadBatcher {
        QuadBatcher::default()
    }

    pub fn batches(&self) -> &[QuadBatch] {
        &self.batches
    }

    pub fn clear(&mut self) {
        for batch in &mut self.batches {
            batch.vertices.clear();
        }
    }

    fn batch(&mut self, texture: usize) -> &mut QuadBatch {
        if texture >= self.batches.len() {
            self.batches.resize_with(texture + 1, QuadBatch::default);
        }
        &mut self.batches[texture]
    }
}

impl MeshCallback for QuadBatcher {
    fn draw_glyph_rect(&mut self, rect: &Rect, glyph: &AtlasGlyph) {
        let g = &glyph.glyph;
        let batch = self.batch(glyph.texture);

        batch.vertices.extend_from_slice(&[
            Vertex {
                position: rect.min,
                uv: Vec2::new(g.u1, g.v1),
            },
            Vertex {
                position: Vec2::new(rect.max.x, rect.min.y),
                uv: Vec2::new(g.u2, g.v1),
            },
            Vertex {
                position: rect.max,
                uv: Vec2::new(g.u2, g.v2),
            },
            Vertex {
                position: Vec2::new(rect.min.x, rect.max.y),
                uv: Vec2::new(g.u1, g.v2),
            },
        ]);
    }

    fn draw_glyph_quad(&mut self, quad: &Quad, glyph: &AtlasGlyph) {
        let g = &glyph.glyph;
        let batch = self.batch(glyph.texture);

        batch.vertices.extend_from_slice(&[
            Vertex {
                position: quad.p1,
                uv: Vec2::new(g.u1, g.v1),
            },
            Vertex {
                position: quad.p2,
                uv: Vec2::new(g.u1, g.v2),
            },
            Vertex {
                position: quad.p3,
                uv: Vec2::new(g.u2, g.v2),
            },
            Vertex {
                position: quad.p4,
                uv: Vec2::new(g.u2, g.v1),
            },
        ]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blit_keeps_padding_clear() {
        let mut pages = TexturePages::new();
        pages.add_texture(0, 16, 16);

        let data = vec![255u8; 4 * 4];
        pages.add_glyph(0, 2, 2, 4, 4, &data, 1);

        let page = &pages.pages()[0];
        // Padded border
        assert_eq!(page.data()[2 * 16 + 2], 0);
        // First bitmap pixel
        assert_eq!(page.data()[3 * 16 + 3], 255);
        // Last bitmap pixel
        assert_eq!(page.data()[6 * 16 + 6], 255);
        assert_eq!(page.data()[7 * 16 + 7], 0);

        assert_eq!(page.dirty(), Some((2, 2, 8, 8)));
    }

    #[test]
    fn quads_are_grouped_by_texture() {
        let mut batcher = QuadBatcher::new();

        let glyph = crate::Glyph {
            offset: Vec2::ZERO,
            size: Vec2::new(4.0, 4.0),
            u1: 0.0,
            v1: 0.0,
            u2: 4.0,
            v2: 4.0,
        };

        let rect = Rect::new(Vec2::ZERO, Vec2::new(4.0, 4.0));
        batcher.draw_glyph_rect(&rect, &AtlasGlyph { texture: 1, glyph });

        assert_eq!(batcher.batches().len(), 2);
        assert_eq!(batcher.batches()[0].quad_count(), 0);
        assert_eq!(batcher.batches()[1].quad_count(), 1);
        assert_eq!(batcher.batches()[1].vertices[2].position, Vec2::new(4.0, 4.0));
    }
}
