use std::collections::{HashMap, HashSet};

use glam::Vec2;

use crate::text::{FaceId, FontManager, Rasterizer};

pub const DEFAULT_TEXTURE_SIZE: u32 = 512;

/// Identifies a rasterized glyph within the atlas.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GlyphKey {
    pub face: FaceId,
    pub glyph_id: u16,
}

/// A glyph's placement within an atlas texture. Coordinates are in pixels
/// and include the padding border.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Glyph {
    /// Offset from the pen position to the top-left corner of the padded
    /// bitmap.
    pub offset: Vec2,
    pub size: Vec2,
    pub u1: f32,
    pub v1: f32,
    pub u2: f32,
    pub v2: f32,
}

/// A [`Glyph`] together with the index of the texture it lives on.
#[derive(Clone, Copy, Debug)]
pub struct AtlasGlyph {
    pub texture: usize,
    pub glyph: Glyph,
}

/// Receives texture updates from the atlas. Implemented by whatever owns
/// the actual texture storage.
pub trait TextureCallback {
    /// A texture of the given size is needed. Called again with the same id
    /// when the texture grows; existing content must be preserved.
    fn add_texture(&mut self, id: usize, width: u32, height: u32);

    /// Uploads a rasterized glyph. `data` holds `width * height` coverage
    /// bytes; the destination rect at (`x`, `y`) is larger by `padding`
    /// pixels on every side.
    fn add_glyph(
        &mut self,
        id: usize,
        x: u32,
        y: u32,
        width: u32,
        height: u32,
        data: &[u8],
        padding: u32,
    );
}

#[derive(Clone, Copy, Debug)]
struct SkylineNode {
    x: i32,
    y: i32,
    width: i32,
}

/// Bottom-left skyline packer.
struct Skyline {
    width: i32,
    height: i32,
    nodes: Vec<SkylineNode>,
}

impl Skyline {
    fn new(width: u32, height: u32) -> Skyline {
        Skyline {
            width: width as i32,
            height: height as i32,
            nodes: vec![SkylineNode {
                x: 0,
                y: 0,
                width: width as i32,
            }],
        }
    }

    fn reset(&mut self) {
        self.nodes.clear();
        self.nodes.push(SkylineNode {
            x: 0,
            y: 0,
            width: self.width,
        });
    }

    /// Grows the skyline, exposing the new space to the right as an empty
    /// node.
    fn expand(&mut self, width: u32, height: u32) {
        let (width, height) = (width as i32, height as i32);

        if width > self.width {
            self.nodes.push(SkylineNode {
                x: self.width,
                y: 0,
                width: width - self.width,
            });
            self.width = width;
        }

        self.height = self.height.max(height);
    }

    /// The y position a rect of `width * height` would get when placed at
    /// node `index`, or `None` if it does not fit.
    fn rect_fits(&self, index: usize, width: i32, height: i32) -> Option<i32> {
        let x = self.nodes[index].x;
        if x + width > self.width {
            return None;
        }

        let mut y = self.nodes[index].y;
        let mut space_left = width;
        let mut i = index;

        while space_left > 0 {
            if i == self.nodes.len() {
                return None;
            }

            y = y.max(self.nodes[i].y);
            if y + height > self.height {
                return None;
            }

            space_left -= self.nodes[i].width;
            i += 1;
        }

        Some(y)
    }

    /// Inserts a node for a rect placed at (`x`, `y`), shrinking or removing
    /// the nodes it shadows and merging equal-height neighbors.
    fn add_skyline_level(&mut self, index: usize, x: i32, y: i32, width: i32, height: i32) {
        self.nodes.insert(
            index,
            SkylineNode {
                x,
                y: y + height,
                width,
            },
        );

        let mut i = index + 1;
        while i < self.nodes.len() {
            if self.nodes[i].x >= self.nodes[i - 1].x + self.nodes[i - 1].width {
                break;
            }

            let shrink = self.nodes[i - 1].x + self.nodes[i - 1].width - self.nodes[i].x;
            self.nodes[i].x += shrink;
            self.nodes[i].width -= shrink;

            if self.nodes[i].width > 0 {
                break;
            }

            self.nodes.remove(i);
        }

        let mut i = 0;
        while i + 1 < self.nodes.len() {
            if self.nodes[i].y == self.nodes[i + 1].y {
                self.nodes[i].width += self.nodes[i + 1].width;
                self.nodes.remove(i + 1);
            } else {
                i += 1;
            }
        }
    }

    /// Finds the bottom-left-most position for a `width * height` rect.
    fn add_rect(&mut self, width: u32, height: u32) -> Option<(u32, u32)> {
        let (width, height) = (width as i32, height as i32);

        let mut best: Option<(usize, i32, i32)> = None;
        let mut best_height = i32::MAX;
        let mut best_width = i32::MAX;

        for i in 0..self.nodes.len() {
            let Some(y) = self.rect_fits(i, width, height) else {
                continue;
            };

            if y + height < best_height
                || (y + height == best_height && self.nodes[i].width < best_width)
            {
                best = Some((i, self.nodes[i].x, y));
                best_height = y + height;
                best_width = self.nodes[i].width;
            }
        }

        let (index, x, y) = best?;
        self.add_skyline_level(index, x, y, width, height);
        Some((x as u32, y as u32))
    }
}

struct AtlasTexture {
    skyline: Skyline,
    glyphs: HashMap<GlyphKey, Glyph>,
}

impl AtlasTexture {
    fn new(size: u32) -> AtlasTexture {
        AtlasTexture {
            skyline: Skyline::new(size, size),
            glyphs: HashMap::new(),
        }
    }
}

/// Caches rasterized glyphs across one or more equally sized textures.
pub struct GlyphAtlas {
    textures: Vec<AtlasTexture>,
    /// Keys that failed to rasterize; never retried.
    failed: HashSet<GlyphKey>,
    rasterizer: Box<dyn Rasterizer>,
    texture_size: u32,
    padding: u32,
}

impl GlyphAtlas {
    pub fn new(rasterizer: Box<dyn Rasterizer>) -> GlyphAtlas {
        GlyphAtlas::with_texture_size(rasterizer, DEFAULT_TEXTURE_SIZE)
    }

    pub fn with_texture_size(rasterizer: Box<dyn Rasterizer>, texture_size: u32) -> GlyphAtlas {
        GlyphAtlas {
            textures: Vec::new(),
            failed: HashSet::new(),
            rasterizer,
            texture_size,
            padding: 1,
        }
    }

    pub fn texture_size(&self) -> u32 {
        self.texture_size
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    /// Returns the atlas entry for a glyph, rasterizing and uploading it on
    /// first use. `None` means the glyph cannot be displayed.
    pub fn get_glyph(
        &mut self,
        fonts: &mut FontManager,
        key: GlyphKey,
        textures: &mut dyn TextureCallback,
    ) -> Option<AtlasGlyph> {
        if key.glyph_id == 0 || self.failed.contains(&key) {
            return None;
        }

        for (texture, entry) in self.textures.iter().enumerate() {
            if let Some(&glyph) = entry.glyphs.get(&key) {
                return Some(AtlasGlyph { texture, glyph });
            }
        }

        self.create_glyph(fonts, key, textures)
    }

    fn create_glyph(
        &mut self,
        fonts: &mut FontManager,
        key: GlyphKey,
        textures: &mut dyn TextureCallback,
    ) -> Option<AtlasGlyph> {
        let face = match fonts.load_face(key.face) {
            Ok(face) => face,
            Err(e) => {
                log::error!("Font failed to load: {}", e);
                return None;
            }
        };

        let rasterized = self.rasterizer.rasterize(face, key.glyph_id);

        let Some(rasterized) = rasterized else {
            self.failed.insert(key);
            return None;
        };

        let padded_width = rasterized.size.x + 2 * self.padding;
        let padded_height = rasterized.size.y + 2 * self.padding;

        if padded_width > self.texture_size || padded_height > self.texture_size {
            log::error!(
                "Glyph {} of face {:?} is larger than the atlas texture",
                key.glyph_id,
                key.face,
            );
            self.failed.insert(key);
            return None;
        }

        let mut placed = None;
        for (texture, entry) in self.textures.iter_mut().enumerate() {
            if let Some((x, y)) = entry.skyline.add_rect(padded_width, padded_height) {
                placed = Some((texture, x, y));
                break;
            }
        }

        let (texture, x, y) = match placed {
            Some(placed) => placed,
            None => {
                let texture = self.textures.len();
                self.textures.push(AtlasTexture::new(self.texture_size));
                textures.add_texture(texture, self.texture_size, self.texture_size);

                let (x, y) = self.textures[texture]
                    .skyline
                    .add_rect(padded_width, padded_height)?;
                (texture, x, y)
            }
        };

        textures.add_glyph(
            texture,
            x,
            y,
            rasterized.size.x,
            rasterized.size.y,
            &rasterized.data,
            self.padding,
        );

        let glyph = Glyph {
            offset: rasterized.offset - Vec2::splat(self.padding as f32),
            size: Vec2::new(padded_width as f32, padded_height as f32),
            u1: x as f32,
            v1: y as f32,
            u2: (x + padded_width) as f32,
            v2: (y + padded_height) as f32,
        };

        self.textures[texture].glyphs.insert(key, glyph);

        Some(AtlasGlyph { texture, glyph })
    }

    /// Grows one texture to `size * size`, keeping its glyphs in place.
    /// Ignored when the texture is already at least that large.
    pub fn grow_texture(
        &mut self,
        texture: usize,
        size: u32,
        textures: &mut dyn TextureCallback,
    ) {
        let Some(entry) = self.textures.get_mut(texture) else {
            return;
        };

        if size <= entry.skyline.width as u32 {
            return;
        }

        entry.skyline.expand(size, size);
        textures.add_texture(texture, size, size);
    }

    /// Discards all glyphs on one texture, making its space reusable. The
    /// texture itself stays allocated.
    pub fn clear_texture(&mut self, texture: usize) {
        if let Some(entry) = self.textures.get_mut(texture) {
            entry.skyline.reset();
            entry.glyphs.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skyline_packs_bottom_left() {
        let mut skyline = Skyline::new(64, 64);

        assert_eq!(skyline.add_rect(16, 16), Some((0, 0)));
        assert_eq!(skyline.add_rect(16, 8), Some((16, 0)));
        // Shorter column is preferred
        assert_eq!(skyline.add_rect(8, 8), Some((32, 0)));
    }

    #[test]
    fn skyline_rejects_oversized_rects() {
        let mut skyline = Skyline::new(32, 32);

        assert_eq!(skyline.add_rect(64, 8), None);
        assert_eq!(skyline.add_rect(8, 64), None);
    }

    #[test]
    fn skyline_fills_up_and_resets() {
        let mut skyline = Skyline::new(32, 32);

        for _ in 0..4 {
            for _ in 0..4 {
                assert!(skyline.add_rect(8, 8).is_some());
            }
        }
        assert_eq!(skyline.add_rect(8, 8), None);

        skyline.reset();
        assert_eq!(skyline.add_rect(8, 8), Some((0, 0)));
    }

    #[test]
    fn skyline_expand_adds_space() {
        let mut skyline = Skyline::new(32, 32);

        assert_eq!(skyline.add_rect(32, 8), Some((0, 0)));
        assert_eq!(skyline.add_rect(8, 8), Some((0, 8)));

        skyline.expand(64, 64);

        // The new space starts at ground level
        assert_eq!(skyline.add_rect(16, 8), Some((32, 0)));
        assert_eq!(skyline.add_rect(8, 48), Some((48, 0)));
    }

    #[test]
    fn packed_rects_never_overlap() {
        let mut skyline = Skyline::new(128, 128);
        let mut placed: Vec<(u32, u32, u32, u32)> = Vec::new();

        // Varied sizes from a small multiplicative generator
        let mut state = 7u32;
        for _ in 0..64 {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            let width = 4 + (state >> 8) % 24;
            let height = 4 + (state >> 16) % 24;

            if let Some((x, y)) = skyline.add_rect(width, height) {
                assert!(x + width <= 128 && y + height <= 128);
                placed.push((x, y, width, height));
            }
        }

        assert!(placed.len() > 8);

        for (i, &(x1, y1, w1, h1)) in placed.iter().enumerate() {
            for &(x2, y2, w2, h2) in &placed[i + 1..] {
                let disjoint =
                    x1 + w1 <= x2 || x2 + w2 <= x1 || y1 + h1 <= y2 || y2 + h2 <= y1;
                assert!(
                    disjoint,
                    "({x1},{y1},{w1},{h1}) overlaps ({x2},{y2},{w2},{h2})"
                );
            }
        }
    }

    #[test]
    fn skyline_merges_equal_levels() {
        let mut skyline = Skyline::new(32, 32);

        assert_eq!(skyline.add_rect(16, 8), Some((0, 0)));
        assert_eq!(skyline.add_rect(16, 8), Some((16, 0)));
        // Both columns have the same height again, so a wide rect fits on top
        assert_eq!(skyline.add_rect(32, 8), Some((0, 8)));
    }
}
