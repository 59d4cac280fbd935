#![allow(dead_code)]

use glam::Vec2;
use satz_core::math::{Quad, Rect};
use satz_core::text::{
    Direction, FontFace, Language, RasterizedGlyph, Rasterizer, Script, ShapedGlyph,
    ShapingEngine,
};
use satz_core::{AtlasGlyph, MeshCallback, TextureCallback};

fn push_u16(data: &mut Vec<u8>, value: u16) {
    data.extend_from_slice(&value.to_be_bytes());
}

fn push_i16(data: &mut Vec<u8>, value: i16) {
    data.extend_from_slice(&value.to_be_bytes());
}

fn push_u32(data: &mut Vec<u8>, value: u32) {
    data.extend_from_slice(&value.to_be_bytes());
}

fn head_table() -> Vec<u8> {
    let mut t = Vec::new();
    push_u32(&mut t, 0x00010000); // version
    push_u32(&mut t, 0); // font revision
    push_u32(&mut t, 0); // checksum adjustment
    push_u32(&mut t, 0x5F0F3CF5); // magic
    push_u16(&mut t, 0); // flags
    push_u16(&mut t, 1000); // units per em
    t.extend_from_slice(&[0; 16]); // created + modified
    push_i16(&mut t, 0); // x min
    push_i16(&mut t, -200); // y min
    push_i16(&mut t, 1000); // x max
    push_i16(&mut t, 800); // y max
    push_u16(&mut t, 0); // mac style
    push_u16(&mut t, 8); // lowest rec ppem
    push_i16(&mut t, 2); // font direction hint
    push_i16(&mut t, 0); // index to loc format
    push_i16(&mut t, 0); // glyph data format
    t
}

fn hhea_table() -> Vec<u8> {
    let mut t = Vec::new();
    push_u32(&mut t, 0x00010000); // version
    push_i16(&mut t, 800); // ascender
    push_i16(&mut t, -200); // descender
    push_i16(&mut t, 0); // line gap
    push_u16(&mut t, 1000); // advance width max
    push_i16(&mut t, 0); // min left side bearing
    push_i16(&mut t, 0); // min right side bearing
    push_i16(&mut t, 1000); // x max extent
    push_i16(&mut t, 1); // caret slope rise
    push_i16(&mut t, 0); // caret slope run
    push_i16(&mut t, 0); // caret offset
    t.extend_from_slice(&[0; 8]); // reserved
    push_i16(&mut t, 0); // metric data format
    push_u16(&mut t, 0); // number of h metrics
    t
}

fn maxp_table() -> Vec<u8> {
    let mut t = Vec::new();
    push_u32(&mut t, 0x00005000); // version 0.5
    push_u16(&mut t, 256); // glyph count
    t
}

fn cmap_table(coverage: impl Fn(u8) -> u8) -> Vec<u8> {
    let mut t = Vec::new();
    push_u16(&mut t, 0); // version
    push_u16(&mut t, 1); // table count
    push_u16(&mut t, 0); // platform: unicode
    push_u16(&mut t, 3); // encoding: BMP
    push_u32(&mut t, 12); // subtable offset

    // Format 0: byte encoding table
    push_u16(&mut t, 0); // format
    push_u16(&mut t, 262); // length
    push_u16(&mut t, 0); // language
    for code in 0..=255u8 {
        t.push(coverage(code));
    }
    t
}

/// Builds a minimal font with the tables shaping and layout need. `coverage`
/// maps byte codepoints to glyph ids; everything above U+00FF is unmapped.
pub fn build_font(coverage: impl Fn(u8) -> u8) -> Vec<u8> {
    let tables = [
        (*b"cmap", cmap_table(coverage)),
        (*b"head", head_table()),
        (*b"hhea", hhea_table()),
        (*b"maxp", maxp_table()),
    ];

    let mut font = Vec::new();
    push_u32(&mut font, 0x00010000); // sfnt version
    push_u16(&mut font, tables.len() as u16);
    push_u16(&mut font, 64); // search range
    push_u16(&mut font, 2); // entry selector
    push_u16(&mut font, 0); // range shift

    let mut offset = 12 + 16 * tables.len() as u32;
    for (tag, data) in &tables {
        font.extend_from_slice(tag);
        push_u32(&mut font, 0); // checksum, unchecked by the parser
        push_u32(&mut font, offset);
        push_u32(&mut font, data.len() as u32);
        offset += data.len() as u32;
    }

    for (_, data) in &tables {
        font.extend_from_slice(data);
    }

    font
}

/// A font covering printable ASCII.
pub fn ascii_font() -> Vec<u8> {
    build_font(|code| if (0x20..0x7F).contains(&code) { code } else { 0 })
}

/// Maps every character to one glyph through the face's character map, one
/// cluster per character.
pub struct MockEngine {
    pub advance: f32,
    /// Emits a second zero-advance glyph for this character, exercising
    /// multi-glyph clusters.
    pub extra_glyph_for: Option<char>,
    /// Shapes this character pair as one glyph spanning both clusters,
    /// exercising ligatures.
    pub ligature_of: Option<(char, char)>,
}

impl Default for MockEngine {
    fn default() -> MockEngine {
        MockEngine {
            advance: 10.0,
            extra_glyph_for: None,
            ligature_of: None,
        }
    }
}

impl ShapingEngine for MockEngine {
    fn shape_run(
        &mut self,
        face: &FontFace,
        text: &str,
        _script: Script,
        _direction: Direction,
        _language: Option<&Language>,
        out: &mut Vec<ShapedGlyph>,
    ) {
        let mut chars = text.char_indices().peekable();

        while let Some((cluster, c)) = chars.next() {
            let glyph_id = face.glyph_index(c);

            if let Some((first, second)) = self.ligature_of {
                if c == first && glyph_id != 0 && chars.peek().map(|&(_, n)| n) == Some(second) {
                    chars.next();
                    out.push(ShapedGlyph {
                        glyph_id,
                        cluster,
                        advance: 2.0 * self.advance,
                        offset: Vec2::ZERO,
                    });
                    continue;
                }
            }

            out.push(ShapedGlyph {
                glyph_id,
                cluster,
                advance: self.advance,
                offset: Vec2::ZERO,
            });

            if self.extra_glyph_for == Some(c) && glyph_id != 0 {
                out.push(ShapedGlyph {
                    glyph_id,
                    cluster,
                    advance: 0.0,
                    offset: Vec2::ZERO,
                });
            }
        }
    }
}

/// Renders every glyph as a solid box whose size depends on the glyph id.
pub struct MockRasterizer;

impl Rasterizer for MockRasterizer {
    fn rasterize(&mut self, _face: &FontFace, glyph_id: u16) -> Option<RasterizedGlyph> {
        if glyph_id == 0 {
            return None;
        }

        let width = 4 + (glyph_id % 8) as u32;
        let height = 6 + (glyph_id % 5) as u32;

        Some(RasterizedGlyph {
            size: glam::UVec2::new(width, height),
            offset: Vec2::new(0.0, -(height as f32)),
            data: vec![255; (width * height) as usize],
        })
    }
}

/// Records texture creation and glyph uploads.
#[derive(Default)]
pub struct RecordingTextures {
    pub textures: Vec<(u32, u32)>,
    /// `(texture, x, y, width, height)` per upload.
    pub uploads: Vec<(usize, u32, u32, u32, u32)>,
}

impl TextureCallback for RecordingTextures {
    fn add_texture(&mut self, id: usize, width: u32, height: u32) {
        if id == self.textures.len() {
            self.textures.push((width, height));
        } else {
            self.textures[id] = (width, height);
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
        _padding: u32,
    ) {
        assert_eq!(data.len() as u32, width * height);
        self.uploads.push((id, x, y, width, height));
    }
}

/// Records emitted glyph geometry.
#[derive(Default)]
pub struct RecordingMesh {
    pub rects: Vec<(Rect, usize)>,
    pub quads: Vec<(Quad, usize)>,
}

impl MeshCallback for RecordingMesh {
    fn draw_glyph_rect(&mut self, rect: &Rect, glyph: &AtlasGlyph) {
        self.rects.push((*rect, glyph.texture));
    }

    fn draw_glyph_quad(&mut self, quad: &Quad, glyph: &AtlasGlyph) {
        self.quads.push((*quad, glyph.texture));
    }
}
