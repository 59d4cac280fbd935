//! Multilingual text layout and rasterization: font fallback, bidi
//! itemization, shaping, glyph atlases and line breaking.
//!
//! The `rustybuzz` and `freetype` features (both enabled by default) wire
//! in the standard shaping and rasterization backends; custom backends can
//! be plugged in through the [`ShapingEngine`](text::ShapingEngine) and
//! [`Rasterizer`](text::Rasterizer) traits.

pub use satz_core::*;

pub mod text {
    pub use satz_core::text::*;

    #[cfg(feature = "freetype")]
    pub use satz_freetype::FreetypeRasterizer;
    #[cfg(feature = "rustybuzz")]
    pub use satz_rustybuzz::RustybuzzEngine;
}

use std::sync::Arc;

use satz_core::math::Vec2;
use text::{
    Alignment, Direction, Font, FontManager, Language, LineLayout, Rasterizer, ShapingEngine,
    TextShaper, WordWrap,
};

/// Everything needed to lay out text: a font manager, a shaper and a glyph
/// atlas, bundled for convenience.
pub struct TextEngine {
    fonts: FontManager,
    shaper: TextShaper,
    atlas: GlyphAtlas,
    wrap: WordWrap,
}

impl TextEngine {
    /// Creates an engine with the default backends.
    #[cfg(all(feature = "freetype", feature = "rustybuzz"))]
    pub fn new() -> Result<TextEngine> {
        Ok(TextEngine::with_backends(
            Box::new(text::RustybuzzEngine::new()),
            Box::new(text::FreetypeRasterizer::new()?),
        ))
    }

    pub fn with_backends(
        engine: Box<dyn ShapingEngine>,
        rasterizer: Box<dyn Rasterizer>,
    ) -> TextEngine {
        TextEngine {
            fonts: FontManager::new(),
            shaper: TextShaper::new(engine),
            atlas: GlyphAtlas::new(rasterizer),
            wrap: WordWrap::new(),
        }
    }

    pub fn fonts(&self) -> &FontManager {
        &self.fonts
    }

    pub fn fonts_mut(&mut self) -> &mut FontManager {
        &mut self.fonts
    }

    pub fn shaper_mut(&mut self) -> &mut TextShaper {
        &mut self.shaper
    }

    pub fn atlas_mut(&mut self) -> &mut GlyphAtlas {
        &mut self.atlas
    }

    /// Shapes a line of text. See [`TextShaper::shape`].
    pub fn shape(
        &mut self,
        font: &Arc<Font>,
        text: &str,
        lang_hint: Option<&Language>,
        direction: Option<Direction>,
    ) -> LineLayout {
        self.shaper
            .shape(font, &mut self.fonts, text, lang_hint, direction)
    }

    /// Breaks a shaped line into rows. See [`WordWrap::wrap_line`].
    pub fn wrap_line(
        &mut self,
        layout: &mut LineLayout,
        width: f32,
        max_width: f32,
        align: Alignment,
    ) -> Result<Vec2> {
        self.wrap.wrap_line(layout, width, max_width, align)
    }

    /// Starts drawing with this engine's atlas and fonts.
    pub fn batch<'a>(
        &'a mut self,
        textures: &'a mut dyn TextureCallback,
        mesh: &'a mut dyn MeshCallback,
    ) -> TextBatch<'a> {
        TextBatch::new(&mut self.atlas, &mut self.fonts, textures, mesh)
    }
}
