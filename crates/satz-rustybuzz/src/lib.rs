//! [HarfBuzz]-style shaping for satz, through [rustybuzz].
//!
//! [HarfBuzz]: https://harfbuzz.github.io/
//! [rustybuzz]: https://github.com/harfbuzz/rustybuzz

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec2;
use satz_core::text::{
    Direction, FaceId, FontFace, Language, Script, ShapedGlyph, ShapingEngine,
};

type FaceData = Arc<dyn AsRef<[u8]> + Send + Sync>;

self_cell::self_cell! {
    struct CachedFace {
        owner: FaceData,

        #[covariant]
        dependent: Face,
    }
}

type Face<'a> = rustybuzz::Face<'a>;

/// [`ShapingEngine`] backed by rustybuzz.
#[derive(Default)]
pub struct RustybuzzEngine {
    faces: HashMap<FaceId, CachedFace>,
    buffer: rustybuzz::UnicodeBuffer,
}

impl RustybuzzEngine {
    pub fn new() -> RustybuzzEngine {
        RustybuzzEngine::default()
    }

    /// Drops the cached parse of a face, e.g. after the face was unloaded.
    pub fn forget_face(&mut self, face: FaceId) {
        self.faces.remove(&face);
    }

    fn cached_face(&mut self, face: &FontFace, data: &FaceData) -> Option<&CachedFace> {
        let stale = self
            .faces
            .get(&face.id())
            .map_or(true, |cached| !Arc::ptr_eq(cached.borrow_owner(), data));

        if stale {
            let face_index = face.face_index();
            let cell = CachedFace::try_new(data.clone(), |data| {
                rustybuzz::Face::from_slice((**data).as_ref(), face_index).ok_or(())
            });

            match cell {
                Ok(cell) => {
                    self.faces.insert(face.id(), cell);
                }
                Err(()) => {
                    log::error!("Face {:?} could not be parsed for shaping", face.id());
                    return None;
                }
            }
        }

        self.faces.get(&face.id())
    }
}

fn convert_script(script: Script) -> Option<rustybuzz::Script> {
    let name = script.short_name().as_bytes();
    let tag = <[u8; 4]>::try_from(name).ok()?;
    rustybuzz::Script::from_iso15924_tag(rustybuzz::ttf_parser::Tag::from_bytes(&tag))
}

impl ShapingEngine for RustybuzzEngine {
    fn shape_run(
        &mut self,
        face: &FontFace,
        text: &str,
        script: Script,
        direction: Direction,
        language: Option<&Language>,
        out: &mut Vec<ShapedGlyph>,
    ) {
        let Some(data) = face.data() else {
            return;
        };

        let data = data.clone();
        let mut buffer = std::mem::take(&mut self.buffer);

        let Some(cached) = self.cached_face(face, &data) else {
            self.buffer = buffer;
            return;
        };
        let rb_face = cached.borrow_dependent();

        // Shaping happens in font units.
        let scale = face.size() / rb_face.units_per_em() as f32;

        buffer.push_str(text);

        if let Some(script) = convert_script(script) {
            buffer.set_script(script);
        }

        buffer.set_direction(match direction {
            Direction::LeftToRight => rustybuzz::Direction::LeftToRight,
            Direction::RightToLeft => rustybuzz::Direction::RightToLeft,
        });

        if let Some(language) = language {
            if let Ok(language) = language.as_str().parse::<rustybuzz::Language>() {
                buffer.set_language(language);
            }
        }

        let glyphs = rustybuzz::shape(rb_face, &[], buffer);

        for (info, pos) in glyphs.glyph_infos().iter().zip(glyphs.glyph_positions()) {
            out.push(ShapedGlyph {
                glyph_id: info.glyph_id as u16,
                cluster: info.cluster as usize,
                advance: pos.x_advance as f32 * scale,
                offset: Vec2::new(pos.x_offset as f32, -pos.y_offset as f32) * scale,
            });
        }

        self.buffer = glyphs.clear();
    }
}
