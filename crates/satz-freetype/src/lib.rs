//! Glyph rasterization for satz through [FreeType].
//!
//! [FreeType]: https://freetype.org/

use std::borrow::Borrow;
use std::collections::HashMap;
use std::sync::Arc;

use freetype::face::LoadFlag;
use freetype::Bitmap;
use glam::{UVec2, Vec2};
use satz_core::text::{FaceId, FontFace, RasterizedGlyph, Rasterizer};
use satz_core::{Error, ErrorKind, Result};

type FaceData = Arc<dyn AsRef<[u8]> + Send + Sync>;

/// Font bytes shared with the rest of the text stack.
struct FaceBuffer(FaceData);

impl Borrow<[u8]> for FaceBuffer {
    fn borrow(&self) -> &[u8] {
        (*self.0).as_ref()
    }
}

/// [`Rasterizer`] backed by FreeType, with hinting and antialiasing.
pub struct FreetypeRasterizer {
    library: freetype::Library,
    faces: HashMap<FaceId, (FaceData, freetype::Face<FaceBuffer>)>,
}

impl FreetypeRasterizer {
    pub fn new() -> Result<FreetypeRasterizer> {
        let library = freetype::Library::init()
            .map_err(|e| Error::wrap(ErrorKind::Other, e).with_context("freetype init failed"))?;

        Ok(FreetypeRasterizer {
            library,
            faces: HashMap::new(),
        })
    }

    /// Drops the cached FreeType face, e.g. after the face was unloaded.
    pub fn forget_face(&mut self, face: FaceId) {
        self.faces.remove(&face);
    }

    fn cached_face(
        &mut self,
        face: &FontFace,
        data: &FaceData,
    ) -> Option<&freetype::Face<FaceBuffer>> {
        let stale = self
            .faces
            .get(&face.id())
            .map_or(true, |(cached, _)| !Arc::ptr_eq(cached, data));

        if stale {
            let ft_face = match self
                .library
                .new_memory_face2(FaceBuffer(data.clone()), face.face_index() as isize)
            {
                Ok(ft_face) => ft_face,
                Err(e) => {
                    log::error!("Face {:?} could not be opened by freetype: {}", face.id(), e);
                    return None;
                }
            };

            let size = (face.size() * 64.0) as isize;
            if let Err(e) = ft_face.set_char_size(size, size, 72, 72) {
                log::error!("Failed to set size of face {:?}: {}", face.id(), e);
                return None;
            }

            self.faces.insert(face.id(), (data.clone(), ft_face));
        }

        self.faces.get(&face.id()).map(|(_, ft_face)| ft_face)
    }
}

/// Copies the bitmap into tightly packed rows, handling the upside-down
/// case of a negative pitch.
fn repack(bitmap: &Bitmap) -> Vec<u8> {
    let width = bitmap.width() as usize;
    let rows = bitmap.rows() as usize;
    let pitch = bitmap.pitch();
    let buffer = bitmap.buffer();

    let mut data = Vec::with_capacity(width * rows);

    for row in 0..rows {
        let src_row = if pitch >= 0 {
            row * pitch as usize
        } else {
            (rows - 1 - row) * (-pitch) as usize
        };
        data.extend_from_slice(&buffer[src_row..src_row + width]);
    }

    data
}

impl Rasterizer for FreetypeRasterizer {
    fn rasterize(&mut self, face: &FontFace, glyph_id: u16) -> Option<RasterizedGlyph> {
        let data = face.data()?.clone();
        let ft_face = self.cached_face(face, &data)?;

        if let Err(e) = ft_face.load_glyph(
            glyph_id as u32,
            LoadFlag::RENDER | LoadFlag::FORCE_AUTOHINT,
        ) {
            log::error!(
                "Failed to render glyph {} of face {:?}: {}",
                glyph_id,
                face.id(),
                e
            );
            return None;
        }

        let slot = ft_face.glyph();
        let bitmap = slot.bitmap();

        match bitmap.pixel_mode() {
            Ok(freetype::bitmap::PixelMode::Gray) => {}
            _ => return None,
        }

        let width = bitmap.width() as u32;
        let rows = bitmap.rows() as u32;
        if width == 0 || rows == 0 {
            return None;
        }

        Some(RasterizedGlyph {
            size: UVec2::new(width, rows),
            offset: Vec2::new(slot.bitmap_left() as f32, -slot.bitmap_top() as f32),
            data: repack(&bitmap),
        })
    }
}
