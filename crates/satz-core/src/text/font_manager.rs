use std::collections::HashMap;
use std::sync::Arc;

use crate::text::{FaceDescriptor, FaceId, Font, FontFace, Properties, Style};
use crate::{Error, ErrorKind, Result};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct FontKey {
    name: String,
    style: Style,
    size_bits: u32,
}

impl FontKey {
    fn new(name: &str, properties: &Properties) -> FontKey {
        FontKey {
            name: name.to_owned(),
            style: properties.style,
            size_bits: properties.base_size.to_bits(),
        }
    }
}

/// Owns every registered [`FontFace`] and caches [`Font`]s by name, style
/// and size.
///
/// Faces are identified by [`FaceId`] and shared between fonts; a face added
/// as a global fallback is appended to every font created afterwards.
#[derive(Default)]
pub struct FontManager {
    faces: Vec<FontFace>,
    fonts: HashMap<FontKey, Arc<Font>>,
    fallback_faces: Vec<FaceId>,
}

impl FontManager {
    pub fn new() -> FontManager {
        FontManager::default()
    }

    /// Registers a face to be loaded lazily at `base_size` pixels.
    pub fn add_face(&mut self, descriptor: FaceDescriptor, base_size: f32) -> FaceId {
        let id = FaceId(self.faces.len() as u16);
        self.faces.push(FontFace::new(id, descriptor, base_size));
        id
    }

    pub fn face(&self, id: FaceId) -> Option<&FontFace> {
        self.faces.get(id.0 as usize)
    }

    /// Returns the face after making sure it is loaded.
    pub fn load_face(&mut self, id: FaceId) -> Result<&FontFace> {
        let face = self
            .faces
            .get_mut(id.0 as usize)
            .ok_or_else(|| Error::new(ErrorKind::Other, format!("unknown face {:?}", id)))?;

        face.load()?;
        Ok(&self.faces[id.0 as usize])
    }

    /// Faces appended to every font created by
    /// [`add_font`](Self::add_font) from now on.
    pub fn set_fallback_faces(&mut self, faces: Vec<FaceId>) {
        self.fallback_faces = faces;
    }

    /// Creates (or returns the cached) font named `name`, with a primary
    /// face described by `descriptor` followed by the global fallbacks.
    pub fn add_font(
        &mut self,
        name: &str,
        properties: Properties,
        descriptor: FaceDescriptor,
    ) -> Arc<Font> {
        let key = FontKey::new(name, &properties);
        if let Some(font) = self.fonts.get(&key) {
            return font.clone();
        }

        let face = self.add_face(descriptor, properties.base_size);

        let mut font = Font::new(properties);
        font.add_face(face, None);
        font.add_faces(self.fallback_faces.iter().copied(), None);

        let font = Arc::new(font);
        self.fonts.insert(key, font.clone());
        font
    }

    pub fn get_font(&self, name: &str, properties: &Properties) -> Option<Arc<Font>> {
        self.fonts.get(&FontKey::new(name, properties)).cloned()
    }

    /// Caches a font assembled by the caller, e.g. one with per-language
    /// face lists.
    pub fn insert_font(&mut self, name: &str, font: Font) -> Arc<Font> {
        let key = FontKey::new(name, font.properties());
        let font = Arc::new(font);
        self.fonts.insert(key, font.clone());
        font
    }

    pub fn font_for(
        &mut self,
        name: &str,
        properties: Properties,
        descriptor: impl FnOnce() -> FaceDescriptor,
    ) -> Arc<Font> {
        if let Some(font) = self.get_font(name, &properties) {
            return font;
        }
        self.add_font(name, properties, descriptor())
    }

    /// Drops cached fonts nobody else holds, then unloads faces no longer
    /// referenced by any remaining font or the fallback list.
    pub fn unload_unused(&mut self) {
        self.fonts.retain(|_, font| Arc::strong_count(font) > 1);

        let mut live = vec![false; self.faces.len()];
        for font in self.fonts.values() {
            for id in font.all_face_ids() {
                live[id.0 as usize] = true;
            }
        }
        for id in &self.fallback_faces {
            live[id.0 as usize] = true;
        }

        for (face, live) in self.faces.iter_mut().zip(live) {
            if !live && face.is_loaded() {
                face.unload();
            }
        }
    }

    pub fn unload_all(&mut self) {
        for face in &mut self.faces {
            face.unload();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fonts_are_cached_by_name_style_and_size() {
        let mut manager = FontManager::new();

        let a = manager.add_font("default", Properties::default(), FaceDescriptor::path("a.ttf"));
        let b = manager.add_font("default", Properties::default(), FaceDescriptor::path("b.ttf"));
        assert!(Arc::ptr_eq(&a, &b));

        let bold = Properties {
            style: Style::Bold,
            ..Properties::default()
        };
        let c = manager.add_font("default", bold, FaceDescriptor::path("a.ttf"));
        assert!(!Arc::ptr_eq(&a, &c));
    }

    #[test]
    fn fallback_faces_are_appended() {
        let mut manager = FontManager::new();
        let fallback = manager.add_face(FaceDescriptor::path("fallback.ttf"), 16.0);
        manager.set_fallback_faces(vec![fallback]);

        let font =
            manager.add_font("default", Properties::default(), FaceDescriptor::path("a.ttf"));
        assert_eq!(font.face_ids(None).len(), 2);
        assert_eq!(font.face_ids(None)[1], fallback);
    }

    #[test]
    fn unload_unused_drops_unreferenced_fonts() {
        let mut manager = FontManager::new();
        let font =
            manager.add_font("default", Properties::default(), FaceDescriptor::path("a.ttf"));

        manager.unload_unused();
        assert!(manager.get_font("default", &Properties::default()).is_some());

        drop(font);
        manager.unload_unused();
        assert!(manager.get_font("default", &Properties::default()).is_none());
    }
}
