use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use smallvec::SmallVec;

use crate::text::Language;
use crate::{Error, ErrorKind, Result};

/// Identifier of a font face registered in a
/// [`FontManager`](crate::text::FontManager).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FaceId(pub u16);

/// Where the bytes of a font face come from.
pub enum FontSource {
    Path(PathBuf),
    Memory(Arc<dyn AsRef<[u8]> + Send + Sync>),
    /// Called once, when the face is first loaded.
    Loader(Box<dyn FnMut() -> Result<Vec<u8>> + Send>),
}

impl fmt::Debug for FontSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            FontSource::Memory(data) => f
                .debug_tuple("Memory")
                .field(&(**data).as_ref().len())
                .finish(),
            FontSource::Loader(_) => f.debug_tuple("Loader").finish(),
        }
    }
}

/// Describes how to load a single face.
#[derive(Debug)]
pub struct FaceDescriptor {
    pub source: FontSource,
    /// Index within a font collection.
    pub face_index: u32,
    /// Extra scale applied on top of the font size, for faces that render
    /// too small or too large at a nominal size.
    pub scale: f32,
}

impl FaceDescriptor {
    pub fn path(path: impl Into<PathBuf>) -> FaceDescriptor {
        FaceDescriptor {
            source: FontSource::Path(path.into()),
            face_index: 0,
            scale: 1.0,
        }
    }

    pub fn memory(data: impl AsRef<[u8]> + Send + Sync + 'static) -> FaceDescriptor {
        FaceDescriptor {
            source: FontSource::Memory(Arc::new(data)),
            face_index: 0,
            scale: 1.0,
        }
    }
}

/// Vertical metrics of a face, in pixels at the face's size.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FaceMetrics {
    pub height: f32,
    pub ascent: f32,
    pub descent: f32,
    pub underline_offset: f32,
    pub line_thickness: f32,
}

impl FaceMetrics {
    /// Component-wise maximum, used to combine metrics of the faces
    /// contributing glyphs to one line.
    pub fn expand(&mut self, other: &FaceMetrics) {
        self.height = self.height.max(other.height);
        self.ascent = self.ascent.max(other.ascent);
        self.descent = self.descent.max(other.descent);
        self.underline_offset = self.underline_offset.max(other.underline_offset);
        self.line_thickness = self.line_thickness.max(other.line_thickness);
    }
}

type ParsedFace<'a> = ttf_parser::Face<'a>;

self_cell::self_cell! {
    struct FaceCell {
        owner: Arc<dyn AsRef<[u8]> + Send + Sync>,

        #[covariant]
        dependent: ParsedFace,
    }
}

struct LoadedFace {
    cell: FaceCell,
    metrics: FaceMetrics,
    space_glyphs: SmallVec<[u16; 8]>,
}

/// Codepoints which should not produce visible glyphs.
const SPACE_SEPARATORS: &[char] = &[
    '\u{0020}', '\u{00A0}', '\u{1680}', '\u{2000}', '\u{2001}', '\u{2002}', '\u{2003}',
    '\u{2004}', '\u{2005}', '\u{2006}', '\u{2007}', '\u{2008}', '\u{2009}', '\u{200A}',
    '\u{202F}', '\u{205F}', '\u{3000}',
];

/// A single font face, loaded lazily from its [`FaceDescriptor`].
pub struct FontFace {
    id: FaceId,
    descriptor: FaceDescriptor,
    base_size: f32,
    invalid: bool,
    loaded: Option<LoadedFace>,
}

impl FontFace {
    pub(crate) fn new(id: FaceId, descriptor: FaceDescriptor, base_size: f32) -> FontFace {
        let base_size = base_size * descriptor.scale;
        FontFace {
            id,
            descriptor,
            base_size,
            invalid: false,
            loaded: None,
        }
    }

    pub fn id(&self) -> FaceId {
        self.id
    }

    /// The pixel size glyphs of this face are rasterized at.
    pub fn size(&self) -> f32 {
        self.base_size
    }

    pub fn face_index(&self) -> u32 {
        self.descriptor.face_index
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.is_some()
    }

    /// Loads and parses the face. Idempotent; a face that failed to load
    /// once fails immediately on subsequent calls.
    pub fn load(&mut self) -> Result<()> {
        if self.invalid {
            return Err(Error::new(
                ErrorKind::CachedFailure,
                format!("face {:?} failed to load before", self.id),
            ));
        }

        if self.loaded.is_some() {
            return Ok(());
        }

        let data: Arc<dyn AsRef<[u8]> + Send + Sync> = match &mut self.descriptor.source {
            FontSource::Path(path) => match std::fs::read(&*path) {
                Ok(bytes) => Arc::new(bytes),
                Err(e) => {
                    self.invalid = true;
                    let e = Error::from(e)
                        .with_context(format!("failed to read font from {}", path.display()));
                    log::error!("Font failed to load: {}", e);
                    return Err(e);
                }
            },
            FontSource::Memory(data) => data.clone(),
            FontSource::Loader(loader) => match loader() {
                Ok(bytes) => Arc::new(bytes),
                Err(e) => {
                    self.invalid = true;
                    log::error!("Font failed to load: {}", e);
                    return Err(e);
                }
            },
        };

        let face_index = self.descriptor.face_index;
        let cell = match FaceCell::try_new(data, |data| {
            ttf_parser::Face::parse((**data).as_ref(), face_index)
        }) {
            Ok(cell) => cell,
            Err(e) => {
                self.invalid = true;
                let e = Error::wrap(ErrorKind::InvalidFont, e)
                    .with_context(format!("failed to parse face {:?}", self.id));
                log::error!("Font failed to load: {}", e);
                return Err(e);
            }
        };

        let (metrics, space_glyphs) = {
            let face = cell.borrow_dependent();
            let scale = self.base_size / face.units_per_em() as f32;

            let ascent = face.ascender() as f32 * scale;
            let descent = -face.descender() as f32 * scale;
            let height =
                (face.ascender() - face.descender() + face.line_gap()) as f32 * scale;

            let (underline_offset, line_thickness) = face
                .underline_metrics()
                .map(|m| (-m.position as f32 * scale, m.thickness as f32 * scale))
                .unwrap_or((0.0, 0.0));

            let metrics = FaceMetrics {
                height,
                ascent,
                descent,
                underline_offset,
                line_thickness,
            };

            let mut space_glyphs = SmallVec::new();
            for &c in SPACE_SEPARATORS {
                if let Some(glyph) = face.glyph_index(c) {
                    if glyph.0 != 0 && !space_glyphs.contains(&glyph.0) {
                        space_glyphs.push(glyph.0);
                    }
                }
            }

            (metrics, space_glyphs)
        };

        self.loaded = Some(LoadedFace {
            cell,
            metrics,
            space_glyphs,
        });

        Ok(())
    }

    /// Drops the parsed face and its data, keeping the descriptor so the
    /// face can be loaded again.
    pub fn unload(&mut self) {
        self.loaded = None;
    }

    pub fn metrics(&self) -> Option<&FaceMetrics> {
        self.loaded.as_ref().map(|loaded| &loaded.metrics)
    }

    /// Whether `glyph_id` maps to a space separator in this face.
    pub fn is_space(&self, glyph_id: u16) -> bool {
        self.loaded
            .as_ref()
            .map_or(false, |loaded| loaded.space_glyphs.contains(&glyph_id))
    }

    /// Glyph index of `c`, or 0 when absent or the face is not loaded.
    pub fn glyph_index(&self, c: char) -> u16 {
        self.face()
            .and_then(|face| face.glyph_index(c))
            .map_or(0, |glyph| glyph.0)
    }

    pub fn face(&self) -> Option<&ttf_parser::Face<'_>> {
        self.loaded.as_ref().map(|loaded| loaded.cell.borrow_dependent())
    }

    /// The raw bytes of the loaded face, shared with shaping and
    /// rasterization backends.
    pub fn data(&self) -> Option<&Arc<dyn AsRef<[u8]> + Send + Sync>> {
        self.loaded.as_ref().map(|loaded| loaded.cell.borrow_owner())
    }
}

/// Weight and slant of a font.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Style {
    #[default]
    Regular,
    Bold,
    Italic,
    BoldItalic,
}

impl Style {
    pub fn from_name(name: &str) -> Option<Style> {
        match name {
            "regular" => Some(Style::Regular),
            "bold" => Some(Style::Bold),
            "italic" => Some(Style::Italic),
            "bold-italic" => Some(Style::BoldItalic),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Style::Regular => "regular",
            Style::Bold => "bold",
            Style::Italic => "italic",
            Style::BoldItalic => "bold-italic",
        }
    }
}

/// Size and style a font is requested at.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Properties {
    pub base_size: f32,
    pub style: Style,
}

impl Default for Properties {
    fn default() -> Properties {
        Properties {
            base_size: 16.0,
            style: Style::Regular,
        }
    }
}

/// An ordered set of fallback faces, with optional per-language overrides.
///
/// The first face containing the glyphs of a run wins; faces later in the
/// list only fill in what earlier ones are missing.
pub struct Font {
    properties: Properties,
    faces: SmallVec<[FaceId; 4]>,
    language_faces: HashMap<Language, SmallVec<[FaceId; 4]>>,
}

impl Font {
    pub fn new(properties: Properties) -> Font {
        Font {
            properties,
            faces: SmallVec::new(),
            language_faces: HashMap::new(),
        }
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    /// Appends a fallback face, either to the base list or to the list used
    /// for a specific language.
    pub fn add_face(&mut self, face: FaceId, language: Option<Language>) {
        match language {
            None => {
                if !self.faces.contains(&face) {
                    self.faces.push(face);
                }
            }
            Some(language) => {
                let faces = self.language_faces.entry(language).or_default();
                if !faces.contains(&face) {
                    faces.push(face);
                }
            }
        }
    }

    pub fn add_faces(
        &mut self,
        faces: impl IntoIterator<Item = FaceId>,
        language: Option<Language>,
    ) {
        match language {
            None => {
                for face in faces {
                    self.add_face(face, None);
                }
            }
            Some(language) => {
                for face in faces {
                    self.add_face(face, Some(language.clone()));
                }
            }
        }
    }

    /// The fallback list used for `language`, or the base list when there is
    /// no override for it.
    pub fn face_ids(&self, language: Option<&Language>) -> &[FaceId] {
        language
            .and_then(|language| self.language_faces.get(language))
            .map(|faces| faces.as_slice())
            .unwrap_or(&self.faces)
    }

    pub(crate) fn all_face_ids(&self) -> impl Iterator<Item = FaceId> + '_ {
        self.faces
            .iter()
            .copied()
            .chain(self.language_faces.values().flat_map(|v| v.iter().copied()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn face_metrics_expand() {
        let mut a = FaceMetrics {
            height: 10.0,
            ascent: 8.0,
            descent: 2.0,
            underline_offset: 1.0,
            line_thickness: 0.5,
        };
        let b = FaceMetrics {
            height: 12.0,
            ascent: 7.0,
            descent: 3.0,
            underline_offset: 0.5,
            line_thickness: 1.0,
        };

        a.expand(&b);
        assert_eq!(a.height, 12.0);
        assert_eq!(a.ascent, 8.0);
        assert_eq!(a.descent, 3.0);
        assert_eq!(a.underline_offset, 1.0);
        assert_eq!(a.line_thickness, 1.0);
    }

    #[test]
    fn language_face_fallback() {
        let mut font = Font::new(Properties::default());
        font.add_face(FaceId(0), None);
        font.add_face(FaceId(1), Some(Language::new("ar")));
        font.add_face(FaceId(0), None);

        assert_eq!(font.face_ids(None), &[FaceId(0)]);
        assert_eq!(font.face_ids(Some(&Language::new("ar"))), &[FaceId(1)]);
        assert_eq!(font.face_ids(Some(&Language::new("he"))), &[FaceId(0)]);
    }

    #[test]
    fn style_names_round_trip() {
        for style in [Style::Regular, Style::Bold, Style::Italic, Style::BoldItalic] {
            assert_eq!(Style::from_name(style.name()), Some(style));
        }
        assert_eq!(Style::from_name("wavy"), None);
    }
}
