//! Multilingual text layout: font management, itemization, shaping,
//! line breaking and alignment.

mod font;
mod font_manager;
mod itemizer;
mod lang;
mod layout;
mod rasterization;
mod shaper;
mod shaping;
mod wrap;

pub use self::font::*;
pub use self::font_manager::*;
pub use self::itemizer::*;
pub use self::lang::*;
pub use self::layout::*;
pub use self::rasterization::*;
pub use self::shaper::*;
pub use self::shaping::*;
pub use self::wrap::*;

pub use unicode_script::Script;

/// Horizontal direction of a text run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Direction {
    #[default]
    LeftToRight,
    RightToLeft,
}

/// Alignment of a laid out line relative to its anchor position.
///
/// The horizontal variants are `Middle`, `Left`, `Right` and `Block`, the
/// vertical ones `Middle`, `Top`, `Baseline` and `Bottom`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Alignment {
    Middle,
    #[default]
    Left,
    Right,
    Top,
    Baseline,
    Bottom,
    /// Justified text, stretching word spacing to fill the line width.
    Block,
}
