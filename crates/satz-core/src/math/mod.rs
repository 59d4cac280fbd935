pub use glam::*;

mod matrix;
mod rect;

pub use self::matrix::*;
pub use self::rect::*;
