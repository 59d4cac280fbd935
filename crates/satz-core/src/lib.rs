pub mod math;
pub mod path;
pub mod text;

mod atlas;
mod batch;
mod error;
mod renderer;

pub use self::atlas::*;
pub use self::batch::*;
pub use self::error::{Error, ErrorKind, Result};
pub use self::renderer::*;
