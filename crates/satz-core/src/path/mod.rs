mod sampler;
mod spline;

pub use self::sampler::*;
pub use self::spline::*;
