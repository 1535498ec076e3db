mod coord;
mod country;

pub use coord::*;
pub use country::*;
