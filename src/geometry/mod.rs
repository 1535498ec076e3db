mod centroid;
pub(crate) mod loader;
mod store;
mod worker;

pub use centroid::*;
pub use loader::{PropertyKeys, load_countries, parse_countries};
pub use store::*;
pub use worker::*;
