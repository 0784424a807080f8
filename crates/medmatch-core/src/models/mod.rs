//! Domain models for the medmatch system.

mod product;
mod query;
mod resolution;

pub use product::*;
pub use query::*;
pub use resolution::*;
