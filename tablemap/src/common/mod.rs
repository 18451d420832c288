//! Common types shared across the crate: scalar values, sort order, and
//! small utilities.

mod sort_order;
mod util;
mod value;

pub use sort_order::*;
pub use util::*;
pub use value::*;
