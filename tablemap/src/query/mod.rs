//! Composable SQL SELECT construction.

mod builder;

pub use builder::*;
