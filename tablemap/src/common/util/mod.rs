mod string_utils;
mod type_utils;

pub use string_utils::*;
pub use type_utils::*;
