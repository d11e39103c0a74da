pub mod formatting;
pub mod truncation;

pub use truncation::head_chars;
