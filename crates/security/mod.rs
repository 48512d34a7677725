pub mod sanitizer;
pub mod tokens;
