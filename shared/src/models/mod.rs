//! Data models
//!
//! Field names follow the backend's camelCase JSON (`nombreMesa`,
//! `precioTotal`, ...); Rust names are the snake_case equivalents.

pub mod print_job;
pub mod template;

// Re-exports
pub use print_job::*;
pub use template::*;
