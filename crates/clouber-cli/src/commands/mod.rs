//! CLI command handlers

pub mod describe;
pub mod render;
pub mod validate;
