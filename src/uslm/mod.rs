//! Streaming USLM (United States Legislative Markup) parser.
//!
//! The parser walks a `title > chapter > section` document with a pull reader
//! and hands each finished section to a sink before reading further input.

mod content;
mod context;
pub mod parser;

pub use parser::UslmParser;
