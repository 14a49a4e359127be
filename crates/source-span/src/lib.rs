//! Source position tracking for actiongen.
//!
//! Code generation consumes annotated source files and reports validation
//! diagnostics at their original locations. This crate provides the byte-offset
//! span type those diagnostics carry and a line index for offset ↔ line/column
//! conversion when formatting output.

mod line_index;
mod span;

pub use line_index::{LineCol, LineIndex};
pub use span::{ByteOffset, Span};
