//! Foundation types shared by the grammar front end, the interpreter and the
//! preview layer.
//!
//! - [`TextRange`], [`TextSize`] - byte offsets into input or grammar text
//! - [`LineCol`], [`LineIndex`] - line/column conversion
//!
//! This module has NO dependencies on other crate modules.

mod position;

pub use position::{LineCol, LineIndex};
pub use text_size::{TextRange, TextSize};
