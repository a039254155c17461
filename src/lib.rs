//! Named variables and restricted arithmetic for Markdown-like pages.
//!
//! Each page's raw source is tokenized into text, definitions and calls,
//! resolved against a document-wide [`VariableStore`] until nothing more
//! changes, and handed back as plain text for the host renderer.

pub mod ast;
pub mod error;
pub mod link;
pub mod math;
pub mod numbers;
pub mod parser;
pub mod processor;
pub mod store;

pub use ast::{Fragment, Prefix, Token, VarRecord, Variable};
pub use error::MathError;
pub use processor::{Options, PreprocessingReader, VarContext};
pub use store::{Lookup, VariableStore};
