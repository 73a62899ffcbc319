//! GraphQL operations to typed Elm clients.
//!
//! A document is translated against a [`schema::Schema`] into an
//! [`emit::Module`]: record aliases for results and variables, decoder and
//! encoder expression trees, enum and union declarations. [`codegen`] renders
//! the module as Elm source and [`runtime`] evaluates its trees against JSON.
pub mod cli;
pub mod codegen;
pub mod collect;
pub mod decoder;
pub mod emit;
pub mod encoder;
pub mod error;
pub mod ir;
pub mod lower;
pub mod naming;
pub mod navigator;
pub mod path_de;
pub mod printer;
pub mod runtime;
pub mod schema;
pub mod shape;
pub mod translate;
pub mod walker;

pub use error::{DecodeError, EncodeError, SchemaError, TranslateError};
pub use translate::{query_to_elm, translate_document, GenerateOptions, HttpMethod};
