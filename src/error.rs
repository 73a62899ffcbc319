//! Error taxonomy.
//!
//! `TranslateError` aborts the translation of one document. `SchemaError`
//! covers loading the schema model. `DecodeError` / `EncodeError` are what the
//! generated decoders and encoders report when the runtime evaluates them.
use async_graphql_parser::Pos;
use thiserror::Error;

use crate::path_de::JsonPathError;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("failed to parse GraphQL document: {0}")]
    Parse(#[from] async_graphql_parser::Error),

    #[error("Unknown GraphQL field '{field}' on type '{parent_type}' at {pos}")]
    UnknownField {
        field: String,
        parent_type: String,
        pos: Pos,
    },

    #[error("GraphQL schema does not define {operation} '{name}'")]
    UnknownOperation {
        operation: String,
        name: String,
        pos: Pos,
    },

    #[error("Fragment definition '{0}' not found at {1}")]
    UnknownFragment(String, Pos),

    #[error("Unknown type '{0}' at {1}")]
    UnknownType(String, Pos),

    #[error("not implemented: InlineFragment on {type_condition} at {pos}")]
    InlineFragmentOutsideUnion { type_condition: String, pos: Pos },

    #[error("inline fragments under union '{union}' need a type condition at {pos}")]
    UntypedInlineFragment { union: String, pos: Pos },

    #[error("must query field '__typename' on union types (missing for '{union}') at {pos}")]
    MissingTypename { union: String, pos: Pos },

    #[error("Unexpected field '{field}' on union '{union}', select it inside an inline fragment at {pos}")]
    UnexpectedUnionField {
        field: String,
        union: String,
        pos: Pos,
    },

    #[error("type '{type_condition}' is not a member of union '{union}' at {pos}")]
    NotAUnionMember {
        type_condition: String,
        union: String,
        pos: Pos,
    },

    #[error("field '{field}' of leaf type '{type_name}' must not have a selection set at {pos}")]
    UnexpectedSelectionSet {
        field: String,
        type_name: String,
        pos: Pos,
    },

    #[error("field '{field}' of type '{type_name}' needs a selection set at {pos}")]
    MissingSelectionSet {
        field: String,
        type_name: String,
        pos: Pos,
    },

    #[error("fragment '{0}' spreads itself at {1}")]
    FragmentCycle(String, Pos),

    #[error("{0} operations are not supported at {1}")]
    UnsupportedOperation(String, Pos),
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse schema SDL: {0}")]
    Sdl(#[from] async_graphql_parser::Error),

    #[error("invalid introspection JSON {0}")]
    Introspection(#[from] JsonPathError),

    #[error("unsupported type kind '{kind}' for '{name}'")]
    UnsupportedKind { kind: String, name: String },

    #[error("malformed type reference in '{0}'")]
    MalformedTypeRef(String),

    #[error("schema has no query root type")]
    MissingQueryType,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("Expecting {expected} but found {found}")]
    Expected { expected: &'static str, found: String },

    #[error("Expecting an object with a field named `{0}`")]
    MissingField(String),

    #[error("Unknown {enum_name}: {value}")]
    UnknownEnumValue { enum_name: String, value: String },

    #[error("Unexpected union type: {0}")]
    UnexpectedUnionType(String),

    #[error("no decoder named '{0}'")]
    UnknownDecoder(String),

    #[error("at field `{field}`: {source}")]
    InField {
        field: String,
        #[source]
        source: Box<DecodeError>,
    },

    #[error("at index {index}: {source}")]
    AtIndex {
        index: usize,
        #[source]
        source: Box<DecodeError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("cannot encode {found} as {expected}")]
    Mismatch { expected: &'static str, found: String },

    #[error("record is missing field `{0}`")]
    MissingField(String),

    #[error("no encoder named '{0}'")]
    UnknownEncoder(String),

    #[error("no operation named '{0}'")]
    UnknownOperation(String),
}
