use thiserror::Error;

use crate::schema::SchemaId;

/// Structural problems in a schema document, found while reading/linking.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("schema at `{pointer}` must be an object or a boolean, found {found}")]
    NotASchema { pointer: String, found: &'static str },

    #[error("keyword `{keyword}` at `{pointer}` expects {expected}")]
    InvalidKeyword { keyword: &'static str, pointer: String, expected: &'static str },

    #[error("unknown type name `{name}` at `{pointer}`")]
    UnknownType { name: String, pointer: String },

    #[error("unsupported content encoding `{encoding}` at `{pointer}`")]
    UnknownContentEncoding { encoding: String, pointer: String },

    #[error("keyword `{keyword}` at `{pointer}` is not supported")]
    UnsupportedKeyword { keyword: &'static str, pointer: String },

    #[error("cannot resolve `$ref` \"{reference}\" at `{pointer}`")]
    UnresolvedReference { reference: String, pointer: String },

    #[error("`$ref` \"{reference}\" at `{pointer}` only refers back to itself")]
    CircularReference { reference: String, pointer: String },

    #[error("invalid JSON pointer `{0}`")]
    InvalidPointer(String),
}

/// A schema the compiler cannot give a meaning to.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("contentMediaType `{media_type}` on schema {node} is not supported")]
    UnsupportedMediaType { media_type: String, node: SchemaId },

    #[error("forward reference slot for schema {0} was never filled")]
    UnfilledSlot(SchemaId),

    #[error("schema {0} does not exist in the graph")]
    MissingNode(SchemaId),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config `{path}`: {source}")]
    Io { path: String, source: std::io::Error },

    #[error("invalid config `{path}` {message}")]
    Parse { path: String, message: String },
}
