//! JSON Schema (drafts 3, 4, 6 and 7) compiled into reusable predicates.
//!
//! ```ignore
//! let schema = json_schema_jit::read(&schema_json)?;
//! let validator = json_schema_jit::compile(&schema)?;
//! assert!(validator.is_valid(&instance));
//! ```
pub mod compiler;
pub mod config;
pub mod equality;
pub mod error;
pub mod number;
pub mod path_de;
pub mod reader;
pub mod resolver;
pub mod schema;

pub use compiler::{compile, Compiler, Validator};
pub use config::{CompileOptions, Config, ReaderOptions};
pub use equality::deep_equals;
pub use error::{CompileError, ConfigError, ReadError};
pub use reader::{read, SchemaReader};
pub use resolver::{PreloadedResolver, Resolver};
pub use schema::{Draft, Schema, SchemaGraph, SchemaId, SchemaNode, SchemaType};
