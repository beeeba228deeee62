//! Schema-bound configuration for confbind

pub mod codec;
pub mod error;
pub mod merge;
pub mod registry;
pub mod schema;
pub mod session;
pub mod validator;

pub use codec::{DocumentCodec, ParseFailure, SerializeFailure, TomlCodec};
pub use error::{
    extract_error_key, ConfigError, ConfigResult, ErrorKind, LoadError, ParseError, ParseErrorKind,
    SaveError, SchemaSaveError,
};
pub use registry::{SchemaRegistry, SchemaWriter};
pub use schema::{
    schema_file_path, wrapped_schema, write_schema, ConfigSchema, FieldDescriptor, FieldKind,
    SchemaNode, ValueKind, DEFAULT_ROOT_NAME,
};
pub use session::{ConfigSession, ConfigState, RootNamePolicy};
pub use validator::{ConfigValidator, ValidationIssue};
