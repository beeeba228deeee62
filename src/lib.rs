//! confbind - typed, schema-bound configuration
//!
//! A schema is a plain record type deriving `Serialize`, `Deserialize`,
//! `JsonSchema` and `Default`. A [`ConfigSession`] binds one value of it to a
//! single-root TOML document with a one-shot load, atomic saves and JSON
//! schema export. The [`cli`] module exposes every leaf field as a
//! `--dotted.option` on a `clap` command.

pub mod cli;
pub mod config;
pub mod demo;
pub mod logging;

pub use config::{
    ConfigError, ConfigResult, ConfigSchema, ConfigSession, ConfigState, ErrorKind, RootNamePolicy,
    SchemaRegistry,
};

/// Result type alias for application-level operations
pub type Result<T> = anyhow::Result<T>;
