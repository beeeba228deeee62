//! Document codecs: conversion between text and an untyped TOML table

use thiserror::Error;

/// A raw failure reported by a codec while parsing text.
///
/// `offset` is a byte offset into the parsed buffer when the codec can
/// point at the failure.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ParseFailure {
    pub message: String,
    pub offset: Option<usize>,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct SerializeFailure {
    pub message: String,
}

/// Parser/serializer collaborator used by a configuration session
#[cfg_attr(test, mockall::automock)]
pub trait DocumentCodec: Send + Sync {
    /// Parse `text` into a top-level table
    fn parse(&self, text: &str) -> Result<toml::Table, ParseFailure>;

    /// Render a top-level table as text
    fn serialize(&self, document: &toml::Table) -> Result<String, SerializeFailure>;
}

/// TOML codec backed by the `toml` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlCodec;

impl DocumentCodec for TomlCodec {
    fn parse(&self, text: &str) -> Result<toml::Table, ParseFailure> {
        text.parse::<toml::Table>().map_err(|e| ParseFailure {
            message: e.message().to_string(),
            offset: e.span().map(|span| span.start),
        })
    }

    fn serialize(&self, document: &toml::Table) -> Result<String, SerializeFailure> {
        toml::to_string_pretty(document).map_err(|e| SerializeFailure {
            message: e.to_string(),
        })
    }
}
