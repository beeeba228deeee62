//! Error taxonomy for configuration sessions
//!
//! Every failure surfaces as one of four kinds: save, load, parse and
//! schema-save. Parse errors are enriched with the offending key and line,
//! recovered from the raw document text when the codec only reports a byte
//! offset.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::codec::ParseFailure;

/// Result alias used throughout the configuration layer
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Coarse classification of a [`ConfigError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Save,
    Load,
    Parse,
    SchemaSave,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    SchemaSave(#[from] SchemaSaveError),
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::Save(_) => ErrorKind::Save,
            ConfigError::Load(_) => ErrorKind::Load,
            ConfigError::Parse(_) => ErrorKind::Parse,
            ConfigError::SchemaSave(_) => ErrorKind::SchemaSave,
        }
    }

    /// The parse error, if this is one
    pub fn as_parse(&self) -> Option<&ParseError> {
        match self {
            ConfigError::Parse(err) => Some(err),
            _ => None,
        }
    }

    /// The load error, if this is one
    pub fn as_load(&self) -> Option<&LoadError> {
        match self {
            ConfigError::Load(err) => Some(err),
            _ => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("Config::save: failed to write config to {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Config::save: failed to serialize config for {}: {message}", .path.display())]
    Serialize { path: PathBuf, message: String },
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("Config::load: config already loaded from file; refusing to load {}", .path.display())]
    AlreadyLoaded { path: PathBuf },
    #[error("Config::load: config file not found: {}", .0.display())]
    FileNotFound(PathBuf),
    #[error("Config::load: failed to read config from {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Config::load: config file {} has no root entry", .path.display())]
    MissingRoot { path: PathBuf },
    #[error(
        "Config::load: config file {} has {} root entries ({}); exactly one is required",
        .path.display(),
        .names.len(),
        .names.join(", ")
    )]
    MultipleRoots { path: PathBuf, names: Vec<String> },
    #[error("Config::load: root name mismatch: expected '{expected}', file has '{found}'")]
    RootNameMismatch { expected: String, found: String },
}

/// What kind of mismatch a [`ParseError`] describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// The document is not well-formed
    Syntax,
    /// A key is not part of the schema (strict mode)
    UnknownField,
    /// A value has the wrong shape for its field
    TypeMismatch,
    /// A fixed-size array has the wrong number of elements
    ArrayLength,
}

impl ParseErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseErrorKind::Syntax => "syntax error",
            ParseErrorKind::UnknownField => "unknown field",
            ParseErrorKind::TypeMismatch => "type mismatch",
            ParseErrorKind::ArrayLength => "wrong array length",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error(
    "Config::load: failed to parse config from {origin}{}: {}: {message} (Key: {key})",
    line_suffix(.line),
    .kind.as_str()
)]
pub struct ParseError {
    /// Where the document came from (file path or `command line`)
    pub origin: String,
    pub kind: ParseErrorKind,
    pub message: String,
    /// Best-effort offending key; `unknown` when nothing could be recovered
    pub key: String,
    /// 1-based line in the source document, when known
    pub line: Option<usize>,
}

fn line_suffix(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(" at line {line}"),
        None => String::new(),
    }
}

impl ParseError {
    pub fn new(
        origin: impl Into<String>,
        kind: ParseErrorKind,
        message: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        Self {
            origin: origin.into(),
            kind,
            message: message.into(),
            key: key.into(),
            line: None,
        }
    }

    /// Build a syntax error from a raw codec failure, recovering the key and
    /// line from `buffer` at the reported offset.
    pub fn from_failure(origin: impl Into<String>, buffer: &str, failure: ParseFailure) -> Self {
        let (key, line) = match failure.offset {
            Some(offset) if offset < buffer.len() => {
                (extract_error_key(buffer, offset), Some(line_number(buffer, offset)))
            }
            _ => (UNKNOWN_KEY.to_string(), None),
        };

        Self {
            origin: origin.into(),
            kind: ParseErrorKind::Syntax,
            message: failure.message,
            key,
            line,
        }
    }

    /// Build an error for a known dotted key path, locating its line in
    /// `buffer` when possible.
    pub fn at_key(
        origin: impl Into<String>,
        buffer: &str,
        kind: ParseErrorKind,
        message: impl Into<String>,
        key: impl Into<String>,
    ) -> Self {
        let key = key.into();
        let line = find_key_line(buffer, &key);
        Self {
            line,
            ..Self::new(origin, kind, message, key)
        }
    }
}

#[derive(Error, Debug)]
pub enum SchemaSaveError {
    #[error("No schema registered with name: {name}")]
    UnknownSchema { name: String },
    #[error("Failed to generate schema for {name}: {message}")]
    Generate { name: String, message: String },
    #[error("Failed to write schema to {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub(crate) const UNKNOWN_KEY: &str = "unknown";

/// Recover the key on the line containing byte `offset` of `buffer`.
///
/// The line is split on its first `=` or `:` and the trimmed left side is
/// returned. Without a separator (or with an empty left side) the whole
/// trimmed line is returned. Offsets past the end yield `unknown`.
pub fn extract_error_key(buffer: &str, offset: usize) -> String {
    let bytes = buffer.as_bytes();
    if offset >= bytes.len() {
        return UNKNOWN_KEY.to_string();
    }

    let mut line_start = offset;
    while line_start > 0 && bytes[line_start - 1] != b'\n' {
        line_start -= 1;
    }

    let mut line_end = offset;
    while line_end < bytes.len() && bytes[line_end] != b'\n' && bytes[line_end] != b'\r' {
        line_end += 1;
    }

    // Both bounds sit next to ASCII bytes, so they are char boundaries.
    let line = &buffer[line_start..line_end];

    if let Some(separator) = line.find(|c| c == '=' || c == ':') {
        let key = line[..separator].trim();
        if !key.is_empty() {
            return key.to_string();
        }
    }

    line.trim().to_string()
}

/// 1-based line number of byte `offset` in `buffer`
pub fn line_number(buffer: &str, offset: usize) -> usize {
    let end = offset.min(buffer.len());
    buffer.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}

/// Segments of a dotted key path, without array indices
fn path_segments(path: &str) -> Vec<&str> {
    path.split('.')
        .map(|segment| match segment.find('[') {
            Some(index) => &segment[..index],
            None => segment,
        })
        .filter(|segment| !segment.is_empty())
        .collect()
}

fn split_key(key: &str) -> Vec<&str> {
    key.split('.').map(|part| part.trim().trim_matches('"')).collect()
}

/// Find the first line that assigns `path` or opens the table it names.
///
/// Table headers are tracked, so `physics.flags` only matches a `flags` key
/// under a header ending in `physics` (or a dotted `physics.flags` key).
fn find_key_line(buffer: &str, path: &str) -> Option<usize> {
    let target = path_segments(path);
    if target.is_empty() {
        return None;
    }

    let mut header: Vec<&str> = Vec::new();
    for (index, line) in buffer.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let full: Vec<&str> = if let Some(rest) = trimmed.strip_prefix('[') {
            let rest = rest.trim_start_matches('[');
            header = split_key(rest.split(']').next().unwrap_or(rest));
            header.clone()
        } else {
            let Some((key, _)) = trimmed.split_once('=') else {
                continue;
            };
            header.iter().copied().chain(split_key(key)).collect()
        };

        if full.ends_with(&target) {
            return Some(index + 1);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_key_from_assignment() {
        let buffer = "[main]\ngravity = 10\nname = \"x\"\n";
        let offset = buffer.find("10").unwrap();
        assert_eq!(extract_error_key(buffer, offset), "gravity");
    }

    #[test]
    fn test_extract_key_with_colon_separator() {
        let buffer = "first\n  speed: fast\n";
        let offset = buffer.find("fast").unwrap();
        assert_eq!(extract_error_key(buffer, offset), "speed");
    }

    #[test]
    fn test_extract_key_without_separator_returns_trimmed_line() {
        let buffer = "[main]\n   just some words   \nnext = 1\n";
        let offset = buffer.find("some").unwrap();
        assert_eq!(extract_error_key(buffer, offset), "just some words");
    }

    #[test]
    fn test_extract_key_with_empty_key_returns_line() {
        let buffer = "a = 1\n = 2\n";
        let offset = buffer.find("2").unwrap();
        assert_eq!(extract_error_key(buffer, offset), "= 2");
    }

    #[test]
    fn test_extract_key_out_of_range() {
        assert_eq!(extract_error_key("a = 1", 5), "unknown");
        assert_eq!(extract_error_key("", 0), "unknown");
    }

    #[test]
    fn test_extract_key_handles_crlf() {
        let buffer = "[main]\r\nsteps = oops\r\n";
        let offset = buffer.find("oops").unwrap();
        assert_eq!(extract_error_key(buffer, offset), "steps");
    }

    #[test]
    fn test_line_number() {
        let buffer = "one\ntwo\nthree";
        assert_eq!(line_number(buffer, 0), 1);
        assert_eq!(line_number(buffer, 4), 2);
        assert_eq!(line_number(buffer, buffer.len() - 1), 3);
    }

    #[test]
    fn test_from_failure_enriches_key_and_line() {
        let buffer = "[main]\nx = 1\ngravity = = 10\n";
        let offset = buffer.find("= 10").unwrap();
        let failure = ParseFailure {
            message: "invalid string".to_string(),
            offset: Some(offset),
        };

        let err = ParseError::from_failure("cfg.toml", buffer, failure);
        assert_eq!(err.kind, ParseErrorKind::Syntax);
        assert_eq!(err.key, "gravity");
        assert_eq!(err.line, Some(3));
        assert!(err.to_string().contains("(Key: gravity)"));
        assert!(err.to_string().contains("at line 3"));
    }

    #[test]
    fn test_from_failure_without_offset() {
        let failure = ParseFailure {
            message: "broken".to_string(),
            offset: None,
        };
        let err = ParseError::from_failure("cfg.toml", "a = 1", failure);
        assert_eq!(err.key, "unknown");
        assert_eq!(err.line, None);
    }

    #[test]
    fn test_at_key_locates_line() {
        let buffer = "[main]\nname = \"a\"\n\n[main.physics]\nflags = [1, 2]\n";
        let err = ParseError::at_key(
            "cfg.toml",
            buffer,
            ParseErrorKind::ArrayLength,
            "expected 3 elements, found 2",
            "physics.flags",
        );
        assert_eq!(err.line, Some(5));

        let err = ParseError::at_key(
            "cfg.toml",
            buffer,
            ParseErrorKind::UnknownField,
            "unknown field",
            "physics",
        );
        assert_eq!(err.line, Some(4));
    }

    #[test]
    fn test_path_segments() {
        assert_eq!(path_segments("a.b.c"), vec!["a", "b", "c"]);
        assert_eq!(path_segments("flags[2]"), vec!["flags"]);
        assert_eq!(path_segments("items[0].name"), vec!["items", "name"]);
    }

    #[test]
    fn test_key_line_respects_enclosing_table() {
        let buffer = "[main]\nflags = 1\n\n[main.output]\nflags = 2\n\n[main.physics]\nflags = [1, 2]\n";
        assert_eq!(find_key_line(buffer, "flags"), Some(2));
        assert_eq!(find_key_line(buffer, "output.flags"), Some(5));
        assert_eq!(find_key_line(buffer, "physics.flags[1]"), Some(8));
        assert_eq!(find_key_line(buffer, "physics.missing"), None);
    }

    #[test]
    fn test_key_line_dotted_keys_and_table_arrays() {
        let buffer = "[main]\nphysics.flags = [1]\n\n[[main.items]]\nname = \"a\"\nbogus = 1\n";
        assert_eq!(find_key_line(buffer, "physics.flags"), Some(2));
        assert_eq!(find_key_line(buffer, "items[0].bogus"), Some(6));
        assert_eq!(find_key_line(buffer, "items"), Some(4));
    }

    #[test]
    fn test_error_kind() {
        let err: ConfigError = LoadError::FileNotFound(PathBuf::from("x.toml")).into();
        assert_eq!(err.kind(), ErrorKind::Load);
        assert!(err.as_load().is_some());
        assert!(err.as_parse().is_none());
        assert!(err.to_string().contains("x.toml"));
    }
}
