//! Typed configuration sessions
//!
//! A [`ConfigSession`] owns one value of a schema type and binds it to a
//! single-root TOML document:
//!
//! ```toml
//! [main]
//! name = "simulation"
//! max_steps = 1000
//!
//! [main.physics]
//! gravity = 9.81
//! ```
//!
//! Loading runs parse, validate, unwrap and adopt. Any failure leaves the
//! session exactly as it was. A session loads from a file at most once.

use std::fmt;
use std::fs;
use std::io;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use toml::{Table, Value};
use tracing::{debug, info, warn};

use crate::config::codec::{DocumentCodec, SerializeFailure, TomlCodec};
use crate::config::error::{ConfigResult, LoadError, ParseError, ParseErrorKind, SaveError};
use crate::config::merge::{insert_dotted, overlay, MissingKeys};
use crate::config::schema::{write_schema, ConfigSchema, SchemaNode, DEFAULT_ROOT_NAME};
use crate::config::validator::ConfigValidator;

/// Lifecycle of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigState {
    #[default]
    Default,
    LoadedFromFile,
}

impl ConfigState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigState::Default => "DEFAULT",
            ConfigState::LoadedFromFile => "LOADED_FROM_FILE",
        }
    }
}

impl fmt::Display for ConfigState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the root name of a loaded file is reconciled with the session's
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RootNamePolicy {
    /// Adopt whatever root name the file uses
    FromFile,
    /// Reject files whose root name differs from the current one
    #[default]
    KeepCurrent,
}

pub struct ConfigSession<T: ConfigSchema> {
    content: T,
    root_name: String,
    state: ConfigState,
    policy: RootNamePolicy,
    strict: bool,
    schema: SchemaNode,
    codec: Box<dyn DocumentCodec>,
}

impl<T: ConfigSchema> ConfigSession<T> {
    /// A session holding `T::default()` under the root name `main`
    pub fn new() -> Self {
        Self::with_codec(TomlCodec)
    }

    pub fn with_codec(codec: impl DocumentCodec + 'static) -> Self {
        Self {
            content: T::default(),
            root_name: DEFAULT_ROOT_NAME.to_string(),
            state: ConfigState::Default,
            policy: RootNamePolicy::default(),
            strict: true,
            schema: SchemaNode::of::<T>(),
            codec: Box::new(codec),
        }
    }

    /// Load the configuration from `path`.
    ///
    /// Fails if the session was already loaded, if the file is missing or
    /// unreadable, if the document does not match the schema, or (under
    /// [`RootNamePolicy::KeepCurrent`]) if its root name differs.
    pub fn load(&mut self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();

        if self.state == ConfigState::LoadedFromFile {
            warn!(path = %path.display(), "Config already loaded; reload refused");
            return Err(LoadError::AlreadyLoaded {
                path: path.to_path_buf(),
            }
            .into());
        }

        if !path.is_file() {
            return Err(LoadError::FileNotFound(path.to_path_buf()).into());
        }

        let buffer = fs::read_to_string(path).map_err(|source| LoadError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let origin = path.display().to_string();

        debug!(path = %origin, bytes = buffer.len(), "Parsing config");
        let document = self
            .codec
            .parse(&buffer)
            .map_err(|failure| ParseError::from_failure(&origin, &buffer, failure))?;

        let (root_name, root_value) = unwrap_root(path, document)?;
        let table = match root_value {
            Value::Table(table) => table,
            other => {
                return Err(ParseError::at_key(
                    &origin,
                    &buffer,
                    ParseErrorKind::TypeMismatch,
                    format!("expected a table under the root, found {}", other.type_str()),
                    &root_name,
                )
                .into());
            }
        };
        let content =
            self.unwrap_value(&origin, &buffer, &root_name, table, MissingKeys::ClearOptional)?;

        if self.policy == RootNamePolicy::KeepCurrent && root_name != self.root_name {
            warn!(
                expected = %self.root_name,
                found = %root_name,
                "Root name mismatch; loaded value discarded"
            );
            return Err(LoadError::RootNameMismatch {
                expected: self.root_name.clone(),
                found: root_name,
            }
            .into());
        }

        self.root_name = root_name;
        self.content = content;
        self.state = ConfigState::LoadedFromFile;

        info!(path = %origin, root = %self.root_name, "Config loaded");
        Ok(())
    }

    /// Validate the root entry and deserialize it over the current value.
    ///
    /// Required keys absent from `table` keep their current values; absent
    /// optional keys follow `missing`.
    fn unwrap_value(
        &self,
        origin: &str,
        buffer: &str,
        root_name: &str,
        table: Table,
        missing: MissingKeys,
    ) -> Result<T, ParseError> {
        ConfigValidator::new(&self.schema, self.strict)
            .validate(&table)
            .map_err(|issue| ParseError::at_key(origin, buffer, issue.kind, issue.message, issue.key))?;

        let mut merged = match self.content_table() {
            Ok(table) => table,
            Err(failure) => {
                debug!(error = %failure, "Current value not representable; deserializing file alone");
                Table::new()
            }
        };
        overlay(&mut merged, table, &self.schema, missing);

        serde_path_to_error::deserialize::<_, T>(Value::Table(merged)).map_err(|err| {
            let key = match err.path().to_string() {
                path if path == "." => root_name.to_string(),
                path => path,
            };
            ParseError::at_key(
                origin,
                buffer,
                ParseErrorKind::TypeMismatch,
                err.inner().message().to_string(),
                key,
            )
        })
    }

    /// Write values at dotted paths (`physics.gravity`) into the live value.
    ///
    /// The overrides are validated like a loaded document and applied all
    /// together; on failure the live value is unchanged. Lifecycle state is
    /// not affected. Returns the number of values applied.
    pub fn apply_overrides(
        &mut self,
        origin: &str,
        overrides: Vec<(String, Value)>,
    ) -> ConfigResult<usize> {
        if overrides.is_empty() {
            return Ok(0);
        }

        let count = overrides.len();
        let mut layer = Table::new();
        for (path, value) in overrides {
            debug!(key = %path, origin, "Applying override");
            insert_dotted(&mut layer, &path, value);
        }

        let content = self.unwrap_value(origin, "", &self.root_name, layer, MissingKeys::Keep)?;
        self.content = content;
        Ok(count)
    }

    /// Save the configuration to `path`, wrapped under the current root name.
    pub fn save(&self, path: impl AsRef<Path>) -> ConfigResult<()> {
        let path = path.as_ref();

        let content = self
            .to_document_string()
            .map_err(|failure| SaveError::Serialize {
                path: path.to_path_buf(),
                message: failure.message,
            })?;

        write_file_atomic(path, &content).map_err(|source| SaveError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        info!(path = %path.display(), root = %self.root_name, "Config saved");
        Ok(())
    }

    /// Save to `<schema name>.toml` in the working directory
    pub fn save_to_default(&self) -> ConfigResult<PathBuf> {
        let path = Self::default_file_name();
        self.save(&path)?;
        Ok(path)
    }

    pub fn default_file_name() -> PathBuf {
        PathBuf::from(format!("{}.toml", T::config_name()))
    }

    /// Write the JSON schema of the wrapped document into `dir`
    pub fn save_schema(dir: impl AsRef<Path>) -> ConfigResult<PathBuf> {
        Ok(write_schema::<T>(dir.as_ref())?)
    }

    /// Render the wrapped document as TOML
    pub fn to_document_string(&self) -> Result<String, SerializeFailure> {
        let mut document = Table::new();
        document.insert(self.root_name.clone(), Value::Table(self.content_table()?));
        self.codec.serialize(&document)
    }

    fn content_table(&self) -> Result<Table, SerializeFailure> {
        match Value::try_from(&self.content) {
            Ok(Value::Table(table)) => Ok(table),
            Ok(other) => Err(SerializeFailure {
                message: format!("schema serialized to {}, expected a table", other.type_str()),
            }),
            Err(e) => Err(SerializeFailure {
                message: e.to_string(),
            }),
        }
    }

    pub fn get(&self) -> &T {
        &self.content
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.content
    }

    pub fn into_inner(self) -> T {
        self.content
    }

    pub fn root_name(&self) -> &str {
        &self.root_name
    }

    /// Only affects subsequent saves; a loaded value is not re-validated.
    pub fn set_root_name(&mut self, name: impl Into<String>) {
        self.root_name = name.into();
    }

    pub fn policy(&self) -> RootNamePolicy {
        self.policy
    }

    pub fn set_policy(&mut self, policy: RootNamePolicy) {
        self.policy = policy;
    }

    pub fn strict(&self) -> bool {
        self.strict
    }

    pub fn set_strict(&mut self, strict: bool) {
        self.strict = strict;
    }

    pub fn state(&self) -> ConfigState {
        self.state
    }

    pub fn describe_state(&self) -> &'static str {
        self.state.as_str()
    }

    pub fn schema(&self) -> &SchemaNode {
        &self.schema
    }
}

/// Split a parsed document into its single root entry.
fn unwrap_root(path: &Path, document: Table) -> Result<(String, Value), LoadError> {
    if document.len() > 1 {
        return Err(LoadError::MultipleRoots {
            path: path.to_path_buf(),
            names: document.keys().cloned().collect(),
        });
    }

    document
        .into_iter()
        .next()
        .ok_or_else(|| LoadError::MissingRoot {
            path: path.to_path_buf(),
        })
}

fn write_file_atomic(path: &Path, content: &str) -> io::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let mut temp_name = file_name.to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    fs::write(&temp_path, content)?;

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e);
    }

    Ok(())
}

impl<T: ConfigSchema> Default for ConfigSession<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ConfigSchema> Deref for ConfigSession<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.content
    }
}

impl<T: ConfigSchema> fmt::Display for ConfigSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_document_string() {
            Ok(document) => f.write_str(&document),
            Err(_) => f.write_str("Error serializing config"),
        }
    }
}

impl<T: ConfigSchema + fmt::Debug> fmt::Debug for ConfigSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigSession")
            .field("content", &self.content)
            .field("root_name", &self.root_name)
            .field("state", &self.state)
            .field("policy", &self.policy)
            .field("strict", &self.strict)
            .finish_non_exhaustive()
    }
}
