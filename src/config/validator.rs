//! Structural validation of an untyped document against schema descriptors
//!
//! Runs before typed deserialization so that unknown keys and wrong array
//! arity are reported with their full dotted path regardless of how the
//! schema type itself is annotated.

use toml::{Table, Value};

use crate::config::error::ParseErrorKind;
use crate::config::schema::{FieldKind, SchemaNode, ValueKind};

/// The first mismatch found in a document
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationIssue {
    pub kind: ParseErrorKind,
    /// Dotted path of the offending key, relative to the root entry
    pub key: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(kind: ParseErrorKind, key: String, message: String) -> Self {
        Self { kind, key, message }
    }
}

pub struct ConfigValidator<'a> {
    schema: &'a SchemaNode,
    strict: bool,
}

impl<'a> ConfigValidator<'a> {
    pub fn new(schema: &'a SchemaNode, strict: bool) -> Self {
        Self { schema, strict }
    }

    /// Check `table` against the schema and report the first issue.
    ///
    /// Keys are visited table by table in document order; nested tables are
    /// checked after the keys of their parent.
    pub fn validate(&self, table: &Table) -> Result<(), ValidationIssue> {
        self.validate_table(self.schema, table, String::new())
    }

    fn validate_table(
        &self,
        schema: &SchemaNode,
        table: &Table,
        prefix: String,
    ) -> Result<(), ValidationIssue> {
        let mut pending: Vec<(&SchemaNode, &Table, String)> = vec![(schema, table, prefix)];

        while let Some((node, table, prefix)) = pending.pop() {
            let mut nested = Vec::new();

            for (key, value) in table {
                let path = join_path(&prefix, key);

                let Some(field) = node.field(key) else {
                    if self.strict {
                        return Err(ValidationIssue::new(
                            ParseErrorKind::UnknownField,
                            path,
                            format!("unknown field `{key}` in `{}`", node.name),
                        ));
                    }
                    continue;
                };

                match (&field.kind, value) {
                    (FieldKind::Record(child), Value::Table(child_table)) => {
                        nested.push((child, child_table, path));
                    }
                    (FieldKind::Record(child), other) => {
                        return Err(ValidationIssue::new(
                            ParseErrorKind::TypeMismatch,
                            path,
                            format!("expected table `{}`, found {}", child.name, other.type_str()),
                        ));
                    }
                    (FieldKind::Leaf(kind), value) => self.check_value(kind, value, &path)?,
                }
            }

            // Reverse so the first nested table is checked first.
            pending.extend(nested.into_iter().rev());
        }

        Ok(())
    }

    fn check_value(&self, kind: &ValueKind, value: &Value, path: &str) -> Result<(), ValidationIssue> {
        let mismatch = || {
            ValidationIssue::new(
                ParseErrorKind::TypeMismatch,
                path.to_string(),
                format!("expected {}, found {}", kind.describe(), value.type_str()),
            )
        };

        match (kind, value) {
            (ValueKind::Any, _) => Ok(()),
            (ValueKind::Optional(inner), value) => self.check_value(inner, value, path),
            (ValueKind::Boolean, Value::Boolean(_)) => Ok(()),
            (ValueKind::Integer, Value::Integer(_)) => Ok(()),
            (ValueKind::Float, Value::Float(_) | Value::Integer(_)) => Ok(()),
            (ValueKind::String, Value::String(_)) => Ok(()),
            (ValueKind::Record(node), Value::Table(table)) => {
                self.validate_table(node, table, path.to_string())
            }
            (ValueKind::Array { item, len }, Value::Array(items)) => {
                if let Some(expected) = len {
                    if items.len() != *expected {
                        return Err(ValidationIssue::new(
                            ParseErrorKind::ArrayLength,
                            path.to_string(),
                            format!("expected {expected} elements, found {}", items.len()),
                        ));
                    }
                }
                for (index, element) in items.iter().enumerate() {
                    self.check_value(item, element, &format!("{path}[{index}]"))?;
                }
                Ok(())
            }
            _ => Err(mismatch()),
        }
    }
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}
