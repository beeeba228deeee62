//! Schema binding: field descriptors and JSON schema export
//!
//! A schema is any record type implementing `Serialize`, `DeserializeOwned`,
//! `JsonSchema` and `Default`. Its field descriptor tree is derived once from
//! the `schemars` description of the type, so the session validator and the
//! CLI flattener walk plain data instead of relying on reflection.

use schemars::gen::{SchemaGenerator, SchemaSettings};
use schemars::schema::{InstanceType, RootSchema, Schema, SchemaObject};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value as J};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::config::error::SchemaSaveError;

/// Root name used when a session or schema export does not choose one
pub const DEFAULT_ROOT_NAME: &str = "main";

/// Nesting depth past which referenced records are no longer expanded
const MAX_SCHEMA_DEPTH: usize = 32;

/// A record type usable as a configuration schema
pub trait ConfigSchema: Serialize + DeserializeOwned + JsonSchema + Default {
    /// Human-readable name used for default file names and the registry
    fn config_name() -> String {
        <Self as JsonSchema>::schema_name()
    }
}

impl<T> ConfigSchema for T where T: Serialize + DeserializeOwned + JsonSchema + Default {}

/// Shape of a leaf value
#[derive(Debug, Clone, PartialEq)]
pub enum ValueKind {
    Boolean,
    Integer,
    Float,
    String,
    /// A sequence; `len` is set for fixed-size arrays
    Array {
        item: Box<ValueKind>,
        len: Option<usize>,
    },
    Optional(Box<ValueKind>),
    /// A record held inside an `Option` or a sequence
    Record(SchemaNode),
    /// Anything the descriptor does not model (maps, enums with data, ...)
    Any,
}

impl ValueKind {
    pub fn describe(&self) -> String {
        match self {
            ValueKind::Boolean => "boolean".to_string(),
            ValueKind::Integer => "integer".to_string(),
            ValueKind::Float => "float".to_string(),
            ValueKind::String => "string".to_string(),
            ValueKind::Array { item, len: Some(len) } => format!("array of {len} {}", item.describe()),
            ValueKind::Array { item, len: None } => format!("array of {}", item.describe()),
            ValueKind::Optional(inner) => format!("optional {}", inner.describe()),
            ValueKind::Record(node) => format!("table `{}`", node.name),
            ValueKind::Any => "value".to_string(),
        }
    }

    /// The kind with any `Optional` wrappers removed
    pub fn required(&self) -> &ValueKind {
        match self {
            ValueKind::Optional(inner) => inner.required(),
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Leaf(ValueKind),
    Record(SchemaNode),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
}

/// Field descriptors of one record, in declaration order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SchemaNode {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
}

impl SchemaNode {
    /// Build the descriptor tree for `T`
    pub fn of<T: JsonSchema>() -> Self {
        let root = SchemaSettings::draft07()
            .into_generator()
            .into_root_schema_for::<T>();
        let json = serde_json::to_value(&root).unwrap_or_default();
        let definitions = json
            .get("definitions")
            .and_then(J::as_object)
            .cloned()
            .unwrap_or_default();

        let name = T::schema_name();
        let node = match json.as_object() {
            Some(object) => build_node(&name, object, &definitions, 0),
            None => SchemaNode {
                name,
                ..Default::default()
            },
        };

        debug!(schema = %node.name, fields = node.fields.len(), "Built schema descriptors");
        node
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }
}

fn build_node(
    name: &str,
    object: &Map<String, J>,
    definitions: &Map<String, J>,
    depth: usize,
) -> SchemaNode {
    let fields = object
        .get("properties")
        .and_then(J::as_object)
        .map(|properties| {
            properties
                .iter()
                .map(|(field, schema)| FieldDescriptor {
                    name: field.clone(),
                    kind: field_kind(schema, definitions, depth + 1),
                })
                .collect()
        })
        .unwrap_or_default();

    SchemaNode {
        name: name.to_string(),
        fields,
    }
}

/// Follow `$ref` and single-entry `allOf` wrappers to the schema they name.
fn resolve<'a>(schema: &'a J, definitions: &'a Map<String, J>) -> (&'a J, Option<&'a str>) {
    let mut current = schema;
    let mut name = None;

    for _ in 0..MAX_SCHEMA_DEPTH {
        if let Some(reference) = current.get("$ref").and_then(J::as_str) {
            let target = reference.rsplit('/').next().unwrap_or(reference);
            match definitions.get(target) {
                Some(next) => {
                    name = Some(target);
                    current = next;
                    continue;
                }
                None => break,
            }
        }

        match current.get("allOf").and_then(J::as_array) {
            Some(all) if all.len() == 1 => current = &all[0],
            _ => break,
        }
    }

    (current, name)
}

fn field_kind(schema: &J, definitions: &Map<String, J>, depth: usize) -> FieldKind {
    if depth > MAX_SCHEMA_DEPTH {
        return FieldKind::Leaf(ValueKind::Any);
    }

    let (schema, name) = resolve(schema, definitions);

    if let Some(object) = schema.as_object() {
        if is_record(object) {
            return FieldKind::Record(build_node(name.unwrap_or("record"), object, definitions, depth));
        }
    }

    FieldKind::Leaf(value_kind(schema, definitions, depth))
}

fn is_record(object: &Map<String, J>) -> bool {
    let is_object = match object.get("type") {
        Some(J::String(kind)) => kind == "object",
        None => object.contains_key("properties"),
        _ => false,
    };
    is_object && object.get("properties").map_or(false, J::is_object)
}

fn value_kind(schema: &J, definitions: &Map<String, J>, depth: usize) -> ValueKind {
    if depth > MAX_SCHEMA_DEPTH {
        return ValueKind::Any;
    }

    let (schema, name) = resolve(schema, definitions);

    if let Some(object) = schema.as_object() {
        if is_record(object) {
            return ValueKind::Record(build_node(name.unwrap_or("record"), object, definitions, depth));
        }
    }

    // Option<Record> is described as anyOf [record, null]
    for combinator in ["anyOf", "oneOf"] {
        if let Some(variants) = schema.get(combinator).and_then(J::as_array) {
            let non_null: Vec<&J> = variants.iter().filter(|v| !is_null_schema(v)).collect();
            if non_null.len() == 1 && non_null.len() < variants.len() {
                return ValueKind::Optional(Box::new(value_kind(non_null[0], definitions, depth + 1)));
            }
            return ValueKind::Any;
        }
    }

    match schema.get("type") {
        Some(J::String(kind)) => scalar_kind(kind, schema, definitions, depth),
        Some(J::Array(kinds)) => {
            let non_null: Vec<&str> = kinds
                .iter()
                .filter_map(J::as_str)
                .filter(|kind| *kind != "null")
                .collect();
            match non_null.as_slice() {
                [kind] if non_null.len() < kinds.len() => {
                    ValueKind::Optional(Box::new(scalar_kind(kind, schema, definitions, depth)))
                }
                [kind] => scalar_kind(kind, schema, definitions, depth),
                _ => ValueKind::Any,
            }
        }
        _ => ValueKind::Any,
    }
}

fn scalar_kind(kind: &str, schema: &J, definitions: &Map<String, J>, depth: usize) -> ValueKind {
    match kind {
        "boolean" => ValueKind::Boolean,
        "integer" => ValueKind::Integer,
        "number" => ValueKind::Float,
        "string" => ValueKind::String,
        "array" => {
            let item = match schema.get("items") {
                Some(items @ J::Object(_)) => value_kind(items, definitions, depth + 1),
                _ => ValueKind::Any,
            };
            let min = schema.get("minItems").and_then(J::as_u64);
            let max = schema.get("maxItems").and_then(J::as_u64);
            let len = match (min, max) {
                (Some(min), Some(max)) if min == max => usize::try_from(min).ok(),
                _ => None,
            };
            ValueKind::Array {
                item: Box::new(item),
                len,
            }
        }
        _ => ValueKind::Any,
    }
}

fn is_null_schema(schema: &J) -> bool {
    schema.get("type").and_then(J::as_str) == Some("null")
}

/// JSON schema of the wrapped document `{root_name: T}`
pub fn wrapped_schema<T: JsonSchema>(title: &str, root_name: &str) -> RootSchema {
    let mut generator: SchemaGenerator = SchemaSettings::draft07().into_generator();
    let inner = generator.subschema_for::<T>();

    let mut schema = SchemaObject {
        instance_type: Some(InstanceType::Object.into()),
        ..Default::default()
    };
    schema.metadata().title = Some(title.to_string());

    let object = schema.object();
    object.properties.insert(root_name.to_string(), inner);
    object.required.insert(root_name.to_string());
    object.additional_properties = Some(Box::new(Schema::Bool(false)));

    RootSchema {
        meta_schema: generator.settings().meta_schema.clone(),
        schema,
        definitions: generator.take_definitions(),
    }
}

/// Path of the schema file for `name` inside `dir`
pub fn schema_file_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.schema.json"))
}

/// Write `<dir>/<name>.schema.json` for `T` wrapped under the default root
/// name, creating `dir` if needed.
pub fn write_schema<T: ConfigSchema>(dir: &Path) -> Result<PathBuf, SchemaSaveError> {
    let name = T::config_name();
    let root = wrapped_schema::<T>(&name, DEFAULT_ROOT_NAME);

    let content = serde_json::to_string_pretty(&root).map_err(|e| SchemaSaveError::Generate {
        name: name.clone(),
        message: e.to_string(),
    })?;

    if !dir.exists() {
        fs::create_dir_all(dir).map_err(|source| SchemaSaveError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let path = schema_file_path(dir, &name);
    fs::write(&path, content).map_err(|source| SchemaSaveError::Io {
        path: path.clone(),
        source,
    })?;

    info!(schema = %name, path = %path.display(), "Schema written");
    Ok(path)
}
