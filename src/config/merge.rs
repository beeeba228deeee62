//! Schema-aware table overlay and dotted-path insertion

use toml::{Table, Value};

use crate::config::schema::{FieldKind, SchemaNode, ValueKind};

/// What happens to fields the layer does not mention
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingKeys {
    /// Keep the base value
    Keep,
    /// Drop optional fields from the base (a saved `None` is an absent key);
    /// keep everything else
    ClearOptional,
}

/// Overlay `layer` onto `base`, guided by the record descriptor `node`.
///
/// Record fields are overlaid recursively. Every other present value,
/// including maps and arrays, replaces the base value wholesale. Keys outside
/// the schema are copied over unchanged.
pub fn overlay(base: &mut Table, mut layer: Table, node: &SchemaNode, missing: MissingKeys) {
    for field in &node.fields {
        match (&field.kind, layer.remove(&field.name)) {
            (FieldKind::Record(child), Some(Value::Table(incoming))) => {
                if let Some(Value::Table(existing)) = base.get_mut(&field.name) {
                    overlay(existing, incoming, child, missing);
                    continue;
                }
                let mut fresh = Table::new();
                overlay(&mut fresh, incoming, child, missing);
                base.insert(field.name.clone(), Value::Table(fresh));
            }
            (_, Some(value)) => {
                base.insert(field.name.clone(), value);
            }
            (FieldKind::Leaf(ValueKind::Optional(_)), None) if missing == MissingKeys::ClearOptional => {
                base.remove(&field.name);
            }
            (_, None) => {}
        }
    }

    for (key, value) in layer {
        base.insert(key, value);
    }
}

/// Insert `value` at a dotted path, creating intermediate tables
pub fn insert_dotted(root: &mut Table, dotted: &str, value: Value) {
    let mut parts: Vec<&str> = dotted.split('.').collect();
    let Some(last) = parts.pop() else {
        return;
    };

    let mut current = root;
    for part in parts {
        let entry = current
            .entry(part.to_string())
            .or_insert(Value::Table(Table::new()));
        if !entry.is_table() {
            *entry = Value::Table(Table::new());
        }
        let Value::Table(table) = entry else {
            return;
        };
        current = table;
    }

    current.insert(last.to_string(), value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::FieldDescriptor;

    fn table(text: &str) -> Table {
        text.parse::<Table>().unwrap()
    }

    fn leaf(name: &str, kind: ValueKind) -> FieldDescriptor {
        FieldDescriptor {
            name: name.to_string(),
            kind: FieldKind::Leaf(kind),
        }
    }

    fn schema() -> SchemaNode {
        SchemaNode {
            name: "Root".to_string(),
            fields: vec![
                leaf("a", ValueKind::Integer),
                leaf("b", ValueKind::Integer),
                leaf("limit", ValueKind::Optional(Box::new(ValueKind::Integer))),
                leaf("map", ValueKind::Any),
                leaf("items", ValueKind::Array {
                    item: Box::new(ValueKind::Integer),
                    len: None,
                }),
                FieldDescriptor {
                    name: "inner".to_string(),
                    kind: FieldKind::Record(SchemaNode {
                        name: "Inner".to_string(),
                        fields: vec![
                            leaf("c", ValueKind::Integer),
                            leaf("d", ValueKind::Integer),
                            leaf("note", ValueKind::Optional(Box::new(ValueKind::String))),
                        ],
                    }),
                },
            ],
        }
    }

    #[test]
    fn test_overlay_keeps_required_base_keys() {
        let mut base = table("a = 1\nb = 2\n[inner]\nc = 3\nd = 4\n");
        overlay(&mut base, table("b = 20\n[inner]\nd = 40\n"), &schema(), MissingKeys::ClearOptional);

        assert_eq!(base["a"].as_integer(), Some(1));
        assert_eq!(base["b"].as_integer(), Some(20));
        assert_eq!(base["inner"]["c"].as_integer(), Some(3));
        assert_eq!(base["inner"]["d"].as_integer(), Some(40));
    }

    #[test]
    fn test_overlay_clears_absent_optionals() {
        let mut base = table("a = 1\nlimit = 5\n[inner]\nnote = \"x\"\n");
        overlay(&mut base, table("a = 2\n[inner]\n"), &schema(), MissingKeys::ClearOptional);

        assert!(!base.contains_key("limit"));
        assert!(!base["inner"].as_table().unwrap().contains_key("note"));
    }

    #[test]
    fn test_overlay_keep_leaves_optionals() {
        let mut base = table("a = 1\nlimit = 5\n");
        overlay(&mut base, table("a = 2\n"), &schema(), MissingKeys::Keep);

        assert_eq!(base["a"].as_integer(), Some(2));
        assert_eq!(base["limit"].as_integer(), Some(5));
    }

    #[test]
    fn test_overlay_replaces_maps_and_arrays() {
        let mut base = table("items = [1, 2, 3]\n[map]\nseed = 1\n");
        overlay(&mut base, table("items = [9]\n[map]\n"), &schema(), MissingKeys::ClearOptional);

        assert_eq!(base["items"].as_array().unwrap().len(), 1);
        assert!(base["map"].as_table().unwrap().is_empty());
    }

    #[test]
    fn test_overlay_copies_unknown_keys() {
        let mut base = table("a = 1\n");
        overlay(&mut base, table("extra = true\n"), &schema(), MissingKeys::Keep);
        assert_eq!(base["extra"].as_bool(), Some(true));
    }

    #[test]
    fn test_insert_dotted_creates_tables() {
        let mut root = table("a = 1\n");
        insert_dotted(&mut root, "b.c.d", Value::String("x".to_string()));
        insert_dotted(&mut root, "a", Value::Integer(5));

        assert_eq!(root["b"]["c"]["d"].as_str(), Some("x"));
        assert_eq!(root["a"].as_integer(), Some(5));
    }
}
