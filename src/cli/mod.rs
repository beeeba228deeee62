//! Command-line exposure of configuration schemas
//!
//! Every leaf field of a schema becomes one `--a.b.c` option. Nested records
//! are flattened with dotted names. After parsing, [`apply_matches`] writes
//! each option given on the command line back into the session's live value.

use clap::parser::ValueSource;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use toml::Value;
use tracing::debug;

use crate::config::{ConfigResult, ConfigSchema, ConfigSession, FieldKind, SchemaNode, ValueKind};

/// Appended to the help text of commands with generated options
pub const CLI_FOOTER: &str = "NOTE:\n\
Configuration options were automatically generated from the config schema.\n\
Use the --help flag to see all available options.";

const CLI_ORIGIN: &str = "command line";

/// One flattened leaf field
#[derive(Debug, Clone, PartialEq)]
pub struct LeafOption {
    /// Full option name without the leading dashes
    pub name: String,
    /// Dotted path of the field inside the schema
    pub path: String,
    pub kind: ValueKind,
}

impl LeafOption {
    pub fn flag(&self) -> String {
        format!("--{}", self.name)
    }

    pub fn help(&self) -> String {
        format!("Configuration option for {}", self.name)
    }
}

fn join(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}

/// Flatten `node` into its leaf options, in declaration order.
///
/// `prefix` is prepended to every option name but not to field paths.
pub fn flatten(node: &SchemaNode, prefix: &str) -> Vec<LeafOption> {
    let mut leaves = Vec::new();
    // (record, dotted path of the record, next field index)
    let mut stack: Vec<(&SchemaNode, String, usize)> = vec![(node, String::new(), 0)];

    while let Some((node, path_prefix, index)) = stack.pop() {
        let Some(field) = node.fields.get(index) else {
            continue;
        };
        stack.push((node, path_prefix.clone(), index + 1));

        let path = join(&path_prefix, &field.name);
        match &field.kind {
            FieldKind::Record(child) => stack.push((child, path, 0)),
            FieldKind::Leaf(kind) => leaves.push(LeafOption {
                name: join(prefix, &path),
                path,
                kind: kind.clone(),
            }),
        }
    }

    leaves
}

fn build_arg(option: &LeafOption) -> Arg {
    let arg = Arg::new(option.name.clone())
        .long(option.name.clone())
        .help(option.help())
        .action(ArgAction::Set)
        .value_name(value_name(option.kind.required()));

    match option.kind.required() {
        ValueKind::Boolean => arg
            .value_parser(value_parser!(bool))
            .num_args(0..=1)
            .default_missing_value("true"),
        ValueKind::Array { item, len } => {
            let item = item.required();
            let arg = match item {
                // Inline tables and nested arrays contain commas themselves.
                ValueKind::Record(_) | ValueKind::Array { .. } | ValueKind::Any => with_parser(arg, item),
                scalar => with_parser(arg, scalar).value_delimiter(','),
            };
            match len {
                Some(len) => arg.num_args(*len),
                None => arg.num_args(1..),
            }
        }
        scalar => with_parser(arg, scalar),
    }
}

fn value_name(kind: &ValueKind) -> String {
    match kind {
        ValueKind::Array { item, .. } => value_name(item.required()),
        ValueKind::Record(_) => "TABLE".to_string(),
        other => other.describe().to_uppercase(),
    }
}

fn with_parser(arg: Arg, kind: &ValueKind) -> Arg {
    match kind {
        ValueKind::Boolean => arg.value_parser(value_parser!(bool)),
        ValueKind::Integer => arg.value_parser(value_parser!(i64)),
        ValueKind::Float => arg.value_parser(value_parser!(f64)),
        _ => arg.value_parser(value_parser!(String)),
    }
}

/// Add one option per leaf of the session's schema to `command`
pub fn register_as_cli<T: ConfigSchema>(session: &ConfigSession<T>, command: Command) -> Command {
    register_as_cli_with_prefix(session, command, "")
}

/// Like [`register_as_cli`], with every option name under `prefix`
pub fn register_as_cli_with_prefix<T: ConfigSchema>(
    session: &ConfigSession<T>,
    command: Command,
    prefix: &str,
) -> Command {
    let options = flatten(session.schema(), prefix);
    debug!(schema = %session.schema().name, options = options.len(), "Registering CLI options");

    let footer = match command.get_after_help() {
        Some(existing) => format!("{existing}\n\n{CLI_FOOTER}"),
        None => CLI_FOOTER.to_string(),
    };

    options
        .iter()
        .fold(command, |command, option| command.arg(build_arg(option)))
        .after_help(footer)
}

/// Write every option given on the command line into the session.
///
/// Returns the number of fields applied.
pub fn apply_matches<T: ConfigSchema>(
    session: &mut ConfigSession<T>,
    matches: &ArgMatches,
) -> ConfigResult<usize> {
    apply_matches_with_prefix(session, matches, "")
}

pub fn apply_matches_with_prefix<T: ConfigSchema>(
    session: &mut ConfigSession<T>,
    matches: &ArgMatches,
    prefix: &str,
) -> ConfigResult<usize> {
    let overrides: Vec<(String, Value)> = flatten(session.schema(), prefix)
        .into_iter()
        .filter(|option| matches.value_source(&option.name) == Some(ValueSource::CommandLine))
        .filter_map(|option| option_value(matches, &option).map(|value| (option.path, value)))
        .collect();

    session.apply_overrides(CLI_ORIGIN, overrides)
}

fn option_value(matches: &ArgMatches, option: &LeafOption) -> Option<Value> {
    let id = option.name.as_str();
    match option.kind.required() {
        ValueKind::Array { item, .. } => Some(Value::Array(values(matches, id, item.required()))),
        scalar => values(matches, id, scalar).into_iter().next(),
    }
}

fn values(matches: &ArgMatches, id: &str, kind: &ValueKind) -> Vec<Value> {
    match kind {
        ValueKind::Boolean => typed::<bool>(matches, id).map(Value::Boolean).collect(),
        ValueKind::Integer => typed::<i64>(matches, id).map(Value::Integer).collect(),
        ValueKind::Float => typed::<f64>(matches, id).map(Value::Float).collect(),
        ValueKind::String => typed::<String>(matches, id).map(Value::String).collect(),
        _ => typed::<String>(matches, id).map(|raw| parse_literal(&raw)).collect(),
    }
}

fn typed<'a, V>(matches: &'a ArgMatches, id: &str) -> impl Iterator<Item = V> + 'a
where
    V: Clone + Send + Sync + 'static,
{
    matches.get_many::<V>(id).into_iter().flatten().cloned()
}

/// Interpret `raw` as a TOML literal, falling back to a plain string
fn parse_literal(raw: &str) -> Value {
    format!("value = {raw}")
        .parse::<toml::Table>()
        .ok()
        .and_then(|mut table| table.remove("value"))
        .unwrap_or_else(|| Value::String(raw.to_string()))
}
