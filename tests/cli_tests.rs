//! Command-line flattening against the sample schema

use clap::{Arg, Command};
use confbind::cli::{apply_matches, apply_matches_with_prefix, flatten, register_as_cli_with_prefix, CLI_FOOTER};
use confbind::demo::SimulationConfig;
use confbind::{ConfigSession, ConfigState};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
struct Nested {
    c: String,
}

#[derive(Debug, Default, Serialize, Deserialize, JsonSchema)]
struct Flat {
    a: i64,
    b: Nested,
}

#[test]
fn test_minimal_schema_flattens_to_two_options() {
    let session = ConfigSession::<Flat>::new();
    let command = confbind::cli::register_as_cli(&session, Command::new("app"));

    let longs: Vec<String> = command
        .get_arguments()
        .filter_map(Arg::get_long)
        .map(|long| format!("--{long}"))
        .collect();
    assert_eq!(longs, vec!["--a", "--b.c"]);
    assert_eq!(command.get_after_help().unwrap().to_string(), CLI_FOOTER);
}

#[test]
fn test_sample_schema_options() {
    let session = ConfigSession::<SimulationConfig>::new();
    let flags: Vec<String> = flatten(session.schema(), "")
        .iter()
        .map(|option| option.flag())
        .collect();

    assert_eq!(
        flags,
        vec![
            "--description",
            "--author",
            "--physics.diffusion",
            "--physics.convection",
            "--physics.radiation",
            "--physics.flags",
            "--simulation.time_step",
            "--simulation.total_time",
            "--simulation.output_frequency",
            "--simulation.seed",
            "--output.directory",
            "--output.format",
            "--output.save_plots",
            "--checkpoints",
            "--labels",
        ]
    );
}

#[test]
fn test_command_line_overrides_loaded_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cfg.toml");
    fs::write(&path, "[main]\nauthor = \"file\"\n\n[main.output]\nformat = \"csv\"\n").unwrap();

    let mut session = ConfigSession::<SimulationConfig>::new();
    session.load(&path).unwrap();

    let command = confbind::cli::register_as_cli(&session, Command::new("app"));
    let matches = command
        .try_get_matches_from([
            "app",
            "--author",
            "cli",
            "--physics.flags",
            "4,5,6",
            "--simulation.total_time",
            "42",
            "--output.save_plots",
        ])
        .unwrap();

    assert_eq!(apply_matches(&mut session, &matches).unwrap(), 4);
    assert_eq!(session.author, "cli");
    assert_eq!(session.physics.flags, [4, 5, 6]);
    assert_eq!(session.simulation.total_time, 42.0);
    assert!(session.output.save_plots);
    assert_eq!(session.output.format, "csv");
    assert_eq!(session.state(), ConfigState::LoadedFromFile);
}

#[test]
fn test_wrong_arity_rejected_by_clap() {
    let session = ConfigSession::<SimulationConfig>::new();
    let command = confbind::cli::register_as_cli(&session, Command::new("app"));

    let result = command.try_get_matches_from(["app", "--physics.flags", "1,2"]);
    assert!(result.is_err());
}

#[test]
fn test_prefixed_options() {
    let mut session = ConfigSession::<Flat>::new();
    let command = register_as_cli_with_prefix(&session, Command::new("app"), "cfg");
    let matches = command
        .try_get_matches_from(["app", "--cfg.a", "3", "--cfg.b.c", "text"])
        .unwrap();

    assert_eq!(apply_matches_with_prefix(&mut session, &matches, "cfg").unwrap(), 2);
    assert_eq!(session.a, 3);
    assert_eq!(session.b.c, "text");
}

#[test]
fn test_table_valued_options() {
    let mut session = ConfigSession::<SimulationConfig>::new();
    let command = confbind::cli::register_as_cli(&session, Command::new("app"));
    let matches = command
        .try_get_matches_from([
            "app",
            "--simulation.seed",
            "7",
            "--checkpoints",
            "{ time = 1.5, label = \"warmup\" }",
            "{ time = 9.0, label = \"final\" }",
            "--labels",
            "{ owner = \"lab\" }",
        ])
        .unwrap();

    assert_eq!(apply_matches(&mut session, &matches).unwrap(), 3);
    assert_eq!(session.simulation.seed, Some(7));
    assert_eq!(session.checkpoints.len(), 2);
    assert_eq!(session.checkpoints[1].label, "final");
    assert_eq!(session.labels.get("owner").map(String::as_str), Some("lab"));
}

#[test]
fn test_unknown_key_in_table_option_rejected() {
    let mut session = ConfigSession::<SimulationConfig>::new();
    let command = confbind::cli::register_as_cli(&session, Command::new("app"));
    let matches = command
        .try_get_matches_from(["app", "--checkpoints", "{ time = 1.0, label = \"a\", bogus = 1 }"])
        .unwrap();

    let err = apply_matches(&mut session, &matches).unwrap_err();
    let parse = err.as_parse().unwrap();
    assert_eq!(parse.key, "checkpoints[0].bogus");
    assert!(session.checkpoints.is_empty());
}
