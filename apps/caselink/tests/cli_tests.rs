//! Integration tests for CLI parsing, case loading and command execution.

// Allow unwrap and panic in tests - these are standard for test code
#![allow(clippy::unwrap_used, clippy::panic)]

use caselink::cli::{
    self, Cli, Commands, Review, build_investigation, cmd_clusters, cmd_export, cmd_link,
    cmd_shared, cmd_similar, cmd_status, cmd_traverse, load_cases, parse_edge_types,
};
use caselink::config::{Overrides, load_config, resolve};
use caselink_core::{AnalysisConfig, CaseGraphError, EdgeType, LinkState};
use clap::Parser;
use std::io::Write;
use std::path::PathBuf;
use tempfile::{NamedTempFile, TempDir};

const CASES: &str = r#"[
    {
        "case_id": "PB-1",
        "suspects": ["J. Doe"],
        "location": {"lat": 26.7753, "lng": -80.0583},
        "mo_patterns": ["forced_entry", "night"],
        "behaviors": ["bound_victim"],
        "time_of_day": "night"
    },
    {
        "case_id": "PB-2",
        "suspects": ["j. doe"],
        "location": {"lat": 26.7853, "lng": -80.0583},
        "mo_patterns": ["forced_entry", "night", "weapon"],
        "behaviors": ["bound_victim"],
        "time_of_day": "night"
    },
    {
        "case_id": "PB-3",
        "vehicles": ["blue sedan"],
        "mo_patterns": ["shoplifting"],
        "time_of_day": "afternoon"
    }
]"#;

fn case_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn config(min_similarity: f64) -> AnalysisConfig {
    AnalysisConfig {
        min_similarity,
        ..AnalysisConfig::default()
    }
}

// =============================================================================
// PARSING
// =============================================================================

#[test]
fn test_parse_similar_command() {
    let cli = Cli::try_parse_from([
        "caselink", "--json-mode", "similar", "-f", "cases.json", "--case", "PB-1", "-m", "0.4",
    ])
    .unwrap();

    assert!(cli.json_mode);
    match cli.command {
        Commands::Similar { file, case_id, min } => {
            assert_eq!(file, PathBuf::from("cases.json"));
            assert_eq!(case_id, "PB-1");
            assert_eq!(min, Some(0.4));
        }
        other => panic!("unexpected command: {:?}", other),
    }
}

#[test]
fn test_parse_link_review_flags() {
    let cli = Cli::try_parse_from([
        "caselink", "link", "-f", "c.json", "--confirm", "0", "--confirm", "2", "--reject", "1",
        "--reviewer", "det. ramos",
    ])
    .unwrap();

    match cli.command {
        Commands::Link {
            confirm,
            reject,
            reviewer,
            ..
        } => {
            assert_eq!(confirm, vec![0, 2]);
            assert_eq!(reject, vec![1]);
            assert_eq!(reviewer, "det. ramos");
        }
        other => panic!("unexpected command: {:?}", other),
    }
}

#[test]
fn test_subcommand_is_required() {
    assert!(Cli::try_parse_from(["caselink"]).is_err());
}

#[test]
fn test_parse_edge_types() {
    assert_eq!(
        parse_edge_types("suspect_of, found_at").unwrap(),
        vec![EdgeType::SuspectOf, EdgeType::FoundAt]
    );
    assert!(parse_edge_types("suspect_of,teleported_to").is_err());
}

// =============================================================================
// CONFIG
// =============================================================================

#[test]
fn test_config_file_and_overrides() {
    let file = case_file("[analysis]\nmin_similarity = 0.3\nmin_cluster_size = 3\n");

    let loaded = load_config(Some(file.path())).unwrap();
    assert_eq!(loaded.min_similarity, 0.3);

    let resolved = resolve(
        Some(file.path()),
        Overrides {
            min_similarity: Some(0.6),
            ..Overrides::default()
        },
    )
    .unwrap();
    assert_eq!(resolved.min_similarity, 0.6);
    assert_eq!(resolved.min_cluster_size, 3);
}

#[test]
fn test_missing_config_file_fails() {
    let dir = TempDir::new().unwrap();
    let result = load_config(Some(&dir.path().join("absent.toml")));
    assert!(matches!(result, Err(CaseGraphError::ConfigError(_))));
}

// =============================================================================
// CASE LOADING
// =============================================================================

#[test]
fn test_load_cases() {
    let file = case_file(CASES);
    let cases = load_cases(file.path()).unwrap();
    assert_eq!(cases.len(), 3);
    assert_eq!(cases[1].payload.mo_patterns.len(), 3);
}

#[test]
fn test_load_rejects_directory_and_bad_json() {
    let dir = TempDir::new().unwrap();
    assert!(matches!(load_cases(dir.path()), Err(CaseGraphError::IoError(_))));

    let bad = case_file("{ not json");
    assert!(matches!(
        load_cases(bad.path()),
        Err(CaseGraphError::SerializationError(_))
    ));
}

#[test]
fn test_build_investigation_shares_suspect() {
    let file = case_file(CASES);
    let investigation = build_investigation(&config(0.5), file.path()).unwrap();

    let shared: Vec<&str> = investigation
        .shared_entities("PB-1", "PB-2")
        .iter()
        .map(|n| n.label.as_str())
        .collect();
    assert!(shared.contains(&"J. Doe"));
    assert_eq!(investigation.metrics().case_count, 3);
}

// =============================================================================
// COMMANDS
// =============================================================================

#[test]
fn test_read_only_commands_succeed() {
    let file = case_file(CASES);
    let config = config(0.5);

    cmd_status(&config, true, file.path()).unwrap();
    cmd_status(&config, false, file.path()).unwrap();
    cmd_similar(&config, true, file.path(), "PB-1").unwrap();
    cmd_clusters(&config, false, file.path()).unwrap();
    cmd_shared(&config, false, file.path(), "PB-1", "PB-2").unwrap();
    cmd_traverse(&config, false, file.path(), "PB-1", None, None).unwrap();
    cmd_traverse(&config, true, file.path(), "PB-1", Some("PB-2"), None).unwrap();
}

#[test]
fn test_unknown_case_is_an_error() {
    let file = case_file(CASES);
    let config = config(0.5);

    assert!(matches!(
        cmd_similar(&config, true, file.path(), "PB-404"),
        Err(CaseGraphError::UnknownCase(_))
    ));
    assert!(cmd_traverse(&config, true, file.path(), "PB-404", None, None).is_err());
    assert!(cmd_shared(&config, true, file.path(), "PB-1", "PB-404").is_err());
}

#[test]
fn test_link_review_applies_and_rejects_bad_ids() {
    let file = case_file(CASES);
    let config = config(0.5);

    let review = Review {
        confirm: vec![0],
        reviewer: "det. ramos".to_string(),
        ..Review::default()
    };
    cmd_link(&config, true, file.path(), &review).unwrap();

    let bad = Review {
        reject: vec![99],
        ..Review::default()
    };
    assert!(matches!(
        cmd_link(&config, true, file.path(), &bad),
        Err(CaseGraphError::LinkNotFound(_))
    ));
}

#[test]
fn test_link_all_on_sample_cases() {
    let file = case_file(CASES);
    let mut investigation = build_investigation(&config(0.5), file.path()).unwrap();
    let links = investigation.link_all(0.5).unwrap();

    assert_eq!(links.len(), 1);
    assert!(links[0].involves("PB-1") && links[0].involves("PB-2"));
    assert_eq!(links[0].state, LinkState::Pending);
    assert_eq!(investigation.clusters(2).len(), 1);
}

#[test]
fn test_export_writes_json() {
    let file = case_file(CASES);
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("export.json");

    cmd_export(&config(0.5), file.path(), &output).unwrap();

    let data = std::fs::read(&output).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&data).unwrap();
    assert!(value["graph"]["nodes"].as_array().is_some_and(|n| !n.is_empty()));
    assert_eq!(value["links"].as_array().map(Vec::len), Some(1));
    assert_eq!(value["metrics"]["case_count"], 3);
}

#[test]
fn test_execute_dispatches() {
    let file = case_file(CASES);
    let path = file.path().to_string_lossy().to_string();
    let cli = Cli::try_parse_from(["caselink", "-q", "--json-mode", "clusters", "-f", &path, "-s", "2"])
        .unwrap();
    cli::execute(cli).unwrap();
}
