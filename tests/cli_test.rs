//! End-to-end command runs against a temporary forest file

use std::fs;
use std::path::Path;
use std::sync::Arc;

use clap::Parser;
use tempfile::TempDir;

use nestree::cli::{execute_command, Cli, CliResult};
use nestree::config::Settings;
use nestree::domain::TreeId;
use nestree::infrastructure::di::ServiceContainer;
use nestree::infrastructure::ForestFile;
use nestree::{exitcode, util::testing::init_test_setup};

fn run(dir: &Path, forest: &Path, args: &[&str]) -> CliResult<()> {
    let mut argv = vec![
        "nestree".to_string(),
        "-C".to_string(),
        dir.display().to_string(),
        "-f".to_string(),
        forest.display().to_string(),
    ];
    argv.extend(args.iter().map(|a| a.to_string()));
    execute_command(&Cli::parse_from(argv))
}

/// Open the saved forest with the services for inspection.
fn open(forest: &Path) -> ServiceContainer {
    let store = ForestFile::new(forest).load().expect("load forest");
    ServiceContainer::with_deps(Settings::default(), Arc::new(store)).expect("container")
}

fn names(c: &ServiceContainer, tree: TreeId) -> Vec<String> {
    c.traversal()
        .nodes(tree)
        .unwrap()
        .iter()
        .map(|n| n.field("name").to_string())
        .collect()
}

#[test]
fn given_add_and_insert_commands_when_run_then_forest_file_persisted() {
    // Arrange
    init_test_setup();
    let dir = TempDir::new().unwrap();
    let forest = dir.path().join("forest.json");

    // Act
    run(dir.path(), &forest, &["add", "--set", "name=root"]).unwrap();
    run(dir.path(), &forest, &["add", "--parent", "1", "--set", "name=a"]).unwrap();
    run(dir.path(), &forest, &["insert", "--before", "2", "--set", "name=b"]).unwrap();
    run(dir.path(), &forest, &["check"]).unwrap();

    // Assert
    let c = open(&forest);
    assert_eq!(names(&c, TreeId(1)), vec!["root", "b", "a"]);
    c.traversal().verify(TreeId(1)).unwrap();
}

#[test]
fn given_node_ids_when_run_across_invocations_then_ids_stable() {
    // Arrange
    init_test_setup();
    let dir = TempDir::new().unwrap();
    let forest = dir.path().join("forest.json");
    run(dir.path(), &forest, &["add", "--set", "name=root"]).unwrap();
    run(dir.path(), &forest, &["add", "--parent", "1", "--set", "name=x"]).unwrap();
    run(dir.path(), &forest, &["add", "--parent", "1", "--set", "name=y"]).unwrap();

    // Act
    run(dir.path(), &forest, &["move", "3", "--before", "2"]).unwrap();
    run(dir.path(), &forest, &["update", "3", "--set", "name=why"]).unwrap();

    // Assert
    let c = open(&forest);
    assert_eq!(names(&c, TreeId(1)), vec!["root", "why", "x"]);
}

#[test]
fn given_kept_gaps_when_checking_then_data_error_until_closed() {
    // Arrange
    init_test_setup();
    let dir = TempDir::new().unwrap();
    let forest = dir.path().join("forest.json");
    run(dir.path(), &forest, &["add", "--set", "name=root"]).unwrap();
    run(dir.path(), &forest, &["add", "--parent", "1", "--set", "name=a"]).unwrap();
    run(dir.path(), &forest, &["add", "--parent", "1", "--set", "name=b"]).unwrap();

    // Act
    run(dir.path(), &forest, &["delete", "2", "--keep-gaps"]).unwrap();
    let err = run(dir.path(), &forest, &["check"]).unwrap_err();

    // Assert
    assert_eq!(err.exit_code(), exitcode::DATAERR);
    run(dir.path(), &forest, &["close-gaps"]).unwrap();
    run(dir.path(), &forest, &["check"]).unwrap();
}

#[test]
fn given_exported_forest_when_imported_into_new_file_then_same_names() {
    // Arrange
    init_test_setup();
    let dir = TempDir::new().unwrap();
    let forest = dir.path().join("forest.json");
    let copy = dir.path().join("copy.json");
    let document = dir.path().join("export.json");
    run(dir.path(), &forest, &["add", "--set", "name=root"]).unwrap();
    run(dir.path(), &forest, &["add", "--parent", "1", "--set", "name=leaf"]).unwrap();

    // Act
    run(dir.path(), &forest, &["export", "-o", document.to_str().unwrap()]).unwrap();
    run(dir.path(), &copy, &["import", document.to_str().unwrap()]).unwrap();

    // Assert
    assert!(fs::read_to_string(&document).unwrap().contains("\"treeId\""));
    assert_eq!(names(&open(&copy), TreeId(1)), vec!["root", "leaf"]);
}

#[test]
fn given_missing_node_when_running_then_data_error_and_file_untouched() {
    // Arrange
    init_test_setup();
    let dir = TempDir::new().unwrap();
    let forest = dir.path().join("forest.json");
    run(dir.path(), &forest, &["add", "--set", "name=root"]).unwrap();
    let before = fs::read_to_string(&forest).unwrap();

    // Act
    let err = run(dir.path(), &forest, &["add", "--parent", "9", "--set", "name=x"]).unwrap_err();

    // Assert
    assert_eq!(err.exit_code(), exitcode::DATAERR);
    assert_eq!(fs::read_to_string(&forest).unwrap(), before);
}

#[test]
fn given_malformed_assignment_when_running_then_usage_error() {
    // Arrange
    init_test_setup();
    let dir = TempDir::new().unwrap();
    let forest = dir.path().join("forest.json");

    // Act
    let err = run(dir.path(), &forest, &["add", "--set", "oops"]).unwrap_err();

    // Assert
    assert_eq!(err.exit_code(), exitcode::USAGE);
    assert!(!forest.exists());
}
