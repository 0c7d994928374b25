//! Tests for IndexService loading records from disk

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;

use treeindex::application::services::IndexService;
use treeindex::application::ApplicationError;
use treeindex::config::Settings;
use treeindex::domain::{BuildOrder, IndexBuilder, IndexError, NodeId};
use treeindex::infrastructure::traits::RealFileSystem;
use treeindex::util::testing;

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

fn create_records_file(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).expect("write records file");
    path
}

fn service(settings: Settings) -> IndexService {
    IndexService::new(Arc::new(RealFileSystem), Arc::new(settings))
}

#[test]
fn given_records_file_when_loading_then_builds_index() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = create_records_file(
        &temp,
        "tree.json",
        r#"[
            {"id": 1, "parent": "root"},
            {"id": 2, "parent": 1, "name": "child"},
            {"id": 3, "parent": 2}
        ]"#,
    );

    // Act
    let index = service(Settings::default()).load(&path).unwrap();

    // Assert
    assert_eq!(index.len(), 3);
    assert_eq!(
        index.get_all_parents(3).unwrap().ids(),
        vec![NodeId(2), NodeId(1)]
    );
    assert_eq!(
        index.get_item(2).unwrap().get("name"),
        Some(&serde_json::json!("child"))
    );
}

#[test]
fn given_unordered_file_when_two_pass_configured_then_builds_index() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = create_records_file(
        &temp,
        "tree.json",
        r#"[{"id": 2, "parent": 1}, {"id": 1, "parent": "root"}]"#,
    );
    let settings = Settings {
        build_order: BuildOrder::TwoPass,
        ..Settings::default()
    };

    // Act
    let index = service(settings).load(&path).unwrap();

    // Assert
    assert_eq!(index.get_children(1).unwrap().ids(), vec![NodeId(2)]);
}

#[test]
fn given_unordered_file_when_input_order_then_dangling_parent() {
    let temp = TempDir::new().unwrap();
    let path = create_records_file(
        &temp,
        "tree.json",
        r#"[{"id": 2, "parent": 1}, {"id": 1, "parent": "root"}]"#,
    );

    let result = service(Settings::default()).load(&path);

    assert!(matches!(
        result,
        Err(ApplicationError::Index(IndexError::DanglingParent { .. }))
    ));
}

#[test]
fn given_builder_override_when_loading_then_override_applies() {
    let temp = TempDir::new().unwrap();
    let path = create_records_file(
        &temp,
        "tree.json",
        r#"[{"id": 2, "parent": 1}, {"id": 1, "parent": "root"}]"#,
    );

    let service = service(Settings::default())
        .with_builder(IndexBuilder::new().order(BuildOrder::TwoPass));

    assert!(service.load(&path).is_ok());
}

#[test]
fn given_object_instead_of_array_when_loading_then_invalid_input() {
    let temp = TempDir::new().unwrap();
    let path = create_records_file(&temp, "tree.json", r#"{"id": 1, "parent": "root"}"#);

    let result = service(Settings::default()).load(&path);

    assert!(matches!(result, Err(ApplicationError::InvalidInput { .. })));
}

#[test]
fn given_malformed_json_when_loading_then_invalid_input() {
    let temp = TempDir::new().unwrap();
    let path = create_records_file(&temp, "tree.json", "[{\"id\": 1,");

    let result = service(Settings::default()).load(&path);

    assert!(matches!(result, Err(ApplicationError::InvalidInput { .. })));
}

#[test]
fn given_nonexistent_file_when_loading_then_errors() {
    let result = service(Settings::default()).load(Path::new("/nonexistent/tree.json"));

    assert!(matches!(result, Err(ApplicationError::InvalidInput { .. })));
}

#[test]
fn given_in_memory_records_when_building_then_uses_configured_policy() {
    let settings = Settings {
        duplicate_ids: treeindex::domain::DuplicatePolicy::Reject,
        ..Settings::default()
    };
    let items = vec![
        serde_json::json!({"id": 1, "parent": "root"}),
        serde_json::json!({"id": 1, "parent": "root"}),
    ];

    let result = service(settings).build(items);

    assert!(matches!(
        result,
        Err(ApplicationError::Index(IndexError::DuplicateId(NodeId(1))))
    ));
}
