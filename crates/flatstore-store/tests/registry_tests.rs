#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;

use common::{fixture, write};
use flatstore_core::errors::ExErrorKind;
use flatstore_core::logging_facility::test_capture::init_test_capture;
use flatstore_core_types::schema::{EVENT_END, EVENT_END_ERROR, FIELD_PROJECT_ID};
use flatstore_store::{ProjectConfig, ProjectRegistry};

#[test]
fn test_shared_returns_one_handle_per_project() {
    let dir = fixture();
    let registry = ProjectRegistry::new();
    let config = ProjectConfig::new("Demo", dir.path());

    let a = registry.shared(&config).unwrap();
    let b = registry.shared(&config).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(registry.len(), 1);
    assert!(Arc::ptr_eq(&a, &registry.get("demo").unwrap()));
    assert_eq!(registry.config("demo").unwrap().data_dir, dir.path());
}

#[test]
fn test_refresh_swaps_in_a_new_snapshot() {
    let dir = fixture();
    let registry = ProjectRegistry::new();
    let config = ProjectConfig::new("swap", dir.path());
    let old = registry.shared(&config).unwrap();

    write(dir.path(), "page/p9.json", r#"{ "title": "Fresh" }"#);
    let new = registry.refresh("swap").unwrap();

    assert!(!Arc::ptr_eq(&old, &new));
    assert!(!old.read().unwrap().collection("page").unwrap().contains_key("p9"));
    assert!(new.read().unwrap().collection("page").unwrap().contains_key("p9"));
    assert!(Arc::ptr_eq(&new, &registry.get("swap").unwrap()));
}

#[test]
fn test_failed_refresh_keeps_previous_store() {
    let dir = fixture();
    let registry = ProjectRegistry::new();
    let config = ProjectConfig::new("fragile", dir.path());
    let old = registry.shared(&config).unwrap();

    write(dir.path(), "page.yaml", "_schema: [broken");
    let err = registry.refresh("fragile").unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::Configuration);
    assert!(Arc::ptr_eq(&old, &registry.get("fragile").unwrap()));
}

#[test]
fn test_first_build_failure_registers_nothing() {
    let dir = fixture();
    write(dir.path(), "Bad/x.json", "{}");
    let registry = ProjectRegistry::new();
    assert!(registry.shared(&ProjectConfig::new("bad", dir.path())).is_err());
    assert!(registry.is_empty());
}

#[test]
fn test_reset_forgets_projects() {
    let dir = fixture();
    let registry = ProjectRegistry::new();
    registry
        .shared(&ProjectConfig::new("one", dir.path()))
        .unwrap();
    registry
        .shared(&ProjectConfig::new("two", dir.path()))
        .unwrap();
    assert_eq!(registry.len(), 2);

    registry.reset();
    assert!(registry.is_empty());
    assert!(registry.get("one").is_none());
}

#[test]
fn test_refresh_is_logged_with_project_id() {
    let capture = init_test_capture();
    let dir = fixture();
    let registry = ProjectRegistry::new();
    registry
        .shared(&ProjectConfig::new("logged-project", dir.path()))
        .unwrap();

    registry.refresh("logged-project").unwrap();
    registry.refresh("missing-logged-project").unwrap_err();

    let ok = capture.count_events(|e| {
        e.field(FIELD_PROJECT_ID) == Some("logged-project") && e.event.as_deref() == Some(EVENT_END)
    });
    let failed = capture.count_events(|e| {
        e.field(FIELD_PROJECT_ID) == Some("missing-logged-project")
            && e.event.as_deref() == Some(EVENT_END_ERROR)
    });
    assert_eq!(ok, 1);
    assert_eq!(failed, 1);
}
