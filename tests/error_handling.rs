// tests/error_handling.rs

use std::io::Write;

use milestone_engine::config::{load_and_validate, load_from_path};
use milestone_engine::errors::EngineError;
use milestone_engine::types::{DependencyType, Status};
use tempfile::NamedTempFile;

fn write_booking(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn test_valid_booking_loads_with_derived_fields() {
    let file = write_booking(
        r#"
[settings]
require_approval = false

[booking]
id = "b-1001"
version = 7

[[milestone]]
id = "design"
title = "Design"
order_index = 0
estimated_hours = 10.0
status = "in_progress"
started_at = "2024-03-01T09:00:00Z"

[[milestone.task]]
id = "wireframes"
title = "Wireframes"
weight = 2.0
status = "completed"

[[milestone.task]]
id = "copy"
title = "Copy"

[[milestone]]
id = "build"
title = "Build"
order_index = 1
due_date = "2024-04-01"

[[milestone.dependency]]
id = "build-after-design"
depends_on = "design"
type = "finish_to_start"
lag_days = 2

[[comment]]
id = "c1"
target = { kind = "task", id = "copy" }
author = "client"
body = "tone should be friendlier"
created_at = "2024-03-02T10:00:00Z"
"#,
    );

    let loaded = load_and_validate(file.path()).unwrap();
    assert!(!loaded.settings.require_approval);

    let booking = loaded.booking;
    assert_eq!(booking.id, "b-1001");
    assert_eq!(booking.version, 7);

    let design = booking.milestone("design").unwrap();
    assert_eq!(design.status, Status::InProgress);
    assert_eq!(design.progress_percentage, 67);
    assert!(design.critical_path);
    assert_eq!(booking.task("copy").unwrap().milestone_id, "design");

    let edge = &booking.milestone("build").unwrap().dependencies[0];
    assert_eq!(edge.source_id, "build");
    assert_eq!(edge.dependency_type, DependencyType::FinishToStart);
    assert_eq!(edge.lag_days, 2);
}

#[test]
fn test_dependency_cycle_returns_validation_error() {
    let file = write_booking(
        r#"
[booking]
id = "b1"

[[milestone]]
id = "A"
title = "A"
order_index = 0

[[milestone.dependency]]
id = "a-on-b"
depends_on = "B"

[[milestone]]
id = "B"
title = "B"
order_index = 1

[[milestone.dependency]]
id = "b-on-a"
depends_on = "A"
"#,
    );

    match load_and_validate(file.path()) {
        Err(EngineError::Validation(msg)) => {
            assert!(msg.contains("cycle detected"));
            assert!(msg.contains('A') || msg.contains('B'));
        }
        Err(e) => panic!("Expected Validation error, got: {e:?}"),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_unknown_dependency_returns_validation_error() {
    let file = write_booking(
        r#"
[booking]
id = "b1"

[[milestone]]
id = "A"
title = "A"

[[milestone.dependency]]
id = "a-on-ghost"
depends_on = "Ghost"
"#,
    );

    match load_and_validate(file.path()) {
        Err(EngineError::Validation(msg)) => {
            assert!(msg.contains("unknown dependency"));
            assert!(msg.contains("Ghost"));
        }
        other => panic!("Expected Validation error, got: {other:?}"),
    }
}

#[test]
fn test_negative_lag_and_gappy_order_are_rejected() {
    let negative = write_booking(
        r#"
[booking]
id = "b1"

[[milestone]]
id = "A"
title = "A"
order_index = 0

[[milestone]]
id = "B"
title = "B"
order_index = 1

[[milestone.dependency]]
id = "b-on-a"
depends_on = "A"
lag_days = -2
"#,
    );
    assert!(matches!(load_and_validate(negative.path()), Err(EngineError::Validation(_))));

    let gappy = write_booking(
        r#"
[booking]
id = "b1"

[[milestone]]
id = "A"
title = "A"
order_index = 0

[[milestone]]
id = "B"
title = "B"
order_index = 5
"#,
    );
    match load_and_validate(gappy.path()) {
        Err(EngineError::Validation(msg)) => assert!(msg.contains("order_index")),
        other => panic!("Expected Validation error, got: {other:?}"),
    }
}

#[test]
fn test_oversized_lag_is_rejected() {
    let file = write_booking(
        r#"
[booking]
id = "b1"

[[milestone]]
id = "A"
title = "A"

[[milestone]]
id = "B"
title = "B"

[[milestone.dependency]]
id = "b-on-a"
depends_on = "A"
lag_days = 1000000000
"#,
    );
    match load_and_validate(file.path()) {
        Err(EngineError::Validation(msg)) => assert!(msg.contains("lag_days")),
        other => panic!("Expected Validation error, got: {other:?}"),
    }
}

#[test]
fn test_order_index_zero_twice_is_rejected_but_omitted_uses_file_order() {
    let zeros = write_booking(
        r#"
[booking]
id = "b1"

[[milestone]]
id = "A"
title = "A"
order_index = 0

[[milestone]]
id = "B"
title = "B"
order_index = 0
"#,
    );
    match load_and_validate(zeros.path()) {
        Err(EngineError::Validation(msg)) => assert!(msg.contains("order_index 0")),
        other => panic!("Expected Validation error, got: {other:?}"),
    }

    let omitted = write_booking(
        r#"
[booking]
id = "b1"

[[milestone]]
id = "A"
title = "A"

[[milestone]]
id = "B"
title = "B"
"#,
    );
    let booking = load_and_validate(omitted.path()).unwrap().booking;
    assert_eq!(booking.milestone("A").unwrap().order_index, 0);
    assert_eq!(booking.milestone("B").unwrap().order_index, 1);
}

#[test]
fn test_completed_without_approval_is_rejected() {
    let file = write_booking(
        r#"
[booking]
id = "b1"

[[milestone]]
id = "A"
title = "A"
status = "completed"
"#,
    );
    assert!(matches!(load_and_validate(file.path()), Err(EngineError::Validation(_))));
}

#[test]
fn test_unknown_status_returns_toml_error() {
    let file = write_booking(
        r#"
[booking]
id = "b1"

[[milestone]]
id = "A"
title = "A"
status = "finished"
"#,
    );
    assert!(matches!(load_from_path(file.path()), Err(EngineError::TomlError(_))));
}

#[test]
fn test_missing_file_returns_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("Booking.toml");
    assert!(matches!(load_and_validate(&missing), Err(EngineError::IoError(_))));
}
