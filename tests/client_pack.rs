use std::{fs, path::PathBuf};

use imagi::{
    GradeResult,
    client::{PackArgs, json_files, pack, render_result, result_file_name},
    payload::{IdField, PayloadSchema},
};
use uuid::Uuid;

fn temp_root() -> PathBuf {
    let root = std::env::temp_dir().join(format!("imagi-pack-{}", Uuid::new_v4()));
    fs::create_dir_all(root.join("src")).expect("create temp root");
    root
}

#[test]
fn pack_reads_files_in_order_under_chosen_key() {
    let root = temp_root();
    fs::write(root.join("README.md"), "Reverse a string.").expect("readme");
    fs::write(root.join("results.txt"), "1 passed, 1 failed").expect("results");
    fs::write(root.join("src/Reverse.java"), "class Reverse {}").expect("source");
    fs::write(root.join("src/Main.java"), "class Main {}").expect("source");

    let payload = pack(&PackArgs {
        id:           "erin".into(),
        task:         Some("task-3".into()),
        id_field:     IdField::StudentId,
        read_me:      root.join("README.md"),
        test_results: root.join("results.txt"),
        sources:      vec![root.join("src/Reverse.java"), root.join("src/Main.java")],
    })
    .expect("pack");

    let value = serde_json::to_value(&payload).expect("serialize");
    assert_eq!(value["student_id"], "erin");
    assert!(value.get("user_id").is_none());
    assert_eq!(value["source_files"][0]["filename"], "Reverse.java");
    assert_eq!(value["source_files"][1]["content"], "class Main {}");

    let validated = payload
        .validate(&PayloadSchema {
            id_field:     IdField::StudentId,
            require_task: true,
        })
        .expect("packed payload validates");
    assert_eq!(validated.test_results, "1 passed, 1 failed");

    let _ = fs::remove_dir_all(root);
}

#[test]
fn pack_fails_on_missing_source() {
    let root = temp_root();
    fs::write(root.join("README.md"), "r").expect("readme");
    fs::write(root.join("results.txt"), "t").expect("results");

    let err = pack(&PackArgs {
        id:           "frank".into(),
        task:         None,
        id_field:     IdField::UserId,
        read_me:      root.join("README.md"),
        test_results: root.join("results.txt"),
        sources:      vec![root.join("src/Missing.java")],
    })
    .expect_err("missing file");
    assert!(format!("{err:#}").contains("Missing.java"));

    let _ = fs::remove_dir_all(root);
}

#[test]
fn json_files_lists_sorted_json_only() {
    let root = temp_root();
    for name in ["b.json", "a.json", "notes.txt"] {
        fs::write(root.join(name), "{}").expect("write");
    }

    let files = json_files(&root).expect("list");
    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["a.json", "b.json"]);

    assert!(json_files(&root.join("nope")).is_err());

    let _ = fs::remove_dir_all(root);
}

#[test]
fn rendered_result_shows_all_fields() {
    colored::control::set_override(false);
    let result = GradeResult {
        student_id: "gina".into(),
        task:       Some("task-1".into()),
        status:     "Pass".into(),
        feedback:   "  Tidy loop.  ".into(),
    };

    let text = render_result(&PathBuf::from("gina.json"), &result);
    assert_eq!(
        text,
        "File: gina.json\nStudent ID: gina\nTask: task-1\nStatus: Pass\nFeedback:\nTidy loop."
    );
}

#[test]
fn result_file_names_are_single_components() {
    let result = |id: &str, task: Option<&str>| GradeResult {
        student_id: id.into(),
        task:       task.map(Into::into),
        status:     "Pass".into(),
        feedback:   "ok".into(),
    };

    assert_eq!(result_file_name(&result("kim", None)).expect("name"), "kim.json");
    assert_eq!(
        result_file_name(&result("kim", Some("task-2"))).expect("name"),
        "kim-task-2.json"
    );

    for id in ["", ".", "..", "../up", "a/b", "a\\b"] {
        assert!(result_file_name(&result(id, None)).is_err(), "{id:?}");
    }
    assert!(result_file_name(&result("kim", Some("../x"))).is_err());
}
