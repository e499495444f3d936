use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

const PERSON_PROTO: &str = "syntax = \"proto3\";\nmessage Person {\n  string name = 1;\n  int32 id = 2;\n}\n";

/// Canonical encoding of `Person { name: "Ada", id: 7 }`.
const ADA_BYTES: &[u8] = &[0x0a, 0x03, b'A', b'd', b'a', 0x10, 0x07];

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_json2pb"))
}

fn proto_tree(root: &Path, files: &[(&str, &str)]) -> PathBuf {
    let proto_dir = root.join("protos");
    for (name, content) in files {
        let path = proto_dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).expect("create proto dir");
        fs::write(path, content).expect("write proto file");
    }
    proto_dir
}

fn path_arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 temp path")
}

/// End-to-end: JSON file in, canonical bytes out, nothing else on stdout.
#[test]
fn converts_json_file_to_binary_on_stdout() {
    let dir = tempfile::tempdir().unwrap();
    let proto_dir = proto_tree(dir.path(), &[("Person.proto", PERSON_PROTO)]);
    let json = dir.path().join("ada.json");
    fs::write(&json, r#"{"name":"Ada","id":7}"#).unwrap();
    let out = dir.path().join("out");

    let assert = cli()
        .args(["-p", path_arg(&proto_dir), "-o", path_arg(&out), "-t", "Person", "-j", path_arg(&json)])
        .assert()
        .success();
    assert_eq!(assert.get_output().stdout, ADA_BYTES);
    assert!(out.join("protos").join("Person_pb2.binpb").is_file());
}

#[test]
fn reads_json_from_stdin_with_long_flags() {
    let dir = tempfile::tempdir().unwrap();
    let proto_dir = proto_tree(dir.path(), &[("Person.proto", PERSON_PROTO)]);

    cli()
        .args([
            "--proto_dir",
            path_arg(&proto_dir),
            "--output_dir",
            path_arg(&dir.path().join("out")),
            "--type",
            "Person",
        ])
        .write_stdin(r#"{"name":"Ada","id":7}"#)
        .assert()
        .success()
        .stdout(predicate::eq(ADA_BYTES));
}

#[test]
fn empty_stdin_aborts_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let proto_dir = proto_tree(dir.path(), &[("Person.proto", PERSON_PROTO)]);

    cli()
        .args(["-p", path_arg(&proto_dir), "-o", path_arg(&dir.path().join("out")), "-t", "Person"])
        .write_stdin("")
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("no JSON specified"));
}

#[test]
fn missing_proto_dir_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");

    cli()
        .args(["-p", path_arg(&dir.path().join("absent")), "-o", path_arg(&out), "-t", "Person"])
        .write_stdin(r#"{"name":"Ada"}"#)
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("no proto directory"))
        .stderr(predicate::str::contains("no files were generated"));
    assert!(!out.exists());
}

#[test]
fn unknown_type_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let proto_dir = proto_tree(dir.path(), &[("Person.proto", PERSON_PROTO)]);

    cli()
        .args(["-p", path_arg(&proto_dir), "-o", path_arg(&dir.path().join("out")), "-t", "Robot"])
        .write_stdin(r#"{"name":"Ada"}"#)
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("can't find Robot in generated files"))
        .stderr(predicate::str::contains("--list_types"));
}

#[test]
fn empty_stdin_is_reported_before_unknown_type() {
    let dir = tempfile::tempdir().unwrap();
    let proto_dir = proto_tree(dir.path(), &[("Person.proto", PERSON_PROTO)]);

    cli()
        .args(["-p", path_arg(&proto_dir), "-o", path_arg(&dir.path().join("out")), "-t", "Robot"])
        .write_stdin("")
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("no JSON specified"))
        .stderr(predicate::str::contains("Robot").not());
}

#[test]
fn output_dir_above_proto_dir_keeps_sources() {
    let dir = tempfile::tempdir().unwrap();
    let proto_dir = proto_tree(dir.path(), &[("Person.proto", PERSON_PROTO)]);

    cli()
        .args(["-p", path_arg(&proto_dir), "-o", path_arg(dir.path()), "-t", "Person"])
        .write_stdin(r#"{"name":"Ada","id":7}"#)
        .assert()
        .success()
        .stdout(predicate::eq(ADA_BYTES))
        .stderr(predicate::str::contains("skipping cleanup"));
    assert!(proto_dir.join("Person.proto").is_file());
}

#[test]
fn unknown_field_aborts_and_names_the_field() {
    let dir = tempfile::tempdir().unwrap();
    let proto_dir = proto_tree(dir.path(), &[("Person.proto", PERSON_PROTO)]);
    let out = dir.path().join("out");
    let args = ["-p", path_arg(&proto_dir), "-o", path_arg(&out), "-t", "Person"];

    cli()
        .args(args)
        .write_stdin(r#"{"name":"Ada","nickname":"countess"}"#)
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("can't parse JSON input to Person message"))
        .stderr(predicate::str::contains("nickname"));

    cli()
        .args(args)
        .arg("--ignore_unknown_fields")
        .write_stdin(r#"{"name":"Ada","id":7,"nickname":"countess"}"#)
        .assert()
        .success()
        .stdout(predicate::eq(ADA_BYTES));
}

#[test]
fn broken_schema_is_skipped_and_logged() {
    let dir = tempfile::tempdir().unwrap();
    let proto_dir = proto_tree(
        dir.path(),
        &[
            ("Broken.proto", "syntax = \"proto3\"; message Broken { string x = ; }"),
            ("Person.proto", PERSON_PROTO),
        ],
    );

    cli()
        .args(["-p", path_arg(&proto_dir), "-o", path_arg(&dir.path().join("out")), "-t", "Person"])
        .write_stdin(r#"{"name":"Ada","id":7}"#)
        .assert()
        .success()
        .stdout(predicate::eq(ADA_BYTES))
        .stderr(predicate::str::contains("Broken.proto"));
}

#[test]
fn prefix_lookup_keeps_first_match_tie_break() {
    let dir = tempfile::tempdir().unwrap();
    let proto_dir = proto_tree(
        dir.path(),
        &[
            ("User-legacy.proto", "syntax = \"proto3\"; message LegacyUser { string id = 1; }"),
            ("User.proto", "syntax = \"proto3\"; message User { string id = 1; }"),
        ],
    );
    let out = dir.path().join("out");
    let args = ["-p", path_arg(&proto_dir), "-o", path_arg(&out), "-t", "User"];

    cli()
        .args(args)
        .args(["--lookup", "prefix"])
        .write_stdin(r#"{"id":"u1"}"#)
        .assert()
        .failure()
        .stderr(predicate::str::contains("no User in User-legacy_pb2.binpb module"));

    cli()
        .args(args)
        .write_stdin(r#"{"id":"u1"}"#)
        .assert()
        .success()
        .stdout(predicate::eq(&[0x0a, 0x02, b'u', b'1'][..]));
}

#[test]
fn list_types_prints_registered_messages() {
    let dir = tempfile::tempdir().unwrap();
    let proto_dir = proto_tree(
        dir.path(),
        &[
            ("Person.proto", PERSON_PROTO),
            ("shop/order.proto", "syntax = \"proto3\"; package shop; message Order { string id = 1; }"),
        ],
    );

    cli()
        .args(["-p", path_arg(&proto_dir), "-o", path_arg(&dir.path().join("out")), "--list_types"])
        .assert()
        .success()
        .stdout("Person\nshop.Order\n");
}

#[test]
fn protoc_backend_with_missing_binary_generates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let proto_dir = proto_tree(dir.path(), &[("Person.proto", PERSON_PROTO)]);

    cli()
        .args(["-p", path_arg(&proto_dir), "-o", path_arg(&dir.path().join("out")), "-t", "Person"])
        .args(["--compiler", "protoc", "--protoc", path_arg(&dir.path().join("no-protoc"))])
        .write_stdin(r#"{"name":"Ada"}"#)
        .assert()
        .failure()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("no files were generated"));
}

#[test]
fn type_is_required_unless_listing() {
    let dir = tempfile::tempdir().unwrap();
    cli()
        .args(["-p", path_arg(dir.path()), "-o", path_arg(&dir.path().join("out"))])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--type"));
}
