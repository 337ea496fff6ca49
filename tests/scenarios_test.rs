//! End-to-end scenarios over whole source trees

use protogen::{Diagnostic, UpdateOptions, UpdateReport, update_workspace};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

fn update(root: &Path) -> UpdateReport {
    update_workspace(&UpdateOptions {
        root: root.to_path_buf(),
        ..Default::default()
    })
    .unwrap()
}

fn two_packages() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(dir.path(), ".git/HEAD", "ref: refs/heads/main\n");
    write(dir.path(), "pkg/a/a.proto", "syntax = \"proto3\";\npackage pkg.a;\n\nmessage A {}\n");
    write(
        dir.path(),
        "pkg/b/b.proto",
        "syntax = \"proto3\";\npackage pkg.b;\n\nimport \"pkg/a/a.proto\";\n\nmessage B {\n  pkg.a.A a = 1;\n}\n",
    );
    dir
}

#[test]
fn test_four_declarations_across_two_packages() {
    let dir = two_packages();
    let report = update(dir.path());

    let mut names: Vec<&str> = report
        .results
        .iter()
        .flat_map(|r| r.generated.iter().map(|d| d.name.as_str()))
        .collect();
    names.sort();
    assert_eq!(names, vec!["a_go", "a_py", "b_go", "b_py"]);

    assert_eq!(
        read(dir.path(), "pkg/b/BUILD.bazel"),
        r#"load("//rules:go_proto_library.bzl", "go_proto_library")
load("//rules:py_proto_library.bzl", "py_proto_library")

go_proto_library(
    name = "b_go",
    srcs = ["b.proto"],
    deps = ["//pkg/a:a_go"],
    visibility = ["//visibility:public"],
)

py_proto_library(
    name = "b_py",
    srcs = ["b.proto"],
    deps = ["//pkg/a:a_py"],
    visibility = ["//visibility:public"],
)
"#
    );
    assert!(report.diagnostics().is_empty());
}

#[test]
fn test_second_run_is_byte_identical() {
    let dir = two_packages();
    update(dir.path());
    let a = read(dir.path(), "pkg/a/BUILD.bazel");
    let b = read(dir.path(), "pkg/b/BUILD.bazel");

    let report = update(dir.path());
    assert!(report.changed.is_empty());
    assert_eq!(read(dir.path(), "pkg/a/BUILD.bazel"), a);
    assert_eq!(read(dir.path(), "pkg/b/BUILD.bazel"), b);
}

#[test]
fn test_adopted_unit_is_reused() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "pkg/c/BUILD.bazel",
        r#"# Hand-written
proto_library(
    name = "x_proto",
    srcs = ["x.proto"],
)
"#,
    );
    write(dir.path(), "pkg/c/x.proto", "syntax = \"proto3\";\n");
    write(dir.path(), "pkg/c/y.proto", "syntax = \"proto3\";\nimport \"pkg/c/x.proto\";\n");

    update(dir.path());
    let build = read(dir.path(), "pkg/c/BUILD.bazel");

    assert!(build.contains("# Hand-written\nproto_library(\n    name = \"x_proto\","));
    assert!(build.contains("    name = \"x_go\",\n    srcs = [\"x.proto\"],\n    proto = \":x_proto\","));
    assert!(build.contains("    name = \"c_go\",\n    srcs = [\"y.proto\"],\n    deps = [\":x_go\"],"));
    // y.proto is not part of the hand-written unit
    assert!(!build.contains("srcs = [\n"));
}

#[test]
fn test_removed_sources_delete_their_declarations() {
    let dir = two_packages();
    write(dir.path(), "pkg/b/BUILD.bazel", "# gazelle:proto_plugin go\n\nfilegroup(name = \"docs\")\n");
    update(dir.path());
    assert!(read(dir.path(), "pkg/b/BUILD.bazel").contains("b_go"));

    fs::remove_file(dir.path().join("pkg/b/b.proto")).unwrap();
    let report = update(dir.path());

    let build = read(dir.path(), "pkg/b/BUILD.bazel");
    assert!(!build.contains("go_proto_library("));
    assert!(build.contains("filegroup(name = \"docs\")"));
    assert!(build.contains("# gazelle:proto_plugin go"));
    let b = report.results.iter().find(|r| r.rel == "pkg/b").unwrap();
    assert_eq!(b.empty.len(), 1);
}

#[test]
fn test_plugin_outputs_never_cross() {
    let dir = two_packages();
    write(dir.path(), "pkg/a/BUILD.bazel", "# gazelle:proto_plugin go\n");
    let report = update(dir.path());

    let b = read(dir.path(), "pkg/b/BUILD.bazel");
    assert!(b.contains("deps = [\"//pkg/a:a_go\"]"));
    assert!(!b.contains("//pkg/a:a_py"));

    let diagnostics = report.diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert!(matches!(
        diagnostics[0],
        Diagnostic::UnresolvedImport { declaration, .. } if declaration == "//pkg/b:b_py"
    ));
}

#[test]
fn test_no_self_dependency() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "pkg/s/one.proto", "syntax = \"proto3\";\nimport \"pkg/s/two.proto\";\n");
    write(dir.path(), "pkg/s/two.proto", "syntax = \"proto3\";\n");
    update(dir.path());

    let build = read(dir.path(), "pkg/s/BUILD.bazel");
    assert!(!build.contains("deps"));
    assert!(build.contains("srcs = [\n        \"one.proto\",\n        \"two.proto\",\n    ],"));
}

#[test]
fn test_settings_plugin_and_rule_kind() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "protogen.toml",
        r#"
default_plugins = ["go", "grpc_go"]
load_prefix = "//tools/rules"

[[plugin]]
name = "ts"
language = "typescript"
merge_directories = true
"#,
    );
    write(dir.path(), "svc/BUILD", "# gazelle:proto_rule proto_compile\n# gazelle:proto_plugin +ts\n");
    write(dir.path(), "svc/svc.proto", "syntax = \"proto3\";\nservice Svc {}\n");

    let report = update(dir.path());
    let build = read(dir.path(), "svc/BUILD");
    assert!(build.contains("load(\"//tools/rules:go_grpc_proto_compile.bzl\", \"go_grpc_proto_compile\")"));
    assert!(build.contains("    deps = [\n        \":svc_go\",\n        \"@org_golang_google_grpc//:go_default_library\",\n    ],"));
    assert!(build.contains("ts_proto_compile(\n    name = \"svc_ts\","));

    let svc = report.results.iter().find(|r| r.rel == "svc").unwrap();
    assert!(svc.generated.iter().any(|d| d.plugin == "ts" && d.merge_directories));
}

#[test]
fn test_hand_written_declarations_survive() {
    let dir = two_packages();
    let custom = r#"go_proto_library(
    name = "custom_go",
    srcs = ["a.proto"],
    importpath = "example.com/custom",
)
"#;
    write(dir.path(), "pkg/a/BUILD.bazel", custom);
    update(dir.path());

    let build = read(dir.path(), "pkg/a/BUILD.bazel");
    assert!(build.contains(custom));
    assert!(build.contains("name = \"a_go\""));
    assert!(build.contains("name = \"a_py\""));
}

#[test]
fn test_unit_names_do_not_collide() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "pkg/x/BUILD.bazel",
        r#"proto_library(name = "foo_proto", srcs = ["a.proto"])

proto_library(name = "foo", srcs = ["b.proto"])
"#,
    );
    write(dir.path(), "pkg/x/a.proto", "syntax = \"proto3\";\n");
    write(dir.path(), "pkg/x/b.proto", "syntax = \"proto3\";\n");

    let report = update(dir.path());
    let x = report.results.iter().find(|r| r.rel == "pkg/x").unwrap();
    let names: Vec<&str> = x.generated.iter().map(|d| d.name.as_str()).collect();
    assert_eq!(names, vec!["foo_go", "foo_py", "foo_2_go", "foo_2_py"]);

    let again = update(dir.path());
    assert!(again.changed.is_empty());
}
