//! CLI integration tests for the csdl binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("csdl"))
}

// Helper to create a temp document
fn write_temp_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

const SALES: &str = r#"{
    "$Version": "4.01",
    "$EntityContainer": "Sales.Container",
    "Sales": {
        "Customer": {
            "$Kind": "EntityType",
            "$Key": ["ID"],
            "ID": {"$Type": "Edm.Int32"},
            "Name": {},
            "Orders": {"$Kind": "NavigationProperty", "$Type": "Sales.Order", "$Collection": true}
        },
        "Order": {
            "$Kind": "EntityType",
            "$Key": ["ID"],
            "ID": {"$Type": "Edm.Int32"},
            "Total": {"$Type": "Edm.Decimal"}
        },
        "Container": {
            "$Kind": "EntityContainer",
            "Customers": {"$Collection": true, "$Type": "Sales.Customer"}
        }
    }
}"#;

mod read_command {
    use super::*;

    #[test]
    fn prints_model() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "sales.json", SALES);

        cmd()
            .args(["read", doc.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""namespace":"Sales""#));
    }

    #[test]
    fn pretty_output() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "sales.json", SALES);

        cmd()
            .args(["read", doc.to_str().unwrap(), "--pretty"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\n  "));
    }

    #[test]
    fn output_to_file() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "sales.json", SALES);
        let output = dir.path().join("model.json");

        cmd()
            .args([
                "read",
                doc.to_str().unwrap(),
                "--output",
                output.to_str().unwrap(),
            ])
            .assert()
            .success()
            .stdout(predicate::str::is_empty());

        let written = fs::read_to_string(&output).unwrap();
        assert!(written.contains("Customer"));
    }

    #[test]
    fn resolves_sibling_reference() {
        let dir = TempDir::new().unwrap();
        write_temp_file(
            &dir,
            "common.json",
            r#"{"$Version": "4.0", "Common": {"Money": {"$Kind": "TypeDefinition", "$UnderlyingType": "Edm.Decimal"}}}"#,
        );
        let doc = write_temp_file(
            &dir,
            "main.json",
            r#"{
                "$Version": "4.0",
                "$Reference": {"common.json": {"$Include": [{"$Namespace": "Common"}]}},
                "Shop": {}
            }"#,
        );

        cmd()
            .args(["read", doc.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""referenced_models":{"common.json""#))
            .stdout(predicate::str::contains(r#""name":"Money""#));
    }

    #[test]
    fn missing_reference_fails() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(
            &dir,
            "main.json",
            r#"{
                "$Version": "4.0",
                "$Reference": {"absent.json": {"$Include": [{"$Namespace": "Absent"}]}}
            }"#,
        );

        cmd()
            .args(["read", doc.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("absent.json"));
    }

    #[test]
    fn missing_version_fails() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "bad.json", r#"{"Sales": {}}"#);

        cmd()
            .args(["read", doc.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("$Version"));
    }

    #[test]
    fn invalid_json_fails() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "bad.json", "{ not json }");

        cmd()
            .args(["read", doc.to_str().unwrap()])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("invalid JSON"));
    }

    #[test]
    fn file_not_found() {
        cmd()
            .args(["read", "/nonexistent/metadata.json"])
            .assert()
            .code(3)
            .stderr(predicate::str::contains("file not found"));
    }

    #[test]
    fn remote_base_requires_local_base() {
        cmd()
            .args([
                "read",
                "metadata.json",
                "--schema-remote-base",
                "https://example.com/",
            ])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--schema-local-base"));
    }
}

mod select_command {
    use super::*;

    #[test]
    fn select_properties() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "sales.json", SALES);

        cmd()
            .args([
                "select",
                doc.to_str().unwrap(),
                "--type",
                "Sales.Customer",
                "--select",
                "Name",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""all_selected":false"#))
            .stdout(predicate::str::contains(r#""name":"Name""#));
    }

    #[test]
    fn expand_then_select_navigation() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "sales.json", SALES);

        cmd()
            .args([
                "select",
                doc.to_str().unwrap(),
                "--type",
                "Sales.Customer",
                "--expand",
                "Orders",
                "--select",
                "Orders/Total",
            ])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""item":"expanded""#))
            .stdout(predicate::str::contains(r#""name":"Total""#));
    }

    #[test]
    fn select_without_expand_fails() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "sales.json", SALES);

        cmd()
            .args([
                "select",
                doc.to_str().unwrap(),
                "--type",
                "Sales.Customer",
                "--select",
                "Orders/Total",
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Orders/Total"))
            .stderr(predicate::str::contains("not expanded"));
    }

    #[test]
    fn unknown_type_fails() {
        let dir = TempDir::new().unwrap();
        let doc = write_temp_file(&dir, "sales.json", SALES);

        cmd()
            .args([
                "select",
                doc.to_str().unwrap(),
                "--type",
                "Sales.Nope",
                "--select",
                "Name",
            ])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("Sales.Nope"));
    }

    #[test]
    fn type_is_required() {
        cmd()
            .args(["select", "sales.json", "--select", "Name"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--type"));
    }
}

mod lint_command {
    use super::*;

    #[test]
    fn lint_valid_directory() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "sales.json", SALES);

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("all passed"));
    }

    #[test]
    fn lint_reports_errors() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "bad.json", r#"{"Sales": {}}"#);

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("E002"));
    }

    #[test]
    fn lint_json_format() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "sales.json", SALES);

        cmd()
            .args(["lint", dir.path().to_str().unwrap(), "--format", "json"])
            .assert()
            .success()
            .stdout(predicate::str::contains(r#""files_checked": 1"#));
    }

    #[test]
    fn lint_strict_fails_on_warnings() {
        let dir = TempDir::new().unwrap();
        write_temp_file(
            &dir,
            "warn.json",
            r#"{"$Version": "4.01", "Sales": {"Thing": {"$Kind": "EntityType", "$Bogus": 1}}}"#,
        );

        cmd()
            .args(["lint", dir.path().to_str().unwrap()])
            .assert()
            .success();

        cmd()
            .args(["lint", dir.path().to_str().unwrap(), "--strict"])
            .assert()
            .code(1)
            .stdout(predicate::str::contains("W001"));
    }

    #[test]
    fn lint_quiet_hides_passing_files() {
        let dir = TempDir::new().unwrap();
        write_temp_file(&dir, "sales.json", SALES);

        cmd()
            .args(["lint", dir.path().to_str().unwrap(), "--quiet"])
            .assert()
            .success()
            .stdout(predicate::str::contains("sales.json").not());
    }

    #[test]
    fn lint_missing_path() {
        cmd()
            .args(["lint", "/nonexistent/dir"])
            .assert()
            .code(2)
            .stderr(predicate::str::contains("path not found"));
    }
}
