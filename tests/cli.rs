use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn finn(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("finn").unwrap();
    cmd.env("HOME", home).env_remove("RUST_LOG");
    cmd
}

const MAPPING: &str = r#"{
    "mapping": ["date", "description", "amount", "contact"],
    "config": {"headerline": true},
    "templates": [
        {"template": "PAYROLL", "type": "C", "category": "Salary"}
    ]
}"#;

fn setup(home: &Path) -> std::path::PathBuf {
    let data = home.join("data");
    finn(home)
        .args(["init", "--data-dir"])
        .arg(&data)
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized finn"));
    std::fs::write(data.join("mappings").join("Chequing.json"), MAPPING).unwrap();
    finn(home)
        .args([
            "accounts",
            "add",
            "Chequing",
            "--opening-balance",
            "100",
            "--opening-date",
            "2020-01-01",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added account: Chequing"));
    data
}

#[test]
fn import_list_and_refuse_duplicate() {
    let home = tempfile::tempdir().unwrap();
    setup(home.path());
    let csv = home.path().join("jan.csv");
    std::fs::write(
        &csv,
        "Date,Description,Amount,Contact\n\
         01/15/2020,PAYROLL DEPOSIT,2500.00,ACME\n\
         01/16/2020,Coffee,-4.50,\n",
    )
    .unwrap();

    finn(home.path())
        .arg("import")
        .arg(&csv)
        .args(["--account", "Chequing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Completed"))
        .stdout(predicate::str::contains("2 rows, 2 imported, 0 rejected"));

    finn(home.path())
        .arg("import")
        .arg(&csv)
        .args(["--account", "Chequing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already imported"));

    finn(home.path())
        .args(["transactions", "list", "--account", "Chequing"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Coffee"))
        .stdout(predicate::str::contains("Opening Balance"));

    finn(home.path())
        .args(["refs", "contacts"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ACME"));

    finn(home.path())
        .args(["accounts", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2,595.50 CAD"));

    finn(home.path())
        .args(["imports", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("jan.csv"));
}

#[test]
fn all_rows_rejected_exits_non_zero() {
    let home = tempfile::tempdir().unwrap();
    setup(home.path());
    let csv = home.path().join("bad.csv");
    std::fs::write(&csv, "Date,Description,Amount\n2020-01-15,Coffee,abc\n").unwrap();

    finn(home.path())
        .arg("import")
        .arg(&csv)
        .args(["--account", "Chequing"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("row 1:"))
        .stderr(predicate::str::contains("Error: import #1 failed"));

    finn(home.path())
        .args(["imports", "show", "1", "--data"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2020-01-15,Coffee,abc"));
}

#[test]
fn unknown_account_is_reported() {
    let home = tempfile::tempdir().unwrap();
    setup(home.path());
    let csv = home.path().join("jan.csv");
    std::fs::write(&csv, "").unwrap();
    finn(home.path())
        .arg("import")
        .arg(&csv)
        .args(["--account", "Savings"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown account: Savings"));
}

#[test]
fn commands_need_init_first() {
    let home = tempfile::tempdir().unwrap();
    finn(home.path())
        .args(["accounts", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("finn init"));
    finn(home.path())
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Database not found"));
}
