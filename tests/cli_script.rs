mod common;

use std::fs;

use assert_cmd::Command;
use predicates::str::contains;

fn scripted(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("budget_ledger").unwrap();
    cmd.env("BUDGET_LEDGER_HOME", home)
        .env("BUDGET_LEDGER_SCRIPT", "1")
        .env("NO_COLOR", "1");
    cmd
}

#[test]
fn script_mode_records_and_saves_a_debit() {
    let home = common::scratch_dir();
    let input = "debit Gifts 25\n12 27 20\nSam's 24th\nsave\nexit\n";

    scripted(&home)
        .write_stdin(input)
        .assert()
        .success()
        .stdout(contains("date [month day year]"))
        .stdout(contains("description [anything]"))
        .stdout(contains("$25.00 12/27/2020 Sam's 24th -> Gifts"));

    let saved = fs::read_to_string(home.join("budget.txt")).unwrap();
    assert!(saved.contains("Gifts\ncredits\ndebits\n25 Sam's 24th 12/27/2020\n"));
    let config = fs::read_to_string(home.join("config.json")).unwrap();
    assert!(config.contains("budget.txt"));
}

#[test]
fn blank_rename_leaves_a_loadable_ledger() {
    let home = common::scratch_dir();
    scripted(&home)
        .write_stdin("transferto Food 50\n6 3 21\nrename Food\n\nsave\nexit\n")
        .assert()
        .success()
        .stdout(contains("rename refused"));

    scripted(&home)
        .write_stdin("print\nexit\n")
        .assert()
        .success()
        .stdout(contains("Food"));
}

#[test]
fn existing_ledger_is_loaded_at_start() {
    let home = common::scratch_dir();
    fs::write(
        home.join("budget.txt"),
        "master\ncredits\n^2134.35 btnrh 11/22/2019\ndebits\n",
    )
    .unwrap();

    scripted(&home)
        .write_stdin("print\nquit\n")
        .assert()
        .success()
        .stdout(contains("$2134.35"))
        .stdout(contains("Debit ($)   Credit ($)   Date (mm/dd/yyyy)   Description"));
}

#[test]
fn unknown_commands_are_reported() {
    let home = common::scratch_dir();
    scripted(&home)
        .write_stdin("trnasferto Food 5\nexit\n")
        .assert()
        .success()
        .stdout(contains("unknown command \"trnasferto\""))
        .stdout(contains("did you mean `transferto`?"));
}

#[test]
fn data_file_argument_overrides_configuration() {
    let home = common::scratch_dir();
    let ledger = home.join("elsewhere.txt");
    scripted(&home)
        .arg(&ledger)
        .write_stdin("transferto Groceries 50\n6 3 21\nsave\n")
        .assert()
        .success();

    let saved = fs::read_to_string(&ledger).unwrap();
    assert!(saved.contains("^50 transfer to Groceries 6/3/2021"));
    assert!(!home.join("budget.txt").exists());
}

#[test]
fn corrupt_ledger_fails_at_start() {
    let home = common::scratch_dir();
    fs::write(home.join("budget.txt"), "master\noops\n").unwrap();
    scripted(&home)
        .write_stdin("exit\n")
        .assert()
        .failure()
        .stderr(contains("line 2"));
}

#[test]
fn version_flag_prints_build_info() {
    Command::cargo_bin("budget_ledger")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(contains("budget_ledger"));
}
