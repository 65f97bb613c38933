//! Integration tests for the binary using `assert_cmd`.

use anyhow::{Context, Result, ensure};
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn prepared() -> Result<tempfile::TempDir> {
    let temp = tempdir().context("create temp dir")?;
    let work = temp.path().join("work");
    fs::create_dir_all(&work).context("create work directory")?;
    fs::copy("tests/data/workspace.yml", work.join("slnweave.yml"))
        .context("copy workspace document")?;
    Ok(temp)
}

#[test]
fn generate_is_the_default_command() -> Result<()> {
    let temp = prepared()?;
    Command::cargo_bin("slnweave")
        .context("locate slnweave binary")?
        .current_dir(temp.path().join("work"))
        .assert()
        .success();
    ensure!(
        temp.path().join("work/Solutions/Demo.sln").exists(),
        "solution should be generated"
    );
    Ok(())
}

#[test]
fn directory_flag_resolves_document_and_outputs() -> Result<()> {
    let temp = prepared()?;
    Command::cargo_bin("slnweave")
        .context("locate slnweave binary")?
        .current_dir(temp.path())
        .args(["-C", "work", "generate", "--solution-name", "Client"])
        .assert()
        .success();
    let projects = temp.path().join("work/Solutions/Client.depproj");
    ensure!(projects.join("app.vcxproj").exists(), "app descriptor missing");
    ensure!(!temp.path().join("Solutions").exists(), "wrote outside -C");
    Ok(())
}

#[test]
fn list_prints_project_names() -> Result<()> {
    let temp = prepared()?;
    Command::cargo_bin("slnweave")
        .context("locate slnweave binary")?
        .current_dir(temp.path())
        .args(["-C", "work", "list"])
        .assert()
        .success()
        .stdout(predicate::eq("_ALL_\napp\nlib\n"));
    Ok(())
}

#[test]
fn missing_document_fails() -> Result<()> {
    let temp = tempdir().context("create temp dir")?;
    Command::cargo_bin("slnweave")
        .context("locate slnweave binary")?
        .current_dir(temp.path())
        .args(["-f", "absent.yml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.yml"));
    Ok(())
}

#[test]
fn unknown_default_project_fails() -> Result<()> {
    let temp = prepared()?;
    Command::cargo_bin("slnweave")
        .context("locate slnweave binary")?
        .current_dir(temp.path().join("work"))
        .args(["generate", "--default-project", "tool"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("default project `tool`"));
    ensure!(
        !temp.path().join("work/Solutions").exists(),
        "failed runs must not write files"
    );
    Ok(())
}
