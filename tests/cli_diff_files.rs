use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};

fn run(args: &[&str]) -> Result<std::process::Output> {
    Command::new(env!("CARGO_BIN_EXE_config-inspector"))
        .args(args)
        .output()
        .context("spawn config-inspector")
}

fn write(dir: &Path, name: &str, contents: &str) -> Result<String> {
    let path = dir.join(name);
    std::fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    Ok(path.to_str().context("non-utf8 temp path")?.to_string())
}

#[test]
fn diffs_two_properties_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let base = write(dir.path(), "base.properties", "a=1\nb=2\n")?;
    let compare = write(dir.path(), "compare.properties", "a=1\nb=3\n")?;

    let out = run(&["diff", "--base-file", &base, "--compare-file", &compare])?;
    assert!(out.status.success());
    assert_eq!(String::from_utf8(out.stdout)?, " a=1\n-b=2\n+b=3\n");
    Ok(())
}

#[test]
fn diffs_two_json_documents_structurally() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let base = write(dir.path(), "base.json", "{\"a\":1}")?;
    let compare = write(dir.path(), "compare.json", "{\"a\":2}")?;

    let out = run(&["diff", "--base-file", &base, "--compare-file", &compare])?;
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8(out.stdout)?,
        " {\n-  \"a\": 1\n+  \"a\": 2\n }\n"
    );
    Ok(())
}

#[test]
fn unterminated_last_line_gets_its_own_row() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let base = write(dir.path(), "base.properties", "a=1\nb=2")?;
    let compare = write(dir.path(), "compare.properties", "a=1\nb=3")?;

    let out = run(&["diff", "--base-file", &base, "--compare-file", &compare])?;
    assert!(out.status.success());
    assert_eq!(String::from_utf8(out.stdout)?, " a=1\n-b=2\n+b=3\n");
    Ok(())
}

#[test]
fn mixed_representations_produce_no_diff_output() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let base = write(dir.path(), "base.json", "{\"a\":1}")?;
    let compare = write(dir.path(), "compare.properties", "a=1\n")?;

    let out = run(&["diff", "--base-file", &base, "--compare-file", &compare])?;
    assert!(out.status.success());
    assert_eq!(String::from_utf8(out.stdout)?, "");
    Ok(())
}

#[test]
fn base_file_without_compare_file_fails() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let base = write(dir.path(), "base.properties", "a=1\n")?;

    let out = run(&["diff", "--base-file", &base])?;
    assert!(!out.status.success());
    Ok(())
}

#[test]
fn link_prints_the_shareable_query() -> Result<()> {
    let out = run(&[
        "link",
        "--url",
        "https://config.example.com/v2",
        "--app",
        "billing",
        "--profiles",
        "dev,qa",
        "--label",
        "feature/x",
    ])?;
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8(out.stdout)?,
        "?profiles=dev,qa&label=feature/x&url=https://config.example.com/v2&appName=billing\n"
    );
    Ok(())
}

#[test]
fn portal_link_omits_identity() -> Result<()> {
    let out = run(&[
        "link",
        "--url",
        "https://config.example.com/v2",
        "--app",
        "billing",
        "--profiles",
        "dev",
        "--portal",
    ])?;
    assert!(out.status.success());
    assert_eq!(String::from_utf8(out.stdout)?, "?profiles=dev&label=master\n");
    Ok(())
}

#[test]
fn bad_header_argument_is_rejected() -> Result<()> {
    let out = run(&[
        "labels",
        "--user",
        "org",
        "--repo",
        "config",
        "--header",
        "missing-separator",
    ])?;
    assert!(!out.status.success());
    Ok(())
}
