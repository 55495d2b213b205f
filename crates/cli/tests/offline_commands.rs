use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use tempfile::tempdir;

#[allow(deprecated)]
fn buildscope() -> Command {
    let mut cmd = Command::cargo_bin("buildscope").expect("binary");
    cmd.env("RUST_LOG", "warn");
    cmd
}

#[test]
fn experiments_are_deduplicated_across_files() {
    let temp = tempdir().unwrap();
    let first = temp.path().join("first.js");
    let second = temp.path().join("second.js");
    fs::write(
        &first,
        r#"e.exports={a:{kind:"user",id:"2024-01_alpha",label:"Alpha",defaultConfig:{enabled:!1},treatments:[{id:1,label:"On",config:{enabled:!0}}]}};"#,
    )
    .unwrap();
    fs::write(
        &second,
        r#"x({kind:"guild",id:"2024-01_alpha",label:"Later copy"});x({kind:"guild",id:"2024-02_beta",label:"Beta"});"#,
    )
    .unwrap();

    let output = buildscope()
        .arg("experiments")
        .arg(&first)
        .arg(&second)
        .output()
        .expect("command run");
    assert!(output.status.success());

    let experiments: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    let experiments = experiments.as_array().unwrap();
    assert_eq!(experiments.len(), 2);
    assert_eq!(experiments[0]["id"], "2024-01_alpha");
    assert_eq!(experiments[0]["label"], "Alpha");
    assert_eq!(experiments[0]["treatments"][0]["config"]["enabled"], true);
    assert_eq!(experiments[1]["kind"], "guild");
}

#[test]
fn experiments_fail_on_malformed_script() {
    let temp = tempdir().unwrap();
    let broken = temp.path().join("broken.js");
    fs::write(&broken, "function (").unwrap();

    buildscope()
        .arg("experiments")
        .arg(&broken)
        .assert()
        .failure()
        .stderr(predicate::str::contains("broken.js"));
}

#[test]
fn classify_reports_loader_references() {
    let temp = tempdir().unwrap();
    let loader = temp.path().join("0123456789abcdef0123.js");
    fs::write(
        &loader,
        r#"r.u=function(e){return""+{1:"aaaaaaaaaaaaaaaaaaaa",2:"bbbbbbbbbbbbbbbbbbbb"}[e]+".js"};"#,
    )
    .unwrap();

    let output = buildscope()
        .arg("classify")
        .arg(&loader)
        .output()
        .expect("command run");
    assert!(output.status.success());

    let asset: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(asset["name"], "0123456789abcdef0123.js");
    assert_eq!(
        asset["tags"],
        serde_json::json!(["JavaScript", "WebpackChunkLoader"])
    );
    assert_eq!(
        asset["references"],
        serde_json::json!(["aaaaaaaaaaaaaaaaaaaa.js", "bbbbbbbbbbbbbbbbbbbb.js"])
    );
    assert!(asset["metadata"].get("text").is_none());
}

#[test]
fn classify_honours_content_type_override() {
    let temp = tempdir().unwrap();
    let file = temp.path().join("styles.bin");
    fs::write(&file, ".a{color:red}").unwrap();

    let output = buildscope()
        .arg("classify")
        .arg(&file)
        .arg("--content-type")
        .arg("text/css; charset=utf-8")
        .output()
        .expect("command run");
    assert!(output.status.success());

    let asset: Value = serde_json::from_slice(&output.stdout).expect("valid json");
    assert_eq!(asset["tags"], serde_json::json!(["StyleSheet"]));
}

#[test]
fn unknown_channel_is_rejected() {
    buildscope()
        .args(["crawl", "--channel", "nightly"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown release channel"));
}
