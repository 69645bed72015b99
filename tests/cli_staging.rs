#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use hedera_stage::plan::{StagePlan, write_plan};
use tempfile::tempdir;

fn write_script(path: &Path, body: &str) -> PathBuf {
    fs::write(path, format!("#!/bin/sh\n{body}")).unwrap();
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
    path.to_path_buf()
}

fn stage(dir: &Path, plan: &str, extra: &[&str]) -> std::process::Output {
    Command::cargo_bin("hedera-stage")
        .expect("binary present")
        .current_dir(dir)
        .args(["run", "--plan", plan])
        .args(extra)
        .output()
        .unwrap()
}

// One test only: a fork from another test thread while a script is still
// open for writing makes exec fail with ETXTBSY.
#[test]
fn stages_archives_with_a_stand_in_toolchain() {
    let temp = tempdir().unwrap();
    let work = temp.path();

    let builder = write_script(
        &work.join("fake-cargo"),
        "set -e\nmkdir -p \"target/$4/release\"\nprintf 'archive-%s' \"$4\" > \"target/$4/release/libhedera.a\"\n",
    );
    let broken = write_script(&work.join("broken-cargo"), "echo boom >&2\nexit 7\n");

    let plan = StagePlan {
        toolchain: builder.to_string_lossy().to_string(),
        ..StagePlan::default()
    }
    .with_targets(["x86_64-apple-darwin", "aarch64-apple-darwin"]);
    write_plan(&plan, &work.join("good.yaml")).unwrap();

    let first = stage(work, "good.yaml", &["--manifest", "manifest.yaml"]);
    assert!(first.status.success(), "{}", String::from_utf8_lossy(&first.stderr));
    let echoed: Vec<String> = String::from_utf8(first.stdout)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    assert_eq!(echoed.len(), 6);
    assert_eq!(
        echoed[0],
        format!(
            "> {} build --release --target x86_64-apple-darwin",
            builder.display()
        )
    );
    assert_eq!(echoed[1], "> mkdir -p ./hedera-sdk-go/libs/x86_64-apple-darwin");
    assert_eq!(
        echoed[5],
        "> cp target/aarch64-apple-darwin/release/libhedera.a ./hedera-sdk-go/libs/aarch64-apple-darwin/libhedera.a"
    );

    let staged = work.join("hedera-sdk-go/libs/x86_64-apple-darwin/libhedera.a");
    assert_eq!(
        fs::read_to_string(&staged).unwrap(),
        "archive-x86_64-apple-darwin"
    );
    let manifest = fs::read_to_string(work.join("manifest.yaml")).unwrap();
    assert!(manifest.contains("aarch64-apple-darwin"));

    // existing directories and archives are fine on a second run
    let second = stage(work, "good.yaml", &[]);
    assert!(second.status.success());
    assert_eq!(
        fs::read_to_string(&staged).unwrap(),
        "archive-x86_64-apple-darwin"
    );
    let libs: Vec<_> = fs::read_dir(work.join("hedera-sdk-go/libs"))
        .unwrap()
        .collect();
    assert_eq!(libs.len(), 2);

    let failing = StagePlan {
        toolchain: broken.to_string_lossy().to_string(),
        ..plan
    }
    .with_targets(["i686-unknown-linux-gnu", "x86_64-unknown-linux-gnu"]);
    write_plan(&failing, &work.join("bad.yaml")).unwrap();

    let output = stage(work, "bad.yaml", &[]);
    assert_eq!(output.status.code(), Some(7));
    assert_eq!(String::from_utf8(output.stdout).unwrap().lines().count(), 1);
    assert!(String::from_utf8_lossy(&output.stderr).contains("boom"));
    assert!(!work.join("hedera-sdk-go/libs/i686-unknown-linux-gnu").exists());
}
