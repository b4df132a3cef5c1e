// SPDX-License-Identifier: PMPL-1.0-or-later

//! End-to-end command-line scenarios

mod common;

use caret_command::ops;
use common::{caret, read_volume, s, write_volume};
use predicates::prelude::*;
use regex::Regex;
use std::fs;
use tempfile::TempDir;

#[test]
fn create_then_info_reports_the_new_grid() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out.nii");
    caret()
        .args(["-volume-create", "10", "20", "30", s(&out)])
        .assert()
        .success();

    let volume = read_volume(&out);
    assert_eq!(volume.dims, [10, 20, 30]);
    assert_eq!(volume.spacing, [1.0, 1.0, 1.0]);
    assert_eq!(volume.origin, [0.0, 0.0, 0.0]);
    assert!(volume.data.iter().all(|v| *v == 0.0));

    let output = caret().args(["-volume-info", s(&out)]).output().unwrap();
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "dimensions: 10, 20, 30, 1");
    assert_eq!(lines[1], "spacing: 1, 1, 1");
    assert_eq!(lines[2], "origin: 0, 0, 0");
    assert!(lines[3].starts_with("orientation:") && lines[3].contains("LPI"));
    assert_eq!(lines[4], "voxel range: 0, 0");
}

#[test]
fn labeled_output_sets_label_and_container() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.nii");
    write_volume(&input, [4, 4, 4], |i, j, k| (i * 64 + j * 16 + k) as f32);
    let out = dir.path().join("out.HEAD");
    caret()
        .args([
            "-volume-threshold",
            "128",
            s(&input),
            &format!("my_label:::{}", s(&out)),
        ])
        .assert()
        .success();

    assert!(dir.path().join("out.BRIK").exists());
    let source = read_volume(&input);
    let result = read_volume(&out);
    assert_eq!(result.label, "my_label");
    for (before, after) in source.data.iter().zip(&result.data) {
        assert!(*after == 0.0 || *after == 255.0);
        assert_eq!(*after == 255.0, *before >= 128.0);
    }
    assert_eq!(result.range(), (0.0, 255.0));
}

#[test]
fn spec_create_then_add() {
    let dir = TempDir::new().unwrap();
    let spec = dir.path().join("out.spec");
    caret()
        .args([
            "-spec-file-create",
            "human",
            "S1",
            "CORTEX_LEFT",
            "711-2B",
            "Atlas",
            s(&spec),
        ])
        .assert()
        .success();
    caret()
        .args([
            "-spec-file-add",
            s(&spec),
            "closed-topology-file",
            "brain.closed.topo",
        ])
        .assert()
        .success();

    let text = fs::read_to_string(&spec).unwrap();
    for line in [
        "Species human",
        "Subject S1",
        "Structure CORTEX_LEFT",
        "Space 711-2B",
        "Category Atlas",
    ] {
        assert!(text.lines().any(|l| l == line), "missing {line:?} in\n{text}");
    }
    let body: Vec<&str> = text
        .split("EndHeader")
        .nth(1)
        .unwrap()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .collect();
    assert_eq!(body, ["closed-topology-file brain.closed.topo"]);
}

#[test]
fn spec_add_twice_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let spec = dir.path().join("x.spec");
    let add = || {
        caret()
            .args(["-spec-file-add", s(&spec), "metric-file", "a.metric"])
            .assert()
            .success();
        fs::read_to_string(&spec).unwrap()
    };
    let once = add();
    assert_eq!(add(), once);
}

#[test]
fn brief_help_lists_every_operation() {
    let output = caret().arg("-help").output().unwrap();
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).unwrap();
    let line = Regex::new(r"^   [A-Z ].+   -[a-z-]+$").unwrap();
    for l in text.lines() {
        assert!(line.is_match(l), "bad help line {l:?}");
    }
    for op in ops::operations() {
        assert!(
            text.lines().any(|l| l.ends_with(&format!("   {}", op.flag))),
            "{} missing from help",
            op.flag
        );
    }
}

#[test]
fn help_is_deterministic() {
    let first = caret().arg("-help-full").output().unwrap();
    let dir = TempDir::new().unwrap();
    let second = caret()
        .arg("-help-full")
        .current_dir(dir.path())
        .output()
        .unwrap();
    assert!(first.status.success());
    assert_eq!(first.stdout, second.stdout);
}

#[test]
fn unknown_operation_is_reported_on_stdout() {
    caret()
        .arg("-not-a-real-op")
        .assert()
        .failure()
        .stdout(predicate::str::contains(
            "ERROR: Unrecognized operation: -not-a-real-op",
        ));
}

#[test]
fn missing_parameter_is_named_and_nothing_is_written() {
    let dir = TempDir::new().unwrap();
    caret()
        .arg("-volume-threshold")
        .current_dir(dir.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("Threshold value"))
        .stdout(predicate::str::contains("missing"));
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn every_operation_without_parameters_prints_its_help() {
    for op in ops::operations() {
        if op.params.iter().all(|p| p.starts_with('[')) {
            continue;
        }
        let output = caret().arg(op.flag).output().unwrap();
        let text = String::from_utf8(output.stdout).unwrap();
        assert!(!output.status.success(), "{} succeeded", op.flag);
        assert!(text.contains("ERROR"), "{} printed no diagnostic", op.flag);
        assert!(
            text.contains(&format!("{} \\", op.flag)),
            "{} printed no usage",
            op.flag
        );
    }
}

#[test]
fn bare_operation_prints_diagnostic_then_full_help() {
    let output = caret().arg("-volume-threshold").output().unwrap();
    assert!(!output.status.success());
    let text = String::from_utf8(output.stdout).unwrap();
    let diagnostic = text.find("ERROR: Threshold value: missing").unwrap();
    let usage = text.find("-volume-threshold \\").unwrap();
    assert!(diagnostic < usage);

    for flag in ["-help", "-help-full", "-version"] {
        caret().arg(flag).assert().success();
    }
}

#[test]
fn malformed_parameter_is_named() {
    caret()
        .args(["-volume-threshold", "high", "in.nii", "out.nii"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("ERROR: Threshold value:"));
}

#[test]
fn axis_parser_accepts_only_xyz() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in.nii");
    write_volume(&input, [3, 3, 3], |i, _, _| i as f32);
    let out = dir.path().join("out.nii");
    for axis in ["X", "y", "Z"] {
        caret()
            .args(["-volume-shift-axis", s(&input), s(&out), axis, "1"])
            .assert()
            .success();
    }
    for axis in ["W", "xy", "1", ""] {
        caret()
            .args(["-volume-shift-axis", s(&input), s(&out), axis, "1"])
            .assert()
            .failure()
            .stdout(predicate::str::contains("ERROR: Axis:"));
    }
}

#[test]
fn failures_that_print_error_exit_non_zero() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("missing.nii");
    caret()
        .args(["-volume-info", s(&missing)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR reading"));
}

#[test]
fn no_arguments_points_at_help() {
    caret()
        .assert()
        .failure()
        .stdout(predicate::str::contains("-help-full"));
}
