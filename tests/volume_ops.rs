// SPDX-License-Identifier: PMPL-1.0-or-later

mod common;

use caret_command::spec_file::SpecFile;
use common::{caret, read_volume, s, write_volume};
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn ramp(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("ramp.nii");
    write_volume(&path, [5, 4, 3], |i, j, k| (i + 10 * j + 100 * k) as f32);
    path
}

#[test]
fn copy_between_containers_keeps_voxels_and_geometry() {
    let dir = TempDir::new().unwrap();
    let input = ramp(&dir);
    for name in ["copy.hdr", "copy.HEAD", "copy.ifh", "copy.nii.gz"] {
        let out = dir.path().join(name);
        caret()
            .args(["-volume-copy", s(&input), s(&out)])
            .assert()
            .success();
        let original = read_volume(&input);
        let copy = read_volume(&out);
        assert_eq!(copy.dims, original.dims, "{name}");
        assert_eq!(copy.spacing, original.spacing, "{name}");
        assert_eq!(copy.origin, original.origin, "{name}");
        assert_eq!(copy.data, original.data, "{name}");
    }
}

#[test]
fn math_identities_hold() {
    let dir = TempDir::new().unwrap();
    let input = ramp(&dir);
    let zero = dir.path().join("zero.nii");
    write_volume(&zero, [5, 4, 3], |_, _, _| 0.0);

    let sum = dir.path().join("sum.nii");
    caret()
        .args(["-volume-math", "ADD", s(&input), s(&zero), "NULL", s(&sum)])
        .assert()
        .success();
    assert_eq!(read_volume(&sum).data, read_volume(&input).data);

    let difference = dir.path().join("difference.nii");
    caret()
        .args(["-volume-math", "SUBTRACT", s(&input), s(&input), "", s(&difference)])
        .assert()
        .success();
    assert!(read_volume(&difference).data.iter().all(|v| *v == 0.0));
}

#[test]
fn math_rejects_mismatched_grids() {
    let dir = TempDir::new().unwrap();
    let input = ramp(&dir);
    let small = dir.path().join("small.nii");
    write_volume(&small, [2, 2, 2], |_, _, _| 1.0);
    let out = dir.path().join("out.nii");
    caret()
        .args(["-volume-math", "ADD", s(&input), s(&small), "NULL", s(&out)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR"));
    assert!(!out.exists());
}

#[test]
fn create_in_stereotaxic_space() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("atlas.nii");
    caret()
        .args(["-volume-create", "711-2B", s(&out)])
        .assert()
        .success();
    let volume = read_volume(&out);
    assert_eq!(volume.dims, [176, 208, 176]);
    assert_eq!(volume.origin, [-89.0, -125.0, -71.0]);
}

#[test]
fn create_rejects_unknown_space() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("atlas.nii");
    caret()
        .args(["-volume-create", "NOT-A-SPACE", s(&out)])
        .assert()
        .failure()
        .stdout(predicate::str::contains("ERROR: Stereotaxic space:"));
}

#[test]
fn create_refuses_a_dimension_the_header_cannot_hold() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("wide.nii");
    caret()
        .args(["-volume-create", "40000", "1", "1", s(&out)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("ERROR writing"))
        .stderr(predicate::str::contains("40000"));
    assert!(!out.exists());
}

#[test]
fn set_orientation_rejects_lowercase_letters() {
    let dir = TempDir::new().unwrap();
    let input = ramp(&dir);
    let out = dir.path().join("oriented.nii");
    caret()
        .args(["-volume-set-orientation", s(&input), s(&out), "lpi"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("ERROR: Orientation:"));
    assert!(!out.exists());

    caret()
        .args(["-volume-set-orientation", s(&input), s(&out), "RPI"])
        .assert()
        .success();
    assert_eq!(read_volume(&out).dims, [5, 4, 3]);
}

#[test]
fn rectangle_then_find_limits_reports_the_half_open_extent() {
    let dir = TempDir::new().unwrap();
    let blank = dir.path().join("blank.nii");
    write_volume(&blank, [10, 10, 10], |_, _, _| 0.0);
    let boxed = dir.path().join("box.nii");
    caret()
        .args([
            "-volume-make-rectangle",
            s(&blank),
            s(&boxed),
            "2",
            "5",
            "3",
            "7",
            "0",
            "10",
            "1",
        ])
        .assert()
        .success();

    let volume = read_volume(&boxed);
    let count = volume.data.iter().filter(|v| **v == 1.0).count();
    assert_eq!(count, 3 * 4 * 10);

    let limits = dir.path().join("limits.txt");
    caret()
        .args(["-volume-find-limits", s(&boxed), s(&limits)])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 5 3 7 0 10"));
    assert_eq!(fs::read_to_string(&limits).unwrap().trim(), "2 5 3 7 0 10");
}

#[test]
fn find_limits_of_empty_volume_fails() {
    let dir = TempDir::new().unwrap();
    let blank = dir.path().join("blank.nii");
    write_volume(&blank, [3, 3, 3], |_, _, _| 0.0);
    let limits = dir.path().join("limits.txt");
    caret()
        .args(["-volume-find-limits", s(&blank), s(&limits)])
        .assert()
        .failure();
    assert!(!limits.exists());
}

#[test]
fn dilate_grows_by_face_neighbours() {
    let dir = TempDir::new().unwrap();
    let dot = dir.path().join("dot.nii");
    write_volume(&dot, [5, 5, 5], |i, j, k| {
        if (i, j, k) == (2, 2, 2) {
            1.0
        } else {
            0.0
        }
    });
    let out = dir.path().join("dilated.nii");
    caret()
        .args(["-volume-dilate", s(&dot), s(&out), "1"])
        .assert()
        .success();
    let volume = read_volume(&out);
    assert_eq!(volume.data.iter().filter(|v| **v == 255.0).count(), 7);

    let eroded = dir.path().join("eroded.nii");
    caret()
        .args(["-volume-erode", s(&out), s(&eroded), "1"])
        .assert()
        .success();
    let volume = read_volume(&eroded);
    assert_eq!(volume.data.iter().filter(|v| **v != 0.0).count(), 1);
    assert_eq!(volume.get(2, 2, 2), 255.0);
}

#[test]
fn mask_by_extent_zeroes_outside() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("ones.nii");
    write_volume(&input, [4, 4, 4], |_, _, _| 3.0);
    let out = dir.path().join("masked.nii");
    caret()
        .args([
            "-volume-mask-extent",
            s(&input),
            s(&out),
            "0",
            "2",
            "0",
            "4",
            "0",
            "4",
        ])
        .assert()
        .success();
    let volume = read_volume(&out);
    assert_eq!(volume.get(1, 3, 3), 3.0);
    assert_eq!(volume.get(2, 0, 0), 0.0);
    assert_eq!(volume.data.iter().filter(|v| **v == 3.0).count(), 2 * 4 * 4);
}

#[test]
fn segmentation_is_written_and_registered() {
    let dir = TempDir::new().unwrap();
    let anatomy = dir.path().join("anat.nii");
    write_volume(&anatomy, [8, 8, 8], |i, j, k| {
        let inside = (2..6).contains(&i) && (2..6).contains(&j) && (2..6).contains(&k);
        if inside {
            110.0
        } else {
            20.0
        }
    });
    let spec = dir.path().join("subject.spec");
    caret()
        .args([
            "-volume-segment",
            s(&anatomy),
            s(&spec),
            "NNNNYYYNNNNNNNN",
            "60",
            "100",
            "NNNNNN",
            "nifti",
        ])
        .assert()
        .success();

    let output = dir.path().join("anat_segmentation.nii");
    let volume = read_volume(&output);
    assert_eq!(volume.dims, [8, 8, 8]);
    assert_eq!(volume.label, "segmentation");
    assert_eq!(volume.data.iter().filter(|v| **v == 255.0).count(), 64);

    let spec = SpecFile::read(&spec).unwrap();
    let paths: Vec<&str> = spec.entries().iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, ["anat_segmentation.nii"]);
}

#[test]
fn segmentation_rejects_short_operation_code() {
    let dir = TempDir::new().unwrap();
    let anatomy = dir.path().join("anat.nii");
    write_volume(&anatomy, [4, 4, 4], |_, _, _| 0.0);
    let spec = dir.path().join("subject.spec");
    caret()
        .args([
            "-volume-segment",
            s(&anatomy),
            s(&spec),
            "NNNNY",
            "60",
            "100",
            "NNNNNN",
            "NIFTI",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::contains("ERROR: Operation code:"));
    assert!(!spec.exists());
}

#[test]
fn segmentation_step_without_kernel_fails() {
    let dir = TempDir::new().unwrap();
    let anatomy = dir.path().join("anat.nii");
    write_volume(&anatomy, [4, 4, 4], |_, _, _| 0.0);
    let spec = dir.path().join("subject.spec");
    caret()
        .args([
            "-volume-segment",
            s(&anatomy),
            s(&spec),
            "YNNNYNNNNNNNNNN",
            "60",
            "100",
            "NNNNNN",
            "NIFTI",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Volume Segmentation"));
}
