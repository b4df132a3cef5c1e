// SPDX-License-Identifier: PMPL-1.0-or-later

#![allow(dead_code)]

use assert_cmd::Command;
use caret_command::args::LabeledName;
use caret_command::io;
use caret_command::model::header::FileHeader;
use caret_command::model::layers::MetricFile;
use caret_command::model::surface::{CoordinateFile, TopologyFile, PERIMETER_ID};
use caret_command::model::Volume;
use caret_command::types::CoordinateType;
use std::path::{Path, PathBuf};

pub fn caret() -> Command {
    let mut cmd = Command::cargo_bin("caret-command").unwrap();
    cmd.env_remove("CARET_DEBUG");
    cmd
}

pub const OCTAHEDRON_POINTS: [[f32; 3]; 6] = [
    [10.0, 0.0, 0.0],
    [-10.0, 0.0, 0.0],
    [0.0, 10.0, 0.0],
    [0.0, -10.0, 0.0],
    [0.0, 0.0, 10.0],
    [0.0, 0.0, -10.0],
];

pub const OCTAHEDRON_TILES: [[usize; 3]; 8] = [
    [0, 2, 4],
    [2, 1, 4],
    [1, 3, 4],
    [3, 0, 4],
    [2, 0, 5],
    [1, 2, 5],
    [3, 1, 5],
    [0, 3, 5],
];

/// Closed octahedron as `octa.coord` and `octa.topo` under `dir`.
pub fn write_octahedron(dir: &Path, coord_type: CoordinateType) -> (PathBuf, PathBuf) {
    let coord = dir.join("octa.coord");
    let topo = dir.join("octa.topo");
    io::write_coord(
        &CoordinateFile::new(OCTAHEDRON_POINTS.to_vec(), coord_type),
        &coord,
    )
    .unwrap();
    let mut header = FileHeader::new();
    header.set(PERIMETER_ID, "CLOSED");
    io::write_topo(
        &TopologyFile {
            header,
            triangles: OCTAHEDRON_TILES.to_vec(),
        },
        &topo,
    )
    .unwrap();
    (coord, topo)
}

pub fn write_metric(path: &Path, columns: &[[f32; 6]]) {
    let mut metric = MetricFile::new(6);
    for (n, values) in columns.iter().enumerate() {
        metric
            .add_column(format!("subject {}", n + 1), values.to_vec())
            .unwrap();
    }
    io::write_metric(&metric, path).unwrap();
}

/// Volume of `dims` with voxel values from `value(i, j, k)`.
pub fn write_volume(path: &Path, dims: [usize; 3], value: impl Fn(usize, usize, usize) -> f32) {
    let mut volume = Volume::new(dims, 1).unwrap();
    for k in 0..dims[2] {
        for j in 0..dims[1] {
            for i in 0..dims[0] {
                volume.set(i, j, k, value(i, j, k));
            }
        }
    }
    io::write_volume(&volume, &LabeledName::new("", path)).unwrap();
}

pub fn read_volume(path: &Path) -> Volume {
    io::read_volume(path).unwrap()
}

pub fn s(path: &Path) -> &str {
    path.to_str().unwrap()
}
