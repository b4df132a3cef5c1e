// SPDX-License-Identifier: PMPL-1.0-or-later

//! File I/O adapters
//!
//! One `read_*`/`write_*` pair per file kind. Parsing and formatting work in
//! `anyhow::Result`; every failure leaves this module as
//! `CommandError::Read` or `CommandError::Write` naming the path.

pub mod annotation_files;
pub mod deformation_file;
pub mod layer_files;
pub mod misc_files;
pub mod surface_files;
pub mod text_format;
pub mod volume;

pub use annotation_files::{
    read_border, read_border_projection, read_cell_projection, read_cells, write_border,
    write_border_projection, write_cell_projection, write_cells,
};
pub use deformation_file::{read_deformation_map, write_deformation_map};
pub use layer_files::{
    read_metric, read_paint, read_surface_shape, write_metric, write_paint, write_surface_shape,
};
pub use misc_files::{
    read_image, read_params, read_scene, read_text, write_image, write_params, write_scene,
    write_text,
};
pub use surface_files::{read_coord, read_topo, write_coord, write_topo};
pub use volume::{
    data_file_path, path_for_write_type, read_volume, volume_stem, write_volume, VolumeFormat,
};

use crate::error::{CommandError, CommandResult};
use anyhow::Context;
use std::fs;
use std::path::Path;

/// Read `path` as text and hand it to `parse`.
pub(crate) fn load_text<T>(
    path: &Path,
    parse: impl FnOnce(&str) -> anyhow::Result<T>,
) -> CommandResult<T> {
    let content = fs::read_to_string(path)
        .context("unable to open file")
        .map_err(|e| CommandError::read(path, e))?;
    parse(&content).map_err(|e| CommandError::read(path, e))
}

/// Create or truncate `path` with `content`.
pub(crate) fn store_text(path: &Path, content: String) -> CommandResult<()> {
    fs::write(path, content)
        .context("unable to write file")
        .map_err(|e| CommandError::write(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reports_path() {
        let err = read_coord(Path::new("/nonexistent/brain.coord")).unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("ERROR reading /nonexistent/brain.coord: unable to open file"));
    }

    #[test]
    fn parse_failure_reports_path_and_detail() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.topo");
        fs::write(&path, "two\n").unwrap();
        let err = read_topo(&path).unwrap_err().to_string();
        assert!(err.contains("bad.topo"));
        assert!(err.contains("invalid tile count \"two\""));
    }
}
