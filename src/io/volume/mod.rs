// SPDX-License-Identifier: PMPL-1.0-or-later

//! Volume container dispatch
//!
//! The container is chosen from the file name alone, through one table used
//! for both reading and writing.

mod afni;
mod analyze;
mod nifti;
mod raw;
mod wunil;

use crate::args::LabeledName;
use crate::error::{CommandError, CommandResult};
use crate::model::volume::Volume;
use crate::types::{AxisOrientation, Orientation, VolumeWriteType};
use anyhow::anyhow;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Header tag that marks stored region names.
pub(crate) const REGION_NAMES_TAG: &str = "CARET_REGION_NAMES";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeFormat {
    Nifti,
    NiftiGz,
    Spm,
    Afni,
    Wunil,
    Minc,
}

const EXTENSIONS: [(&str, VolumeFormat); 6] = [
    (".nii.gz", VolumeFormat::NiftiGz),
    (".nii", VolumeFormat::Nifti),
    (".hdr", VolumeFormat::Spm),
    (".head", VolumeFormat::Afni),
    (".ifh", VolumeFormat::Wunil),
    (".mnc", VolumeFormat::Minc),
];

impl VolumeFormat {
    pub fn name(self) -> &'static str {
        match self {
            VolumeFormat::Nifti | VolumeFormat::NiftiGz => "NIFTI",
            VolumeFormat::Spm => "SPM",
            VolumeFormat::Afni => "AFNI",
            VolumeFormat::Wunil => "WUNIL",
            VolumeFormat::Minc => "MINC",
        }
    }

    /// Container for `path`, from its extension.
    pub fn for_path(path: &Path) -> anyhow::Result<Self> {
        let name = path.to_string_lossy().to_ascii_lowercase();
        EXTENSIONS
            .iter()
            .find(|(ext, _)| name.ends_with(ext))
            .map(|(_, format)| *format)
            .ok_or_else(|| {
                anyhow!("unrecognized volume file extension (expected .nii, .nii.gz, .hdr, .HEAD, .ifh or .mnc)")
            })
    }
}

/// File name with its volume extension removed; unknown extensions are kept.
pub fn volume_stem(path: &Path) -> String {
    let name = path.to_string_lossy();
    let lower = name.to_ascii_lowercase();
    EXTENSIONS
        .iter()
        .find(|(ext, _)| lower.ends_with(ext))
        .map(|(ext, _)| name[..name.len() - ext.len()].to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Voxel file that accompanies a two-file container's header.
pub fn data_file_path(path: &Path) -> Option<PathBuf> {
    match VolumeFormat::for_path(path).ok()? {
        VolumeFormat::Spm => Some(analyze::image_path(path)),
        VolumeFormat::Afni => Some(afni::brik_path(path)),
        VolumeFormat::Wunil => Some(wunil::image_path(path)),
        VolumeFormat::Nifti | VolumeFormat::NiftiGz | VolumeFormat::Minc => None,
    }
}

/// `stem` plus the extension of `write_type`.
pub fn path_for_write_type(stem: &str, write_type: VolumeWriteType) -> PathBuf {
    PathBuf::from(format!("{}{}", stem, write_type.extension()))
}

/// Read any supported container and normalise the grid to LPI.
pub fn read_volume(path: &Path) -> CommandResult<Volume> {
    let format = VolumeFormat::for_path(path).map_err(|e| CommandError::read(path, e))?;
    debug!("reading {} volume {}", format.name(), path.display());
    let mut volume = match format {
        VolumeFormat::Nifti => nifti::read(path, false),
        VolumeFormat::NiftiGz => nifti::read(path, true),
        VolumeFormat::Spm => analyze::read(path),
        VolumeFormat::Afni => afni::read(path),
        VolumeFormat::Wunil => wunil::read(path),
        VolumeFormat::Minc => Err(anyhow!("MINC volume files are not supported")),
    }
    .map_err(|e| CommandError::read(path, e))?;
    if volume.normalize_to_lpi()? {
        debug!("resampled {} into LPI", path.display());
    }
    Ok(volume)
}

/// Write `volume` as float32; a label on `name` replaces the stored one.
pub fn write_volume(volume: &Volume, name: &LabeledName) -> CommandResult<()> {
    let path = name.path();
    let label = name.label().unwrap_or(&volume.label);
    let format = VolumeFormat::for_path(path).map_err(|e| CommandError::write(path, e))?;
    debug!("writing {} volume {}", format.name(), path.display());
    match format {
        VolumeFormat::Nifti => nifti::write(volume, label, path, false),
        VolumeFormat::NiftiGz => nifti::write(volume, label, path, true),
        VolumeFormat::Spm => analyze::write(volume, label, path),
        VolumeFormat::Afni => afni::write(volume, label, path),
        VolumeFormat::Wunil => wunil::write(volume, label, path),
        VolumeFormat::Minc => Err(anyhow!("MINC volume files are not supported")),
    }
    .map_err(|e| CommandError::write(path, e))
}

/// Orientation, spacing and origin of an affine whose column `j` is the
/// world step of voxel axis `j`. Each voxel axis takes the world axis it
/// moves along most.
fn grid_from_matrix(m: [[f32; 3]; 3], offset: [f32; 3]) -> (Orientation, [f32; 3], [f32; 3]) {
    let mut axes = [AxisOrientation::Unknown; 3];
    let mut spacing = [1f32; 3];
    let mut origin = [0f32; 3];
    for col in 0..3 {
        let mut world = 0;
        for row in 1..3 {
            if m[row][col].abs() > m[world][col].abs() {
                world = row;
            }
        }
        axes[col] = AxisOrientation::from_world(world, m[world][col]);
        spacing[col] = (0..3).map(|r| m[r][col] * m[r][col]).sum::<f32>().sqrt();
        origin[col] = offset[world];
    }
    (Orientation(axes), spacing, origin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_table_covers_every_container() {
        let cases = [
            ("a.nii", VolumeFormat::Nifti),
            ("a.nii.gz", VolumeFormat::NiftiGz),
            ("a.hdr", VolumeFormat::Spm),
            ("a+orig.HEAD", VolumeFormat::Afni),
            ("a.4dfp.ifh", VolumeFormat::Wunil),
            ("a.mnc", VolumeFormat::Minc),
        ];
        for (name, format) in cases {
            assert_eq!(VolumeFormat::for_path(Path::new(name)).unwrap(), format, "{name}");
        }
        assert!(VolumeFormat::for_path(Path::new("a.vol")).is_err());
    }

    #[test]
    fn stem_and_data_file_follow_container() {
        assert_eq!(volume_stem(Path::new("dir/anat.nii.gz")), "dir/anat");
        assert_eq!(volume_stem(Path::new("anat+orig.HEAD")), "anat+orig");
        assert_eq!(
            data_file_path(Path::new("anat+orig.HEAD")),
            Some(PathBuf::from("anat+orig.BRIK"))
        );
        assert_eq!(data_file_path(Path::new("anat.nii")), None);
    }

    #[test]
    fn unknown_extension_is_a_read_error() {
        let err = read_volume(Path::new("missing.xyz")).unwrap_err();
        assert!(err.to_string().starts_with("ERROR reading missing.xyz: unrecognized"));
    }

    #[test]
    fn minc_is_named_as_unsupported() {
        let err = read_volume(Path::new("brain.mnc")).unwrap_err();
        assert!(err.to_string().contains("MINC volume files are not supported"));
    }

    #[test]
    fn label_on_output_name_overrides_stored_label() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut vol = Volume::new([2, 2, 2], 1).unwrap();
        vol.label = "old".into();
        let out = dir.path().join("out.nii");
        write_volume(&vol, &LabeledName::new("new", &out)).unwrap();
        assert_eq!(read_volume(&out).unwrap().label, "new");
        write_volume(&vol, &LabeledName::new("", &out)).unwrap();
        assert_eq!(read_volume(&out).unwrap().label, "old");
    }

    #[test]
    fn reading_normalises_to_lpi() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut vol = Volume::new([2, 1, 1], 1).unwrap();
        vol.orientation = Orientation::parse("RPI").unwrap();
        vol.data = vec![1.0, 2.0];
        let out = dir.path().join("rpi.nii.gz");
        write_volume(&vol, &LabeledName::new("", &out)).unwrap();
        let back = read_volume(&out).unwrap();
        assert!(back.orientation.is_lpi());
        assert_eq!(back.data, [2.0, 1.0]);
    }

    #[test]
    fn matrix_columns_pick_dominant_world_axis() {
        let m = [[0.0, 0.0, -2.0], [3.0, 0.0, 0.0], [0.0, 1.0, 0.0]];
        let (orient, spacing, origin) = grid_from_matrix(m, [5.0, 6.0, 7.0]);
        assert_eq!(orient.to_string(), "PIR");
        assert_eq!(spacing, [3.0, 1.0, 2.0]);
        assert_eq!(origin, [6.0, 7.0, 5.0]);
    }
}
