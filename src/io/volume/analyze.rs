// SPDX-License-Identifier: PMPL-1.0-or-later

//! SPM / Analyze 7.5 codec (`.hdr` + `.img`)

use super::nifti::data_type_from_code;
use super::raw::{decode_voxels, encode_fixed_text, encode_voxels, fixed_text, HeaderBytes, HeaderWriter};
use crate::model::volume::Volume;
use crate::types::Orientation;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const HEADER_SIZE: i32 = 348;
const OFF_EXTENTS: usize = 32;
const OFF_REGULAR: usize = 38;
const OFF_DIM: usize = 40;
const OFF_DATATYPE: usize = 70;
const OFF_BITPIX: usize = 72;
const OFF_PIXDIM: usize = 76;
const OFF_VOX_OFFSET: usize = 108;
const OFF_SCALE: usize = 112;
const OFF_DESCRIP: usize = 148;
const DESCRIP_LEN: usize = 80;
const OFF_ORIENT: usize = 252;
const OFF_ORIGINATOR: usize = 253;

/// Orientation byte values and the grid layout each one names.
const ORIENT_CODES: [(u8, &str); 6] = [
    (0, "LPI"),
    (1, "LIP"),
    (2, "PIL"),
    (3, "LAI"),
    (4, "LIA"),
    (5, "PIR"),
];

pub fn image_path(header: &Path) -> PathBuf {
    header.with_extension("img")
}

pub fn read(path: &Path) -> Result<Volume> {
    let header_bytes = fs::read(path).context("opening header")?;
    let hdr = HeaderBytes::detect(&header_bytes, HEADER_SIZE).context("reading Analyze header")?;

    let ndim = hdr.i16_at(OFF_DIM).clamp(1, 7) as usize;
    let mut dim = [1usize; 8];
    for (d, slot) in dim.iter_mut().enumerate().skip(1).take(ndim) {
        *slot = hdr.i16_at(OFF_DIM + 2 * d).max(1) as usize;
    }
    let data_type = data_type_from_code(hdr.i16_at(OFF_DATATYPE))?;
    let mut volume = Volume::new([dim[1], dim[2], dim[3]], dim[4])?;
    volume.data_type = data_type;
    for a in 0..3 {
        let s = hdr.f32_at(OFF_PIXDIM + 4 * (a + 1)).abs();
        volume.spacing[a] = if s == 0.0 { 1.0 } else { s };
    }
    volume.label = fixed_text(hdr.slice(OFF_DESCRIP, DESCRIP_LEN));

    let orient_code = hdr.u8_at(OFF_ORIENT);
    volume.orientation = ORIENT_CODES
        .iter()
        .find(|(code, _)| *code == orient_code)
        .and_then(|(_, letters)| Orientation::parse(letters).ok())
        .unwrap_or(Orientation::LPI);

    // originator: one-based voxel holding the stereotaxic origin
    for a in 0..3 {
        let voxel = hdr.i16_at(OFF_ORIGINATOR + 2 * a);
        if voxel != 0 {
            let sign = volume.orientation.0[a].sign();
            volume.origin[a] = -((voxel - 1) as f32) * volume.spacing[a] * sign;
        }
    }

    let scale = hdr.f32_at(OFF_SCALE);
    let vox_offset = hdr.f32_at(OFF_VOX_OFFSET).max(0.0) as usize;
    let image = image_path(path);
    let payload = fs::read(&image).with_context(|| format!("opening {}", image.display()))?;
    volume.data = decode_voxels(
        payload.get(vox_offset..).unwrap_or(&[]),
        data_type,
        hdr.endian,
        volume.data.len(),
        scale,
        0.0,
    )
    .context("reading Analyze voxels")?;
    Ok(volume)
}

pub fn write(volume: &Volume, label: &str, path: &Path) -> Result<()> {
    let mut hdr = HeaderWriter::new(HEADER_SIZE as usize);
    hdr.put_i32(0, HEADER_SIZE);
    hdr.put_i32(OFF_EXTENTS, 16384);
    hdr.bytes[OFF_REGULAR] = b'r';
    hdr.put_i16(OFF_DIM, 4);
    for (d, size) in volume.dims.iter().enumerate() {
        hdr.put_short(OFF_DIM + 2 * (d + 1), *size, "dimension")?;
    }
    hdr.put_short(OFF_DIM + 8, volume.components, "component count")?;
    hdr.put_i16(OFF_DATATYPE, 16);
    hdr.put_i16(OFF_BITPIX, 32);
    for (d, s) in volume.spacing.iter().enumerate() {
        hdr.put_f32(OFF_PIXDIM + 4 * (d + 1), *s);
    }
    hdr.put_f32(OFF_SCALE, 1.0);
    hdr.put_bytes(OFF_DESCRIP, &encode_fixed_text(label, DESCRIP_LEN));

    let letters = volume.orientation.to_string();
    hdr.bytes[OFF_ORIENT] = ORIENT_CODES
        .iter()
        .find(|(_, l)| *l == letters)
        .map(|(code, _)| *code)
        .unwrap_or(0);
    for a in 0..3 {
        let step = volume.spacing[a] * volume.orientation.0[a].sign();
        let voxel = if step == 0.0 {
            0
        } else {
            ((-volume.origin[a] / step).round() + 1.0) as i64
        };
        hdr.put_short(OFF_ORIGINATOR + 2 * a, voxel, "originator")?;
    }

    fs::write(path, &hdr.bytes).context("writing header")?;
    let image = image_path(path);
    fs::write(&image, encode_voxels(&volume.data))
        .with_context(|| format!("writing {}", image.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_and_image_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("anat.hdr");
        let mut vol = Volume::new([4, 5, 6], 1).unwrap();
        vol.spacing = [2.0, 2.0, 2.0];
        vol.origin = [-4.0, -6.0, -8.0];
        vol.data[7] = 3.5;
        write(&vol, "spm label", &path).unwrap();
        assert!(dir.path().join("anat.img").exists());

        let back = read(&path).unwrap();
        assert_eq!(back.dims, [4, 5, 6]);
        assert_eq!(back.origin, vol.origin);
        assert_eq!(back.label, "spm label");
        assert_eq!(back.data, vol.data);
    }

    #[test]
    fn wide_grid_is_refused_before_any_file_is_written() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("wide.hdr");
        let vol = Volume::new([40_000, 1, 1], 1).unwrap();
        let err = write(&vol, "", &path).unwrap_err();
        assert!(err.to_string().contains("dimension 40000"));
        assert!(!path.exists());
        assert!(!dir.path().join("wide.img").exists());
    }

    #[test]
    fn far_origin_overflows_the_originator() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut vol = Volume::new([2, 2, 2], 1).unwrap();
        vol.spacing = [0.001, 1.0, 1.0];
        vol.origin = [-100.0, 0.0, 0.0];
        let err = write(&vol, "", &dir.path().join("far.hdr")).unwrap_err();
        assert!(err.to_string().contains("originator"));
    }
}
