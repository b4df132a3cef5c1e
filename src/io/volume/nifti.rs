// SPDX-License-Identifier: PMPL-1.0-or-later

//! NIfTI-1 single-file codec (`.nii`, `.nii.gz`)

use super::raw::{decode_voxels, encode_fixed_text, encode_voxels, fixed_text, HeaderBytes, HeaderWriter};
use super::{grid_from_matrix, REGION_NAMES_TAG};
use crate::model::volume::Volume;
use crate::types::{Orientation, VoxelDataType};
use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

const HEADER_SIZE: i32 = 348;
const OFF_DIM: usize = 40;
const OFF_DATATYPE: usize = 70;
const OFF_BITPIX: usize = 72;
const OFF_PIXDIM: usize = 76;
const OFF_VOX_OFFSET: usize = 108;
const OFF_SCL_SLOPE: usize = 112;
const OFF_SCL_INTER: usize = 116;
const OFF_XYZT_UNITS: usize = 123;
const OFF_DESCRIP: usize = 148;
const DESCRIP_LEN: usize = 80;
const OFF_QFORM_CODE: usize = 252;
const OFF_SFORM_CODE: usize = 254;
const OFF_QUATERN_B: usize = 256;
const OFF_QOFFSET_X: usize = 268;
const OFF_SROW_X: usize = 280;
const OFF_MAGIC: usize = 344;
const SINGLE_FILE_MAGIC: &[u8; 4] = b"n+1\0";
const PAIRED_MAGIC: &[u8; 4] = b"ni1\0";
const ECODE_COMMENT: i32 = 6;
const XFORM_ALIGNED: i16 = 2;
const UNITS_MM_SEC: u8 = 2 | 8;

pub(super) fn data_type_from_code(code: i16) -> Result<VoxelDataType> {
    Ok(match code {
        2 => VoxelDataType::UnsignedByte,
        4 => VoxelDataType::SignedShort,
        8 => VoxelDataType::SignedInt,
        16 => VoxelDataType::Float,
        64 => VoxelDataType::Double,
        other => bail!("unsupported voxel data type code {}", other),
    })
}

pub fn read(path: &Path, gzipped: bool) -> Result<Volume> {
    let bytes = if gzipped {
        let file = fs::File::open(path).context("opening file")?;
        let mut decoded = Vec::new();
        GzDecoder::new(file)
            .read_to_end(&mut decoded)
            .context("decompressing gzip stream")?;
        decoded
    } else {
        fs::read(path).context("opening file")?
    };
    decode(&bytes)
}

fn decode(bytes: &[u8]) -> Result<Volume> {
    let hdr = HeaderBytes::detect(bytes, HEADER_SIZE).context("reading NIfTI header")?;
    let magic = hdr.slice(OFF_MAGIC, 4);
    if magic == PAIRED_MAGIC {
        bail!("two-file NIfTI headers must be read as .hdr/.img");
    }
    if magic != SINGLE_FILE_MAGIC {
        bail!("not a NIfTI-1 file (bad magic)");
    }

    let ndim = hdr.i16_at(OFF_DIM).clamp(1, 7) as usize;
    let mut dim = [1usize; 8];
    for (d, slot) in dim.iter_mut().enumerate().skip(1).take(ndim) {
        *slot = hdr.i16_at(OFF_DIM + 2 * d).max(1) as usize;
    }
    let dims = [dim[1], dim[2], dim[3]];
    let components = dim[4] * dim[5];

    let data_type = data_type_from_code(hdr.i16_at(OFF_DATATYPE))?;
    let mut pixdim = [0f32; 8];
    for (d, slot) in pixdim.iter_mut().enumerate() {
        *slot = hdr.f32_at(OFF_PIXDIM + 4 * d);
    }
    let vox_offset = hdr.f32_at(OFF_VOX_OFFSET).max(352.0) as usize;
    let slope = hdr.f32_at(OFF_SCL_SLOPE);
    let intercept = hdr.f32_at(OFF_SCL_INTER);
    let label = fixed_text(hdr.slice(OFF_DESCRIP, DESCRIP_LEN));

    let mut volume = Volume::new(dims, components)?;
    volume.data_type = data_type;
    volume.label = label;
    volume.region_names = read_region_names(&hdr, vox_offset);

    let sform_code = hdr.i16_at(OFF_SFORM_CODE);
    let qform_code = hdr.i16_at(OFF_QFORM_CODE);
    if sform_code > 0 {
        let mut m = [[0f32; 3]; 3];
        let mut offset = [0f32; 3];
        for (row, base) in [OFF_SROW_X, OFF_SROW_X + 16, OFF_SROW_X + 32].iter().enumerate() {
            for col in 0..3 {
                m[row][col] = hdr.f32_at(base + 4 * col);
            }
            offset[row] = hdr.f32_at(base + 12);
        }
        debug!("NIfTI orientation from sform (code {})", sform_code);
        (volume.orientation, volume.spacing, volume.origin) = grid_from_matrix(m, offset);
    } else if qform_code > 0 {
        let b = hdr.f32_at(OFF_QUATERN_B);
        let c = hdr.f32_at(OFF_QUATERN_B + 4);
        let d = hdr.f32_at(OFF_QUATERN_B + 8);
        let offset = [
            hdr.f32_at(OFF_QOFFSET_X),
            hdr.f32_at(OFF_QOFFSET_X + 4),
            hdr.f32_at(OFF_QOFFSET_X + 8),
        ];
        let qfac = if pixdim[0] < 0.0 { -1.0 } else { 1.0 };
        let m = quaternion_matrix(b, c, d, [pixdim[1], pixdim[2], pixdim[3] * qfac]);
        debug!("NIfTI orientation from qform (code {})", qform_code);
        (volume.orientation, volume.spacing, volume.origin) = grid_from_matrix(m, offset);
    } else {
        volume.orientation = Orientation::LPI;
        volume.spacing = [pixdim[1].abs(), pixdim[2].abs(), pixdim[3].abs()];
        volume.origin = [0.0; 3];
    }
    for s in volume.spacing.iter_mut() {
        if *s == 0.0 {
            *s = 1.0;
        }
    }

    let payload = bytes.get(vox_offset..).unwrap_or(&[]);
    volume.data = decode_voxels(
        payload,
        data_type,
        hdr.endian,
        volume.data.len(),
        slope,
        intercept,
    )
    .context("reading NIfTI voxels")?;
    Ok(volume)
}

/// Rotation from quaternion (b, c, d), columns scaled by `scale`.
fn quaternion_matrix(b: f32, c: f32, d: f32, scale: [f32; 3]) -> [[f32; 3]; 3] {
    let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
    let r = [
        [a * a + b * b - c * c - d * d, 2.0 * (b * c - a * d), 2.0 * (b * d + a * c)],
        [2.0 * (b * c + a * d), a * a + c * c - b * b - d * d, 2.0 * (c * d - a * b)],
        [2.0 * (b * d - a * c), 2.0 * (c * d + a * b), a * a + d * d - c * c - b * b],
    ];
    let mut m = [[0f32; 3]; 3];
    for row in 0..3 {
        for col in 0..3 {
            m[row][col] = r[row][col] * scale[col];
        }
    }
    m
}

fn read_region_names(hdr: &HeaderBytes<'_>, vox_offset: usize) -> Vec<String> {
    let mut names = Vec::new();
    let end = vox_offset.min(hdr.len());
    if end < 352 || hdr.u8_at(348) == 0 {
        return names;
    }
    let mut pos = 352;
    while pos + 8 <= end {
        let size = hdr.i32_at(pos).max(0) as usize;
        let code = hdr.i32_at(pos + 4);
        if size < 8 || pos + size > end {
            break;
        }
        if code == ECODE_COMMENT {
            let text = fixed_text(hdr.slice(pos + 8, size - 8));
            if let Some(rest) = text.strip_prefix(REGION_NAMES_TAG) {
                names = rest.lines().map(str::trim).filter(|l| !l.is_empty()).map(String::from).collect();
            }
        }
        pos += size;
    }
    names
}

fn region_names_extension(names: &[String]) -> Vec<u8> {
    if names.is_empty() {
        return Vec::new();
    }
    let mut text = String::from(REGION_NAMES_TAG);
    for name in names {
        text.push('\n');
        text.push_str(name);
    }
    let (encoded, _, _) = encoding_rs::WINDOWS_1252.encode(&text);
    let size = (8 + encoded.len() + 1).div_ceil(16) * 16;
    let mut out = HeaderWriter::new(size);
    out.put_i32(0, size as i32);
    out.put_i32(4, ECODE_COMMENT);
    out.put_bytes(8, &encoded);
    out.bytes
}

pub fn write(volume: &Volume, label: &str, path: &Path, gzipped: bool) -> Result<()> {
    let bytes = encode(volume, label)?;
    if gzipped {
        let file = fs::File::create(path).context("creating file")?;
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(&bytes).context("compressing voxels")?;
        encoder.finish().context("finishing gzip stream")?;
    } else {
        fs::write(path, bytes).context("writing file")?;
    }
    Ok(())
}

fn encode(volume: &Volume, label: &str) -> Result<Vec<u8>> {
    let extension = region_names_extension(&volume.region_names);
    let vox_offset = 352 + extension.len();

    let mut hdr = HeaderWriter::new(352);
    hdr.put_i32(0, HEADER_SIZE);
    let ndim: i16 = if volume.components > 1 { 4 } else { 3 };
    hdr.put_i16(OFF_DIM, ndim);
    for (d, size) in volume.dims.iter().enumerate() {
        hdr.put_short(OFF_DIM + 2 * (d + 1), *size, "dimension")?;
    }
    hdr.put_short(OFF_DIM + 8, volume.components, "component count")?;
    for d in 5..8 {
        hdr.put_i16(OFF_DIM + 2 * d, 1);
    }
    hdr.put_i16(OFF_DATATYPE, 16);
    hdr.put_i16(OFF_BITPIX, 32);
    hdr.put_f32(OFF_PIXDIM, 1.0);
    for (d, s) in volume.spacing.iter().enumerate() {
        hdr.put_f32(OFF_PIXDIM + 4 * (d + 1), *s);
    }
    hdr.put_f32(OFF_PIXDIM + 16, 1.0);
    hdr.put_f32(OFF_VOX_OFFSET, vox_offset as f32);
    hdr.put_f32(OFF_SCL_SLOPE, 1.0);
    hdr.bytes[OFF_XYZT_UNITS] = UNITS_MM_SEC;
    hdr.put_bytes(OFF_DESCRIP, &encode_fixed_text(label, DESCRIP_LEN));
    hdr.put_i16(OFF_SFORM_CODE, XFORM_ALIGNED);

    // one non-zero entry per row: the voxel axis running along that world axis
    for (voxel_axis, orient) in volume.orientation.0.iter().enumerate() {
        let world = orient.world_axis().unwrap_or(voxel_axis);
        let row = OFF_SROW_X + 16 * world;
        hdr.put_f32(row + 4 * voxel_axis, volume.spacing[voxel_axis] * orient.sign());
        hdr.put_f32(row + 12, volume.origin[voxel_axis]);
    }
    hdr.put_bytes(OFF_MAGIC, SINGLE_FILE_MAGIC);
    if !extension.is_empty() {
        hdr.bytes[348] = 1;
    }

    let mut bytes = hdr.bytes;
    bytes.extend_from_slice(&extension);
    bytes.extend_from_slice(&encode_voxels(&volume.data));
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_volume_decodes_with_geometry() {
        let mut vol = Volume::new([2, 3, 4], 1).unwrap();
        vol.spacing = [2.0, 2.0, 3.0];
        vol.origin = [-10.0, -20.0, 5.0];
        vol.data[5] = 42.0;
        vol.region_names = vec!["???".into(), "CAUDATE".into()];
        let back = decode(&encode(&vol, "anatomy").unwrap()).unwrap();
        assert_eq!(back.dims, [2, 3, 4]);
        assert_eq!(back.spacing, vol.spacing);
        assert_eq!(back.origin, vol.origin);
        assert!(back.orientation.is_lpi());
        assert_eq!(back.label, "anatomy");
        assert_eq!(back.region_names, vol.region_names);
        assert_eq!(back.data, vol.data);
    }

    #[test]
    fn qform_identity_gives_lpi() {
        let vol = Volume::new([2, 2, 2], 1).unwrap();
        let mut bytes = encode(&vol, "").unwrap();
        bytes[OFF_SFORM_CODE] = 0;
        bytes[OFF_QFORM_CODE] = 1;
        let back = decode(&bytes).unwrap();
        assert!(back.orientation.is_lpi());
        assert_eq!(back.spacing, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let vol = Volume::new([1, 1, 1], 1).unwrap();
        let mut bytes = encode(&vol, "").unwrap();
        bytes[OFF_MAGIC] = b'x';
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn dimension_past_i16_is_an_encode_error() {
        let vol = Volume::new([1, 40_000, 1], 1).unwrap();
        let err = encode(&vol, "").unwrap_err();
        assert!(err.to_string().contains("dimension 40000"));
    }
}
