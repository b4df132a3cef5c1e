// SPDX-License-Identifier: PMPL-1.0-or-later

//! AFNI codec (`.HEAD` attribute text + `.BRIK` voxels)

use super::raw::{decode_voxels, encode_voxels, Endian};
use super::REGION_NAMES_TAG;
use crate::model::volume::Volume;
use crate::types::{AxisOrientation, Orientation, VoxelDataType};
use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// Axis codes in `ORIENT_SPECIFIC` order.
const ORIENT_CODES: [AxisOrientation; 6] = [
    AxisOrientation::RightToLeft,
    AxisOrientation::LeftToRight,
    AxisOrientation::PosteriorToAnterior,
    AxisOrientation::AnteriorToPosterior,
    AxisOrientation::InferiorToSuperior,
    AxisOrientation::SuperiorToInferior,
];

#[derive(Debug, Clone, PartialEq)]
enum Attribute {
    Text(String),
    Ints(Vec<i64>),
    Floats(Vec<f32>),
}

pub fn brik_path(head: &Path) -> PathBuf {
    head.with_extension("BRIK")
}

/// DICOM axes run opposite to RAS along x and y.
fn dicom_sign(world_axis: usize) -> f32 {
    if world_axis < 2 {
        -1.0
    } else {
        1.0
    }
}

fn parse_attributes(content: &str) -> Result<HashMap<String, Attribute>> {
    let mut attributes = HashMap::new();
    let mut lines = content.lines().peekable();
    while let Some(line) = lines.next() {
        let Some(kind) = line.trim().strip_prefix("type") else {
            continue;
        };
        let kind = kind.trim_start_matches([' ', '=']).trim().to_string();
        let name = lines
            .next()
            .and_then(|l| l.trim().strip_prefix("name"))
            .map(|n| n.trim_start_matches([' ', '=']).trim().to_string())
            .ok_or_else(|| anyhow!("attribute of type {} has no name", kind))?;
        let count: usize = lines
            .next()
            .and_then(|l| l.trim().strip_prefix("count"))
            .map(|c| c.trim_start_matches([' ', '=']).trim())
            .and_then(|c| c.parse().ok())
            .ok_or_else(|| anyhow!("attribute {} has no count", name))?;

        let value = if kind == "string-attribute" {
            let mut text = String::new();
            while text.chars().count() < count {
                match lines.next() {
                    Some(l) => {
                        if !text.is_empty() {
                            text.push('\n');
                        }
                        text.push_str(l);
                    }
                    None => break,
                }
            }
            let text = text.trim_start().trim_start_matches('\'');
            Attribute::Text(text.trim_end().trim_end_matches('~').to_string())
        } else {
            let mut tokens: Vec<String> = Vec::with_capacity(count.min(content.len()));
            while tokens.len() < count {
                match lines.peek() {
                    Some(l) if !l.trim().starts_with("type") => {
                        tokens.extend(l.split_whitespace().map(String::from));
                        lines.next();
                    }
                    _ => break,
                }
            }
            if tokens.len() < count {
                bail!("attribute {} has {} of {} values", name, tokens.len(), count);
            }
            if kind == "float-attribute" {
                Attribute::Floats(
                    tokens
                        .iter()
                        .map(|t| t.parse().map_err(|_| anyhow!("bad float \"{}\" in {}", t, name)))
                        .collect::<Result<_>>()?,
                )
            } else {
                Attribute::Ints(
                    tokens
                        .iter()
                        .map(|t| t.parse().map_err(|_| anyhow!("bad integer \"{}\" in {}", t, name)))
                        .collect::<Result<_>>()?,
                )
            }
        };
        attributes.insert(name, value);
    }
    Ok(attributes)
}

fn ints<'a>(attrs: &'a HashMap<String, Attribute>, name: &str, min: usize) -> Result<&'a [i64]> {
    match attrs.get(name) {
        Some(Attribute::Ints(v)) if v.len() >= min => Ok(v),
        Some(_) => bail!("attribute {} is malformed", name),
        None => bail!("required attribute {} is missing", name),
    }
}

fn floats<'a>(attrs: &'a HashMap<String, Attribute>, name: &str, min: usize) -> Result<&'a [f32]> {
    match attrs.get(name) {
        Some(Attribute::Floats(v)) if v.len() >= min => Ok(v),
        Some(_) => bail!("attribute {} is malformed", name),
        None => bail!("required attribute {} is missing", name),
    }
}

fn text<'a>(attrs: &'a HashMap<String, Attribute>, name: &str) -> Option<&'a str> {
    match attrs.get(name) {
        Some(Attribute::Text(t)) => Some(t),
        _ => None,
    }
}

pub fn read(path: &Path) -> Result<Volume> {
    let content = fs::read_to_string(path).context("opening header")?;
    let attrs = parse_attributes(&content).context("parsing AFNI header")?;

    let dims = ints(&attrs, "DATASET_DIMENSIONS", 3)?;
    let rank = ints(&attrs, "DATASET_RANK", 2)?;
    let bricks = rank[1].max(1) as usize;
    let mut volume = Volume::new(
        [dims[0].max(1) as usize, dims[1].max(1) as usize, dims[2].max(1) as usize],
        bricks,
    )?;

    let orient = ints(&attrs, "ORIENT_SPECIFIC", 3)?;
    let mut axes = [AxisOrientation::Unknown; 3];
    for a in 0..3 {
        axes[a] = ORIENT_CODES
            .get(orient[a] as usize)
            .copied()
            .ok_or_else(|| anyhow!("ORIENT_SPECIFIC code {} is out of range", orient[a]))?;
    }
    volume.orientation = Orientation(axes);

    let origin = floats(&attrs, "ORIGIN", 3)?;
    let delta = floats(&attrs, "DELTA", 3)?;
    for a in 0..3 {
        let sign = dicom_sign(axes[a].world_axis().unwrap_or(a));
        volume.origin[a] = origin[a] * sign;
        volume.spacing[a] = if delta[a] == 0.0 { 1.0 } else { delta[a].abs() };
    }

    let types = ints(&attrs, "BRICK_TYPES", bricks)?;
    let data_type = match types[0] {
        0 => VoxelDataType::UnsignedByte,
        1 => VoxelDataType::SignedShort,
        2 => VoxelDataType::SignedInt,
        3 => VoxelDataType::Float,
        4 => VoxelDataType::Double,
        other => bail!("unsupported BRICK_TYPES value {}", other),
    };
    if types[..bricks].iter().any(|t| *t != types[0]) {
        bail!("sub-bricks of mixed voxel type are not supported");
    }
    volume.data_type = data_type;

    let endian = match text(&attrs, "BYTEORDER_STRING") {
        Some("MSB_FIRST") => Endian::Big,
        _ => Endian::Little,
    };
    if let Some(labels) = text(&attrs, "BRICK_LABS") {
        volume.label = labels.split('~').next().unwrap_or("").to_string();
    }
    if let Some(names) = text(&attrs, REGION_NAMES_TAG) {
        volume.region_names = names.split('~').filter(|n| !n.is_empty()).map(String::from).collect();
    }

    let facs = match attrs.get("BRICK_FLOAT_FACS") {
        Some(Attribute::Floats(f)) => f.clone(),
        _ => Vec::new(),
    };
    let brik = brik_path(path);
    let payload = fs::read(&brik).with_context(|| format!("opening {}", brik.display()))?;
    let nvox = volume.voxel_count();
    let width = nvox * data_type.bytes();
    for b in 0..bricks {
        let factor = facs.get(b).copied().unwrap_or(0.0);
        let chunk = payload.get(b * width..).unwrap_or(&[]);
        let values = decode_voxels(chunk, data_type, endian, nvox, factor, 0.0)
            .with_context(|| format!("reading sub-brick {}", b))?;
        volume.data[b * nvox..(b + 1) * nvox].copy_from_slice(&values);
    }
    Ok(volume)
}

fn put_ints(out: &mut String, name: &str, values: &[i64]) {
    let _ = writeln!(out, "\ntype = integer-attribute\nname = {}\ncount = {}", name, values.len());
    let line: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    let _ = writeln!(out, " {}", line.join(" "));
}

fn put_floats(out: &mut String, name: &str, values: &[f32]) {
    let _ = writeln!(out, "\ntype = float-attribute\nname = {}\ncount = {}", name, values.len());
    let line: Vec<String> = values.iter().map(|v| v.to_string()).collect();
    let _ = writeln!(out, " {}", line.join(" "));
}

fn put_text(out: &mut String, name: &str, value: &str) {
    let _ = writeln!(
        out,
        "\ntype = string-attribute\nname = {}\ncount = {}\n'{}~",
        name,
        value.chars().count() + 1,
        value
    );
}

pub fn write(volume: &Volume, label: &str, path: &Path) -> Result<()> {
    let bricks = volume.components;
    let mut out = String::new();
    put_text(&mut out, "TYPESTRING", "3DIM_HEAD_ANAT");
    put_ints(&mut out, "SCENE_DATA", &[0, 0, 0]);
    put_ints(&mut out, "DATASET_RANK", &[3, bricks as i64, 0, 0, 0, 0, 0, 0]);
    put_ints(
        &mut out,
        "DATASET_DIMENSIONS",
        &[volume.dims[0] as i64, volume.dims[1] as i64, volume.dims[2] as i64, 0, 0],
    );

    let mut orient = [0i64; 3];
    let mut origin = [0f32; 3];
    let mut delta = [0f32; 3];
    for a in 0..3 {
        let axis = volume.orientation.0[a];
        orient[a] = ORIENT_CODES.iter().position(|c| *c == axis).unwrap_or(1) as i64;
        let sign = dicom_sign(axis.world_axis().unwrap_or(a));
        origin[a] = volume.origin[a] * sign;
        delta[a] = volume.spacing[a] * axis.sign() * sign;
    }
    put_ints(&mut out, "ORIENT_SPECIFIC", &orient);
    put_floats(&mut out, "ORIGIN", &origin);
    put_floats(&mut out, "DELTA", &delta);
    put_ints(&mut out, "BRICK_TYPES", &vec![3; bricks]);
    put_floats(&mut out, "BRICK_FLOAT_FACS", &vec![0.0; bricks]);
    put_text(&mut out, "BYTEORDER_STRING", "LSB_FIRST");
    let labels = vec![label; bricks].join("~");
    put_text(&mut out, "BRICK_LABS", &labels);
    if !volume.region_names.is_empty() {
        put_text(&mut out, REGION_NAMES_TAG, &volume.region_names.join("~"));
    }

    fs::write(path, out).context("writing header")?;
    let brik = brik_path(path);
    fs::write(&brik, encode_voxels(&volume.data))
        .with_context(|| format!("writing {}", brik.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_attributes_strip_quote_and_tilde() {
        let head = "\ntype = string-attribute\nname = BRICK_LABS\ncount = 9\n'my_label~\n\ntype = integer-attribute\nname = DATASET_RANK\ncount = 8\n 3 1 0 0\n 0 0 0 0\n";
        let attrs = parse_attributes(head).unwrap();
        assert_eq!(text(&attrs, "BRICK_LABS"), Some("my_label"));
        assert_eq!(ints(&attrs, "DATASET_RANK", 8).unwrap()[1], 1);
    }

    #[test]
    fn head_and_brik_round_trip_in_dicom_order() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("out+orig.HEAD");
        let mut vol = Volume::new([3, 2, 2], 1).unwrap();
        vol.origin = [-10.0, -20.0, -30.0];
        vol.data[4] = 255.0;
        vol.region_names = vec!["???".into(), "PUTAMEN".into()];
        write(&vol, "my_label", &path).unwrap();

        let head = fs::read_to_string(&path).unwrap();
        assert!(head.contains("'LSB_FIRST~"));
        assert!(head.contains(" 1 2 4"));

        let back = read(&path).unwrap();
        assert_eq!(back.label, "my_label");
        assert_eq!(back.origin, vol.origin);
        assert!(back.orientation.is_lpi());
        assert_eq!(back.region_names, vol.region_names);
        assert_eq!(back.data, vol.data);
    }
}
