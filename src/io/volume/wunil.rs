// SPDX-License-Identifier: PMPL-1.0-or-later

//! Washington University 4dfp codec (`.ifh` interfile header + `.img`)

use super::raw::{decode_voxels, encode_voxels, Endian};
use crate::model::volume::Volume;
use crate::types::{AxisOrientation, Orientation, VoxelDataType};
use anyhow::{anyhow, bail, Context, Result};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

/// `orientation` key values and the unflipped grid each one names; a
/// negative scaling factor flips that axis.
const ORIENTATIONS: [(u32, &str); 3] = [(2, "LPI"), (3, "LIP"), (4, "PIL")];

pub fn image_path(header: &Path) -> PathBuf {
    header.with_extension("img")
}

fn parse_keys(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .filter_map(|line| line.split_once(":="))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect()
}

fn number<T: std::str::FromStr>(keys: &HashMap<String, String>, key: &str) -> Result<T> {
    let value = keys
        .get(key)
        .ok_or_else(|| anyhow!("required key \"{}\" is missing", key))?;
    value
        .parse()
        .map_err(|_| anyhow!("key \"{}\" has invalid value \"{}\"", key, value))
}

pub fn read(path: &Path) -> Result<Volume> {
    let content = fs::read_to_string(path).context("opening header")?;
    let keys = parse_keys(&content);

    let mut dims = [1usize; 3];
    let mut scale = [1f32; 3];
    for a in 0..3 {
        dims[a] = number::<usize>(&keys, &format!("matrix size [{}]", a + 1))?.max(1);
        scale[a] = number(&keys, &format!("scaling factor (mm/pixel) [{}]", a + 1))?;
    }
    let frames = keys
        .get("matrix size [4]")
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(1)
        .max(1);

    let bytes_per_pixel: usize = number(&keys, "number of bytes per pixel")?;
    let format = keys
        .get("number format")
        .map(|f| f.to_ascii_lowercase())
        .unwrap_or_else(|| "float".to_string());
    let data_type = match (format.as_str(), bytes_per_pixel) {
        ("float", 4) => VoxelDataType::Float,
        ("float", 8) => VoxelDataType::Double,
        ("signed integer", 2) => VoxelDataType::SignedShort,
        ("signed integer", 4) => VoxelDataType::SignedInt,
        ("unsigned integer", 1) => VoxelDataType::UnsignedByte,
        (f, b) => bail!("unsupported number format \"{}\" with {} bytes per pixel", f, b),
    };
    let endian = match keys.get("imagedata byte order").map(String::as_str) {
        Some("littleendian") => Endian::Little,
        _ => Endian::Big,
    };

    let mut volume = Volume::new(dims, frames)?;
    volume.data_type = data_type;

    let code: u32 = keys
        .get("orientation")
        .and_then(|v| v.parse().ok())
        .unwrap_or(2);
    let base = ORIENTATIONS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, letters)| *letters)
        .unwrap_or("LPI");
    let mut orientation = Orientation::parse(base).map_err(|e| anyhow!(e))?;
    for a in 0..3 {
        if scale[a] < 0.0 {
            let axis = orientation.0[a];
            if let Some(world) = axis.world_axis() {
                orientation.0[a] = AxisOrientation::from_world(world, -axis.sign());
            }
        }
        volume.spacing[a] = if scale[a] == 0.0 { 1.0 } else { scale[a].abs() };
    }
    volume.orientation = orientation;

    if let Some(center) = keys.get("center") {
        let values: Vec<f32> = center
            .split_whitespace()
            .map(|t| t.parse().map_err(|_| anyhow!("invalid center \"{}\"", center)))
            .collect::<Result<_>>()?;
        if values.len() >= 3 {
            volume.origin = [values[0], values[1], values[2]];
        }
    }
    if let Some(label) = keys.get("study description") {
        volume.label = label.clone();
    }

    let image = image_path(path);
    let payload = fs::read(&image).with_context(|| format!("opening {}", image.display()))?;
    volume.data = decode_voxels(&payload, data_type, endian, volume.data.len(), 0.0, 0.0)
        .context("reading 4dfp voxels")?;
    Ok(volume)
}

pub fn write(volume: &Volume, label: &str, path: &Path) -> Result<()> {
    let letters = volume.orientation.to_string();
    // find the base layout whose axes match, recording flips as negative scale
    let mut code = 2;
    let mut flips = [false; 3];
    for (c, base) in ORIENTATIONS {
        if let Ok(base) = Orientation::parse(base) {
            let matches = (0..3).all(|a| base.0[a].world_axis() == volume.orientation.0[a].world_axis());
            if matches {
                code = c;
                for a in 0..3 {
                    flips[a] = base.0[a] != volume.orientation.0[a];
                }
                break;
            }
        }
    }
    tracing::debug!("writing 4dfp orientation {} as code {}", letters, code);

    let mut out = String::new();
    let _ = writeln!(out, "INTERFILE :=");
    let _ = writeln!(out, "version of keys := 3.3");
    let _ = writeln!(out, "number format := float");
    let _ = writeln!(out, "number of bytes per pixel := 4");
    let _ = writeln!(out, "orientation := {}", code);
    let _ = writeln!(out, "number of dimensions := 4");
    for a in 0..3 {
        let _ = writeln!(out, "matrix size [{}] := {}", a + 1, volume.dims[a]);
    }
    let _ = writeln!(out, "matrix size [4] := {}", volume.components);
    for a in 0..3 {
        let s = if flips[a] { -volume.spacing[a] } else { volume.spacing[a] };
        let _ = writeln!(out, "scaling factor (mm/pixel) [{}] := {}", a + 1, s);
    }
    let _ = writeln!(out, "imagedata byte order := littleendian");
    let _ = writeln!(
        out,
        "center := {} {} {}",
        volume.origin[0], volume.origin[1], volume.origin[2]
    );
    if !label.is_empty() {
        let _ = writeln!(out, "study description := {}", label);
    }

    fs::write(path, out).context("writing header")?;
    let image = image_path(path);
    fs::write(&image, encode_voxels(&volume.data))
        .with_context(|| format!("writing {}", image.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flipped_axis_round_trips_as_negative_scale() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("t1.4dfp.ifh");
        let mut vol = Volume::new([2, 2, 2], 1).unwrap();
        vol.orientation = Orientation::parse("RPI").unwrap();
        vol.spacing = [3.0, 3.0, 3.0];
        vol.origin = [12.0, -3.0, 0.0];
        vol.data[1] = 9.0;
        write(&vol, "wu atlas", &path).unwrap();

        let header = fs::read_to_string(&path).unwrap();
        assert!(header.contains("scaling factor (mm/pixel) [1] := -3"));

        let back = read(&path).unwrap();
        assert_eq!(back.orientation, vol.orientation);
        assert_eq!(back.spacing, vol.spacing);
        assert_eq!(back.origin, vol.origin);
        assert_eq!(back.label, "wu atlas");
        assert_eq!(back.data, vol.data);
    }

    #[test]
    fn missing_matrix_size_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.ifh");
        fs::write(&path, "INTERFILE :=\nnumber of bytes per pixel := 4\n").unwrap();
        let err = read(&path).unwrap_err();
        assert!(err.to_string().contains("matrix size [1]"));
    }
}
