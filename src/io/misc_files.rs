// SPDX-License-Identifier: PMPL-1.0-or-later

//! Scene, params, image and plain-text adapters

use super::{load_text, store_text};
use crate::error::{CommandError, CommandResult};
use crate::model::params::ParamsFile;
use crate::model::scene::SceneFile;
use anyhow::{bail, Context, Result};
use image::RgbImage;
use std::fmt::Write as _;
use std::path::Path;

pub fn read_scene(path: &Path) -> CommandResult<SceneFile> {
    load_text(path, |content| {
        serde_json::from_str(content).context("parsing scene document")
    })
}

pub fn write_scene(scenes: &SceneFile, path: &Path) -> CommandResult<()> {
    let json = serde_json::to_string_pretty(scenes)
        .context("serializing scene document")
        .map_err(|e| CommandError::write(path, e))?;
    store_text(path, json + "\n")
}

pub fn read_params(path: &Path) -> CommandResult<ParamsFile> {
    load_text(path, parse_params)
}

pub fn write_params(params: &ParamsFile, path: &Path) -> CommandResult<()> {
    let mut out = String::new();
    for (key, value) in params.iter() {
        let _ = writeln!(out, "{}={}", key, value);
    }
    store_text(path, out)
}

fn parse_params(content: &str) -> Result<ParamsFile> {
    let mut params = ParamsFile::new();
    for (number, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            bail!("line {}: expected key=value, found \"{}\"", number + 1, line);
        };
        params.set(key.trim(), value.trim());
    }
    Ok(params)
}

/// Any raster format the `image` crate recognises, as 8-bit RGB.
pub fn read_image(path: &Path) -> CommandResult<RgbImage> {
    image::open(path)
        .map(|img| img.to_rgb8())
        .with_context(|| "decoding image".to_string())
        .map_err(|e| CommandError::read(path, e))
}

/// Written as JPEG regardless of the extension.
pub fn write_image(img: &RgbImage, path: &Path) -> CommandResult<()> {
    img.save_with_format(path, image::ImageFormat::Jpeg)
        .context("encoding JPEG")
        .map_err(|e| CommandError::write(path, e))
}

pub fn read_text(path: &Path) -> CommandResult<String> {
    load_text(path, |content| Ok(content.to_string()))
}

pub fn write_text(text: &str, path: &Path) -> CommandResult<()> {
    store_text(path, text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_skip_comments_and_keep_order() {
        let params = parse_params("# subject\nxdim=176\n\nspecies = Human\n").unwrap();
        let keys: Vec<_> = params.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["xdim", "species"]);
        assert_eq!(params.get("species"), Some("Human"));
    }

    #[test]
    fn params_line_without_equals_is_an_error() {
        assert!(parse_params("xdim 176\n").is_err());
    }

    #[test]
    fn scene_document_round_trips() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.scene");
        let json = r#"{"scenes":[{"name":"lateral","surface":{"coord_type":"INFLATED","view":"LATERAL"}}]}"#;
        std::fs::write(&path, json).unwrap();
        let scenes = read_scene(&path).unwrap();
        assert_eq!(scenes.scene(1).unwrap().width, 512);
        write_scene(&scenes, &path).unwrap();
        assert_eq!(read_scene(&path).unwrap(), scenes);
    }
}
