// SPDX-License-Identifier: PMPL-1.0-or-later

//! Saved display scenes

use crate::types::{Axis, SurfaceView};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneFile {
    pub scenes: Vec<Scene>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    #[serde(default = "default_image_size")]
    pub width: u32,
    #[serde(default = "default_image_size")]
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface: Option<SurfaceScene>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<VolumeScene>,
}

/// A surface drawn from the brain set, picked by coordinate type name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceScene {
    pub coord_type: String,
    pub view: SurfaceView,
}

/// A slice of the first volume in the brain set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeScene {
    pub axis: Axis,
    pub slice: usize,
}

fn default_image_size() -> u32 {
    512
}

impl SceneFile {
    /// One-based lookup, matching how scenes are numbered for the user.
    pub fn scene(&self, number: usize) -> Option<&Scene> {
        number.checked_sub(1).and_then(|i| self.scenes.get(i))
    }
}
