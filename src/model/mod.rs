// SPDX-License-Identifier: PMPL-1.0-or-later

//! Domain model: volumes, surfaces, per-node layers and the brain set

pub mod brain_set;
pub mod deformation;
pub mod geometry;
pub mod header;
pub mod layers;
pub mod params;
pub mod scene;
pub mod surface;
pub mod volume;

pub use brain_set::{BrainSet, Loaded};
pub use surface::{CoordinateFile, Surface, TopologyFile};
pub use volume::{Volume, VoxelExtent};
