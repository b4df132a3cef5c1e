// SPDX-License-Identifier: PMPL-1.0-or-later

//! In-memory volume
//!
//! Voxels are held as `f32` in component-major order: all voxels of
//! component 0 (i fastest, then j, then k), then component 1, and so on.
//! That matches the sub-brick layout of every supported container.

use crate::error::{CommandError, CommandResult};
use crate::types::{Orientation, VoxelDataType};

/// Half-open voxel box `[min, max)` per axis; may reach outside a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoxelExtent {
    pub min: [i64; 3],
    pub max: [i64; 3],
}

impl VoxelExtent {
    pub fn contains(&self, ijk: [usize; 3]) -> bool {
        (0..3).all(|a| {
            let v = ijk[a] as i64;
            v >= self.min[a] && v < self.max[a]
        })
    }

    /// Intersection with a grid of `dims`, as usize ranges.
    pub fn clamp_to(&self, dims: [usize; 3]) -> ([usize; 3], [usize; 3]) {
        let mut lo = [0usize; 3];
        let mut hi = [0usize; 3];
        for a in 0..3 {
            lo[a] = self.min[a].clamp(0, dims[a] as i64) as usize;
            hi[a] = self.max[a].clamp(0, dims[a] as i64) as usize;
        }
        (lo, hi)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    pub dims: [usize; 3],
    pub components: usize,
    pub spacing: [f32; 3],
    pub origin: [f32; 3],
    pub orientation: Orientation,
    /// Storage type the voxels had on disk; writes always use float.
    pub data_type: VoxelDataType,
    pub label: String,
    pub region_names: Vec<String>,
    pub data: Vec<f32>,
}

/// Allocate a zeroed voxel buffer, reporting exhaustion instead of aborting.
pub fn alloc_voxels(count: usize) -> CommandResult<Vec<f32>> {
    let mut data = Vec::new();
    data.try_reserve_exact(count).map_err(|_| {
        CommandError::OutOfMemory(format!("unable to allocate {} voxels", count))
    })?;
    data.resize(count, 0.0);
    Ok(data)
}

impl Volume {
    /// Zero-filled LPI volume with unit spacing and zero origin.
    pub fn new(dims: [usize; 3], components: usize) -> CommandResult<Self> {
        let components = components.max(1);
        let count = dims[0]
            .checked_mul(dims[1])
            .and_then(|v| v.checked_mul(dims[2]))
            .and_then(|v| v.checked_mul(components))
            .ok_or_else(|| {
                CommandError::OutOfMemory(format!(
                    "volume of {}x{}x{}x{} voxels is too large",
                    dims[0], dims[1], dims[2], components
                ))
            })?;
        Ok(Self {
            dims,
            components,
            spacing: [1.0; 3],
            origin: [0.0; 3],
            orientation: Orientation::LPI,
            data_type: VoxelDataType::Float,
            label: String::new(),
            region_names: Vec::new(),
            data: alloc_voxels(count)?,
        })
    }

    /// Same grid and metadata as `self`, zero voxels, `components` wide.
    pub fn blank_like(&self, components: usize) -> CommandResult<Self> {
        let mut out = Volume::new(self.dims, components)?;
        out.copy_geometry_from(self);
        out.label = self.label.clone();
        out.region_names = self.region_names.clone();
        Ok(out)
    }

    pub fn copy_geometry_from(&mut self, other: &Volume) {
        self.spacing = other.spacing;
        self.origin = other.origin;
        self.orientation = other.orientation;
    }

    pub fn voxel_count(&self) -> usize {
        self.dims[0] * self.dims[1] * self.dims[2]
    }

    #[inline]
    pub fn index(&self, i: usize, j: usize, k: usize) -> usize {
        (k * self.dims[1] + j) * self.dims[0] + i
    }

    #[inline]
    pub fn ijk(&self, index: usize) -> [usize; 3] {
        let i = index % self.dims[0];
        let j = (index / self.dims[0]) % self.dims[1];
        let k = index / (self.dims[0] * self.dims[1]);
        [i, j, k]
    }

    #[inline]
    pub fn get(&self, i: usize, j: usize, k: usize) -> f32 {
        self.data[self.index(i, j, k)]
    }

    #[inline]
    pub fn set(&mut self, i: usize, j: usize, k: usize, value: f32) {
        let idx = self.index(i, j, k);
        self.data[idx] = value;
    }

    pub fn get_component(&self, i: usize, j: usize, k: usize, c: usize) -> f32 {
        self.data[c * self.voxel_count() + self.index(i, j, k)]
    }

    pub fn set_component(&mut self, i: usize, j: usize, k: usize, c: usize, value: f32) {
        let idx = c * self.voxel_count() + self.index(i, j, k);
        self.data[idx] = value;
    }

    pub fn in_bounds(&self, ijk: [i64; 3]) -> bool {
        (0..3).all(|a| ijk[a] >= 0 && (ijk[a] as usize) < self.dims[a])
    }

    pub fn same_grid(&self, other: &Volume) -> bool {
        self.dims == other.dims && self.components == other.components
    }

    /// Minimum and maximum voxel value, ignoring NaN. Empty volumes give (0, 0).
    pub fn range(&self) -> (f32, f32) {
        let mut lo = f32::INFINITY;
        let mut hi = f32::NEG_INFINITY;
        for v in self.data.iter().copied().filter(|v| !v.is_nan()) {
            lo = lo.min(v);
            hi = hi.max(v);
        }
        if lo > hi {
            (0.0, 0.0)
        } else {
            (lo, hi)
        }
    }

    /// Stereotaxic position of a voxel centre along each world axis slot.
    pub fn voxel_position(&self, ijk: [usize; 3]) -> [f32; 3] {
        let mut pos = [0.0f32; 3];
        for a in 0..3 {
            pos[a] = self.origin[a]
                + ijk[a] as f32 * self.spacing[a] * self.orientation.0[a].sign();
        }
        pos
    }

    /// Voxel containing a stereotaxic position, if any.
    pub fn position_to_voxel(&self, xyz: [f32; 3]) -> Option<[usize; 3]> {
        let mut ijk = [0i64; 3];
        for a in 0..3 {
            let step = self.spacing[a] * self.orientation.0[a].sign();
            if step == 0.0 {
                return None;
            }
            ijk[a] = ((xyz[a] - self.origin[a]) / step).round() as i64;
        }
        if self.in_bounds(ijk) {
            Some([ijk[0] as usize, ijk[1] as usize, ijk[2] as usize])
        } else {
            None
        }
    }

    /// Reorder the grid into LPI. Volumes whose orientation is not a valid
    /// permutation are left untouched; returns whether anything changed.
    pub fn normalize_to_lpi(&mut self) -> CommandResult<bool> {
        if !self.orientation.is_valid() || self.orientation.is_lpi() {
            return Ok(false);
        }

        // old axis feeding each new (world) axis
        let mut source = [0usize; 3];
        for (old_axis, orient) in self.orientation.0.iter().enumerate() {
            if let Some(world) = orient.world_axis() {
                source[world] = old_axis;
            }
        }

        let mut dims = [0usize; 3];
        let mut spacing = [0f32; 3];
        let mut origin = [0f32; 3];
        let mut flip = [false; 3];
        for n in 0..3 {
            let a = source[n];
            dims[n] = self.dims[a];
            spacing[n] = self.spacing[a].abs();
            flip[a] = self.orientation.0[a].sign() < 0.0;
            origin[n] = if flip[a] {
                self.origin[a] - (self.dims[a].saturating_sub(1)) as f32 * spacing[n]
            } else {
                self.origin[a]
            };
        }

        let nvox = self.voxel_count();
        let mut data = alloc_voxels(self.data.len())?;
        for c in 0..self.components {
            for old_index in 0..nvox {
                let old = self.ijk(old_index);
                let mut new = [0usize; 3];
                for n in 0..3 {
                    let a = source[n];
                    new[n] = if flip[a] {
                        self.dims[a] - 1 - old[a]
                    } else {
                        old[a]
                    };
                }
                let new_index = (new[2] * dims[1] + new[1]) * dims[0] + new[0];
                data[c * nvox + new_index] = self.data[c * nvox + old_index];
            }
        }

        self.dims = dims;
        self.spacing = spacing;
        self.origin = origin;
        self.orientation = Orientation::LPI;
        self.data = data;
        Ok(true)
    }

    /// New volume covering `extent` of this grid; voxels outside stay zero.
    pub fn resized(&self, extent: &VoxelExtent) -> CommandResult<Volume> {
        let mut dims = [0usize; 3];
        for a in 0..3 {
            dims[a] = (extent.max[a] - extent.min[a]).max(0) as usize;
        }
        let mut out = Volume::new(dims, self.components)?;
        out.copy_geometry_from(self);
        out.label = self.label.clone();
        out.region_names = self.region_names.clone();
        out.data_type = self.data_type;
        for a in 0..3 {
            out.origin[a] = self.origin[a]
                + extent.min[a] as f32 * self.spacing[a] * self.orientation.0[a].sign();
        }

        let nvox_in = self.voxel_count();
        let nvox_out = out.voxel_count();
        for c in 0..self.components {
            for k in 0..dims[2] {
                for j in 0..dims[1] {
                    for i in 0..dims[0] {
                        let src = [
                            i as i64 + extent.min[0],
                            j as i64 + extent.min[1],
                            k as i64 + extent.min[2],
                        ];
                        if self.in_bounds(src) {
                            let from = self.index(src[0] as usize, src[1] as usize, src[2] as usize);
                            let to = out.index(i, j, k);
                            out.data[c * nvox_out + to] = self.data[c * nvox_in + from];
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    /// Grow the grid by `negative` voxels before and `positive` after each axis.
    pub fn padded(&self, negative: [usize; 3], positive: [usize; 3]) -> CommandResult<Volume> {
        let extent = VoxelExtent {
            min: [
                -(negative[0] as i64),
                -(negative[1] as i64),
                -(negative[2] as i64),
            ],
            max: [
                (self.dims[0] + positive[0]) as i64,
                (self.dims[1] + positive[1]) as i64,
                (self.dims[2] + positive[2]) as i64,
            ],
        };
        self.resized(&extent)
    }

    /// Bounding box of the non-zero voxels, half-open; `None` when all zero.
    pub fn nonzero_extent(&self) -> Option<VoxelExtent> {
        let mut min = [i64::MAX; 3];
        let mut max = [i64::MIN; 3];
        let nvox = self.voxel_count();
        for (index, value) in self.data.iter().enumerate() {
            if *value == 0.0 {
                continue;
            }
            let ijk = self.ijk(index % nvox);
            for a in 0..3 {
                min[a] = min[a].min(ijk[a] as i64);
                max[a] = max[a].max(ijk[a] as i64 + 1);
            }
        }
        if min[0] == i64::MAX {
            None
        } else {
            Some(VoxelExtent { min, max })
        }
    }
}
