// SPDX-License-Identifier: PMPL-1.0-or-later

//! Binary morphology on 6-connected voxel grids
//!
//! Non-zero voxels are foreground. Every result is binary: 255 or 0.

use crate::model::volume::{Volume, VoxelExtent};
use anyhow::{bail, Result};
use std::collections::VecDeque;

const FOREGROUND: f32 = 255.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SculptMode {
    #[value(name = "AND")]
    And,
    #[value(name = "SEED-AND")]
    SeedAnd,
    #[value(name = "AND-NOT")]
    AndNot,
    #[value(name = "SEED-AND-NOT")]
    SeedAndNot,
}

/// In-grid face neighbours of a voxel index.
fn neighbors(dims: [usize; 3], index: usize) -> impl Iterator<Item = usize> {
    let i = index % dims[0];
    let j = (index / dims[0]) % dims[1];
    let k = index / (dims[0] * dims[1]);
    let plane = dims[0] * dims[1];
    let mut out = [None; 6];
    if i > 0 {
        out[0] = Some(index - 1);
    }
    if i + 1 < dims[0] {
        out[1] = Some(index + 1);
    }
    if j > 0 {
        out[2] = Some(index - dims[0]);
    }
    if j + 1 < dims[1] {
        out[3] = Some(index + dims[0]);
    }
    if k > 0 {
        out[4] = Some(index - plane);
    }
    if k + 1 < dims[2] {
        out[5] = Some(index + plane);
    }
    out.into_iter().flatten()
}

fn mask_of(volume: &Volume) -> Vec<bool> {
    volume.data[..volume.voxel_count()]
        .iter()
        .map(|v| *v != 0.0)
        .collect()
}

fn store_mask(volume: &mut Volume, mask: &[bool]) {
    volume.components = 1;
    volume.data.truncate(mask.len());
    for (v, on) in volume.data.iter_mut().zip(mask) {
        *v = if *on { FOREGROUND } else { 0.0 };
    }
}

pub fn binarize(volume: &mut Volume) {
    let mask = mask_of(volume);
    store_mask(volume, &mask);
}

pub fn dilate(volume: &mut Volume, iterations: usize) {
    let mut mask = mask_of(volume);
    for _ in 0..iterations {
        let prev = mask.clone();
        for (index, on) in prev.iter().enumerate() {
            if *on {
                for n in neighbors(volume.dims, index) {
                    mask[n] = true;
                }
            }
        }
    }
    store_mask(volume, &mask);
}

pub fn erode(volume: &mut Volume, iterations: usize) {
    let mut mask = mask_of(volume);
    for _ in 0..iterations {
        let prev = mask.clone();
        for (index, on) in prev.iter().enumerate() {
            if *on && neighbors(volume.dims, index).any(|n| !prev[n]) {
                mask[index] = false;
            }
        }
    }
    store_mask(volume, &mask);
}

/// Breadth-first component of `value`-valued voxels reachable from `seeds`.
fn flood(mask: &[bool], dims: [usize; 3], seeds: impl IntoIterator<Item = usize>, value: bool) -> Vec<bool> {
    let mut reached = vec![false; mask.len()];
    let mut queue = VecDeque::new();
    for s in seeds {
        if mask[s] == value && !reached[s] {
            reached[s] = true;
            queue.push_back(s);
        }
    }
    while let Some(index) = queue.pop_front() {
        for n in neighbors(dims, index) {
            if mask[n] == value && !reached[n] {
                reached[n] = true;
                queue.push_back(n);
            }
        }
    }
    reached
}

/// Background not reachable from the grid boundary becomes foreground.
pub fn fill_holes(volume: &mut Volume) {
    let dims = volume.dims;
    let mask = mask_of(volume);
    let boundary = (0..mask.len()).filter(|&index| {
        let ijk = volume.ijk(index);
        (0..3).any(|a| ijk[a] == 0 || ijk[a] + 1 == dims[a])
    });
    let outside = flood(&mask, dims, boundary.collect::<Vec<_>>(), false);
    let filled: Vec<bool> = outside.iter().map(|o| !o).collect();
    store_mask(volume, &filled);
}

/// Keep only the foreground component containing `seed`.
pub fn flood_fill(volume: &mut Volume, seed: [usize; 3]) -> Result<()> {
    if !volume.in_bounds([seed[0] as i64, seed[1] as i64, seed[2] as i64]) {
        bail!("seed {:?} is outside the volume {:?}", seed, volume.dims);
    }
    let mask = mask_of(volume);
    let start = volume.index(seed[0], seed[1], seed[2]);
    if !mask[start] {
        bail!("seed {:?} is not in the foreground", seed);
    }
    let kept = flood(&mask, volume.dims, [start], true);
    store_mask(volume, &kept);
    Ok(())
}

/// Keep only the largest foreground component.
pub fn remove_islands(volume: &mut Volume) {
    let mask = mask_of(volume);
    let mut labelled = vec![false; mask.len()];
    let mut best: Vec<bool> = vec![false; mask.len()];
    let mut best_size = 0;
    for index in 0..mask.len() {
        if mask[index] && !labelled[index] {
            let component = flood(&mask, volume.dims, [index], true);
            let size = component.iter().filter(|c| **c).count();
            for (l, c) in labelled.iter_mut().zip(&component) {
                *l |= *c;
            }
            if size > best_size {
                best_size = size;
                best = component;
            }
        }
    }
    store_mask(volume, &best);
}

/// Grow `volume` inside `extent` for `iterations` steps, admitting only
/// voxels where `other` is non-zero (AND) or zero (AND-NOT). The SEED modes
/// then keep just the component holding `seed`.
pub fn sculpt(
    volume: &mut Volume,
    mode: SculptMode,
    seed: [usize; 3],
    extent: &VoxelExtent,
    iterations: usize,
    other: &Volume,
) -> Result<()> {
    if volume.dims != other.dims {
        bail!("sculpt volumes differ in size ({:?} and {:?})", volume.dims, other.dims);
    }
    let want_other = matches!(mode, SculptMode::And | SculptMode::SeedAnd);
    let other_mask = mask_of(other);
    let mut mask = mask_of(volume);
    for _ in 0..iterations {
        let prev = mask.clone();
        let mut grew = false;
        for (index, on) in prev.iter().enumerate() {
            if !*on {
                continue;
            }
            for n in neighbors(volume.dims, index) {
                if !mask[n] && other_mask[n] == want_other && extent.contains(volume.ijk(n)) {
                    mask[n] = true;
                    grew = true;
                }
            }
        }
        if !grew {
            break;
        }
    }
    store_mask(volume, &mask);
    if matches!(mode, SculptMode::SeedAnd | SculptMode::SeedAndNot) {
        flood_fill(volume, seed)?;
    }
    Ok(())
}

/// Zero voxels where `mask` is zero.
pub fn mask_with_volume(volume: &mut Volume, mask: &Volume) -> Result<()> {
    if volume.dims != mask.dims {
        bail!("mask size {:?} differs from volume size {:?}", mask.dims, volume.dims);
    }
    let nvox = volume.voxel_count();
    for c in 0..volume.components {
        for index in 0..nvox {
            if mask.data[index] == 0.0 {
                volume.data[c * nvox + index] = 0.0;
            }
        }
    }
    Ok(())
}

/// Zero voxels outside `extent`.
pub fn mask_with_extent(volume: &mut Volume, extent: &VoxelExtent) {
    let nvox = volume.voxel_count();
    for index in 0..nvox {
        if !extent.contains(volume.ijk(index)) {
            for c in 0..volume.components {
                volume.data[c * nvox + index] = 0.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube(dims: [usize; 3], on: &[[usize; 3]]) -> Volume {
        let mut v = Volume::new(dims, 1).unwrap();
        for p in on {
            v.set(p[0], p[1], p[2], 1.0);
        }
        v
    }

    fn count(v: &Volume) -> usize {
        v.data.iter().filter(|x| **x != 0.0).count()
    }

    #[test]
    fn dilate_then_erode_single_voxel() {
        let mut v = cube([5, 5, 5], &[[2, 2, 2]]);
        dilate(&mut v, 1);
        assert_eq!(count(&v), 7);
        erode(&mut v, 1);
        assert_eq!(count(&v), 1);
        assert_eq!(v.get(2, 2, 2), 255.0);
    }

    #[test]
    fn fill_holes_closes_interior_cavity() {
        let mut on = Vec::new();
        for k in 0..3 {
            for j in 0..3 {
                for i in 0..3 {
                    if [i, j, k] != [1, 1, 1] {
                        on.push([i + 1, j + 1, k + 1]);
                    }
                }
            }
        }
        let mut v = cube([5, 5, 5], &on);
        fill_holes(&mut v);
        assert_eq!(v.get(2, 2, 2), 255.0);
        assert_eq!(v.get(0, 0, 0), 0.0);
        assert_eq!(count(&v), 27);
    }

    #[test]
    fn remove_islands_keeps_largest() {
        let mut v = cube([6, 1, 1], &[[0, 0, 0], [2, 0, 0], [3, 0, 0], [4, 0, 0]]);
        remove_islands(&mut v);
        assert_eq!(v.data, [0.0, 0.0, 255.0, 255.0, 255.0, 0.0]);
    }

    #[test]
    fn flood_fill_requires_foreground_seed() {
        let mut v = cube([3, 1, 1], &[[0, 0, 0], [2, 0, 0]]);
        assert!(flood_fill(&mut v, [1, 0, 0]).is_err());
        flood_fill(&mut v, [2, 0, 0]).unwrap();
        assert_eq!(v.data, [0.0, 0.0, 255.0]);
    }

    #[test]
    fn sculpt_and_grows_only_into_other() {
        let mut v = cube([5, 1, 1], &[[2, 0, 0]]);
        let other = cube([5, 1, 1], &[[1, 0, 0], [2, 0, 0], [3, 0, 0], [4, 0, 0]]);
        let extent = VoxelExtent { min: [0, 0, 0], max: [4, 1, 1] };
        sculpt(&mut v, SculptMode::And, [2, 0, 0], &extent, 5, &other).unwrap();
        assert_eq!(v.data, [0.0, 255.0, 255.0, 255.0, 0.0]);
    }
}
