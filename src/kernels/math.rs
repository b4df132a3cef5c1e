// SPDX-License-Identifier: PMPL-1.0-or-later

//! Voxel arithmetic, thresholding and simple filters

use crate::model::volume::{alloc_voxels, Volume, VoxelExtent};
use anyhow::{bail, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BinaryOp {
    #[value(name = "ADD")]
    Add,
    #[value(name = "SUBTRACT")]
    Subtract,
    #[value(name = "MULTIPLY")]
    Multiply,
    #[value(name = "DIVIDE")]
    Divide,
    #[value(name = "AND")]
    And,
    #[value(name = "OR")]
    Or,
    #[value(name = "MAX")]
    Max,
    #[value(name = "MIN")]
    Min,
    #[value(name = "AVERAGE")]
    Average,
    #[value(name = "SUBTRACT_POSITIVE")]
    SubtractPositive,
    #[value(name = "DIFF_RATIO")]
    DiffRatio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum UnaryOp {
    #[value(name = "ABS_VALUE")]
    AbsValue,
    #[value(name = "ADD_SCALAR")]
    AddScalar,
    #[value(name = "MULTIPLY_SCALAR")]
    MultiplyScalar,
    /// Clamp to at most the scalar
    #[value(name = "CEILING")]
    Ceiling,
    /// Clamp to at least the scalar
    #[value(name = "FLOOR")]
    Floor,
    #[value(name = "FIX_NAN")]
    FixNan,
    #[value(name = "LOG2")]
    Log2,
    #[value(name = "EXP")]
    Exp,
    #[value(name = "ONE_MINUS_VALUE")]
    OneMinusValue,
    #[value(name = "SQRT")]
    Sqrt,
    #[value(name = "SQUARE")]
    Square,
}

impl BinaryOp {
    pub fn needs_third_operand(self) -> bool {
        self == BinaryOp::DiffRatio
    }

    fn apply(self, a: f32, b: f32, c: f32) -> f32 {
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Subtract => a - b,
            BinaryOp::Multiply => a * b,
            BinaryOp::Divide => {
                if b == 0.0 {
                    0.0
                } else {
                    a / b
                }
            }
            BinaryOp::And => {
                if a != 0.0 && b != 0.0 {
                    a
                } else {
                    0.0
                }
            }
            BinaryOp::Or => {
                if a != 0.0 {
                    a
                } else {
                    b
                }
            }
            BinaryOp::Max => a.max(b),
            BinaryOp::Min => a.min(b),
            BinaryOp::Average => (a + b) * 0.5,
            BinaryOp::SubtractPositive => (a - b).max(0.0),
            BinaryOp::DiffRatio => {
                if c == 0.0 {
                    0.0
                } else {
                    (a - b) / c
                }
            }
        }
    }
}

impl UnaryOp {
    fn apply(self, v: f32, scalar: f32) -> f32 {
        match self {
            UnaryOp::AbsValue => v.abs(),
            UnaryOp::AddScalar => v + scalar,
            UnaryOp::MultiplyScalar => v * scalar,
            UnaryOp::Ceiling => v.min(scalar),
            UnaryOp::Floor => v.max(scalar),
            UnaryOp::FixNan => {
                if v.is_finite() {
                    v
                } else {
                    0.0
                }
            }
            UnaryOp::Log2 => {
                if v > 0.0 {
                    v.log2()
                } else {
                    0.0
                }
            }
            UnaryOp::Exp => v.exp(),
            UnaryOp::OneMinusValue => 1.0 - v,
            UnaryOp::Sqrt => {
                if v > 0.0 {
                    v.sqrt()
                } else {
                    0.0
                }
            }
            UnaryOp::Square => v * v,
        }
    }
}

/// `op(a, b[, c])` voxel by voxel. The third operand is read only by
/// `DIFF_RATIO`.
pub fn binary(op: BinaryOp, a: &Volume, b: &Volume, c: Option<&Volume>) -> Result<Volume> {
    if !a.same_grid(b) {
        bail!(
            "volumes differ in size ({:?} x {} and {:?} x {})",
            a.dims,
            a.components,
            b.dims,
            b.components
        );
    }
    let third = if op.needs_third_operand() {
        match c {
            Some(c) if c.same_grid(a) => Some(c),
            Some(_) => bail!("third volume differs in size"),
            None => bail!("{:?} requires a third volume", op),
        }
    } else {
        None
    };
    let mut out = a.blank_like(a.components)?;
    for (n, slot) in out.data.iter_mut().enumerate() {
        let cv = third.map(|v| v.data[n]).unwrap_or(0.0);
        *slot = op.apply(a.data[n], b.data[n], cv);
    }
    Ok(out)
}

pub fn unary(op: UnaryOp, volume: &mut Volume, scalar: f32) {
    for v in volume.data.iter_mut() {
        *v = op.apply(*v, scalar);
    }
}

/// Voxels at or above `threshold` become 255, everything else 0.
pub fn threshold(volume: &mut Volume, threshold: f32) {
    for v in volume.data.iter_mut() {
        *v = if *v >= threshold { 255.0 } else { 0.0 };
    }
}

/// Map `[in_min, in_max]` linearly onto `[out_min, out_max]`, clamping.
pub fn rescale(volume: &mut Volume, in_min: f32, in_max: f32, out_min: f32, out_max: f32) -> Result<()> {
    if in_max <= in_min {
        bail!("input range {} to {} is empty", in_min, in_max);
    }
    let scale = (out_max - out_min) / (in_max - in_min);
    for v in volume.data.iter_mut() {
        let clamped = v.clamp(in_min, in_max);
        *v = out_min + (clamped - in_min) * scale;
    }
    Ok(())
}

/// 3x3x3 mean over the in-grid neighbourhood, per component.
pub fn blur(volume: &Volume) -> Result<Volume> {
    let mut out = volume.blank_like(volume.components)?;
    out.data_type = volume.data_type;
    let [ni, nj, nk] = volume.dims;
    let nvox = volume.voxel_count();
    for c in 0..volume.components {
        let src = &volume.data[c * nvox..(c + 1) * nvox];
        for k in 0..nk {
            for j in 0..nj {
                for i in 0..ni {
                    let mut sum = 0.0;
                    let mut count = 0.0;
                    for dk in -1i64..=1 {
                        for dj in -1i64..=1 {
                            for di in -1i64..=1 {
                                let p = [i as i64 + di, j as i64 + dj, k as i64 + dk];
                                if volume.in_bounds(p) {
                                    sum += src[volume.index(p[0] as usize, p[1] as usize, p[2] as usize)];
                                    count += 1.0;
                                }
                            }
                        }
                    }
                    out.data[c * nvox + volume.index(i, j, k)] = sum / count;
                }
            }
        }
    }
    Ok(out)
}

/// Three-component central-difference gradient in world units.
pub fn gradient(volume: &Volume) -> Result<Volume> {
    let mut out = volume.blank_like(3)?;
    let nvox = volume.voxel_count();
    for index in 0..nvox {
        let ijk = volume.ijk(index);
        for axis in 0..3 {
            let mut lo = ijk;
            let mut hi = ijk;
            if ijk[axis] > 0 {
                lo[axis] -= 1;
            }
            if ijk[axis] + 1 < volume.dims[axis] {
                hi[axis] += 1;
            }
            let steps = (hi[axis] - lo[axis]) as f32;
            let value = if steps == 0.0 {
                0.0
            } else {
                let diff = volume.get(hi[0], hi[1], hi[2]) - volume.get(lo[0], lo[1], lo[2]);
                diff / (steps * volume.spacing[axis])
            };
            out.data[axis * nvox + index] = value;
        }
    }
    Ok(out)
}

/// Euclidean length across components.
pub fn vector_magnitude(volume: &Volume) -> Result<Volume> {
    let mut out = volume.blank_like(1)?;
    let nvox = volume.voxel_count();
    for index in 0..nvox {
        let sum: f32 = (0..volume.components)
            .map(|c| volume.data[c * nvox + index].powi(2))
            .sum();
        out.data[index] = sum.sqrt();
    }
    Ok(out)
}

/// Set every voxel of `extent` (clipped to the grid) to `value`.
pub fn fill_extent(volume: &mut Volume, extent: &VoxelExtent, value: f32) {
    let (lo, hi) = extent.clamp_to(volume.dims);
    for k in lo[2]..hi[2] {
        for j in lo[1]..hi[1] {
            for i in lo[0]..hi[0] {
                volume.set(i, j, k, value);
            }
        }
    }
}

/// Set voxels within `radius` voxels of `center` to `value`.
pub fn fill_sphere(volume: &mut Volume, center: [i64; 3], radius: f32, value: f32) {
    let r2 = radius * radius;
    for index in 0..volume.voxel_count() {
        let ijk = volume.ijk(index);
        let d2: f32 = (0..3)
            .map(|a| (ijk[a] as i64 - center[a]) as f32)
            .map(|d| d * d)
            .sum();
        if d2 <= r2 {
            volume.data[index] = value;
        }
    }
}

/// Move voxels `offset` steps along `axis`; vacated voxels become zero.
pub fn shift_axis(volume: &mut Volume, axis: usize, offset: i64) -> Result<()> {
    let nvox = volume.voxel_count();
    let mut data = alloc_voxels(volume.data.len())?;
    for c in 0..volume.components {
        for index in 0..nvox {
            let mut ijk = volume.ijk(index);
            let target = ijk[axis] as i64 + offset;
            if target < 0 || target >= volume.dims[axis] as i64 {
                continue;
            }
            ijk[axis] = target as usize;
            let to = volume.index(ijk[0], ijk[1], ijk[2]);
            data[c * nvox + to] = volume.data[c * nvox + index];
        }
    }
    volume.data = data;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(values: &[f32]) -> Volume {
        let mut v = Volume::new([values.len(), 1, 1], 1).unwrap();
        v.data.copy_from_slice(values);
        v
    }

    #[test]
    fn binary_identities_hold() {
        let v = filled(&[-2.0, 0.0, 3.5, 7.0]);
        let zero = filled(&[0.0; 4]);
        let one = filled(&[1.0; 4]);
        assert_eq!(binary(BinaryOp::Add, &v, &zero, None).unwrap().data, v.data);
        assert_eq!(binary(BinaryOp::Multiply, &v, &one, None).unwrap().data, v.data);
        assert_eq!(binary(BinaryOp::Subtract, &v, &v, None).unwrap().data, zero.data);
        assert_eq!(binary(BinaryOp::And, &v, &v, None).unwrap().data, v.data);
        assert_eq!(binary(BinaryOp::Or, &v, &zero, None).unwrap().data, v.data);
    }

    #[test]
    fn sqrt_of_square_is_absolute_value() {
        let mut v = filled(&[-3.0, 0.5, 4.0]);
        unary(UnaryOp::Square, &mut v, 0.0);
        unary(UnaryOp::Sqrt, &mut v, 0.0);
        for (got, want) in v.data.iter().zip([3.0, 0.5, 4.0]) {
            assert!((got - want).abs() < 1e-6);
        }
    }

    #[test]
    fn diff_ratio_needs_third_volume() {
        let a = filled(&[4.0, 4.0]);
        let b = filled(&[2.0, 2.0]);
        assert!(binary(BinaryOp::DiffRatio, &a, &b, None).is_err());
        let c = filled(&[2.0, 0.0]);
        let out = binary(BinaryOp::DiffRatio, &a, &b, Some(&c)).unwrap();
        assert_eq!(out.data, [1.0, 0.0]);
    }

    #[test]
    fn threshold_is_binary_at_boundary() {
        let mut v = filled(&[127.9, 128.0, 300.0, -1.0]);
        threshold(&mut v, 128.0);
        assert_eq!(v.data, [0.0, 255.0, 255.0, 0.0]);
    }

    #[test]
    fn shift_moves_and_zero_fills() {
        let mut v = filled(&[1.0, 2.0, 3.0]);
        shift_axis(&mut v, 0, 1).unwrap();
        assert_eq!(v.data, [0.0, 1.0, 2.0]);
    }

    #[test]
    fn gradient_of_ramp_is_constant() {
        let v = filled(&[0.0, 2.0, 4.0, 6.0]);
        let g = gradient(&v).unwrap();
        assert_eq!(&g.data[..4], &[2.0, 2.0, 2.0, 2.0]);
    }
}
