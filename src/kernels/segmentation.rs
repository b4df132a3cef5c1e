// SPDX-License-Identifier: PMPL-1.0-or-later

//! Segmentation pipeline driven by a Y/N operation code

use super::{math, morphology};
use crate::model::volume::Volume;
use anyhow::{bail, Result};
use tracing::debug;

/// Voxels injected on each face whose padding flag is `Y`
pub const PADDING_VOXELS: usize = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    DisconnectEyeSkull,
    DisconnectHindbrain,
    HighThresholdHindbrain,
    CutCorpusCallosum,
    Segment,
    FillVentricles,
    ErrorCorrect,
    GenerateSurfaces,
    ReducePolygons,
    TopologyCorrect,
    Inflated,
    VeryInflated,
    Ellipsoidal,
    Hull,
    Attributes,
}

pub const STEPS: [(Step, &str); 15] = [
    (Step::DisconnectEyeSkull, "disconnect eye and skull"),
    (Step::DisconnectHindbrain, "disconnect hindbrain"),
    (Step::HighThresholdHindbrain, "use high threshold for hindbrain"),
    (Step::CutCorpusCallosum, "cut corpus callosum"),
    (Step::Segment, "generate segmentation"),
    (Step::FillVentricles, "fill ventricles"),
    (Step::ErrorCorrect, "automatic error correction"),
    (Step::GenerateSurfaces, "generate raw and fiducial surfaces"),
    (Step::ReducePolygons, "limit polygons in surfaces"),
    (Step::TopologyCorrect, "correct surface topology"),
    (Step::Inflated, "generate inflated surface"),
    (Step::VeryInflated, "generate very inflated surface"),
    (Step::Ellipsoidal, "generate ellipsoidal surface"),
    (Step::Hull, "generate hull surface"),
    (Step::Attributes, "identify registration landmarks and attributes"),
];

fn parse_flags(code: &str, expected: usize, what: &str) -> Result<Vec<bool>> {
    let chars: Vec<char> = code.chars().collect();
    if chars.len() != expected {
        bail!(
            "{} must have exactly {} characters, \"{}\" has {}",
            what,
            expected,
            code,
            chars.len()
        );
    }
    chars
        .iter()
        .enumerate()
        .map(|(n, c)| match c {
            'Y' => Ok(true),
            'N' => Ok(false),
            other => bail!(
                "{} character {} is '{}', expected Y or N",
                what,
                n + 1,
                other
            ),
        })
        .collect()
}

/// Steps selected by a 15-character operation code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationCode {
    flags: Vec<bool>,
}

impl OperationCode {
    pub fn parse(code: &str) -> Result<Self> {
        Ok(Self {
            flags: parse_flags(code, STEPS.len(), "operation code")?,
        })
    }

    pub fn enabled(&self) -> impl Iterator<Item = Step> + '_ {
        STEPS
            .iter()
            .zip(&self.flags)
            .filter(|(_, on)| **on)
            .map(|((step, _), _)| *step)
    }

    pub fn is_enabled(&self, step: Step) -> bool {
        self.enabled().any(|s| s == step)
    }
}

/// Faces to pad, ordered -X +X -Y +Y -Z +Z.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaddingCode {
    pub faces: [bool; 6],
}

impl PaddingCode {
    pub fn parse(code: &str) -> Result<Self> {
        let flags = parse_flags(code, 6, "padding code")?;
        let mut faces = [false; 6];
        faces.copy_from_slice(&flags);
        Ok(Self { faces })
    }

    pub fn negative(&self) -> [usize; 3] {
        self.amounts(0)
    }

    pub fn positive(&self) -> [usize; 3] {
        self.amounts(1)
    }

    fn amounts(&self, side: usize) -> [usize; 3] {
        let mut out = [0; 3];
        for (axis, slot) in out.iter_mut().enumerate() {
            if self.faces[axis * 2 + side] {
                *slot = PADDING_VOXELS;
            }
        }
        out
    }

    pub fn any(&self) -> bool {
        self.faces.iter().any(|f| *f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentationParams {
    pub gray_peak: f32,
    pub white_peak: f32,
}

/// Run the selected steps over `anatomy`, returning the segmentation on the
/// input grid.
pub fn run(
    anatomy: &Volume,
    code: &OperationCode,
    padding: &PaddingCode,
    params: &SegmentationParams,
) -> Result<Volume> {
    let mut working = if padding.any() {
        anatomy.padded(padding.negative(), padding.positive())?
    } else {
        anatomy.clone()
    };
    let mut segmented = false;

    for step in code.enabled() {
        let description = STEPS
            .iter()
            .find(|(s, _)| *s == step)
            .map(|(_, d)| *d)
            .unwrap_or("");
        debug!("segmentation step: {}", description);
        match step {
            Step::Segment => {
                let level = (params.gray_peak + params.white_peak) * 0.5;
                math::threshold(&mut working, level);
                morphology::remove_islands(&mut working);
                segmented = true;
            }
            Step::FillVentricles => {
                require_segmentation(segmented, description)?;
                morphology::fill_holes(&mut working);
            }
            Step::ErrorCorrect => {
                require_segmentation(segmented, description)?;
                morphology::remove_islands(&mut working);
                morphology::fill_holes(&mut working);
            }
            Step::HighThresholdHindbrain | Step::ReducePolygons => {
                // modifiers of other steps; nothing to run on their own
            }
            _ => bail!("{} is not available in this build", description),
        }
    }

    if !segmented {
        morphology::binarize(&mut working);
    }

    if padding.any() {
        let neg = padding.negative();
        let extent = crate::model::volume::VoxelExtent {
            min: [neg[0] as i64, neg[1] as i64, neg[2] as i64],
            max: [
                (neg[0] + anatomy.dims[0]) as i64,
                (neg[1] + anatomy.dims[1]) as i64,
                (neg[2] + anatomy.dims[2]) as i64,
            ],
        };
        working = working.resized(&extent)?;
    }
    Ok(working)
}

fn require_segmentation(segmented: bool, description: &str) -> Result<()> {
    if !segmented {
        bail!("{} needs the segmentation step", description);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operation_code_arity() {
        assert!(OperationCode::parse("NNNNYNNNNNNNNNN").is_ok());
        assert!(OperationCode::parse("NNNNYNNNNNNNNN").is_err());
        assert!(OperationCode::parse("NNNNYNNNNNNNNNNN").is_err());
        let err = OperationCode::parse("NNNNYNNNNxNNNNN").unwrap_err();
        assert!(err.to_string().contains("character 10"));
    }

    #[test]
    fn padding_amounts_follow_face_order() {
        let pad = PaddingCode::parse("YNNYNN").unwrap();
        assert_eq!(pad.negative(), [30, 0, 0]);
        assert_eq!(pad.positive(), [0, 30, 0]);
        assert!(PaddingCode::parse("YNNYN").is_err());
        assert!(PaddingCode::parse("YNNYNy").is_err());
    }

    #[test]
    fn segment_keeps_grid_and_largest_blob() {
        let mut anatomy = Volume::new([8, 8, 8], 1).unwrap();
        for k in 2..6 {
            for j in 2..6 {
                for i in 2..6 {
                    anatomy.set(i, j, k, 200.0);
                }
            }
        }
        anatomy.set(0, 0, 0, 200.0);
        let code = OperationCode::parse("NNNNYNNNNNNNNNN").unwrap();
        let pad = PaddingCode::parse("YYNNNN").unwrap();
        let params = SegmentationParams {
            gray_peak: 80.0,
            white_peak: 160.0,
        };
        let seg = run(&anatomy, &code, &pad, &params).unwrap();
        assert_eq!(seg.dims, [8, 8, 8]);
        assert_eq!(seg.get(3, 3, 3), 255.0);
        assert_eq!(seg.get(0, 0, 0), 0.0);
        assert_eq!(seg.origin, anatomy.origin);
    }

    #[test]
    fn unsupported_step_fails() {
        let anatomy = Volume::new([2, 2, 2], 1).unwrap();
        let code = OperationCode::parse("YNNNNNNNNNNNNNN").unwrap();
        let pad = PaddingCode::parse("NNNNNN").unwrap();
        let params = SegmentationParams {
            gray_peak: 0.0,
            white_peak: 1.0,
        };
        assert!(run(&anatomy, &code, &pad, &params).is_err());
    }
}
