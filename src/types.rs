// SPDX-License-Identifier: PMPL-1.0-or-later

//! Core type definitions shared by the adapters, the brain set and the
//! operation handlers.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Volume axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
pub enum Axis {
    #[value(name = "X")]
    X,
    #[value(name = "Y")]
    Y,
    #[value(name = "Z")]
    Z,
}

impl Axis {
    pub fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Direction in which voxel indices increase along one volume axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisOrientation {
    LeftToRight,
    RightToLeft,
    PosteriorToAnterior,
    AnteriorToPosterior,
    InferiorToSuperior,
    SuperiorToInferior,
    Unknown,
}

impl AxisOrientation {
    pub fn letter(self) -> char {
        match self {
            AxisOrientation::LeftToRight => 'L',
            AxisOrientation::RightToLeft => 'R',
            AxisOrientation::PosteriorToAnterior => 'P',
            AxisOrientation::AnteriorToPosterior => 'A',
            AxisOrientation::InferiorToSuperior => 'I',
            AxisOrientation::SuperiorToInferior => 'S',
            AxisOrientation::Unknown => '?',
        }
    }

    /// Uppercase letters only; `l` is not `L`.
    pub fn from_letter(letter: char) -> Option<Self> {
        match letter {
            'L' => Some(AxisOrientation::LeftToRight),
            'R' => Some(AxisOrientation::RightToLeft),
            'P' => Some(AxisOrientation::PosteriorToAnterior),
            'A' => Some(AxisOrientation::AnteriorToPosterior),
            'I' => Some(AxisOrientation::InferiorToSuperior),
            'S' => Some(AxisOrientation::SuperiorToInferior),
            _ => None,
        }
    }

    /// World axis (0 = x, 1 = y, 2 = z) this orientation runs along.
    pub fn world_axis(self) -> Option<usize> {
        match self {
            AxisOrientation::LeftToRight | AxisOrientation::RightToLeft => Some(0),
            AxisOrientation::PosteriorToAnterior | AxisOrientation::AnteriorToPosterior => Some(1),
            AxisOrientation::InferiorToSuperior | AxisOrientation::SuperiorToInferior => Some(2),
            AxisOrientation::Unknown => None,
        }
    }

    /// +1 when the RAS world coordinate grows with the voxel index.
    pub fn sign(self) -> f32 {
        match self {
            AxisOrientation::RightToLeft
            | AxisOrientation::AnteriorToPosterior
            | AxisOrientation::SuperiorToInferior => -1.0,
            _ => 1.0,
        }
    }

    /// Orientation along `world_axis` whose direction matches `sign`.
    pub fn from_world(world_axis: usize, sign: f32) -> Self {
        match (world_axis, sign >= 0.0) {
            (0, true) => AxisOrientation::LeftToRight,
            (0, false) => AxisOrientation::RightToLeft,
            (1, true) => AxisOrientation::PosteriorToAnterior,
            (1, false) => AxisOrientation::AnteriorToPosterior,
            (2, true) => AxisOrientation::InferiorToSuperior,
            (2, false) => AxisOrientation::SuperiorToInferior,
            _ => AxisOrientation::Unknown,
        }
    }
}

/// Per-axis orientation of a volume's voxel grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Orientation(pub [AxisOrientation; 3]);

impl Orientation {
    pub const LPI: Orientation = Orientation([
        AxisOrientation::LeftToRight,
        AxisOrientation::PosteriorToAnterior,
        AxisOrientation::InferiorToSuperior,
    ]);

    pub const UNKNOWN: Orientation = Orientation([AxisOrientation::Unknown; 3]);

    /// Parse a three-letter code drawn from {L, R, P, A, I, S}.
    pub fn parse(code: &str) -> Result<Self, String> {
        let letters: Vec<char> = code.chars().collect();
        if letters.len() != 3 {
            return Err(format!(
                "\"{}\" must be exactly three letters from L, R, P, A, I, S",
                code
            ));
        }
        let mut axes = [AxisOrientation::Unknown; 3];
        for (i, letter) in letters.iter().enumerate() {
            axes[i] = AxisOrientation::from_letter(*letter).ok_or_else(|| {
                format!(
                    "\"{}\" contains invalid orientation character '{}'",
                    code, letter
                )
            })?;
        }
        Ok(Orientation(axes))
    }

    /// True when the three axes cover x, y and z exactly once.
    pub fn is_valid(&self) -> bool {
        let mut seen = [false; 3];
        for axis in &self.0 {
            match axis.world_axis() {
                Some(w) if !seen[w] => seen[w] = true,
                _ => return false,
            }
        }
        true
    }

    pub fn is_lpi(&self) -> bool {
        *self == Orientation::LPI
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for axis in &self.0 {
            write!(f, "{}", axis.letter())?;
        }
        Ok(())
    }
}

/// Voxel storage type found on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoxelDataType {
    UnsignedByte,
    SignedShort,
    SignedInt,
    Float,
    Double,
}

impl VoxelDataType {
    pub fn name(self) -> &'static str {
        match self {
            VoxelDataType::UnsignedByte => "unsigned byte",
            VoxelDataType::SignedShort => "signed short",
            VoxelDataType::SignedInt => "signed int",
            VoxelDataType::Float => "float",
            VoxelDataType::Double => "double",
        }
    }

    pub fn bytes(self) -> usize {
        match self {
            VoxelDataType::UnsignedByte => 1,
            VoxelDataType::SignedShort => 2,
            VoxelDataType::SignedInt | VoxelDataType::Float => 4,
            VoxelDataType::Double => 8,
        }
    }
}

/// Volume file type a handler may be asked to write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum VolumeWriteType {
    #[value(name = "AFNI")]
    Afni,
    #[value(name = "NIFTI")]
    Nifti,
    #[value(name = "SPM")]
    Spm,
    #[value(name = "WUNIL")]
    Wunil,
}

impl VolumeWriteType {
    pub fn extension(self) -> &'static str {
        match self {
            VolumeWriteType::Afni => ".HEAD",
            VolumeWriteType::Nifti => ".nii",
            VolumeWriteType::Spm => ".hdr",
            VolumeWriteType::Wunil => ".ifh",
        }
    }
}

/// Anatomical structure a subject or surface belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
pub enum Structure {
    #[value(name = "LEFT", alias = "CORTEX_LEFT", alias = "L")]
    Left,
    #[value(name = "RIGHT", alias = "CORTEX_RIGHT", alias = "R")]
    Right,
    #[value(name = "BOTH", alias = "CORTEX_BOTH", alias = "LR")]
    Both,
    #[value(name = "CEREBELLUM")]
    Cerebellum,
    #[value(name = "INVALID")]
    Invalid,
}

impl Structure {
    pub fn name(self) -> &'static str {
        match self {
            Structure::Left => "CORTEX_LEFT",
            Structure::Right => "CORTEX_RIGHT",
            Structure::Both => "CORTEX_BOTH",
            Structure::Cerebellum => "CEREBELLUM",
            Structure::Invalid => "INVALID",
        }
    }

    pub fn abbreviation(self) -> &'static str {
        match self {
            Structure::Left => "L",
            Structure::Right => "R",
            Structure::Both => "LR",
            Structure::Cerebellum => "CEREBELLUM",
            Structure::Invalid => "INVALID",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        <Structure as ValueEnum>::from_str(value.trim(), true).ok()
    }
}

/// Coordinate file configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoordinateType {
    Raw,
    Fiducial,
    Inflated,
    VeryInflated,
    Ellipsoidal,
    Spherical,
    Compressed,
    Flat,
    LobarFlat,
    Hull,
    Unknown,
}

impl CoordinateType {
    pub const ALL: [CoordinateType; 11] = [
        CoordinateType::Raw,
        CoordinateType::Fiducial,
        CoordinateType::Inflated,
        CoordinateType::VeryInflated,
        CoordinateType::Ellipsoidal,
        CoordinateType::Spherical,
        CoordinateType::Compressed,
        CoordinateType::Flat,
        CoordinateType::LobarFlat,
        CoordinateType::Hull,
        CoordinateType::Unknown,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CoordinateType::Raw => "RAW",
            CoordinateType::Fiducial => "FIDUCIAL",
            CoordinateType::Inflated => "INFLATED",
            CoordinateType::VeryInflated => "VERY_INFLATED",
            CoordinateType::Ellipsoidal => "ELLIPSOIDAL",
            CoordinateType::Spherical => "SPHERICAL",
            CoordinateType::Compressed => "COMPRESSED",
            CoordinateType::Flat => "FLAT",
            CoordinateType::LobarFlat => "LOBAR_FLAT",
            CoordinateType::Hull => "HULL",
            CoordinateType::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(value: &str) -> Self {
        let upper = value.trim().to_ascii_uppercase();
        CoordinateType::ALL
            .into_iter()
            .find(|t| t.name() == upper)
            .unwrap_or(CoordinateType::Unknown)
    }

    pub fn is_flat(self) -> bool {
        matches!(self, CoordinateType::Flat | CoordinateType::LobarFlat)
    }
}

/// Topology file perimeter type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopologyType {
    Closed,
    Open,
    Cut,
    LobarCut,
    Unknown,
}

impl TopologyType {
    pub fn name(self) -> &'static str {
        match self {
            TopologyType::Closed => "CLOSED",
            TopologyType::Open => "OPEN",
            TopologyType::Cut => "CUT",
            TopologyType::LobarCut => "LOBAR_CUT",
            TopologyType::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            "CLOSED" => TopologyType::Closed,
            "OPEN" => TopologyType::Open,
            "CUT" => TopologyType::Cut,
            "LOBAR_CUT" => TopologyType::LobarCut,
            _ => TopologyType::Unknown,
        }
    }
}

/// Standard camera views used when rendering a surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SurfaceView {
    #[value(name = "LATERAL")]
    Lateral,
    #[value(name = "MEDIAL")]
    Medial,
    #[value(name = "DORSAL")]
    Dorsal,
    #[value(name = "VENTRAL")]
    Ventral,
    #[value(name = "ANTERIOR")]
    Anterior,
    #[value(name = "POSTERIOR")]
    Posterior,
}

/// Named stereotaxic reference frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StereotaxicSpace {
    pub name: &'static str,
    pub dimensions: [usize; 3],
    pub spacing: f32,
    pub origin: [f32; 3],
}

pub const STEREOTAXIC_SPACES: &[StereotaxicSpace] = &[
    StereotaxicSpace {
        name: "711-2B",
        dimensions: [176, 208, 176],
        spacing: 1.0,
        origin: [-89.0, -125.0, -71.0],
    },
    StereotaxicSpace {
        name: "711-2C",
        dimensions: [176, 208, 176],
        spacing: 1.0,
        origin: [-89.0, -125.0, -71.0],
    },
    StereotaxicSpace {
        name: "AFNI",
        dimensions: [161, 191, 151],
        spacing: 1.0,
        origin: [-80.0, -110.0, -65.0],
    },
    StereotaxicSpace {
        name: "FLIRT",
        dimensions: [182, 218, 182],
        spacing: 1.0,
        origin: [-90.0, -126.0, -72.0],
    },
    StereotaxicSpace {
        name: "MRITOTAL",
        dimensions: [181, 217, 181],
        spacing: 1.0,
        origin: [-90.0, -126.0, -72.0],
    },
    StereotaxicSpace {
        name: "SPM99",
        dimensions: [91, 109, 91],
        spacing: 2.0,
        origin: [-90.0, -126.0, -72.0],
    },
    StereotaxicSpace {
        name: "SPM2",
        dimensions: [91, 109, 91],
        spacing: 2.0,
        origin: [-90.0, -126.0, -72.0],
    },
    StereotaxicSpace {
        name: "WU-7112B-111",
        dimensions: [176, 208, 176],
        spacing: 1.0,
        origin: [-89.0, -125.0, -71.0],
    },
    StereotaxicSpace {
        name: "WU-7112B-222",
        dimensions: [88, 104, 88],
        spacing: 2.0,
        origin: [-89.0, -125.0, -71.0],
    },
    StereotaxicSpace {
        name: "WU-7112B-333",
        dimensions: [48, 64, 48],
        spacing: 3.0,
        origin: [-72.0, -107.0, -60.0],
    },
];

impl StereotaxicSpace {
    pub fn lookup(name: &str) -> Option<&'static StereotaxicSpace> {
        STEREOTAXIC_SPACES
            .iter()
            .find(|space| space.name.eq_ignore_ascii_case(name.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orientation_parse_and_validity() {
        let lpi = Orientation::parse("LPI").unwrap();
        assert!(lpi.is_valid());
        assert!(lpi.is_lpi());
        assert_eq!(lpi.to_string(), "LPI");

        let ras = Orientation::parse("RAS").unwrap();
        assert!(ras.is_valid());
        assert!(!ras.is_lpi());

        let doubled = Orientation::parse("LRI").unwrap();
        assert!(!doubled.is_valid());

        assert!(Orientation::parse("LPX").is_err());
        assert!(Orientation::parse("LP").is_err());
        assert!(Orientation::parse("lpi").is_err());
        assert!(Orientation::parse("Lpi").is_err());
    }

    #[test]
    fn structure_tokens_are_case_insensitive() {
        assert_eq!(Structure::parse("left"), Some(Structure::Left));
        assert_eq!(Structure::parse("CORTEX_RIGHT"), Some(Structure::Right));
        assert_eq!(Structure::parse("middle"), None);
        assert_eq!(Structure::Left.name(), "CORTEX_LEFT");
    }

    #[test]
    fn stereotaxic_lookup_ignores_case() {
        let space = StereotaxicSpace::lookup("flirt").unwrap();
        assert_eq!(space.dimensions, [182, 218, 182]);
        assert!(StereotaxicSpace::lookup("NOWHERE").is_none());
    }
}
