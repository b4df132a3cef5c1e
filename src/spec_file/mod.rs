// SPDX-License-Identifier: PMPL-1.0-or-later

//! Specification file manager
//!
//! A specification file is a per-subject manifest: a small header naming
//! the subject, then one `<tag> <path> [<secondary>]` line per data file.
//! Entries are written grouped by tag in declaration order; lines whose tag
//! is not recognised are carried through untouched after them.

use crate::error::{CommandError, CommandResult};
use crate::io::text_format::{parse_header, write_header};
use crate::io::{load_text, store_text};
use crate::model::header::FileHeader;
use crate::types::{CoordinateType, Structure, TopologyType};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const SPECIES_KEY: &str = "Species";
pub const SUBJECT_KEY: &str = "Subject";
pub const STRUCTURE_KEY: &str = "Structure";
pub const SPACE_KEY: &str = "Space";
pub const CATEGORY_KEY: &str = "Category";
pub const DATE_KEY: &str = "Date";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SpecTag {
    VolumeAnatomy,
    VolumeFunctional,
    VolumePaint,
    VolumeSegmentation,
    VolumeVector,
    ClosedTopo,
    OpenTopo,
    CutTopo,
    LobarCutTopo,
    RawCoord,
    FiducialCoord,
    InflatedCoord,
    VeryInflatedCoord,
    EllipsoidalCoord,
    SphericalCoord,
    CompressedCoord,
    FlatCoord,
    LobarFlatCoord,
    HullCoord,
    Metric,
    SurfaceShape,
    Paint,
    RgbPaint,
    ArealEstimation,
    Border,
    BorderProjection,
    Cell,
    CellProjection,
    Foci,
    FociProjection,
    Palette,
    Params,
    Scene,
    DeformationMap,
    LatLon,
    Topography,
    ProbabilisticAtlas,
    Image,
}

const TAG_NAMES: [(SpecTag, &str); 38] = [
    (SpecTag::VolumeAnatomy, "volume-anatomy-file"),
    (SpecTag::VolumeFunctional, "volume-functional-file"),
    (SpecTag::VolumePaint, "volume-paint-file"),
    (SpecTag::VolumeSegmentation, "volume-segmentation-file"),
    (SpecTag::VolumeVector, "volume-vector-file"),
    (SpecTag::ClosedTopo, "closed-topology-file"),
    (SpecTag::OpenTopo, "open-topology-file"),
    (SpecTag::CutTopo, "cut-topology-file"),
    (SpecTag::LobarCutTopo, "lobar-cut-topology-file"),
    (SpecTag::RawCoord, "raw-coord-file"),
    (SpecTag::FiducialCoord, "fiducial-coord-file"),
    (SpecTag::InflatedCoord, "inflated-coord-file"),
    (SpecTag::VeryInflatedCoord, "very-inflated-coord-file"),
    (SpecTag::EllipsoidalCoord, "ellipsoidal-coord-file"),
    (SpecTag::SphericalCoord, "spherical-coord-file"),
    (SpecTag::CompressedCoord, "compressed-coord-file"),
    (SpecTag::FlatCoord, "flat-coord-file"),
    (SpecTag::LobarFlatCoord, "lobar-flat-coord-file"),
    (SpecTag::HullCoord, "hull-coord-file"),
    (SpecTag::Metric, "metric-file"),
    (SpecTag::SurfaceShape, "surface-shape-file"),
    (SpecTag::Paint, "paint-file"),
    (SpecTag::RgbPaint, "rgb-paint-file"),
    (SpecTag::ArealEstimation, "areal-estimation-file"),
    (SpecTag::Border, "border-file"),
    (SpecTag::BorderProjection, "border-projection-file"),
    (SpecTag::Cell, "cell-file"),
    (SpecTag::CellProjection, "cell-projection-file"),
    (SpecTag::Foci, "foci-file"),
    (SpecTag::FociProjection, "foci-projection-file"),
    (SpecTag::Palette, "palette-file"),
    (SpecTag::Params, "params-file"),
    (SpecTag::Scene, "scene-file"),
    (SpecTag::DeformationMap, "deformation-map-file"),
    (SpecTag::LatLon, "lat-lon-file"),
    (SpecTag::Topography, "topography-file"),
    (SpecTag::ProbabilisticAtlas, "probabilistic-atlas-file"),
    (SpecTag::Image, "image-file"),
];

impl SpecTag {
    pub fn all() -> impl Iterator<Item = SpecTag> {
        TAG_NAMES.iter().map(|(tag, _)| *tag)
    }

    pub fn name(self) -> &'static str {
        TAG_NAMES
            .iter()
            .find(|(tag, _)| *tag == self)
            .map(|(_, name)| *name)
            .unwrap_or("")
    }

    pub fn parse(name: &str) -> Option<SpecTag> {
        TAG_NAMES
            .iter()
            .find(|(_, n)| *n == name)
            .map(|(tag, _)| *tag)
    }

    /// Tag under which a coordinate file of `coord_type` is listed.
    pub fn for_coord_type(coord_type: CoordinateType) -> Option<SpecTag> {
        Some(match coord_type {
            CoordinateType::Raw => SpecTag::RawCoord,
            CoordinateType::Fiducial => SpecTag::FiducialCoord,
            CoordinateType::Inflated => SpecTag::InflatedCoord,
            CoordinateType::VeryInflated => SpecTag::VeryInflatedCoord,
            CoordinateType::Ellipsoidal => SpecTag::EllipsoidalCoord,
            CoordinateType::Spherical => SpecTag::SphericalCoord,
            CoordinateType::Compressed => SpecTag::CompressedCoord,
            CoordinateType::Flat => SpecTag::FlatCoord,
            CoordinateType::LobarFlat => SpecTag::LobarFlatCoord,
            CoordinateType::Hull => SpecTag::HullCoord,
            CoordinateType::Unknown => return None,
        })
    }

    pub fn for_topo_type(topo_type: TopologyType) -> Option<SpecTag> {
        Some(match topo_type {
            TopologyType::Closed => SpecTag::ClosedTopo,
            TopologyType::Open => SpecTag::OpenTopo,
            TopologyType::Cut => SpecTag::CutTopo,
            TopologyType::LobarCut => SpecTag::LobarCutTopo,
            TopologyType::Unknown => return None,
        })
    }

    pub fn coord_type(self) -> Option<CoordinateType> {
        CoordinateType::ALL
            .iter()
            .copied()
            .find(|t| SpecTag::for_coord_type(*t) == Some(self))
    }

    pub fn topo_type(self) -> Option<TopologyType> {
        [
            TopologyType::Closed,
            TopologyType::Open,
            TopologyType::Cut,
            TopologyType::LobarCut,
        ]
        .into_iter()
        .find(|t| SpecTag::for_topo_type(*t) == Some(self))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecEntry {
    pub tag: SpecTag,
    pub path: String,
    pub secondary: Option<String>,
    pub selected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpecFile {
    pub header: FileHeader,
    entries: Vec<SpecEntry>,
    /// Lines with unrecognised tags, verbatim, in read order
    unknown: Vec<String>,
}

impl SpecFile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(path: &Path) -> CommandResult<SpecFile> {
        load_text(path, parse_spec)
    }

    pub fn write(&self, path: &Path) -> CommandResult<()> {
        store_text(path, self.to_text())
    }

    pub fn species(&self) -> &str {
        self.header.get(SPECIES_KEY).unwrap_or("")
    }

    pub fn subject(&self) -> &str {
        self.header.get(SUBJECT_KEY).unwrap_or("")
    }

    pub fn structure(&self) -> Structure {
        self.header
            .get(STRUCTURE_KEY)
            .and_then(Structure::parse)
            .unwrap_or(Structure::Invalid)
    }

    pub fn space(&self) -> &str {
        self.header.get(SPACE_KEY).unwrap_or("")
    }

    pub fn category(&self) -> &str {
        self.header.get(CATEGORY_KEY).unwrap_or("")
    }

    pub fn entries(&self) -> &[SpecEntry] {
        &self.entries
    }

    pub fn entries_for(&self, tag: SpecTag) -> impl Iterator<Item = &SpecEntry> {
        self.entries.iter().filter(move |e| e.tag == tag)
    }

    pub fn unknown_lines(&self) -> &[String] {
        &self.unknown
    }

    /// Insert an entry, or update the secondary path of an existing
    /// `(tag, path)` pair. Returns whether anything changed.
    pub fn add_entry(&mut self, tag: SpecTag, path: &str, secondary: Option<&str>) -> bool {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.tag == tag && e.path == path)
        {
            let secondary = secondary.map(str::to_string);
            if entry.secondary == secondary {
                return false;
            }
            entry.secondary = secondary;
            return true;
        }
        // keep tag groups in declaration order, insertion order within a tag
        let position = self
            .entries
            .iter()
            .position(|e| e.tag > tag)
            .unwrap_or(self.entries.len());
        self.entries.insert(
            position,
            SpecEntry {
                tag,
                path: path.to_string(),
                secondary: secondary.map(str::to_string),
                selected: false,
            },
        );
        true
    }

    pub fn set_all_selected(&mut self, selected: bool) {
        for entry in &mut self.entries {
            entry.selected = selected;
        }
    }

    pub fn selected(&self) -> impl Iterator<Item = &SpecEntry> {
        self.entries.iter().filter(|e| e.selected)
    }

    pub fn to_text(&self) -> String {
        let mut out = String::new();
        write_header(&self.header, &mut out);
        out.push('\n');
        for entry in &self.entries {
            match &entry.secondary {
                Some(secondary) => {
                    let _ = writeln!(out, "{} {} {}", entry.tag.name(), entry.path, secondary);
                }
                None => {
                    let _ = writeln!(out, "{} {}", entry.tag.name(), entry.path);
                }
            }
        }
        for line in &self.unknown {
            let _ = writeln!(out, "{}", line);
        }
        out
    }
}

fn parse_spec(content: &str) -> anyhow::Result<SpecFile> {
    let (header, mut body) = parse_header(content)?;
    let mut spec = SpecFile {
        header,
        ..SpecFile::default()
    };
    while !body.at_end() {
        let line = body.next_line()?;
        let mut tokens = line.split_whitespace();
        let tag = tokens.next().and_then(SpecTag::parse);
        match (tag, tokens.next()) {
            (Some(tag), Some(path)) => {
                spec.add_entry(tag, path, tokens.next());
            }
            _ => spec.unknown.push(line.to_string()),
        }
    }
    Ok(spec)
}

/// `<species>.<subject>.<structure-abbrev>.spec`
pub fn default_name(species: &str, subject: &str, structure: Structure) -> PathBuf {
    PathBuf::from(format!(
        "{}.{}.{}.spec",
        species,
        subject,
        structure.abbreviation()
    ))
}

/// Write a new specification file holding only a header.
pub fn create(
    species: &str,
    subject: &str,
    structure: Structure,
    space: &str,
    category: &str,
    path: Option<&Path>,
) -> CommandResult<PathBuf> {
    let path = path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_name(species, subject, structure));
    let mut spec = SpecFile::new();
    spec.header.set(SPECIES_KEY, species);
    spec.header.set(SUBJECT_KEY, subject);
    spec.header.set(STRUCTURE_KEY, structure.name());
    spec.header.set(SPACE_KEY, space);
    spec.header.set(CATEGORY_KEY, category);
    spec.header
        .set(DATE_KEY, chrono::Local::now().format("%Y-%m-%d").to_string());
    spec.write(&path)?;
    debug!("created specification file {}", path.display());
    Ok(path)
}

/// `file` as written in the specification at `spec_path`: relative to the
/// specification's directory when it lies beneath it.
pub fn entry_path(spec_path: &Path, file: &Path) -> String {
    let base = spec_path.parent().unwrap_or_else(|| Path::new(""));
    file.strip_prefix(base)
        .unwrap_or(file)
        .to_string_lossy()
        .into_owned()
}

/// Add `(tag, file [, secondary])` to the specification at `spec_path`,
/// creating the file when it does not exist yet.
pub fn add_entry(
    spec_path: &Path,
    tag_name: &str,
    file: &str,
    secondary: Option<&str>,
) -> CommandResult<()> {
    let tag = SpecTag::parse(tag_name).ok_or_else(|| {
        CommandError::usage(
            "Spec file tag",
            format!("\"{}\" is not a recognized specification file tag", tag_name),
        )
    })?;
    let mut spec = if spec_path.exists() {
        SpecFile::read(spec_path)?
    } else {
        SpecFile::new()
    };
    if spec.add_entry(tag, file, secondary) {
        debug!("added {} {} to {}", tag.name(), file, spec_path.display());
    }
    spec.write(spec_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_names_are_unique_and_parse_back() {
        for tag in SpecTag::all() {
            assert_eq!(SpecTag::parse(tag.name()), Some(tag));
        }
        assert_eq!(SpecTag::all().count(), 38);
        assert_eq!(SpecTag::parse("closed-topo-file"), None);
    }

    #[test]
    fn entries_are_grouped_in_declaration_order() {
        let mut spec = SpecFile::new();
        spec.add_entry(SpecTag::Metric, "a.metric", None);
        spec.add_entry(SpecTag::ClosedTopo, "b.topo", None);
        spec.add_entry(SpecTag::Metric, "c.metric", None);
        let order: Vec<_> = spec.entries().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(order, ["b.topo", "a.metric", "c.metric"]);
    }

    #[test]
    fn entry_paths_are_relative_to_the_spec_directory() {
        let spec = Path::new("subject/brain.spec");
        assert_eq!(entry_path(spec, Path::new("subject/a.nii")), "a.nii");
        assert_eq!(entry_path(spec, Path::new("other/a.nii")), "other/a.nii");
        assert_eq!(entry_path(Path::new("brain.spec"), Path::new("a.nii")), "a.nii");
    }

    #[test]
    fn duplicate_entry_is_a_no_op() {
        let mut spec = SpecFile::new();
        assert!(spec.add_entry(SpecTag::Paint, "x.paint", None));
        let once = spec.clone();
        assert!(!spec.add_entry(SpecTag::Paint, "x.paint", None));
        assert_eq!(spec, once);
    }

    #[test]
    fn unknown_lines_survive_rewrite() {
        let text = "BeginHeader\nSpecies Human\nEndHeader\n\nmystery-file m.dat\nfiducial-coord-file f.coord\n";
        let spec = parse_spec(text).unwrap();
        assert_eq!(spec.unknown_lines(), ["mystery-file m.dat"]);
        assert_eq!(
            spec.to_text(),
            "BeginHeader\nSpecies Human\nEndHeader\n\nfiducial-coord-file f.coord\nmystery-file m.dat\n"
        );
    }

    #[test]
    fn default_name_uses_structure_abbreviation() {
        assert_eq!(
            default_name("Human", "S1", Structure::Left),
            PathBuf::from("Human.S1.L.spec")
        );
    }

    #[test]
    fn add_rejects_unknown_tag() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("a.spec");
        let err = add_entry(&path, "bogus-file", "x", None).unwrap_err();
        assert!(err.is_usage());
        assert!(!path.exists());
    }

    #[test]
    fn selection_is_all_or_nothing() {
        let mut spec = SpecFile::new();
        spec.add_entry(SpecTag::Metric, "a.metric", None);
        spec.add_entry(SpecTag::Paint, "b.paint", None);
        assert_eq!(spec.selected().count(), 0);
        spec.set_all_selected(true);
        assert_eq!(spec.selected().count(), 2);
    }
}
