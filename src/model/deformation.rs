// SPDX-License-Identifier: PMPL-1.0-or-later

//! Persisted correspondence between a source and a target surface

use super::layers::ProjectionLink;
use std::path::{Path, PathBuf};

pub const CURRENT_VERSION: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum DeformationKind {
    #[value(name = "SPHERE")]
    Sphere,
    #[value(name = "FLAT")]
    Flat,
}

impl DeformationKind {
    pub fn name(self) -> &'static str {
        match self {
            DeformationKind::Sphere => "SPHERE",
            DeformationKind::Flat => "FLAT",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DeformationMap {
    pub version: u32,
    /// Absolute source directory; absent before version 2.
    pub source_directory: Option<PathBuf>,
    pub target_directory: Option<PathBuf>,
    pub source_coord: String,
    pub source_topo: String,
    pub target_coord: String,
    pub target_topo: String,
    pub source_border: String,
    pub kind: DeformationKind,
    pub deform_both_ways: bool,
    /// One link per target node into the source surface
    pub links: Vec<ProjectionLink>,
}

impl DeformationMap {
    /// Resolve a source-side file name against the stored directory, or the
    /// working directory for maps that predate stored directories.
    pub fn source_path(&self, name: &str) -> PathBuf {
        resolve(self.source_directory.as_deref(), name)
    }

    pub fn target_path(&self, name: &str) -> PathBuf {
        resolve(self.target_directory.as_deref(), name)
    }

    pub fn target_node_count(&self) -> usize {
        self.links.len()
    }

    pub fn max_source_node(&self) -> Option<usize> {
        self.links.iter().map(ProjectionLink::max_node).max()
    }
}

fn resolve(directory: Option<&Path>, name: &str) -> PathBuf {
    let candidate = Path::new(name);
    match directory {
        Some(dir) if candidate.is_relative() => dir.join(candidate),
        _ => candidate.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(version: u32, dir: Option<&str>) -> DeformationMap {
        DeformationMap {
            version,
            source_directory: dir.map(PathBuf::from),
            target_directory: None,
            source_coord: "src.coord".into(),
            source_topo: "src.topo".into(),
            target_coord: "tgt.coord".into(),
            target_topo: "tgt.topo".into(),
            source_border: String::new(),
            kind: DeformationKind::Sphere,
            deform_both_ways: false,
            links: Vec::new(),
        }
    }

    #[test]
    fn versioned_maps_resolve_against_stored_directory() {
        let m = map(2, Some("/data/source"));
        assert_eq!(m.source_path("a.metric"), PathBuf::from("/data/source/a.metric"));
        assert_eq!(m.source_path("/abs/a.metric"), PathBuf::from("/abs/a.metric"));
    }

    #[test]
    fn old_maps_use_working_directory() {
        let m = map(1, None);
        assert_eq!(m.source_path("a.metric"), PathBuf::from("a.metric"));
    }
}
