// SPDX-License-Identifier: PMPL-1.0-or-later

//! Deformation map adapter

use super::text_format::{format_float, TextReader};
use super::{load_text, store_text};
use crate::error::CommandResult;
use crate::model::deformation::{DeformationKind, DeformationMap};
use crate::model::layers::ProjectionLink;
use anyhow::{anyhow, bail, Result};
use clap::ValueEnum;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

const VERSION_TAG: &str = "deform-map-file-version";
const SOURCE_DIR_TAG: &str = "source-directory";
const TARGET_DIR_TAG: &str = "target-directory";
const SOURCE_COORD_TAG: &str = "source-coord-file";
const SOURCE_TOPO_TAG: &str = "source-topo-file";
const TARGET_COORD_TAG: &str = "target-coord-file";
const TARGET_TOPO_TAG: &str = "target-topo-file";
const SOURCE_BORDER_TAG: &str = "source-border-file";
const KIND_TAG: &str = "flat-or-sphere";
const BOTH_WAYS_TAG: &str = "deform-both-ways";
const NODES_TAG: &str = "number-of-nodes";

pub fn read_deformation_map(path: &Path) -> CommandResult<DeformationMap> {
    load_text(path, parse_deformation_map)
}

pub fn write_deformation_map(map: &DeformationMap, path: &Path) -> CommandResult<()> {
    store_text(path, format_deformation_map(map))
}

fn parse_deformation_map(content: &str) -> Result<DeformationMap> {
    let mut body = TextReader::new(content);
    let version_text = body.expect_tag(VERSION_TAG)?;
    let version: u32 = body.parse(version_text, "file version")?;

    let (source_directory, target_directory) = if version >= 2 {
        let source = PathBuf::from(body.expect_tag(SOURCE_DIR_TAG)?);
        let target = PathBuf::from(body.expect_tag(TARGET_DIR_TAG)?);
        (Some(source), Some(target))
    } else {
        (None, None)
    };

    let source_coord = body.expect_tag(SOURCE_COORD_TAG)?.to_string();
    let source_topo = body.expect_tag(SOURCE_TOPO_TAG)?.to_string();
    let target_coord = body.expect_tag(TARGET_COORD_TAG)?.to_string();
    let target_topo = body.expect_tag(TARGET_TOPO_TAG)?.to_string();
    let source_border = body.expect_tag(SOURCE_BORDER_TAG)?.to_string();
    let kind_text = body.expect_tag(KIND_TAG)?;
    let kind = DeformationKind::from_str(kind_text, true)
        .map_err(|_| anyhow!("invalid deformation kind \"{}\"", kind_text))?;
    let both_text = body.expect_tag(BOTH_WAYS_TAG)?;
    let deform_both_ways = match both_text {
        "true" => true,
        "false" => false,
        other => bail!("invalid {} value \"{}\"", BOTH_WAYS_TAG, other),
    };
    let nodes_text = body.expect_tag(NODES_TAG)?;
    let node_count: usize = body.parse(nodes_text, "node count")?;
    let node_count = body.expect_records(node_count, "nodes")?;

    let mut links = Vec::with_capacity(node_count);
    for node in 0..node_count {
        let tokens = body.next_tokens()?;
        body.expect_tokens(&tokens, 7, "a deformation link")?;
        let index: usize = body.parse(tokens[0], "node number")?;
        if index != node {
            bail!("node {} listed where node {} was expected", index, node);
        }
        links.push(ProjectionLink {
            nodes: [
                body.parse(tokens[1], "node number")?,
                body.parse(tokens[2], "node number")?,
                body.parse(tokens[3], "node number")?,
            ],
            weights: [
                body.parse(tokens[4], "weight")?,
                body.parse(tokens[5], "weight")?,
                body.parse(tokens[6], "weight")?,
            ],
        });
    }

    Ok(DeformationMap {
        version,
        source_directory,
        target_directory,
        source_coord,
        source_topo,
        target_coord,
        target_topo,
        source_border,
        kind,
        deform_both_ways,
        links,
    })
}

fn format_deformation_map(map: &DeformationMap) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} {}", VERSION_TAG, map.version);
    if map.version >= 2 {
        let dir = |d: &Option<PathBuf>| d.as_ref().map(|p| p.display().to_string()).unwrap_or_default();
        let _ = writeln!(out, "{} {}", SOURCE_DIR_TAG, dir(&map.source_directory));
        let _ = writeln!(out, "{} {}", TARGET_DIR_TAG, dir(&map.target_directory));
    }
    let _ = writeln!(out, "{} {}", SOURCE_COORD_TAG, map.source_coord);
    let _ = writeln!(out, "{} {}", SOURCE_TOPO_TAG, map.source_topo);
    let _ = writeln!(out, "{} {}", TARGET_COORD_TAG, map.target_coord);
    let _ = writeln!(out, "{} {}", TARGET_TOPO_TAG, map.target_topo);
    let _ = writeln!(out, "{} {}", SOURCE_BORDER_TAG, map.source_border);
    let _ = writeln!(out, "{} {}", KIND_TAG, map.kind.name());
    let _ = writeln!(out, "{} {}", BOTH_WAYS_TAG, map.deform_both_ways);
    let _ = writeln!(out, "{} {}", NODES_TAG, map.links.len());
    for (node, link) in map.links.iter().enumerate() {
        let _ = writeln!(
            out,
            "{} {} {} {} {} {} {}",
            node,
            link.nodes[0],
            link.nodes[1],
            link.nodes[2],
            format_float(link.weights[0]),
            format_float(link.weights[1]),
            format_float(link.weights[2])
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const V2: &str = "deform-map-file-version 2\nsource-directory /data/atlas\ntarget-directory /data/subject\nsource-coord-file atlas.sphere.coord\nsource-topo-file atlas.closed.topo\ntarget-coord-file subj.sphere.coord\ntarget-topo-file subj.closed.topo\nsource-border-file \nflat-or-sphere SPHERE\ndeform-both-ways false\nnumber-of-nodes 1\n0 3 4 5 0.5 0.25 0.25\n";

    #[test]
    fn version_two_carries_directories() {
        let map = parse_deformation_map(V2).unwrap();
        assert_eq!(map.source_directory, Some(PathBuf::from("/data/atlas")));
        assert_eq!(map.source_border, "");
        assert_eq!(map.links[0].nodes, [3, 4, 5]);
        assert_eq!(format_deformation_map(&map), V2);
    }

    #[test]
    fn version_one_has_no_directories() {
        let v1 = "deform-map-file-version 1\nsource-coord-file a.coord\nsource-topo-file a.topo\ntarget-coord-file b.coord\ntarget-topo-file b.topo\nsource-border-file\nflat-or-sphere FLAT\ndeform-both-ways true\nnumber-of-nodes 0\n";
        let map = parse_deformation_map(v1).unwrap();
        assert_eq!(map.source_directory, None);
        assert_eq!(map.kind, DeformationKind::Flat);
        assert!(map.deform_both_ways);
    }

    #[test]
    fn node_count_beyond_the_body_is_an_error() {
        let text = V2.replace("number-of-nodes 1", "number-of-nodes 7000000000000");
        assert!(parse_deformation_map(&text).is_err());
    }
}
