// SPDX-License-Identifier: PMPL-1.0-or-later

//! Coordinate and topology file adapters

use super::text_format::{format_float, parse_header, write_header};
use super::{load_text, store_text};
use crate::error::CommandResult;
use crate::model::surface::{CoordinateFile, TopologyFile};
use anyhow::{bail, Result};
use std::fmt::Write as _;
use std::path::Path;

pub fn read_coord(path: &Path) -> CommandResult<CoordinateFile> {
    load_text(path, parse_coord)
}

pub fn write_coord(coords: &CoordinateFile, path: &Path) -> CommandResult<()> {
    store_text(path, format_coord(coords))
}

pub fn read_topo(path: &Path) -> CommandResult<TopologyFile> {
    load_text(path, parse_topo)
}

pub fn write_topo(topo: &TopologyFile, path: &Path) -> CommandResult<()> {
    store_text(path, format_topo(topo))
}

fn parse_coord(content: &str) -> Result<CoordinateFile> {
    let (header, mut body) = parse_header(content)?;
    let count_line = body.next_line()?;
    let count: usize = body.parse(count_line, "node count")?;
    let count = body.expect_records(count, "nodes")?;
    let mut points = Vec::with_capacity(count);
    for expected in 0..count {
        let tokens = body.next_tokens()?;
        body.expect_tokens(&tokens, 4, "a coordinate")?;
        let index: usize = body.parse(tokens[0], "node number")?;
        if index != expected {
            bail!("node {} listed where node {} was expected", index, expected);
        }
        points.push([
            body.parse(tokens[1], "x coordinate")?,
            body.parse(tokens[2], "y coordinate")?,
            body.parse(tokens[3], "z coordinate")?,
        ]);
    }
    Ok(CoordinateFile { header, points })
}

fn format_coord(coords: &CoordinateFile) -> String {
    let mut out = String::new();
    write_header(&coords.header, &mut out);
    let _ = writeln!(out, "{}", coords.points.len());
    for (i, p) in coords.points.iter().enumerate() {
        let _ = writeln!(
            out,
            "{} {} {} {}",
            i,
            format_float(p[0]),
            format_float(p[1]),
            format_float(p[2])
        );
    }
    out
}

fn parse_topo(content: &str) -> Result<TopologyFile> {
    let (header, mut body) = parse_header(content)?;
    let count_line = body.next_line()?;
    let count: usize = body.parse(count_line, "tile count")?;
    let count = body.expect_records(count, "tiles")?;
    let mut triangles = Vec::with_capacity(count);
    for _ in 0..count {
        let tokens = body.next_tokens()?;
        body.expect_tokens(&tokens, 3, "a tile")?;
        triangles.push([
            body.parse(tokens[0], "node number")?,
            body.parse(tokens[1], "node number")?,
            body.parse(tokens[2], "node number")?,
        ]);
    }
    Ok(TopologyFile { header, triangles })
}

fn format_topo(topo: &TopologyFile) -> String {
    let mut out = String::new();
    write_header(&topo.header, &mut out);
    let _ = writeln!(out, "{}", topo.triangles.len());
    for t in &topo.triangles {
        let _ = writeln!(out, "{} {} {}", t[0], t[1], t[2]);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CoordinateType;

    #[test]
    fn coord_text_preserves_header_and_points() {
        let text = "BeginHeader\nconfiguration_id INFLATED\ncaret-version 5.6\nEndHeader\n2\n0 1.5 -2 3\n1 0 0 0.25\n";
        let coords = parse_coord(text).unwrap();
        assert_eq!(coords.coord_type(), CoordinateType::Inflated);
        assert_eq!(coords.points[0], [1.5, -2.0, 3.0]);
        assert_eq!(format_coord(&coords), text);
    }

    #[test]
    fn coord_node_numbers_must_be_sequential() {
        assert!(parse_coord("2\n0 0 0 0\n5 0 0 0\n").is_err());
    }

    #[test]
    fn topo_short_body_is_an_error() {
        let err = parse_topo("2\n0 1 2\n").unwrap_err();
        assert!(err.to_string().contains("2 tiles declared but only 1 lines remain"));
    }

    #[test]
    fn huge_node_count_is_rejected_against_the_body() {
        let err = parse_coord("200000000000000\n0 0 0 0\n").unwrap_err();
        assert!(err.to_string().contains("200000000000000 nodes declared"));
    }
}
