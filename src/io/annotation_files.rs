// SPDX-License-Identifier: PMPL-1.0-or-later

//! Border, cell and foci adapters with their projected forms

use super::text_format::{format_float, parse_header, write_header, TextReader};
use super::{load_text, store_text};
use crate::error::CommandResult;
use crate::model::layers::{
    Border, BorderFile, BorderProjection, BorderProjectionFile, Cell, CellFile, CellProjection,
    CellProjectionFile, ProjectionLink,
};
use anyhow::{bail, Result};
use std::fmt::Write as _;
use std::path::Path;

pub fn read_border(path: &Path) -> CommandResult<BorderFile> {
    load_text(path, parse_border)
}

pub fn write_border(borders: &BorderFile, path: &Path) -> CommandResult<()> {
    store_text(path, format_border(borders))
}

pub fn read_border_projection(path: &Path) -> CommandResult<BorderProjectionFile> {
    load_text(path, parse_border_projection)
}

pub fn write_border_projection(borders: &BorderProjectionFile, path: &Path) -> CommandResult<()> {
    store_text(path, format_border_projection(borders))
}

/// Cells and foci share one layout.
pub fn read_cells(path: &Path) -> CommandResult<CellFile> {
    load_text(path, parse_cells)
}

pub fn write_cells(cells: &CellFile, path: &Path) -> CommandResult<()> {
    store_text(path, format_cells(cells))
}

pub fn read_cell_projection(path: &Path) -> CommandResult<CellProjectionFile> {
    load_text(path, parse_cell_projection)
}

pub fn write_cell_projection(cells: &CellProjectionFile, path: &Path) -> CommandResult<()> {
    store_text(path, format_cell_projection(cells))
}

fn read_count(body: &mut TextReader<'_>, what: &str) -> Result<usize> {
    let line = body.next_line()?;
    let count: usize = body.parse(line, what)?;
    body.expect_records(count, what)
}

/// `<index> <links> <name>` heading a border block.
fn read_border_heading(body: &mut TextReader<'_>, expected: usize) -> Result<(usize, String)> {
    let line = body.next_line()?;
    let mut parts = line.splitn(3, char::is_whitespace);
    let index: usize = body.parse(parts.next().unwrap_or(""), "border number")?;
    if index != expected {
        bail!("border {} listed where border {} was expected", index, expected);
    }
    let links: usize = body.parse(parts.next().unwrap_or(""), "link count")?;
    let links = body.expect_records(links, "border links")?;
    let name = parts.next().unwrap_or("").trim().to_string();
    Ok((links, name))
}

fn read_link(body: &mut TextReader<'_>, tokens: &[&str]) -> Result<ProjectionLink> {
    Ok(ProjectionLink {
        nodes: [
            body.parse(tokens[0], "node number")?,
            body.parse(tokens[1], "node number")?,
            body.parse(tokens[2], "node number")?,
        ],
        weights: [
            body.parse(tokens[3], "weight")?,
            body.parse(tokens[4], "weight")?,
            body.parse(tokens[5], "weight")?,
        ],
    })
}

fn write_link(out: &mut String, link: &ProjectionLink) {
    let _ = write!(
        out,
        "{} {} {} {} {} {}",
        link.nodes[0],
        link.nodes[1],
        link.nodes[2],
        format_float(link.weights[0]),
        format_float(link.weights[1]),
        format_float(link.weights[2])
    );
}

fn parse_border(content: &str) -> Result<BorderFile> {
    let (header, mut body) = parse_header(content)?;
    let count = read_count(&mut body, "border count")?;
    let mut borders = Vec::with_capacity(count);
    for b in 0..count {
        let (links, name) = read_border_heading(&mut body, b)?;
        let mut points = Vec::with_capacity(links);
        for _ in 0..links {
            let tokens = body.next_tokens()?;
            body.expect_tokens(&tokens, 4, "a border link")?;
            points.push([
                body.parse(tokens[1], "x coordinate")?,
                body.parse(tokens[2], "y coordinate")?,
                body.parse(tokens[3], "z coordinate")?,
            ]);
        }
        borders.push(Border { name, points });
    }
    Ok(BorderFile { header, borders })
}

fn format_border(file: &BorderFile) -> String {
    let mut out = String::new();
    write_header(&file.header, &mut out);
    let _ = writeln!(out, "{}", file.borders.len());
    for (b, border) in file.borders.iter().enumerate() {
        let _ = writeln!(out, "{} {} {}", b, border.points.len(), border.name);
        for (l, p) in border.points.iter().enumerate() {
            let _ = writeln!(
                out,
                "{} {} {} {}",
                l,
                format_float(p[0]),
                format_float(p[1]),
                format_float(p[2])
            );
        }
    }
    out
}

fn parse_border_projection(content: &str) -> Result<BorderProjectionFile> {
    let (header, mut body) = parse_header(content)?;
    let count = read_count(&mut body, "border count")?;
    let mut borders = Vec::with_capacity(count);
    for b in 0..count {
        let (link_count, name) = read_border_heading(&mut body, b)?;
        let mut links = Vec::with_capacity(link_count);
        for _ in 0..link_count {
            let tokens = body.next_tokens()?;
            body.expect_tokens(&tokens, 6, "a border projection link")?;
            links.push(read_link(&mut body, &tokens)?);
        }
        borders.push(BorderProjection { name, links });
    }
    Ok(BorderProjectionFile { header, borders })
}

fn format_border_projection(file: &BorderProjectionFile) -> String {
    let mut out = String::new();
    write_header(&file.header, &mut out);
    let _ = writeln!(out, "{}", file.borders.len());
    for (b, border) in file.borders.iter().enumerate() {
        let _ = writeln!(out, "{} {} {}", b, border.links.len(), border.name);
        for link in &border.links {
            write_link(&mut out, link);
            out.push('\n');
        }
    }
    out
}

fn parse_cells(content: &str) -> Result<CellFile> {
    let (header, mut body) = parse_header(content)?;
    let count = read_count(&mut body, "cell count")?;
    let mut cells = Vec::with_capacity(count);
    for c in 0..count {
        let line = body.next_line()?;
        let tokens: Vec<&str> = line.splitn(5, char::is_whitespace).collect();
        body.expect_tokens(&tokens, 4, "a cell")?;
        let index: usize = body.parse(tokens[0], "cell number")?;
        if index != c {
            bail!("cell {} listed where cell {} was expected", index, c);
        }
        cells.push(Cell {
            xyz: [
                body.parse(tokens[1], "x coordinate")?,
                body.parse(tokens[2], "y coordinate")?,
                body.parse(tokens[3], "z coordinate")?,
            ],
            name: tokens.get(4).map(|n| n.trim().to_string()).unwrap_or_default(),
        });
    }
    Ok(CellFile { header, cells })
}

fn format_cells(file: &CellFile) -> String {
    let mut out = String::new();
    write_header(&file.header, &mut out);
    let _ = writeln!(out, "{}", file.cells.len());
    for (i, cell) in file.cells.iter().enumerate() {
        let _ = writeln!(
            out,
            "{} {} {} {} {}",
            i,
            format_float(cell.xyz[0]),
            format_float(cell.xyz[1]),
            format_float(cell.xyz[2]),
            cell.name
        );
    }
    out
}

fn parse_cell_projection(content: &str) -> Result<CellProjectionFile> {
    let (header, mut body) = parse_header(content)?;
    let count = read_count(&mut body, "cell count")?;
    let mut projections = Vec::with_capacity(count);
    for c in 0..count {
        let line = body.next_line()?;
        let tokens: Vec<&str> = line.splitn(9, char::is_whitespace).collect();
        body.expect_tokens(&tokens, 8, "a cell projection")?;
        let index: usize = body.parse(tokens[0], "cell number")?;
        if index != c {
            bail!("cell {} listed where cell {} was expected", index, c);
        }
        projections.push(CellProjection {
            link: read_link(&mut body, &tokens[1..7])?,
            offset: body.parse(tokens[7], "offset")?,
            name: tokens.get(8).map(|n| n.trim().to_string()).unwrap_or_default(),
        });
    }
    Ok(CellProjectionFile {
        header,
        projections,
    })
}

fn format_cell_projection(file: &CellProjectionFile) -> String {
    let mut out = String::new();
    write_header(&file.header, &mut out);
    let _ = writeln!(out, "{}", file.projections.len());
    for (i, cell) in file.projections.iter().enumerate() {
        let _ = write!(out, "{} ", i);
        write_link(&mut out, &cell.link);
        let _ = writeln!(out, " {} {}", format_float(cell.offset), cell.name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn border_names_may_contain_spaces() {
        let text = "1\n0 2 CENTRAL SULCUS\n0 1 2 3\n1 4 5 6\n";
        let file = parse_border(text).unwrap();
        assert_eq!(file.borders[0].name, "CENTRAL SULCUS");
        assert_eq!(file.borders[0].points[1], [4.0, 5.0, 6.0]);
    }

    #[test]
    fn border_projection_text_is_reproduced() {
        let text = "BeginHeader\nEndHeader\n1\n0 1 LANDMARK\n3 4 5 0.5 0.25 0.25\n";
        let file = parse_border_projection(text).unwrap();
        assert_eq!(file.max_node(), Some(5));
        assert_eq!(format_border_projection(&file), text);
    }

    #[test]
    fn cell_projection_reads_offset_and_name() {
        let text = "1\n0 1 2 3 0.2 0.3 0.5 -1.5 V1 focus\n";
        let file = parse_cell_projection(text).unwrap();
        let cell = &file.projections[0];
        assert_eq!(cell.link.nodes, [1, 2, 3]);
        assert_eq!(cell.offset, -1.5);
        assert_eq!(cell.name, "V1 focus");
    }

    #[test]
    fn missing_cell_line_is_an_error() {
        assert!(parse_cells("2\n0 1 2 3 a\n").is_err());
    }

    #[test]
    fn declared_link_count_must_fit_in_the_file() {
        let err = parse_border("1\n0 99999999999 frontal\n0 1 2 3\n").unwrap_err();
        assert!(err.to_string().contains("99999999999 border links declared"));
        assert!(parse_cell_projection("88888888888\n").is_err());
    }
}
