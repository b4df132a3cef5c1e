// SPDX-License-Identifier: PMPL-1.0-or-later

//! Metric, surface-shape and paint file adapters

use super::text_format::{format_float, parse_header, write_header, TextReader};
use super::{load_text, store_text};
use crate::error::CommandResult;
use crate::model::header::FileHeader;
use crate::model::layers::{MetricFile, PaintFile};
use anyhow::{bail, Result};
use std::fmt::Write as _;
use std::path::Path;

const TAG_NODES: &str = "tag-number-of-nodes";
const TAG_COLUMNS: &str = "tag-number-of-columns";
const TAG_PAINT_NAMES: &str = "tag-number-of-paint-names";
const TAG_COLUMN_NAME: &str = "tag-column-name";
const TAG_BEGIN_DATA: &str = "tag-BEGIN-DATA";

pub fn read_metric(path: &Path) -> CommandResult<MetricFile> {
    load_text(path, parse_metric)
}

pub fn write_metric(metric: &MetricFile, path: &Path) -> CommandResult<()> {
    store_text(path, format_metric(metric))
}

/// Surface-shape files share the metric layout.
pub fn read_surface_shape(path: &Path) -> CommandResult<MetricFile> {
    read_metric(path)
}

pub fn write_surface_shape(shape: &MetricFile, path: &Path) -> CommandResult<()> {
    write_metric(shape, path)
}

pub fn read_paint(path: &Path) -> CommandResult<PaintFile> {
    load_text(path, parse_paint)
}

pub fn write_paint(paint: &PaintFile, path: &Path) -> CommandResult<()> {
    store_text(path, format_paint(paint))
}

fn read_counts(body: &mut TextReader<'_>) -> Result<(usize, usize)> {
    let nodes_text = body.expect_tag(TAG_NODES)?;
    let nodes: usize = body.parse(nodes_text, "node count")?;
    let nodes = body.expect_records(nodes, "nodes")?;
    let columns_text = body.expect_tag(TAG_COLUMNS)?;
    let columns: usize = body.parse(columns_text, "column count")?;
    let columns = body.expect_fields(columns, "columns")?;
    Ok((nodes, columns))
}

/// `tag-column-name` lines up to `tag-BEGIN-DATA`.
fn read_column_names(body: &mut TextReader<'_>, columns: usize) -> Result<Vec<String>> {
    let mut names: Vec<String> = (0..columns).map(|c| format!("column {}", c + 1)).collect();
    loop {
        let line = body.next_line()?;
        if line == TAG_BEGIN_DATA {
            return Ok(names);
        }
        let Some(rest) = line.strip_prefix(TAG_COLUMN_NAME) else {
            bail!("unexpected line before {}: \"{}\"", TAG_BEGIN_DATA, line);
        };
        let rest = rest.trim();
        let (index_text, name) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        let index: usize = body.parse(index_text, "column index")?;
        if index >= columns {
            bail!("column name given for column {} of {}", index, columns);
        }
        names[index] = name.trim().to_string();
    }
}

fn parse_metric(content: &str) -> Result<MetricFile> {
    let (header, mut body) = parse_header(content)?;
    let (nodes, columns) = read_counts(&mut body)?;
    let column_names = read_column_names(&mut body, columns)?;
    body.expect_fields(nodes.saturating_mul(columns), "values")?;
    let mut data = vec![Vec::with_capacity(nodes); columns];
    for node in 0..nodes {
        let tokens = body.next_tokens()?;
        body.expect_tokens(&tokens, columns + 1, "a metric row")?;
        let index: usize = body.parse(tokens[0], "node number")?;
        if index != node {
            bail!("node {} listed where node {} was expected", index, node);
        }
        for (c, column) in data.iter_mut().enumerate() {
            column.push(body.parse(tokens[c + 1], "metric value")?);
        }
    }
    Ok(MetricFile {
        header,
        node_count: nodes,
        column_names,
        columns: data,
    })
}

fn write_common(
    out: &mut String,
    header: &FileHeader,
    nodes: usize,
    names: &[String],
) {
    write_header(header, out);
    let _ = writeln!(out, "{} {}", TAG_NODES, nodes);
    let _ = writeln!(out, "{} {}", TAG_COLUMNS, names.len());
    for (i, name) in names.iter().enumerate() {
        let _ = writeln!(out, "{} {} {}", TAG_COLUMN_NAME, i, name);
    }
}

fn format_metric(metric: &MetricFile) -> String {
    let mut out = String::new();
    write_common(&mut out, &metric.header, metric.node_count, &metric.column_names);
    out.push_str(TAG_BEGIN_DATA);
    out.push('\n');
    for node in 0..metric.node_count {
        let _ = write!(out, "{}", node);
        for column in &metric.columns {
            let _ = write!(out, " {}", format_float(column[node]));
        }
        out.push('\n');
    }
    out
}

fn parse_paint(content: &str) -> Result<PaintFile> {
    let (header, mut body) = parse_header(content)?;
    let (nodes, columns) = read_counts(&mut body)?;
    let names_text = body.expect_tag(TAG_PAINT_NAMES)?;
    let name_count: usize = body.parse(names_text, "paint name count")?;
    let name_count = body.expect_records(name_count, "paint names")?;
    let column_names = read_column_names(&mut body, columns)?;
    let mut label_names = Vec::with_capacity(name_count);
    for _ in 0..name_count {
        label_names.push(body.next_line()?.to_string());
    }
    body.expect_fields(nodes.saturating_mul(columns), "values")?;
    let mut data = vec![Vec::with_capacity(nodes); columns];
    for node in 0..nodes {
        let tokens = body.next_tokens()?;
        body.expect_tokens(&tokens, columns + 1, "a paint row")?;
        let index: usize = body.parse(tokens[0], "node number")?;
        if index != node {
            bail!("node {} listed where node {} was expected", index, node);
        }
        for (c, column) in data.iter_mut().enumerate() {
            let value: u32 = body.parse(tokens[c + 1], "paint index")?;
            if value as usize >= name_count {
                bail!("node {} uses paint index {} of {}", node, value, name_count);
            }
            column.push(value);
        }
    }
    Ok(PaintFile {
        header,
        node_count: nodes,
        column_names,
        label_names,
        columns: data,
    })
}

fn format_paint(paint: &PaintFile) -> String {
    let mut out = String::new();
    write_header(&paint.header, &mut out);
    let _ = writeln!(out, "{} {}", TAG_NODES, paint.node_count);
    let _ = writeln!(out, "{} {}", TAG_COLUMNS, paint.column_names.len());
    let _ = writeln!(out, "{} {}", TAG_PAINT_NAMES, paint.label_names.len());
    for (i, name) in paint.column_names.iter().enumerate() {
        let _ = writeln!(out, "{} {} {}", TAG_COLUMN_NAME, i, name);
    }
    out.push_str(TAG_BEGIN_DATA);
    out.push('\n');
    for name in &paint.label_names {
        let _ = writeln!(out, "{}", name);
    }
    for node in 0..paint.node_count {
        let _ = write!(out, "{}", node);
        for column in &paint.columns {
            let _ = write!(out, " {}", column[node]);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const METRIC: &str = "BeginHeader\ncomment thickness\nEndHeader\ntag-number-of-nodes 2\ntag-number-of-columns 2\ntag-column-name 0 thickness\ntag-column-name 1 depth\ntag-BEGIN-DATA\n0 1.5 2\n1 -0.5 0\n";

    #[test]
    fn metric_text_is_reproduced() {
        let metric = parse_metric(METRIC).unwrap();
        assert_eq!(metric.node_count, 2);
        assert_eq!(metric.column_names, ["thickness", "depth"]);
        assert_eq!(metric.columns[1], [2.0, 0.0]);
        assert_eq!(format_metric(&metric), METRIC);
    }

    #[test]
    fn metric_short_row_is_an_error() {
        let text = "tag-number-of-nodes 1\ntag-number-of-columns 2\ntag-BEGIN-DATA\n0 1\n";
        assert!(parse_metric(text).is_err());
    }

    #[test]
    fn paint_indices_must_reference_names() {
        let good = "tag-number-of-nodes 2\ntag-number-of-columns 1\ntag-number-of-paint-names 2\ntag-column-name 0 lobes\ntag-BEGIN-DATA\n???\nFRONTAL\n0 1\n1 0\n";
        let paint = parse_paint(good).unwrap();
        assert_eq!(paint.label_name(paint.columns[0][0]), "FRONTAL");
        assert_eq!(format_paint(&paint), good);

        let bad = good.replace("0 1\n1 0", "0 1\n1 7");
        assert!(parse_paint(&bad).is_err());
    }

    #[test]
    fn oversized_counts_fail_before_allocating() {
        let nodes = METRIC.replace("tag-number-of-nodes 2", "tag-number-of-nodes 200000000000000");
        let message = parse_metric(&nodes).unwrap_err().to_string();
        assert!(message.contains("200000000000000 nodes declared"), "{message}");

        let columns = METRIC.replace("tag-number-of-columns 2", "tag-number-of-columns 90000000000000");
        assert!(parse_metric(&columns).is_err());

        let names = "tag-number-of-nodes 0\ntag-number-of-columns 1\ntag-number-of-paint-names 5000000000000\ntag-BEGIN-DATA\n";
        assert!(parse_paint(names).is_err());
    }

    #[test]
    fn wide_rows_times_many_nodes_are_bounded_by_the_text() {
        let text = "tag-number-of-nodes 3\ntag-number-of-columns 8\ntag-BEGIN-DATA\n0\n1\n2\n";
        let message = parse_metric(text).unwrap_err().to_string();
        assert!(message.contains("24 values declared"), "{message}");
    }
}
