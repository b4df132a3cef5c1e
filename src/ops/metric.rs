// SPDX-License-Identifier: PMPL-1.0-or-later

//! Metric and paint file operations

use super::{kernel, Operation};
use crate::args::ArgCursor;
use crate::error::{CommandError, CommandResult};
use crate::io;
use crate::kernels::surface::smooth_metric;
use crate::model::layers::MetricFile;
use crate::model::BrainSet;
use std::path::PathBuf;

pub(super) const OPERATIONS: &[Operation] = &[
    Operation {
        flag: "-metric-info",
        title: "METRIC INFORMATION",
        params: &["<metric-file>"],
        description: "Print the node count and, per column, its name and range.",
        needs_gui: false,
        execute: metric_info,
    },
    Operation {
        flag: "-metric-composite",
        title: "METRIC COMPOSITE",
        params: &["<output-metric-file>", "<input-metric-file> [input-metric-file...]"],
        description: "Concatenate the columns of the input metric files, which\n\
                      must have the same number of nodes.",
        needs_gui: false,
        execute: composite,
    },
    Operation {
        flag: "-metric-set-column-name",
        title: "METRIC SET COLUMN NAME",
        params: &["<metric-file>", "<column-number>", "<column-name>"],
        description: "Rename a column; column numbers start at 1.",
        needs_gui: false,
        execute: metric_set_column_name,
    },
    Operation {
        flag: "-metric-smoothing",
        title: "METRIC SMOOTHING",
        params: &[
            "<coord-file>",
            "<topo-file>",
            "<input-metric-file>",
            "<output-metric-file>",
            "<column-number>",
            "<strength>",
            "<iterations>",
        ],
        description: "Average a column's values with their surface neighbours.\n\
                      The smoothed column replaces the original in the output.",
        needs_gui: false,
        execute: metric_smoothing,
    },
    Operation {
        flag: "-paint-info",
        title: "PAINT INFORMATION",
        params: &["<paint-file>"],
        description: "Print the node count, the column names and the number of\n\
                      nodes carrying each label.",
        needs_gui: false,
        execute: paint_info,
    },
    Operation {
        flag: "-paint-set-column-name",
        title: "PAINT SET COLUMN NAME",
        params: &["<paint-file>", "<column-number>", "<column-name>"],
        description: "Rename a column; column numbers start at 1.",
        needs_gui: false,
        execute: paint_set_column_name,
    },
    Operation {
        flag: "-paint-rename-label",
        title: "PAINT RENAME LABEL",
        params: &["<paint-file>", "<old-label-name>", "<new-label-name>"],
        description: "Change the name of a label in the label table.",
        needs_gui: false,
        execute: rename_label,
    },
];

fn column_range(values: &[f32]) -> (f32, f32) {
    values
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        })
}

fn metric_info(args: &mut ArgCursor) -> CommandResult<()> {
    let path = args.next_filename("Metric file")?;
    args.finish()?;
    let metric = io::read_metric(&path)?;
    println!("nodes: {}", metric.node_count);
    println!("columns: {}", metric.column_count());
    for (n, (name, values)) in metric.column_names.iter().zip(&metric.columns).enumerate() {
        let (lo, hi) = if values.is_empty() {
            (0.0, 0.0)
        } else {
            column_range(values)
        };
        println!("{:>4} {:<30} {} {}", n + 1, name, lo, hi);
    }
    Ok(())
}

fn composite(args: &mut ArgCursor) -> CommandResult<()> {
    let output = args.next_filename("Output metric file")?;
    let inputs: Vec<PathBuf> = args.next_rest().into_iter().map(PathBuf::from).collect();
    if inputs.is_empty() {
        return Err(CommandError::usage("Input metric file", "missing"));
    }
    let mut result = MetricFile::default();
    for path in &inputs {
        let metric = io::read_metric(path)?;
        if result.column_count() > 0 && metric.node_count != result.node_count {
            return Err(CommandError::domain(
                format!("{} nodes in {}", result.node_count, path.display()),
                format!("{} nodes", metric.node_count),
            ));
        }
        if result.column_count() == 0 {
            result.header = metric.header.clone();
        }
        result.append(&metric)?;
    }
    io::write_metric(&result, &output)
}

fn metric_set_column_name(args: &mut ArgCursor) -> CommandResult<()> {
    let path = args.next_filename("Metric file")?;
    let column = args.next_column("Column number")?;
    let name = args.next_string("Column name")?;
    args.finish()?;
    let mut metric = io::read_metric(&path)?;
    metric.set_column_name(column, &name)?;
    io::write_metric(&metric, &path)
}

fn metric_smoothing(args: &mut ArgCursor) -> CommandResult<()> {
    let coord = args.next_filename("Coordinate file")?;
    let topo = args.next_filename("Topology file")?;
    let input = args.next_filename("Input metric file")?;
    let output = args.next_filename("Output metric file")?;
    let column = args.next_column("Column number")?;
    let strength = args.next_float("Strength")?;
    let iterations = args.next_count("Iterations")?;
    args.finish()?;

    let mut set = BrainSet::from_topo_coord(&topo, &coord)?;
    let mut metric = set.load_metric(&input)?.clone();
    let surface = set.surface(0)?;
    let smoothed = kernel(
        "Metric Smoothing",
        smooth_metric(surface, metric.column(column)?, strength, iterations),
    )?;
    metric.columns[column] = smoothed;
    io::write_metric(&metric, &output)
}

fn paint_info(args: &mut ArgCursor) -> CommandResult<()> {
    let path = args.next_filename("Paint file")?;
    args.finish()?;
    let paint = io::read_paint(&path)?;
    println!("nodes: {}", paint.node_count);
    println!("columns: {}", paint.column_count());
    for (n, name) in paint.column_names.iter().enumerate() {
        println!("{:>4} {}", n + 1, name);
    }
    println!("labels: {}", paint.label_names.len());
    for (name, count) in paint.label_names.iter().zip(paint.label_counts()) {
        println!("     {:<30} {}", name, count);
    }
    Ok(())
}

fn paint_set_column_name(args: &mut ArgCursor) -> CommandResult<()> {
    let path = args.next_filename("Paint file")?;
    let column = args.next_column("Column number")?;
    let name = args.next_string("Column name")?;
    args.finish()?;
    let mut paint = io::read_paint(&path)?;
    paint.set_column_name(column, &name)?;
    io::write_paint(&paint, &path)
}

fn rename_label(args: &mut ArgCursor) -> CommandResult<()> {
    let path = args.next_filename("Paint file")?;
    let old = args.next_string("Old label name")?;
    let new = args.next_string("New label name")?;
    args.finish()?;
    let mut paint = io::read_paint(&path)?;
    let slot = paint
        .label_names
        .iter_mut()
        .find(|name| **name == old)
        .ok_or_else(|| {
            CommandError::domain(
                format!("label \"{}\" in {}", old, path.display()),
                "no such label",
            )
        })?;
    *slot = new;
    io::write_paint(&paint, &path)
}
