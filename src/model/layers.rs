// SPDX-License-Identifier: PMPL-1.0-or-later

//! Per-node attribute layers and surface annotations

use super::geometry::Vec3;
use super::header::FileHeader;
use crate::error::{CommandError, CommandResult};

/// Scalar columns per node; used for both metric and surface-shape files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricFile {
    pub header: FileHeader,
    pub node_count: usize,
    pub column_names: Vec<String>,
    /// `columns[c][node]`
    pub columns: Vec<Vec<f32>>,
}

impl MetricFile {
    pub fn new(node_count: usize) -> Self {
        Self {
            node_count,
            ..Default::default()
        }
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> CommandResult<&[f32]> {
        self.columns.get(index).map(Vec::as_slice).ok_or_else(|| {
            CommandError::domain(
                format!("column number between 1 and {}", self.column_count()),
                format!("column {} requested", index + 1),
            )
        })
    }

    pub fn add_column(&mut self, name: impl Into<String>, values: Vec<f32>) -> CommandResult<()> {
        if values.len() != self.node_count {
            return Err(CommandError::domain(
                format!("{} values for column", self.node_count),
                format!("{} values supplied", values.len()),
            ));
        }
        self.column_names.push(name.into());
        self.columns.push(values);
        Ok(())
    }

    pub fn set_column_name(&mut self, index: usize, name: &str) -> CommandResult<()> {
        self.column(index)?;
        self.column_names[index] = name.to_string();
        Ok(())
    }

    /// Append every column of `other`, which must cover the same nodes.
    pub fn append(&mut self, other: &MetricFile) -> CommandResult<()> {
        if self.column_count() == 0 && self.node_count == 0 {
            self.node_count = other.node_count;
        }
        for (name, values) in other.column_names.iter().zip(&other.columns) {
            self.add_column(name.clone(), values.clone())?;
        }
        Ok(())
    }

    /// Per-node values across all columns (the subjects of a statistical test).
    pub fn node_values(&self, node: usize) -> Vec<f32> {
        self.columns.iter().map(|c| c[node]).collect()
    }
}

/// Categorical labels per node
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaintFile {
    pub header: FileHeader,
    pub node_count: usize,
    pub column_names: Vec<String>,
    pub label_names: Vec<String>,
    /// `columns[c][node]` indexes `label_names`
    pub columns: Vec<Vec<u32>>,
}

impl PaintFile {
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> CommandResult<&[u32]> {
        self.columns.get(index).map(Vec::as_slice).ok_or_else(|| {
            CommandError::domain(
                format!("column number between 1 and {}", self.column_count()),
                format!("column {} requested", index + 1),
            )
        })
    }

    pub fn set_column_name(&mut self, index: usize, name: &str) -> CommandResult<()> {
        self.column(index)?;
        self.column_names[index] = name.to_string();
        Ok(())
    }

    /// Index of `name`, adding it to the label table when absent.
    pub fn label_index(&mut self, name: &str) -> u32 {
        match self.label_names.iter().position(|n| n == name) {
            Some(pos) => pos as u32,
            None => {
                self.label_names.push(name.to_string());
                (self.label_names.len() - 1) as u32
            }
        }
    }

    pub fn label_name(&self, index: u32) -> &str {
        self.label_names
            .get(index as usize)
            .map(String::as_str)
            .unwrap_or("???")
    }

    /// Count of nodes carrying each label over all columns.
    pub fn label_counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.label_names.len()];
        for column in &self.columns {
            for index in column {
                if let Some(slot) = counts.get_mut(*index as usize) {
                    *slot += 1;
                }
            }
        }
        counts
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Border {
    pub name: String,
    pub points: Vec<Vec3>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BorderFile {
    pub header: FileHeader,
    pub borders: Vec<Border>,
}

/// Position expressed as barycentric weights of a surface tile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectionLink {
    pub nodes: [usize; 3],
    pub weights: [f32; 3],
}

impl ProjectionLink {
    pub fn max_node(&self) -> usize {
        self.nodes.iter().copied().max().unwrap_or(0)
    }

    /// Node carrying the largest weight.
    pub fn dominant_node(&self) -> usize {
        let mut best = 0;
        for i in 1..3 {
            if self.weights[i] > self.weights[best] {
                best = i;
            }
        }
        self.nodes[best]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BorderProjection {
    pub name: String,
    pub links: Vec<ProjectionLink>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BorderProjectionFile {
    pub header: FileHeader,
    pub borders: Vec<BorderProjection>,
}

/// A cell or focus in stereotaxic space
#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub name: String,
    pub xyz: Vec3,
}

/// Cell and foci files share one format.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellFile {
    pub header: FileHeader,
    pub cells: Vec<Cell>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CellProjection {
    pub name: String,
    pub link: ProjectionLink,
    /// Signed distance along the surface normal
    pub offset: f32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellProjectionFile {
    pub header: FileHeader,
    pub projections: Vec<CellProjection>,
}

impl BorderProjectionFile {
    pub fn max_node(&self) -> Option<usize> {
        self.borders
            .iter()
            .flat_map(|b| b.links.iter().map(ProjectionLink::max_node))
            .max()
    }
}

impl CellProjectionFile {
    pub fn max_node(&self) -> Option<usize> {
        self.projections.iter().map(|p| p.link.max_node()).max()
    }
}
