// SPDX-License-Identifier: PMPL-1.0-or-later

//! Building deformation maps and carrying node data across them

use super::surface as surface_kernels;
use crate::model::geometry;
use crate::model::layers::{MetricFile, PaintFile, ProjectionLink};
use crate::model::surface::Surface;
use anyhow::{bail, Result};

/// For every target node, the source tile it lands on. Both surfaces are
/// scaled to a common radius first so spheres of different size still line
/// up; flat surfaces are used as they are.
pub fn create_links(source: &Surface, target: &Surface, spherical: bool) -> Result<Vec<ProjectionLink>> {
    if source.tile_count() == 0 {
        bail!("source surface has no tiles");
    }
    let mut source = source.clone();
    let mut target = target.clone();
    if spherical {
        surface_kernels::project_to_sphere(&mut source, 100.0);
        surface_kernels::project_to_sphere(&mut target, 100.0);
        // centre both on the origin so the radii line up
        let sc = source.centroid();
        let tc = target.centroid();
        for p in source.coords.points.iter_mut() {
            *p = geometry::sub(*p, sc);
        }
        for p in target.coords.points.iter_mut() {
            *p = geometry::sub(*p, tc);
        }
    }
    target
        .coords
        .points
        .iter()
        .map(|p| {
            surface_kernels::project_point(&source, *p)
                .map(|(link, _)| link)
                .ok_or_else(|| anyhow::anyhow!("no source tile for point {:?}", p))
        })
        .collect()
}

fn check_source(links: &[ProjectionLink], source_nodes: usize) -> Result<()> {
    if let Some(max) = links.iter().map(ProjectionLink::max_node).max() {
        if max >= source_nodes {
            bail!(
                "deformation map references source node {} but the data has {} nodes",
                max,
                source_nodes
            );
        }
    }
    Ok(())
}

/// Barycentric interpolation of every column onto the target nodes.
pub fn apply_to_metric(links: &[ProjectionLink], metric: &MetricFile) -> Result<MetricFile> {
    check_source(links, metric.node_count)?;
    let mut out = MetricFile::new(links.len());
    out.header = metric.header.clone();
    for (name, column) in metric.column_names.iter().zip(&metric.columns) {
        let values = links
            .iter()
            .map(|link| {
                let total: f32 = link.weights.iter().sum();
                let sum: f32 = link
                    .nodes
                    .iter()
                    .zip(link.weights)
                    .map(|(n, w)| column[*n] * w)
                    .sum();
                if total != 0.0 {
                    sum / total
                } else {
                    0.0
                }
            })
            .collect();
        out.add_column(name.clone(), values)?;
    }
    Ok(out)
}

/// Each target node takes the label of its dominant source node.
pub fn apply_to_paint(links: &[ProjectionLink], paint: &PaintFile) -> Result<PaintFile> {
    check_source(links, paint.node_count)?;
    let columns = paint
        .columns
        .iter()
        .map(|column| links.iter().map(|l| column[l.dominant_node()]).collect())
        .collect();
    Ok(PaintFile {
        header: paint.header.clone(),
        node_count: links.len(),
        column_names: paint.column_names.clone(),
        label_names: paint.label_names.clone(),
        columns,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::surface::tests::octahedron;

    #[test]
    fn identical_spheres_map_nodes_to_themselves() {
        let surface = octahedron();
        let links = create_links(&surface, &surface, true).unwrap();
        assert_eq!(links.len(), 6);
        for (node, link) in links.iter().enumerate() {
            assert_eq!(link.dominant_node(), node);
        }
    }

    #[test]
    fn metric_interpolates_with_weights() {
        let mut metric = MetricFile::new(3);
        metric.add_column("thickness", vec![0.0, 10.0, 20.0]).unwrap();
        let links = vec![ProjectionLink {
            nodes: [0, 1, 2],
            weights: [0.5, 0.25, 0.25],
        }];
        let out = apply_to_metric(&links, &metric).unwrap();
        assert_eq!(out.node_count, 1);
        assert!((out.columns[0][0] - 7.5).abs() < 1e-6);
    }

    #[test]
    fn paint_takes_dominant_label() {
        let paint = PaintFile {
            node_count: 3,
            column_names: vec!["areas".into()],
            label_names: vec!["???".into(), "V1".into()],
            columns: vec![vec![0, 1, 0]],
            ..Default::default()
        };
        let links = vec![ProjectionLink {
            nodes: [0, 1, 2],
            weights: [0.2, 0.6, 0.2],
        }];
        let out = apply_to_paint(&links, &paint).unwrap();
        assert_eq!(out.columns[0], [1]);
        let bad = vec![ProjectionLink {
            nodes: [0, 1, 9],
            weights: [0.2, 0.6, 0.2],
        }];
        assert!(apply_to_paint(&bad, &paint).is_err());
    }
}
