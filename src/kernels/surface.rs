// SPDX-License-Identifier: PMPL-1.0-or-later

//! Surface geometry kernels: smoothing, inflation, projection

use crate::model::geometry::{self, Vec3};
use crate::model::layers::ProjectionLink;
use crate::model::surface::Surface;
use crate::types::CoordinateType;
use anyhow::{bail, Result};

/// Laplacian smoothing: each node moves `strength` of the way toward the
/// mean of its neighbours, `iterations` times. Isolated nodes stay put.
pub fn smooth(surface: &mut Surface, strength: f32, iterations: usize) -> Result<()> {
    if !(0.0..=1.0).contains(&strength) {
        bail!("smoothing strength {} is outside 0 to 1", strength);
    }
    for _ in 0..iterations {
        let previous = &surface.coords.points;
        let next: Vec<Vec3> = (0..previous.len())
            .map(|node| {
                let neighbors = surface.neighbors(node);
                if neighbors.is_empty() {
                    return previous[node];
                }
                let mean = mean_of(previous, neighbors);
                geometry::add(
                    geometry::scale(previous[node], 1.0 - strength),
                    geometry::scale(mean, strength),
                )
            })
            .collect();
        surface.coords.points = next;
    }
    Ok(())
}

fn mean_of(points: &[Vec3], nodes: &[usize]) -> Vec3 {
    let sum = nodes
        .iter()
        .fold([0.0; 3], |acc, n| geometry::add(acc, points[*n]));
    geometry::scale(sum, 1.0 / nodes.len() as f32)
}

/// Scale the surface about its centroid so its total area matches `area`.
fn restore_area(surface: &mut Surface, area: f32) {
    let now = surface.total_area();
    if now <= 0.0 || area <= 0.0 {
        return;
    }
    let factor = (area / now).sqrt();
    let center = surface.centroid();
    for p in surface.coords.points.iter_mut() {
        *p = geometry::add(center, geometry::scale(geometry::sub(*p, center), factor));
    }
}

/// Put every node on the ellipsoid through the surface's bounding extents.
pub fn project_to_ellipsoid(surface: &mut Surface) {
    let (lo, hi) = surface.bounds();
    let center = surface.centroid();
    let radii = [
        ((hi[0] - lo[0]) * 0.5).max(f32::EPSILON),
        ((hi[1] - lo[1]) * 0.5).max(f32::EPSILON),
        ((hi[2] - lo[2]) * 0.5).max(f32::EPSILON),
    ];
    for p in surface.coords.points.iter_mut() {
        let d = geometry::sub(*p, center);
        let scaled = [d[0] / radii[0], d[1] / radii[1], d[2] / radii[2]];
        let len = geometry::length(scaled);
        if len > 0.0 {
            *p = geometry::add(center, geometry::scale(d, 1.0 / len));
        }
    }
}

/// Put every node on the sphere of `radius` about the centroid. A radius of
/// zero keeps the mean node distance.
pub fn project_to_sphere(surface: &mut Surface, radius: f32) {
    let center = surface.centroid();
    let radius = if radius > 0.0 {
        radius
    } else {
        let n = surface.node_count().max(1) as f32;
        surface
            .coords
            .points
            .iter()
            .map(|p| geometry::distance(*p, center))
            .sum::<f32>()
            / n
    };
    for p in surface.coords.points.iter_mut() {
        let d = geometry::sub(*p, center);
        let len = geometry::length(d);
        if len > 0.0 {
            *p = geometry::add(center, geometry::scale(d, radius / len));
        }
    }
}

/// Iterations of area-preserving smoothing for each inflation level
const INFLATED_ITERATIONS: usize = 50;
const VERY_INFLATED_ITERATIONS: usize = 250;

/// Derive a coordinate configuration of `target` type from a fiducial surface.
pub fn generate(surface: &mut Surface, target: CoordinateType) -> Result<()> {
    let area = surface.total_area();
    match target {
        CoordinateType::Inflated => {
            smooth(surface, 1.0, INFLATED_ITERATIONS)?;
            restore_area(surface, area);
        }
        CoordinateType::VeryInflated => {
            smooth(surface, 1.0, VERY_INFLATED_ITERATIONS)?;
            restore_area(surface, area);
        }
        CoordinateType::Ellipsoidal => {
            smooth(surface, 1.0, INFLATED_ITERATIONS)?;
            restore_area(surface, area);
            project_to_ellipsoid(surface);
            restore_area(surface, area);
        }
        CoordinateType::Spherical => {
            smooth(surface, 1.0, INFLATED_ITERATIONS)?;
            project_to_sphere(surface, 0.0);
            restore_area(surface, area);
        }
        other => bail!("cannot generate a {} surface", other.name()),
    }
    surface.coords.set_type(target);
    Ok(())
}

/// Per-node `log2(area / reference area)`; nodes with no area on either
/// side give zero.
pub fn areal_distortion(surface: &Surface, reference: &Surface) -> Result<Vec<f32>> {
    if surface.node_count() != reference.node_count() {
        bail!(
            "surfaces have {} and {} nodes",
            surface.node_count(),
            reference.node_count()
        );
    }
    let a = surface.node_areas();
    let b = reference.node_areas();
    Ok(a.iter()
        .zip(&b)
        .map(|(a, b)| {
            if *a > 0.0 && *b > 0.0 {
                (a / b).log2()
            } else {
                0.0
            }
        })
        .collect())
}

/// Nearest tile to `xyz`: its barycentric link and the signed distance
/// from the surface along the tile normal.
pub fn project_point(surface: &Surface, xyz: Vec3) -> Option<(ProjectionLink, f32)> {
    let mut best: Option<(f32, usize, Vec3, [f32; 3])> = None;
    for tile in 0..surface.tile_count() {
        let [a, b, c] = surface.tile_points(tile);
        let (closest, weights) = geometry::closest_point_on_triangle(xyz, a, b, c);
        let d = geometry::distance(xyz, closest);
        if best.map_or(true, |(bd, ..)| d < bd) {
            best = Some((d, tile, closest, weights));
        }
    }
    best.map(|(_, tile, closest, weights)| {
        let normal = surface.tile_normal(tile);
        let offset = geometry::dot(geometry::sub(xyz, closest), normal);
        let link = ProjectionLink {
            nodes: surface.topology.triangles[tile],
            weights,
        };
        (link, offset)
    })
}

/// Position of `link` on `surface`, moved `offset` along the interpolated
/// node normal.
pub fn unproject_point(surface: &Surface, normals: &[Vec3], link: &ProjectionLink, offset: f32) -> Vec3 {
    let points = link.nodes.map(|n| surface.point(n));
    let on_surface = geometry::barycentric_point(points, link.weights);
    if offset == 0.0 {
        return on_surface;
    }
    let normal = geometry::normalize(geometry::barycentric_point(
        link.nodes.map(|n| normals[n]),
        link.weights,
    ));
    geometry::add(on_surface, geometry::scale(normal, offset))
}

/// Neighbour-averaging of one metric column over the surface.
pub fn smooth_metric(surface: &Surface, values: &[f32], strength: f32, iterations: usize) -> Result<Vec<f32>> {
    if values.len() != surface.node_count() {
        bail!(
            "column has {} values for {} nodes",
            values.len(),
            surface.node_count()
        );
    }
    if !(0.0..=1.0).contains(&strength) {
        bail!("smoothing strength {} is outside 0 to 1", strength);
    }
    let mut current = values.to_vec();
    for _ in 0..iterations {
        let previous = current.clone();
        for (node, value) in current.iter_mut().enumerate() {
            let neighbors = surface.neighbors(node);
            if neighbors.is_empty() {
                continue;
            }
            let mean = neighbors.iter().map(|n| previous[*n]).sum::<f32>() / neighbors.len() as f32;
            *value = previous[node] * (1.0 - strength) + mean * strength;
        }
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::surface::tests::octahedron;

    #[test]
    fn smoothing_octahedron_shrinks_toward_centroid() {
        let mut surface = octahedron();
        smooth(&mut surface, 0.5, 1).unwrap();
        let d = geometry::length(surface.point(0));
        assert!(d < 1.0);
        assert!(smooth(&mut surface, 1.5, 1).is_err());
    }

    #[test]
    fn sphere_projection_sets_radius() {
        let mut surface = octahedron();
        surface.coords.points[0] = [3.0, 0.0, 0.0];
        let center = surface.centroid();
        project_to_sphere(&mut surface, 2.0);
        for p in &surface.coords.points {
            assert!((geometry::distance(*p, center) - 2.0).abs() < 1e-4);
        }
    }

    #[test]
    fn generate_marks_coordinate_type() {
        let mut surface = octahedron();
        generate(&mut surface, CoordinateType::Spherical).unwrap();
        assert_eq!(surface.coord_type(), CoordinateType::Spherical);
        assert!(generate(&mut surface, CoordinateType::Flat).is_err());
    }

    #[test]
    fn projection_round_trip_recovers_point() {
        let surface = octahedron();
        let normals = surface.node_normals();
        let target = [0.5, 0.5, 0.5];
        let (link, offset) = project_point(&surface, target).unwrap();
        let back = unproject_point(&surface, &normals, &link, 0.0);
        let expected = geometry::sub(target, geometry::scale(surface.tile_normal(0), offset));
        assert!(geometry::distance(back, expected) < 1e-4);
        assert!(offset > 0.0);
    }

    #[test]
    fn identical_surfaces_have_no_distortion() {
        let surface = octahedron();
        let distortion = areal_distortion(&surface, &surface).unwrap();
        assert!(distortion.iter().all(|d| d.abs() < 1e-6));
    }

    #[test]
    fn metric_smoothing_averages_neighbours() {
        let surface = octahedron();
        let values = vec![6.0, 0.0, 0.0, 0.0, 0.0, 0.0];
        let out = smooth_metric(&surface, &values, 1.0, 1).unwrap();
        assert_eq!(out[0], 0.0);
        assert!((out[2] - 1.5).abs() < 1e-6);
    }
}
