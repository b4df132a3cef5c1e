// SPDX-License-Identifier: PMPL-1.0-or-later

//! Coordinate files, topology files and the surface that pairs them

use super::geometry::{self, Vec3};
use super::header::FileHeader;
use crate::error::{CommandError, CommandResult};
use crate::types::{CoordinateType, Structure, SurfaceView, TopologyType};
use std::path::PathBuf;
use std::rc::Rc;

pub const CONFIGURATION_ID: &str = "configuration_id";
pub const PERIMETER_ID: &str = "perimeter_id";
pub const STRUCTURE_KEY: &str = "structure";

#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateFile {
    pub header: FileHeader,
    pub points: Vec<Vec3>,
}

impl CoordinateFile {
    pub fn new(points: Vec<Vec3>, coord_type: CoordinateType) -> Self {
        let mut file = Self {
            header: FileHeader::new(),
            points,
        };
        file.set_type(coord_type);
        file
    }

    pub fn coord_type(&self) -> CoordinateType {
        self.header
            .get(CONFIGURATION_ID)
            .map(CoordinateType::parse)
            .unwrap_or(CoordinateType::Unknown)
    }

    pub fn set_type(&mut self, coord_type: CoordinateType) {
        self.header.set(CONFIGURATION_ID, coord_type.name());
    }

    pub fn structure(&self) -> Structure {
        self.header
            .get(STRUCTURE_KEY)
            .and_then(Structure::parse)
            .unwrap_or(Structure::Invalid)
    }

    pub fn node_count(&self) -> usize {
        self.points.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TopologyFile {
    pub header: FileHeader,
    pub triangles: Vec<[usize; 3]>,
}

impl TopologyFile {
    pub fn topo_type(&self) -> TopologyType {
        self.header
            .get(PERIMETER_ID)
            .map(TopologyType::parse)
            .unwrap_or(TopologyType::Unknown)
    }

    pub fn max_node(&self) -> Option<usize> {
        self.triangles.iter().flat_map(|t| t.iter().copied()).max()
    }

    /// Sorted, de-duplicated neighbour list of every node.
    pub fn neighbors(&self, node_count: usize) -> Vec<Vec<usize>> {
        let mut neighbors = vec![Vec::new(); node_count];
        for tri in &self.triangles {
            for (a, b) in [(0, 1), (1, 2), (2, 0)] {
                let (na, nb) = (tri[a], tri[b]);
                if na < node_count && nb < node_count {
                    neighbors[na].push(nb);
                    neighbors[nb].push(na);
                }
            }
        }
        for list in &mut neighbors {
            list.sort_unstable();
            list.dedup();
        }
        neighbors
    }
}

/// Screen axes for a standard view: `right` and `up` span the image plane,
/// `toward_viewer` is the depth axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewTransform {
    pub right: Vec3,
    pub up: Vec3,
    pub toward_viewer: Vec3,
}

impl ViewTransform {
    pub fn standard(view: SurfaceView, structure: Structure) -> Self {
        let right_hemisphere = structure == Structure::Right;
        let (camera, up): (Vec3, Vec3) = match (view, right_hemisphere) {
            (SurfaceView::Lateral, false) | (SurfaceView::Medial, true) => {
                ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0])
            }
            (SurfaceView::Medial, false) | (SurfaceView::Lateral, true) => {
                ([1.0, 0.0, 0.0], [0.0, 0.0, 1.0])
            }
            (SurfaceView::Dorsal, _) => ([0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            (SurfaceView::Ventral, _) => ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            (SurfaceView::Anterior, _) => ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
            (SurfaceView::Posterior, _) => ([0.0, -1.0, 0.0], [0.0, 0.0, 1.0]),
        };
        let forward = geometry::scale(camera, -1.0);
        Self {
            right: geometry::cross(forward, up),
            up,
            toward_viewer: camera,
        }
    }

    /// (screen x, screen y, depth) of a point
    pub fn apply(&self, p: Vec3) -> Vec3 {
        [
            geometry::dot(p, self.right),
            geometry::dot(p, self.up),
            geometry::dot(p, self.toward_viewer),
        ]
    }
}

/// A coordinate file paired with a (possibly shared) topology file
#[derive(Debug, Clone)]
pub struct Surface {
    pub coord_path: PathBuf,
    pub coords: CoordinateFile,
    pub topology: Rc<TopologyFile>,
    neighbors: Vec<Vec<usize>>,
}

impl Surface {
    pub fn new(
        coord_path: PathBuf,
        coords: CoordinateFile,
        topology: Rc<TopologyFile>,
    ) -> CommandResult<Self> {
        let nodes = coords.node_count();
        if let Some(max) = topology.max_node() {
            if max >= nodes {
                return Err(CommandError::domain(
                    format!(
                        "topology node indices below {} for {}",
                        nodes,
                        coord_path.display()
                    ),
                    format!("topology references node {}", max),
                ));
            }
        }
        let neighbors = topology.neighbors(nodes);
        Ok(Self {
            coord_path,
            coords,
            topology,
            neighbors,
        })
    }

    pub fn node_count(&self) -> usize {
        self.coords.node_count()
    }

    pub fn tile_count(&self) -> usize {
        self.topology.triangles.len()
    }

    pub fn coord_type(&self) -> CoordinateType {
        self.coords.coord_type()
    }

    pub fn structure(&self) -> Structure {
        self.coords.structure()
    }

    pub fn neighbors(&self, node: usize) -> &[usize] {
        &self.neighbors[node]
    }

    pub fn neighbor_lists(&self) -> &[Vec<usize>] {
        &self.neighbors
    }

    pub fn point(&self, node: usize) -> Vec3 {
        self.coords.points[node]
    }

    pub fn tile_points(&self, tile: usize) -> [Vec3; 3] {
        let t = self.topology.triangles[tile];
        [self.point(t[0]), self.point(t[1]), self.point(t[2])]
    }

    /// Axis-aligned (min, max) corners; zeros for an empty surface.
    pub fn bounds(&self) -> (Vec3, Vec3) {
        let mut lo = [f32::INFINITY; 3];
        let mut hi = [f32::NEG_INFINITY; 3];
        for p in &self.coords.points {
            for a in 0..3 {
                lo[a] = lo[a].min(p[a]);
                hi[a] = hi[a].max(p[a]);
            }
        }
        if self.coords.points.is_empty() {
            ([0.0; 3], [0.0; 3])
        } else {
            (lo, hi)
        }
    }

    pub fn centroid(&self) -> Vec3 {
        let n = self.node_count().max(1) as f32;
        let sum = self
            .coords
            .points
            .iter()
            .fold([0.0; 3], |acc, p| geometry::add(acc, *p));
        geometry::scale(sum, 1.0 / n)
    }

    pub fn tile_normal(&self, tile: usize) -> Vec3 {
        let [a, b, c] = self.tile_points(tile);
        geometry::normalize(geometry::cross(geometry::sub(b, a), geometry::sub(c, a)))
    }

    /// Area-weighted average of incident tile normals.
    pub fn node_normals(&self) -> Vec<Vec3> {
        let mut normals = vec![[0.0f32; 3]; self.node_count()];
        for (tile, tri) in self.topology.triangles.iter().enumerate() {
            let [a, b, c] = self.tile_points(tile);
            let weighted = geometry::cross(geometry::sub(b, a), geometry::sub(c, a));
            for node in tri {
                normals[*node] = geometry::add(normals[*node], weighted);
            }
        }
        normals.into_iter().map(geometry::normalize).collect()
    }

    pub fn tile_area(&self, tile: usize) -> f32 {
        let [a, b, c] = self.tile_points(tile);
        geometry::triangle_area(a, b, c)
    }

    /// One third of the area of every tile a node belongs to.
    pub fn node_areas(&self) -> Vec<f32> {
        let mut areas = vec![0.0f32; self.node_count()];
        for (tile, tri) in self.topology.triangles.iter().enumerate() {
            let third = self.tile_area(tile) / 3.0;
            for node in tri {
                areas[*node] += third;
            }
        }
        areas
    }

    pub fn total_area(&self) -> f32 {
        (0..self.tile_count()).map(|t| self.tile_area(t)).sum()
    }
}
