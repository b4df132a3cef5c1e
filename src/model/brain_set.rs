// SPDX-License-Identifier: PMPL-1.0-or-later

//! Brain set: the in-memory aggregate of one subject's data files
//!
//! The set owns everything it loads. Surfaces share topology through `Rc`
//! and handlers borrow views from the set; nothing loaded points back at it.

use super::layers::{BorderProjectionFile, CellProjectionFile, MetricFile, PaintFile};
use super::params::ParamsFile;
use super::scene::SceneFile;
use super::surface::{Surface, TopologyFile};
use super::volume::Volume;
use crate::error::{CommandError, CommandResult};
use crate::io;
use crate::spec_file::{SpecFile, SpecTag};
use crate::types::{CoordinateType, Structure, TopologyType};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::debug;

/// A file held by the brain set together with the path it came from
#[derive(Debug, Clone)]
pub struct Loaded<T> {
    pub path: PathBuf,
    pub file: T,
}

#[derive(Debug, Default)]
pub struct BrainSet {
    pub structure: Option<Structure>,
    topologies: Vec<Rc<TopologyFile>>,
    surfaces: Vec<Surface>,
    pub volumes: Vec<Loaded<Volume>>,
    metrics: Vec<Loaded<MetricFile>>,
    shapes: Vec<Loaded<MetricFile>>,
    paints: Vec<Loaded<PaintFile>>,
    border_projections: Vec<Loaded<BorderProjectionFile>>,
    cell_projections: Vec<Loaded<CellProjectionFile>>,
    foci_projections: Vec<Loaded<CellProjectionFile>>,
    pub params: ParamsFile,
    pub scenes: SceneFile,
    pub region_names: Vec<String>,
    attached: HashSet<PathBuf>,
}

impl BrainSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// One surface from an explicit topology and coordinate file.
    pub fn from_topo_coord(topo_path: &Path, coord_path: &Path) -> CommandResult<BrainSet> {
        let mut set = BrainSet::new();
        let topology = Rc::new(io::read_topo(topo_path)?);
        set.topologies.push(Rc::clone(&topology));
        let coords = io::read_coord(coord_path)?;
        set.push_surface(Surface::new(coord_path.to_path_buf(), coords, topology)?)?;
        Ok(set)
    }

    /// Every entry of a specification file. Paths are resolved against the
    /// directory holding the specification.
    pub fn from_spec_file(spec_path: &Path) -> CommandResult<BrainSet> {
        let mut spec = SpecFile::read(spec_path)?;
        spec.set_all_selected(true);
        let base = spec_path.parent().unwrap_or_else(|| Path::new(""));
        let resolve = |name: &str| -> PathBuf {
            let p = Path::new(name);
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                base.join(p)
            }
        };

        let mut set = BrainSet::new();
        let structure = spec.structure();
        if structure != Structure::Invalid {
            set.structure = Some(structure);
        }

        let mut topologies: Vec<(TopologyType, Rc<TopologyFile>)> = Vec::new();
        for entry in spec.selected() {
            if let Some(topo_type) = entry.tag.topo_type() {
                let topo = io::read_topo(&resolve(&entry.path))?;
                let topo_type = match topo.topo_type() {
                    TopologyType::Unknown => topo_type,
                    declared => declared,
                };
                topologies.push((topo_type, Rc::new(topo)));
            }
        }

        for entry in spec.selected() {
            let path = resolve(&entry.path);
            match entry.tag {
                tag if tag.coord_type().is_some() => {
                    let mut coords = io::read_coord(&path)?;
                    if coords.coord_type() == CoordinateType::Unknown {
                        if let Some(t) = tag.coord_type() {
                            coords.set_type(t);
                        }
                    }
                    let topology = pair_topology(coords.coord_type(), &topologies).ok_or_else(|| {
                        CommandError::domain(
                            format!("topology file for {}", path.display()),
                            "no suitable topology in specification",
                        )
                    })?;
                    set.push_surface(Surface::new(path, coords, topology)?)?;
                }
                SpecTag::VolumeAnatomy
                | SpecTag::VolumeFunctional
                | SpecTag::VolumePaint
                | SpecTag::VolumeSegmentation
                | SpecTag::VolumeVector => {
                    let file = io::read_volume(&path)?;
                    set.volumes.push(Loaded { path, file });
                }
                SpecTag::Metric => {
                    let file = io::read_metric(&path)?;
                    set.add_metric(path, file)?;
                }
                SpecTag::SurfaceShape => {
                    let file = io::read_surface_shape(&path)?;
                    set.add_surface_shape(path, file)?;
                }
                SpecTag::Paint => {
                    let file = io::read_paint(&path)?;
                    set.add_paint(path, file)?;
                }
                SpecTag::BorderProjection => {
                    let file = io::read_border_projection(&path)?;
                    set.add_border_projection(path, file)?;
                }
                SpecTag::CellProjection => {
                    let file = io::read_cell_projection(&path)?;
                    set.add_cell_projection(path, file)?;
                }
                SpecTag::FociProjection => {
                    let file = io::read_cell_projection(&path)?;
                    set.add_foci_projection(path, file)?;
                }
                SpecTag::Params => set.attach_params(&path)?,
                SpecTag::Scene => set.attach_scene(&path)?,
                other => debug!("{} {} is not loaded into the brain set", other.name(), entry.path),
            }
        }
        set.topologies = topologies.into_iter().map(|(_, t)| t).collect();
        debug!(
            "brain set from {}: {} surfaces, {} volumes",
            spec_path.display(),
            set.surfaces.len(),
            set.volumes.len()
        );
        Ok(set)
    }

    fn push_surface(&mut self, surface: Surface) -> CommandResult<()> {
        let nodes = surface.node_count();
        let layers = self
            .metrics
            .iter()
            .map(|l| (&l.path, l.file.node_count))
            .chain(self.shapes.iter().map(|l| (&l.path, l.file.node_count)))
            .chain(self.paints.iter().map(|l| (&l.path, l.file.node_count)));
        for (path, count) in layers {
            if count != nodes {
                return Err(cardinality_error(path, count, &surface));
            }
        }
        if self.structure.is_none() {
            let s = surface.structure();
            if s != Structure::Invalid {
                self.structure = Some(s);
            }
        }
        self.surfaces.push(surface);
        Ok(())
    }

    fn check_node_count(&self, path: &Path, count: usize) -> CommandResult<()> {
        match self.surfaces.iter().find(|s| s.node_count() != count) {
            Some(surface) => Err(cardinality_error(path, count, surface)),
            None => Ok(()),
        }
    }

    fn check_projection(&self, path: &Path, max_node: Option<usize>) -> CommandResult<()> {
        if let (Some(max), Some(surface)) = (max_node, self.surfaces.first()) {
            if max >= surface.node_count() {
                return Err(CommandError::domain(
                    format!(
                        "node indices below {} in {}",
                        surface.node_count(),
                        path.display()
                    ),
                    format!("node {} referenced", max),
                ));
            }
        }
        Ok(())
    }

    pub fn add_metric(&mut self, path: PathBuf, file: MetricFile) -> CommandResult<()> {
        self.check_node_count(&path, file.node_count)?;
        self.metrics.push(Loaded { path, file });
        Ok(())
    }

    pub fn add_surface_shape(&mut self, path: PathBuf, file: MetricFile) -> CommandResult<()> {
        self.check_node_count(&path, file.node_count)?;
        self.shapes.push(Loaded { path, file });
        Ok(())
    }

    pub fn add_paint(&mut self, path: PathBuf, file: PaintFile) -> CommandResult<()> {
        self.check_node_count(&path, file.node_count)?;
        self.paints.push(Loaded { path, file });
        Ok(())
    }

    pub fn add_border_projection(
        &mut self,
        path: PathBuf,
        file: BorderProjectionFile,
    ) -> CommandResult<()> {
        self.check_projection(&path, file.max_node())?;
        self.border_projections.push(Loaded { path, file });
        Ok(())
    }

    pub fn add_cell_projection(&mut self, path: PathBuf, file: CellProjectionFile) -> CommandResult<()> {
        self.check_projection(&path, file.max_node())?;
        self.cell_projections.push(Loaded { path, file });
        Ok(())
    }

    pub fn add_foci_projection(&mut self, path: PathBuf, file: CellProjectionFile) -> CommandResult<()> {
        self.check_projection(&path, file.max_node())?;
        self.foci_projections.push(Loaded { path, file });
        Ok(())
    }

    /// Load a metric from disk after checking it against the surfaces.
    pub fn load_metric(&mut self, path: &Path) -> CommandResult<&MetricFile> {
        let file = io::read_metric(path)?;
        self.add_metric(path.to_path_buf(), file)?;
        Ok(&self.metrics[self.metrics.len() - 1].file)
    }

    pub fn load_paint(&mut self, path: &Path) -> CommandResult<&PaintFile> {
        let file = io::read_paint(path)?;
        self.add_paint(path.to_path_buf(), file)?;
        Ok(&self.paints[self.paints.len() - 1].file)
    }

    fn is_attached(&self, path: &Path) -> bool {
        self.attached.contains(path)
    }

    /// Called once the file has been read, so a failed read can be retried.
    fn mark_attached(&mut self, path: &Path) {
        self.attached.insert(path.to_path_buf());
    }

    pub fn attach_params(&mut self, path: &Path) -> CommandResult<()> {
        if self.is_attached(path) {
            return Ok(());
        }
        let params = io::read_params(path)?;
        self.mark_attached(path);
        for (key, value) in params.iter() {
            self.params.set(key, value);
        }
        Ok(())
    }

    pub fn attach_scene(&mut self, path: &Path) -> CommandResult<()> {
        if self.is_attached(path) {
            return Ok(());
        }
        let scenes = io::read_scene(path)?;
        self.mark_attached(path);
        self.scenes.scenes.extend(scenes.scenes);
        Ok(())
    }

    /// One region name per line; empty lines are skipped.
    pub fn attach_region_names(&mut self, path: &Path) -> CommandResult<()> {
        if self.is_attached(path) {
            return Ok(());
        }
        let text = io::read_text(path)?;
        self.mark_attached(path);
        self.region_names.extend(
            text.lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from),
        );
        Ok(())
    }

    pub fn surface_count(&self) -> usize {
        self.surfaces.len()
    }

    pub fn surfaces(&self) -> &[Surface] {
        &self.surfaces
    }

    pub fn surface(&self, index: usize) -> CommandResult<&Surface> {
        self.surfaces.get(index).ok_or_else(|| {
            CommandError::domain(
                format!("surface number {}", index + 1),
                format!("brain set holds {} surfaces", self.surfaces.len()),
            )
        })
    }

    pub fn surface_mut(&mut self, index: usize) -> CommandResult<&mut Surface> {
        let count = self.surfaces.len();
        self.surfaces.get_mut(index).ok_or_else(|| {
            CommandError::domain(
                format!("surface number {}", index + 1),
                format!("brain set holds {} surfaces", count),
            )
        })
    }

    pub fn surface_of_type(&self, coord_type: CoordinateType) -> CommandResult<&Surface> {
        self.surfaces
            .iter()
            .find(|s| s.coord_type() == coord_type)
            .ok_or_else(|| {
                CommandError::domain(
                    format!("surface of type {}", coord_type.name()),
                    "no such surface type",
                )
            })
    }

    pub fn topologies(&self) -> &[Rc<TopologyFile>] {
        &self.topologies
    }

    pub fn metrics(&self) -> &[Loaded<MetricFile>] {
        &self.metrics
    }

    pub fn surface_shapes(&self) -> &[Loaded<MetricFile>] {
        &self.shapes
    }

    pub fn paints(&self) -> &[Loaded<PaintFile>] {
        &self.paints
    }

    pub fn border_projections(&self) -> &[Loaded<BorderProjectionFile>] {
        &self.border_projections
    }

    pub fn cell_projections(&self) -> &[Loaded<CellProjectionFile>] {
        &self.cell_projections
    }

    pub fn foci_projections(&self) -> &[Loaded<CellProjectionFile>] {
        &self.foci_projections
    }

    pub fn volume(&self, index: usize) -> CommandResult<&Volume> {
        self.volumes.get(index).map(|l| &l.file).ok_or_else(|| {
            CommandError::domain(
                format!("volume number {}", index + 1),
                format!("brain set holds {} volumes", self.volumes.len()),
            )
        })
    }
}

fn cardinality_error(path: &Path, count: usize, surface: &Surface) -> CommandError {
    CommandError::domain(
        format!(
            "{} nodes in {} (as in {})",
            surface.node_count(),
            path.display(),
            surface.coord_path.display()
        ),
        format!("file has {} nodes", count),
    )
}

/// Flat surfaces use cut topology; everything else closed, then open.
fn pair_topology(
    coord_type: CoordinateType,
    topologies: &[(TopologyType, Rc<TopologyFile>)],
) -> Option<Rc<TopologyFile>> {
    let preference: &[TopologyType] = if coord_type.is_flat() {
        &[TopologyType::Cut, TopologyType::LobarCut]
    } else {
        &[TopologyType::Closed, TopologyType::Open]
    };
    preference
        .iter()
        .find_map(|want| topologies.iter().find(|(t, _)| t == want))
        .or_else(|| topologies.first())
        .map(|(_, topo)| Rc::clone(topo))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::surface::tests::octahedron;
    use crate::spec_file::SpecFile;
    use std::fs;

    fn write_octahedron(dir: &Path) -> (PathBuf, PathBuf) {
        let surface = octahedron();
        let topo = dir.join("oct.closed.topo");
        let coord = dir.join("oct.fiducial.coord");
        io::write_topo(&surface.topology, &topo).unwrap();
        io::write_coord(&surface.coords, &coord).unwrap();
        (topo, coord)
    }

    #[test]
    fn metric_with_wrong_node_count_is_rejected() {
        let dir = tempfile::TempDir::new().unwrap();
        let (topo, coord) = write_octahedron(dir.path());
        let mut set = BrainSet::from_topo_coord(&topo, &coord).unwrap();
        let err = set
            .add_metric(PathBuf::from("short.metric"), MetricFile::new(3))
            .unwrap_err();
        assert!(err.to_string().contains("short.metric"));
        assert!(set.add_metric(PathBuf::from("ok.metric"), MetricFile::new(6)).is_ok());
    }

    #[test]
    fn missing_surface_type_is_named() {
        let dir = tempfile::TempDir::new().unwrap();
        let (topo, coord) = write_octahedron(dir.path());
        let set = BrainSet::from_topo_coord(&topo, &coord).unwrap();
        assert!(set.surface(0).is_ok());
        let err = set.surface_of_type(CoordinateType::Inflated).unwrap_err();
        assert_eq!(
            err.to_string(),
            "ERROR: surface of type INFLATED: no such surface type"
        );
    }

    #[test]
    fn spec_file_pairs_coords_with_topology() {
        let dir = tempfile::TempDir::new().unwrap();
        write_octahedron(dir.path());
        let mut spec = SpecFile::new();
        spec.add_entry(SpecTag::ClosedTopo, "oct.closed.topo", None);
        spec.add_entry(SpecTag::FiducialCoord, "oct.fiducial.coord", None);
        let spec_path = dir.path().join("oct.spec");
        spec.write(&spec_path).unwrap();

        let set = BrainSet::from_spec_file(&spec_path).unwrap();
        assert_eq!(set.surface_count(), 1);
        assert_eq!(set.surface(0).unwrap().node_count(), 6);
    }

    #[test]
    fn attaching_twice_is_a_no_op() {
        let dir = tempfile::TempDir::new().unwrap();
        let names = dir.path().join("regions.txt");
        fs::write(&names, "???\nTHALAMUS\n").unwrap();
        let mut set = BrainSet::new();
        set.attach_region_names(&names).unwrap();
        set.attach_region_names(&names).unwrap();
        assert_eq!(set.region_names, ["???", "THALAMUS"]);
    }

    #[test]
    fn failed_attach_can_be_retried() {
        let dir = tempfile::TempDir::new().unwrap();
        let names = dir.path().join("regions.txt");
        let mut set = BrainSet::new();
        assert!(set.attach_region_names(&names).is_err());
        assert!(set.region_names.is_empty());

        fs::write(&names, "???\nPUTAMEN\n").unwrap();
        set.attach_region_names(&names).unwrap();
        assert_eq!(set.region_names, ["???", "PUTAMEN"]);

        let scene = dir.path().join("views.scene");
        fs::write(&scene, "not a scene").unwrap();
        assert!(set.attach_scene(&scene).is_err());
        assert!(set.attach_scene(&scene).is_err());
    }
}
