// SPDX-License-Identifier: PMPL-1.0-or-later

//! Deformation map creation and application

use super::{kernel, Operation};
use crate::args::ArgCursor;
use crate::error::{CommandError, CommandResult};
use crate::io;
use crate::kernels::deformation as deform;
use crate::model::deformation::{DeformationKind, DeformationMap, CURRENT_VERSION};
use crate::model::BrainSet;
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

pub(super) const OPERATIONS: &[Operation] = &[
    Operation {
        flag: "-deformation-map-create",
        title: "DEFORMATION MAP CREATE",
        params: &[
            "<SPHERE|FLAT>",
            "<source-coord-file>",
            "<source-topo-file>",
            "<target-coord-file>",
            "<target-topo-file>",
            "<output-deformation-map-file>",
        ],
        description: "Map every target node onto the source tile it falls on.\n\
                      SPHERE maps register two spherical surfaces, FLAT maps two\n\
                      flat surfaces.  The directories of both surfaces are stored\n\
                      so the map can be applied from anywhere.",
        needs_gui: false,
        execute: create,
    },
    Operation {
        flag: "-deformation-map-apply",
        title: "DEFORMATION MAP APPLY",
        params: &[
            "<deformation-map-file>",
            "<data-file-type>",
            "<input-file>",
            "<output-file>",
        ],
        description: "Carry a source-surface data file onto the target surface.\n\
                      Metric and surface shape values are interpolated; paint\n\
                      nodes take the label of the nearest source node.\n\
                      \n\
                      Data file types: METRIC SURFACE_SHAPE PAINT",
        needs_gui: false,
        execute: apply,
    },
    Operation {
        flag: "-deformation-map-set-paths",
        title: "DEFORMATION MAP SET PATHS",
        params: &[
            "<deformation-map-file>",
            "<source-directory>",
            "<target-directory>",
        ],
        description: "Replace the source and target directories stored in a\n\
                      deformation map.  Older maps are upgraded to store them.",
        needs_gui: false,
        execute: set_paths,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum DataFileType {
    #[value(name = "METRIC")]
    Metric,
    #[value(name = "SURFACE_SHAPE")]
    SurfaceShape,
    #[value(name = "PAINT")]
    Paint,
}

/// Absolute directory and bare file name of `path`.
fn split_absolute(path: &Path) -> CommandResult<(PathBuf, String)> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .map_err(|e| CommandError::read(path, e.into()))?
            .join(path)
    };
    let name = absolute
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let directory = absolute
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    Ok((directory, name))
}

fn create(args: &mut ArgCursor) -> CommandResult<()> {
    let kind = args.next_enum::<DeformationKind>("Deformation type", true)?;
    let source_coord = args.next_filename("Source coordinate file")?;
    let source_topo = args.next_filename("Source topology file")?;
    let target_coord = args.next_filename("Target coordinate file")?;
    let target_topo = args.next_filename("Target topology file")?;
    let output = args.next_filename("Output deformation map file")?;
    args.finish()?;

    let source = BrainSet::from_topo_coord(&source_topo, &source_coord)?;
    let target = BrainSet::from_topo_coord(&target_topo, &target_coord)?;
    let links = kernel(
        "Deformation Map Create",
        deform::create_links(
            source.surface(0)?,
            target.surface(0)?,
            kind == DeformationKind::Sphere,
        ),
    )?;

    let (source_directory, source_coord) = split_absolute(&source_coord)?;
    let (_, source_topo) = split_absolute(&source_topo)?;
    let (target_directory, target_coord) = split_absolute(&target_coord)?;
    let (_, target_topo) = split_absolute(&target_topo)?;
    let map = DeformationMap {
        version: CURRENT_VERSION,
        source_directory: Some(source_directory),
        target_directory: Some(target_directory),
        source_coord,
        source_topo,
        target_coord,
        target_topo,
        source_border: String::new(),
        kind,
        deform_both_ways: false,
        links,
    };
    debug!("deformation map covers {} target nodes", map.target_node_count());
    io::write_deformation_map(&map, &output)
}

fn apply(args: &mut ArgCursor) -> CommandResult<()> {
    let map_path = args.next_filename("Deformation map file")?;
    let data_type = args.next_enum::<DataFileType>("Data file type", true)?;
    let input = args.next_filename("Input file")?;
    let output = args.next_filename("Output file")?;
    args.finish()?;

    let map = io::read_deformation_map(&map_path)?;
    debug!(
        "applying map from {} to {}",
        map.source_path(&map.source_coord).display(),
        map.target_path(&map.target_coord).display()
    );
    match data_type {
        DataFileType::Metric => {
            let metric = io::read_metric(&input)?;
            let mapped = kernel(
                "Deformation Map Apply",
                deform::apply_to_metric(&map.links, &metric),
            )?;
            io::write_metric(&mapped, &output)
        }
        DataFileType::SurfaceShape => {
            let shape = io::read_surface_shape(&input)?;
            let mapped = kernel(
                "Deformation Map Apply",
                deform::apply_to_metric(&map.links, &shape),
            )?;
            io::write_surface_shape(&mapped, &output)
        }
        DataFileType::Paint => {
            let paint = io::read_paint(&input)?;
            let mapped = kernel(
                "Deformation Map Apply",
                deform::apply_to_paint(&map.links, &paint),
            )?;
            io::write_paint(&mapped, &output)
        }
    }
}

fn set_paths(args: &mut ArgCursor) -> CommandResult<()> {
    let map_path = args.next_filename("Deformation map file")?;
    let source_directory = args.next_filename("Source directory")?;
    let target_directory = args.next_filename("Target directory")?;
    args.finish()?;
    let mut map = io::read_deformation_map(&map_path)?;
    map.version = CURRENT_VERSION;
    map.source_directory = Some(source_directory);
    map.target_directory = Some(target_directory);
    io::write_deformation_map(&map, &map_path)
}
