// SPDX-License-Identifier: PMPL-1.0-or-later

//! Surface construction, smoothing and feature projection

use super::{kernel, Operation};
use crate::args::ArgCursor;
use crate::error::{CommandError, CommandResult};
use crate::io;
use crate::kernels::surface as geometry_kernels;
use crate::model::layers::{
    Border, BorderFile, BorderProjection, BorderProjectionFile, Cell, CellFile, CellProjection,
    CellProjectionFile, MetricFile, ProjectionLink,
};
use crate::model::{BrainSet, Surface};
use crate::spec_file::{self, SpecTag};
use crate::types::CoordinateType;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, info};

pub(super) const OPERATIONS: &[Operation] = &[
    Operation {
        flag: "-surface-info",
        title: "SURFACE INFORMATION",
        params: &["<coord-file>", "<topo-file>"],
        description: "Print node and tile counts, types, bounds and total area.",
        needs_gui: false,
        execute: surface_info,
    },
    Operation {
        flag: "-surface-generate",
        title: "SURFACE GENERATE INFLATED",
        params: &[
            "<fiducial-coord-file>",
            "<closed-topo-file>",
            "<output-inflated-coord-file>",
            "<output-very-inflated-coord-file>",
            "<output-ellipsoid-coord-file>",
            "<output-spherical-coord-file>",
            "[spec-file]",
        ],
        description: "Generate inflated, very inflated, ellipsoidal and spherical\n\
                      surfaces from a fiducial surface.  Pass \"\" for any output\n\
                      that is not wanted.  When a specification file is given,\n\
                      each generated surface is added to it.",
        needs_gui: false,
        execute: generate,
    },
    Operation {
        flag: "-surface-smoothing",
        title: "SURFACE SMOOTHING",
        params: &[
            "<input-coord-file>",
            "<topo-file>",
            "<output-coord-file>",
            "<strength>",
            "<iterations>",
        ],
        description: "Move each node toward the mean of its neighbours by the\n\
                      strength (0 to 1), repeated for the iterations.",
        needs_gui: false,
        execute: smoothing,
    },
    Operation {
        flag: "-surface-areal-distortion",
        title: "SURFACE AREAL DISTORTION",
        params: &[
            "<coord-file>",
            "<reference-coord-file>",
            "<topo-file>",
            "<surface-shape-file>",
            "<column-name>",
        ],
        description: "Add a column of log2(node area / reference node area) to\n\
                      the surface shape file, creating it if needed.",
        needs_gui: false,
        execute: areal_distortion,
    },
    Operation {
        flag: "-surface-border-projection",
        title: "SURFACE BORDER PROJECTION",
        params: &[
            "<coord-file>",
            "<topo-file>",
            "<input-border-file>",
            "<output-border-projection-file>",
        ],
        description: "Attach each border point to the nearest surface tile.",
        needs_gui: false,
        execute: border_projection,
    },
    Operation {
        flag: "-surface-border-unprojection",
        title: "SURFACE BORDER UNPROJECTION",
        params: &[
            "<coord-file>",
            "<topo-file>",
            "<input-border-projection-file>",
            "<output-border-file>",
        ],
        description: "Place projected border points on the surface.",
        needs_gui: false,
        execute: border_unprojection,
    },
    Operation {
        flag: "-surface-foci-projection",
        title: "SURFACE FOCI PROJECTION",
        params: PROJECTION_PARAMS_FOCI,
        description: PROJECTION_DESCRIPTION,
        needs_gui: false,
        execute: foci_projection,
    },
    Operation {
        flag: "-surface-foci-unprojection",
        title: "SURFACE FOCI UNPROJECTION",
        params: UNPROJECTION_PARAMS_FOCI,
        description: UNPROJECTION_DESCRIPTION,
        needs_gui: false,
        execute: foci_unprojection,
    },
    Operation {
        flag: "-surface-cell-projection",
        title: "SURFACE CELL PROJECTION",
        params: PROJECTION_PARAMS_CELL,
        description: PROJECTION_DESCRIPTION,
        needs_gui: false,
        execute: cell_projection,
    },
    Operation {
        flag: "-surface-cell-unprojection",
        title: "SURFACE CELL UNPROJECTION",
        params: UNPROJECTION_PARAMS_CELL,
        description: UNPROJECTION_DESCRIPTION,
        needs_gui: false,
        execute: cell_unprojection,
    },
];

const PROJECTION_PARAMS_FOCI: &[&str] = &[
    "<coord-file>",
    "<topo-file>",
    "<input-foci-file>",
    "<output-foci-projection-file>",
    "<b-onto-surface-flag>",
    "<f-onto-surface-above-distance>",
];

const UNPROJECTION_PARAMS_FOCI: &[&str] = &[
    "<coord-file>",
    "<topo-file>",
    "<input-foci-projection-file>",
    "<output-foci-file>",
    "<b-onto-surface-flag>",
    "<f-onto-surface-above-distance>",
];

const PROJECTION_PARAMS_CELL: &[&str] = &[
    "<coord-file>",
    "<topo-file>",
    "<input-cell-file>",
    "<output-cell-projection-file>",
    "<b-onto-surface-flag>",
    "<f-onto-surface-above-distance>",
];

const UNPROJECTION_PARAMS_CELL: &[&str] = &[
    "<coord-file>",
    "<topo-file>",
    "<input-cell-projection-file>",
    "<output-cell-file>",
    "<b-onto-surface-flag>",
    "<f-onto-surface-above-distance>",
];

const PROJECTION_DESCRIPTION: &str = "Attach each point to the nearest surface tile.  When the\n\
     onto-surface flag is true every projection is stored at the given\n\
     distance above the surface; otherwise each keeps its own distance.";

const UNPROJECTION_DESCRIPTION: &str = "Convert projections back to stereotaxic positions on the\n\
     surface.  When the onto-surface flag is true every point is placed\n\
     at the given distance above the surface; otherwise each keeps the\n\
     distance stored with its projection.";

/// Coordinate and topology file names, loaded into a one-surface set.
fn next_surface_files(args: &mut ArgCursor) -> CommandResult<(PathBuf, PathBuf)> {
    let coord = args.next_filename("Coordinate file")?;
    let topo = args.next_filename("Topology file")?;
    Ok((coord, topo))
}

fn load_surface(coord: &Path, topo: &Path) -> CommandResult<BrainSet> {
    BrainSet::from_topo_coord(topo, coord)
}

fn surface_info(args: &mut ArgCursor) -> CommandResult<()> {
    let (coord, topo) = next_surface_files(args)?;
    args.finish()?;
    let set = load_surface(&coord, &topo)?;
    let surface = set.surface(0)?;
    let (lo, hi) = surface.bounds();
    println!("nodes: {}", surface.node_count());
    println!("tiles: {}", surface.tile_count());
    println!("coordinate type: {}", surface.coord_type().name());
    println!("topology type: {}", surface.topology.topo_type().name());
    println!("structure: {}", surface.structure().name());
    println!("x range: {}, {}", lo[0], hi[0]);
    println!("y range: {}, {}", lo[1], hi[1]);
    println!("z range: {}, {}", lo[2], hi[2]);
    println!("total area: {}", surface.total_area());
    Ok(())
}

/// A required output name where `""` means "do not produce".
fn next_skippable(args: &mut ArgCursor, name: &str) -> CommandResult<Option<PathBuf>> {
    let token = args.next_string(name)?;
    Ok((!token.is_empty()).then(|| PathBuf::from(token)))
}

fn generate(args: &mut ArgCursor) -> CommandResult<()> {
    let coord = args.next_filename("Fiducial coordinate file")?;
    let topo = args.next_filename("Closed topology file")?;
    let outputs = [
        (CoordinateType::Inflated, next_skippable(args, "Inflated coordinate file")?),
        (
            CoordinateType::VeryInflated,
            next_skippable(args, "Very inflated coordinate file")?,
        ),
        (
            CoordinateType::Ellipsoidal,
            next_skippable(args, "Ellipsoid coordinate file")?,
        ),
        (CoordinateType::Spherical, next_skippable(args, "Spherical coordinate file")?),
    ];
    let spec = args.next_optional_filename("Spec file")?;
    args.finish()?;

    let set = load_surface(&coord, &topo)?;
    let fiducial = set.surface(0)?;
    for (coord_type, output) in outputs {
        let Some(output) = output else {
            debug!("skipping {} surface", coord_type.name());
            continue;
        };
        let mut surface = fiducial.clone();
        kernel(
            "Surface Generate Inflated",
            geometry_kernels::generate(&mut surface, coord_type),
        )?;
        io::write_coord(&surface.coords, &output)?;
        info!("wrote {} surface {}", coord_type.name(), output.display());
        if let (Some(spec), Some(tag)) = (&spec, SpecTag::for_coord_type(coord_type)) {
            spec_file::add_entry(
                spec,
                tag.name(),
                &spec_file::entry_path(spec, &output),
                None,
            )?;
        }
    }
    Ok(())
}

fn smoothing(args: &mut ArgCursor) -> CommandResult<()> {
    let (coord, topo) = next_surface_files(args)?;
    let output = args.next_filename("Output coordinate file")?;
    let strength = args.next_float("Strength")?;
    let iterations = args.next_count("Iterations")?;
    args.finish()?;
    let mut set = load_surface(&coord, &topo)?;
    let surface = set.surface_mut(0)?;
    kernel(
        "Surface Smoothing",
        geometry_kernels::smooth(surface, strength, iterations),
    )?;
    io::write_coord(&surface.coords, &output)
}

fn areal_distortion(args: &mut ArgCursor) -> CommandResult<()> {
    let coord = args.next_filename("Coordinate file")?;
    let reference = args.next_filename("Reference coordinate file")?;
    let topo = args.next_filename("Topology file")?;
    let output = args.next_filename("Surface shape file")?;
    let column_name = args.next_string("Column name")?;
    args.finish()?;

    let set = load_surface(&coord, &topo)?;
    let surface = set.surface(0)?;
    let reference = Surface::new(
        reference.clone(),
        io::read_coord(&reference)?,
        Rc::clone(&surface.topology),
    )?;
    let values = kernel(
        "Surface Areal Distortion",
        geometry_kernels::areal_distortion(surface, &reference),
    )?;
    let mut shape = if output.exists() {
        io::read_surface_shape(&output)?
    } else {
        MetricFile::new(surface.node_count())
    };
    if shape.node_count != surface.node_count() {
        return Err(CommandError::domain(
            format!("{} nodes in {}", surface.node_count(), output.display()),
            format!("{} nodes", shape.node_count),
        ));
    }
    shape.add_column(column_name, values)?;
    io::write_surface_shape(&shape, &output)
}

fn project(surface: &Surface, xyz: [f32; 3]) -> CommandResult<(ProjectionLink, f32)> {
    geometry_kernels::project_point(surface, xyz).ok_or_else(|| {
        CommandError::domain(
            format!("surface tiles in {}", surface.coord_path.display()),
            "surface has no tiles",
        )
    })
}

fn border_projection(args: &mut ArgCursor) -> CommandResult<()> {
    let (coord, topo) = next_surface_files(args)?;
    let input = args.next_filename("Border file")?;
    let output = args.next_filename("Output border projection file")?;
    args.finish()?;
    let set = load_surface(&coord, &topo)?;
    let surface = set.surface(0)?;
    let borders = io::read_border(&input)?;
    let mut projected = BorderProjectionFile {
        header: borders.header.clone(),
        borders: Vec::with_capacity(borders.borders.len()),
    };
    for border in &borders.borders {
        let links = border
            .points
            .iter()
            .map(|p| project(surface, *p).map(|(link, _)| link))
            .collect::<CommandResult<Vec<_>>>()?;
        projected.borders.push(BorderProjection {
            name: border.name.clone(),
            links,
        });
    }
    io::write_border_projection(&projected, &output)
}

fn border_unprojection(args: &mut ArgCursor) -> CommandResult<()> {
    let (coord, topo) = next_surface_files(args)?;
    let input = args.next_filename("Border projection file")?;
    let output = args.next_filename("Output border file")?;
    args.finish()?;
    let mut set = load_surface(&coord, &topo)?;
    let projections = io::read_border_projection(&input)?;
    set.add_border_projection(input.clone(), projections.clone())?;
    let surface = set.surface(0)?;
    let normals = surface.node_normals();
    let borders = BorderFile {
        header: projections.header.clone(),
        borders: projections
            .borders
            .iter()
            .map(|b| Border {
                name: b.name.clone(),
                points: b
                    .links
                    .iter()
                    .map(|link| geometry_kernels::unproject_point(surface, &normals, link, 0.0))
                    .collect(),
            })
            .collect(),
    };
    io::write_border(&borders, &output)
}

/// How far above the surface a projected feature sits.
#[derive(Debug, Clone, Copy)]
enum Placement {
    Keep,
    Fixed(f32),
}

impl Placement {
    fn next(args: &mut ArgCursor) -> CommandResult<Self> {
        let onto = args.next_bool("Onto surface flag")?;
        let above = args.next_float("Onto surface above distance")?;
        Ok(if onto {
            Placement::Fixed(above)
        } else {
            Placement::Keep
        })
    }

    fn offset(self, own: f32) -> f32 {
        match self {
            Placement::Keep => own,
            Placement::Fixed(distance) => distance,
        }
    }
}

fn project_cells(args: &mut ArgCursor, input_name: &str, output_name: &str) -> CommandResult<()> {
    let (coord, topo) = next_surface_files(args)?;
    let input = args.next_filename(input_name)?;
    let output = args.next_filename(output_name)?;
    let placement = Placement::next(args)?;
    args.finish()?;
    let set = load_surface(&coord, &topo)?;
    let surface = set.surface(0)?;
    let cells = io::read_cells(&input)?;
    let mut projections = CellProjectionFile {
        header: cells.header.clone(),
        projections: Vec::with_capacity(cells.cells.len()),
    };
    for cell in &cells.cells {
        let (link, offset) = project(surface, cell.xyz)?;
        projections.projections.push(CellProjection {
            name: cell.name.clone(),
            link,
            offset: placement.offset(offset),
        });
    }
    debug!("projected {} points", projections.projections.len());
    io::write_cell_projection(&projections, &output)
}

fn unproject_cells(
    args: &mut ArgCursor,
    input_name: &str,
    output_name: &str,
    foci: bool,
) -> CommandResult<()> {
    let (coord, topo) = next_surface_files(args)?;
    let input = args.next_filename(input_name)?;
    let output = args.next_filename(output_name)?;
    let placement = Placement::next(args)?;
    args.finish()?;
    let mut set = load_surface(&coord, &topo)?;
    let projections = io::read_cell_projection(&input)?;
    if foci {
        set.add_foci_projection(input.clone(), projections.clone())?;
    } else {
        set.add_cell_projection(input.clone(), projections.clone())?;
    }
    let surface = set.surface(0)?;
    let normals = surface.node_normals();
    let cells = CellFile {
        header: projections.header.clone(),
        cells: projections
            .projections
            .iter()
            .map(|p| Cell {
                name: p.name.clone(),
                xyz: geometry_kernels::unproject_point(
                    surface,
                    &normals,
                    &p.link,
                    placement.offset(p.offset),
                ),
            })
            .collect(),
    };
    io::write_cells(&cells, &output)
}

fn foci_projection(args: &mut ArgCursor) -> CommandResult<()> {
    project_cells(args, "Foci file", "Output foci projection file")
}

fn foci_unprojection(args: &mut ArgCursor) -> CommandResult<()> {
    unproject_cells(args, "Foci projection file", "Output foci file", true)
}

fn cell_projection(args: &mut ArgCursor) -> CommandResult<()> {
    project_cells(args, "Cell file", "Output cell projection file")
}

fn cell_unprojection(args: &mut ArgCursor) -> CommandResult<()> {
    unproject_cells(args, "Cell projection file", "Output cell file", false)
}
