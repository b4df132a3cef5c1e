// SPDX-License-Identifier: PMPL-1.0-or-later

//! Scenes and the operations that show images

use super::{kernel, Operation};
use crate::args::ArgCursor;
use crate::display::{self, ImageTarget};
use crate::error::{CommandError, CommandResult};
use crate::io;
use crate::kernels::render;
use crate::model::scene::{Scene, SceneFile, SurfaceScene, VolumeScene};
use crate::model::BrainSet;
use crate::types::{CoordinateType, SurfaceView};
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::debug;

pub(super) const OPERATIONS: &[Operation] = &[
    Operation {
        flag: "-scene-create",
        title: "SCENE CREATE",
        params: &[
            "<scene-file>",
            "<scene-name>",
            "<image-width>",
            "<image-height>",
            "SURFACE <coord-type> <view>",
            "  | VOLUME <axis> <slice>",
        ],
        description: "Append a scene to a scene file, creating the file if needed.\n\
                      A surface scene shows the brain set's surface of the given\n\
                      coordinate type (FIDUCIAL, INFLATED, ...) from a standard view:\n\
                      LATERAL MEDIAL DORSAL VENTRAL ANTERIOR POSTERIOR.  A volume\n\
                      scene shows one slice (0-based) of the first volume.",
        needs_gui: false,
        execute: scene_create,
    },
    Operation {
        flag: "-show-surface",
        title: "SHOW SURFACE",
        params: &[
            "<coord-file>",
            "<topo-file>",
            "<view>",
            "<image-width>",
            "<image-height>",
            "[output-image-file]",
        ],
        description: "Render a surface from a standard view.  Without an output\n\
                      image the surface is shown in a window; otherwise the image\n\
                      is saved as JPEG.",
        needs_gui: true,
        execute: show_surface,
    },
    Operation {
        flag: "-show-volume",
        title: "SHOW VOLUME",
        params: &["<volume-file>", "<axis>", "<slice>", "[output-image-file]"],
        description: "Render one slice (0-based) of a volume in grayscale.\n\
                      Without an output image the slice is shown in a window;\n\
                      otherwise the image is saved as JPEG.",
        needs_gui: true,
        execute: show_volume,
    },
    Operation {
        flag: "-show-scene",
        title: "SHOW SCENE",
        params: &[
            "<spec-file>",
            "<scene-file>",
            "<scene-number>",
            "[output-image-file]",
        ],
        description: "Load the brain set named by the specification file and\n\
                      render a scene (numbered from 1).  Without an output image\n\
                      the scene is shown in a window; otherwise the image is saved\n\
                      as JPEG.",
        needs_gui: true,
        execute: show_scene,
    },
    Operation {
        flag: "-image-view",
        title: "IMAGE VIEW",
        params: &["<image-file>", "[output-image-file]"],
        description: "Show an image in a window, or convert it to JPEG when an\n\
                      output image is named.",
        needs_gui: true,
        execute: image_view,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum SceneKind {
    #[value(name = "SURFACE")]
    Surface,
    #[value(name = "VOLUME")]
    Volume,
}

fn next_size(args: &mut ArgCursor) -> CommandResult<(u32, u32)> {
    let mut size = [0u32; 2];
    for (slot, name) in size.iter_mut().zip(["Image width", "Image height"]) {
        let value = args.next_count(name)?;
        *slot = u32::try_from(value)
            .ok()
            .filter(|v| *v > 0)
            .ok_or_else(|| CommandError::usage(name, format!("\"{}\" is not a usable image size", value)))?;
    }
    Ok((size[0], size[1]))
}

fn show(image: &RgbImage, title: &str, output: Option<&Path>) -> CommandResult<()> {
    match output {
        Some(path) => display::present(image, ImageTarget::File(path)),
        None => display::present(image, ImageTarget::Window { title }),
    }
}

fn scene_create(args: &mut ArgCursor) -> CommandResult<()> {
    let path = args.next_filename("Scene file")?;
    let name = args.next_string("Scene name")?;
    let (width, height) = next_size(args)?;
    let kind = args.next_enum::<SceneKind>("Scene type", true)?;
    let mut scene = Scene {
        name,
        width,
        height,
        surface: None,
        volume: None,
    };
    match kind {
        SceneKind::Surface => {
            let coord_type = args.next_string("Coordinate type")?;
            if CoordinateType::parse(&coord_type) == CoordinateType::Unknown {
                return Err(CommandError::usage(
                    "Coordinate type",
                    format!("\"{}\" is not a surface type", coord_type),
                ));
            }
            let view = args.next_enum::<SurfaceView>("View", true)?;
            scene.surface = Some(SurfaceScene { coord_type, view });
        }
        SceneKind::Volume => {
            let axis = args.next_axis("Axis")?;
            let slice = args.next_count("Slice")?;
            scene.volume = Some(VolumeScene { axis, slice });
        }
    }
    args.finish()?;
    let mut scenes = if path.exists() {
        io::read_scene(&path)?
    } else {
        SceneFile::default()
    };
    scenes.scenes.push(scene);
    io::write_scene(&scenes, &path)
}

fn show_surface(args: &mut ArgCursor) -> CommandResult<()> {
    let coord = args.next_filename("Coordinate file")?;
    let topo = args.next_filename("Topology file")?;
    let view = args.next_enum::<SurfaceView>("View", true)?;
    let (width, height) = next_size(args)?;
    let output = args.next_optional_filename("Output image file")?;
    args.finish()?;
    let set = BrainSet::from_topo_coord(&topo, &coord)?;
    let image = kernel(
        "Show Surface",
        render::render_surface(set.surface(0)?, view, width, height),
    )?;
    show(&image, &coord.to_string_lossy(), output.as_deref())
}

fn show_volume(args: &mut ArgCursor) -> CommandResult<()> {
    let input = args.next_filename("Volume file")?;
    let axis = args.next_axis("Axis")?;
    let slice = args.next_count("Slice")?;
    let output = args.next_optional_filename("Output image file")?;
    args.finish()?;
    let volume = io::read_volume(&input)?;
    let image = kernel("Show Volume", render::render_slice(&volume, axis, slice))?;
    show(&image, &input.to_string_lossy(), output.as_deref())
}

fn render_scene(set: &BrainSet, scene: &Scene) -> CommandResult<RgbImage> {
    if let Some(surface_scene) = &scene.surface {
        let coord_type = CoordinateType::parse(&surface_scene.coord_type);
        let surface = set.surface_of_type(coord_type)?;
        return kernel(
            "Show Scene",
            render::render_surface(surface, surface_scene.view, scene.width, scene.height),
        );
    }
    if let Some(volume_scene) = &scene.volume {
        let volume = set.volume(0)?;
        return kernel(
            "Show Scene",
            render::render_slice(volume, volume_scene.axis, volume_scene.slice),
        );
    }
    Err(CommandError::domain(
        format!("surface or volume in scene \"{}\"", scene.name),
        "scene is empty",
    ))
}

fn show_scene(args: &mut ArgCursor) -> CommandResult<()> {
    let spec = args.next_filename("Spec file")?;
    let scene_path = args.next_filename("Scene file")?;
    let number = args.next_count("Scene number")?;
    let output = args.next_optional_filename("Output image file")?;
    args.finish()?;
    let mut set = BrainSet::from_spec_file(&spec)?;
    set.attach_scene(&scene_path)?;
    let scene = set.scenes.scene(number).cloned().ok_or_else(|| {
        CommandError::domain(
            format!(
                "scene number between 1 and {}",
                set.scenes.scenes.len()
            ),
            format!("scene {} requested", number),
        )
    })?;
    debug!("rendering scene \"{}\"", scene.name);
    let image = render_scene(&set, &scene)?;
    show(&image, &scene.name, output.as_deref())
}

fn image_view(args: &mut ArgCursor) -> CommandResult<()> {
    let input: PathBuf = args.next_filename("Image file")?;
    let output = args.next_optional_filename("Output image file")?;
    args.finish()?;
    let image = io::read_image(&input)?;
    show(&image, &input.to_string_lossy(), output.as_deref())
}
