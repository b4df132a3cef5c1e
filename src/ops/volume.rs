// SPDX-License-Identifier: PMPL-1.0-or-later

//! Volume creation, inspection, arithmetic and geometry edits

use super::{kernel, Operation};
use crate::args::{ArgCursor, LabeledName};
use crate::error::{CommandError, CommandResult};
use crate::io;
use crate::kernels::math::{self, BinaryOp, UnaryOp};
use crate::model::{BrainSet, Volume};
use crate::types::{StereotaxicSpace, STEREOTAXIC_SPACES};
use std::path::{Path, PathBuf};
use tracing::debug;

pub(super) const OPERATIONS: &[Operation] = &[
    Operation {
        flag: "-volume-copy",
        title: "VOLUME COPY",
        params: &["<input-volume>", "<output-volume>"],
        description: "Copy a volume, converting the file type when the output\n\
                      extension names a different container.",
        needs_gui: false,
        execute: copy,
    },
    Operation {
        flag: "-volume-info",
        title: "VOLUME INFORMATION",
        params: &["<input-volume>"],
        description: "Print the dimensions, spacing, origin, orientation and\n\
                      voxel range of a volume.",
        needs_gui: false,
        execute: info,
    },
    Operation {
        flag: "-volume-create",
        title: "VOLUME CREATE",
        params: &[
            "<x-dim> <y-dim> <z-dim>",
            "  | <stereotaxic-space>",
            "  | <x-dim> <y-dim> <z-dim> <x-origin> <y-origin> <z-origin>",
            "    <x-spacing> <y-spacing> <z-spacing> <orientation>",
            "<output-volume>",
        ],
        description: "Create a volume with every voxel zero.  The grid comes from\n\
                      explicit dimensions (origin 0, spacing 1, LPI), from a\n\
                      stereotaxic space, or from a full parameter list.\n\
                      \n\
                      Stereotaxic spaces: 711-2B 711-2C AFNI FLIRT MRITOTAL SPM99\n\
                      SPM2 WU-7112B-111 WU-7112B-222 WU-7112B-333",
        needs_gui: false,
        execute: create,
    },
    Operation {
        flag: "-volume-threshold",
        title: "VOLUME THRESHOLD",
        params: &["<threshold>", "<input-volume>", "<output-volume>"],
        description: "Voxels at or above the threshold become 255, all others 0.",
        needs_gui: false,
        execute: threshold,
    },
    Operation {
        flag: "-volume-math",
        title: "VOLUME MATH",
        params: &[
            "<operation>",
            "<input-volume-1>",
            "<input-volume-2>",
            "<input-volume-3>",
            "<output-volume>",
        ],
        description: "Combine volumes voxel by voxel.\n\
                      \n\
                      Operations: ADD SUBTRACT MULTIPLY DIVIDE AND OR MAX MIN\n\
                      AVERAGE SUBTRACT_POSITIVE DIFF_RATIO\n\
                      \n\
                      The third volume is read only by DIFF_RATIO, which computes\n\
                      (v1 - v2) / v3.  Pass NULL or \"\" otherwise.",
        needs_gui: false,
        execute: binary_math,
    },
    Operation {
        flag: "-volume-math-unary",
        title: "VOLUME MATH UNARY",
        params: &["<operation>", "<input-volume>", "<output-volume>", "<scalar>"],
        description: "Apply an operation to every voxel.\n\
                      \n\
                      Operations: ABS_VALUE ADD_SCALAR MULTIPLY_SCALAR CEILING FLOOR\n\
                      FIX_NAN LOG2 EXP ONE_MINUS_VALUE SQRT SQUARE\n\
                      \n\
                      The scalar is used by ADD_SCALAR, MULTIPLY_SCALAR, CEILING\n\
                      (upper clamp) and FLOOR (lower clamp).",
        needs_gui: false,
        execute: unary_math,
    },
    Operation {
        flag: "-volume-set-origin",
        title: "VOLUME SET ORIGIN",
        params: &["<input-volume>", "<output-volume>", "<x> <y> <z>"],
        description: "Set the stereotaxic position of the first voxel.",
        needs_gui: false,
        execute: set_origin,
    },
    Operation {
        flag: "-volume-set-spacing",
        title: "VOLUME SET SPACING",
        params: &["<input-volume>", "<output-volume>", "<x> <y> <z>"],
        description: "Set the voxel size along each axis.",
        needs_gui: false,
        execute: set_spacing,
    },
    Operation {
        flag: "-volume-set-orientation",
        title: "VOLUME SET ORIENTATION",
        params: &["<input-volume>", "<output-volume>", "<orientation>"],
        description: "Declare the orientation of the voxel axes, three letters\n\
                      from L R P A I S (for example LPI), without moving voxels.",
        needs_gui: false,
        execute: set_orientation,
    },
    Operation {
        flag: "-volume-pad",
        title: "VOLUME PAD",
        params: &[
            "<input-volume>",
            "<output-volume>",
            "<neg-x> <pos-x> <neg-y> <pos-y> <neg-z> <pos-z>",
        ],
        description: "Add zero voxels on each face; the origin moves so existing\n\
                      voxels keep their stereotaxic position.",
        needs_gui: false,
        execute: pad,
    },
    Operation {
        flag: "-volume-resize",
        title: "VOLUME RESIZE",
        params: &[
            "<input-volume>",
            "<output-volume>",
            "<x-min> <x-max> <y-min> <y-max> <z-min> <z-max>",
        ],
        description: "Crop or grow the grid to the half-open voxel extent.",
        needs_gui: false,
        execute: resize,
    },
    Operation {
        flag: "-volume-shift-axis",
        title: "VOLUME SHIFT AXIS",
        params: &["<input-volume>", "<output-volume>", "<axis>", "<offset>"],
        description: "Move voxels along X, Y or Z; vacated voxels become zero.",
        needs_gui: false,
        execute: shift_axis,
    },
    Operation {
        flag: "-volume-find-limits",
        title: "VOLUME FIND LIMITS",
        params: &["<input-volume>", "<output-text-file>"],
        description: "Write the half-open extent of the non-zero voxels as\n\
                      x-min x-max y-min y-max z-min z-max.",
        needs_gui: false,
        execute: find_limits,
    },
    Operation {
        flag: "-volume-rescale",
        title: "VOLUME RESCALE",
        params: &[
            "<input-volume>",
            "<output-volume>",
            "<input-min> <input-max>",
            "<output-min> <output-max>",
        ],
        description: "Map the input range linearly onto the output range,\n\
                      clamping values outside the input range.",
        needs_gui: false,
        execute: rescale,
    },
    Operation {
        flag: "-volume-make-rectangle",
        title: "VOLUME MAKE RECTANGLE",
        params: &[
            "<input-volume>",
            "<output-volume>",
            "<x-min> <x-max> <y-min> <y-max> <z-min> <z-max>",
            "<value>",
        ],
        description: "Set every voxel inside the half-open extent to the value.",
        needs_gui: false,
        execute: make_rectangle,
    },
    Operation {
        flag: "-volume-make-sphere",
        title: "VOLUME MAKE SPHERE",
        params: &[
            "<input-volume>",
            "<output-volume>",
            "<center-i> <center-j> <center-k>",
            "<radius>",
            "<value>",
        ],
        description: "Set every voxel within the radius (in voxels) of the centre\n\
                      to the value.",
        needs_gui: false,
        execute: make_sphere,
    },
    Operation {
        flag: "-volume-blur",
        title: "VOLUME BLUR",
        params: &["<input-volume>", "<output-volume>"],
        description: "Replace each voxel with the mean of its 3x3x3 neighbourhood.",
        needs_gui: false,
        execute: blur,
    },
    Operation {
        flag: "-volume-gradient",
        title: "VOLUME GRADIENT",
        params: &["<input-volume>", "<output-vector-volume>"],
        description: "Write the central-difference gradient as a three-component\n\
                      vector volume.",
        needs_gui: false,
        execute: gradient,
    },
    Operation {
        flag: "-volume-vector-magnitude",
        title: "VOLUME VECTOR MAGNITUDE",
        params: &["<input-vector-volume>", "<output-volume>"],
        description: "Write the length of each voxel's vector.",
        needs_gui: false,
        execute: vector_magnitude,
    },
    Operation {
        flag: "-volume-set-region-names",
        title: "VOLUME SET REGION NAMES",
        params: &["<input-volume>", "<output-volume>", "<region-names-text-file>"],
        description: "Store region names, one per line of the text file, with a\n\
                      volume.  Only NIFTI and AFNI files keep them.",
        needs_gui: false,
        execute: set_region_names,
    },
];

pub(super) fn read(path: &Path) -> CommandResult<Volume> {
    io::read_volume(path)
}

pub(super) fn input_output(args: &mut ArgCursor) -> CommandResult<(PathBuf, LabeledName)> {
    let input = args.next_filename("Input volume")?;
    let output = args.next_output_volume("Output volume")?;
    Ok((input, output))
}

fn copy(args: &mut ArgCursor) -> CommandResult<()> {
    let (input, output) = input_output(args)?;
    args.finish()?;
    io::write_volume(&read(&input)?, &output)
}

fn info(args: &mut ArgCursor) -> CommandResult<()> {
    let input = args.next_filename("Input volume")?;
    args.finish()?;
    let volume = read(&input)?;
    let [i, j, k] = volume.dims;
    let [sx, sy, sz] = volume.spacing;
    let [ox, oy, oz] = volume.origin;
    let (lo, hi) = volume.range();
    println!("dimensions: {}, {}, {}, {}", i, j, k, volume.components);
    println!("spacing: {}, {}, {}", sx, sy, sz);
    println!("origin: {}, {}, {}", ox, oy, oz);
    println!("orientation: {}", volume.orientation);
    println!("voxel range: {}, {}", lo, hi);
    println!("data type: {}", volume.data_type.name());
    println!("label: {}", volume.label);
    if !volume.region_names.is_empty() {
        println!("region names: {}", volume.region_names.len());
    }
    Ok(())
}

fn space_names() -> String {
    STEREOTAXIC_SPACES
        .iter()
        .map(|s| s.name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn next_dims(args: &mut ArgCursor) -> CommandResult<[usize; 3]> {
    Ok([
        args.next_count("X Dimension")?,
        args.next_count("Y Dimension")?,
        args.next_count("Z Dimension")?,
    ])
}

fn next_triple(args: &mut ArgCursor, names: [&str; 3]) -> CommandResult<[f32; 3]> {
    Ok([
        args.next_float(names[0])?,
        args.next_float(names[1])?,
        args.next_float(names[2])?,
    ])
}

fn create(args: &mut ArgCursor) -> CommandResult<()> {
    let volume = match args.remaining() {
        2 => {
            let token = args.next_string("Stereotaxic space")?;
            let space = StereotaxicSpace::lookup(&token).ok_or_else(|| {
                CommandError::usage(
                    "Stereotaxic space",
                    format!("\"{}\" is not one of {}", token, space_names()),
                )
            })?;
            let mut volume = Volume::new(space.dimensions, 1)?;
            volume.spacing = [space.spacing; 3];
            volume.origin = space.origin;
            volume
        }
        11 => {
            let dims = next_dims(args)?;
            let origin = next_triple(args, ["X Origin", "Y Origin", "Z Origin"])?;
            let spacing = next_triple(args, ["X Spacing", "Y Spacing", "Z Spacing"])?;
            let orientation = args.next_orientation("Orientation")?;
            let mut volume = Volume::new(dims, 1)?;
            volume.origin = origin;
            volume.spacing = spacing;
            volume.orientation = orientation;
            volume
        }
        _ => Volume::new(next_dims(args)?, 1)?,
    };
    let output = args.next_output_volume("Output volume")?;
    args.finish()?;
    debug!("creating {:?} volume", volume.dims);
    io::write_volume(&volume, &output)
}

fn threshold(args: &mut ArgCursor) -> CommandResult<()> {
    let value = args.next_float("Threshold value")?;
    let (input, output) = input_output(args)?;
    args.finish()?;
    let mut volume = read(&input)?;
    math::threshold(&mut volume, value);
    io::write_volume(&volume, &output)
}

fn binary_math(args: &mut ArgCursor) -> CommandResult<()> {
    let op = args.next_enum::<BinaryOp>("Operation", false)?;
    let first = args.next_filename("Input volume 1")?;
    let second = args.next_filename("Input volume 2")?;
    let third = args.next_optional_filename("Input volume 3")?;
    let output = args.next_output_volume("Output volume")?;
    args.finish()?;
    if op.needs_third_operand() && third.is_none() {
        return Err(CommandError::usage(
            "Input volume 3",
            "DIFF_RATIO requires a third volume",
        ));
    }
    let a = read(&first)?;
    let b = read(&second)?;
    let c = match third.filter(|_| op.needs_third_operand()) {
        Some(path) => Some(read(&path)?),
        None => None,
    };
    let result = kernel("Volume Math", math::binary(op, &a, &b, c.as_ref()))?;
    io::write_volume(&result, &output)
}

fn unary_math(args: &mut ArgCursor) -> CommandResult<()> {
    let op = args.next_enum::<UnaryOp>("Operation", false)?;
    let (input, output) = input_output(args)?;
    let scalar = args.next_float("Scalar")?;
    args.finish()?;
    let mut volume = read(&input)?;
    math::unary(op, &mut volume, scalar);
    io::write_volume(&volume, &output)
}

fn set_origin(args: &mut ArgCursor) -> CommandResult<()> {
    let (input, output) = input_output(args)?;
    let origin = next_triple(args, ["X Origin", "Y Origin", "Z Origin"])?;
    args.finish()?;
    let mut volume = read(&input)?;
    volume.origin = origin;
    io::write_volume(&volume, &output)
}

fn set_spacing(args: &mut ArgCursor) -> CommandResult<()> {
    let (input, output) = input_output(args)?;
    let spacing = next_triple(args, ["X Spacing", "Y Spacing", "Z Spacing"])?;
    args.finish()?;
    if let Some(bad) = spacing.iter().find(|s| **s <= 0.0) {
        return Err(CommandError::usage(
            "Spacing",
            format!("\"{}\" is not a positive voxel size", bad),
        ));
    }
    let mut volume = read(&input)?;
    volume.spacing = spacing;
    io::write_volume(&volume, &output)
}

fn set_orientation(args: &mut ArgCursor) -> CommandResult<()> {
    let (input, output) = input_output(args)?;
    let orientation = args.next_orientation("Orientation")?;
    args.finish()?;
    let mut volume = read(&input)?;
    volume.orientation = orientation;
    io::write_volume(&volume, &output)
}

fn pad(args: &mut ArgCursor) -> CommandResult<()> {
    let (input, output) = input_output(args)?;
    let mut amounts = [0usize; 6];
    for (slot, name) in amounts.iter_mut().zip([
        "Negative X padding",
        "Positive X padding",
        "Negative Y padding",
        "Positive Y padding",
        "Negative Z padding",
        "Positive Z padding",
    ]) {
        *slot = args.next_count(name)?;
    }
    args.finish()?;
    let volume = read(&input)?.padded(
        [amounts[0], amounts[2], amounts[4]],
        [amounts[1], amounts[3], amounts[5]],
    )?;
    io::write_volume(&volume, &output)
}

fn resize(args: &mut ArgCursor) -> CommandResult<()> {
    let (input, output) = input_output(args)?;
    let extent = args.next_extent()?;
    args.finish()?;
    let volume = read(&input)?.resized(&extent)?;
    io::write_volume(&volume, &output)
}

fn shift_axis(args: &mut ArgCursor) -> CommandResult<()> {
    let (input, output) = input_output(args)?;
    let axis = args.next_axis("Axis")?;
    let offset = args.next_int("Offset")?;
    args.finish()?;
    let mut volume = read(&input)?;
    kernel(
        "Volume Shift Axis",
        math::shift_axis(&mut volume, axis.index(), offset),
    )?;
    io::write_volume(&volume, &output)
}

fn find_limits(args: &mut ArgCursor) -> CommandResult<()> {
    let input = args.next_filename("Input volume")?;
    let output = args.next_filename("Output text file")?;
    args.finish()?;
    let volume = read(&input)?;
    let extent = volume.nonzero_extent().ok_or_else(|| {
        CommandError::domain(
            format!("non-zero voxels in {}", input.display()),
            "every voxel is zero",
        )
    })?;
    let line = format!(
        "{} {} {} {} {} {}",
        extent.min[0], extent.max[0], extent.min[1], extent.max[1], extent.min[2], extent.max[2]
    );
    println!("{}", line);
    io::write_text(&format!("{}\n", line), &output)
}

fn rescale(args: &mut ArgCursor) -> CommandResult<()> {
    let (input, output) = input_output(args)?;
    let in_min = args.next_float("Input minimum")?;
    let in_max = args.next_float("Input maximum")?;
    let out_min = args.next_float("Output minimum")?;
    let out_max = args.next_float("Output maximum")?;
    args.finish()?;
    let mut volume = read(&input)?;
    kernel(
        "Volume Rescale",
        math::rescale(&mut volume, in_min, in_max, out_min, out_max),
    )?;
    io::write_volume(&volume, &output)
}

fn make_rectangle(args: &mut ArgCursor) -> CommandResult<()> {
    let (input, output) = input_output(args)?;
    let extent = args.next_extent()?;
    let value = args.next_float("Value")?;
    args.finish()?;
    let mut volume = read(&input)?;
    math::fill_extent(&mut volume, &extent, value);
    io::write_volume(&volume, &output)
}

fn make_sphere(args: &mut ArgCursor) -> CommandResult<()> {
    let (input, output) = input_output(args)?;
    let center = [
        args.next_int("Center I")?,
        args.next_int("Center J")?,
        args.next_int("Center K")?,
    ];
    let radius = args.next_float("Radius")?;
    let value = args.next_float("Value")?;
    args.finish()?;
    let mut volume = read(&input)?;
    math::fill_sphere(&mut volume, center, radius, value);
    io::write_volume(&volume, &output)
}

/// Operations that map one whole volume to a new one.
fn derive(
    args: &mut ArgCursor,
    operation: &str,
    f: fn(&Volume) -> anyhow::Result<Volume>,
) -> CommandResult<()> {
    let (input, output) = input_output(args)?;
    args.finish()?;
    let result = kernel(operation, f(&read(&input)?))?;
    io::write_volume(&result, &output)
}

fn blur(args: &mut ArgCursor) -> CommandResult<()> {
    derive(args, "Volume Blur", math::blur)
}

fn gradient(args: &mut ArgCursor) -> CommandResult<()> {
    derive(args, "Volume Gradient", math::gradient)
}

fn vector_magnitude(args: &mut ArgCursor) -> CommandResult<()> {
    derive(args, "Volume Vector Magnitude", math::vector_magnitude)
}

fn set_region_names(args: &mut ArgCursor) -> CommandResult<()> {
    let (input, output) = input_output(args)?;
    let names = args.next_filename("Region names file")?;
    args.finish()?;
    let mut set = BrainSet::new();
    set.attach_region_names(&names)?;
    let mut volume = read(&input)?;
    volume.region_names = set.region_names;
    io::write_volume(&volume, &output)
}
