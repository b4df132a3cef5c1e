// SPDX-License-Identifier: PMPL-1.0-or-later

//! Binary morphology operations on segmentation volumes

use super::volume::{input_output, read};
use super::{kernel, Operation};
use crate::args::ArgCursor;
use crate::error::CommandResult;
use crate::io;
use crate::kernels::morphology::{self, SculptMode};
use crate::model::Volume;

pub(super) const OPERATIONS: &[Operation] = &[
    Operation {
        flag: "-volume-dilate",
        title: "VOLUME DILATE",
        params: &["<input-volume>", "<output-volume>", "<iterations>"],
        description: "Grow the non-zero region by one voxel per iteration.",
        needs_gui: false,
        execute: dilate,
    },
    Operation {
        flag: "-volume-erode",
        title: "VOLUME ERODE",
        params: &["<input-volume>", "<output-volume>", "<iterations>"],
        description: "Shrink the non-zero region by one voxel per iteration.",
        needs_gui: false,
        execute: erode,
    },
    Operation {
        flag: "-volume-dilate-erode",
        title: "VOLUME DILATE ERODE",
        params: &[
            "<input-volume>",
            "<output-volume>",
            "<dilation-iterations>",
            "<erosion-iterations>",
        ],
        description: "Dilate, then erode.  Closes small gaps in a segmentation.",
        needs_gui: false,
        execute: dilate_erode,
    },
    Operation {
        flag: "-volume-fill-holes",
        title: "VOLUME FILL HOLES",
        params: &["<input-volume>", "<output-volume>"],
        description: "Set every zero region not connected to the volume boundary\n\
                      to 255.",
        needs_gui: false,
        execute: fill_holes,
    },
    Operation {
        flag: "-volume-flood-fill",
        title: "VOLUME FLOOD FILL",
        params: &["<input-volume>", "<output-volume>", "<seed-i> <seed-j> <seed-k>"],
        description: "Keep only the connected non-zero region holding the seed\n\
                      voxel (0-based indices).",
        needs_gui: false,
        execute: flood_fill,
    },
    Operation {
        flag: "-volume-remove-islands",
        title: "VOLUME REMOVE ISLANDS",
        params: &["<input-volume>", "<output-volume>"],
        description: "Keep only the largest connected non-zero region.",
        needs_gui: false,
        execute: remove_islands,
    },
    Operation {
        flag: "-volume-sculpt",
        title: "VOLUME SCULPT",
        params: &[
            "<mode>",
            "<seed-i> <seed-j> <seed-k>",
            "<x-min> <x-max> <y-min> <y-max> <z-min> <z-max>",
            "<iterations>",
            "<other-volume>",
            "<input-volume>",
            "<output-volume>",
        ],
        description: "Grow the non-zero region inside the extent, admitting only\n\
                      voxels where the other volume is non-zero (AND) or zero\n\
                      (AND-NOT).  The SEED modes then keep only the region\n\
                      connected to the seed.\n\
                      \n\
                      Modes: AND SEED-AND AND-NOT SEED-AND-NOT",
        needs_gui: false,
        execute: sculpt,
    },
    Operation {
        flag: "-volume-mask-volume",
        title: "VOLUME MASK WITH VOLUME",
        params: &["<input-volume>", "<output-volume>", "<mask-volume>"],
        description: "Zero voxels wherever the mask volume is zero.",
        needs_gui: false,
        execute: mask_volume,
    },
    Operation {
        flag: "-volume-mask-extent",
        title: "VOLUME MASK WITH EXTENT",
        params: &[
            "<input-volume>",
            "<output-volume>",
            "<x-min> <x-max> <y-min> <y-max> <z-min> <z-max>",
        ],
        description: "Zero voxels outside the half-open voxel extent.",
        needs_gui: false,
        execute: mask_extent,
    },
];

fn next_seed(args: &mut ArgCursor) -> CommandResult<[usize; 3]> {
    Ok([
        args.next_count("Seed I")?,
        args.next_count("Seed J")?,
        args.next_count("Seed K")?,
    ])
}

/// Read, apply `f`, write. Parameters after the output come from `params`.
fn morph<P>(
    args: &mut ArgCursor,
    params: impl FnOnce(&mut ArgCursor) -> CommandResult<P>,
    f: impl FnOnce(&mut Volume, P) -> CommandResult<()>,
) -> CommandResult<()> {
    let (input, output) = input_output(args)?;
    let p = params(args)?;
    args.finish()?;
    let mut volume = read(&input)?;
    f(&mut volume, p)?;
    io::write_volume(&volume, &output)
}

fn dilate(args: &mut ArgCursor) -> CommandResult<()> {
    morph(
        args,
        |a| a.next_count("Iterations"),
        |v, n| {
            morphology::dilate(v, n);
            Ok(())
        },
    )
}

fn erode(args: &mut ArgCursor) -> CommandResult<()> {
    morph(
        args,
        |a| a.next_count("Iterations"),
        |v, n| {
            morphology::erode(v, n);
            Ok(())
        },
    )
}

fn dilate_erode(args: &mut ArgCursor) -> CommandResult<()> {
    morph(
        args,
        |a| Ok((a.next_count("Dilation iterations")?, a.next_count("Erosion iterations")?)),
        |v, (d, e)| {
            morphology::dilate(v, d);
            morphology::erode(v, e);
            Ok(())
        },
    )
}

fn fill_holes(args: &mut ArgCursor) -> CommandResult<()> {
    morph(
        args,
        |_| Ok(()),
        |v, ()| {
            morphology::fill_holes(v);
            Ok(())
        },
    )
}

fn flood_fill(args: &mut ArgCursor) -> CommandResult<()> {
    morph(args, next_seed, |v, seed| {
        kernel("Volume Flood Fill", morphology::flood_fill(v, seed))
    })
}

fn remove_islands(args: &mut ArgCursor) -> CommandResult<()> {
    morph(
        args,
        |_| Ok(()),
        |v, ()| {
            morphology::remove_islands(v);
            Ok(())
        },
    )
}

fn sculpt(args: &mut ArgCursor) -> CommandResult<()> {
    let mode = args.next_enum::<SculptMode>("Sculpt mode", false)?;
    let seed = next_seed(args)?;
    let extent = args.next_extent()?;
    let iterations = args.next_count("Iterations")?;
    let other = args.next_filename("Other volume")?;
    let (input, output) = input_output(args)?;
    args.finish()?;
    let other = read(&other)?;
    let mut volume = read(&input)?;
    kernel(
        "Volume Sculpt",
        morphology::sculpt(&mut volume, mode, seed, &extent, iterations, &other),
    )?;
    io::write_volume(&volume, &output)
}

fn mask_volume(args: &mut ArgCursor) -> CommandResult<()> {
    morph(
        args,
        |a| a.next_filename("Mask volume"),
        |v, mask_path| {
            let mask = read(&mask_path)?;
            kernel("Volume Mask", morphology::mask_with_volume(v, &mask))
        },
    )
}

fn mask_extent(args: &mut ArgCursor) -> CommandResult<()> {
    morph(
        args,
        |a| a.next_extent(),
        |v, extent| {
            morphology::mask_with_extent(v, &extent);
            Ok(())
        },
    )
}
