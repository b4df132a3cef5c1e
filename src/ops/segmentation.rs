// SPDX-License-Identifier: PMPL-1.0-or-later

use super::volume::read;
use super::{kernel, Operation};
use crate::args::{ArgCursor, LabeledName};
use crate::error::{CommandError, CommandResult};
use crate::io;
use crate::kernels::segmentation::{self, OperationCode, PaddingCode, SegmentationParams};
use crate::spec_file;
use crate::types::VolumeWriteType;
use tracing::info;

pub(super) const OPERATIONS: &[Operation] = &[Operation {
    flag: "-volume-segment",
    title: "VOLUME SEGMENTATION",
    params: &[
        "<input-anatomy-volume>",
        "<spec-file>",
        "<operation-code>",
        "<gray-matter-peak>",
        "<white-matter-peak>",
        "<padding-code>",
        "<write-volume-type>",
    ],
    description: "Segment an anatomy volume.  The segmentation is written next\n\
                  to the anatomy as <anatomy-stem>_segmentation and added to\n\
                  the specification file.\n\
                  \n\
                  The operation code has 15 characters, each Y or N, selecting\n\
                  in order: disconnect eye and skull, disconnect hindbrain,\n\
                  high-threshold hindbrain, cut corpus callosum, segment, fill\n\
                  ventricles, error correct, generate surfaces, reduce polygons,\n\
                  topology correct, inflated, very inflated, ellipsoidal, hull,\n\
                  attributes.  Segment, fill ventricles and error correct are\n\
                  built in; selecting another processing step fails.\n\
                  \n\
                  The padding code has 6 characters, each Y or N, for the\n\
                  faces -X +X -Y +Y -Z +Z.  Each Y adds 30 voxels on that face\n\
                  while the steps run.\n\
                  \n\
                  Write types: AFNI NIFTI SPM WUNIL",
    needs_gui: false,
    execute: segment,
}];

fn segment(args: &mut ArgCursor) -> CommandResult<()> {
    let anatomy_path = args.next_filename("Input anatomy volume")?;
    let spec_path = args.next_filename("Spec file")?;
    let code_text = args.next_string("Operation code")?;
    let code = OperationCode::parse(&code_text)
        .map_err(|e| CommandError::usage("Operation code", e.to_string()))?;
    let gray_peak = args.next_float("Gray matter peak")?;
    let white_peak = args.next_float("White matter peak")?;
    let padding_text = args.next_string("Padding code")?;
    let padding = PaddingCode::parse(&padding_text)
        .map_err(|e| CommandError::usage("Padding code", e.to_string()))?;
    let write_type = args.next_enum::<VolumeWriteType>("Write volume type", true)?;
    args.finish()?;

    let anatomy = read(&anatomy_path)?;
    let params = SegmentationParams {
        gray_peak,
        white_peak,
    };
    let result = kernel(
        "Volume Segmentation",
        segmentation::run(&anatomy, &code, &padding, &params),
    )?;

    let stem = format!("{}_segmentation", io::volume_stem(&anatomy_path));
    let output = io::path_for_write_type(&stem, write_type);
    io::write_volume(&result, &LabeledName::new("segmentation", &output))?;
    info!("wrote segmentation {}", output.display());

    let secondary = io::data_file_path(&output).map(|p| spec_file::entry_path(&spec_path, &p));
    spec_file::add_entry(
        &spec_path,
        "volume-segmentation-file",
        &spec_file::entry_path(&spec_path, &output),
        secondary.as_deref(),
    )
}
