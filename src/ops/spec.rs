// SPDX-License-Identifier: PMPL-1.0-or-later

use super::Operation;
use crate::args::ArgCursor;
use crate::error::CommandResult;
use crate::spec_file;
use crate::types::Structure;
use tracing::info;

pub(super) const OPERATIONS: &[Operation] = &[
    Operation {
        flag: "-spec-file-create",
        title: "SPEC FILE CREATE",
        params: &[
            "<species>",
            "<subject>",
            "<structure>",
            "<stereotaxic-space>",
            "<category>",
            "[spec-file-name]",
        ],
        description: "Create a specification file holding only a header.  The\n\
                      default name is <species>.<subject>.<structure>.spec, with\n\
                      the structure abbreviated to L, R, LR or CEREBELLUM.\n\
                      \n\
                      Structures: LEFT RIGHT BOTH CEREBELLUM (CORTEX_LEFT,\n\
                      CORTEX_RIGHT and CORTEX_BOTH are accepted too)",
        needs_gui: false,
        execute: create,
    },
    Operation {
        flag: "-spec-file-add",
        title: "SPEC FILE ADD",
        params: &["<spec-file>", "<spec-file-tag>", "<file-name>", "[second-file-name]"],
        description: "Add a file to a specification file, creating the\n\
                      specification file if it does not exist.  Adding an entry\n\
                      that is already present changes nothing.  Two-file volume\n\
                      containers name the voxel file as the second file.",
        needs_gui: false,
        execute: add,
    },
];

fn create(args: &mut ArgCursor) -> CommandResult<()> {
    let species = args.next_string("Species")?;
    let subject = args.next_string("Subject")?;
    let structure = args.next_enum::<Structure>("Structure", true)?;
    let space = args.next_string("Stereotaxic space")?;
    let category = args.next_string("Category")?;
    let path = args.next_optional_filename("Spec file name")?;
    args.finish()?;
    let written = spec_file::create(
        &species,
        &subject,
        structure,
        &space,
        &category,
        path.as_deref(),
    )?;
    info!("created {}", written.display());
    Ok(())
}

fn add(args: &mut ArgCursor) -> CommandResult<()> {
    let spec = args.next_filename("Spec file")?;
    let tag = args.next_string("Spec file tag")?;
    let file = args.next_string("File name")?;
    let secondary = args.next_optional_filename("Second file name")?;
    args.finish()?;
    let secondary = secondary.map(|p| p.to_string_lossy().into_owned());
    spec_file::add_entry(&spec, &tag, &file, secondary.as_deref())
}
