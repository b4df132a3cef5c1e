// SPDX-License-Identifier: PMPL-1.0-or-later

use super::{find, operations, separator, Operation};
use crate::args::ArgCursor;
use crate::error::{CommandError, CommandResult};

pub(super) const OPERATIONS: &[Operation] = &[
    Operation {
        flag: "-help",
        title: "HELP",
        params: &[],
        description: "List every operation, one per line.",
        needs_gui: false,
        execute: brief,
    },
    Operation {
        flag: "-help-full",
        title: "HELP FULL",
        params: &["[operation-flag]"],
        description: "Print the usage of every operation, or of just the named one.",
        needs_gui: false,
        execute: full,
    },
    Operation {
        flag: "-version",
        title: "VERSION",
        params: &[],
        description: "Print the program version.",
        needs_gui: false,
        execute: version,
    },
];

fn brief(args: &mut ArgCursor) -> CommandResult<()> {
    args.finish()?;
    for op in operations() {
        println!("{}", op.brief_help());
    }
    Ok(())
}

fn full(args: &mut ArgCursor) -> CommandResult<()> {
    let flag = args.next_optional_filename("Operation flag")?;
    args.finish()?;
    match flag {
        Some(flag) => {
            let flag = flag.to_string_lossy();
            let op = find(&flag).ok_or_else(|| CommandError::UnknownOperation(flag.to_string()))?;
            print!("{}", op.full_help(args.program()));
        }
        None => {
            for op in operations() {
                println!("{}", separator());
                print!("{}", op.full_help(args.program()));
            }
            println!("{}", separator());
        }
    }
    Ok(())
}

fn version(args: &mut ArgCursor) -> CommandResult<()> {
    args.finish()?;
    println!("{} {}", args.program(), env!("CARGO_PKG_VERSION"));
    Ok(())
}
