// SPDX-License-Identifier: PMPL-1.0-or-later

//! Operation descriptors and the dispatch table
//!
//! Each descriptor carries the text its help is printed from and the entry
//! point that executes it, so help and behaviour come from one place.

mod deformation;
mod display;
mod help;
mod metric;
mod segmentation;
mod spec;
mod statistics;
mod surface;
mod volume;
mod volume_morph;

use crate::args::ArgCursor;
use crate::error::{CommandError, CommandResult};
use colored::Colorize;
use std::fmt::Write as _;

pub type Handler = fn(&mut ArgCursor) -> CommandResult<()>;

#[derive(Debug, Clone, Copy)]
pub struct Operation {
    pub flag: &'static str,
    pub title: &'static str,
    /// One line per positional parameter, in order
    pub params: &'static [&'static str],
    pub description: &'static str,
    /// Only the display operations construct a window
    pub needs_gui: bool,
    pub execute: Handler,
}

const SEPARATOR: &str =
    "------------------------------------------------------------------------------";

/// Every operation in dispatch and help order.
pub fn operations() -> impl Iterator<Item = &'static Operation> {
    help::OPERATIONS
        .iter()
        .chain(volume::OPERATIONS)
        .chain(volume_morph::OPERATIONS)
        .chain(segmentation::OPERATIONS)
        .chain(surface::OPERATIONS)
        .chain(metric::OPERATIONS)
        .chain(statistics::OPERATIONS)
        .chain(spec::OPERATIONS)
        .chain(deformation::OPERATIONS)
        .chain(display::OPERATIONS)
}

pub fn find(flag: &str) -> Option<&'static Operation> {
    operations().find(|op| op.flag == flag)
}

impl Operation {
    /// `   <TITLE>   <flag>`
    pub fn brief_help(&self) -> String {
        format!("   {}   {}", self.title, self.flag)
    }

    /// Usage block with shell continuations, then the description.
    pub fn full_help(&self, program: &str) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.title.bold());
        if self.params.is_empty() {
            let _ = writeln!(out, "   {} {}", program, self.flag);
        } else {
            let _ = writeln!(out, "   {} {} \\", program, self.flag);
            for (n, param) in self.params.iter().enumerate() {
                let continuation = if n + 1 < self.params.len() { " \\" } else { "" };
                let _ = writeln!(out, "      {}{}", param, continuation);
            }
        }
        out.push('\n');
        for line in self.description.lines() {
            if line.is_empty() {
                out.push('\n');
            } else {
                let _ = writeln!(out, "      {}", line);
            }
        }
        out
    }

    pub fn run(&self, args: &mut ArgCursor) -> CommandResult<()> {
        (self.execute)(args)
    }
}

pub fn separator() -> &'static str {
    SEPARATOR
}

/// Wrap a kernel failure with the name of the operation that ran it.
pub(crate) fn kernel<T>(operation: &str, result: anyhow::Result<T>) -> CommandResult<T> {
    result.map_err(|err| CommandError::kernel(operation, err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn flags_are_unique_and_well_formed() {
        let mut seen = HashSet::new();
        for op in operations() {
            assert!(seen.insert(op.flag), "duplicate flag {}", op.flag);
            assert!(op.flag.starts_with('-'));
            assert!(op.flag[1..]
                .chars()
                .all(|c| c.is_ascii_lowercase() || c == '-'));
            assert_eq!(op.title, op.title.to_uppercase(), "{}", op.flag);
        }
    }

    #[test]
    fn only_display_operations_need_a_window() {
        let gui: Vec<_> = operations()
            .filter(|op| op.needs_gui)
            .map(|op| op.flag)
            .collect();
        assert_eq!(
            gui,
            ["-show-surface", "-show-volume", "-show-scene", "-image-view"]
        );
    }

    #[test]
    fn full_help_lists_parameters_with_continuations() {
        colored::control::set_override(false);
        let op = find("-volume-threshold").unwrap();
        let help = op.full_help("caret-command");
        let lines: Vec<_> = help.lines().collect();
        assert_eq!(lines[0], op.title);
        assert_eq!(lines[1], "   caret-command -volume-threshold \\");
        assert!(lines[2].ends_with(" \\"));
        assert!(!lines[op.params.len() + 1].ends_with('\\'));
    }

    #[test]
    fn brief_help_is_fixed_format() {
        let op = find("-volume-copy").unwrap();
        assert_eq!(op.brief_help(), format!("   {}   -volume-copy", op.title));
    }
}
