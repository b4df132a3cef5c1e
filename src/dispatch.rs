// SPDX-License-Identifier: PMPL-1.0-or-later

//! Command-line entry: pick the operation named by the first argument and
//! run it over the rest.

use crate::args::ArgCursor;
use crate::display;
use crate::error::CommandError;
use crate::ops::{self, Operation};
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::debug;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = -1;

const DEFAULT_PROGRAM: &str = "caret-command";

/// Base name of `argv[0]`, used in help text.
pub fn program_name(argv0: Option<&str>) -> String {
    argv0
        .and_then(|arg| Path::new(arg).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_PROGRAM.to_string())
}

fn print_pointer(program: &str) {
    println!();
    println!("   {} -help          list every operation", program);
    println!("   {} -help-full     describe every operation in detail", program);
    println!();
}

/// True when the operation lists a parameter that is not optional.
fn has_required_params(op: &Operation) -> bool {
    op.params.iter().any(|p| !p.starts_with('['))
}

fn report(err: &CommandError, op: Option<&Operation>, program: &str) {
    if err.is_usage() {
        println!("{}", err);
        if let Some(op) = op {
            println!();
            print!("{}", op.full_help(program));
        }
    } else {
        eprintln!("{}", err);
    }
}

/// Run one invocation and return the process exit status.
pub fn run(argv: Vec<String>) -> i32 {
    let mut argv = argv.into_iter();
    let program = program_name(argv.next().as_deref());
    let Some(flag) = argv.next() else {
        print_pointer(&program);
        return EXIT_FAILURE;
    };
    let Some(op) = ops::find(&flag) else {
        report(&CommandError::UnknownOperation(flag), None, &program);
        return EXIT_FAILURE;
    };

    let params: Vec<String> = argv.collect();
    let bare = params.is_empty() && has_required_params(op);
    debug!("running {} with {} parameters", op.flag, params.len());
    // headless operations run without permission to open windows
    let _windows = op.needs_gui.then(display::allow_windows);

    let mut cursor = ArgCursor::new(program.as_str(), params);
    match panic::catch_unwind(AssertUnwindSafe(|| op.run(&mut cursor))) {
        Ok(Ok(())) => EXIT_SUCCESS,
        Ok(Err(err)) => {
            report(&err, bare.then_some(op), &program);
            EXIT_FAILURE
        }
        // the panic hook has already printed the PROGRAM ERROR line
        Err(_) => EXIT_FAILURE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn program_name_is_the_base_name() {
        assert_eq!(program_name(Some("/usr/local/bin/caret_command")), "caret_command");
        assert_eq!(program_name(None), DEFAULT_PROGRAM);
    }

    #[test]
    fn missing_and_unknown_operations_fail() {
        assert_eq!(run(argv(&["caret-command"])), EXIT_FAILURE);
        assert_eq!(run(argv(&["caret-command", "-not-a-real-op"])), EXIT_FAILURE);
    }

    #[test]
    fn help_succeeds() {
        assert_eq!(run(argv(&["caret-command", "-help"])), EXIT_SUCCESS);
        assert_eq!(run(argv(&["caret-command", "-version"])), EXIT_SUCCESS);
    }

    #[test]
    fn bare_operation_with_parameters_fails() {
        assert_eq!(run(argv(&["caret-command", "-volume-threshold"])), EXIT_FAILURE);
    }

    #[test]
    fn window_permission_ends_with_the_operation() {
        assert_eq!(run(argv(&["caret-command", "-image-view"])), EXIT_FAILURE);
        assert!(!display::windows_allowed());
        assert_eq!(run(argv(&["caret-command", "-version"])), EXIT_SUCCESS);
        assert!(!display::windows_allowed());
    }

    #[test]
    fn optional_only_parameters_do_not_count_as_required() {
        let full = ops::find("-help-full").unwrap();
        assert!(!has_required_params(full));
        assert!(has_required_params(ops::find("-volume-copy").unwrap()));
    }
}
