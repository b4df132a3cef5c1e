// SPDX-License-Identifier: PMPL-1.0-or-later

//! Handler-boundary error type
//!
//! Codecs and kernels work in `anyhow::Result`; everything that crosses an
//! operation handler is converted into one of these variants so the
//! dispatcher can render the uniform diagnostics and choose the stream.

use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    /// Missing, extra or unparsable parameter
    #[error("ERROR: {param}: {detail}")]
    Usage { param: String, detail: String },

    #[error("ERROR reading {path}: {detail}")]
    Read { path: String, detail: String },

    #[error("ERROR writing {path}: {detail}")]
    Write { path: String, detail: String },

    /// Domain precondition violation
    #[error("ERROR: {expected}: {found}")]
    Domain { expected: String, found: String },

    /// A numerical kernel signalled failure
    #[error("ERROR: {operation}: {message}")]
    Kernel { operation: String, message: String },

    #[error("ERROR: Unrecognized operation: {0}")]
    UnknownOperation(String),

    #[error("OUT OF MEMORY: {0}")]
    OutOfMemory(String),
}

pub type CommandResult<T> = std::result::Result<T, CommandError>;

impl CommandError {
    pub fn usage(param: impl Into<String>, detail: impl Into<String>) -> Self {
        CommandError::Usage {
            param: param.into(),
            detail: detail.into(),
        }
    }

    pub fn domain(expected: impl Into<String>, found: impl Into<String>) -> Self {
        CommandError::Domain {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub fn kernel(operation: &str, err: anyhow::Error) -> Self {
        CommandError::Kernel {
            operation: operation.to_string(),
            message: format!("{err:#}"),
        }
    }

    /// Wrap a codec failure for `path`, keeping the whole context chain.
    pub fn read(path: &Path, err: anyhow::Error) -> Self {
        match err.downcast::<CommandError>() {
            Ok(oom @ CommandError::OutOfMemory(_)) => oom,
            Ok(other) => CommandError::Read {
                path: path.display().to_string(),
                detail: other.to_string(),
            },
            Err(err) => CommandError::Read {
                path: path.display().to_string(),
                detail: format!("{err:#}"),
            },
        }
    }

    pub fn write(path: &Path, err: anyhow::Error) -> Self {
        CommandError::Write {
            path: path.display().to_string(),
            detail: format!("{err:#}"),
        }
    }

    /// Usage problems are reported on standard output next to the help text;
    /// everything else goes to standard error.
    pub fn is_usage(&self) -> bool {
        matches!(
            self,
            CommandError::Usage { .. } | CommandError::UnknownOperation(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{anyhow, Context};

    #[test]
    fn usage_message_names_parameter() {
        let err = CommandError::usage("Threshold value", "missing");
        assert_eq!(err.to_string(), "ERROR: Threshold value: missing");
        assert!(err.is_usage());
    }

    #[test]
    fn read_error_keeps_context_chain() {
        let inner: anyhow::Result<()> = Err(anyhow!("short read"));
        let err = inner.context("reading NIfTI header").unwrap_err();
        let wrapped = CommandError::read(Path::new("in.nii"), err);
        assert_eq!(
            wrapped.to_string(),
            "ERROR reading in.nii: reading NIfTI header: short read"
        );
        assert!(!wrapped.is_usage());
    }

    #[test]
    fn out_of_memory_survives_read_wrapping() {
        let err = anyhow::Error::new(CommandError::OutOfMemory("voxels".into()));
        let wrapped = CommandError::read(Path::new("big.nii"), err);
        assert!(matches!(wrapped, CommandError::OutOfMemory(_)));
    }
}
