// SPDX-License-Identifier: PMPL-1.0-or-later

//! caret-command: a command-line driver for neuroimaging volume and
//! cortical surface operations.
//!
//! Every invocation names one operation and its positional parameters:
//!
//! ```text
//! caret-command -volume-threshold 128 in.nii my_label:::out.HEAD
//! ```
//!
//! The pieces, bottom up:
//! 1. **io**: readers and writers for volume containers (NIFTI, SPM/Analyze,
//!    AFNI, WUNIL) and the surface-side text formats.
//! 2. **model**: volumes, surfaces and per-node layers, gathered into a
//!    `BrainSet` for a subject.
//! 3. **kernels**: morphology, arithmetic, segmentation, surface geometry,
//!    statistics, rendering and deformation.
//! 4. **ops**: the operation table; each entry carries its own help text and
//!    the handler that runs it.
//! 5. **dispatch**: picks the operation and maps failures to the exit status.

pub mod args;
pub mod dispatch;
pub mod display;
pub mod error;
pub mod io;
pub mod kernels;
pub mod model;
pub mod ops;
pub mod runtime;
pub mod spec_file;
pub mod types;
