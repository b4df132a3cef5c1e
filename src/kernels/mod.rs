// SPDX-License-Identifier: PMPL-1.0-or-later

//! Built-in numerical kernels
//!
//! Kernels take and return domain objects and report failure through
//! `anyhow`; handlers wrap those errors with `CommandError::kernel`.

pub mod deformation;
pub mod math;
pub mod morphology;
pub mod render;
pub mod segmentation;
pub mod statistics;
pub mod surface;
