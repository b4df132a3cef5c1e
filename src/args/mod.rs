// SPDX-License-Identifier: PMPL-1.0-or-later

//! Parameter parsing for operation handlers

pub mod cursor;
pub mod output_name;

pub use cursor::{possible_values, ArgCursor};
pub use output_name::LabeledName;
