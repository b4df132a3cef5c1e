// SPDX-License-Identifier: PMPL-1.0-or-later

//! Position-based consumer of the argument vector
//!
//! Every extraction names the parameter it expects so a failure can say
//! which one was missing or malformed. A failed extraction never advances.

use super::output_name::{self, LabeledName};
use crate::error::{CommandError, CommandResult};
use crate::model::volume::VoxelExtent;
use crate::types::{Axis, Orientation};
use clap::ValueEnum;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ArgCursor {
    args: Vec<String>,
    index: usize,
    program: String,
}

impl ArgCursor {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            args,
            index: 0,
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Number of tokens not consumed yet
    pub fn remaining(&self) -> usize {
        self.args.len().saturating_sub(self.index)
    }

    fn peek(&self, name: &str) -> CommandResult<&str> {
        self.args
            .get(self.index)
            .map(String::as_str)
            .ok_or_else(|| CommandError::usage(name, "missing"))
    }

    fn advance<T>(&mut self, value: T) -> CommandResult<T> {
        self.index += 1;
        Ok(value)
    }

    pub fn next_string(&mut self, name: &str) -> CommandResult<String> {
        let token = self.peek(name)?.to_string();
        self.advance(token)
    }

    pub fn next_filename(&mut self, name: &str) -> CommandResult<PathBuf> {
        let token = self.peek(name)?;
        if token.is_empty() {
            return Err(CommandError::usage(name, "file name is empty"));
        }
        let path = PathBuf::from(token);
        self.advance(path)
    }

    /// Consume a file name if one is present; `""` and `NULL` mean absent.
    pub fn next_optional_filename(&mut self, name: &str) -> CommandResult<Option<PathBuf>> {
        if self.remaining() == 0 {
            return Ok(None);
        }
        let token = self.next_string(name)?;
        if token.is_empty() || token == "NULL" {
            Ok(None)
        } else {
            Ok(Some(PathBuf::from(token)))
        }
    }

    pub fn next_int(&mut self, name: &str) -> CommandResult<i64> {
        let token = self.peek(name)?;
        let value = token.trim().parse::<i64>().map_err(|_| {
            CommandError::usage(name, format!("\"{}\" is not an integer", token))
        })?;
        self.advance(value)
    }

    /// Non-negative integer
    pub fn next_count(&mut self, name: &str) -> CommandResult<usize> {
        let token = self.peek(name)?;
        let value = token.trim().parse::<usize>().map_err(|_| {
            CommandError::usage(name, format!("\"{}\" is not a non-negative integer", token))
        })?;
        self.advance(value)
    }

    pub fn next_float(&mut self, name: &str) -> CommandResult<f32> {
        let token = self.peek(name)?;
        let value = token.trim().parse::<f32>().map_err(|_| {
            CommandError::usage(name, format!("\"{}\" is not a floating-point number", token))
        })?;
        self.advance(value)
    }

    /// Accepts exactly `true` or `false`.
    pub fn next_bool(&mut self, name: &str) -> CommandResult<bool> {
        let token = self.peek(name)?;
        let value = match token {
            "true" => true,
            "false" => false,
            other => {
                return Err(CommandError::usage(
                    name,
                    format!("\"{}\" is not a boolean (expected true or false)", other),
                ))
            }
        };
        self.advance(value)
    }

    /// Parse a bounded enumeration through its `ValueEnum` spellings.
    pub fn next_enum<T: ValueEnum>(&mut self, name: &str, ignore_case: bool) -> CommandResult<T> {
        let token = self.peek(name)?;
        let value = T::from_str(token, ignore_case).map_err(|_| {
            CommandError::usage(
                name,
                format!(
                    "\"{}\" is not one of {}",
                    token,
                    possible_values::<T>().join(", ")
                ),
            )
        })?;
        self.advance(value)
    }

    pub fn next_axis(&mut self, name: &str) -> CommandResult<Axis> {
        self.next_enum::<Axis>(name, true)
    }

    pub fn next_orientation(&mut self, name: &str) -> CommandResult<Orientation> {
        let token = self.peek(name)?;
        let orientation =
            Orientation::parse(token).map_err(|detail| CommandError::usage(name, detail))?;
        self.advance(orientation)
    }

    /// One-based column number as presented to the user, returned zero-based.
    pub fn next_column(&mut self, name: &str) -> CommandResult<usize> {
        let token = self.peek(name)?;
        let value = token
            .trim()
            .parse::<usize>()
            .ok()
            .filter(|v| *v >= 1)
            .ok_or_else(|| {
                CommandError::usage(
                    name,
                    format!("\"{}\" is not a column number (columns start at 1)", token),
                )
            })?;
        self.advance(value - 1)
    }

    /// Six integers `xmin xmax ymin ymax zmin zmax`.
    pub fn next_extent(&mut self) -> CommandResult<VoxelExtent> {
        const NAMES: [&str; 6] = ["X-Min", "X-Max", "Y-Min", "Y-Max", "Z-Min", "Z-Max"];
        let start = self.index;
        let mut values = [0i64; 6];
        for (slot, name) in values.iter_mut().zip(NAMES) {
            match self.next_int(name) {
                Ok(v) => *slot = v,
                Err(err) => {
                    self.index = start;
                    return Err(err);
                }
            }
        }
        let extent = VoxelExtent {
            min: [values[0], values[2], values[4]],
            max: [values[1], values[3], values[5]],
        };
        for axis in 0..3 {
            if extent.min[axis] > extent.max[axis] {
                self.index = start;
                return Err(CommandError::usage(
                    NAMES[axis * 2 + 1],
                    format!(
                        "maximum {} is less than minimum {}",
                        extent.max[axis], extent.min[axis]
                    ),
                ));
            }
        }
        Ok(extent)
    }

    /// Output volume name with optional `label:::` prefix.
    pub fn next_output_volume(&mut self, name: &str) -> CommandResult<LabeledName> {
        let token = self.peek(name)?;
        let (label, path) = output_name::split(token);
        if label.chars().any(char::is_whitespace) {
            return Err(CommandError::usage(
                name,
                format!("label \"{}\" may not contain whitespace", label),
            ));
        }
        if path.is_empty() {
            return Err(CommandError::usage(name, "file name is empty"));
        }
        let labeled = LabeledName::new(label, path);
        self.advance(labeled)
    }

    /// Every token left, in order.
    pub fn next_rest(&mut self) -> Vec<String> {
        let rest = self.args[self.index.min(self.args.len())..].to_vec();
        self.index = self.args.len();
        rest
    }

    /// Fail when parameters were supplied beyond what the operation takes.
    pub fn finish(&self) -> CommandResult<()> {
        if self.remaining() == 0 {
            Ok(())
        } else {
            Err(CommandError::usage(
                "extra parameters",
                self.args[self.index..].join(" "),
            ))
        }
    }
}

pub fn possible_values<T: ValueEnum>() -> Vec<String> {
    T::value_variants()
        .iter()
        .filter_map(|v| v.to_possible_value())
        .map(|p| p.get_name().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VolumeWriteType;

    fn cursor(tokens: &[&str]) -> ArgCursor {
        ArgCursor::new(
            "caret-command",
            tokens.iter().map(|t| t.to_string()).collect(),
        )
    }

    #[test]
    fn missing_parameter_names_it() {
        let mut args = cursor(&[]);
        let err = args.next_float("Threshold value").unwrap_err();
        assert_eq!(err.to_string(), "ERROR: Threshold value: missing");
    }

    #[test]
    fn failure_does_not_advance() {
        let mut args = cursor(&["abc", "12"]);
        assert!(args.next_int("Iterations").is_err());
        assert_eq!(args.remaining(), 2);
        assert_eq!(args.next_string("Name").unwrap(), "abc");
        assert_eq!(args.next_int("Iterations").unwrap(), 12);
        assert!(args.finish().is_ok());
    }

    #[test]
    fn orientation_letters_must_be_uppercase() {
        let mut args = cursor(&["lpi", "RAS"]);
        let err = args.next_orientation("Orientation").unwrap_err();
        assert!(err.is_usage());
        assert!(err.to_string().starts_with("ERROR: Orientation:"));
        assert!(err.to_string().contains("invalid orientation character 'l'"));
        assert_eq!(args.remaining(), 2);
        args.next_string("Skipped").unwrap();
        assert_eq!(args.next_orientation("Orientation").unwrap().to_string(), "RAS");
    }

    #[test]
    fn bool_accepts_only_lowercase_literals() {
        let mut args = cursor(&["true", "false", "TRUE"]);
        assert!(args.next_bool("Flag").unwrap());
        assert!(!args.next_bool("Flag").unwrap());
        let err = args.next_bool("Flag").unwrap_err();
        assert!(err.to_string().contains("\"TRUE\""));
    }

    #[test]
    fn axis_parser_accepts_exactly_xyz() {
        for token in ["X", "Y", "Z", "x", "y", "z"] {
            assert!(cursor(&[token]).next_axis("Axis").is_ok(), "{token}");
        }
        for token in ["W", "xy", "", "1"] {
            assert!(cursor(&[token]).next_axis("Axis").is_err(), "{token}");
        }
    }

    #[test]
    fn write_type_lists_accepted_values() {
        let err = cursor(&["MINC"])
            .next_enum::<VolumeWriteType>("Volume file type", false)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "ERROR: Volume file type: \"MINC\" is not one of AFNI, NIFTI, SPM, WUNIL"
        );
    }

    #[test]
    fn column_numbers_are_one_based() {
        assert_eq!(cursor(&["1"]).next_column("Column").unwrap(), 0);
        assert!(cursor(&["0"]).next_column("Column").is_err());
    }

    #[test]
    fn extent_rejects_inverted_range_without_advancing() {
        let mut args = cursor(&["0", "10", "5", "2", "0", "1"]);
        assert!(args.next_extent().is_err());
        assert_eq!(args.remaining(), 6);

        let mut args = cursor(&["0", "10", "2", "5", "0", "1"]);
        let extent = args.next_extent().unwrap();
        assert_eq!(extent.min, [0, 2, 0]);
        assert_eq!(extent.max, [10, 5, 1]);
    }

    #[test]
    fn labeled_output_rejects_whitespace() {
        let err = cursor(&["my label:::out.nii"])
            .next_output_volume("Output Volume")
            .unwrap_err();
        assert!(err.to_string().contains("whitespace"));

        let named = cursor(&["lab:::out.nii"])
            .next_output_volume("Output Volume")
            .unwrap();
        assert_eq!(named.label(), Some("lab"));
    }

    #[test]
    fn finish_reports_extra_tokens() {
        let args = cursor(&["stray", "tokens"]);
        let err = args.finish().unwrap_err();
        assert_eq!(err.to_string(), "ERROR: extra parameters: stray tokens");
    }
}
