// SPDX-License-Identifier: PMPL-1.0-or-later

//! `label:::path` output names

use std::path::{Path, PathBuf};

pub const LABEL_DELIMITER: &str = ":::";

/// An output path with an optional descriptive label override
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledName {
    pub label: String,
    pub path: PathBuf,
}

impl LabeledName {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `None` when the file's own label should be kept.
    pub fn label(&self) -> Option<&str> {
        if self.label.is_empty() {
            None
        } else {
            Some(&self.label)
        }
    }
}

/// Split an output name at the first `:::`.
pub fn split(candidate: &str) -> (String, String) {
    match candidate.find(LABEL_DELIMITER) {
        Some(pos) => (
            candidate[..pos].to_string(),
            candidate[pos + LABEL_DELIMITER.len()..].to_string(),
        ),
        None => (String::new(), candidate.to_string()),
    }
}

pub fn join(label: &str, path: &str) -> String {
    if label.is_empty() {
        path.to_string()
    } else {
        format!("{}{}{}", label, LABEL_DELIMITER, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_path_has_empty_label() {
        assert_eq!(split("out.nii"), (String::new(), "out.nii".to_string()));
    }

    #[test]
    fn labeled_path_splits_and_rejoins() {
        for original in ["my_label:::out.HEAD", "a:::dir/b.nii.gz", "x:::"] {
            let (label, path) = split(original);
            assert_eq!(join(&label, &path), original);
        }
        let (label, path) = split("my_label:::out.HEAD");
        assert_eq!(label, "my_label");
        assert_eq!(path, "out.HEAD");
    }

    #[test]
    fn only_first_delimiter_splits() {
        let (label, path) = split("lab:::odd:::name.nii");
        assert_eq!(label, "lab");
        assert_eq!(path, "odd:::name.nii");
    }
}
