// SPDX-FileCopyrightText: The midiview authors
// SPDX-License-Identifier: MPL-2.0

use std::{
    collections::HashSet,
    fs::File,
    path::{Path, PathBuf},
};

#[cfg(feature = "native-dialog")]
mod native;
#[cfg(feature = "native-dialog")]
pub use self::native::NativeFileSelector;

#[cfg(test)]
mod tests;

/// Selection of files, e.g. for importing or exporting settings.
pub trait FileSelector {
    /// Ask for a file.
    ///
    /// `patterns` is a list of wildcard patterns like `"*.svg;*.png"`,
    /// see [`file_patterns()`].
    ///
    /// Returns `None` if the selection has been cancelled.
    fn select_file(&mut self, title: &str, patterns: &str) -> Option<PathBuf>;

    /// Check if the file exists and is readable.
    ///
    /// Never fails, inaccessible files simply don't exist.
    #[must_use]
    fn file_exists(&self, path: &Path) -> bool;
}

/// Extract the file extensions from a list of wildcard patterns.
///
/// Patterns are separated by `;`, `,` or whitespace. Patterns that match
/// any file (`*` or `*.*`) result in an empty list.
#[must_use]
pub fn file_patterns(patterns: &str) -> Vec<&str> {
    let mut extensions = Vec::new();
    for pattern in patterns
        .split(|c: char| c == ';' || c == ',' || c.is_whitespace())
        .filter(|pattern| !pattern.is_empty())
    {
        if pattern == "*" || pattern == "*.*" {
            return Vec::new();
        }
        let extension = pattern.strip_prefix("*.").unwrap_or(pattern);
        if !extension.is_empty() && !extensions.contains(&extension) {
            extensions.push(extension);
        }
    }
    extensions
}

/// Check if `path` refers to a regular file that could be opened for reading.
#[must_use]
pub fn is_readable_file(path: &Path) -> bool {
    path.is_file() && File::open(path).is_ok()
}

/// Test double that never shows any dialog.
#[derive(Debug, Default)]
pub struct MockFileSelector {
    selection: Option<PathBuf>,
    existing_files: HashSet<PathBuf>,
    requests: Vec<(String, String)>,
}

impl MockFileSelector {
    /// Answer all requests with `selection`, `None` simulates cancellation.
    #[must_use]
    pub fn new(selection: Option<PathBuf>) -> Self {
        Self {
            selection,
            ..Default::default()
        }
    }

    pub fn set_selection(&mut self, selection: Option<PathBuf>) {
        self.selection = selection;
    }

    /// Let [`FileSelector::file_exists()`] return `true` for `path`.
    #[must_use]
    pub fn with_existing_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.existing_files.insert(path.into());
        self
    }

    /// Title and patterns of all requests, in order.
    #[must_use]
    pub fn requests(&self) -> &[(String, String)] {
        &self.requests
    }
}

impl FileSelector for MockFileSelector {
    fn select_file(&mut self, title: &str, patterns: &str) -> Option<PathBuf> {
        self.requests.push((title.to_owned(), patterns.to_owned()));
        self.selection.clone()
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.existing_files.contains(path)
    }
}
