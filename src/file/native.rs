// SPDX-FileCopyrightText: The midiview authors
// SPDX-License-Identifier: MPL-2.0

use std::path::{Path, PathBuf};

use native_dialog::FileDialog;

use super::{file_patterns, is_readable_file, FileSelector};

/// Native file dialogs of the operating system.
///
/// Blocks the calling thread until the dialog has been closed.
///
/// The dialogs of `native-dialog` 0.6 have no title, the requested
/// title is only logged.
#[derive(Debug, Default)]
pub struct NativeFileSelector {
    location: Option<PathBuf>,
}

impl NativeFileSelector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The directory of the most recently selected file.
    #[must_use]
    pub fn location(&self) -> Option<&Path> {
        self.location.as_deref()
    }
}

impl FileSelector for NativeFileSelector {
    fn select_file(&mut self, title: &str, patterns: &str) -> Option<PathBuf> {
        log::debug!("{title}: selecting file matching \"{patterns}\"");
        let extensions = file_patterns(patterns);
        let mut dialog = FileDialog::new();
        if let Some(location) = &self.location {
            dialog = dialog.set_location(location);
        }
        if !extensions.is_empty() {
            dialog = dialog.add_filter(patterns, &extensions);
        }
        match dialog.show_open_single_file() {
            Ok(Some(path)) => {
                log::debug!("Selected file {}", path.display());
                self.location = path.parent().map(Path::to_path_buf);
                Some(path)
            }
            Ok(None) => {
                log::debug!("File selection cancelled");
                None
            }
            Err(err) => {
                log::warn!("Failed to show file dialog: {err}");
                None
            }
        }
    }

    fn file_exists(&self, path: &Path) -> bool {
        is_readable_file(path)
    }
}
