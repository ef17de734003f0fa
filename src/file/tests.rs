// SPDX-FileCopyrightText: The midiview authors
// SPDX-License-Identifier: MPL-2.0

use std::io::Write as _;

use super::*;

#[test]
fn parse_file_patterns() {
    assert_eq!(vec!["svg"], file_patterns("*.svg"));
    assert_eq!(vec!["svg", "png"], file_patterns("*.svg;*.png"));
    assert_eq!(vec!["svg", "png"], file_patterns(" *.svg, *.png ;*.svg"));
    assert_eq!(vec!["mid"], file_patterns("mid"));
    assert!(file_patterns("").is_empty());
    assert!(file_patterns("*").is_empty());
    assert!(file_patterns("*.svg;*.*").is_empty());
}

#[test]
fn mock_returns_configured_selection() {
    let mut selector = MockFileSelector::new(Some(PathBuf::from("/tmp/theme.svg")));
    assert_eq!(
        Some(PathBuf::from("/tmp/theme.svg")),
        selector.select_file("Load theme", "*.svg")
    );
    selector.set_selection(None);
    assert_eq!(None, selector.select_file("Save theme", "*.svg"));
    assert_eq!(
        &[
            ("Load theme".to_owned(), "*.svg".to_owned()),
            ("Save theme".to_owned(), "*.svg".to_owned()),
        ],
        selector.requests()
    );
}

#[test]
fn mock_cancelled_by_default() {
    let mut selector = MockFileSelector::default();
    assert_eq!(None, selector.select_file("Open", "*"));
}

#[test]
fn mock_file_exists() {
    let selector = MockFileSelector::default().with_existing_file("/settings.json");
    assert!(selector.file_exists(Path::new("/settings.json")));
    assert!(!selector.file_exists(Path::new("/missing.json")));
}

#[test]
fn readable_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("theme.svg");
    assert!(!is_readable_file(&path));

    let mut file = File::create(&path).unwrap();
    file.write_all(b"<svg/>").unwrap();
    drop(file);
    assert!(is_readable_file(&path));

    // Directories are not files
    assert!(!is_readable_file(dir.path()));
}

#[cfg(feature = "native-dialog")]
#[test]
fn native_selector_checks_files_without_dialog() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    File::create(&path).unwrap();

    let selector: Box<dyn FileSelector> = Box::new(NativeFileSelector::new());
    assert!(selector.file_exists(&path));
    assert!(!selector.file_exists(&dir.path().join("missing.json")));
    assert!(!selector.file_exists(dir.path()));
}

#[cfg(feature = "native-dialog")]
#[test]
fn native_selector_starts_without_location() {
    assert_eq!(None, NativeFileSelector::default().location());
}
