/*!
 * Common test utilities for the linewise test suite
 */

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tempfile::TempDir;

use linewise::subtitle::{SubtitleLine, SubtitleTrack};


/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let file_path = dir.join(filename);
    fs::write(&file_path, content)?;
    Ok(file_path)
}

/// Creates a sample subtitle file for testing
pub fn create_test_subtitle(dir: &Path, filename: &str) -> Result<PathBuf> {
    let content = r#"1
00:00:01,000 --> 00:00:04,000
This is a test subtitle.

2
00:00:05,000 --> 00:00:09,000
It contains multiple entries.

3
00:00:10,000 --> 00:00:14,000
For testing purposes.
"#;
    create_test_file(dir, filename, content)
}

/// Builds an in-memory track with the given number of lines
pub fn make_track(count: usize) -> SubtitleTrack {
    SubtitleTrack::from_lines(
        (1..=count)
            .map(|i| {
                SubtitleLine::new(
                    i,
                    format!("Line {}", i),
                    format!("00:00:{:02},000 --> 00:00:{:02},500", i, i),
                )
            })
            .collect(),
    )
}
