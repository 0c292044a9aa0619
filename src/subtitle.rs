/*!
 * Subtitle line model and thin SRT-shaped I/O.
 *
 * The engine itself never interprets timing: a line's timing field is an
 * opaque blob carried through the session and written back verbatim. The
 * load/save helpers here exist for the CLI and tests; any real container
 * handling (styling, ASS/VTT specifics) belongs to the caller.
 */

use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

// Matches an SRT-style cue timing line, used only to recognize block shape
static TIMING_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*\d{1,2}:\d{2}:\d{2}[,.]\d{3}\s*-->\s*\d{1,2}:\d{2}:\d{2}[,.]\d{3}")
        .expect("timing regex is valid")
});

/// A single subtitle line as the engine sees it.
///
/// Immutable once created: the orchestrator produces new values instead of
/// mutating lines in place.
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleLine {
    /// Unique, stable index in source order
    pub index: usize,

    /// Original text to be translated
    pub text: String,

    /// Opaque timing blob, preserved round-trip and never interpreted
    pub timing: String,
}

impl SubtitleLine {
    /// Create a new subtitle line
    pub fn new(index: usize, text: impl Into<String>, timing: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
            timing: timing.into(),
        }
    }
}

impl fmt::Display for SubtitleLine {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.index)?;
        writeln!(f, "{}", self.timing)?;
        writeln!(f, "{}", self.text)
    }
}

/// An ordered subtitle track plus its source language tag
#[derive(Debug, Clone, Default)]
pub struct SubtitleTrack {
    /// Lines in source order
    pub lines: Vec<SubtitleLine>,
}

impl SubtitleTrack {
    /// Create a track from pre-built lines
    pub fn from_lines(lines: Vec<SubtitleLine>) -> Self {
        Self { lines }
    }

    /// Number of lines in the track
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the track has no lines
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Parse an SRT-shaped file into a track.
    ///
    /// Only the block structure is interpreted: cue number, timing line,
    /// text lines until a blank line. The timing line is stored verbatim.
    /// Cue numbers from the file are ignored in favour of a fresh 1-based
    /// index so the track invariant (unique, ordered indices) always holds.
    pub fn load_srt(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read subtitle file {}", path.display()))?;
        let track = Self::parse_srt(&content)?;
        debug!("Loaded {} lines from {}", track.len(), path.display());
        Ok(track)
    }

    /// Parse SRT-shaped content from a string
    pub fn parse_srt(content: &str) -> Result<Self> {
        let mut lines = Vec::new();
        let mut next_index = 1usize;

        for block in content.replace("\r\n", "\n").split("\n\n") {
            let block = block.trim();
            if block.is_empty() {
                continue;
            }

            let mut rows = block.lines();
            let first = rows.next().unwrap_or_default().trim();

            // The cue number row is optional in the wild; the timing row is not
            let timing = if TIMING_LINE_REGEX.is_match(first) {
                first.to_string()
            } else {
                let second = rows.next().unwrap_or_default().trim();
                if !TIMING_LINE_REGEX.is_match(second) {
                    return Err(anyhow!("Malformed subtitle block: {}", first));
                }
                second.to_string()
            };

            let text = rows.collect::<Vec<_>>().join("\n").trim().to_string();
            lines.push(SubtitleLine::new(next_index, text, timing));
            next_index += 1;
        }

        Ok(Self::from_lines(lines))
    }

    /// Write the track back out in SRT shape.
    ///
    /// Timing blobs are emitted exactly as they were read.
    pub fn save_srt(&self, path: &Path) -> Result<()> {
        let mut output = String::new();
        for line in &self.lines {
            output.push_str(&line.to_string());
            output.push('\n');
        }
        fs::write(path, output)
            .with_context(|| format!("Failed to write subtitle file {}", path.display()))?;
        debug!("Wrote {} lines to {}", self.len(), path.display());
        Ok(())
    }
}
