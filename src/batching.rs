/*!
 * Batch splitting for subtitle tracks.
 *
 * A batch is a bounded, ordered group of lines sent together in one
 * translation request. Batches partition the track exactly: no gaps, no
 * overlaps, no empty batches, and the last batch may be short.
 */

use crate::subtitle::SubtitleLine;

/// A bounded, ordered group of subtitle lines
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Position of this batch within the session, starting at 0
    pub ordinal: usize,

    /// Lines in source order
    pub lines: Vec<SubtitleLine>,
}

impl Batch {
    /// Number of lines in the batch
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the batch has no lines. The splitter never produces one.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// The line indices contained in this batch, in order
    pub fn indices(&self) -> Vec<usize> {
        self.lines.iter().map(|line| line.index).collect()
    }
}

/// Lazy iterator over batches of at most `max_batch_size` lines
pub struct BatchSplitter<'a> {
    remaining: &'a [SubtitleLine],
    max_batch_size: usize,
    next_ordinal: usize,
}

impl<'a> BatchSplitter<'a> {
    /// Create a splitter over the given track.
    ///
    /// A `max_batch_size` of zero is treated as one line per batch rather
    /// than looping forever.
    pub fn new(lines: &'a [SubtitleLine], max_batch_size: usize) -> Self {
        Self {
            remaining: lines,
            max_batch_size: max_batch_size.max(1),
            next_ordinal: 0,
        }
    }
}

impl Iterator for BatchSplitter<'_> {
    type Item = Batch;

    fn next(&mut self) -> Option<Batch> {
        if self.remaining.is_empty() {
            return None;
        }

        let take = self.max_batch_size.min(self.remaining.len());
        let (head, tail) = self.remaining.split_at(take);
        self.remaining = tail;

        let batch = Batch {
            ordinal: self.next_ordinal,
            lines: head.to_vec(),
        };
        self.next_ordinal += 1;
        Some(batch)
    }
}

/// Split a track eagerly into batches
pub fn split_into_batches(lines: &[SubtitleLine], max_batch_size: usize) -> Vec<Batch> {
    BatchSplitter::new(lines, max_batch_size).collect()
}
