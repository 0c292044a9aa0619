/*!
 * Alignment validation for batch attempts.
 *
 * The single authority on whether a parsed response satisfies the
 * one-translation-per-line contract for the batch that produced it.
 * Pure function, no side effects.
 */

use std::collections::{BTreeSet, HashMap};

use crate::batching::Batch;
use crate::errors::AlignmentError;
use crate::response::TranslationEntry;

/// Verify that the parsed entries line up one-to-one with the batch.
///
/// Checks, in order of severity: duplicate indices, indices outside the
/// batch, missing indices, and empty translations for non-empty originals.
/// The first violated rule is reported; a retry fixes them in that order
/// anyway.
pub fn validate_alignment(batch: &Batch, entries: &[TranslationEntry]) -> Result<(), AlignmentError> {
    let batch_indices: BTreeSet<usize> = batch.lines.iter().map(|line| line.index).collect();

    let mut seen_counts: HashMap<usize, usize> = HashMap::new();
    for entry in entries {
        *seen_counts.entry(entry.index).or_insert(0) += 1;
    }

    let duplicates: BTreeSet<usize> = seen_counts
        .iter()
        .filter(|&(_, &count)| count > 1)
        .map(|(&index, _)| index)
        .collect();
    if !duplicates.is_empty() {
        return Err(AlignmentError::DuplicateIndices(duplicates));
    }

    let extra: BTreeSet<usize> = seen_counts
        .keys()
        .filter(|index| !batch_indices.contains(index))
        .copied()
        .collect();
    if !extra.is_empty() {
        return Err(AlignmentError::ExtraIndices(extra));
    }

    let missing: BTreeSet<usize> = batch_indices
        .iter()
        .filter(|index| !seen_counts.contains_key(index))
        .copied()
        .collect();
    if !missing.is_empty() {
        return Err(AlignmentError::MissingIndices(missing));
    }

    let empty: BTreeSet<usize> = entries
        .iter()
        .filter(|entry| entry.text.trim().is_empty())
        .filter(|entry| {
            batch
                .lines
                .iter()
                .find(|line| line.index == entry.index)
                .is_some_and(|line| !line.text.trim().is_empty())
        })
        .map(|entry| entry.index)
        .collect();
    if !empty.is_empty() {
        return Err(AlignmentError::EmptyTranslations(empty));
    }

    Ok(())
}
