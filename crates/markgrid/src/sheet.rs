//! Per-sheet results and grading aggregation.
//!
//! [`SheetResult`] is a plain value: every field an external reporter needs
//! is present, and status/tallies are always derived from the current item
//! state by [`recompute`], a pure reducer, never an incremental patch.

use crate::classify::ItemResult;
use crate::key::AnswerKey;
use crate::normalize;

/// Sheet-level processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Fiducial detection or rectification failed; nothing was scored.
    FailedMarker,
    /// At least one row is blank, multi-marked, or flagged for review.
    NeedsReview,
    /// Every row is confidently classified or manually resolved.
    Graded,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::FailedMarker => "FAILED_MARKER",
            Status::NeedsReview => "NEEDS_REVIEW",
            Status::Graded => "GRADED",
        };
        f.write_str(s)
    }
}

/// Correct/wrong tally over the keyed subset of items.
///
/// Rows without a chosen option are neither correct nor counted as attempted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Tally {
    /// Items with a key entry.
    pub keyed: usize,
    /// Keyed items answered correctly.
    pub correct: usize,
    /// Keyed items answered incorrectly.
    pub wrong: usize,
}

/// Result for one free-response row.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FreeResponseResult {
    /// Raw OCR text after letter/digit confusion mapping.
    pub raw: String,
    /// Text after fraction-artifact repair.
    pub corrected: String,
    /// Canonical comparable text, or `None` on grammar mismatch.
    pub normalized: Option<String>,
    /// OCR backend confidence, if reported.
    pub confidence: Option<f32>,
    /// Whether an operator replaced the recognized answer.
    pub manual: bool,
}

impl FreeResponseResult {
    /// An empty row (no OCR ran, or the backend failed).
    pub fn empty() -> Self {
        Self {
            raw: String::new(),
            corrected: String::new(),
            normalized: None,
            confidence: None,
            manual: false,
        }
    }
}

/// All results for one photographed sheet.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SheetResult {
    /// Caller-supplied label, typically the photo filename.
    pub source: String,
    /// Sheet-level status, derived by [`recompute`].
    pub status: Status,
    /// Per-row verdicts, one per scored row. Empty on marker failure.
    pub items: Vec<ItemResult>,
    /// Per-row free-response results. Empty when the template has none.
    pub free: Vec<FreeResponseResult>,
    /// Multiple-choice tally, derived by [`recompute`].
    pub choice_tally: Tally,
    /// Free-response tally, derived by [`recompute`].
    pub free_tally: Tally,
    /// Diagnostic reason for a marker failure.
    pub failure: Option<String>,
}

impl SheetResult {
    /// A sheet on which marker detection failed: no scoring was attempted and
    /// the reason is reported instead of a silent zero score.
    pub fn failed_marker(source: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            status: Status::FailedMarker,
            items: Vec::new(),
            free: Vec::new(),
            choice_tally: Tally::default(),
            free_tally: Tally::default(),
            failure: Some(reason.into()),
        }
    }
}

/// Recompute status and tallies from scratch over all rows.
///
/// Pure and idempotent; called after initial classification and after every
/// override so the status always reflects the true flag distribution.
pub fn recompute(mut sheet: SheetResult, key: &AnswerKey) -> SheetResult {
    if sheet.status == Status::FailedMarker {
        return sheet;
    }

    let mut choice_tally = Tally::default();
    for (row, item) in sheet.items.iter().enumerate() {
        let Some(expected) = key.choice(row) else {
            continue;
        };
        choice_tally.keyed += 1;
        match item.choice {
            Some(c) if c == expected => choice_tally.correct += 1,
            Some(_) => choice_tally.wrong += 1,
            None => {}
        }
    }

    let mut free_tally = Tally::default();
    for (row, result) in sheet.free.iter().enumerate() {
        let Some(expected) = key.response(row) else {
            continue;
        };
        free_tally.keyed += 1;
        match result.normalized.as_deref() {
            Some(got) if normalize::matches_key(got, expected) => free_tally.correct += 1,
            _ => free_tally.wrong += 1,
        }
    }

    sheet.status = if sheet.items.iter().all(|i| i.flag.is_resolved()) {
        Status::Graded
    } else {
        Status::NeedsReview
    };
    sheet.choice_tally = choice_tally;
    sheet.free_tally = free_tally;
    sheet
}

/// Aggregate statistics over a batch of sheets.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BatchSummary {
    /// Total sheets processed.
    pub sheets: usize,
    /// Sheets with marker failure.
    pub failed: usize,
    /// Sheets needing review.
    pub needs_review: usize,
    /// Fully graded sheets.
    pub graded: usize,
    /// Mean correct count over scored sheets (0 when none).
    pub mean_correct: f64,
    /// Minimum correct count over scored sheets.
    pub min_correct: usize,
    /// Maximum correct count over scored sheets.
    pub max_correct: usize,
    /// Per-item correct rate over rows with a chosen option; `None` where no
    /// sheet attempted the item.
    pub item_correct_rate: Vec<Option<f64>>,
}

/// Summarize a batch. `rows` is the template's scored row count.
pub fn summarize(results: &[SheetResult], key: &AnswerKey, rows: usize) -> BatchSummary {
    let mut failed = 0;
    let mut needs_review = 0;
    let mut graded = 0;
    let mut corrects = Vec::new();
    let mut attempted = vec![0usize; rows];
    let mut correct = vec![0usize; rows];

    for r in results {
        match r.status {
            Status::FailedMarker => failed += 1,
            Status::NeedsReview => needs_review += 1,
            Status::Graded => graded += 1,
        }
        if r.status == Status::FailedMarker {
            continue;
        }
        corrects.push(r.choice_tally.correct + r.free_tally.correct);
        for (row, item) in r.items.iter().enumerate().take(rows) {
            let Some(chosen) = item.choice else { continue };
            attempted[row] += 1;
            if key.choice(row) == Some(chosen) {
                correct[row] += 1;
            }
        }
    }

    let mean_correct = if corrects.is_empty() {
        0.0
    } else {
        corrects.iter().sum::<usize>() as f64 / corrects.len() as f64
    };

    BatchSummary {
        sheets: results.len(),
        failed,
        needs_review,
        graded,
        mean_correct,
        min_correct: corrects.iter().copied().min().unwrap_or(0),
        max_correct: corrects.iter().copied().max().unwrap_or(0),
        item_correct_rate: attempted
            .iter()
            .zip(&correct)
            .map(|(&a, &c)| if a > 0 { Some(c as f64 / a as f64) } else { None })
            .collect(),
    }
}
