//! Operator overrides for flagged rows.
//!
//! An override replaces a row's verdict with an operator decision, marks the
//! row manually resolved, and re-derives status and tallies through
//! [`recompute`]. Overrides never mutate in place: callers get a fresh
//! [`SheetResult`] and decide what to keep.

use thiserror::Error;

use crate::classify::ItemFlag;
use crate::key::AnswerKey;
use crate::sheet::{recompute, SheetResult, Status};

/// Override rejection.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ReviewError {
    #[error("row {row} out of range (sheet has {rows} rows)")]
    RowOutOfRange { row: usize, rows: usize },
    #[error("choice {choice} out of range (row has {choices} choices)")]
    ChoiceOutOfRange { choice: usize, choices: usize },
    #[error("sheet was not scored (marker detection failed)")]
    SheetNotScored,
}

/// Replace a row's choice with an operator decision.
///
/// `choice` is a 0-based option index, or `None` to record a deliberate
/// blank. Either way the row becomes manually resolved and stops gating the
/// sheet status.
pub fn override_choice(
    sheet: SheetResult,
    key: &AnswerKey,
    row: usize,
    choice: Option<usize>,
) -> Result<SheetResult, ReviewError> {
    if sheet.status == Status::FailedMarker {
        return Err(ReviewError::SheetNotScored);
    }
    let rows = sheet.items.len();
    let mut sheet = sheet;
    let item = sheet
        .items
        .get_mut(row)
        .ok_or(ReviewError::RowOutOfRange { row, rows })?;
    if let Some(c) = choice {
        if c >= item.scores.len() {
            return Err(ReviewError::ChoiceOutOfRange {
                choice: c,
                choices: item.scores.len(),
            });
        }
    }
    item.choice = choice;
    item.flag = ItemFlag::Manual;
    Ok(recompute(sheet, key))
}

/// Replace a free-response row's recognized text with operator-entered text.
///
/// The replacement is normalized with the same pipeline as OCR output, so the
/// operator may type `2/4` and match a key of `1/2`.
pub fn override_free_response(
    sheet: SheetResult,
    key: &AnswerKey,
    row: usize,
    text: &str,
) -> Result<SheetResult, ReviewError> {
    if sheet.status == Status::FailedMarker {
        return Err(ReviewError::SheetNotScored);
    }
    let rows = sheet.free.len();
    let mut sheet = sheet;
    let entry = sheet
        .free
        .get_mut(row)
        .ok_or(ReviewError::RowOutOfRange { row, rows })?;
    entry.corrected = text.to_string();
    entry.normalized = crate::normalize::normalize(text);
    entry.manual = true;
    Ok(recompute(sheet, key))
}
