//! Per-item classification: a row's fill-score vector to a verdict.
//!
//! The decision order is fixed (first match wins): blank, multi-mark,
//! confident selection, weak signal offered for review. An ambiguous
//! multi-mark is never auto-resolved to a best guess.

use crate::config::ConfigError;

/// Classification thresholds on the fill score in `[0, 1]`.
///
/// Empirically chosen starting points; no calibration procedure is implied.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Below this a cell reads as unmarked.
    pub blank: f32,
    /// Minimum score to count as a plausible mark at all.
    pub review_low: f32,
    /// At or above this a mark is a confident selection.
    pub select: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            blank: 0.18,
            review_low: 0.35,
            select: 0.55,
        }
    }
}

impl Thresholds {
    /// Require `blank < review_low <= select`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blank < self.review_low && self.review_low <= self.select {
            Ok(())
        } else {
            Err(ConfigError::InvalidThresholds {
                blank: self.blank,
                review_low: self.review_low,
                select: self.select,
            })
        }
    }
}

/// Per-item verdict flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemFlag {
    /// Exactly one strong mark.
    Confident,
    /// No cell above the blank threshold.
    Blank,
    /// Two or more cells at selection strength.
    Multi,
    /// A weak but non-blank signal; the argmax is offered, not trusted.
    Review,
    /// Verdict forced by an operator override.
    Manual,
}

impl ItemFlag {
    /// Whether this flag counts as resolved for sheet status purposes.
    pub fn is_resolved(self) -> bool {
        matches!(self, ItemFlag::Confident | ItemFlag::Manual)
    }
}

impl std::fmt::Display for ItemFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ItemFlag::Confident => "CONFIDENT",
            ItemFlag::Blank => "BLANK",
            ItemFlag::Multi => "MULTI",
            ItemFlag::Review => "REVIEW",
            ItemFlag::Manual => "MANUAL",
        };
        f.write_str(s)
    }
}

/// Verdict for one scored row.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ItemResult {
    /// Chosen option as a 0-based choice index, or `None` for blank/multi.
    pub choice: Option<usize>,
    /// Fill score per choice, in choice order.
    pub scores: Vec<f32>,
    /// Verdict flag.
    pub flag: ItemFlag,
}

/// Index of the highest score; ties keep the earliest choice.
fn argmax(scores: &[f32]) -> usize {
    let mut best = 0;
    for (i, &s) in scores.iter().enumerate().skip(1) {
        if s > scores[best] {
            best = i;
        }
    }
    best
}

/// Classify one row from its per-choice fill scores.
pub fn classify_row(scores: &[f32], thresholds: &Thresholds) -> ItemResult {
    debug_assert!(!scores.is_empty());

    if scores.iter().all(|&s| s < thresholds.blank) {
        return ItemResult {
            choice: None,
            scores: scores.to_vec(),
            flag: ItemFlag::Blank,
        };
    }

    let strong = scores.iter().filter(|&&s| s >= thresholds.select).count();
    if strong >= 2 {
        return ItemResult {
            choice: None,
            scores: scores.to_vec(),
            flag: ItemFlag::Multi,
        };
    }

    let best = argmax(scores);
    let flag = if scores[best] >= thresholds.select {
        ItemFlag::Confident
    } else {
        ItemFlag::Review
    };
    ItemResult {
        choice: Some(best),
        scores: scores.to_vec(),
        flag,
    }
}
