//! Answer key: expected choices and canonical free-response strings.
//!
//! The key is read-only to the engine. A missing entry means "not graded"
//! for that item, never "incorrect". Free-response entries are canonicalized
//! with the same normalizer used on OCR output, so key authors may write
//! `2/4` and still match a reduced `1/2`.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::normalize;

/// Answer key load/parse failure.
#[derive(Debug, Error)]
pub enum KeyError {
    #[error("failed to read key file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse key file: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid choice character {found:?} in block {block:?} (expected 1..={choices} or '-')")]
    InvalidChoice {
        found: char,
        block: String,
        choices: usize,
    },
}

/// On-disk key schema: choice digits in blocks, free-response strings.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct KeyFile {
    /// Blocks of choice digits, e.g. `["13245", "52-41"]`. `-` or `0` mean
    /// "no key for this item".
    #[serde(default)]
    choices: Vec<String>,
    /// Expected free-response answers; empty string means "no key".
    #[serde(default)]
    responses: Vec<String>,
}

/// Expected answers for one template, read-only to the engine.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AnswerKey {
    choices: Vec<Option<usize>>,
    responses: Vec<Option<String>>,
}

impl AnswerKey {
    /// Build a key from 0-based choice indices and raw free-response strings.
    ///
    /// Response strings are canonicalized; entries that do not normalize
    /// become "no key".
    pub fn new(choices: Vec<Option<usize>>, responses: Vec<Option<String>>) -> Self {
        let responses = responses
            .into_iter()
            .map(|r| r.as_deref().and_then(normalize::normalize))
            .collect();
        Self { choices, responses }
    }

    /// A key that grades nothing.
    pub fn empty(rows: usize, free_rows: usize) -> Self {
        Self {
            choices: vec![None; rows],
            responses: vec![None; free_rows],
        }
    }

    /// Expected 0-based choice for a scored row, if keyed.
    pub fn choice(&self, row: usize) -> Option<usize> {
        self.choices.get(row).copied().flatten()
    }

    /// Expected canonical text for a free-response row, if keyed.
    pub fn response(&self, row: usize) -> Option<&str> {
        self.responses.get(row).and_then(|r| r.as_deref())
    }

    /// Number of keyed multiple-choice entries.
    pub fn keyed_choices(&self) -> usize {
        self.choices.iter().filter(|c| c.is_some()).count()
    }

    /// Number of keyed free-response entries.
    pub fn keyed_responses(&self) -> usize {
        self.responses.iter().filter(|r| r.is_some()).count()
    }

    /// Parse choice blocks (`"13245 52-41"`), 1-based digits to 0-based
    /// indices. `-` and `0` mean "no key"; whitespace separates blocks and is
    /// ignored.
    pub fn parse_choice_blocks(blocks: &str, choices: usize) -> Result<Vec<Option<usize>>, KeyError> {
        let mut out = Vec::new();
        for block in blocks.split_whitespace() {
            for ch in block.chars() {
                match ch {
                    '-' | '0' => out.push(None),
                    d if d.is_ascii_digit() => {
                        let v = (d as u8 - b'0') as usize;
                        if v > choices {
                            return Err(KeyError::InvalidChoice {
                                found: ch,
                                block: block.to_string(),
                                choices,
                            });
                        }
                        out.push(Some(v - 1));
                    }
                    _ => {
                        return Err(KeyError::InvalidChoice {
                            found: ch,
                            block: block.to_string(),
                            choices,
                        })
                    }
                }
            }
        }
        Ok(out)
    }

    /// Load a key from a JSON file (`{"choices": [...], "responses": [...]}`).
    ///
    /// `choices_per_row` bounds the valid choice digits.
    pub fn from_json_file(path: &Path, choices_per_row: usize) -> Result<Self, KeyError> {
        let raw = fs::read_to_string(path)?;
        let file: KeyFile = serde_json::from_str(&raw)?;

        let joined = file.choices.join(" ");
        let choices = Self::parse_choice_blocks(&joined, choices_per_row)?;
        let responses = file
            .responses
            .into_iter()
            .map(|r| if r.trim().is_empty() { None } else { Some(r) })
            .collect();
        Ok(Self::new(choices, responses))
    }
}
