//! Scoring payloads and results

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, ScoringError};

/// Name of the response column holding the model output.
pub const PREDICTION_FIELD: &str = "prediction";

/// Body posted to an online deployment.
#[derive(Debug, Clone, Serialize)]
pub struct ScoringRequest<'a> {
    pub fields: &'a [String],
    pub values: &'a [Vec<Value>],
}

/// Body returned by an online deployment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoringResponse {
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl ScoringResponse {
    /// Position of the prediction column, matched case-insensitively.
    pub fn prediction_index(&self) -> Option<usize> {
        self.fields
            .iter()
            .position(|field| field.eq_ignore_ascii_case(PREDICTION_FIELD))
    }

    /// Extract one prediction per input row, in input order.
    ///
    /// Fails with [`ScoringError::ResponseShape`] when the response has no
    /// prediction column or fewer rows than were submitted.
    pub fn predictions(&self, rows: usize) -> Result<Vec<Value>> {
        let index = self.prediction_index().ok_or_else(|| {
            ScoringError::ResponseShape(format!(
                "no '{PREDICTION_FIELD}' field in response fields {:?}",
                self.fields
            ))
        })?;

        (0..rows)
            .map(|row| {
                self.values
                    .get(row)
                    .and_then(|values| values.get(index))
                    .cloned()
                    .ok_or_else(|| {
                        ScoringError::ResponseShape(format!(
                            "response row {row} has no value at prediction index {index}"
                        ))
                    })
            })
            .collect()
    }
}

/// Result of scoring a single row.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    pub prediction: Value,
    /// Full response payload.
    pub data: ScoringResponse,
}

/// Result of scoring several rows.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiScoreResult {
    /// One prediction per input row, in input order.
    pub predictions: Vec<Value>,
    /// Full response payload.
    pub data: ScoringResponse,
}

impl MultiScoreResult {
    /// Keep only the first row's prediction.
    pub fn into_first(self) -> Result<ScoreResult> {
        let prediction = self
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| ScoringError::ResponseShape("no predictions returned".to_string()))?;
        Ok(ScoreResult {
            prediction,
            data: self.data,
        })
    }
}
