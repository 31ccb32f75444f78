//! Core Scorer trait

use async_trait::async_trait;
use serde_json::Value;

use crate::{MultiScoreResult, Result, ScoreResult};

/// Something that turns feature rows into predictions.
///
/// Lets consumers depend on scoring without coupling to the HTTP client,
/// e.g. to substitute a fake in their own tests.
#[async_trait]
pub trait Scorer: Send + Sync {
    /// Input field names, in column order.
    fn fields(&self) -> &[String];

    /// Score several rows; one prediction per row, in input order.
    async fn score_multi(&self, rows: &[Vec<Value>]) -> Result<MultiScoreResult>;

    /// Score a single row.
    async fn score(&self, row: Vec<Value>) -> Result<ScoreResult> {
        self.score_multi(&[row]).await?.into_first()
    }
}
