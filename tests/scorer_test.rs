//! Tests for the Scorer trait.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use wml_scoring::types::ScoringResponse;
use wml_scoring::{
    MultiScoreResult, Result, ScoringClient, ScoringError, ScoringOptions, Scorer,
};

/// Echoes the first column of every row as its prediction.
struct EchoScorer {
    fields: Vec<String>,
}

#[async_trait]
impl Scorer for EchoScorer {
    fn fields(&self) -> &[String] {
        &self.fields
    }

    async fn score_multi(&self, rows: &[Vec<Value>]) -> Result<MultiScoreResult> {
        let data = ScoringResponse {
            fields: vec!["prediction".to_string()],
            values: rows.iter().map(|row| vec![row[0].clone()]).collect(),
        };
        let predictions = data.predictions(rows.len())?;
        Ok(MultiScoreResult { predictions, data })
    }
}

#[tokio::test]
async fn default_score_uses_first_prediction() {
    let scorer = EchoScorer {
        fields: vec!["a".to_string()],
    };
    let result = scorer.score(vec![json!("first")]).await.unwrap();
    assert_eq!(result.prediction, json!("first"));
    assert_eq!(result.data.values, vec![vec![json!("first")]]);
}

#[tokio::test]
async fn empty_multi_result_is_shape_error() {
    struct EmptyScorer;

    #[async_trait]
    impl Scorer for EmptyScorer {
        fn fields(&self) -> &[String] {
            &[]
        }

        async fn score_multi(&self, _rows: &[Vec<Value>]) -> Result<MultiScoreResult> {
            Ok(MultiScoreResult {
                predictions: vec![],
                data: ScoringResponse::default(),
            })
        }
    }

    let err = EmptyScorer.score(vec![json!(1)]).await.unwrap_err();
    assert!(matches!(err, ScoringError::ResponseShape(_)));
}

#[test]
fn scoring_client_is_a_scorer() {
    let config = ScoringOptions::new()
        .username("user")
        .password("pass")
        .instance_id("inst")
        .model_id("m1")
        .deployment_id("d1")
        .resolve_with(|_| None)
        .unwrap();
    let client = ScoringClient::from_config(["age", "plan"], config).unwrap();

    let scorer: Arc<dyn Scorer> = Arc::new(client);
    assert_eq!(scorer.fields(), ["age", "plan"]);
}
