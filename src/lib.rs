//! wml-scoring - async client for Watson Machine Learning online scoring
//!
//! [`ScoringClient`] exchanges service credentials for a bearer token,
//! finds the target deployment (by ID, or by model and deployment name),
//! posts feature rows and returns the `prediction` column of the response.
//! A rejected token is dropped and the call retried with a fresh one.
//!
//! # Example
//!
//! ```rust,no_run
//! use serde_json::json;
//! use wml_scoring::{ScoringClient, ScoringOptions};
//!
//! #[tokio::main]
//! async fn main() -> wml_scoring::Result<()> {
//!     // Credentials not set here are read from VCAP_SERVICES or WML_* variables.
//!     let client = ScoringClient::new(
//!         ["age", "plan", "monthly_charge"],
//!         ScoringOptions::new()
//!             .model_name("churn-model")
//!             .deployment_name("prod"),
//!     )?;
//!
//!     let result = client
//!         .score_multi(&[
//!             vec![json!(42), json!("gold"), json!(71.5)],
//!             vec![json!(23), json!("basic"), json!(19.0)],
//!         ])
//!         .await?;
//!
//!     println!("{:?}", result.predictions);
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod retry;
pub mod telemetry;
pub mod traits;
pub mod types;
pub mod version;

pub use client::{AccessToken, ScoringClient, ServiceEndpoints};
pub use config::{ModelTarget, ResolvedConfig, ScoringOptions};
pub use error::{Result, ScoringError};
pub use retry::RetryConfig;
pub use traits::Scorer;
pub use types::{MultiScoreResult, ScoreResult, ScoringResponse};

/// Package version (from Cargo.toml).
pub use version::PKG_VERSION;
