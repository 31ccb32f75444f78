//! Client for Watson Machine Learning online deployments.
//!
//! Provides [`ScoringClient`], which implements [`Scorer`](crate::Scorer)
//! by posting rows to a deployment's online scoring endpoint.

mod endpoints;
mod scoring_client;
mod token;

pub use endpoints::ServiceEndpoints;
pub use scoring_client::ScoringClient;
pub use token::AccessToken;
