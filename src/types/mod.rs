//! Public types for the scoring API.

mod resources;
mod scoring;

pub use resources::{
    Deployment, DeploymentEntity, ErrorBody, IdentityToken, ONLINE_DEPLOYMENT, PublishedModel,
    PublishedModelEntity, ResourceList, ResourceMetadata,
};
pub use scoring::{
    MultiScoreResult, PREDICTION_FIELD, ScoreResult, ScoringRequest, ScoringResponse,
};
