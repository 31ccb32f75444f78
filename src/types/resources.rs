//! Identity and repository listing payloads

use serde::Deserialize;

/// Deployment type served synchronously over HTTP.
pub const ONLINE_DEPLOYMENT: &str = "online";

/// Body of the identity endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityToken {
    pub token: String,
}

/// A `{ resources: [...] }` listing.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceList<T> {
    #[serde(default = "Vec::new")]
    pub resources: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResourceMetadata {
    pub guid: String,
}

/// Entry of the published models listing.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishedModel {
    pub metadata: ResourceMetadata,
    pub entity: PublishedModelEntity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishedModelEntity {
    #[serde(default)]
    pub name: String,
}

/// Entry of a model's deployments listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Deployment {
    pub metadata: ResourceMetadata,
    pub entity: DeploymentEntity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentEntity {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
}

impl Deployment {
    pub fn is_online(&self) -> bool {
        self.entity.kind == ONLINE_DEPLOYMENT
    }
}

/// Error body returned on failure responses.
///
/// Both fields are optional; bodies that are not JSON at all are treated as
/// carrying neither.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
