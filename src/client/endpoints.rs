//! URL composition for the v3 REST API.

/// URLs of the endpoints used by the client, rooted at one service path
/// and instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpoints {
    service_path: String,
    instance_id: String,
}

impl ServiceEndpoints {
    /// Trailing slashes on `service_path` are dropped.
    pub fn new(service_path: impl Into<String>, instance_id: impl Into<String>) -> Self {
        let service_path: String = service_path.into();
        Self {
            service_path: service_path.trim_end_matches('/').to_string(),
            instance_id: instance_id.into(),
        }
    }

    /// `GET` with basic auth; returns `{ token }`.
    pub fn identity(&self) -> String {
        format!("{}/v3/identity/token", self.service_path)
    }

    pub fn published_models(&self) -> String {
        format!(
            "{}/v3/wml_instances/{}/published_models",
            self.service_path, self.instance_id
        )
    }

    pub fn deployments(&self, model_id: &str) -> String {
        format!("{}/{model_id}/deployments", self.published_models())
    }

    /// Online scoring URL of one deployment.
    pub fn scoring(&self, model_id: &str, deployment_id: &str) -> String {
        format!("{}/{deployment_id}/online", self.deployments(model_id))
    }
}
