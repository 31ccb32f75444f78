//! [`ScoringClient`]: token handling, name resolution and scoring calls.
//!
//! A call runs as one sequential chain: obtain a token (cached or fresh),
//! make sure the scoring URL is known (resolving names on first use), post
//! the rows, extract predictions. A token rejection invalidates the cached
//! token and restarts the chain, bounded by [`RetryConfig`](crate::RetryConfig).

use std::fmt;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info};

use super::{AccessToken, ServiceEndpoints};
use crate::config::{ModelTarget, ResolvedConfig, ScoringOptions};
use crate::retry::{AttemptError, with_token_retry};
use crate::telemetry;
use crate::types::{
    Deployment, ErrorBody, IdentityToken, MultiScoreResult, PublishedModel, ResourceList,
    ScoreResult, ScoringRequest, ScoringResponse,
};
use crate::version::user_agent;
use crate::{Result, Scorer, ScoringError};

/// Client for one online deployment.
///
/// The access token and the resolved scoring URL are cached on the instance.
/// The token is reused until the service rejects it; the URL is resolved at
/// most once.
///
/// # Example
///
/// ```rust,no_run
/// use serde_json::json;
/// use wml_scoring::{ScoringClient, ScoringOptions};
///
/// # async fn example() -> wml_scoring::Result<()> {
/// let client = ScoringClient::new(
///     ["age", "plan"],
///     ScoringOptions::new().model_name("churn-model"),
/// )?;
/// let result = client.score(vec![json!(42), json!("gold")]).await?;
/// println!("{}", result.prediction);
/// # Ok(())
/// # }
/// ```
pub struct ScoringClient {
    fields: Vec<String>,
    config: ResolvedConfig,
    endpoints: ServiceEndpoints,
    http: Client,
    token: RwLock<Option<AccessToken>>,
    scoring_url: OnceCell<String>,
}

impl ScoringClient {
    /// Create a client, resolving `options` against the process environment.
    ///
    /// Fails with [`ScoringError::Configuration`] when `fields` is empty or a
    /// required setting cannot be resolved.
    pub fn new<I, S>(fields: I, options: ScoringOptions) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fields = collect_fields(fields)?;
        Self::build(fields, options.resolve()?)
    }

    /// Create a client from an already resolved configuration.
    pub fn from_config<I, S>(fields: I, config: ResolvedConfig) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::build(collect_fields(fields)?, config)
    }

    fn build(fields: Vec<String>, config: ResolvedConfig) -> Result<Self> {
        let http = Client::builder().user_agent(user_agent()).build().map_err(|e| {
            ScoringError::Configuration(format!("failed to build HTTP client: {e}"))
        })?;

        let endpoints = ServiceEndpoints::new(&config.service_path, &config.instance_id);
        let scoring_url = match &config.target {
            ModelTarget::Ids {
                model_id,
                deployment_id,
            } => OnceCell::new_with(Some(endpoints.scoring(model_id, deployment_id))),
            ModelTarget::Name { .. } => OnceCell::new(),
        };

        Ok(Self {
            fields,
            config,
            endpoints,
            http,
            token: RwLock::new(None),
            scoring_url,
        })
    }

    /// Replace the HTTP client (custom TLS roots, proxies, ...).
    ///
    /// The configured timeout still applies to every request. The
    /// `User-Agent` is whatever the replacement sends.
    pub fn with_http_client(mut self, http: Client) -> Self {
        self.http = http;
        self
    }

    /// Input field names, in column order.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn config(&self) -> &ResolvedConfig {
        &self.config
    }

    /// The cached token, without contacting the service.
    pub async fn cached_token(&self) -> Option<AccessToken> {
        self.token.read().await.clone()
    }

    /// The scoring URL if it is already known.
    pub fn resolved_scoring_url(&self) -> Option<&str> {
        self.scoring_url.get().map(String::as_str)
    }

    /// Return a usable access token, authenticating if none is cached.
    ///
    /// When the client was configured by model name, the first call also
    /// resolves the scoring URL, so on success both are cached.
    pub async fn access_token(&self) -> Result<AccessToken> {
        let token = self.token().await?;
        self.ensure_scoring_url(&token).await?;
        Ok(token)
    }

    /// The scoring URL, resolving model and deployment names if needed.
    pub async fn scoring_url(&self) -> Result<String> {
        if let Some(url) = self.scoring_url.get() {
            return Ok(url.clone());
        }
        let token = self.token().await?;
        self.ensure_scoring_url(&token).await.map(str::to_string)
    }

    /// Score one row and return its prediction with the full response.
    pub async fn score(&self, row: Vec<Value>) -> Result<ScoreResult> {
        self.score_multi(std::slice::from_ref(&row))
            .await?
            .into_first()
    }

    /// Score several rows; predictions are returned in input order.
    pub async fn score_multi(&self, rows: &[Vec<Value>]) -> Result<MultiScoreResult> {
        if rows.is_empty() {
            return Err(ScoringError::InvalidInput("no rows to score".to_string()));
        }

        let start = Instant::now();
        let result = with_token_retry(
            &self.config.retry,
            "score",
            |_| self.score_attempt(rows),
            |rejected| self.invalidate(rejected),
        )
        .await;

        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::REQUESTS_TOTAL, "operation" => "score", "status" => status)
            .increment(1);
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS, "operation" => "score")
            .record(start.elapsed().as_secs_f64());

        result
    }

    async fn score_attempt(
        &self,
        rows: &[Vec<Value>],
    ) -> std::result::Result<MultiScoreResult, AttemptError<AccessToken>> {
        let token = self.token().await?;
        let with_token = |error: ScoringError| AttemptError {
            error,
            credential: Some(token.clone()),
        };

        let url = self.ensure_scoring_url(&token).await.map_err(with_token)?;
        let response = self
            .request(self.http.post(url))
            .header("Authorization", token.bearer())
            .json(&ScoringRequest {
                fields: &self.fields,
                values: rows,
            })
            .send()
            .await
            .map_err(|e| with_token(e.into()))?;
        let data: ScoringResponse = read_json(response).await.map_err(with_token)?;

        let predictions = data.predictions(rows.len())?;
        Ok(MultiScoreResult { predictions, data })
    }

    async fn token(&self) -> Result<AccessToken> {
        match self.cached_token().await {
            Some(token) => Ok(token),
            None => self.authenticate().await,
        }
    }

    async fn authenticate(&self) -> Result<AccessToken> {
        let url = self.endpoints.identity();
        debug!(url = %url, username = %self.config.username, "requesting access token");

        let response = self
            .request(self.http.get(url.as_str()))
            .basic_auth(&self.config.username, Some(&self.config.password))
            .send()
            .await?;
        let body: IdentityToken = read_json(response).await?;
        let token = AccessToken::new(body.token);

        metrics::counter!(telemetry::TOKEN_REFRESHES_TOTAL).increment(1);
        *self.token.write().await = Some(token.clone());
        Ok(token)
    }

    /// Drop the cached token if it is still the one that was rejected.
    async fn invalidate(&self, rejected: AccessToken) {
        let mut cached = self.token.write().await;
        if cached.as_ref() == Some(&rejected) {
            debug!("invalidating rejected access token");
            *cached = None;
        }
    }

    async fn ensure_scoring_url(&self, token: &AccessToken) -> Result<&str> {
        self.scoring_url
            .get_or_try_init(|| self.resolve_scoring_url(token))
            .await
            .map(String::as_str)
    }

    async fn resolve_scoring_url(&self, token: &AccessToken) -> Result<String> {
        let (model_name, deployment_name) = match &self.config.target {
            ModelTarget::Ids {
                model_id,
                deployment_id,
            } => return Ok(self.endpoints.scoring(model_id, deployment_id)),
            ModelTarget::Name {
                model_name,
                deployment_name,
            } => (model_name, deployment_name.as_deref()),
        };

        let result = self
            .lookup_ids(token, model_name, deployment_name)
            .await
            .map(|(model_id, deployment_id)| self.endpoints.scoring(&model_id, &deployment_id));

        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(telemetry::RESOLUTIONS_TOTAL, "status" => status).increment(1);
        if let Ok(url) = &result {
            info!(model = %model_name, url = %url, "resolved scoring endpoint");
        }
        result
    }

    /// Find the model by exact name, then its first matching online deployment.
    async fn lookup_ids(
        &self,
        token: &AccessToken,
        model_name: &str,
        deployment_name: Option<&str>,
    ) -> Result<(String, String)> {
        debug!(model = model_name, "looking up published model");
        let models: ResourceList<PublishedModel> =
            self.get_json(&self.endpoints.published_models(), token).await?;
        let model_id = models
            .resources
            .into_iter()
            .find(|model| model.entity.name == model_name)
            .map(|model| model.metadata.guid)
            .ok_or_else(|| ScoringError::Resolution(format!("model not found: {model_name}")))?;

        debug!(model = model_name, model_id = %model_id, "looking up online deployment");
        let deployments: ResourceList<Deployment> = self
            .get_json(&self.endpoints.deployments(&model_id), token)
            .await?;
        let deployment_id = deployments
            .resources
            .into_iter()
            .find(|deployment| {
                deployment.is_online()
                    && deployment_name.is_none_or(|name| deployment.entity.name == name)
            })
            .map(|deployment| deployment.metadata.guid)
            .ok_or_else(|| {
                ScoringError::Resolution(format!(
                    "deployment not found: {} for model {model_id}",
                    deployment_name.unwrap_or("<any online>")
                ))
            })?;

        Ok((model_id, deployment_id))
    }

    fn request(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.timeout {
            Some(timeout) => request.timeout(timeout),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str, token: &AccessToken) -> Result<T> {
        let response = self
            .request(self.http.get(url))
            .header("Authorization", token.bearer())
            .send()
            .await?;
        read_json(response).await
    }
}

impl fmt::Debug for ScoringClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScoringClient")
            .field("fields", &self.fields)
            .field("config", &self.config)
            .field("scoring_url", &self.scoring_url.get())
            .finish_non_exhaustive()
    }
}

fn collect_fields<I, S>(fields: I) -> Result<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let fields: Vec<String> = fields.into_iter().map(Into::into).collect();
    if fields.is_empty() {
        return Err(ScoringError::missing("fields"));
    }
    Ok(fields)
}

/// Decode a success body, or map a failure status to [`ScoringError::Api`]
/// carrying the body's error code.
async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json().await?);
    }

    let text = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
    let message = body.message.unwrap_or_else(|| {
        if text.is_empty() {
            status.canonical_reason().unwrap_or("request failed").to_string()
        } else {
            text
        }
    });
    Err(ScoringError::Api {
        status: status.as_u16(),
        code: body.code,
        message,
    })
}

#[async_trait]
impl Scorer for ScoringClient {
    fn fields(&self) -> &[String] {
        ScoringClient::fields(self)
    }

    async fn score(&self, row: Vec<Value>) -> Result<ScoreResult> {
        ScoringClient::score(self, row).await
    }

    async fn score_multi(&self, rows: &[Vec<Value>]) -> Result<MultiScoreResult> {
        ScoringClient::score_multi(self, rows).await
    }
}
