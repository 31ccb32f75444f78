//! Telemetry metric name constants.
//!
//! Consumers install their own `metrics` recorder (e.g. prometheus, statsd);
//! without a recorder installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `wml_scoring_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `operation`: client operation (e.g. "score")
//! - `status`: outcome: "ok" or "error"

/// Total scoring calls, counted once per call regardless of retries.
///
/// Labels: `operation`, `status` ("ok" | "error").
pub const REQUESTS_TOTAL: &str = "wml_scoring_requests_total";

/// Scoring call duration in seconds, including authentication and retries.
///
/// Labels: `operation`.
pub const REQUEST_DURATION_SECONDS: &str = "wml_scoring_request_duration_seconds";

/// Total retry attempts after a rejected token (not counting the initial request).
///
/// Labels: `operation`.
pub const RETRIES_TOTAL: &str = "wml_scoring_retries_total";

/// Total access tokens obtained from the identity endpoint.
pub const TOKEN_REFRESHES_TOTAL: &str = "wml_scoring_token_refreshes_total";

/// Total model/deployment name resolutions performed.
///
/// Labels: `status` ("ok" | "error").
pub const RESOLUTIONS_TOTAL: &str = "wml_scoring_resolutions_total";
