//! Upstream transit feed client
//!
//! Two endpoints are consumed:
//! - `GET {base}/v1/stop/palina?id={stop}&delta={minutes}` - runs expected at
//!   a stop within the lookahead window
//! - `GET {base}/v1/route/ride?id={run}` - live progress of one run
//!
//! The feed reports progress marks (`PR`) as seconds since local midnight and
//! flags each stop with a `passato` indicator; a mark on a stop that has not
//! been passed is meaningless and is masked out here. Field values arrive as
//! strings or numbers depending on the backend mood, so scalar fields are
//! decoded leniently.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::time::Duration;

/// Vehicle state reported while the onboard unit is transmitting; anything
/// else means the upstream connection to the bus is lost.
pub const VEHICLE_ACTIVE_STATE: &str = "AVM";

const FEED_TIMEOUT_SECS: u64 = 10;

#[derive(Debug)]
pub enum FeedError {
    Http(reqwest::Error),
    Status(u16),
    Malformed(String),
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        FeedError::Http(err)
    }
}

impl std::fmt::Display for FeedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedError::Http(e) => write!(f, "Feed request failed: {}", e),
            FeedError::Status(code) => write!(f, "Feed returned status {}", code),
            FeedError::Malformed(msg) => write!(f, "Malformed feed payload: {}", msg),
        }
    }
}

impl std::error::Error for FeedError {}

/// Decode a scalar that may arrive as a JSON string or number.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number, got {}",
            other
        ))),
    }
}

/// One run expected at a stop, as reported by the stop snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSummary {
    #[serde(rename = "idCorsa", deserialize_with = "lenient_string")]
    pub run_id: String,
    #[serde(rename = "partenzaCorsa", default)]
    pub origin: Option<String>,
    #[serde(rename = "arrivoCorsa", default)]
    pub destination: Option<String>,
    #[serde(rename = "instradamento", default)]
    pub via: Option<String>,
    /// `"N"` means the run is going ahead; anything else is cancelled.
    #[serde(rename = "soppressa", deserialize_with = "lenient_string")]
    pub cancelled_flag: String,
    #[serde(rename = "percorso", deserialize_with = "lenient_string")]
    pub route: String,
}

impl RunSummary {
    pub fn is_cancelled(&self) -> bool {
        self.cancelled_flag != "N"
    }
}

/// Progress of one stop along a ride.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StopProgress {
    #[serde(rename = "passato", default)]
    passed: Option<Value>,
    #[serde(rename = "PR", default)]
    progress_mark: Option<Value>,
}

impl StopProgress {
    /// Build a stop entry directly, mainly for tests.
    pub fn with_mark(passed: bool, mark: Option<i64>) -> Self {
        Self {
            passed: Some(Value::String(if passed { "1" } else { "0" }.to_string())),
            progress_mark: mark.map(|m| Value::Number(m.into())),
        }
    }

    /// The `passato` indicator; `"0"` (or `0`) means not yet passed.
    pub fn is_passed(&self) -> bool {
        match &self.passed {
            Some(Value::String(s)) => s != "0",
            Some(Value::Number(n)) => n.as_i64() != Some(0),
            _ => true,
        }
    }

    fn raw_mark(&self) -> Option<i64> {
        match &self.progress_mark {
            Some(Value::Number(n)) => n.as_i64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Progress mark in seconds since midnight, masked to `None` while the
    /// stop has not been passed.
    pub fn effective_mark(&self) -> Option<i64> {
        if self.is_passed() {
            self.raw_mark()
        } else {
            None
        }
    }
}

/// Live progress snapshot of one run.
#[derive(Debug, Clone)]
pub struct RideProgress {
    pub vehicle_state: String,
    pub stops: Vec<StopProgress>,
}

impl RideProgress {
    pub fn is_active(&self) -> bool {
        self.vehicle_state == VEHICLE_ACTIVE_STATE
    }
}

// Wire envelopes

#[derive(Deserialize)]
struct StopEnvelope {
    #[serde(default)]
    payload: Option<StopPayload>,
}

#[derive(Deserialize)]
struct StopPayload {
    #[serde(rename = "corsa", default)]
    runs: Option<Vec<RunSummary>>,
}

#[derive(Deserialize)]
struct RideEnvelope {
    #[serde(default)]
    payload: Option<RidePayload>,
}

#[derive(Deserialize)]
struct RidePayload {
    #[serde(rename = "automezzo")]
    vehicle: Vehicle,
    #[serde(rename = "fermate")]
    stop_list: StopList,
}

#[derive(Deserialize)]
struct Vehicle {
    #[serde(rename = "stato", deserialize_with = "lenient_string")]
    state: String,
}

#[derive(Deserialize)]
struct StopList {
    #[serde(rename = "fermata", default)]
    stops: Vec<StopProgress>,
}

/// Read access to the upstream feed.
#[async_trait]
pub trait FeedClient: Send + Sync {
    /// Runs expected at a stop within the lookahead window, as reported.
    async fn stop_snapshot(
        &self,
        stop_id: &str,
        lookahead_minutes: u32,
    ) -> Result<Vec<RunSummary>, FeedError>;

    /// Parsed live progress for one run.
    async fn run_progress(&self, run_id: &str) -> Result<RideProgress, FeedError>;

    /// Raw upstream progress payload, passed through untouched.
    async fn run_progress_raw(&self, run_id: &str) -> Result<Value, FeedError>;
}

/// HTTPS feed client with a fixed request timeout.
pub struct HttpFeedClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFeedClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FEED_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    async fn get_json(&self, url: &str) -> Result<Value, FeedError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }
        Ok(response.json().await?)
    }
}

#[async_trait]
impl FeedClient for HttpFeedClient {
    async fn stop_snapshot(
        &self,
        stop_id: &str,
        lookahead_minutes: u32,
    ) -> Result<Vec<RunSummary>, FeedError> {
        let url = format!(
            "{}/v1/stop/palina?id={}&delta={}",
            self.base_url, stop_id, lookahead_minutes
        );
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }

        let envelope: StopEnvelope = response.json().await?;
        Ok(envelope
            .payload
            .and_then(|p| p.runs)
            .unwrap_or_default())
    }

    async fn run_progress(&self, run_id: &str) -> Result<RideProgress, FeedError> {
        let url = format!("{}/v1/route/ride?id={}", self.base_url, run_id);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(FeedError::Status(response.status().as_u16()));
        }

        let envelope: RideEnvelope = response.json().await?;
        let payload = envelope
            .payload
            .ok_or_else(|| FeedError::Malformed(format!("no payload for run {}", run_id)))?;

        Ok(RideProgress {
            vehicle_state: payload.vehicle.state,
            stops: payload.stop_list.stops,
        })
    }

    async fn run_progress_raw(&self, run_id: &str) -> Result<Value, FeedError> {
        let url = format!("{}/v1/route/ride?id={}", self.base_url, run_id);
        self.get_json(&url).await
    }
}
