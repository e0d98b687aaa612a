// Connector trait — the provider-agnostic ingestion interface.
//
// Every satellite-fire provider implements connect / fetch / validate /
// metadata / close. Expected failure modes (bad status, unreachable host,
// malformed body) are reported as values, never as Err: `connect` returns a
// bool and `fetch_data` returns an error-tagged FetchResult.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::Serialize;

/// Provider query parameters (merged with the credential on each request).
pub type FetchParameters = BTreeMap<String, String>;

/// Response body formats the connectors distinguish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataFormat {
    Json,
    Csv,
    Binary,
}

impl DataFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataFormat::Json => "json",
            DataFormat::Csv => "csv",
            DataFormat::Binary => "binary",
        }
    }
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of a single fetch. Callers must check for `Error` before use.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchResult {
    Json(serde_json::Value),
    Csv(String),
    Binary(Vec<u8>),
    Error(String),
}

impl FetchResult {
    /// Format tag of a successful fetch; None for error results.
    pub fn format(&self) -> Option<DataFormat> {
        match self {
            FetchResult::Json(_) => Some(DataFormat::Json),
            FetchResult::Csv(_) => Some(DataFormat::Csv),
            FetchResult::Binary(_) => Some(DataFormat::Binary),
            FetchResult::Error(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            FetchResult::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, FetchResult::Error(_))
    }
}

/// Connection lifecycle: Disconnected -> Connected -> Closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectorState {
    Disconnected,
    Connected,
    Closed,
}

/// Static description of a data source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceMetadata {
    pub name: &'static str,
    pub description: &'static str,
    pub data_types: Vec<&'static str>,
    pub spatial_coverage: &'static str,
    pub temporal_resolution: &'static str,
    pub formats: Vec<&'static str>,
    pub documentation_url: &'static str,
}

/// A satellite-fire data provider.
///
/// A connector owns a single session; operations that touch it take
/// `&mut self`, so concurrent fetches need external synchronization.
#[async_trait]
pub trait Connector: Send {
    /// Open a session and probe the provider. Returns false when the
    /// provider is unreachable or rejects the credential.
    async fn connect(&mut self) -> bool;

    /// Fetch raw records, connecting first if needed.
    async fn fetch_data(&mut self, parameters: &FetchParameters) -> FetchResult;

    /// Structural check of a fetch result (no semantic validation).
    fn validate_data(&self, result: &FetchResult) -> bool {
        validate_structure(result)
    }

    fn metadata(&self) -> SourceMetadata;

    /// Release the session. Calling it again is a no-op.
    async fn close(&mut self);

    fn state(&self) -> ConnectorState;
}

/// Format-dispatched structural validation shared by all connectors.
///
/// - error results are invalid
/// - JSON must be an object with a `features` key (geojson shape)
/// - CSV must have a header containing "latitude" plus at least one row
/// - binary must be non-empty
pub fn validate_structure(result: &FetchResult) -> bool {
    match result {
        FetchResult::Error(_) => false,
        FetchResult::Json(value) => value
            .as_object()
            .is_some_and(|object| object.contains_key("features")),
        FetchResult::Csv(text) => {
            let mut lines = text.trim().lines();
            match (lines.next(), lines.next()) {
                (Some(header), Some(_)) => header.to_lowercase().contains("latitude"),
                _ => false,
            }
        }
        FetchResult::Binary(bytes) => !bytes.is_empty(),
    }
}
