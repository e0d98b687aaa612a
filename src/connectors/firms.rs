// NASA FIRMS (Fire Information for Resource Management System) connector.
//
// One GET endpoint takes the map key plus area / date range / satellite /
// format parameters. The response body format follows the Content-Type
// header: JSON (geojson), CSV, or anything else as opaque bytes.
//
// API docs: https://firms.modaps.eosdis.nasa.gov/api/

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Days, NaiveDate};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use super::traits::{
    Connector, ConnectorState, FetchParameters, FetchResult, SourceMetadata,
};
use crate::config::Config;
use crate::query::criteria::BoundingBox;

/// Default FIRMS area API endpoint.
pub const DEFAULT_FIRMS_BASE_URL: &str = "https://firms.modaps.eosdis.nasa.gov/api/area";

/// Connector for the NASA FIRMS area API.
pub struct FirmsConnector {
    api_key: String,
    base_url: String,
    timeout: Duration,
    session: Option<Client>,
    state: ConnectorState,
}

impl FirmsConnector {
    pub fn new(api_key: impl Into<String>, base_url: &str, timeout: Duration) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout,
            session: None,
            state: ConnectorState::Disconnected,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.firms_api_key.clone(),
            &config.firms_base_url,
            config.http_timeout,
        )
    }

    fn open_session(&self) -> reqwest::Result<Client> {
        Client::builder()
            .user_agent(concat!("geih/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .build()
    }
}

#[async_trait]
impl Connector for FirmsConnector {
    async fn connect(&mut self) -> bool {
        if self.state == ConnectorState::Closed {
            warn!("FIRMS connector already closed; refusing to reconnect");
            return false;
        }

        let client = match self.open_session() {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "Failed to build FIRMS HTTP client");
                return false;
            }
        };
        self.session = Some(client.clone());
        self.state = ConnectorState::Connected;

        // Probe the help endpoint to validate the key and service availability
        let url = format!("{}/help", self.base_url);
        match client
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
        {
            Ok(response) => {
                let ok = response.status() == StatusCode::OK;
                info!(status = %response.status(), ok, "FIRMS connection probe");
                ok
            }
            Err(e) => {
                warn!(error = %e, "FIRMS connection probe failed");
                false
            }
        }
    }

    async fn fetch_data(&mut self, parameters: &FetchParameters) -> FetchResult {
        match self.state {
            ConnectorState::Closed => {
                return FetchResult::Error("Connector is closed".to_string());
            }
            ConnectorState::Disconnected => {
                // The probe result only matters to explicit connect() callers;
                // the fetch below reports its own failure.
                self.connect().await;
            }
            ConnectorState::Connected => {}
        }

        let Some(client) = self.session.clone() else {
            return FetchResult::Error("No HTTP session available".to_string());
        };

        let mut query = FetchParameters::new();
        query.insert("key".to_string(), self.api_key.clone());
        query.extend(parameters.iter().map(|(k, v)| (k.clone(), v.clone())));

        debug!(
            params = ?parameters,
            "FIRMS fetch request"
        );

        let response = match client.get(&self.base_url).query(&query).send().await {
            Ok(response) => response,
            Err(e) => return FetchResult::Error(e.to_string()),
        };

        let status = response.status();
        if !status.is_success() {
            return FetchResult::Error(format!("API returned status code {}", status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if content_type.contains("application/json") {
            match response.json::<serde_json::Value>().await {
                Ok(data) => FetchResult::Json(data),
                Err(e) => FetchResult::Error(format!("Failed to decode JSON body: {e}")),
            }
        } else if content_type.contains("text/csv") {
            match response.text().await {
                Ok(text) => FetchResult::Csv(text),
                Err(e) => FetchResult::Error(format!("Failed to read CSV body: {e}")),
            }
        } else {
            match response.bytes().await {
                Ok(bytes) => FetchResult::Binary(bytes.to_vec()),
                Err(e) => FetchResult::Error(format!("Failed to read response body: {e}")),
            }
        }
    }

    fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            name: "NASA FIRMS",
            description: "Fire Information for Resource Management System",
            data_types: vec!["hotspots", "burned_areas"],
            spatial_coverage: "global",
            temporal_resolution: "daily",
            formats: vec!["csv", "geojson", "shapefile"],
            documentation_url: "https://firms.modaps.eosdis.nasa.gov/api/",
        }
    }

    async fn close(&mut self) {
        if self.state != ConnectorState::Closed {
            debug!("Closing FIRMS session");
        }
        self.session = None;
        self.state = ConnectorState::Closed;
    }

    fn state(&self) -> ConnectorState {
        self.state
    }
}

/// Typed FIRMS query for one ingest window.
#[derive(Debug, Clone, PartialEq)]
pub struct FirmsRequest {
    pub area: BoundingBox,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub satellite: String,
    pub format: String,
}

impl FirmsRequest {
    /// CSV request covering the `days` days up to and including `today`.
    pub fn last_days(area: BoundingBox, satellite: &str, days: u32, today: NaiveDate) -> Self {
        let start_date = today
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        Self {
            area,
            start_date,
            end_date: today,
            satellite: satellite.to_string(),
            format: "csv".to_string(),
        }
    }

    /// `YYYY-MM-DD/YYYY-MM-DD`
    pub fn date_range(&self) -> String {
        format!(
            "{}/{}",
            self.start_date.format("%Y-%m-%d"),
            self.end_date.format("%Y-%m-%d")
        )
    }

    /// Provider parameters. FIRMS expects the area as lat/lon pairs:
    /// `min_lat,min_lon,max_lat,max_lon`.
    pub fn to_parameters(&self) -> FetchParameters {
        let mut params = FetchParameters::new();
        params.insert(
            "area".to_string(),
            format!(
                "{},{},{},{}",
                self.area.min_lat, self.area.min_lon, self.area.max_lat, self.area.max_lon
            ),
        );
        params.insert("date_range".to_string(), self.date_range());
        params.insert("satellite".to_string(), self.satellite.clone());
        params.insert("format".to_string(), self.format.clone());
        params
    }
}
