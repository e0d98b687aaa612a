// GET /hotspots/ — hotspots matching optional query filters.
//
// Every parameter is optional. The bounding box only applies when all four
// of min_lon / min_lat / max_lon / max_lat are present. Parameters arrive
// as strings so a bad value becomes a 422 with a JSON error body instead of
// the extractor's plain-text rejection.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::query::criteria::parse_datetime_param;
use crate::query::{BoundingBox, QueryCriteria};
use crate::web::{api_error, AppState};

#[derive(Deserialize, Default)]
pub struct HotspotsQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub min_confidence: Option<String>,
    /// Provider label, e.g. MODIS or VIIRS
    pub source: Option<String>,
    pub biome: Option<String>,
    pub min_lon: Option<String>,
    pub min_lat: Option<String>,
    pub max_lon: Option<String>,
    pub max_lat: Option<String>,
}

impl HotspotsQuery {
    /// Parse into criteria. Empty values count as absent.
    pub fn to_criteria(&self) -> Result<QueryCriteria, String> {
        let start_date = present(&self.start_date)
            .map(|v| parse_datetime_param(v).map_err(|e| format!("start_date: {e}")))
            .transpose()?;
        let end_date = present(&self.end_date)
            .map(|v| parse_datetime_param(v).map_err(|e| format!("end_date: {e}")))
            .transpose()?;
        let min_confidence = present(&self.min_confidence)
            .map(|v| {
                v.parse::<i32>()
                    .map_err(|_| format!("min_confidence: expected an integer, got '{v}'"))
            })
            .transpose()?;

        let bounding_box = BoundingBox::from_parts(
            coordinate("min_lon", &self.min_lon)?,
            coordinate("min_lat", &self.min_lat)?,
            coordinate("max_lon", &self.max_lon)?,
            coordinate("max_lat", &self.max_lat)?,
        );

        Ok(QueryCriteria {
            start_date,
            end_date,
            min_confidence,
            source: present(&self.source).map(str::to_string),
            biome: present(&self.biome).map(str::to_string),
            bounding_box,
        })
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn coordinate(name: &str, value: &Option<String>) -> Result<Option<f64>, String> {
    present(value)
        .map(|v| {
            v.parse::<f64>()
                .map_err(|_| format!("{name}: expected a number, got '{v}'"))
        })
        .transpose()
}

pub async fn list_hotspots(
    State(state): State<AppState>,
    Query(params): Query<HotspotsQuery>,
) -> Response {
    let criteria = match params.to_criteria() {
        Ok(criteria) => criteria,
        Err(message) => return api_error(StatusCode::UNPROCESSABLE_ENTITY, &message),
    };

    match state.service.execute(&criteria).await {
        Ok(hotspots) => Json(hotspots).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "DB error querying hotspots");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        }
    }
}
