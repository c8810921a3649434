//! HTTP search backend
//!
//! Wraps the external place-search and coordinate-conversion endpoints
//! behind [`SearchBackend`]. The search provider returns positions in its
//! native projected coordinate system; conversion to geographic coordinates
//! happens through a batch endpoint that preserves order and count.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::geo::Coordinate;
use crate::{Error, Result};

use super::{NativeCoord, RawPlace, SearchBackend};

/// Request timeout for search and conversion endpoints
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Place search + coordinate conversion over HTTP
pub struct HttpSearchBackend {
    client: reqwest::Client,
    search_endpoint: Url,
    transform_endpoint: Url,
    app_key: String,
}

impl HttpSearchBackend {
    /// Create a new backend
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the app key is missing
    pub fn new(search_endpoint: Url, transform_endpoint: Url, app_key: String) -> Result<Self> {
        if app_key.is_empty() {
            return Err(Error::Config("place search app key required".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            search_endpoint,
            transform_endpoint,
            app_key,
        })
    }
}

#[async_trait]
impl SearchBackend for HttpSearchBackend {
    async fn text_search(&self, query: &str, limit: usize) -> Result<Vec<RawPlace>> {
        let response = self
            .client
            .get(self.search_endpoint.clone())
            .header("appKey", &self.app_key)
            .query(&[("searchKeyword", query), ("count", &limit.to_string())])
            .send()
            .await
            .map_err(|e| Error::Provider(format!("place search failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "search provider error {status}: {body}"
            )));
        }

        let payload: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("malformed search response: {e}")))?;

        let places = payload
            .pois
            .into_iter()
            .filter_map(|poi| {
                let x = poi.x.trim().parse::<f64>().ok()?;
                let y = poi.y.trim().parse::<f64>().ok()?;
                Some(RawPlace {
                    name: poi.name,
                    upper_addr: poi.upper_addr_name,
                    middle_addr: poi.middle_addr_name,
                    lower_addr: poi.lower_addr_name,
                    native: NativeCoord { x, y },
                })
            })
            .collect();

        Ok(places)
    }

    async fn transform_coords(&self, points: &[NativeCoord]) -> Result<Vec<Coordinate>> {
        #[derive(serde::Serialize)]
        struct TransformRequest<'a> {
            points: &'a [PointBody],
        }

        #[derive(serde::Serialize)]
        struct PointBody {
            x: f64,
            y: f64,
        }

        if points.is_empty() {
            return Ok(Vec::new());
        }

        let body: Vec<PointBody> = points.iter().map(|p| PointBody { x: p.x, y: p.y }).collect();

        let response = self
            .client
            .post(self.transform_endpoint.clone())
            .header("appKey", &self.app_key)
            .json(&TransformRequest { points: &body })
            .send()
            .await
            .map_err(|e| Error::Provider(format!("coordinate conversion failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Provider(format!(
                "conversion provider error {status}: {text}"
            )));
        }

        let payload: TransformResponse = response
            .json()
            .await
            .map_err(|e| Error::Provider(format!("malformed conversion response: {e}")))?;

        // Order and count must be preserved; invalid pairs fail the batch so
        // the resolver can treat it as a whole-batch failure
        let mut out = Vec::with_capacity(payload.points.len());
        for p in &payload.points {
            let Some(c) = Coordinate::new(p.lat, p.lon) else {
                return Err(Error::Provider(format!(
                    "conversion produced invalid coordinate ({}, {})",
                    p.lat, p.lon
                )));
            };
            out.push(c);
        }

        Ok(out)
    }
}

/// Search endpoint response
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    pois: Vec<Poi>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Poi {
    #[serde(default)]
    name: String,
    #[serde(default)]
    upper_addr_name: String,
    #[serde(default)]
    middle_addr_name: String,
    #[serde(default)]
    lower_addr_name: String,
    /// Native-system axes arrive as strings
    #[serde(default, rename = "noorLon")]
    x: String,
    #[serde(default, rename = "noorLat")]
    y: String,
}

/// Conversion endpoint response
#[derive(Debug, Deserialize)]
struct TransformResponse {
    #[serde(default)]
    points: Vec<GeoPoint>,
}

#[derive(Debug, Deserialize)]
struct GeoPoint {
    #[serde(default)]
    lat: f64,
    #[serde(default)]
    lon: f64,
}
