use crate::config::Config;
use crate::constants::*;
use crate::error::{AppError, Result};
use crate::models::{BoundingRegion, PointOfInterest};
use crate::services::poi_provider::PoiProvider;
use async_trait::async_trait;
use geo::{Coord, Geometry, GeometryCollection, LineString, MultiPolygon, Point, Polygon};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Overpass API client fetching tagged OSM features for a bounding box.
/// Endpoints are used round-robin with exponential backoff on 429/504.
#[derive(Clone)]
pub struct OverpassClient {
    client: Client,
    endpoints: Vec<String>,
    current_endpoint_idx: Arc<AtomicUsize>,
    timeout_seconds: u64,
    max_retries: usize,
}

impl OverpassClient {
    pub fn new(endpoints: Vec<String>, timeout_seconds: u64, max_retries: usize) -> Self {
        let endpoints = if endpoints.is_empty() {
            DEFAULT_OVERPASS_ENDPOINTS
                .iter()
                .map(|s| s.to_string())
                .collect()
        } else {
            endpoints
        };

        OverpassClient {
            client: Client::new(),
            endpoints,
            current_endpoint_idx: Arc::new(AtomicUsize::new(0)),
            timeout_seconds,
            max_retries,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.overpass_endpoints.clone(),
            config.overpass_timeout_seconds,
            config.overpass_max_retries,
        )
    }

    /// Get the next endpoint to try (round-robin)
    fn get_next_endpoint(&self) -> String {
        let idx = self.current_endpoint_idx.fetch_add(1, Ordering::Relaxed);
        self.endpoints[idx % self.endpoints.len()].clone()
    }

    /// Query every feature in `region` carrying any of the tag keys.
    pub async fn query_features(
        &self,
        region: &BoundingRegion,
        tags: &[String],
    ) -> Result<Vec<PointOfInterest>> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }

        let query = self.build_query(region, tags);
        tracing::debug!("Overpass query: {}", query);

        let response = self.execute_query_with_retry(query).await?;
        let pois = convert_elements(response.elements);

        tracing::info!(
            "Overpass returned {} features for region N{:.4} S{:.4} E{:.4} W{:.4}",
            pois.len(),
            region.north,
            region.south,
            region.east,
            region.west
        );

        Ok(pois)
    }

    /// Execute query with retry on rate limiting and gateway timeouts.
    async fn execute_query_with_retry(&self, query: String) -> Result<OverpassResponse> {
        let mut retry_count = 0;

        loop {
            let endpoint = self.get_next_endpoint();

            let response_result = self
                .client
                .post(&endpoint)
                .header("Content-Type", "application/x-www-form-urlencoded")
                .body(format!("data={}", urlencoding::encode(&query)))
                .timeout(Duration::from_secs(self.timeout_seconds))
                .send()
                .await;

            // Only 429/504 responses are retried; transport failures surface at once.
            let response = response_result.map_err(|e| {
                let error_msg = if e.is_timeout() {
                    "Request timed out".to_string()
                } else {
                    format!("Request failed: {}", e)
                };
                AppError::PoiProvider(format!("{} ({})", error_msg, endpoint))
            })?;

            let status = response.status();

            if status.is_success() {
                return response.json::<OverpassResponse>().await.map_err(|e| {
                    AppError::PoiProvider(format!("Failed to parse Overpass response: {}", e))
                });
            }

            let is_retryable = status.as_u16() == OVERPASS_HTTP_TOO_MANY_REQUESTS
                || status.as_u16() == OVERPASS_HTTP_GATEWAY_TIMEOUT;

            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            if is_retryable && retry_count < self.max_retries {
                retry_count += 1;
                let backoff_ms = backoff_ms(retry_count);

                tracing::warn!(
                    "Overpass returned HTTP {}, retrying in {}ms (attempt {}/{})",
                    status,
                    backoff_ms,
                    retry_count + 1,
                    self.max_retries + 1
                );

                tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                continue;
            }

            return Err(AppError::PoiProvider(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }
    }

    fn build_query(&self, region: &BoundingRegion, tags: &[String]) -> String {
        let bbox = format!(
            "{},{},{},{}",
            region.south, region.west, region.north, region.east
        );

        let mut query_parts = vec![format!(
            "[out:json][timeout:{}][maxsize:{}];(",
            self.timeout_seconds, OVERPASS_MAX_RESPONSE_BYTES
        )];

        for key in tags {
            query_parts.push(format!(r#"nwr["{}"]({});"#, escape_key(key), bbox));
        }

        query_parts.push(");out geom;".to_string());
        query_parts.join("\n")
    }
}

impl Default for OverpassClient {
    fn default() -> Self {
        Self::new(
            Vec::new(),
            DEFAULT_OVERPASS_TIMEOUT_SECONDS,
            DEFAULT_OVERPASS_MAX_RETRIES,
        )
    }
}

#[async_trait]
impl PoiProvider for OverpassClient {
    async fn fetch_geometries(
        &self,
        region: &BoundingRegion,
        tags: &[String],
    ) -> Result<Vec<PointOfInterest>> {
        self.query_features(region, tags).await
    }

    fn provider_name(&self) -> &'static str {
        "overpass"
    }
}

fn backoff_ms(retry_count: usize) -> u64 {
    1000 * 2_u64.pow(retry_count as u32)
}

fn escape_key(key: &str) -> String {
    key.replace('\\', "\\\\").replace('"', "\\\"")
}

fn convert_elements(elements: Vec<OverpassElement>) -> Vec<PointOfInterest> {
    elements
        .into_iter()
        .filter_map(|elem| {
            let geometry = element_geometry(&elem)?;
            Some(PointOfInterest {
                osm_id: elem.id,
                geometry,
                tags: elem.tags,
            })
        })
        .collect()
}

/// Nodes become points, open ways line strings, closed ways polygons.
/// Relations keep their member shapes; closed `outer` rings become polygons.
fn element_geometry(elem: &OverpassElement) -> Option<Geometry<f64>> {
    match elem.kind.as_str() {
        "node" => Some(Point::new(elem.lon?, elem.lat?).into()),
        "way" => way_geometry(elem.geometry.as_deref()?),
        "relation" => relation_geometry(&elem.members),
        _ => None,
    }
}

fn way_geometry(points: &[GeometryPoint]) -> Option<Geometry<f64>> {
    let line = to_line_string(points)?;
    if line.0.len() >= 4 && line.is_closed() {
        Some(Polygon::new(line, vec![]).into())
    } else {
        Some(line.into())
    }
}

fn relation_geometry(members: &[RelationMember]) -> Option<Geometry<f64>> {
    let mut outer_ways = Vec::new();
    let mut others: Vec<Geometry<f64>> = Vec::new();

    for member in members {
        match member.kind.as_str() {
            "node" => {
                if let (Some(lat), Some(lon)) = (member.lat, member.lon) {
                    others.push(Point::new(lon, lat).into());
                }
            }
            "way" => {
                let Some(line) = member.geometry.as_deref().and_then(to_line_string) else {
                    continue;
                };
                if member.role == "outer" {
                    outer_ways.push(line);
                } else if member.role != "inner" {
                    others.push(line.into());
                }
            }
            _ => {}
        }
    }

    let (rings, unclosed) = stitch_rings(outer_ways);
    let mut polygons: Vec<Polygon<f64>> = rings
        .into_iter()
        .map(|ring| Polygon::new(ring, vec![]))
        .collect();
    others.extend(unclosed.into_iter().map(Geometry::from));

    match (polygons.len(), others.is_empty()) {
        (0, true) => None,
        (1, true) => polygons.pop().map(Geometry::from),
        (_, true) => Some(MultiPolygon::new(polygons).into()),
        _ => {
            let mut all: Vec<Geometry<f64>> = polygons.into_iter().map(Geometry::from).collect();
            all.extend(others);
            Some(Geometry::GeometryCollection(GeometryCollection::new_from(all)))
        }
    }
}

fn is_ring(coords: &[Coord<f64>]) -> bool {
    coords.len() >= 4 && coords.first() == coords.last()
}

/// Join outer ways that share endpoints into closed rings. A way may need
/// reversing to continue a chain. Chains that never close are returned
/// separately as open lines.
fn stitch_rings(ways: Vec<LineString<f64>>) -> (Vec<LineString<f64>>, Vec<LineString<f64>>) {
    let mut rings = Vec::new();
    let mut unclosed = Vec::new();
    let mut pending: Vec<Vec<Coord<f64>>> = Vec::new();

    for way in ways {
        if is_ring(&way.0) {
            rings.push(way);
        } else {
            pending.push(way.0);
        }
    }
    pending.reverse();

    while let Some(mut chain) = pending.pop() {
        let mut flipped = false;
        while !is_ring(&chain) {
            let Some(&tail) = chain.last() else {
                break;
            };
            let next = pending
                .iter()
                .position(|way| way.first() == Some(&tail) || way.last() == Some(&tail));
            match next {
                Some(idx) => {
                    let mut way = pending.remove(idx);
                    if way.first() != Some(&tail) {
                        way.reverse();
                    }
                    chain.extend(way.into_iter().skip(1));
                }
                None if !flipped => {
                    chain.reverse();
                    flipped = true;
                }
                None => break,
            }
        }

        if is_ring(&chain) {
            rings.push(LineString::new(chain));
        } else {
            unclosed.push(LineString::new(chain));
        }
    }

    (rings, unclosed)
}

fn to_line_string(points: &[GeometryPoint]) -> Option<LineString<f64>> {
    if points.len() < 2 {
        return None;
    }
    Some(LineString::new(
        points
            .iter()
            .map(|p| Coord { x: p.lon, y: p.lat })
            .collect(),
    ))
}

// Overpass API response types

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    #[serde(rename = "type")]
    kind: String,
    id: i64,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    geometry: Option<Vec<GeometryPoint>>,
    #[serde(default)]
    members: Vec<RelationMember>,
    #[serde(default)]
    tags: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct RelationMember {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    lat: Option<f64>,
    #[serde(default)]
    lon: Option<f64>,
    #[serde(default)]
    geometry: Option<Vec<GeometryPoint>>,
}

#[derive(Debug, Deserialize)]
struct GeometryPoint {
    lat: f64,
    lon: f64,
}
