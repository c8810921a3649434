//! POI search and disambiguation
//!
//! Resolves a free-text query plus optional reference location into a
//! ranked list of candidate places. Provider trouble never reaches the
//! caller: every failure path degrades to a broadened query, the offline
//! candidate table, or an empty list.

mod http;
pub mod score;

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::Result;
use crate::geo::{self, Coordinate};

pub use http::HttpSearchBackend;

/// Maximum candidates returned to the caller
const TOP_RESULTS: usize = 3;

/// Results requested per upstream query
const SEARCH_LIMIT: usize = 10;

/// Offline candidate table used when search or coordinate conversion fails.
/// Names and addresses match the upstream provider's formatting.
const OFFLINE_PLACES: &[(&str, &str, f64, f64)] = &[
    ("센텀시티", "부산광역시 해운대구 우동", 35.169_04, 129.129_59),
    ("해운대해수욕장", "부산광역시 해운대구 우동", 35.158_70, 129.160_31),
    ("광안리해수욕장", "부산광역시 수영구 광안동", 35.153_16, 129.118_69),
    ("부산역", "부산광역시 동구 초량동", 35.115_14, 129.042_20),
    ("서면역", "부산광역시 부산진구 부전동", 35.157_89, 129.059_41),
    ("부산시민공원", "부산광역시 부산진구 범전동", 35.168_62, 129.058_13),
    ("부산대학교", "부산광역시 금정구 장전동", 35.233_36, 129.082_77),
    ("자갈치시장", "부산광역시 중구 남포동", 35.096_69, 129.030_57),
    ("김해국제공항", "부산광역시 강서구 대저2동", 35.179_55, 128.938_21),
    ("부산종합버스터미널", "부산광역시 금정구 노포동", 35.284_26, 129.089_91),
];

/// A place in the provider's native (projected) coordinate system
#[derive(Debug, Clone, Copy)]
pub struct NativeCoord {
    pub x: f64,
    pub y: f64,
}

/// A raw search hit before coordinate conversion
#[derive(Debug, Clone)]
pub struct RawPlace {
    pub name: String,
    pub upper_addr: String,
    pub middle_addr: String,
    pub lower_addr: String,
    /// Position in the provider's native coordinate system
    pub native: NativeCoord,
}

/// Free-text place search collaborator
///
/// `transform_coords` must preserve input order and count on success; a
/// count mismatch is treated as total batch failure by the resolver.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn text_search(&self, query: &str, limit: usize) -> Result<Vec<RawPlace>>;

    async fn transform_coords(&self, points: &[NativeCoord]) -> Result<Vec<Coordinate>>;
}

/// A ranked place candidate
///
/// Transient: exists only during search/disambiguation and is discarded
/// once a selection is confirmed or the search session resets.
#[derive(Debug, Clone, Serialize)]
pub struct Candidate {
    pub name: String,
    pub upper_addr_name: String,
    pub middle_addr_name: String,
    pub lower_addr_name: String,
    pub full_address: String,
    pub position: Coordinate,
    pub score: f64,
    pub distance_m: Option<f64>,
}

/// Resolves free-text queries into ranked place candidates
pub struct PoiResolver {
    backend: Arc<dyn SearchBackend>,
}

impl PoiResolver {
    #[must_use]
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self { backend }
    }

    /// Resolve a query into up to three candidates, best first
    ///
    /// Returns an empty list on total failure; provider errors are logged
    /// and absorbed here.
    pub async fn resolve(&self, query: &str, reference: Option<Coordinate>) -> Vec<Candidate> {
        let query = query.trim();
        if query.is_empty() {
            return Vec::new();
        }

        let Some(places) = self.search_broadened(query).await else {
            tracing::info!(query, "all search queries empty, using offline table");
            return rank(offline_candidates(query), query, reference);
        };

        let natives: Vec<NativeCoord> = places.iter().map(|p| p.native).collect();
        let converted = match self.backend.transform_coords(&natives).await {
            Ok(coords) if coords.len() == natives.len() => coords,
            Ok(coords) => {
                tracing::warn!(
                    expected = natives.len(),
                    got = coords.len(),
                    "coordinate conversion count mismatch, batch failed"
                );
                return rank(offline_candidates(query), query, reference);
            }
            Err(e) => {
                tracing::warn!(error = %e, "coordinate conversion failed");
                return rank(offline_candidates(query), query, reference);
            }
        };

        let candidates = places
            .into_iter()
            .zip(converted)
            .map(|(place, position)| {
                let full_address = [
                    place.upper_addr.as_str(),
                    place.middle_addr.as_str(),
                    place.lower_addr.as_str(),
                ]
                .iter()
                .filter(|s| !s.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join(" ");

                Candidate {
                    name: place.name,
                    upper_addr_name: place.upper_addr,
                    middle_addr_name: place.middle_addr,
                    lower_addr_name: place.lower_addr,
                    full_address,
                    position,
                    score: 0.0,
                    distance_m: None,
                }
            })
            .collect();

        rank(candidates, query, reference)
    }

    /// Run the broadened-query list until one yields results
    ///
    /// Order: the literal query, then the whitespace-stripped variant, then
    /// each whitespace-delimited token longer than one character. Provider
    /// errors count as empty results and move on to the next query.
    async fn search_broadened(&self, query: &str) -> Option<Vec<RawPlace>> {
        for attempt in broadened_queries(query) {
            match self.backend.text_search(&attempt, SEARCH_LIMIT).await {
                Ok(places) if !places.is_empty() => {
                    tracing::debug!(query = %attempt, hits = places.len(), "search hit");
                    return Some(places);
                }
                Ok(_) => {
                    tracing::debug!(query = %attempt, "search returned nothing, broadening");
                }
                Err(e) => {
                    tracing::warn!(query = %attempt, error = %e, "search failed, broadening");
                }
            }
        }
        None
    }
}

/// Generate the ordered list of broadened queries
fn broadened_queries(query: &str) -> Vec<String> {
    let mut out = vec![query.to_string()];

    let stripped: String = query.split_whitespace().collect();
    if stripped != query {
        out.push(stripped);
    }

    for token in query.split_whitespace() {
        if token.chars().count() > 1 && !out.iter().any(|q| q == token) {
            out.push(token.to_string());
        }
    }

    out
}

/// Offline candidates whose name substring-matches the query
fn offline_candidates(query: &str) -> Vec<Candidate> {
    let needle: String = query.split_whitespace().collect::<String>().to_lowercase();

    OFFLINE_PLACES
        .iter()
        .filter(|(name, _, _, _)| {
            let n = name.to_lowercase();
            n.contains(&needle) || needle.contains(&n)
        })
        .filter_map(|(name, address, lat, lon)| {
            let position = Coordinate::new(*lat, *lon)?;
            Some(Candidate {
                name: (*name).to_string(),
                upper_addr_name: String::new(),
                middle_addr_name: String::new(),
                lower_addr_name: String::new(),
                full_address: (*address).to_string(),
                position,
                score: 0.0,
                distance_m: None,
            })
        })
        .collect()
}

/// Score, sort and truncate candidates
///
/// Primary order is score descending. The tie-break uses squared distance
/// in raw coordinate degrees to the reference, a deliberate lightweight
/// approximation rather than true distance.
fn rank(
    mut candidates: Vec<Candidate>,
    query: &str,
    reference: Option<Coordinate>,
) -> Vec<Candidate> {
    for c in &mut candidates {
        c.distance_m = reference.map(|r| geo::haversine_m(r, c.position));
        c.score = score::score_candidate(query, &c.name, &c.full_address, c.distance_m);
    }

    candidates.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| match reference {
                Some(r) => geo::approx_sq_deg(r, a.position)
                    .partial_cmp(&geo::approx_sq_deg(r, b.position))
                    .unwrap_or(Ordering::Equal),
                None => Ordering::Equal,
            })
    });

    candidates.truncate(TOP_RESULTS);
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    // -- broadened_queries ----------------------------------------------------

    #[test]
    fn literal_query_comes_first() {
        let qs = broadened_queries("해운대 해수욕장");
        assert_eq!(qs[0], "해운대 해수욕장");
        assert_eq!(qs[1], "해운대해수욕장");
        assert_eq!(&qs[2..], ["해운대", "해수욕장"]);
    }

    #[test]
    fn single_word_query_is_not_duplicated() {
        assert_eq!(broadened_queries("센텀시티"), vec!["센텀시티"]);
    }

    #[test]
    fn short_tokens_are_skipped() {
        let qs = broadened_queries("강 남역");
        // "강" is a single character, not worth a retry
        assert_eq!(qs, vec!["강 남역", "강남역", "남역"]);
    }

    // -- offline fallback -----------------------------------------------------

    #[test]
    fn offline_table_substring_match() {
        let hits = offline_candidates("센텀시티");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "센텀시티");
    }

    #[test]
    fn offline_table_matches_query_containing_name() {
        let hits = offline_candidates("부산역 1번출구");
        assert!(hits.iter().any(|c| c.name == "부산역"));
    }

    #[test]
    fn offline_table_misses_unknown_place() {
        assert!(offline_candidates("남산타워").is_empty());
    }

    // -- ranking --------------------------------------------------------------

    fn unranked(name: &str, lat: f64, lon: f64) -> Candidate {
        Candidate {
            name: name.to_string(),
            upper_addr_name: String::new(),
            middle_addr_name: String::new(),
            lower_addr_name: String::new(),
            full_address: String::new(),
            position: Coordinate::new(lat, lon).unwrap(),
            score: 0.0,
            distance_m: None,
        }
    }

    #[test]
    fn rank_orders_by_score_descending() {
        let out = rank(
            vec![
                unranked("센텀시티몰", 35.17, 129.13),
                unranked("센텀시티", 35.169, 129.129),
            ],
            "센텀시티",
            None,
        );
        assert_eq!(out[0].name, "센텀시티");
        assert!(out[0].score > out[1].score);
    }

    #[test]
    fn rank_tie_breaks_by_proximity() {
        let reference = Coordinate::new(35.0, 129.0).unwrap();
        // Both are far beyond the distance-bonus range, so scores tie and
        // the squared-degree approximation decides the order
        let out = rank(
            vec![
                unranked("공원 입구", 35.5, 129.5),
                unranked("공원 입구", 35.05, 129.05),
            ],
            "영화의전당",
            Some(reference),
        );
        assert_eq!(out[0].position, Coordinate::new(35.05, 129.05).unwrap());
    }

    #[test]
    fn rank_truncates_to_three() {
        let out = rank(
            (0..5)
                .map(|i| unranked("x", 35.0 + f64::from(i) * 0.01, 129.0))
                .collect(),
            "x",
            None,
        );
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn rank_populates_distance_from_reference() {
        let reference = Coordinate::new(35.0, 129.0).unwrap();
        let out = rank(vec![unranked("a", 35.01, 129.0)], "a", Some(reference));
        let d = out[0].distance_m.unwrap();
        assert!((1000.0..1300.0).contains(&d), "got {d}");
    }
}
