//! POI candidate scoring
//!
//! Upstream full-text search is noisy for Korean place names and short
//! queries; scoring compensates without requiring an exact-match API.

/// Maximum distance bonus in points
const DISTANCE_BONUS_MAX: f64 = 20.0;

/// Distance at which the bonus decays to zero, in meters
const DISTANCE_BONUS_RANGE_M: f64 = 2000.0;

/// Landmark suffixes that strengthen a match when the query ends with one
/// and the candidate name contains it
const LANDMARK_SUFFIXES: &[&str] = &[
    "역",
    "공원",
    "대학교",
    "병원",
    "터미널",
    "공항",
    "해수욕장",
    "시장",
    "백화점",
];

/// City/region names that strengthen a match when present in both the query
/// and the candidate's address
const REGION_NAMES: &[&str] = &[
    "서울", "부산", "해운대", "수영", "남구", "동래", "사하", "금정", "연제", "기장",
];

/// Lowercase and strip all whitespace
fn normalized(s: &str) -> String {
    s.to_lowercase().split_whitespace().collect()
}

/// Keep only alphanumeric characters (covers Hangul syllables)
fn alphanumeric_only(s: &str) -> String {
    s.chars().filter(|c| c.is_alphanumeric()).collect()
}

/// Score one candidate against the query
///
/// Name match tiers: exact normalized = 100, punctuation-insensitive
/// exact = 90, name contains query = 60, query contains name = 50.
/// Landmark-suffix and region hits add 20 and 15; a linear distance bonus
/// adds up to 20, decaying to 0 at 2 km from the reference.
#[must_use]
pub fn score_candidate(
    query: &str,
    name: &str,
    address: &str,
    distance_m: Option<f64>,
) -> f64 {
    let nq = normalized(query);
    let nn = normalized(name);

    let mut score = if nn == nq && !nq.is_empty() {
        100.0
    } else if !nq.is_empty() && alphanumeric_only(&nn) == alphanumeric_only(&nq) {
        90.0
    } else if nq.chars().count() >= 2 && nn.contains(&nq) {
        60.0
    } else if nn.chars().count() >= 2 && nq.contains(&nn) {
        50.0
    } else {
        0.0
    };

    if let Some(suffix) = LANDMARK_SUFFIXES.iter().find(|s| nq.ends_with(*s)) {
        if nn.contains(suffix) {
            score += 20.0;
        }
    }

    if REGION_NAMES
        .iter()
        .any(|r| nq.contains(r) && address.contains(r))
    {
        score += 15.0;
    }

    if let Some(d) = distance_m {
        score += (DISTANCE_BONUS_MAX * (1.0 - d / DISTANCE_BONUS_RANGE_M))
            .clamp(0.0, DISTANCE_BONUS_MAX);
    }

    score
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_scores_100() {
        assert_eq!(score_candidate("센텀시티", "센텀시티", "", None), 100.0);
    }

    #[test]
    fn whitespace_and_case_ignored() {
        assert_eq!(score_candidate("센텀 시티", "센텀시티", "", None), 100.0);
        assert_eq!(score_candidate("BEXCO", "bexco", "", None), 100.0);
    }

    #[test]
    fn punctuation_insensitive_match_scores_90() {
        assert_eq!(score_candidate("센텀-시티", "센텀시티", "", None), 90.0);
    }

    #[test]
    fn name_containing_query_scores_60() {
        assert_eq!(score_candidate("센텀", "센텀시티몰", "", None), 60.0);
    }

    #[test]
    fn query_containing_name_scores_50() {
        assert_eq!(score_candidate("부산 서면역 가는길", "서면역", "", None), 50.0);
    }

    #[test]
    fn single_char_substring_does_not_match() {
        assert_eq!(score_candidate("역", "서면역", "", None), 0.0);
    }

    #[test]
    fn landmark_suffix_bonus() {
        // Query ends with 역 and the name contains it
        let with = score_candidate("서면역", "서면역 1번출구", "", None);
        let without = score_candidate("서면", "서면역 1번출구", "", None);
        assert_eq!(with - without, 20.0);
    }

    #[test]
    fn region_bonus_requires_both_sides() {
        let both = score_candidate("부산 시민공원", "시민공원", "부산광역시 부산진구", None);
        let query_only = score_candidate("부산 시민공원", "시민공원", "대구광역시", None);
        assert_eq!(both - query_only, 15.0);
    }

    #[test]
    fn distance_bonus_decays_linearly() {
        let near = score_candidate("a", "b", "", Some(0.0));
        let mid = score_candidate("a", "b", "", Some(1000.0));
        let far = score_candidate("a", "b", "", Some(2000.0));
        let beyond = score_candidate("a", "b", "", Some(5000.0));

        assert_eq!(near, 20.0);
        assert_eq!(mid, 10.0);
        assert_eq!(far, 0.0);
        assert_eq!(beyond, 0.0);
    }
}
