use std::time::Duration;

use crate::models::{Poi, UserProfile};

const POPULAR_CATEGORIES: [&str; 4] = ["ristorante", "bar", "abbigliamento", "supermercato"];

/// Content-addressed cache key for a (user, poi) generation request
/// (spec.md §4.3). Grounded on `generate_cache_key` in `cache_utils.py`,
/// including the 5-year age bucketing and sorted/deduped interests that
/// maximise cross-request cache hits.
pub fn fingerprint(profile: &UserProfile, poi_name: &str, poi_category: &str) -> String {
    let bucket = (profile.age / 5) * 5;
    let age_range = format!("{bucket}-{}", bucket + 4);

    let profession = profile.profession.to_lowercase();

    let mut interests: Vec<String> = profile
        .interests
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    interests.sort();
    interests.dedup();
    let normalized_interests = interests.join(",");

    let poi_name = poi_name.to_lowercase();
    let poi_category = poi_category.to_lowercase();

    let combined = format!("{age_range}:{profession}:{normalized_interests}:{poi_name}:{poi_category}");
    format!("{:x}", md5::compute(combined.as_bytes()))
}

/// Base TTL doubled for categories with high repeat-visit probability.
pub fn adaptive_ttl(base_ttl: Duration, poi_category: &str) -> Duration {
    if POPULAR_CATEGORIES.contains(&poi_category.to_lowercase().as_str()) {
        base_ttl * 2
    } else {
        base_ttl
    }
}

/// Convenience wrapper matching C6's call shape: fingerprint a `Poi` rather
/// than separate name/category strings.
pub fn fingerprint_for_poi(profile: &UserProfile, poi: &Poi) -> String {
    fingerprint(profile, &poi.shop_name, &poi.category)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(age: u8, profession: &str, interests: &str) -> UserProfile {
        UserProfile {
            user_id: 1,
            age,
            profession: profession.to_string(),
            interests: interests.to_string(),
        }
    }

    #[test]
    fn equivalent_ages_within_bucket_share_a_fingerprint() {
        let a = fingerprint(&profile(31, "Engineer", "hiking,coffee"), "Bar Roma", "Bar");
        let b = fingerprint(&profile(34, "engineer", "Coffee, Hiking"), "bar roma", "bar");
        assert_eq!(a, b);
    }

    #[test]
    fn different_age_bucket_changes_fingerprint() {
        let a = fingerprint(&profile(29, "engineer", "hiking"), "bar roma", "bar");
        let b = fingerprint(&profile(30, "engineer", "hiking"), "bar roma", "bar");
        assert_ne!(a, b);
    }

    #[test]
    fn popular_category_doubles_ttl() {
        let base = Duration::from_secs(100);
        assert_eq!(adaptive_ttl(base, "Ristorante"), Duration::from_secs(200));
        assert_eq!(adaptive_ttl(base, "museum"), base);
    }
}
