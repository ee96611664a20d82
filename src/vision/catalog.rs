//! Model catalog resolution
//!
//! Builds the ranked candidate list for a call from three sources: the model
//! that last succeeded, the capability list fetched once per session, and a
//! static list of models known to work on the free tier.

use std::future::Future;

use serde::Deserialize;
use tokio::sync::{OnceCell, RwLock};

use super::transport::InferenceTransport;

/// Speed tier of a candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Fast,
    Other,
}

/// Where a candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Last model that answered successfully
    Cached,
    /// Capability-list endpoint
    Dynamic,
    /// Built-in fallback list
    Static,
}

/// A model identifier eligible for an inference attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCandidate {
    pub id: String,
    pub tier: Tier,
    pub origin: Origin,
}

/// Tunable ranking policy
///
/// Any field left out of a config file keeps its default.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogPolicy {
    /// Fetch the capability list at all
    pub dynamic_catalog: bool,
    /// A dynamic entry must contain one of these (lowercase)
    pub allow: Vec<String>,
    /// A dynamic entry must contain none of these (billing-tier markers)
    pub deny: Vec<String>,
    /// Substring identifying the fast tier
    pub fast_marker: String,
    /// Maximum dynamic entries taken per tier
    pub per_tier_cap: usize,
    /// Static fast-tier fallbacks, in priority order
    pub static_fast: Vec<String>,
    /// Static other-tier fallbacks, in priority order
    pub static_other: Vec<String>,
}

impl Default for CatalogPolicy {
    fn default() -> Self {
        let owned = |items: &[&str]| -> Vec<String> { items.iter().map(ToString::to_string).collect() };
        Self {
            dynamic_catalog: true,
            allow: owned(&["flash", "1.5-pro", "pro-vision"]),
            deny: owned(&["exp", "2.0", "2.5", "pro-2", "preview"]),
            fast_marker: "flash".to_string(),
            per_tier_cap: 2,
            static_fast: owned(&["gemini-1.5-flash", "gemini-1.5-flash-8b"]),
            static_other: owned(&["gemini-1.5-pro", "gemini-pro-vision"]),
        }
    }
}

impl CatalogPolicy {
    /// Whether a dynamically listed model may be tried
    #[must_use]
    pub fn is_eligible(&self, model: &str) -> bool {
        let lower = model.to_lowercase();
        self.allow.iter().any(|a| lower.contains(a.as_str()))
            && !self.deny.iter().any(|d| lower.contains(d.as_str()))
    }

    /// Tier of a model identifier
    #[must_use]
    pub fn tier_of(&self, model: &str) -> Tier {
        if model.to_lowercase().contains(self.fast_marker.as_str()) {
            Tier::Fast
        } else {
            Tier::Other
        }
    }

    /// The static fallback list on its own
    #[must_use]
    pub fn static_candidates(&self) -> Vec<ModelCandidate> {
        rank(self, &[], None)
    }
}

/// Shared per-session state: the last successful model and the fetched catalog
///
/// Safe to share across concurrent calls. The catalog cell is filled at most
/// once, even when several calls race on the first fetch.
#[derive(Debug, Default)]
pub struct SessionCache {
    last_success: RwLock<Option<String>>,
    catalog: OnceCell<Vec<String>>,
}

impl SessionCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Model that most recently answered successfully
    pub async fn last_success(&self) -> Option<String> {
        self.last_success.read().await.clone()
    }

    /// Remember the model that just answered
    pub async fn record_success(&self, model: &str) {
        let mut slot = self.last_success.write().await;
        if slot.as_deref() != Some(model) {
            tracing::debug!(model, "caching successful model");
            *slot = Some(model.to_string());
        }
    }

    /// Dynamic catalog, if it has been fetched (or the fetch failed)
    #[must_use]
    pub fn catalog(&self) -> Option<&[String]> {
        self.catalog.get().map(Vec::as_slice)
    }

    /// Return the catalog, running `fetch` only if it has never run
    pub async fn catalog_or_fetch<F, Fut>(&self, fetch: F) -> &[String]
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Vec<String>>,
    {
        self.catalog.get_or_init(fetch).await.as_slice()
    }
}

/// Build the ranked candidate list for one call
///
/// A failed capability fetch is cached as an empty list and never retried.
pub async fn resolve_candidates(
    policy: &CatalogPolicy,
    cache: &SessionCache,
    transport: &dyn InferenceTransport,
) -> Vec<ModelCandidate> {
    let dynamic: &[String] = if policy.dynamic_catalog {
        cache
            .catalog_or_fetch(move || async move {
                match transport.list_models().await {
                    Ok(entries) => {
                        let names: Vec<String> = entries
                            .into_iter()
                            .filter(super::transport::CatalogEntry::supports_generate)
                            .map(|e| e.name)
                            .collect();
                        tracing::info!(count = names.len(), "fetched model catalog");
                        names
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "model catalog unavailable, using static list");
                        Vec::new()
                    }
                }
            })
            .await
    } else {
        &[]
    };

    let preferred = cache.last_success().await;
    rank(policy, dynamic, preferred.as_deref())
}

/// Rank candidates: capped dynamic fast tier, capped dynamic other tier,
/// remaining static fallbacks, then promote `preferred` to the front
#[must_use]
pub fn rank(policy: &CatalogPolicy, dynamic: &[String], preferred: Option<&str>) -> Vec<ModelCandidate> {
    let mut eligible: Vec<&str> = Vec::new();
    for name in dynamic {
        if policy.is_eligible(name) && !eligible.contains(&name.as_str()) {
            eligible.push(name);
        }
    }

    let mut ranked: Vec<ModelCandidate> = Vec::new();
    for tier in [Tier::Fast, Tier::Other] {
        ranked.extend(
            eligible
                .iter()
                .filter(|name| policy.tier_of(name) == tier)
                .take(policy.per_tier_cap)
                .map(|name| ModelCandidate {
                    id: (*name).to_string(),
                    tier,
                    origin: Origin::Dynamic,
                }),
        );
    }

    for name in policy.static_fast.iter().chain(&policy.static_other) {
        if !ranked.iter().any(|c| &c.id == name) {
            ranked.push(ModelCandidate {
                id: name.clone(),
                tier: policy.tier_of(name),
                origin: Origin::Static,
            });
        }
    }

    if let Some(pos) = preferred.and_then(|p| ranked.iter().position(|c| c.id == p)) {
        let mut promoted = ranked.remove(pos);
        promoted.origin = Origin::Cached;
        ranked.insert(0, promoted);
    }

    ranked
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(ToString::to_string).collect()
    }

    fn ids(candidates: &[ModelCandidate]) -> Vec<&str> {
        candidates.iter().map(|c| c.id.as_str()).collect()
    }

    #[test]
    fn test_static_only_when_no_dynamic() {
        let ranked = rank(&CatalogPolicy::default(), &[], None);
        assert_eq!(
            ids(&ranked),
            [
                "gemini-1.5-flash",
                "gemini-1.5-flash-8b",
                "gemini-1.5-pro",
                "gemini-pro-vision"
            ]
        );
        assert!(ranked.iter().all(|c| c.origin == Origin::Static));
        assert_eq!(ranked[0].tier, Tier::Fast);
        assert_eq!(ranked[2].tier, Tier::Other);
    }

    #[test]
    fn test_billing_tier_models_filtered() {
        let policy = CatalogPolicy::default();
        assert!(!policy.is_eligible("gemini-2.0-flash"));
        assert!(!policy.is_eligible("gemini-2.5-pro"));
        assert!(!policy.is_eligible("gemini-1.5-flash-exp-0827"));
        assert!(!policy.is_eligible("gemini-1.5-pro-preview"));
        assert!(!policy.is_eligible("text-embedding-004"));
        assert!(policy.is_eligible("gemini-1.5-flash-002"));
        assert!(policy.is_eligible("Gemini-1.5-Pro-latest"));
    }

    #[test]
    fn test_dynamic_tiers_capped_and_ordered() {
        let dynamic = names(&[
            "gemini-1.5-pro-001",
            "gemini-1.5-flash-001",
            "gemini-1.5-flash-002",
            "gemini-1.5-flash-latest",
            "gemini-1.5-pro-002",
            "gemini-1.5-pro-latest",
        ]);
        let ranked = rank(&CatalogPolicy::default(), &dynamic, None);
        assert_eq!(
            ids(&ranked),
            [
                "gemini-1.5-flash-001",
                "gemini-1.5-flash-002",
                "gemini-1.5-pro-001",
                "gemini-1.5-pro-002",
                "gemini-1.5-flash",
                "gemini-1.5-flash-8b",
                "gemini-1.5-pro",
                "gemini-pro-vision"
            ]
        );
        assert_eq!(ranked[0].origin, Origin::Dynamic);
        assert_eq!(ranked[4].origin, Origin::Static);
    }

    #[test]
    fn test_no_duplicates_when_dynamic_overlaps_static() {
        let dynamic = names(&["gemini-1.5-flash", "gemini-1.5-flash", "gemini-1.5-pro"]);
        let ranked = rank(&CatalogPolicy::default(), &dynamic, None);
        let mut seen = std::collections::HashSet::new();
        assert!(ranked.iter().all(|c| seen.insert(c.id.clone())));
        assert_eq!(ranked.len(), 4);
        assert_eq!(ranked[0].origin, Origin::Dynamic);
    }

    #[test]
    fn test_preferred_moves_to_front() {
        let ranked = rank(&CatalogPolicy::default(), &[], Some("gemini-1.5-pro"));
        assert_eq!(ranked[0].id, "gemini-1.5-pro");
        assert_eq!(ranked[0].origin, Origin::Cached);
        assert_eq!(ranked.len(), 4);
    }

    #[test]
    fn test_unknown_preferred_ignored() {
        let ranked = rank(&CatalogPolicy::default(), &[], Some("gemini-ultra"));
        assert_eq!(ranked[0].id, "gemini-1.5-flash");
        assert!(ranked.iter().all(|c| c.id != "gemini-ultra"));
    }

    #[test]
    fn test_cap_is_tunable() {
        let policy = CatalogPolicy {
            per_tier_cap: 1,
            static_fast: vec![],
            static_other: vec![],
            ..CatalogPolicy::default()
        };
        let dynamic = names(&["gemini-1.5-flash-001", "gemini-1.5-flash-002", "gemini-1.5-pro-001"]);
        assert_eq!(
            ids(&rank(&policy, &dynamic, None)),
            ["gemini-1.5-flash-001", "gemini-1.5-pro-001"]
        );
    }

    #[test]
    fn test_partial_policy_from_toml_keeps_defaults() {
        let policy: CatalogPolicy = toml::from_str("per_tier_cap = 3").unwrap();
        assert_eq!(policy.per_tier_cap, 3);
        assert_eq!(policy.static_fast.len(), 2);
        assert!(policy.dynamic_catalog);
    }

    #[tokio::test]
    async fn test_catalog_fetched_once() {
        let fetches = AtomicUsize::new(0);
        let cache = SessionCache::new();
        for _ in 0..3 {
            let catalog = cache
                .catalog_or_fetch(|| async {
                    fetches.fetch_add(1, Ordering::SeqCst);
                    names(&["a"])
                })
                .await;
            assert_eq!(catalog, ["a"]);
        }
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_fetch_result_is_cached() {
        let cache = SessionCache::new();
        assert!(cache.catalog().is_none());
        cache.catalog_or_fetch(|| async { Vec::new() }).await;
        assert_eq!(cache.catalog(), Some(&[][..]));
    }

    #[tokio::test]
    async fn test_record_success_overwrites() {
        let cache = SessionCache::new();
        assert_eq!(cache.last_success().await, None);
        cache.record_success("a").await;
        cache.record_success("b").await;
        assert_eq!(cache.last_success().await.as_deref(), Some("b"));
    }
}
