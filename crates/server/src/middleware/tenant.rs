//! Storefront resolution from the request host.
//!
//! - `{slug}.{root_domain}` is a platform subdomain.
//! - Any other host except `localhost` is a vendor's custom domain.
//! - Outside production, `localhost?store={slug}` and `{slug}.localhost`
//!   select a store for local development.
//!
//! Lookups are cached for 60 seconds. Admin actions that change a store's
//! visibility evict it.

use std::time::Duration;

use axum::{
    extract::{FromRequestParts, Query},
    http::{HeaderMap, header, request::Parts},
};
use moka::future::Cache;
use serde::Deserialize;
use tracing::{debug, warn};

use sellor_core::{StoreSlug, VendorId};

use crate::db::VendorRepository;
use crate::error::AppError;
use crate::models::Vendor;
use crate::state::AppState;

const CACHE_TTL: Duration = Duration::from_secs(60);
const CACHE_CAPACITY: u64 = 10_000;

/// What a host names.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TenantKey {
    Slug(StoreSlug),
    CustomDomain(String),
}

/// The host a request was addressed to, preferring `X-Forwarded-Host`.
#[must_use]
pub fn request_host(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("x-forwarded-host")
        .or_else(|| headers.get(header::HOST))
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

fn strip_port(host: &str) -> &str {
    if let Some(bracketed) = host.strip_prefix('[') {
        return bracketed.split_once(']').map_or(host, |(h, _)| h);
    }
    host.rsplit_once(':')
        .filter(|(_, port)| port.chars().all(|c| c.is_ascii_digit()))
        .map_or(host, |(h, _)| h)
}

fn is_local(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1")
}

/// Work out which store a host refers to.
///
/// Returns `None` for the platform's own hosts.
#[must_use]
pub fn resolve_host(
    host: &str,
    root_domain: &str,
    query_store: Option<&str>,
    is_production: bool,
) -> Option<TenantKey> {
    let host = strip_port(host).trim_end_matches('.').to_ascii_lowercase();
    let root = root_domain.to_ascii_lowercase();

    if host == root || host == format!("www.{root}") {
        return None;
    }

    if let Some(sub) = host.strip_suffix(&format!(".{root}")) {
        return slug_key(sub);
    }

    if !is_production {
        if is_local(&host) {
            return query_store.and_then(slug_key);
        }
        if let Some(sub) = host.strip_suffix(".localhost") {
            return slug_key(sub);
        }
    }

    if is_local(&host) || host.ends_with(".localhost") {
        return None;
    }

    Some(TenantKey::CustomDomain(host))
}

fn slug_key(sub: &str) -> Option<TenantKey> {
    if sub.contains('.') || sub == "www" {
        return None;
    }
    StoreSlug::parse(sub).ok().map(TenantKey::Slug)
}

/// Cache of resolved stores keyed by what the host named.
#[derive(Clone)]
pub struct StoreCache {
    cache: Cache<TenantKey, Vendor>,
}

impl Default for StoreCache {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreCache {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .support_invalidation_closures()
                .build(),
        }
    }

    /// Find an active store, consulting the database on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the lookup fails.
    pub async fn resolve(
        &self,
        vendors: &VendorRepository<'_>,
        key: &TenantKey,
    ) -> Result<Option<Vendor>, AppError> {
        if let Some(vendor) = self.cache.get(key).await {
            return Ok(Some(vendor));
        }

        let found = match key {
            TenantKey::Slug(slug) => vendors.get_by_slug(slug).await?,
            TenantKey::CustomDomain(domain) => vendors.get_by_custom_domain(domain).await?,
        };

        let Some(vendor) = found.filter(|v| v.is_active) else {
            debug!(?key, "No active store for host");
            return Ok(None);
        };

        self.cache.insert(key.clone(), vendor.clone()).await;
        Ok(Some(vendor))
    }

    /// Drop every cached entry for a vendor.
    pub fn evict(&self, vendor_id: VendorId) {
        if let Err(e) = self
            .cache
            .invalidate_entries_if(move |_, vendor| vendor.id == vendor_id)
        {
            warn!(error = %e, "Selective store cache eviction failed, clearing cache");
            self.cache.invalidate_all();
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct StoreQuery {
    store: Option<String>,
}

/// Extractor for the storefront a request is addressed to.
///
/// Rejects with 404 when the host names no active store.
pub struct CurrentStore(pub Vendor);

impl FromRequestParts<AppState> for CurrentStore {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let not_found = || AppError::NotFound("Store not found".to_owned());

        let host = request_host(&parts.headers).ok_or_else(not_found)?;
        let query = Query::<StoreQuery>::try_from_uri(&parts.uri)
            .map(|Query(q)| q)
            .unwrap_or_default();

        let config = state.config();
        let key = resolve_host(
            host,
            &config.root_domain,
            query.store.as_deref(),
            config.is_production(),
        )
        .ok_or_else(not_found)?;

        let vendors = VendorRepository::new(state.pool());
        let vendor = state
            .stores()
            .resolve(&vendors, &key)
            .await?
            .ok_or_else(not_found)?;

        Ok(Self(vendor))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn slug(s: &str) -> Option<TenantKey> {
        Some(TenantKey::Slug(StoreSlug::parse(s).unwrap()))
    }

    #[test]
    fn test_subdomain_resolves_to_slug() {
        assert_eq!(resolve_host("acme.sellor.ai", "sellor.ai", None, true), slug("acme"));
        assert_eq!(
            resolve_host("Acme.Sellor.AI:443", "sellor.ai", None, true),
            slug("acme")
        );
    }

    #[test]
    fn test_platform_hosts_resolve_to_nothing() {
        assert_eq!(resolve_host("sellor.ai", "sellor.ai", None, true), None);
        assert_eq!(resolve_host("www.sellor.ai", "sellor.ai", None, true), None);
        assert_eq!(resolve_host("a.b.sellor.ai", "sellor.ai", None, true), None);
    }

    #[test]
    fn test_other_hosts_are_custom_domains() {
        assert_eq!(
            resolve_host("Shop.Example.com:8080", "sellor.ai", None, true),
            Some(TenantKey::CustomDomain("shop.example.com".to_owned()))
        );
    }

    #[test]
    fn test_localhost_uses_query_outside_production() {
        assert_eq!(
            resolve_host("localhost:3000", "sellor.ai", Some("acme"), false),
            slug("acme")
        );
        assert_eq!(resolve_host("localhost:3000", "sellor.ai", None, false), None);
        assert_eq!(
            resolve_host("acme.localhost:3000", "sellor.ai", None, false),
            slug("acme")
        );
        assert_eq!(
            resolve_host("localhost:3000", "sellor.ai", Some("acme"), true),
            None
        );
    }

    #[test]
    fn test_strip_port_handles_ipv6() {
        assert_eq!(strip_port("[::1]:3000"), "::1");
        assert_eq!(strip_port("example.com"), "example.com");
    }

    #[test]
    fn test_request_host_prefers_forwarded() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("internal:8080"));
        assert_eq!(request_host(&headers), Some("internal:8080"));

        headers.insert(
            "x-forwarded-host",
            HeaderValue::from_static("acme.sellor.ai, proxy"),
        );
        assert_eq!(request_host(&headers), Some("acme.sellor.ai"));
    }
}
