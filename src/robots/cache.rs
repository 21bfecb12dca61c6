//! Robots.txt caching implementation
//!
//! Per-origin policy cache shared by all crawl workers. Each origin is
//! fetched at most once per crawl; concurrent lookups for an origin that is
//! still being fetched wait on the same in-flight request instead of
//! issuing their own.

use crate::robots::RobotsPolicy;
use crate::url::origin_of;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use url::Url;

/// Cache of robots.txt policies keyed by origin
pub struct RobotsCache {
    /// When false, every lookup answers allowed without fetching anything
    enabled: bool,
    user_agent: String,
    client: reqwest::Client,
    policies: Mutex<HashMap<String, Arc<OnceCell<Arc<RobotsPolicy>>>>>,
}

impl RobotsCache {
    /// Creates a cache
    ///
    /// # Arguments
    ///
    /// * `enabled` - When false, robots.txt is never consulted
    /// * `user_agent` - Agent string used for fetching and rule matching
    ///
    /// # Returns
    ///
    /// * `Ok(RobotsCache)` - Ready-to-use cache
    /// * `Err(reqwest::Error)` - HTTP client construction failed
    pub fn new(enabled: bool, user_agent: &str) -> Result<Self, reqwest::Error> {
        // Robots fetches follow redirects, unlike page fetches
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            enabled,
            user_agent: user_agent.to_string(),
            client,
            policies: Mutex::new(HashMap::new()),
        })
    }

    /// Checks whether a URL may be fetched
    pub async fn allowed(&self, url: &Url) -> bool {
        if !self.enabled {
            return true;
        }
        let policy = self.policy_for(&origin_of(url)).await;
        let path = match url.query() {
            Some(query) => format!("{}?{}", url.path(), query),
            None => url.path().to_string(),
        };
        policy.is_allowed(&path)
    }

    /// Returns the policy for an origin, fetching it on first use
    ///
    /// The double-keyed map (origin to `OnceCell`) gives single-flight
    /// semantics: the outer lock is only held to find or insert the cell,
    /// never across the network fetch.
    pub async fn policy_for(&self, origin: &str) -> Arc<RobotsPolicy> {
        let cell = {
            let mut policies = self.policies.lock().await;
            policies
                .entry(origin.to_string())
                .or_insert_with(|| Arc::new(OnceCell::new()))
                .clone()
        };

        cell.get_or_init(|| async { Arc::new(self.fetch_policy(origin).await) })
            .await
            .clone()
    }

    /// Fetches and parses robots.txt for an origin
    ///
    /// Any failure (network, non-2xx, unreadable body) produces a permissive
    /// policy so an unreachable robots.txt never blocks a crawl.
    async fn fetch_policy(&self, origin: &str) -> RobotsPolicy {
        let robots_url = format!("{}/robots.txt", origin);
        tracing::debug!("Fetching robots policy from {}", robots_url);

        match self.client.get(&robots_url).send().await {
            Ok(response) if response.status().is_success() => match response.text().await {
                Ok(body) => RobotsPolicy::parse(origin, &body, &self.user_agent),
                Err(e) => {
                    tracing::debug!("Unreadable robots.txt body from {}: {}", robots_url, e);
                    RobotsPolicy::allow_all(origin)
                }
            },
            Ok(response) => {
                tracing::debug!(
                    "robots.txt at {} answered {}, allowing all",
                    robots_url,
                    response.status()
                );
                RobotsPolicy::allow_all(origin)
            }
            Err(e) => {
                tracing::debug!("robots.txt fetch from {} failed: {}", robots_url, e);
                RobotsPolicy::allow_all(origin)
            }
        }
    }
}
