use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::api_base_url;
use super::client::SiteApi;
use super::types::SysRole;

struct CachedRoles {
    fetched_at: Instant,
    roles: Arc<Vec<SysRole>>,
}

/// Member roles of the site, refreshed once older than the configured TTL.
///
/// Concurrent callers wait on the same refresh instead of issuing their own.
pub struct RoleCache {
    api: SiteApi,
    site_url: String,
    ttl: Duration,
    cached: Mutex<Option<CachedRoles>>,
}

impl RoleCache {
    pub fn new(api: SiteApi, site_url: impl Into<String>, ttl: Duration) -> Self {
        Self {
            api,
            site_url: site_url.into(),
            ttl,
            cached: Mutex::new(None),
        }
    }

    /// Current role list, fetching it when missing or stale.
    ///
    /// A failed refresh keeps serving the stale list; with nothing cached the
    /// result is empty and the next call retries.
    pub async fn get_or_refresh(&self) -> Arc<Vec<SysRole>> {
        let mut cached = self.cached.lock().await;

        if let Some(entry) = cached.as_ref() {
            if entry.fetched_at.elapsed() < self.ttl {
                return entry.roles.clone();
            }
        }

        match self.fetch().await {
            Some(roles) => {
                debug!(count = roles.len(), "Role list refreshed");
                let roles = Arc::new(roles);
                *cached = Some(CachedRoles {
                    fetched_at: Instant::now(),
                    roles: roles.clone(),
                });
                roles
            }
            None => match cached.as_ref() {
                Some(entry) => {
                    warn!("Role list refresh failed, serving stale list");
                    entry.roles.clone()
                }
                None => Arc::new(Vec::new()),
            },
        }
    }

    /// English name of role `role_id`, if known.
    pub async fn level_name(&self, role_id: i64) -> Option<String> {
        self.get_or_refresh()
            .await
            .iter()
            .find(|role| role.id == role_id)
            .map(|role| role.name_eng.clone())
    }

    /// Drop the cached list so the next call refetches.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }

    async fn fetch(&self) -> Option<Vec<SysRole>> {
        let api_base = api_base_url(&self.site_url)?;
        let data = self
            .api
            .post_form(
                &format!("{}/api/member/sysRoleList", api_base),
                String::new(),
                "sys_role_list",
            )
            .await?;
        match data {
            Value::Array(entries) => Some(entries.iter().map(SysRole::from_json).collect()),
            other => {
                warn!(data = %other, "Role list response is not a list");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpResponse;
    use crate::testing::MockExecutor;
    use serde_json::json;

    const ROLES_URL: &str = "https://api.m-team.cc/api/member/sysRoleList";

    fn roles_body(name: &str) -> String {
        json!({
            "message": "SUCCESS",
            "data": [
                {"id": "1", "nameEng": "User", "classUp": "0"},
                {"id": "2", "nameEng": name, "classUp": "10.0"}
            ]
        })
        .to_string()
    }

    fn cache(executor: &Arc<MockExecutor>) -> RoleCache {
        RoleCache::new(
            SiteApi::new(executor.clone(), "key"),
            "https://kp.m-team.cc",
            Duration::from_secs(60),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_roles_cached_within_ttl() {
        let executor = Arc::new(MockExecutor::new());
        executor.respond_sequence(
            ROLES_URL,
            vec![
                HttpResponse::new(200, roles_body("Power User")),
                HttpResponse::new(200, roles_body("Elite User")),
            ],
        );
        let cache = cache(&executor);

        assert_eq!(cache.get_or_refresh().await.len(), 2);
        assert_eq!(cache.level_name(2).await.as_deref(), Some("Power User"));
        assert_eq!(executor.requests().len(), 1);

        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.level_name(2).await.as_deref(), Some("Elite User"));
        assert_eq!(executor.requests().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_serves_stale() {
        let executor = Arc::new(MockExecutor::new());
        executor.respond(ROLES_URL, HttpResponse::new(200, roles_body("Power User")));
        let cache = cache(&executor);
        assert_eq!(cache.get_or_refresh().await.len(), 2);

        executor.fail(ROLES_URL);
        tokio::time::advance(Duration::from_secs(61)).await;
        assert_eq!(cache.level_name(2).await.as_deref(), Some("Power User"));
    }

    #[tokio::test]
    async fn test_failure_without_cache_is_empty() {
        let executor = Arc::new(MockExecutor::new());
        executor.respond_json(ROLES_URL, json!({"message": "FAIL"}));
        let cache = cache(&executor);

        assert!(cache.get_or_refresh().await.is_empty());
        assert_eq!(cache.level_name(1).await, None);
        // Nothing was cached, so every call retried.
        assert_eq!(executor.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let executor = Arc::new(MockExecutor::new());
        executor.respond(ROLES_URL, HttpResponse::new(200, roles_body("X")));
        let cache = cache(&executor);

        cache.get_or_refresh().await;
        cache.invalidate().await;
        cache.get_or_refresh().await;
        assert_eq!(executor.requests().len(), 2);
    }
}
