use std::{
    collections::{HashMap, HashSet},
    fmt::Debug,
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};

use log::*;

use crate::{
    db_types::{Role, UserId},
    traits::{PermissionError, PermissionManagement},
};

pub const DEFAULT_PERMISSION_TTL: Duration = Duration::from_secs(300);

pub const INVENTORY_MANAGE: &str = "inventory.manage";
pub const ORDERS_REFUND: &str = "orders.refund";
pub const WALLETS_ADJUST: &str = "wallets.adjust";
pub const USERS_MANAGE: &str = "users.manage";
pub const CATALOG_MANAGE: &str = "catalog.manage";

#[derive(Debug, Clone)]
struct CacheEntry {
    permissions: HashSet<String>,
    fetched_at: Instant,
}

/// A short-lived, per-user cache of permission sets.
///
/// Clones share the same storage, so the instance handed to the request handlers and the one used by the admin role
/// update path see each other's invalidations.
#[derive(Clone)]
pub struct PermissionCache {
    ttl: Duration,
    entries: Arc<RwLock<HashMap<UserId, CacheEntry>>>,
}

impl Debug for PermissionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PermissionCache (ttl: {:?}, entries: {})", self.ttl, self.len())
    }
}

impl Default for PermissionCache {
    fn default() -> Self {
        Self::new(DEFAULT_PERMISSION_TTL)
    }
}

impl PermissionCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, entries: Arc::new(RwLock::new(HashMap::new())) }
    }

    pub fn get(&self, user_id: &UserId) -> Option<HashSet<String>> {
        let entries = self.entries.read().ok()?;
        entries.get(user_id).filter(|e| e.fetched_at.elapsed() < self.ttl).map(|e| e.permissions.clone())
    }

    /// Stores a fresh entry for `user_id`. Stale entries of other users are dropped on the way.
    pub fn insert(&self, user_id: UserId, permissions: HashSet<String>) {
        if let Ok(mut entries) = self.entries.write() {
            entries.retain(|_, e| e.fetched_at.elapsed() < self.ttl);
            entries.insert(user_id, CacheEntry { permissions, fetched_at: Instant::now() });
        }
    }

    pub fn invalidate(&self, user_id: &UserId) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(user_id);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        let live = |e: &CacheEntry| e.fetched_at.elapsed() < self.ttl;
        self.entries.read().map(|e| e.values().filter(|e| live(e)).count()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Answers "may this admin do that?" questions, backed by [`PermissionManagement`] and a [`PermissionCache`].
pub struct PermissionApi<B> {
    db: B,
    cache: PermissionCache,
}

impl<B: Debug> Debug for PermissionApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PermissionApi ({:?}, {:?})", self.db, self.cache)
    }
}

impl<B: Clone> Clone for PermissionApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), cache: self.cache.clone() }
    }
}

impl<B> PermissionApi<B> {
    pub fn new(db: B, cache: PermissionCache) -> Self {
        Self { db, cache }
    }

    pub fn cache(&self) -> &PermissionCache {
        &self.cache
    }
}

impl<B> PermissionApi<B>
where B: PermissionManagement
{
    pub async fn permissions(&self, user_id: &UserId) -> Result<HashSet<String>, PermissionError> {
        if let Some(cached) = self.cache.get(user_id) {
            return Ok(cached);
        }
        let permissions = self.db.fetch_permissions(user_id).await?.into_iter().collect::<HashSet<_>>();
        trace!("🔐️ {} permission(s) loaded for {user_id}", permissions.len());
        self.cache.insert(user_id.clone(), permissions.clone());
        Ok(permissions)
    }

    /// Super admins hold every permission.
    pub async fn has_permission(&self, user_id: &UserId, role: Role, permission: &str) -> Result<bool, PermissionError> {
        if role == Role::Super {
            return Ok(true);
        }
        Ok(self.permissions(user_id).await?.contains(permission))
    }

    pub async fn require(&self, user_id: &UserId, role: Role, permission: &str) -> Result<(), PermissionError> {
        if self.has_permission(user_id, role, permission).await? {
            Ok(())
        } else {
            debug!("🔐️ {user_id} was denied '{permission}'");
            Err(PermissionError::Forbidden(permission.to_string()))
        }
    }

    /// Changes the user's admin role and drops their cached permissions, so the change applies on the next request.
    pub async fn assign_admin_role(&self, user_id: &UserId, role: Option<&str>) -> Result<(), PermissionError> {
        self.db.assign_admin_role(user_id, role).await?;
        self.cache.invalidate(user_id);
        info!("🔐️ Admin role of {user_id} changed to {}", role.unwrap_or("none"));
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cache_expires_entries() {
        let cache = PermissionCache::new(Duration::from_millis(0));
        let user = UserId::from("u1");
        cache.insert(user.clone(), HashSet::from([INVENTORY_MANAGE.to_string()]));
        assert!(cache.get(&user).is_none());
    }

    #[test]
    fn invalidation_is_shared_between_clones() {
        let cache = PermissionCache::default();
        let other = cache.clone();
        let user = UserId::from("u1");
        cache.insert(user.clone(), HashSet::from([ORDERS_REFUND.to_string()]));
        assert!(other.get(&user).is_some_and(|p| p.contains(ORDERS_REFUND)));
        other.invalidate(&user);
        assert!(cache.get(&user).is_none());
        cache.insert(user.clone(), HashSet::new());
        cache.insert(UserId::from("u2"), HashSet::new());
        assert_eq!(cache.len(), 2);
        other.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn stale_entries_are_dropped() {
        let cache = PermissionCache::new(Duration::from_millis(200));
        for i in 0..50 {
            cache.insert(UserId::from(format!("admin-{i}")), HashSet::from([INVENTORY_MANAGE.to_string()]));
        }
        assert_eq!(cache.len(), 50);
        std::thread::sleep(Duration::from_millis(300));
        assert!(cache.is_empty());
        cache.insert(UserId::from("late"), HashSet::new());
        assert_eq!(cache.entries.read().unwrap().len(), 1);
    }
}
