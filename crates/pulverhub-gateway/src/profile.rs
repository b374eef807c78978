//! Current-user profile cache with in-flight de-duplication.
//!
//! Permission checks are frequent (every mutating action re-checks),
//! so the `/api/me` fetch is shared: concurrent callers await one
//! underlying request, a successful result is cached for the lifetime
//! of the process, and a failed fetch clears the slot so the next
//! check retries.

use std::sync::{Arc, Mutex};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use pulverhub_core::{AppError, AppResult};
use pulverhub_entity::CurrentUser;

use crate::client::ApiGateway;

/// Result type of the shared fetch; both sides must be cloneable.
type SharedFetch = Shared<BoxFuture<'static, Result<Arc<CurrentUser>, Arc<AppError>>>>;

/// The cache slot states.
enum Slot {
    /// Nothing fetched yet (or the last fetch failed).
    Empty,
    /// One fetch is in flight; all callers share it.
    Loading(SharedFetch),
    /// The profile is cached and stays cached until restart.
    Ready(Arc<CurrentUser>),
}

/// Process-wide cache of the authenticated operator's profile.
pub struct CurrentUserCache {
    /// Gateway used for the `/api/me` fetch.
    gateway: Arc<ApiGateway>,
    /// The single cache slot.
    slot: Mutex<Slot>,
}

impl std::fmt::Debug for CurrentUserCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentUserCache").finish()
    }
}

impl CurrentUserCache {
    /// Creates an empty cache.
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self {
            gateway,
            slot: Mutex::new(Slot::Empty),
        }
    }

    /// Returns the operator profile, fetching it at most once
    /// concurrently.
    pub async fn current_user(&self) -> AppResult<Arc<CurrentUser>> {
        let fetch = {
            let mut slot = self.slot.lock().expect("profile slot poisoned");
            match &*slot {
                Slot::Ready(user) => return Ok(user.clone()),
                Slot::Loading(fetch) => fetch.clone(),
                Slot::Empty => {
                    let gateway = self.gateway.clone();
                    let fetch: SharedFetch = async move {
                        gateway
                            .get_json::<CurrentUser>("/api/me")
                            .await
                            .map(Arc::new)
                            .map_err(Arc::new)
                    }
                    .boxed()
                    .shared();
                    *slot = Slot::Loading(fetch.clone());
                    fetch
                }
            }
        };

        let result = fetch.await;

        let mut slot = self.slot.lock().expect("profile slot poisoned");
        match result {
            Ok(user) => {
                *slot = Slot::Ready(user.clone());
                Ok(user)
            }
            Err(e) => {
                // Clear the settled fetch so a later check retries.
                if matches!(&*slot, Slot::Loading(_)) {
                    *slot = Slot::Empty;
                }
                Err(AppError::new(e.kind, e.message.clone()))
            }
        }
    }

    /// Checks whether the operator holds the named permission.
    pub async fn has_permission(&self, permission: &str) -> AppResult<bool> {
        let user = self.current_user().await?;
        Ok(user.has_permission(permission))
    }
}
