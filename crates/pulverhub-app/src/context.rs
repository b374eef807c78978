//! The shared application context.
//!
//! Everything a page module needs is passed in explicitly through this
//! struct instead of living in process-global state, so independently
//! activated modules cannot collide over names and tests can assemble a
//! context around mocks.

use std::sync::Arc;

use pulverhub_core::traits::Notifier;
use pulverhub_gateway::api::{PulverApi, RolesApi, UsersApi};
use pulverhub_gateway::{ApiGateway, CurrentUserCache};
use pulverhub_realtime::EventChannel;
use pulverhub_session::SessionStore;

/// Shared handles passed to every page module at start-up.
#[derive(Clone)]
pub struct AppContext {
    /// Persisted session store.
    pub store: Arc<SessionStore>,
    /// Authenticated request gateway.
    pub gateway: Arc<ApiGateway>,
    /// De-duplicated current-user profile cache.
    pub profile: Arc<CurrentUserCache>,
    /// The shared realtime event channel.
    pub channel: Arc<EventChannel>,
    /// Operator notification seam.
    pub notifier: Arc<dyn Notifier>,
    /// Roles endpoint client.
    pub roles: RolesApi,
    /// Users endpoint client.
    pub users: UsersApi,
    /// Inventory endpoint client.
    pub pulver: PulverApi,
}

impl AppContext {
    /// Assembles the context around one gateway.
    pub fn new(
        store: Arc<SessionStore>,
        gateway: Arc<ApiGateway>,
        channel: Arc<EventChannel>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let profile = Arc::new(CurrentUserCache::new(gateway.clone()));
        Self {
            store,
            roles: RolesApi::new(gateway.clone()),
            users: UsersApi::new(gateway.clone()),
            pulver: PulverApi::new(gateway.clone()),
            profile,
            channel,
            notifier,
            gateway,
        }
    }

    /// Permission pre-check used before every mutating action.
    ///
    /// This is a UX guard only; the server re-checks each request. On a
    /// missing permission the operator gets a blocking notification and
    /// `false` comes back so the caller aborts without sending anything.
    pub async fn require_permission(
        &self,
        permission: &str,
        denied_message: &str,
    ) -> pulverhub_core::AppResult<bool> {
        if self.profile.has_permission(permission).await? {
            return Ok(true);
        }
        tracing::warn!("Missing permission {permission}");
        self.notifier.alert(denied_message);
        Ok(false)
    }
}
