//! Roles and permission assignment endpoints.

use std::sync::Arc;

use reqwest::Method;
use serde::Deserialize;

use pulverhub_core::AppResult;
use pulverhub_entity::{AssignPermissions, AssignmentResult, CreateRole, Permission, Role, RolePermissions};

use crate::client::ApiGateway;

/// Client for `/api/roles/...`.
#[derive(Debug, Clone)]
pub struct RolesApi {
    /// The authenticated gateway.
    gateway: Arc<ApiGateway>,
}

/// Create-role response wrapper.
#[derive(Debug, Deserialize)]
struct CreatedRole {
    role: Role,
}

impl RolesApi {
    /// Creates a roles client.
    pub fn new(gateway: Arc<ApiGateway>) -> Self {
        Self { gateway }
    }

    /// Lists all roles.
    pub async fn list_roles(&self) -> AppResult<Vec<Role>> {
        self.gateway.get_json("/api/roles/roles").await
    }

    /// Lists the full permission catalogue.
    pub async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        self.gateway.get_json("/api/roles/permissions").await
    }

    /// Fetches one role's assignment set together with its fresh
    /// `updated_at` version marker.
    pub async fn role_permissions(&self, role_id: i64) -> AppResult<RolePermissions> {
        self.gateway
            .get_json(&format!("/api/roles/roles/{role_id}/permissions"))
            .await
    }

    /// Replaces a role's permission assignments.
    ///
    /// A stale `updated_at` yields a `Conflict` error.
    pub async fn assign_permissions(
        &self,
        payload: &AssignPermissions,
    ) -> AppResult<AssignmentResult> {
        let body = serde_json::to_value(payload)?;
        let response = self
            .gateway
            .request(Method::POST, "/api/roles/assign_permissions", Some(&body))
            .await?;
        ApiGateway::decode_json(response).await
    }

    /// Creates a new role.
    pub async fn create_role(&self, payload: &CreateRole) -> AppResult<Role> {
        let body = serde_json::to_value(payload)?;
        let response = self
            .gateway
            .request(Method::POST, "/api/roles/", Some(&body))
            .await?;
        let created: CreatedRole = ApiGateway::decode_json(response).await?;
        Ok(created.role)
    }
}
