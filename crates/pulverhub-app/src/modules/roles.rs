//! The roles and permissions module.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;

use pulverhub_core::AppResult;
use pulverhub_entity::{validate_payload, AssignPermissions, CreateRole, Permission, Role};

use crate::context::AppContext;
use crate::registry::PageModule;

use super::report_error;

/// The role the operator currently has open, with its fresh assignment
/// set and version marker.
#[derive(Debug, Clone)]
pub struct SelectedRole {
    /// The role id.
    pub id: i64,
    /// The role name.
    pub name: String,
    /// The role description.
    pub description: Option<String>,
    /// The currently assigned permission ids.
    pub assigned: HashSet<i64>,
    /// The version marker echoed on the next assignment write.
    pub updated_at: String,
}

/// Operator actions on the roles page.
#[derive(Debug, Clone)]
pub enum RoleAction {
    /// Reload roles and permission catalogue.
    Reload,
    /// Open a role, fetching its fresh assignment set.
    SelectRole {
        /// The role id.
        id: i64,
    },
    /// Replace the selected role's assignment set.
    SavePermissions {
        /// The full new set of permission ids.
        permission_ids: Vec<i64>,
    },
    /// Create a new role via prompts.
    CreateRole,
}

/// Roles and permissions page module.
pub struct RolesModule {
    /// All roles, loaded on activation.
    roles: Mutex<Vec<Role>>,
    /// The permission catalogue, loaded on activation.
    permissions: Mutex<Vec<Permission>>,
    /// The currently opened role.
    current: Mutex<Option<SelectedRole>>,
    /// Realtime subscription guard.
    subscribed: AtomicBool,
}

impl RolesModule {
    /// Creates the module.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            roles: Mutex::new(Vec::new()),
            permissions: Mutex::new(Vec::new()),
            current: Mutex::new(None),
            subscribed: AtomicBool::new(false),
        })
    }

    /// A snapshot of the loaded roles.
    pub fn roles(&self) -> Vec<Role> {
        self.roles.lock().expect("roles poisoned").clone()
    }

    /// A snapshot of the permission catalogue.
    pub fn permissions(&self) -> Vec<Permission> {
        self.permissions.lock().expect("permissions poisoned").clone()
    }

    /// The currently opened role, if any.
    pub fn current(&self) -> Option<SelectedRole> {
        self.current.lock().expect("current role poisoned").clone()
    }

    /// Loads the role list.
    pub async fn load_roles(&self, ctx: &AppContext) -> AppResult<()> {
        let roles = ctx.roles.list_roles().await?;
        tracing::debug!("Loaded {} roles", roles.len());
        *self.roles.lock().expect("roles poisoned") = roles;
        Ok(())
    }

    /// Loads the permission catalogue.
    pub async fn load_permissions(&self, ctx: &AppContext) -> AppResult<()> {
        let permissions = ctx.roles.list_permissions().await?;
        tracing::debug!("Loaded {} permissions", permissions.len());
        *self.permissions.lock().expect("permissions poisoned") = permissions;
        Ok(())
    }

    async fn load_all(&self, ctx: &AppContext) -> AppResult<()> {
        self.load_roles(ctx).await?;
        self.load_permissions(ctx).await
    }

    /// Handles one operator action.
    pub async fn handle(&self, ctx: &AppContext, action: RoleAction) -> AppResult<()> {
        match action {
            RoleAction::Reload => {
                if let Err(e) = self.load_all(ctx).await {
                    report_error(ctx.notifier.as_ref(), e)?;
                }
            }
            RoleAction::SelectRole { id } => self.select_role(ctx, id).await?,
            RoleAction::SavePermissions { permission_ids } => {
                self.save_permissions(ctx, permission_ids).await?
            }
            RoleAction::CreateRole => self.create_role(ctx).await?,
        }
        Ok(())
    }

    /// Opens a role: re-fetches its assignment set to get the latest
    /// `updated_at` before any save.
    async fn select_role(&self, ctx: &AppContext, id: i64) -> AppResult<()> {
        let Some(role) = self.roles().into_iter().find(|role| role.id == id) else {
            tracing::warn!("Unknown role {id} selected");
            return Ok(());
        };

        match ctx.roles.role_permissions(id).await {
            Ok(assignment) => {
                let selected = SelectedRole {
                    id: role.id,
                    name: role.name,
                    description: role.description,
                    assigned: assignment.permissions.into_iter().collect(),
                    updated_at: assignment.updated_at,
                };
                *self.current.lock().expect("current role poisoned") = Some(selected);
            }
            Err(e) => report_error(ctx.notifier.as_ref(), e)?,
        }
        Ok(())
    }

    async fn save_permissions(&self, ctx: &AppContext, permission_ids: Vec<i64>) -> AppResult<()> {
        if !ctx
            .require_permission(
                "manage.permission",
                "Sie haben keine Berechtigung, Rollenrechte zu speichern.",
            )
            .await?
        {
            return Ok(());
        }

        let Some(current) = self.current() else {
            ctx.notifier.alert("Keine Rolle ausgewählt.");
            return Ok(());
        };

        let payload = AssignPermissions {
            role_id: current.id,
            permission_ids: permission_ids.clone(),
            updated_at: current.updated_at,
        };

        match ctx.roles.assign_permissions(&payload).await {
            Ok(result) => {
                // Keep the selection usable for the next save.
                let mut slot = self.current.lock().expect("current role poisoned");
                if let Some(selected) = slot.as_mut() {
                    selected.assigned = result.assigned_permissions.into_iter().collect();
                    selected.updated_at = result.updated_at;
                }
                ctx.notifier.alert("Rechte erfolgreich gespeichert!");
            }
            Err(e) if e.is_conflict() => {
                ctx.notifier
                    .alert("Diese Rolle wurde inzwischen geändert. Bitte neu laden.");
            }
            Err(e) => report_error(ctx.notifier.as_ref(), e)?,
        }
        Ok(())
    }

    /// Creates a role from two prompts (name, optional description).
    async fn create_role(&self, ctx: &AppContext) -> AppResult<()> {
        if !ctx
            .require_permission(
                "new.role",
                "Sie haben keine Berechtigung, eine neue Rolle anzulegen.",
            )
            .await?
        {
            return Ok(());
        }

        let Some(name) = ctx.notifier.prompt("Name der neuen Rolle:") else {
            return Ok(());
        };
        let description = ctx
            .notifier
            .prompt("Beschreibung (optional):")
            .filter(|text| !text.trim().is_empty());

        let payload = CreateRole {
            name: name.trim().to_string(),
            description,
        };
        if let Err(e) = validate_payload(&payload) {
            return report_error(ctx.notifier.as_ref(), e);
        }

        match ctx.roles.create_role(&payload).await {
            Ok(role) => {
                tracing::info!("Role {} created", role.name);
                ctx.notifier.alert("Rolle erstellt!");
                if let Err(e) = self.load_roles(ctx).await {
                    report_error(ctx.notifier.as_ref(), e)?;
                }
            }
            Err(e) => report_error(ctx.notifier.as_ref(), e)?,
        }
        Ok(())
    }
}

#[async_trait]
impl PageModule for RolesModule {
    fn key(&self) -> &'static str {
        "roles"
    }

    fn selector(&self) -> &'static str {
        ".roles-container"
    }

    async fn init(self: Arc<Self>, ctx: AppContext) -> AppResult<()> {
        tracing::info!("Roles module activated");

        if !self.subscribed.swap(true, Ordering::SeqCst) {
            let module = self.clone();
            let mut events = ctx.channel.subscribe();
            let event_ctx = ctx.clone();
            tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(event) if event.is_role_event() => {
                            tracing::info!("Role event received, reloading lists");
                            if let Err(e) = module.load_all(&event_ctx).await {
                                tracing::warn!("Reload after role event failed: {e}");
                            }
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!("Roles module dropped {skipped} events");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            });
        }

        self.load_all(&ctx).await
    }

    async fn refresh(self: Arc<Self>, ctx: AppContext) -> AppResult<()> {
        tracing::info!("Roles module refresh");
        self.load_all(&ctx).await
    }
}
