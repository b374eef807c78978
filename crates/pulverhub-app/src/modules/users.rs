//! The user administration module.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast::error::RecvError;

use pulverhub_core::AppResult;
use pulverhub_entity::{validate_payload, CreateUser, UpdateUser, User, UserDetail};

use crate::context::AppContext;
use crate::registry::PageModule;
use crate::view::{TableRow, TableView};

use super::{report_error, text_cell};

/// The last-read version marker of the record currently being edited.
#[derive(Debug, Clone)]
struct EditDraft {
    /// The record id.
    id: i64,
    /// The marker echoed on save.
    updated_at: String,
}

/// Operator actions on the users page.
#[derive(Debug, Clone)]
pub enum UserAction {
    /// Reload the list.
    Reload,
    /// Toggle between active-only and full (deleted included) view.
    ToggleDeleted,
    /// Submit a new user.
    Create {
        /// Login name.
        username: String,
        /// Email address.
        email: String,
        /// Role to assign.
        role_id: Option<i64>,
        /// Whether the account starts active.
        active: bool,
    },
    /// Submit the open edit form.
    SaveEdit {
        /// New login name.
        username: String,
        /// New email address.
        email: String,
        /// New role id.
        role_id: Option<i64>,
        /// New active flag.
        active: bool,
    },
    /// Soft-delete a user.
    Delete {
        /// The target user id.
        id: i64,
    },
    /// Restore a soft-deleted user.
    Restore {
        /// The target user id.
        id: i64,
    },
    /// Assign a new one-time password.
    ResetPassword {
        /// The target user id.
        id: i64,
    },
    /// Download the user list as a spreadsheet.
    Export {
        /// Destination file.
        path: std::path::PathBuf,
    },
}

/// User management page module.
pub struct UsersModule {
    /// The rendered user table.
    table: Mutex<TableView>,
    /// Whether soft-deleted users are shown.
    show_deleted: AtomicBool,
    /// The open edit form's record, if any.
    edit_draft: Mutex<Option<EditDraft>>,
    /// Realtime subscription guard.
    subscribed: AtomicBool,
}

impl UsersModule {
    /// Creates the module.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            table: Mutex::new(TableView::new(vec![
                "ID",
                "Benutzer",
                "E-Mail",
                "Rolle",
                "Aktiv",
                "Letzter Login",
            ])),
            show_deleted: AtomicBool::new(false),
            edit_draft: Mutex::new(None),
            subscribed: AtomicBool::new(false),
        })
    }

    /// A snapshot of the rendered table.
    pub fn table(&self) -> TableView {
        self.table.lock().expect("users table poisoned").clone()
    }

    /// Whether the full view (deleted included) is active.
    pub fn showing_deleted(&self) -> bool {
        self.show_deleted.load(Ordering::SeqCst)
    }

    /// Loads the user list and renders it into the table.
    pub async fn load_users(&self, ctx: &AppContext) -> AppResult<()> {
        let show_deleted = self.showing_deleted();
        let users = ctx.users.list(show_deleted).await?;
        tracing::debug!("Loaded {} users (show_deleted: {show_deleted})", users.len());

        let rows = users.iter().map(Self::render_row).collect();
        self.table.lock().expect("users table poisoned").set_rows(rows);
        Ok(())
    }

    fn render_row(user: &User) -> TableRow {
        let active = match (user.active, user.deleted) {
            (true, false) => "Ja".to_string(),
            (false, false) => "Nein".to_string(),
            (active, true) => {
                format!("{} (Gelöscht)", if active { "Ja" } else { "Nein" })
            }
        };

        TableRow::new(
            user.id,
            vec![
                user.id.to_string(),
                user.username.clone(),
                text_cell(&user.email),
                text_cell(&user.role_name),
                active,
                format_login(user.last_login),
            ],
        )
        .deleted(user.deleted)
    }

    /// Opens the edit form: re-fetches the user for a fresh
    /// `updated_at` and keeps it as the draft. Returns `None` when the
    /// flow was aborted (missing permission or deleted record).
    pub async fn open_edit(&self, ctx: &AppContext, id: i64) -> AppResult<Option<UserDetail>> {
        if !ctx
            .require_permission(
                "user.update",
                "Sie haben keine Berechtigung, Benutzer zu bearbeiten.",
            )
            .await?
        {
            return Ok(None);
        }

        let user = match ctx.users.get(id).await {
            Ok(user) => user,
            Err(e) => {
                report_error(ctx.notifier.as_ref(), e)?;
                return Ok(None);
            }
        };

        if user.deleted {
            ctx.notifier.alert(
                "Gelöschte Benutzer können nicht bearbeitet werden. Bitte zuerst wiederherstellen.",
            );
            return Ok(None);
        }

        let updated_at = user.updated_at.clone().unwrap_or_default();
        *self.edit_draft.lock().expect("edit draft poisoned") = Some(EditDraft { id, updated_at });

        Ok(Some(user))
    }

    /// Handles one operator action.
    pub async fn handle(&self, ctx: &AppContext, action: UserAction) -> AppResult<()> {
        match action {
            UserAction::Reload => {
                if let Err(e) = self.load_users(ctx).await {
                    report_error(ctx.notifier.as_ref(), e)?;
                }
            }
            UserAction::ToggleDeleted => {
                self.show_deleted.fetch_xor(true, Ordering::SeqCst);
                if let Err(e) = self.load_users(ctx).await {
                    report_error(ctx.notifier.as_ref(), e)?;
                }
            }
            UserAction::Create {
                username,
                email,
                role_id,
                active,
            } => self.create(ctx, username, email, role_id, active).await?,
            UserAction::SaveEdit {
                username,
                email,
                role_id,
                active,
            } => self.save_edit(ctx, username, email, role_id, active).await?,
            UserAction::Delete { id } => self.delete(ctx, id).await?,
            UserAction::Restore { id } => self.restore(ctx, id).await?,
            UserAction::ResetPassword { id } => self.reset_password(ctx, id).await?,
            UserAction::Export { path } => self.export(ctx, path).await?,
        }
        Ok(())
    }

    async fn create(
        &self,
        ctx: &AppContext,
        username: String,
        email: String,
        role_id: Option<i64>,
        active: bool,
    ) -> AppResult<()> {
        if !ctx
            .require_permission(
                "user.create",
                "Sie haben keine Berechtigung, einen neuen Benutzer anzulegen.",
            )
            .await?
        {
            return Ok(());
        }

        let payload = CreateUser {
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            role_id,
            active,
        };
        if let Err(e) = validate_payload(&payload) {
            return report_error(ctx.notifier.as_ref(), e);
        }

        match ctx.users.create(&payload).await {
            Ok(created) => {
                ctx.notifier.alert(&format!(
                    "Benutzer angelegt. Passwort: {}",
                    created.temp_password
                ));
                if let Err(e) = self.load_users(ctx).await {
                    report_error(ctx.notifier.as_ref(), e)?;
                }
            }
            Err(e) => report_error(ctx.notifier.as_ref(), e)?,
        }
        Ok(())
    }

    async fn save_edit(
        &self,
        ctx: &AppContext,
        username: String,
        email: String,
        role_id: Option<i64>,
        active: bool,
    ) -> AppResult<()> {
        let Some(draft) = self.edit_draft.lock().expect("edit draft poisoned").clone() else {
            ctx.notifier.alert("Kein Benutzer zum Speichern geöffnet.");
            return Ok(());
        };

        let payload = UpdateUser {
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            role_id,
            active,
            updated_at: draft.updated_at,
        };
        if let Err(e) = validate_payload(&payload) {
            return report_error(ctx.notifier.as_ref(), e);
        }

        match ctx.users.update(draft.id, &payload).await {
            Ok(()) => {
                ctx.notifier.alert("Benutzer gespeichert.");
                *self.edit_draft.lock().expect("edit draft poisoned") = None;
                if let Err(e) = self.load_users(ctx).await {
                    report_error(ctx.notifier.as_ref(), e)?;
                }
            }
            Err(e) if e.is_conflict() => {
                // The record moved under us; the operator has to reload
                // and redo the edit. The list stays as it is.
                ctx.notifier.alert(
                    "Dieser Benutzer wurde inzwischen von einem anderen Benutzer geändert. Bitte Seite aktualisieren.",
                );
            }
            Err(e) => report_error(ctx.notifier.as_ref(), e)?,
        }
        Ok(())
    }

    async fn delete(&self, ctx: &AppContext, id: i64) -> AppResult<()> {
        if !ctx
            .require_permission(
                "user.delete",
                "Sie haben keine Berechtigung, Benutzer zu löschen.",
            )
            .await?
        {
            return Ok(());
        }
        if !ctx.notifier.confirm("Benutzer wirklich löschen?") {
            return Ok(());
        }

        match ctx.users.delete(id).await {
            Ok(()) => {
                ctx.notifier.alert("Benutzer erfolgreich gelöscht.");
                if let Err(e) = self.load_users(ctx).await {
                    report_error(ctx.notifier.as_ref(), e)?;
                }
            }
            Err(e) => report_error(ctx.notifier.as_ref(), e)?,
        }
        Ok(())
    }

    async fn restore(&self, ctx: &AppContext, id: i64) -> AppResult<()> {
        if !ctx
            .require_permission(
                "user.update",
                "Sie haben keine Berechtigung, Benutzer wiederherzustellen.",
            )
            .await?
        {
            return Ok(());
        }
        if !ctx.notifier.confirm("Benutzer wirklich wiederherstellen?") {
            return Ok(());
        }

        match ctx.users.restore(id).await {
            Ok(()) => {
                ctx.notifier.alert("Benutzer erfolgreich wiederhergestellt.");
                if let Err(e) = self.load_users(ctx).await {
                    report_error(ctx.notifier.as_ref(), e)?;
                }
            }
            Err(e) => report_error(ctx.notifier.as_ref(), e)?,
        }
        Ok(())
    }

    async fn reset_password(&self, ctx: &AppContext, id: i64) -> AppResult<()> {
        if !ctx
            .require_permission(
                "user.update",
                "Sie haben keine Berechtigung, Passwörter zurückzusetzen.",
            )
            .await?
        {
            return Ok(());
        }
        if !ctx.notifier.confirm("Einmalpasswort wirklich neu vergeben?") {
            return Ok(());
        }

        match ctx.users.reset_password(id).await {
            Ok(result) => {
                ctx.notifier.alert(&format!(
                    "Einmalpasswort für {}: {}",
                    result.username, result.temp_password
                ));
            }
            Err(e) => report_error(ctx.notifier.as_ref(), e)?,
        }
        Ok(())
    }

    async fn export(&self, ctx: &AppContext, path: std::path::PathBuf) -> AppResult<()> {
        if !ctx
            .require_permission(
                "user.manage",
                "Sie haben keine Berechtigung, Benutzer zu exportieren.",
            )
            .await?
        {
            return Ok(());
        }

        match ctx.users.export().await {
            Ok(blob) => {
                if let Err(e) = tokio::fs::write(&path, &blob).await {
                    return report_error(
                        ctx.notifier.as_ref(),
                        pulverhub_core::AppError::internal(format!(
                            "Export konnte nicht gespeichert werden: {e}"
                        )),
                    );
                }
                ctx.notifier
                    .alert(&format!("Export gespeichert: {}", path.display()));
            }
            Err(e) => report_error(ctx.notifier.as_ref(), e)?,
        }
        Ok(())
    }
}

#[async_trait]
impl PageModule for UsersModule {
    fn key(&self) -> &'static str {
        "users"
    }

    fn selector(&self) -> &'static str {
        "#users-table"
    }

    async fn init(self: Arc<Self>, ctx: AppContext) -> AppResult<()> {
        tracing::info!("User management module activated");

        if !self.subscribed.swap(true, Ordering::SeqCst) {
            let module = self.clone();
            let mut events = ctx.channel.subscribe();
            let event_ctx = ctx.clone();
            tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(event) if event.is_user_event() => {
                            tracing::info!("User event received, reloading list");
                            if let Err(e) = module.load_users(&event_ctx).await {
                                tracing::warn!("Reload after user event failed: {e}");
                            }
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!("User module dropped {skipped} events");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            });
        }

        self.load_users(&ctx).await
    }

    async fn refresh(self: Arc<Self>, ctx: AppContext) -> AppResult<()> {
        tracing::info!("User management module refresh");
        // Close a leftover edit form; the view state toggle survives.
        *self.edit_draft.lock().expect("edit draft poisoned") = None;
        self.load_users(&ctx).await
    }
}

/// Formats a login timestamp the way the dashboard shows it.
fn format_login(value: Option<DateTime<Utc>>) -> String {
    match value {
        Some(value) => value.format("%d.%m.%Y, %H:%M:%S").to_string(),
        None => "-".to_string(),
    }
}
