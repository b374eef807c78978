//! The interactive console loop.
//!
//! Renders the current page and translates menu choices into page
//! module actions. The realtime channel keeps reloading module data in
//! the background; every redraw shows the latest state.

use std::sync::Arc;

use dialoguer::{Input, MultiSelect, Select};
use tabled::builder::Builder;

use pulverhub_app::modules::{
    PulverAction, PulverModule, RoleAction, RolesModule, UserAction, UsersModule,
};
use pulverhub_app::view::TableView;
use pulverhub_app::{AppContext, ContentLoader};
use pulverhub_core::types::{FilterColumn, TableFilter};
use pulverhub_core::{AppError, AppResult};

/// Pages reachable from the navigation menu.
const PAGES: &[&str] = &["startseite", "pulverlager", "benutzer", "rollenrechte"];

/// The interactive console.
pub struct Console {
    ctx: AppContext,
    loader: Arc<ContentLoader>,
    roles: Arc<RolesModule>,
    users: Arc<UsersModule>,
    pulver: Arc<PulverModule>,
}

impl Console {
    /// Creates the console over the shared context.
    pub fn new(
        ctx: AppContext,
        loader: Arc<ContentLoader>,
        roles: Arc<RolesModule>,
        users: Arc<UsersModule>,
        pulver: Arc<PulverModule>,
    ) -> Self {
        Self {
            ctx,
            loader,
            roles,
            users,
            pulver,
        }
    }

    /// Runs the menu loop until the operator quits or logs out.
    pub async fn run(&self) -> AppResult<()> {
        loop {
            let content = self.loader.current().await;

            println!();
            println!("══ Seite: {} ══", content.page);
            if let Some(error) = &content.error {
                println!("{error}");
            } else {
                self.render_page(&content.page);
            }

            match content.page.as_str() {
                "pulverlager" => {
                    if !self.pulver_menu().await? {
                        continue;
                    }
                }
                "benutzer" => {
                    if !self.users_menu().await? {
                        continue;
                    }
                }
                "rollenrechte" => {
                    if !self.roles_menu().await? {
                        continue;
                    }
                }
                _ => {}
            }

            match self.main_menu()? {
                MainChoice::Navigate => {
                    let index = select("Seite öffnen", PAGES)?;
                    self.loader.load_page(&self.ctx, PAGES[index]).await?;
                }
                MainChoice::Logout => {
                    if self.ctx.notifier.confirm("Möchtest du dich wirklich abmelden?") {
                        self.ctx.store.clear().await?;
                        println!("Abgemeldet.");
                        return Ok(());
                    }
                }
                MainChoice::Quit => return Ok(()),
            }
        }
    }

    fn main_menu(&self) -> AppResult<MainChoice> {
        let items = ["Seite wechseln", "Abmelden", "Beenden"];
        Ok(match select("Navigation", &items)? {
            0 => MainChoice::Navigate,
            1 => MainChoice::Logout,
            _ => MainChoice::Quit,
        })
    }

    fn render_page(&self, page: &str) {
        match page {
            "pulverlager" => print_table(&self.pulver.table()),
            "benutzer" => {
                print_table(&self.users.table());
                if self.users.showing_deleted() {
                    println!("(Vollständige Ansicht inkl. gelöschter Benutzer)");
                }
            }
            "rollenrechte" => self.render_roles(),
            _ => {}
        }
    }

    fn render_roles(&self) {
        let roles = self.roles.roles();
        if roles.is_empty() {
            println!("Keine Rollen geladen.");
            return;
        }
        for role in &roles {
            println!("  [{}] {}", role.id, role.name);
        }
        if let Some(current) = self.roles.current() {
            println!("Rechte: {}", current.name);
            if let Some(description) = &current.description {
                println!("  {description}");
            }
            for permission in self.roles.permissions() {
                let mark = if current.assigned.contains(&permission.id) {
                    "[x]"
                } else {
                    "[ ]"
                };
                println!("  {mark} {}", permission.name);
            }
        }
    }

    /// Inventory page actions. Returns `true` to fall through to the
    /// navigation menu.
    async fn pulver_menu(&self) -> AppResult<bool> {
        let items = [
            "Tabelle aktualisieren",
            "Filter setzen",
            "Filter zurücksetzen",
            "Neues Pulver anlegen",
            "Pulver bearbeiten",
            "Bewegung buchen (Tracking)",
            "Label anzeigen",
            "Weiter zur Navigation",
        ];

        match select("Pulverlager", &items)? {
            0 => self.pulver.handle(&self.ctx, PulverAction::Reload).await?,
            1 => {
                let filter = self.prompt_filter()?;
                self.pulver
                    .handle(&self.ctx, PulverAction::SetFilter { filter })
                    .await?;
            }
            2 => self.pulver.handle(&self.ctx, PulverAction::ResetFilter).await?,
            3 => {
                let form = prompt_pulver_form(None)?;
                self.pulver
                    .handle(&self.ctx, PulverAction::Create { form })
                    .await?;
            }
            4 => self.edit_pulver().await?,
            5 => self.track_pulver().await?,
            6 => {
                let id: i64 = input("Pulver-ID")?;
                println!("Label: {}", self.pulver.label_url(&self.ctx, id));
            }
            _ => return Ok(true),
        }
        Ok(false)
    }

    fn prompt_filter(&self) -> AppResult<TableFilter> {
        let mut names: Vec<&str> = vec!["(alle Spalten)"];
        names.extend(FilterColumn::ALL.iter().map(|column| column.name()));
        let index = select("Spalte", &names)?;
        let column = if index == 0 {
            None
        } else {
            Some(FilterColumn::ALL[index - 1])
        };
        let query: String = input("Suchtext")?;
        Ok(TableFilter::new(column, query))
    }

    async fn edit_pulver(&self) -> AppResult<()> {
        let id: i64 = input("Pulver-ID")?;
        let Some(detail) = self.pulver.open_edit(&self.ctx, id).await? else {
            return Ok(());
        };

        let items = ["Speichern", "Löschen", "Abbrechen"];
        match select(&format!("Pulver {} bearbeiten", detail.barcode), &items)? {
            0 => {
                let form = prompt_pulver_form(Some(&detail))?;
                let aktiv = self.ctx.notifier.confirm("Aktiv?");
                self.pulver
                    .handle(&self.ctx, PulverAction::SaveEdit { form, aktiv })
                    .await?;
            }
            1 => {
                self.pulver
                    .handle(&self.ctx, PulverAction::DeleteCurrent)
                    .await?;
            }
            _ => {}
        }
        Ok(())
    }

    async fn track_pulver(&self) -> AppResult<()> {
        let barcode: String = input("Barcode")?;
        if let Some(bestand) = self.pulver.lookup_barcode(&self.ctx, &barcode).await? {
            println!("Aktueller Bestand: {bestand} kg");
        } else {
            return Ok(());
        }

        let menge_neu: f64 = input("Neue Menge (kg)")?;
        let beschreibung: String = input_with_default("Beschreibung", "Normaler Verbrauch")?;

        self.pulver
            .handle(
                &self.ctx,
                PulverAction::Track {
                    barcode,
                    menge_neu,
                    beschreibung,
                },
            )
            .await
    }

    /// User page actions.
    async fn users_menu(&self) -> AppResult<bool> {
        let toggle_label = if self.users.showing_deleted() {
            "Aktive Benutzer anzeigen"
        } else {
            "Vollständige Ansicht (inkl. gelöschter)"
        };
        let items = [
            "Tabelle aktualisieren",
            toggle_label,
            "Neuer Benutzer",
            "Benutzer bearbeiten",
            "Benutzer löschen",
            "Benutzer wiederherstellen",
            "Passwort zurücksetzen",
            "Benutzerliste exportieren",
            "Weiter zur Navigation",
        ];

        match select("Benutzerverwaltung", &items)? {
            0 => self.users.handle(&self.ctx, UserAction::Reload).await?,
            1 => self.users.handle(&self.ctx, UserAction::ToggleDeleted).await?,
            2 => {
                let username: String = input("Benutzername")?;
                let email: String = input("E-Mail")?;
                let role_id: i64 = input("Rollen-ID")?;
                let active = self.ctx.notifier.confirm("Aktiv?");
                self.users
                    .handle(
                        &self.ctx,
                        UserAction::Create {
                            username,
                            email,
                            role_id: Some(role_id),
                            active,
                        },
                    )
                    .await?;
            }
            3 => self.edit_user().await?,
            4 => {
                let id: i64 = input("Benutzer-ID")?;
                self.users.handle(&self.ctx, UserAction::Delete { id }).await?;
            }
            5 => {
                let id: i64 = input("Benutzer-ID")?;
                self.users.handle(&self.ctx, UserAction::Restore { id }).await?;
            }
            6 => {
                let id: i64 = input("Benutzer-ID")?;
                self.users
                    .handle(&self.ctx, UserAction::ResetPassword { id })
                    .await?;
            }
            7 => {
                let path: String = input_with_default("Zieldatei", "users.xlsx")?;
                self.users
                    .handle(&self.ctx, UserAction::Export { path: path.into() })
                    .await?;
            }
            _ => return Ok(true),
        }
        Ok(false)
    }

    async fn edit_user(&self) -> AppResult<()> {
        let id: i64 = input("Benutzer-ID")?;
        let Some(detail) = self.users.open_edit(&self.ctx, id).await? else {
            return Ok(());
        };

        let username: String =
            input_with_default("Benutzername", &detail.username)?;
        let email: String =
            input_with_default("E-Mail", detail.email.as_deref().unwrap_or(""))?;
        let role_id: i64 = input_with_default_value("Rollen-ID", detail.role_id.unwrap_or(0))?;
        let active = self.ctx.notifier.confirm("Aktiv?");

        self.users
            .handle(
                &self.ctx,
                UserAction::SaveEdit {
                    username,
                    email,
                    role_id: Some(role_id),
                    active,
                },
            )
            .await
    }

    /// Roles page actions.
    async fn roles_menu(&self) -> AppResult<bool> {
        let items = [
            "Listen aktualisieren",
            "Rolle auswählen",
            "Rechte speichern",
            "Neue Rolle anlegen",
            "Weiter zur Navigation",
        ];

        match select("Rollen & Rechte", &items)? {
            0 => self.roles.handle(&self.ctx, RoleAction::Reload).await?,
            1 => {
                let roles = self.roles.roles();
                if roles.is_empty() {
                    println!("Keine Rollen geladen.");
                    return Ok(false);
                }
                let names: Vec<String> = roles.iter().map(|role| role.name.clone()).collect();
                let index = select_strings("Rolle", &names)?;
                self.roles
                    .handle(&self.ctx, RoleAction::SelectRole { id: roles[index].id })
                    .await?;
            }
            2 => self.save_role_permissions().await?,
            3 => self.roles.handle(&self.ctx, RoleAction::CreateRole).await?,
            _ => return Ok(true),
        }
        Ok(false)
    }

    async fn save_role_permissions(&self) -> AppResult<()> {
        let Some(current) = self.roles.current() else {
            println!("Bitte zuerst eine Rolle auswählen.");
            return Ok(());
        };

        let permissions = self.roles.permissions();
        let labels: Vec<String> = permissions
            .iter()
            .map(|permission| permission.name.clone())
            .collect();
        let defaults: Vec<bool> = permissions
            .iter()
            .map(|permission| current.assigned.contains(&permission.id))
            .collect();

        let picked = MultiSelect::new()
            .with_prompt(format!("Rechte: {}", current.name))
            .items(&labels)
            .defaults(&defaults)
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {e}")))?;

        let permission_ids = picked.into_iter().map(|index| permissions[index].id).collect();
        self.roles
            .handle(&self.ctx, RoleAction::SavePermissions { permission_ids })
            .await
    }
}

/// Top-level navigation outcomes.
enum MainChoice {
    Navigate,
    Logout,
    Quit,
}

/// Renders a table view with tabled, visible rows only.
fn print_table(view: &TableView) {
    let mut builder = Builder::default();
    builder.push_record(view.columns.iter().copied());
    let mut count = 0usize;
    for row in view.visible_rows() {
        builder.push_record(row.cells.iter().cloned());
        count += 1;
    }
    if count == 0 {
        println!("Keine Einträge.");
        return;
    }
    println!("{}", builder.build());
}

fn select(prompt: &str, items: &[&str]) -> AppResult<usize> {
    Select::new()
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact()
        .map_err(|e| AppError::internal(format!("Input error: {e}")))
}

fn select_strings(prompt: &str, items: &[String]) -> AppResult<usize> {
    Select::new()
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact()
        .map_err(|e| AppError::internal(format!("Input error: {e}")))
}

fn input<T>(prompt: &str) -> AppResult<T>
where
    T: std::str::FromStr + Clone + std::fmt::Display,
    <T as std::str::FromStr>::Err: std::fmt::Display + std::fmt::Debug,
{
    Input::<T>::new()
        .with_prompt(prompt)
        .interact_text()
        .map_err(|e| AppError::internal(format!("Input error: {e}")))
}

fn input_with_default(prompt: &str, default: &str) -> AppResult<String> {
    Input::<String>::new()
        .with_prompt(prompt)
        .with_initial_text(default)
        .allow_empty(true)
        .interact_text()
        .map_err(|e| AppError::internal(format!("Input error: {e}")))
}

fn input_with_default_value(prompt: &str, default: i64) -> AppResult<i64> {
    Input::<i64>::new()
        .with_prompt(prompt)
        .with_initial_text(default.to_string())
        .interact_text()
        .map_err(|e| AppError::internal(format!("Input error: {e}")))
}

/// Collects the shared create/edit inventory form, prefilled from an
/// existing record when editing.
fn prompt_pulver_form(
    detail: Option<&pulverhub_entity::PulverDetail>,
) -> AppResult<pulverhub_app::modules::pulver::PulverForm> {
    let text = |prompt: &str, current: Option<&str>| -> AppResult<String> {
        input_with_default(prompt, current.unwrap_or(""))
    };

    let artikelnummer = text(
        "Artikelnummer",
        detail.and_then(|d| d.artikelnummer.as_deref()),
    )?;
    let hersteller = text("Hersteller", detail.and_then(|d| d.hersteller.as_deref()))?;
    let farbe = text("Farbe", detail.and_then(|d| d.farbe.as_deref()))?;
    let qualitaet = text("Qualität", detail.and_then(|d| d.qualitaet.as_deref()))?;
    let oberflaeche = text("Oberfläche", detail.and_then(|d| d.oberflaeche.as_deref()))?;
    let anwendung = text("Anwendung", detail.and_then(|d| d.anwendung.as_deref()))?;
    let start_menge_kg: f64 = match detail.and_then(|d| d.start_menge_kg) {
        Some(current) => Input::<f64>::new()
            .with_prompt("Startmenge (kg)")
            .with_initial_text(current.to_string())
            .interact_text()
            .map_err(|e| AppError::internal(format!("Input error: {e}")))?,
        None => input("Startmenge (kg)")?,
    };
    let lagerort = text("Lagerort", detail.and_then(|d| d.lagerort.as_deref()))?;

    let optional = |value: String| -> Option<String> {
        let trimmed = value.trim().to_string();
        if trimmed.is_empty() { None } else { Some(trimmed) }
    };

    Ok(pulverhub_app::modules::pulver::PulverForm {
        artikelnummer,
        hersteller,
        farbe: optional(farbe),
        qualitaet: optional(qualitaet),
        oberflaeche: optional(oberflaeche),
        anwendung: optional(anwendung),
        start_menge_kg,
        lagerort: optional(lagerort),
    })
}
