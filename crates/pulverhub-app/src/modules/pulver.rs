//! The powder inventory module.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::broadcast::error::RecvError;

use pulverhub_core::types::TableFilter;
use pulverhub_core::AppResult;
use pulverhub_entity::{
    validate_payload, CreatePulver, Pulver, PulverDetail, TrackMovement, UpdatePulver,
};

use crate::context::AppContext;
use crate::registry::PageModule;
use crate::view::{TableRow, TableView};

use super::{number_cell, report_error, text_cell};

/// The last-read version marker of the record currently being edited.
#[derive(Debug, Clone)]
struct EditDraft {
    /// The record id.
    id: i64,
    /// The marker echoed on save.
    updated_at: String,
}

/// Editable inventory fields, shared by create and edit forms.
#[derive(Debug, Clone)]
pub struct PulverForm {
    /// Article number.
    pub artikelnummer: String,
    /// Manufacturer.
    pub hersteller: String,
    /// Color.
    pub farbe: Option<String>,
    /// Quality grade.
    pub qualitaet: Option<String>,
    /// Surface finish.
    pub oberflaeche: Option<String>,
    /// Application area.
    pub anwendung: Option<String>,
    /// Initial quantity in kilograms.
    pub start_menge_kg: f64,
    /// Storage location.
    pub lagerort: Option<String>,
}

/// Operator actions on the inventory page.
#[derive(Debug, Clone)]
pub enum PulverAction {
    /// Reload the list.
    Reload,
    /// Apply the client-side table filter.
    SetFilter {
        /// The filter to apply.
        filter: TableFilter,
    },
    /// Clear the filter, restoring all rows.
    ResetFilter,
    /// Submit a new item.
    Create {
        /// The filled-in form.
        form: PulverForm,
    },
    /// Submit the open edit form.
    SaveEdit {
        /// The filled-in form.
        form: PulverForm,
        /// Whether the item stays active.
        aktiv: bool,
    },
    /// Soft-delete the item in the open edit form.
    DeleteCurrent,
    /// Book a quantity movement.
    Track {
        /// The carton barcode.
        barcode: String,
        /// The new quantity.
        menge_neu: f64,
        /// Movement description; empty falls back to the default.
        beschreibung: String,
    },
}

/// Inventory page module.
pub struct PulverModule {
    /// The rendered inventory table.
    table: Mutex<TableView>,
    /// The open edit form's record, if any.
    edit_draft: Mutex<Option<EditDraft>>,
    /// Realtime subscription guard.
    subscribed: AtomicBool,
}

impl PulverModule {
    /// Creates the module.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            table: Mutex::new(TableView::new(vec![
                "ID",
                "Barcode",
                "Artikelnummer",
                "Hersteller",
                "Farbe",
                "Qualität",
                "Oberfläche",
                "Anwendung",
                "Start (kg)",
                "Menge (kg)",
                "Lagerort",
            ])),
            edit_draft: Mutex::new(None),
            subscribed: AtomicBool::new(false),
        })
    }

    /// A snapshot of the rendered table.
    pub fn table(&self) -> TableView {
        self.table.lock().expect("pulver table poisoned").clone()
    }

    /// Loads the inventory list and renders it into the table.
    pub async fn load_powders(&self, ctx: &AppContext) -> AppResult<()> {
        let powders = ctx.pulver.list().await?;
        tracing::debug!("Loaded {} inventory items", powders.len());

        let rows = powders.iter().map(Self::render_row).collect();
        self.table
            .lock()
            .expect("pulver table poisoned")
            .set_rows(rows);
        Ok(())
    }

    fn render_row(item: &Pulver) -> TableRow {
        TableRow::new(
            item.id,
            vec![
                item.id.to_string(),
                item.barcode.clone(),
                text_cell(&item.artikelnummer),
                text_cell(&item.hersteller),
                text_cell(&item.farbe),
                text_cell(&item.qualitaet),
                text_cell(&item.oberflaeche),
                text_cell(&item.anwendung),
                number_cell(item.start_menge_kg),
                number_cell(item.menge_kg),
                text_cell(&item.lagerort),
            ],
        )
    }

    /// Opens the edit form: re-fetches the item for a fresh
    /// `updated_at` and keeps it as the draft. Returns `None` when the
    /// flow was aborted.
    pub async fn open_edit(&self, ctx: &AppContext, id: i64) -> AppResult<Option<PulverDetail>> {
        if !ctx
            .require_permission(
                "powder.update",
                "Sie haben keine Berechtigung, Pulver zu bearbeiten.",
            )
            .await?
        {
            return Ok(None);
        }

        let item = match ctx.pulver.get(id).await {
            Ok(item) => item,
            Err(e) => {
                report_error(ctx.notifier.as_ref(), e)?;
                return Ok(None);
            }
        };

        let updated_at = item.updated_at.clone().unwrap_or_default();
        *self.edit_draft.lock().expect("edit draft poisoned") = Some(EditDraft { id, updated_at });

        Ok(Some(item))
    }

    /// Looks up a carton by barcode for the tracking form, returning
    /// the current quantity to prefill.
    pub async fn lookup_barcode(&self, ctx: &AppContext, barcode: &str) -> AppResult<Option<f64>> {
        let barcode = barcode.trim();
        if barcode.is_empty() {
            return Ok(None);
        }

        match ctx.pulver.get_by_barcode(barcode).await {
            Ok(bestand) => Ok(Some(bestand.menge_kg.unwrap_or(0.0))),
            Err(e) if e.is_session() => Err(e),
            Err(_) => {
                ctx.notifier.alert("Pulver nicht gefunden!");
                Ok(None)
            }
        }
    }

    /// The printable label URL for an item, opened externally.
    pub fn label_url(&self, ctx: &AppContext, id: i64) -> String {
        ctx.pulver.label_url(id)
    }

    /// Handles one operator action.
    pub async fn handle(&self, ctx: &AppContext, action: PulverAction) -> AppResult<()> {
        match action {
            PulverAction::Reload => {
                if let Err(e) = self.load_powders(ctx).await {
                    report_error(ctx.notifier.as_ref(), e)?;
                }
            }
            PulverAction::SetFilter { filter } => {
                self.table
                    .lock()
                    .expect("pulver table poisoned")
                    .apply_filter(filter);
            }
            PulverAction::ResetFilter => {
                self.table
                    .lock()
                    .expect("pulver table poisoned")
                    .reset_filter();
            }
            PulverAction::Create { form } => self.create(ctx, form).await?,
            PulverAction::SaveEdit { form, aktiv } => self.save_edit(ctx, form, aktiv).await?,
            PulverAction::DeleteCurrent => self.delete_current(ctx).await?,
            PulverAction::Track {
                barcode,
                menge_neu,
                beschreibung,
            } => self.track(ctx, barcode, menge_neu, beschreibung).await?,
        }
        Ok(())
    }

    async fn create(&self, ctx: &AppContext, form: PulverForm) -> AppResult<()> {
        let payload = CreatePulver {
            artikelnummer: form.artikelnummer.trim().to_string(),
            hersteller: form.hersteller.trim().to_string(),
            farbe: form.farbe,
            qualitaet: form.qualitaet,
            oberflaeche: form.oberflaeche,
            anwendung: form.anwendung,
            start_menge_kg: form.start_menge_kg,
            lagerort: form.lagerort,
        };
        if let Err(e) = validate_payload(&payload) {
            return report_error(ctx.notifier.as_ref(), e);
        }

        match ctx.pulver.create(&payload).await {
            Ok(created) => {
                ctx.notifier
                    .alert(&format!("Pulver erzeugt! Barcode: {}", created.pulver.barcode));
                if let Err(e) = self.load_powders(ctx).await {
                    report_error(ctx.notifier.as_ref(), e)?;
                }
            }
            Err(e) => report_error(ctx.notifier.as_ref(), e)?,
        }
        Ok(())
    }

    async fn save_edit(&self, ctx: &AppContext, form: PulverForm, aktiv: bool) -> AppResult<()> {
        let Some(draft) = self.edit_draft.lock().expect("edit draft poisoned").clone() else {
            ctx.notifier.alert("Kein Pulver zum Speichern geöffnet.");
            return Ok(());
        };

        let payload = UpdatePulver {
            artikelnummer: form.artikelnummer.trim().to_string(),
            hersteller: form.hersteller.trim().to_string(),
            farbe: form.farbe,
            qualitaet: form.qualitaet,
            oberflaeche: form.oberflaeche,
            anwendung: form.anwendung,
            start_menge_kg: form.start_menge_kg,
            lagerort: form.lagerort,
            aktiv,
            updated_at: draft.updated_at,
        };
        if let Err(e) = validate_payload(&payload) {
            return report_error(ctx.notifier.as_ref(), e);
        }

        match ctx.pulver.update(draft.id, &payload).await {
            Ok(()) => {
                ctx.notifier.alert("Pulver gespeichert.");
                *self.edit_draft.lock().expect("edit draft poisoned") = None;
                if let Err(e) = self.load_powders(ctx).await {
                    report_error(ctx.notifier.as_ref(), e)?;
                }
            }
            Err(e) if e.is_conflict() => {
                ctx.notifier.alert(
                    "Dieses Pulver wurde inzwischen von einem anderen Benutzer geändert. Bitte Seite aktualisieren.",
                );
            }
            Err(e) => report_error(ctx.notifier.as_ref(), e)?,
        }
        Ok(())
    }

    async fn delete_current(&self, ctx: &AppContext) -> AppResult<()> {
        if !ctx
            .require_permission(
                "powder.delete",
                "Sie haben keine Berechtigung, Pulver zu löschen.",
            )
            .await?
        {
            return Ok(());
        }

        let Some(draft) = self.edit_draft.lock().expect("edit draft poisoned").clone() else {
            ctx.notifier.alert("Kein Pulver zum Löschen geöffnet.");
            return Ok(());
        };

        if !ctx.notifier.confirm("Dieses Pulver wirklich löschen?") {
            return Ok(());
        }

        match ctx.pulver.delete(draft.id).await {
            Ok(()) => {
                ctx.notifier.alert("Pulver gelöscht.");
                *self.edit_draft.lock().expect("edit draft poisoned") = None;
                if let Err(e) = self.load_powders(ctx).await {
                    report_error(ctx.notifier.as_ref(), e)?;
                }
            }
            Err(e) => report_error(ctx.notifier.as_ref(), e)?,
        }
        Ok(())
    }

    async fn track(
        &self,
        ctx: &AppContext,
        barcode: String,
        menge_neu: f64,
        beschreibung: String,
    ) -> AppResult<()> {
        let beschreibung = if beschreibung.trim().is_empty() {
            TrackMovement::default_beschreibung()
        } else {
            beschreibung.trim().to_string()
        };

        let payload = TrackMovement {
            barcode: barcode.trim().to_string(),
            menge_neu,
            beschreibung,
        };
        if let Err(e) = validate_payload(&payload) {
            return report_error(ctx.notifier.as_ref(), e);
        }

        match ctx.pulver.track(&payload).await {
            Ok(_) => {
                ctx.notifier.alert("Bewegung gespeichert!");
                if let Err(e) = self.load_powders(ctx).await {
                    report_error(ctx.notifier.as_ref(), e)?;
                }
            }
            Err(e) => report_error(ctx.notifier.as_ref(), e)?,
        }
        Ok(())
    }
}

#[async_trait]
impl PageModule for PulverModule {
    fn key(&self) -> &'static str {
        "pulver"
    }

    fn selector(&self) -> &'static str {
        "#pulver-table"
    }

    async fn init(self: Arc<Self>, ctx: AppContext) -> AppResult<()> {
        tracing::info!("Inventory module activated");

        if !self.subscribed.swap(true, Ordering::SeqCst) {
            let module = self.clone();
            let mut events = ctx.channel.subscribe();
            let event_ctx = ctx.clone();
            tokio::spawn(async move {
                loop {
                    match events.recv().await {
                        Ok(event) if event.is_pulver_event() => {
                            tracing::info!("Inventory event received, reloading list");
                            if let Err(e) = module.load_powders(&event_ctx).await {
                                tracing::warn!("Reload after inventory event failed: {e}");
                            }
                        }
                        Ok(_) => {}
                        Err(RecvError::Lagged(skipped)) => {
                            tracing::warn!("Inventory module dropped {skipped} events");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            });
        }

        self.load_powders(&ctx).await
    }

    async fn refresh(self: Arc<Self>, ctx: AppContext) -> AppResult<()> {
        tracing::info!("Inventory module refresh");
        // Close leftover edit and tracking forms.
        *self.edit_draft.lock().expect("edit draft poisoned") = None;
        self.load_powders(&ctx).await
    }
}
