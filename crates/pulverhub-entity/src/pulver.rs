//! Inventory ("Pulver") entities and tracking payloads.
//!
//! Quantities are never written directly: `menge_kg` only changes
//! server-side through tracking movements.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// An inventory item as returned by the list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pulver {
    /// Unique item identifier.
    pub id: i64,
    /// Server-generated carton barcode, e.g. `OZS-00001`.
    pub barcode: String,
    /// Unique article number.
    #[serde(default)]
    pub artikelnummer: Option<String>,
    /// Manufacturer.
    #[serde(default)]
    pub hersteller: Option<String>,
    /// Color.
    #[serde(default)]
    pub farbe: Option<String>,
    /// Quality grade.
    #[serde(default)]
    pub qualitaet: Option<String>,
    /// Surface finish.
    #[serde(default)]
    pub oberflaeche: Option<String>,
    /// Application area.
    #[serde(default)]
    pub anwendung: Option<String>,
    /// Initial quantity in kilograms.
    #[serde(default)]
    pub start_menge_kg: Option<f64>,
    /// Current quantity in kilograms.
    #[serde(default)]
    pub menge_kg: Option<f64>,
    /// Storage location.
    #[serde(default)]
    pub lagerort: Option<String>,
    /// Whether the item is active.
    pub aktiv: bool,
}

/// A freshly fetched single inventory record including its version
/// marker. Edit flows always re-fetch this instead of reusing list rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulverDetail {
    /// Unique item identifier.
    pub id: i64,
    /// Carton barcode.
    pub barcode: String,
    /// Article number.
    #[serde(default)]
    pub artikelnummer: Option<String>,
    /// Manufacturer.
    #[serde(default)]
    pub hersteller: Option<String>,
    /// Color.
    #[serde(default)]
    pub farbe: Option<String>,
    /// Quality grade.
    #[serde(default)]
    pub qualitaet: Option<String>,
    /// Surface finish.
    #[serde(default)]
    pub oberflaeche: Option<String>,
    /// Application area.
    #[serde(default)]
    pub anwendung: Option<String>,
    /// Initial quantity in kilograms.
    #[serde(default)]
    pub start_menge_kg: Option<f64>,
    /// Current quantity in kilograms.
    #[serde(default)]
    pub menge_kg: Option<f64>,
    /// Storage location.
    #[serde(default)]
    pub lagerort: Option<String>,
    /// Whether the item is active.
    pub aktiv: bool,
    /// Opaque version marker, echoed on the next update.
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// The current stock of one carton, looked up by barcode while filling
/// in a tracking movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulverBestand {
    /// The item's id.
    pub id: i64,
    /// The looked-up barcode.
    pub barcode: String,
    /// Current quantity in kilograms.
    #[serde(default)]
    pub menge_kg: Option<f64>,
}

/// Payload for creating a new inventory item. The barcode is generated
/// server-side and reported back.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreatePulver {
    /// Unique article number (required).
    #[validate(length(min = 1, message = "Artikelnummer ist ein Pflichtfeld"))]
    pub artikelnummer: String,
    /// Manufacturer (required).
    #[validate(length(min = 1, message = "Hersteller ist ein Pflichtfeld"))]
    pub hersteller: String,
    /// Color.
    #[serde(default)]
    pub farbe: Option<String>,
    /// Quality grade.
    #[serde(default)]
    pub qualitaet: Option<String>,
    /// Surface finish.
    #[serde(default)]
    pub oberflaeche: Option<String>,
    /// Application area.
    #[serde(default)]
    pub anwendung: Option<String>,
    /// Initial quantity in kilograms; also becomes the current quantity.
    pub start_menge_kg: f64,
    /// Storage location.
    #[serde(default)]
    pub lagerort: Option<String>,
}

/// Payload for updating an inventory item. Quantity is deliberately
/// absent; it only moves via [`TrackMovement`].
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdatePulver {
    /// Article number.
    #[validate(length(min = 1, message = "Artikelnummer ist ein Pflichtfeld"))]
    pub artikelnummer: String,
    /// Manufacturer.
    #[validate(length(min = 1, message = "Hersteller ist ein Pflichtfeld"))]
    pub hersteller: String,
    /// Color.
    #[serde(default)]
    pub farbe: Option<String>,
    /// Quality grade.
    #[serde(default)]
    pub qualitaet: Option<String>,
    /// Surface finish.
    #[serde(default)]
    pub oberflaeche: Option<String>,
    /// Application area.
    #[serde(default)]
    pub anwendung: Option<String>,
    /// Initial quantity in kilograms.
    pub start_menge_kg: f64,
    /// Storage location.
    #[serde(default)]
    pub lagerort: Option<String>,
    /// Whether the item stays active.
    pub aktiv: bool,
    /// The last-read version marker of the record being updated.
    pub updated_at: String,
}

/// Server response after creating an inventory item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedPulver {
    /// The created item fields the server echoes back.
    pub pulver: CreatedPulverInfo,
}

/// The item fields the create endpoint returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedPulverInfo {
    /// The new item's id.
    pub id: i64,
    /// The server-generated barcode.
    pub barcode: String,
    /// The article number.
    #[serde(default)]
    pub artikelnummer: Option<String>,
    /// The manufacturer.
    #[serde(default)]
    pub hersteller: Option<String>,
    /// The starting quantity.
    #[serde(default)]
    pub menge_kg: Option<f64>,
}

/// A write-only quantity movement against one carton.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TrackMovement {
    /// The carton barcode.
    #[validate(length(min = 1, message = "Barcode ist ein Pflichtfeld"))]
    pub barcode: String,
    /// The new quantity after the movement.
    pub menge_neu: f64,
    /// Movement description; defaults to normal consumption.
    #[serde(default = "TrackMovement::default_beschreibung")]
    pub beschreibung: String,
}

impl TrackMovement {
    /// The description used when the operator leaves the field empty.
    pub fn default_beschreibung() -> String {
        "Normaler Verbrauch".to_string()
    }
}

/// Server response after booking a movement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackResult {
    /// Quantity before the movement.
    pub menge_alt: f64,
    /// Quantity after the movement.
    pub menge_neu: f64,
    /// The stored description.
    #[serde(default)]
    pub beschreibung: Option<String>,
}
