//! Realtime events pushed by the Pulverlager server.
//!
//! Every inbound channel message is a JSON object carrying an `event`
//! discriminator plus event-specific context fields. Unrecognized
//! discriminators deserialize into [`AppEvent::Unknown`] so new server
//! events never break the channel; genuinely malformed JSON is rejected
//! at the parse site instead.

use serde::{Deserialize, Serialize};

/// A parsed server push notification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// A user account was created.
    UserCreated {
        /// The new user's id.
        #[serde(default)]
        id: Option<i64>,
        /// The new user's login name.
        #[serde(default)]
        username: Option<String>,
    },
    /// A user account was updated.
    UserUpdated {
        /// The affected user's id.
        #[serde(default)]
        id: Option<i64>,
    },
    /// A user account was soft-deleted.
    UserDeleted {
        /// The affected user's id.
        #[serde(default)]
        id: Option<i64>,
    },
    /// A role was created.
    RoleCreated {
        /// The new role's id.
        #[serde(default)]
        id: Option<i64>,
        /// The new role's name.
        #[serde(default)]
        name: Option<String>,
    },
    /// A role's permission assignments changed.
    RoleUpdated {
        /// The affected role's id.
        #[serde(default)]
        role_id: Option<i64>,
    },
    /// An inventory item was created.
    PulverCreated {
        /// The new item's id.
        #[serde(default)]
        id: Option<i64>,
        /// The server-generated barcode.
        #[serde(default)]
        barcode: Option<String>,
        /// The article number.
        #[serde(default)]
        artikelnummer: Option<String>,
    },
    /// An inventory item was updated.
    PulverUpdated {
        /// The affected item's id.
        #[serde(default)]
        id: Option<i64>,
    },
    /// An inventory item was soft-deleted.
    PulverDeleted {
        /// The affected item's id.
        #[serde(default)]
        id: Option<i64>,
    },
    /// A quantity movement was booked against an inventory item.
    PulverTracked {
        /// The affected item's id.
        #[serde(default)]
        id: Option<i64>,
        /// The tracked barcode.
        #[serde(default)]
        barcode: Option<String>,
        /// The new quantity after the movement.
        #[serde(default)]
        menge_neu: Option<f64>,
    },
    /// Any event type this client version does not know about.
    #[serde(other)]
    Unknown,
}

impl AppEvent {
    /// Events the user-management module reloads on.
    pub fn is_user_event(&self) -> bool {
        matches!(
            self,
            AppEvent::UserCreated { .. } | AppEvent::UserUpdated { .. } | AppEvent::UserDeleted { .. }
        )
    }

    /// Events the roles module reloads on.
    pub fn is_role_event(&self) -> bool {
        matches!(self, AppEvent::RoleCreated { .. } | AppEvent::RoleUpdated { .. })
    }

    /// Events the inventory module reloads on.
    pub fn is_pulver_event(&self) -> bool {
        matches!(
            self,
            AppEvent::PulverCreated { .. }
                | AppEvent::PulverUpdated { .. }
                | AppEvent::PulverDeleted { .. }
                | AppEvent::PulverTracked { .. }
        )
    }
}
