//! Shared test helpers: an in-process mock Pulverlager server plus a
//! pre-wired application context around it.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde_json::{Value, json};
use tokio::sync::broadcast;

use pulverhub_app::modules::{PulverModule, RolesModule, UsersModule};
use pulverhub_app::{AppContext, ContentLoader, ModuleRegistry};
use pulverhub_core::config::api::ApiConfig;
use pulverhub_core::config::auth::AuthConfig;
use pulverhub_core::config::realtime::RealtimeConfig;
use pulverhub_core::traits::Notifier;
use pulverhub_entity::StoredSession;
use pulverhub_gateway::ApiGateway;
use pulverhub_realtime::EventChannel;
use pulverhub_session::SessionStore;

// ── Tokens ───────────────────────────────────────────────────────────

/// Builds an unsigned three-part bearer token with the given expiry
/// offset from now.
pub fn make_token(sub: &str, exp_offset_secs: i64) -> String {
    let exp = chrono::Utc::now().timestamp() + exp_offset_secs;
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(json!({"sub": sub, "exp": exp}).to_string().as_bytes());
    format!("{header}.{payload}.testsig")
}

// ── Recording notifier ───────────────────────────────────────────────

/// Notifier that records alerts and answers confirms/prompts from
/// prepared queues.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    alerts: Mutex<Vec<String>>,
    confirm_answer: AtomicBool,
    prompts: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        let notifier = Self::default();
        notifier.confirm_answer.store(true, Ordering::SeqCst);
        Arc::new(notifier)
    }

    /// All alerts shown so far.
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().unwrap().clone()
    }

    /// Whether any alert contains the given text.
    pub fn alerted(&self, needle: &str) -> bool {
        self.alerts().iter().any(|alert| alert.contains(needle))
    }

    /// Sets the answer for subsequent confirms.
    pub fn answer_confirms(&self, answer: bool) {
        self.confirm_answer.store(answer, Ordering::SeqCst);
    }

    /// Queues answers for subsequent prompts (front first).
    pub fn queue_prompts(&self, answers: &[&str]) {
        let mut prompts = self.prompts.lock().unwrap();
        for answer in answers.iter().rev() {
            prompts.insert(0, answer.to_string());
        }
    }
}

impl Notifier for RecordingNotifier {
    fn alert(&self, message: &str) {
        self.alerts.lock().unwrap().push(message.to_string());
    }

    fn confirm(&self, _message: &str) -> bool {
        self.confirm_answer.load(Ordering::SeqCst)
    }

    fn prompt(&self, _message: &str) -> Option<String> {
        let mut prompts = self.prompts.lock().unwrap();
        if prompts.is_empty() {
            None
        } else {
            Some(prompts.remove(0))
        }
    }
}

// ── Mock server state ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MockUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub role_id: i64,
    pub role_name: String,
    pub active: bool,
    pub deleted: bool,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct MockPulver {
    pub id: i64,
    pub barcode: String,
    pub artikelnummer: String,
    pub hersteller: String,
    pub farbe: String,
    pub qualitaet: String,
    pub oberflaeche: String,
    pub anwendung: String,
    pub start_menge_kg: f64,
    pub menge_kg: f64,
    pub lagerort: String,
    pub aktiv: bool,
    pub deleted: bool,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct MockRole {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub permission_ids: Vec<i64>,
    pub updated_at: String,
}

/// Shared state of the mock Pulverlager server.
pub struct ServerState {
    /// Bearer tokens the server accepts.
    pub tokens: Mutex<HashSet<String>>,
    /// When set, every authenticated endpoint answers 401.
    pub force_unauthorized: AtomicBool,

    pub refresh_hits: AtomicUsize,
    /// When set, refresh answers 401.
    pub refresh_fails: AtomicBool,
    /// The token refresh hands out (also accepted afterwards).
    pub refreshed_token: Mutex<String>,

    pub me_hits: AtomicUsize,
    /// When set, `/api/me` answers 500.
    pub me_fails: AtomicBool,
    /// The current operator's permission names.
    pub my_permissions: Mutex<Vec<String>>,

    pub users: Mutex<Vec<MockUser>>,
    pub users_list_hits: AtomicUsize,
    pub pulver: Mutex<Vec<MockPulver>>,
    pub pulver_list_hits: AtomicUsize,
    pub roles: Mutex<Vec<MockRole>>,
    pub permissions: Mutex<Vec<(i64, String)>>,

    /// Content-Type the last `/api/headers` request carried.
    pub seen_content_type: Mutex<Option<String>>,

    /// Frames broadcast to every connected WebSocket client.
    pub events: broadcast::Sender<String>,
    /// Fires to force-close all WebSocket connections.
    pub ws_close: broadcast::Sender<()>,
    /// Number of WebSocket connections ever accepted.
    pub ws_connections: AtomicUsize,
}

impl ServerState {
    fn new() -> Self {
        let (events, _) = broadcast::channel(64);
        let (ws_close, _) = broadcast::channel(8);

        let permission_names = [
            "user.manage",
            "user.create",
            "user.update",
            "user.delete",
            "pulver.manage",
            "roles.manage",
            "manage.permission",
            "new.role",
            "powder.update",
            "powder.delete",
            "pulver.track",
        ];
        let permissions: Vec<(i64, String)> = permission_names
            .iter()
            .enumerate()
            .map(|(index, name)| (index as i64 + 1, name.to_string()))
            .collect();

        Self {
            tokens: Mutex::new(HashSet::new()),
            force_unauthorized: AtomicBool::new(false),
            refresh_hits: AtomicUsize::new(0),
            refresh_fails: AtomicBool::new(false),
            refreshed_token: Mutex::new(make_token("admin", 3600)),
            me_hits: AtomicUsize::new(0),
            me_fails: AtomicBool::new(false),
            my_permissions: Mutex::new(
                permission_names.iter().map(|name| name.to_string()).collect(),
            ),
            users: Mutex::new(vec![
                MockUser {
                    id: 1,
                    username: "admin".to_string(),
                    email: "admin@example.com".to_string(),
                    role_id: 1,
                    role_name: "admin".to_string(),
                    active: true,
                    deleted: false,
                    updated_at: "2025-11-25T09:00:00".to_string(),
                },
                MockUser {
                    id: 2,
                    username: "m.huber".to_string(),
                    email: "m.huber@example.com".to_string(),
                    role_id: 2,
                    role_name: "lager".to_string(),
                    active: true,
                    deleted: false,
                    updated_at: "2025-11-25T09:05:00".to_string(),
                },
            ]),
            users_list_hits: AtomicUsize::new(0),
            pulver: Mutex::new(vec![
                MockPulver {
                    id: 1,
                    barcode: "OZS-00001".to_string(),
                    artikelnummer: "A-100".to_string(),
                    hersteller: "AkzoNobel".to_string(),
                    farbe: "RAL 9016".to_string(),
                    qualitaet: "Epoxy".to_string(),
                    oberflaeche: "Glatt".to_string(),
                    anwendung: "Innen".to_string(),
                    start_menge_kg: 25.0,
                    menge_kg: 20.0,
                    lagerort: "Regal 1".to_string(),
                    aktiv: true,
                    deleted: false,
                    updated_at: "2025-11-25T08:00:00".to_string(),
                },
                MockPulver {
                    id: 2,
                    barcode: "OZS-00002".to_string(),
                    artikelnummer: "A-200".to_string(),
                    hersteller: "Tiger".to_string(),
                    farbe: "RAL 7016".to_string(),
                    qualitaet: "Polyester".to_string(),
                    oberflaeche: "Matt".to_string(),
                    anwendung: "Aussen".to_string(),
                    start_menge_kg: 20.0,
                    menge_kg: 12.5,
                    lagerort: "Regal 2".to_string(),
                    aktiv: true,
                    deleted: false,
                    updated_at: "2025-11-25T08:10:00".to_string(),
                },
            ]),
            pulver_list_hits: AtomicUsize::new(0),
            roles: Mutex::new(vec![
                MockRole {
                    id: 1,
                    name: "admin".to_string(),
                    description: "Vollzugriff".to_string(),
                    permission_ids: (1..=11).collect(),
                    updated_at: "2025-11-25T07:00:00".to_string(),
                },
                MockRole {
                    id: 2,
                    name: "lager".to_string(),
                    description: "Lagerverwaltung".to_string(),
                    permission_ids: vec![5, 9, 11],
                    updated_at: "2025-11-25T07:05:00".to_string(),
                },
            ]),
            permissions: Mutex::new(permissions),
            seen_content_type: Mutex::new(None),
            events,
            ws_close,
            ws_connections: AtomicUsize::new(0),
        }
    }

    /// Accepts a bearer token.
    pub fn accept_token(&self, token: &str) {
        self.tokens.lock().unwrap().insert(token.to_string());
    }

    /// Restricts the operator's permissions.
    pub fn set_my_permissions(&self, names: &[&str]) {
        *self.my_permissions.lock().unwrap() =
            names.iter().map(|name| name.to_string()).collect();
    }

    /// Pushes a realtime frame to all connected clients.
    pub fn push_event(&self, frame: &str) {
        let _ = self.events.send(frame.to_string());
    }

    /// Force-closes all WebSocket connections.
    pub fn close_ws_connections(&self) {
        let _ = self.ws_close.send(());
    }

    /// Bumps a user's version marker, simulating a concurrent edit.
    pub fn touch_user(&self, id: i64) {
        let mut users = self.users.lock().unwrap();
        if let Some(user) = users.iter_mut().find(|user| user.id == id) {
            user.updated_at = format!("{}Z", chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f"));
        }
    }

    /// Bumps a role's version marker, simulating a concurrent edit.
    pub fn touch_role(&self, id: i64) {
        let mut roles = self.roles.lock().unwrap();
        if let Some(role) = roles.iter_mut().find(|role| role.id == id) {
            role.updated_at = format!("{}Z", chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f"));
        }
    }

    /// Bumps an item's version marker, simulating a concurrent edit.
    pub fn touch_pulver(&self, id: i64) {
        let mut pulver = self.pulver.lock().unwrap();
        if let Some(item) = pulver.iter_mut().find(|item| item.id == id) {
            item.updated_at = format!("{}Z", chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f"));
        }
    }
}

// ── Routes ───────────────────────────────────────────────────────────

type AppState = Arc<ServerState>;

fn authorize(state: &ServerState, headers: &HeaderMap) -> Result<(), StatusCode> {
    if state.force_unauthorized.load(Ordering::SeqCst) {
        return Err(StatusCode::UNAUTHORIZED);
    }
    let bearer = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or("");
    if state.tokens.lock().unwrap().contains(bearer) {
        Ok(())
    } else {
        Err(StatusCode::UNAUTHORIZED)
    }
}

fn detail(status: StatusCode, text: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "detail": text })))
}

async fn refresh(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    state.refresh_hits.fetch_add(1, Ordering::SeqCst);
    if state.refresh_fails.load(Ordering::SeqCst) {
        return detail(StatusCode::UNAUTHORIZED, "Token ist abgelaufen").into_response();
    }
    if authorize(&state, &headers).is_err() {
        return detail(StatusCode::UNAUTHORIZED, "Ungültiger Token").into_response();
    }
    let token = state.refreshed_token.lock().unwrap().clone();
    state.accept_token(&token);
    Json(json!({ "access_token": token })).into_response()
}

async fn me(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Err(status) = authorize(&state, &headers) {
        return status.into_response();
    }
    // Give concurrent callers a window to pile up on one fetch.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    state.me_hits.fetch_add(1, Ordering::SeqCst);
    if state.me_fails.load(Ordering::SeqCst) {
        return detail(StatusCode::INTERNAL_SERVER_ERROR, "Interner Fehler").into_response();
    }
    let permissions = state.my_permissions.lock().unwrap().clone();
    Json(json!({
        "id": 1,
        "username": "admin",
        "role_id": 1,
        "permissions": permissions,
        "must_change_password": false,
        "active": true
    }))
    .into_response()
}

async fn echo_headers(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Err(status) = authorize(&state, &headers) {
        return status.into_response();
    }
    *state.seen_content_type.lock().unwrap() = headers
        .get("content-type")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    Json(json!({ "ok": true })).into_response()
}

fn user_row(user: &MockUser) -> Value {
    json!({
        "id": user.id,
        "username": user.username,
        "email": user.email,
        "role_id": user.role_id,
        "role_name": user.role_name,
        "active": user.active,
        "deleted": user.deleted,
        "must_change_password": false,
        "last_login": null,
        "created_at": null
    })
}

async fn list_users(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<std::collections::HashMap<String, String>>,
) -> impl IntoResponse {
    if let Err(status) = authorize(&state, &headers) {
        return status.into_response();
    }
    state.users_list_hits.fetch_add(1, Ordering::SeqCst);
    let show_deleted = query.get("show_deleted").map(String::as_str) == Some("true");
    let users = state.users.lock().unwrap();
    let rows: Vec<Value> = users
        .iter()
        .filter(|user| show_deleted || !user.deleted)
        .map(user_row)
        .collect();
    Json(rows).into_response()
}

async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if let Err(status) = authorize(&state, &headers) {
        return status.into_response();
    }
    let username = body["username"].as_str().unwrap_or_default().to_string();
    let mut users = state.users.lock().unwrap();
    if users.iter().any(|user| user.username == username) {
        return detail(StatusCode::BAD_REQUEST, "Benutzername existiert bereits").into_response();
    }
    let id = users.iter().map(|user| user.id).max().unwrap_or(0) + 1;
    users.push(MockUser {
        id,
        username: username.clone(),
        email: body["email"].as_str().unwrap_or_default().to_string(),
        role_id: body["role_id"].as_i64().unwrap_or(2),
        role_name: "lager".to_string(),
        active: body["active"].as_bool().unwrap_or(true),
        deleted: false,
        updated_at: "2025-11-25T10:00:00".to_string(),
    });
    Json(json!({
        "message": "Benutzer erfolgreich angelegt",
        "user": { "id": id, "username": username, "email": body["email"], "role_id": body["role_id"], "active": true },
        "temp_password": "OZS-test1234"
    }))
    .into_response()
}

async fn get_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    if let Err(status) = authorize(&state, &headers) {
        return status.into_response();
    }
    let users = state.users.lock().unwrap();
    match users.iter().find(|user| user.id == id && !user.deleted) {
        Some(user) => Json(json!({
            "id": user.id,
            "username": user.username,
            "email": user.email,
            "role_id": user.role_id,
            "active": user.active,
            "last_login": null,
            "created_at": null,
            "updated_at": user.updated_at
        }))
        .into_response(),
        None => detail(StatusCode::NOT_FOUND, "Benutzer nicht gefunden").into_response(),
    }
}

async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if let Err(status) = authorize(&state, &headers) {
        return status.into_response();
    }
    let mut users = state.users.lock().unwrap();
    let Some(user) = users.iter_mut().find(|user| user.id == id && !user.deleted) else {
        return detail(StatusCode::NOT_FOUND, "Benutzer nicht gefunden").into_response();
    };
    let client_marker = body["updated_at"].as_str().unwrap_or_default();
    if client_marker != user.updated_at {
        return detail(
            StatusCode::CONFLICT,
            "Der Datensatz wurde inzwischen von einem anderen Benutzer geändert.",
        )
        .into_response();
    }
    if let Some(username) = body["username"].as_str() {
        user.username = username.to_string();
    }
    if let Some(email) = body["email"].as_str() {
        user.email = email.to_string();
    }
    if let Some(active) = body["active"].as_bool() {
        user.active = active;
    }
    user.updated_at = format!("{}Z", chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f"));
    Json(json!({ "message": "Benutzerdaten aktualisiert" })).into_response()
}

async fn delete_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    if let Err(status) = authorize(&state, &headers) {
        return status.into_response();
    }
    let mut users = state.users.lock().unwrap();
    match users.iter_mut().find(|user| user.id == id) {
        Some(user) => {
            user.deleted = true;
            Json(json!({ "message": "Benutzer gelöscht" })).into_response()
        }
        None => detail(StatusCode::NOT_FOUND, "Benutzer nicht gefunden").into_response(),
    }
}

async fn restore_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    if let Err(status) = authorize(&state, &headers) {
        return status.into_response();
    }
    let mut users = state.users.lock().unwrap();
    match users.iter_mut().find(|user| user.id == id) {
        Some(user) => {
            user.deleted = false;
            Json(json!({ "message": "Benutzer wiederhergestellt" })).into_response()
        }
        None => detail(StatusCode::NOT_FOUND, "Benutzer nicht gefunden").into_response(),
    }
}

async fn reset_password(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    if let Err(status) = authorize(&state, &headers) {
        return status.into_response();
    }
    let users = state.users.lock().unwrap();
    match users.iter().find(|user| user.id == id && !user.deleted) {
        Some(user) => Json(json!({
            "message": "Einmalpasswort vergeben",
            "username": user.username,
            "temp_password": "OZS-reset5678"
        }))
        .into_response(),
        None => detail(StatusCode::NOT_FOUND, "Benutzer nicht gefunden").into_response(),
    }
}

async fn export_users(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Err(status) = authorize(&state, &headers) {
        return status.into_response();
    }
    (
        [("content-type", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet")],
        b"PK\x03\x04mock-xlsx".to_vec(),
    )
        .into_response()
}

fn pulver_row(item: &MockPulver) -> Value {
    json!({
        "id": item.id,
        "barcode": item.barcode,
        "artikelnummer": item.artikelnummer,
        "hersteller": item.hersteller,
        "farbe": item.farbe,
        "qualitaet": item.qualitaet,
        "oberflaeche": item.oberflaeche,
        "anwendung": item.anwendung,
        "start_menge_kg": item.start_menge_kg,
        "menge_kg": item.menge_kg,
        "lagerort": item.lagerort,
        "aktiv": item.aktiv,
        "created_by": 1,
        "created_at": "2025-11-25T08:00:00"
    })
}

async fn list_pulver(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Err(status) = authorize(&state, &headers) {
        return status.into_response();
    }
    state.pulver_list_hits.fetch_add(1, Ordering::SeqCst);
    let pulver = state.pulver.lock().unwrap();
    let rows: Vec<Value> = pulver
        .iter()
        .filter(|item| !item.deleted)
        .map(pulver_row)
        .collect();
    Json(rows).into_response()
}

async fn create_pulver(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if let Err(status) = authorize(&state, &headers) {
        return status.into_response();
    }
    let artikelnummer = body["artikelnummer"].as_str().unwrap_or_default().to_string();
    let mut pulver = state.pulver.lock().unwrap();
    if pulver.iter().any(|item| item.artikelnummer == artikelnummer) {
        return detail(StatusCode::BAD_REQUEST, "Artikelnummer existiert bereits").into_response();
    }
    let id = pulver.iter().map(|item| item.id).max().unwrap_or(0) + 1;
    let barcode = format!("OZS-{id:05}");
    let start = body["start_menge_kg"].as_f64().unwrap_or(0.0);
    pulver.push(MockPulver {
        id,
        barcode: barcode.clone(),
        artikelnummer: artikelnummer.clone(),
        hersteller: body["hersteller"].as_str().unwrap_or_default().to_string(),
        farbe: body["farbe"].as_str().unwrap_or_default().to_string(),
        qualitaet: body["qualitaet"].as_str().unwrap_or_default().to_string(),
        oberflaeche: body["oberflaeche"].as_str().unwrap_or_default().to_string(),
        anwendung: body["anwendung"].as_str().unwrap_or_default().to_string(),
        start_menge_kg: start,
        menge_kg: start,
        lagerort: body["lagerort"].as_str().unwrap_or_default().to_string(),
        aktiv: true,
        deleted: false,
        updated_at: "2025-11-25T10:30:00".to_string(),
    });
    Json(json!({
        "message": "Pulver erfolgreich angelegt",
        "pulver": {
            "id": id,
            "barcode": barcode,
            "artikelnummer": artikelnummer,
            "hersteller": body["hersteller"],
            "menge_kg": start
        }
    }))
    .into_response()
}

async fn get_pulver(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    if let Err(status) = authorize(&state, &headers) {
        return status.into_response();
    }
    let pulver = state.pulver.lock().unwrap();
    match pulver.iter().find(|item| item.id == id && !item.deleted) {
        Some(item) => {
            let mut row = pulver_row(item);
            row["updated_at"] = json!(item.updated_at);
            Json(row).into_response()
        }
        None => detail(StatusCode::NOT_FOUND, "Pulver nicht gefunden").into_response(),
    }
}

async fn track_pulver(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if let Err(status) = authorize(&state, &headers) {
        return status.into_response();
    }
    let barcode = body["barcode"].as_str().unwrap_or_default();
    let menge_neu = body["menge_neu"].as_f64().unwrap_or(0.0);
    let mut pulver = state.pulver.lock().unwrap();
    let Some(item) = pulver
        .iter_mut()
        .find(|item| item.barcode == barcode && !item.deleted)
    else {
        return detail(StatusCode::NOT_FOUND, "Pulver nicht gefunden").into_response();
    };
    let menge_alt = item.menge_kg;
    item.menge_kg = menge_neu;
    Json(json!({
        "message": "Bewegung gespeichert",
        "menge_alt": menge_alt,
        "menge_neu": menge_neu,
        "beschreibung": body["beschreibung"]
    }))
    .into_response()
}

async fn pulver_by_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> impl IntoResponse {
    if let Err(status) = authorize(&state, &headers) {
        return status.into_response();
    }
    let pulver = state.pulver.lock().unwrap();
    match pulver.iter().find(|item| item.barcode == key && !item.deleted) {
        Some(item) => Json(json!({
            "id": item.id,
            "barcode": item.barcode,
            "artikelnummer": item.artikelnummer,
            "hersteller": item.hersteller,
            "menge_kg": item.menge_kg,
            "lagerort": item.lagerort,
            "aktiv": item.aktiv
        }))
        .into_response(),
        None => detail(StatusCode::NOT_FOUND, "Pulver nicht gefunden").into_response(),
    }
}

async fn update_pulver(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(key): Path<String>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if let Err(status) = authorize(&state, &headers) {
        return status.into_response();
    }
    let Ok(id) = key.parse::<i64>() else {
        return detail(StatusCode::NOT_FOUND, "Pulver nicht gefunden").into_response();
    };
    let mut pulver = state.pulver.lock().unwrap();
    let Some(item) = pulver.iter_mut().find(|item| item.id == id && !item.deleted) else {
        return detail(StatusCode::NOT_FOUND, "Pulver nicht gefunden").into_response();
    };
    let client_marker = body["updated_at"].as_str().unwrap_or_default();
    if client_marker != item.updated_at {
        return detail(
            StatusCode::CONFLICT,
            "Der Datensatz wurde inzwischen von einem anderen Benutzer geändert.",
        )
        .into_response();
    }
    if let Some(hersteller) = body["hersteller"].as_str() {
        item.hersteller = hersteller.to_string();
    }
    if let Some(lagerort) = body["lagerort"].as_str() {
        item.lagerort = lagerort.to_string();
    }
    if let Some(aktiv) = body["aktiv"].as_bool() {
        item.aktiv = aktiv;
    }
    item.updated_at = format!("{}Z", chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f"));
    Json(json!({
        "message": "Pulver erfolgreich aktualisiert",
        "id": item.id,
        "updated_at": item.updated_at
    }))
    .into_response()
}

async fn delete_pulver(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(key): Path<String>,
) -> impl IntoResponse {
    if let Err(status) = authorize(&state, &headers) {
        return status.into_response();
    }
    let Ok(id) = key.parse::<i64>() else {
        return detail(StatusCode::NOT_FOUND, "Pulver nicht gefunden").into_response();
    };
    let mut pulver = state.pulver.lock().unwrap();
    match pulver.iter_mut().find(|item| item.id == id && !item.deleted) {
        Some(item) => {
            item.deleted = true;
            Json(json!({ "message": "Pulver erfolgreich gelöscht (Soft Delete)" })).into_response()
        }
        None => detail(StatusCode::NOT_FOUND, "Pulver nicht gefunden").into_response(),
    }
}

async fn list_roles(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Err(status) = authorize(&state, &headers) {
        return status.into_response();
    }
    let roles = state.roles.lock().unwrap();
    let rows: Vec<Value> = roles
        .iter()
        .map(|role| json!({ "id": role.id, "name": role.name, "description": role.description }))
        .collect();
    Json(rows).into_response()
}

async fn list_permissions(State(state): State<AppState>, headers: HeaderMap) -> impl IntoResponse {
    if let Err(status) = authorize(&state, &headers) {
        return status.into_response();
    }
    let permissions = state.permissions.lock().unwrap();
    let rows: Vec<Value> = permissions
        .iter()
        .map(|(id, name)| json!({ "id": id, "name": name, "description": "" }))
        .collect();
    Json(rows).into_response()
}

async fn role_permissions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> impl IntoResponse {
    if let Err(status) = authorize(&state, &headers) {
        return status.into_response();
    }
    let roles = state.roles.lock().unwrap();
    match roles.iter().find(|role| role.id == id) {
        Some(role) => Json(json!({
            "role_id": role.id,
            "role_name": role.name,
            "permissions": role.permission_ids,
            "updated_at": role.updated_at
        }))
        .into_response(),
        None => detail(StatusCode::NOT_FOUND, "Rolle nicht gefunden").into_response(),
    }
}

async fn assign_permissions(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if let Err(status) = authorize(&state, &headers) {
        return status.into_response();
    }
    let role_id = body["role_id"].as_i64().unwrap_or_default();
    let mut roles = state.roles.lock().unwrap();
    let Some(role) = roles.iter_mut().find(|role| role.id == role_id) else {
        return detail(StatusCode::NOT_FOUND, "Rolle nicht gefunden").into_response();
    };
    let client_marker = body["updated_at"].as_str().unwrap_or_default();
    if client_marker != role.updated_at {
        return detail(
            StatusCode::CONFLICT,
            "Diese Rolle wurde inzwischen von einem anderen Benutzer geändert. Bitte neu laden.",
        )
        .into_response();
    }
    let ids: Vec<i64> = body["permission_ids"]
        .as_array()
        .map(|values| values.iter().filter_map(Value::as_i64).collect())
        .unwrap_or_default();
    role.permission_ids = ids.clone();
    role.updated_at = format!("{}Z", chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f"));
    Json(json!({
        "message": "Rollenrechte aktualisiert",
        "role_id": role_id,
        "updated_at": role.updated_at,
        "assigned_permissions": ids
    }))
    .into_response()
}

async fn create_role(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    if let Err(status) = authorize(&state, &headers) {
        return status.into_response();
    }
    let name = body["name"].as_str().unwrap_or_default().to_string();
    let mut roles = state.roles.lock().unwrap();
    if roles.iter().any(|role| role.name == name) {
        return detail(StatusCode::BAD_REQUEST, "Rolle existiert bereits").into_response();
    }
    let id = roles.iter().map(|role| role.id).max().unwrap_or(0) + 1;
    let description = body["description"].as_str().unwrap_or_default().to_string();
    roles.push(MockRole {
        id,
        name: name.clone(),
        description: description.clone(),
        permission_ids: Vec::new(),
        updated_at: "2025-11-25T11:00:00".to_string(),
    });
    Json(json!({
        "message": "Rolle erfolgreich angelegt",
        "role": { "id": id, "name": name, "description": description, "created_at": "2025-11-25T11:00:00" }
    }))
    .into_response()
}

async fn content(Path(page): Path<String>) -> impl IntoResponse {
    let fragment = match page.as_str() {
        "startseite.html" => "<div id=\"dashboard\"><h1>Startseite</h1></div>",
        "pulverlager.html" => {
            "<div><select id=\"filter-column\"></select><input id=\"filter-query\"/>\
             <table id=\"pulver-table\"><tbody></tbody></table></div>"
        }
        "benutzer.html" => "<div><table id=\"users-table\"><tbody></tbody></table></div>",
        "rollenrechte.html" => {
            "<div class=\"panel roles-container\"><ul id=\"roles-list\"></ul></div>"
        }
        "no_permission.html" => "<div id=\"no-permission\"><p>Keine Berechtigung</p></div>",
        _ => return StatusCode::NOT_FOUND.into_response(),
    };
    fragment.into_response()
}

async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

async fn handle_ws(mut socket: WebSocket, state: AppState) {
    state.ws_connections.fetch_add(1, Ordering::SeqCst);
    let mut events = state.events.subscribe();
    let mut close = state.ws_close.subscribe();

    loop {
        tokio::select! {
            frame = events.recv() => match frame {
                Ok(frame) => {
                    if socket.send(WsMessage::Text(frame.into())).await.is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            _ = close.recv() => {
                let _ = socket.send(WsMessage::Close(None)).await;
                break;
            }
            inbound = socket.recv() => match inbound {
                Some(Ok(_)) => {}
                _ => break,
            },
        }
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/refresh", post(refresh))
        .route("/api/me", get(me))
        .route("/api/headers", get(echo_headers))
        .route("/api/users/", get(list_users).post(create_user))
        .route("/api/users/export", get(export_users))
        .route("/api/users/restore/{id}", put(restore_user))
        .route("/api/users/{id}", get(get_user).put(update_user).delete(delete_user))
        .route("/api/users/{id}/reset_password", post(reset_password))
        .route("/api/pulver/", get(list_pulver).post(create_pulver))
        .route("/api/pulver/track", post(track_pulver))
        .route("/api/pulver/id/{id}", get(get_pulver))
        .route(
            "/api/pulver/{key}",
            get(pulver_by_key).put(update_pulver).delete(delete_pulver),
        )
        .route("/static/content/{page}", get(content))
        .route("/ws/app", get(ws_handler))
        .route("/api/roles/roles", get(list_roles))
        .route("/api/roles/permissions", get(list_permissions))
        .route("/api/roles/roles/{id}/permissions", get(role_permissions))
        .route("/api/roles/assign_permissions", post(assign_permissions))
        .route("/api/roles/", post(create_role))
        .with_state(state)
}

// ── Test application ─────────────────────────────────────────────────

/// The mock server plus a ready application context around it.
pub struct TestApp {
    pub state: Arc<ServerState>,
    pub base_url: String,
    pub store: Arc<SessionStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub ctx: AppContext,
    pub channel: Arc<EventChannel>,
    _dir: tempfile::TempDir,
}

impl TestApp {
    /// Spawns the mock server and wires a context with a valid
    /// far-future session.
    pub async fn new() -> Self {
        Self::with_token(make_token("admin", 3600)).await
    }

    /// Spawns the mock server with a specific stored token.
    pub async fn with_token(token: String) -> Self {
        let state = Arc::new(ServerState::new());
        state.accept_token(&token);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock server");
        let addr = listener.local_addr().expect("mock server addr");
        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock server");
        });

        let base_url = format!("http://{addr}");

        let dir = tempfile::tempdir().expect("tempdir");
        let store = Arc::new(SessionStore::new(dir.path().join("session.json")));
        store
            .save(&StoredSession {
                token,
                username: "admin".to_string(),
            })
            .await
            .expect("seed session");

        let api_config = ApiConfig {
            base_url: base_url.clone(),
            ..ApiConfig::default()
        };
        let auth_config = AuthConfig::default();
        let notifier = RecordingNotifier::new();

        let gateway = Arc::new(
            ApiGateway::new(&api_config, &auth_config, store.clone(), notifier.clone())
                .expect("gateway"),
        );
        let channel = Arc::new(
            EventChannel::new(&base_url, &RealtimeConfig::default()).expect("channel"),
        );

        let ctx = AppContext::new(store.clone(), gateway, channel.clone(), notifier.clone());

        Self {
            state,
            base_url,
            store,
            notifier,
            ctx,
            channel,
            _dir: dir,
        }
    }

    /// The API config pointing at the mock server.
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.base_url.clone(),
            ..ApiConfig::default()
        }
    }

    /// Builds a content loader over a registry with all three page
    /// modules, returning the module handles as well.
    pub fn build_loader(
        &self,
    ) -> (
        Arc<ContentLoader>,
        Arc<RolesModule>,
        Arc<UsersModule>,
        Arc<PulverModule>,
    ) {
        let roles = RolesModule::new();
        let users = UsersModule::new();
        let pulver = PulverModule::new();

        let mut registry = ModuleRegistry::new();
        registry.register(roles.clone());
        registry.register(users.clone());
        registry.register(pulver.clone());

        let loader = Arc::new(ContentLoader::new(&self.api_config(), Arc::new(registry)));
        (loader, roles, users, pulver)
    }
}
