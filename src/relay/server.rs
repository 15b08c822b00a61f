use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::ws::{Message, WebSocket},
    extract::{State, WebSocketUpgrade},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::sync::broadcast::error::RecvError;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};

use crate::core::config::RelayConfig;
use crate::core::types::{canonical_contract, TokenRecord};
use crate::relay::hub::{BroadcastHub, FeedMessage};
use crate::relay::store::RelayStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RelayStore>,
    pub hub: Arc<BroadcastHub>,
    scraper_token: String,
}

impl AppState {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            store: Arc::new(RelayStore::new(config.max_entries, config.max_age)),
            hub: Arc::new(BroadcastHub::new()),
            scraper_token: config.scraper_token.clone(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/token", post(ingest_token))
        .route("/ws", get(feed_upgrade))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds and serves until the process is told to stop.
pub async fn serve(config: RelayConfig, state: AppState) -> Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port))
        .await
        .with_context(|| format!("failed to bind port {}", config.port))?;
    info!(port = config.port, "relay server listening");
    axum::serve(listener, app)
        .await
        .context("relay server failed")
}

/// Authenticated write path from the scraper. Credentials are checked by
/// exact string equality before the body is even parsed.
async fn ingest_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let expected = format!("Bearer {}", state.scraper_token);
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v == expected)
        .unwrap_or(false);
    if !authorized {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Unauthorized"})),
        )
            .into_response();
    }

    let mut record: TokenRecord = match serde_json::from_str(&body) {
        Ok(record) => record,
        Err(e) => {
            debug!(error = %e, "rejecting unparseable ingress payload");
            return invalid_token_response();
        }
    };
    let Some(contract) = canonical_contract(&record.contract) else {
        debug!(contract = %record.contract, "rejecting malformed contract");
        return invalid_token_response();
    };
    record.contract = contract;

    info!(
        contract = %record.contract,
        name = %record.name,
        "received token"
    );
    state.store.append(record.clone()).await;
    state.hub.publish(record);

    (StatusCode::OK, Json(json!({"success": true}))).into_response()
}

fn invalid_token_response() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({"error": "Invalid token data"})),
    )
        .into_response()
}

async fn feed_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| feed_socket(socket, state))
}

/// One subscriber connection: full snapshot first, then every record
/// published after the subscribe, in publish order.
async fn feed_socket(socket: WebSocket, state: AppState) {
    // Receiver before snapshot: records published in between land on the
    // receiver, and the snapshot covers everything earlier, so nothing is
    // missed and nothing pre-subscribe is replayed.
    let mut rx = state.hub.subscribe();
    let snapshot = state.store.snapshot().await;

    let (mut sender, mut receiver) = socket.split();

    let initial = match serde_json::to_string(&FeedMessage::initial(snapshot)) {
        Ok(payload) => payload,
        Err(e) => {
            error!(error = %e, "failed to serialize initial snapshot");
            return;
        }
    };
    if sender.send(Message::Text(initial)).await.is_err() {
        return;
    }
    info!("subscriber connected");

    let mut send_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(msg) => {
                    let payload = match serde_json::to_string(&msg) {
                        Ok(payload) => payload,
                        Err(e) => {
                            error!(error = %e, "failed to serialize feed message");
                            continue;
                        }
                    };
                    if sender.send(Message::Text(payload)).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "subscriber fell behind, dropping connection");
                    break;
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // The feed is read-only; inbound messages are logged and ignored.
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    debug!(message = %text, "ignoring inbound subscriber message");
                }
                Ok(Message::Close(_)) | Err(_) => break,
                Ok(_) => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }
    info!("subscriber disconnected");
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "clients": state.hub.subscriber_count(),
        "tokens": state.store.len().await,
    }))
}
