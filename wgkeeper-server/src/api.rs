//! JSON API over the peer manager.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use wgkeeper_core::sanitize_name;

use crate::error::Error;
use crate::service::PeerManager;
use crate::store::PeerRecord;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<PeerManager>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/peers", get(list_peers).post(create_peer))
        .route("/api/peers/{id}", axum::routing::delete(delete_peer))
        .route("/api/peers/{id}/config", get(download_config))
        .route("/api/peers/{id}/qr", get(download_qr))
        .with_state(state)
}

/// Peer as exposed over the API. Key material and artifact paths stay
/// server-side.
#[derive(Debug, Serialize)]
pub struct PeerResponse {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub public_key: String,
    pub created_at: DateTime<Utc>,
}

impl From<PeerRecord> for PeerResponse {
    fn from(rec: PeerRecord) -> Self {
        Self {
            id: rec.id,
            name: rec.name,
            address: rec.address,
            public_key: rec.public_key,
            created_at: rec.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct CreatePeerRequest {
    pub name: String,
}

async fn list_peers(State(state): State<AppState>) -> Result<Json<Vec<PeerResponse>>, Error> {
    let peers = state.manager.store().list().await?;
    Ok(Json(peers.into_iter().map(PeerResponse::from).collect()))
}

async fn create_peer(
    State(state): State<AppState>,
    Json(req): Json<CreatePeerRequest>,
) -> Result<(StatusCode, Json<PeerResponse>), Error> {
    let record = state.manager.create(&req.name).await?;
    Ok((StatusCode::CREATED, Json(record.into())))
}

async fn delete_peer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, Error> {
    state.manager.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn download_config(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Response, Error> {
    let record = state.manager.store().find(id).await?.ok_or(Error::NotFound)?;
    let path = record.config_path.as_deref().ok_or(Error::NotFound)?;
    serve_file(path, &format!("{}.conf", sanitize_name(&record.name))).await
}

async fn download_qr(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Response, Error> {
    let record = state.manager.store().find(id).await?.ok_or(Error::NotFound)?;
    let path = record.qr_path.as_deref().ok_or(Error::NotFound)?;
    serve_file(path, &format!("{}.png", sanitize_name(&record.name))).await
}

async fn serve_file(path: &str, filename: &str) -> Result<Response, Error> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(Error::NotFound),
        Err(e) => return Err(e.into()),
    };
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::EmptyName => StatusCode::BAD_REQUEST,
            Error::NameTaken(_) => StatusCode::CONFLICT,
            Error::Exhausted(_) => StatusCode::CONFLICT,
            Error::Command(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wgkeeper_core::AllocError;

    #[test]
    fn errors_map_to_expected_statuses() {
        let net: ipnet::Ipv4Net = "10.0.0.0/30".parse().unwrap();
        let cases = [
            (Error::NotFound, StatusCode::NOT_FOUND),
            (Error::EmptyName, StatusCode::BAD_REQUEST),
            (
                Error::NameTaken("laptop".to_string()),
                StatusCode::CONFLICT,
            ),
            (
                Error::Exhausted(AllocError::Exhausted(net)),
                StatusCode::CONFLICT,
            ),
            (
                Error::Command("systemctl blew up".to_string()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                Error::ServerKeyMissing("/etc/wireguard/keys/publickey".to_string()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn peer_response_hides_private_fields() {
        let record = PeerRecord {
            id: 1,
            name: "laptop".to_string(),
            address: "10.0.0.2".to_string(),
            public_key: "PUB".to_string(),
            private_key: Some("PRIV".to_string()),
            config_path: Some("data/clients/laptop.conf".to_string()),
            qr_path: None,
            created_at: Utc::now(),
        };
        let body = serde_json::to_value(PeerResponse::from(record)).unwrap();
        assert_eq!(body["name"], "laptop");
        assert_eq!(body["address"], "10.0.0.2");
        assert!(body.get("private_key").is_none());
        assert!(body.get("config_path").is_none());
    }
}
