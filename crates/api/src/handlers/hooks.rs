//! Inbound webhook endpoint called by external systems.

use std::net::{IpAddr, SocketAddr};

use axum::{
    body::Bytes,
    extract::{ConnectInfo, Path, State},
    http::HeaderMap,
    Json,
};
use engine::{InboundCall, SIGNATURE_HEADER};
use serde_json::{json, Value};
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::{ApiError, AppState};

#[instrument(skip(state, connect_info, headers, body))]
pub async fn receive(
    Path(webhook_id): Path<Uuid>,
    State(state): State<AppState>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let remote_ip = caller_ip(
        &headers,
        connect_info.map(|ConnectInfo(addr)| addr.ip()),
        state.trust_forwarded_for,
    );
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let receipt = state
        .gateway
        .handle(InboundCall {
            webhook_id,
            body: &body,
            signature,
            remote_ip,
        })
        .await?;

    if let Err(e) = state.events.try_enqueue(receipt.follow_up) {
        warn!(error = %e, "webhook_received event dropped");
    }

    Ok(Json(json!({
        "logId": receipt.log_id,
        "status": receipt.status,
    })))
}

/// First `X-Forwarded-For` hop when proxies are trusted, else the socket
/// peer.
fn caller_ip(headers: &HeaderMap, peer: Option<IpAddr>, trust_forwarded_for: bool) -> Option<IpAddr> {
    if trust_forwarded_for {
        let forwarded = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|first| first.trim().parse().ok());
        if forwarded.is_some() {
            return forwarded;
        }
    }
    peer
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn forwarded_for_is_only_used_when_trusted() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.9, 10.0.0.1"));
        let peer: IpAddr = "10.0.0.1".parse().unwrap();

        assert_eq!(
            caller_ip(&headers, Some(peer), true),
            Some("203.0.113.9".parse().unwrap())
        );
        assert_eq!(caller_ip(&headers, Some(peer), false), Some(peer));
        assert_eq!(caller_ip(&HeaderMap::new(), Some(peer), true), Some(peer));
    }
}
