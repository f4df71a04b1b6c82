use axum::{
    body::Body,
    extract::Request,
    http::StatusCode,
    response::Response,
};
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use uuid::Uuid;

use crate::{
    error::Result,
    gateway::{ProxyClient, proxy::upstream_error, route_table::Target},
};

/// Forwards an upgrade request (WebSocket or otherwise). When the upstream
/// switches protocols, both upgraded connections are spliced together in a
/// background task and the 101 is relayed to the client.
pub async fn forward_upgrade(
    client: &ProxyClient,
    mut req: Request,
    target: Target,
) -> Result<Response> {
    let client_upgrade = hyper::upgrade::on(&mut req);

    let mut response = client
        .request(req)
        .await
        .map_err(|e| upstream_error(target, &e))?;

    if response.status() != StatusCode::SWITCHING_PROTOCOLS {
        tracing::warn!("{} upstream declined upgrade with {}", target, response.status());
        return Ok(response.map(Body::new));
    }

    let upstream_upgrade = hyper::upgrade::on(&mut response);
    let tunnel_id = Uuid::new_v4();
    tokio::spawn(splice(tunnel_id, target, client_upgrade, upstream_upgrade));

    let (parts, _) = response.into_parts();
    Ok(Response::from_parts(parts, Body::empty()))
}

async fn splice(id: Uuid, target: Target, client: OnUpgrade, upstream: OnUpgrade) {
    let (client, upstream) = match tokio::try_join!(client, upstream) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!("Tunnel {} to {} failed to upgrade: {}", id, target, e);
            return;
        }
    };
    tracing::info!("Tunnel {} to {} open", id, target);

    let mut client = TokioIo::new(client);
    let mut upstream = TokioIo::new(upstream);
    match tokio::io::copy_bidirectional(&mut client, &mut upstream).await {
        Ok((sent, received)) => tracing::info!(
            "Tunnel {} closed ({} bytes sent, {} bytes received)",
            id,
            sent,
            received
        ),
        Err(e) => tracing::debug!("Tunnel {} closed: {}", id, e),
    }
}
