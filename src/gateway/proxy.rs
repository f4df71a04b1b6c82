use std::net::{IpAddr, SocketAddr};

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{
        HeaderMap, HeaderName, HeaderValue,
        header::{
            CONNECTION, HOST, PROXY_AUTHENTICATE, PROXY_AUTHORIZATION, TE, TRAILER,
            TRANSFER_ENCODING, UPGRADE,
        },
    },
    response::Response,
};

use crate::{
    error::{AppError, Result},
    gateway::{GatewayState, route_table::Target, tunnel},
};

const X_FORWARDED_FOR: HeaderName = HeaderName::from_static("x-forwarded-for");
const X_FORWARDED_HOST: HeaderName = HeaderName::from_static("x-forwarded-host");
const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");
const KEEP_ALIVE: HeaderName = HeaderName::from_static("keep-alive");
const PROXY_CONNECTION: HeaderName = HeaderName::from_static("proxy-connection");

/// Forwards any request the gateway does not answer itself to the upstream
/// picked by the route table. Bodies stream through in both directions.
pub async fn forward(State(state): State<GatewayState>, mut req: Request) -> Result<Response> {
    let target = state.routes.resolve(req.uri().path());
    let upstream = state.upstream(target);
    let uri = upstream
        .uri_for(req.uri())
        .map_err(|e| AppError::BadRequest(format!("Cannot forward {}: {}", req.uri(), e)))?;

    tracing::debug!("{} {} -> {} ({})", req.method(), req.uri(), uri, target);

    let client_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let upgrade = is_upgrade_request(req.headers());
    let host = HeaderValue::from_str(upstream.authority().as_str())
        .map_err(|e| AppError::Internal(e.to_string()))?;

    let headers = req.headers_mut();
    if !upgrade {
        strip_hop_by_hop(headers);
    }
    set_forwarded_headers(headers, client_ip);
    headers.insert(HOST, host);
    *req.uri_mut() = uri;

    if upgrade {
        return tunnel::forward_upgrade(&state.client, req, target).await;
    }

    let mut response = state
        .client
        .request(req)
        .await
        .map_err(|e| upstream_error(target, &e))?
        .map(Body::new);
    strip_hop_by_hop(response.headers_mut());

    Ok(response)
}

pub(crate) fn upstream_error(target: Target, err: &dyn std::error::Error) -> AppError {
    let mut detail = format!("{} upstream: {}", target, err);
    let mut source = err.source();
    while let Some(cause) = source {
        detail.push_str(": ");
        detail.push_str(&cause.to_string());
        source = cause.source();
    }
    tracing::warn!("Forwarding failed: {}", detail);
    AppError::Upstream(detail)
}

/// `Connection: upgrade` together with an `Upgrade` header.
pub fn is_upgrade_request(headers: &HeaderMap) -> bool {
    headers.contains_key(UPGRADE)
        && headers
            .get_all(CONNECTION)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
}

/// Removes connection-scoped headers, including any named in `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|token| HeaderName::from_bytes(token.trim().as_bytes()).ok())
        .collect();
    for name in named {
        headers.remove(name);
    }

    for name in [
        CONNECTION,
        KEEP_ALIVE,
        PROXY_CONNECTION,
        TE,
        TRAILER,
        TRANSFER_ENCODING,
        UPGRADE,
        PROXY_AUTHENTICATE,
        PROXY_AUTHORIZATION,
    ] {
        headers.remove(name);
    }
}

fn set_forwarded_headers(headers: &mut HeaderMap, client_ip: Option<IpAddr>) {
    if let Some(ip) = client_ip {
        let value = match headers.get(&X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
            Some(prior) => format!("{}, {}", prior, ip),
            None => ip.to_string(),
        };
        if let Ok(value) = HeaderValue::from_str(&value) {
            headers.insert(X_FORWARDED_FOR, value);
        }
    }

    if !headers.contains_key(&X_FORWARDED_HOST) {
        if let Some(host) = headers.get(HOST).cloned() {
            headers.insert(X_FORWARDED_HOST, host);
        }
    }

    if !headers.contains_key(&X_FORWARDED_PROTO) {
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("http"));
    }
}
