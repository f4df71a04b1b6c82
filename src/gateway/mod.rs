use std::sync::Arc;

use axum::{Json, Router, body::Body, extract::State, routing::get};
use hyper_util::{
    client::legacy::{Client, connect::HttpConnector},
    rt::TokioExecutor,
};
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

use crate::config::{GatewayConfig, Upstream};

pub mod proxy;
pub mod route_table;
pub mod tunnel;

pub use route_table::{RouteTable, Target};

pub type ProxyClient = Client<HttpConnector, Body>;

/// State shared by the gateway handlers
#[derive(Clone)]
pub struct GatewayState {
    pub routes: Arc<RouteTable>,
    ui: Arc<Upstream>,
    api: Arc<Upstream>,
    client: ProxyClient,
}

impl GatewayState {
    pub fn new(config: &GatewayConfig) -> Self {
        Self {
            routes: Arc::new(RouteTable::default()),
            ui: Arc::new(config.ui_target.clone()),
            api: Arc::new(config.api_target.clone()),
            client: Client::builder(TokioExecutor::new()).build(HttpConnector::new()),
        }
    }

    pub fn with_routes(mut self, routes: RouteTable) -> Self {
        self.routes = Arc::new(routes);
        self
    }

    pub fn upstream(&self, target: Target) -> &Upstream {
        match target {
            Target::Ui => &self.ui,
            Target::Api => &self.api,
        }
    }
}

/// Builds the gateway: `GET /health` is answered locally, everything else is
/// forwarded.
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(health).fallback(proxy::forward))
        .fallback(proxy::forward)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health(State(state): State<GatewayState>) -> Json<Value> {
    Json(json!({
        "ok": true,
        "ui": state.ui.as_str(),
        "api": state.api.as_str(),
    }))
}
