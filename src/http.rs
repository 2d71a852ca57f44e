use crate::prelude::*;
use crate::config::NamedValue;
use crate::uvr::Readings;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

#[derive(Clone, Debug)]
pub enum ChannelData {
    Shutdown,
}

#[derive(Clone)]
struct AppState {
    channels: Channels,
    values: Arc<Vec<NamedValue>>,
}

/// Serves the most recent snapshot as JSON.
#[derive(Clone)]
pub struct Http {
    config: ConfigWrapper,
    channels: Channels,
}

impl Http {
    pub fn new(config: ConfigWrapper, channels: Channels) -> Self {
        Self { config, channels }
    }

    pub async fn start(&self) -> Result<()> {
        let config = self.config.http();
        if !config.enabled() {
            info!("http disabled, skipping");
            return Ok(());
        }

        let app = Self::router(self.channels.clone(), config.values().to_vec());
        let listener = tokio::net::TcpListener::bind(config.bind()).await?;
        info!("http listening on {}", listener.local_addr()?);

        let mut shutdown = self.channels.to_http.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        info!("http server exiting");

        Ok(())
    }

    pub fn stop(&self) {
        let _ = self.channels.to_http.send(ChannelData::Shutdown);
    }

    pub fn router(channels: Channels, named: Vec<NamedValue>) -> Router {
        let state = AppState {
            channels,
            values: Arc::new(named),
        };

        Router::new()
            .route("/", get(snapshot))
            .route("/api/snapshot", get(snapshot))
            .route("/api/values", get(values))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .with_state(state)
    }

    /// Looks up each configured name in `readings`; a channel the
    /// controller did not report comes out as `null`.
    pub fn named_values(values: &[NamedValue], readings: &Readings) -> Map<String, Value> {
        values
            .iter()
            .map(|v| {
                let value = match (v.sensor, v.rate) {
                    (Some(i), _) => readings
                        .sensors
                        .get(i)
                        .map(|s| Value::from(Utils::round_reading(s.value))),
                    (None, Some(i)) => readings.rates.get(i).map(|r| Value::from(*r)),
                    (None, None) => None,
                };
                (v.name.clone(), value.unwrap_or(Value::Null))
            })
            .collect()
    }
}

async fn snapshot(State(state): State<AppState>) -> Response {
    match ReadingsCache::get(&state.channels).await {
        Ok(Some(snapshot)) => Json(snapshot).into_response(),
        Ok(None) => (StatusCode::SERVICE_UNAVAILABLE, "no readings yet").into_response(),
        Err(e) => {
            error!("http: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

async fn values(State(state): State<AppState>) -> Response {
    match ReadingsCache::get(&state.channels).await {
        Ok(Some(snapshot)) => {
            Json(Http::named_values(&state.values, &snapshot.readings)).into_response()
        }
        Ok(None) => (StatusCode::SERVICE_UNAVAILABLE, "no readings yet").into_response(),
        Err(e) => {
            error!("http: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}
