//! [`crate::api`] 的 HTTP 绑定.
//!
//! 服务端不保存客户端状态，每个请求自带网与标识。状态空间探索在阻塞线程池
//! 中运行，大规模搜索不会阻塞其他请求。
use std::sync::Arc;

use anyhow::Context;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{Value, json};

use crate::analysis::{ExploreError, ExploreReport};
use crate::api::{
    self, ApiError, EnabledResponse, FireRequest, FireResponse, KBoundedRequest, NetRequest,
    StateResponse,
};
use crate::config::EngineConfig;
use crate::net::{FireError, MarkingError};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EngineConfig>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidNet(_)
            | ApiError::Marking(MarkingError::UnknownPlace(_))
            | ApiError::Explore(ExploreError::InvalidConfig(_)) => StatusCode::BAD_REQUEST,
            ApiError::Fire(FireError::UnknownTransition(_)) => StatusCode::NOT_FOUND,
            ApiError::Fire(FireError::NotEnabled(_)) => StatusCode::CONFLICT,
            ApiError::Fire(FireError::TokenOverflow(_))
            | ApiError::Explore(ExploreError::Fire(FireError::TokenOverflow(_))) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Fire(_) | ApiError::Explore(_) | ApiError::Worker(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("request failed: {}", self);
        } else {
            log::debug!("request rejected: {}", self);
        }
        let body = json!({ "error": self.kind(), "message": self.to_string() });
        (status, Json(body)).into_response()
    }
}

pub fn router(config: EngineConfig) -> Router {
    let state = AppState {
        config: Arc::new(config),
    };
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/simulate/enabled", get(enabled).post(enabled))
        .route("/simulate/fire", post(fire))
        .route("/analyze/state", post(analyze_state))
        .route("/analyze/k-bounded", post(analyze_k_bounded))
        .with_state(state)
}

pub async fn serve(config: EngineConfig) -> anyhow::Result<()> {
    let bind = config.server.bind.clone();
    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {}", bind))?;
    log::info!("petri net engine listening on {}", bind);
    axum::serve(listener, router(config))
        .await
        .context("server terminated")?;
    Ok(())
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Petri net engine", "version": env!("CARGO_PKG_VERSION") }))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

async fn enabled(Json(request): Json<NetRequest>) -> Result<Json<EnabledResponse>, ApiError> {
    api::enabled(&request).map(Json)
}

async fn fire(Json(request): Json<FireRequest>) -> Result<Json<FireResponse>, ApiError> {
    log::debug!("fire {}", request.transition_id);
    api::fire(&request).map(Json)
}

async fn analyze_state(Json(request): Json<NetRequest>) -> Result<Json<StateResponse>, ApiError> {
    api::analyze_state(&request).map(Json)
}

async fn analyze_k_bounded(
    State(state): State<AppState>,
    Json(request): Json<KBoundedRequest>,
) -> Result<Json<ExploreReport>, ApiError> {
    let settings = state.config.explore.clone();
    let report = tokio::task::spawn_blocking(move || api::analyze_k_bounded(&request, &settings))
        .await
        .map_err(|e| ApiError::Worker(e.to_string()))??;
    Ok(Json(report))
}
