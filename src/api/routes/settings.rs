//! Settings endpoints (the "open settings" surface).

use super::playback::{ApiCommand, ApiState};
use crate::api::error::ApiResult;
use crate::policy::Policy;
use axum::{extract::State, response::Json, routing::get, Router};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsView {
    pub config_path: Option<String>,
    pub policy: Policy,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsUpdate {
    #[serde(default)]
    pub stream_url: Option<String>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(get_settings).put(update_settings))
        .with_state(state)
}

/// GET /settings - Current policy and where it is stored.
async fn get_settings(State(state): State<ApiState>) -> ApiResult<Json<SettingsView>> {
    current_settings(&state).await.map(Json)
}

/// PUT /settings - Update the stream URL.
async fn update_settings(
    State(state): State<ApiState>,
    Json(update): Json<SettingsUpdate>,
) -> ApiResult<Json<SettingsView>> {
    if let Some(url) = update.stream_url {
        state
            .request(|reply| ApiCommand::SetStreamUrl { url, reply })
            .await??;
    }

    current_settings(&state).await.map(Json)
}

async fn current_settings(state: &ApiState) -> ApiResult<SettingsView> {
    let status = state
        .request(|reply| ApiCommand::Status { reply })
        .await?;
    Ok(SettingsView {
        config_path: status.config_path,
        policy: status.policy,
    })
}
