//! Host condition feed.
//!
//! The game-side hook posts raw condition flag changes here; the service turns
//! them into mount role edges.

use super::playback::{ApiCommand, ApiState};
use crate::api::error::ApiResult;
use crate::monitor::ConditionFlag;
use axum::{extract::State, response::Json, routing::post, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConditionUpdate {
    pub flag: ConditionFlag,
    pub value: bool,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/condition", post(report_condition))
        .with_state(state)
}

async fn report_condition(
    State(state): State<ApiState>,
    Json(update): Json<ConditionUpdate>,
) -> ApiResult<Json<Value>> {
    debug!(
        "Condition {} = {} reported via API",
        update.flag.as_str(),
        update.value
    );
    let ConditionUpdate { flag, value } = update;
    let edge = state
        .request(|reply| ApiCommand::Condition { flag, value, reply })
        .await?;

    Ok(Json(json!({
        "success": true,
        "edge": edge,
    })))
}
