//! Block history endpoint handler.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};

use crate::app_state::AppState;
use crate::domain::BlockData;
use crate::error::{ErrorResponse, FaucetError};

/// `GET /blocks/{from_height}`: Up to ten blocks walking down.
///
/// # Errors
///
/// Returns [`FaucetError`] if the height is unknown or the wallet fails.
#[utoipa::path(
    get,
    path = "/blocks/{from_height}",
    tag = "Blocks",
    summary = "List recent blocks",
    description = "Returns up to ten blocks starting at `from_height` and walking toward genesis. `0` returns an empty list; a negative height starts at the chain tip.",
    params(
        ("from_height" = i64, Path, description = "Start height, or negative for the tip"),
    ),
    responses(
        (status = 200, description = "Blocks, newest first", body = Vec<BlockData>),
        (status = 404, description = "Start height past the tip", body = ErrorResponse),
        (status = 502, description = "Wallet failure", body = ErrorResponse),
    )
)]
pub async fn get_blocks(
    State(state): State<AppState>,
    Path(from_height): Path<i64>,
) -> Result<impl IntoResponse, FaucetError> {
    let blocks = state.faucet.recent_blocks(from_height).await?;
    Ok(Json(blocks))
}

/// Block routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/blocks/{from_height}", get(get_blocks))
}
