//! Payout endpoint handler.

use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{CoinsRequest, CoinsResponse};
use crate::app_state::AppState;
use crate::error::{ErrorResponse, FaucetError};

/// `POST /getcoins`: Send the payout amount to an address.
///
/// # Errors
///
/// Returns [`FaucetError`] on an empty address, an empty faucet, or a
/// wallet failure.
#[utoipa::path(
    post,
    path = "/getcoins",
    tag = "Faucet",
    summary = "Request coins",
    description = "Reserves wallet funds and spends them to the given address. Funds stay reserved while the spend is in flight.",
    request_body = CoinsRequest,
    responses(
        (status = 200, description = "Payout submitted", body = CoinsResponse),
        (status = 400, description = "Invalid address", body = ErrorResponse),
        (status = 422, description = "Faucet has no spendable funds", body = ErrorResponse),
        (status = 502, description = "Wallet failure", body = ErrorResponse),
    )
)]
pub async fn get_coins(
    State(state): State<AppState>,
    Json(req): Json<CoinsRequest>,
) -> Result<impl IntoResponse, FaucetError> {
    let receipt = state.faucet.request_payout(&req.addr).await?;
    Ok(Json(CoinsResponse::from(receipt)))
}

/// Payout routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/getcoins", post(get_coins))
}
