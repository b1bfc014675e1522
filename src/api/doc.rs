//! OpenAPI document for the REST surface.

use utoipa::OpenApi;

use super::dto::{CoinsRequest, CoinsResponse};
use super::handlers::{blocks, coins, system};
use crate::domain::BlockData;
use crate::error::{ErrorBody, ErrorResponse};

/// Generated OpenAPI description, served at `/api-docs/openapi.json`
/// when the `swagger-ui` feature is enabled.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "faucet-gateway", description = "Testnet faucet payouts and block feed"),
    paths(
        coins::get_coins,
        blocks::get_blocks,
        system::health_handler,
        system::config_handler,
    ),
    components(schemas(CoinsRequest, CoinsResponse, BlockData, ErrorResponse, ErrorBody)),
    tags(
        (name = "Faucet", description = "Coin payouts"),
        (name = "Blocks", description = "Block history"),
        (name = "System", description = "Health and client configuration"),
    )
)]
pub struct ApiDoc;
