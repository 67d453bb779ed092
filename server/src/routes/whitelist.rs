//! Whitelist status, counts, mint announcements and imports

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tracing::info;
use whitelist_core::import::ImportSummary;
use whitelist_core::{AnnounceMintRequest, MintTransaction, WhitelistLevel};

use crate::dto::{error_response, ApiError, ApiResult};
use crate::AppState;

/// Status and counts may be cached by clients and proxies for ten seconds
pub const CACHE_CONTROL_TEN_SECONDS: &str = "public, max-age=10, immutable";

/// Create whitelist routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/status/:wallet_address", get(get_status))
        .route("/count", get(get_count))
        .route("/announceMintTransaction", post(announce_mint_transaction))
        .route("/save/:level", post(save_list))
}

/// GET /whitelist/status/:walletAddress - Minting eligibility for a wallet
pub async fn get_status(
    State(state): State<AppState>,
    Path(wallet_address): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let result = state
        .service()
        .status(&wallet_address, state.now())
        .await
        .map_err(error_response)?;

    Ok((
        [(header::CACHE_CONTROL, CACHE_CONTROL_TEN_SECONDS)],
        Json(result),
    ))
}

/// GET /whitelist/count - Unique whitelisted wallets per level
pub async fn get_count(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let counts = state.service().count_levels().await.map_err(error_response)?;

    Ok((
        [(header::CACHE_CONTROL, CACHE_CONTROL_TEN_SECONDS)],
        Json(counts),
    ))
}

/// POST /whitelist/announceMintTransaction - Record a submitted mint
pub async fn announce_mint_transaction(
    State(state): State<AppState>,
    payload: Result<Json<AnnounceMintRequest>, JsonRejection>,
) -> ApiResult<Json<MintTransaction>> {
    let Json(request) = payload.map_err(|rejection| {
        (
            StatusCode::BAD_REQUEST,
            Json(ApiError::bad_request(rejection.body_text())),
        )
    })?;

    let mint = state
        .service()
        .announce(request, state.now())
        .await
        .map_err(error_response)?;
    Ok(Json(mint))
}

/// POST /whitelist/save/{airdrop|super-premint|premint|developer}
///
/// Body is `text/plain` with one address per line. Development only.
pub async fn save_list(
    State(state): State<AppState>,
    Path(level): Path<String>,
    body: String,
) -> ApiResult<Json<ImportSummary>> {
    let level = match WhitelistLevel::ALL.into_iter().find(|l| l.slug() == level) {
        Some(level) => level,
        None => {
            return Err((
                StatusCode::NOT_FOUND,
                Json(ApiError::not_found(format!("Unknown whitelist level '{}'", level))),
            ))
        }
    };

    info!("Import requested for {} ({} bytes)", level, body.len());
    let summary = state
        .service()
        .import(&body, level, state.now())
        .await
        .map_err(error_response)?;
    Ok(Json(summary))
}
